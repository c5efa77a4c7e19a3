//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No HTTP client types in any signature
//! - Audio payloads cross the port as base64 strings, exactly as the remote
//!   service returns them; decoding belongs to the voice crate

pub mod speech;

pub use speech::{SpeechSynthesizer, SynthesisError};
