//! vakya command-line front end.
//!
//! `main.rs` only parses arguments and sets up logging; everything else
//! lives here so it can be tested.

pub mod bootstrap;
pub mod handlers;
pub mod parser;

pub use parser::{Cli, Command, ConfigCommand};
