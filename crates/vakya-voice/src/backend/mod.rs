//! Concrete adapters for the sequencer's collaborators.
//!
//! | Module             | Implements                                   | Needs                 |
//! |--------------------|----------------------------------------------|-----------------------|
//! | [`gemini`]         | [`SpeechSynthesizer`](vakya_core::SpeechSynthesizer) | `GEMINI_API_KEY`      |
//! | [`espeak`]         | [`LocalSpeech`](crate::local::LocalSpeech)   | `espeak-ng` on `PATH` |
//! | [`command_player`] | [`AudioPlayer`](crate::player::AudioPlayer)  | `ffplay` or `aplay`   |
//! | `rodio_player`     | [`AudioPlayer`](crate::player::AudioPlayer)  | feature `rodio`       |

pub mod command_player;
pub mod espeak;
pub mod gemini;
#[cfg(feature = "rodio")]
pub mod rodio_player;

mod process;

pub use command_player::CommandPlayer;
pub use espeak::EspeakSpeech;
pub use gemini::{GeminiConfig, GeminiSynthesizer, NETWORK_SAMPLE_RATE};
#[cfg(feature = "rodio")]
pub use rodio_player::RodioPlayer;
