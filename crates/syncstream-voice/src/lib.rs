//! Voice activity detection and playback ducking for syncstream rooms.
//!
//! The detector watches local microphone energy; the ducking coordinator
//! lowers playback volume while the user talks. Nothing here touches the
//! room channel: voice activity is never transmitted.

#![deny(unused_crate_dependencies)]

pub mod ducking;
pub mod error;
pub mod microphone;
pub mod monitor;
pub mod vad;

// Re-export key types for convenience
pub use ducking::{DuckingCoordinator, effective_volume};
pub use error::VoiceError;
pub use microphone::{MicrophoneSource, ScriptedMicrophone};
pub use monitor::SpeechMonitor;
pub use vad::{AudioFrame, VadConfig, VadEvent, VadState, VoiceActivityDetector};

#[cfg(test)]
use tokio_test as _;
