//! Command-line driver for syncstream rooms.
//!
//! Everything runs in-process: the room channel, the participants and their
//! media engines are all simulated, which makes the binary a convenient way
//! to watch drift correction and ducking at work.

#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Used by the binary only.
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod handlers;
pub mod parser;

pub use bootstrap::{CliConfig, load_settings};
pub use commands::{Commands, DemoArgs};
pub use parser::Cli;
