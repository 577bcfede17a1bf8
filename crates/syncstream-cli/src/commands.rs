//! Subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Sample stream used when the demo is not given one.
pub const DEMO_MEDIA: &str =
    "https://storage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a Master and some Followers in one room and report their sync
    Demo(DemoArgs),

    /// Feed a JSON-lines file of protocol messages to a fresh Follower
    Replay {
        /// File with one message per line
        file: PathBuf,
    },

    /// Print the effective settings as JSON
    Settings,
}

#[derive(Debug, Clone, Args)]
pub struct DemoArgs {
    /// Number of Followers
    #[arg(short, long, default_value_t = 2)]
    pub followers: usize,

    /// How long to run, in seconds
    #[arg(short, long, default_value_t = 10)]
    pub seconds: u64,

    /// Room to use (defaults to the configured room)
    #[arg(short, long)]
    pub room: Option<String>,

    /// Media resource the Master starts with
    #[arg(long, default_value = DEMO_MEDIA)]
    pub media: String,

    /// Give the Master a scripted microphone so ducking kicks in
    #[arg(long)]
    pub voice: bool,
}
