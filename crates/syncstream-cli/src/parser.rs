//! Root CLI parser and global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Synchronized watch rooms, simulated locally.
#[derive(Debug, Parser)]
#[command(name = "syncstream")]
#[command(about = "Drive simulated syncstream rooms from the terminal")]
#[command(version)]
pub struct Cli {
    /// JSON settings file (overridden by SYNCSTREAM_* variables)
    #[arg(long = "config", global = true, env = "SYNCSTREAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from(["syncstream", "--verbose", "--config", "/tmp/s.json", "settings"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.json")));
        assert!(matches!(cli.command, Commands::Settings));
    }

    #[test]
    fn test_demo_defaults() {
        let cli = Cli::parse_from(["syncstream", "demo"]);
        let Commands::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.followers, 2);
        assert_eq!(args.seconds, 10);
        assert!(args.room.is_none());
        assert!(!args.voice);
    }

    #[test]
    fn test_replay_requires_file() {
        assert!(Cli::try_parse_from(["syncstream", "replay"]).is_err());
        let cli = Cli::try_parse_from(["syncstream", "replay", "log.jsonl"]).unwrap();
        assert!(matches!(cli.command, Commands::Replay { .. }));
    }
}
