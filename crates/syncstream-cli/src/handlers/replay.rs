//! Replay command handler.
//!
//! Reads one protocol message per line and applies each to a fresh Follower,
//! printing what the Follower made of it. Useful for checking how a captured
//! exchange reconciles, including out-of-order and malformed input.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use syncstream_core::{RoleAssignment, SyncMessage, SystemClock, SyncSettings};
use syncstream_sync::{
    InteractionRelay, RelayUpdate, RemoteOutcome, SimulatedMediaEngine, SyncController,
};

/// Tally of a replay run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub ignored: usize,
    pub malformed: usize,
}

/// Replay `input` line by line, writing one report line per message.
pub fn replay_lines(input: &str, settings: &SyncSettings, out: &mut Vec<String>) -> ReplaySummary {
    let mut controller = SyncController::new(
        "replay",
        RoleAssignment::follower(),
        SimulatedMediaEngine::new(),
        Arc::new(SystemClock),
        settings.effective_sync_threshold(),
    );
    let mut relay = InteractionRelay::default();
    let mut summary = ReplaySummary::default();

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let message = match SyncMessage::decode(line) {
            Ok(message) => message,
            Err(e) => {
                summary.malformed += 1;
                out.push(format!("{line_no:>4}  malformed  {e}"));
                continue;
            }
        };

        let report = match controller.apply_remote(&message) {
            RemoteOutcome::Ignored(rejection) => {
                summary.ignored += 1;
                format!("ignored    {rejection}")
            }
            RemoteOutcome::Reconciled(reconciliation) => {
                summary.applied += 1;
                format!(
                    "sync       drift={:.3}s health={} actions={:?}",
                    reconciliation.drift, reconciliation.health, reconciliation.actions
                )
            }
            RemoteOutcome::Forwarded => {
                summary.applied += 1;
                match relay.apply(&message) {
                    Some(RelayUpdate::Navigated(location)) => format!("navigate   {location}"),
                    Some(RelayUpdate::Mirrored(interaction)) => format!("mirror     {interaction:?}"),
                    None => "co-browse  no change".to_string(),
                }
            }
        };
        out.push(format!("{line_no:>4}  {report}"));
    }

    out.push(format!(
        "final: phase={} media={} position={:.3}s health={} location={}",
        controller.phase(),
        controller.media_ref().unwrap_or("-"),
        controller.position(),
        controller.health(),
        relay.view().location().unwrap_or("-"),
    ));
    summary
}

/// Execute the replay command.
pub fn execute(settings: &SyncSettings, file: &Path) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut lines = Vec::new();
    let summary = replay_lines(&input, settings, &mut lines);
    for line in &lines {
        println!("{line}");
    }
    println!(
        "{} applied, {} ignored, {} malformed",
        summary.applied, summary.ignored, summary.malformed
    );
    Ok(())
}
