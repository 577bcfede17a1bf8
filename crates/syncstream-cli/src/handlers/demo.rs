//! Demo command handler.
//!
//! Runs a Master and `followers` Followers in one in-process room. Halfway
//! through, the Master jumps ahead so the Followers have something to catch
//! up with. Each Follower's events are logged as they happen and a report
//! line per participant is printed at the end.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use syncstream_core::{ChannelEmitter, RoleAssignment, RoomEvent, SyncSettings, new_participant_id};
use syncstream_sync::{
    LocalCommand, MessageChannel, RoomSession, SessionConfig, SessionReport, SimulatedMediaEngine,
};
use syncstream_voice::{AudioFrame, ScriptedMicrophone};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::commands::DemoArgs;

const FRAME: Duration = Duration::from_millis(20);

/// Half a second of talking followed by three seconds of silence.
fn voice_script() -> Vec<AudioFrame> {
    let mut frames = vec![AudioFrame::new(vec![0.3; 320], FRAME); 25];
    frames.extend(vec![AudioFrame::silence(320, FRAME); 150]);
    frames
}

fn log_events(label: String, mut events: UnboundedReceiver<RoomEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(participant = %label, ?event, "Room event");
        }
    })
}

fn print_report(label: &str, report: &SessionReport) {
    println!(
        "{label:<12} {:<8} {:<9} {:<8} {:>9.2}s  vol {:.2}  sent {:>3}  recv {:>3}  ignored {:>2}",
        report.role.to_string(),
        report.state().to_string(),
        report.health.to_string(),
        report.position,
        report.volume,
        report.sent,
        report.received,
        report.ignored,
    );
}

/// Execute the demo command.
pub async fn execute(settings: &SyncSettings, args: &DemoArgs) -> Result<()> {
    let room_id = args
        .room
        .clone()
        .unwrap_or_else(|| settings.effective_room_id().to_string());
    let channel = MessageChannel::from_settings(settings);
    let cancel = CancellationToken::new();

    let mut followers = Vec::with_capacity(args.followers);
    let mut loggers = Vec::with_capacity(args.followers + 1);
    for index in 0..args.followers {
        let label = format!("follower-{}", index + 1);
        let (emitter, events) = ChannelEmitter::new();
        let config = SessionConfig::new(new_participant_id(), RoleAssignment::follower())
            .in_room(room_id.clone())
            .with_settings(settings.clone());
        let task = RoomSession::builder(&channel, config, SimulatedMediaEngine::new())
            .emitter(Arc::new(emitter))
            .build()
            .with_context(|| format!("Failed to start {label}"))?
            .spawn(cancel.child_token());
        loggers.push(log_events(label.clone(), events));
        followers.push((label, task));
    }

    let (emitter, events) = ChannelEmitter::new();
    let config = SessionConfig::new(new_participant_id(), RoleAssignment::master(1))
        .in_room(room_id.clone())
        .with_settings(settings.clone());
    let mut builder = RoomSession::builder(&channel, config, SimulatedMediaEngine::new())
        .emitter(Arc::new(emitter));
    if args.voice {
        builder = builder.microphone(Box::new(ScriptedMicrophone::new(voice_script())));
    }
    let master = builder
        .build()
        .context("Failed to start master")?
        .spawn(cancel.child_token());
    loggers.push(log_events("master".to_string(), events));

    info!(%room_id, followers = args.followers, "Demo room running");
    master.send(LocalCommand::ChangeMedia(args.media.clone()))?;
    if args.voice {
        master.send(LocalCommand::MicOn)?;
    }

    let half = Duration::from_secs(args.seconds) / 2;
    tokio::time::sleep(half).await;
    master.send(LocalCommand::Seek(half.as_secs_f64() + 30.0))?;
    tokio::time::sleep(Duration::from_secs(args.seconds) - half).await;

    let master_report = master.shutdown().await?;
    println!("room {room_id}");
    print_report("master", &master_report);
    for (label, task) in followers {
        let report = task.shutdown().await?;
        print_report(&label, &report);
    }
    cancel.cancel();

    for logger in loggers {
        // Loggers end once their session has dropped its emitter.
        logger.await.ok();
    }
    Ok(())
}
