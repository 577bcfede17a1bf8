//! Follower-side reconciliation against a recording media engine.

use std::sync::Arc;

use syncstream_core::{
    ManualClock, MediaEngine, MediaError, MessagePayload, PlaybackState, RoleAssignment,
    SyncHealth, SyncMessage,
};
use syncstream_sync::{PlaybackPhase, ReconcileAction, Rejection, RemoteOutcome, SyncController};

/// Engine with a frozen position that records every call it receives.
#[derive(Debug, Default)]
struct RecordingEngine {
    media_ref: Option<String>,
    position: f64,
    paused: bool,
    volume: f32,
    calls: Vec<String>,
}

impl RecordingEngine {
    fn at(media_ref: &str, position: f64, paused: bool) -> Self {
        Self {
            media_ref: Some(media_ref.to_string()),
            position,
            paused,
            volume: 1.0,
            calls: Vec::new(),
        }
    }
}

impl MediaEngine for RecordingEngine {
    fn load(&mut self, media_ref: &str) -> Result<(), MediaError> {
        self.calls.push(format!("load {media_ref}"));
        if media_ref.starts_with("broken:") {
            return Err(MediaError::OpenFailed {
                media_ref: media_ref.to_string(),
                reason: "404".to_string(),
            });
        }
        self.media_ref = Some(media_ref.to_string());
        self.position = 0.0;
        self.paused = true;
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.calls.push("play".to_string());
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.calls.push("pause".to_string());
        self.paused = true;
    }

    fn seek(&mut self, position: f64) {
        self.calls.push(format!("seek {position}"));
        self.position = position;
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> Option<f64> {
        self.media_ref.as_ref().map(|_| 600.0)
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}

const MEDIA: &str = "movie.mp4";

/// A follower whose controller already has `MEDIA` loaded at `position`.
fn follower_at(position: f64, playing: bool) -> SyncController<RecordingEngine> {
    follower_with_threshold(position, playing, 0.8)
}

fn follower_with_threshold(
    position: f64,
    playing: bool,
    threshold: f64,
) -> SyncController<RecordingEngine> {
    let mut controller = SyncController::new(
        "follower",
        RoleAssignment::follower(),
        RecordingEngine::default(),
        Arc::new(ManualClock::starting_at(0)),
        threshold,
    );
    // Bring the controller in line with the engine through the normal path.
    let setup = sync(0, position, PlaybackState::Paused);
    controller.apply_remote(&setup);
    if playing {
        controller.play();
    }
    *controller.engine_mut() = RecordingEngine::at(MEDIA, position, !playing);
    controller
}

fn sync(timestamp: i64, position: f64, state: PlaybackState) -> SyncMessage {
    sync_from("master", 0, timestamp, position, state)
}

fn sync_from(
    sender: &str,
    epoch: u64,
    timestamp: i64,
    position: f64,
    state: PlaybackState,
) -> SyncMessage {
    SyncMessage::new(
        sender,
        timestamp,
        epoch,
        MessagePayload::Sync {
            position,
            state,
            media_ref: MEDIA.to_string(),
            quality: "1080p".to_string(),
        },
    )
}

fn reconciled(outcome: RemoteOutcome) -> syncstream_sync::Reconciliation {
    match outcome {
        RemoteOutcome::Reconciled(reconciliation) => reconciliation,
        other => panic!("expected reconciliation, got {other:?}"),
    }
}

#[test]
fn lagging_follower_snaps_to_master_and_plays() {
    let mut follower = follower_at(8.5, false);

    let result = reconciled(follower.apply_remote(&sync(10, 10.0, PlaybackState::Playing)));

    assert!((result.drift - 1.5).abs() < f64::EPSILON);
    assert_eq!(result.health, SyncHealth::Lagging);
    assert_eq!(
        result.actions,
        vec![ReconcileAction::Played, ReconcileAction::Seeked]
    );
    assert!(!follower.engine().is_paused());
    assert!((follower.position() - 10.0).abs() < f64::EPSILON);
}

#[test]
fn small_drift_is_left_alone() {
    let mut follower = follower_at(10.3, true);

    let result = reconciled(follower.apply_remote(&sync(10, 10.0, PlaybackState::Playing)));

    assert_eq!(result.health, SyncHealth::Good);
    assert!(result.actions.is_empty());
    assert!((follower.position() - 10.3).abs() < f64::EPSILON);
}

#[test]
fn master_pause_pauses_follower_regardless_of_drift() {
    let mut follower = follower_at(10.0, true);

    let result = reconciled(follower.apply_remote(&sync(10, 10.0, PlaybackState::Paused)));
    assert_eq!(result.actions, vec![ReconcileAction::Paused]);
    assert!(follower.engine().is_paused());

    let mut far = follower_at(10.0, true);
    let result = reconciled(far.apply_remote(&sync(10, 42.0, PlaybackState::Paused)));
    assert_eq!(
        result.actions,
        vec![ReconcileAction::Paused, ReconcileAction::Seeked]
    );
}

#[test]
fn remote_buffering_only_corrects_drift() {
    let mut close = follower_at(10.3, true);
    let result = reconciled(close.apply_remote(&sync(10, 10.0, PlaybackState::Buffering)));
    assert_eq!(result.health, SyncHealth::Good);
    assert!(result.actions.is_empty());
    assert!(close.engine().calls.is_empty());

    let mut paused_far = follower_at(4.0, false);
    let result = reconciled(paused_far.apply_remote(&sync(10, 10.0, PlaybackState::Buffering)));
    assert_eq!(result.health, SyncHealth::Lagging);
    assert_eq!(result.actions, vec![ReconcileAction::Seeked]);
    assert!(paused_far.engine().is_paused());
    assert_eq!(paused_far.engine().calls, vec!["seek 10".to_string()]);
}

#[test]
fn local_buffering_counts_as_not_paused() {
    let mut follower = follower_at(10.0, true);
    follower.stalled();
    assert_eq!(follower.phase(), &PlaybackPhase::Buffering);

    let result = reconciled(follower.apply_remote(&sync(10, 10.0, PlaybackState::Paused)));
    assert_eq!(result.actions, vec![ReconcileAction::Paused]);
    assert!(follower.engine().is_paused());

    let mut stalled = follower_at(10.0, true);
    stalled.stalled();
    let result = reconciled(stalled.apply_remote(&sync(10, 10.2, PlaybackState::Playing)));
    assert!(!result.actions.contains(&ReconcileAction::Played));
    assert!(result.actions.is_empty());
    assert_eq!(stalled.phase(), &PlaybackPhase::Buffering);
    assert!(!stalled.engine().calls.contains(&"play".to_string()));
}

#[test]
fn drift_equal_to_threshold_is_good() {
    let mut follower = follower_with_threshold(2.0, true, 0.5);
    let result = reconciled(follower.apply_remote(&sync(10, 2.5, PlaybackState::Playing)));
    assert_eq!(result.health, SyncHealth::Good);
    assert!(!result.seeked());
}

#[test]
fn applying_the_same_message_twice_is_idempotent() {
    let mut follower = follower_at(8.5, false);
    let message = sync(10, 10.0, PlaybackState::Playing);

    follower.apply_remote(&message);
    let calls_after_first = follower.engine().calls.len();
    let second = reconciled(follower.apply_remote(&message));

    assert!(second.actions.is_empty());
    assert_eq!(follower.engine().calls.len(), calls_after_first);
    assert_eq!(follower.health(), SyncHealth::Good);
}

#[test]
fn older_message_after_newer_one_is_discarded() {
    let mut follower = follower_at(0.0, false);

    let newer = sync(200, 20.0, PlaybackState::Paused);
    let older = sync(100, 10.0, PlaybackState::Playing);
    follower.apply_remote(&newer);

    let outcome = follower.apply_remote(&older);
    assert!(outcome.is_ignored());
    assert!(matches!(outcome, RemoteOutcome::Ignored(Rejection::Stale { .. })));
    assert!(follower.engine().is_paused());
    assert!((follower.position() - 20.0).abs() < f64::EPSILON);
}

#[test]
fn local_error_suppresses_catch_up_play_until_dismissed() {
    let mut follower = follower_at(5.0, false);
    follower.fault("decoder crashed");

    let result = reconciled(follower.apply_remote(&sync(10, 5.0, PlaybackState::Playing)));
    assert!(result.actions.is_empty());
    assert!(follower.engine().is_paused());
    assert!(follower.phase().is_error());

    follower.dismiss_fault();
    let result = reconciled(follower.apply_remote(&sync(20, 5.0, PlaybackState::Playing)));
    assert_eq!(result.actions, vec![ReconcileAction::Played]);
}

#[test]
fn new_media_is_loaded_before_reconciling_and_clears_error() {
    let mut follower = follower_at(30.0, true);
    follower.fault("network error");

    let message = SyncMessage::new(
        "master",
        10,
        0,
        MessagePayload::Sync {
            position: 0.0,
            state: PlaybackState::Playing,
            media_ref: "sequel.mp4".to_string(),
            quality: "4K".to_string(),
        },
    );
    let result = reconciled(follower.apply_remote(&message));

    assert_eq!(
        result.actions,
        vec![
            ReconcileAction::MediaSwapped("sequel.mp4".to_string()),
            ReconcileAction::Played,
        ]
    );
    assert_eq!(follower.media_ref(), Some("sequel.mp4"));
    assert_eq!(follower.quality(), "4K");
    assert!(!follower.phase().is_error());
}

#[test]
fn unloadable_media_faults_the_follower() {
    let mut follower = follower_at(3.0, true);
    let message = SyncMessage::new(
        "master",
        10,
        0,
        MessagePayload::Sync {
            position: 3.0,
            state: PlaybackState::Playing,
            media_ref: "broken:stream".to_string(),
            quality: "1080p".to_string(),
        },
    );

    let result = reconciled(follower.apply_remote(&message));
    assert!(matches!(
        result.actions.as_slice(),
        [ReconcileAction::MediaFailed(_)]
    ));
    assert!(follower.phase().is_error());
    assert_eq!(follower.media_ref(), None);
}

#[test]
fn second_master_in_same_epoch_is_fenced_off() {
    let mut follower = follower_at(0.0, false);
    follower.apply_remote(&sync_from("master", 0, 10, 0.0, PlaybackState::Paused));

    let impostor = sync_from("impostor", 0, 20, 50.0, PlaybackState::Playing);
    assert!(matches!(
        follower.apply_remote(&impostor),
        RemoteOutcome::Ignored(Rejection::ConflictingMaster { .. })
    ));
    assert_eq!(follower.recognized_master(), Some("master"));

    // A handoff to a newer epoch is honoured.
    let successor = sync_from("successor", 1, 5, 50.0, PlaybackState::Paused);
    assert!(matches!(
        follower.apply_remote(&successor),
        RemoteOutcome::Reconciled(_)
    ));
    assert_eq!(follower.recognized_master(), Some("successor"));
}

#[test]
fn follower_never_produces_outbound_messages() {
    let mut follower = follower_at(1.0, false);
    assert!(follower.play().is_none());
    assert!(follower.seek(4.0).is_none());
    assert!(follower.set_quality("480p").is_none());
    assert!(follower.heartbeat().is_none());
    assert!(follower.change_media("other.mp4").is_none());
    assert!(
        follower
            .outbound(MessagePayload::UrlChange {
                co_browse_ref: "https://example.org/".to_string()
            })
            .is_none()
    );
}
