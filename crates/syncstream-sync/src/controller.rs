//! Sync controller: drift detection and catch-up.
//!
//! On the Master every local playback action produces a SYNC snapshot for
//! the session to publish. On a Follower each admitted SYNC is reconciled
//! against the local engine:
//!
//! 1. a different `mediaRef` is loaded first (which clears any error);
//! 2. drift is the absolute difference between local and remote position;
//! 3. health is LAGGING when drift exceeds the threshold, GOOD otherwise;
//! 4. remote PLAYING resumes a paused engine unless a local error is showing,
//!    remote PAUSED pauses a running one;
//! 5. independently, drift beyond the threshold seeks to the remote position.
//!
//! Engine failures are captured in the outcome and logged. They never abort
//! the session loop.

use std::sync::Arc;

use syncstream_core::{
    Clock, MediaEngine, MediaError, MessagePayload, NoopEmitter, PlaybackState, Role,
    RoleAssignment, RoomEvent, RoomEventEmitter, SyncHealth, SyncMessage, drift_between,
};
use tracing::{debug, info, warn};

use crate::fence::{InboundGate, Rejection, log_rejection};
use crate::playback::{PlaybackEvent, PlaybackPhase};
use crate::role::RoleController;

/// Quality label advertised before the Master picks one.
pub const DEFAULT_QUALITY: &str = "1080p";

/// Something the controller did to the engine while reconciling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    MediaSwapped(String),
    MediaFailed(String),
    Played,
    PlayRejected(String),
    Paused,
    Seeked,
}

/// Result of reconciling one SYNC message.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub drift: f64,
    pub health: SyncHealth,
    pub health_changed: bool,
    pub actions: Vec<ReconcileAction>,
}

impl Reconciliation {
    pub fn seeked(&self) -> bool {
        self.actions.contains(&ReconcileAction::Seeked)
    }
}

/// What happened to an inbound message.
#[derive(Debug)]
pub enum RemoteOutcome {
    /// Discarded before touching any state.
    Ignored(Rejection),
    /// A SYNC message was applied.
    Reconciled(Reconciliation),
    /// Admitted co-browse traffic, to be handed to the interaction relay.
    Forwarded,
}

impl RemoteOutcome {
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }
}

/// Owns the media engine and the local playback phase for one session.
pub struct SyncController<E> {
    user_id: String,
    role: RoleController,
    engine: E,
    clock: Arc<dyn Clock>,
    emitter: Arc<dyn RoomEventEmitter>,
    threshold: f64,
    phase: PlaybackPhase,
    media_ref: Option<String>,
    quality: String,
    health: SyncHealth,
    /// Timestamp of the last outbound message; keeps ours non-decreasing.
    last_sent: i64,
    gate: InboundGate,
}

impl<E: MediaEngine> SyncController<E> {
    pub fn new(
        user_id: impl Into<String>,
        assignment: RoleAssignment,
        engine: E,
        clock: Arc<dyn Clock>,
        threshold: f64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            role: RoleController::new(assignment),
            engine,
            clock,
            emitter: Arc::new(NoopEmitter),
            threshold,
            phase: PlaybackPhase::default(),
            media_ref: None,
            quality: DEFAULT_QUALITY.to_string(),
            health: SyncHealth::Good,
            last_sent: i64::MIN,
            gate: InboundGate::default(),
        }
    }

    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<dyn RoomEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub const fn role(&self) -> Role {
        self.role.role()
    }

    pub const fn role_controller(&self) -> &RoleController {
        &self.role
    }

    pub const fn health(&self) -> SyncHealth {
        self.health
    }

    pub const fn phase(&self) -> &PlaybackPhase {
        &self.phase
    }

    pub fn media_ref(&self) -> Option<&str> {
        self.media_ref.as_deref()
    }

    pub fn quality(&self) -> &str {
        &self.quality
    }

    pub fn position(&self) -> f64 {
        self.engine.position()
    }

    pub const fn engine(&self) -> &E {
        &self.engine
    }

    pub const fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Sender currently recognized as Master, as seen by a Follower.
    pub fn recognized_master(&self) -> Option<&str> {
        self.gate.master()
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    // ---- local actions ------------------------------------------------------

    /// Start playback. Blocked while an error is showing.
    pub fn play(&mut self) -> Option<SyncMessage> {
        if self.phase.is_error() {
            debug!(phase = %self.phase, "Play blocked by media error");
            return None;
        }
        if let Err(e) = self.engine.play() {
            warn!(error = %e, "Media engine refused to play");
            return None;
        }
        self.transition(PlaybackEvent::Play);
        self.snapshot()
    }

    pub fn pause(&mut self) -> Option<SyncMessage> {
        self.engine.pause();
        self.transition(PlaybackEvent::Pause);
        self.snapshot()
    }

    pub fn toggle_play(&mut self) -> Option<SyncMessage> {
        if self.phase.is_paused() {
            self.play()
        } else {
            self.pause()
        }
    }

    pub fn seek(&mut self, position: f64) -> Option<SyncMessage> {
        if !position.is_finite() {
            debug!(position, "Ignoring seek to non-finite position");
            return None;
        }
        self.engine.seek(position.max(0.0));
        self.snapshot()
    }

    /// Load a different resource. On the Master this also starts playback
    /// for everyone from the beginning.
    pub fn change_media(&mut self, media_ref: &str) -> Option<SyncMessage> {
        if let Err(e) = self.load(media_ref) {
            return self.fault(e.to_string());
        }
        self.engine.seek(0.0);
        if let Err(e) = self.engine.play() {
            warn!(error = %e, "Media engine refused to play new media");
        } else {
            self.transition(PlaybackEvent::Play);
        }
        let payload = MessagePayload::Sync {
            position: 0.0,
            state: self.phase.wire_state(),
            media_ref: media_ref.to_string(),
            quality: self.quality.clone(),
        };
        self.outbound(payload)
    }

    pub fn set_quality(&mut self, quality: &str) -> Option<SyncMessage> {
        quality.clone_into(&mut self.quality);
        self.snapshot()
    }

    /// The engine reported an error. The Master tells the room it paused.
    pub fn fault(&mut self, reason: impl Into<String>) -> Option<SyncMessage> {
        let reason = reason.into();
        warn!(%reason, "Media fault");
        self.engine.pause();
        self.transition(PlaybackEvent::Fault(reason.clone()));
        self.emitter.emit(RoomEvent::MediaFault { reason });
        self.snapshot()
    }

    /// Clear a showing error so reconciliation may resume playback.
    pub fn dismiss_fault(&mut self) {
        if self.phase.is_error() {
            self.transition(PlaybackEvent::Dismiss);
            self.emitter.emit(RoomEvent::FaultDismissed);
        }
    }

    pub fn stalled(&mut self) -> Option<SyncMessage> {
        self.transition(PlaybackEvent::Stalled);
        self.snapshot()
    }

    pub fn resumed(&mut self) -> Option<SyncMessage> {
        self.transition(PlaybackEvent::Resumed);
        self.snapshot()
    }

    /// Periodic snapshot. Nothing to say while no media is loaded.
    pub fn heartbeat(&mut self) -> Option<SyncMessage> {
        self.snapshot()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
    }

    /// Stamp and authorize an outbound payload.
    ///
    /// Returns `None` when the local role may not publish it.
    pub fn outbound(&mut self, payload: MessagePayload) -> Option<SyncMessage> {
        if !self.role.authorize(payload.kind()) {
            return None;
        }
        let timestamp = self.clock.now_millis().max(self.last_sent);
        self.last_sent = timestamp;
        Some(SyncMessage::new(
            self.user_id.clone(),
            timestamp,
            self.role.epoch(),
            payload,
        ))
    }

    fn snapshot(&mut self) -> Option<SyncMessage> {
        if !self.role.is_master() {
            return None;
        }
        let media_ref = self.media_ref.clone()?;
        let payload = MessagePayload::Sync {
            position: self.engine.position(),
            state: self.phase.wire_state(),
            media_ref,
            quality: self.quality.clone(),
        };
        self.outbound(payload)
    }

    // ---- inbound ------------------------------------------------------------

    /// Admit and, for SYNC, apply a message from another participant.
    pub fn apply_remote(&mut self, message: &SyncMessage) -> RemoteOutcome {
        if self.role.is_master() {
            return RemoteOutcome::Ignored(Rejection::NotFollower);
        }
        if let Err(rejection) = self.gate.admit(message) {
            log_rejection(&rejection);
            return RemoteOutcome::Ignored(rejection);
        }

        match &message.payload {
            MessagePayload::Sync {
                position,
                state,
                media_ref,
                quality,
            } => {
                quality.clone_into(&mut self.quality);
                RemoteOutcome::Reconciled(self.reconcile(*position, *state, media_ref))
            }
            MessagePayload::UrlChange { .. } | MessagePayload::BrowserAction { .. } => {
                RemoteOutcome::Forwarded
            }
        }
    }

    fn reconcile(&mut self, position: f64, state: PlaybackState, media_ref: &str) -> Reconciliation {
        let mut actions = Vec::new();

        if self.media_ref.as_deref() != Some(media_ref) {
            match self.load(media_ref) {
                Ok(()) => actions.push(ReconcileAction::MediaSwapped(media_ref.to_string())),
                Err(e) => {
                    let reason = e.to_string();
                    self.fault(reason.clone());
                    actions.push(ReconcileAction::MediaFailed(reason));
                    return Reconciliation {
                        drift: 0.0,
                        health: self.health,
                        health_changed: false,
                        actions,
                    };
                }
            }
        }

        let drift = drift_between(self.engine.position(), position);
        let health = SyncHealth::from_drift(drift, self.threshold);
        let health_changed = health != self.health;
        if health_changed {
            info!(%health, drift, "Sync health changed");
            self.health = health;
            self.emitter.emit(RoomEvent::HealthChanged { health, drift });
        }

        match state {
            PlaybackState::Playing if self.phase.is_paused() && !self.phase.is_error() => {
                match self.engine.play() {
                    Ok(()) => {
                        self.transition(PlaybackEvent::Play);
                        actions.push(ReconcileAction::Played);
                    }
                    Err(e) => {
                        warn!(error = %e, "Catch-up play rejected by media engine");
                        actions.push(ReconcileAction::PlayRejected(e.to_string()));
                    }
                }
            }
            PlaybackState::Paused if !self.phase.is_paused() => {
                self.engine.pause();
                self.transition(PlaybackEvent::Pause);
                actions.push(ReconcileAction::Paused);
            }
            _ => {}
        }

        if health.is_lagging() {
            debug!(from = self.engine.position(), to = position, "Seeking to master position");
            self.engine.seek(position);
            actions.push(ReconcileAction::Seeked);
        }

        Reconciliation {
            drift,
            health,
            health_changed,
            actions,
        }
    }

    fn load(&mut self, media_ref: &str) -> Result<(), MediaError> {
        if let Err(e) = self.engine.load(media_ref) {
            // The engine dropped whatever it had.
            self.media_ref = None;
            return Err(e);
        }
        info!(media_ref, "Media loaded");
        self.media_ref = Some(media_ref.to_string());
        self.transition(PlaybackEvent::MediaReplaced);
        self.emitter.emit(RoomEvent::MediaChanged {
            media_ref: media_ref.to_string(),
        });
        Ok(())
    }

    fn transition(&mut self, event: PlaybackEvent) {
        let before = self.phase.wire_state();
        self.phase = std::mem::take(&mut self.phase).apply(event);
        let after = self.phase.wire_state();
        if before != after {
            self.emitter.emit(RoomEvent::PlaybackChanged { state: after });
        }
    }
}

impl<E> std::fmt::Debug for SyncController<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("phase", &self.phase)
            .field("media_ref", &self.media_ref)
            .field("health", &self.health)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedMediaEngine;
    use syncstream_core::{ChannelEmitter, ManualClock};

    fn master() -> (SyncController<SimulatedMediaEngine>, ManualClock) {
        let clock = ManualClock::starting_at(1_000);
        let controller = SyncController::new(
            "master",
            RoleAssignment::master(0),
            SimulatedMediaEngine::new(),
            Arc::new(clock.clone()),
            0.8,
        );
        (controller, clock)
    }

    #[test]
    fn heartbeat_is_silent_without_media() {
        let (mut controller, _) = master();
        assert!(controller.heartbeat().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn media_change_broadcasts_playing_from_start() {
        let (mut controller, _) = master();
        let message = controller.change_media("movie.mp4").unwrap();
        assert_eq!(
            message.payload,
            MessagePayload::Sync {
                position: 0.0,
                state: PlaybackState::Playing,
                media_ref: "movie.mp4".to_string(),
                quality: DEFAULT_QUALITY.to_string(),
            }
        );
        assert_eq!(controller.phase(), &PlaybackPhase::Playing);
    }

    #[test]
    fn refused_play_on_media_change_broadcasts_paused() {
        let mut engine = SimulatedMediaEngine::new();
        engine.reject_play(true);
        let mut controller = SyncController::new(
            "master",
            RoleAssignment::master(0),
            engine,
            Arc::new(ManualClock::starting_at(1_000)),
            0.8,
        );

        let message = controller.change_media("movie.mp4").unwrap();
        assert!(matches!(
            message.payload,
            MessagePayload::Sync { state: PlaybackState::Paused, position, .. } if position.abs() < f64::EPSILON
        ));
        assert!(controller.phase().is_paused());

        let engine = controller.into_engine();
        assert_eq!(engine.media_ref(), Some("movie.mp4"));
        assert!(engine.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn outbound_timestamps_never_go_backwards() {
        let (mut controller, clock) = master();
        let first = controller.change_media("movie.mp4").unwrap();
        clock.set(10);
        let second = controller.heartbeat().unwrap();
        assert_eq!(second.timestamp, first.timestamp);
    }

    #[tokio::test(start_paused = true)]
    async fn master_fault_broadcasts_paused_and_blocks_play() {
        let (emitter, mut events) = ChannelEmitter::new();
        let (controller, _) = master();
        let mut controller = controller.with_emitter(Arc::new(emitter));
        controller.change_media("movie.mp4");

        let message = controller.fault("network error").unwrap();
        assert!(matches!(
            message.payload,
            MessagePayload::Sync { state: PlaybackState::Paused, .. }
        ));
        assert!(controller.play().is_none());

        controller.dismiss_fault();
        assert!(controller.play().is_some());

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen.contains(&RoomEvent::MediaFault {
            reason: "network error".to_string()
        }));
        assert!(seen.contains(&RoomEvent::FaultDismissed));
    }

    #[test]
    fn broken_media_on_master_faults() {
        let (mut controller, _) = master();
        let message = controller.change_media("broken:clip");
        assert!(controller.phase().is_error());
        // No media was loaded, so there is nothing to broadcast.
        assert!(message.is_none());
    }

    #[test]
    fn master_ignores_inbound() {
        let (mut controller, _) = master();
        let message = SyncMessage::new(
            "other",
            1,
            0,
            MessagePayload::UrlChange {
                co_browse_ref: "https://example.org".to_string(),
            },
        );
        assert!(matches!(
            controller.apply_remote(&message),
            RemoteOutcome::Ignored(Rejection::NotFollower)
        ));
    }
}
