//! Room session: one participant's event loop.
//!
//! A [`RoomSession`] owns everything a participant needs in a room: the room
//! handle, the sync controller and its media engine, the co-browse relay,
//! the ducking coordinator and, optionally, a microphone and a display lock.
//! [`RoomSession::run`] selects over inbound messages, heartbeat ticks
//! (Master only), local commands, speaking transitions and cancellation.
//! Each handler runs to completion before the next event is taken.

use std::collections::HashSet;
use std::sync::Arc;

use syncstream_core::{
    Advisory, Clock, DisplayLock, DisplayLockError, Interaction, MediaEngine, MessagePayload,
    NoopDisplayLock, NoopEmitter, PlaybackState, Role, RoleAssignment, RoomEvent,
    RoomEventEmitter, SyncHealth, SyncMessage, SyncSettings, SystemClock, validate_settings,
};
use syncstream_voice::{DuckingCoordinator, MicrophoneSource, SpeechMonitor, VadConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::channel::{MessageChannel, RoomHandle};
use crate::controller::{RemoteOutcome, SyncController};
use crate::error::SessionError;
use crate::heartbeat::{SpeechStream, heartbeat_interval, next_speech, next_tick};
use crate::playback::PlaybackPhase;
use crate::relay::{InteractionRelay, RelayUpdate};

/// Local user input fed to a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalCommand {
    Play,
    Pause,
    TogglePlay,
    Seek(f64),
    ChangeMedia(String),
    SetQuality(String),
    /// The media engine reported an error.
    Fault(String),
    DismissFault,
    Stalled,
    Resumed,
    SetVolume(f32),
    SetMuted(bool),
    Navigate(String),
    Back,
    Forward,
    Interact(Interaction),
    MicOn,
    MicOff,
}

/// Who joins which room, as whom.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub room_id: String,
    pub user_id: String,
    pub assignment: RoleAssignment,
    pub settings: SyncSettings,
}

impl SessionConfig {
    /// Join the configured default room with default settings.
    pub fn new(user_id: impl Into<String>, assignment: RoleAssignment) -> Self {
        let settings = SyncSettings::with_defaults();
        Self {
            room_id: settings.effective_room_id().to_string(),
            user_id: user_id.into(),
            assignment,
            settings,
        }
    }

    #[must_use]
    pub fn in_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = room_id.into();
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Final state of a session, returned when its loop ends.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub user_id: String,
    pub role: Role,
    pub health: SyncHealth,
    pub phase: PlaybackPhase,
    pub position: f64,
    pub media_ref: Option<String>,
    pub quality: String,
    pub location: Option<String>,
    pub volume: f32,
    /// Messages published.
    pub sent: u64,
    /// Messages received from other participants.
    pub received: u64,
    /// Received messages that were discarded.
    pub ignored: u64,
}

impl SessionReport {
    pub const fn state(&self) -> PlaybackState {
        self.phase.wire_state()
    }
}

/// Builder for [`RoomSession`].
pub struct SessionBuilder<E> {
    channel: MessageChannel,
    config: SessionConfig,
    engine: E,
    emitter: Arc<dyn RoomEventEmitter>,
    clock: Arc<dyn Clock>,
    display_lock: Box<dyn DisplayLock>,
    microphone: Option<Box<dyn MicrophoneSource>>,
}

impl<E: MediaEngine> SessionBuilder<E> {
    #[must_use]
    pub fn emitter(mut self, emitter: Arc<dyn RoomEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn display_lock(mut self, display_lock: Box<dyn DisplayLock>) -> Self {
        self.display_lock = display_lock;
        self
    }

    #[must_use]
    pub fn microphone(mut self, microphone: Box<dyn MicrophoneSource>) -> Self {
        self.microphone = Some(microphone);
        self
    }

    /// Validate the configuration and join the room.
    pub fn build(self) -> Result<RoomSession<E>, SessionError> {
        let SessionConfig {
            room_id,
            user_id,
            assignment,
            settings,
        } = self.config;

        if room_id.trim().is_empty() {
            return Err(SessionError::EmptyRoomId);
        }
        if user_id.trim().is_empty() {
            return Err(SessionError::EmptyUserId);
        }
        validate_settings(&settings)?;

        let controller = SyncController::new(
            user_id.clone(),
            assignment,
            self.engine,
            self.clock,
            settings.effective_sync_threshold(),
        )
        .with_emitter(Arc::clone(&self.emitter));

        let handle = self.channel.open(&room_id);
        info!(%room_id, %user_id, role = %assignment.role, epoch = assignment.epoch, "Joined room");

        Ok(RoomSession {
            room_id,
            handle,
            controller,
            relay: InteractionRelay::default(),
            ducking: DuckingCoordinator::from_settings(&settings),
            vad_config: VadConfig::from_settings(&settings),
            heartbeat_period: settings.effective_heartbeat_interval(),
            emitter: self.emitter,
            display_lock: self.display_lock,
            lock_denied: false,
            microphone: self.microphone,
            mic_token: None,
            speech: None,
            advisories: HashSet::new(),
            sent: 0,
            received: 0,
            ignored: 0,
        })
    }
}

/// One participant in one room.
pub struct RoomSession<E> {
    room_id: String,
    handle: RoomHandle,
    controller: SyncController<E>,
    relay: InteractionRelay,
    ducking: DuckingCoordinator,
    vad_config: VadConfig,
    heartbeat_period: std::time::Duration,
    emitter: Arc<dyn RoomEventEmitter>,
    display_lock: Box<dyn DisplayLock>,
    lock_denied: bool,
    microphone: Option<Box<dyn MicrophoneSource>>,
    mic_token: Option<CancellationToken>,
    speech: Option<SpeechStream>,
    advisories: HashSet<Advisory>,
    sent: u64,
    received: u64,
    ignored: u64,
}

impl<E: MediaEngine> RoomSession<E> {
    pub fn builder(channel: &MessageChannel, config: SessionConfig, engine: E) -> SessionBuilder<E> {
        SessionBuilder {
            channel: channel.clone(),
            config,
            engine,
            emitter: Arc::new(NoopEmitter),
            clock: Arc::new(SystemClock),
            display_lock: Box::new(NoopDisplayLock::default()),
            microphone: None,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub const fn controller(&self) -> &SyncController<E> {
        &self.controller
    }

    pub const fn relay(&self) -> &InteractionRelay {
        &self.relay
    }

    /// Run until cancelled. Resources are released before this returns.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<LocalCommand>,
        cancel: CancellationToken,
    ) -> SessionReport {
        self.emitter.emit(RoomEvent::SessionOpened {
            room_id: self.room_id.clone(),
            user_id: self.controller.user_id().to_string(),
            role: self.controller.role(),
        });
        let volume = self.ducking.current();
        self.controller.set_volume(volume);

        let mut heartbeat = self
            .controller
            .role_controller()
            .is_master()
            .then(|| heartbeat_interval(self.heartbeat_period));
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!(room_id = %self.room_id, "Session cancelled");
                    break;
                }
                message = self.handle.recv() => {
                    let Some(message) = message else { break };
                    self.on_remote(&message);
                }
                _ = next_tick(&mut heartbeat) => {
                    let message = self.controller.heartbeat();
                    self.publish(message);
                }
                command = commands.recv(), if commands_open => {
                    match command {
                        Some(command) => self.on_command(command, &cancel).await,
                        None => commands_open = false,
                    }
                }
                speaking = next_speech(&mut self.speech) => {
                    match speaking {
                        Some(is_speaking) => self.on_speaking(is_speaking),
                        None => {
                            debug!("Speech monitor finished");
                            self.speech = None;
                        }
                    }
                }
            }
            self.sync_display_lock();
        }

        self.teardown()
    }

    /// Spawn [`Self::run`] on the current runtime.
    pub fn spawn(self, cancel: CancellationToken) -> SessionTask
    where
        E: Send + 'static,
    {
        let (commands, receiver) = mpsc::unbounded_channel();
        let join = tokio::spawn(self.run(receiver, cancel.clone()));
        SessionTask {
            commands,
            cancel,
            join,
        }
    }

    fn publish(&mut self, message: Option<SyncMessage>) {
        let Some(message) = message else { return };
        trace!(kind = ?message.kind(), timestamp = message.timestamp, "Publishing");
        self.handle.publish(message);
        self.sent += 1;
    }

    fn on_remote(&mut self, message: &SyncMessage) {
        self.received += 1;
        match self.controller.apply_remote(message) {
            RemoteOutcome::Ignored(_) => self.ignored += 1,
            RemoteOutcome::Reconciled(reconciliation) => {
                trace!(drift = reconciliation.drift, actions = ?reconciliation.actions, "Reconciled");
            }
            RemoteOutcome::Forwarded => match self.relay.apply(message) {
                Some(RelayUpdate::Navigated(location)) => {
                    self.emitter.emit(RoomEvent::NavigationChanged { location });
                }
                Some(RelayUpdate::Mirrored(interaction)) => {
                    let (kind, payload) = interaction.into_parts();
                    self.emitter
                        .emit(RoomEvent::InteractionMirrored { kind, payload });
                }
                None => {}
            },
        }
    }

    async fn on_command(&mut self, command: LocalCommand, cancel: &CancellationToken) {
        debug!(?command, "Local command");
        let message = match command {
            LocalCommand::Play => self.controller.play(),
            LocalCommand::Pause => self.controller.pause(),
            LocalCommand::TogglePlay => self.controller.toggle_play(),
            LocalCommand::Seek(position) => self.controller.seek(position),
            LocalCommand::ChangeMedia(media_ref) => self.controller.change_media(&media_ref),
            LocalCommand::SetQuality(quality) => self.controller.set_quality(&quality),
            LocalCommand::Fault(reason) => self.controller.fault(reason),
            LocalCommand::DismissFault => {
                self.controller.dismiss_fault();
                None
            }
            LocalCommand::Stalled => self.controller.stalled(),
            LocalCommand::Resumed => self.controller.resumed(),
            LocalCommand::SetVolume(volume) => {
                let change = self.ducking.set_base_volume(volume);
                self.apply_volume(change);
                None
            }
            LocalCommand::SetMuted(muted) => {
                let change = self.ducking.set_muted(muted);
                self.apply_volume(change);
                None
            }
            LocalCommand::Navigate(target) => {
                let payload = self.relay.navigate(&target);
                self.outbound_navigation(payload)
            }
            LocalCommand::Back => {
                let payload = self.relay.back();
                self.outbound_navigation(payload)
            }
            LocalCommand::Forward => {
                let payload = self.relay.forward();
                self.outbound_navigation(payload)
            }
            LocalCommand::Interact(interaction) => {
                let payload = self.relay.capture(interaction);
                self.controller.outbound(payload)
            }
            LocalCommand::MicOn => {
                self.start_microphone(cancel).await;
                None
            }
            LocalCommand::MicOff => {
                self.stop_microphone();
                None
            }
        };
        self.publish(message);
    }

    fn outbound_navigation(
        &mut self,
        payload: Option<MessagePayload>,
    ) -> Option<SyncMessage> {
        let payload = payload?;
        if let Some(location) = self.relay.view().location() {
            self.emitter.emit(RoomEvent::NavigationChanged {
                location: location.to_string(),
            });
        }
        self.controller.outbound(payload)
    }

    fn on_speaking(&mut self, is_speaking: bool) {
        self.emitter.emit(RoomEvent::SpeakingChanged { is_speaking });
        let change = self.ducking.set_speaking(is_speaking);
        self.apply_volume(change);
    }

    fn apply_volume(&mut self, change: Option<f32>) {
        if let Some(volume) = change {
            self.controller.set_volume(volume);
            self.emitter.emit(RoomEvent::VolumeChanged { volume });
        }
    }

    async fn start_microphone(&mut self, cancel: &CancellationToken) {
        if self.speech.is_some() {
            debug!("Microphone already on");
            return;
        }
        let Some(microphone) = self.microphone.as_mut() else {
            warn!("No microphone source configured; ducking unavailable");
            return;
        };

        match microphone.open().await {
            Ok(frames) => {
                let token = cancel.child_token();
                let monitor = SpeechMonitor::new(self.vad_config, token.clone());
                self.speech = Some(Box::pin(monitor.monitor(frames)));
                self.mic_token = Some(token);
                info!("Microphone on");
            }
            Err(e) if e.is_permission_denied() => {
                warn!(error = %e, "Microphone refused; ducking disabled");
                self.advise(Advisory::MicrophoneDenied);
            }
            Err(e) => warn!(error = %e, "Failed to open microphone"),
        }
    }

    fn stop_microphone(&mut self) {
        if let Some(token) = self.mic_token.take() {
            token.cancel();
        }
        if let Some(microphone) = self.microphone.as_mut() {
            microphone.close();
        }
        if self.speech.take().is_some() {
            info!("Microphone off");
        }
        // Nothing may stay ducked once the microphone is gone.
        if self.ducking.is_speaking() {
            self.on_speaking(false);
        }
    }

    /// Hold the display lock while playback runs.
    fn sync_display_lock(&mut self) {
        let wants_lock = !self.controller.phase().is_paused();
        let held = self.display_lock.is_held();

        if wants_lock && !held && !self.lock_denied {
            match self.display_lock.acquire() {
                Ok(()) => debug!("Display lock acquired"),
                Err(DisplayLockError::Denied) => {
                    warn!("Display lock refused; screen may sleep during playback");
                    self.lock_denied = true;
                    self.advise(Advisory::DisplayLockDenied);
                }
                Err(e) => debug!(error = %e, "Display lock unavailable"),
            }
        } else if !wants_lock && held {
            self.display_lock.release();
            debug!("Display lock released");
        }
    }

    /// Emit an advisory at most once per session.
    fn advise(&mut self, advisory: Advisory) {
        if self.advisories.insert(advisory) {
            self.emitter.emit(RoomEvent::Advisory { advisory });
        }
    }

    fn teardown(mut self) -> SessionReport {
        self.handle.close();
        self.stop_microphone();
        if self.display_lock.is_held() {
            self.display_lock.release();
        }

        let report = SessionReport {
            user_id: self.controller.user_id().to_string(),
            role: self.controller.role(),
            health: self.controller.health(),
            phase: self.controller.phase().clone(),
            position: self.controller.position(),
            media_ref: self.controller.media_ref().map(str::to_string),
            quality: self.controller.quality().to_string(),
            location: self.relay.view().location().map(str::to_string),
            volume: self.ducking.effective_volume(),
            sent: self.sent,
            received: self.received,
            ignored: self.ignored,
        };

        self.emitter.emit(RoomEvent::SessionClosed {
            room_id: self.room_id.clone(),
        });
        info!(
            room_id = %self.room_id,
            sent = report.sent,
            received = report.received,
            ignored = report.ignored,
            "Left room"
        );
        report
    }
}

/// Handle to a spawned session.
#[derive(Debug)]
pub struct SessionTask {
    commands: mpsc::UnboundedSender<LocalCommand>,
    cancel: CancellationToken,
    join: JoinHandle<SessionReport>,
}

impl SessionTask {
    pub fn send(&self, command: LocalCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Closed)
    }

    pub fn commands(&self) -> mpsc::UnboundedSender<LocalCommand> {
        self.commands.clone()
    }

    /// Cancel the session and wait for its report.
    pub async fn shutdown(self) -> Result<SessionReport, SessionError> {
        self.cancel.cancel();
        Ok(self.join.await?)
    }
}

impl<E> std::fmt::Debug for RoomSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSession")
            .field("room_id", &self.room_id)
            .field("controller", &self.controller)
            .field("sent", &self.sent)
            .field("received", &self.received)
            .finish_non_exhaustive()
    }
}
