//! Ducking coordinator: the single point that decides playback volume.
//!
//! Three inputs feed the effective volume: the user's base volume, the mute
//! toggle and local voice activity. Whoever drives the media engine must take
//! its volume from here so speech ducking and user volume changes never
//! overwrite each other.

use syncstream_core::SyncSettings;

/// Effective volume for the given inputs.
///
/// Mute wins over everything; speech scales the base volume by `factor`.
pub fn effective_volume(base: f32, factor: f32, is_speaking: bool, muted: bool) -> f32 {
    if muted {
        0.0
    } else if is_speaking {
        base * factor
    } else {
        base
    }
}

/// Local-only volume control loop.
#[derive(Debug, Clone)]
pub struct DuckingCoordinator {
    base_volume: f32,
    ducking_factor: f32,
    muted: bool,
    is_speaking: bool,
    /// Volume most recently handed to the engine.
    applied: Option<f32>,
}

impl DuckingCoordinator {
    pub fn new(base_volume: f32, ducking_factor: f32) -> Self {
        Self {
            base_volume: base_volume.clamp(0.0, 1.0),
            ducking_factor: ducking_factor.clamp(0.0, 1.0),
            muted: false,
            is_speaking: false,
            applied: None,
        }
    }

    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self::new(
            settings.effective_default_volume(),
            settings.effective_ducking_factor(),
        )
    }

    pub fn effective_volume(&self) -> f32 {
        effective_volume(
            self.base_volume,
            self.ducking_factor,
            self.is_speaking,
            self.muted,
        )
    }

    pub const fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    pub const fn is_muted(&self) -> bool {
        self.muted
    }

    pub const fn base_volume(&self) -> f32 {
        self.base_volume
    }

    /// Set the user volume. Returns the new effective volume if it changed.
    pub fn set_base_volume(&mut self, volume: f32) -> Option<f32> {
        self.base_volume = volume.clamp(0.0, 1.0);
        self.take_change()
    }

    pub fn set_muted(&mut self, muted: bool) -> Option<f32> {
        self.muted = muted;
        self.take_change()
    }

    /// Feed a voice-activity transition.
    pub fn set_speaking(&mut self, is_speaking: bool) -> Option<f32> {
        if self.is_speaking != is_speaking {
            tracing::debug!(is_speaking, "Ducking input changed");
        }
        self.is_speaking = is_speaking;
        self.take_change()
    }

    /// Volume to apply right now, regardless of whether it changed.
    ///
    /// Used when a fresh engine (or freshly loaded media) needs the current
    /// level pushed once.
    pub fn current(&mut self) -> f32 {
        let volume = self.effective_volume();
        self.applied = Some(volume);
        volume
    }

    #[allow(clippy::float_cmp)]
    fn take_change(&mut self) -> Option<f32> {
        let volume = self.effective_volume();
        if self.applied == Some(volume) {
            return None;
        }
        self.applied = Some(volume);
        Some(volume)
    }
}
