//! Clock-driven media engine used by the CLI and tests.

use syncstream_core::{MediaEngine, MediaError};
use tokio::time::Instant;
use tracing::trace;

/// Media references starting with this prefix fail to open.
pub const BROKEN_MEDIA_PREFIX: &str = "broken:";

const DEFAULT_DURATION_SECS: f64 = 2.0 * 60.0 * 60.0;

/// A media engine with no decoder: position advances with the tokio clock
/// while playing, so paused-time tests control it exactly.
#[derive(Debug, Clone)]
pub struct SimulatedMediaEngine {
    media_ref: Option<String>,
    duration: f64,
    /// Position at `anchor`, or the frozen position while paused.
    base_position: f64,
    /// Set while playing.
    anchor: Option<Instant>,
    volume: f32,
    reject_play: bool,
}

impl Default for SimulatedMediaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedMediaEngine {
    pub const fn new() -> Self {
        Self::with_duration(DEFAULT_DURATION_SECS)
    }

    pub const fn with_duration(duration: f64) -> Self {
        Self {
            media_ref: None,
            duration,
            base_position: 0.0,
            anchor: None,
            volume: 1.0,
            reject_play: false,
        }
    }

    /// Make every subsequent `play` fail, like an autoplay policy would.
    pub const fn reject_play(&mut self, reject: bool) {
        self.reject_play = reject;
    }

    pub fn media_ref(&self) -> Option<&str> {
        self.media_ref.as_deref()
    }

    pub const fn volume(&self) -> f32 {
        self.volume
    }

    fn clamp(&self, position: f64) -> f64 {
        position.clamp(0.0, self.duration)
    }
}

impl MediaEngine for SimulatedMediaEngine {
    fn load(&mut self, media_ref: &str) -> Result<(), MediaError> {
        self.anchor = None;
        self.base_position = 0.0;
        if media_ref.trim().is_empty() || media_ref.starts_with(BROKEN_MEDIA_PREFIX) {
            self.media_ref = None;
            return Err(MediaError::OpenFailed {
                media_ref: media_ref.to_string(),
                reason: "unsupported source".to_string(),
            });
        }
        trace!(media_ref, "Simulated media loaded");
        self.media_ref = Some(media_ref.to_string());
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.media_ref.is_none() {
            return Err(MediaError::NotLoaded);
        }
        if self.reject_play {
            return Err(MediaError::PlayRejected("autoplay blocked".to_string()));
        }
        if self.anchor.is_none() {
            self.anchor = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.base_position = self.position();
        self.anchor = None;
    }

    fn seek(&mut self, position: f64) {
        self.base_position = self.clamp(position);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
    }

    fn position(&self) -> f64 {
        let elapsed = self
            .anchor
            .map_or(0.0, |anchor| anchor.elapsed().as_secs_f64());
        self.clamp(self.base_position + elapsed)
    }

    fn duration(&self) -> Option<f64> {
        self.media_ref.as_ref().map(|_| self.duration)
    }

    fn is_paused(&self) -> bool {
        self.anchor.is_none()
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }
}
