//! Voice Activity Detection: decides whether the local user is speaking.
//!
//! Detection is plain RMS energy thresholding over each incoming frame, with
//! a release window for hysteresis: speech is asserted on the first loud
//! frame and held for `release_window` after the last one, so short pauses
//! between words do not make the ducked volume chatter.
//!
//! Time is carried by the frames themselves (each frame states its duration),
//! which keeps the detector a pure state machine that tests can drive with
//! synthetic audio.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use syncstream_core::SyncSettings;

/// VAD configuration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadConfig {
    /// RMS energy above which a frame counts as speech (default 0.02).
    pub energy_threshold: f32,

    /// How long speech is held after the last loud frame (ms, default 1500).
    pub release_window_ms: u64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: syncstream_core::settings::DEFAULT_SPEECH_ENERGY_THRESHOLD,
            release_window_ms: syncstream_core::settings::DEFAULT_RELEASE_WINDOW_MS,
        }
    }
}

impl VadConfig {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let release_window_ms = settings.effective_release_window().as_millis() as u64;
        Self {
            energy_threshold: settings.effective_speech_energy_threshold(),
            release_window_ms,
        }
    }

    const fn release_window(&self) -> Duration {
        Duration::from_millis(self.release_window_ms)
    }
}

/// Current VAD state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    /// No speech.
    Listening,

    /// The latest frame was loud.
    SpeechDetected,

    /// Energy dropped; speech is still held until the release deadline.
    Releasing,
}

/// Transitions emitted by the VAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    SpeechStart,
    SpeechEnd,
}

/// A block of microphone samples and the wall time it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub duration: Duration,
}

impl AudioFrame {
    pub const fn new(samples: Vec<f32>, duration: Duration) -> Self {
        Self { samples, duration }
    }

    /// A frame of digital silence.
    pub fn silence(sample_count: usize, duration: Duration) -> Self {
        Self::new(vec![0.0; sample_count], duration)
    }
}

/// Energy-based voice activity detector with release-window hysteresis.
#[derive(Debug, Clone)]
pub struct VoiceActivityDetector {
    state: VadState,
    config: VadConfig,
    /// Audio time processed so far.
    elapsed: Duration,
    /// Audio time at which a held speech state clears.
    release_at: Duration,
}

impl VoiceActivityDetector {
    pub const fn new(config: VadConfig) -> Self {
        Self {
            state: VadState::Listening,
            config,
            elapsed: Duration::ZERO,
            release_at: Duration::ZERO,
        }
    }

    /// Process one frame and return a transition, if any.
    pub fn process_frame(&mut self, frame: &AudioFrame) -> Option<VadEvent> {
        self.elapsed += frame.duration;

        let energy = calculate_rms_energy(&frame.samples);
        let is_loud = energy > self.config.energy_threshold;

        if is_loud {
            self.release_at = self.elapsed + self.config.release_window();
            let was_speaking = self.is_speaking();
            self.state = VadState::SpeechDetected;
            if !was_speaking {
                tracing::debug!(energy, "VAD: speech detected");
                return Some(VadEvent::SpeechStart);
            }
            return None;
        }

        match self.state {
            VadState::Listening => None,
            VadState::SpeechDetected | VadState::Releasing => {
                if self.elapsed >= self.release_at {
                    self.state = VadState::Listening;
                    tracing::debug!(
                        held_ms = self.config.release_window_ms,
                        "VAD: speech released"
                    );
                    Some(VadEvent::SpeechEnd)
                } else {
                    self.state = VadState::Releasing;
                    None
                }
            }
        }
    }

    /// Whether speech is currently asserted (detected or held).
    pub const fn is_speaking(&self) -> bool {
        !matches!(self.state, VadState::Listening)
    }

    /// Get the current VAD state.
    #[must_use]
    pub const fn state(&self) -> VadState {
        self.state
    }

    /// Forget any held speech and go back to listening.
    pub const fn reset(&mut self) {
        self.state = VadState::Listening;
        self.elapsed = Duration::ZERO;
        self.release_at = Duration::ZERO;
    }
}

/// Calculate RMS (Root Mean Square) energy of an audio frame.
pub fn calculate_rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();

    #[allow(clippy::cast_precision_loss)]
    let mean = sum_squares / samples.len() as f32;

    mean.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(10);

    fn loud() -> AudioFrame {
        AudioFrame::new(vec![0.5; 160], FRAME)
    }

    fn quiet() -> AudioFrame {
        AudioFrame::silence(160, FRAME)
    }

    #[test]
    fn vad_starts_in_listening_state() {
        let vad = VoiceActivityDetector::new(VadConfig::default());
        assert_eq!(vad.state(), VadState::Listening);
        assert!(!vad.is_speaking());
    }

    #[test]
    fn speech_is_asserted_on_first_loud_frame() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        assert_eq!(vad.process_frame(&loud()), Some(VadEvent::SpeechStart));
        assert_eq!(vad.process_frame(&loud()), None);
        assert!(vad.is_speaking());
    }

    #[test]
    fn loud_frame_during_release_extends_hold_without_new_start() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        vad.process_frame(&loud());
        for _ in 0..100 {
            assert_eq!(vad.process_frame(&quiet()), None);
        }
        assert_eq!(vad.state(), VadState::Releasing);

        // Speech resumes inside the window: no second SpeechStart.
        assert_eq!(vad.process_frame(&loud()), None);
        assert_eq!(vad.state(), VadState::SpeechDetected);

        // The hold restarts from the new loud frame.
        for _ in 0..149 {
            assert_eq!(vad.process_frame(&quiet()), None);
        }
        assert_eq!(vad.process_frame(&quiet()), Some(VadEvent::SpeechEnd));
    }

    #[test]
    fn silence_never_triggers() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        for _ in 0..500 {
            assert_eq!(vad.process_frame(&quiet()), None);
        }
        assert!(!vad.is_speaking());
    }

    #[test]
    fn zero_release_window_clears_on_next_quiet_frame() {
        let mut vad = VoiceActivityDetector::new(VadConfig {
            release_window_ms: 0,
            ..VadConfig::default()
        });
        vad.process_frame(&loud());
        assert_eq!(vad.process_frame(&quiet()), Some(VadEvent::SpeechEnd));
    }

    #[test]
    fn rms_energy_calculation() {
        // Silence
        let silence = vec![0.0f32; 100];
        assert!((calculate_rms_energy(&silence) - 0.0).abs() < f32::EPSILON);

        // Full-scale signal
        let full = vec![1.0f32; 100];
        assert!((calculate_rms_energy(&full) - 1.0).abs() < f32::EPSILON);

        // Empty
        assert!((calculate_rms_energy(&[]) - 0.0).abs() < f32::EPSILON);
    }
}
