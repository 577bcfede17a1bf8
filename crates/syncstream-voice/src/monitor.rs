//! Speech monitor: turns a microphone frame channel into speaking transitions.
//!
//! The monitor is policy-free: it only runs the VAD and yields `true`/`false`
//! when speech starts or is released. What to do with that (ducking) is up
//! to the caller.

use async_stream::stream;
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::vad::{AudioFrame, VadConfig, VadEvent, VoiceActivityDetector};

/// Continuous VAD over a live frame channel.
pub struct SpeechMonitor {
    vad: VoiceActivityDetector,
    cancel_token: CancellationToken,
}

impl SpeechMonitor {
    pub const fn new(config: VadConfig, cancel_token: CancellationToken) -> Self {
        Self {
            vad: VoiceActivityDetector::new(config),
            cancel_token,
        }
    }

    /// Start monitoring and return a stream of speaking transitions.
    ///
    /// Completes when the frame channel closes or the token is cancelled.
    /// If the microphone goes away while speech is held, a final `false` is
    /// yielded so nothing stays ducked.
    pub fn monitor(self, mut frames: mpsc::Receiver<AudioFrame>) -> impl Stream<Item = bool> {
        let mut vad = self.vad;
        let cancel_token = self.cancel_token;

        stream! {
            debug!("Starting speech monitor");

            loop {
                tokio::select! {
                    frame = frames.recv() => {
                        let Some(frame) = frame else {
                            debug!("Microphone stream ended");
                            if vad.is_speaking() {
                                yield false;
                            }
                            break;
                        };
                        match vad.process_frame(&frame) {
                            Some(VadEvent::SpeechStart) => yield true,
                            Some(VadEvent::SpeechEnd) => yield false,
                            None => {}
                        }
                    }
                    () = cancel_token.cancelled() => {
                        debug!("Speech monitor cancelled");
                        break;
                    }
                }
            }
        }
    }
}
