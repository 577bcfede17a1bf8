//! Microphone source port and a scripted implementation.
//!
//! A [`MicrophoneSource`] hands out a channel of [`AudioFrame`]s once opened.
//! Real capture backends live outside this crate; [`ScriptedMicrophone`]
//! replays a fixed sequence of frames at their natural pace, which is what
//! the demo and the tests use.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::VoiceError;
use crate::vad::AudioFrame;

/// Frames buffered between capture and detection.
const FRAME_BUFFER: usize = 256;

/// Live microphone amplitude stream.
#[async_trait]
pub trait MicrophoneSource: Send {
    /// Start capturing. Fails with [`VoiceError::MicrophonePermissionDenied`]
    /// when the user refuses access.
    async fn open(&mut self) -> Result<mpsc::Receiver<AudioFrame>, VoiceError>;

    /// Stop capturing and release the device.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Microphone that replays a fixed script of frames.
#[derive(Debug, Default)]
pub struct ScriptedMicrophone {
    frames: Vec<AudioFrame>,
    denied: bool,
    task: Option<JoinHandle<()>>,
}

impl ScriptedMicrophone {
    pub const fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames,
            denied: false,
            task: None,
        }
    }

    /// A microphone whose permission prompt is always refused.
    pub const fn denied() -> Self {
        Self {
            frames: Vec::new(),
            denied: true,
            task: None,
        }
    }
}

#[async_trait]
impl MicrophoneSource for ScriptedMicrophone {
    async fn open(&mut self) -> Result<mpsc::Receiver<AudioFrame>, VoiceError> {
        if self.denied {
            return Err(VoiceError::MicrophonePermissionDenied);
        }
        if self.is_open() {
            return Err(VoiceError::AlreadyActive);
        }

        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        let frames = std::mem::take(&mut self.frames);
        tracing::debug!(frames = frames.len(), "Scripted microphone opened");

        self.task = Some(tokio::spawn(async move {
            for frame in frames {
                // A frame becomes available once the time it covers has passed.
                tokio::time::sleep(frame.duration).await;
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        }));
        Ok(rx)
    }

    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Scripted microphone closed");
        }
    }

    fn is_open(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ScriptedMicrophone {
    fn drop(&mut self) {
        self.close();
    }
}
