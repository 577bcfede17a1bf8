//! Port for keeping the display awake during playback.

/// Why a display lock could not be taken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisplayLockError {
    /// The platform refused the request (policy or user setting).
    #[error("Display lock permission denied")]
    Denied,

    /// The platform has no display lock, or the surface is not visible.
    #[error("Display lock unavailable: {0}")]
    Unavailable(String),
}

/// Screen keep-awake lock. Acquired while playing, released otherwise.
pub trait DisplayLock: Send {
    fn acquire(&mut self) -> Result<(), DisplayLockError>;

    fn release(&mut self);

    fn is_held(&self) -> bool;
}

/// Display lock for headless contexts; always succeeds and holds nothing.
#[derive(Debug, Clone, Default)]
pub struct NoopDisplayLock {
    held: bool,
}

impl DisplayLock for NoopDisplayLock {
    fn acquire(&mut self) -> Result<(), DisplayLockError> {
        self.held = true;
        Ok(())
    }

    fn release(&mut self) {
        self.held = false;
    }

    fn is_held(&self) -> bool {
        self.held
    }
}
