//! Interaction relay: the co-browsing surface.
//!
//! The Master captures navigation targets and gestures and turns them into
//! URL_CHANGE / BROWSER_ACTION payloads. Followers write what they receive
//! straight into their [`CoBrowseView`]; there is no drift correction for
//! co-browse state, the latest admitted message simply wins.

use syncstream_core::{Interaction, MessagePayload, SyncMessage};
use tracing::debug;
use url::Url;

const MIN_TARGET_LEN: usize = 4;

/// Oldest entries are dropped beyond this many.
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Why a navigation target was dropped.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("navigation target '{0}' is too short")]
    TooShort(String),

    #[error("navigation target '{target}' is not a valid URL: {source}")]
    Invalid {
        target: String,
        #[source]
        source: url::ParseError,
    },
}

/// Turn user input into an absolute URL.
///
/// Input is trimmed, `https://` is assumed when no http(s) scheme is given,
/// and the result must parse as a URL.
pub fn normalize_target(raw: &str) -> Result<String, NavigationError> {
    let trimmed = raw.trim();
    if trimmed.len() < MIN_TARGET_LEN || trimmed == "https://" || trimmed == "http://" {
        return Err(NavigationError::TooShort(trimmed.to_string()));
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    Url::parse(&candidate)
        .map(String::from)
        .map_err(|source| NavigationError::Invalid {
            target: trimmed.to_string(),
            source,
        })
}

/// Back/forward list of visited locations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationHistory {
    entries: Vec<String>,
    index: usize,
}

impl NavigationHistory {
    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.index).map(String::as_str)
    }

    /// Record a visit. Revisiting the current entry is a no-op; visiting
    /// anything else drops the forward entries.
    pub fn push(&mut self, location: &str) -> bool {
        if self.current() == Some(location) {
            return false;
        }
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push(location.to_string());
        if self.entries.len() > MAX_HISTORY_ENTRIES {
            let excess = self.entries.len() - MAX_HISTORY_ENTRIES;
            self.entries.drain(..excess);
        }
        self.index = self.entries.len() - 1;
        true
    }

    /// Follow a navigation made elsewhere. Arriving at the entry directly
    /// behind or ahead of the current one moves through the history instead
    /// of recording a new visit.
    pub fn follow(&mut self, location: &str) -> bool {
        if self.current() == Some(location) {
            return false;
        }
        if self.can_go_back() && self.entries[self.index - 1] == location {
            self.index -= 1;
            return true;
        }
        if self.can_go_forward() && self.entries[self.index + 1] == location {
            self.index += 1;
            return true;
        }
        self.push(location)
    }

    pub fn back(&mut self) -> Option<&str> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.current()
    }

    pub fn forward(&mut self) -> Option<&str> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.current()
    }

    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Local state of the co-browsing surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoBrowseView {
    pub history: NavigationHistory,
    pub last_interaction: Option<Interaction>,
    pub scroll_offset: f64,
}

impl CoBrowseView {
    pub fn location(&self) -> Option<&str> {
        self.history.current()
    }

    fn record(&mut self, interaction: Interaction) {
        if let Interaction::Scroll { y } = interaction {
            self.scroll_offset = y;
        }
        self.last_interaction = Some(interaction);
    }

    fn arrive(&mut self) {
        self.scroll_offset = 0.0;
        self.last_interaction = None;
    }
}

/// What a Follower changed on its view.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayUpdate {
    Navigated(String),
    Mirrored(Interaction),
}

/// Captures (Master) and mirrors (Follower) co-browse traffic.
#[derive(Debug, Clone, Default)]
pub struct InteractionRelay {
    view: CoBrowseView,
}

impl InteractionRelay {
    pub const fn view(&self) -> &CoBrowseView {
        &self.view
    }

    /// Navigate locally and produce the payload to broadcast.
    ///
    /// Invalid targets are dropped.
    pub fn navigate(&mut self, raw: &str) -> Option<MessagePayload> {
        let target = match normalize_target(raw) {
            Ok(target) => target,
            Err(e) => {
                debug!(error = %e, "Navigation dropped");
                return None;
            }
        };
        if self.view.history.push(&target) {
            self.view.arrive();
        }
        Some(MessagePayload::UrlChange {
            co_browse_ref: target,
        })
    }

    pub fn back(&mut self) -> Option<MessagePayload> {
        let target = self.view.history.back()?.to_string();
        self.view.arrive();
        Some(MessagePayload::UrlChange {
            co_browse_ref: target,
        })
    }

    pub fn forward(&mut self) -> Option<MessagePayload> {
        let target = self.view.history.forward()?.to_string();
        self.view.arrive();
        Some(MessagePayload::UrlChange {
            co_browse_ref: target,
        })
    }

    /// Record a local gesture and produce the payload to broadcast.
    pub fn capture(&mut self, interaction: Interaction) -> MessagePayload {
        self.view.record(interaction);
        MessagePayload::browser_action(interaction)
    }

    /// Apply an admitted co-browse message from the Master.
    pub fn apply(&mut self, message: &SyncMessage) -> Option<RelayUpdate> {
        match &message.payload {
            MessagePayload::UrlChange { co_browse_ref } => {
                let target = normalize_target(co_browse_ref)
                    .inspect_err(|e| debug!(error = %e, "Remote navigation dropped"))
                    .ok()?;
                if !self.view.history.follow(&target) {
                    return None;
                }
                self.view.arrive();
                Some(RelayUpdate::Navigated(target))
            }
            MessagePayload::BrowserAction { .. } => {
                let interaction = message
                    .interaction()
                    .inspect_err(|e| debug!(error = %e, "Remote interaction dropped"))
                    .ok()
                    .flatten()?;
                self.view.record(interaction);
                Some(RelayUpdate::Mirrored(interaction))
            }
            MessagePayload::Sync { .. } => None,
        }
    }
}
