//! The announcement gate: every spoken sentence funnels through here.
//!
//! Last-value de-duplication only: a new announcement is compared against
//! the immediately previous one, not a history set, so a periodic loop
//! re-reporting an unchanged scene stays quiet while genuinely new
//! information always gets through.

use crate::capability::Speaker;
use crate::config::SpeechOptions;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// De-duplicating front door to the speech capability. One instance is
/// shared by every session of a coordinator, so de-duplication spans all of
/// them.
pub struct AnnouncementGate {
    speaker: Arc<dyn Speaker>,
    options: SpeechOptions,
    last_spoken: Mutex<String>,
}

impl AnnouncementGate {
    pub fn new(speaker: Arc<dyn Speaker>, options: SpeechOptions) -> Self {
        Self {
            speaker,
            options,
            last_spoken: Mutex::new(String::new()),
        }
    }

    /// Announce `text` unless it repeats the immediately previous
    /// announcement. Returns whether the speech capability was invoked.
    ///
    /// Empty or whitespace-only text is rejected without touching state: it
    /// is not a valid announcement and must not clobber the dedup memory.
    pub fn announce(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            debug!("announcement gate: empty text rejected");
            return false;
        }
        let mut last = self.last_spoken.lock().unwrap_or_else(PoisonError::into_inner);
        if *last == text {
            debug!(text, "announcement gate: duplicate suppressed");
            return false;
        }
        self.deliver(text);
        *last = text.to_string();
        true
    }

    /// Announce even if `text` repeats the previous announcement. Used by
    /// explicit user requests to re-hear something (e.g. the navigation
    /// "repeat" action), where suppression would defeat the purpose. Still
    /// rejects empty text and still updates the dedup state.
    pub fn announce_always(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            debug!("announcement gate: empty text rejected");
            return false;
        }
        let mut last = self.last_spoken.lock().unwrap_or_else(PoisonError::into_inner);
        self.deliver(text);
        *last = text.to_string();
        true
    }

    /// The sentence most recently handed to the speech capability, or empty.
    pub fn last_spoken(&self) -> String {
        self.last_spoken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the last announcement (e.g. when the speech surface restarts).
    pub fn reset(&self) {
        self.last_spoken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn deliver(&self, text: &str) {
        // Delivery failure must never corrupt session state or dedup memory.
        if let Err(e) = self.speaker.speak(text, &self.options) {
            warn!(error = %e, "speech capability failed; continuing");
        }
    }
}
