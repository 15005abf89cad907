//! Events emitted by the sessions for an observing UI.
//!
//! Delivery is best-effort over an unbounded channel; a dropped receiver
//! never affects session state.

use crate::detection::DetectedObject;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Everything a screen needs to mirror what the coordinator announced.
#[derive(Debug, Clone, Serialize)]
pub enum FeedbackEvent {
    DetectionStarted {
        timestamp: DateTime<Utc>,
    },
    ObjectDetected {
        object: DetectedObject,
        timestamp: DateTime<Utc>,
    },
    DetectionStopped {
        timestamp: DateTime<Utc>,
    },
    NavigationStarted {
        destination: String,
        timestamp: DateTime<Utc>,
    },
    StepAdvanced {
        ordinal: usize,
        timestamp: DateTime<Utc>,
    },
    Arrived {
        destination: String,
        timestamp: DateTime<Utc>,
    },
    NavigationStopped {
        timestamp: DateTime<Utc>,
    },
    ListeningStarted {
        timestamp: DateTime<Utc>,
    },
    UtteranceRecognized {
        phrase: String,
        timestamp: DateTime<Utc>,
    },
    CommandDispatched {
        outcome: String,
        matched: bool,
        timestamp: DateTime<Utc>,
    },
    ListeningStopped {
        timestamp: DateTime<Utc>,
    },
}

/// Send an event, tolerating a dropped receiver.
pub(crate) fn emit(tx: &mpsc::UnboundedSender<FeedbackEvent>, event: FeedbackEvent) {
    if tx.send(event).is_err() {
        debug!("feedback event receiver dropped");
    }
}
