//! Error types for the feedback coordinator

use thiserror::Error;

/// Result type alias for feedback operations
pub type FeedbackResult<T> = Result<T, FeedbackError>;

/// Errors that can occur while coordinating feedback.
///
/// Capability failures (speech, haptics) are logged and tolerated by the
/// sessions; they never halt a state machine. The remaining variants surface
/// construction-time problems (bad tables, bad config).
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Speech capability error: {0}")]
    Speech(String),

    #[error("Haptic capability error: {0}")]
    Haptic(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Invalid command table: {0}")]
    InvalidCommandTable(String),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel send error: {0}")]
    ChannelSend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
