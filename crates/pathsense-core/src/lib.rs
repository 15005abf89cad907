//! # pathsense-core - Multi-Modal Feedback Coordinator
//!
//! Decides what to announce, when, in what order, and with which vibration
//! pattern, for three session kinds: simulated object detection, indoor
//! turn-by-turn navigation, and voice commands. Real sensors, TTS, and the
//! vibration motor live outside this crate, behind capability traits.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                    Feedback Coordinator                       │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────┐    │
//! │  │ Detection   │  │ Navigation   │  │ Command Dispatcher │    │
//! │  │ (tick loop) │  │ (step walk)  │  │ (listen + match)   │    │
//! │  └──────┬──────┘  └──────┬───────┘  └─────────┬──────────┘    │
//! │         └────────────────┼────────────────────┘               │
//! │                          ↓                                    │
//! │        ┌──────────────────────────────────────┐               │
//! │        │ Announcement Gate (last-value dedup) │→ Speaker      │
//! │        │ Haptic patterns (closed enums)       │→ HapticMotor  │
//! │        └──────────────────────────────────────┘               │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod announce;
pub mod capability;
pub mod config;
pub mod coordinator;
pub mod detection;
pub mod error;
pub mod event;
pub mod haptics;
pub mod navigation;
pub mod voice;

pub use announce::AnnouncementGate;
pub use capability::{
    EntropySource, HapticMotor, NullMotor, NullSpeaker, RecordingMotor, RecordingSpeaker,
    ScriptedEntropy, Speaker, SystemEntropy,
};
pub use config::{
    DetectionConfig, FeedbackConfig, NavigationConfig, SpeechOptions, VoiceConfig,
};
pub use coordinator::FeedbackCoordinator;
pub use detection::{
    DetectedObject, DetectionSession, Detector, ObjectCategory, ScreenPosition, SimulatedDetector,
};
pub use error::{FeedbackError, FeedbackResult};
pub use event::FeedbackEvent;
pub use haptics::{Direction, Proximity};
pub use navigation::{
    Destination, NavigationSession, NavigationStep, Route, QUICK_DESTINATIONS,
};
pub use voice::{
    CommandCategory, CommandDispatcher, CommandTable, Recognizer, SimulatedRecognizer,
    VoiceCommand,
};
