//! The coordinator: one gate, one motor, three sessions.
//!
//! Wires the shared announcement gate and haptic capability into the
//! detection, navigation, and voice sessions, and hands the caller the
//! event stream they all publish to.

use crate::announce::AnnouncementGate;
use crate::capability::{EntropySource, HapticMotor, Speaker, SystemEntropy};
use crate::config::FeedbackConfig;
use crate::detection::{Detector, DetectionSession, SimulatedDetector};
use crate::error::FeedbackResult;
use crate::event::FeedbackEvent;
use crate::navigation::{NavigationSession, Route};
use crate::voice::{CommandDispatcher, CommandTable, Recognizer, SimulatedRecognizer};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// All sessions of one coordinator instance. Every announcement funnels
/// through the single shared gate, so de-duplication spans sessions.
pub struct FeedbackCoordinator {
    gate: Arc<AnnouncementGate>,
    pub detection: DetectionSession,
    pub navigation: NavigationSession,
    pub voice: CommandDispatcher,
}

impl FeedbackCoordinator {
    /// Wire a coordinator from explicit collaborators. Returns the event
    /// receiver alongside it.
    pub fn new(
        config: FeedbackConfig,
        speaker: Arc<dyn Speaker>,
        motor: Arc<dyn HapticMotor>,
        detector: Arc<dyn Detector>,
        recognizer: Arc<dyn Recognizer>,
        route: Route,
        table: CommandTable,
    ) -> FeedbackResult<(Self, mpsc::UnboundedReceiver<FeedbackEvent>)> {
        config.validate()?;
        let gate = Arc::new(AnnouncementGate::new(speaker, config.speech.clone()));
        let (events, event_rx) = mpsc::unbounded_channel();

        let detection = DetectionSession::new(
            config.detection.clone(),
            Arc::clone(&gate),
            Arc::clone(&motor),
            detector,
            events.clone(),
        );
        let navigation = NavigationSession::new(
            route,
            config.navigation.clone(),
            Arc::clone(&gate),
            Arc::clone(&motor),
            events.clone(),
        );
        let voice = CommandDispatcher::new(
            table,
            Arc::clone(&gate),
            Arc::clone(&motor),
            recognizer,
            events,
        );

        info!("feedback coordinator ready");
        Ok((
            Self {
                gate,
                detection,
                navigation,
                voice,
            },
            event_rx,
        ))
    }

    /// Stock simulated stack: system entropy behind the bundled detector
    /// and recognizer, the built-in route and command table.
    pub fn simulated(
        config: FeedbackConfig,
        speaker: Arc<dyn Speaker>,
        motor: Arc<dyn HapticMotor>,
    ) -> FeedbackResult<(Self, mpsc::UnboundedReceiver<FeedbackEvent>)> {
        let entropy: Arc<dyn EntropySource> = Arc::new(SystemEntropy);
        let detector = Arc::new(SimulatedDetector::new(
            Arc::clone(&entropy),
            config.detection.clone(),
        ));
        let recognizer = Arc::new(SimulatedRecognizer::new(
            entropy,
            config.voice.recognition_delay_ms,
        ));
        Self::new(
            config,
            speaker,
            motor,
            detector,
            recognizer,
            Route::default_indoor(),
            CommandTable::builtin(),
        )
    }

    /// The shared announcement gate (e.g. for a UI to show the last
    /// spoken sentence).
    pub fn gate(&self) -> &Arc<AnnouncementGate> {
        &self.gate
    }
}
