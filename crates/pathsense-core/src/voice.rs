//! Voice commands: a static phrase table, case-insensitive dispatch, and a
//! simulated listening flow.
//!
//! Recognition is isolated behind the `Recognizer` trait so a real STT
//! engine can replace the bundled timer-plus-random stand-in without
//! touching the matching or dispatch logic.

use crate::announce::AnnouncementGate;
use crate::capability::{EntropySource, HapticMotor};
use crate::error::{FeedbackError, FeedbackResult};
use crate::event::{emit, FeedbackEvent};
use crate::haptics;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Broad grouping of a command, for display surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    Navigation,
    Detection,
    Settings,
    Emergency,
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandCategory::Navigation => "navigation",
            CommandCategory::Detection => "detection",
            CommandCategory::Settings => "settings",
            CommandCategory::Emergency => "emergency",
        };
        f.write_str(s)
    }
}

/// One entry of the command table. The effect is data: a spoken response,
/// an optional vibration, and the outcome label recorded as the last
/// command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceCommand {
    pub id: String,
    /// Case-insensitive match key; unique within a table.
    pub phrase: String,
    pub description: String,
    pub category: CommandCategory,
    pub response: String,
    #[serde(default)]
    pub haptic: Option<Vec<u64>>,
    pub outcome: String,
}

impl VoiceCommand {
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: &str,
        phrase: &str,
        description: &str,
        category: CommandCategory,
        response: &str,
        haptic: Option<&[u64]>,
        outcome: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            phrase: phrase.to_string(),
            description: description.to_string(),
            category,
            response: response.to_string(),
            haptic: haptic.map(<[u64]>::to_vec),
            outcome: outcome.to_string(),
        }
    }
}

/// Immutable command table, validated at construction.
#[derive(Debug, Clone)]
pub struct CommandTable {
    commands: Vec<VoiceCommand>,
}

impl CommandTable {
    /// Build a table. Duplicate phrases (case-insensitive) and empty tables
    /// are configuration errors.
    pub fn new(commands: Vec<VoiceCommand>) -> FeedbackResult<Self> {
        if commands.is_empty() {
            return Err(FeedbackError::InvalidCommandTable(
                "table has no commands".to_string(),
            ));
        }
        for (i, a) in commands.iter().enumerate() {
            for b in &commands[i + 1..] {
                if a.phrase.eq_ignore_ascii_case(&b.phrase) {
                    return Err(FeedbackError::InvalidCommandTable(format!(
                        "duplicate phrase: {}",
                        a.phrase
                    )));
                }
            }
        }
        Ok(Self { commands })
    }

    /// The built-in table shipped with the app.
    pub fn builtin() -> Self {
        let commands = vec![
            VoiceCommand::new(
                "start-detection",
                "Start detection",
                "Begin object detection",
                CommandCategory::Detection,
                "Starting object detection",
                None,
                "Object detection started",
            ),
            VoiceCommand::new(
                "stop-detection",
                "Stop detection",
                "Stop object detection",
                CommandCategory::Detection,
                "Stopping object detection",
                None,
                "Object detection stopped",
            ),
            VoiceCommand::new(
                "navigate-forward",
                "Navigate forward",
                "Get directions ahead",
                CommandCategory::Navigation,
                "Path is clear ahead. Continue straight.",
                None,
                "Navigation: Continue straight",
            ),
            VoiceCommand::new(
                "navigate-left",
                "Turn left",
                "Navigate left",
                CommandCategory::Navigation,
                "Turn left. Door detected on your left in 3 meters.",
                Some(&[100, 50, 100]),
                "Navigation: Turn left",
            ),
            VoiceCommand::new(
                "navigate-right",
                "Turn right",
                "Navigate right",
                CommandCategory::Navigation,
                "Turn right. Stairs detected ahead on your right.",
                Some(&[100, 50, 100, 50, 100]),
                "Navigation: Turn right",
            ),
            VoiceCommand::new(
                "describe-environment",
                "Describe environment",
                "Get environment description",
                CommandCategory::Detection,
                "You are in a corridor. Door on the left, exit sign ahead, person walking towards you.",
                None,
                "Environment described",
            ),
            VoiceCommand::new(
                "read-signs",
                "Read signs",
                "Read nearby text and signs",
                CommandCategory::Detection,
                "Exit sign detected. Text reads: Emergency Exit, Keep Clear.",
                None,
                "Signs read aloud",
            ),
            VoiceCommand::new(
                "emergency-help",
                "Emergency help",
                "Activate emergency assistance",
                CommandCategory::Emergency,
                "Emergency mode activated. Stay calm. Vibration alerts enabled.",
                Some(haptics::EMERGENCY),
                "Emergency mode activated",
            ),
            VoiceCommand::new(
                "increase-volume",
                "Increase volume",
                "Make voice louder",
                CommandCategory::Settings,
                "Voice volume increased",
                None,
                "Volume increased",
            ),
            VoiceCommand::new(
                "decrease-volume",
                "Decrease volume",
                "Make voice quieter",
                CommandCategory::Settings,
                "Voice volume decreased",
                None,
                "Volume decreased",
            ),
        ];
        Self::new(commands).expect("built-in table is valid")
    }

    /// First command whose phrase matches, ignoring ASCII case.
    pub fn find(&self, phrase: &str) -> Option<&VoiceCommand> {
        let phrase = phrase.trim();
        self.commands
            .iter()
            .find(|c| c.phrase.eq_ignore_ascii_case(phrase))
    }

    pub fn get(&self, index: usize) -> Option<&VoiceCommand> {
        self.commands.get(index)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[VoiceCommand] {
        &self.commands
    }
}

/// "Recognize one utterance" against a table. Swap in a real STT engine
/// here; dispatch stays untouched.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize_utterance(&self, table: &CommandTable) -> FeedbackResult<String>;
}

/// Stand-in recognizer: waits a fixed window, then commits to a uniformly
/// random phrase from the table.
pub struct SimulatedRecognizer {
    entropy: Arc<dyn EntropySource>,
    delay_ms: u64,
}

impl SimulatedRecognizer {
    pub fn new(entropy: Arc<dyn EntropySource>, delay_ms: u64) -> Self {
        Self { entropy, delay_ms }
    }
}

#[async_trait]
impl Recognizer for SimulatedRecognizer {
    async fn recognize_utterance(&self, table: &CommandTable) -> FeedbackResult<String> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        let command = table
            .get(self.entropy.next_index(table.len()))
            .ok_or_else(|| FeedbackError::Recognition("command table is empty".to_string()))?;
        Ok(command.phrase.clone())
    }
}

struct VoiceShared {
    listening: bool,
    last_command: Option<String>,
    recognized_text: Option<String>,
    epoch: u64,
}

/// Dispatch core shared with the listening task.
struct DispatcherInner {
    table: CommandTable,
    gate: Arc<AnnouncementGate>,
    motor: Arc<dyn HapticMotor>,
    shared: Mutex<VoiceShared>,
    events: mpsc::UnboundedSender<FeedbackEvent>,
}

impl DispatcherInner {
    fn dispatch(&self, phrase: &str) -> bool {
        match self.table.find(phrase) {
            Some(command) => {
                info!(id = %command.id, "voice command matched");
                self.gate.announce(&command.response);
                if let Some(pattern) = &command.haptic {
                    self.fire(pattern);
                }
                let mut s = self.lock();
                s.last_command = Some(command.outcome.clone());
                emit(
                    &self.events,
                    FeedbackEvent::CommandDispatched {
                        outcome: command.outcome.clone(),
                        matched: true,
                        timestamp: Utc::now(),
                    },
                );
                true
            }
            None => {
                debug!(phrase, "voice command not recognized");
                self.gate.announce("Command not recognized. Please try again.");
                let mut s = self.lock();
                s.last_command = Some("Command not recognized".to_string());
                emit(
                    &self.events,
                    FeedbackEvent::CommandDispatched {
                        outcome: "Command not recognized".to_string(),
                        matched: false,
                        timestamp: Utc::now(),
                    },
                );
                false
            }
        }
    }

    fn fire(&self, pattern: &[u64]) {
        if let Err(e) = self.motor.vibrate(pattern) {
            warn!(error = %e, "haptic capability failed; continuing");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VoiceShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Matches recognized phrases against the table and runs the listening
/// lifecycle.
pub struct CommandDispatcher {
    inner: Arc<DispatcherInner>,
    recognizer: Arc<dyn Recognizer>,
    listen_task: Option<JoinHandle<()>>,
}

impl CommandDispatcher {
    pub fn new(
        table: CommandTable,
        gate: Arc<AnnouncementGate>,
        motor: Arc<dyn HapticMotor>,
        recognizer: Arc<dyn Recognizer>,
        events: mpsc::UnboundedSender<FeedbackEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                table,
                gate,
                motor,
                shared: Mutex::new(VoiceShared {
                    listening: false,
                    last_command: None,
                    recognized_text: None,
                    epoch: 0,
                }),
                events,
            }),
            recognizer,
            listen_task: None,
        }
    }

    /// Match `phrase` case-insensitively and run the command's effect.
    /// Unknown phrases announce the not-recognized fallback and return
    /// false.
    pub fn dispatch(&self, phrase: &str) -> bool {
        self.inner.dispatch(phrase)
    }

    /// Enter the listening state and let the recognizer commit one
    /// utterance, which is then dispatched. No-op while already listening.
    pub fn start_listening(&mut self) {
        let epoch;
        {
            let mut s = self.inner.lock();
            if s.listening {
                debug!("already listening; start ignored");
                return;
            }
            s.listening = true;
            s.recognized_text = None;
            s.epoch += 1;
            epoch = s.epoch;
            self.inner.gate.announce("Listening for voice commands");
            self.inner.fire(haptics::LISTEN_START);
            emit(
                &self.inner.events,
                FeedbackEvent::ListeningStarted { timestamp: Utc::now() },
            );
        }
        info!("listening for voice commands");

        if let Some(task) = self.listen_task.take() {
            task.abort();
        }
        let inner = Arc::clone(&self.inner);
        let recognizer = Arc::clone(&self.recognizer);
        self.listen_task = Some(tokio::spawn(async move {
            let phrase = match recognizer.recognize_utterance(&inner.table).await {
                Ok(phrase) => phrase,
                Err(e) => {
                    warn!(error = %e, "recognition failed");
                    let mut s = inner.lock();
                    if s.listening && s.epoch == epoch {
                        s.listening = false;
                    }
                    return;
                }
            };
            {
                let mut s = inner.lock();
                if !s.listening || s.epoch != epoch {
                    debug!("recognition result discarded after stop");
                    return;
                }
                s.listening = false;
                s.recognized_text = Some(phrase.clone());
            }
            emit(
                &inner.events,
                FeedbackEvent::UtteranceRecognized {
                    phrase: phrase.clone(),
                    timestamp: Utc::now(),
                },
            );
            inner.dispatch(&phrase);
        }));
    }

    /// Leave the listening state, discarding any in-flight recognition.
    /// No-op while not listening.
    pub fn stop_listening(&mut self) {
        {
            let mut s = self.inner.lock();
            if !s.listening {
                debug!("not listening; stop ignored");
                return;
            }
            s.listening = false;
            s.epoch += 1;
            self.inner.gate.announce("Stopped listening");
            self.inner.fire(haptics::LISTEN_STOP);
            emit(
                &self.inner.events,
                FeedbackEvent::ListeningStopped { timestamp: Utc::now() },
            );
        }
        if let Some(task) = self.listen_task.take() {
            task.abort();
        }
        info!("stopped listening");
    }

    pub fn is_listening(&self) -> bool {
        self.inner.lock().listening
    }

    /// Outcome label of the most recent dispatch, if any.
    pub fn last_command(&self) -> Option<String> {
        self.inner.lock().last_command.clone()
    }

    /// Phrase committed by the most recent recognition, if any.
    pub fn recognized_text(&self) -> Option<String> {
        self.inner.lock().recognized_text.clone()
    }

    pub fn table(&self) -> &CommandTable {
        &self.inner.table
    }
}

impl Drop for CommandDispatcher {
    fn drop(&mut self) {
        if let Some(task) = self.listen_task.take() {
            task.abort();
        }
    }
}
