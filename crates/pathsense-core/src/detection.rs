//! Object detection session: a periodic sampling loop with spoken and
//! haptic feedback.
//!
//! The sampling source sits behind the `Detector` trait; the bundled
//! `SimulatedDetector` draws randomized stand-ins until a real vision
//! pipeline is substituted. Each tick *replaces* the current detection
//! list; stale sightings are discarded, never merged.

use crate::announce::AnnouncementGate;
use crate::capability::{EntropySource, HapticMotor};
use crate::config::DetectionConfig;
use crate::event::{emit, FeedbackEvent};
use crate::haptics::Proximity;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What kind of thing the sampler saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectCategory {
    Door,
    Stairs,
    Obstacle,
    Person,
    Sign,
}

impl ObjectCategory {
    pub const ALL: [ObjectCategory; 5] = [
        ObjectCategory::Door,
        ObjectCategory::Stairs,
        ObjectCategory::Obstacle,
        ObjectCategory::Person,
        ObjectCategory::Sign,
    ];
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectCategory::Door => "door",
            ObjectCategory::Stairs => "stairs",
            ObjectCategory::Obstacle => "obstacle",
            ObjectCategory::Person => "person",
            ObjectCategory::Sign => "sign",
        };
        f.write_str(s)
    }
}

/// Where on the frame the object was seen, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPosition {
    pub x: f64,
    pub y: f64,
}

/// One sighting, valid for a single tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedObject {
    pub id: Uuid,
    pub category: ObjectCategory,
    /// Detector confidence in [0, 1].
    pub confidence: f64,
    pub position: ScreenPosition,
    pub proximity: Proximity,
}

impl DetectedObject {
    /// The sentence announced for this sighting. `near` reads as
    /// "very close"; the other buckets read as their own name.
    pub fn announcement(&self) -> String {
        let proximity = match self.proximity {
            Proximity::Near => "very close",
            Proximity::Medium => "medium",
            Proximity::Far => "far",
        };
        format!("{} detected {} ahead", self.category, proximity)
    }
}

/// Sampling source: zero or one sighting per tick.
pub trait Detector: Send + Sync {
    fn sample(&self) -> Option<DetectedObject>;
}

/// Randomized stand-in for a vision pipeline. Draw order per sample:
/// Bernoulli gate, category, confidence, position x, position y, proximity.
pub struct SimulatedDetector {
    entropy: Arc<dyn EntropySource>,
    config: DetectionConfig,
}

/// Simulated confidence floor; draws land in [0.7, 1.0).
const CONFIDENCE_FLOOR: f64 = 0.7;

impl SimulatedDetector {
    pub fn new(entropy: Arc<dyn EntropySource>, config: DetectionConfig) -> Self {
        Self { entropy, config }
    }
}

impl Detector for SimulatedDetector {
    fn sample(&self) -> Option<DetectedObject> {
        if self.entropy.next_f64() >= self.config.detection_probability {
            return None;
        }
        let category = ObjectCategory::ALL[self.entropy.next_index(ObjectCategory::ALL.len())];
        let confidence = CONFIDENCE_FLOOR + self.entropy.next_f64() * (1.0 - CONFIDENCE_FLOOR);
        let position = ScreenPosition {
            x: self.entropy.next_f64() * self.config.frame_width,
            y: self.entropy.next_f64() * self.config.frame_height,
        };
        let proximity = Proximity::ALL[self.entropy.next_index(Proximity::ALL.len())];
        Some(DetectedObject {
            id: Uuid::new_v4(),
            category,
            confidence,
            position,
            proximity,
        })
    }
}

struct DetectionShared {
    running: bool,
    current: Vec<DetectedObject>,
}

/// Stopped ⇄ Running session driving the periodic sampling loop.
///
/// The tick body and `stop()` both run under the session lock, so once
/// `stop()` returns no tick can announce or mutate the detection list.
pub struct DetectionSession {
    config: DetectionConfig,
    gate: Arc<AnnouncementGate>,
    motor: Arc<dyn HapticMotor>,
    detector: Arc<dyn Detector>,
    shared: Arc<Mutex<DetectionShared>>,
    events: mpsc::UnboundedSender<FeedbackEvent>,
    loop_task: Option<JoinHandle<()>>,
}

impl DetectionSession {
    pub fn new(
        config: DetectionConfig,
        gate: Arc<AnnouncementGate>,
        motor: Arc<dyn HapticMotor>,
        detector: Arc<dyn Detector>,
        events: mpsc::UnboundedSender<FeedbackEvent>,
    ) -> Self {
        Self {
            config,
            gate,
            motor,
            detector,
            shared: Arc::new(Mutex::new(DetectionShared {
                running: false,
                current: Vec::new(),
            })),
            events,
            loop_task: None,
        }
    }

    /// Begin the periodic sampling loop. No-op when already running; a
    /// second loop must never exist.
    pub fn start(&mut self) {
        {
            let mut shared = lock(&self.shared);
            if shared.running {
                debug!("detection already running; start ignored");
                return;
            }
            shared.running = true;
        }
        info!(tick_ms = self.config.tick_interval_ms, "detection started");
        self.gate.announce("Object detection started");
        emit(
            &self.events,
            FeedbackEvent::DetectionStarted { timestamp: Utc::now() },
        );

        let shared = Arc::clone(&self.shared);
        let gate = Arc::clone(&self.gate);
        let motor = Arc::clone(&self.motor);
        let detector = Arc::clone(&self.detector);
        let events = self.events.clone();
        let tick = Duration::from_millis(self.config.tick_interval_ms);

        self.loop_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            // interval fires immediately; the first sample belongs one full
            // period after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let mut shared = lock(&shared);
                if !shared.running {
                    break;
                }
                let sighting = detector.sample();
                shared.current.clear();
                if let Some(obj) = sighting {
                    debug!(category = %obj.category, proximity = %obj.proximity, "tick: object seen");
                    gate.announce(&obj.announcement());
                    if let Err(e) = motor.vibrate(obj.proximity.pattern()) {
                        warn!(error = %e, "haptic capability failed; continuing");
                    }
                    emit(
                        &events,
                        FeedbackEvent::ObjectDetected {
                            object: obj.clone(),
                            timestamp: Utc::now(),
                        },
                    );
                    shared.current.push(obj);
                } else {
                    debug!("tick: nothing seen");
                }
            }
        }));
    }

    /// Stop the loop, clear the detection list, announce. No-op when
    /// already stopped.
    pub fn stop(&mut self) {
        {
            let mut shared = lock(&self.shared);
            if !shared.running {
                debug!("detection already stopped; stop ignored");
                return;
            }
            shared.running = false;
            shared.current.clear();
            self.gate.announce("Object detection stopped");
            emit(
                &self.events,
                FeedbackEvent::DetectionStopped { timestamp: Utc::now() },
            );
        }
        if let Some(task) = self.loop_task.take() {
            task.abort();
        }
        info!("detection stopped");
    }

    /// Manual "describe current view": reads the current snapshot, never
    /// samples.
    pub fn describe_view(&self) {
        let count = lock(&self.shared).current.len();
        let text = if count == 0 {
            "No objects currently detected".to_string()
        } else {
            format!("Currently detecting {} objects in view", count)
        };
        self.gate.announce(&text);
    }

    pub fn is_running(&self) -> bool {
        lock(&self.shared).running
    }

    /// Snapshot of the current tick's sightings (length 0 or 1).
    pub fn detections(&self) -> Vec<DetectedObject> {
        lock(&self.shared).current.clone()
    }
}

impl Drop for DetectionSession {
    fn drop(&mut self) {
        if let Some(task) = self.loop_task.take() {
            task.abort();
        }
    }
}

fn lock(shared: &Mutex<DetectionShared>) -> std::sync::MutexGuard<'_, DetectionShared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{RecordingMotor, RecordingSpeaker, ScriptedEntropy};
    use crate::config::SpeechOptions;

    /// Detector that always sees the same door, near.
    struct FixedDetector;

    impl Detector for FixedDetector {
        fn sample(&self) -> Option<DetectedObject> {
            Some(DetectedObject {
                id: Uuid::new_v4(),
                category: ObjectCategory::Door,
                confidence: 0.9,
                position: ScreenPosition { x: 10.0, y: 20.0 },
                proximity: Proximity::Near,
            })
        }
    }

    struct Harness {
        session: DetectionSession,
        speaker: Arc<RecordingSpeaker>,
        motor: Arc<RecordingMotor>,
    }

    fn harness(detector: Arc<dyn Detector>) -> Harness {
        let speaker = Arc::new(RecordingSpeaker::new());
        let motor = Arc::new(RecordingMotor::new());
        let gate = Arc::new(AnnouncementGate::new(
            speaker.clone(),
            SpeechOptions::default(),
        ));
        // receiver dropped on purpose; emission tolerates that
        let (events, _rx) = mpsc::unbounded_channel();
        let session = DetectionSession::new(
            DetectionConfig::default(),
            gate,
            motor.clone(),
            detector,
            events,
        );
        Harness {
            session,
            speaker,
            motor,
        }
    }

    #[test]
    fn simulated_detector_is_deterministic_under_scripted_entropy() {
        // Draws: bernoulli 0.5 (< 0.7 → seen), category idx 0.0 → door,
        // confidence 0.5 → 0.85, x 0.5, y 0.5, proximity idx 0.99 → far.
        let entropy = Arc::new(ScriptedEntropy::new([0.5, 0.0, 0.5, 0.5, 0.5, 0.99]));
        let detector = SimulatedDetector::new(entropy, DetectionConfig::default());
        let obj = detector.sample().expect("object seen");
        assert_eq!(obj.category, ObjectCategory::Door);
        assert!((obj.confidence - 0.85).abs() < 1e-9);
        assert_eq!(obj.proximity, Proximity::Far);
        assert!((obj.position.x - 195.0).abs() < 1e-9);

        // Bernoulli draw at the probability boundary → nothing seen.
        let entropy = Arc::new(ScriptedEntropy::new([0.7]));
        let detector = SimulatedDetector::new(entropy, DetectionConfig::default());
        assert!(detector.sample().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_replace_never_accumulate() {
        let mut h = harness(Arc::new(FixedDetector));
        h.session.start();
        assert!(h.session.is_running());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let first = h.session.detections();
        assert_eq!(first.len(), 1);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        let second = h.session.detections();
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].id, second[0].id);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_sightings_are_announced_once() {
        let mut h = harness(Arc::new(FixedDetector));
        h.session.start();
        tokio::time::sleep(Duration::from_millis(6100)).await;

        // Three ticks, one distinct sentence: the gate suppressed the
        // unchanged scene, while every tick still fired its haptic pattern.
        let spoken = h.speaker.utterances();
        assert_eq!(
            spoken,
            vec![
                "Object detection started".to_string(),
                "door detected very close ahead".to_string(),
            ]
        );
        assert_eq!(h.motor.patterns().len(), 3);
        assert_eq!(h.motor.patterns()[0], vec![100, 50, 100, 50, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_feedback_after_stop() {
        let mut h = harness(Arc::new(FixedDetector));
        h.session.start();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        h.session.stop();
        assert!(!h.session.is_running());
        assert!(h.session.detections().is_empty());

        let spoken_at_stop = h.speaker.utterances();
        assert_eq!(
            spoken_at_stop.last().map(String::as_str),
            Some("Object detection stopped")
        );

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(h.speaker.utterances(), spoken_at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_keeps_one_loop() {
        let mut h = harness(Arc::new(FixedDetector));
        h.session.start();
        h.session.start();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        // One loop → one sampled announcement; a second loop would have
        // doubled the haptic count.
        assert_eq!(h.motor.patterns().len(), 1);
        h.session.stop();
        h.session.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn describe_view_reads_snapshot_without_sampling() {
        let mut h = harness(Arc::new(FixedDetector));
        h.session.describe_view();
        assert_eq!(
            h.speaker.utterances(),
            vec!["No objects currently detected".to_string()]
        );

        h.session.start();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        h.session.describe_view();
        assert_eq!(
            h.speaker.utterances().last().map(String::as_str),
            Some("Currently detecting 1 objects in view")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_works() {
        let mut h = harness(Arc::new(FixedDetector));
        h.session.start();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        h.session.stop();
        h.session.start();
        assert!(h.session.is_running());
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(h.session.detections().len(), 1);
    }
}
