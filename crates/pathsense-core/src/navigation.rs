//! Indoor navigation session: a fixed route walked step by step, with
//! staggered spoken follow-ups and per-direction haptic cues.
//!
//! Follow-up announcements (warning, landmark) for one triggering event run
//! in a single sequential task sorted by delay, so their relative order is
//! structural rather than a coincidence of timer values. `stop`, `start`
//! and `advance` each replace the pending schedule; a cancelled follow-up
//! never speaks.

use crate::announce::AnnouncementGate;
use crate::capability::HapticMotor;
use crate::config::NavigationConfig;
use crate::error::{FeedbackError, FeedbackResult};
use crate::event::{emit, FeedbackEvent};
use crate::haptics::{self, Direction};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One instruction of a route. Read-only during a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationStep {
    /// Position within the route; assigned by `Route::new`.
    #[serde(default)]
    pub ordinal: usize,
    pub instruction: String,
    pub distance_meters: f64,
    pub direction: Direction,
    #[serde(default)]
    pub landmark: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
}

impl NavigationStep {
    fn new(
        instruction: &str,
        distance_meters: f64,
        direction: Direction,
        landmark: Option<&str>,
        warning: Option<&str>,
    ) -> Self {
        Self {
            ordinal: 0,
            instruction: instruction.to_string(),
            distance_meters,
            direction,
            landmark: landmark.map(str::to_string),
            warning: warning.map(str::to_string),
        }
    }
}

/// The fixed, ordered step sequence for a session.
#[derive(Debug, Clone)]
pub struct Route {
    steps: Vec<NavigationStep>,
}

impl Route {
    /// Build a route, renumbering ordinals. Empty routes are rejected.
    pub fn new(mut steps: Vec<NavigationStep>) -> FeedbackResult<Self> {
        if steps.is_empty() {
            return Err(FeedbackError::InvalidRoute("route has no steps".to_string()));
        }
        for (i, step) in steps.iter_mut().enumerate() {
            step.ordinal = i;
            if step.distance_meters < 0.0 {
                return Err(FeedbackError::InvalidRoute(format!(
                    "step {} has negative distance",
                    i
                )));
            }
        }
        Ok(Self { steps })
    }

    /// The built-in corridor route used by the demo surfaces.
    pub fn default_indoor() -> Self {
        let steps = vec![
            NavigationStep::new(
                "Head straight down the corridor",
                10.0,
                Direction::Straight,
                Some("Water fountain on your right"),
                None,
            ),
            NavigationStep::new(
                "Turn left at the intersection",
                15.0,
                Direction::Left,
                Some("Information desk ahead"),
                Some("Caution: Wet floor area"),
            ),
            NavigationStep::new(
                "Continue straight past the elevator",
                8.0,
                Direction::Straight,
                Some("Elevator doors on your left"),
                None,
            ),
            NavigationStep::new(
                "Turn right towards the exit",
                12.0,
                Direction::Right,
                Some("Exit sign visible ahead"),
                None,
            ),
            NavigationStep::new(
                "You have arrived at your destination",
                0.0,
                Direction::Straight,
                Some("Main entrance doors"),
                None,
            ),
        ];
        Self::new(steps).expect("built-in route is valid")
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NavigationStep> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[NavigationStep] {
        &self.steps
    }

    fn last_index(&self) -> usize {
        self.steps.len() - 1
    }
}

/// A destination a user can pick before starting a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub id: &'static str,
    pub name: &'static str,
}

/// The quick-pick destinations offered by the demo surfaces.
pub const QUICK_DESTINATIONS: [Destination; 6] = [
    Destination { id: "exit", name: "Main Exit" },
    Destination { id: "restroom", name: "Restroom" },
    Destination { id: "elevator", name: "Elevator" },
    Destination { id: "stairs", name: "Stairs" },
    Destination { id: "information", name: "Information Desk" },
    Destination { id: "emergency", name: "Emergency Exit" },
];

struct NavShared {
    active: bool,
    current_step: usize,
    destination: String,
    step_count: u64,
    /// Bumped by every start/advance/stop; pending follow-ups re-check it
    /// before speaking.
    epoch: u64,
}

enum AdvanceOutcome {
    Ignored,
    Advanced { epoch: u64, schedule: Vec<(u64, String)> },
    Arrived,
}

/// Idle ⇄ Navigating session over a fixed route.
pub struct NavigationSession {
    route: Route,
    config: NavigationConfig,
    gate: Arc<AnnouncementGate>,
    motor: Arc<dyn HapticMotor>,
    shared: Arc<Mutex<NavShared>>,
    events: mpsc::UnboundedSender<FeedbackEvent>,
    followup_task: Option<JoinHandle<()>>,
}

impl NavigationSession {
    pub fn new(
        route: Route,
        config: NavigationConfig,
        gate: Arc<AnnouncementGate>,
        motor: Arc<dyn HapticMotor>,
        events: mpsc::UnboundedSender<FeedbackEvent>,
    ) -> Self {
        Self {
            route,
            config,
            gate,
            motor,
            shared: Arc::new(Mutex::new(NavShared {
                active: false,
                current_step: 0,
                destination: String::new(),
                step_count: 0,
                epoch: 0,
            })),
            events,
            followup_task: None,
        }
    }

    /// Begin navigating to `destination` from step 0. Restarting an active
    /// session resets it cleanly (pending follow-ups are cancelled).
    pub fn start(&mut self, destination: impl Into<String>) {
        let destination = destination.into();
        let epoch;
        let schedule;
        {
            let mut s = lock(&self.shared);
            s.active = true;
            s.current_step = 0;
            s.step_count = 0;
            s.destination = destination.clone();
            s.epoch += 1;
            epoch = s.epoch;

            let step = &self.route.steps[0];
            self.gate.announce(&format!(
                "Navigation started to {}. {}. Distance: {} meters.",
                destination, step.instruction, step.distance_meters
            ));
            self.fire(step.direction.pattern());
            emit(
                &self.events,
                FeedbackEvent::NavigationStarted {
                    destination: destination.clone(),
                    timestamp: Utc::now(),
                },
            );

            schedule = match &step.landmark {
                Some(landmark) => vec![(self.config.start_landmark_delay_ms, landmark.clone())],
                None => Vec::new(),
            };
        }
        info!(%destination, "navigation started");
        self.spawn_followups(epoch, schedule);
    }

    /// Move to the next step, or arrive when already on the last one.
    /// Ignored while idle.
    pub fn advance(&mut self) {
        let outcome = {
            let mut s = lock(&self.shared);
            if !s.active {
                debug!("advance ignored: no active navigation");
                AdvanceOutcome::Ignored
            } else if s.current_step < self.route.last_index() {
                s.current_step += 1;
                s.epoch += 1;
                let step = &self.route.steps[s.current_step];
                self.gate.announce(&format!(
                    "{}. Distance: {} meters.",
                    step.instruction, step.distance_meters
                ));
                self.fire(step.direction.pattern());
                s.step_count += (step.distance_meters * self.config.steps_per_meter).floor() as u64;
                emit(
                    &self.events,
                    FeedbackEvent::StepAdvanced {
                        ordinal: s.current_step,
                        timestamp: Utc::now(),
                    },
                );

                let mut schedule = Vec::new();
                if let Some(warning) = &step.warning {
                    schedule.push((self.config.warning_delay_ms, format!("Warning: {}", warning)));
                }
                if let Some(landmark) = &step.landmark {
                    schedule.push((self.config.landmark_delay_ms, landmark.clone()));
                }
                debug!(ordinal = s.current_step, "advanced to next step");
                AdvanceOutcome::Advanced { epoch: s.epoch, schedule }
            } else {
                s.active = false;
                s.epoch += 1;
                self.gate
                    .announce("You have arrived at your destination. Navigation complete.");
                self.fire(haptics::ARRIVAL);
                emit(
                    &self.events,
                    FeedbackEvent::Arrived {
                        destination: s.destination.clone(),
                        timestamp: Utc::now(),
                    },
                );
                info!(destination = %s.destination, "arrived");
                AdvanceOutcome::Arrived
            }
        };
        match outcome {
            AdvanceOutcome::Advanced { epoch, schedule } => self.spawn_followups(epoch, schedule),
            AdvanceOutcome::Arrived => self.cancel_followups(),
            AdvanceOutcome::Ignored => {}
        }
    }

    /// Re-announce the current step and re-fire its haptic cue. Never
    /// mutates the step index or the step count.
    pub fn repeat(&self) {
        let s = lock(&self.shared);
        if s.active {
            let step = &self.route.steps[s.current_step];
            self.gate.announce_always(&format!(
                "Current instruction: {}. Distance: {} meters.",
                step.instruction, step.distance_meters
            ));
            self.fire(step.direction.pattern());
        } else {
            self.gate.announce("No active navigation");
        }
    }

    /// End the session and cancel any follow-ups that have not spoken yet.
    /// No-op while idle.
    pub fn stop(&mut self) {
        {
            let mut s = lock(&self.shared);
            if !s.active {
                debug!("navigation already idle; stop ignored");
                return;
            }
            s.active = false;
            s.current_step = 0;
            s.destination.clear();
            s.epoch += 1;
            self.gate.announce("Navigation stopped");
            self.fire(haptics::NAV_STOP);
            emit(
                &self.events,
                FeedbackEvent::NavigationStopped { timestamp: Utc::now() },
            );
        }
        self.cancel_followups();
        info!("navigation stopped");
    }

    pub fn is_active(&self) -> bool {
        lock(&self.shared).active
    }

    pub fn current_step(&self) -> usize {
        lock(&self.shared).current_step
    }

    pub fn step_count(&self) -> u64 {
        lock(&self.shared).step_count
    }

    pub fn destination(&self) -> String {
        lock(&self.shared).destination.clone()
    }

    /// 1-based progress: (current step, total steps).
    pub fn progress(&self) -> (usize, usize) {
        (lock(&self.shared).current_step + 1, self.route.len())
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Replace the pending follow-up schedule with `items`
    /// (delay-from-now in ms, text), spoken in delay order by one task.
    fn spawn_followups(&mut self, epoch: u64, mut items: Vec<(u64, String)>) {
        self.cancel_followups();
        if items.is_empty() {
            return;
        }
        items.sort_by_key(|(at_ms, _)| *at_ms);

        let shared = Arc::clone(&self.shared);
        let gate = Arc::clone(&self.gate);
        self.followup_task = Some(tokio::spawn(async move {
            let mut elapsed = 0u64;
            for (at_ms, text) in items {
                tokio::time::sleep(Duration::from_millis(at_ms - elapsed)).await;
                elapsed = at_ms;
                let s = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if !s.active || s.epoch != epoch {
                    debug!("follow-up cancelled before speaking");
                    return;
                }
                gate.announce(&text);
            }
        }));
    }

    fn cancel_followups(&mut self) {
        if let Some(task) = self.followup_task.take() {
            task.abort();
        }
    }

    fn fire(&self, pattern: &[u64]) {
        if let Err(e) = self.motor.vibrate(pattern) {
            warn!(error = %e, "haptic capability failed; continuing");
        }
    }
}

impl Drop for NavigationSession {
    fn drop(&mut self) {
        self.cancel_followups();
    }
}

fn lock(shared: &Mutex<NavShared>) -> std::sync::MutexGuard<'_, NavShared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{RecordingMotor, RecordingSpeaker};
    use crate::config::SpeechOptions;

    struct Harness {
        session: NavigationSession,
        speaker: Arc<RecordingSpeaker>,
        motor: Arc<RecordingMotor>,
    }

    fn harness(route: Route) -> Harness {
        let speaker = Arc::new(RecordingSpeaker::new());
        let motor = Arc::new(RecordingMotor::new());
        let gate = Arc::new(AnnouncementGate::new(
            speaker.clone(),
            SpeechOptions::default(),
        ));
        let (events, _rx) = mpsc::unbounded_channel();
        let session = NavigationSession::new(
            route,
            NavigationConfig::default(),
            gate,
            motor.clone(),
            events,
        );
        Harness {
            session,
            speaker,
            motor,
        }
    }

    fn two_step_route() -> Route {
        Route::new(vec![
            NavigationStep::new(
                "Go straight",
                10.0,
                Direction::Straight,
                Some("fountain"),
                None,
            ),
            NavigationStep::new("Arrive", 0.0, Direction::Straight, None, None),
        ])
        .unwrap()
    }

    #[test]
    fn empty_route_is_rejected() {
        assert!(Route::new(Vec::new()).is_err());
    }

    #[test]
    fn default_route_shape() {
        let route = Route::default_indoor();
        assert_eq!(route.len(), 5);
        assert_eq!(route.get(1).unwrap().ordinal, 1);
        assert!(route.get(1).unwrap().warning.is_some());
        assert!(route.get(0).unwrap().warning.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn monotonic_walk_then_arrival() {
        let mut h = harness(Route::default_indoor());
        h.session.start("Main Exit");
        assert!(h.session.is_active());
        assert_eq!(h.session.current_step(), 0);

        for expected in 1..=4 {
            h.session.advance();
            assert_eq!(h.session.current_step(), expected);
            assert!(h.session.is_active());
        }

        h.session.advance();
        assert!(!h.session.is_active());
        assert_eq!(h.session.current_step(), 4);

        // A further advance on the idle session changes nothing.
        h.session.advance();
        assert_eq!(h.session.current_step(), 4);
        assert_eq!(
            h.motor.patterns().last().unwrap().as_slice(),
            haptics::ARRIVAL
        );
    }

    #[tokio::test(start_paused = true)]
    async fn step_count_accumulates_floored_strides() {
        let mut h = harness(Route::default_indoor());
        h.session.start("Main Exit");
        assert_eq!(h.session.step_count(), 0);

        // Distances walked: 15, 8, 12 → floor(19.5) + floor(10.4) + floor(15.6)
        h.session.advance();
        assert_eq!(h.session.step_count(), 19);
        h.session.advance();
        assert_eq!(h.session.step_count(), 29);
        h.session.advance();
        assert_eq!(h.session.step_count(), 44);
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_changes_no_state_and_respeaks() {
        let mut h = harness(Route::default_indoor());
        h.session.start("Restroom");
        h.session.advance();
        let step = h.session.current_step();
        let count = h.session.step_count();

        h.session.repeat();
        h.session.repeat();
        assert_eq!(h.session.current_step(), step);
        assert_eq!(h.session.step_count(), count);

        // Both repeats speak, even though the sentence is identical.
        let spoken = h.speaker.utterances();
        let repeats = spoken
            .iter()
            .filter(|s| s.starts_with("Current instruction: Turn left"))
            .count();
        assert_eq!(repeats, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_while_idle_says_so() {
        let h = harness(Route::default_indoor());
        h.session.repeat();
        assert_eq!(
            h.speaker.utterances(),
            vec!["No active navigation".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_scenario_announces_then_landmark_then_arrival() {
        let mut h = harness(two_step_route());
        h.session.start("Exit");
        assert_eq!(
            h.speaker.utterances(),
            vec!["Navigation started to Exit. Go straight. Distance: 10 meters.".to_string()]
        );
        assert_eq!(h.motor.patterns(), vec![vec![200, 100, 200]]);

        // Landmark follows after the start delay as its own announcement.
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(
            h.speaker.utterances().last().map(String::as_str),
            Some("fountain")
        );

        h.session.advance();
        assert_eq!(
            h.speaker.utterances().last().map(String::as_str),
            Some("Arrive. Distance: 0 meters.")
        );
        assert!(h.session.is_active());

        h.session.advance();
        assert!(!h.session.is_active());
        assert_eq!(
            h.speaker.utterances().last().map(String::as_str),
            Some("You have arrived at your destination. Navigation complete.")
        );
        assert_eq!(
            h.motor.patterns().last().unwrap().as_slice(),
            haptics::ARRIVAL
        );
    }

    #[tokio::test(start_paused = true)]
    async fn warning_speaks_before_landmark() {
        let route = Route::new(vec![
            NavigationStep::new("Go", 5.0, Direction::Straight, None, None),
            NavigationStep::new(
                "Turn left",
                5.0,
                Direction::Left,
                Some("desk ahead"),
                Some("wet floor"),
            ),
        ])
        .unwrap();
        let mut h = harness(route);
        h.session.start("Exit");
        h.session.advance();

        tokio::time::sleep(Duration::from_millis(3100)).await;
        let spoken = h.speaker.utterances();
        let warning_pos = spoken
            .iter()
            .position(|s| s == "Warning: wet floor")
            .expect("warning spoken");
        let landmark_pos = spoken
            .iter()
            .position(|s| s == "desk ahead")
            .expect("landmark spoken");
        assert!(warning_pos < landmark_pos);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_followups() {
        let mut h = harness(two_step_route());
        h.session.start("Exit");
        tokio::time::sleep(Duration::from_millis(1000)).await;
        h.session.stop();

        assert!(!h.session.is_active());
        assert_eq!(h.session.current_step(), 0);
        assert_eq!(h.session.destination(), "");

        tokio::time::sleep(Duration::from_millis(5000)).await;
        let spoken = h.speaker.utterances();
        assert!(!spoken.iter().any(|s| s == "fountain"));
        assert_eq!(spoken.last().map(String::as_str), Some("Navigation stopped"));
        assert_eq!(
            h.motor.patterns().last().unwrap().as_slice(),
            haptics::NAV_STOP
        );
    }

    #[tokio::test(start_paused = true)]
    async fn advance_replaces_stale_schedule() {
        let mut h = harness(Route::default_indoor());
        h.session.start("Main Exit");
        // Advance before the step-0 landmark fires: the stale landmark must
        // not speak later.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        h.session.advance();
        tokio::time::sleep(Duration::from_millis(10_000)).await;

        let spoken = h.speaker.utterances();
        assert!(!spoken.iter().any(|s| s == "Water fountain on your right"));
        assert!(spoken.iter().any(|s| s == "Warning: Caution: Wet floor area"));
        assert!(spoken.iter().any(|s| s == "Information desk ahead"));
    }

    #[tokio::test(start_paused = true)]
    async fn advance_and_stop_while_idle_are_noops() {
        let mut h = harness(two_step_route());
        h.session.advance();
        h.session.stop();
        assert!(h.speaker.utterances().is_empty());
        assert!(h.motor.patterns().is_empty());
    }
}
