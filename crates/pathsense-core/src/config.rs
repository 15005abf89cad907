//! Configuration for the feedback coordinator.
//!
//! Every timing constant the sessions rely on lives here so behavior can be
//! tuned without code edits: a 2 s detection tick, 1.5 s / 3 s warning and
//! landmark delays, and a 3 s simulated recognition window by default.

use crate::error::{FeedbackError, FeedbackResult};
use serde::{Deserialize, Serialize};

/// Options passed to the external speech capability with every utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechOptions {
    /// BCP-47 language tag (default "en-US").
    pub language: String,
    /// Voice pitch multiplier (default 1.0).
    pub pitch: f32,
    /// Speaking rate multiplier (default 0.8, slightly slow for clarity).
    pub rate: f32,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            pitch: 1.0,
            rate: 0.8,
        }
    }
}

/// Detection session tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Period of the sampling loop (default 2000 ms).
    pub tick_interval_ms: u64,
    /// Probability that a tick sees an object (default 0.7).
    pub detection_probability: f64,
    /// Frame width in points for simulated screen positions (default 390).
    pub frame_width: f64,
    /// Frame height in points for simulated screen positions (default 844).
    pub frame_height: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2000,
            detection_probability: 0.7,
            frame_width: 390.0,
            frame_height: 844.0,
        }
    }
}

/// Navigation session tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Delay before the first step's landmark is spoken after `start` (default 2000 ms).
    pub start_landmark_delay_ms: u64,
    /// Delay before a step's warning is spoken after `advance` (default 1500 ms).
    pub warning_delay_ms: u64,
    /// Delay before a step's landmark is spoken after `advance` (default 3000 ms).
    pub landmark_delay_ms: u64,
    /// Stride conversion from meters to estimated footsteps (default 1.3).
    pub steps_per_meter: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            start_landmark_delay_ms: 2000,
            warning_delay_ms: 1500,
            landmark_delay_ms: 3000,
            steps_per_meter: 1.3,
        }
    }
}

/// Voice command tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// How long the simulated recognizer listens before committing (default 3000 ms).
    pub recognition_delay_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            recognition_delay_ms: 3000,
        }
    }
}

/// Top-level configuration for one coordinator instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub speech: SpeechOptions,
    pub detection: DetectionConfig,
    pub navigation: NavigationConfig,
    pub voice: VoiceConfig,
}

impl FeedbackConfig {
    /// Validate ranges that serde cannot express.
    pub fn validate(&self) -> FeedbackResult<()> {
        if self.detection.tick_interval_ms == 0 {
            return Err(FeedbackError::Config(
                "detection.tick_interval_ms must be non-zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection.detection_probability) {
            return Err(FeedbackError::Config(format!(
                "detection.detection_probability must be in [0, 1], got {}",
                self.detection.detection_probability
            )));
        }
        if self.navigation.steps_per_meter <= 0.0 {
            return Err(FeedbackError::Config(
                "navigation.steps_per_meter must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_hold_the_shipped_cadence() {
        let c = FeedbackConfig::default();
        assert_eq!(c.detection.tick_interval_ms, 2000);
        assert!((c.detection.detection_probability - 0.7).abs() < 1e-9);
        assert_eq!(c.navigation.start_landmark_delay_ms, 2000);
        assert_eq!(c.navigation.warning_delay_ms, 1500);
        assert_eq!(c.navigation.landmark_delay_ms, 3000);
        assert!((c.navigation.steps_per_meter - 1.3).abs() < 1e-9);
        assert_eq!(c.voice.recognition_delay_ms, 3000);
        assert_eq!(c.speech.language, "en-US");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let c: FeedbackConfig = toml::from_str(
            r#"
            [detection]
            tick_interval_ms = 500

            [navigation]
            warning_delay_ms = 100
            "#,
        )
        .unwrap();
        assert_eq!(c.detection.tick_interval_ms, 500);
        assert!((c.detection.detection_probability - 0.7).abs() < 1e-9);
        assert_eq!(c.navigation.warning_delay_ms, 100);
        assert_eq!(c.navigation.landmark_delay_ms, 3000);
    }

    #[test]
    fn out_of_range_probability_rejected() {
        let mut c = FeedbackConfig::default();
        c.detection.detection_probability = 1.5;
        assert!(c.validate().is_err());
    }
}
