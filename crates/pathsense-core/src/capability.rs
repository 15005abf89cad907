//! Capability boundary: speech, haptics, and entropy.
//!
//! The coordinator never talks to a TTS engine, a vibration motor, or a
//! platform RNG directly. Implement `Speaker`/`HapticMotor` for the real
//! device surfaces; the Null and Recording implementations cover headless
//! runs and tests.

use crate::config::SpeechOptions;
use crate::error::FeedbackResult;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Fire-and-forget speech capability. Implement for the platform TTS engine.
pub trait Speaker: Send + Sync {
    /// Speak `text` with the given options. Failures are reported but the
    /// caller continues; delivery problems must never stall a session.
    fn speak(&self, text: &str, options: &SpeechOptions) -> FeedbackResult<()>;
}

/// Fire-and-forget haptic capability. The pattern is a sequence of
/// millisecond durations, alternating on/off and starting with "on".
pub trait HapticMotor: Send + Sync {
    fn vibrate(&self, pattern: &[u64]) -> FeedbackResult<()>;
}

/// Speaker that discards everything. Use when no audio surface is wired.
#[derive(Debug, Default)]
pub struct NullSpeaker;

impl Speaker for NullSpeaker {
    fn speak(&self, _text: &str, _options: &SpeechOptions) -> FeedbackResult<()> {
        Ok(())
    }
}

/// Motor that discards everything.
#[derive(Debug, Default)]
pub struct NullMotor;

impl HapticMotor for NullMotor {
    fn vibrate(&self, _pattern: &[u64]) -> FeedbackResult<()> {
        Ok(())
    }
}

/// Speaker that records every utterance, in order. Useful for asserting the
/// exact announcement sequence a session produced.
#[derive(Debug, Default)]
pub struct RecordingSpeaker {
    utterances: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything spoken so far.
    pub fn utterances(&self) -> Vec<String> {
        self.utterances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Speaker for RecordingSpeaker {
    fn speak(&self, text: &str, _options: &SpeechOptions) -> FeedbackResult<()> {
        self.utterances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        Ok(())
    }
}

/// Motor that records every fired pattern, in order.
#[derive(Debug, Default)]
pub struct RecordingMotor {
    patterns: Mutex<Vec<Vec<u64>>>,
}

impl RecordingMotor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patterns(&self) -> Vec<Vec<u64>> {
        self.patterns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl HapticMotor for RecordingMotor {
    fn vibrate(&self, pattern: &[u64]) -> FeedbackResult<()> {
        self.patterns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(pattern.to_vec());
        Ok(())
    }
}

/// Entropy source behind the simulated detector and recognizer. Kept as a
/// trait so tests script exact outcomes and a real sensor pipeline can drop
/// the randomness entirely.
pub trait EntropySource: Send + Sync {
    /// Uniform draw in [0, 1).
    fn next_f64(&self) -> f64;

    /// Uniform index in 0..len. `len` must be non-zero.
    fn next_index(&self, len: usize) -> usize;
}

/// Production entropy backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct SystemEntropy;

impl EntropySource for SystemEntropy {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }

    fn next_index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Deterministic entropy: replays a scripted sequence of draws, then yields
/// 0.0 once exhausted.
#[derive(Debug, Default)]
pub struct ScriptedEntropy {
    values: Mutex<VecDeque<f64>>,
}

impl ScriptedEntropy {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }
}

impl EntropySource for ScriptedEntropy {
    fn next_f64(&self) -> f64 {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(0.0)
    }

    fn next_index(&self, len: usize) -> usize {
        ((self.next_f64() * len as f64) as usize).min(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_speaker_keeps_order() {
        let s = RecordingSpeaker::new();
        let opts = SpeechOptions::default();
        s.speak("one", &opts).unwrap();
        s.speak("two", &opts).unwrap();
        assert_eq!(s.utterances(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn scripted_entropy_replays_then_zeroes() {
        let e = ScriptedEntropy::new([0.5, 0.99]);
        assert!((e.next_f64() - 0.5).abs() < 1e-9);
        assert_eq!(e.next_index(10), 9);
        assert!((e.next_f64() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn system_entropy_stays_in_range() {
        let e = SystemEntropy;
        for _ in 0..100 {
            let v = e.next_f64();
            assert!((0.0..1.0).contains(&v));
            assert!(e.next_index(5) < 5);
        }
    }
}
