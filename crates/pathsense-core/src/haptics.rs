//! Haptic pattern encodings.
//!
//! Pulse count and speed carry the information, never amplitude (most
//! handsets cannot modulate it). Left/right and up/down are exact mirrors:
//! that mirror symmetry is the only way a non-visual user can tell turn
//! side apart, so the tables below must not be "tidied up".

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse distance bucket for a detected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proximity {
    Near,
    Medium,
    Far,
}

impl Proximity {
    pub const ALL: [Proximity; 3] = [Proximity::Near, Proximity::Medium, Proximity::Far];

    /// Urgency encoding: more, faster pulses the closer the object.
    pub fn pattern(self) -> &'static [u64] {
        match self {
            Proximity::Near => &[100, 50, 100, 50, 100],
            Proximity::Medium => &[200, 100, 200],
            Proximity::Far => &[300],
        }
    }
}

impl fmt::Display for Proximity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Proximity::Near => "near",
            Proximity::Medium => "medium",
            Proximity::Far => "far",
        };
        f.write_str(s)
    }
}

/// Travel direction of a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Straight,
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 5] = [
        Direction::Straight,
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// Turn-side encoding. Left ends on the long pulse, right starts with
    /// it (mirrored); up/down mirror the same way for stair/elevator steps.
    pub fn pattern(self) -> &'static [u64] {
        match self {
            Direction::Straight => &[200, 100, 200],
            Direction::Left => &[100, 100, 100, 100, 300],
            Direction::Right => &[300, 100, 100, 100, 100],
            Direction::Up => &[100, 50, 100, 50, 100, 50, 300],
            Direction::Down => &[300, 50, 100, 50, 100, 50, 100],
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Straight => "straight",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        };
        f.write_str(s)
    }
}

/// Arrival at the destination: five even pulses, distinct from every
/// per-direction pattern.
pub const ARRIVAL: &[u64] = &[100, 100, 100, 100, 100];

/// Navigation stopped by the user: one medium pulse.
pub const NAV_STOP: &[u64] = &[200];

/// Listening for voice commands: one tap.
pub const LISTEN_START: &[u64] = &[50];

/// Stopped listening: one short pulse.
pub const LISTEN_STOP: &[u64] = &[100];

/// Emergency mode: three strong pulses.
pub const EMERGENCY: &[u64] = &[200, 100, 200, 100, 200];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proximity_patterns_are_fixed() {
        assert_eq!(Proximity::Near.pattern(), &[100, 50, 100, 50, 100]);
        assert_eq!(Proximity::Medium.pattern(), &[200, 100, 200]);
        assert_eq!(Proximity::Far.pattern(), &[300]);
    }

    #[test]
    fn left_and_right_are_exact_mirrors() {
        let left = Direction::Left.pattern();
        let mut reversed: Vec<u64> = left.to_vec();
        reversed.reverse();
        assert_eq!(Direction::Right.pattern(), reversed.as_slice());
    }

    #[test]
    fn up_and_down_are_exact_mirrors() {
        let up = Direction::Up.pattern();
        let mut reversed: Vec<u64> = up.to_vec();
        reversed.reverse();
        assert_eq!(Direction::Down.pattern(), reversed.as_slice());
    }

    #[test]
    fn arrival_is_distinct_from_every_direction() {
        for d in Direction::ALL {
            assert_ne!(d.pattern(), ARRIVAL);
        }
        assert_eq!(ARRIVAL.len(), 5);
    }

    #[test]
    fn direction_serde_uses_lowercase_names() {
        let d: Direction = serde_json::from_str("\"left\"").unwrap();
        assert_eq!(d, Direction::Left);
        assert_eq!(serde_json::to_string(&Direction::Up).unwrap(), "\"up\"");
    }
}
