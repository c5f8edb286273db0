//! Shared types used across the state machines and the renderer.
//!
//! These are small value types with no behavior of their own beyond sign and
//! toggle helpers. The carousel, the lightbox, and the renderer all speak in
//! terms of [`Direction`] and [`Face`].

use serde::{Deserialize, Serialize};

/// Which side of a card is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    #[default]
    Front,
    Back,
}

impl Face {
    pub fn flipped(self) -> Self {
        match self {
            Face::Front => Face::Back,
            Face::Back => Face::Front,
        }
    }

    /// Suffix used in image filenames and CSS classes (`front` / `back`).
    pub fn as_str(self) -> &'static str {
        match self {
            Face::Front => "front",
            Face::Back => "back",
        }
    }
}

/// A one-step move through an ordered sequence.
///
/// `Next` is `+1`, `Previous` is `-1`. The carousel uses the sign to
/// accumulate rotation; the lightbox uses it to move its cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    pub fn sign(self) -> i64 {
        match self {
            Direction::Previous => -1,
            Direction::Next => 1,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Previous => Direction::Next,
            Direction::Next => Direction::Previous,
        }
    }
}

/// Step `index` one place in `direction` within `0..len`, wrapping at both ends.
///
/// Returns `None` for an empty sequence.
pub fn wrap_step(index: usize, direction: Direction, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    let next = (index as i64 + direction.sign()).rem_euclid(len);
    Some(next as usize)
}
