//! The rotating 3D carousel ring.
//!
//! A [`Carousel`] holds up to `visible_count` cards sampled from the current
//! selection, arranged evenly around a circle. It tracks two numbers:
//!
//! - **rotation**: the accumulated ring angle in degrees. It is never
//!   normalised, so repeated steps in one direction keep spinning the ring
//!   visually instead of snapping back.
//! - **center**: the ring position facing the viewer.
//!
//! ## Geometry
//!
//! Position `i` sits at angular offset `step * (i - home)`, where
//! `step = 360 / N` and `home = N / 2` is the position that faces the viewer
//! at rotation zero. A position faces the viewer when its offset plus the
//! rotation is a whole number of turns, so the invariant after every
//! transition is:
//!
//! ```text
//! rotation ≡ -offset(center)  (mod 360)
//! ```
//!
//! ## Transitions
//!
//! | Operation | Rotation | Center |
//! |-----------|----------|--------|
//! | [`initialize`](Carousel::initialize) | `0` | `home` |
//! | [`rotate_by`](Carousel::rotate_by) | `± step` | `center ∓ 1` (wrapping) |
//! | [`rotate_to_index`](Carousel::rotate_to_index) | shortest path, at most 180° | target |
//! | [`spin`](Carousel::spin) | 2-4 full turns plus the forward remainder | random |
//!
//! Only the center card may show its back. Any change of center clears the
//! flip.

use rand::Rng;
use rand::seq::index;
use thiserror::Error;

use crate::angle;
use crate::types::Direction;

#[derive(Error, Debug, PartialEq)]
pub enum CarouselError {
    #[error("ring position {position} out of range for a ring of {len}")]
    OutOfRange { position: usize, len: usize },
}

/// One ring slot, as the renderer sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingItem {
    pub position: usize,
    /// Index into `Dataset::cards`.
    pub card: usize,
    /// Angular offset of this slot in degrees.
    pub offset: f64,
    pub is_center: bool,
    pub flipped: bool,
}

#[derive(Debug, Clone)]
pub struct Carousel {
    visible_count: usize,
    ring: Vec<usize>,
    rotation: f64,
    center: usize,
    center_flipped: bool,
}

impl Carousel {
    pub fn new(visible_count: usize) -> Self {
        Self {
            visible_count,
            ring: Vec::new(),
            rotation: 0.0,
            center: 0,
            center_flipped: false,
        }
    }

    /// Replace the ring with a fresh uniform sample of `selection` and reset
    /// to the home slot.
    pub fn initialize<R: Rng>(&mut self, selection: &[usize], rng: &mut R) {
        self.resample(selection, rng);
        self.rotation = 0.0;
        self.center = self.home();
    }

    /// Resample the ring, then spin forward through 2-4 full turns onto a
    /// random card.
    ///
    /// The accumulated rotation carries over so the spin animates from the
    /// current angle. Returns the applied rotation.
    pub fn spin<R: Rng>(&mut self, selection: &[usize], rng: &mut R) -> f64 {
        self.resample(selection, rng);
        if self.ring.is_empty() {
            self.center = 0;
            return 0.0;
        }
        let target = rng.random_range(0..self.ring.len());
        let turns = rng.random_range(2..=4u32);
        let delta = 360.0 * f64::from(turns)
            + angle::forward_delta(self.rotation, self.facing_angle(target));
        self.rotation += delta;
        self.center = target;
        delta
    }

    /// Step the ring one slot. Returns `false` (and does nothing) for rings of
    /// fewer than two cards.
    ///
    /// Rotation accumulates in the requested direction; this never takes a
    /// shortest path.
    pub fn rotate_by(&mut self, direction: Direction) -> bool {
        let n = self.ring.len();
        if n < 2 {
            return false;
        }
        self.rotation += direction.sign() as f64 * self.step();
        let center = (self.center as i64 - direction.sign()).rem_euclid(n as i64);
        self.set_center(center as usize);
        true
    }

    /// Bring `target` to the front by the shorter way round.
    ///
    /// Returns the signed rotation applied, which never exceeds 180° in
    /// magnitude. A half-turn goes in the positive direction.
    pub fn rotate_to_index(&mut self, target: usize) -> Result<f64, CarouselError> {
        if target >= self.ring.len() {
            return Err(CarouselError::OutOfRange {
                position: target,
                len: self.ring.len(),
            });
        }
        let delta = angle::shortest_delta(self.rotation, self.facing_angle(target));
        self.rotation += delta;
        self.set_center(target);
        Ok(delta)
    }

    /// Toggle the back face of the center card.
    ///
    /// Refused (returns `None`) for any other position. Returns the new
    /// flip state otherwise.
    pub fn flip(&mut self, position: usize) -> Option<bool> {
        if self.ring.is_empty() || position != self.center {
            return None;
        }
        self.center_flipped = !self.center_flipped;
        Some(self.center_flipped)
    }

    fn resample<R: Rng>(&mut self, selection: &[usize], rng: &mut R) {
        let amount = self.visible_count.min(selection.len());
        self.ring = index::sample(rng, selection.len(), amount)
            .into_iter()
            .map(|i| selection[i])
            .collect();
        self.center_flipped = false;
    }

    fn set_center(&mut self, position: usize) {
        if position != self.center {
            self.center_flipped = false;
        }
        self.center = position;
    }

    fn home(&self) -> usize {
        self.ring.len() / 2
    }

    pub fn step(&self) -> f64 {
        angle::ring_step(self.ring.len())
    }

    /// Angular offset of a ring position relative to the home slot.
    pub fn offset(&self, position: usize) -> f64 {
        self.step() * (position as f64 - self.home() as f64)
    }

    /// Rotation at which `position` faces the viewer.
    pub fn facing_angle(&self, position: usize) -> f64 {
        -self.offset(position)
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn center(&self) -> usize {
        self.center
    }

    /// Dataset index of the card facing the viewer.
    pub fn center_card(&self) -> Option<usize> {
        self.ring.get(self.center).copied()
    }

    pub fn is_flipped(&self, position: usize) -> bool {
        self.center_flipped && position == self.center && !self.ring.is_empty()
    }

    pub fn ring(&self) -> &[usize] {
        &self.ring
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    /// Whether the center position faces the viewer at the current rotation.
    pub fn is_aligned(&self) -> bool {
        self.ring.is_empty() || angle::congruent(self.rotation, self.facing_angle(self.center))
    }

    pub fn items(&self) -> impl Iterator<Item = RingItem> + '_ {
        self.ring.iter().enumerate().map(|(position, &card)| RingItem {
            position,
            card,
            offset: self.offset(position),
            is_center: position == self.center,
            flipped: self.is_flipped(position),
        })
    }
}
