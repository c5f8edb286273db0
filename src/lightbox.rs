//! Full-screen single-card view over the current filtered sequence.
//!
//! The lightbox holds nothing but a cursor: a position in the sequence the
//! caller passes in, plus which face is showing. Every operation takes the
//! sequence length (or the sequence itself) as an argument, so the lightbox
//! can never disagree with the grid about what it is navigating.
//!
//! Opening always shows the front. Navigating wraps at both ends and resets
//! the face. When the grid is refiltered while the lightbox is open,
//! [`Lightbox::relocate`] moves the cursor onto the same card's new position,
//! or closes the lightbox if the card was filtered out.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Direction, Face, wrap_step};

#[derive(Error, Debug, PartialEq)]
pub enum LightboxError {
    #[error("card is not in the current selection")]
    NotFound,
    #[error("nothing to show: the current selection is empty")]
    Empty,
}

/// What `open` does with a card that is not in the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingCardPolicy {
    /// Refuse to open.
    #[default]
    Error,
    /// Open at the first card instead.
    First,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub index: usize,
    pub face: Face,
}

#[derive(Debug, Clone, Default)]
pub struct Lightbox {
    cursor: Option<Cursor>,
}

impl Lightbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open on `item`, showing its front.
    ///
    /// With [`MissingCardPolicy::First`] a missing item opens the first card
    /// of a non-empty sequence. On error the lightbox is left as it was.
    pub fn open<T: PartialEq>(
        &mut self,
        item: &T,
        sequence: &[T],
        policy: MissingCardPolicy,
    ) -> Result<Cursor, LightboxError> {
        let index = match sequence.iter().position(|x| x == item) {
            Some(index) => index,
            None => match policy {
                MissingCardPolicy::Error => return Err(LightboxError::NotFound),
                MissingCardPolicy::First if sequence.is_empty() => {
                    return Err(LightboxError::Empty);
                }
                MissingCardPolicy::First => 0,
            },
        };
        let cursor = Cursor {
            index,
            face: Face::Front,
        };
        self.cursor = Some(cursor);
        Ok(cursor)
    }

    /// Step to the neighbouring card, wrapping, and show its front.
    ///
    /// No-op while closed or when `len` is zero.
    pub fn navigate(&mut self, direction: Direction, len: usize) -> Option<Cursor> {
        let cursor = self.cursor.as_mut()?;
        cursor.index = wrap_step(cursor.index, direction, len)?;
        cursor.face = Face::Front;
        Some(*cursor)
    }

    pub fn flip(&mut self) -> Option<Face> {
        let cursor = self.cursor.as_mut()?;
        cursor.face = cursor.face.flipped();
        Some(cursor.face)
    }

    /// Returns whether the lightbox was open.
    pub fn close(&mut self) -> bool {
        self.cursor.take().is_some()
    }

    /// Follow the open card from `old` into `new` after a refilter.
    ///
    /// Keeps the current face when the card is still present. Closes the
    /// lightbox and returns `false` when it is not.
    pub fn relocate<T: PartialEq>(&mut self, old: &[T], new: &[T]) -> bool {
        let Some(cursor) = self.cursor.as_mut() else {
            return false;
        };
        let moved = old
            .get(cursor.index)
            .and_then(|item| new.iter().position(|x| x == item));
        match moved {
            Some(index) => {
                cursor.index = index;
                true
            }
            None => {
                self.cursor = None;
                false
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    /// The open item within `sequence`, if any.
    pub fn current<'a, T>(&self, sequence: &'a [T]) -> Option<&'a T> {
        self.cursor.and_then(|c| sequence.get(c.index))
    }
}

/// Keys the lightbox responds to. Anything else maps to `Other` and is
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightboxKey {
    Escape,
    ArrowLeft,
    ArrowRight,
    Space,
    Enter,
    Other,
}

impl LightboxKey {
    /// Parse a DOM `KeyboardEvent.key` value.
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            "Escape" | "Esc" => LightboxKey::Escape,
            "ArrowLeft" => LightboxKey::ArrowLeft,
            "ArrowRight" => LightboxKey::ArrowRight,
            " " | "Spacebar" => LightboxKey::Space,
            "Enter" => LightboxKey::Enter,
            _ => LightboxKey::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightboxCommand {
    Close,
    Navigate(Direction),
    Flip,
}

/// Keyboard binding. Keys are ignored while the lightbox is closed.
pub fn command_for_key(key: LightboxKey, open: bool) -> Option<LightboxCommand> {
    if !open {
        return None;
    }
    match key {
        LightboxKey::Escape => Some(LightboxCommand::Close),
        LightboxKey::ArrowLeft => Some(LightboxCommand::Navigate(Direction::Previous)),
        LightboxKey::ArrowRight => Some(LightboxCommand::Navigate(Direction::Next)),
        LightboxKey::Space | LightboxKey::Enter => Some(LightboxCommand::Flip),
        LightboxKey::Other => None,
    }
}

/// Horizontal swipe binding.
///
/// `dx` is end x minus start x. A leftward swipe (negative) longer than
/// `threshold` goes to the next card.
pub fn command_for_swipe(dx: f64, threshold: f64) -> Option<LightboxCommand> {
    if dx.abs() <= threshold {
        None
    } else if dx < 0.0 {
        Some(LightboxCommand::Navigate(Direction::Next))
    } else {
        Some(LightboxCommand::Navigate(Direction::Previous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQ: [&str; 3] = ["a", "b", "c"];

    fn open_at(item: &str) -> Lightbox {
        let mut lightbox = Lightbox::new();
        lightbox
            .open(&item, &SEQ, MissingCardPolicy::Error)
            .unwrap();
        lightbox
    }

    #[test]
    fn open_locates_item_and_shows_front() {
        let lightbox = open_at("b");
        assert_eq!(
            lightbox.cursor(),
            Some(Cursor {
                index: 1,
                face: Face::Front
            })
        );
        assert_eq!(lightbox.current(&SEQ), Some(&"b"));
    }

    #[test]
    fn reopen_after_flip_resets_to_front() {
        let mut lightbox = open_at("b");
        lightbox.flip();
        assert!(lightbox.close());
        let cursor = lightbox
            .open(&"b", &SEQ, MissingCardPolicy::Error)
            .unwrap();
        assert_eq!(cursor.face, Face::Front);

        lightbox.flip();
        let cursor = lightbox
            .open(&"c", &SEQ, MissingCardPolicy::Error)
            .unwrap();
        assert_eq!(cursor.face, Face::Front);
    }

    #[test]
    fn missing_item_errors_by_default() {
        let mut lightbox = Lightbox::new();
        assert_eq!(
            lightbox.open(&"z", &SEQ, MissingCardPolicy::Error),
            Err(LightboxError::NotFound)
        );
        assert!(!lightbox.is_open());
    }

    #[test]
    fn missing_item_error_keeps_previous_cursor() {
        let mut lightbox = open_at("c");
        assert!(lightbox.open(&"z", &SEQ, MissingCardPolicy::Error).is_err());
        assert_eq!(lightbox.cursor().map(|c| c.index), Some(2));
    }

    #[test]
    fn missing_item_can_fall_back_to_first() {
        let mut lightbox = Lightbox::new();
        let cursor = lightbox.open(&"z", &SEQ, MissingCardPolicy::First).unwrap();
        assert_eq!(cursor.index, 0);

        let empty: [&str; 0] = [];
        assert_eq!(
            Lightbox::new().open(&"z", &empty, MissingCardPolicy::First),
            Err(LightboxError::Empty)
        );
    }

    #[test]
    fn navigate_wraps_both_ways() {
        let mut lightbox = open_at("c");
        assert_eq!(lightbox.navigate(Direction::Next, 3).unwrap().index, 0);
        assert_eq!(lightbox.navigate(Direction::Previous, 3).unwrap().index, 2);
        assert_eq!(lightbox.navigate(Direction::Previous, 3).unwrap().index, 1);
    }

    #[test]
    fn navigate_resets_face() {
        let mut lightbox = open_at("a");
        assert_eq!(lightbox.flip(), Some(Face::Back));
        let cursor = lightbox.navigate(Direction::Next, 3).unwrap();
        assert_eq!(cursor.face, Face::Front);
    }

    #[test]
    fn navigate_is_noop_when_closed_or_empty() {
        let mut closed = Lightbox::new();
        assert_eq!(closed.navigate(Direction::Next, 3), None);

        let mut lightbox = open_at("b");
        assert_eq!(lightbox.navigate(Direction::Next, 0), None);
        assert_eq!(lightbox.cursor().map(|c| c.index), Some(1));
    }

    #[test]
    fn flip_requires_open() {
        let mut lightbox = Lightbox::new();
        assert_eq!(lightbox.flip(), None);
        assert!(!lightbox.close());
    }

    #[test]
    fn relocate_follows_card() {
        let mut lightbox = open_at("c");
        lightbox.flip();
        assert!(lightbox.relocate(&SEQ, &["c", "a"]));
        assert_eq!(
            lightbox.cursor(),
            Some(Cursor {
                index: 0,
                face: Face::Back
            })
        );
    }

    #[test]
    fn relocate_closes_when_card_filtered_out() {
        let mut lightbox = open_at("b");
        assert!(!lightbox.relocate(&SEQ, &["a", "c"]));
        assert!(!lightbox.is_open());
    }

    #[test]
    fn keys_map_to_commands_only_when_open() {
        assert_eq!(
            command_for_key(LightboxKey::Escape, true),
            Some(LightboxCommand::Close)
        );
        assert_eq!(
            command_for_key(LightboxKey::ArrowLeft, true),
            Some(LightboxCommand::Navigate(Direction::Previous))
        );
        assert_eq!(
            command_for_key(LightboxKey::ArrowRight, true),
            Some(LightboxCommand::Navigate(Direction::Next))
        );
        assert_eq!(
            command_for_key(LightboxKey::Space, true),
            Some(LightboxCommand::Flip)
        );
        assert_eq!(
            command_for_key(LightboxKey::Enter, true),
            Some(LightboxCommand::Flip)
        );
        assert_eq!(command_for_key(LightboxKey::Other, true), None);
        assert_eq!(command_for_key(LightboxKey::Escape, false), None);
    }

    #[test]
    fn dom_keys_parse() {
        assert_eq!(LightboxKey::from_dom_key("Escape"), LightboxKey::Escape);
        assert_eq!(LightboxKey::from_dom_key(" "), LightboxKey::Space);
        assert_eq!(LightboxKey::from_dom_key("a"), LightboxKey::Other);
    }

    #[test]
    fn swipes_past_threshold_navigate() {
        assert_eq!(command_for_swipe(30.0, 50.0), None);
        assert_eq!(command_for_swipe(-50.0, 50.0), None);
        assert_eq!(
            command_for_swipe(-80.0, 50.0),
            Some(LightboxCommand::Navigate(Direction::Next))
        );
        assert_eq!(
            command_for_swipe(80.0, 50.0),
            Some(LightboxCommand::Navigate(Direction::Previous))
        );
    }
}
