//! The card dataset: an in-memory view of `cards.json`.
//!
//! ## File Format
//!
//! ```json
//! {
//!   "cards": [
//!     {
//!       "id": "curie_marie",
//!       "scientist_name": "Marie Curie",
//!       "scientist_years": "1867-1934",
//!       "era": "Pre-1900 Foundations",
//!       "contribution": "Pioneered research on radioactivity",
//!       "card_front_url": "cards/curie_marie_front.png",
//!       "card_back_url": "cards/curie_marie_back.png",
//!       "student_name": "Jane Doe",
//!       "submitted_date": "2026-02-14"
//!     }
//!   ],
//!   "eras": ["Pre-1900 Foundations", "Metabolic Revolutions"],
//!   "last_updated": "2026-02-14T18:03:11.201Z"
//! }
//! ```
//!
//! The gallery only ever reads this file. The submission pipeline in
//! [`crate::sync`] is its sole writer, and goes through [`Dataset::upsert`] so
//! identifiers stay unique.
//!
//! Field names are the ones the published file uses; the Rust names are the
//! domain names (`name`, `description`, `front`, ...). Fields this crate does
//! not know about are kept in `extra` and written back untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::Face;

/// Bucket label for cards whose era is missing or not in the dataset's era list.
pub const CATCH_ALL_ERA: &str = "Other";

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate card id: {0}")]
    DuplicateId(String),
}

/// One trading card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(rename = "scientist_name")]
    pub name: String,
    /// Life span as free text, e.g. `1867-1934`.
    #[serde(
        rename = "scientist_years",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub years: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
    #[serde(
        rename = "contribution",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(rename = "card_front_url")]
    pub front: String,
    #[serde(rename = "card_back_url")]
    pub back: String,
    #[serde(
        rename = "student_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub submitter: Option<String>,
    /// `YYYY-MM-DD`. Compared lexically by the `recent` sort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_date: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub late_submission: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card {
    /// Era label with empty strings treated as absent.
    pub fn era_label(&self) -> Option<&str> {
        self.era.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    pub fn image(&self, face: Face) -> &str {
        match face {
            Face::Front => &self.front,
            Face::Back => &self.back,
        }
    }
}

/// What [`Dataset::upsert`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Added,
    Updated,
    /// The record stored under `old_id` was removed before inserting.
    Replaced { old_id: String },
}

/// The whole `cards.json` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub eras: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_updated: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Dataset {
    /// Parse a dataset document and check identifier uniqueness.
    ///
    /// Either the whole document loads or nothing does.
    pub fn from_json(content: &str) -> Result<Self, DatasetError> {
        let dataset: Dataset = serde_json::from_str(content)?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load from `path`, or start an empty dataset if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Pretty JSON with two-space indentation, matching the published file.
    pub fn to_json_pretty(&self) -> Result<String, DatasetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), DatasetError> {
        let mut seen = HashSet::new();
        for card in &self.cards {
            if !seen.insert(card.id.as_str()) {
                return Err(DatasetError::DuplicateId(card.id.clone()));
            }
        }
        Ok(())
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.id == id)
    }

    pub fn find(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn is_known_era(&self, era: &str) -> bool {
        self.eras.iter().any(|e| e == era)
    }

    /// Grouping label for a card: its era if the dataset lists it, otherwise
    /// [`CATCH_ALL_ERA`].
    pub fn era_bucket<'a>(&'a self, card: &'a Card) -> &'a str {
        match card.era_label() {
            Some(era) if self.is_known_era(era) => era,
            _ => CATCH_ALL_ERA,
        }
    }

    /// Insert or overwrite a card keyed by its id.
    ///
    /// With `replaces` set to a different id, the card stored under that id
    /// is removed first (correction workflow: a student swapped scientists).
    /// An overwrite keeps the card's position in the list; a new card is
    /// appended.
    pub fn upsert(&mut self, card: Card, replaces: Option<&str>) -> UpsertOutcome {
        let mut removed = None;
        if let Some(old_id) = replaces.filter(|old| *old != card.id)
            && let Some(pos) = self.position(old_id)
        {
            self.cards.remove(pos);
            removed = Some(old_id.to_string());
        }

        let outcome = match self.position(&card.id) {
            Some(pos) => {
                self.cards[pos] = card;
                UpsertOutcome::Updated
            }
            None => {
                self.cards.push(card);
                UpsertOutcome::Added
            }
        };

        match removed {
            Some(old_id) => UpsertOutcome::Replaced { old_id },
            None => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    #[test]
    fn parses_published_field_names() {
        let json = r#"{
            "cards": [{
                "id": "curie_marie",
                "scientist_name": "Marie Curie",
                "scientist_years": "1867-1934",
                "era": "Pre-1900 Foundations",
                "contribution": "Pioneered research on radioactivity",
                "card_front_url": "cards/curie_marie_front.png",
                "card_back_url": "cards/curie_marie_back.png",
                "student_name": "Jane Doe",
                "submitted_date": "2026-02-14",
                "late_submission": true
            }],
            "eras": ["Pre-1900 Foundations"],
            "last_updated": "2026-02-14T18:03:11.201Z"
        }"#;
        let dataset = Dataset::from_json(json).unwrap();
        let card = &dataset.cards[0];
        assert_eq!(card.name, "Marie Curie");
        assert_eq!(card.years.as_deref(), Some("1867-1934"));
        assert_eq!(
            card.description.as_deref(),
            Some("Pioneered research on radioactivity")
        );
        assert_eq!(card.image(Face::Back), "cards/curie_marie_back.png");
        assert_eq!(card.submitter.as_deref(), Some("Jane Doe"));
        assert!(card.late_submission);
        assert_eq!(dataset.last_updated, "2026-02-14T18:03:11.201Z");
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let json = r#"{"cards": [{"id": "a", "scientist_name": "A",
            "card_front_url": "f", "card_back_url": "b"}]}"#;
        let dataset = Dataset::from_json(json).unwrap();
        assert!(dataset.eras.is_empty());
        assert_eq!(dataset.cards[0].era, None);
        assert!(!dataset.cards[0].late_submission);
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let json = r#"{"cards": [{"id": "a", "scientist_name": "A",
            "card_front_url": "f", "card_back_url": "b", "section": "B2"}],
            "course": "BIOL 3030"}"#;
        let dataset = Dataset::from_json(json).unwrap();
        let out = dataset.to_json_pretty().unwrap();
        assert!(out.contains(r#""section": "B2""#));
        assert!(out.contains(r#""course": "BIOL 3030""#));
    }

    #[test]
    fn duplicate_ids_fail_the_whole_load() {
        let json = r#"{"cards": [
            {"id": "a", "scientist_name": "A", "card_front_url": "f", "card_back_url": "b"},
            {"id": "a", "scientist_name": "A2", "card_front_url": "f", "card_back_url": "b"}
        ]}"#;
        assert!(matches!(
            Dataset::from_json(json),
            Err(DatasetError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(matches!(
            Dataset::from_json("{\"cards\": [}"),
            Err(DatasetError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = Dataset::load(&tmp.path().join("cards.json"));
        assert!(matches!(result, Err(DatasetError::Io(_))));
    }

    #[test]
    fn load_or_default_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::load_or_default(&tmp.path().join("cards.json")).unwrap();
        assert!(dataset.cards.is_empty());
    }

    #[test]
    fn save_then_load_preserves_cards() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cards.json");
        let dataset = fixture_dataset();
        dataset.save(&path).unwrap();
        assert_eq!(Dataset::load(&path).unwrap(), dataset);
    }

    #[test]
    fn era_bucket_uses_catch_all_for_unknown_and_missing() {
        let dataset = fixture_dataset();
        let known = find_card(&dataset, "vesalius_andreas");
        assert_eq!(dataset.era_bucket(known), "Renaissance");

        let mut stray = sample_card("x", "Stray", Some("Bronze Age"));
        assert_eq!(dataset.era_bucket(&stray), CATCH_ALL_ERA);
        stray.era = Some("  ".into());
        assert_eq!(dataset.era_bucket(&stray), CATCH_ALL_ERA);
        stray.era = None;
        assert_eq!(dataset.era_bucket(&stray), CATCH_ALL_ERA);
    }

    #[test]
    fn upsert_appends_new_card() {
        let mut dataset = fixture_dataset();
        let before = dataset.cards.len();
        let outcome = dataset.upsert(sample_card("new_one", "New One", None), None);
        assert_eq!(outcome, UpsertOutcome::Added);
        assert_eq!(dataset.cards.len(), before + 1);
        assert_eq!(dataset.cards.last().unwrap().id, "new_one");
    }

    #[test]
    fn upsert_overwrites_in_place() {
        let mut dataset = fixture_dataset();
        let pos = dataset.position("harvey_william").unwrap();
        let mut card = sample_card("harvey_william", "William Harvey", None);
        card.description = Some("Revised".into());
        let outcome = dataset.upsert(card, None);
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(dataset.position("harvey_william"), Some(pos));
        assert_eq!(
            dataset.cards[pos].description.as_deref(),
            Some("Revised")
        );
    }

    #[test]
    fn upsert_with_replacement_removes_old_id() {
        let mut dataset = fixture_dataset();
        let before = dataset.cards.len();
        let outcome = dataset.upsert(
            sample_card("krebs_hans", "Hans Krebs", None),
            Some("harvey_william"),
        );
        assert_eq!(
            outcome,
            UpsertOutcome::Replaced {
                old_id: "harvey_william".into()
            }
        );
        assert_eq!(dataset.cards.len(), before);
        assert!(dataset.find("harvey_william").is_none());
        assert!(dataset.find("krebs_hans").is_some());
    }

    #[test]
    fn upsert_replacement_of_same_id_is_plain_update() {
        let mut dataset = fixture_dataset();
        let outcome = dataset.upsert(
            sample_card("harvey_william", "William Harvey", None),
            Some("harvey_william"),
        );
        assert_eq!(outcome, UpsertOutcome::Updated);
    }

    #[test]
    fn upsert_replacement_of_unknown_old_id_adds() {
        let mut dataset = fixture_dataset();
        let outcome = dataset.upsert(sample_card("z", "Z", None), Some("nobody"));
        assert_eq!(outcome, UpsertOutcome::Added);
    }
}
