//! Shared test utilities for the card-gallery test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let dataset = fixture_dataset();
//! let curie = find_card(&dataset, "curie_marie");
//! assert_eq!(curie.name, "Marie Curie");
//!
//! let selection = filter_and_sort(&dataset.cards, &query, &mut seeded_rng(1));
//! ```

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};

use crate::dataset::{Card, Dataset};
use crate::naming::image_path;
use crate::types::Face;

// =========================================================================
// Fixtures
// =========================================================================

/// Path of `fixtures/cards.json`.
pub fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/cards.json")
}

/// The ten-card fixture dataset.
pub fn fixture_dataset() -> Dataset {
    Dataset::load(&fixture_path()).unwrap()
}

/// Deterministic random source.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

// =========================================================================
// Card lookups and builders
// =========================================================================

/// Find a card by id. Panics with the known ids if not found.
pub fn find_card<'a>(dataset: &'a Dataset, id: &str) -> &'a Card {
    dataset.find(id).unwrap_or_else(|| {
        let ids: Vec<&str> = dataset.cards.iter().map(|c| c.id.as_str()).collect();
        panic!("card '{id}' not found. Available: {ids:?}")
    })
}

/// A minimal card with conventional image paths.
pub fn sample_card(id: &str, name: &str, era: Option<&str>) -> Card {
    Card {
        id: id.to_string(),
        name: name.to_string(),
        years: None,
        era: era.map(str::to_string),
        description: None,
        front: image_path("cards", id, Face::Front),
        back: image_path("cards", id, Face::Back),
        submitter: None,
        submitted_date: None,
        late_submission: false,
        extra: Default::default(),
    }
}
