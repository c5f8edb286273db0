//! Filtering, sorting and grouping of cards.
//!
//! [`filter_and_sort`] is the one entry point the application state uses to
//! derive the visible selection from the full dataset. It returns indices into
//! `Dataset::cards` rather than clones, so the dataset stays the sole owner of
//! every card.
//!
//! ## Predicates
//!
//! - **Search**: trimmed, case-insensitive substring of the name or the
//!   description. Empty search matches everything.
//! - **Era**: `all`, or an exact match on the card's era.
//!
//! ## Sort modes
//!
//! | Mode | Order |
//! |------|-------|
//! | `name` | name ascending |
//! | `name-desc` | name descending |
//! | `era` | era ascending, missing era first |
//! | `recent` | submission date descending, missing dates last |
//! | `random` | uniform shuffle |
//!
//! Name and era comparison is case-folded first, with the raw string as a
//! tie-break, so `"de Duve"` sorts among the D's. All non-random sorts are
//! stable: cards that compare equal keep dataset order.

use rand::Rng;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::dataset::{CATCH_ALL_ERA, Card, Dataset};

#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    #[error("unknown sort mode '{0}' (expected name, name-desc, era, recent or random)")]
    UnknownSort(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Name,
    NameDesc,
    Era,
    Recent,
    Random,
}

impl SortMode {
    pub const ALL: [SortMode; 5] = [
        SortMode::Name,
        SortMode::NameDesc,
        SortMode::Era,
        SortMode::Recent,
        SortMode::Random,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Name => "name",
            SortMode::NameDesc => "name-desc",
            SortMode::Era => "era",
            SortMode::Recent => "recent",
            SortMode::Random => "random",
        }
    }

    /// Label shown in the sort selector.
    pub fn label(self) -> &'static str {
        match self {
            SortMode::Name => "Name (A-Z)",
            SortMode::NameDesc => "Name (Z-A)",
            SortMode::Era => "Era",
            SortMode::Recent => "Most recent",
            SortMode::Random => "Shuffle",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| QueryError::UnknownSort(s.to_string()))
    }
}

/// Era selector: every era, or exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EraFilter {
    #[default]
    All,
    Only(String),
}

impl EraFilter {
    pub fn matches(&self, card: &Card) -> bool {
        match self {
            EraFilter::All => true,
            EraFilter::Only(era) => card.era.as_deref() == Some(era.as_str()),
        }
    }

    /// Value used in the era selector (`all` or the era label).
    pub fn as_str(&self) -> &str {
        match self {
            EraFilter::All => "all",
            EraFilter::Only(era) => era,
        }
    }
}

impl FromStr for EraFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "all" {
            EraFilter::All
        } else {
            EraFilter::Only(s.to_string())
        })
    }
}

/// The three user-controlled inputs of the selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    pub search: String,
    pub era: EraFilter,
    pub sort: SortMode,
}

impl Query {
    /// Whether `card` passes both predicates.
    pub fn matches(&self, card: &Card) -> bool {
        let needle = self.search.trim().to_lowercase();
        matches_search(card, &needle) && self.era.matches(card)
    }
}

fn matches_search(card: &Card, needle: &str) -> bool {
    needle.is_empty()
        || card.name.to_lowercase().contains(needle)
        || card
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
}

/// Indices of the cards matching `query`, in `query.sort` order.
///
/// `rng` is only consulted for [`SortMode::Random`].
pub fn filter_and_sort<R: Rng>(cards: &[Card], query: &Query, rng: &mut R) -> Vec<usize> {
    let needle = query.search.trim().to_lowercase();
    let mut selected: Vec<usize> = cards
        .iter()
        .enumerate()
        .filter(|(_, card)| matches_search(card, &needle) && query.era.matches(card))
        .map(|(idx, _)| idx)
        .collect();

    match query.sort {
        SortMode::Random => shuffle(&mut selected, rng),
        mode => selected.sort_by(|&a, &b| compare(&cards[a], &cards[b], mode)),
    }
    selected
}

/// Ordering of two cards under a non-random sort mode.
///
/// [`SortMode::Random`] compares everything as equal.
pub fn compare(a: &Card, b: &Card, mode: SortMode) -> Ordering {
    match mode {
        SortMode::Name => locale_cmp(&a.name, &b.name),
        SortMode::NameDesc => locale_cmp(&b.name, &a.name),
        SortMode::Era => locale_cmp(
            a.era.as_deref().unwrap_or_default(),
            b.era.as_deref().unwrap_or_default(),
        ),
        SortMode::Recent => b
            .submitted_date
            .as_deref()
            .unwrap_or_default()
            .cmp(a.submitted_date.as_deref().unwrap_or_default()),
        SortMode::Random => Ordering::Equal,
    }
}

/// Case-folded comparison with the raw strings as tie-break.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// In-place Fisher-Yates shuffle.
///
/// For `i` from the last index down to 1, swap element `i` with a uniformly
/// chosen element in `0..=i`. Every permutation is equally likely given a
/// uniform `rng`.
pub fn shuffle<T, R: Rng>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// A run of cards sharing an era bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct EraGroup<'a> {
    pub label: &'a str,
    pub members: Vec<usize>,
}

/// Group an ordered selection by era.
///
/// Groups follow the dataset's era order, with the catch-all bucket last.
/// Members keep the order of `selection`. Empty groups are omitted.
pub fn group_by_era<'a>(dataset: &'a Dataset, selection: &[usize]) -> Vec<EraGroup<'a>> {
    let mut groups: Vec<EraGroup<'a>> = dataset
        .eras
        .iter()
        .map(|era| EraGroup {
            label: era.as_str(),
            members: Vec::new(),
        })
        .collect();
    let mut other = EraGroup {
        label: CATCH_ALL_ERA,
        members: Vec::new(),
    };

    for &idx in selection {
        let bucket = dataset.era_bucket(&dataset.cards[idx]);
        match groups.iter_mut().find(|g| g.label == bucket) {
            Some(group) => group.members.push(idx),
            None => other.members.push(idx),
        }
    }

    groups.push(other);
    groups.retain(|g| !g.members.is_empty());
    groups
}
