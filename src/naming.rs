//! Card identifiers and image paths derived from submitted names.
//!
//! Every card is keyed by an identifier built from the scientist's name:
//! `lastname_firstname`, lowercased. The same identifier names the card's
//! image files, so re-submitting the same scientist overwrites both the
//! images and the manifest record instead of creating a duplicate.
//!
//! ## Derivation
//!
//! 1. Strip every character that is not a word character, whitespace, or `-`.
//! 2. Split on whitespace.
//! 3. Two or more tokens: `{last}_{first}`, both lowercased. Middle tokens
//!    are dropped.
//! 4. One token: the token lowercased.
//!
//! - `"Marie Curie"` → `curie_marie`
//! - `"Antonie van Leeuwenhoek"` → `leeuwenhoek_antonie`
//! - `"Dorothy Crowfoot-Hodgkin"` → `crowfoot-hodgkin_dorothy`
//! - `"Paracelsus"` → `paracelsus`
//! - `"Jöns Jacob Berzelius"` → `berzelius_jöns`
//!
//! The heuristic collides for different people sharing a first and last
//! name, and splits particles oddly (`"Ramón y Cajal"` → `cajal_ramón`).
//! Submissions carry no better key, so collisions are resolved by overwrite.

use crate::types::Face;

/// Derive the card identifier for a scientist name. Empty for a name with no
/// word characters.
pub fn derive_card_id(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let parts: Vec<&str> = cleaned.split_whitespace().collect();
    match parts.as_slice() {
        [] => String::new(),
        [only] => only.to_lowercase(),
        [first, .., last] => format!("{}_{}", last.to_lowercase(), first.to_lowercase()),
    }
}

/// Repository path of a card image: `{cards_dir}/{id}_{face}.png`.
pub fn image_path(cards_dir: &str, card_id: &str, face: Face) -> String {
    let dir = cards_dir.trim_end_matches('/');
    if dir.is_empty() {
        format!("{}_{}.png", card_id, face.as_str())
    } else {
        format!("{}/{}_{}.png", dir, card_id, face.as_str())
    }
}

/// First `max_words` words of a label, for compact era tags on card faces.
///
/// `"Enzymology & Protein Chemistry"` with 3 words → `"Enzymology & Protein"`.
pub fn short_label(label: &str, max_words: usize) -> String {
    label
        .split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}
