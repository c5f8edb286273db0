//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Cards are listed by their position and display name, with the identifier
//! and era as indented context lines. Paths only appear where a command wrote
//! files.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! 001 Andreas Vesalius (1514-1564)
//!     Id: vesalius_andreas
//!     Era: Renaissance
//! 002 Gabriele Falloppio (1523-1562)
//!     Id: falloppio_gabriele
//!     Era: Renaissance
//!     Late submission
//!
//! Showing 2 of 10 cards
//! ```
//!
//! ## Build
//!
//! ```text
//! Renaissance (4)
//! Scientific Revolution (3)
//! Modern Biochemistry (3)
//!
//! Pages
//!     dist/index.html
//!     dist/carousel.html
//!
//! Rendered 10 of 10 cards, copied 20 images
//! ```
//!
//! ## Sync
//!
//! ```text
//! 001 Marie Curie → curie_marie (added)
//! 002 Rosalind Franklin → franklin_rosalind (replaced franklin_r, late)
//! 003 failed: row has no value for scientist_name (column 5)
//!
//! Synced 2 of 3 rows, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::dataset::{Card, UpsertOutcome};
use crate::generate::BuildReport;
use crate::sync::{RowReport, SyncOutcome};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Header line for a card: index, name, and life span when known.
fn card_header(index: usize, card: &Card) -> String {
    match card.years.as_deref() {
        Some(years) if !years.is_empty() => {
            format!("{} {} ({})", format_index(index), card.name, years)
        }
        _ => format!("{} {}", format_index(index), card.name),
    }
}

fn upsert_detail(outcome: &SyncOutcome) -> String {
    let action = match &outcome.upsert {
        UpsertOutcome::Added => "added".to_string(),
        UpsertOutcome::Updated => "updated".to_string(),
        UpsertOutcome::Replaced { old_id } => format!("replaced {old_id}"),
    };
    if outcome.late {
        format!("{action}, late")
    } else {
        action
    }
}

// ============================================================================
// list
// ============================================================================

/// Cards in selection order, followed by a count line.
pub fn format_card_list<'a>(
    cards: impl IntoIterator<Item = &'a Card>,
    total: usize,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut shown = 0;
    for (i, card) in cards.into_iter().enumerate() {
        shown += 1;
        lines.push(card_header(i + 1, card));
        lines.push(format!("{}Id: {}", indent(1), card.id));
        if let Some(era) = card.era_label() {
            lines.push(format!("{}Era: {}", indent(1), era));
        }
        if card.late_submission {
            lines.push(format!("{}Late submission", indent(1)));
        }
    }
    if shown == 0 {
        lines.push("No cards match your search.".to_string());
    } else {
        lines.push(String::new());
    }
    lines.push(format!(
        "Showing {shown} of {}",
        plural(total, "card", "cards")
    ));
    lines
}

pub fn print_card_list<'a>(cards: impl IntoIterator<Item = &'a Card>, total: usize) {
    for line in format_card_list(cards, total) {
        println!("{}", line);
    }
}

// ============================================================================
// build
// ============================================================================

pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (era, count) in &report.eras {
        lines.push(format!("{era} ({count})"));
    }
    if !report.eras.is_empty() {
        lines.push(String::new());
    }

    lines.push("Pages".to_string());
    for page in &report.pages {
        lines.push(format!("{}{}", indent(1), page.display()));
    }
    lines.push(String::new());

    let mut summary = format!(
        "Rendered {} of {}, copied {}",
        report.shown,
        plural(report.total, "card", "cards"),
        plural(report.images_copied, "image", "images")
    );
    if report.images_missing > 0 {
        summary.push_str(&format!(", {} missing", report.images_missing));
    }
    lines.push(summary);
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// sync / add
// ============================================================================

pub fn format_sync_report(reports: &[RowReport]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut failed = 0;
    for report in reports {
        match &report.result {
            Ok(outcome) => lines.push(format!(
                "{} {} → {} ({})",
                format_index(report.row),
                outcome.scientist_name,
                outcome.card_id,
                upsert_detail(outcome)
            )),
            Err(e) => {
                failed += 1;
                lines.push(format!("{} failed: {}", format_index(report.row), e));
            }
        }
    }
    if !reports.is_empty() {
        lines.push(String::new());
    }
    let mut summary = format!(
        "Synced {} of {}",
        reports.len() - failed,
        plural(reports.len(), "row", "rows")
    );
    if failed > 0 {
        summary.push_str(&format!(", {failed} failed"));
    }
    lines.push(summary);
    lines
}

pub fn print_sync_report(reports: &[RowReport]) {
    for line in format_sync_report(reports) {
        println!("{}", line);
    }
}

/// Result line for a hand-added card.
pub fn format_add_result(card: &Card, outcome: &UpsertOutcome, manifest: &str) -> Vec<String> {
    let verb = match outcome {
        UpsertOutcome::Added => "Added".to_string(),
        UpsertOutcome::Updated => "Updated".to_string(),
        UpsertOutcome::Replaced { old_id } => format!("Replaced {old_id} with"),
    };
    vec![
        format!("{verb} {} ({})", card.name, card.id),
        format!("{}Front: {}", indent(1), card.front),
        format!("{}Back: {}", indent(1), card.back),
        format!("{}Manifest: {}", indent(1), manifest),
    ]
}

pub fn print_add_result(card: &Card, outcome: &UpsertOutcome, manifest: &str) {
    for line in format_add_result(card, outcome, manifest) {
        println!("{}", line);
    }
}
