//! Form submissions into the card repository.
//!
//! Students submit cards through one of two forms. Each response row names a
//! scientist, some text fields, and two uploaded images. Syncing a row:
//!
//! ```text
//! row ──► Submission ──► fetch front/back ──► upload cards/{id}_{face}.png
//!                                                    │
//!                              cards.json ◄── upsert ┘
//! ```
//!
//! The card identifier comes from [`derive_card_id`], so re-submitting the
//! same scientist overwrites the earlier card instead of duplicating it. A
//! late-form row marked as a replacement may name the scientist it replaces;
//! that card is removed from the manifest first.
//!
//! ## Storage
//!
//! The repository is reached through [`ContentStore`]: read a file with its
//! revision, write a file only if the revision still matches. A write made
//! against a stale revision fails with [`SyncError::Conflict`], which is what
//! keeps two concurrent syncs from losing each other's manifest updates.
//! [`FsStore`] implements it over a local checkout with SHA-256 content
//! hashes as revisions.
//!
//! ## Failure
//!
//! A failing row is aborted and logged. The manifest is only written as the
//! last step, so it is never left half-updated; images uploaded before the
//! failure stay in place and are overwritten by the next successful sync of
//! the same scientist.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::dataset::{Card, Dataset, DatasetError, UpsertOutcome};
use crate::naming::{derive_card_id, image_path};
use crate::types::Face;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("{path} is not valid UTF-8")]
    Encoding { path: String },
    #[error("{path} changed since it was read")]
    Conflict { path: String },
    #[error("invalid repository path: {0}")]
    InvalidPath(String),
    #[error("row has no value for {field} (column {column})")]
    MissingColumn { field: &'static str, column: usize },
    #[error("scientist name yields an empty card id")]
    EmptyName,
    #[error("could not retrieve image {0}")]
    ImageNotFound(String),
}

// =============================================================================
// Submissions
// =============================================================================

/// Which form a response row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Regular,
    Late,
}

/// 1-indexed response column positions for one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMap {
    pub student_name: usize,
    pub scientist_name: usize,
    pub scientist_years: usize,
    pub era: usize,
    pub contribution: usize,
    pub front_image: usize,
    pub back_image: usize,
    /// "New submission" or "Replacement". Late form only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_type: Option<usize>,
    /// Name of the scientist a replacement supersedes. Late form only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_scientist: Option<usize>,
}

impl ColumnMap {
    /// Layout of the regular submission form.
    pub fn regular() -> Self {
        Self {
            student_name: 3,
            scientist_name: 5,
            scientist_years: 6,
            era: 7,
            contribution: 8,
            front_image: 9,
            back_image: 10,
            submission_type: None,
            previous_scientist: None,
        }
    }

    /// Layout of the late submission form.
    pub fn late() -> Self {
        Self {
            student_name: 3,
            submission_type: Some(5),
            previous_scientist: Some(6),
            scientist_name: 7,
            scientist_years: 8,
            era: 9,
            contribution: 10,
            front_image: 11,
            back_image: 12,
        }
    }

    /// Every configured column with its field name.
    pub fn columns(&self) -> Vec<(&'static str, usize)> {
        let mut columns = vec![
            ("student_name", self.student_name),
            ("scientist_name", self.scientist_name),
            ("scientist_years", self.scientist_years),
            ("era", self.era),
            ("contribution", self.contribution),
            ("front_image", self.front_image),
            ("back_image", self.back_image),
        ];
        if let Some(c) = self.submission_type {
            columns.push(("submission_type", c));
        }
        if let Some(c) = self.previous_scientist {
            columns.push(("previous_scientist", c));
        }
        columns
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionKind {
    New,
    Late,
    /// Late submission superseding the card of `previous` (a scientist name).
    Replacement { previous: String },
}

/// One form response, cells already picked out of the row.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub kind: SubmissionKind,
    pub student_name: String,
    pub scientist_name: String,
    pub scientist_years: String,
    pub era: String,
    pub contribution: String,
    pub front_image: String,
    pub back_image: String,
}

fn cell<'a>(row: &'a [String], field: &'static str, column: usize) -> Result<&'a str, SyncError> {
    column
        .checked_sub(1)
        .and_then(|i| row.get(i))
        .map(|s| s.trim())
        .ok_or(SyncError::MissingColumn { field, column })
}

fn optional_cell(row: &[String], column: Option<usize>) -> &str {
    column
        .and_then(|c| c.checked_sub(1))
        .and_then(|i| row.get(i))
        .map_or("", |s| s.trim())
}

impl Submission {
    pub fn from_row(row: &[String], columns: &ColumnMap, form: FormKind) -> Result<Self, SyncError> {
        let kind = match form {
            FormKind::Regular => SubmissionKind::New,
            FormKind::Late => {
                let submission_type = optional_cell(row, columns.submission_type);
                let previous = optional_cell(row, columns.previous_scientist);
                if submission_type.to_lowercase().contains("replacement") && !previous.is_empty() {
                    SubmissionKind::Replacement {
                        previous: previous.to_string(),
                    }
                } else {
                    SubmissionKind::Late
                }
            }
        };
        let front_image = cell(row, "front_image", columns.front_image)?;
        let back_image = cell(row, "back_image", columns.back_image)?;
        if front_image.is_empty() {
            return Err(SyncError::MissingColumn {
                field: "front_image",
                column: columns.front_image,
            });
        }
        if back_image.is_empty() {
            return Err(SyncError::MissingColumn {
                field: "back_image",
                column: columns.back_image,
            });
        }
        Ok(Self {
            kind,
            student_name: cell(row, "student_name", columns.student_name)?.to_string(),
            scientist_name: cell(row, "scientist_name", columns.scientist_name)?.to_string(),
            scientist_years: cell(row, "scientist_years", columns.scientist_years)?.to_string(),
            era: cell(row, "era", columns.era)?.to_string(),
            contribution: cell(row, "contribution", columns.contribution)?.to_string(),
            front_image: front_image.to_string(),
            back_image: back_image.to_string(),
        })
    }

    pub fn is_late(&self) -> bool {
        self.kind != SubmissionKind::New
    }

    /// Identifier of the card this submission replaces, when it names a
    /// different scientist.
    pub fn replaced_id(&self, card_id: &str) -> Option<String> {
        match &self.kind {
            SubmissionKind::Replacement { previous } => {
                let old = derive_card_id(previous);
                (!old.is_empty() && old != card_id).then_some(old)
            }
            _ => None,
        }
    }

    fn image_message(&self, face: Face) -> String {
        let suffix = if self.is_late() { " (late submission)" } else { "" };
        format!(
            "Add {} image for {}{}",
            face.as_str(),
            self.scientist_name,
            suffix
        )
    }

    fn manifest_message(&self) -> String {
        if self.is_late() {
            format!(
                "Late submission: {} by {}",
                self.scientist_name, self.student_name
            )
        } else {
            format!("Add card for {}", self.scientist_name)
        }
    }
}

/// Parse a responses file: a JSON array of rows, each an array of cells.
///
/// Non-string cells (numbers, booleans) are kept as their JSON text so a
/// spreadsheet export with numeric years still reads.
pub fn parse_rows(content: &str) -> Result<Vec<Vec<String>>, SyncError> {
    let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(content)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect())
}

// =============================================================================
// Content store
// =============================================================================

/// Opaque version token for a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    pub fn of(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub content: Vec<u8>,
    pub revision: Revision,
}

/// A write that landed in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub path: String,
    pub message: String,
    pub revision: Revision,
}

/// Versioned file storage addressed by repository-relative paths.
pub trait ContentStore {
    fn read(&self, path: &str) -> Result<Option<StoredFile>, SyncError>;

    /// Write `content` at `path`.
    ///
    /// `expected` must be the revision last read, or `None` if the file did
    /// not exist. Anything else is a [`SyncError::Conflict`].
    fn write(
        &mut self,
        path: &str,
        content: &[u8],
        expected: Option<&Revision>,
        message: &str,
    ) -> Result<Commit, SyncError>;

    /// Write whatever is currently at `path`.
    fn put(&mut self, path: &str, content: &[u8], message: &str) -> Result<Commit, SyncError> {
        let current = self.read(path)?.map(|f| f.revision);
        self.write(path, content, current.as_ref(), message)
    }
}

/// A local checkout of the card repository.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    commits: Vec<Commit>,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            commits: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes made through this store, oldest first.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SyncError> {
        let relative = Path::new(path);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !plain {
            return Err(SyncError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ContentStore for FsStore {
    fn read(&self, path: &str) -> Result<Option<StoredFile>, SyncError> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Ok(None);
        }
        let content = fs::read(&full)?;
        let revision = Revision::of(&content);
        Ok(Some(StoredFile { content, revision }))
    }

    fn write(
        &mut self,
        path: &str,
        content: &[u8],
        expected: Option<&Revision>,
        message: &str,
    ) -> Result<Commit, SyncError> {
        let current = self.read(path)?.map(|f| f.revision);
        if current.as_ref() != expected {
            return Err(SyncError::Conflict {
                path: path.to_string(),
            });
        }
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content)?;
        let commit = Commit {
            path: path.to_string(),
            message: message.to_string(),
            revision: Revision::of(content),
        };
        debug!(path, message, "wrote file");
        self.commits.push(commit.clone());
        Ok(commit)
    }
}

// =============================================================================
// Image sources
// =============================================================================

/// Where submitted images come from.
pub trait ImageSource {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, SyncError>;
}

/// File id in a Google Drive share link (`...?id=ID&...` or `.../d/ID/...`).
pub fn drive_file_id(url: &str) -> Option<&str> {
    let id = if let Some((_, rest)) = url.split_once("id=") {
        rest.split('&').next()
    } else if let Some((_, rest)) = url.split_once("/d/") {
        rest.split('/').next()
    } else {
        None
    }?;
    (!id.is_empty()).then_some(id)
}

/// Images downloaded into a local directory.
///
/// A Drive link resolves to the file named after its file id, with or
/// without an extension. Any other locator is a path relative to the
/// directory.
#[derive(Debug, Clone)]
pub struct FsImages {
    dir: PathBuf,
}

impl FsImages {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, locator: &str) -> Vec<PathBuf> {
        match drive_file_id(locator) {
            Some(id) => ["", ".png", ".jpg", ".jpeg"]
                .iter()
                .map(|ext| self.dir.join(format!("{id}{ext}")))
                .collect(),
            None => vec![self.dir.join(locator)],
        }
    }
}

impl ImageSource for FsImages {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, SyncError> {
        for candidate in self.candidates(locator) {
            if candidate.is_file() {
                return Ok(fs::read(candidate)?);
            }
        }
        Err(SyncError::ImageNotFound(locator.to_string()))
    }
}

// =============================================================================
// Sync
// =============================================================================

/// Current date as stored in `submitted_date`.
pub fn submitted_date(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Current instant as stored in `last_updated`.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read the manifest, upsert `card`, and write it back against the revision
/// that was read.
///
/// A missing manifest starts with no cards and the layout's default eras.
/// Nothing is written if any step before the final write fails.
pub fn upsert_manifest<S: ContentStore>(
    store: &mut S,
    layout: &Layout,
    card: Card,
    replaces: Option<&str>,
    message: &str,
    now: DateTime<Utc>,
) -> Result<UpsertOutcome, SyncError> {
    let manifest = layout.manifest.as_str();
    let (mut dataset, revision) = match store.read(manifest)? {
        Some(file) => {
            let text = String::from_utf8(file.content).map_err(|_| SyncError::Encoding {
                path: manifest.to_string(),
            })?;
            (Dataset::from_json(&text)?, Some(file.revision))
        }
        None => {
            info!(manifest, eras = layout.default_eras.len(), "starting new manifest");
            let dataset = Dataset {
                eras: layout.default_eras.clone(),
                ..Default::default()
            };
            (dataset, None)
        }
    };
    let outcome = dataset.upsert(card, replaces);
    dataset.last_updated = timestamp(now);
    let content = dataset.to_json_pretty()?;
    store.write(manifest, content.as_bytes(), revision.as_ref(), message)?;
    Ok(outcome)
}

/// Result of syncing one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub card_id: String,
    pub scientist_name: String,
    pub upsert: UpsertOutcome,
    pub late: bool,
}

/// Per-row result of a batch.
#[derive(Debug)]
pub struct RowReport {
    /// 1-based position in the responses file.
    pub row: usize,
    pub result: Result<SyncOutcome, SyncError>,
}

/// Where synced files land in the repository.
#[derive(Debug, Clone)]
pub struct Layout {
    pub cards_dir: String,
    pub manifest: String,
    /// Era list written into a manifest that does not exist yet.
    pub default_eras: Vec<String>,
}

pub struct Syncer<'a, S, I> {
    store: &'a mut S,
    images: &'a I,
    layout: Layout,
}

impl<'a, S: ContentStore, I: ImageSource> Syncer<'a, S, I> {
    pub fn new(store: &'a mut S, images: &'a I, layout: Layout) -> Self {
        Self {
            store,
            images,
            layout,
        }
    }

    /// Upload both images and upsert the card.
    ///
    /// Both images are fetched before anything is written, so a missing
    /// image leaves the repository untouched.
    pub fn process(
        &mut self,
        submission: &Submission,
        now: DateTime<Utc>,
    ) -> Result<SyncOutcome, SyncError> {
        let card_id = derive_card_id(&submission.scientist_name);
        if card_id.is_empty() {
            return Err(SyncError::EmptyName);
        }
        info!(card_id = %card_id, late = submission.is_late(), "processing submission");

        let front = self.images.fetch(&submission.front_image)?;
        let back = self.images.fetch(&submission.back_image)?;

        let front_path = image_path(&self.layout.cards_dir, &card_id, Face::Front);
        let back_path = image_path(&self.layout.cards_dir, &card_id, Face::Back);
        self.store
            .put(&front_path, &front, &submission.image_message(Face::Front))?;
        self.store
            .put(&back_path, &back, &submission.image_message(Face::Back))?;

        let replaces = submission.replaced_id(&card_id);
        let card = Card {
            id: card_id.clone(),
            name: submission.scientist_name.clone(),
            years: Some(submission.scientist_years.clone()),
            era: Some(submission.era.clone()),
            description: Some(submission.contribution.clone()),
            front: front_path,
            back: back_path,
            submitter: Some(submission.student_name.clone()),
            submitted_date: Some(submitted_date(now)),
            late_submission: submission.is_late(),
            extra: Default::default(),
        };
        let upsert = upsert_manifest(
            &mut *self.store,
            &self.layout,
            card,
            replaces.as_deref(),
            &submission.manifest_message(),
            now,
        )?;
        info!(card_id = %card_id, ?upsert, "card synced");
        Ok(SyncOutcome {
            card_id,
            scientist_name: submission.scientist_name.clone(),
            upsert,
            late: submission.is_late(),
        })
    }

    /// Sync every row, continuing past failures.
    pub fn process_rows(
        &mut self,
        rows: &[Vec<String>],
        columns: &ColumnMap,
        form: FormKind,
        now: DateTime<Utc>,
    ) -> Vec<RowReport> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let result = Submission::from_row(row, columns, form)
                    .and_then(|submission| self.process(&submission, now));
                if let Err(e) = &result {
                    error!(row = i + 1, error = %e, "submission failed");
                }
                RowReport { row: i + 1, result }
            })
            .collect()
    }
}

/// A card typed in by hand, with its images already placed in the cards
/// directory.
#[derive(Debug, Clone, Default)]
pub struct ManualEntry {
    pub name: String,
    pub years: String,
    pub era: String,
    pub contribution: String,
    /// File name inside the cards directory.
    pub front_file: String,
    pub back_file: String,
    pub student: String,
}

impl ManualEntry {
    pub fn into_card(self, cards_dir: &str, now: DateTime<Utc>) -> Result<Card, SyncError> {
        let id = derive_card_id(&self.name);
        if id.is_empty() {
            return Err(SyncError::EmptyName);
        }
        let dir = cards_dir.trim_end_matches('/');
        Ok(Card {
            id,
            name: self.name,
            years: Some(self.years),
            era: Some(self.era),
            description: Some(self.contribution),
            front: format!("{dir}/{}", self.front_file),
            back: format!("{dir}/{}", self.back_file),
            submitter: Some(self.student),
            submitted_date: Some(submitted_date(now)),
            late_submission: false,
            extra: Default::default(),
        })
    }
}
