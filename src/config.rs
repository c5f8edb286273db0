//! Gallery configuration.
//!
//! Handles loading, validating, and merging `gallery.toml`. Stock defaults
//! are the base layer; the user file only needs the keys it overrides.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! title = "Trading Card Gallery"
//!
//! [carousel]
//! visible_count = 7             # Cards sampled onto the ring
//!
//! [timing]
//! auto_advance_ms = 4000        # Carousel auto-rotation period
//! interaction_cooldown_ms = 3000
//! search_debounce_ms = 200
//! click_delay_ms = 250          # Single vs double click window
//!
//! [lightbox]
//! missing_card = "error"        # or "first"
//! swipe_threshold_px = 50
//!
//! [theme]
//! background = "#0f1117"
//! surface = "#1b1e27"
//! text = "#f2f2f2"
//! accent = "#e0b34a"
//!
//! [sync]
//! cards_dir = "cards"
//! manifest = "cards.json"
//! default_eras = ["Pre-1900 Foundations", ...]  # Seeds a new manifest
//!
//! [sync.columns]                # Regular form, 1-indexed
//! student_name = 3
//! # ...
//!
//! [sync.late_columns]           # Late form, 1-indexed
//! student_name = 3
//! # ...
//! ```
//!
//! ## Partial Configuration
//!
//! ```toml
//! # Slow the carousel down, keep everything else
//! [timing]
//! auto_advance_ms = 8000
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::lightbox::MissingCardPolicy;
use crate::sync::{ColumnMap, Layout};
use crate::timing::Millis;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `gallery.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    pub site: SiteConfig,
    pub carousel: CarouselConfig,
    pub timing: TimingConfig,
    pub lightbox: LightboxConfig,
    /// Page colors, emitted as CSS custom properties.
    pub theme: ThemeConfig,
    pub sync: SyncConfig,
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.carousel.visible_count == 0 {
            return Err(ConfigError::Validation(
                "carousel.visible_count must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("auto_advance_ms", self.timing.auto_advance_ms),
            ("interaction_cooldown_ms", self.timing.interaction_cooldown_ms),
            ("search_debounce_ms", self.timing.search_debounce_ms),
            ("click_delay_ms", self.timing.click_delay_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!(
                    "timing.{name} must be greater than 0"
                )));
            }
        }
        if !(self.lightbox.swipe_threshold_px.is_finite() && self.lightbox.swipe_threshold_px > 0.0)
        {
            return Err(ConfigError::Validation(
                "lightbox.swipe_threshold_px must be a positive number".into(),
            ));
        }
        for (section, columns) in [
            ("columns", &self.sync.columns),
            ("late_columns", &self.sync.late_columns),
        ] {
            if let Some((field, _)) = columns.columns().into_iter().find(|(_, c)| *c == 0) {
                return Err(ConfigError::Validation(format!(
                    "sync.{section}.{field} is 1-indexed and must be at least 1"
                )));
            }
        }
        if self.sync.default_eras.iter().any(|e| e.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "sync.default_eras must not contain empty labels".into(),
            ));
        }
        if self.sync.manifest.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sync.manifest must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Page title and main heading.
    pub title: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Trading Card Gallery".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarouselConfig {
    /// Maximum number of cards on the ring.
    pub visible_count: usize,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self { visible_count: 7 }
    }
}

/// Interaction timing, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub auto_advance_ms: Millis,
    /// Quiet time after a user interaction before auto-advance resumes.
    pub interaction_cooldown_ms: Millis,
    pub search_debounce_ms: Millis,
    /// How long a click waits for a second click before it counts as single.
    pub click_delay_ms: Millis,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            auto_advance_ms: 4000,
            interaction_cooldown_ms: 3000,
            search_debounce_ms: 200,
            click_delay_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightboxConfig {
    pub missing_card: MissingCardPolicy,
    /// Minimum horizontal travel for a swipe to navigate.
    pub swipe_threshold_px: f64,
}

impl Default for LightboxConfig {
    fn default() -> Self {
        Self {
            missing_card: MissingCardPolicy::Error,
            swipe_threshold_px: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub background: String,
    /// Card and control backgrounds.
    pub surface: String,
    pub text: String,
    /// Highlights: active controls, era headings, focus rings.
    pub accent: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            background: "#0f1117".to_string(),
            surface: "#1b1e27".to_string(),
            text: "#f2f2f2".to_string(),
            accent: "#e0b34a".to_string(),
        }
    }
}

/// Course eras, oldest first.
pub const DEFAULT_ERAS: [&str; 16] = [
    "Pre-1900 Foundations",
    "Enzymology & Protein Chemistry",
    "Carbohydrate & Lipid Chemistry",
    "Vitamins & Nutrition",
    "Metabolic Revolutions",
    "DNA Structure & Replication",
    "Genetic Code & Protein Synthesis",
    "Structural Biology Revolution",
    "Structural Chemistry Revolution",
    "Molecular Biology of Gene Regulation",
    "Genomics & Bioinformatics Era",
    "Structural Biology & Drug Discovery",
    "Cancer Biology & Oncogenes",
    "Neuroscience & Metabolism Frontiers",
    "Contemporary Leaders & Rising Stars",
    "Synthetic Biology & Future Pioneers",
];

/// Where the submission pipeline writes, and how it reads form rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Repository directory holding card images.
    pub cards_dir: String,
    /// Repository path of the card manifest.
    pub manifest: String,
    /// Era list for a manifest created by the first sync or add.
    pub default_eras: Vec<String>,
    pub columns: ColumnMap,
    pub late_columns: ColumnMap,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cards_dir: "cards".to_string(),
            manifest: "cards.json".to_string(),
            default_eras: DEFAULT_ERAS.iter().map(|e| e.to_string()).collect(),
            columns: ColumnMap::regular(),
            late_columns: ColumnMap::late(),
        }
    }
}

impl SyncConfig {
    pub fn layout(&self) -> Layout {
        Layout {
            cards_dir: self.cards_dir.clone(),
            manifest: self.manifest.clone(),
            default_eras: self.default_eras.clone(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GalleryConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `gallery.toml` from `path`, falling back to stock defaults when the
/// file is absent.
pub fn load_config(path: &Path) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `gallery.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Card Gallery Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

[site]
# Page title and main heading.
title = "Trading Card Gallery"

# ---------------------------------------------------------------------------
# Carousel
# ---------------------------------------------------------------------------
[carousel]
# Number of cards sampled onto the 3D ring (fewer if the selection is smaller).
visible_count = 7

# ---------------------------------------------------------------------------
# Timing (milliseconds)
# ---------------------------------------------------------------------------
[timing]
# Carousel rotates one step this often while nobody is interacting.
auto_advance_ms = 4000

# After a click, swipe, or key press, wait this long before auto-advancing again.
interaction_cooldown_ms = 3000

# Search recomputes this long after the last keystroke.
search_debounce_ms = 200

# A click waits this long for a second click. Single click flips, double opens.
click_delay_ms = 250

# ---------------------------------------------------------------------------
# Lightbox
# ---------------------------------------------------------------------------
[lightbox]
# Opening a card that is not in the current selection:
#   "error" - refuse and keep the lightbox closed
#   "first" - open the first card of the selection instead
missing_card = "error"

# Minimum horizontal swipe distance (pixels) that navigates.
swipe_threshold_px = 50.0

# ---------------------------------------------------------------------------
# Theme colors
# ---------------------------------------------------------------------------
[theme]
background = "#0f1117"
surface = "#1b1e27"
text = "#f2f2f2"
accent = "#e0b34a"

# ---------------------------------------------------------------------------
# Submission sync
# ---------------------------------------------------------------------------
[sync]
# Directory (inside the repository) for card images.
cards_dir = "cards"

# Card manifest path (inside the repository).
manifest = "cards.json"

# Eras written into the manifest when the first card creates it.
default_eras = [
    "Pre-1900 Foundations",
    "Enzymology & Protein Chemistry",
    "Carbohydrate & Lipid Chemistry",
    "Vitamins & Nutrition",
    "Metabolic Revolutions",
    "DNA Structure & Replication",
    "Genetic Code & Protein Synthesis",
    "Structural Biology Revolution",
    "Structural Chemistry Revolution",
    "Molecular Biology of Gene Regulation",
    "Genomics & Bioinformatics Era",
    "Structural Biology & Drug Discovery",
    "Cancer Biology & Oncogenes",
    "Neuroscience & Metabolism Frontiers",
    "Contemporary Leaders & Rising Stars",
    "Synthetic Biology & Future Pioneers",
]

# Response columns of the regular submission form (1-indexed).
[sync.columns]
student_name = 3
scientist_name = 5
scientist_years = 6
era = 7
contribution = 8
front_image = 9
back_image = 10

# Response columns of the late submission form (1-indexed).
[sync.late_columns]
student_name = 3
submission_type = 5       # "New submission" or "Replacement"
previous_scientist = 6    # Only filled in for replacements
scientist_name = 7
scientist_years = 8
era = 9
contribution = 10
front_image = 11
back_image = 12
"##
}

/// Generate CSS custom properties from theme config.
pub fn generate_theme_css(theme: &ThemeConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {background};
    --color-surface: {surface};
    --color-text: {text};
    --color-accent: {accent};
}}"#,
        background = theme.background,
        surface = theme.surface,
        text = theme.text,
        accent = theme.accent,
    )
}
