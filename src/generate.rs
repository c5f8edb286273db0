//! HTML site generation.
//!
//! Renders an [`AppState`] into static pages. Rendering is a pure projection:
//! every `render_*` function takes the state by shared reference and returns
//! [`Markup`].
//!
//! ## Generated Pages
//!
//! - **Grid page** (`/index.html`): query snapshot, card count, and the flip grid
//! - **Carousel page** (`/carousel.html`): the 3D ring followed by the
//!   selection grouped into era sections
//! - **Load failure page** (`/index.html`): written instead of the above when
//!   the dataset cannot be read
//!
//! ## Interaction Without Scripts
//!
//! Cards flip through a hidden checkbox and a `<label>`; the lightbox is one
//! overlay per selected card, shown through the `:target` pseudo-class. Prev
//! and next links inside each overlay point at the neighbouring overlays,
//! wrapping at both ends, so keyboard-free navigation matches the lightbox
//! state machine. The overlay for the card open in the state (if any) is
//! rendered with the `active` class.
//!
//! Search, era and sort are fixed when the page is built. The page shows them
//! as a disabled snapshot; changing them means rebuilding with other flags.
//! Ring rotation, spin and auto-advance have no static counterpart, so the
//! carousel page renders the ring as the state left it, without buttons.
//!
//! ## Broken Images
//!
//! Every `<img>` carries an `onerror` handler that swaps in an inline SVG
//! placeholder. Front and back have their own placeholder, and a failing
//! image never affects its siblings.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html          # Grid
//! ├── carousel.html       # Ring + era sections
//! └── cards/              # Card images copied from the data directory
//!     ├── curie_marie_front.png
//!     └── ...
//! ```

use maud::{DOCTYPE, Markup, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::angle;
use crate::app::AppState;
use crate::config::{self, GalleryConfig};
use crate::dataset::{Card, Dataset};
use crate::filter::{EraFilter, SortMode};
use crate::naming::short_label;
use crate::types::{Direction, Face, wrap_step};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub const LOAD_FAILURE_MESSAGE: &str = "Unable to load cards. Please refresh the page.";
pub const EMPTY_MESSAGE: &str = "No cards match your search.";

/// Rendered width of a carousel card; the ring radius is derived from it.
pub const CARD_WIDTH_PX: f64 = 220.0;

const CSS_STATIC: &str = include_str!("../static/style.css");

/// Words of the era label shown in the corner tag of a card face.
const ERA_TAG_WORDS: usize = 3;

/// What [`generate_site`] wrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub pages: Vec<PathBuf>,
    pub shown: usize,
    pub total: usize,
    /// `(era label, cards)` in section order.
    pub eras: Vec<(String, usize)>,
    pub images_copied: usize,
    pub images_missing: usize,
}

/// Theme variables followed by the embedded base stylesheet.
pub fn stylesheet(config: &GalleryConfig) -> String {
    format!(
        "{}\n\n{}",
        config::generate_theme_css(&config.theme),
        CSS_STATIC
    )
}

/// Write the grid and carousel pages for `state` into `output_dir`, copying
/// card images found under `data_root`.
pub fn generate_site(
    state: &AppState,
    config: &GalleryConfig,
    data_root: &Path,
    output_dir: &Path,
) -> Result<BuildReport, GenerateError> {
    let css = stylesheet(config);
    fs::create_dir_all(output_dir)?;

    let mut report = BuildReport {
        shown: state.selection().len(),
        total: state.dataset().cards.len(),
        eras: state
            .era_groups()
            .iter()
            .map(|g| (g.label.to_string(), g.members.len()))
            .collect(),
        ..Default::default()
    };

    let index = output_dir.join("index.html");
    fs::write(&index, render_grid_page(state, config, &css).into_string())?;
    info!(path = %index.display(), cards = report.shown, "wrote grid page");
    report.pages.push(index);

    let carousel = output_dir.join("carousel.html");
    fs::write(&carousel, render_carousel_page(state, config, &css).into_string())?;
    info!(path = %carousel.display(), ring = state.carousel().len(), "wrote carousel page");
    report.pages.push(carousel);

    if data_root != output_dir {
        let (copied, missing) = copy_card_images(state.dataset(), data_root, output_dir)?;
        report.images_copied = copied;
        report.images_missing = missing;
    }
    Ok(report)
}

/// Write the load-failure page in place of the gallery.
pub fn generate_failure_page(
    config: &GalleryConfig,
    output_dir: &Path,
) -> Result<PathBuf, GenerateError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("index.html");
    let css = stylesheet(config);
    fs::write(&path, render_load_failure(config, &css).into_string())?;
    warn!(path = %path.display(), "wrote load failure page");
    Ok(path)
}

/// Whether an image locator points inside the repository.
fn is_local_locator(locator: &str) -> bool {
    !locator.is_empty()
        && !locator.contains("://")
        && !locator.starts_with('/')
        && !locator.starts_with("data:")
        && !locator.split('/').any(|part| part == "..")
}

/// Copy every local card image that exists under `data_root`.
///
/// Returns `(copied, missing)`. Missing images are not an error: the page
/// falls back to placeholders for them.
fn copy_card_images(
    dataset: &Dataset,
    data_root: &Path,
    output_dir: &Path,
) -> std::io::Result<(usize, usize)> {
    let mut copied = 0;
    let mut missing = 0;
    for card in &dataset.cards {
        for face in [Face::Front, Face::Back] {
            let locator = card.image(face);
            if !is_local_locator(locator) {
                continue;
            }
            let src = data_root.join(locator);
            if !src.is_file() {
                warn!(card = %card.id, locator, "card image not found");
                missing += 1;
                continue;
            }
            let dst = output_dir.join(locator);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&src, &dst)?;
            copied += 1;
        }
    }
    Ok((copied, missing))
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, css: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (css) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Renders the site header with the title and page links
fn site_header(title: &str, current: &str) -> Markup {
    html! {
        header.site-header {
            h1 { (title) }
            nav.site-nav {
                a href="index.html" class=[(current == "grid").then_some("current")] { "Grid" }
                a href="carousel.html" class=[(current == "carousel").then_some("current")] { "Carousel" }
            }
        }
    }
}

/// Inline SVG shown in place of a card image that fails to load.
pub fn placeholder_svg(face: Face) -> &'static str {
    match face {
        Face::Front => {
            "data:image/svg+xml,%3Csvg xmlns=%22http://www.w3.org/2000/svg%22 viewBox=%220 0 500 700%22%3E%3Crect fill=%22%231a237e%22 width=%22500%22 height=%22700%22/%3E%3Ctext fill=%22white%22 x=%22250%22 y=%22350%22 text-anchor=%22middle%22 font-size=%2220%22%3EImage Loading...%3C/text%3E%3C/svg%3E"
        }
        Face::Back => {
            "data:image/svg+xml,%3Csvg xmlns=%22http://www.w3.org/2000/svg%22 viewBox=%220 0 500 700%22%3E%3Crect fill=%22%23f5f5f0%22 width=%22500%22 height=%22700%22/%3E%3Ctext fill=%22%23333%22 x=%22250%22 y=%22350%22 text-anchor=%22middle%22 font-size=%2220%22%3EBack Side%3C/text%3E%3C/svg%3E"
        }
    }
}

fn onerror(face: Face) -> String {
    format!("this.onerror=null;this.src='{}'", placeholder_svg(face))
}

fn card_image(card: &Card, face: Face, lazy: bool) -> Markup {
    let alt = format!(
        "{} - {}",
        card.name,
        match face {
            Face::Front => "Front",
            Face::Back => "Back",
        }
    );
    html! {
        img src=(card.image(face)) alt=(alt) loading=[lazy.then_some("lazy")] onerror=(onerror(face));
    }
}

/// Element id of a card's lightbox overlay.
fn lightbox_anchor(card: &Card) -> String {
    format!("card-{}", card.id)
}

/// Both faces of a card. `toggle_id` names the checkbox that flips it.
fn card_faces(card: &Card, toggle_id: &str, flipped: bool) -> Markup {
    html! {
        input.flip-toggle type="checkbox" id=(toggle_id) checked[flipped];
        label.card for=(toggle_id) {
            div.card-face.card-front {
                (card_image(card, Face::Front, true))
                @if let Some(era) = card.era_label() {
                    span.card-era-tag { (short_label(era, ERA_TAG_WORDS)) }
                }
                div.card-info {
                    div.card-name { (card.name) }
                    div.card-years { (card.years.as_deref().unwrap_or_default()) }
                }
            }
            div.card-face.card-back {
                (card_image(card, Face::Back, true))
            }
        }
    }
}

/// Read-only view of the query the page was built with.
fn controls(state: &AppState) -> Markup {
    let query = state.query();
    html! {
        div.controls.query-snapshot {
            fieldset disabled {
                legend.snapshot-note { "Selection at build time" }
                input #search type="search" readonly placeholder="No search"
                    value=(query.search);
                select #era-filter {
                    option value="all" selected[query.era == EraFilter::All] { "All eras" }
                    @for era in &state.dataset().eras {
                        option value=(era) selected[query.era == EraFilter::Only(era.clone())] { (era) }
                    }
                }
                select #sort-by {
                    @for mode in SortMode::ALL {
                        option value=(mode.as_str()) selected[query.sort == mode] { (mode.label()) }
                    }
                }
            }
            span.count { span #count { (state.selection().len()) } " cards" }
        }
    }
}

fn empty_state(message: &str) -> Markup {
    html! {
        div.empty-state {
            p { (message) }
        }
    }
}

/// One card in the grid.
fn grid_card(state: &AppState, position: usize, card_idx: usize) -> Markup {
    let card = &state.dataset().cards[card_idx];
    let toggle = format!("flip-grid-{}", card.id);
    html! {
        div.card-wrapper data-index=(position) data-era=(card.era.as_deref().unwrap_or_default()) {
            (card_faces(card, &toggle, state.is_grid_flipped(card_idx)))
            a.card-open href={ "#" (lightbox_anchor(card)) } aria-label={ "Open " (card.name) } { "⤢" }
        }
    }
}

/// The flip grid, or the empty state.
pub fn render_grid(state: &AppState) -> Markup {
    html! {
        @if state.selection().is_empty() {
            (empty_state(EMPTY_MESSAGE))
        } @else {
            div #gallery.gallery {
                @for (position, &card_idx) in state.selection().iter().enumerate() {
                    (grid_card(state, position, card_idx))
                }
            }
        }
    }
}

/// One overlay per selected card; the card open in `state` is `active`.
pub fn render_lightboxes(state: &AppState) -> Markup {
    let selection = state.selection();
    let cursor = state.lightbox().cursor();
    let neighbour = |position: usize, direction: Direction| -> String {
        wrap_step(position, direction, selection.len())
            .map(|p| format!("#{}", lightbox_anchor(&state.dataset().cards[selection[p]])))
            .unwrap_or_default()
    };
    html! {
        @for (position, &card_idx) in selection.iter().enumerate() {
            @let card = &state.dataset().cards[card_idx];
            @let open = cursor.filter(|c| c.index == position);
            @let toggle = format!("flip-lightbox-{}", card.id);
            section.lightbox.active[open.is_some()] id=(lightbox_anchor(card)) {
                a.lightbox-close href="#" aria-label="Close" { "×" }
                a.lightbox-prev href=(neighbour(position, Direction::Previous)) aria-label="Previous" { "‹" }
                div.lightbox-content {
                    (card_faces(card, &toggle, open.is_some_and(|c| c.face == Face::Back)))
                }
                a.lightbox-next href=(neighbour(position, Direction::Next)) aria-label="Next" { "›" }
            }
        }
    }
}

/// The carousel ring at its current rotation.
pub fn render_ring(state: &AppState) -> Markup {
    let carousel = state.carousel();
    let radius = angle::ring_radius(carousel.len(), CARD_WIDTH_PX);
    let ring_style = format!(
        "transform: translateZ(-{radius}px) rotateY({}deg);",
        carousel.rotation()
    );
    html! {
        @if carousel.is_empty() {
            div.carousel.carousel-empty {
                (empty_state(EMPTY_MESSAGE))
            }
        } @else {
            div.carousel {
                div.carousel-ring style=(ring_style) data-rotation=(carousel.rotation()) {
                    @for item in carousel.items() {
                        @let card = &state.dataset().cards[item.card];
                        @let toggle = format!("flip-ring-{}", card.id);
                        @let style = format!("transform: rotateY({}deg) translateZ({radius}px);", item.offset);
                        div.carousel-item.center[item.is_center] style=(style) data-position=(item.position) {
                            (card_faces(card, &toggle, item.flipped))
                            @if item.is_center {
                                a.card-open href={ "#" (lightbox_anchor(card)) } aria-label={ "Open " (card.name) } { "⤢" }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// The selection grouped into era sections.
pub fn render_era_sections(state: &AppState) -> Markup {
    html! {
        @for group in state.era_groups() {
            section.era-section {
                h2 { (group.label) " " span.era-count { "(" (group.members.len()) ")" } }
                div.gallery {
                    @for &card_idx in &group.members {
                        @let position = state.selection().iter().position(|&c| c == card_idx).unwrap_or_default();
                        (grid_card(state, position, card_idx))
                    }
                }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

pub fn render_grid_page(state: &AppState, config: &GalleryConfig, css: &str) -> Markup {
    let content = html! {
        (site_header(&config.site.title, "grid"))
        main.grid-page {
            (controls(state))
            (render_grid(state))
        }
        (render_lightboxes(state))
    };
    base_document(&config.site.title, css, None, content)
}

pub fn render_carousel_page(state: &AppState, config: &GalleryConfig, css: &str) -> Markup {
    let content = html! {
        (site_header(&config.site.title, "carousel"))
        main.carousel-page {
            (controls(state))
            (render_ring(state))
            (render_era_sections(state))
        }
        (render_lightboxes(state))
    };
    base_document(&config.site.title, css, Some("carousel-view"), content)
}

pub fn render_load_failure(config: &GalleryConfig, css: &str) -> Markup {
    let content = html! {
        (site_header(&config.site.title, "grid"))
        main.grid-page {
            (empty_state(LOAD_FAILURE_MESSAGE))
        }
    };
    base_document(&config.site.title, css, None, content)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Query;
    use crate::test_helpers::{fixture_dataset, sample_card, seeded_rng};
    use tempfile::TempDir;

    fn state_with(query: Query) -> AppState {
        AppState::new(fixture_dataset(), &GalleryConfig::default(), seeded_rng(3), 0)
            .with_query(query, 0)
    }

    fn state() -> AppState {
        state_with(Query::default())
    }

    #[test]
    fn base_document_includes_doctype() {
        let content = html! { p { "test" } };
        let doc = base_document("Test", "body {}", None, content).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn base_document_applies_body_class() {
        let content = html! { p { "test" } };
        let doc = base_document("Test", "", Some("carousel-view"), content).into_string();
        assert!(doc.contains(r#"<body class="carousel-view">"#));
    }

    #[test]
    fn grid_renders_every_selected_card() {
        let html = render_grid(&state()).into_string();
        assert_eq!(html.matches("class=\"card-wrapper\"").count(), 10);
        assert!(html.contains("cards/curie_marie_front.png"));
        assert!(html.contains("Marie Curie - Back"));
    }

    #[test]
    fn grid_reports_count_in_controls() {
        let state = state_with(Query {
            era: EraFilter::Only("Renaissance".into()),
            ..Default::default()
        });
        let html = controls(&state).into_string();
        assert!(html.contains(r#"<span id="count">4</span>"#));
        assert!(html.contains(r#"<option value="Renaissance" selected>"#));
        assert!(html.contains(r#"<option value="name" selected>"#));
    }

    #[test]
    fn empty_selection_shows_message_and_zero_count() {
        let state = state_with(Query {
            search: "no such scientist".into(),
            ..Default::default()
        });
        let page = render_grid_page(&state, &GalleryConfig::default(), "").into_string();
        assert!(page.contains(EMPTY_MESSAGE));
        assert!(page.contains(r#"<span id="count">0</span>"#));
        assert!(!page.contains("card-wrapper"));
        assert!(render_ring(&state).into_string().contains("carousel-empty"));
    }

    #[test]
    fn load_failure_page_has_message() {
        let html = render_load_failure(&GalleryConfig::default(), "").into_string();
        assert!(html.contains(LOAD_FAILURE_MESSAGE));
        assert!(html.contains("Trading Card Gallery"));
    }

    #[test]
    fn images_carry_face_specific_placeholders() {
        let html = render_grid(&state()).into_string();
        assert!(html.contains("Image Loading..."));
        assert!(html.contains("Back Side"));
        assert_ne!(placeholder_svg(Face::Front), placeholder_svg(Face::Back));
    }

    #[test]
    fn card_text_is_escaped() {
        let mut dataset = Dataset::default();
        let mut card = sample_card("x", "<script>alert('xss')</script>", Some("Era"));
        card.years = Some("<b>1900</b>".into());
        dataset.cards.push(card);
        let state = AppState::new(dataset, &GalleryConfig::default(), seeded_rng(1), 0);
        let html = render_grid(&state).into_string();
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&lt;b&gt;1900"));
    }

    #[test]
    fn era_tag_is_shortened() {
        let mut dataset = Dataset::default();
        dataset.cards.push(sample_card(
            "x",
            "X",
            Some("Enzymology & Protein Chemistry"),
        ));
        let state = AppState::new(dataset, &GalleryConfig::default(), seeded_rng(1), 0);
        let html = render_grid(&state).into_string();
        assert!(html.contains(r#"<span class="card-era-tag">Enzymology &amp; Protein</span>"#));
    }

    #[test]
    fn flipped_grid_card_is_checked() {
        let mut state = state();
        let first = state.selection()[0];
        let id = state.dataset().cards[first].id.clone();
        state.grid_click(0, 0);
        state.tick(1000);
        let html = render_grid(&state).into_string();
        assert!(html.contains(&format!(r#"id="flip-grid-{id}" checked>"#)));
    }

    #[test]
    fn lightbox_links_wrap_around() {
        let state = state_with(Query {
            era: EraFilter::Only("Renaissance".into()),
            ..Default::default()
        });
        // Renaissance by name: Vesalius, Falloppio, da Vinci, Paracelsus
        let html = render_lightboxes(&state).into_string();
        assert!(html.contains(
            r##"<section class="lightbox" id="card-vesalius_andreas"><a class="lightbox-close" href="#" aria-label="Close">×</a><a class="lightbox-prev" href="#card-paracelsus""##
        ));
        assert!(html.contains(r##"<a class="lightbox-next" href="#card-vesalius_andreas""##));
    }

    #[test]
    fn open_lightbox_is_active() {
        let mut state = state();
        state.open_card("curie_marie", 0).unwrap();
        state.flip_lightbox();
        let html = render_lightboxes(&state).into_string();
        assert!(html.contains(r#"<section class="lightbox active" id="card-curie_marie">"#));
        assert!(html.contains(r#"id="flip-lightbox-curie_marie" checked>"#));
        assert_eq!(html.matches("lightbox active").count(), 1);
    }

    #[test]
    fn ring_marks_one_center() {
        let html = render_ring(&state()).into_string();
        assert_eq!(html.matches("carousel-item center").count(), 1);
        assert_eq!(html.matches("class=\"carousel-item").count(), 7);
        assert!(html.contains("rotateY(0deg)"));
    }

    #[test]
    fn single_card_ring_renders_without_buttons() {
        let mut dataset = Dataset::default();
        dataset.cards.push(sample_card("x", "X", None));
        let state = AppState::new(dataset, &GalleryConfig::default(), seeded_rng(1), 0);
        let html = render_ring(&state).into_string();
        assert_eq!(html.matches("carousel-item center").count(), 1);
        assert!(!html.contains("<button"));
    }

    #[test]
    fn pages_show_query_as_disabled_snapshot() {
        let state = state_with(Query {
            search: "an".into(),
            sort: SortMode::Era,
            ..Default::default()
        });
        let config = GalleryConfig::default();
        for page in [
            render_grid_page(&state, &config, "").into_string(),
            render_carousel_page(&state, &config, "").into_string(),
        ] {
            assert!(page.contains("<fieldset disabled>"));
            assert!(page.contains(r#"value="an""#));
            assert!(!page.contains("<form"));
            assert!(!page.contains("<button"));
        }
    }

    #[test]
    fn era_sections_follow_dataset_order() {
        let html = render_era_sections(&state()).into_string();
        let renaissance = html.find("<h2>Renaissance").unwrap();
        let revolution = html.find("<h2>Scientific Revolution").unwrap();
        let modern = html.find("<h2>Modern Biochemistry").unwrap();
        assert!(renaissance < revolution && revolution < modern);
        assert!(!html.contains("Genomics Era"));
    }

    #[test]
    fn generate_site_writes_pages_and_copies_images() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::create_dir_all(data.path().join("cards")).unwrap();
        fs::write(data.path().join("cards/curie_marie_front.png"), b"png").unwrap();

        let report =
            generate_site(&state(), &GalleryConfig::default(), data.path(), out.path()).unwrap();
        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.shown, 10);
        assert_eq!(report.images_copied, 1);
        assert_eq!(report.images_missing, 19);
        assert!(out.path().join("index.html").exists());
        assert!(out.path().join("carousel.html").exists());
        assert!(out.path().join("cards/curie_marie_front.png").exists());

        let index = fs::read_to_string(out.path().join("index.html")).unwrap();
        assert!(index.contains("--color-accent"));
    }

    #[test]
    fn failure_page_replaces_index() {
        let out = TempDir::new().unwrap();
        let path = generate_failure_page(&GalleryConfig::default(), out.path()).unwrap();
        assert!(fs::read_to_string(path).unwrap().contains(LOAD_FAILURE_MESSAGE));
    }

    #[test]
    fn remote_and_escaping_locators_are_not_copied() {
        assert!(is_local_locator("cards/a.png"));
        assert!(!is_local_locator("https://example.org/a.png"));
        assert!(!is_local_locator("/etc/passwd"));
        assert!(!is_local_locator("../secret.png"));
        assert!(!is_local_locator(""));
    }
}
