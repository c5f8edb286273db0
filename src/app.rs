//! Application state: every gallery interaction as a method call.
//!
//! [`AppState`] owns the dataset and everything derived from it: the applied
//! query, the filtered selection, the carousel ring, the lightbox cursor, and
//! the three timers. The render layer in [`crate::generate`] reads it and
//! never mutates it.
//!
//! Time is a logical millisecond clock passed into each call. Events that
//! count as user interaction (clicks, keys, typing, selector changes) push
//! auto-advance into its cooldown before they change anything. Interactions
//! that last, such as a hover or a drag, hold auto-advance between
//! [`AppState::begin_interaction`] and [`AppState::end_interaction`]; an open
//! lightbox holds it until it closes.
//! [`AppState::tick`] advances the clock and fires whatever timers are due.
//!
//! ## Clicks
//!
//! | Target | Single click | Double click |
//! |--------|--------------|--------------|
//! | grid card | flip | open lightbox |
//! | center ring card | flip | open lightbox |
//! | other ring card | rotate it to the front (immediately) | |
//!
//! Single clicks resolve after `click_delay_ms` via [`AppState::tick`].

use rand::rngs::StdRng;
use std::collections::HashSet;
use tracing::debug;

use crate::carousel::Carousel;
use crate::config::GalleryConfig;
use crate::dataset::{Card, Dataset};
use crate::filter::{EraFilter, EraGroup, Query, SortMode, filter_and_sort, group_by_era, shuffle};
use crate::lightbox::{
    Lightbox, LightboxCommand, LightboxError, LightboxKey, MissingCardPolicy, command_for_key,
    command_for_swipe,
};
use crate::timing::{AutoAdvance, ClickAction, ClickDisambiguator, Debouncer, Millis};
use crate::types::{Direction, Face};

/// What a click landed on, by position in its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// Position in the filtered selection.
    Grid(usize),
    /// Position on the carousel ring.
    Ring(usize),
}

/// Timers that fired during one [`AppState::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub search_applied: bool,
    pub flipped: Option<ClickTarget>,
    pub advanced: bool,
}

pub struct AppState {
    dataset: Dataset,
    query: Query,
    pending_search: String,
    selection: Vec<usize>,
    carousel: Carousel,
    lightbox: Lightbox,
    auto_advance: AutoAdvance,
    debounce: Debouncer,
    clicks: ClickDisambiguator<ClickTarget>,
    /// Dataset indices of grid cards showing their back.
    grid_flipped: HashSet<usize>,
    /// Hovers and drags in progress.
    ongoing: u32,
    missing_card: MissingCardPolicy,
    swipe_threshold: f64,
    rng: StdRng,
}

impl AppState {
    /// Load state with the default query, a fresh ring, and auto-advance
    /// running from `now`.
    pub fn new(dataset: Dataset, config: &GalleryConfig, rng: StdRng, now: Millis) -> Self {
        let timing = &config.timing;
        let mut state = Self {
            dataset,
            query: Query::default(),
            pending_search: String::new(),
            selection: Vec::new(),
            carousel: Carousel::new(config.carousel.visible_count),
            lightbox: Lightbox::new(),
            auto_advance: AutoAdvance::new(timing.auto_advance_ms, timing.interaction_cooldown_ms),
            debounce: Debouncer::new(timing.search_debounce_ms),
            clicks: ClickDisambiguator::new(timing.click_delay_ms),
            grid_flipped: HashSet::new(),
            ongoing: 0,
            missing_card: config.lightbox.missing_card,
            swipe_threshold: config.lightbox.swipe_threshold_px,
            rng,
        };
        state.refilter(now);
        state.auto_advance.start(now);
        state
    }

    /// Apply a whole query at once, skipping the search debounce.
    pub fn with_query(mut self, query: Query, now: Millis) -> Self {
        self.pending_search = query.search.clone();
        self.query = query;
        self.refilter(now);
        self
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Record a keystroke in the search box. The selection updates once
    /// typing has been quiet for `search_debounce_ms`.
    pub fn type_search(&mut self, text: &str, now: Millis) {
        self.auto_advance.interact(now);
        self.pending_search = text.to_string();
        self.debounce.schedule(now);
    }

    pub fn set_era(&mut self, era: EraFilter, now: Millis) {
        self.auto_advance.interact(now);
        self.query.era = era;
        self.refilter(now);
    }

    pub fn set_sort(&mut self, sort: SortMode, now: Millis) {
        self.auto_advance.interact(now);
        self.query.sort = sort;
        self.refilter(now);
    }

    /// Shuffle the current selection in place and switch the sort to random.
    /// The ring is left alone.
    pub fn shuffle_grid(&mut self, now: Millis) {
        self.auto_advance.interact(now);
        let before = self.selection.clone();
        shuffle(&mut self.selection, &mut self.rng);
        self.query.sort = SortMode::Random;
        self.grid_flipped.clear();
        self.clicks.reset();
        self.lightbox.relocate(&before, &self.selection);
        debug!(count = self.selection.len(), "shuffled grid");
    }

    fn refilter(&mut self, now: Millis) {
        self.query.search = self.pending_search.clone();
        self.debounce.cancel();
        let before = std::mem::take(&mut self.selection);
        self.selection = filter_and_sort(&self.dataset.cards, &self.query, &mut self.rng);
        self.grid_flipped.clear();
        self.clicks.reset();
        if self.lightbox.is_open() && !self.lightbox.relocate(&before, &self.selection) {
            debug!("open card filtered out; closing lightbox");
            self.auto_advance.release(now);
        }
        self.carousel.initialize(&self.selection, &mut self.rng);
        debug!(
            search = %self.query.search,
            era = self.query.era.as_str(),
            sort = %self.query.sort,
            count = self.selection.len(),
            "refiltered"
        );
    }

    // =========================================================================
    // Carousel
    // =========================================================================

    /// Prev/next controls and carousel swipes.
    pub fn carousel_step(&mut self, direction: Direction, now: Millis) -> bool {
        self.auto_advance.interact(now);
        self.carousel.rotate_by(direction)
    }

    pub fn carousel_swipe(&mut self, dx: f64, now: Millis) -> bool {
        match command_for_swipe(dx, self.swipe_threshold) {
            Some(LightboxCommand::Navigate(direction)) => self.carousel_step(direction, now),
            _ => false,
        }
    }

    /// Resample the ring and spin onto a random card.
    pub fn spin(&mut self, now: Millis) -> f64 {
        self.auto_advance.interact(now);
        let delta = self.carousel.spin(&self.selection, &mut self.rng);
        debug!(delta, center = self.carousel.center(), "spun carousel");
        delta
    }

    /// Click on ring position `position`.
    pub fn carousel_click(&mut self, position: usize, now: Millis) {
        self.auto_advance.interact(now);
        if position >= self.carousel.len() {
            return;
        }
        if position != self.carousel.center() {
            self.clicks.reset();
            if let Ok(delta) = self.carousel.rotate_to_index(position) {
                debug!(position, delta, "rotated to clicked card");
            }
            return;
        }
        self.click(ClickTarget::Ring(position), now);
    }

    // =========================================================================
    // Grid
    // =========================================================================

    /// Click on grid position `position` of the selection.
    pub fn grid_click(&mut self, position: usize, now: Millis) {
        self.auto_advance.interact(now);
        if position < self.selection.len() {
            self.click(ClickTarget::Grid(position), now);
        }
    }

    fn click(&mut self, target: ClickTarget, now: Millis) {
        match self.clicks.click(target, now) {
            Some(ClickAction::Flip(held)) => self.apply_flip(held),
            Some(ClickAction::Open(target)) => {
                if let Some(card) = self.card_at(target)
                    && let Err(e) = self.open_lightbox(card, now)
                {
                    debug!(error = %e, "double click did not open lightbox");
                }
            }
            None => {}
        }
    }

    fn card_at(&self, target: ClickTarget) -> Option<usize> {
        match target {
            ClickTarget::Grid(pos) => self.selection.get(pos).copied(),
            ClickTarget::Ring(pos) => self.carousel.ring().get(pos).copied(),
        }
    }

    fn apply_flip(&mut self, target: ClickTarget) {
        match target {
            ClickTarget::Grid(pos) => {
                if let Some(card) = self.selection.get(pos).copied()
                    && !self.grid_flipped.remove(&card)
                {
                    self.grid_flipped.insert(card);
                }
            }
            ClickTarget::Ring(pos) => {
                if self.carousel.flip(pos).is_none() {
                    debug!(pos, "flip refused: not the center card");
                }
            }
        }
    }

    // =========================================================================
    // Lightbox
    // =========================================================================

    /// Open the lightbox on dataset card `card`.
    pub fn open_lightbox(&mut self, card: usize, now: Millis) -> Result<(), LightboxError> {
        self.auto_advance.interact(now);
        let was_open = self.lightbox.is_open();
        let cursor = self.lightbox.open(&card, &self.selection, self.missing_card)?;
        if !was_open {
            self.auto_advance.hold();
        }
        debug!(card, index = cursor.index, "opened lightbox");
        Ok(())
    }

    /// Open the lightbox on the card with identifier `id`.
    pub fn open_card(&mut self, id: &str, now: Millis) -> Result<(), LightboxError> {
        let card = self.dataset.position(id).ok_or(LightboxError::NotFound)?;
        self.open_lightbox(card, now)
    }

    pub fn navigate_lightbox(&mut self, direction: Direction) -> bool {
        self.lightbox
            .navigate(direction, self.selection.len())
            .is_some()
    }

    pub fn flip_lightbox(&mut self) -> Option<Face> {
        self.lightbox.flip()
    }

    pub fn close_lightbox(&mut self, now: Millis) -> bool {
        let was_open = self.lightbox.close();
        if was_open {
            self.auto_advance.release(now);
            debug!("closed lightbox");
        }
        was_open
    }

    pub fn lightbox_key(&mut self, key: LightboxKey, now: Millis) {
        if let Some(command) = command_for_key(key, self.lightbox.is_open()) {
            self.apply_lightbox(command, now);
        }
    }

    pub fn lightbox_swipe(&mut self, dx: f64, now: Millis) {
        if self.lightbox.is_open()
            && let Some(command) = command_for_swipe(dx, self.swipe_threshold)
        {
            self.apply_lightbox(command, now);
        }
    }

    fn apply_lightbox(&mut self, command: LightboxCommand, now: Millis) {
        match command {
            LightboxCommand::Close => {
                self.close_lightbox(now);
            }
            LightboxCommand::Navigate(direction) => {
                self.navigate_lightbox(direction);
            }
            LightboxCommand::Flip => {
                self.flip_lightbox();
            }
        }
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// A momentary interaction with no state change of its own.
    pub fn interact(&mut self, now: Millis) {
        self.auto_advance.interact(now);
    }

    /// Start of a hover or drag. Auto-advance stays paused until the matching
    /// [`end_interaction`](Self::end_interaction), then cools down.
    pub fn begin_interaction(&mut self, now: Millis) {
        self.auto_advance.interact(now);
        self.auto_advance.hold();
        self.ongoing += 1;
    }

    /// End of a hover or drag. Ignored without a matching begin.
    pub fn end_interaction(&mut self, now: Millis) {
        if self.ongoing == 0 {
            return;
        }
        self.ongoing -= 1;
        self.auto_advance.release(now);
    }

    /// Fire every timer due at `now`.
    pub fn tick(&mut self, now: Millis) -> TickReport {
        let mut report = TickReport::default();
        if self.debounce.poll(now) {
            self.refilter(now);
            report.search_applied = true;
        }
        if let Some(ClickAction::Flip(target)) = self.clicks.poll(now) {
            self.apply_flip(target);
            report.flipped = Some(target);
        }
        if self.auto_advance.poll(now) {
            report.advanced = self.carousel.rotate_by(Direction::Next);
        }
        report
    }

    // =========================================================================
    // Read access for rendering
    // =========================================================================

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Search text as typed, which may be ahead of the applied query.
    pub fn pending_search(&self) -> &str {
        &self.pending_search
    }

    /// Dataset indices of the filtered cards, in display order.
    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    pub fn selected_cards(&self) -> impl Iterator<Item = &Card> + '_ {
        self.selection.iter().map(|&i| &self.dataset.cards[i])
    }

    pub fn era_groups(&self) -> Vec<EraGroup<'_>> {
        group_by_era(&self.dataset, &self.selection)
    }

    pub fn carousel(&self) -> &Carousel {
        &self.carousel
    }

    pub fn lightbox(&self) -> &Lightbox {
        &self.lightbox
    }

    /// The open card and the face showing.
    pub fn lightbox_card(&self) -> Option<(&Card, Face)> {
        let cursor = self.lightbox.cursor()?;
        let idx = *self.selection.get(cursor.index)?;
        Some((&self.dataset.cards[idx], cursor.face))
    }

    pub fn is_grid_flipped(&self, card: usize) -> bool {
        self.grid_flipped.contains(&card)
    }

    pub fn auto_advance(&self) -> &AutoAdvance {
        &self.auto_advance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{fixture_dataset, seeded_rng};
    use crate::timing::AutoAdvanceState;

    fn state() -> AppState {
        AppState::new(fixture_dataset(), &GalleryConfig::default(), seeded_rng(7), 0)
    }

    fn names(state: &AppState) -> Vec<&str> {
        state.selected_cards().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn starts_with_everything_sorted_by_name() {
        let state = state();
        assert_eq!(state.selection().len(), 10);
        let names = names(&state);
        let mut sorted = names.clone();
        sorted.sort_by_key(|n| n.to_lowercase());
        assert_eq!(names, sorted);
        assert_eq!(state.carousel().len(), 7);
        assert_eq!(state.carousel().center(), 3);
    }

    #[test]
    fn era_filter_reduces_selection_and_ring() {
        let mut state = state();
        state.set_era(EraFilter::Only("Renaissance".into()), 10);
        assert_eq!(
            names(&state),
            vec![
                "Andreas Vesalius",
                "Gabriele Falloppio",
                "Leonardo da Vinci",
                "Paracelsus"
            ]
        );
        assert_eq!(state.carousel().len(), 4);
    }

    #[test]
    fn search_waits_for_debounce() {
        let mut state = state();
        state.type_search("cur", 0);
        state.type_search("curie", 150);
        assert_eq!(state.selection().len(), 10);
        assert!(!state.tick(349).search_applied);
        assert!(state.tick(350).search_applied);
        assert_eq!(names(&state), vec!["Marie Curie"]);
        assert_eq!(state.query().search, "curie");
    }

    #[test]
    fn empty_result_degrades_carousel() {
        let mut state = state();
        state.type_search("zzzz", 0);
        state.tick(200);
        assert!(state.selection().is_empty());
        assert!(state.carousel().is_empty());
        assert!(!state.carousel_step(Direction::Next, 300));
        assert!(!state.tick(100_000).advanced);
    }

    #[test]
    fn auto_advance_rotates_while_idle() {
        let mut state = state();
        assert!(!state.tick(3999).advanced);
        assert!(state.tick(4000).advanced);
        assert_eq!(state.carousel().center(), 2);
    }

    #[test]
    fn interaction_delays_auto_advance() {
        let mut state = state();
        state.carousel_step(Direction::Previous, 3000);
        assert!(!state.tick(4000).advanced);
        assert!(!state.tick(9999).advanced);
        assert!(state.tick(10_000).advanced);
    }

    #[test]
    fn typing_pauses_auto_advance() {
        let mut state = state();
        state.type_search("an", 3900);
        assert!(!state.tick(4000).advanced);
        assert!(state.tick(4100).search_applied);
        assert!(!state.tick(10_899).advanced);
        assert!(state.tick(10_900).advanced);
    }

    #[test]
    fn selector_changes_pause_auto_advance() {
        let mut state = state();
        state.set_era(EraFilter::Only("Renaissance".into()), 3990);
        assert!(!state.tick(4000).advanced);
        state.set_sort(SortMode::NameDesc, 6000);
        assert!(!state.tick(8990).advanced);
        state.shuffle_grid(12_000);
        assert!(!state.tick(18_999).advanced);
        assert!(state.tick(19_000).advanced);
    }

    #[test]
    fn long_hover_keeps_ring_still() {
        let mut state = state();
        state.begin_interaction(100);
        for t in (0..100_000).step_by(500) {
            assert!(!state.tick(t).advanced);
        }
        state.end_interaction(100_000);
        assert!(!state.tick(106_999).advanced);
        assert!(state.tick(107_000).advanced);
    }

    #[test]
    fn hover_ending_inside_open_lightbox_keeps_hold() {
        let mut state = state();
        state.begin_interaction(0);
        state.open_card("curie_marie", 10).unwrap();
        state.end_interaction(20);
        state.end_interaction(30);
        assert!(state.auto_advance().is_held());
        state.close_lightbox(1000);
        assert!(!state.tick(4999).advanced);
        assert!(state.tick(8000).advanced);
    }

    #[test]
    fn reopening_lightbox_needs_one_close() {
        let mut state = state();
        state.open_card("curie_marie", 0).unwrap();
        state.open_card("paracelsus", 10).unwrap();
        state.close_lightbox(100);
        assert!(!state.auto_advance().is_held());
    }

    #[test]
    fn ring_click_on_side_card_rotates_immediately() {
        let mut state = state();
        state.carousel_click(5, 100);
        assert_eq!(state.carousel().center(), 5);
        assert!(state.carousel().is_aligned());
        assert_eq!(state.tick(1000).flipped, None);
    }

    #[test]
    fn center_single_click_flips_after_delay() {
        let mut state = state();
        state.carousel_click(3, 100);
        assert!(!state.carousel().is_flipped(3));
        let report = state.tick(350);
        assert_eq!(report.flipped, Some(ClickTarget::Ring(3)));
        assert!(state.carousel().is_flipped(3));
    }

    #[test]
    fn center_double_click_opens_lightbox_and_holds_auto_advance() {
        let mut state = state();
        let center_card = state.carousel().center_card().unwrap();
        state.carousel_click(3, 100);
        state.carousel_click(3, 200);
        let (card, face) = state.lightbox_card().unwrap();
        assert_eq!(card.id, state.dataset().cards[center_card].id);
        assert_eq!(face, Face::Front);
        assert!(!state.carousel().is_flipped(3));
        assert_eq!(state.auto_advance().state(), AutoAdvanceState::Held);
        for t in (0..60_000).step_by(1000) {
            assert!(!state.tick(t).advanced);
        }

        state.lightbox_key(LightboxKey::Escape, 60_000);
        assert!(!state.lightbox().is_open());
        assert!(!state.tick(62_999).advanced);
        assert!(state.tick(67_000).advanced);
    }

    #[test]
    fn grid_single_and_double_click() {
        let mut state = state();
        let first = state.selection()[0];
        state.grid_click(0, 0);
        state.tick(250);
        assert!(state.is_grid_flipped(first));

        state.grid_click(1, 1000);
        state.grid_click(1, 1100);
        assert_eq!(state.lightbox().cursor().unwrap().index, 1);
        assert!(!state.is_grid_flipped(state.selection()[1]));
    }

    #[test]
    fn lightbox_keys_navigate_and_flip() {
        let mut state = state();
        let last = *state.selection().last().unwrap();
        state.open_lightbox(last, 0).unwrap();
        state.lightbox_key(LightboxKey::Space, 10);
        assert_eq!(state.lightbox_card().unwrap().1, Face::Back);
        state.lightbox_key(LightboxKey::ArrowRight, 20);
        assert_eq!(state.lightbox().cursor().unwrap().index, 0);
        assert_eq!(state.lightbox_card().unwrap().1, Face::Front);
        state.lightbox_swipe(80.0, 30);
        assert_eq!(state.lightbox().cursor().unwrap().index, 9);
        state.lightbox_swipe(10.0, 40);
        assert_eq!(state.lightbox().cursor().unwrap().index, 9);
    }

    #[test]
    fn keys_ignored_when_closed() {
        let mut state = state();
        state.lightbox_key(LightboxKey::ArrowRight, 0);
        state.lightbox_key(LightboxKey::Space, 0);
        assert!(!state.lightbox().is_open());
    }

    #[test]
    fn open_unknown_card_is_an_error() {
        let mut state = state();
        assert_eq!(
            state.open_card("nobody_here", 0),
            Err(LightboxError::NotFound)
        );
        assert!(!state.lightbox().is_open());
        assert_ne!(state.auto_advance().state(), AutoAdvanceState::Held);
    }

    #[test]
    fn open_filtered_out_card_follows_policy() {
        let mut state = state();
        state.set_era(EraFilter::Only("Renaissance".into()), 0);
        assert_eq!(
            state.open_card("curie_marie", 0),
            Err(LightboxError::NotFound)
        );

        let mut config = GalleryConfig::default();
        config.lightbox.missing_card = MissingCardPolicy::First;
        let mut lenient = AppState::new(fixture_dataset(), &config, seeded_rng(7), 0);
        lenient.set_era(EraFilter::Only("Renaissance".into()), 0);
        lenient.open_card("curie_marie", 0).unwrap();
        assert_eq!(lenient.lightbox_card().unwrap().0.name, "Andreas Vesalius");
    }

    #[test]
    fn refilter_keeps_open_card_or_closes() {
        let mut state = state();
        state.open_card("vesalius_andreas", 0).unwrap();
        state.set_era(EraFilter::Only("Renaissance".into()), 10);
        assert_eq!(state.lightbox_card().unwrap().0.id, "vesalius_andreas");

        state.set_era(EraFilter::Only("Scientific Revolution".into()), 20);
        assert!(!state.lightbox().is_open());
        assert!(matches!(
            state.auto_advance().state(),
            AutoAdvanceState::Cooling { .. }
        ));
    }

    #[test]
    fn shuffle_grid_switches_sort_to_random() {
        let mut state = state();
        let mut before = state.selection().to_vec();
        state.shuffle_grid(0);
        assert_eq!(state.query().sort, SortMode::Random);
        let mut after = state.selection().to_vec();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn spin_keeps_ring_aligned() {
        let mut state = state();
        let delta = state.spin(0);
        assert!(delta >= 720.0);
        assert!(state.carousel().is_aligned());
    }

    #[test]
    fn carousel_swipe_uses_threshold() {
        let mut state = state();
        assert!(!state.carousel_swipe(20.0, 0));
        assert!(state.carousel_swipe(-90.0, 0));
        assert_eq!(state.carousel().center(), 2);
    }

    #[test]
    fn era_groups_follow_dataset_order() {
        let state = state();
        let labels: Vec<&str> = state.era_groups().iter().map(|g| g.label).collect();
        assert_eq!(
            labels,
            vec!["Renaissance", "Scientific Revolution", "Modern Biochemistry"]
        );
    }
}
