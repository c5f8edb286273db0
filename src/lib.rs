//! # Card Gallery
//!
//! A browsable gallery of trading cards (front and back images plus
//! metadata) rendered from a flat `cards.json` manifest, and the pipeline
//! that keeps that manifest in sync with form submissions.
//!
//! # Architecture: State, Then Projection
//!
//! ```text
//! cards.json ──► Dataset ──► AppState ──► generate ──► dist/*.html
//!                              ▲
//!        user events ──────────┘  (logical clock `now` on every call)
//!
//! form rows ──► sync ──► cards/{id}_{face}.png + cards.json
//! ```
//!
//! Every interactive behavior of the gallery (filtering, the rotating ring,
//! the lightbox, auto-advance, search debounce, single versus double click)
//! is a plain state machine. [`app::AppState`] owns them and exposes one
//! method per user event; rendering is a pure function of that state. Time
//! enters only as a millisecond argument, so tests drive timers exactly.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`dataset`] | `cards.json` model, loading, identifier-keyed upsert |
//! | [`filter`] | Search, era filter, sort modes, shuffle, era grouping |
//! | [`angle`] | Angle normalisation and shortest-path deltas for the ring |
//! | [`carousel`] | Ring sampling, rotation, spin, center-only flip |
//! | [`lightbox`] | Open/navigate/flip/close cursor over the filtered sequence |
//! | [`timing`] | Auto-advance, debounce, and click disambiguation timers |
//! | [`app`] | Application state: one method per user event |
//! | [`generate`] | Renders the state to static HTML using Maud |
//! | [`sync`] | Form rows to repository files through a revisioned store |
//! | [`config`] | `gallery.toml` loading, validation, merging, and theme CSS |
//! | [`naming`] | Card identifiers and image paths derived from names |
//! | [`types`] | Card faces and navigation directions |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Accumulated Rotation
//!
//! The ring's rotation is a running total that is never normalised. Each
//! operation adds its own delta: stepping and auto-advance add one slot
//! (`±360/N`) in the requested direction, a click on a side card adds
//! [`angle::shortest_delta`] to that card, and spin adds two to four full
//! turns plus [`angle::forward_delta`] to a random target. The center card's
//! offset stays congruent to `-rotation` after every one of them.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/). Card names and
//! descriptions come from student submissions, and Maud escapes every
//! interpolation.
//!
//! ## Identifier-Keyed Upsert
//!
//! A card's identifier is derived from the scientist name, so a resubmission
//! overwrites the earlier card and its images instead of duplicating them.
//! Manifest writes carry the revision they were read at and fail on conflict.

pub mod angle;
pub mod app;
pub mod carousel;
pub mod config;
pub mod dataset;
pub mod filter;
pub mod generate;
pub mod lightbox;
pub mod naming;
pub mod output;
pub mod sync;
pub mod timing;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
