//! Meeting-room booking engine: availability checking, recurrence expansion,
//! and lifecycle archival with series promotion, driven by a background
//! scheduler.
//!
//! The crate is an embeddable library. It owns the booking semantics —
//! no two meetings may share a room or a participant on overlapping
//! intervals, recurring series expand into concrete child occurrences, and
//! expired meetings move into an immutable archive with the earliest child
//! promoted to new series head. Persistence, participant resolution and the
//! clock are seams ([`store::MeetingStore`], [`directory::Directory`],
//! [`clock::Clock`]) injected into [`engine::Engine`]; in-memory reference
//! implementations ship for each.

pub mod clock;
pub mod directory;
pub mod engine;
pub mod events;
pub mod limits;
pub mod model;
pub mod observability;
pub mod scheduler;
pub mod store;

pub use engine::{Engine, EngineError};
pub use scheduler::{Scheduler, SchedulerConfig};
