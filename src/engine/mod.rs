mod availability;
mod error;
mod lifecycle;
mod mutations;
mod recurrence;

pub use availability::{RoomAvailability, UserAvailability, busy_participants, room_conflicts};
pub use error::EngineError;
pub use lifecycle::{MoveOutcome, Retirement, SweepReport, retire};
pub use mutations::{
    BookingOutcome, BookingRequest, CancelReport, CascadeOutcome, MeetingPatch, UpdateOutcome,
};
pub use recurrence::{Anchor, Expansion, OccurrenceOutcome};

use std::sync::Arc;

use chrono_tz::Tz;

use crate::clock::Clock;
use crate::directory::Directory;
use crate::events::EventHub;
use crate::model::{ArchivedMeeting, Meeting, MeetingId};
use crate::store::{MeetingStore, StoreOp};

/// The booking engine. All operations go through the injected seams: the
/// transactional store, the participant directory and the clock. `tz` is the
/// local zone recurrence occurrences are anchored in.
pub struct Engine {
    pub(crate) store: Arc<dyn MeetingStore>,
    pub(crate) directory: Arc<dyn Directory>,
    pub(crate) clock: Arc<dyn Clock>,
    pub events: Arc<EventHub>,
    pub(crate) tz: Tz,
}

impl Engine {
    pub fn new(
        store: Arc<dyn MeetingStore>,
        directory: Arc<dyn Directory>,
        clock: Arc<dyn Clock>,
        events: Arc<EventHub>,
        tz: Tz,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
            events,
            tz,
        }
    }

    pub async fn get_meeting(&self, id: MeetingId) -> Result<Option<Meeting>, EngineError> {
        Ok(self.store.get(id).await?)
    }

    /// Children of a series head, ordered by start ascending.
    pub async fn series_children(&self, head: MeetingId) -> Result<Vec<Meeting>, EngineError> {
        Ok(self.store.children_of(head).await?)
    }

    /// Archive records, newest first.
    pub async fn archived_meetings(&self) -> Result<Vec<ArchivedMeeting>, EngineError> {
        Ok(self.store.archives().await?)
    }

    pub(super) async fn require_meeting(&self, id: MeetingId) -> Result<Meeting, EngineError> {
        self.store
            .get(id)
            .await?
            .ok_or(EngineError::NotFound(id))
    }

    pub(super) async fn apply(&self, ops: Vec<StoreOp>) -> Result<(), EngineError> {
        Ok(self.store.apply(ops).await?)
    }
}
