mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{ArchiveId, ArchivedMeeting, Meeting, MeetingId, RoomId, Slot};

/// One write in a transactional batch. `MeetingStore::apply` commits a batch
/// atomically: either every op lands or none do.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Insert(Meeting),
    Update(Meeting),
    Delete(MeetingId),
    Archive(ArchivedMeeting),
    PurgeArchive(ArchiveId),
}

#[derive(Debug)]
pub enum StoreError {
    NotFound(MeetingId),
    AlreadyExists(MeetingId),
    /// An archive record for this original meeting already exists.
    AlreadyArchived(MeetingId),
    ArchiveNotFound(ArchiveId),
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "meeting not found: {id}"),
            StoreError::AlreadyExists(id) => write!(f, "meeting already exists: {id}"),
            StoreError::AlreadyArchived(id) => write!(f, "meeting already archived: {id}"),
            StoreError::ArchiveNotFound(id) => write!(f, "archive record not found: {id}"),
            StoreError::Backend(e) => write!(f, "store backend error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence seam: filtered queries plus atomic batch commit over Meeting
/// and Archive records. Implementations must make `apply` all-or-nothing;
/// everything else is a plain read.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn get(&self, id: MeetingId) -> Result<Option<Meeting>, StoreError>;

    /// Live meetings in `room` overlapping `slot`, ordered by start.
    async fn in_room_overlapping(
        &self,
        room: RoomId,
        slot: Slot,
    ) -> Result<Vec<Meeting>, StoreError>;

    /// Live meetings overlapping `slot` in any room, ordered by start.
    async fn overlapping(&self, slot: Slot) -> Result<Vec<Meeting>, StoreError>;

    /// Live meetings whose end is strictly before `cutoff`, ordered by end.
    async fn expired_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Meeting>, StoreError>;

    /// Children of a series head, ordered by start ascending.
    async fn children_of(&self, head: MeetingId) -> Result<Vec<Meeting>, StoreError>;

    /// Archive records, newest first.
    async fn archives(&self) -> Result<Vec<ArchivedMeeting>, StoreError>;

    /// Commit a batch of writes atomically.
    async fn apply(&self, ops: Vec<StoreOp>) -> Result<(), StoreError>;
}
