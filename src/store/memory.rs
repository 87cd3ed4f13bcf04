use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::model::{ArchiveId, ArchivedMeeting, Meeting, MeetingId, RoomId, Slot};

use super::{MeetingStore, StoreError, StoreOp};

/// Reference store backed by in-process maps.
///
/// `apply` batches are serialized behind one gate and validated in full
/// before any mutation, so a failed batch leaves state untouched. Readers do
/// not take the gate; they see the store's default isolation, nothing
/// stronger.
pub struct MemoryStore {
    live: DashMap<MeetingId, Meeting>,
    archive: DashMap<ArchiveId, ArchivedMeeting>,
    /// Original meeting id → archive id; enforces one archive per meeting.
    archive_by_original: DashMap<MeetingId, ArchiveId>,
    /// Head → child ids. Unordered here; `children_of` sorts by start.
    children: DashMap<MeetingId, Vec<MeetingId>>,
    write_gate: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            live: DashMap::new(),
            archive: DashMap::new(),
            archive_by_original: DashMap::new(),
            children: DashMap::new(),
            write_gate: Mutex::new(()),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Validate one batch against current state plus the batch's own earlier
    /// ops. Returns without mutating anything.
    fn validate(&self, ops: &[StoreOp]) -> Result<(), StoreError> {
        let mut inserted: HashSet<MeetingId> = HashSet::new();
        let mut deleted: HashSet<MeetingId> = HashSet::new();
        let mut archived: HashSet<MeetingId> = HashSet::new();
        let mut purged: HashSet<ArchiveId> = HashSet::new();

        let lives = |id: &MeetingId, inserted: &HashSet<MeetingId>, deleted: &HashSet<MeetingId>| {
            (self.live.contains_key(id) || inserted.contains(id)) && !deleted.contains(id)
        };

        for op in ops {
            match op {
                StoreOp::Insert(m) => {
                    if lives(&m.id, &inserted, &deleted) {
                        return Err(StoreError::AlreadyExists(m.id));
                    }
                    inserted.insert(m.id);
                    deleted.remove(&m.id);
                }
                StoreOp::Update(m) => {
                    if !lives(&m.id, &inserted, &deleted) {
                        return Err(StoreError::NotFound(m.id));
                    }
                }
                StoreOp::Delete(id) => {
                    if !lives(id, &inserted, &deleted) {
                        return Err(StoreError::NotFound(*id));
                    }
                    deleted.insert(*id);
                    inserted.remove(id);
                }
                StoreOp::Archive(a) => {
                    if self.archive_by_original.contains_key(&a.original_id)
                        || archived.contains(&a.original_id)
                    {
                        return Err(StoreError::AlreadyArchived(a.original_id));
                    }
                    archived.insert(a.original_id);
                }
                StoreOp::PurgeArchive(id) => {
                    if !self.archive.contains_key(id) || purged.contains(id) {
                        return Err(StoreError::ArchiveNotFound(*id));
                    }
                    purged.insert(*id);
                }
            }
        }
        Ok(())
    }

    fn commit(&self, ops: Vec<StoreOp>) {
        for op in ops {
            match op {
                StoreOp::Insert(m) => {
                    if let Some(head) = m.parent() {
                        self.children.entry(head).or_default().push(m.id);
                    }
                    self.live.insert(m.id, m);
                }
                StoreOp::Update(m) => {
                    let old_parent = self.live.get(&m.id).and_then(|old| old.parent());
                    let new_parent = m.parent();
                    if old_parent != new_parent {
                        if let Some(head) = old_parent
                            && let Some(mut kids) = self.children.get_mut(&head)
                        {
                            kids.retain(|c| c != &m.id);
                        }
                        if let Some(head) = new_parent {
                            self.children.entry(head).or_default().push(m.id);
                        }
                    }
                    self.live.insert(m.id, m);
                }
                StoreOp::Delete(id) => {
                    if let Some((_, m)) = self.live.remove(&id)
                        && let Some(head) = m.parent()
                        && let Some(mut kids) = self.children.get_mut(&head)
                    {
                        kids.retain(|c| c != &id);
                    }
                    // A deleted head takes its index entry with it.
                    self.children.remove(&id);
                }
                StoreOp::Archive(a) => {
                    self.archive_by_original.insert(a.original_id, a.id);
                    self.archive.insert(a.id, a);
                }
                StoreOp::PurgeArchive(id) => {
                    if let Some((_, a)) = self.archive.remove(&id) {
                        self.archive_by_original.remove(&a.original_id);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl MeetingStore for MemoryStore {
    async fn get(&self, id: MeetingId) -> Result<Option<Meeting>, StoreError> {
        Ok(self.live.get(&id).map(|entry| entry.value().clone()))
    }

    async fn in_room_overlapping(
        &self,
        room: RoomId,
        slot: Slot,
    ) -> Result<Vec<Meeting>, StoreError> {
        let mut hits: Vec<Meeting> = self
            .live
            .iter()
            .filter(|entry| entry.room_id == room && entry.slot.overlaps(&slot))
            .map(|entry| entry.value().clone())
            .collect();
        hits.sort_by_key(|m| m.slot.start);
        Ok(hits)
    }

    async fn overlapping(&self, slot: Slot) -> Result<Vec<Meeting>, StoreError> {
        let mut hits: Vec<Meeting> = self
            .live
            .iter()
            .filter(|entry| entry.slot.overlaps(&slot))
            .map(|entry| entry.value().clone())
            .collect();
        hits.sort_by_key(|m| m.slot.start);
        Ok(hits)
    }

    async fn expired_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Meeting>, StoreError> {
        let mut hits: Vec<Meeting> = self
            .live
            .iter()
            .filter(|entry| entry.slot.end < cutoff)
            .map(|entry| entry.value().clone())
            .collect();
        hits.sort_by_key(|m| m.slot.end);
        Ok(hits)
    }

    async fn children_of(&self, head: MeetingId) -> Result<Vec<Meeting>, StoreError> {
        let ids = self
            .children
            .get(&head)
            .map(|kids| kids.clone())
            .unwrap_or_default();
        let mut kids: Vec<Meeting> = ids
            .iter()
            .filter_map(|id| self.live.get(id).map(|entry| entry.value().clone()))
            .collect();
        kids.sort_by_key(|m| m.slot.start);
        Ok(kids)
    }

    async fn archives(&self) -> Result<Vec<ArchivedMeeting>, StoreError> {
        let mut records: Vec<ArchivedMeeting> = self
            .archive
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.archived_at.cmp(&a.archived_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn apply(&self, ops: Vec<StoreOp>) -> Result<(), StoreError> {
        let _gate = self.write_gate.lock().await;
        self.validate(&ops)?;
        self.commit(ops);
        Ok(())
    }
}
