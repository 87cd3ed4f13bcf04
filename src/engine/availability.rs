use crate::model::{Meeting, MeetingId, RoomId, Slot, UserId};

use super::{Engine, EngineError};

/// Result of a room check: `available` iff `conflicts` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomAvailability {
    pub available: bool,
    pub conflicts: Vec<Meeting>,
}

/// Result of a participant check: `busy` holds the display names already
/// committed to an overlapping meeting, deduplicated in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAvailability {
    pub available: bool,
    pub busy: Vec<String>,
}

/// Meetings from `candidates` that overlap `slot`, minus the excluded record.
/// Pure span algebra over an already-fetched set; the overlap rule is the
/// half-open `existing.start < end && existing.end > start`.
pub fn room_conflicts(
    candidates: &[Meeting],
    slot: &Slot,
    exclude: Option<MeetingId>,
) -> Vec<Meeting> {
    candidates
        .iter()
        .filter(|m| Some(m.id) != exclude && m.slot.overlaps(slot))
        .cloned()
        .collect()
}

/// Names from `requested` that appear on any overlapping meeting. Meetings
/// with no participants recorded never contribute. First-seen order, deduped.
pub fn busy_participants(
    overlapping: &[Meeting],
    requested: &[String],
    exclude: Option<MeetingId>,
) -> Vec<String> {
    let mut busy: Vec<String> = Vec::new();
    for meeting in overlapping {
        if Some(meeting.id) == exclude || meeting.participants.is_empty() {
            continue;
        }
        for name in requested {
            if meeting.participants.contains(name) && !busy.contains(name) {
                busy.push(name.clone());
            }
        }
    }
    busy
}

impl Engine {
    /// Is `room` free over `slot`? `exclude` drops the record being edited
    /// from the check against itself. Pure read, no side effects.
    pub async fn check_room_availability(
        &self,
        room: RoomId,
        slot: Slot,
        exclude: Option<MeetingId>,
    ) -> Result<RoomAvailability, EngineError> {
        if slot.end <= slot.start {
            return Err(EngineError::InvalidInterval);
        }
        let candidates = self.store.in_room_overlapping(room, slot).await?;
        let conflicts = room_conflicts(&candidates, &slot, exclude);
        Ok(RoomAvailability {
            available: conflicts.is_empty(),
            conflicts,
        })
    }

    /// Are all `participants` free over `slot`? An empty set is trivially
    /// available. Ids are resolved to names through the directory and matched
    /// against the name lists stored on overlapping meetings, room-independent.
    pub async fn check_user_availability(
        &self,
        participants: &[UserId],
        slot: Slot,
        exclude: Option<MeetingId>,
    ) -> Result<UserAvailability, EngineError> {
        if slot.end <= slot.start {
            return Err(EngineError::InvalidInterval);
        }
        if participants.is_empty() {
            return Ok(UserAvailability {
                available: true,
                busy: Vec::new(),
            });
        }
        let requested = self.directory.usernames(participants).await?;
        let overlapping = self.store.overlapping(slot).await?;
        let busy = busy_participants(&overlapping, &requested, exclude);
        Ok(UserAvailability {
            available: busy.is_empty(),
            busy,
        })
    }
}
