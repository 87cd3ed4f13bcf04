use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

pub type MeetingId = Ulid;
pub type RoomId = Ulid;
pub type UserId = Ulid;
pub type ArchiveId = Ulid;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "Slot start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// How a series steps from one occurrence date to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// Business days only — Saturday and Sunday cursors are skipped.
    Daily,
    Weekly,
    /// Calendar-aware month step, not a fixed day count.
    Monthly,
}

/// Recurrence descriptor carried by a series head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub cadence: Cadence,
    /// Last calendar date (inclusive) on which an occurrence may fall.
    pub until: NaiveDate,
}

/// A meeting's place in a recurrence series — a descriptor exists only on a
/// head, a parent reference only on a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesRole {
    Standalone,
    Head { rule: Recurrence },
    Child { head: MeetingId },
}

impl SeriesRole {
    pub fn is_head(&self) -> bool {
        matches!(self, SeriesRole::Head { .. })
    }

    pub fn is_child(&self) -> bool {
        matches!(self, SeriesRole::Child { .. })
    }

    /// The head this meeting points at, if it is a child.
    pub fn parent(&self) -> Option<MeetingId> {
        match self {
            SeriesRole::Child { head } => Some(*head),
            _ => None,
        }
    }

    pub fn rule(&self) -> Option<Recurrence> {
        match self {
            SeriesRole::Head { rule } => Some(*rule),
            _ => None,
        }
    }
}

/// A live meeting. Participants are a resolved name list; order carries no
/// meaning for conflict logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub title: String,
    pub description: Option<String>,
    pub slot: Slot,
    pub room_id: RoomId,
    pub created_by: UserId,
    pub participants: Vec<String>,
    pub series: SeriesRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Meeting {
    pub fn is_head(&self) -> bool {
        self.series.is_head()
    }

    pub fn is_child(&self) -> bool {
        self.series.is_child()
    }

    pub fn parent(&self) -> Option<MeetingId> {
        self.series.parent()
    }

    pub fn rule(&self) -> Option<Recurrence> {
        self.series.rule()
    }
}

/// Immutable snapshot of a meeting at the moment it left the live set.
/// Nothing here references back into the live table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedMeeting {
    pub id: ArchiveId,
    pub original_id: MeetingId,
    pub title: String,
    pub description: Option<String>,
    pub slot: Slot,
    pub room_id: RoomId,
    pub created_by: UserId,
    pub participants: Vec<String>,
    pub was_recurring: bool,
    pub cadence: Option<Cadence>,
    pub created_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
}

impl ArchivedMeeting {
    pub fn snapshot(meeting: &Meeting, archived_at: DateTime<Utc>) -> Self {
        Self {
            id: Ulid::new(),
            original_id: meeting.id,
            title: meeting.title.clone(),
            description: meeting.description.clone(),
            slot: meeting.slot,
            room_id: meeting.room_id,
            created_by: meeting.created_by,
            participants: meeting.participants.clone(),
            was_recurring: meeting.is_head(),
            cadence: meeting.rule().map(|r| r.cadence),
            created_at: meeting.created_at,
            archived_at,
        }
    }
}
