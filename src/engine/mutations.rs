use chrono::Duration;
use tracing::{info, warn};
use ulid::Ulid;

use crate::events::MeetingEvent;
use crate::limits::*;
use crate::model::{
    ArchiveId, ArchivedMeeting, Meeting, MeetingId, Recurrence, RoomId, SeriesRole, Slot, UserId,
};
use crate::store::StoreOp;

use super::availability::busy_participants;
use super::lifecycle::retire;
use super::recurrence::{Anchor, Expansion, local_slot};
use super::{Engine, EngineError};

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub title: String,
    pub description: Option<String>,
    pub slot: Slot,
    pub room_id: RoomId,
    pub created_by: UserId,
    pub participants: Vec<UserId>,
    pub recurrence: Option<Recurrence>,
}

/// Conflicts are outcomes, not errors — the caller decides presentation.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    Booked {
        meeting: Meeting,
        /// Children generated for a recurring head; empty for standalones.
        expansion: Expansion,
    },
    RoomUnavailable {
        conflicts: Vec<Meeting>,
    },
    ParticipantsUnavailable {
        busy: Vec<String>,
    },
}

/// Fields to change on an edit. `None` leaves a field untouched; the nested
/// option on `description` distinguishes clearing from keeping.
#[derive(Debug, Clone, Default)]
pub struct MeetingPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub slot: Option<Slot>,
    pub room_id: Option<RoomId>,
    pub participants: Option<Vec<UserId>>,
}

/// Per-child result of a cascading edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOutcome {
    Updated { child: MeetingId },
    RoomBusy { child: MeetingId },
    InvalidLocalTime { child: MeetingId },
    Failed { child: MeetingId, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated {
        meeting: Meeting,
        cascade: Vec<CascadeOutcome>,
    },
    RoomUnavailable {
        conflicts: Vec<Meeting>,
    },
    ParticipantsUnavailable {
        busy: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReport {
    pub archived: Vec<MeetingId>,
    pub promoted: Option<MeetingId>,
}

fn validate_fields(
    title: &str,
    description: Option<&str>,
    slot: &Slot,
) -> Result<(), EngineError> {
    if slot.end <= slot.start {
        return Err(EngineError::InvalidInterval);
    }
    if slot.duration() > Duration::hours(MAX_MEETING_DURATION_HOURS) {
        return Err(EngineError::LimitExceeded("meeting too long"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(EngineError::LimitExceeded("title too long"));
    }
    if let Some(d) = description
        && d.len() > MAX_DESCRIPTION_LEN
    {
        return Err(EngineError::LimitExceeded("description too long"));
    }
    Ok(())
}

impl Engine {
    /// The booking submission flow: validate, check the room, check the
    /// participants, insert the head, then expand the series if the request
    /// is recurring. Nothing is inserted on a conflict outcome.
    ///
    /// The availability check and the insert are not serialized against
    /// concurrent bookings; two writers racing into the same room and
    /// interval can both pass the check. This mirrors the relaxed
    /// read-then-write contract of the store.
    pub async fn book(&self, req: BookingRequest) -> Result<BookingOutcome, EngineError> {
        validate_fields(&req.title, req.description.as_deref(), &req.slot)?;
        if req.participants.len() > MAX_PARTICIPANTS {
            return Err(EngineError::LimitExceeded("too many participants"));
        }
        let now = self.clock.now();
        if req.slot.start < now {
            return Err(EngineError::StartInPast);
        }

        let room = self
            .check_room_availability(req.room_id, req.slot, None)
            .await?;
        if !room.available {
            metrics::counter!(crate::observability::BOOKINGS_TOTAL, "outcome" => "room_conflict")
                .increment(1);
            return Ok(BookingOutcome::RoomUnavailable {
                conflicts: room.conflicts,
            });
        }
        let users = self
            .check_user_availability(&req.participants, req.slot, None)
            .await?;
        if !users.available {
            metrics::counter!(crate::observability::BOOKINGS_TOTAL, "outcome" => "user_conflict")
                .increment(1);
            return Ok(BookingOutcome::ParticipantsUnavailable { busy: users.busy });
        }

        // Capture the wall-clock anchor before anything is stored, so the
        // generated occurrences cannot drift with the head record.
        let anchor = Anchor::of(&req.slot, &self.tz);
        let participants = self.directory.usernames(&req.participants).await?;

        let meeting = Meeting {
            id: Ulid::new(),
            title: req.title,
            description: req.description,
            slot: req.slot,
            room_id: req.room_id,
            created_by: req.created_by,
            participants,
            series: match req.recurrence {
                Some(rule) => SeriesRole::Head { rule },
                None => SeriesRole::Standalone,
            },
            created_at: now,
            updated_at: None,
        };
        self.apply(vec![StoreOp::Insert(meeting.clone())]).await?;
        metrics::counter!(crate::observability::BOOKINGS_TOTAL, "outcome" => "booked")
            .increment(1);
        self.events
            .send(meeting.room_id, MeetingEvent::Booked { id: meeting.id });

        let expansion = if meeting.is_head() {
            self.expand_series(meeting.id, anchor).await?
        } else {
            Expansion::default()
        };
        info!(
            meeting = %meeting.id,
            room = %meeting.room_id,
            occurrences = expansion.created.len(),
            "booked meeting"
        );
        Ok(BookingOutcome::Booked { meeting, expansion })
    }

    /// Reschedule or retitle a meeting, with exclude-self availability
    /// checks. With `cascade` on a series head, every child is re-anchored
    /// to the new wall-clock times on its own date, each checked and
    /// committed independently.
    pub async fn update_meeting(
        &self,
        id: MeetingId,
        patch: MeetingPatch,
        cascade: bool,
    ) -> Result<UpdateOutcome, EngineError> {
        let mut updated = self.require_meeting(id).await?;

        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(slot) = patch.slot {
            updated.slot = slot;
        }
        if let Some(room_id) = patch.room_id {
            updated.room_id = room_id;
        }
        if let Some(ref ids) = patch.participants {
            if ids.len() > MAX_PARTICIPANTS {
                return Err(EngineError::LimitExceeded("too many participants"));
            }
            updated.participants = self.directory.usernames(ids).await?;
        }
        validate_fields(&updated.title, updated.description.as_deref(), &updated.slot)?;

        let room = self
            .check_room_availability(updated.room_id, updated.slot, Some(id))
            .await?;
        if !room.available {
            return Ok(UpdateOutcome::RoomUnavailable {
                conflicts: room.conflicts,
            });
        }
        // Participant check runs over the stored name lists directly, so an
        // edit that keeps its participants still respects their calendars.
        let overlapping = self.store.overlapping(updated.slot).await?;
        let busy = busy_participants(&overlapping, &updated.participants, Some(id));
        if !busy.is_empty() {
            return Ok(UpdateOutcome::ParticipantsUnavailable { busy });
        }

        let now = self.clock.now();
        updated.updated_at = Some(now);
        self.apply(vec![StoreOp::Update(updated.clone())]).await?;
        self.events
            .send(updated.room_id, MeetingEvent::Rescheduled { id });

        let cascade_outcomes = if cascade && updated.is_head() {
            self.cascade_children(&updated).await?
        } else {
            Vec::new()
        };

        Ok(UpdateOutcome::Updated {
            meeting: updated,
            cascade: cascade_outcomes,
        })
    }

    /// Re-anchor every child of `head` to the head's new wall-clock times on
    /// the child's own date. Children stay on their dates; only times,
    /// title, description, room and participants follow the head.
    async fn cascade_children(&self, head: &Meeting) -> Result<Vec<CascadeOutcome>, EngineError> {
        let anchor = Anchor::of(&head.slot, &self.tz);
        let now = self.clock.now();
        let mut outcomes = Vec::new();

        for child in self.store.children_of(head.id).await? {
            let date = child.slot.start.with_timezone(&self.tz).date_naive();
            let slot = match local_slot(&self.tz, date, &anchor) {
                Some(slot) => slot,
                None => {
                    warn!(child = %child.id, %date, "cascade skip: anchored time unresolvable");
                    outcomes.push(CascadeOutcome::InvalidLocalTime { child: child.id });
                    continue;
                }
            };
            let room = self
                .check_room_availability(head.room_id, slot, Some(child.id))
                .await?;
            if !room.available {
                outcomes.push(CascadeOutcome::RoomBusy { child: child.id });
                continue;
            }

            let mut next = child.clone();
            next.title = head.title.clone();
            next.description = head.description.clone();
            next.room_id = head.room_id;
            next.participants = head.participants.clone();
            next.slot = slot;
            next.updated_at = Some(now);
            match self.apply(vec![StoreOp::Update(next)]).await {
                Ok(()) => outcomes.push(CascadeOutcome::Updated { child: child.id }),
                Err(e) => {
                    warn!(child = %child.id, error = %e, "cascade update failed");
                    outcomes.push(CascadeOutcome::Failed {
                        child: child.id,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(outcomes)
    }

    /// Explicitly remove a meeting, producing one archive record per removed
    /// row. On a head with `whole_series` the entire series goes in one
    /// batch; without it the earliest child is promoted, same as expiry.
    pub async fn cancel_meeting(
        &self,
        id: MeetingId,
        whole_series: bool,
    ) -> Result<CancelReport, EngineError> {
        let meeting = self.require_meeting(id).await?;
        let now = self.clock.now();

        let report = if meeting.is_head() && whole_series {
            let children = self.store.children_of(id).await?;
            let mut archived = Vec::with_capacity(children.len() + 1);
            let mut ops = Vec::with_capacity((children.len() + 1) * 2);
            for child in &children {
                ops.push(StoreOp::Archive(ArchivedMeeting::snapshot(child, now)));
                ops.push(StoreOp::Delete(child.id));
                archived.push(child.id);
            }
            ops.push(StoreOp::Archive(ArchivedMeeting::snapshot(&meeting, now)));
            ops.push(StoreOp::Delete(id));
            archived.push(id);
            self.apply(ops).await?;
            metrics::counter!(crate::observability::MEETINGS_ARCHIVED_TOTAL)
                .increment(archived.len() as u64);
            info!(head = %id, removed = archived.len(), "cancelled whole series");
            CancelReport {
                archived,
                promoted: None,
            }
        } else if meeting.is_head() {
            // Same path as expiry: the earliest child takes over the series.
            let children = self.store.children_of(id).await?;
            let retirement = retire(&meeting, children, now);
            let promoted = retirement.promoted.as_ref().map(|m| m.id);
            self.apply(retirement.into_ops()).await?;
            metrics::counter!(crate::observability::MEETINGS_ARCHIVED_TOTAL).increment(1);
            if let Some(new_head) = promoted {
                metrics::counter!(crate::observability::PROMOTIONS_TOTAL).increment(1);
                self.events.send(
                    meeting.room_id,
                    MeetingEvent::Promoted {
                        retired: id,
                        new_head,
                    },
                );
            }
            CancelReport {
                archived: vec![id],
                promoted,
            }
        } else {
            let retirement = retire(&meeting, Vec::new(), now);
            self.apply(retirement.into_ops()).await?;
            metrics::counter!(crate::observability::MEETINGS_ARCHIVED_TOTAL).increment(1);
            CancelReport {
                archived: vec![id],
                promoted: None,
            }
        };

        self.events
            .send(meeting.room_id, MeetingEvent::Cancelled { id });
        Ok(report)
    }

    pub async fn purge_archive(&self, id: ArchiveId) -> Result<(), EngineError> {
        self.apply(vec![StoreOp::PurgeArchive(id)]).await
    }

    /// Drop every archive record. Returns how many were purged.
    pub async fn purge_all_archives(&self) -> Result<usize, EngineError> {
        let records = self.store.archives().await?;
        let count = records.len();
        if count > 0 {
            let ops = records
                .into_iter()
                .map(|a| StoreOp::PurgeArchive(a.id))
                .collect();
            self.apply(ops).await?;
        }
        Ok(count)
    }
}
