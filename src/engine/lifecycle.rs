use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::events::MeetingEvent;
use crate::model::{ArchivedMeeting, Meeting, MeetingId, SeriesRole};
use crate::store::StoreOp;

use super::{Engine, EngineError};

/// The persistence plan for retiring one meeting: an archive snapshot, the
/// optional promotion of the earliest child, sibling repoints, and the
/// live-row delete. Applied as a single atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Retirement {
    pub archive: ArchivedMeeting,
    pub promoted: Option<Meeting>,
    pub repointed: Vec<Meeting>,
}

impl Retirement {
    pub fn into_ops(self) -> Vec<StoreOp> {
        let retired = self.archive.original_id;
        let mut ops = vec![StoreOp::Archive(self.archive)];
        if let Some(new_head) = self.promoted {
            ops.push(StoreOp::Update(new_head));
        }
        for sibling in self.repointed {
            ops.push(StoreOp::Update(sibling));
        }
        ops.push(StoreOp::Delete(retired));
        ops
    }
}

/// Plan the retirement of `meeting`. Pure: no storage, no clock.
///
/// If the meeting is a series head with surviving children, the earliest
/// child by start becomes the new head — it takes over the recurrence rule,
/// its parent reference is cleared, and every other sibling is repointed to
/// it. A head with no children simply ends its series.
pub fn retire(
    meeting: &Meeting,
    mut children: Vec<Meeting>,
    archived_at: DateTime<Utc>,
) -> Retirement {
    let archive = ArchivedMeeting::snapshot(meeting, archived_at);

    let rule = match meeting.rule() {
        Some(rule) if !children.is_empty() => rule,
        _ => {
            return Retirement {
                archive,
                promoted: None,
                repointed: Vec::new(),
            };
        }
    };

    children.sort_by_key(|c| c.slot.start);
    let mut rest = children.split_off(1);
    let mut new_head = children.pop().expect("children checked non-empty");
    new_head.series = SeriesRole::Head { rule };
    for sibling in &mut rest {
        sibling.series = SeriesRole::Child { head: new_head.id };
    }

    Retirement {
        archive,
        promoted: Some(new_head),
        repointed: rest,
    }
}

/// What happened to one meeting during a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Archived {
        meeting: MeetingId,
    },
    Promoted {
        meeting: MeetingId,
        new_head: MeetingId,
        repointed: Vec<MeetingId>,
    },
    Failed {
        meeting: MeetingId,
        error: String,
    },
}

/// Ordered per-meeting outcomes of one mover pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub outcomes: Vec<MoveOutcome>,
}

impl SweepReport {
    /// Meetings actually moved out of the live set.
    pub fn moved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o, MoveOutcome::Failed { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.moved()
    }
}

impl Engine {
    /// Archive one live meeting, promoting its earliest child if it is a
    /// series head. Snapshot, promotion, repoints and delete commit as one
    /// atomic batch.
    pub async fn move_meeting_to_finished(
        &self,
        id: MeetingId,
    ) -> Result<MoveOutcome, EngineError> {
        let meeting = self.require_meeting(id).await?;
        let children = if meeting.is_head() {
            self.store.children_of(id).await?
        } else {
            Vec::new()
        };

        let retirement = retire(&meeting, children, self.clock.now());
        let promoted = retirement.promoted.as_ref().map(|m| m.id);
        let repointed: Vec<MeetingId> =
            retirement.repointed.iter().map(|m| m.id).collect();
        self.apply(retirement.into_ops()).await?;

        metrics::counter!(crate::observability::MEETINGS_ARCHIVED_TOTAL).increment(1);
        self.events
            .send(meeting.room_id, MeetingEvent::Archived { id });

        match promoted {
            Some(new_head) => {
                metrics::counter!(crate::observability::PROMOTIONS_TOTAL).increment(1);
                info!(retired = %id, %new_head, siblings = repointed.len(), "promoted series head");
                self.events.send(
                    meeting.room_id,
                    MeetingEvent::Promoted {
                        retired: id,
                        new_head,
                    },
                );
                Ok(MoveOutcome::Promoted {
                    meeting: id,
                    new_head,
                    repointed,
                })
            }
            None => Ok(MoveOutcome::Archived { meeting: id }),
        }
    }

    /// Retire every live meeting whose end has passed. Each meeting is its
    /// own transaction: a failure is logged and recorded, and the pass moves
    /// on to the next. A clean re-run moves zero records — the mover only
    /// ever selects from the live table.
    pub async fn move_expired_meetings_to_finished(&self) -> Result<SweepReport, EngineError> {
        let sweep_start = std::time::Instant::now();
        let expired = self.store.expired_before(self.clock.now()).await?;

        let mut report = SweepReport::default();
        for meeting in expired {
            match self.move_meeting_to_finished(meeting.id).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    error!(meeting = %meeting.id, error = %e, "failed to archive expired meeting");
                    metrics::counter!(crate::observability::SWEEP_FAILURES_TOTAL).increment(1);
                    report.outcomes.push(MoveOutcome::Failed {
                        meeting: meeting.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        metrics::histogram!(crate::observability::SWEEP_DURATION_SECONDS)
            .record(sweep_start.elapsed().as_secs_f64());
        if report.moved() > 0 {
            info!(moved = report.moved(), failed = report.failed(), "archived expired meetings");
        }
        Ok(report)
    }

    /// Entry point the scheduler drives.
    pub async fn check_and_move_finished_meetings(&self) -> Result<SweepReport, EngineError> {
        self.move_expired_meetings_to_finished().await
    }
}
