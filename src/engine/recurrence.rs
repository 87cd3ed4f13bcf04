use chrono::{Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::limits::MAX_EXPANSION_ITERATIONS;
use crate::model::{Cadence, Meeting, MeetingId, SeriesRole, Slot};

use super::{Engine, EngineError};
use crate::store::StoreOp;

/// Fixed local wall-clock time-of-day pair, captured from the original
/// submission. Occurrences are built from this, not from the head's stored
/// instant, so later drift of the head record cannot move the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Anchor {
    /// Capture the wall-clock times of `slot` as seen in `tz`.
    pub fn of(slot: &Slot, tz: &Tz) -> Self {
        Self {
            start: slot.start.with_timezone(tz).time(),
            end: slot.end.with_timezone(tz).time(),
        }
    }
}

/// What happened on one candidate date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccurrenceOutcome {
    Created { date: NaiveDate, id: MeetingId },
    /// Room conflict — the date is skipped, not an error.
    RoomBusy { date: NaiveDate },
    /// The anchored time does not exist on this date in the local zone.
    InvalidLocalTime { date: NaiveDate },
    Failed { date: NaiveDate, error: String },
}

/// Result of one series expansion. `created` may be empty — a fully booked
/// room yields a head with no children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    pub created: Vec<Meeting>,
    pub outcomes: Vec<OccurrenceOutcome>,
}

/// Advance the cursor by one cadence step. Monthly is calendar-aware: the
/// day-of-month clamps to the target month's length.
pub(crate) fn next_date(date: NaiveDate, cadence: Cadence) -> Option<NaiveDate> {
    match cadence {
        Cadence::Daily => date.checked_add_signed(Duration::days(1)),
        Cadence::Weekly => date.checked_add_signed(Duration::weeks(1)),
        Cadence::Monthly => date.checked_add_months(Months::new(1)),
    }
}

pub(crate) fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Resolve `date` plus the anchored times in `tz`. `None` when either wall
/// clock does not exist locally (DST gap) or the resolved interval is empty.
pub(crate) fn local_slot(tz: &Tz, date: NaiveDate, anchor: &Anchor) -> Option<Slot> {
    let start = tz.from_local_datetime(&date.and_time(anchor.start)).earliest()?;
    let end = tz.from_local_datetime(&date.and_time(anchor.end)).earliest()?;
    let (start, end) = (start.with_timezone(&Utc), end.with_timezone(&Utc));
    if end <= start {
        return None;
    }
    Some(Slot::new(start, end))
}

impl Engine {
    /// Expand a persisted series head into child occurrences.
    ///
    /// The cursor starts at the head's own date and steps by the head's
    /// cadence until it passes the boundary date or the iteration cap.
    /// Daily series skip weekend dates. Each retained date is checked
    /// against the room only and committed independently — a conflicting or
    /// unresolvable date is skipped, never fatal for the rest.
    pub async fn expand_series(
        &self,
        head: MeetingId,
        anchor: Anchor,
    ) -> Result<Expansion, EngineError> {
        if anchor.end <= anchor.start {
            return Err(EngineError::InvalidInterval);
        }
        let base = self.require_meeting(head).await?;
        let rule = base.rule().ok_or(EngineError::NotASeriesHead(head))?;

        let mut expansion = Expansion::default();
        let mut cursor = base.slot.start.with_timezone(&self.tz).date_naive();

        for _ in 0..MAX_EXPANSION_ITERATIONS {
            cursor = match next_date(cursor, rule.cadence) {
                Some(next) => next,
                None => break, // calendar overflow — nothing further to generate
            };
            if cursor > rule.until {
                break;
            }
            if rule.cadence == Cadence::Daily && is_weekend(cursor) {
                continue;
            }

            let slot = match local_slot(&self.tz, cursor, &anchor) {
                Some(slot) => slot,
                None => {
                    warn!(date = %cursor, "skipping occurrence: anchored time unresolvable");
                    metrics::counter!(crate::observability::OCCURRENCES_SKIPPED_TOTAL).increment(1);
                    expansion
                        .outcomes
                        .push(OccurrenceOutcome::InvalidLocalTime { date: cursor });
                    continue;
                }
            };

            let room = self
                .check_room_availability(base.room_id, slot, None)
                .await?;
            if !room.available {
                debug!(date = %cursor, "skipping occurrence: room busy");
                metrics::counter!(crate::observability::OCCURRENCES_SKIPPED_TOTAL).increment(1);
                expansion
                    .outcomes
                    .push(OccurrenceOutcome::RoomBusy { date: cursor });
                continue;
            }

            let child = Meeting {
                id: Ulid::new(),
                title: base.title.clone(),
                description: base.description.clone(),
                slot,
                room_id: base.room_id,
                created_by: base.created_by,
                participants: base.participants.clone(),
                series: SeriesRole::Child { head },
                created_at: self.clock.now(),
                updated_at: None,
            };
            match self.apply(vec![StoreOp::Insert(child.clone())]).await {
                Ok(()) => {
                    metrics::counter!(crate::observability::OCCURRENCES_CREATED_TOTAL).increment(1);
                    expansion.outcomes.push(OccurrenceOutcome::Created {
                        date: cursor,
                        id: child.id,
                    });
                    expansion.created.push(child);
                }
                Err(e) => {
                    warn!(date = %cursor, error = %e, "skipping occurrence: insert failed");
                    metrics::counter!(crate::observability::OCCURRENCES_SKIPPED_TOTAL).increment(1);
                    expansion.outcomes.push(OccurrenceOutcome::Failed {
                        date: cursor,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(expansion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn anchor(sh: u32, eh: u32) -> Anchor {
        Anchor {
            start: NaiveTime::from_hms_opt(sh, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(eh, 0, 0).unwrap(),
        }
    }

    #[test]
    fn daily_and_weekly_steps() {
        assert_eq!(
            next_date(date(2024, 1, 15), Cadence::Daily),
            Some(date(2024, 1, 16))
        );
        assert_eq!(
            next_date(date(2024, 1, 15), Cadence::Weekly),
            Some(date(2024, 1, 22))
        );
    }

    #[test]
    fn monthly_step_clamps_day() {
        assert_eq!(
            next_date(date(2024, 1, 31), Cadence::Monthly),
            Some(date(2024, 2, 29)) // leap year clamp
        );
        assert_eq!(
            next_date(date(2023, 1, 31), Cadence::Monthly),
            Some(date(2023, 2, 28))
        );
        assert_eq!(
            next_date(date(2024, 1, 15), Cadence::Monthly),
            Some(date(2024, 2, 15))
        );
    }

    #[test]
    fn weekend_detection() {
        assert!(is_weekend(date(2024, 1, 13))); // Saturday
        assert!(is_weekend(date(2024, 1, 14))); // Sunday
        assert!(!is_weekend(date(2024, 1, 15))); // Monday
    }

    #[test]
    fn local_slot_resolves_in_zone() {
        let tz = chrono_tz::America::Sao_Paulo;
        let slot = local_slot(&tz, date(2024, 1, 15), &anchor(10, 11)).unwrap();
        // São Paulo is UTC-3 year-round since 2019.
        assert_eq!(
            slot.start,
            Utc.with_ymd_and_hms(2024, 1, 15, 13, 0, 0).unwrap()
        );
        assert_eq!(slot.end, Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
    }

    #[test]
    fn local_slot_rejects_dst_gap() {
        // Brazilian DST began 2018-11-04 at local midnight: [00:00, 01:00)
        // did not exist in São Paulo that day.
        let tz = chrono_tz::America::Sao_Paulo;
        let gap = Anchor {
            start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(1, 30, 0).unwrap(),
        };
        assert!(local_slot(&tz, date(2018, 11, 4), &gap).is_none());
        assert!(local_slot(&tz, date(2018, 11, 11), &gap).is_some());
    }
}
