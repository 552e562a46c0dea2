//! Slot planning: turns a creator's request (single slot, tiled window, or
//! weekly recurrence) into concrete rows for the slot store. Planning is pure;
//! persistence and duplicate handling live in `db::queries::insert_slots`.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

use crate::models::{CreateRecurringSlots, CreateSlot, CreateSlotWindow, NewSlot};

pub const MIN_HORIZON_WEEKS: u32 = 1;
pub const MAX_HORIZON_WEEKS: u32 = 12;

/// Validation failures, rejected before any write and surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("duration must be positive")]
    NonPositiveDuration,
    #[error("end time must be after start time")]
    InvertedWindow,
    #[error("slot would cross midnight")]
    CrossesMidnight,
    #[error("max bookings must be at least 1")]
    NonPositiveCapacity,
    #[error("select at least one weekday")]
    EmptyWeekdays,
    #[error("weekday out of range (use 1 = Monday through 7 = Sunday)")]
    InvalidWeekday,
    #[error("weeks must be between {MIN_HORIZON_WEEKS} and {MAX_HORIZON_WEEKS}")]
    HorizonOutOfRange,
}

/// Plan one slot: end time computed directly from the duration.
pub fn plan_single(req: &CreateSlot) -> Result<NewSlot, PlanError> {
    validate_capacity(req.max_bookings)?;
    let end_time = add_minutes(req.start_time, req.duration_minutes)?;
    Ok(NewSlot {
        slot_date: req.slot_date,
        start_time: req.start_time,
        end_time,
        max_bookings: req.max_bookings,
    })
}

/// Tile `[start_time, end_time)` with back-to-back slots of the given
/// duration. A final tile that would overshoot the window end is dropped;
/// one ending exactly at the window end is included.
pub fn plan_window(req: &CreateSlotWindow) -> Result<Vec<NewSlot>, PlanError> {
    validate_capacity(req.max_bookings)?;
    let starts = tile_window(req.start_time, req.end_time, req.duration_minutes)?;
    Ok(starts
        .into_iter()
        .map(|(start, end)| NewSlot {
            slot_date: req.slot_date,
            start_time: start,
            end_time: end,
            max_bookings: req.max_bookings,
        })
        .collect())
}

/// Expand a weekly recurrence: candidate dates run from the day after
/// `today` through `weeks * 7` days out, keeping only the selected
/// weekdays, and each kept date is tiled like `plan_window`.
pub fn plan_recurring(req: &CreateRecurringSlots, today: NaiveDate) -> Result<Vec<NewSlot>, PlanError> {
    validate_capacity(req.max_bookings)?;
    if req.weekdays.is_empty() {
        return Err(PlanError::EmptyWeekdays);
    }
    if req.weekdays.iter().any(|d| !(1..=7).contains(d)) {
        return Err(PlanError::InvalidWeekday);
    }
    if !(MIN_HORIZON_WEEKS..=MAX_HORIZON_WEEKS).contains(&req.weeks) {
        return Err(PlanError::HorizonOutOfRange);
    }

    let tiles = tile_window(req.start_time, req.end_time, req.duration_minutes)?;

    let mut slots = Vec::new();
    for day_offset in 1..=(req.weeks as i64 * 7) {
        let date = today + Duration::days(day_offset);
        if !req.weekdays.contains(&date.weekday().number_from_monday()) {
            continue;
        }
        for &(start, end) in &tiles {
            slots.push(NewSlot {
                slot_date: date,
                start_time: start,
                end_time: end,
                max_bookings: req.max_bookings,
            });
        }
    }
    Ok(slots)
}

fn validate_capacity(max_bookings: i32) -> Result<(), PlanError> {
    if max_bookings < 1 {
        return Err(PlanError::NonPositiveCapacity);
    }
    Ok(())
}

fn add_minutes(start: NaiveTime, minutes: i32) -> Result<NaiveTime, PlanError> {
    if minutes <= 0 {
        return Err(PlanError::NonPositiveDuration);
    }
    let (end, overflow_days) = start.overflowing_add_signed(Duration::minutes(minutes as i64));
    if overflow_days != 0 {
        return Err(PlanError::CrossesMidnight);
    }
    Ok(end)
}

fn tile_window(
    window_start: NaiveTime,
    window_end: NaiveTime,
    duration_minutes: i32,
) -> Result<Vec<(NaiveTime, NaiveTime)>, PlanError> {
    if duration_minutes <= 0 {
        return Err(PlanError::NonPositiveDuration);
    }
    if window_end <= window_start {
        return Err(PlanError::InvertedWindow);
    }

    let step = Duration::minutes(duration_minutes as i64);
    let mut tiles = Vec::new();
    let mut start = window_start;
    loop {
        let (end, overflow_days) = start.overflowing_add_signed(step);
        if overflow_days != 0 || end > window_end {
            break;
        }
        tiles.push((start, end));
        if end == window_end {
            break;
        }
        start = end;
    }
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn window_tiles_back_to_back() {
        let req = CreateSlotWindow {
            slot_date: d(2026, 9, 1),
            start_time: t(9, 0),
            end_time: t(12, 0),
            duration_minutes: 60,
            max_bookings: 1,
        };
        let slots = plan_window(&req).unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].start_time, t(9, 0));
        assert_eq!(slots[0].end_time, t(10, 0));
        assert_eq!(slots[2].start_time, t(11, 0));
        assert_eq!(slots[2].end_time, t(12, 0));
    }

    #[test]
    fn final_tile_ending_exactly_at_window_end_is_included() {
        let req = CreateSlotWindow {
            slot_date: d(2026, 9, 1),
            start_time: t(9, 0),
            end_time: t(10, 30),
            duration_minutes: 45,
            max_bookings: 1,
        };
        let slots = plan_window(&req).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].end_time, t(10, 30));
    }

    #[test]
    fn overshooting_tile_is_dropped_not_truncated() {
        // 09:00-10:59 with 60-minute slots: the 10:00 tile would end 11:00.
        let req = CreateSlotWindow {
            slot_date: d(2026, 9, 1),
            start_time: t(9, 0),
            end_time: t(10, 59),
            duration_minutes: 60,
            max_bookings: 1,
        };
        let slots = plan_window(&req).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].end_time, t(10, 0));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let req = CreateSlotWindow {
            slot_date: d(2026, 9, 1),
            start_time: t(12, 0),
            end_time: t(9, 0),
            duration_minutes: 60,
            max_bookings: 1,
        };
        assert_eq!(plan_window(&req).unwrap_err(), PlanError::InvertedWindow);
    }

    #[test]
    fn single_slot_computes_end_from_duration() {
        let req = CreateSlot {
            slot_date: d(2026, 9, 1),
            start_time: t(13, 30),
            duration_minutes: 90,
            max_bookings: 2,
        };
        let slot = plan_single(&req).unwrap();
        assert_eq!(slot.end_time, t(15, 0));
        assert_eq!(slot.max_bookings, 2);
    }

    #[test]
    fn single_slot_crossing_midnight_is_rejected() {
        let req = CreateSlot {
            slot_date: d(2026, 9, 1),
            start_time: t(23, 30),
            duration_minutes: 60,
            max_bookings: 1,
        };
        assert_eq!(plan_single(&req).unwrap_err(), PlanError::CrossesMidnight);
    }

    #[test]
    fn recurrence_mon_wed_fri_two_weeks() {
        // 2026-08-31 is a Monday; generation starts the next day.
        let today = d(2026, 8, 31);
        let req = CreateRecurringSlots {
            weekdays: vec![1, 3, 5],
            start_time: t(9, 0),
            end_time: t(12, 0),
            duration_minutes: 60,
            weeks: 2,
            max_bookings: 1,
        };
        let slots = plan_recurring(&req, today).unwrap();
        // 3 tiles/day, 3 days/week, 2 weeks.
        assert_eq!(slots.len(), 18);
        // Today itself (a Monday) must be excluded.
        assert!(slots.iter().all(|s| s.slot_date > today));
        // All dates land on the selected weekdays.
        assert!(slots.iter().all(|s| {
            let wd = s.slot_date.weekday().number_from_monday();
            [1, 3, 5].contains(&wd)
        }));
    }

    #[test]
    fn recurrence_rejects_bad_inputs() {
        let base = CreateRecurringSlots {
            weekdays: vec![],
            start_time: t(9, 0),
            end_time: t(12, 0),
            duration_minutes: 60,
            weeks: 2,
            max_bookings: 1,
        };
        assert_eq!(
            plan_recurring(&base, d(2026, 8, 31)).unwrap_err(),
            PlanError::EmptyWeekdays
        );

        let bad_weeks = CreateRecurringSlots {
            weekdays: vec![1],
            start_time: t(9, 0),
            end_time: t(12, 0),
            duration_minutes: 60,
            weeks: 13,
            max_bookings: 1,
        };
        assert_eq!(
            plan_recurring(&bad_weeks, d(2026, 8, 31)).unwrap_err(),
            PlanError::HorizonOutOfRange
        );

        let bad_day = CreateRecurringSlots {
            weekdays: vec![0],
            start_time: t(9, 0),
            end_time: t(12, 0),
            duration_minutes: 60,
            weeks: 2,
            max_bookings: 1,
        };
        assert_eq!(
            plan_recurring(&bad_day, d(2026, 8, 31)).unwrap_err(),
            PlanError::InvalidWeekday
        );
    }
}
