//! Capacity Guard: pure predicates over product config and slot rows that
//! decide whether a slot may currently be offered to buyers.
//!
//! Advance-notice and buffer rules are soft listing-time guards; the
//! authoritative check at reservation time is the conditional seat increment
//! in `db::queries::reserve_slot_seat`.

use chrono::{Duration, NaiveDateTime};

use crate::models::{BookingSlot, Product};

/// Why a slot is withheld from buyers. Listing code only needs the yes/no,
/// but the reservation path reports the specific reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Withheld {
    Hidden,
    Full,
    TooSoon,
    BufferBlocked,
}

/// Seat/visibility/advance-notice check for one slot, evaluated against the
/// storefront wall clock (`now` is already in the creator's UTC+7 timezone).
pub fn offerability(slot: &BookingSlot, product: &Product, now: NaiveDateTime) -> Option<Withheld> {
    if !slot.is_available {
        return Some(Withheld::Hidden);
    }
    if slot.current_bookings >= slot.max_bookings {
        return Some(Withheld::Full);
    }
    let starts_at = slot.slot_date.and_time(slot.start_time);
    let earliest = now + Duration::hours(product.minimum_advance_hours as i64);
    if starts_at < earliest {
        return Some(Withheld::TooSoon);
    }
    None
}

/// A booked slot bleeds a cooldown window forward: the candidate is blocked
/// when its start falls inside `[other.start, other.end + buffer)` for any
/// other same-day slot with at least one reservation.
pub fn is_buffer_blocked(
    candidate: &BookingSlot,
    same_day_slots: &[BookingSlot],
    buffer_minutes: i32,
) -> bool {
    if buffer_minutes <= 0 {
        return false;
    }
    let buffer = Duration::minutes(buffer_minutes as i64);
    same_day_slots.iter().any(|other| {
        if other.id == candidate.id
            || other.slot_date != candidate.slot_date
            || other.current_bookings == 0
            || candidate.start_time < other.start_time
        {
            return false;
        }
        // A cooldown spilling past midnight blocks the rest of the day.
        let (bleed_end, overflow_days) = other.end_time.overflowing_add_signed(buffer);
        overflow_days != 0 || candidate.start_time < bleed_end
    })
}

/// Full guard used by the availability listing and the reschedule-options
/// query: offer-able and not buffer-blocked.
pub fn is_offerable(
    slot: &BookingSlot,
    product: &Product,
    same_day_slots: &[BookingSlot],
    now: NaiveDateTime,
) -> bool {
    offerability(slot, product, now).is_none()
        && !is_buffer_blocked(slot, same_day_slots, product.buffer_minutes)
}
