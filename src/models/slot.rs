use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSlot {
    pub id: String,
    pub product_id: String,
    pub creator_id: String,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    /// Exclusive end. Slots never cross midnight.
    pub end_time: NaiveTime,
    pub max_bookings: i32,
    pub current_bookings: i32,
    /// Creator-controlled visibility toggle.
    pub is_available: bool,
    /// Cached "has at least one reservation" flag, maintained by the
    /// reserve/release statements.
    pub is_booked: bool,
    pub created_at: i64,
}

impl BookingSlot {
    pub fn seats_left(&self) -> i32 {
        (self.max_bookings - self.current_bookings).max(0)
    }
}

/// A slot row planned by the generator but not yet inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSlot {
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_bookings: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateSlot {
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    #[serde(default = "default_max_bookings")]
    pub max_bookings: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateSlotWindow {
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i32,
    #[serde(default = "default_max_bookings")]
    pub max_bookings: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecurringSlots {
    /// Weekdays as chrono numbering: Monday = 1 ... Sunday = 7.
    pub weekdays: Vec<u32>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i32,
    /// Horizon in weeks, 1..=12. Generation starts tomorrow.
    pub weeks: u32,
    #[serde(default = "default_max_bookings")]
    pub max_bookings: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSlot {
    pub is_available: Option<bool>,
    pub max_bookings: Option<i32>,
}

fn default_max_bookings() -> i32 {
    1
}

/// Outcome of a chunked bulk insert. Duplicates are skipped, not errors;
/// a mid-batch write failure still reports what landed before it.
#[derive(Debug, Clone, Serialize)]
pub struct SlotBatchReport {
    pub requested: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Present when a chunk failed; `inserted`/`duplicates` cover the rows
    /// committed before the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,
}
