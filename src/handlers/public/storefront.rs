use axum::extract::State;
use chrono::NaiveDate;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::BookingSlot;
use crate::scheduling;
use crate::util::now_store;

/// One offer-able slot as shown to buyers. Capacity internals stay private;
/// the storefront only learns how many seats remain.
#[derive(Debug, Serialize)]
pub struct PublicSlot {
    pub id: String,
    pub start_time: chrono::NaiveTime,
    pub end_time: chrono::NaiveTime,
    pub seats_left: i32,
}

#[derive(Debug, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub slots: Vec<PublicSlot>,
}

impl From<&BookingSlot> for PublicSlot {
    fn from(slot: &BookingSlot) -> Self {
        PublicSlot {
            id: slot.id.clone(),
            start_time: slot.start_time,
            end_time: slot.end_time,
            seats_left: slot.seats_left(),
        }
    }
}

/// Group slots by date, preserving the date/time ordering of the query.
pub(super) fn group_by_date<'a, I>(slots: I) -> Vec<(NaiveDate, Vec<&'a BookingSlot>)>
where
    I: IntoIterator<Item = &'a BookingSlot>,
{
    let mut grouped: Vec<(NaiveDate, Vec<&BookingSlot>)> = Vec::new();
    for slot in slots {
        match grouped.last_mut() {
            Some((date, day)) if *date == slot.slot_date => day.push(slot),
            _ => grouped.push((slot.slot_date, vec![slot])),
        }
    }
    grouped
}

/// Buyer-facing availability for a bookable product. Full, hidden,
/// too-soon and buffer-blocked slots are simply absent from the answer.
pub async fn list_available_slots(
    State(state): State<AppState>,
    Path((creator_id, product_id)): Path<(String, String)>,
) -> Result<Json<Vec<DayAvailability>>> {
    let conn = state.db.get()?;

    let creator = queries::get_creator_by_id(&conn, &creator_id)?
        .filter(|c| c.is_published)
        .ok_or_else(|| AppError::NotFound("Store not found".into()))?;
    let product = queries::get_product_by_id(&conn, &product_id)?
        .filter(|p| p.creator_id == creator.id && p.is_published)
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    if !product.product_type.is_bookable() {
        return Err(AppError::BadRequest("Product does not take bookings".into()));
    }

    let all = queries::list_slots_for_product(&conn, &product.id)?;
    let now = now_store();
    let offerable = all
        .iter()
        .filter(|slot| scheduling::is_offerable(slot, &product, &all, now));

    let days = group_by_date(offerable)
        .into_iter()
        .map(|(date, slots)| DayAvailability {
            date,
            slots: slots.into_iter().map(PublicSlot::from).collect(),
        })
        .collect();
    Ok(Json(days))
}
