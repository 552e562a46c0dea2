//! Reschedule/Cancel coordination: swapping an order's seat between slots as
//! one atomic unit, and giving seats back on cancellation.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{BookingSlot, Order, OrderStatus};
use crate::scheduling;
use crate::util::now_store;

use super::{OrderError, lifecycle::release_seat_once};

/// Each order may be rescheduled at most once, lifetime.
pub const MAX_RESCHEDULES: i32 = 1;

/// Outcome of a cancel request. Cancelling an already-cancelled order is a
/// deterministic no-op, reported distinctly so callers can tell.
#[derive(Debug)]
pub enum CancelOutcome {
    Cancelled(Order),
    AlreadyCancelled(Order),
}

/// Cancel an order (buyer or creator initiated). Status move, reason, and
/// seat release commit as one transaction, and the seat goes back exactly
/// once; a second invocation of cancel is a no-op.
pub fn cancel_order(
    conn: &mut Connection,
    order_id: &str,
    reason: &str,
) -> Result<CancelOutcome, OrderError> {
    let tx = conn.transaction().map_err(OrderError::from)?;
    let order = queries::get_order_by_id(&tx, order_id)?.ok_or(OrderError::OrderNotFound)?;

    if order.status == OrderStatus::Cancelled {
        return Ok(CancelOutcome::AlreadyCancelled(order));
    }

    if !queries::transition_order(
        &tx,
        &order.id,
        &OrderStatus::legal_sources(OrderStatus::Cancelled),
        OrderStatus::Cancelled,
    )? {
        // Lost a race or the order is refunded; re-read to report accurately.
        let current =
            queries::get_order_by_id(&tx, order_id)?.ok_or(OrderError::OrderNotFound)?;
        if current.status == OrderStatus::Cancelled {
            return Ok(CancelOutcome::AlreadyCancelled(current));
        }
        return Err(OrderError::InvalidTransition);
    }

    queries::set_order_cancel_reason(&tx, &order.id, reason)?;
    release_seat_once(&tx, &order)?;
    tx.commit().map_err(OrderError::from)?;

    tracing::info!(order_id = %order.id, creator_id = %order.creator_id, "order cancelled");
    let order = queries::get_order_by_id(conn, order_id)?.ok_or(OrderError::OrderNotFound)?;
    Ok(CancelOutcome::Cancelled(order))
}

/// Move the order's reservation to `target_slot_id`.
///
/// Release of the source seat, conditional reserve of the target, the order
/// snapshot update, and the reschedule-count charge all run inside one
/// SQLite transaction: a full target or an exhausted budget rolls everything
/// back, so at any observable point exactly one slot accounts for the order.
pub fn reschedule_order(
    conn: &mut Connection,
    order_id: &str,
    target_slot_id: &str,
) -> Result<Order, OrderError> {
    let tx = conn.transaction().map_err(OrderError::from)?;

    let order = queries::get_order_by_id(&tx, order_id)?.ok_or(OrderError::OrderNotFound)?;
    if !order.status.is_reschedulable() {
        return Err(OrderError::InvalidTransition);
    }
    if order.reschedule_count >= MAX_RESCHEDULES {
        return Err(OrderError::RescheduleLimitReached);
    }
    if !order.holds_seat() {
        return Err(OrderError::SlotNotFound);
    }
    let current_slot_id = order.slot_id.as_deref().ok_or(OrderError::SlotNotFound)?;
    if current_slot_id == target_slot_id {
        return Err(OrderError::SameSlot);
    }

    let product =
        queries::get_product_by_id(&tx, &order.product_id)?.ok_or(OrderError::ProductNotFound)?;
    let target = queries::get_slot_by_id(&tx, target_slot_id)?
        .filter(|s| s.product_id == order.product_id)
        .ok_or(OrderError::SlotNotFound)?;

    let same_day = queries::list_slots_on_date(&tx, &product.id, target.slot_date)?;
    match scheduling::offerability(&target, &product, now_store()) {
        None => {}
        Some(scheduling::Withheld::Full) => return Err(OrderError::SlotFull),
        Some(_) => return Err(OrderError::SlotNotBookable),
    }
    if scheduling::is_buffer_blocked(&target, &same_day, product.buffer_minutes) {
        return Err(OrderError::SlotNotBookable);
    }

    queries::release_slot_seat(&tx, current_slot_id)?;
    if !queries::reserve_slot_seat(&tx, target_slot_id)? {
        // Dropping the transaction undoes the release.
        return Err(OrderError::SlotFull);
    }
    if !queries::apply_order_reschedule(
        &tx,
        &order.id,
        target_slot_id,
        target.slot_date,
        target.start_time,
        MAX_RESCHEDULES,
    )? {
        return Err(OrderError::RescheduleLimitReached);
    }

    tx.commit().map_err(OrderError::from)?;

    tracing::info!(
        order_id = %order.id,
        from_slot = %current_slot_id,
        to_slot = %target_slot_id,
        "order rescheduled"
    );
    queries::get_order_by_id(conn, order_id)?.ok_or(OrderError::OrderNotFound)
}

/// Slots the buyer may move this order to: same product, current slot
/// excluded, Capacity Guard applied, grouped by date for presentation.
pub fn reschedule_options(
    conn: &Connection,
    order: &Order,
) -> Result<Vec<(NaiveDate, Vec<BookingSlot>)>, OrderError> {
    let product =
        queries::get_product_by_id(conn, &order.product_id)?.ok_or(OrderError::ProductNotFound)?;
    let all = queries::list_slots_for_product(conn, &product.id)?;
    let now = now_store();

    let mut grouped: Vec<(NaiveDate, Vec<BookingSlot>)> = Vec::new();
    for slot in &all {
        if Some(slot.id.as_str()) == order.slot_id.as_deref() {
            continue;
        }
        if !scheduling::is_offerable(slot, &product, &all, now) {
            continue;
        }
        match grouped.last_mut() {
            Some((date, slots)) if *date == slot.slot_date => slots.push(slot.clone()),
            _ => grouped.push((slot.slot_date, vec![slot.clone()])),
        }
    }
    Ok(grouped)
}
