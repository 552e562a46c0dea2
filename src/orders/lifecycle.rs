//! Order Lifecycle Manager: checkout, slip handling, confirmation,
//! rejection, and refunds. Every status move funnels through
//! `queries::transition_order`, a compare-and-set on the status column with
//! its source list taken from `OrderStatus::legal_sources`, so concurrent
//! requests cannot apply the same transition twice. Moves that touch more
//! than one row commit as a single transaction.

use rusqlite::Connection;

use crate::db::queries;
use crate::models::{
    CreateOrder, FulfillmentContent, FulfillmentType, Order, OrderStatus, Product, ProductType,
};
use crate::payments::SlipVerification;
use crate::scheduling;
use crate::util::{generate_token, now_store};

use super::OrderError;

/// Download budget for digital orders.
pub const DEFAULT_MAX_DOWNLOADS: i32 = 5;

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Checkout. For booking/live products the seat is taken here, inside the
/// transaction, via the conditional increment: pending orders hold capacity
/// so two buyers can never both sit on the last seat through the payment
/// window.
pub fn create_order(conn: &mut Connection, input: &CreateOrder) -> Result<Order, OrderError> {
    let tx = conn.transaction().map_err(OrderError::from)?;

    let product = queries::get_product_by_id(&tx, &input.product_id)?
        .filter(|p| p.is_published)
        .ok_or(OrderError::ProductNotFound)?;
    let creator = queries::get_creator_by_id(&tx, &product.creator_id)?
        .ok_or(OrderError::ProductNotFound)?;
    if !creator.can_sell() {
        return Err(OrderError::StoreNotAccepting);
    }

    if let Some(limit) = product.max_bookings_per_customer {
        let held =
            queries::count_customer_orders_for_product(&tx, &product.id, &input.buyer_email)?;
        if held >= limit as i64 {
            return Err(OrderError::CustomerBookingLimit);
        }
    }

    // Slot handling: snapshot + atomic reservation.
    let mut booking_date = None;
    let mut booking_time = None;
    let slot_id = if product.product_type.is_bookable() {
        let slot_id = input.slot_id.as_deref().ok_or(OrderError::SlotRequired)?;
        let slot = queries::get_slot_by_id(&tx, slot_id)?
            .filter(|s| s.product_id == product.id)
            .ok_or(OrderError::SlotNotFound)?;

        // Soft guards re-checked at creation; the hard capacity check is the
        // conditional UPDATE below.
        let same_day = queries::list_slots_on_date(&tx, &product.id, slot.slot_date)?;
        match scheduling::offerability(&slot, &product, now_store()) {
            None => {}
            Some(scheduling::Withheld::Full) => return Err(OrderError::SlotFull),
            Some(_) => return Err(OrderError::SlotNotBookable),
        }
        if scheduling::is_buffer_blocked(&slot, &same_day, product.buffer_minutes) {
            return Err(OrderError::SlotNotBookable);
        }

        if !queries::reserve_slot_seat(&tx, slot_id)? {
            return Err(OrderError::SlotFull);
        }
        booking_date = Some(slot.slot_date);
        booking_time = Some(slot.start_time);
        Some(slot_id.to_string())
    } else {
        None
    };

    // Coupon: validate, then take a use under the usage_limit guard. The
    // take is what actually decides races on the last remaining use.
    let mut coupon_id = None;
    let mut discount = 0;
    if let Some(code) = input.coupon_code.as_deref().filter(|c| !c.trim().is_empty()) {
        let coupon = queries::get_coupon_by_code(&tx, &creator.id, code)?
            .ok_or(OrderError::CouponNotFound)?;
        let prior_uses =
            queries::count_coupon_uses_by_email(&tx, &coupon.id, &input.buyer_email)?;
        super::validate_for_checkout(&coupon, product.price, prior_uses, unix_now())?;
        if !queries::take_coupon_use(&tx, &coupon.id)? {
            return Err(OrderError::CouponUsageLimit);
        }
        discount = super::compute_discount(&coupon, product.price);
        coupon_id = Some(coupon.id);
    }

    let total = (product.price - discount).max(0);

    let order = queries::insert_order(
        &tx,
        &queries::NewOrder {
            product_id: &product.id,
            creator_id: &creator.id,
            buyer_name: &input.buyer_name,
            buyer_email: &input.buyer_email,
            buyer_phone: input.buyer_phone.as_deref(),
            buyer_note: input.buyer_note.as_deref(),
            refund_promptpay: input.refund_promptpay.as_deref(),
            slot_id: slot_id.as_deref(),
            booking_date,
            booking_time,
            coupon_id: coupon_id.as_deref(),
            discount_amount: discount,
            total,
        },
    )?;

    queries::insert_payment(&tx, &order.id)?;
    create_fulfillment_for(&tx, &order.id, &product)?;

    tx.commit().map_err(OrderError::from)?;

    tracing::info!(
        order_id = %order.id,
        product_id = %product.id,
        creator_id = %creator.id,
        slot_id = ?order.slot_id,
        total,
        "order created"
    );
    Ok(order)
}

fn create_fulfillment_for(
    conn: &Connection,
    order_id: &str,
    product: &Product,
) -> Result<(), OrderError> {
    let (fulfillment_type, content, token) = match product.product_type {
        ProductType::Digital => (
            FulfillmentType::Download,
            product
                .delivery
                .clone()
                .unwrap_or(FulfillmentContent::Pending),
            Some(generate_token()),
        ),
        ProductType::Booking => (
            FulfillmentType::BookingDetails,
            product
                .delivery
                .clone()
                .unwrap_or(FulfillmentContent::Pending),
            None,
        ),
        ProductType::Live => (
            FulfillmentType::LiveAccess,
            product
                .delivery
                .clone()
                .unwrap_or(FulfillmentContent::Pending),
            None,
        ),
        ProductType::Link => (
            FulfillmentType::Download,
            match &product.external_url {
                Some(url) => FulfillmentContent::DownloadRedirect {
                    redirect_url: url.clone(),
                },
                None => FulfillmentContent::Pending,
            },
            None,
        ),
    };
    queries::insert_fulfillment(
        conn,
        order_id,
        fulfillment_type,
        &content,
        token.as_deref(),
        DEFAULT_MAX_DOWNLOADS,
    )?;
    Ok(())
}

/// Buyer uploads payment evidence: pending_payment → pending_confirmation.
/// The slip URL comes from the storage collaborator; the core never touches
/// image bytes.
pub fn attach_slip(
    conn: &mut Connection,
    order_id: &str,
    slip_url: &str,
) -> Result<Order, OrderError> {
    let tx = conn.transaction().map_err(OrderError::from)?;
    let order = queries::get_order_by_id(&tx, order_id)?.ok_or(OrderError::OrderNotFound)?;
    if !queries::transition_order(
        &tx,
        &order.id,
        &OrderStatus::legal_sources(OrderStatus::PendingConfirmation),
        OrderStatus::PendingConfirmation,
    )? {
        return Err(OrderError::InvalidTransition);
    }
    queries::record_slip_upload(&tx, &order.id, slip_url)?;
    tx.commit().map_err(OrderError::from)?;

    tracing::info!(order_id = %order.id, creator_id = %order.creator_id, "payment slip uploaded");
    refreshed(conn, &order.id)
}

/// Apply the verification oracle's verdict. A verified slip drives straight
/// to confirmed; anything else parks the order in pending_confirmation with
/// the failure recorded for human review (a flag, not a status).
pub fn apply_verification(
    conn: &mut Connection,
    order_id: &str,
    verdict: &SlipVerification,
) -> Result<Order, OrderError> {
    let tx = conn.transaction().map_err(OrderError::from)?;
    let order = queries::get_order_by_id(&tx, order_id)?.ok_or(OrderError::OrderNotFound)?;
    queries::record_slip_verification(
        &tx,
        &order.id,
        verdict.verified,
        verdict.reference.as_deref(),
        verdict.message.as_deref(),
    )?;

    if verdict.verified {
        finalize_confirmation(&tx, &order)?;
        tx.commit().map_err(OrderError::from)?;
        tracing::info!(order_id = %order.id, reference = ?verdict.reference, "slip auto-verified, order confirmed");
    } else {
        tx.commit().map_err(OrderError::from)?;
        tracing::warn!(
            order_id = %order.id,
            message = ?verdict.message,
            "slip verification failed, awaiting manual review"
        );
    }
    refreshed(conn, &order.id)
}

/// Creator manually confirms. Requires an uploaded slip; booking/live orders
/// additionally require real fulfillment content (meeting link, location or
/// access URL) before the buyer can be told the order is confirmed.
pub fn confirm_order(conn: &mut Connection, order_id: &str) -> Result<Order, OrderError> {
    let tx = conn.transaction().map_err(OrderError::from)?;
    let order = queries::get_order_by_id(&tx, order_id)?.ok_or(OrderError::OrderNotFound)?;

    let payment =
        queries::get_payment_by_order(&tx, &order.id)?.ok_or(OrderError::OrderNotFound)?;
    if payment.slip_url.is_none() {
        return Err(OrderError::SlipMissing);
    }

    let product =
        queries::get_product_by_id(&tx, &order.product_id)?.ok_or(OrderError::ProductNotFound)?;
    if product.product_type.is_bookable() {
        let fulfillment = queries::get_fulfillment_by_order(&tx, &order.id)?
            .ok_or(OrderError::OrderNotFound)?;
        if !fulfillment.content.is_ready() {
            return Err(OrderError::FulfillmentNotReady);
        }
    }

    finalize_confirmation(&tx, &order)?;
    tx.commit().map_err(OrderError::from)?;
    tracing::info!(order_id = %order.id, creator_id = %order.creator_id, "order confirmed manually");
    refreshed(conn, &order.id)
}

/// Shared confirm tail for the manual and automated paths. The transition is
/// a CAS and the coupon charge is latched, so running this twice for the
/// same order settles into a single confirmation and a single count.
fn finalize_confirmation(conn: &Connection, order: &Order) -> Result<(), OrderError> {
    if !queries::transition_order(
        conn,
        &order.id,
        &OrderStatus::legal_sources(OrderStatus::Confirmed),
        OrderStatus::Confirmed,
    )? {
        return Err(OrderError::InvalidTransition);
    }

    // Coupon uses are normally charged at checkout; the latch covers orders
    // that predate the coupon being attached and makes retries idempotent.
    if let Some(coupon_id) = &order.coupon_id {
        if !order.coupon_counted && queries::mark_order_coupon_counted(conn, &order.id)? {
            if !queries::take_coupon_use(conn, coupon_id)? {
                tracing::warn!(
                    order_id = %order.id,
                    coupon_id = %coupon_id,
                    "coupon limit exhausted at confirmation; order honored anyway"
                );
            }
        }
    }
    Ok(())
}

/// Creator rejects a pending_confirmation order. The seat is released and
/// the rejection is terminal: the order is closed with the reason recorded,
/// it never returns to pending_payment.
pub fn reject_order(
    conn: &mut Connection,
    order_id: &str,
    reason: &str,
) -> Result<Order, OrderError> {
    let tx = conn.transaction().map_err(OrderError::from)?;
    let order = queries::get_order_by_id(&tx, order_id)?.ok_or(OrderError::OrderNotFound)?;
    if !queries::transition_order(
        &tx,
        &order.id,
        &OrderStatus::rejectable_sources(),
        OrderStatus::Cancelled,
    )? {
        return Err(OrderError::InvalidTransition);
    }
    queries::set_order_cancel_reason(&tx, &order.id, &format!("rejected: {reason}"))?;
    release_seat_once(&tx, &order)?;
    tx.commit().map_err(OrderError::from)?;

    tracing::info!(order_id = %order.id, creator_id = %order.creator_id, "order rejected");
    refreshed(conn, &order.id)
}

/// Creator refunds. Allowed from confirmed, pending_confirmation, or an
/// already-cancelled order; the seat is released only if a prior cancel or
/// reject has not already given it back.
pub fn refund_order(
    conn: &mut Connection,
    order_id: &str,
    refund_slip_url: &str,
    note: Option<&str>,
) -> Result<Order, OrderError> {
    let tx = conn.transaction().map_err(OrderError::from)?;
    let order = queries::get_order_by_id(&tx, order_id)?.ok_or(OrderError::OrderNotFound)?;
    if !queries::transition_order(
        &tx,
        &order.id,
        &OrderStatus::legal_sources(OrderStatus::Refunded),
        OrderStatus::Refunded,
    )? {
        return Err(OrderError::InvalidTransition);
    }
    queries::record_refund_slip(&tx, &order.id, refund_slip_url, note)?;
    release_seat_once(&tx, &order)?;
    tx.commit().map_err(OrderError::from)?;

    tracing::info!(order_id = %order.id, creator_id = %order.creator_id, "order refunded");
    refreshed(conn, &order.id)
}

/// Release the order's seat exactly once, whatever path gets here first.
/// The latch on the order row decides the winner; the slot decrement itself
/// is clamped at zero.
pub(crate) fn release_seat_once(conn: &Connection, order: &Order) -> Result<(), OrderError> {
    if !order.holds_seat() {
        return Ok(());
    }
    let Some(slot_id) = &order.slot_id else {
        return Ok(());
    };
    if queries::mark_order_slot_released(conn, &order.id)? {
        queries::release_slot_seat(conn, slot_id)?;
        tracing::debug!(order_id = %order.id, slot_id = %slot_id, "slot seat released");
    }
    Ok(())
}

fn refreshed(conn: &Connection, order_id: &str) -> Result<Order, OrderError> {
    queries::get_order_by_id(conn, order_id)?.ok_or(OrderError::OrderNotFound)
}
