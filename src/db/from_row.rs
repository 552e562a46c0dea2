//! Row-mapping helpers: one `FromRow` impl and one column-list constant per
//! entity, so SELECT lists and struct fields cannot drift apart silently.

use rusqlite::{Connection, Params, Row};

use crate::error::Result;
use crate::models::*;

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub fn query_one<T: FromRow, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, |row| T::from_row(row))?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| T::from_row(row))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Parse a TEXT enum column, mapping bad data to a column-level error.
fn parse_enum<E: std::str::FromStr>(row: &Row<'_>, idx: usize) -> rusqlite::Result<E> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognized enum value: {raw}").into(),
        )
    })
}

pub const CREATOR_COLS: &str =
    "id, email, store_name, promptpay_id, is_published, created_at, updated_at";

impl FromRow for Creator {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Creator {
            id: row.get(0)?,
            email: row.get(1)?,
            store_name: row.get(2)?,
            promptpay_id: row.get(3)?,
            is_published: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

pub const PRODUCT_COLS: &str = "id, creator_id, name, description, product_type, price, \
     is_published, duration_minutes, minimum_advance_hours, buffer_minutes, \
     max_bookings_per_customer, delivery, external_url, created_at, updated_at";

impl FromRow for Product {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let delivery_json: Option<String> = row.get(11)?;
        let delivery = delivery_json
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    11,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
        Ok(Product {
            id: row.get(0)?,
            creator_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            product_type: parse_enum(row, 4)?,
            price: row.get(5)?,
            is_published: row.get(6)?,
            duration_minutes: row.get(7)?,
            minimum_advance_hours: row.get(8)?,
            buffer_minutes: row.get(9)?,
            max_bookings_per_customer: row.get(10)?,
            delivery,
            external_url: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }
}

pub const SLOT_COLS: &str = "id, product_id, creator_id, slot_date, start_time, end_time, \
     max_bookings, current_bookings, is_available, is_booked, created_at";

impl FromRow for BookingSlot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(BookingSlot {
            id: row.get(0)?,
            product_id: row.get(1)?,
            creator_id: row.get(2)?,
            slot_date: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
            max_bookings: row.get(6)?,
            current_bookings: row.get(7)?,
            is_available: row.get(8)?,
            is_booked: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

pub const ORDER_COLS: &str = "id, product_id, creator_id, buyer_name, buyer_email, buyer_phone, \
     buyer_note, refund_promptpay, slot_id, booking_date, booking_time, status, cancel_reason, \
     reschedule_count, coupon_id, coupon_counted, discount_amount, total, slot_released, \
     created_at, updated_at";

impl FromRow for Order {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Order {
            id: row.get(0)?,
            product_id: row.get(1)?,
            creator_id: row.get(2)?,
            buyer_name: row.get(3)?,
            buyer_email: row.get(4)?,
            buyer_phone: row.get(5)?,
            buyer_note: row.get(6)?,
            refund_promptpay: row.get(7)?,
            slot_id: row.get(8)?,
            booking_date: row.get(9)?,
            booking_time: row.get(10)?,
            status: parse_enum(row, 11)?,
            cancel_reason: row.get(12)?,
            reschedule_count: row.get(13)?,
            coupon_id: row.get(14)?,
            coupon_counted: row.get(15)?,
            discount_amount: row.get(16)?,
            total: row.get(17)?,
            slot_released: row.get(18)?,
            created_at: row.get(19)?,
            updated_at: row.get(20)?,
        })
    }
}

pub const PAYMENT_COLS: &str = "order_id, slip_url, slip_uploaded_at, slip_verified, \
     slip_verify_ref, slip_verify_message, refund_slip_url, refund_note";

impl FromRow for Payment {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Payment {
            order_id: row.get(0)?,
            slip_url: row.get(1)?,
            slip_uploaded_at: row.get(2)?,
            slip_verified: row.get(3)?,
            slip_verify_ref: row.get(4)?,
            slip_verify_message: row.get(5)?,
            refund_slip_url: row.get(6)?,
            refund_note: row.get(7)?,
        })
    }
}

pub const FULFILLMENT_COLS: &str =
    "order_id, fulfillment_type, content, access_token, download_count, max_downloads";

impl FromRow for Fulfillment {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let content_json: String = row.get(2)?;
        let content = serde_json::from_str(&content_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        Ok(Fulfillment {
            order_id: row.get(0)?,
            fulfillment_type: parse_enum(row, 1)?,
            content,
            access_token: row.get(3)?,
            download_count: row.get(4)?,
            max_downloads: row.get(5)?,
        })
    }
}

pub const COUPON_COLS: &str = "id, creator_id, code, discount_type, discount_value, min_purchase, \
     max_discount, usage_limit, per_user_limit, usage_count, valid_from, valid_until, is_active, \
     created_at";

impl FromRow for Coupon {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Coupon {
            id: row.get(0)?,
            creator_id: row.get(1)?,
            code: row.get(2)?,
            discount_type: parse_enum(row, 3)?,
            discount_value: row.get(4)?,
            min_purchase: row.get(5)?,
            max_discount: row.get(6)?,
            usage_limit: row.get(7)?,
            per_user_limit: row.get(8)?,
            usage_count: row.get(9)?,
            valid_from: row.get(10)?,
            valid_until: row.get(11)?,
            is_active: row.get(12)?,
            created_at: row.get(13)?,
        })
    }
}
