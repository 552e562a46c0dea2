use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::{Connection, params, types::Value};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{
    COUPON_COLS, CREATOR_COLS, FULFILLMENT_COLS, ORDER_COLS, PAYMENT_COLS, PRODUCT_COLS,
    SLOT_COLS, query_all, query_one,
};

/// Max rows per bulk-insert transaction; keeps any single write small.
pub const SLOT_INSERT_CHUNK: usize = 500;

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// True when the error is a UNIQUE-constraint violation (the one conflict
/// class we treat as a business condition rather than an internal error).
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query for efficiency.
struct UpdateBuilder {
    table: &'static str,
    key_column: &'static str,
    key: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            key_column: "id",
            key: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    /// Key on something other than `id` (payments/fulfillments key on order_id).
    fn with_key_column(mut self, column: &'static str) -> Self {
        self.key_column = column;
        self
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a column to an explicit value (including NULL).
    /// Use this for Option<T> where Some(v) = set to v, None = set to NULL.
    fn set_nullable<V: Into<Value>>(mut self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.fields.push((column, v.into())),
            None => self.fields.push((column, Value::Null)),
        }
        self
    }

    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.key.into());
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table,
            sets.join(", "),
            self.key_column
        );
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Creators ============

pub fn create_creator(conn: &Connection, input: &CreateCreator, api_key_hash: &str) -> Result<Creator> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO creators (id, email, store_name, promptpay_id, is_published, api_key_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7)",
        params![&id, &input.email, &input.store_name, &input.promptpay_id, api_key_hash, now, now],
    )?;

    Ok(Creator {
        id,
        email: input.email.clone(),
        store_name: input.store_name.clone(),
        promptpay_id: input.promptpay_id.clone(),
        is_published: false,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_creator_by_id(conn: &Connection, id: &str) -> Result<Option<Creator>> {
    query_one(
        conn,
        &format!("SELECT {} FROM creators WHERE id = ?1", CREATOR_COLS),
        &[&id],
    )
}

pub fn get_creator_by_api_key_hash(conn: &Connection, hash: &str) -> Result<Option<Creator>> {
    query_one(
        conn,
        &format!("SELECT {} FROM creators WHERE api_key_hash = ?1", CREATOR_COLS),
        &[&hash],
    )
}

pub fn update_creator(conn: &Connection, id: &str, input: &UpdateCreator) -> Result<bool> {
    UpdateBuilder::new("creators", id)
        .with_updated_at()
        .set_opt("store_name", input.store_name.clone())
        .set_opt("is_published", input.is_published)
        .set_opt_nullable_string("promptpay_id", input.promptpay_id.clone())
        .execute(conn)
}

impl UpdateBuilder {
    /// Option<Option<String>>: outer None = leave alone, inner None = set NULL.
    fn set_opt_nullable_string(
        self,
        column: &'static str,
        value: Option<Option<String>>,
    ) -> Self {
        match value {
            Some(v) => self.set_nullable(column, v),
            None => self,
        }
    }

    fn set_opt_nullable_i64(self, column: &'static str, value: Option<Option<i64>>) -> Self {
        match value {
            Some(v) => self.set_nullable(column, v),
            None => self,
        }
    }

    fn set_opt_nullable_i32(self, column: &'static str, value: Option<Option<i32>>) -> Self {
        match value {
            Some(v) => self.set_nullable(column, v.map(i64::from)),
            None => self,
        }
    }
}

// ============ Products ============

pub fn create_product(conn: &Connection, creator_id: &str, input: &CreateProduct) -> Result<Product> {
    let id = gen_id();
    let now = now();
    let delivery_json = serialize_delivery(input.delivery.as_ref())?;

    conn.execute(
        "INSERT INTO products (id, creator_id, name, description, product_type, price, is_published,
                               duration_minutes, minimum_advance_hours, buffer_minutes,
                               max_bookings_per_customer, delivery, external_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            &id,
            creator_id,
            &input.name,
            &input.description,
            input.product_type.as_ref(),
            input.price,
            input.duration_minutes,
            input.minimum_advance_hours,
            input.buffer_minutes,
            input.max_bookings_per_customer,
            delivery_json,
            &input.external_url,
            now,
            now
        ],
    )?;

    Ok(Product {
        id,
        creator_id: creator_id.to_string(),
        name: input.name.clone(),
        description: input.description.clone(),
        product_type: input.product_type,
        price: input.price,
        is_published: false,
        duration_minutes: input.duration_minutes,
        minimum_advance_hours: input.minimum_advance_hours,
        buffer_minutes: input.buffer_minutes,
        max_bookings_per_customer: input.max_bookings_per_customer,
        delivery: input.delivery.clone(),
        external_url: input.external_url.clone(),
        created_at: now,
        updated_at: now,
    })
}

fn serialize_delivery(delivery: Option<&FulfillmentContent>) -> Result<Option<String>> {
    delivery
        .map(|content| {
            serde_json::to_string(content)
                .map_err(|e| AppError::Internal(format!("serialize delivery config: {e}")))
        })
        .transpose()
}

pub fn get_product_by_id(conn: &Connection, id: &str) -> Result<Option<Product>> {
    query_one(
        conn,
        &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLS),
        &[&id],
    )
}

pub fn list_products_for_creator(conn: &Connection, creator_id: &str) -> Result<Vec<Product>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM products WHERE creator_id = ?1 ORDER BY created_at DESC",
            PRODUCT_COLS
        ),
        &[&creator_id],
    )
}

pub fn update_product(conn: &Connection, id: &str, input: &UpdateProduct) -> Result<bool> {
    UpdateBuilder::new("products", id)
        .with_updated_at()
        .set_opt("name", input.name.clone())
        .set_opt_nullable_string("description", input.description.clone())
        .set_opt("price", input.price)
        .set_opt("is_published", input.is_published)
        .set_opt_nullable_i32("duration_minutes", input.duration_minutes)
        .set_opt("minimum_advance_hours", input.minimum_advance_hours)
        .set_opt("buffer_minutes", input.buffer_minutes)
        .set_opt_nullable_i32("max_bookings_per_customer", input.max_bookings_per_customer)
        .set_opt_nullable_string(
            "delivery",
            match &input.delivery {
                Some(v) => Some(serialize_delivery(v.as_ref())?),
                None => None,
            },
        )
        .set_opt_nullable_string("external_url", input.external_url.clone())
        .execute(conn)
}

/// Delete a product. Refused while any of its slots hold reservations or any
/// order references it; order history is never orphaned.
pub fn delete_product(conn: &Connection, id: &str) -> Result<bool> {
    let reserved: i64 = conn.query_row(
        "SELECT COUNT(*) FROM booking_slots WHERE product_id = ?1 AND current_bookings > 0",
        params![id],
        |row| row.get(0),
    )?;
    if reserved > 0 {
        return Err(AppError::Conflict(
            "Product has slots with active reservations".into(),
        ));
    }
    let ordered: i64 = conn.query_row(
        "SELECT COUNT(*) FROM orders WHERE product_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if ordered > 0 {
        return Err(AppError::Conflict(
            "Product has orders; unpublish it instead".into(),
        ));
    }
    conn.execute("DELETE FROM booking_slots WHERE product_id = ?1", params![id])?;
    let deleted = conn.execute("DELETE FROM products WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

// ============ Booking slots ============

/// Bulk-insert planned slots with duplicate-ignoring semantics.
///
/// Rows are written in chunks of [`SLOT_INSERT_CHUNK`], each chunk in its own
/// transaction. A conflicting (product, date, start_time) row is skipped
/// silently. If a chunk fails, the report still carries the counts committed
/// before the failure.
pub fn insert_slots(
    conn: &mut Connection,
    product_id: &str,
    creator_id: &str,
    rows: &[NewSlot],
) -> Result<SlotBatchReport> {
    let mut report = SlotBatchReport {
        requested: rows.len(),
        inserted: 0,
        duplicates: 0,
        failed: None,
    };
    let created_at = now();

    for chunk in rows.chunks(SLOT_INSERT_CHUNK) {
        let outcome: Result<(usize, usize)> = (|| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            let mut duplicates = 0;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT OR IGNORE INTO booking_slots
                       (id, product_id, creator_id, slot_date, start_time, end_time,
                        max_bookings, current_bookings, is_available, is_booked, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 1, 0, ?8)",
                )?;
                for slot in chunk {
                    let changed = stmt.execute(params![
                        gen_id(),
                        product_id,
                        creator_id,
                        slot.slot_date,
                        slot.start_time,
                        slot.end_time,
                        slot.max_bookings,
                        created_at,
                    ])?;
                    if changed > 0 {
                        inserted += 1;
                    } else {
                        duplicates += 1;
                    }
                }
            }
            tx.commit()?;
            Ok((inserted, duplicates))
        })();

        match outcome {
            Ok((inserted, duplicates)) => {
                report.inserted += inserted;
                report.duplicates += duplicates;
            }
            Err(e) => {
                tracing::error!(
                    product_id,
                    inserted = report.inserted,
                    error = %e,
                    "slot batch insert failed mid-batch"
                );
                report.failed = Some(e.to_string());
                return Ok(report);
            }
        }
    }

    Ok(report)
}

pub fn get_slot_by_id(conn: &Connection, id: &str) -> Result<Option<BookingSlot>> {
    query_one(
        conn,
        &format!("SELECT {} FROM booking_slots WHERE id = ?1", SLOT_COLS),
        &[&id],
    )
}

pub fn list_slots_for_product(conn: &Connection, product_id: &str) -> Result<Vec<BookingSlot>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM booking_slots WHERE product_id = ?1 ORDER BY slot_date, start_time",
            SLOT_COLS
        ),
        &[&product_id],
    )
}

/// All slots of a product on one date. The buffer predicate needs the whole
/// day, including slots the listing itself would filter out.
pub fn list_slots_on_date(
    conn: &Connection,
    product_id: &str,
    date: NaiveDate,
) -> Result<Vec<BookingSlot>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM booking_slots WHERE product_id = ?1 AND slot_date = ?2
             ORDER BY start_time",
            SLOT_COLS
        ),
        params![product_id, date],
    )
}

pub fn set_slot_availability(conn: &Connection, id: &str, is_available: bool) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE booking_slots SET is_available = ?1 WHERE id = ?2",
        params![is_available, id],
    )?;
    Ok(affected > 0)
}

/// Raise or lower capacity. Lowering below the live reservation count is
/// refused atomically in the same statement.
pub fn set_slot_capacity(conn: &Connection, id: &str, max_bookings: i32) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE booking_slots SET max_bookings = ?1
         WHERE id = ?2 AND current_bookings <= ?1",
        params![max_bookings, id],
    )?;
    Ok(affected > 0)
}

/// Delete a slot; refused (0 rows) while reservations exist.
pub fn delete_slot(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM booking_slots WHERE id = ?1 AND current_bookings = 0",
        params![id],
    )?;
    Ok(deleted > 0)
}

/// Atomically take one seat. The capacity check lives inside the UPDATE so
/// two concurrent buyers can never both pass a stale read.
pub fn reserve_slot_seat(conn: &Connection, slot_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE booking_slots
         SET current_bookings = current_bookings + 1, is_booked = 1
         WHERE id = ?1 AND is_available = 1 AND current_bookings < max_bookings",
        params![slot_id],
    )?;
    Ok(affected > 0)
}

/// Atomically give one seat back, clamped at zero. Clears the is_booked
/// cache when the last reservation goes away.
pub fn release_slot_seat(conn: &Connection, slot_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE booking_slots
         SET current_bookings = current_bookings - 1,
             is_booked = CASE WHEN current_bookings - 1 <= 0 THEN 0 ELSE 1 END
         WHERE id = ?1 AND current_bookings > 0",
        params![slot_id],
    )?;
    Ok(affected > 0)
}

// ============ Orders ============

pub struct NewOrder<'a> {
    pub product_id: &'a str,
    pub creator_id: &'a str,
    pub buyer_name: &'a str,
    pub buyer_email: &'a str,
    pub buyer_phone: Option<&'a str>,
    pub buyer_note: Option<&'a str>,
    pub refund_promptpay: Option<&'a str>,
    pub slot_id: Option<&'a str>,
    pub booking_date: Option<NaiveDate>,
    pub booking_time: Option<NaiveTime>,
    pub coupon_id: Option<&'a str>,
    pub discount_amount: i64,
    pub total: i64,
}

pub fn insert_order(conn: &Connection, input: &NewOrder<'_>) -> Result<Order> {
    let id = gen_id();
    let now = now();
    let coupon_counted = input.coupon_id.is_some();

    conn.execute(
        "INSERT INTO orders (id, product_id, creator_id, buyer_name, buyer_email, buyer_phone,
                             buyer_note, refund_promptpay, slot_id, booking_date, booking_time,
                             status, cancel_reason, reschedule_count, coupon_id, coupon_counted,
                             discount_amount, total, slot_released, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, NULL, 0, ?13, ?14, ?15, ?16, 0, ?17, ?18)",
        params![
            &id,
            input.product_id,
            input.creator_id,
            input.buyer_name,
            input.buyer_email,
            input.buyer_phone,
            input.buyer_note,
            input.refund_promptpay,
            input.slot_id,
            input.booking_date,
            input.booking_time,
            OrderStatus::PendingPayment.as_ref(),
            input.coupon_id,
            coupon_counted,
            input.discount_amount,
            input.total,
            now,
            now
        ],
    )?;

    Ok(Order {
        id,
        product_id: input.product_id.to_string(),
        creator_id: input.creator_id.to_string(),
        buyer_name: input.buyer_name.to_string(),
        buyer_email: input.buyer_email.to_string(),
        buyer_phone: input.buyer_phone.map(String::from),
        buyer_note: input.buyer_note.map(String::from),
        refund_promptpay: input.refund_promptpay.map(String::from),
        slot_id: input.slot_id.map(String::from),
        booking_date: input.booking_date,
        booking_time: input.booking_time,
        status: OrderStatus::PendingPayment,
        cancel_reason: None,
        reschedule_count: 0,
        coupon_id: input.coupon_id.map(String::from),
        coupon_counted,
        discount_amount: input.discount_amount,
        total: input.total,
        slot_released: false,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_order_by_id(conn: &Connection, id: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLS),
        &[&id],
    )
}

pub fn list_orders_for_creator(conn: &Connection, creator_id: &str) -> Result<Vec<Order>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM orders WHERE creator_id = ?1 ORDER BY created_at DESC",
            ORDER_COLS
        ),
        &[&creator_id],
    )
}

/// Live (non-cancelled) orders a buyer already holds for a product; used for
/// the per-customer booking cap.
pub fn count_customer_orders_for_product(
    conn: &Connection,
    product_id: &str,
    buyer_email: &str,
) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM orders
         WHERE product_id = ?1 AND buyer_email = ?2 AND status != ?3",
        params![product_id, buyer_email, OrderStatus::Cancelled.as_ref()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Compare-and-set the order status. Returns false when the order was not in
/// `from` anymore, which makes every transition race-safe and idempotent at
/// the persistence level.
pub fn transition_order(
    conn: &Connection,
    order_id: &str,
    from: &[OrderStatus],
    to: OrderStatus,
) -> Result<bool> {
    let placeholders: Vec<String> = (0..from.len()).map(|i| format!("?{}", i + 3)).collect();
    let sql = format!(
        "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?{} AND status IN ({})",
        from.len() + 3,
        placeholders.join(", ")
    );
    let mut values: Vec<Value> = vec![to.as_ref().to_string().into(), now().into()];
    values.extend(from.iter().map(|s| Value::from(s.as_ref().to_string())));
    values.push(order_id.to_string().into());
    let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
    Ok(affected > 0)
}

pub fn set_order_cancel_reason(conn: &Connection, order_id: &str, reason: &str) -> Result<()> {
    conn.execute(
        "UPDATE orders SET cancel_reason = ?1, updated_at = ?2 WHERE id = ?3",
        params![reason, now(), order_id],
    )?;
    Ok(())
}

/// Latch the seat as given back. Only the first caller wins, so a refund
/// after a cancel can tell whether it still needs to release.
pub fn mark_order_slot_released(conn: &Connection, order_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders SET slot_released = 1, updated_at = ?1
         WHERE id = ?2 AND slot_released = 0",
        params![now(), order_id],
    )?;
    Ok(affected > 0)
}

/// Move the order onto a new slot and charge the reschedule budget, all
/// guarded in one statement.
pub fn apply_order_reschedule(
    conn: &Connection,
    order_id: &str,
    slot_id: &str,
    booking_date: NaiveDate,
    booking_time: NaiveTime,
    max_reschedules: i32,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders
         SET slot_id = ?1, booking_date = ?2, booking_time = ?3,
             reschedule_count = reschedule_count + 1, updated_at = ?4
         WHERE id = ?5 AND reschedule_count < ?6",
        params![slot_id, booking_date, booking_time, now(), order_id, max_reschedules],
    )?;
    Ok(affected > 0)
}

/// Latch coupon accounting for this order. Returns true only for the caller
/// that actually flipped the flag.
pub fn mark_order_coupon_counted(conn: &Connection, order_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders SET coupon_counted = 1, updated_at = ?1
         WHERE id = ?2 AND coupon_counted = 0",
        params![now(), order_id],
    )?;
    Ok(affected > 0)
}

// ============ Payments ============

pub fn insert_payment(conn: &Connection, order_id: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO payments (order_id) VALUES (?1)",
        params![order_id],
    )?;
    Ok(())
}

pub fn get_payment_by_order(conn: &Connection, order_id: &str) -> Result<Option<Payment>> {
    query_one(
        conn,
        &format!("SELECT {} FROM payments WHERE order_id = ?1", PAYMENT_COLS),
        &[&order_id],
    )
}

pub fn record_slip_upload(conn: &Connection, order_id: &str, slip_url: &str) -> Result<()> {
    conn.execute(
        "UPDATE payments SET slip_url = ?1, slip_uploaded_at = ?2 WHERE order_id = ?3",
        params![slip_url, now(), order_id],
    )?;
    Ok(())
}

pub fn record_slip_verification(
    conn: &Connection,
    order_id: &str,
    verified: bool,
    reference: Option<&str>,
    message: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE payments SET slip_verified = ?1, slip_verify_ref = ?2, slip_verify_message = ?3
         WHERE order_id = ?4",
        params![verified, reference, message, order_id],
    )?;
    Ok(())
}

pub fn record_refund_slip(
    conn: &Connection,
    order_id: &str,
    refund_slip_url: &str,
    note: Option<&str>,
) -> Result<()> {
    UpdateBuilder::new("payments", order_id)
        .with_key_column("order_id")
        .set("refund_slip_url", refund_slip_url.to_string())
        .set_nullable("refund_note", note.map(String::from))
        .execute(conn)?;
    Ok(())
}

// ============ Fulfillments ============

pub fn insert_fulfillment(
    conn: &Connection,
    order_id: &str,
    fulfillment_type: FulfillmentType,
    content: &FulfillmentContent,
    access_token: Option<&str>,
    max_downloads: i32,
) -> Result<()> {
    let content_json = serde_json::to_string(content)
        .map_err(|e| AppError::Internal(format!("serialize fulfillment content: {e}")))?;
    conn.execute(
        "INSERT INTO fulfillments (order_id, fulfillment_type, content, access_token,
                                   download_count, max_downloads)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![
            order_id,
            fulfillment_type.as_ref(),
            content_json,
            access_token,
            max_downloads
        ],
    )?;
    Ok(())
}

pub fn get_fulfillment_by_order(conn: &Connection, order_id: &str) -> Result<Option<Fulfillment>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM fulfillments WHERE order_id = ?1",
            FULFILLMENT_COLS
        ),
        &[&order_id],
    )
}

pub fn get_fulfillment_by_token(conn: &Connection, token: &str) -> Result<Option<Fulfillment>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM fulfillments WHERE access_token = ?1",
            FULFILLMENT_COLS
        ),
        &[&token],
    )
}

pub fn set_fulfillment_content(
    conn: &Connection,
    order_id: &str,
    content: &FulfillmentContent,
) -> Result<bool> {
    let content_json = serde_json::to_string(content)
        .map_err(|e| AppError::Internal(format!("serialize fulfillment content: {e}")))?;
    let affected = conn.execute(
        "UPDATE fulfillments SET content = ?1 WHERE order_id = ?2",
        params![content_json, order_id],
    )?;
    Ok(affected > 0)
}

/// Charge one download against the token's budget. The limit check lives in
/// the UPDATE so concurrent downloads cannot exceed max_downloads.
pub fn charge_download(conn: &Connection, token: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE fulfillments SET download_count = download_count + 1
         WHERE access_token = ?1 AND download_count < max_downloads",
        params![token],
    )?;
    Ok(affected > 0)
}

// ============ Coupons ============

pub fn create_coupon(conn: &Connection, creator_id: &str, input: &CreateCoupon) -> Result<Coupon> {
    let id = gen_id();
    let now = now();
    let code = input.code.trim().to_uppercase();

    let inserted = conn.execute(
        "INSERT INTO coupons (id, creator_id, code, discount_type, discount_value, min_purchase,
                              max_discount, usage_limit, per_user_limit, usage_count,
                              valid_from, valid_until, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11, 1, ?12)",
        params![
            &id,
            creator_id,
            &code,
            input.discount_type.as_ref(),
            input.discount_value,
            input.min_purchase,
            input.max_discount,
            input.usage_limit,
            input.per_user_limit,
            input.valid_from,
            input.valid_until,
            now
        ],
    );

    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict("Coupon code already exists".into()));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Coupon {
        id,
        creator_id: creator_id.to_string(),
        code,
        discount_type: input.discount_type,
        discount_value: input.discount_value,
        min_purchase: input.min_purchase,
        max_discount: input.max_discount,
        usage_limit: input.usage_limit,
        per_user_limit: input.per_user_limit,
        usage_count: 0,
        valid_from: input.valid_from,
        valid_until: input.valid_until,
        is_active: true,
        created_at: now,
    })
}

pub fn get_coupon_by_id(conn: &Connection, id: &str) -> Result<Option<Coupon>> {
    query_one(
        conn,
        &format!("SELECT {} FROM coupons WHERE id = ?1", COUPON_COLS),
        &[&id],
    )
}

pub fn get_coupon_by_code(
    conn: &Connection,
    creator_id: &str,
    code: &str,
) -> Result<Option<Coupon>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM coupons WHERE creator_id = ?1 AND code = ?2",
            COUPON_COLS
        ),
        params![creator_id, code.trim().to_uppercase()],
    )
}

pub fn list_coupons_for_creator(conn: &Connection, creator_id: &str) -> Result<Vec<Coupon>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM coupons WHERE creator_id = ?1 ORDER BY created_at DESC",
            COUPON_COLS
        ),
        &[&creator_id],
    )
}

pub fn update_coupon(conn: &Connection, id: &str, input: &UpdateCoupon) -> Result<bool> {
    UpdateBuilder::new("coupons", id)
        .set_opt("discount_value", input.discount_value)
        .set_opt("min_purchase", input.min_purchase)
        .set_opt_nullable_i64("max_discount", input.max_discount)
        .set_opt_nullable_i32("usage_limit", input.usage_limit)
        .set_opt_nullable_i32("per_user_limit", input.per_user_limit)
        .set_opt_nullable_i64("valid_from", input.valid_from)
        .set_opt_nullable_i64("valid_until", input.valid_until)
        .set_opt("is_active", input.is_active)
        .execute(conn)
}

/// Delete a coupon. Refused once orders reference it; deactivate instead.
pub fn delete_coupon(conn: &Connection, id: &str) -> Result<bool> {
    let used: i64 = conn.query_row(
        "SELECT COUNT(*) FROM orders WHERE coupon_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if used > 0 {
        return Err(AppError::Conflict(
            "Coupon has been used on orders; deactivate it instead".into(),
        ));
    }
    let deleted = conn.execute("DELETE FROM coupons WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Take one use of the coupon, guarded by usage_limit in the same statement.
/// Returns false when the limit is already exhausted.
pub fn take_coupon_use(conn: &Connection, coupon_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE coupons SET usage_count = usage_count + 1
         WHERE id = ?1 AND (usage_limit IS NULL OR usage_count < usage_limit)",
        params![coupon_id],
    )?;
    Ok(affected > 0)
}

/// How many orders this buyer has already placed with the coupon. Cancelled
/// orders still count: usage is never refunded.
pub fn count_coupon_uses_by_email(
    conn: &Connection,
    coupon_id: &str,
    buyer_email: &str,
) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM orders WHERE coupon_id = ?1 AND buyer_email = ?2",
        params![coupon_id, buyer_email],
        |row| row.get(0),
    )?;
    Ok(count)
}
