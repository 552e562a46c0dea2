pub mod from_row;
pub mod queries;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::error::Result;
use crate::notify::Notifier;
use crate::payments::Slip2GoClient;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub base_url: String,
    /// None when no verification oracle is configured; slip uploads then
    /// always park the order for manual review.
    pub verifier: Option<Slip2GoClient>,
    pub notifier: Notifier,
}

/// Open a pooled connection manager against the given database path and
/// apply pragmas suited to many short write transactions.
pub fn create_pool(database_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
    });
    Ok(Pool::new(manager)?)
}

/// Create all tables and indexes. Idempotent; run at boot.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS creators (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    store_name    TEXT NOT NULL,
    promptpay_id  TEXT,
    is_published  INTEGER NOT NULL DEFAULT 0,
    api_key_hash  TEXT NOT NULL UNIQUE,
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id                        TEXT PRIMARY KEY,
    creator_id                TEXT NOT NULL REFERENCES creators(id),
    name                      TEXT NOT NULL,
    description               TEXT,
    product_type              TEXT NOT NULL,
    price                     INTEGER NOT NULL,
    is_published              INTEGER NOT NULL DEFAULT 0,
    duration_minutes          INTEGER,
    minimum_advance_hours     INTEGER NOT NULL DEFAULT 0,
    buffer_minutes            INTEGER NOT NULL DEFAULT 0,
    max_bookings_per_customer INTEGER,
    delivery                  TEXT,
    external_url              TEXT,
    created_at                INTEGER NOT NULL,
    updated_at                INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_products_creator ON products(creator_id);

CREATE TABLE IF NOT EXISTS booking_slots (
    id               TEXT PRIMARY KEY,
    product_id       TEXT NOT NULL REFERENCES products(id),
    creator_id       TEXT NOT NULL REFERENCES creators(id),
    slot_date        TEXT NOT NULL,
    start_time       TEXT NOT NULL,
    end_time         TEXT NOT NULL,
    max_bookings     INTEGER NOT NULL DEFAULT 1,
    current_bookings INTEGER NOT NULL DEFAULT 0,
    is_available     INTEGER NOT NULL DEFAULT 1,
    is_booked        INTEGER NOT NULL DEFAULT 0,
    created_at       INTEGER NOT NULL,
    UNIQUE (product_id, slot_date, start_time)
);
CREATE INDEX IF NOT EXISTS idx_slots_product_date ON booking_slots(product_id, slot_date);

CREATE TABLE IF NOT EXISTS orders (
    id               TEXT PRIMARY KEY,
    product_id       TEXT NOT NULL REFERENCES products(id),
    creator_id       TEXT NOT NULL REFERENCES creators(id),
    buyer_name       TEXT NOT NULL,
    buyer_email      TEXT NOT NULL,
    buyer_phone      TEXT,
    buyer_note       TEXT,
    refund_promptpay TEXT,
    slot_id          TEXT REFERENCES booking_slots(id) ON DELETE SET NULL,
    booking_date     TEXT,
    booking_time     TEXT,
    status           TEXT NOT NULL,
    cancel_reason    TEXT,
    reschedule_count INTEGER NOT NULL DEFAULT 0,
    coupon_id        TEXT REFERENCES coupons(id),
    coupon_counted   INTEGER NOT NULL DEFAULT 0,
    discount_amount  INTEGER NOT NULL DEFAULT 0,
    total            INTEGER NOT NULL,
    slot_released    INTEGER NOT NULL DEFAULT 0,
    created_at       INTEGER NOT NULL,
    updated_at       INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_orders_creator ON orders(creator_id);
CREATE INDEX IF NOT EXISTS idx_orders_coupon_email ON orders(coupon_id, buyer_email);

CREATE TABLE IF NOT EXISTS payments (
    order_id            TEXT PRIMARY KEY REFERENCES orders(id),
    slip_url            TEXT,
    slip_uploaded_at    INTEGER,
    slip_verified       INTEGER,
    slip_verify_ref     TEXT,
    slip_verify_message TEXT,
    refund_slip_url     TEXT,
    refund_note         TEXT
);

CREATE TABLE IF NOT EXISTS fulfillments (
    order_id         TEXT PRIMARY KEY REFERENCES orders(id),
    fulfillment_type TEXT NOT NULL,
    content          TEXT NOT NULL,
    access_token     TEXT UNIQUE,
    download_count   INTEGER NOT NULL DEFAULT 0,
    max_downloads    INTEGER NOT NULL DEFAULT 5
);

CREATE TABLE IF NOT EXISTS coupons (
    id             TEXT PRIMARY KEY,
    creator_id     TEXT NOT NULL REFERENCES creators(id),
    code           TEXT NOT NULL,
    discount_type  TEXT NOT NULL,
    discount_value INTEGER NOT NULL,
    min_purchase   INTEGER NOT NULL DEFAULT 0,
    max_discount   INTEGER,
    usage_limit    INTEGER,
    per_user_limit INTEGER,
    usage_count    INTEGER NOT NULL DEFAULT 0,
    valid_from     INTEGER,
    valid_until    INTEGER,
    is_active      INTEGER NOT NULL DEFAULT 1,
    created_at     INTEGER NOT NULL,
    UNIQUE (creator_id, code)
);
";
