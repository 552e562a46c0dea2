//! Shared test fixtures: a file-backed database (pooled connections must all
//! see the same data) and factories for the entities most tests need.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use tempfile::TempDir;

use sellio::db::{self, AppState, DbPool, queries};
use sellio::models::{
    BookingSlot, CreateCoupon, CreateCreator, CreateOrder, CreateProduct, CreateSlot, Creator,
    DiscountType, Order, Product, ProductType, UpdateCreator, UpdateProduct,
};
use sellio::notify::Notifier;
use sellio::scheduling::plan_single;
use sellio::util::{generate_token, hash_api_key, now_store};

/// Keeps the TempDir alive for as long as the state is in use.
pub struct TestApp {
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub fn db(&self) -> &DbPool {
        &self.state.db
    }
}

pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("sellio-test.db");
    let pool = db::create_pool(path.to_str().unwrap()).expect("create pool");
    {
        let conn = pool.get().unwrap();
        db::init_schema(&conn).expect("init schema");
    }
    TestApp {
        state: AppState {
            db: pool,
            base_url: "http://localhost:3000".to_string(),
            verifier: None,
            notifier: Notifier::disabled(),
        },
        _dir: dir,
    }
}

/// A published creator ready to sell. Returns the plaintext API key too for
/// handler tests that go through the auth middleware.
pub fn create_test_creator(conn: &rusqlite::Connection, email: &str) -> (Creator, String) {
    let api_key = generate_token();
    let creator = queries::create_creator(
        conn,
        &CreateCreator {
            email: email.to_string(),
            store_name: format!("{email} store"),
            promptpay_id: Some("0812345678".to_string()),
        },
        &hash_api_key(&api_key),
    )
    .unwrap();
    queries::update_creator(
        conn,
        &creator.id,
        &UpdateCreator {
            store_name: None,
            promptpay_id: None,
            is_published: Some(true),
        },
    )
    .unwrap();
    let creator = queries::get_creator_by_id(conn, &creator.id).unwrap().unwrap();
    (creator, api_key)
}

fn publish_product(conn: &rusqlite::Connection, id: &str) -> Product {
    queries::update_product(
        conn,
        id,
        &UpdateProduct {
            name: None,
            description: None,
            price: None,
            is_published: Some(true),
            duration_minutes: None,
            minimum_advance_hours: None,
            buffer_minutes: None,
            max_bookings_per_customer: None,
            delivery: None,
            external_url: None,
        },
    )
    .unwrap();
    queries::get_product_by_id(conn, id).unwrap().unwrap()
}

/// A published one-hour booking product with no advance-notice or buffer
/// requirements, priced at 1,500 THB.
pub fn create_booking_product(conn: &rusqlite::Connection, creator_id: &str) -> Product {
    let product = queries::create_product(
        conn,
        creator_id,
        &CreateProduct {
            name: "1:1 consultation".to_string(),
            description: None,
            product_type: ProductType::Booking,
            price: 150_000,
            duration_minutes: Some(60),
            minimum_advance_hours: 0,
            buffer_minutes: 0,
            max_bookings_per_customer: None,
            delivery: None,
            external_url: None,
        },
    )
    .unwrap();
    publish_product(conn, &product.id)
}

/// A published digital product, priced at 500 THB.
pub fn create_digital_product(conn: &rusqlite::Connection, creator_id: &str) -> Product {
    let product = queries::create_product(
        conn,
        creator_id,
        &CreateProduct {
            name: "Lightroom presets".to_string(),
            description: None,
            product_type: ProductType::Digital,
            price: 50_000,
            duration_minutes: None,
            minimum_advance_hours: 0,
            buffer_minutes: 0,
            max_bookings_per_customer: None,
            delivery: Some(sellio::models::FulfillmentContent::DownloadFile {
                file_url: "https://files.example.com/presets.zip".to_string(),
            }),
            external_url: None,
        },
    )
    .unwrap();
    publish_product(conn, &product.id)
}

/// A date far enough out that advance-notice windows never interfere.
pub fn future_date() -> NaiveDate {
    (now_store() + Duration::days(30)).date()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Insert one slot and return the stored row.
pub fn add_slot(
    conn: &mut rusqlite::Connection,
    product: &Product,
    date: NaiveDate,
    start: NaiveTime,
    max_bookings: i32,
) -> BookingSlot {
    let planned = plan_single(&CreateSlot {
        slot_date: date,
        start_time: start,
        duration_minutes: product.duration_minutes.unwrap_or(60),
        max_bookings,
    })
    .unwrap();
    let report = queries::insert_slots(conn, &product.id, &product.creator_id, &[planned]).unwrap();
    assert_eq!(report.inserted, 1, "slot insert failed: {:?}", report.failed);

    queries::list_slots_on_date(conn, &product.id, date)
        .unwrap()
        .into_iter()
        .find(|s| s.start_time == start)
        .expect("inserted slot present")
}

pub fn checkout_input(product: &Product, slot_id: Option<&str>, email: &str) -> CreateOrder {
    CreateOrder {
        product_id: product.id.clone(),
        buyer_name: "Anan T.".to_string(),
        buyer_email: email.to_string(),
        buyer_phone: None,
        buyer_note: None,
        refund_promptpay: None,
        slot_id: slot_id.map(String::from),
        coupon_code: None,
    }
}

/// Checkout an order for the given slot.
pub fn place_order(
    conn: &mut rusqlite::Connection,
    product: &Product,
    slot_id: Option<&str>,
    email: &str,
) -> Order {
    sellio::orders::create_order(conn, &checkout_input(product, slot_id, email)).unwrap()
}

/// A simple active percentage coupon.
pub fn create_percent_coupon(
    conn: &rusqlite::Connection,
    creator_id: &str,
    code: &str,
    percent: i64,
    usage_limit: Option<i32>,
) -> sellio::models::Coupon {
    queries::create_coupon(
        conn,
        creator_id,
        &CreateCoupon {
            code: code.to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: percent,
            min_purchase: 0,
            max_discount: None,
            usage_limit,
            per_user_limit: None,
            valid_from: None,
            valid_until: None,
        },
    )
    .unwrap()
}

pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

pub fn slot_by_id(conn: &rusqlite::Connection, id: &str) -> BookingSlot {
    queries::get_slot_by_id(conn, id).unwrap().unwrap()
}

pub fn order_by_id(conn: &rusqlite::Connection, id: &str) -> Order {
    queries::get_order_by_id(conn, id).unwrap().unwrap()
}
