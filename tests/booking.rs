//! Slot generation and capacity bookkeeping against a real database:
//! idempotent regeneration, admin guards, and the reserve/release bounds.

mod common;
use common::*;

use chrono::Datelike;

use sellio::db::queries;
use sellio::models::{CreateRecurringSlots, CreateSlotWindow};
use sellio::scheduling::{self, plan_recurring, plan_window};
use sellio::util::now_store;

#[test]
fn window_generation_is_idempotent() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "gen@example.com");
    let product = create_booking_product(&conn, &creator.id);

    let plan = plan_window(&CreateSlotWindow {
        slot_date: future_date(),
        start_time: time(9, 0),
        end_time: time(12, 0),
        duration_minutes: 60,
        max_bookings: 1,
    })
    .unwrap();
    assert_eq!(plan.len(), 3);

    let first = queries::insert_slots(&mut conn, &product.id, &creator.id, &plan).unwrap();
    assert_eq!(first.inserted, 3);
    assert_eq!(first.duplicates, 0);

    // Re-running the exact same plan inserts nothing and breaks nothing.
    let second = queries::insert_slots(&mut conn, &product.id, &creator.id, &plan).unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 3);

    let slots = queries::list_slots_for_product(&conn, &product.id).unwrap();
    assert_eq!(slots.len(), 3);
}

#[test]
fn regeneration_preserves_reservations_on_surviving_slots() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "regen@example.com");
    let product = create_booking_product(&conn, &creator.id);

    let slot = add_slot(&mut conn, &product, future_date(), time(10, 0), 2);
    assert!(queries::reserve_slot_seat(&conn, &slot.id).unwrap());

    // Overlapping regeneration: 09:00 is new, 10:00 already exists.
    let plan = plan_window(&CreateSlotWindow {
        slot_date: future_date(),
        start_time: time(9, 0),
        end_time: time(11, 0),
        duration_minutes: 60,
        max_bookings: 2,
    })
    .unwrap();
    let report = queries::insert_slots(&mut conn, &product.id, &creator.id, &plan).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.duplicates, 1);

    // The existing slot kept its reservation count.
    assert_eq!(slot_by_id(&conn, &slot.id).current_bookings, 1);
}

#[test]
fn recurring_slots_match_requested_weekdays() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "recurring@example.com");
    let product = create_booking_product(&conn, &creator.id);

    let today = now_store().date();
    let plan = plan_recurring(
        &CreateRecurringSlots {
            weekdays: vec![2, 4],
            start_time: time(13, 0),
            end_time: time(15, 0),
            duration_minutes: 60,
            weeks: 2,
            max_bookings: 1,
        },
        today,
    )
    .unwrap();
    // 2 weekdays x 2 weeks x 2 slots per day.
    assert_eq!(plan.len(), 8);

    let report = queries::insert_slots(&mut conn, &product.id, &creator.id, &plan).unwrap();
    assert_eq!(report.inserted, 8);

    for slot in queries::list_slots_for_product(&conn, &product.id).unwrap() {
        let weekday = slot.slot_date.weekday().number_from_monday();
        assert!(weekday == 2 || weekday == 4);
        assert!(slot.slot_date > today);
    }
}

#[test]
fn capacity_cannot_drop_below_reservations() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "capacity@example.com");
    let product = create_booking_product(&conn, &creator.id);
    let slot = add_slot(&mut conn, &product, future_date(), time(10, 0), 3);

    assert!(queries::reserve_slot_seat(&conn, &slot.id).unwrap());
    assert!(queries::reserve_slot_seat(&conn, &slot.id).unwrap());

    assert!(!queries::set_slot_capacity(&conn, &slot.id, 1).unwrap());
    assert_eq!(slot_by_id(&conn, &slot.id).max_bookings, 3);

    assert!(queries::set_slot_capacity(&conn, &slot.id, 2).unwrap());
    assert_eq!(slot_by_id(&conn, &slot.id).max_bookings, 2);
}

#[test]
fn delete_refused_while_reserved() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "delete@example.com");
    let product = create_booking_product(&conn, &creator.id);
    let slot = add_slot(&mut conn, &product, future_date(), time(10, 0), 1);

    assert!(queries::reserve_slot_seat(&conn, &slot.id).unwrap());
    assert!(!queries::delete_slot(&conn, &slot.id).unwrap());

    assert!(queries::release_slot_seat(&conn, &slot.id).unwrap());
    assert!(queries::delete_slot(&conn, &slot.id).unwrap());
}

#[test]
fn reserve_and_release_stay_inside_bounds() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "bounds@example.com");
    let product = create_booking_product(&conn, &creator.id);
    let slot = add_slot(&mut conn, &product, future_date(), time(10, 0), 2);

    assert!(queries::reserve_slot_seat(&conn, &slot.id).unwrap());
    assert!(queries::reserve_slot_seat(&conn, &slot.id).unwrap());
    // Full: the conditional update refuses a third seat.
    assert!(!queries::reserve_slot_seat(&conn, &slot.id).unwrap());
    assert_eq!(slot_by_id(&conn, &slot.id).current_bookings, 2);

    assert!(queries::release_slot_seat(&conn, &slot.id).unwrap());
    assert!(queries::release_slot_seat(&conn, &slot.id).unwrap());
    // Empty: the clamp refuses to go negative.
    assert!(!queries::release_slot_seat(&conn, &slot.id).unwrap());
    let slot = slot_by_id(&conn, &slot.id);
    assert_eq!(slot.current_bookings, 0);
    assert!(!slot.is_booked);
}

#[test]
fn hidden_slots_are_withheld_from_buyers() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "hidden@example.com");
    let product = create_booking_product(&conn, &creator.id);
    let slot = add_slot(&mut conn, &product, future_date(), time(10, 0), 1);

    assert!(scheduling::offerability(&slot, &product, now_store()).is_none());

    queries::set_slot_availability(&conn, &slot.id, false).unwrap();
    let hidden = slot_by_id(&conn, &slot.id);
    assert_eq!(
        scheduling::offerability(&hidden, &product, now_store()),
        Some(scheduling::Withheld::Hidden)
    );
}
