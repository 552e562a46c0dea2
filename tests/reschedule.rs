//! Reschedule coordination: the atomic seat swap, the lifetime cap, and the
//! options listing.

mod common;
use common::*;

use sellio::orders::{self, OrderError};

#[test]
fn reschedule_swaps_the_seat_atomically() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "swap@example.com");
    let product = create_booking_product(&conn, &creator.id);
    let source = add_slot(&mut conn, &product, future_date(), time(10, 0), 1);
    let target = add_slot(&mut conn, &product, future_date(), time(14, 0), 1);

    let order = place_order(&mut conn, &product, Some(&source.id), "buyer@example.com");
    orders::attach_slip(&mut conn, &order.id, "https://cdn.example.com/slip.jpg").unwrap();

    let order = orders::reschedule_order(&mut conn, &order.id, &target.id).unwrap();
    assert_eq!(order.slot_id.as_deref(), Some(target.id.as_str()));
    assert_eq!(order.booking_date, Some(target.slot_date));
    assert_eq!(order.booking_time, Some(target.start_time));
    assert_eq!(order.reschedule_count, 1);

    assert_eq!(slot_by_id(&conn, &source.id).current_bookings, 0);
    assert_eq!(slot_by_id(&conn, &target.id).current_bookings, 1);
}

#[test]
fn one_reschedule_per_order() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "cap1@example.com");
    let product = create_booking_product(&conn, &creator.id);
    let a = add_slot(&mut conn, &product, future_date(), time(10, 0), 1);
    let b = add_slot(&mut conn, &product, future_date(), time(11, 0), 1);
    let c = add_slot(&mut conn, &product, future_date(), time(12, 0), 1);

    let order = place_order(&mut conn, &product, Some(&a.id), "buyer@example.com");
    orders::attach_slip(&mut conn, &order.id, "https://cdn.example.com/slip.jpg").unwrap();
    orders::reschedule_order(&mut conn, &order.id, &b.id).unwrap();

    let again = orders::reschedule_order(&mut conn, &order.id, &c.id);
    assert!(matches!(again, Err(OrderError::RescheduleLimitReached)));

    // The order still sits on its first reschedule target.
    let order = order_by_id(&conn, &order.id);
    assert_eq!(order.slot_id.as_deref(), Some(b.id.as_str()));
    assert_eq!(slot_by_id(&conn, &b.id).current_bookings, 1);
    assert_eq!(slot_by_id(&conn, &c.id).current_bookings, 0);
}

#[test]
fn full_target_rolls_everything_back() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "rollback@example.com");
    let product = create_booking_product(&conn, &creator.id);
    let source = add_slot(&mut conn, &product, future_date(), time(10, 0), 1);
    let target = add_slot(&mut conn, &product, future_date(), time(14, 0), 1);

    let order = place_order(&mut conn, &product, Some(&source.id), "buyer@example.com");
    orders::attach_slip(&mut conn, &order.id, "https://cdn.example.com/slip.jpg").unwrap();
    // Someone else takes the target's only seat.
    place_order(&mut conn, &product, Some(&target.id), "rival@example.com");

    let result = orders::reschedule_order(&mut conn, &order.id, &target.id);
    assert!(matches!(result, Err(OrderError::SlotFull)));

    // Nothing moved: the source seat is still held, the count unchanged.
    let order = order_by_id(&conn, &order.id);
    assert_eq!(order.slot_id.as_deref(), Some(source.id.as_str()));
    assert_eq!(order.reschedule_count, 0);
    assert_eq!(slot_by_id(&conn, &source.id).current_bookings, 1);
    assert_eq!(slot_by_id(&conn, &target.id).current_bookings, 1);
}

#[test]
fn same_slot_is_rejected() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "same@example.com");
    let product = create_booking_product(&conn, &creator.id);
    let slot = add_slot(&mut conn, &product, future_date(), time(10, 0), 2);

    let order = place_order(&mut conn, &product, Some(&slot.id), "buyer@example.com");
    orders::attach_slip(&mut conn, &order.id, "https://cdn.example.com/slip.jpg").unwrap();

    let result = orders::reschedule_order(&mut conn, &order.id, &slot.id);
    assert!(matches!(result, Err(OrderError::SameSlot)));
    assert_eq!(slot_by_id(&conn, &slot.id).current_bookings, 1);
}

#[test]
fn pending_payment_orders_cannot_reschedule() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "tooearly@example.com");
    let product = create_booking_product(&conn, &creator.id);
    let a = add_slot(&mut conn, &product, future_date(), time(10, 0), 1);
    let b = add_slot(&mut conn, &product, future_date(), time(11, 0), 1);

    let order = place_order(&mut conn, &product, Some(&a.id), "buyer@example.com");
    let result = orders::reschedule_order(&mut conn, &order.id, &b.id);
    assert!(matches!(result, Err(OrderError::InvalidTransition)));
}

#[test]
fn options_exclude_current_and_full_slots() {
    let app = test_app();
    let mut conn = app.db().get().unwrap();
    let (creator, _) = create_test_creator(&conn, "options@example.com");
    let product = create_booking_product(&conn, &creator.id);
    let current = add_slot(&mut conn, &product, future_date(), time(10, 0), 1);
    let open = add_slot(&mut conn, &product, future_date(), time(11, 0), 1);
    let full = add_slot(&mut conn, &product, future_date(), time(12, 0), 1);

    let order = place_order(&mut conn, &product, Some(&current.id), "buyer@example.com");
    place_order(&mut conn, &product, Some(&full.id), "rival@example.com");

    let order = order_by_id(&conn, &order.id);
    let options = orders::reschedule_options(&conn, &order).unwrap();
    let ids: Vec<&str> = options
        .iter()
        .flat_map(|(_, slots)| slots.iter().map(|s| s.id.as_str()))
        .collect();
    assert_eq!(ids, vec![open.id.as_str()]);
}
