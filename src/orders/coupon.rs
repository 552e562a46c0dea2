//! Coupon validation and discount arithmetic for checkout.

use crate::models::{Coupon, DiscountType};

use super::OrderError;

/// Discount in satang for an order of `order_total`. Percentage discounts
/// are capped at `max_discount` when set; fixed discounts never exceed the
/// order total.
pub fn compute_discount(coupon: &Coupon, order_total: i64) -> i64 {
    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let pct = coupon.discount_value.clamp(0, 100);
            let discount = order_total * pct / 100;
            match coupon.max_discount {
                Some(cap) => discount.min(cap),
                None => discount,
            }
        }
        DiscountType::Fixed => coupon.discount_value.min(order_total),
    };
    raw.clamp(0, order_total)
}

/// Checkout-time validation. `prior_uses` is how many orders this buyer's
/// email has already placed with the coupon. The usage_limit check here is
/// advisory; the authoritative take happens via the guarded
/// `queries::take_coupon_use` increment.
pub fn validate_for_checkout(
    coupon: &Coupon,
    order_total: i64,
    prior_uses: i64,
    now: i64,
) -> Result<(), OrderError> {
    if !coupon.is_active {
        return Err(OrderError::CouponInactive);
    }
    if let Some(from) = coupon.valid_from {
        if now < from {
            return Err(OrderError::CouponNotStarted);
        }
    }
    if let Some(until) = coupon.valid_until {
        if now > until {
            return Err(OrderError::CouponExpired);
        }
    }
    if order_total < coupon.min_purchase {
        return Err(OrderError::CouponMinPurchase);
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.usage_count >= limit {
            return Err(OrderError::CouponUsageLimit);
        }
    }
    if let Some(limit) = coupon.per_user_limit {
        if prior_uses >= limit as i64 {
            return Err(OrderError::CouponPerUserLimit);
        }
    }
    Ok(())
}
