use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    pub creator_id: String,
    /// Unique per creator, matched case-insensitively at checkout.
    pub code: String,
    pub discount_type: DiscountType,
    /// Percent (0-100) for percentage coupons, satang for fixed coupons.
    pub discount_value: i64,
    pub min_purchase: i64,
    /// Cap on the computed discount for percentage coupons, in satang.
    pub max_discount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    /// Never decremented, even when an order is later cancelled or refunded.
    pub usage_count: i32,
    pub valid_from: Option<i64>,
    pub valid_until: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    #[serde(default)]
    pub min_purchase: i64,
    #[serde(default)]
    pub max_discount: Option<i64>,
    #[serde(default)]
    pub usage_limit: Option<i32>,
    #[serde(default)]
    pub per_user_limit: Option<i32>,
    #[serde(default)]
    pub valid_from: Option<i64>,
    #[serde(default)]
    pub valid_until: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCoupon {
    pub discount_value: Option<i64>,
    pub min_purchase: Option<i64>,
    pub max_discount: Option<Option<i64>>,
    pub usage_limit: Option<Option<i32>>,
    pub per_user_limit: Option<Option<i32>>,
    pub valid_from: Option<Option<i64>>,
    pub valid_until: Option<Option<i64>>,
    pub is_active: Option<bool>,
}
