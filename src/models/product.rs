use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::FulfillmentContent;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProductType {
    Digital,
    Booking,
    Live,
    Link,
}

impl ProductType {
    /// Types that sell time: they require a slot at checkout and hold
    /// seat capacity while the order is pending.
    pub fn is_bookable(&self) -> bool {
        matches!(self, ProductType::Booking | ProductType::Live)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub creator_id: String,
    pub name: String,
    pub description: Option<String>,
    pub product_type: ProductType,
    /// Price in satang (1 THB = 100 satang).
    pub price: i64,
    pub is_published: bool,
    // Scheduling config (booking/live only)
    pub duration_minutes: Option<i32>,
    pub minimum_advance_hours: i32,
    pub buffer_minutes: i32,
    pub max_bookings_per_customer: Option<i32>,
    /// Default fulfillment content stamped onto new orders: file/redirect for
    /// digital, meeting details for booking, access link for live. Orders of
    /// booking/live products fall back to `Pending` when unset.
    pub delivery: Option<FulfillmentContent>,
    // Link products redirect here
    pub external_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub product_type: ProductType,
    pub price: i64,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub minimum_advance_hours: i32,
    #[serde(default)]
    pub buffer_minutes: i32,
    #[serde(default)]
    pub max_bookings_per_customer: Option<i32>,
    #[serde(default)]
    pub delivery: Option<FulfillmentContent>,
    #[serde(default)]
    pub external_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<i64>,
    pub is_published: Option<bool>,
    pub duration_minutes: Option<Option<i32>>,
    pub minimum_advance_hours: Option<i32>,
    pub buffer_minutes: Option<i32>,
    pub max_bookings_per_customer: Option<Option<i32>>,
    pub delivery: Option<Option<FulfillmentContent>>,
    pub external_url: Option<Option<String>>,
}
