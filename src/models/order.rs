use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    PendingConfirmation,
    Confirmed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// The single source of truth for transition legality. Handlers and the
    /// lifecycle module never re-derive this from status strings.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (PendingPayment, PendingConfirmation)
                | (PendingPayment, Confirmed)
                | (PendingConfirmation, Confirmed)
                | (PendingPayment, Cancelled)
                | (PendingConfirmation, Cancelled)
                | (Confirmed, Cancelled)
                | (PendingConfirmation, Refunded)
                | (Confirmed, Refunded)
                | (Cancelled, Refunded)
        )
    }

    /// All statuses from which `to` may legally be entered, derived from the
    /// table above. Status moves pass this straight to the compare-and-set,
    /// so call sites never write their own source lists.
    pub fn legal_sources(to: OrderStatus) -> Vec<OrderStatus> {
        OrderStatus::iter().filter(|s| s.can_transition_to(to)).collect()
    }

    /// Statuses from which a buyer or creator may still cancel.
    pub fn is_cancellable(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }

    /// A paid reservation exists and may still be moved to another slot.
    pub fn is_reschedulable(&self) -> bool {
        matches!(self, OrderStatus::PendingConfirmation | OrderStatus::Confirmed)
    }

    /// Rejection is a creator-side cancel restricted to orders sitting in
    /// slip review. Always a subset of `legal_sources(Cancelled)`.
    pub fn rejectable_sources() -> Vec<OrderStatus> {
        Self::legal_sources(OrderStatus::Cancelled)
            .into_iter()
            .filter(|s| matches!(s, OrderStatus::PendingConfirmation))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub product_id: String,
    pub creator_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
    pub buyer_note: Option<String>,
    /// PromptPay destination for refunds, captured at checkout.
    pub refund_promptpay: Option<String>,
    pub slot_id: Option<String>,
    /// Copy-on-create snapshot of the reserved slot. Never joined live, so
    /// the order stays accurate if the creator later edits the slot.
    pub booking_date: Option<NaiveDate>,
    pub booking_time: Option<NaiveTime>,
    pub status: OrderStatus,
    pub cancel_reason: Option<String>,
    pub reschedule_count: i32,
    pub coupon_id: Option<String>,
    /// Latch: set once the coupon's usage_count has been charged for this
    /// order, so a retried confirmation never double-counts.
    pub coupon_counted: bool,
    pub discount_amount: i64,
    pub total: i64,
    /// Latch: set once this order's seat has been given back, so a refund
    /// after a cancel never double-releases.
    pub slot_released: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// True while the order still accounts for a seat on its slot.
    pub fn holds_seat(&self) -> bool {
        self.slot_id.is_some() && !self.slot_released
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOrder {
    pub product_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    #[serde(default)]
    pub buyer_phone: Option<String>,
    #[serde(default)]
    pub buyer_note: Option<String>,
    #[serde(default)]
    pub refund_promptpay: Option<String>,
    /// Required for booking/live products.
    #[serde(default)]
    pub slot_id: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}
