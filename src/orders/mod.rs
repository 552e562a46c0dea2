pub mod coupon;
pub mod downloads;
pub mod lifecycle;
pub mod reschedule;

pub use coupon::*;
pub use downloads::*;
pub use lifecycle::*;
pub use reschedule::*;

use crate::error::AppError;

/// Expected business conditions in the order/booking flow. These are typed
/// outcomes, not exceptions: core functions return them and handlers map
/// them onto HTTP statuses exactly once, here.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Product not found")]
    ProductNotFound,
    #[error("This store is not accepting orders")]
    StoreNotAccepting,
    #[error("This product requires a booking slot")]
    SlotRequired,
    #[error("Slot not found")]
    SlotNotFound,
    #[error("Slot is no longer available")]
    SlotNotBookable,
    #[error("Slot is fully booked")]
    SlotFull,
    #[error("Booking limit for this product reached")]
    CustomerBookingLimit,
    #[error("Order not found")]
    OrderNotFound,
    #[error("Order is not in a state that allows this action")]
    InvalidTransition,
    #[error("No payment slip has been uploaded")]
    SlipMissing,
    #[error("Fulfillment details must be filled in before confirming")]
    FulfillmentNotReady,
    #[error("This order has already been rescheduled")]
    RescheduleLimitReached,
    #[error("New slot must differ from the current one")]
    SameSlot,
    #[error("Coupon not found")]
    CouponNotFound,
    #[error("Coupon is not active")]
    CouponInactive,
    #[error("Coupon is not valid yet")]
    CouponNotStarted,
    #[error("Coupon has expired")]
    CouponExpired,
    #[error("Order total is below the coupon minimum")]
    CouponMinPurchase,
    #[error("Coupon usage limit reached")]
    CouponUsageLimit,
    #[error("You have already used this coupon")]
    CouponPerUserLimit,
    #[error("Download link not found")]
    DownloadUnknownToken,
    #[error("Order is not confirmed")]
    DownloadNotConfirmed,
    #[error("Download limit reached")]
    DownloadLimitReached,
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        use OrderError::*;
        match err {
            App(e) => e,
            // Not-found style answers; also used to avoid leaking other
            // creators' resources.
            ProductNotFound | SlotNotFound | OrderNotFound | CouponNotFound
            | DownloadUnknownToken => AppError::NotFound(err.to_string()),
            SlotRequired | SameSlot => AppError::BadRequest(err.to_string()),
            other => AppError::Conflict(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for OrderError {
    fn from(err: rusqlite::Error) -> Self {
        OrderError::App(err.into())
    }
}
