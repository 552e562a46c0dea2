use serde::{Deserialize, Serialize};

/// Payment evidence, 1:1 with an order. Created empty at checkout and
/// mutated by slip upload, automated verification, and refund bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub order_id: String,
    pub slip_url: Option<String>,
    pub slip_uploaded_at: Option<i64>,
    /// None = not yet verified, Some(true) = oracle accepted,
    /// Some(false) = oracle rejected or errored (human review needed).
    pub slip_verified: Option<bool>,
    pub slip_verify_ref: Option<String>,
    pub slip_verify_message: Option<String>,
    pub refund_slip_url: Option<String>,
    pub refund_note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadSlip {
    /// Durable URL returned by the storage service; the core never handles
    /// the image bytes itself.
    pub slip_url: String,
}

#[derive(Debug, Deserialize)]
pub struct RefundOrder {
    pub refund_slip_url: String,
    #[serde(default)]
    pub note: Option<String>,
}
