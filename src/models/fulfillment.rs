use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FulfillmentType {
    Download,
    BookingDetails,
    LiveAccess,
}

/// What the buyer actually receives after confirmation. A tagged sum type so
/// every reader matches exhaustively instead of probing optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FulfillmentContent {
    /// Creator has not filled in meeting/access details yet. Booking and
    /// live orders start here and cannot be manually confirmed until the
    /// content is real.
    Pending,
    DownloadFile { file_url: String },
    DownloadRedirect { redirect_url: String },
    MeetingOnline { meeting_url: String },
    MeetingOffline { location: String },
    LiveAccess {
        access_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_code: Option<String>,
    },
}

impl FulfillmentContent {
    /// Whether this content is deliverable, i.e. manual confirmation of a
    /// booking/live order may proceed.
    pub fn is_ready(&self) -> bool {
        !matches!(self, FulfillmentContent::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fulfillment {
    pub order_id: String,
    pub fulfillment_type: FulfillmentType,
    pub content: FulfillmentContent,
    /// Download fulfillments only; the public download endpoint keys on it.
    pub access_token: Option<String>,
    pub download_count: i32,
    pub max_downloads: i32,
}

#[derive(Debug, Deserialize)]
pub struct SetFulfillmentContent {
    pub content: FulfillmentContent,
}
