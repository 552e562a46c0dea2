use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    pub email: String,
    pub store_name: String,
    /// PromptPay identifier (phone number or national id) buyers transfer to.
    /// Checkout is refused for creators without one.
    pub promptpay_id: Option<String>,
    pub is_published: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Creator {
    /// A storefront can accept orders only when it is published and has a
    /// transfer destination configured.
    pub fn can_sell(&self) -> bool {
        self.is_published && self.promptpay_id.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCreator {
    pub email: String,
    pub store_name: String,
    #[serde(default)]
    pub promptpay_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCreator {
    pub store_name: Option<String>,
    pub promptpay_id: Option<Option<String>>,
    pub is_published: Option<bool>,
}
