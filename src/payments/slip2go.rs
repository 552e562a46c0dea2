//! Client for the slip2go verification service: given a PromptPay transfer
//! slip image URL and the expected amount, the service answers whether the
//! transfer is genuine. The core treats it as an oracle.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::SlipVerification;

#[derive(Debug, Serialize)]
struct VerifySlipRequest<'a> {
    image_url: &'a str,
    /// Expected amount in satang.
    amount: i64,
    /// Receiving PromptPay id the transfer must have gone to.
    promptpay_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifySlipResponse {
    verified: bool,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct Slip2GoClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl Slip2GoClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Verify a slip. Never returns Err for oracle trouble: timeouts, HTTP
    /// errors and malformed bodies all come back as a non-verified verdict
    /// carrying the failure message, leaving the order for manual review.
    pub async fn verify_slip(
        &self,
        slip_url: &str,
        amount: i64,
        promptpay_id: &str,
    ) -> SlipVerification {
        let request = VerifySlipRequest {
            image_url: slip_url,
            amount,
            promptpay_id,
        };

        let response = match self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "slip verification request failed");
                return SlipVerification::failure(format!("verification service error: {e}"));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "slip verification service returned error");
            return SlipVerification::failure(format!("verification service error: {status}"));
        }

        match response.json::<VerifySlipResponse>().await {
            Ok(body) => SlipVerification {
                verified: body.verified,
                reference: body.reference,
                message: body.message,
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to parse slip verification response");
                SlipVerification::failure("verification service response error")
            }
        }
    }
}
