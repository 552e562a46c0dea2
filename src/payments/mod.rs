mod slip2go;

pub use slip2go::*;

use serde::{Deserialize, Serialize};

/// Verdict of the slip-verification oracle. Transport failures are folded
/// into `verified: false` with the error as message, so the caller never
/// advances an order optimistically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlipVerification {
    pub verified: bool,
    pub reference: Option<String>,
    pub message: Option<String>,
}

impl SlipVerification {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            reference: None,
            message: Some(message.into()),
        }
    }
}
