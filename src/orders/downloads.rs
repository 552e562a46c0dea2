//! Token-gated download access for digital orders.

use rusqlite::Connection;

use crate::db::queries;
use crate::models::{FulfillmentContent, OrderStatus};

use super::OrderError;

/// A granted download: the deliverable plus how many accesses remain.
#[derive(Debug)]
pub struct DownloadGrant {
    pub content: FulfillmentContent,
    pub remaining: i32,
}

/// Resolve a download token and charge one access against its budget.
///
/// Unknown token, unconfirmed order, and exhausted budget are three distinct
/// outcomes; the charge itself is an atomic guarded increment so concurrent
/// requests cannot exceed `max_downloads`.
pub fn grant_download(conn: &Connection, token: &str) -> Result<DownloadGrant, OrderError> {
    let fulfillment = queries::get_fulfillment_by_token(conn, token)?
        .ok_or(OrderError::DownloadUnknownToken)?;
    let order = queries::get_order_by_id(conn, &fulfillment.order_id)?
        .ok_or(OrderError::DownloadUnknownToken)?;

    if order.status != OrderStatus::Confirmed {
        return Err(OrderError::DownloadNotConfirmed);
    }
    if !fulfillment.content.is_ready() {
        return Err(OrderError::FulfillmentNotReady);
    }
    if !queries::charge_download(conn, token)? {
        return Err(OrderError::DownloadLimitReached);
    }

    let remaining = (fulfillment.max_downloads - fulfillment.download_count - 1).max(0);
    tracing::debug!(order_id = %order.id, remaining, "download granted");
    Ok(DownloadGrant {
        content: fulfillment.content,
        remaining,
    })
}
