//! # Order Commands
//!
//! Order history for the signed-in shopper.

use tracing::debug;

use shopfront_core::Order;

use crate::error::ErrorPayload;
use crate::state::OrderHistory;

/// Gets one order by id.
pub async fn get_order(history: &OrderHistory, order_id: &str) -> Result<Order, ErrorPayload> {
    debug!(order_id, "get_order command");
    Ok(history.fetch_order(order_id).await?)
}

/// Lists the shopper's orders, newest first.
pub async fn list_orders(history: &OrderHistory) -> Result<Vec<Order>, ErrorPayload> {
    debug!("list_orders command");
    Ok(history.list_orders().await?)
}
