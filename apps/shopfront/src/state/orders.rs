//! # Order History
//!
//! Read-only access to the signed-in shopper's orders. The identity comes
//! from the cart manager, so order history always follows the active scope.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use shopfront_api::{Identity, OrderGateway};
use shopfront_core::{Order, ValidationError};

use super::cart::CartManager;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct OrderHistory {
    cart: CartManager,
    orders: Arc<dyn OrderGateway>,
}

impl fmt::Debug for OrderHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderHistory").finish_non_exhaustive()
    }
}

impl OrderHistory {
    pub fn new(cart: CartManager, orders: Arc<dyn OrderGateway>) -> Self {
        OrderHistory { cart, orders }
    }

    /// One order by id.
    ///
    /// ## Errors
    /// - `Unauthenticated` in guest scope
    /// - `Api` with a 404 status for an unknown id
    pub async fn fetch_order(&self, order_id: &str) -> AppResult<Order> {
        debug!(order_id, "fetch_order");
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(ValidationError::required("order id").into());
        }
        let identity = self.identity()?;
        Ok(self.orders.fetch_order(&identity, order_id).await?)
    }

    /// The shopper's orders, newest first whatever order the store uses.
    pub async fn list_orders(&self) -> AppResult<Vec<Order>> {
        debug!("list_orders");
        let identity = self.identity()?;
        let mut orders = self.orders.list_orders(&identity).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    fn identity(&self) -> AppResult<Identity> {
        self.cart.identity().ok_or(AppError::Unauthenticated)
    }
}
