//! # Ports
//!
//! The two seams between the app and the remote store. The app holds them as
//! `Arc<dyn RemoteCart>` and `Arc<dyn OrderGateway>`; [`StoreApiClient`]
//! implements both, and tests substitute hand-written fakes.
//!
//! [`StoreApiClient`]: crate::client::StoreApiClient

use async_trait::async_trait;

use crate::auth::Identity;
use crate::error::ApiResult;
use shopfront_core::{CartItem, Order, OrderSubmission};

/// A signed-in shopper's server-side cart.
///
/// Every call is made on behalf of `identity`; the server keys the cart by
/// its user id.
#[async_trait]
pub trait RemoteCart: Send + Sync {
    /// Current lines, re-priced by the server.
    async fn fetch_cart(&self, identity: &Identity) -> ApiResult<Vec<CartItem>>;

    /// Adds a line. The server sums quantities for a product already present.
    async fn add_item(&self, identity: &Identity, item: &CartItem) -> ApiResult<()>;

    async fn update_quantity(
        &self,
        identity: &Identity,
        product_id: &str,
        quantity: i64,
    ) -> ApiResult<()>;

    /// Removes one line. The store has no whole-cart delete; clearing is
    /// one call per line.
    async fn remove_item(&self, identity: &Identity, product_id: &str) -> ApiResult<()>;
}

/// What the order service hands back for an accepted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: String,
    pub message: Option<String>,
}

/// Order creation and retrieval.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submits an order. `identity` is `None` for guest checkout.
    async fn create_order(
        &self,
        identity: Option<&Identity>,
        order: &OrderSubmission,
    ) -> ApiResult<OrderReceipt>;

    async fn fetch_order(&self, identity: &Identity, order_id: &str) -> ApiResult<Order>;

    /// The user's orders, in the order the store returns them.
    async fn list_orders(&self, identity: &Identity) -> ApiResult<Vec<Order>>;
}
