//! In-process stand-ins for the remote store, shared by the state tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Notify;

use shopfront_api::{ApiError, ApiResult, Identity, OrderGateway, OrderReceipt, RemoteCart};
use shopfront_core::validation::{validate_shipping_form, ShippingForm};
use shopfront_core::{CartItem, Order, OrderStatus, OrderSubmission, Product, ShippingAddress};

use super::lock;

pub fn product(id: &str, price_cents: i64) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Product {}", id),
        price_cents,
        image_url: None,
        slug: Some(format!("product-{}", id)),
        sku: None,
    }
}

pub fn shipping_form() -> ShippingForm {
    ShippingForm {
        full_name: "Ada Lovelace".to_string(),
        address_line1: "12 St James's Square".to_string(),
        address_line2: String::new(),
        city: "London".to_string(),
        state_province: "Greater London".to_string(),
        postal_code: "SW1Y 4JH".to_string(),
        country: "UK".to_string(),
        phone: "+44 20 7946 0000".to_string(),
    }
}

pub fn shipping_address() -> ShippingAddress {
    match validate_shipping_form(&shipping_form()) {
        Ok(address) => address,
        Err(errors) => panic!("fixture form is invalid: {}", errors),
    }
}

fn unavailable() -> ApiError {
    ApiError::Remote {
        status: 503,
        message: "Store temporarily unavailable".to_string(),
    }
}

/// Pauses the next call until released.
///
/// `started` is signalled when the call arrives; the call returns once
/// `release` is signalled.
#[derive(Default)]
struct Hold {
    next: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl Hold {
    fn arm(&self) -> (Arc<Notify>, Arc<Notify>) {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *lock(&self.next) = Some((started.clone(), release.clone()));
        (started, release)
    }

    async fn wait(&self) {
        let armed = lock(&self.next).take();
        if let Some((started, release)) = armed {
            started.notify_one();
            release.notified().await;
        }
    }
}

// =============================================================================
// Remote Cart
// =============================================================================

/// Server-side carts keyed by user id. Adds sum quantities and keep the
/// stored line's name and price, like the real service.
#[derive(Default)]
pub struct FakeRemoteCart {
    carts: Mutex<HashMap<String, Vec<CartItem>>>,
    failing: AtomicBool,
    rejected: Mutex<HashSet<String>>,
    undeletable: Mutex<HashSet<String>>,
    removals: Mutex<Vec<String>>,
    hold: Hold,
}

impl FakeRemoteCart {
    pub fn seed(&self, user_id: &str, items: Vec<CartItem>) {
        lock(&self.carts).insert(user_id.to_string(), items);
    }

    pub fn cart_of(&self, user_id: &str) -> Vec<CartItem> {
        lock(&self.carts).get(user_id).cloned().unwrap_or_default()
    }

    /// Every call fails with a 503 while set.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Adds for this product fail with a 409.
    pub fn reject_product(&self, product_id: &str) {
        lock(&self.rejected).insert(product_id.to_string());
    }

    /// Removals of this product fail with a 409.
    pub fn reject_removal(&self, product_id: &str) {
        lock(&self.undeletable).insert(product_id.to_string());
    }

    /// Product ids of every `remove_item` call, in order.
    pub fn removals(&self) -> Vec<String> {
        lock(&self.removals).clone()
    }

    /// Blocks the next `fetch_cart`. Returns `(started, release)`.
    pub fn block_next_fetch(&self) -> (Arc<Notify>, Arc<Notify>) {
        self.hold.arm()
    }

    fn check(&self) -> ApiResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCart for FakeRemoteCart {
    async fn fetch_cart(&self, identity: &Identity) -> ApiResult<Vec<CartItem>> {
        self.hold.wait().await;
        self.check()?;
        Ok(self.cart_of(identity.user_id()))
    }

    async fn add_item(&self, identity: &Identity, item: &CartItem) -> ApiResult<()> {
        self.check()?;
        if lock(&self.rejected).contains(&item.product_id) {
            return Err(ApiError::Remote {
                status: 409,
                message: format!("{} is no longer available", item.name),
            });
        }

        let mut carts = lock(&self.carts);
        let lines = carts.entry(identity.user_id().to_string()).or_default();
        match lines.iter_mut().find(|l| l.product_id == item.product_id) {
            Some(line) => line.quantity += item.quantity,
            None => lines.push(item.clone()),
        }
        Ok(())
    }

    async fn update_quantity(
        &self,
        identity: &Identity,
        product_id: &str,
        quantity: i64,
    ) -> ApiResult<()> {
        self.check()?;
        let mut carts = lock(&self.carts);
        let line = carts
            .get_mut(identity.user_id())
            .and_then(|lines| lines.iter_mut().find(|l| l.product_id == product_id))
            .ok_or_else(|| ApiError::Remote {
                status: 404,
                message: "Item not found in cart".to_string(),
            })?;
        line.quantity = quantity;
        Ok(())
    }

    async fn remove_item(&self, identity: &Identity, product_id: &str) -> ApiResult<()> {
        self.check()?;
        lock(&self.removals).push(product_id.to_string());
        if lock(&self.undeletable).contains(product_id) {
            return Err(ApiError::Remote {
                status: 409,
                message: "Item is locked".to_string(),
            });
        }
        if let Some(lines) = lock(&self.carts).get_mut(identity.user_id()) {
            lines.retain(|l| l.product_id != product_id);
        }
        Ok(())
    }
}

// =============================================================================
// Order Gateway
// =============================================================================

/// One `create_order` call as the gateway saw it.
#[derive(Debug, Clone)]
pub struct RecordedOrder {
    /// User id of the identity the call was made with, `None` for guests.
    pub caller: Option<String>,
    pub submission: OrderSubmission,
}

#[derive(Default)]
pub struct FakeOrderGateway {
    failing: AtomicBool,
    next_id: AtomicU64,
    submissions: Mutex<Vec<RecordedOrder>>,
    orders: Mutex<Vec<Order>>,
    hold: Hold,
}

impl FakeOrderGateway {
    /// `create_order` fails with a 503 while set.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<RecordedOrder> {
        lock(&self.submissions).clone()
    }

    /// Blocks the next `create_order`. Returns `(started, release)`.
    pub fn block_next_order(&self) -> (Arc<Notify>, Arc<Notify>) {
        self.hold.arm()
    }

    /// Adds a stored order, created `day` days into 2024.
    pub fn insert_order(&self, id: &str, user_id: &str, day: u32) {
        let created_at = Utc
            .with_ymd_and_hms(2024, 1, day, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        lock(&self.orders).push(Order {
            id: id.to_string(),
            user_id: user_id.to_string(),
            shipping_address: shipping_address(),
            items: vec![],
            total_amount_cents: 3700,
            status: OrderStatus::Pending,
            created_at,
        });
    }
}

#[async_trait]
impl OrderGateway for FakeOrderGateway {
    async fn create_order(
        &self,
        identity: Option<&Identity>,
        order: &OrderSubmission,
    ) -> ApiResult<OrderReceipt> {
        lock(&self.submissions).push(RecordedOrder {
            caller: identity.map(|i| i.user_id().to_string()),
            submission: order.clone(),
        });
        self.hold.wait().await;

        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(OrderReceipt {
            order_id: format!("order-{}", n),
            message: Some("Order created successfully".to_string()),
        })
    }

    async fn fetch_order(&self, identity: &Identity, order_id: &str) -> ApiResult<Order> {
        lock(&self.orders)
            .iter()
            .find(|o| o.id == order_id && o.user_id == identity.user_id())
            .cloned()
            .ok_or_else(|| ApiError::Remote {
                status: 404,
                message: "Order not found".to_string(),
            })
    }

    async fn list_orders(&self, identity: &Identity) -> ApiResult<Vec<Order>> {
        // Insertion order, like the store
        Ok(lock(&self.orders)
            .iter()
            .filter(|o| o.user_id == identity.user_id())
            .cloned()
            .collect())
    }
}
