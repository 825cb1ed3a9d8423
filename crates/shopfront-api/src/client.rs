//! # Store API Client
//!
//! reqwest-based implementation of [`RemoteCart`] and [`OrderGateway`].
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  endpoint(["cart", user_id, product_id])                               │
//! │       │   base URL + percent-encoded segments                          │
//! │       ▼                                                                 │
//! │  RequestBuilder ── bearer_auth(identity) when signed in                │
//! │       │         └─ Idempotency-Key on POST /checkout                   │
//! │       ▼                                                                 │
//! │  send()  ── read body ── 2xx? ──yes──► decode DTO ──► domain type      │
//! │                             │                                          │
//! │                             no ──► ApiError::from_response(status,body)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One `reqwest::Client` per `StoreApiClient`; it pools connections, so the
//! client is built once at startup and shared behind an `Arc`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::auth::Identity;
use crate::config::ApiSettings;
use crate::dto::{
    CartItemDto, CartResponse, CheckoutRequest, CheckoutResponse, OrderDto, OrderResponse,
    OrdersResponse, QuantityUpdate,
};
use crate::error::{ApiError, ApiResult};
use crate::ports::{OrderGateway, OrderReceipt, RemoteCart};
use shopfront_core::{CartItem, Order, OrderSubmission};

/// Header carrying the checkout idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// HTTP client for the store API.
#[derive(Debug, Clone)]
pub struct StoreApiClient {
    http: Client,
    base_url: Url,
}

impl StoreApiClient {
    /// Builds a client from validated settings.
    pub fn new(settings: &ApiSettings) -> ApiResult<Self> {
        let base_url = settings.validate()?;
        let http = Client::builder()
            .timeout(settings.timeout())
            .user_agent(concat!("shopfront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        debug!(base_url = %base_url, timeout_secs = settings.timeout_secs, "Store API client ready");
        Ok(StoreApiClient { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base URL. Each segment is percent-encoded,
    /// so ids containing `/` or `?` stay a single segment.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Sends the request and returns the body of a 2xx response.
    async fn send(&self, request: RequestBuilder) -> ApiResult<Vec<u8>> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "Store API rejected request");
            return Err(err);
        }
        Ok(body.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let body = self.send(request).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

// =============================================================================
// Cart
// =============================================================================

#[async_trait]
impl RemoteCart for StoreApiClient {
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id()))]
    async fn fetch_cart(&self, identity: &Identity) -> ApiResult<Vec<CartItem>> {
        let url = self.endpoint(&["cart", identity.user_id()])?;
        let response: CartResponse = self
            .send_json(self.http.get(url).bearer_auth(identity.bearer()))
            .await?;

        debug!(lines = response.cart.len(), "Fetched remote cart");
        response
            .cart
            .into_iter()
            .map(CartItemDto::into_item)
            .collect()
    }

    #[instrument(skip(self, identity, item), fields(user_id = %identity.user_id(), product_id = %item.product_id))]
    async fn add_item(&self, identity: &Identity, item: &CartItem) -> ApiResult<()> {
        let url = self.endpoint(&["cart"])?;
        let body = CartItemDto::from_item(item, Some(identity.user_id()));
        self.send(self.http.post(url).bearer_auth(identity.bearer()).json(&body))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.user_id()))]
    async fn update_quantity(
        &self,
        identity: &Identity,
        product_id: &str,
        quantity: i64,
    ) -> ApiResult<()> {
        let url = self.endpoint(&["cart", identity.user_id(), product_id])?;
        self.send(
            self.http
                .put(url)
                .bearer_auth(identity.bearer())
                .json(&QuantityUpdate { quantity }),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.user_id()))]
    async fn remove_item(&self, identity: &Identity, product_id: &str) -> ApiResult<()> {
        let url = self.endpoint(&["cart", identity.user_id(), product_id])?;
        self.send(self.http.delete(url).bearer_auth(identity.bearer()))
            .await?;
        Ok(())
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderGateway for StoreApiClient {
    #[instrument(skip_all, fields(lines = order.items.len(), guest = identity.is_none()))]
    async fn create_order(
        &self,
        identity: Option<&Identity>,
        order: &OrderSubmission,
    ) -> ApiResult<OrderReceipt> {
        let url = self.endpoint(&["checkout"])?;
        let mut request = self
            .http
            .post(url)
            .header(IDEMPOTENCY_KEY_HEADER, order.idempotency_key.as_str())
            .json(&CheckoutRequest::from(order));
        if let Some(identity) = identity {
            request = request.bearer_auth(identity.bearer());
        }

        let response: CheckoutResponse = self.send_json(request).await?;
        debug!(order_id = %response.order_id, "Order accepted");
        Ok(OrderReceipt {
            order_id: response.order_id,
            message: response.message,
        })
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.user_id()))]
    async fn fetch_order(&self, identity: &Identity, order_id: &str) -> ApiResult<Order> {
        let url = self.endpoint(&["orders", identity.user_id(), order_id])?;
        let response: OrderResponse = self
            .send_json(self.http.get(url).bearer_auth(identity.bearer()))
            .await?;
        response.into_dto().into_order()
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.user_id()))]
    async fn list_orders(&self, identity: &Identity) -> ApiResult<Vec<Order>> {
        let url = self.endpoint(&["orders", identity.user_id()])?;
        let response: OrdersResponse = self
            .send_json(self.http.get(url).bearer_auth(identity.bearer()))
            .await?;

        response
            .orders
            .into_iter()
            .map(OrderDto::into_order)
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
