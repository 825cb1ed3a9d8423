//! # Wire Types
//!
//! Request and response bodies of the store API, and their conversion to
//! and from the domain types.
//!
//! ## Money on the Wire
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  domain (i64 cents)  ──cents_to_price()──►  wire (decimal dollars)     │
//! │        1099                                      10.99                  │
//! │                                                                         │
//! │  wire (decimal dollars)  ──price_to_cents()──►  domain (i64 cents)     │
//! │        10.985  → 1099 (rounded half away from zero)                     │
//! │        -1.00   → InvalidData                                            │
//! │        NaN     → InvalidData                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Loose Order Shapes
//! The order service stores the shipping address and the line items as
//! JSON-encoded strings, and some deployments return them decoded. Both
//! shapes are accepted; see [`AddressField`] and [`ItemsField`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ApiError, ApiResult};
use shopfront_core::{CartItem, Order, OrderStatus, OrderSubmission, ShippingAddress};

// =============================================================================
// Money Conversion
// =============================================================================

/// Converts a decimal dollar amount to cents.
pub fn price_to_cents(price: f64) -> ApiResult<i64> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::InvalidData(format!("price {}", price)));
    }
    let cents = (price * 100.0).round();
    if cents > i64::MAX as f64 {
        return Err(ApiError::InvalidData(format!("price {}", price)));
    }
    Ok(cents as i64)
}

/// Converts cents to a decimal dollar amount.
pub fn cents_to_price(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Accepts ids sent as strings or as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

// =============================================================================
// Cart
// =============================================================================

/// One cart line as the cart service sends and receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(
        rename = "imageUrl",
        alias = "image_url",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

impl CartItemDto {
    /// Builds the wire line for `item`, owned by `user_id`.
    pub fn from_item(item: &CartItem, user_id: Option<&str>) -> Self {
        CartItemDto {
            user_id: user_id.map(str::to_string),
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            price: cents_to_price(item.unit_price_cents),
            quantity: item.quantity,
            image_url: item.image_url.clone(),
            slug: item.slug.clone(),
            sku: item.sku.clone(),
        }
    }

    pub fn into_item(self) -> ApiResult<CartItem> {
        Ok(CartItem {
            unit_price_cents: price_to_cents(self.price)?,
            product_id: self.product_id,
            name: self.name,
            quantity: self.quantity,
            image_url: self.image_url,
            slug: self.slug,
            sku: self.sku,
        })
    }
}

/// `GET /cart/{user_id}` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub cart: Vec<CartItemDto>,
}

/// `PUT /cart/{user_id}/{product_id}` body.
#[derive(Debug, Clone, Serialize)]
pub struct QuantityUpdate {
    pub quantity: i64,
}

// =============================================================================
// Checkout
// =============================================================================

/// Shipping address in the order service's snake_case shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddressDto {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state_province: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
}

impl From<&ShippingAddress> for ShippingAddressDto {
    fn from(a: &ShippingAddress) -> Self {
        ShippingAddressDto {
            full_name: a.full_name.clone(),
            address_line1: a.address_line1.clone(),
            address_line2: a.address_line2.clone(),
            city: a.city.clone(),
            state_province: a.state_province.clone(),
            postal_code: a.postal_code.clone(),
            country: a.country.clone(),
            phone: a.phone.clone(),
        }
    }
}

impl From<ShippingAddressDto> for ShippingAddress {
    fn from(a: ShippingAddressDto) -> Self {
        ShippingAddress {
            full_name: a.full_name,
            address_line1: a.address_line1,
            address_line2: a.address_line2.filter(|s| !s.is_empty()),
            city: a.city,
            state_province: a.state_province,
            postal_code: a.postal_code,
            country: a.country,
            phone: a.phone,
        }
    }
}

/// `POST /checkout` body.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub items: Vec<CartItemDto>,
    /// Guest lines. The order service reads a guest order's lines from here
    /// only, so it repeats `items` when there is no user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_items: Option<Vec<CartItemDto>>,
    pub shipping_address: ShippingAddressDto,
    pub payment_method: String,
    pub order_total: f64,
}

impl From<&OrderSubmission> for CheckoutRequest {
    fn from(order: &OrderSubmission) -> Self {
        let user_id = order.user_id.as_deref();
        let items: Vec<CartItemDto> = order
            .items
            .iter()
            .map(|item| CartItemDto::from_item(item, user_id))
            .collect();
        CheckoutRequest {
            user_id: order.user_id.clone(),
            cart_items: user_id.is_none().then(|| items.clone()),
            items,
            shipping_address: ShippingAddressDto::from(&order.shipping_address),
            payment_method: order.payment_method.as_str().to_string(),
            order_total: cents_to_price(order.order_total().cents()),
        }
    }
}

/// `POST /checkout` success body.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub order_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

/// Shipping address as stored: structured, or a JSON-encoded string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AddressField {
    Structured(ShippingAddressDto),
    Encoded(String),
}

impl AddressField {
    /// A string that is not JSON is kept verbatim as the first address line.
    fn into_address(self) -> ShippingAddress {
        match self {
            AddressField::Structured(dto) => dto.into(),
            AddressField::Encoded(text) => match serde_json::from_str::<ShippingAddressDto>(&text)
            {
                Ok(dto) => dto.into(),
                Err(_) => ShippingAddressDto {
                    address_line1: text,
                    ..Default::default()
                }
                .into(),
            },
        }
    }
}

/// One line of a placed order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemDto {
    #[serde(deserialize_with = "string_or_number")]
    pub product_id: String,
    pub quantity: i64,
    pub price: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "imageUrl", alias = "image_url", default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
}

impl OrderItemDto {
    fn into_item(self) -> ApiResult<CartItem> {
        Ok(CartItem {
            unit_price_cents: price_to_cents(self.price)?,
            name: self.name.unwrap_or_else(|| self.product_id.clone()),
            product_id: self.product_id,
            quantity: self.quantity,
            image_url: self.image_url,
            slug: self.slug,
            sku: self.sku,
        })
    }
}

/// Order lines as stored: a list, or a JSON-encoded list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ItemsField {
    Lines(Vec<OrderItemDto>),
    Encoded(String),
}

impl ItemsField {
    fn into_items(self) -> ApiResult<Vec<CartItem>> {
        let lines = match self {
            ItemsField::Lines(lines) => lines,
            ItemsField::Encoded(text) if text.trim().is_empty() => Vec::new(),
            ItemsField::Encoded(text) => serde_json::from_str(&text)?,
        };
        lines.into_iter().map(OrderItemDto::into_item).collect()
    }
}

impl Default for ItemsField {
    fn default() -> Self {
        ItemsField::Lines(Vec::new())
    }
}

/// An order as the order service returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDto {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub user_id: String,
    pub shipping_address: AddressField,
    pub total_amount: f64,
    #[serde(default)]
    pub status: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub items: ItemsField,
}

impl OrderDto {
    pub fn into_order(self) -> ApiResult<Order> {
        let status = match self.status.as_deref() {
            None | Some("") => OrderStatus::default(),
            Some(s) => s
                .parse()
                .map_err(|_| ApiError::InvalidData(format!("order status '{}'", s)))?,
        };

        Ok(Order {
            created_at: parse_timestamp(&self.created_at)?,
            total_amount_cents: price_to_cents(self.total_amount)?,
            items: self.items.into_items()?,
            shipping_address: self.shipping_address.into_address(),
            id: self.id,
            user_id: self.user_id,
            status,
        })
    }
}

/// `GET /orders/{user_id}` body.
#[derive(Debug, Clone, Deserialize)]
pub struct OrdersResponse {
    #[serde(default)]
    pub orders: Vec<OrderDto>,
}

/// `GET /orders/{user_id}/{order_id}` body: the order itself, or wrapped.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderResponse {
    Wrapped { order: OrderDto },
    Bare(OrderDto),
}

impl OrderResponse {
    pub fn into_dto(self) -> OrderDto {
        match self {
            OrderResponse::Wrapped { order } => order,
            OrderResponse::Bare(order) => order,
        }
    }
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
fn parse_timestamp(raw: &str) -> ApiResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| ApiError::InvalidData(format!("timestamp '{}'", raw)))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use shopfront_core::{CheckoutPricing, Money, PaymentMethod, StagedCheckout};

    #[test]
    fn test_price_conversion() {
        assert_eq!(price_to_cents(10.99).unwrap(), 1099);
        assert_eq!(price_to_cents(0.1 + 0.2).unwrap(), 30);
        assert_eq!(price_to_cents(0.0).unwrap(), 0);
        assert!(price_to_cents(-1.0).is_err());
        assert!(price_to_cents(f64::NAN).is_err());
        assert_eq!(cents_to_price(2500), 25.0);
    }

    #[test]
    fn test_cart_item_wire_shape() {
        let mut item = CartItem::new("p1", "Mug", Money::from_cents(1099), 2);
        item.image_url = Some("https://cdn.example/mug.png".to_string());

        let json = serde_json::to_value(CartItemDto::from_item(&item, Some("user-1"))).unwrap();
        assert_eq!(json["user_id"], "user-1");
        assert_eq!(json["price"], 10.99);
        assert_eq!(json["imageUrl"], "https://cdn.example/mug.png");
        assert!(json.get("slug").is_none());
    }

    #[test]
    fn test_cart_response_tolerates_extra_fields() {
        let body = r#"{"message":"ok","cart":[{"user_id":"u","product_id":7,"name":"Mug","price":10.0,"quantity":2,"image_url":null}]}"#;
        let response: CartResponse = serde_json::from_str(body).unwrap();
        let item = response.cart[0].clone().into_item().unwrap();
        assert_eq!(item.product_id, "7");
        assert_eq!(item.unit_price_cents, 1000);
    }

    fn submission(user_id: Option<&str>) -> OrderSubmission {
        let cart = shopfront_core::Cart::from_items(vec![CartItem::new(
            "p1",
            "Mug",
            Money::from_cents(1000),
            2,
        )])
        .unwrap();
        let staged = StagedCheckout {
            shipping_address: Some(ShippingAddress {
                full_name: "Ada".to_string(),
                address_line1: "1 Main St".to_string(),
                address_line2: None,
                city: "Springfield".to_string(),
                state_province: "IL".to_string(),
                postal_code: "62701".to_string(),
                country: "US".to_string(),
                phone: "555".to_string(),
            }),
            payment_method: Some(PaymentMethod::Cod),
            idempotency_key: None,
        };
        OrderSubmission::compose(
            user_id.map(str::to_string),
            &cart,
            &staged,
            &CheckoutPricing::default(),
            "key",
        )
        .unwrap()
    }

    #[test]
    fn test_guest_checkout_request_carries_cart_items() {
        let json = serde_json::to_value(CheckoutRequest::from(&submission(None))).unwrap();
        assert!(json.get("user_id").is_none());
        assert_eq!(json["payment_method"], "cod");
        assert_eq!(json["order_total"], 31.6);
        assert_eq!(json["shipping_address"]["state_province"], "IL");
        assert_eq!(json["items"][0]["quantity"], 2);
        assert_eq!(json["cart_items"], json["items"]);
        assert_eq!(json["cart_items"][0]["product_id"], "p1");
    }

    #[test]
    fn test_customer_checkout_request_has_no_cart_items() {
        let json =
            serde_json::to_value(CheckoutRequest::from(&submission(Some("user-1")))).unwrap();
        assert_eq!(json["user_id"], "user-1");
        assert_eq!(json["items"][0]["user_id"], "user-1");
        assert!(json.get("cart_items").is_none());
    }

    #[test]
    fn test_order_with_encoded_fields() {
        let body = r#"{
            "id": "ord-1",
            "user_id": "user-1",
            "shipping_address": "{\"full_name\":\"Ada\",\"address_line1\":\"1 Main St\",\"city\":\"Springfield\",\"state_province\":\"IL\",\"postal_code\":\"62701\",\"country\":\"US\",\"phone\":\"555\"}",
            "total_amount": 37.0,
            "status": "completed",
            "created_at": "2025-03-04T05:06:07.123456",
            "items": "[{\"product_id\":\"p1\",\"quantity\":2,\"price\":10.0}]"
        }"#;
        let order = serde_json::from_str::<OrderDto>(body)
            .unwrap()
            .into_order()
            .unwrap();

        assert_eq!(order.shipping_address.city, "Springfield");
        assert_eq!(order.total_amount_cents, 3700);
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.items[0].name, "p1");
        assert_eq!(order.items[0].line_total().cents(), 2000);
        assert_eq!(order.created_at.year(), 2025);
        assert_eq!(order.created_at.second(), 7);
    }

    #[test]
    fn test_order_with_structured_fields_and_plain_address() {
        let body = r#"{
            "id": 42,
            "user_id": "user-1",
            "shipping_address": "221B Baker Street, London",
            "total_amount": 5,
            "created_at": "2025-03-04T05:06:07Z",
            "items": [{"product_id":"p9","quantity":1,"price":5,"name":"Pipe"}]
        }"#;
        let order = serde_json::from_str::<OrderDto>(body)
            .unwrap()
            .into_order()
            .unwrap();

        assert_eq!(order.id, "42");
        assert_eq!(order.shipping_address.address_line1, "221B Baker Street, London");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items[0].name, "Pipe");
    }

    #[test]
    fn test_bad_timestamp_is_invalid_data() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(ApiError::InvalidData(_))
        ));
    }
}
