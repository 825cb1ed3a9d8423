//! # Cart Commands
//!
//! Cart manipulation and identity changes.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  startup ──► load_cart ──► add_to_cart / update_cart_item /             │
//! │                            remove_from_cart / clear_cart                │
//! │                                   │                                     │
//! │              sign_in ◄────────────┤────────────► sign_out               │
//! │   (guest lines pushed to the      │        (guest cart reloaded         │
//! │    store, remote cart loaded)     │         from this device)           │
//! │                                   ▼                                     │
//! │                         place_order clears it                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command answers with the cart as it stands afterwards.

use serde::Serialize;
use tracing::debug;

use shopfront_api::Identity;
use shopfront_core::Product;

use crate::error::ErrorPayload;
use crate::state::{CartManager, CartSnapshot, MergeReport};

/// Sign-in result: what was merged and the resulting cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub merge: MergeReport,
    pub cart: CartSnapshot,
}

/// Gets the current cart contents.
pub fn get_cart(cart: &CartManager) -> CartSnapshot {
    debug!("get_cart command");
    cart.snapshot()
}

/// (Re)loads the cart from the active scope.
pub async fn load_cart(cart: &CartManager) -> Result<CartSnapshot, ErrorPayload> {
    debug!("load_cart command");
    cart.load_cart().await?;
    Ok(cart.snapshot())
}

/// Adds a product to the cart.
///
/// ## Arguments
/// * `product` - Catalog product as shown on the product page
/// * `quantity` - Quantity to add (default: 1)
pub async fn add_to_cart(
    cart: &CartManager,
    product: &Product,
    quantity: Option<i64>,
) -> Result<CartSnapshot, ErrorPayload> {
    let quantity = quantity.unwrap_or(1);
    debug!(product_id = %product.id, quantity, "add_to_cart command");

    cart.add_item(product, quantity).await?;
    Ok(cart.snapshot())
}

/// Sets a line's quantity. Quantity 0 removes the line.
pub async fn update_cart_item(
    cart: &CartManager,
    product_id: &str,
    quantity: i64,
) -> Result<CartSnapshot, ErrorPayload> {
    debug!(product_id, quantity, "update_cart_item command");
    cart.update_quantity(product_id, quantity).await?;
    Ok(cart.snapshot())
}

pub async fn remove_from_cart(
    cart: &CartManager,
    product_id: &str,
) -> Result<CartSnapshot, ErrorPayload> {
    debug!(product_id, "remove_from_cart command");
    cart.remove_item(product_id).await?;
    Ok(cart.snapshot())
}

pub async fn clear_cart(cart: &CartManager) -> Result<CartSnapshot, ErrorPayload> {
    debug!("clear_cart command");
    cart.clear_cart().await?;
    Ok(cart.snapshot())
}

/// Signs in and merges the guest cart into the customer's cart.
pub async fn sign_in(
    cart: &CartManager,
    user_id: &str,
    token: &str,
) -> Result<SignInResponse, ErrorPayload> {
    debug!(user_id, "sign_in command");
    if user_id.trim().is_empty() || token.trim().is_empty() {
        return Err(ErrorPayload::validation("user id and token are required"));
    }

    let merge = cart.sign_in(Identity::new(user_id.trim(), token.trim())).await?;
    Ok(SignInResponse {
        merge,
        cart: cart.snapshot(),
    })
}

pub async fn sign_out(cart: &CartManager) -> Result<CartSnapshot, ErrorPayload> {
    debug!("sign_out command");
    cart.sign_out().await?;
    Ok(cart.snapshot())
}
