//! # Commands Module
//!
//! Everything a front end calls. Each command takes only the state it needs
//! and answers with a serializable value or an [`ErrorPayload`].
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── cart.rs      ◄─── Cart manipulation, sign in / sign out
//! ├── checkout.rs  ◄─── Checkout wizard and order submission
//! ├── orders.rs    ◄─── Order history
//! └── config.rs    ◄─── Configuration retrieval
//! ```
//!
//! ## State Injection
//! ```rust,ignore
//! // Only needs the cart
//! commands::cart::add_to_cart(storefront.cart(), &product, Some(2)).await
//!
//! // Only needs the checkout pipeline
//! commands::checkout::place_order(storefront.checkout()).await
//! ```
//!
//! [`ErrorPayload`]: crate::error::ErrorPayload

pub mod cart;
pub mod checkout;
pub mod config;
pub mod orders;
