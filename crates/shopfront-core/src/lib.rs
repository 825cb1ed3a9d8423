//! # shopfront-core: Pure Storefront Logic
//!
//! This crate is the **heart** of Shopfront. It holds the cart model, the
//! shipping form rules and the checkout stage machine as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopfront Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │             apps/shopfront (CartManager, CheckoutPipeline)      │   │
//! │  │    add_item ──► submit_shipping ──► select_payment ──► place    │   │
//! │  └───────────┬─────────────────────┬───────────────────┬───────────┘   │
//! │              │                     │                   │                │
//! │  ┌───────────▼──────────┐ ┌────────▼─────────┐ ┌───────▼───────────┐   │
//! │  │ shopfront-db         │ │ ★ shopfront-core │ │ shopfront-api     │   │
//! │  │ guest cart, session  │ │   (THIS CRATE)   │ │ remote cart,      │   │
//! │  │ staging (SQLite)     │ │                  │ │ orders (HTTP)     │   │
//! │  └──────────────────────┘ └──────────────────┘ └───────────────────┘   │
//! │                                                                         │
//! │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐          │
//! │   │   types   │  │   money   │  │   cart    │  │ checkout  │          │
//! │   │  Product  │  │   Money   │  │   Cart    │  │  stages   │          │
//! │   │  Order    │  │  TaxRate  │  │  merge    │  │  guards   │          │
//! │   └───────────┘  └───────────┘  └───────────┘  └───────────┘          │
//! │                                                                         │
//! │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, CartItem, ShippingAddress, Order)
//! - [`money`] - Money and TaxRate with integer arithmetic
//! - [`cart`] - Cart with merge-by-product semantics and derived totals
//! - [`checkout`] - Checkout stages, entry guards, pricing, order payload
//! - [`validation`] - Field and shipping form validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use shopfront_core::{Cart, CartItem, Money};
//!
//! let mut cart = Cart::new();
//! cart.add(CartItem::new("p1", "Mug", Money::from_cents(1000), 2)).unwrap();
//! cart.add(CartItem::new("p2", "Tea", Money::from_cents(500), 1)).unwrap();
//!
//! assert_eq!(cart.subtotal().cents(), 2500);
//! assert_eq!(cart.item_count(), 3);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartTotals};
pub use checkout::{
    CheckoutPricing, CheckoutStage, OrderSubmission, OrderSummary, RedirectTarget, StageAccess,
    StagedCheckout,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate};
pub use types::*;
pub use validation::{FieldErrors, ShippingForm};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Flat shipping charge added to every order, in cents ($10.00).
pub const DEFAULT_SHIPPING_COST_CENTS: i64 = 1000;

/// Sales tax applied to the cart subtotal, in basis points (8%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 800;
