//! # Checkout
//!
//! The checkout wizard as pure data: stages, entry guards, pricing and the
//! composed order payload. Persistence of staged data and the call to the
//! order service live in the app crate.
//!
//! ## Stage Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌───────────────┐ valid form ┌──────────────────┐ method ┌──────────┐ │
//! │  │ ShippingEntry │──────────►│ PaymentSelection │───────►│  Order   │ │
//! │  └───────────────┘           └──────────────────┘        │  Review  │ │
//! │         ▲  invalid form: stay, per-field errors          └────┬─────┘ │
//! │         │                                                     │       │
//! │         │  entering an earlier stage never clears      place  │ 2xx   │
//! │         │  data staged for later ones                 order   ▼       │
//! │                                                       ┌───────────────┐│
//! │                        non-2xx: stay on OrderReview   │ Submitted(id) ││
//! │                                                       └───────────────┘│
//! │  ENTRY GUARDS (silent redirects, not errors)                           │
//! │  • any wizard stage, cart loaded and empty  → product listing          │
//! │  • PaymentSelection without address         → ShippingEntry            │
//! │  • OrderReview without address              → ShippingEntry            │
//! │  • OrderReview without payment method       → PaymentSelection         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::money::{Money, TaxRate};
use crate::types::{CartItem, PaymentMethod, ShippingAddress};
use crate::{DEFAULT_SHIPPING_COST_CENTS, DEFAULT_TAX_RATE_BPS};

// =============================================================================
// Stages
// =============================================================================

/// Where the shopper is in the checkout wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum CheckoutStage {
    #[default]
    ShippingEntry,
    PaymentSelection,
    OrderReview,
    /// Confirmation view, keyed by the id the order service returned.
    Submitted { order_id: String },
}

/// Where a guard sends the shopper instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RedirectTarget {
    ProductListing,
    ShippingEntry,
    PaymentSelection,
}

impl RedirectTarget {
    /// The stage a redirect lands on, if it lands inside the wizard.
    pub fn stage(&self) -> Option<CheckoutStage> {
        match self {
            RedirectTarget::ProductListing => None,
            RedirectTarget::ShippingEntry => Some(CheckoutStage::ShippingEntry),
            RedirectTarget::PaymentSelection => Some(CheckoutStage::PaymentSelection),
        }
    }
}

/// Outcome of an entry guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "access", content = "target", rename_all = "snake_case")]
pub enum StageAccess {
    Allow,
    Redirect(RedirectTarget),
}

// =============================================================================
// Staged Data
// =============================================================================

/// Checkout input held between wizard steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StagedCheckout {
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: Option<PaymentMethod>,
    /// Idempotency key of the last submission attempt. Reused only while the
    /// composed order keeps the same fingerprint, so a plain retry cannot
    /// create a second order.
    pub idempotency_key: Option<String>,
}

/// Observed state of the cart, as far as the guards care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartPresence {
    /// The initial cart load has completed.
    pub loaded: bool,
    pub empty: bool,
}

/// Decides whether a stage may be entered.
///
/// ## Example
/// ```rust
/// use shopfront_core::checkout::{guard_stage, CartPresence};
/// use shopfront_core::{CheckoutStage, RedirectTarget, StageAccess, StagedCheckout};
///
/// let cart = CartPresence { loaded: true, empty: false };
/// let access = guard_stage(&CheckoutStage::OrderReview, cart, &StagedCheckout::default());
/// assert_eq!(access, StageAccess::Redirect(RedirectTarget::ShippingEntry));
/// ```
pub fn guard_stage(
    stage: &CheckoutStage,
    cart: CartPresence,
    staged: &StagedCheckout,
) -> StageAccess {
    if matches!(stage, CheckoutStage::Submitted { .. }) {
        return StageAccess::Allow;
    }

    // Until the first load completes an empty cart means "unknown", not "empty".
    if cart.loaded && cart.empty {
        return StageAccess::Redirect(RedirectTarget::ProductListing);
    }

    match stage {
        CheckoutStage::PaymentSelection | CheckoutStage::OrderReview
            if staged.shipping_address.is_none() =>
        {
            StageAccess::Redirect(RedirectTarget::ShippingEntry)
        }
        CheckoutStage::OrderReview if staged.payment_method.is_none() => {
            StageAccess::Redirect(RedirectTarget::PaymentSelection)
        }
        _ => StageAccess::Allow,
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Shipping and tax applied on top of the cart subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPricing {
    pub shipping_cost: Money,
    pub tax_rate: TaxRate,
}

impl Default for CheckoutPricing {
    fn default() -> Self {
        CheckoutPricing {
            shipping_cost: Money::from_cents(DEFAULT_SHIPPING_COST_CENTS),
            tax_rate: TaxRate::from_bps(DEFAULT_TAX_RATE_BPS),
        }
    }
}

impl CheckoutPricing {
    /// Grand total = subtotal + flat shipping + tax on the subtotal.
    ///
    /// Shipping is not taxed.
    pub fn summarize(&self, subtotal: Money) -> OrderSummary {
        let tax = subtotal.calculate_tax(self.tax_rate);
        OrderSummary {
            subtotal,
            shipping: self.shipping_cost,
            tax,
            grand_total: subtotal + self.shipping_cost + tax,
        }
    }
}

/// Price breakdown shown on the review step and sent as the order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub grand_total: Money,
}

// =============================================================================
// Order Submission
// =============================================================================

/// The single payload sent to the order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    /// `None` for guest checkout.
    pub user_id: Option<String>,
    /// Snapshot of the cart lines at submission time.
    pub items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub summary: OrderSummary,
    pub idempotency_key: String,
}

impl OrderSubmission {
    /// Composes the payload from the cart snapshot and the staged data.
    ///
    /// ## Errors
    /// - `EmptyCart` if there is nothing to order
    /// - `MissingStagedData` if the address or payment method was never staged
    pub fn compose(
        user_id: Option<String>,
        cart: &Cart,
        staged: &StagedCheckout,
        pricing: &CheckoutPricing,
        idempotency_key: impl Into<String>,
    ) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        let shipping_address = staged
            .shipping_address
            .clone()
            .ok_or_else(|| CoreError::MissingStagedData("shipping address".to_string()))?;
        let payment_method = staged
            .payment_method
            .ok_or_else(|| CoreError::MissingStagedData("payment method".to_string()))?;

        Ok(OrderSubmission {
            user_id,
            items: cart.items().to_vec(),
            shipping_address,
            payment_method,
            summary: pricing.summarize(cart.subtotal()),
            idempotency_key: idempotency_key.into(),
        })
    }

    /// The client-computed grand total.
    pub fn order_total(&self) -> Money {
        self.summary.grand_total
    }

    /// Hex SHA-256 over everything the order service would act on: buyer,
    /// lines, address, payment method and grand total. The idempotency key
    /// itself is left out, so two compositions of the same order match.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        feed(&mut hasher, self.user_id.as_deref().unwrap_or(""));
        hasher.update((self.items.len() as u64).to_le_bytes());
        for item in &self.items {
            feed(&mut hasher, &item.product_id);
            hasher.update(item.unit_price_cents.to_le_bytes());
            hasher.update(item.quantity.to_le_bytes());
        }

        let address = &self.shipping_address;
        for field in [
            address.full_name.as_str(),
            address.address_line1.as_str(),
            address.address_line2.as_deref().unwrap_or(""),
            address.city.as_str(),
            address.state_province.as_str(),
            address.postal_code.as_str(),
            address.country.as_str(),
            address.phone.as_str(),
        ] {
            feed(&mut hasher, field);
        }

        feed(&mut hasher, self.payment_method.as_str());
        hasher.update(self.order_total().cents().to_le_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Length-prefixed so adjacent fields cannot run into each other.
fn feed(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

// =============================================================================
// Unit Tests
// =============================================================================
