//! # Cart
//!
//! The cart value type: an ordered list of lines, unique by product id.
//!
//! ## Invariants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. At most one line per product_id                                     │
//! │  2. Every line has quantity >= 1                                        │
//! │  3. add(p, a) then add(p, b)  ⇒  quantity(p) == a + b                   │
//! │  4. subtotal()   == Σ unit_price × quantity   (computed on every read)  │
//! │  5. item_count() == Σ quantity                (not distinct lines)      │
//! │                                                                         │
//! │  Line order is insertion order; it matters for display only.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart does no I/O. Which store backs it (device-local or remote) is
//! decided by the `CartManager` in the app crate.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::CartItem;
use crate::validation::{validate_product_id, validate_quantity};

/// A shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Builds a cart from lines read from a store.
    ///
    /// Duplicate product ids are folded together, so a store that returns
    /// the same product twice still yields a well-formed cart.
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> CoreResult<Self> {
        let mut cart = Cart::new();
        for item in items {
            cart.add(item)?;
        }
        Ok(cart)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds a line, or increases the quantity of the existing line.
    ///
    /// ## Errors
    /// - `Validation` if the product id is blank or the quantity is not positive
    /// - `QuantityOverflow` if the summed quantity does not fit in an i64
    pub fn add(&mut self, item: CartItem) -> CoreResult<()> {
        validate_product_id(&item.product_id)?;
        validate_quantity(item.quantity)?;

        if let Some(existing) = self.find_mut(&item.product_id) {
            existing.quantity = existing.quantity.checked_add(item.quantity).ok_or_else(|| {
                CoreError::QuantityOverflow {
                    product_id: item.product_id.clone(),
                }
            })?;
            return Ok(());
        }

        self.items.push(item);
        Ok(())
    }

    /// Sets the quantity of an existing line.
    ///
    /// Removal is a separate operation; a quantity below one is rejected here
    /// rather than silently deleting the line.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;
        let item = self
            .find_mut(product_id)
            .ok_or_else(|| CoreError::ItemNotInCart(product_id.to_string()))?;
        item.quantity = quantity;
        Ok(())
    }

    /// Removes a line. Returns the removed line, or `None` if the product was
    /// not in the cart.
    pub fn remove(&mut self, product_id: &str) -> Option<CartItem> {
        let index = self.items.iter().position(|i| i.product_id == product_id)?;
        Some(self.items.remove(index))
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    // =========================================================================
    // Reads (all derived values are computed, never cached)
    // =========================================================================

    /// Lines in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Consumes the cart, returning its lines.
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    /// Looks up a line by product id.
    pub fn get(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.get(product_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Σ quantity. This is the number shown on the cart badge.
    pub fn item_count(&self) -> i64 {
        self.items
            .iter()
            .fold(0i64, |acc, i| acc.saturating_add(i.quantity))
    }

    /// Σ unit price × quantity.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Derived totals for display.
    pub fn totals(&self) -> CartTotals {
        CartTotals::from(self)
    }

    fn find_mut(&mut self, product_id: &str) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.product_id == product_id)
    }
}

/// Cart totals summary for responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub line_count: usize,
    pub item_count: i64,
    pub subtotal_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            line_count: cart.line_count(),
            item_count: cart.item_count(),
            subtotal_cents: cart.subtotal().cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn item(id: &str, price_cents: i64, qty: i64) -> CartItem {
        CartItem::new(id, format!("Product {}", id), Money::from_cents(price_cents), qty)
    }

    #[test]
    fn test_totals_scenario() {
        let mut cart = Cart::new();
        cart.add(item("p1", 1000, 2)).unwrap();
        cart.add(item("p2", 500, 1)).unwrap();

        assert_eq!(cart.subtotal().cents(), 2500);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.line_count(), 2);
    }

    #[test]
    fn test_repeated_adds_sum_quantities() {
        let mut cart = Cart::new();
        cart.add(item("p1", 1000, 2)).unwrap();
        cart.add(item("p1", 1000, 1)).unwrap();
        cart.add(item("p1", 1000, 1)).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.get("p1").unwrap().quantity, 4);
    }

    #[test]
    fn test_merge_invariant_over_many_adds() {
        let quantities = [3, 1, 7, 2, 5, 1];
        let mut cart = Cart::new();
        for qty in quantities {
            cart.add(item("p1", 250, qty)).unwrap();
        }

        let expected: i64 = quantities.iter().sum();
        assert_eq!(cart.get("p1").unwrap().quantity, expected);
        assert_eq!(cart.item_count(), expected);
        assert_eq!(cart.subtotal().cents(), 250 * expected);
    }

    #[test]
    fn test_add_rejects_blank_id_and_bad_quantity() {
        let mut cart = Cart::new();

        let err = cart.add(item("", 100, 1)).unwrap_err();
        assert_eq!(
            err,
            CoreError::Validation(ValidationError::required("product id"))
        );

        assert!(cart.add(item("p1", 100, 0)).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_overflow_leaves_line_untouched() {
        let mut cart = Cart::new();
        cart.add(item("p1", 1, i64::MAX)).unwrap();

        let err = cart.add(item("p1", 1, 1)).unwrap_err();
        assert!(matches!(err, CoreError::QuantityOverflow { .. }));
        assert_eq!(cart.get("p1").unwrap().quantity, i64::MAX);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::new();
        cart.add(item("p1", 1000, 2)).unwrap();

        cart.set_quantity("p1", 5).unwrap();
        assert_eq!(cart.item_count(), 5);

        assert_eq!(
            cart.set_quantity("nope", 1).unwrap_err(),
            CoreError::ItemNotInCart("nope".to_string())
        );
        assert!(cart.set_quantity("p1", 0).is_err());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(item("p1", 1000, 2)).unwrap();
        cart.add(item("p2", 500, 1)).unwrap();

        assert_eq!(cart.remove("p1").map(|i| i.quantity), Some(2));
        assert!(cart.remove("p1").is_none());
        assert_eq!(cart.subtotal().cents(), 500);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Money::zero());
    }

    #[test]
    fn test_from_items_folds_duplicates() {
        let cart = Cart::from_items(vec![item("p1", 1000, 1), item("p1", 1000, 4)]).unwrap();
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_totals_struct() {
        let cart = Cart::from_items(vec![item("p1", 1000, 2), item("p2", 500, 1)]).unwrap();
        let totals = cart.totals();
        assert_eq!(
            totals,
            CartTotals {
                line_count: 2,
                item_count: 3,
                subtotal_cents: 2500,
            }
        );
    }
}
