//! # Cart Manager
//!
//! Single source of truth for the active cart.
//!
//! ## Scopes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Guest scope (no identity)          Customer scope (signed in)         │
//! │   ┌──────────────────────────┐       ┌──────────────────────────┐       │
//! │   │ guest_carts row          │       │ remote cart              │       │
//! │   │ keyed by device id       │       │ keyed by user id         │       │
//! │   │                          │       │                          │       │
//! │   │ read-modify-write,       │       │ confirm with the store,  │       │
//! │   │ failures logged and      │       │ then apply; failures     │       │
//! │   │ swallowed                │       │ propagate, state intact  │       │
//! │   └────────────┬─────────────┘       └────────────┬─────────────┘       │
//! │                │                                   │                    │
//! │                └──────────────┬────────────────────┘                    │
//! │                               ▼                                         │
//! │                  in-memory Cart (read by every view)                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! Every mutator, load and identity change runs under one async write gate,
//! so a confirm-then-apply sequence never interleaves with another. The
//! in-memory state sits behind a `std::sync::Mutex` that is never held
//! across an await.
//!
//! ## Scope Epoch
//! `sign_in` and `sign_out` bump the epoch before they queue for the gate.
//! A load that finishes under an older epoch is discarded, so a slow fetch
//! for the previous shopper can never overwrite the next shopper's cart.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use shopfront_api::{Identity, RemoteCart};
use shopfront_core::checkout::CartPresence;
use shopfront_core::validation::{validate_product_id, validate_quantity};
use shopfront_core::{Cart, CartItem, CartTotals, Money, Product};
use shopfront_db::{Database, GuestCartRepository};

use super::lock;
use crate::error::{AppError, AppResult};

// =============================================================================
// Public Types
// =============================================================================

/// Point-in-time view of the cart, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
    pub is_loading: bool,
    pub has_loaded: bool,
    pub last_error: Option<String>,
    /// `None` in guest scope.
    pub user_id: Option<String>,
}

/// What happened to a load's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    /// The fetched cart replaced the in-memory cart.
    Applied,
    /// The scope changed while fetching; the result was dropped.
    Stale,
}

/// Result of folding the guest cart into the customer cart at sign-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Guest lines the store accepted.
    pub merged: usize,
    /// Guest lines the store rejected. They stay in the guest cart.
    pub retained: usize,
}

// =============================================================================
// Internal State
// =============================================================================

#[derive(Default)]
struct CartState {
    identity: Option<Identity>,
    epoch: u64,
    cart: Cart,
    is_loading: bool,
    has_loaded: bool,
    last_error: Option<String>,
}

struct Shared {
    remote: Arc<dyn RemoteCart>,
    guest_carts: GuestCartRepository,
    device_id: String,
    gate: AsyncMutex<()>,
    state: Mutex<CartState>,
}

/// Cheaply cloneable handle to the cart. Every clone sees the same cart.
#[derive(Clone)]
pub struct CartManager {
    shared: Arc<Shared>,
}

impl fmt::Debug for CartManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartManager")
            .field("device_id", &self.shared.device_id)
            .field("user_id", &self.identity().map(|i| i.user_id().to_string()))
            .finish()
    }
}

impl CartManager {
    /// Creates a manager in guest scope with an empty, not yet loaded cart.
    pub fn new(remote: Arc<dyn RemoteCart>, db: &Database, device_id: impl Into<String>) -> Self {
        CartManager {
            shared: Arc::new(Shared {
                remote,
                guest_carts: db.guest_carts(),
                device_id: device_id.into(),
                gate: AsyncMutex::new(()),
                state: Mutex::new(CartState::default()),
            }),
        }
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Adds `quantity` of `product`, summing into an existing line.
    ///
    /// ## Errors
    /// - `Validation` for a blank product id or a quantity below one
    /// - `Core(QuantityOverflow)` if the summed quantity does not fit
    /// - `Api` if the store rejects the add (customer scope); the cart is
    ///   left unchanged
    pub async fn add_item(&self, product: &Product, quantity: i64) -> AppResult<()> {
        debug!(product_id = %product.id, quantity, "add_item");
        validate_product_id(&product.id)?;
        validate_quantity(quantity)?;
        let item = CartItem::from_product(product, quantity);

        let _gate = self.shared.gate.lock().await;
        match self.identity() {
            Some(identity) => {
                // Catch overflow before the store sees the add.
                let mut trial = self.read(|s| s.cart.clone());
                trial.add(item.clone())?;

                self.shared.remote.add_item(&identity, &item).await?;
                self.write(|s| s.cart = trial);
            }
            None => {
                let mut cart = self.read_guest_cart(Fallback::InMemory).await;
                cart.add(item)?;
                self.persist_guest_cart(&cart).await;
                self.write(|s| s.cart = cart);
            }
        }
        Ok(())
    }

    /// Removes the line for `product_id`. Removing an absent product is a
    /// no-op.
    pub async fn remove_item(&self, product_id: &str) -> AppResult<()> {
        debug!(product_id, "remove_item");

        let _gate = self.shared.gate.lock().await;
        match self.identity() {
            Some(identity) => {
                if !self.read(|s| s.cart.contains(product_id)) {
                    return Ok(());
                }
                self.shared.remote.remove_item(&identity, product_id).await?;
                self.write(|s| {
                    s.cart.remove(product_id);
                });
            }
            None => {
                let mut cart = self.read_guest_cart(Fallback::InMemory).await;
                if cart.remove(product_id).is_some() {
                    self.persist_guest_cart(&cart).await;
                }
                self.write(|s| s.cart = cart);
            }
        }
        Ok(())
    }

    /// Sets the quantity of an existing line. A quantity below one removes
    /// the line.
    ///
    /// ## Errors
    /// - `Core(ItemNotInCart)` if the product has no line
    /// - `Api` if the store rejects the update (customer scope)
    pub async fn update_quantity(&self, product_id: &str, quantity: i64) -> AppResult<()> {
        debug!(product_id, quantity, "update_quantity");
        if quantity < 1 {
            return self.remove_item(product_id).await;
        }

        let _gate = self.shared.gate.lock().await;
        match self.identity() {
            Some(identity) => {
                let mut trial = self.read(|s| s.cart.clone());
                trial.set_quantity(product_id, quantity)?;

                self.shared
                    .remote
                    .update_quantity(&identity, product_id, quantity)
                    .await?;
                self.write(|s| s.cart = trial);
            }
            None => {
                let mut cart = self.read_guest_cart(Fallback::InMemory).await;
                cart.set_quantity(product_id, quantity)?;
                self.persist_guest_cart(&cart).await;
                self.write(|s| s.cart = cart);
            }
        }
        Ok(())
    }

    /// Empties the cart.
    ///
    /// In customer scope each line is removed from the store and then
    /// locally, one at a time. The first rejected line stops the clear; the
    /// lines not yet removed stay in both carts.
    pub async fn clear_cart(&self) -> AppResult<()> {
        debug!("clear_cart");

        let _gate = self.shared.gate.lock().await;
        match self.identity() {
            Some(identity) => self.remove_remote_lines(&identity).await?,
            None => {
                self.delete_guest_cart().await;
                self.write(|s| s.cart.clear());
            }
        }
        Ok(())
    }

    /// Empties the cart after an order went through.
    ///
    /// The order already exists at this point, so a failing remote removal
    /// is only logged and the in-memory cart is emptied regardless.
    pub async fn clear_after_checkout(&self) {
        debug!("clear_after_checkout");

        let _gate = self.shared.gate.lock().await;
        match self.identity() {
            Some(identity) => {
                if let Err(e) = self.remove_remote_lines(&identity).await {
                    warn!(error = %e, "Remote cart not cleared after checkout");
                }
            }
            None => self.delete_guest_cart().await,
        }
        self.write(|s| s.cart.clear());
    }

    /// Removes every line through the store's per-product delete. Caller
    /// holds the gate.
    async fn remove_remote_lines(&self, identity: &Identity) -> AppResult<()> {
        let product_ids: Vec<String> = self.read(|s| {
            s.cart
                .items()
                .iter()
                .map(|item| item.product_id.clone())
                .collect()
        });

        for product_id in product_ids {
            self.shared.remote.remove_item(identity, &product_id).await?;
            self.write(|s| {
                s.cart.remove(&product_id);
            });
        }
        Ok(())
    }

    // =========================================================================
    // Loading & Identity
    // =========================================================================

    /// Replaces the in-memory cart with the one from the active scope.
    ///
    /// ## Errors
    /// A failed remote fetch empties the cart, records the message as
    /// `last_error` and is returned.
    pub async fn load_cart(&self) -> AppResult<LoadOutcome> {
        let _gate = self.shared.gate.lock().await;
        self.load_locked().await
    }

    /// Switches to customer scope and merges the guest cart into the
    /// customer's remote cart.
    ///
    /// ## Merge Policy
    /// ```text
    /// guest cart ──► remote add, one line at a time
    ///                  │
    ///                  ├── accepted: removed from the guest cart
    ///                  └── rejected: kept in the guest cart
    ///
    /// then load the remote cart (name and price come from the store)
    /// ```
    pub async fn sign_in(&self, identity: Identity) -> AppResult<MergeReport> {
        info!(user_id = %identity.user_id(), "Signing in");
        self.bump_epoch();

        let _gate = self.shared.gate.lock().await;
        self.write(|s| s.identity = Some(identity.clone()));

        let guest = self.read_guest_cart(Fallback::Empty).await;
        let mut report = MergeReport::default();
        let mut retained = Vec::new();

        for item in guest.into_items() {
            match self.shared.remote.add_item(&identity, &item).await {
                Ok(()) => report.merged += 1,
                Err(e) => {
                    warn!(product_id = %item.product_id, error = %e, "Guest line not merged");
                    retained.push(item);
                }
            }
        }
        report.retained = retained.len();

        if report.merged > 0 {
            if retained.is_empty() {
                self.delete_guest_cart().await;
            } else if let Err(e) = self
                .shared
                .guest_carts
                .save(&self.shared.device_id, &retained)
                .await
            {
                warn!(error = %e, "Failed to persist retained guest lines");
            }
        }
        info!(merged = report.merged, retained = report.retained, "Guest cart merged");

        self.load_locked().await?;
        Ok(report)
    }

    /// Switches to guest scope and loads the device's guest cart.
    pub async fn sign_out(&self) -> AppResult<()> {
        info!("Signing out");
        self.bump_epoch();

        let _gate = self.shared.gate.lock().await;
        self.write(|s| s.identity = None);
        self.load_locked().await?;
        Ok(())
    }

    async fn load_locked(&self) -> AppResult<LoadOutcome> {
        let (epoch, identity) = self.write(|s| {
            s.is_loading = true;
            (s.epoch, s.identity.clone())
        });
        debug!(epoch, signed_in = identity.is_some(), "Loading cart");

        let result = match &identity {
            Some(identity) => match self.shared.remote.fetch_cart(identity).await {
                Ok(items) => Cart::from_items(items).map_err(AppError::from),
                Err(e) => Err(AppError::from(e)),
            },
            None => Ok(self.read_guest_cart(Fallback::Empty).await),
        };

        let mut state = lock(&self.shared.state);
        if state.epoch != epoch {
            debug!(epoch, current = state.epoch, "Discarding stale cart load");
            return Ok(LoadOutcome::Stale);
        }

        state.is_loading = false;
        state.has_loaded = true;
        match result {
            Ok(cart) => {
                state.cart = cart;
                state.last_error = None;
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                warn!(error = %e, "Cart load failed");
                state.cart = Cart::new();
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn bump_epoch(&self) {
        self.write(|s| s.epoch = s.epoch.wrapping_add(1));
    }

    // =========================================================================
    // Guest Store
    // =========================================================================

    async fn read_guest_cart(&self, fallback: Fallback) -> Cart {
        let stored = self
            .shared
            .guest_carts
            .load(&self.shared.device_id)
            .await
            .map_err(AppError::from)
            .and_then(|items| Cart::from_items(items).map_err(AppError::from));

        match stored {
            Ok(cart) => cart,
            Err(e) => {
                warn!(error = %e, "Guest cart unreadable, using fallback");
                match fallback {
                    Fallback::InMemory => self.read(|s| s.cart.clone()),
                    Fallback::Empty => Cart::new(),
                }
            }
        }
    }

    async fn persist_guest_cart(&self, cart: &Cart) {
        if let Err(e) = self
            .shared
            .guest_carts
            .save(&self.shared.device_id, cart.items())
            .await
        {
            warn!(error = %e, "Failed to persist guest cart");
        }
    }

    async fn delete_guest_cart(&self) {
        if let Err(e) = self.shared.guest_carts.delete(&self.shared.device_id).await {
            warn!(error = %e, "Failed to delete guest cart");
        }
    }

    // =========================================================================
    // Readers (derived values are computed on every call)
    // =========================================================================

    pub fn snapshot(&self) -> CartSnapshot {
        self.read(|s| CartSnapshot {
            items: s.cart.items().to_vec(),
            totals: s.cart.totals(),
            is_loading: s.is_loading,
            has_loaded: s.has_loaded,
            last_error: s.last_error.clone(),
            user_id: s.identity.as_ref().map(|i| i.user_id().to_string()),
        })
    }

    /// Copy of the cart, for composing an order.
    pub fn cart(&self) -> Cart {
        self.read(|s| s.cart.clone())
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.read(|s| s.cart.items().to_vec())
    }

    /// Σ unit price × quantity.
    pub fn cart_total(&self) -> Money {
        self.read(|s| s.cart.subtotal())
    }

    /// Σ quantity.
    pub fn cart_item_count(&self) -> i64 {
        self.read(|s| s.cart.item_count())
    }

    pub fn is_loading(&self) -> bool {
        self.read(|s| s.is_loading)
    }

    /// True once any load has completed.
    pub fn has_loaded(&self) -> bool {
        self.read(|s| s.has_loaded)
    }

    pub fn last_error(&self) -> Option<String> {
        self.read(|s| s.last_error.clone())
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read(|s| s.identity.clone())
    }

    /// What the checkout guards need to know about the cart.
    pub fn presence(&self) -> CartPresence {
        self.read(|s| CartPresence {
            loaded: s.has_loaded,
            empty: s.cart.is_empty(),
        })
    }

    fn read<R>(&self, f: impl FnOnce(&CartState) -> R) -> R {
        f(&lock(&self.shared.state))
    }

    fn write<R>(&self, f: impl FnOnce(&mut CartState) -> R) -> R {
        f(&mut lock(&self.shared.state))
    }
}

/// What to use when the guest store cannot be read.
#[derive(Debug, Clone, Copy)]
enum Fallback {
    /// Keep working on the cart already in memory.
    InMemory,
    Empty,
}

// =============================================================================
// Unit Tests
// =============================================================================
