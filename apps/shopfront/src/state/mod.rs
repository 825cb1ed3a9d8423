//! # State Module
//!
//! Long-lived application state. Each type owns one concern and is a cheap
//! cloneable handle, so any number of views can hold it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌──────────────┐    ┌──────────────────┐    ┌──────────────┐          │
//! │  │ CartManager  │◄───│ CheckoutPipeline │    │ OrderHistory │          │
//! │  │ (cart.rs)    │    │ (checkout.rs)    │    │ (orders.rs)  │          │
//! │  └──────┬───────┘    └────────┬─────────┘    └──────┬───────┘          │
//! │         │                     │                     │                   │
//! │    RemoteCart            OrderGateway          OrderGateway             │
//! │    guest_carts           checkout_sessions     identity from the cart   │
//! │                                                                         │
//! │  StorefrontConfig (config.rs): read once at startup                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod checkout;
mod config;
mod orders;

#[cfg(test)]
pub(crate) mod fakes;

pub use cart::{CartManager, CartSnapshot, LoadOutcome, MergeReport};
pub use checkout::{CheckoutPipeline, CheckoutStatus, OrderReview};
pub use config::{CheckoutConfig, DeviceConfig, StorageConfig, StorefrontConfig};
pub use orders::OrderHistory;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a state mutex. A panic while holding it leaves plain data behind,
/// so a poisoned lock is recovered rather than propagated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
