//! # Repository Module
//!
//! One repository per table. Each holds a clone of the pool and is cheap to
//! create, so callers fetch a fresh one from [`Database`](crate::Database)
//! for every operation.

pub mod checkout_session;
pub mod guest_cart;

pub use checkout_session::CheckoutSessionRepository;
pub use guest_cart::GuestCartRepository;
