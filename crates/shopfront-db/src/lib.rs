//! # shopfront-db: Device-Local Storage for Shopfront
//!
//! SQLite storage for the state that belongs to this device: the guest cart
//! and the data staged between checkout steps.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopfront Data Flow                              │
//! │                                                                         │
//! │  CartManager / CheckoutPipeline (apps/shopfront)                       │
//! │       │                                   │                             │
//! │       │ guest scope                       │ customer scope              │
//! │       ▼                                   ▼                             │
//! │  ┌──────────────────────────────┐   shopfront-api (remote store)       │
//! │  │   shopfront-db (THIS CRATE)  │                                       │
//! │  │                              │                                       │
//! │  │  Database ─► GuestCartRepo   │                                       │
//! │  │          └─► CheckoutSession │                                       │
//! │  │  Migrations (embedded)       │                                       │
//! │  └──────────────┬───────────────┘                                       │
//! │                 ▼                                                       │
//! │        <data dir>/shopfront.db                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shopfront_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("shopfront.db")).await?;
//! let items = db.guest_carts().load(&device_id).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{CheckoutSessionRepository, GuestCartRepository};
