//! # Shopfront
//!
//! Cart state manager, checkout pipeline and order history for the
//! storefront, wired to the device-local store and the remote store API.
//!
//! ## Module Organization
//! ```text
//! shopfront/
//! ├── lib.rs          ◄─── You are here (wiring & tracing)
//! ├── main.rs         ◄─── `shopfront` command line front end
//! ├── state/
//! │   ├── cart.rs     ◄─── CartManager
//! │   ├── checkout.rs ◄─── CheckoutPipeline
//! │   ├── orders.rs   ◄─── OrderHistory
//! │   └── config.rs   ◄─── StorefrontConfig
//! ├── commands/       ◄─── Thin commands returning serializable values
//! └── error.rs        ◄─── AppError and ErrorPayload
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. init_tracing()                                                      │
//! │  2. StorefrontConfig::load(path)      defaults → file → env → validate  │
//! │  3. Storefront::connect(config)                                         │
//! │       ├── Database::new(db path)      migrations applied                │
//! │       ├── StoreApiClient::new(api)    one client for cart and orders    │
//! │       ├── CartManager                 guest scope                       │
//! │       ├── CheckoutPipeline            resumed from staged data          │
//! │       └── OrderHistory                                                  │
//! │  4. cart.load_cart() or cart.sign_in(identity)                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod state;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shopfront_api::{OrderGateway, RemoteCart, StoreApiClient};
use shopfront_db::{Database, DbConfig};

use crate::error::AppResult;
use crate::state::{CartManager, CheckoutPipeline, OrderHistory, StorefrontConfig};

/// Everything a front end needs, built from one configuration.
#[derive(Debug, Clone)]
pub struct Storefront {
    config: StorefrontConfig,
    db: Database,
    cart: CartManager,
    checkout: CheckoutPipeline,
    orders: OrderHistory,
}

impl Storefront {
    /// Opens the local database, builds the store API client and wires the
    /// state objects together.
    pub async fn connect(config: StorefrontConfig) -> AppResult<Self> {
        let db_path = config.database_path()?;
        info!(?db_path, "Database path determined");

        let db = Database::new(DbConfig::new(db_path)).await?;
        info!("Database connected and migrations applied");

        let client = Arc::new(StoreApiClient::new(&config.api)?);
        info!(base_url = %client.base_url(), "Store API client ready");

        let storefront = Self::with_backends(config, db, client.clone(), client);
        if let Err(e) = storefront.checkout.resume().await {
            warn!(error = %e, "Could not resume checkout");
        }
        Ok(storefront)
    }

    /// Wires the state objects around existing backends.
    pub fn with_backends(
        config: StorefrontConfig,
        db: Database,
        remote: Arc<dyn RemoteCart>,
        orders: Arc<dyn OrderGateway>,
    ) -> Self {
        let cart = CartManager::new(remote, &db, config.device_id());
        let checkout = CheckoutPipeline::new(
            cart.clone(),
            orders.clone(),
            &db,
            config.device_id(),
            config.pricing(),
        );
        let orders = OrderHistory::new(cart.clone(), orders);

        Storefront {
            config,
            db,
            cart,
            checkout,
            orders,
        }
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn cart(&self) -> &CartManager {
        &self.cart
    }

    pub fn checkout(&self) -> &CheckoutPipeline {
        &self.checkout
    }

    pub fn orders(&self) -> &OrderHistory {
        &self.orders
    }

    /// Closes the database pool.
    pub async fn close(&self) {
        self.db.close().await;
        info!("Storefront closed");
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=shopfront_api=trace` - Trace the store API client only
/// - Default: INFO, DEBUG for the app itself
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shopfront=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
