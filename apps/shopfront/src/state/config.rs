//! # Storefront Configuration
//!
//! Read once at startup, read-only afterwards.
//!
//! ## Load Order (later overrides earlier)
//! 1. Defaults (this file)
//! 2. Config file (`shopfront.toml` in the platform config dir, or `--config`)
//! 3. Environment variables (`SHOPFRONT_*`)
//! 4. A device id is generated if none is set, and written back
//! 5. Validation
//!
//! ## Example
//! ```toml
//! [api]
//! base_url = "https://store.example.com/api"
//! timeout_secs = 15
//!
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//!
//! [storage]
//! db_path = "/var/lib/shopfront/shopfront.db"
//!
//! [checkout]
//! shipping_cost_cents = 1000
//! tax_rate_bps = 800
//! ```

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shopfront_api::ApiSettings;
use shopfront_core::validation::{validate_price_cents, validate_tax_rate_bps};
use shopfront_core::{
    CheckoutPricing, Money, TaxRate, DEFAULT_SHIPPING_COST_CENTS, DEFAULT_TAX_RATE_BPS,
};

use crate::error::{AppError, AppResult};

const CONFIG_FILE_NAME: &str = "shopfront.toml";
const DATABASE_FILE_NAME: &str = "shopfront.db";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "shopfront", "shopfront")
}

// =============================================================================
// Sections
// =============================================================================

/// The device this client runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Anonymous device id. Keys the guest cart and the checkout session.
    #[serde(default)]
    pub id: String,
}

/// Device-local storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file. Defaults to `shopfront.db` in the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

fn default_shipping_cost_cents() -> i64 {
    DEFAULT_SHIPPING_COST_CENTS
}

fn default_tax_rate_bps() -> u32 {
    DEFAULT_TAX_RATE_BPS
}

/// Order pricing applied on top of the cart subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Flat shipping charge per order
    #[serde(default = "default_shipping_cost_cents")]
    pub shipping_cost_cents: i64,

    /// Sales tax on the subtotal, e.g. 800 = 8%
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            shipping_cost_cents: default_shipping_cost_cents(),
            tax_rate_bps: default_tax_rate_bps(),
        }
    }
}

// =============================================================================
// Storefront Config
// =============================================================================

/// Complete storefront configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub checkout: CheckoutConfig,
}

impl StorefrontConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// A device id generated here is saved to the same file so the guest
    /// cart survives restarts. Failing to save is logged, not fatal.
    pub fn load(config_path: Option<PathBuf>) -> AppResult<Self> {
        let path = config_path.or_else(Self::default_config_path);
        let mut config = Self::default();

        if let Some(ref path) = path {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                let contents = std::fs::read_to_string(path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();

        if config.ensure_device_id() {
            info!(device_id = %config.device.id, "Generated device id");
            if let Err(e) = config.save(path) {
                warn!(error = %e, "Failed to save generated device id");
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> AppResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| AppError::Config("No config path available".into()))?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Storefront config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> AppResult<()> {
        if self.device.id.trim().is_empty() {
            return Err(AppError::Config("device id must not be empty".into()));
        }

        self.api.validate()?;
        validate_price_cents(self.checkout.shipping_cost_cents)?;
        validate_tax_rate_bps(self.checkout.tax_rate_bps)?;

        Ok(())
    }

    /// Applies `SHOPFRONT_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("SHOPFRONT_API_URL") {
            debug!(url = %url, "Overriding API base URL from environment");
            self.api.base_url = url;
        }

        if let Some(secs) = var("SHOPFRONT_API_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.api.timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid SHOPFRONT_API_TIMEOUT_SECS"),
            }
        }

        if let Some(path) = var("SHOPFRONT_DB_PATH") {
            self.storage.db_path = Some(PathBuf::from(path));
        }

        if let Some(id) = var("SHOPFRONT_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Some(cents) = var("SHOPFRONT_SHIPPING_COST_CENTS") {
            match cents.parse::<i64>() {
                Ok(c) => self.checkout.shipping_cost_cents = c,
                Err(_) => warn!(value = %cents, "Ignoring invalid SHOPFRONT_SHIPPING_COST_CENTS"),
            }
        }

        if let Some(bps) = var("SHOPFRONT_TAX_RATE_BPS") {
            match bps.parse::<u32>() {
                Ok(b) => self.checkout.tax_rate_bps = b,
                Err(_) => warn!(value = %bps, "Ignoring invalid SHOPFRONT_TAX_RATE_BPS"),
            }
        }
    }

    /// Fills in a fresh device id when none is set. Returns true if it did.
    fn ensure_device_id(&mut self) -> bool {
        if !self.device.id.trim().is_empty() {
            return false;
        }
        self.device.id = Uuid::new_v4().to_string();
        true
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// SQLite file path: the configured one, else the platform data dir.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.shopfront.shopfront/shopfront.db`
    /// - **Windows**: `%APPDATA%\shopfront\shopfront\data\shopfront.db`
    /// - **Linux**: `~/.local/share/shopfront/shopfront.db`
    pub fn database_path(&self) -> AppResult<PathBuf> {
        if let Some(ref path) = self.storage.db_path {
            return Ok(path.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
            .ok_or_else(|| AppError::Config("Could not determine app data directory".into()))
    }

    /// Shipping and tax for order totals.
    pub fn pricing(&self) -> CheckoutPricing {
        CheckoutPricing {
            shipping_cost: Money::from_cents(self.checkout.shipping_cost_cents),
            tax_rate: TaxRate::from_bps(self.checkout.tax_rate_bps),
        }
    }
}
