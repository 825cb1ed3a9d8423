//! # Config Commands
//!
//! Read-only view of the loaded configuration.

use serde::Serialize;
use tracing::debug;

use crate::state::StorefrontConfig;

/// What the front end may know about the configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub api_base_url: String,
    pub device_id: String,
    pub database_path: Option<String>,
    pub shipping_cost_cents: i64,
    pub tax_rate_bps: u32,
}

/// Gets the current configuration.
///
/// ## When Used
/// - Startup diagnostics
/// - Showing shipping and tax before the review step
pub fn get_config(config: &StorefrontConfig) -> ConfigView {
    debug!("get_config command");
    ConfigView {
        api_base_url: config.api.base_url.clone(),
        device_id: config.device_id().to_string(),
        database_path: config
            .database_path()
            .ok()
            .map(|p| p.display().to_string()),
        shipping_cost_cents: config.checkout.shipping_cost_cents,
        tax_rate_bps: config.checkout.tax_rate_bps,
    }
}
