//! # shopfront-api: Remote Store Client for Shopfront
//!
//! Talks to the store's cart and order service over HTTP/JSON.
//!
//! ## Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   apps/shopfront                                                        │
//! │   ┌──────────────┐  ┌──────────────────┐  ┌──────────────┐             │
//! │   │ CartManager  │  │ CheckoutPipeline │  │ OrderHistory │             │
//! │   └──────┬───────┘  └────────┬─────────┘  └──────┬───────┘             │
//! │          │ RemoteCart        │ OrderGateway      │ OrderGateway        │
//! │          ▼                   ▼                   ▼                      │
//! │   ┌─────────────────────────────────────────────────────────────┐      │
//! │   │                      StoreApiClient                         │      │
//! │   │  GET/POST/PUT/DELETE /cart     POST /checkout               │      │
//! │   │  GET /orders/{user}            GET /orders/{user}/{order}   │      │
//! │   └─────────────────────────────────────────────────────────────┘      │
//! │                                                                         │
//! │   Signed-in calls carry `Authorization: Bearer <token>`.               │
//! │   Guest checkout is the only call made without an identity.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use shopfront_api::{ApiSettings, Identity, RemoteCart, StoreApiClient};
//!
//! let client = StoreApiClient::new(&ApiSettings::new("https://store.example.com"))?;
//! let items = client.fetch_cart(&Identity::new("user-1", token)).await?;
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod dto;
pub mod error;
pub mod ports;

pub use auth::Identity;
pub use client::StoreApiClient;
pub use config::ApiSettings;
pub use error::{ApiError, ApiResult};
pub use ports::{OrderGateway, OrderReceipt, RemoteCart};
