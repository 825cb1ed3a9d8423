//! # Guest Cart Repository
//!
//! Device-local cart for shoppers who are not signed in.
//!
//! ## Storage Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  guest_carts                                                            │
//! │  ┌──────────────┬──────────────────────────────────────┬─────────────┐  │
//! │  │ device_id PK │ items_json                           │ updated_at  │  │
//! │  ├──────────────┼──────────────────────────────────────┼─────────────┤  │
//! │  │ 6f1c…        │ [{"productId":"p1","quantity":2,…}]  │ 2026-…Z     │  │
//! │  └──────────────┴──────────────────────────────────────┴─────────────┘  │
//! │                                                                         │
//! │  Every save replaces the whole array. A device that never added        │
//! │  anything has no row, which reads back as an empty cart.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use shopfront_core::CartItem;

/// Repository for the device-local guest cart.
#[derive(Debug, Clone)]
pub struct GuestCartRepository {
    pool: SqlitePool,
}

impl GuestCartRepository {
    /// Creates a new GuestCartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        GuestCartRepository { pool }
    }

    /// Reads the stored cart lines for a device.
    ///
    /// Returns an empty list when nothing was ever saved.
    pub async fn load(&self, device_id: &str) -> DbResult<Vec<CartItem>> {
        let items_json: Option<String> =
            sqlx::query_scalar("SELECT items_json FROM guest_carts WHERE device_id = ?1")
                .bind(device_id)
                .fetch_optional(&self.pool)
                .await?;

        match items_json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replaces the stored cart lines for a device.
    pub async fn save(&self, device_id: &str, items: &[CartItem]) -> DbResult<()> {
        let items_json = serde_json::to_string(items)?;

        debug!(device_id = %device_id, lines = items.len(), "Saving guest cart");

        sqlx::query(
            r#"
            INSERT INTO guest_carts (device_id, items_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(device_id) DO UPDATE SET
                items_json = excluded.items_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(device_id)
        .bind(items_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes the stored cart for a device.
    pub async fn delete(&self, device_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM guest_carts WHERE device_id = ?1")
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use shopfront_core::Money;

    async fn repo() -> GuestCartRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.guest_carts()
    }

    #[tokio::test]
    async fn test_missing_cart_loads_empty() {
        let repo = repo().await;
        assert!(repo.load("device-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_lines_and_order() {
        let repo = repo().await;
        let mut mug = CartItem::new("p1", "Mug", Money::from_cents(1000), 2);
        mug.slug = Some("mug".to_string());
        let items = vec![mug, CartItem::new("p2", "Tea", Money::from_cents(500), 1)];

        repo.save("device-1", &items).await.unwrap();

        assert_eq!(repo.load("device-1").await.unwrap(), items);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_cart() {
        let repo = repo().await;
        repo.save(
            "device-1",
            &[CartItem::new("p1", "Mug", Money::from_cents(1000), 2)],
        )
        .await
        .unwrap();
        repo.save("device-1", &[]).await.unwrap();

        assert!(repo.load("device-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_devices_are_isolated_and_delete() {
        let repo = repo().await;
        let items = vec![CartItem::new("p1", "Mug", Money::from_cents(1000), 1)];
        repo.save("device-1", &items).await.unwrap();
        repo.save("device-2", &items).await.unwrap();

        repo.delete("device-1").await.unwrap();

        assert!(repo.load("device-1").await.unwrap().is_empty());
        assert_eq!(repo.load("device-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_reported() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            "INSERT INTO guest_carts (device_id, items_json, updated_at) VALUES ('d', 'oops', 'now')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = db.guest_carts().load("d").await.unwrap_err();
        assert!(matches!(err, crate::DbError::Serialization(_)));
    }
}
