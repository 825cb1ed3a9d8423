//! # Checkout Session Repository
//!
//! Staged checkout data, kept between wizard steps and across restarts.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stage_shipping()        → row created, shipping_address set           │
//! │  stage_payment_method()  → payment_method set (address untouched)      │
//! │  idempotency_key(fp)     → key kept while fp matches, else replaced    │
//! │       │                                                                 │
//! │       ├── order rejected  → row kept; identical retry reuses the key   │
//! │       ├── order edited    → new fingerprint, new key                   │
//! │       └── order accepted  → clear() deletes the row                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use shopfront_core::{PaymentMethod, ShippingAddress, StagedCheckout};

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    shipping_address: Option<String>,
    payment_method: Option<String>,
    idempotency_key: Option<String>,
}

impl TryFrom<SessionRow> for StagedCheckout {
    type Error = DbError;

    fn try_from(row: SessionRow) -> DbResult<Self> {
        let shipping_address = row
            .shipping_address
            .map(|json| serde_json::from_str::<ShippingAddress>(&json))
            .transpose()?;
        let payment_method = row
            .payment_method
            .map(|s| s.parse::<PaymentMethod>())
            .transpose()
            .map_err(|e| DbError::Serialization(e.to_string()))?;

        Ok(StagedCheckout {
            shipping_address,
            payment_method,
            idempotency_key: row.idempotency_key,
        })
    }
}

/// Repository for staged checkout data.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRepository {
    pool: SqlitePool,
}

impl CheckoutSessionRepository {
    /// Creates a new CheckoutSessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutSessionRepository { pool }
    }

    /// Reads the staged data. A session with nothing staged reads as default.
    pub async fn load(&self, session_id: &str) -> DbResult<StagedCheckout> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT shipping_address, payment_method, idempotency_key
            FROM checkout_sessions
            WHERE session_id = ?1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => StagedCheckout::try_from(row),
            None => Ok(StagedCheckout::default()),
        }
    }

    /// Stores the validated shipping address, replacing any earlier one.
    pub async fn stage_shipping(&self, session_id: &str, address: &ShippingAddress) -> DbResult<()> {
        let json = serde_json::to_string(address)?;
        debug!(session_id = %session_id, "Staging shipping address");

        sqlx::query(
            r#"
            INSERT INTO checkout_sessions (session_id, shipping_address, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id) DO UPDATE SET
                shipping_address = excluded.shipping_address,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Stores the chosen payment method.
    pub async fn stage_payment_method(
        &self,
        session_id: &str,
        method: PaymentMethod,
    ) -> DbResult<()> {
        debug!(session_id = %session_id, method = %method, "Staging payment method");

        sqlx::query(
            r#"
            INSERT INTO checkout_sessions (session_id, payment_method, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id) DO UPDATE SET
                payment_method = excluded.payment_method,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(method.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the idempotency key for an order with the given fingerprint.
    ///
    /// The stored key is reused only when it was issued for the same
    /// fingerprint, so a plain retry carries the same key while an edited
    /// order gets a fresh one.
    pub async fn idempotency_key(&self, session_id: &str, fingerprint: &str) -> DbResult<String> {
        let candidate = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO checkout_sessions (session_id, idempotency_key, key_fingerprint, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(session_id) DO UPDATE SET
                idempotency_key = CASE
                    WHEN checkout_sessions.idempotency_key IS NOT NULL
                     AND checkout_sessions.key_fingerprint = excluded.key_fingerprint
                    THEN checkout_sessions.idempotency_key
                    ELSE excluded.idempotency_key
                END,
                key_fingerprint = excluded.key_fingerprint,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(&candidate)
        .bind(fingerprint)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let key: Option<String> = sqlx::query_scalar(
            "SELECT idempotency_key FROM checkout_sessions WHERE session_id = ?1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;

        let key = key.ok_or_else(|| DbError::not_found("idempotency key", session_id))?;
        debug!(session_id = %session_id, reused = key != candidate, "Resolved idempotency key");
        Ok(key)
    }

    /// Discards everything staged for the session.
    pub async fn clear(&self, session_id: &str) -> DbResult<()> {
        debug!(session_id = %session_id, "Clearing checkout session");
        sqlx::query("DELETE FROM checkout_sessions WHERE session_id = ?1")
            .bind(session_id)
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

    async fn repo() -> CheckoutSessionRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.checkout_sessions()
    }

    fn address(city: &str) -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            address_line1: "12 St James's Square".to_string(),
            address_line2: None,
            city: city.to_string(),
            state_province: "Greater London".to_string(),
            postal_code: "SW1Y 4JH".to_string(),
            country: "UK".to_string(),
            phone: "020 7946 0000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let repo = repo().await;
        assert_eq!(repo.load("s1").await.unwrap(), StagedCheckout::default());
    }

    #[tokio::test]
    async fn test_staging_steps_do_not_clobber_each_other() {
        let repo = repo().await;
        repo.stage_shipping("s1", &address("London")).await.unwrap();
        repo.stage_payment_method("s1", PaymentMethod::Cod).await.unwrap();

        // Going back to shipping keeps the chosen method.
        repo.stage_shipping("s1", &address("Bath")).await.unwrap();

        let staged = repo.load("s1").await.unwrap();
        assert_eq!(staged.shipping_address.unwrap().city, "Bath");
        assert_eq!(staged.payment_method, Some(PaymentMethod::Cod));
    }

    #[tokio::test]
    async fn test_idempotency_key_is_stable_until_cleared() {
        let repo = repo().await;
        repo.stage_shipping("s1", &address("London")).await.unwrap();

        let first = repo.idempotency_key("s1", "fp-a").await.unwrap();
        let second = repo.idempotency_key("s1", "fp-a").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            repo.load("s1").await.unwrap().idempotency_key.as_deref(),
            Some(first.as_str())
        );

        repo.clear("s1").await.unwrap();
        assert_eq!(repo.load("s1").await.unwrap(), StagedCheckout::default());

        let third = repo.idempotency_key("s1", "fp-a").await.unwrap();
        assert_ne!(first, third);
    }

    #[tokio::test]
    async fn test_idempotency_key_rotates_when_fingerprint_changes() {
        let repo = repo().await;
        repo.stage_shipping("s1", &address("London")).await.unwrap();

        let original = repo.idempotency_key("s1", "fp-a").await.unwrap();
        let edited = repo.idempotency_key("s1", "fp-b").await.unwrap();
        assert_ne!(original, edited);
        assert_eq!(repo.idempotency_key("s1", "fp-b").await.unwrap(), edited);

        // Going back to the first order is a new submission too.
        let reverted = repo.idempotency_key("s1", "fp-a").await.unwrap();
        assert_ne!(reverted, original);
        assert_ne!(reverted, edited);

        // Staged data is untouched by key resolution.
        let staged = repo.load("s1").await.unwrap();
        assert_eq!(staged.shipping_address.unwrap().city, "London");
        assert_eq!(staged.idempotency_key.as_deref(), Some(reverted.as_str()));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let repo = repo().await;
        repo.stage_payment_method("s1", PaymentMethod::Paypal)
            .await
            .unwrap();
        assert_eq!(repo.load("s2").await.unwrap().payment_method, None);
    }
}
