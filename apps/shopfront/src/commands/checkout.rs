//! # Checkout Commands
//!
//! One command per wizard action. Redirects come back as `StageAccess`
//! from `enter_stage`, or as a `REDIRECT` payload carrying the target when
//! an action is attempted out of order.

use serde::Serialize;
use tracing::debug;

use shopfront_core::validation::ShippingForm;
use shopfront_core::{CheckoutStage, StageAccess};

use crate::error::ErrorPayload;
use crate::state::{CheckoutPipeline, CheckoutStatus, OrderReview};

/// Answer to a successful `place_order`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: String,
    pub message: Option<String>,
    pub stage: CheckoutStage,
}

pub async fn get_checkout(checkout: &CheckoutPipeline) -> Result<CheckoutStatus, ErrorPayload> {
    debug!("get_checkout command");
    Ok(checkout.status().await?)
}

/// Navigates to a stage; guards may send the shopper elsewhere.
pub async fn enter_stage(
    checkout: &CheckoutPipeline,
    stage: CheckoutStage,
) -> Result<StageAccess, ErrorPayload> {
    debug!(?stage, "enter_stage command");
    Ok(checkout.enter(stage).await?)
}

/// Validates and stages the shipping address.
///
/// ## Returns
/// The next stage, or a `VALIDATION_ERROR` payload whose `fields` hold one
/// message per empty field.
pub async fn submit_shipping(
    checkout: &CheckoutPipeline,
    form: &ShippingForm,
) -> Result<CheckoutStage, ErrorPayload> {
    debug!("submit_shipping command");
    Ok(checkout.submit_shipping(form).await?)
}

pub async fn select_payment_method(
    checkout: &CheckoutPipeline,
    method: &str,
) -> Result<CheckoutStage, ErrorPayload> {
    debug!(method, "select_payment_method command");
    Ok(checkout.select_payment_method(method).await?)
}

pub async fn get_review(checkout: &CheckoutPipeline) -> Result<OrderReview, ErrorPayload> {
    debug!("get_review command");
    Ok(checkout.review().await?)
}

/// Submits the order.
pub async fn place_order(checkout: &CheckoutPipeline) -> Result<OrderConfirmation, ErrorPayload> {
    debug!("place_order command");
    let receipt = checkout.place_order().await?;
    Ok(OrderConfirmation {
        order_id: receipt.order_id,
        message: receipt.message,
        stage: checkout.stage(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::fakes::{product, shipping_form, FakeOrderGateway, FakeRemoteCart};
    use crate::state::CartManager;
    use shopfront_core::{CheckoutPricing, RedirectTarget};
    use shopfront_db::{Database, DbConfig};
    use std::sync::Arc;

    async fn setup() -> (CartManager, CheckoutPipeline) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cart = CartManager::new(Arc::new(FakeRemoteCart::default()), &db, "device-1");
        cart.load_cart().await.unwrap();
        let checkout = CheckoutPipeline::new(
            cart.clone(),
            Arc::new(FakeOrderGateway::default()),
            &db,
            "device-1",
            CheckoutPricing::default(),
        );
        (cart, checkout)
    }

    #[tokio::test]
    async fn test_full_checkout() {
        let (cart, checkout) = setup().await;
        cart.add_item(&product("p1", 1000), 2).await.unwrap();
        cart.add_item(&product("p2", 500), 1).await.unwrap();

        submit_shipping(&checkout, &shipping_form()).await.unwrap();
        select_payment_method(&checkout, "cod").await.unwrap();
        let review = get_review(&checkout).await.unwrap();
        assert_eq!(review.summary.grand_total.cents(), 3700);

        let confirmation = place_order(&checkout).await.unwrap();
        assert_eq!(
            confirmation.stage,
            CheckoutStage::Submitted {
                order_id: confirmation.order_id.clone()
            }
        );

        let json = serde_json::to_value(&confirmation).unwrap();
        assert_eq!(json["stage"]["stage"], "submitted");
        assert_eq!(json["orderId"], "order-1");
    }

    #[tokio::test]
    async fn test_review_out_of_order_is_redirect_payload() {
        let (cart, checkout) = setup().await;
        cart.add_item(&product("p1", 1000), 1).await.unwrap();

        let err = get_review(&checkout).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Redirect);
        assert_eq!(err.redirect, Some(RedirectTarget::ShippingEntry));
    }

    #[tokio::test]
    async fn test_shipping_field_errors() {
        let (cart, checkout) = setup().await;
        cart.add_item(&product("p1", 1000), 1).await.unwrap();

        let mut form = shipping_form();
        form.full_name.clear();
        form.phone.clear();
        let err = submit_shipping(&checkout, &form).await.unwrap_err();

        let fields = err.fields.unwrap();
        assert_eq!(fields.get("fullName"), Some("Full Name is required"));
        assert_eq!(fields.get("phone"), Some("Phone Number is required"));
    }
}
