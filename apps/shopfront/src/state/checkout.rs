//! # Checkout Pipeline
//!
//! The three-step checkout wizard and order submission.
//!
//! ## Stage Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ShippingEntry ──submit_shipping──► PaymentSelection                    │
//! │                                          │                              │
//! │                               select_payment_method                     │
//! │                                          ▼                              │
//! │                                     OrderReview ──place_order──►        │
//! │                                          ▲          Submitted{order_id} │
//! │                                          │                │             │
//! │                                          └── on failure ──┘             │
//! │                                                                         │
//! │  Staged data (address, method, idempotency key) lives in the           │
//! │  checkout_sessions row for this device until an order succeeds.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Idempotency
//! The key is created on the first submission attempt and stays staged
//! until the order service accepts the order. It is tied to the order's
//! fingerprint: a retry of the same order after a failure (or a timeout the
//! service actually processed) sends the same key, while a retry after the
//! shopper edited the address, method or cart gets a fresh one.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info, warn};

use shopfront_api::{OrderGateway, OrderReceipt};
use shopfront_core::checkout::guard_stage;
use shopfront_core::validation::{validate_shipping_form, ShippingForm};
use shopfront_core::{
    CartItem, CheckoutPricing, CheckoutStage, OrderSubmission, OrderSummary, PaymentMethod,
    RedirectTarget, ShippingAddress, StageAccess, StagedCheckout,
};
use shopfront_db::{CheckoutSessionRepository, Database};

use super::cart::CartManager;
use super::lock;
use crate::error::{AppError, AppResult};

/// The review step's model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReview {
    pub items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub summary: OrderSummary,
}

/// Pipeline state for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStatus {
    pub stage: CheckoutStage,
    pub staged: StagedCheckout,
    pub is_placing_order: bool,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct PipelineState {
    stage: CheckoutStage,
    is_placing_order: bool,
    last_error: Option<String>,
}

struct Inner {
    cart: CartManager,
    orders: Arc<dyn OrderGateway>,
    sessions: CheckoutSessionRepository,
    session_id: String,
    pricing: CheckoutPricing,
    state: Mutex<PipelineState>,
}

/// Checkout wizard for one device. Cheap to clone.
#[derive(Clone)]
pub struct CheckoutPipeline {
    inner: Arc<Inner>,
}

impl fmt::Debug for CheckoutPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutPipeline")
            .field("session_id", &self.inner.session_id)
            .field("stage", &self.stage())
            .finish()
    }
}

/// Holds `is_placing_order` for the length of one submission.
struct InFlight<'a> {
    state: &'a Mutex<PipelineState>,
}

impl<'a> InFlight<'a> {
    fn acquire(state: &'a Mutex<PipelineState>) -> AppResult<Self> {
        let mut s = lock(state);
        if s.is_placing_order {
            return Err(AppError::OrderInFlight);
        }
        s.is_placing_order = true;
        Ok(InFlight { state })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.state).is_placing_order = false;
    }
}

impl CheckoutPipeline {
    /// Creates a pipeline at ShippingEntry. Staged data is keyed by
    /// `session_id` (the device id).
    pub fn new(
        cart: CartManager,
        orders: Arc<dyn OrderGateway>,
        db: &Database,
        session_id: impl Into<String>,
        pricing: CheckoutPricing,
    ) -> Self {
        CheckoutPipeline {
            inner: Arc::new(Inner {
                cart,
                orders,
                sessions: db.checkout_sessions(),
                session_id: session_id.into(),
                pricing,
                state: Mutex::new(PipelineState::default()),
            }),
        }
    }

    /// Moves to the furthest stage the staged data allows, so a wizard left
    /// half-way resumes where it stopped.
    pub async fn resume(&self) -> AppResult<CheckoutStage> {
        let staged = self.staged().await?;
        let stage = match (&staged.shipping_address, staged.payment_method) {
            (Some(_), Some(_)) => CheckoutStage::OrderReview,
            (Some(_), None) => CheckoutStage::PaymentSelection,
            _ => CheckoutStage::ShippingEntry,
        };
        debug!(?stage, "Checkout resumed");
        self.set_stage(stage.clone());
        Ok(stage)
    }

    // =========================================================================
    // Stage Transitions
    // =========================================================================

    /// Enters a stage, or lands wherever its guard redirects.
    ///
    /// Entering an earlier stage never clears data staged by later ones.
    pub async fn enter(&self, stage: CheckoutStage) -> AppResult<StageAccess> {
        let staged = self.staged().await?;
        let access = guard_stage(&stage, self.inner.cart.presence(), &staged);

        match access {
            StageAccess::Allow => self.set_stage(stage),
            StageAccess::Redirect(target) => {
                debug!(?stage, ?target, "Checkout stage redirected");
                if let Some(landing) = target.stage() {
                    self.set_stage(landing);
                }
            }
        }
        Ok(access)
    }

    /// ShippingEntry → PaymentSelection.
    ///
    /// ## Errors
    /// `InvalidShipping` with one message per empty required field. The
    /// stage does not change.
    pub async fn submit_shipping(&self, form: &ShippingForm) -> AppResult<CheckoutStage> {
        debug!("submit_shipping");
        let address = validate_shipping_form(form).map_err(AppError::InvalidShipping)?;

        self.inner
            .sessions
            .stage_shipping(&self.inner.session_id, &address)
            .await?;

        self.set_stage(CheckoutStage::PaymentSelection);
        Ok(CheckoutStage::PaymentSelection)
    }

    /// PaymentSelection → OrderReview, from a raw value such as `"paypal"`.
    ///
    /// ## Errors
    /// `Validation` for anything but `credit_card`, `paypal` or `cod`.
    pub async fn select_payment_method(&self, method: &str) -> AppResult<CheckoutStage> {
        let method: PaymentMethod = method.parse()?;
        self.choose_payment_method(method).await
    }

    /// PaymentSelection → OrderReview.
    pub async fn choose_payment_method(&self, method: PaymentMethod) -> AppResult<CheckoutStage> {
        debug!(%method, "choose_payment_method");
        let staged = self.staged().await?;
        if staged.shipping_address.is_none() {
            self.set_stage(CheckoutStage::ShippingEntry);
            return Err(AppError::Redirect(RedirectTarget::ShippingEntry));
        }

        self.inner
            .sessions
            .stage_payment_method(&self.inner.session_id, method)
            .await?;

        self.set_stage(CheckoutStage::OrderReview);
        Ok(CheckoutStage::OrderReview)
    }

    /// Items, address, method and the price breakdown.
    ///
    /// ## Errors
    /// `Redirect` under the same guard as entering OrderReview, including
    /// `ProductListing` once the loaded cart is empty.
    pub async fn review(&self) -> AppResult<OrderReview> {
        let staged = self.staged().await?;
        self.require_review(&staged)?;

        let (Some(shipping_address), Some(payment_method)) =
            (staged.shipping_address, staged.payment_method)
        else {
            return Err(AppError::Redirect(RedirectTarget::ShippingEntry));
        };

        let cart = self.inner.cart.cart();
        Ok(OrderReview {
            summary: self.inner.pricing.summarize(cart.subtotal()),
            items: cart.into_items(),
            shipping_address,
            payment_method,
        })
    }

    // =========================================================================
    // Order Submission
    // =========================================================================

    /// OrderReview → Submitted.
    ///
    /// ## Flow
    /// ```text
    /// place_order()
    ///      │
    ///      ├── already in flight? ──► Err(OrderInFlight)
    ///      │
    ///      ├── guard OrderReview ──► Err(Redirect(..)), stage moved
    ///      │
    ///      ├── compose payload (cart snapshot + staged data + key)
    ///      │
    ///      ├── POST /checkout
    ///      │     ├── Err: stay on OrderReview, last_error set,
    ///      │     │        cart and staged data untouched
    ///      │     └── Ok:  clear session, clear cart,
    ///      │              stage = Submitted { order_id }
    ///      ▼
    /// ```
    pub async fn place_order(&self) -> AppResult<OrderReceipt> {
        let _in_flight = InFlight::acquire(&self.inner.state)?;
        self.set_last_error(None);

        match self.submit_order().await {
            Ok(receipt) => {
                self.set_stage(CheckoutStage::Submitted {
                    order_id: receipt.order_id.clone(),
                });
                Ok(receipt)
            }
            Err(AppError::Redirect(target)) => {
                if let Some(landing) = target.stage() {
                    self.set_stage(landing);
                }
                Err(AppError::Redirect(target))
            }
            Err(e) => {
                warn!(error = %e, "Order submission failed");
                self.set_stage(CheckoutStage::OrderReview);
                self.set_last_error(Some(e.to_string()));
                Err(e)
            }
        }
    }

    async fn submit_order(&self) -> AppResult<OrderReceipt> {
        let session_id = self.inner.session_id.as_str();
        let staged = self.staged().await?;

        self.require_review(&staged)?;

        let identity = self.inner.cart.identity();
        let mut submission = OrderSubmission::compose(
            identity.as_ref().map(|i| i.user_id().to_string()),
            &self.inner.cart.cart(),
            &staged,
            &self.inner.pricing,
            String::new(),
        )?;
        submission.idempotency_key = self
            .inner
            .sessions
            .idempotency_key(session_id, &submission.fingerprint())
            .await?;

        info!(
            idempotency_key = %submission.idempotency_key,
            lines = submission.items.len(),
            total = %submission.order_total(),
            guest = identity.is_none(),
            "Placing order"
        );
        let receipt = self
            .inner
            .orders
            .create_order(identity.as_ref(), &submission)
            .await?;
        info!(order_id = %receipt.order_id, "Order placed");

        if let Err(e) = self.inner.sessions.clear(session_id).await {
            warn!(error = %e, "Failed to clear checkout session");
        }
        self.inner.cart.clear_after_checkout().await;

        Ok(receipt)
    }

    fn require_review(&self, staged: &StagedCheckout) -> AppResult<()> {
        match guard_stage(&CheckoutStage::OrderReview, self.inner.cart.presence(), staged) {
            StageAccess::Allow => Ok(()),
            StageAccess::Redirect(target) => Err(AppError::Redirect(target)),
        }
    }

    // =========================================================================
    // Readers
    // =========================================================================

    pub fn stage(&self) -> CheckoutStage {
        lock(&self.inner.state).stage.clone()
    }

    pub fn is_placing_order(&self) -> bool {
        lock(&self.inner.state).is_placing_order
    }

    /// Message of the last failed submission, cleared on the next attempt.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner.state).last_error.clone()
    }

    pub fn pricing(&self) -> CheckoutPricing {
        self.inner.pricing
    }

    /// The data staged so far.
    pub async fn staged(&self) -> AppResult<StagedCheckout> {
        Ok(self.inner.sessions.load(&self.inner.session_id).await?)
    }

    pub async fn status(&self) -> AppResult<CheckoutStatus> {
        let staged = self.staged().await?;
        let state = lock(&self.inner.state);
        Ok(CheckoutStatus {
            stage: state.stage.clone(),
            staged,
            is_placing_order: state.is_placing_order,
            last_error: state.last_error.clone(),
        })
    }

    fn set_stage(&self, stage: CheckoutStage) {
        lock(&self.inner.state).stage = stage;
    }

    fn set_last_error(&self, error: Option<String>) {
        lock(&self.inner.state).last_error = error;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fakes::{product, shipping_form, FakeOrderGateway, FakeRemoteCart};
    use shopfront_api::Identity;
    use shopfront_db::DbConfig;

    struct Fixture {
        cart: CartManager,
        checkout: CheckoutPipeline,
        orders: Arc<FakeOrderGateway>,
        db: Database,
    }

    async fn setup() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cart = CartManager::new(Arc::new(FakeRemoteCart::default()), &db, "device-1");
        cart.load_cart().await.unwrap();
        let orders = Arc::new(FakeOrderGateway::default());
        let checkout = CheckoutPipeline::new(
            cart.clone(),
            orders.clone(),
            &db,
            "device-1",
            CheckoutPricing::default(),
        );
        Fixture {
            cart,
            checkout,
            orders,
            db,
        }
    }

    async fn filled(f: &Fixture) {
        f.cart.add_item(&product("p1", 1000), 2).await.unwrap();
        f.cart.add_item(&product("p2", 500), 1).await.unwrap();
    }

    async fn ready_for_review(f: &Fixture) {
        filled(f).await;
        f.checkout.submit_shipping(&shipping_form()).await.unwrap();
        f.checkout.select_payment_method("credit_card").await.unwrap();
    }

    #[tokio::test]
    async fn test_shipping_with_empty_field_does_not_advance() {
        let f = setup().await;
        filled(&f).await;

        let mut form = shipping_form();
        form.city = "   ".to_string();
        let err = f.checkout.submit_shipping(&form).await.unwrap_err();

        match err {
            AppError::InvalidShipping(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields.get("city"), Some("City is required"));
            }
            other => panic!("expected InvalidShipping, got {:?}", other),
        }
        assert_eq!(f.checkout.stage(), CheckoutStage::ShippingEntry);
        assert!(f.checkout.staged().await.unwrap().shipping_address.is_none());
    }

    #[tokio::test]
    async fn test_wizard_advances() {
        let f = setup().await;
        filled(&f).await;

        let stage = f.checkout.submit_shipping(&shipping_form()).await.unwrap();
        assert_eq!(stage, CheckoutStage::PaymentSelection);

        let stage = f.checkout.select_payment_method("paypal").await.unwrap();
        assert_eq!(stage, CheckoutStage::OrderReview);

        let staged = f.checkout.staged().await.unwrap();
        assert_eq!(staged.payment_method, Some(PaymentMethod::Paypal));
        assert_eq!(staged.shipping_address.unwrap().city, "London");
    }

    #[tokio::test]
    async fn test_unknown_payment_method_rejected() {
        let f = setup().await;
        filled(&f).await;
        f.checkout.submit_shipping(&shipping_form()).await.unwrap();

        let err = f.checkout.select_payment_method("bitcoin").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(f.checkout.stage(), CheckoutStage::PaymentSelection);
    }

    #[tokio::test]
    async fn test_payment_without_address_redirects() {
        let f = setup().await;
        filled(&f).await;

        let err = f.checkout.select_payment_method("cod").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Redirect(RedirectTarget::ShippingEntry)
        ));
    }

    #[tokio::test]
    async fn test_entry_guards() {
        let f = setup().await;

        // Loaded and empty: every stage goes back to the listing
        let access = f.checkout.enter(CheckoutStage::ShippingEntry).await.unwrap();
        assert_eq!(access, StageAccess::Redirect(RedirectTarget::ProductListing));

        filled(&f).await;
        let access = f.checkout.enter(CheckoutStage::OrderReview).await.unwrap();
        assert_eq!(access, StageAccess::Redirect(RedirectTarget::ShippingEntry));
        assert_eq!(f.checkout.stage(), CheckoutStage::ShippingEntry);

        f.checkout.submit_shipping(&shipping_form()).await.unwrap();
        let access = f.checkout.enter(CheckoutStage::OrderReview).await.unwrap();
        assert_eq!(
            access,
            StageAccess::Redirect(RedirectTarget::PaymentSelection)
        );
        assert_eq!(f.checkout.stage(), CheckoutStage::PaymentSelection);
    }

    #[tokio::test]
    async fn test_going_back_keeps_staged_data() {
        let f = setup().await;
        ready_for_review(&f).await;

        let access = f.checkout.enter(CheckoutStage::ShippingEntry).await.unwrap();
        assert_eq!(access, StageAccess::Allow);

        let access = f.checkout.enter(CheckoutStage::OrderReview).await.unwrap();
        assert_eq!(access, StageAccess::Allow);
        assert_eq!(f.checkout.stage(), CheckoutStage::OrderReview);
    }

    #[tokio::test]
    async fn test_review_model() {
        let f = setup().await;
        ready_for_review(&f).await;

        let review = f.checkout.review().await.unwrap();
        assert_eq!(review.items.len(), 2);
        assert_eq!(review.payment_method, PaymentMethod::CreditCard);
        assert_eq!(review.summary.subtotal.cents(), 2500);
        assert_eq!(review.summary.shipping.cents(), 1000);
        assert_eq!(review.summary.tax.cents(), 200);
        assert_eq!(review.summary.grand_total.cents(), 3700);
    }

    #[tokio::test]
    async fn test_review_redirects_when_cart_emptied() {
        let f = setup().await;
        ready_for_review(&f).await;
        f.cart.clear_cart().await.unwrap();

        let err = f.checkout.review().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Redirect(RedirectTarget::ProductListing)
        ));
    }

    #[tokio::test]
    async fn test_review_without_method_redirects_to_payment() {
        let f = setup().await;
        filled(&f).await;
        f.checkout.submit_shipping(&shipping_form()).await.unwrap();

        let err = f.checkout.review().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Redirect(RedirectTarget::PaymentSelection)
        ));
    }

    #[tokio::test]
    async fn test_place_order_success() {
        let f = setup().await;
        ready_for_review(&f).await;

        let receipt = f.checkout.place_order().await.unwrap();

        assert_eq!(receipt.order_id, "order-1");
        assert_eq!(
            f.checkout.stage(),
            CheckoutStage::Submitted {
                order_id: "order-1".to_string()
            }
        );
        assert!(f.cart.items().is_empty());
        assert_eq!(f.checkout.staged().await.unwrap(), StagedCheckout::default());
        assert!(f.db.guest_carts().load("device-1").await.unwrap().is_empty());
        assert!(!f.checkout.is_placing_order());

        let submitted = f.orders.submissions();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].caller, None);
        assert_eq!(submitted[0].submission.user_id, None);
        assert_eq!(submitted[0].submission.order_total().cents(), 3700);
        assert_eq!(submitted[0].submission.items.len(), 2);
    }

    #[tokio::test]
    async fn test_place_order_failure_leaves_everything_in_place() {
        let f = setup().await;
        ready_for_review(&f).await;
        f.orders.set_failing(true);

        let err = f.checkout.place_order().await.unwrap_err();

        assert!(matches!(err, AppError::Api(_)));
        assert_eq!(f.checkout.stage(), CheckoutStage::OrderReview);
        assert_eq!(
            f.checkout.last_error().as_deref(),
            Some("Store temporarily unavailable")
        );
        assert!(!f.checkout.is_placing_order());
        assert_eq!(f.cart.cart_item_count(), 3);

        let staged = f.checkout.staged().await.unwrap();
        assert!(staged.shipping_address.is_some());
        assert_eq!(staged.payment_method, Some(PaymentMethod::CreditCard));
    }

    #[tokio::test]
    async fn test_idempotency_key_reused_on_retry_and_rotated_after_success() {
        let f = setup().await;
        ready_for_review(&f).await;

        f.orders.set_failing(true);
        f.checkout.place_order().await.unwrap_err();
        f.orders.set_failing(false);
        f.checkout.place_order().await.unwrap();

        // Second order, same device
        ready_for_review(&f).await;
        f.checkout.place_order().await.unwrap();

        let keys: Vec<String> = f
            .orders
            .submissions()
            .into_iter()
            .map(|r| r.submission.idempotency_key)
            .collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], keys[1]);
        assert_ne!(keys[1], keys[2]);
        assert!(f.checkout.last_error().is_none());
    }

    #[tokio::test]
    async fn test_edited_order_after_failure_gets_new_key() {
        let f = setup().await;
        ready_for_review(&f).await;

        f.orders.set_failing(true);
        f.checkout.place_order().await.unwrap_err();

        // Different city
        let mut form = shipping_form();
        form.city = "Leeds".to_string();
        f.checkout.submit_shipping(&form).await.unwrap();
        f.checkout.select_payment_method("credit_card").await.unwrap();
        f.checkout.place_order().await.unwrap_err();

        // Different method
        f.checkout.select_payment_method("paypal").await.unwrap();
        f.checkout.place_order().await.unwrap_err();

        // Bigger cart
        f.cart.add_item(&product("p2", 500), 1).await.unwrap();
        f.orders.set_failing(false);
        f.checkout.place_order().await.unwrap();

        let keys: Vec<String> = f
            .orders
            .submissions()
            .into_iter()
            .map(|r| r.submission.idempotency_key)
            .collect();
        assert_eq!(keys.len(), 4);
        for (i, key) in keys.iter().enumerate() {
            for other in &keys[i + 1..] {
                assert_ne!(key, other);
            }
        }
    }

    #[tokio::test]
    async fn test_second_place_order_while_in_flight_is_rejected() {
        let f = setup().await;
        ready_for_review(&f).await;

        let (started, release) = f.orders.block_next_order();
        let checkout = f.checkout.clone();
        let first = tokio::spawn(async move { checkout.place_order().await });
        started.notified().await;

        assert!(f.checkout.is_placing_order());
        let err = f.checkout.place_order().await.unwrap_err();
        assert!(matches!(err, AppError::OrderInFlight));

        release.notify_one();
        first.await.unwrap().unwrap();
        assert!(!f.checkout.is_placing_order());
        assert_eq!(f.orders.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_place_order_with_empty_cart_redirects_to_listing() {
        let f = setup().await;
        ready_for_review(&f).await;
        f.cart.clear_cart().await.unwrap();

        let err = f.checkout.place_order().await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Redirect(RedirectTarget::ProductListing)
        ));
        assert!(f.checkout.last_error().is_none());
        assert!(f.orders.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_signed_in_order_carries_user() {
        let f = setup().await;
        f.cart
            .sign_in(Identity::new("alice", "token-a"))
            .await
            .unwrap();
        ready_for_review(&f).await;

        f.checkout.place_order().await.unwrap();

        let submitted = f.orders.submissions();
        assert_eq!(submitted[0].caller.as_deref(), Some("alice"));
        assert_eq!(submitted[0].submission.user_id.as_deref(), Some("alice"));
        assert!(f.cart.items().is_empty());
    }

    #[tokio::test]
    async fn test_resume_picks_furthest_stage() {
        let f = setup().await;
        ready_for_review(&f).await;

        let reopened = CheckoutPipeline::new(
            f.cart.clone(),
            f.orders.clone(),
            &f.db,
            "device-1",
            CheckoutPricing::default(),
        );
        assert_eq!(reopened.stage(), CheckoutStage::ShippingEntry);
        assert_eq!(reopened.resume().await.unwrap(), CheckoutStage::OrderReview);
    }
}
