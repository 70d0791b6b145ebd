//! Order assembler
//!
//! Orchestrates the checkout pipeline: resolve the location, enforce the
//! single-pending-checkout invariant, validate the fulfillment time,
//! validate the coupon, price every item, compute totals, persist the
//! Pending order, then dispatch payment. Every validation step runs before
//! anything is written; a partial order is never persisted.

use chrono::{Local, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use thiserror::Error;

use shared::order::{
    DeliveryInfo, MealSelection, OrderStatus, PaymentMethod, PaymentStatus, PricedLineItem,
};

use crate::carts::{CartError, CartService};
use crate::coupons::{CouponError, CouponValidator};
use crate::db::models::{Coupon, OrderRecord};
use crate::db::repository::{LocationRepository, MealRepository, OrderRepository, RepoError};
use crate::payments::{PaymentError, PaymentGateway, PaymentInitiation};
use crate::pricing::money::to_decimal;
use crate::pricing::{PricingError, compute_totals, price_meal_selection};
use crate::utils::AppError;

/// Checkout failures
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Invalid location ID: {0}")]
    InvalidLocation(String),

    #[error("A pending payment already exists")]
    PendingPaymentExists {
        order_id: String,
        payment_url: Option<String>,
    },

    #[error("{0}")]
    InvalidOrderDate(String),

    #[error("Empty cart")]
    EmptyCart,

    #[error("Invalid meal in order: {0}")]
    InvalidMealInOrder(String),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidLocation(id) => {
                AppError::NotFound(format!("Location {id} not found"))
            }
            CheckoutError::PendingPaymentExists {
                order_id,
                payment_url,
            } => AppError::PendingPayment {
                order_id,
                payment_url,
            },
            CheckoutError::InvalidOrderDate(msg) => AppError::Validation(msg),
            CheckoutError::EmptyCart => AppError::Validation("Empty cart".into()),
            CheckoutError::InvalidMealInOrder(id) => {
                AppError::Validation(format!("Invalid meal in order: {id}"))
            }
            CheckoutError::Coupon(CouponError::InvalidOrExpired) => {
                AppError::Validation("Invalid or expired coupon".into())
            }
            CheckoutError::Coupon(CouponError::Repo(e)) => e.into(),
            CheckoutError::Cart(e) => match e {
                CartError::Repo(e) => e.into(),
                other => AppError::Validation(other.to_string()),
            },
            CheckoutError::Payment(e) => e.into(),
            CheckoutError::Repo(e) => e.into(),
        }
    }
}

/// Incoming checkout request, already shape-validated at the API edge
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub location_id: String,
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryInfo,
    /// Requested fulfillment date, `YYYY-MM-DD`
    pub order_date: String,
    /// Requested fulfillment time, `HH:MM`
    pub order_time: String,
    pub coupon_name: Option<String>,
    /// Inline meal list; when absent the user's cart is used
    pub meals: Option<Vec<MealSelection>>,
}

/// A placed order plus how payment proceeds
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: OrderRecord,
    /// Redirect the customer here to pay (card / PayPal)
    pub payment_url: Option<String>,
    /// Whether payment settled synchronously (wallet)
    pub settled: bool,
}

#[derive(Clone)]
pub struct CheckoutService {
    locations: LocationRepository,
    meals: MealRepository,
    orders: OrderRepository,
    carts: CartService,
    coupons: CouponValidator,
    gateway: PaymentGateway,
}

impl CheckoutService {
    pub fn new(
        locations: LocationRepository,
        meals: MealRepository,
        orders: OrderRepository,
        carts: CartService,
        coupons: CouponValidator,
        gateway: PaymentGateway,
    ) -> Self {
        Self {
            locations,
            meals,
            orders,
            carts,
            coupons,
            gateway,
        }
    }

    /// Create a Pending order and dispatch its payment.
    pub async fn create_order(
        &self,
        user_id: &str,
        customer_email: Option<&str>,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        // 1. Resolve the location (tax rate source).
        let location = self
            .locations
            .find_active(&request.location_id)
            .await?
            .ok_or_else(|| CheckoutError::InvalidLocation(request.location_id.clone()))?;

        // 2. One unresolved redirect checkout per user. Surface the existing
        //    handle so the client can resume instead of double-charging.
        if request.payment_method.is_redirect()
            && let Some(existing) = self.orders.find_pending_redirect_by_user(user_id).await?
        {
            return Err(CheckoutError::PendingPaymentExists {
                payment_url: existing.payment_url().map(str::to_string),
                order_id: existing.order_id,
            });
        }

        // 3. The requested fulfillment time must not be in the past.
        validate_order_schedule(&request.order_date, &request.order_time)?;

        // 4. Coupon, if named.
        let coupon: Option<Coupon> = match &request.coupon_name {
            Some(name) => Some(self.coupons.validate(name, user_id).await?),
            None => None,
        };

        // 5. Item source: inline list wins, otherwise the cart.
        let (selections, from_cart) = match request.meals {
            Some(meals) if !meals.is_empty() => (meals, false),
            _ => {
                let cart = self
                    .carts
                    .find_cart(user_id)
                    .await?
                    .filter(|c| !c.meals.is_empty())
                    .ok_or(CheckoutError::EmptyCart)?;
                (cart.meals, true)
            }
        };

        // 6. Price every item, accumulating the subtotal.
        let mut items: Vec<PricedLineItem> = Vec::with_capacity(selections.len());
        let mut subtotal = Decimal::ZERO;
        for selection in &selections {
            let meal = self.meals.find_by_id(&selection.meal_id).await?;
            let resolved = self.carts.resolve_addons(selection).await?;
            let item = price_meal_selection(meal.as_ref(), selection, &resolved).map_err(|e| {
                match e {
                    PricingError::InvalidMeal(id) => CheckoutError::InvalidMealInOrder(id),
                    PricingError::InvalidQuantity { meal_id, .. } => {
                        CheckoutError::InvalidMealInOrder(meal_id)
                    }
                }
            })?;
            subtotal += to_decimal(item.line_total);
            items.push(item);
        }

        // 7. Discount, tax, total.
        let totals = compute_totals(subtotal, coupon.as_ref(), location.tax_rate);

        // 8. Persist the Pending snapshot.
        let now = shared::util::now_millis();
        let order = OrderRecord {
            order_id: shared::util::next_id("ord"),
            custom_id: shared::util::next_id("cus"),
            location_id: location.location_id.clone(),
            user_id: user_id.to_string(),
            delivery: request.delivery,
            items,
            coupon_id: coupon.as_ref().map(|c| c.coupon_id.clone()),
            discount: totals.discount,
            discounted_subtotal: totals.discounted_subtotal,
            tax: totals.tax,
            total_price: totals.total,
            payment_method: request.payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            order_date: request.order_date,
            order_time: request.order_time,
            reason: None,
            invoice_url: None,
            invoice_key: None,
            checkout_session_url: None,
            approval_url: None,
            updated_by: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        let order = self.orders.create(&order).await?;
        tracing::info!(
            order = %order.order_id,
            user = %user_id,
            total = order.total_price,
            method = ?order.payment_method,
            "Order placed"
        );

        // 9. Post-creation actions: consume the coupon, clear the cart the
        //    items came from.
        if let Some(coupon) = &coupon {
            self.coupons.mark_used(&coupon.coupon_id, user_id).await?;
        }
        if from_cart {
            self.carts.clear_all(user_id).await?;
        }

        // 10. Dispatch payment. A wallet shortfall or provider failure
        //     leaves the order Pending/unpaid (the idle sweep reclaims it).
        let initiation = self.gateway.initiate(&order, customer_email).await?;

        // 11. Hand back the order in its post-payment state.
        let (payment_url, settled) = match initiation {
            PaymentInitiation::Settled => (None, true),
            PaymentInitiation::Redirect(url) => (Some(url), false),
        };
        let order = self
            .orders
            .find_by_id(&order.order_id)
            .await?
            .unwrap_or(order);

        Ok(CheckoutOutcome {
            order,
            payment_url,
            settled,
        })
    }
}

/// The fulfillment date must be today or later; a same-day order must name
/// a time later than the current clock time.
fn validate_order_schedule(order_date: &str, order_time: &str) -> Result<(), CheckoutError> {
    let date = NaiveDate::parse_from_str(order_date, "%Y-%m-%d").map_err(|_| {
        CheckoutError::InvalidOrderDate(
            "Invalid order date. Please provide a valid date in 'YYYY-MM-DD' format.".into(),
        )
    })?;
    let time = NaiveTime::parse_from_str(order_time, "%H:%M").map_err(|_| {
        CheckoutError::InvalidOrderDate(
            "Invalid order time. Please provide a valid time in 'HH:MM' format.".into(),
        )
    })?;

    let now = Local::now().naive_local();
    if date < now.date() {
        return Err(CheckoutError::InvalidOrderDate(
            "Order date must be today or in the future.".into(),
        ));
    }
    if date == now.date() && time <= now.time() {
        return Err(CheckoutError::InvalidOrderDate(format!(
            "Invalid appointment time. Please select a time later than the current moment ({}).",
            now.time().format("%H:%M")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::{AddonOption, Location, Meal};
    use crate::db::repository::{
        AddonRepository, CartRepository, CouponRepository, OutboxRepository, WalletRepository,
    };
    use crate::invoice::{InvoiceService, LoggingBlobStore, TextInvoiceRenderer};
    use crate::loyalty::LoyaltyLedger;
    use crate::notify::Notifier;
    use crate::orders::OrderLifecycle;
    use crate::payments::provider::*;
    use crate::utils::KeyedMutex;
    use async_trait::async_trait;
    use shared::order::AddonKind;
    use std::sync::Arc;
    use surrealdb::Surreal;
    use surrealdb::engine::local::Db;

    struct FakeCard;

    #[async_trait]
    impl HostedCheckoutProvider for FakeCard {
        async fn create_session(
            &self,
            order: &OrderRecord,
            _customer_email: Option<&str>,
        ) -> Result<CheckoutSession, PaymentError> {
            Ok(CheckoutSession {
                session_id: "cs_test".into(),
                url: format!("https://checkout.example/pay/{}", order.order_id),
            })
        }

        async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError> {
            Ok(SessionStatus {
                session_id: session_id.to_string(),
                paid: true,
                order_id: None,
            })
        }
    }

    struct FakePayPal;

    #[async_trait]
    impl RedirectCheckoutProvider for FakePayPal {
        async fn create_order(&self, order: &OrderRecord) -> Result<ProviderOrder, PaymentError> {
            Ok(ProviderOrder {
                provider_order_id: "pp_test".into(),
                approval_url: format!("https://paypal.example/approve/{}", order.custom_id),
            })
        }

        async fn capture(&self, _token: &str) -> Result<CaptureResult, PaymentError> {
            Ok(CaptureResult { completed: true })
        }

        async fn verify_webhook(
            &self,
            _headers: &WebhookHeaders,
            _event: &serde_json::Value,
        ) -> Result<bool, PaymentError> {
            Ok(true)
        }
    }

    struct Fixture {
        db: Surreal<Db>,
        checkout: CheckoutService,
        carts: CartService,
        orders: OrderRepository,
        meals: MealRepository,
        coupons: CouponRepository,
        ledger: LoyaltyLedger,
    }

    async fn setup() -> Fixture {
        let db = db::connect_in_memory().await.unwrap();
        let locks = Arc::new(KeyedMutex::new());

        let meals = MealRepository::new(db.clone());
        let addons = AddonRepository::new(db.clone());
        let orders = OrderRepository::new(db.clone());
        let locations = LocationRepository::new(db.clone());
        let coupons = CouponRepository::new(db.clone());

        let carts = CartService::new(
            CartRepository::new(db.clone()),
            meals.clone(),
            addons.clone(),
            locks.clone(),
        );
        let validator = CouponValidator::new(coupons.clone());
        let ledger = LoyaltyLedger::new(WalletRepository::new(db.clone()), locks.clone());
        let lifecycle = OrderLifecycle::new(
            orders.clone(),
            validator.clone(),
            ledger.clone(),
            InvoiceService::new(
                Arc::new(TextInvoiceRenderer),
                Arc::new(LoggingBlobStore),
                orders.clone(),
            ),
            Notifier::new(OutboxRepository::new(db.clone())),
        );
        let gateway = PaymentGateway::new(
            Arc::new(FakeCard),
            Arc::new(FakePayPal),
            orders.clone(),
            ledger.clone(),
            lifecycle,
        );
        let checkout = CheckoutService::new(
            locations.clone(),
            meals.clone(),
            orders.clone(),
            carts.clone(),
            validator,
            gateway,
        );

        locations
            .create(&Location {
                location_id: "loc_1".into(),
                title: "Downtown".into(),
                address: "1 Main St".into(),
                phone: "555-0100".into(),
                tax_rate: 7.0,
                storefront_url: "https://downtown.example".into(),
                is_deleted: false,
                created_at: 0,
            })
            .await
            .unwrap();

        Fixture {
            db,
            checkout,
            carts,
            orders,
            meals,
            coupons,
            ledger,
        }
    }

    fn delivery() -> DeliveryInfo {
        DeliveryInfo {
            address: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            phone: "555-0100".into(),
        }
    }

    fn request(method: PaymentMethod, meals: Option<Vec<MealSelection>>) -> CheckoutRequest {
        CheckoutRequest {
            location_id: "loc_1".into(),
            payment_method: method,
            delivery: delivery(),
            order_date: "2100-01-01".into(),
            order_time: "18:30".into(),
            coupon_name: None,
            meals,
        }
    }

    async fn seed_meal(fixture: &Fixture, id: &str, price: f64) {
        fixture
            .meals
            .create(&Meal {
                meal_id: id.into(),
                title: format!("Meal {id}"),
                description: None,
                final_price: price,
                final_combo_price: price + 2.0,
                is_combo: true,
                is_available: true,
                is_deleted: false,
                wish_users: vec![],
                created_at: 0,
            })
            .await
            .unwrap();
    }

    fn selection(meal_id: &str, quantity: i32) -> MealSelection {
        MealSelection {
            meal_id: meal_id.into(),
            quantity,
            is_combo: false,
            sauces: vec![],
            drinks: vec![],
            sides: vec![],
        }
    }

    #[tokio::test]
    async fn card_checkout_from_cart_clears_cart_and_stores_redirect() {
        let fixture = setup().await;
        seed_meal(&fixture, "m1", 25.0).await;
        fixture
            .carts
            .add_meal("usr_1", selection("m1", 2))
            .await
            .unwrap();

        let outcome = fixture
            .checkout
            .create_order("usr_1", Some("u@example.com"), request(PaymentMethod::Card, None))
            .await
            .unwrap();

        assert!(!outcome.settled);
        let url = outcome.payment_url.unwrap();
        assert!(url.contains(&outcome.order.order_id));
        assert_eq!(outcome.order.status, OrderStatus::Pending);
        assert_eq!(outcome.order.checkout_session_url.as_deref(), Some(url.as_str()));

        // 2 x 25 = 50 subtotal, 7% tax
        assert_eq!(outcome.order.discounted_subtotal, 50.0);
        assert_eq!(outcome.order.tax, 3.5);
        assert_eq!(outcome.order.total_price, 53.5);

        // Cart emptied
        let cart = fixture.carts.find_cart("usr_1").await.unwrap().unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn coupon_discount_and_tax_match_reference_scenario() {
        let fixture = setup().await;
        seed_meal(&fixture, "m1", 50.0).await;
        fixture
            .coupons
            .create(&Coupon {
                coupon_id: "cpn_1".into(),
                name: "SAVE10".into(),
                amount: 10.0,
                expire_at: i64::MAX,
                used_by: vec![],
                is_deleted: false,
                created_by: None,
                updated_by: None,
                created_at: 0,
            })
            .await
            .unwrap();

        let mut req = request(PaymentMethod::Card, Some(vec![selection("m1", 1)]));
        req.coupon_name = Some("save10".into());

        let outcome = fixture
            .checkout
            .create_order("usr_1", None, req)
            .await
            .unwrap();

        // $50 - 10% = $45; 7% tax on $45 = $3.15; total $48.15
        assert_eq!(outcome.order.discount, 5.0);
        assert_eq!(outcome.order.discounted_subtotal, 45.0);
        assert_eq!(outcome.order.tax, 3.15);
        assert_eq!(outcome.order.total_price, 48.15);

        // Coupon consumed only after the order persisted.
        let coupon = fixture.coupons.find_by_id("cpn_1").await.unwrap().unwrap();
        assert_eq!(coupon.used_by, vec!["usr_1".to_string()]);
    }

    #[tokio::test]
    async fn empty_cart_and_no_inline_meals_is_rejected() {
        let fixture = setup().await;
        let err = fixture
            .checkout
            .create_order("usr_1", None, request(PaymentMethod::Card, None))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[tokio::test]
    async fn unknown_location_is_rejected_before_anything_is_written() {
        let fixture = setup().await;
        seed_meal(&fixture, "m1", 10.0).await;
        let mut req = request(PaymentMethod::Card, Some(vec![selection("m1", 1)]));
        req.location_id = "loc_ghost".into();

        let err = fixture
            .checkout
            .create_order("usr_1", None, req)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidLocation(_)));
        assert!(fixture.orders.find_all(10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn past_date_is_rejected() {
        let fixture = setup().await;
        seed_meal(&fixture, "m1", 10.0).await;
        let mut req = request(PaymentMethod::Card, Some(vec![selection("m1", 1)]));
        req.order_date = "2020-01-01".into();

        let err = fixture
            .checkout
            .create_order("usr_1", None, req)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidOrderDate(_)));
    }

    #[tokio::test]
    async fn deleted_meal_in_inline_list_aborts_without_persisting() {
        let fixture = setup().await;
        seed_meal(&fixture, "m1", 10.0).await;

        let req = request(
            PaymentMethod::Card,
            Some(vec![selection("m1", 1), selection("ghost", 1)]),
        );
        let err = fixture
            .checkout
            .create_order("usr_1", None, req)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidMealInOrder(_)));
        assert!(fixture.orders.find_all(10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_redirect_checkout_surfaces_existing_payment_url() {
        let fixture = setup().await;
        seed_meal(&fixture, "m1", 10.0).await;

        let first = fixture
            .checkout
            .create_order(
                "usr_1",
                None,
                request(PaymentMethod::Card, Some(vec![selection("m1", 1)])),
            )
            .await
            .unwrap();

        let err = fixture
            .checkout
            .create_order(
                "usr_1",
                None,
                request(PaymentMethod::PayPal, Some(vec![selection("m1", 1)])),
            )
            .await
            .unwrap_err();

        match err {
            CheckoutError::PendingPaymentExists {
                order_id,
                payment_url,
            } => {
                assert_eq!(order_id, first.order.order_id);
                assert_eq!(payment_url, first.payment_url);
            }
            other => panic!("expected PendingPaymentExists, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn wallet_checkout_settles_synchronously_and_rewards() {
        let fixture = setup().await;
        seed_meal(&fixture, "m1", 10.0).await;

        // Fund the wallet: 2000 points -> $20.
        fixture.ledger.reward("usr_1", "seed", 200.0).await.unwrap();
        fixture.ledger.redeem("usr_1", 2000).await.unwrap();

        let outcome = fixture
            .checkout
            .create_order(
                "usr_1",
                Some("u@example.com"),
                request(PaymentMethod::Wallet, Some(vec![selection("m1", 1)])),
            )
            .await
            .unwrap();

        assert!(outcome.settled);
        assert!(outcome.payment_url.is_none());
        assert_eq!(outcome.order.status, OrderStatus::Processing);
        assert_eq!(outcome.order.payment_status, PaymentStatus::Paid);

        // 10.70 debited, reward credited for the paid order.
        let wallet = fixture.ledger.wallet("usr_1").await.unwrap();
        assert_eq!(wallet.balance, 9.3);
        assert!(
            wallet
                .transactions
                .iter()
                .any(|t| t.order_id.as_deref() == Some(outcome.order.order_id.as_str())
                    && t.kind == crate::db::models::TransactionKind::Reward)
        );
    }

    #[tokio::test]
    async fn wallet_shortfall_leaves_order_pending_and_unpaid() {
        let fixture = setup().await;
        seed_meal(&fixture, "m1", 10.0).await;

        // Balance $5 < total $10.70
        fixture.ledger.reward("usr_1", "seed", 50.0).await.unwrap();
        fixture.ledger.redeem("usr_1", 500).await.unwrap();

        let err = fixture
            .checkout
            .create_order(
                "usr_1",
                None,
                request(PaymentMethod::Wallet, Some(vec![selection("m1", 1)])),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Payment(PaymentError::Ledger(
                crate::loyalty::LedgerError::InsufficientBalance { .. }
            ))
        ));

        // The order exists, still Pending/unpaid, and the balance is intact.
        let orders = fixture.orders.find_by_user("usr_1", 10, 0).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Pending);
        assert_eq!(orders[0].payment_status, PaymentStatus::Pending);
        assert_eq!(fixture.ledger.wallet("usr_1").await.unwrap().balance, 5.0);
    }

    #[tokio::test]
    async fn cancelled_order_releases_coupon_for_reuse() {
        let fixture = setup().await;
        seed_meal(&fixture, "m1", 10.0).await;
        fixture
            .coupons
            .create(&Coupon {
                coupon_id: "cpn_1".into(),
                name: "SAVE10".into(),
                amount: 10.0,
                expire_at: i64::MAX,
                used_by: vec![],
                is_deleted: false,
                created_by: None,
                updated_by: None,
                created_at: 0,
            })
            .await
            .unwrap();

        let mut req = request(PaymentMethod::Card, Some(vec![selection("m1", 1)]));
        req.coupon_name = Some("SAVE10".into());
        let outcome = fixture
            .checkout
            .create_order("usr_1", None, req)
            .await
            .unwrap();

        // Same coupon again while the first order is alive: rejected.
        let mut req = request(PaymentMethod::Card, Some(vec![selection("m1", 1)]));
        req.coupon_name = Some("SAVE10".into());
        let err = fixture
            .checkout
            .create_order("usr_2", None, req.clone())
            .await;
        assert!(err.is_ok(), "other users are unaffected");
        let err = fixture
            .checkout
            .create_order("usr_1", None, req.clone())
            .await
            .unwrap_err();
        // usr_1 already has a pending card order, so the pending-payment
        // invariant fires first; cancel it to get to the coupon check.
        assert!(matches!(err, CheckoutError::PendingPaymentExists { .. }));

        // Cancel the original order; coupon usage must release.
        let lifecycle = OrderLifecycle::new(
            fixture.orders.clone(),
            CouponValidator::new(fixture.coupons.clone()),
            fixture.ledger.clone(),
            InvoiceService::new(
                Arc::new(TextInvoiceRenderer),
                Arc::new(LoggingBlobStore),
                fixture.orders.clone(),
            ),
            Notifier::new(OutboxRepository::new(fixture.db.clone())),
        );
        lifecycle
            .cancel(&outcome.order.order_id, "usr_1", None)
            .await
            .unwrap();

        let mut req = request(PaymentMethod::Card, Some(vec![selection("m1", 1)]));
        req.coupon_name = Some("SAVE10".into());
        let outcome = fixture
            .checkout
            .create_order("usr_1", None, req)
            .await
            .unwrap();
        assert_eq!(outcome.order.discount, 1.0);
    }
}
