//! Server state
//!
//! [`ServerState`] holds the shared singletons: config, the embedded
//! database handle, the per-user lock map, the payment providers, the
//! invoice collaborators, and the realtime transport. Handlers construct
//! the domain services they need from it per request; the services are
//! cheap bundles of repository clones.

use std::sync::Arc;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::carts::CartService;
use crate::checkout::CheckoutService;
use crate::core::Config;
use crate::coupons::CouponValidator;
use crate::db::repository::{
    AddonRepository, CartRepository, CouponRepository, LocationRepository, MealRepository,
    OrderRepository, OutboxRepository, WalletRepository,
};
use crate::invoice::{
    BlobStore, InvoiceRenderer, InvoiceService, LoggingBlobStore, LoggingMailSender, MailSender,
    TextInvoiceRenderer,
};
use crate::loyalty::LoyaltyLedger;
use crate::notify::{Notifier, RealtimeNotifier};
use crate::orders::OrderLifecycle;
use crate::payments::{
    HostedCheckoutProvider, PayPalClient, PaymentGateway, RedirectCheckoutProvider, StripeClient,
};
use crate::utils::{AppError, KeyedMutex};

#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Config,
    /// Embedded database handle
    pub db: Surreal<Db>,
    /// Per-user async locks (cart and wallet read-modify-write)
    pub user_locks: Arc<KeyedMutex>,
    /// Realtime transport for location order alerts
    pub realtime: RealtimeNotifier,
    /// Card provider (hosted checkout)
    pub card: Arc<dyn HostedCheckoutProvider>,
    /// PayPal provider (approval redirect)
    pub paypal: Arc<dyn RedirectCheckoutProvider>,
    /// Invoice collaborators
    pub renderer: Arc<dyn InvoiceRenderer>,
    pub blobs: Arc<dyn BlobStore>,
    pub mailer: Arc<dyn MailSender>,
}

impl ServerState {
    /// Open the datastore and wire up the default collaborators.
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let db = crate::db::connect(&config.work_dir).await?;
        Ok(Self::with_db(config.clone(), db))
    }

    /// Assemble state over an existing database handle (tests use an
    /// in-memory one).
    pub fn with_db(config: Config, db: Surreal<Db>) -> Self {
        let card = Arc::new(StripeClient::new(
            &config.card_api_base,
            &config.card_secret_key,
            &config.frontend_url,
        ));
        let paypal = Arc::new(PayPalClient::new(
            &config.paypal_api_base,
            &config.paypal_client_id,
            &config.paypal_client_secret,
            &config.paypal_webhook_id,
            &config.frontend_url,
        ));
        Self {
            config,
            db,
            user_locks: Arc::new(KeyedMutex::new()),
            realtime: RealtimeNotifier::disabled(),
            card,
            paypal,
            renderer: Arc::new(TextInvoiceRenderer),
            blobs: Arc::new(LoggingBlobStore),
            mailer: Arc::new(LoggingMailSender),
        }
    }

    /// Attach the realtime transport once the Socket.IO layer exists.
    pub fn with_realtime(mut self, realtime: RealtimeNotifier) -> Self {
        self.realtime = realtime;
        self
    }

    // ========== Per-request service constructors ==========

    pub fn cart_service(&self) -> CartService {
        CartService::new(
            CartRepository::new(self.db.clone()),
            MealRepository::new(self.db.clone()),
            AddonRepository::new(self.db.clone()),
            self.user_locks.clone(),
        )
    }

    pub fn coupon_validator(&self) -> CouponValidator {
        CouponValidator::new(CouponRepository::new(self.db.clone()))
    }

    pub fn ledger(&self) -> LoyaltyLedger {
        LoyaltyLedger::new(
            WalletRepository::new(self.db.clone()),
            self.user_locks.clone(),
        )
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::new(OutboxRepository::new(self.db.clone()))
    }

    pub fn invoice_service(&self) -> InvoiceService {
        InvoiceService::new(
            self.renderer.clone(),
            self.blobs.clone(),
            OrderRepository::new(self.db.clone()),
        )
    }

    pub fn lifecycle(&self) -> OrderLifecycle {
        OrderLifecycle::new(
            OrderRepository::new(self.db.clone()),
            self.coupon_validator(),
            self.ledger(),
            self.invoice_service(),
            self.notifier(),
        )
    }

    pub fn gateway(&self) -> PaymentGateway {
        PaymentGateway::new(
            self.card.clone(),
            self.paypal.clone(),
            OrderRepository::new(self.db.clone()),
            self.ledger(),
            self.lifecycle(),
        )
    }

    pub fn checkout_service(&self) -> CheckoutService {
        CheckoutService::new(
            LocationRepository::new(self.db.clone()),
            MealRepository::new(self.db.clone()),
            OrderRepository::new(self.db.clone()),
            self.cart_service(),
            self.coupon_validator(),
            self.gateway(),
        )
    }
}
