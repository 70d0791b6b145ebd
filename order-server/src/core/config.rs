/// Server configuration - all configurable knobs of the order backend
///
/// # Environment variables
///
/// Every item can be overridden through the environment:
///
/// | Variable | Default | Purpose |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/storefront | Working directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | FRONTEND_URL | http://localhost:5173 | Redirect target after hosted checkout |
/// | CARD_API_BASE | https://api.stripe.com | Card provider API base |
/// | CARD_SECRET_KEY | (empty) | Card provider secret key |
/// | CARD_WEBHOOK_SECRET | (empty) | Card webhook signing secret |
/// | PAYPAL_API_BASE | https://api-m.paypal.com | PayPal provider API base |
/// | PAYPAL_CLIENT_ID | (empty) | PayPal client id |
/// | PAYPAL_CLIENT_SECRET | (empty) | PayPal client secret |
/// | PAYPAL_WEBHOOK_ID | (empty) | PayPal webhook id for verification |
/// | PENDING_ORDER_TTL_MINUTES | 30 | Idle sweep cutoff for unpaid orders |
/// | SWEEP_INTERVAL_SECS | 60 | Idle sweep period |
/// | OUTBOX_POLL_SECS | 5 | Notification outbox poll period |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/storefront HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for database files and logs
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Frontend base URL for post-payment redirects
    pub frontend_url: String,

    // === Card provider (hosted checkout) ===
    pub card_api_base: String,
    pub card_secret_key: String,
    pub card_webhook_secret: String,

    // === PayPal provider (approval redirect) ===
    pub paypal_api_base: String,
    pub paypal_client_id: String,
    pub paypal_client_secret: String,
    pub paypal_webhook_id: String,

    // === Background tasks ===
    /// Pending orders older than this are swept away
    pub pending_order_ttl_minutes: i64,
    /// How often the idle sweep runs
    pub sweep_interval_secs: u64,
    /// How often the notification outbox worker polls for pending records
    pub outbox_poll_secs: u64,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/storefront".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),

            card_api_base: std::env::var("CARD_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".into()),
            card_secret_key: std::env::var("CARD_SECRET_KEY").unwrap_or_default(),
            card_webhook_secret: std::env::var("CARD_WEBHOOK_SECRET").unwrap_or_default(),

            paypal_api_base: std::env::var("PAYPAL_API_BASE")
                .unwrap_or_else(|_| "https://api-m.paypal.com".into()),
            paypal_client_id: std::env::var("PAYPAL_CLIENT_ID").unwrap_or_default(),
            paypal_client_secret: std::env::var("PAYPAL_CLIENT_SECRET").unwrap_or_default(),
            paypal_webhook_id: std::env::var("PAYPAL_WEBHOOK_ID").unwrap_or_default(),

            pending_order_ttl_minutes: std::env::var("PENDING_ORDER_TTL_MINUTES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(60),
            outbox_poll_secs: std::env::var("OUTBOX_POLL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5),
        }
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Whether this is a development deployment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
