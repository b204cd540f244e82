use std::{env, time::Duration};

use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sepay_tools::SepayConfig;
use shop_common::{parse_boolean_flag, Secret};

use crate::errors::ServerError;

const DEFAULT_SHOP_HOST: &str = "127.0.0.1";
const DEFAULT_SHOP_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/shop.db";
const DEFAULT_POLL_COOLDOWN_MS: u64 = 5_000;
const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 8_000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_SWEEP_WINDOW_HOURS: u64 = 24;
const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub payments: PaymentConfig,
    pub sepay: SepayConfig,
    /// If set, SePay webhook deliveries must carry `Authorization: Apikey <key>`.
    pub webhook_api_key: Option<Secret<String>>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SHOP_HOST.to_string(),
            port: DEFAULT_SHOP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            payments: PaymentConfig::default(),
            sepay: SepayConfig::default(),
            webhook_api_key: None,
            use_x_forwarded_for: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SHOP_HOST").ok().unwrap_or_else(|| DEFAULT_SHOP_HOST.into());
        let port = env::var("SHOP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SHOP_PORT. {e} Using the default, {DEFAULT_SHOP_PORT}, instead."
                    );
                    DEFAULT_SHOP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SHOP_PORT);
        let database_url = env::var("SHOP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SHOP_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let payments = PaymentConfig::from_env_or_default();
        let sepay = SepayConfig::new_from_env_or_default().with_timeout(payments.provider_timeout);
        let webhook_api_key = env::var("SEPAY_WEBHOOK_API_KEY").ok().filter(|k| !k.trim().is_empty()).map(Secret::new);
        if webhook_api_key.is_none() {
            warn!(
                "🪛️ SEPAY_WEBHOOK_API_KEY is not set. Webhook deliveries will be accepted without an API key. Anyone \
                 who can reach /payments/webhook can report transfers."
            );
        }
        let use_x_forwarded_for = parse_boolean_flag(env::var("SHOP_USE_X_FORWARDED_FOR").ok(), false);
        Self { host, port, database_url, auth, payments, sepay, webhook_api_key, use_x_forwarded_for }
    }
}

//-------------------------------------------------  PaymentConfig  ----------------------------------------------------
#[derive(Clone, Copy, Debug)]
pub struct PaymentConfig {
    /// The minimum time between two provider lookups for the same order.
    pub poll_cooldown: Duration,
    /// Upper bound on one provider lookup. A lookup that takes longer is treated as "not paid yet".
    pub provider_timeout: Duration,
    /// Period of the background payment sweep. `None` disables the sweep.
    pub sweep_interval: Option<Duration>,
    /// How far back the sweep looks for unpaid orders.
    pub sweep_window: chrono::Duration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            poll_cooldown: Duration::from_millis(DEFAULT_POLL_COOLDOWN_MS),
            provider_timeout: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
            sweep_interval: Some(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)),
            sweep_window: hours(DEFAULT_SWEEP_WINDOW_HOURS),
        }
    }
}

impl PaymentConfig {
    pub fn from_env_or_default() -> Self {
        let poll_cooldown = Duration::from_millis(env_u64("SHOP_POLL_COOLDOWN_MS", DEFAULT_POLL_COOLDOWN_MS));
        let provider_timeout = Duration::from_millis(env_u64("SHOP_PROVIDER_TIMEOUT_MS", DEFAULT_PROVIDER_TIMEOUT_MS));
        let sweep_interval = match env_u64("SHOP_PAYMENT_SWEEP_INTERVAL", DEFAULT_SWEEP_INTERVAL_SECS) {
            0 => {
                info!("🪛️ SHOP_PAYMENT_SWEEP_INTERVAL is 0. The background payment sweep is disabled.");
                None
            },
            secs => Some(Duration::from_secs(secs)),
        };
        let sweep_window = hours(env_u64("SHOP_PAYMENT_SWEEP_WINDOW", DEFAULT_SWEEP_WINDOW_HOURS));
        Self { poll_cooldown, provider_timeout, sweep_interval, sweep_window }
    }
}

// Capped at a century, which keeps chrono well away from overflow
fn hours(h: u64) -> chrono::Duration {
    chrono::Duration::hours(i64::try_from(h.min(876_000)).unwrap_or(876_000))
}

fn env_u64(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(s) => s.trim().parse::<u64>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name} ({s}). {e}. Using the default, {default}.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret shared with the service that issues access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. No externally issued \
             access token will be accepted. DO NOT operate on production like this. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("SHOP_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [SHOP_JWT_SECRET]")))?;
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ServerError::ConfigurationError(format!(
                "SHOP_JWT_SECRET must be at least {MIN_JWT_SECRET_LENGTH} characters long"
            )));
        }
        Ok(Self::new(secret))
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The part of the configuration that route handlers need. It carries no secrets, so it is safe to hand to every
/// worker.
#[derive(Clone, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    /// The bank and account embedded in payment QR codes.
    pub bank_code: String,
    pub account_no: String,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            bank_code: config.sepay.bank_code.clone(),
            account_no: config.sepay.account_no.clone(),
        }
    }
}
