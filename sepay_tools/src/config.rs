use std::time::Duration;

use log::*;
use shop_common::Secret;

pub const DEFAULT_SEPAY_API_URL: &str = "https://my.sepay.vn/userapi";
pub const DEFAULT_BANK_CODE: &str = "MB";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct SepayConfig {
    /// The root of the user API, without a trailing slash.
    pub api_url: String,
    pub api_key: Secret<String>,
    /// The receiving bank account, as embedded in payment QR codes.
    pub account_no: String,
    pub bank_code: String,
    /// Upper bound on a single request to SePay.
    pub timeout: Duration,
}

impl Default for SepayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_SEPAY_API_URL.to_string(),
            api_key: Secret::default(),
            account_no: String::new(),
            bank_code: DEFAULT_BANK_CODE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SepayConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("SEPAY_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_SEPAY_API_URL.to_string());
        let api_key = Secret::new(std::env::var("SEPAY_API_KEY").unwrap_or_else(|_| {
            warn!("SEPAY_API_KEY not set. Payment status checks against SePay will fail.");
            String::new()
        }));
        let account_no = std::env::var("SEPAY_ACCOUNT_NO").unwrap_or_else(|_| {
            warn!("SEPAY_ACCOUNT_NO not set. Payment QR codes will not name a receiving account.");
            String::new()
        });
        let bank_code = std::env::var("SEPAY_BANK_CODE").unwrap_or_else(|_| DEFAULT_BANK_CODE.to_string());
        Self { api_url, api_key, account_no, bank_code, timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
