//! Gateway credentials and endpoints, loaded from the environment.

use std::env;
use std::time::Duration;

/// Daraja API configuration.
///
/// Defaults point at the sandbox with its public test shortcode, so a
/// development build runs without any environment setup.
#[derive(Debug, Clone)]
pub struct MpesaConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub passkey: String,
    pub short_code: String,
    pub base_url: String,
    pub callback_url: String,
    pub timeout: Duration,
}

impl MpesaConfig {
    pub fn from_env() -> Self {
        Self {
            consumer_key: env::var("MPESA_CONSUMER_KEY").unwrap_or_default(),
            consumer_secret: env::var("MPESA_CONSUMER_SECRET").unwrap_or_default(),
            passkey: env::var("MPESA_PASSKEY").unwrap_or_default(),
            short_code: env::var("MPESA_SHORT_CODE").unwrap_or_else(|_| "174379".to_string()),
            base_url: env::var("MPESA_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.safaricom.co.ke".to_string()),
            callback_url: env::var("MPESA_CALLBACK_URL")
                .unwrap_or_else(|_| "https://example.com/payments/callback".to_string()),
            timeout: env::var("MPESA_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(30)),
        }
    }
}

impl Default for MpesaConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_the_sandbox() {
        let config = MpesaConfig {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            passkey: String::new(),
            short_code: "174379".to_string(),
            base_url: "https://sandbox.safaricom.co.ke".to_string(),
            callback_url: "https://example.com/payments/callback".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert!(config.base_url.contains("sandbox"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
