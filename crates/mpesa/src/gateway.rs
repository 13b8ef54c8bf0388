//! Daraja STK-push client behind a trait seam.

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use common::{Money, PhoneNumber};
use serde::{Deserialize, Serialize};

use crate::config::MpesaConfig;
use crate::error::MpesaError;

/// What the order core asks the gateway to do.
#[derive(Debug, Clone)]
pub struct StkPushRequest {
    pub phone: PhoneNumber,
    pub amount: Money,
    pub account_reference: String,
    pub description: String,
}

/// The gateway accepted the push; the prompt is on the customer's phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StkPushAccepted {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub customer_message: Option<String>,
}

/// Result of a synchronous status query for a pending push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StkQueryOutcome {
    Success,
    Failed { code: String, description: String },
    /// The gateway has not settled the transaction yet.
    Pending,
}

/// Outbound gateway seam. The production implementation talks to
/// Daraja; tests use [`MockGateway`].
#[async_trait]
pub trait StkGateway: Send + Sync {
    async fn initiate_push(&self, request: &StkPushRequest) -> Result<StkPushAccepted, MpesaError>;
    async fn query_status(&self, checkout_request_id: &str) -> Result<StkQueryOutcome, MpesaError>;
}

// ----- wire types ----------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushPayload<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: String,
    transaction_type: &'static str,
    amount: i64,
    party_a: &'a str,
    party_b: &'a str,
    phone_number: &'a str,
    #[serde(rename = "CallBackURL")]
    callback_url: &'a str,
    account_reference: &'a str,
    transaction_desc: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
    response_code: Option<String>,
    response_description: Option<String>,
    customer_message: Option<String>,
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkQueryPayload<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: String,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StkQueryResponse {
    result_code: Option<String>,
    result_desc: Option<String>,
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

/// Daraja still settling the transaction reports this error code on the
/// query endpoint.
const QUERY_STILL_PROCESSING: &str = "500.001.1001";

// ----- production client ---------------------------------------------

/// HTTP client for the Daraja sandbox/production API.
pub struct DarajaGateway {
    config: MpesaConfig,
    http: reqwest::Client,
}

impl DarajaGateway {
    pub fn new(config: MpesaConfig) -> Result<Self, MpesaError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MpesaError::GatewayUnavailable(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// Exchanges the consumer key/secret for a bearer token.
    async fn access_token(&self) -> Result<String, MpesaError> {
        let credentials = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            self.config.consumer_key, self.config.consumer_secret
        ));
        let response = self
            .http
            .get(format!(
                "{}/oauth/v1/generate?grant_type=client_credentials",
                self.config.base_url
            ))
            .header("Authorization", format!("Basic {credentials}"))
            .send()
            .await
            .map_err(|e| MpesaError::GatewayUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MpesaError::GatewayUnavailable(format!(
                "token exchange returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MpesaError::GatewayUnavailable(e.to_string()))?;
        Ok(token.access_token)
    }

    /// The time-boxed push password: base64(shortcode + passkey + timestamp).
    fn password(&self, timestamp: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(format!(
            "{}{}{}",
            self.config.short_code, self.config.passkey, timestamp
        ))
    }

    fn timestamp() -> String {
        Utc::now().format("%Y%m%d%H%M%S").to_string()
    }
}

#[async_trait]
impl StkGateway for DarajaGateway {
    #[tracing::instrument(skip(self, request), fields(reference = %request.account_reference))]
    async fn initiate_push(&self, request: &StkPushRequest) -> Result<StkPushAccepted, MpesaError> {
        let token = self.access_token().await?;
        let timestamp = Self::timestamp();
        let payload = StkPushPayload {
            business_short_code: &self.config.short_code,
            password: self.password(&timestamp),
            timestamp,
            transaction_type: "CustomerPayBillOnline",
            amount: request.amount.whole_units(),
            party_a: request.phone.as_str(),
            party_b: &self.config.short_code,
            phone_number: request.phone.as_str(),
            callback_url: &self.config.callback_url,
            account_reference: &request.account_reference,
            transaction_desc: &request.description,
        };

        let response = self
            .http
            .post(format!(
                "{}/mpesa/stkpush/v1/processrequest",
                self.config.base_url
            ))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MpesaError::GatewayUnavailable(e.to_string()))?;
        let body: StkPushResponse = response
            .json()
            .await
            .map_err(|e| MpesaError::GatewayUnavailable(e.to_string()))?;

        let accepted = body.response_code.as_deref() == Some("0");
        if accepted && let Some(checkout_request_id) = body.checkout_request_id {
            return Ok(StkPushAccepted {
                merchant_request_id: body.merchant_request_id.unwrap_or_default(),
                checkout_request_id,
                customer_message: body.customer_message,
            });
        }
        Err(MpesaError::PushRejected {
            code: body
                .response_code
                .or(body.error_code)
                .unwrap_or_else(|| "unknown".to_string()),
            description: body
                .response_description
                .or(body.error_message)
                .unwrap_or_else(|| "push was not accepted".to_string()),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn query_status(&self, checkout_request_id: &str) -> Result<StkQueryOutcome, MpesaError> {
        let token = self.access_token().await?;
        let timestamp = Self::timestamp();
        let payload = StkQueryPayload {
            business_short_code: &self.config.short_code,
            password: self.password(&timestamp),
            timestamp,
            checkout_request_id,
        };

        let response = self
            .http
            .post(format!(
                "{}/mpesa/stkpushquery/v1/query",
                self.config.base_url
            ))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MpesaError::GatewayUnavailable(e.to_string()))?;
        let body: StkQueryResponse = response
            .json()
            .await
            .map_err(|e| MpesaError::GatewayUnavailable(e.to_string()))?;

        if body.error_code.as_deref() == Some(QUERY_STILL_PROCESSING) {
            return Ok(StkQueryOutcome::Pending);
        }
        match body.result_code.as_deref() {
            Some("0") => Ok(StkQueryOutcome::Success),
            Some(code) => Ok(StkQueryOutcome::Failed {
                code: code.to_string(),
                description: body
                    .result_desc
                    .unwrap_or_else(|| "transaction failed".to_string()),
            }),
            None => Err(MpesaError::GatewayUnavailable(
                body.error_message
                    .unwrap_or_else(|| "query returned no result".to_string()),
            )),
        }
    }
}

// ----- test double ---------------------------------------------------

/// Scripted in-memory gateway for tests.
pub struct MockGateway {
    counter: std::sync::atomic::AtomicU64,
    fail_on_push: std::sync::atomic::AtomicBool,
    reject_push: std::sync::atomic::AtomicBool,
    query_outcome: std::sync::Mutex<StkQueryOutcome>,
    pub pushes: std::sync::Mutex<Vec<StkPushRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            counter: std::sync::atomic::AtomicU64::new(1),
            fail_on_push: std::sync::atomic::AtomicBool::new(false),
            reject_push: std::sync::atomic::AtomicBool::new(false),
            query_outcome: std::sync::Mutex::new(StkQueryOutcome::Pending),
            pushes: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Simulates a transport failure on the next pushes.
    pub fn set_fail_on_push(&self, fail: bool) {
        self.fail_on_push
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Simulates the gateway declining pushes.
    pub fn set_reject_push(&self, reject: bool) {
        self.reject_push
            .store(reject, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_query_outcome(&self, outcome: StkQueryOutcome) {
        *self.query_outcome.lock().unwrap() = outcome;
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StkGateway for MockGateway {
    async fn initiate_push(&self, request: &StkPushRequest) -> Result<StkPushAccepted, MpesaError> {
        if self.fail_on_push.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MpesaError::GatewayUnavailable(
                "simulated transport failure".to_string(),
            ));
        }
        if self.reject_push.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MpesaError::PushRejected {
                code: "1".to_string(),
                description: "simulated rejection".to_string(),
            });
        }
        self.pushes.lock().unwrap().push(request.clone());
        let n = self.counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(StkPushAccepted {
            merchant_request_id: format!("mr_{n}"),
            checkout_request_id: format!("ws_CO_{n}"),
            customer_message: Some("Success. Request accepted for processing".to_string()),
        })
    }

    async fn query_status(&self, _checkout_request_id: &str) -> Result<StkQueryOutcome, MpesaError> {
        Ok(self.query_outcome.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> MpesaConfig {
        MpesaConfig {
            consumer_key: "key".to_string(),
            consumer_secret: "secret".to_string(),
            passkey: "passkey".to_string(),
            short_code: "174379".to_string(),
            base_url: "https://sandbox.safaricom.co.ke".to_string(),
            callback_url: "https://example.com/payments/callback".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn password_is_base64_of_shortcode_passkey_timestamp() {
        let gateway = DarajaGateway::new(config()).unwrap();
        let password = gateway.password("20260830120000");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(password)
            .unwrap();
        assert_eq!(decoded, b"174379passkey20260830120000");
    }

    #[test]
    fn timestamp_matches_daraja_format() {
        let ts = DarajaGateway::timestamp();
        assert_eq!(ts.len(), 14);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn push_payload_uses_daraja_field_names() {
        let payload = StkPushPayload {
            business_short_code: "174379",
            password: "pw".to_string(),
            timestamp: "20260830120000".to_string(),
            transaction_type: "CustomerPayBillOnline",
            amount: 100,
            party_a: "254712345678",
            party_b: "174379",
            phone_number: "254712345678",
            callback_url: "https://example.com/cb",
            account_reference: "MI1",
            transaction_desc: "Order MI1",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["BusinessShortCode"], "174379");
        assert_eq!(json["TransactionType"], "CustomerPayBillOnline");
        assert_eq!(json["Amount"], 100);
        assert_eq!(json["CallBackURL"], "https://example.com/cb");
        assert_eq!(json["AccountReference"], "MI1");
    }

    #[tokio::test]
    async fn mock_gateway_issues_unique_correlation_ids() {
        let gateway = MockGateway::new();
        let request = StkPushRequest {
            phone: PhoneNumber::parse("254712345678").unwrap(),
            amount: Money::from_shillings(100),
            account_reference: "MI1".to_string(),
            description: "Order MI1".to_string(),
        };
        let first = gateway.initiate_push(&request).await.unwrap();
        let second = gateway.initiate_push(&request).await.unwrap();
        assert_ne!(first.checkout_request_id, second.checkout_request_id);
    }
}
