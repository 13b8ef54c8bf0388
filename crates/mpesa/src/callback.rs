//! Typed Daraja STK callback payloads.
//!
//! The gateway posts a deeply nested envelope; result code 0 means the
//! customer completed the payment and the metadata items carry the
//! amount, receipt number, and phone. Every metadata field is optional
//! on the wire, so extraction tolerates whatever subset arrives.

use common::Money;
use serde::Deserialize;

use crate::error::MpesaError;

#[derive(Debug, Deserialize)]
pub struct CallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: Option<String>,
    #[serde(rename = "CallbackMetadata")]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: Option<serde_json::Value>,
}

/// Fields extracted from a successful callback's metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaymentConfirmation {
    pub amount: Option<Money>,
    pub receipt_number: Option<String>,
    pub phone_number: Option<String>,
    pub transaction_date: Option<i64>,
}

impl StkCallback {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    /// Pulls the known metadata items out of the item list.
    pub fn confirmation(&self) -> PaymentConfirmation {
        let mut confirmation = PaymentConfirmation::default();
        let Some(metadata) = &self.callback_metadata else {
            return confirmation;
        };
        for item in &metadata.items {
            match (item.name.as_str(), &item.value) {
                ("Amount", Some(value)) => {
                    confirmation.amount = value
                        .as_f64()
                        .map(|a| Money::from_cents((a * 100.0).round() as i64));
                }
                ("MpesaReceiptNumber", Some(value)) => {
                    confirmation.receipt_number = value.as_str().map(String::from);
                }
                ("PhoneNumber", Some(value)) => {
                    confirmation.phone_number = match value {
                        serde_json::Value::String(s) => Some(s.clone()),
                        other => other.as_i64().map(|n| n.to_string()),
                    };
                }
                ("TransactionDate", Some(value)) => {
                    confirmation.transaction_date = value.as_i64();
                }
                _ => {}
            }
        }
        confirmation
    }
}

/// Parses a raw callback body.
pub fn parse_callback(raw: &str) -> Result<CallbackEnvelope, MpesaError> {
    serde_json::from_str(raw).map_err(|e| MpesaError::MalformedCallback(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS: &str = r#"{
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_191220191020363925",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        {"Name": "Amount", "Value": 1050.50},
                        {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
                        {"Name": "TransactionDate", "Value": 20191219102115},
                        {"Name": "PhoneNumber", "Value": 254712345678}
                    ]
                }
            }
        }
    }"#;

    const FAILURE: &str = r#"{
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_191220191020363925",
                "ResultCode": 1032,
                "ResultDesc": "Request cancelled by user."
            }
        }
    }"#;

    #[test]
    fn parses_successful_callback() {
        let envelope = parse_callback(SUCCESS).unwrap();
        let callback = envelope.body.stk_callback;
        assert!(callback.is_success());
        assert_eq!(callback.checkout_request_id, "ws_CO_191220191020363925");

        let confirmation = callback.confirmation();
        assert_eq!(confirmation.amount, Some(Money::from_cents(105_050)));
        assert_eq!(confirmation.receipt_number.as_deref(), Some("NLJ7RT61SV"));
        assert_eq!(confirmation.phone_number.as_deref(), Some("254712345678"));
        assert_eq!(confirmation.transaction_date, Some(20191219102115));
    }

    #[test]
    fn parses_failure_without_metadata() {
        let envelope = parse_callback(FAILURE).unwrap();
        let callback = envelope.body.stk_callback;
        assert!(!callback.is_success());
        assert_eq!(
            callback.result_desc.as_deref(),
            Some("Request cancelled by user.")
        );
        assert_eq!(callback.confirmation(), PaymentConfirmation::default());
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(matches!(
            parse_callback("{\"Body\": 12}"),
            Err(MpesaError::MalformedCallback(_))
        ));
        assert!(matches!(
            parse_callback("not json"),
            Err(MpesaError::MalformedCallback(_))
        ));
    }

    #[test]
    fn tolerates_missing_metadata_items() {
        let raw = r#"{
            "Body": {
                "stkCallback": {
                    "CheckoutRequestID": "ws_CO_1",
                    "ResultCode": 0,
                    "CallbackMetadata": {"Item": [{"Name": "Amount"}]}
                }
            }
        }"#;
        let envelope = parse_callback(raw).unwrap();
        let confirmation = envelope.body.stk_callback.confirmation();
        assert!(confirmation.amount.is_none());
        assert!(confirmation.receipt_number.is_none());
    }
}
