//! Reconciles gateway outcomes with the payment ledger.
//!
//! All gateway traffic happens here, outside any order lock: the order
//! state is read first, the network call runs, and the result is then
//! committed through the order service.

use std::sync::Arc;

use common::{OrderId, PhoneNumber, RequestContext, UserId};
use orders::{OrderService, Payment};
use serde::Serialize;

use crate::callback::parse_callback;
use crate::error::MpesaError;
use crate::gateway::{StkGateway, StkPushRequest, StkQueryOutcome};

/// Returned to the customer when a push is on its way to their phone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushReceipt {
    pub order_id: OrderId,
    pub checkout_request_id: String,
    pub customer_message: Option<String>,
}

/// Acknowledgement for an ingested callback, carrying the pair whose
/// cached views must be invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAck {
    pub user_id: UserId,
    pub order_id: OrderId,
    pub completed: bool,
}

/// Drives the STK push lifecycle against the order service.
pub struct PaymentProcessor {
    gateway: Arc<dyn StkGateway>,
    orders: Arc<OrderService>,
}

impl PaymentProcessor {
    pub fn new(gateway: Arc<dyn StkGateway>, orders: Arc<OrderService>) -> Self {
        Self { gateway, orders }
    }

    /// Starts an STK push for an order awaiting payment.
    ///
    /// The charged amount is always the order's current total; the
    /// caller only supplies the phone. A previously pending attempt is
    /// replaced by the new push.
    #[tracing::instrument(skip(self, raw_phone), fields(user_id = %ctx.user_id))]
    pub async fn initiate(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
        raw_phone: &str,
    ) -> Result<PushReceipt, MpesaError> {
        let phone = PhoneNumber::parse(raw_phone)?;
        let order = self.orders.payable_order(ctx, order_id)?;

        let request = StkPushRequest {
            phone: phone.clone(),
            amount: order.total_price,
            account_reference: order.order_number(),
            description: format!("Payment for order {}", order.order_number()),
        };
        let accepted = self.gateway.initiate_push(&request).await?;

        self.orders.register_push(
            order_id,
            phone,
            order.total_price,
            accepted.checkout_request_id.clone(),
        )?;
        metrics::counter!("payments_initiated_total").increment(1);
        tracing::info!(
            order_id = %order_id,
            checkout_request_id = %accepted.checkout_request_id,
            "stk push accepted"
        );
        Ok(PushReceipt {
            order_id,
            checkout_request_id: accepted.checkout_request_id,
            customer_message: accepted.customer_message,
        })
    }

    /// The payment view for an order, refreshed by a synchronous status
    /// query while the push is still pending.
    ///
    /// Query failures are logged and leave the record untouched; the
    /// callback remains the authoritative settlement path.
    #[tracing::instrument(skip(self), fields(user_id = %ctx.user_id))]
    pub async fn payment_status(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
    ) -> Result<Payment, MpesaError> {
        let payment = self.orders.payment_for_order(ctx, order_id)?;
        let Some(reference) = payment
            .checkout_request_id
            .clone()
            .filter(|_| payment.is_pending())
        else {
            return Ok(payment);
        };

        match self.gateway.query_status(&reference).await {
            Ok(StkQueryOutcome::Success) => {
                self.orders.resolve_payment_success(&reference, None)?;
            }
            Ok(StkQueryOutcome::Failed { code, description }) => {
                tracing::info!(order_id = %order_id, code, "stk query reported failure");
                self.orders
                    .resolve_payment_failure(&reference, &description)?;
            }
            Ok(StkQueryOutcome::Pending) => {}
            Err(error) => {
                tracing::warn!(order_id = %order_id, %error, "stk status query failed");
            }
        }
        Ok(self.orders.payment_for_order(ctx, order_id)?)
    }

    /// Ingests a raw gateway callback body.
    ///
    /// Malformed payloads are a client error so the gateway's retry
    /// policy can engage; an unknown correlation id surfaces as not
    /// found for the same reason. Both legs commit the payment and
    /// order update in one step.
    #[tracing::instrument(skip(self, raw))]
    pub async fn ingest_callback(&self, raw: &str) -> Result<CallbackAck, MpesaError> {
        let envelope = parse_callback(raw)?;
        let callback = envelope.body.stk_callback;
        let reference = callback.checkout_request_id.clone();

        if callback.is_success() {
            let confirmation = callback.confirmation();
            let (user_id, order_id) = self
                .orders
                .resolve_payment_success(&reference, confirmation.receipt_number.clone())?;
            metrics::counter!("payment_callbacks_total", "result" => "success").increment(1);
            tracing::info!(
                order_id = %order_id,
                receipt = confirmation.receipt_number.as_deref().unwrap_or(""),
                "payment confirmed by callback"
            );
            Ok(CallbackAck {
                user_id,
                order_id,
                completed: true,
            })
        } else {
            let description = callback
                .result_desc
                .unwrap_or_else(|| format!("payment failed with code {}", callback.result_code));
            let (user_id, order_id) = self
                .orders
                .resolve_payment_failure(&reference, &description)?;
            metrics::counter!("payment_callbacks_total", "result" => "failure").increment(1);
            tracing::info!(order_id = %order_id, description, "payment failed by callback");
            Ok(CallbackAck {
                user_id,
                order_id,
                completed: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use catalog::{InMemoryCatalog, InventoryLedger, Product};
    use common::{Money, ProductId};
    use orders::{OrderError, PaymentState, ShippingMethod, ShippingMethods};

    use crate::gateway::MockGateway;

    struct Fixture {
        processor: PaymentProcessor,
        gateway: Arc<MockGateway>,
        orders: Arc<OrderService>,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(InMemoryCatalog::new());
        let ledger = Arc::new(InventoryLedger::new());
        let shipping = Arc::new(ShippingMethods::new());
        shipping.upsert(ShippingMethod::new(1, "Boda", Money::from_shillings(200)));
        catalog.upsert(
            Product::new(ProductId::new(1), "Kettle", Money::from_shillings(1_000))
                .with_pick_and_pay(),
        );
        ledger.provision(ProductId::new(1), 10, 2);

        let orders = Arc::new(OrderService::new(catalog, ledger, shipping));
        let gateway = Arc::new(MockGateway::new());
        let processor = PaymentProcessor::new(gateway.clone(), orders.clone());
        Fixture {
            processor,
            gateway,
            orders,
        }
    }

    fn place_order(f: &Fixture, ctx: &RequestContext) -> OrderId {
        let cart = f.orders.fetch_or_create_cart(ctx);
        f.orders
            .add_cart_item(ctx, cart.id, ProductId::new(1), BTreeMap::new(), 2, None)
            .unwrap();
        f.orders.create_order_from_cart(ctx, cart.id).unwrap().id
    }

    fn success_callback(reference: &str) -> String {
        format!(
            r#"{{"Body":{{"stkCallback":{{"CheckoutRequestID":"{reference}","ResultCode":0,
                "ResultDesc":"ok","CallbackMetadata":{{"Item":[
                {{"Name":"Amount","Value":2000.0}},
                {{"Name":"MpesaReceiptNumber","Value":"NLJ7RT61SV"}}]}}}}}}}}"#
        )
    }

    #[tokio::test]
    async fn initiate_charges_the_order_total() {
        let f = fixture();
        let ctx = RequestContext::customer(UserId::new());
        let order_id = place_order(&f, &ctx);

        let receipt = f
            .processor
            .initiate(&ctx, order_id, "0712345678")
            .await
            .unwrap();
        assert_eq!(receipt.order_id, order_id);

        let pushes = f.gateway.pushes.lock().unwrap();
        assert_eq!(pushes[0].amount, Money::from_shillings(2_000));
        assert_eq!(pushes[0].phone.as_str(), "254712345678");
        assert_eq!(pushes[0].account_reference, order_id.order_number());
    }

    #[tokio::test]
    async fn initiate_rejects_bad_phone_before_touching_the_gateway() {
        let f = fixture();
        let ctx = RequestContext::customer(UserId::new());
        let order_id = place_order(&f, &ctx);

        let err = f
            .processor
            .initiate(&ctx, order_id, "12345")
            .await
            .unwrap_err();
        assert!(matches!(err, MpesaError::InvalidPhone(_)));
        assert!(f.gateway.pushes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_outage_records_nothing() {
        let f = fixture();
        let ctx = RequestContext::customer(UserId::new());
        let order_id = place_order(&f, &ctx);
        f.gateway.set_fail_on_push(true);

        let err = f
            .processor
            .initiate(&ctx, order_id, "0712345678")
            .await
            .unwrap_err();
        assert!(matches!(err, MpesaError::GatewayUnavailable(_)));
        assert_eq!(
            f.orders.payment_for_order(&ctx, order_id),
            Err(OrderError::PaymentNotFound(order_id))
        );
    }

    #[tokio::test]
    async fn rejected_push_surfaces_the_gateway_message() {
        let f = fixture();
        let ctx = RequestContext::customer(UserId::new());
        let order_id = place_order(&f, &ctx);
        f.gateway.set_reject_push(true);

        let err = f
            .processor
            .initiate(&ctx, order_id, "0712345678")
            .await
            .unwrap_err();
        assert!(matches!(err, MpesaError::PushRejected { .. }));
    }

    #[tokio::test]
    async fn callback_completes_the_payment() {
        let f = fixture();
        let ctx = RequestContext::customer(UserId::new());
        let order_id = place_order(&f, &ctx);
        let receipt = f
            .processor
            .initiate(&ctx, order_id, "0712345678")
            .await
            .unwrap();

        let ack = f
            .processor
            .ingest_callback(&success_callback(&receipt.checkout_request_id))
            .await
            .unwrap();
        assert!(ack.completed);
        assert_eq!(ack.order_id, order_id);

        let payment = f.orders.payment_for_order(&ctx, order_id).unwrap();
        assert_eq!(payment.state, PaymentState::Completed);
        assert_eq!(payment.receipt_number.as_deref(), Some("NLJ7RT61SV"));
    }

    #[tokio::test]
    async fn unknown_correlation_id_is_not_found_and_changes_nothing() {
        let f = fixture();
        let ctx = RequestContext::customer(UserId::new());
        let order_id = place_order(&f, &ctx);
        f.processor
            .initiate(&ctx, order_id, "0712345678")
            .await
            .unwrap();

        let err = f
            .processor
            .ingest_callback(&success_callback("ws_CO_does_not_exist"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MpesaError::Order(OrderError::UnknownPaymentReference(_))
        ));
        let payment = f.orders.payment_for_order(&ctx, order_id).unwrap();
        assert_eq!(payment.state, PaymentState::Pending);
    }

    #[tokio::test]
    async fn malformed_callback_is_a_client_error() {
        let f = fixture();
        let err = f.processor.ingest_callback("{]").await.unwrap_err();
        assert!(matches!(err, MpesaError::MalformedCallback(_)));
    }

    #[tokio::test]
    async fn failure_callback_records_the_description() {
        let f = fixture();
        let ctx = RequestContext::customer(UserId::new());
        let order_id = place_order(&f, &ctx);
        let receipt = f
            .processor
            .initiate(&ctx, order_id, "0712345678")
            .await
            .unwrap();

        let raw = format!(
            r#"{{"Body":{{"stkCallback":{{"CheckoutRequestID":"{}","ResultCode":1032,
                "ResultDesc":"Request cancelled by user."}}}}}}"#,
            receipt.checkout_request_id
        );
        let ack = f.processor.ingest_callback(&raw).await.unwrap();
        assert!(!ack.completed);

        let payment = f.orders.payment_for_order(&ctx, order_id).unwrap();
        assert_eq!(payment.state, PaymentState::Failed);
        assert_eq!(
            payment.error_message.as_deref(),
            Some("Request cancelled by user.")
        );
    }

    #[tokio::test]
    async fn pending_status_polls_the_gateway() {
        let f = fixture();
        let ctx = RequestContext::customer(UserId::new());
        let order_id = place_order(&f, &ctx);
        f.processor
            .initiate(&ctx, order_id, "0712345678")
            .await
            .unwrap();

        // still processing: record untouched
        let payment = f.processor.payment_status(&ctx, order_id).await.unwrap();
        assert_eq!(payment.state, PaymentState::Pending);

        // settled: the poll completes the payment
        f.gateway.set_query_outcome(StkQueryOutcome::Success);
        let payment = f.processor.payment_status(&ctx, order_id).await.unwrap();
        assert_eq!(payment.state, PaymentState::Completed);
    }
}
