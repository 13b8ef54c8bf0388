//! HTTP API server for the order and payment lifecycle engine.
//!
//! Exposes the storefront cart/order/payment routes, the Daraja
//! callback webhook, admin bulk operations, and `/health` + `/metrics`,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod context;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cache::ResponseCache;
use catalog::{InMemoryCatalog, InventoryLedger, Product};
use common::{Money, ProductId};
use mpesa::{PaymentProcessor, StkGateway};
use orders::{OrderService, ShippingMethod, ShippingMethods};

use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/carts", post(routes::carts::create))
        .route("/carts", get(routes::carts::get_current))
        .route("/carts/{cart_id}/items", post(routes::carts::add_item))
        .route(
            "/carts/{cart_id}/shipping",
            patch(routes::carts::set_shipping),
        )
        .route(
            "/carts/{cart_id}/items/{item_id}/quantity",
            post(routes::carts::update_quantity),
        )
        .route(
            "/carts/{cart_id}/items/{item_id}",
            delete(routes::carts::remove_item),
        )
        .route("/shipping-methods", get(routes::carts::shipping_methods))
        .route("/orders/from-cart/{cart_id}", post(routes::orders::checkout))
        .route("/orders", get(routes::orders::list))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route("/orders/{id}/shipping", put(routes::orders::update_shipping))
        .route("/completed-orders", get(routes::orders::completed))
        .route("/payments", post(routes::payments::initiate))
        .route("/payments/callback", post(routes::payments::callback))
        .route("/payments/{order_id}", get(routes::payments::status))
        .route("/admin/orders", get(routes::admin::list))
        .route("/admin/orders/bulk-status", post(routes::admin::bulk_status))
        .route(
            "/admin/orders/{id}/status",
            post(routes::admin::single_status),
        )
        .route("/admin/orders/{id}/archive", post(routes::admin::archive))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around the given gateway.
pub fn create_state(gateway: Arc<dyn StkGateway>) -> Arc<AppState> {
    let catalog = Arc::new(InMemoryCatalog::new());
    let ledger = Arc::new(InventoryLedger::new());
    let shipping = Arc::new(ShippingMethods::new());

    let orders = Arc::new(OrderService::new(
        catalog.clone(),
        ledger.clone(),
        shipping.clone(),
    ));
    let payments = Arc::new(PaymentProcessor::new(gateway, orders.clone()));

    Arc::new(AppState {
        orders,
        payments,
        cache: Arc::new(ResponseCache::new()),
        catalog,
        ledger,
        shipping,
    })
}

/// Seeds a small demo catalog: two shipping methods, a stocked
/// pick-and-pay product, and an active group buy.
pub fn seed_demo_data(state: &AppState) {
    state
        .shipping
        .upsert(ShippingMethod::new(1, "Boda Boda", Money::from_shillings(200)));
    state
        .shipping
        .upsert(ShippingMethod::new(2, "Courier", Money::from_shillings(450)));

    state.catalog.upsert(
        Product::new(ProductId::new(1), "Electric Kettle", Money::from_shillings(1_000))
            .with_pick_and_pay()
            .with_attribute("color", vec!["silver", "black"]),
    );
    state.ledger.provision(ProductId::new(1), 25, 5);

    state.catalog.upsert(
        Product::new(ProductId::new(2), "Stainless Thermos", Money::from_shillings(5_000))
            .with_moq(100, 5, Some(Money::from_shillings(6_000))),
    );

    tracing::info!("demo catalog seeded");
}
