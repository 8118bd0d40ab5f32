//! Debit Note Service Library
//!
//! Builds debit/credit notes against submitted sales and purchase documents
//! and serves them over HTTP.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use services::{
    in_memory::{CatalogTranslator, InMemoryLedger},
    lookups::Translator,
    mapper::StoreBackedMapper,
    totals::StandardTotalsCalculator,
    DebitNoteService, SignPolicy,
};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub ledger: Arc<InMemoryLedger>,
    pub debit_notes: Arc<DebitNoteService>,
}

impl AppState {
    /// Wires the note service over an in-memory ledger.
    pub fn new(config: config::AppConfig, ledger: Arc<InMemoryLedger>) -> Self {
        Self::with_translator(config, ledger, Arc::new(CatalogTranslator::new()))
    }

    pub fn with_translator(
        config: config::AppConfig,
        ledger: Arc<InMemoryLedger>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let service = DebitNoteService::new(
            Arc::new(StoreBackedMapper::new(ledger.clone())),
            ledger.clone(),
            ledger.clone(),
            Arc::new(StandardTotalsCalculator::new()),
            translator,
        )
        .with_sign_policy(SignPolicy::new(config.reverse_sign))
        .with_currency_precision(config.currency_precision);

        Self {
            config,
            ledger,
            debit_notes: Arc::new(service),
        }
    }

    pub fn debit_note_service(&self) -> Arc<DebitNoteService> {
        self.debit_notes.clone()
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new().route(
        "/sales-invoices/:name/debit-note",
        post(handlers::debit_notes::make_sales_debit),
    )
}

/// Full application router: health probe, versioned API, OpenAPI docs,
/// request-id propagation and HTTP tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(middleware::from_fn(crate::tracing::propagate_request_id))
        .with_state(state)
}
