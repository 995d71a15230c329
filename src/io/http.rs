//! HTTP API
//!
//! Routes:
//! - `GET /health`
//! - `GET /barcode/config` - current barcode layout
//! - `PUT /admin/barcode/config` - validate and apply a new layout
//! - `POST /barcode/parse` - decode, resolve and price one barcode
//! - `GET /metrics` - Prometheus text format
//!
//! Routing is a pure function of method, path, body and state so it can be
//! exercised without a socket.

use crate::domain::barcode::BarcodeConfig;
use crate::domain::types::WeightUnit;
use crate::infra::metrics::Metrics;
use crate::infra::settings::{BarcodeSettings, UpdateError};
use crate::io::prometheus::format_prometheus_metrics;
use crate::services::quote::{decode_and_price, ScanError, ScanQuote};
use crate::services::resolver::ProductLookup;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Largest accepted request body; config and parse payloads are tiny
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Shared state behind every request
pub struct ApiState {
    pub settings: Arc<BarcodeSettings>,
    pub catalog: Arc<dyn ProductLookup + Send + Sync>,
    pub metrics: Arc<Metrics>,
    pub site_id: String,
}

/// Body of `PUT /admin/barcode/config`
///
/// `weightDivisor` is optional; when absent the current divisor is kept.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdateRequest {
    pub enabled: bool,
    pub product_code_start: usize,
    pub product_code_end: usize,
    pub weight_start: usize,
    pub weight_end: usize,
    pub weight_unit: WeightUnit,
    #[serde(default)]
    pub weight_divisor: Option<u32>,
}

impl ConfigUpdateRequest {
    fn into_config(self, current: &BarcodeConfig) -> BarcodeConfig {
        BarcodeConfig {
            enabled: self.enabled,
            product_code_start: self.product_code_start,
            product_code_end: self.product_code_end,
            weight_start: self.weight_start,
            weight_end: self.weight_end,
            weight_unit: self.weight_unit,
            weight_divisor: self.weight_divisor.unwrap_or(current.weight_divisor),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ParseRequest {
    #[serde(default)]
    barcode: Option<Value>,
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response should not fail")
}

fn message(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    json_response(status, &json!({ "message": msg }))
}

/// Dispatch one request
pub fn route(method: &Method, path: &str, body: &[u8], state: &ApiState) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/health") => Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail"),
        (&Method::GET, "/metrics") => {
            let body = format_prometheus_metrics(&state.metrics, &state.site_id);
            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail")
        }
        (&Method::GET, "/barcode/config") => {
            json_response(StatusCode::OK, &json!(state.settings.snapshot()))
        }
        (&Method::PUT, "/admin/barcode/config") => update_config(body, state),
        (&Method::POST, "/barcode/parse") => parse_barcode(body, state),
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail"),
    }
}

fn update_config(body: &[u8], state: &ApiState) -> Response<Full<Bytes>> {
    let request: ConfigUpdateRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "barcode_config_request_malformed");
            return message(StatusCode::BAD_REQUEST, &format!("Invalid barcode configuration: {e}"));
        }
    };

    let next = request.into_config(&state.settings.snapshot());
    match state.settings.update(next) {
        Ok(config) => {
            state.metrics.record_config_update();
            json_response(
                StatusCode::OK,
                &json!({
                    "message": "Barcode configuration updated successfully",
                    "config": config,
                }),
            )
        }
        Err(UpdateError::Invalid(e)) => {
            warn!(error = %e, "barcode_config_rejected");
            message(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(UpdateError::Persist(e)) => {
            error!(error = %format!("{e:#}"), "barcode_config_persist_failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update barcode configuration")
        }
    }
}

fn parse_barcode(body: &[u8], state: &ApiState) -> Response<Full<Bytes>> {
    let raw = match serde_json::from_slice::<ParseRequest>(body) {
        Ok(ParseRequest { barcode: Some(Value::String(raw)) }) if !raw.is_empty() => raw,
        _ => return message(StatusCode::BAD_REQUEST, "Valid barcode string is required"),
    };

    let config = state.settings.snapshot();
    let started = Instant::now();
    let result = match decode_and_price(&raw, &config, state.catalog.as_ref()) {
        Ok(result) => result,
        Err(e) => {
            state.metrics.record_lookup_error();
            error!(raw = %raw, error = %format!("{e:#}"), "barcode_parse_failed");
            return message(StatusCode::INTERNAL_SERVER_ERROR, "Failed to parse barcode");
        }
    };
    state.metrics.record_quote(&result, started.elapsed().as_micros() as u64);

    match result {
        Ok(quote) => json_response(StatusCode::OK, &quote_json(&quote)),
        Err(e) => scan_error_response(&e, &config),
    }
}

fn quote_json(quote: &ScanQuote) -> Value {
    let product = &quote.product;
    json!({
        "success": true,
        "product": {
            "id": product.id,
            "name": product.name,
            "barcode": product.barcode,
            "unit": product.unit,
            "price": product.price,
            "pricePerKg": product.price_per_kg,
        },
        "barcode": {
            "raw": quote.raw,
            "productCode": quote.product_code,
            "weight": quote.pricing.display_weight,
            "weightUnit": quote.pricing.display_unit,
            "totalPrice": quote.pricing.total_price,
        },
    })
}

fn scan_error_response(error: &ScanError, config: &BarcodeConfig) -> Response<Full<Bytes>> {
    match error {
        ScanError::ProductNotFound { product_code, weight_raw } => json_response(
            StatusCode::NOT_FOUND,
            &json!({
                "message": error.to_string(),
                "productCode": product_code,
                "weight": weight_raw,
                "weightUnit": config.weight_unit,
            }),
        ),
        _ => message(StatusCode::BAD_REQUEST, &error.to_string()),
    }
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<ApiState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match read_body(body).await {
        Ok(bytes) => bytes,
        Err(resp) => return Ok(resp),
    };
    Ok(route(&parts.method, parts.uri.path(), &body, &state))
}

/// Collect a request body of at most `MAX_BODY_BYTES`
async fn read_body<B>(body: B) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(limit = %MAX_BODY_BYTES, "http_body_too_large");
            Err(message(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"))
        }
        Err(e) => {
            warn!(error = %e, "http_body_read_failed");
            Err(message(StatusCode::BAD_REQUEST, "Failed to read request body"))
        }
    }
}

/// Start the HTTP API server
pub async fn start_api_server(
    addr: SocketAddr,
    state: Arc<ApiState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    info!(addr = %addr, site = %state.site_id, "api_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "api_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "api_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("api_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}
