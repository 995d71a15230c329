//! Integration tests for the HTTP API routes

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Response, StatusCode};
use scale_barcode::domain::{BarcodeConfig, Product, ProductId};
use scale_barcode::infra::{BarcodeSettings, Metrics};
use scale_barcode::io::http::route;
use scale_barcode::io::{ApiState, Catalog};
use serde_json::Value;
use std::sync::Arc;

fn product(id: i64, name: &str, barcode: &str, unit: &str, price: f64, per_kg: Option<f64>) -> Product {
    Product {
        id: ProductId(id),
        name: name.to_string(),
        barcode: Some(barcode.to_string()),
        unit: unit.to_string(),
        price,
        price_per_kg: per_kg,
        is_active: true,
    }
}

fn state(enabled: bool) -> ApiState {
    let catalog = Catalog::new(vec![
        product(1, "Gouda", "20258", "g", 0.05, None),
        product(2, "Smoked ham", "20300", "kg", 10.0, Some(89.9)),
        product(3, "Olives", "58", "100g", 12.0, None),
    ]);
    ApiState {
        settings: Arc::new(BarcodeSettings::new(BarcodeConfig { enabled, ..Default::default() })),
        catalog: Arc::new(catalog),
        metrics: Arc::new(Metrics::new()),
        site_id: "test".to_string(),
    }
}

fn parse(state: &ApiState, barcode: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "barcode": barcode }).to_string();
    route(&Method::POST, "/barcode/parse", body.as_bytes(), state)
}

async fn body_json(resp: Response<Full<Bytes>>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_parse_reference_barcode() {
    let state = state(true);
    let resp = parse(&state, "2025874002804");
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["product"]["id"], 1);
    assert_eq!(json["product"]["name"], "Gouda");
    assert_eq!(json["barcode"]["raw"], "2025874002804");
    assert_eq!(json["barcode"]["productCode"], "20258");
    assert_eq!(json["barcode"]["weight"], 74002.0);
    assert_eq!(json["barcode"]["weightUnit"], "g");
    assert_eq!(json["barcode"]["totalPrice"], 3700.1);
}

#[tokio::test]
async fn test_parse_kilogram_product() {
    let state = state(true);
    let json = body_json(parse(&state, "2030001234")).await;
    assert_eq!(json["product"]["pricePerKg"], 89.9);
    assert_eq!(json["barcode"]["weight"], 1.234);
    assert_eq!(json["barcode"]["weightUnit"], "kg");
    assert_eq!(json["barcode"]["totalPrice"], 110.94);
}

#[tokio::test]
async fn test_parse_zero_padded_code_matches_stripped_barcode() {
    let state = state(true);
    let json = body_json(parse(&state, "0005801500")).await;
    assert_eq!(json["product"]["id"], 3);
    assert_eq!(json["barcode"]["productCode"], "00058");
    assert_eq!(json["barcode"]["weight"], 1500.0);
    assert_eq!(json["barcode"]["weightUnit"], "г");
    assert_eq!(json["barcode"]["totalPrice"], 180.0);
}

#[tokio::test]
async fn test_parse_business_errors() {
    let disabled = state(false);
    let resp = parse(&disabled, "2025874002804");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], "Barcode system is disabled");

    let state = state(true);
    let resp = parse(&state, "12345");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], "Barcode too short. Expected at least 10 digits");

    let resp = parse(&state, "20258ab123");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], "Invalid weight in barcode");
}

#[tokio::test]
async fn test_parse_unknown_product() {
    let state = state(true);
    let resp = parse(&state, "9999900100");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let json = body_json(resp).await;
    assert_eq!(json["message"], "Product not found for barcode");
    assert_eq!(json["productCode"], "99999");
    assert_eq!(json["weight"], 100);
    assert_eq!(json["weightUnit"], "g");
}

#[tokio::test]
async fn test_config_get_and_update() {
    let state = state(false);

    let json = body_json(route(&Method::GET, "/barcode/config", b"", &state)).await;
    assert_eq!(json["enabled"], false);
    assert_eq!(json["productCodeStart"], 1);
    assert_eq!(json["weightEnd"], 10);
    assert_eq!(json["weightUnit"], "g");

    let update = br#"{"enabled":true,"productCodeStart":1,"productCodeEnd":6,
        "weightStart":7,"weightEnd":12,"weightUnit":"g"}"#;
    let resp = route(&Method::PUT, "/admin/barcode/config", update, &state);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["config"]["productCodeEnd"], 6);

    let json = body_json(route(&Method::GET, "/barcode/config", b"", &state)).await;
    assert_eq!(json["enabled"], true);
    assert_eq!(json["weightEnd"], 12);
}

#[tokio::test]
async fn test_config_update_rejects_inverted_range() {
    let state = state(true);
    let update = br#"{"enabled":true,"productCodeStart":5,"productCodeEnd":3,
        "weightStart":6,"weightEnd":10,"weightUnit":"g"}"#;
    let resp = route(&Method::PUT, "/admin/barcode/config", update, &state);
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "Invalid barcode configuration: product code start (5) must be less than end (3)"
    );
    assert_eq!(state.settings.snapshot().product_code_end, 5);
}

#[tokio::test]
async fn test_metrics_count_parse_outcomes() {
    let state = state(true);
    parse(&state, "2025874002804");
    parse(&state, "9999900100");

    let resp = route(&Method::GET, "/metrics", b"", &state);
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("scale_barcode_quotes_total{site=\"test\"} 2"));
    assert!(text.contains("scale_barcode_quotes_priced_total{site=\"test\"} 1"));
    assert!(text.contains("reason=\"product_not_found\"} 1"));
}

#[test]
fn test_health() {
    let resp = route(&Method::GET, "/health", b"", &state(true));
    assert_eq!(resp.status(), StatusCode::OK);
}
