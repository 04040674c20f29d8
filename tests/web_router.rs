// Router tests for the HTTP API.
//
// Requests go through the real axum Router via tower's `oneshot`, with the
// Scanner wired to stub collaborators.

#![cfg(feature = "web")]

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use scanlens::clients::traits::{
    AggregatorBackend, ImageHost, PageRenderer, RenderedPage, VisionBackend, VisionResponse,
};
use scanlens::dispatch::{Collaborators, ScanSettings};
use scanlens::payload::{BestGuessLabel, CloudVisionPayload, MatchingPage};
use scanlens::web::{build_router, AppState};
use scanlens::{Credentials, Scanner};

const BOUNDARY: &str = "scanlens-test-boundary";

struct Host;

#[async_trait]
impl ImageHost for Host {
    async fn upload(&self, _image: &[u8], _api_key: &str) -> Result<Option<String>> {
        Ok(Some("https://i.ibb.co/x/photo.jpg".into()))
    }
}

struct Vision;

#[async_trait]
impl VisionBackend for Vision {
    async fn web_detection(&self, _image: &[u8], _api_key: &str) -> Result<VisionResponse> {
        Ok(VisionResponse {
            error_message: None,
            payload: CloudVisionPayload {
                best_guess_labels: vec![BestGuessLabel {
                    label: "charmander".into(),
                    confidence: None,
                }],
                pages_with_matching_images: vec![MatchingPage {
                    page_title: "Charmander Plush".into(),
                    url: "https://shop.example/1".into(),
                    score: Some(0.5),
                }],
                web_entities: vec![],
            },
        })
    }
}

struct Aggregator;

#[async_trait]
impl AggregatorBackend for Aggregator {
    async fn search_by_url(&self, _image_url: &str, _api_key: &str) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "error": "Invalid API key." }))
    }
}

struct Renderer;

#[async_trait]
impl PageRenderer for Renderer {
    async fn render(&self, _url: &str) -> Result<RenderedPage> {
        Ok(RenderedPage::default())
    }
}

fn app(credentials: Credentials) -> axum::Router {
    let scanner = Scanner::new(
        Collaborators {
            image_host: Arc::new(Host),
            vision: Arc::new(Vision),
            aggregator: Arc::new(Aggregator),
            renderer: Arc::new(Renderer),
        },
        ScanSettings::default(),
    );
    build_router(AppState {
        scanner: Arc::new(scanner),
        credentials: Arc::new(credentials),
    })
}

fn all_credentials() -> Credentials {
    Credentials {
        google_api_key: Some("google-key".into()),
        serpapi_key: Some("serp-key".into()),
        imgbb_key: Some("imgbb-key".into()),
    }
}

/// Multipart body with optional `image` and `method` parts.
fn multipart(image: Option<&[u8]>, method: Option<&str>) -> Body {
    let mut body: Vec<u8> = Vec::new();
    if let Some(image) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"photo.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(method) = method {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"method\"\r\n\r\n{method}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn scan_request(uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let response = app(all_credentials())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn scan_returns_common_result() {
    let response = app(all_credentials())
        .oneshot(scan_request("/scan", multipart(Some(b"jpeg"), None)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "Google Cloud Vision");
    assert_eq!(body["best_guesses"][0], "charmander");
    assert_eq!(body["visual_matches"][0]["link"], "https://shop.example/1");
}

#[tokio::test]
async fn scan_without_image_is_bad_request() {
    let response = app(all_credentials())
        .oneshot(scan_request("/scan", multipart(None, Some("cloud_vision"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No image file provided");
}

#[tokio::test]
async fn unknown_method_is_bad_request() {
    let response = app(all_credentials())
        .oneshot(scan_request("/scan", multipart(Some(b"jpeg"), Some("bing"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("bing"));
}

#[tokio::test]
async fn method_can_come_from_the_query_string() {
    let response = app(all_credentials())
        .oneshot(scan_request(
            "/scan?method=serpapi",
            multipart(Some(b"jpeg"), None),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"], "Invalid API key.");
}

#[tokio::test]
async fn missing_key_is_server_error() {
    let response = app(Credentials::default())
        .oneshot(scan_request("/scan", multipart(Some(b"jpeg"), None)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await["error"]
        .as_str()
        .unwrap()
        .contains("GOOGLE_VISION_API_KEY"));
}

#[tokio::test]
async fn legacy_scan_returns_legacy_shape() {
    let response = app(all_credentials())
        .oneshot(scan_request("/scan/legacy", multipart(Some(b"jpeg"), None)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["best_guess"], "charmander");
    assert_eq!(body["matching_pages"][0]["score"], 0.5);
    assert!(body["google_sees"].as_array().unwrap().is_empty());
}
