use std::collections::BTreeMap;
use std::io::Read;

use axum::http::{self, Request, StatusCode};
use flate2::read::GzDecoder;
use http_body_util::BodyExt;
use mock_server::{app, FormEcho, GZIP_REPEAT, GZIP_TEXT};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_returns_query_params() {
    let resp = app().oneshot(get("/echo?a=1&b=hello+world")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let params: BTreeMap<String, String> = body_json(resp).await;
    assert_eq!(params["a"], "1");
    assert_eq!(params["b"], "hello world");
}

#[tokio::test]
async fn echo_without_query_is_empty() {
    let resp = app().oneshot(get("/echo")).await.unwrap();
    let params: BTreeMap<String, String> = body_json(resp).await;
    assert!(params.is_empty());
}

// --- form ---

#[tokio::test]
async fn form_echoes_body_and_content_type() {
    let req = Request::builder()
        .method("POST")
        .uri("/form")
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded; charset=UTF-8")
        .body("name=a+b".to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: FormEcho = body_json(resp).await;
    assert_eq!(echo.body, "name=a+b");
    assert_eq!(
        echo.content_type.as_deref(),
        Some("application/x-www-form-urlencoded; charset=UTF-8")
    );
}

// --- gzip ---

#[tokio::test]
async fn gzip_body_is_compressed() {
    let resp = app().oneshot(get("/gzip")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_ENCODING], "gzip");
    let compressed = body_bytes(resp).await;
    let mut text = String::new();
    GzDecoder::new(&compressed[..]).read_to_string(&mut text).unwrap();
    assert_eq!(text, GZIP_TEXT.repeat(GZIP_REPEAT));
    assert!(compressed.len() < text.len());
}

#[tokio::test]
async fn bad_gzip_claims_gzip() {
    let resp = app().oneshot(get("/bad-gzip")).await.unwrap();
    assert_eq!(resp.headers()[http::header::CONTENT_ENCODING], "gzip");
    assert_eq!(body_bytes(resp).await, "this is not gzip");
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    for code in [201u16, 404, 500, 503] {
        let resp = app().oneshot(get(&format!("/status/{code}"))).await.unwrap();
        assert_eq!(resp.status().as_u16(), code);
    }
}

#[tokio::test]
async fn status_rejects_out_of_range_code() {
    let resp = app().oneshot(get("/status/1000")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_returns_204() {
    let resp = app().oneshot(get("/empty")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());
}

// --- slow / headers ---

#[tokio::test]
async fn slow_answers_after_delay() {
    let resp = app().oneshot(get("/slow?ms=5")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "finally");
}

#[tokio::test]
async fn headers_are_echoed() {
    let req = Request::builder()
        .uri("/headers")
        .header(http::header::USER_AGENT, "checker/1.0")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    let headers: BTreeMap<String, String> = body_json(resp).await;
    assert_eq!(headers["user-agent"], "checker/1.0");
}
