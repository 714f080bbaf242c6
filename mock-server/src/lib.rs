use std::{collections::BTreeMap, io::Write, time::Duration};

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use flate2::{write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Plain text served gzip-compressed by `/gzip`.
pub const GZIP_TEXT: &str = "the quick brown fox jumps over the lazy dog\n";
pub const GZIP_REPEAT: usize = 200;

/// What `/form` saw of the posted request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormEcho {
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Deserialize)]
pub struct SlowQuery {
    #[serde(default)]
    pub ms: u64,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", get(echo_query))
        .route("/form", post(echo_form))
        .route("/gzip", get(gzip_body))
        .route("/bad-gzip", get(bad_gzip_body))
        .route("/status/{code}", get(status).post(status))
        .route("/empty", get(empty))
        .route("/slow", get(slow))
        .route("/headers", get(echo_headers))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo_query(Query(params): Query<BTreeMap<String, String>>) -> Json<BTreeMap<String, String>> {
    Json(params)
}

async fn echo_form(headers: HeaderMap, body: String) -> Json<FormEcho> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(FormEcho { content_type, body })
}

async fn gzip_body() -> Result<Response, StatusCode> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(GZIP_TEXT.repeat(GZIP_REPEAT).as_bytes())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let compressed = encoder.finish().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok((
        [
            (header::CONTENT_ENCODING, "gzip"),
            (header::CONTENT_TYPE, "text/plain"),
        ],
        compressed,
    )
        .into_response())
}

async fn bad_gzip_body() -> Response {
    ([(header::CONTENT_ENCODING, "gzip")], "this is not gzip").into_response()
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, &'static str), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, "status page"))
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn slow(Query(query): Query<SlowQuery>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(query.ms)).await;
    "finally"
}

/// Echo request headers (lowercase names) as JSON.
async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    Json(
        headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect(),
    )
}
