//! HTTP front end for the accumulator.
//!
//! `GET /metric/{key}/sum` reports the hourly sum for a key and
//! `POST /metric/{key}` with `{"value": n}` records a value.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Method, Response, StatusCode};
use pingora::apps::http_app::ServeHttp;
use pingora::protocols::http::ServerSession;
use serde_json::json;

use crate::accumulator::Accumulator;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const METRIC_PREFIX: &str = "/metric/";
const VALUE_FIELD: &str = "value";
const SUM_SUFFIX: &str = "/sum";

/// Serves the metric endpoints on top of a shared [`Accumulator`].
pub struct MetricApi {
    accumulator: Arc<Accumulator>,
}

impl MetricApi {
    pub fn new(accumulator: Arc<Accumulator>) -> Self {
        Self { accumulator }
    }

    /// Map a fully read request onto a response.
    pub fn respond(
        &self,
        method: &Method,
        path: &str,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Response<Vec<u8>> {
        if !path.starts_with(METRIC_PREFIX) {
            return text(StatusCode::NOT_FOUND, "404 page not found");
        }

        match *method {
            Method::GET => self.handle_get(path, content_type),
            Method::POST => self.handle_post(path, content_type, body),
            _ => {
                let mut resp = empty(StatusCode::METHOD_NOT_ALLOWED);
                resp.headers_mut()
                    .insert(ALLOW, HeaderValue::from_static("GET, POST"));
                resp
            }
        }
    }

    fn handle_get(&self, path: &str, content_type: Option<&str>) -> Response<Vec<u8>> {
        if let Some(rejected) = enforce_content_type(content_type) {
            return rejected;
        }

        let Some(key) = sum_key(path) else {
            return text(
                StatusCode::NOT_FOUND,
                "Error: legal GET urls look like '/metric/{key}/sum'",
            );
        };

        let value = self.accumulator.sum(key);
        json_body(json!({ "value": value }))
    }

    fn handle_post(
        &self,
        path: &str,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Response<Vec<u8>> {
        if let Some(rejected) = enforce_content_type(content_type) {
            return rejected;
        }

        let Some(key) = record_key(path) else {
            return text(
                StatusCode::NOT_FOUND,
                "Error: legal POST urls look like '/metric/{key}'",
            );
        };

        let fields: HashMap<String, i64> = match serde_json::from_slice(body) {
            Ok(fields) => fields,
            Err(e) => {
                return text(
                    StatusCode::BAD_REQUEST,
                    &format!("Error: invalid JSON: {e}"),
                );
            }
        };
        let Some(value) = fields.get(VALUE_FIELD) else {
            return text(
                StatusCode::BAD_REQUEST,
                "Error: JSON must contain key named 'value'",
            );
        };

        self.accumulator.record(key, *value);
        json_body(json!({}))
    }
}

#[async_trait]
impl ServeHttp for MetricApi {
    async fn response(&self, session: &mut ServerSession) -> Response<Vec<u8>> {
        let header = session.req_header();
        let method = header.method.clone();
        let path = header.uri.path().to_string();
        let content_type = header
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let mut body = Vec::new();
        loop {
            match session.read_request_body().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    log::debug!("{method} {path}: failed to read body: {e}");
                    return text(StatusCode::BAD_REQUEST, "Error: unreadable request body");
                }
            }
        }

        let resp = self.respond(&method, &path, content_type.as_deref(), &body);
        log::debug!("{method} {path} -> {}", resp.status().as_u16());
        resp
    }
}

fn enforce_content_type(content_type: Option<&str>) -> Option<Response<Vec<u8>>> {
    if content_type == Some(JSON_CONTENT_TYPE) {
        return None;
    }
    Some(text(
        StatusCode::BAD_REQUEST,
        &format!("Error: content-type MUST be {JSON_CONTENT_TYPE}"),
    ))
}

/// `/metric/{key}/sum` -> `key`
fn sum_key(path: &str) -> Option<&str> {
    path.strip_prefix(METRIC_PREFIX)?
        .strip_suffix(SUM_SUFFIX)
        .filter(|key| is_word(key))
}

/// `/metric/{key}` -> `key`
fn record_key(path: &str) -> Option<&str> {
    path.strip_prefix(METRIC_PREFIX).filter(|key| is_word(key))
}

// One or more of [A-Za-z0-9_].
fn is_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn build(
    status: StatusCode,
    content_type: Option<&'static str>,
    body: Vec<u8>,
) -> Response<Vec<u8>> {
    let len = body.len();
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    let headers = resp.headers_mut();
    if let Some(ct) = content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    resp
}

fn empty(status: StatusCode) -> Response<Vec<u8>> {
    build(status, None, Vec::new())
}

fn text(status: StatusCode, msg: &str) -> Response<Vec<u8>> {
    build(
        status,
        Some("text/plain; charset=utf-8"),
        format!("{msg}\n").into_bytes(),
    )
}

fn json_body(value: serde_json::Value) -> Response<Vec<u8>> {
    build(StatusCode::OK, Some(JSON_CONTENT_TYPE), value.to_string().into_bytes())
}
