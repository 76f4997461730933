// SPDX-License-Identifier: Apache-2.0

pub mod handlers;

use crate::AppState;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use barberboard_api::{ApiError, ApiErrorCode};
use barberboard_model::ValidationError;
use barberboard_sheets::SheetsError;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Storage-quota remediation shown to operators. The underlying API detail
/// goes to the log, not the client.
pub(crate) const QUOTA_REMEDIATION: &str = "Превышена квота хранилища. Решение: \
    1) Укажите GOOGLE_DRIVE_FOLDER_ID в .env (ID папки на вашем личном Google Drive). \
    2) Дайте доступ сервисному аккаунту к этой папке. \
    3) Или очистите старые таблицы.";

pub(crate) fn normalized_header_value(
    headers: &HeaderMap,
    key: &str,
    max_len: usize,
) -> Option<String> {
    let raw = headers.get(key)?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(raw.chars().take(max_len).collect())
}

/// Request id for the envelope and the `x-request-id` response header.
/// Callers supplying one keep it; a traceparent is reused so the id lines up
/// with distributed traces; otherwise one is generated.
pub(crate) fn propagated_request_id(headers: &HeaderMap, seed: &AtomicU64) -> String {
    if let Some(value) = normalized_header_value(headers, "x-request-id", 128) {
        return value;
    }
    if let Some(trace) = normalized_header_value(headers, "traceparent", 128) {
        return format!("trace-{trace}");
    }
    let id = seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub(crate) fn api_error_response(error: ApiError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error)).into_response()
}

pub(crate) fn sheets_api_error(err: &SheetsError, request_id: &str) -> ApiError {
    let (code, message) = match err {
        SheetsError::Configuration(detail) => (ApiErrorCode::Configuration, detail.clone()),
        SheetsError::Auth(detail) => (ApiErrorCode::Auth, detail.clone()),
        SheetsError::NotFound(detail) => (ApiErrorCode::NotFound, detail.clone()),
        SheetsError::DanglingReference(detail) => {
            (ApiErrorCode::DanglingReference, detail.clone())
        }
        SheetsError::QuotaExceeded(_) => {
            (ApiErrorCode::QuotaExceeded, QUOTA_REMEDIATION.to_string())
        }
        SheetsError::Api(detail) => (ApiErrorCode::Internal, detail.clone()),
    };
    ApiError::new(code, message).with_request_id(request_id)
}

pub(crate) fn sheets_error_response(err: &SheetsError, request_id: &str) -> Response {
    tracing::error!(request_id, kind = err.kind(), error = %err, "sheets call failed");
    with_request_id(api_error_response(sheets_api_error(err, request_id)), request_id)
}

pub(crate) fn validation_error_response(err: &ValidationError, request_id: &str) -> Response {
    with_request_id(
        api_error_response(ApiError::validation(err.0.clone()).with_request_id(request_id)),
        request_id,
    )
}

/// Parses a JSON request body. Malformed bodies get the standard validation
/// envelope instead of a framework rejection.
pub(crate) fn parse_json<T: DeserializeOwned>(
    body: &Bytes,
    request_id: &str,
) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|err| {
        with_request_id(
            api_error_response(
                ApiError::validation(format!("invalid JSON body: {err}"))
                    .with_request_id(request_id),
            ),
            request_id,
        )
    })
}

pub(crate) async fn fallback_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let request_id = propagated_request_id(&headers, &state.request_id_seed);
    with_request_id(
        api_error_response(
            ApiError::not_found(format!("no route for {}", uri.path()))
                .with_request_id(&request_id),
        ),
        &request_id,
    )
}

pub(crate) async fn cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let origin = normalized_header_value(req.headers(), "origin", 256);
    let allowed = |candidate: &str| {
        state
            .config
            .cors_allowed_origins
            .iter()
            .any(|entry| entry == "*" || entry == candidate)
    };
    if req.method() == axum::http::Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        if let Some(origin_value) = origin {
            if allowed(&origin_value) {
                if let Ok(v) = HeaderValue::from_str(&origin_value) {
                    resp.headers_mut().insert("access-control-allow-origin", v);
                }
                resp.headers_mut().insert(
                    "access-control-allow-methods",
                    HeaderValue::from_static("GET,POST,OPTIONS"),
                );
                resp.headers_mut().insert(
                    "access-control-allow-headers",
                    HeaderValue::from_static("authorization,content-type,x-request-id"),
                );
            }
        }
        return resp;
    }

    let mut resp = next.run(req).await;
    if let Some(origin_value) = origin {
        if allowed(&origin_value) {
            if let Ok(v) = HeaderValue::from_str(&origin_value) {
                resp.headers_mut().insert("access-control-allow-origin", v);
            }
            resp.headers_mut()
                .insert("vary", HeaderValue::from_static("Origin"));
        }
    }
    resp
}

pub(crate) async fn request_log_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let incoming_id = normalized_header_value(req.headers(), "x-request-id", 128);
    let resp = next.run(req).await;
    if state.config.request_log {
        let request_id = normalized_header_value(resp.headers(), "x-request-id", 128)
            .or(incoming_id)
            .unwrap_or_default();
        info!(
            target: "barberboard_requests",
            method = %method,
            path = %path,
            status = resp.status().as_u16(),
            request_id = %request_id,
            latency_ms = started.elapsed().as_millis() as u64,
            "request"
        );
    }
    resp
}
