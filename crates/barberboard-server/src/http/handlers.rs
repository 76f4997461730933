// SPDX-License-Identifier: Apache-2.0

use super::{
    api_error_response, parse_json, propagated_request_id, sheets_error_response,
    validation_error_response, with_request_id,
};
use crate::cache::{CacheKey, CacheView};
use crate::summary::summarize;
use crate::writer::{append_category_records, append_summary_rows, lenient_records};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use barberboard_api::{
    ApiError, BranchProfile, BranchSummaryRequest, DashboardOverrides, HealthResponse,
    LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
};
use barberboard_model::{
    current_month_label, generate_token, hash_password, now_timestamp, BranchName, BranchRecord,
    BranchStatus, Category, CellValue, SUMMARY_SHEET_NAME,
};
use barberboard_sheets::SheetsError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Instant;

pub(crate) async fn landing() -> Response {
    Json(json!({
        "service": "barberboard-server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /health",
            "POST /register",
            "POST /login",
            "GET|POST /{category}/{branch}",
            "GET|POST /dashboard-summary/{branch}",
            "GET|POST /branch-summary/{branch}",
            "GET /api/cache-stats",
            "POST /api/cache-clear",
            "POST /api/cache-clear/{branch}",
        ],
    }))
    .into_response()
}

pub(crate) async fn health(State(state): State<AppState>) -> Response {
    Json(HealthResponse {
        success: true,
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_entries: state.cache.entry_count().await,
    })
    .into_response()
}

pub(crate) async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = propagated_request_id(&headers, &state.request_id_seed);
    let request: RegisterRequest = match parse_json(&body, &request_id) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Err(err) = request.validate() {
        return validation_error_response(&err, &request_id);
    }
    let name = match BranchName::parse(&request.name) {
        Ok(name) => name,
        Err(err) => return validation_error_response(&err, &request_id),
    };

    match state.directory.lookup(name.as_str()).await {
        Ok(Some(_)) => {
            return with_request_id(
                api_error_response(
                    ApiError::validation("Филиал с таким названием уже существует")
                        .with_request_id(&request_id),
                ),
                &request_id,
            );
        }
        Ok(None) => {}
        Err(err) => return sheets_error_response(&err, &request_id),
    }

    let spreadsheet_id = match state.directory.create_branch_spreadsheet(name.as_str()).await {
        Ok(id) => id,
        Err(err) => return sheets_error_response(&err, &request_id),
    };
    let record = BranchRecord {
        name: name.as_str().to_string(),
        address: request.address.trim().to_string(),
        manager_name: request.manager_name.trim().to_string(),
        manager_phone: request.manager_phone.trim().to_string(),
        password_hash: hash_password(&request.password),
        token: generate_token(),
        registered_at: now_timestamp(),
        spreadsheet_id,
        status: BranchStatus::Active,
    };
    if let Err(err) = state.directory.append_branch(&record).await {
        return sheets_error_response(&err, &request_id);
    }
    tracing::info!(request_id = %request_id, branch = %record.name, "registered branch");
    with_request_id(
        Json(MessageResponse::ok("Филиал успешно зарегистрирован")).into_response(),
        &request_id,
    )
}

pub(crate) async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = propagated_request_id(&headers, &state.request_id_seed);
    let request: LoginRequest = match parse_json(&body, &request_id) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Err(err) = request.validate() {
        return validation_error_response(&err, &request_id);
    }

    // One message for unknown branch and wrong password, no enumeration.
    let rejected = || {
        with_request_id(
            api_error_response(
                ApiError::auth("Неверное название филиала или пароль")
                    .with_request_id(&request_id),
            ),
            &request_id,
        )
    };

    let record = match state.directory.lookup(request.name.trim()).await {
        Ok(Some((_, record))) => record,
        Ok(None) => return rejected(),
        Err(err) => return sheets_error_response(&err, &request_id),
    };
    if record.password_hash != hash_password(&request.password) {
        return rejected();
    }
    if record.status == BranchStatus::Blocked {
        return with_request_id(
            (
                StatusCode::FORBIDDEN,
                Json(
                    ApiError::auth("Филиал заблокирован. Обратитесь к администратору.")
                        .with_request_id(&request_id),
                ),
            )
                .into_response(),
            &request_id,
        );
    }

    tracing::info!(request_id = %request_id, branch = %record.name, "login");
    with_request_id(
        Json(LoginResponse {
            success: true,
            token: record.token.clone(),
            branch: BranchProfile {
                name: record.name,
                address: record.address,
                manager: record.manager_name,
                phone: record.manager_phone,
                spreadsheet_id: record.spreadsheet_id,
            },
        })
        .into_response(),
        &request_id,
    )
}

pub(crate) async fn category_records(
    State(state): State<AppState>,
    Path((category, branch)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let request_id = propagated_request_id(&headers, &state.request_id_seed);
    let Some(category) = Category::from_slug(&category) else {
        return unknown_category(&category, &request_id);
    };
    let branch = match BranchName::parse(&branch) {
        Ok(name) => name,
        Err(err) => return validation_error_response(&err, &request_id),
    };

    let key = CacheKey::new(branch.as_str(), CacheView::Category(category));
    if let Some(cached) = state.cache.get(&key).await {
        return with_request_id(Json(cached).into_response(), &request_id);
    }

    let spreadsheet_id = match state.directory.resolve(branch.as_str()).await {
        Ok(id) => id,
        Err(err) => return sheets_error_response(&err, &request_id),
    };
    let records = match lenient_records(
        state.backend.as_ref(),
        &spreadsheet_id,
        category.sheet_name(),
    )
    .await
    {
        Ok(records) => records,
        Err(err) => return sheets_error_response(&err, &request_id),
    };
    let payload = json!({"success": true, "data": records});
    state.cache.put(key, payload.clone()).await;
    with_request_id(Json(payload).into_response(), &request_id)
}

pub(crate) async fn category_submit(
    State(state): State<AppState>,
    Path((category, branch)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state.request_id_seed);
    let Some(category) = Category::from_slug(&category) else {
        return unknown_category(&category, &request_id);
    };
    let branch = match BranchName::parse(&branch) {
        Ok(name) => name,
        Err(err) => return validation_error_response(&err, &request_id),
    };
    let payload: Value = match parse_json(&body, &request_id) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let rows = match category.rows_from_submission(&payload, &now_timestamp()) {
        Ok(rows) => rows,
        Err(err) => return validation_error_response(&err, &request_id),
    };

    let spreadsheet_id = match state.directory.resolve(branch.as_str()).await {
        Ok(id) => id,
        Err(err) => return sheets_error_response(&err, &request_id),
    };
    let written = match append_category_records(
        state.backend.as_ref(),
        &spreadsheet_id,
        category,
        &rows,
    )
    .await
    {
        Ok(written) => written,
        Err(err) => return sheets_error_response(&err, &request_id),
    };
    state.cache.invalidate_branch(branch.as_str()).await;
    tracing::info!(
        request_id = %request_id,
        branch = %branch,
        category = category.slug(),
        written,
        latency_ms = started.elapsed().as_millis() as u64,
        "submission recorded"
    );

    let response = if category.schema().batch {
        Json(MessageResponse::ok(batch_message(category, written))).into_response()
    } else {
        Json(json!({"success": true})).into_response()
    };
    with_request_id(response, &request_id)
}

pub(crate) async fn dashboard_get(
    State(state): State<AppState>,
    Path(branch): Path<String>,
    headers: HeaderMap,
) -> Response {
    let request_id = propagated_request_id(&headers, &state.request_id_seed);
    let branch = match BranchName::parse(&branch) {
        Ok(name) => name,
        Err(err) => return validation_error_response(&err, &request_id),
    };

    let key = CacheKey::new(branch.as_str(), CacheView::Dashboard);
    if let Some(cached) = state.cache.get(&key).await {
        return with_request_id(Json(cached).into_response(), &request_id);
    }

    let month = current_month_label();
    match dashboard_payload(&state, branch.as_str(), &month, None).await {
        Ok(payload) => {
            state.cache.put(key, payload.clone()).await;
            with_request_id(Json(payload).into_response(), &request_id)
        }
        Err(err) => sheets_error_response(&err, &request_id),
    }
}

/// POST variant: explicit month and goal overrides. Computed fresh every
/// time and never cached, so an override probe cannot poison the GET view.
pub(crate) async fn dashboard_post(
    State(state): State<AppState>,
    Path(branch): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = propagated_request_id(&headers, &state.request_id_seed);
    let branch = match BranchName::parse(&branch) {
        Ok(name) => name,
        Err(err) => return validation_error_response(&err, &request_id),
    };
    let overrides: DashboardOverrides = if body.is_empty() {
        DashboardOverrides::default()
    } else {
        match parse_json(&body, &request_id) {
            Ok(overrides) => overrides,
            Err(response) => return response,
        }
    };

    let month = overrides.month.clone().unwrap_or_else(current_month_label);
    match dashboard_payload(&state, branch.as_str(), &month, overrides.goals.as_ref()).await {
        Ok(payload) => with_request_id(Json(payload).into_response(), &request_id),
        Err(err) => sheets_error_response(&err, &request_id),
    }
}

pub(crate) async fn branch_summary_get(
    State(state): State<AppState>,
    Path(branch): Path<String>,
    headers: HeaderMap,
) -> Response {
    let request_id = propagated_request_id(&headers, &state.request_id_seed);
    let branch = match BranchName::parse(&branch) {
        Ok(name) => name,
        Err(err) => return validation_error_response(&err, &request_id),
    };

    let key = CacheKey::new(branch.as_str(), CacheView::BranchSummary);
    if let Some(cached) = state.cache.get(&key).await {
        return with_request_id(Json(cached).into_response(), &request_id);
    }

    let spreadsheet_id = match state.directory.resolve(branch.as_str()).await {
        Ok(id) => id,
        Err(err) => return sheets_error_response(&err, &request_id),
    };
    let records = match lenient_records(state.backend.as_ref(), &spreadsheet_id, SUMMARY_SHEET_NAME)
        .await
    {
        Ok(records) => records,
        Err(err) => return sheets_error_response(&err, &request_id),
    };
    let payload = json!({"success": true, "data": records});
    state.cache.put(key, payload.clone()).await;
    with_request_id(Json(payload).into_response(), &request_id)
}

pub(crate) async fn branch_summary_post(
    State(state): State<AppState>,
    Path(branch): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = propagated_request_id(&headers, &state.request_id_seed);
    let branch = match BranchName::parse(&branch) {
        Ok(name) => name,
        Err(err) => return validation_error_response(&err, &request_id),
    };
    let request: BranchSummaryRequest = match parse_json(&body, &request_id) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Err(err) = request.validate() {
        return validation_error_response(&err, &request_id);
    }

    let spreadsheet_id = match state.directory.resolve(branch.as_str()).await {
        Ok(id) => id,
        Err(err) => return sheets_error_response(&err, &request_id),
    };
    let cards = match summarize(state.backend.as_ref(), &spreadsheet_id, &request.month, None).await
    {
        Ok(cards) => cards,
        Err(err) => return sheets_error_response(&err, &request_id),
    };

    let timestamp = now_timestamp();
    let rows: Vec<Vec<CellValue>> = cards
        .iter()
        .map(|(category, card)| {
            vec![
                CellValue::Text(timestamp.clone()),
                CellValue::Text(branch.as_str().to_string()),
                CellValue::Text(request.manager.trim().to_string()),
                CellValue::Text(request.month.clone()),
                CellValue::Text(category.schema().summary_metric.to_string()),
                CellValue::Int(i64::from(card.current)),
                CellValue::Int(i64::from(card.goal)),
                CellValue::Float(card.percentage),
            ]
        })
        .collect();
    if let Err(err) = append_summary_rows(state.backend.as_ref(), &spreadsheet_id, &rows).await {
        return sheets_error_response(&err, &request_id);
    }
    state.cache.invalidate_branch(branch.as_str()).await;
    tracing::info!(request_id = %request_id, branch = %branch, month = %request.month, "branch summary written");
    with_request_id(Json(json!({"success": true})).into_response(), &request_id)
}

pub(crate) async fn cache_stats(State(state): State<AppState>) -> Response {
    Json(state.cache.stats().await).into_response()
}

pub(crate) async fn cache_clear_all(State(state): State<AppState>) -> Response {
    state.cache.clear().await;
    Json(MessageResponse::ok("Кэш очищен")).into_response()
}

pub(crate) async fn cache_clear_branch(
    State(state): State<AppState>,
    Path(branch): Path<String>,
) -> Response {
    state.cache.invalidate_branch(branch.trim()).await;
    Json(MessageResponse::ok("Кэш филиала очищен")).into_response()
}

async fn dashboard_payload(
    state: &AppState,
    branch: &str,
    month: &str,
    goals: Option<&HashMap<String, u32>>,
) -> Result<Value, SheetsError> {
    let spreadsheet_id = state.directory.resolve(branch).await?;
    let cards = summarize(state.backend.as_ref(), &spreadsheet_id, month, goals).await?;
    let mut summary = serde_json::Map::new();
    for (category, card) in cards {
        summary.insert(
            category.schema().dashboard_key.to_string(),
            serde_json::to_value(card).unwrap_or(Value::Null),
        );
    }
    Ok(json!({"success": true, "month": month, "summary": summary}))
}

fn unknown_category(slug: &str, request_id: &str) -> Response {
    with_request_id(
        api_error_response(
            ApiError::not_found(format!("unknown category {slug}")).with_request_id(request_id),
        ),
        request_id,
    )
}

fn batch_message(category: Category, count: usize) -> String {
    let noun = match category {
        Category::MorningEvents => "мероприятий",
        Category::FieldVisits => "проверок",
        Category::OneOnOne => "встреч",
        Category::MasterPlans => "планов",
        Category::NewbieAdaptation | Category::WeeklyMetrics | Category::Reviews => "записей",
    };
    format!("Добавлено {count} {noun}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_messages_use_the_category_noun() {
        assert_eq!(batch_message(Category::MorningEvents, 3), "Добавлено 3 мероприятий");
        assert_eq!(batch_message(Category::FieldVisits, 1), "Добавлено 1 проверок");
        assert_eq!(batch_message(Category::OneOnOne, 2), "Добавлено 2 встреч");
        assert_eq!(batch_message(Category::MasterPlans, 5), "Добавлено 5 планов");
        assert_eq!(
            batch_message(Category::NewbieAdaptation, 4),
            "Добавлено 4 записей"
        );
    }
}
