// SPDX-License-Identifier: Apache-2.0

use crate::auth::TokenProvider;
use crate::backend::{RetryPolicy, SheetsBackend};
use crate::SheetsError;
use async_trait::async_trait;
use barberboard_model::CellValue;
use reqwest::{Method, Url};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_BASE: &str = "https://www.googleapis.com/drive/v3/files";

/// `SheetsBackend` over the Sheets v4 and Drive v3 REST APIs. Transport
/// failures, rate limits and server errors are retried with linear backoff;
/// everything else maps straight onto the error taxonomy.
pub struct GoogleSheetsBackend {
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
    retry: RetryPolicy,
}

struct CallError {
    error: SheetsError,
    retryable: bool,
}

fn fatal(error: SheetsError) -> CallError {
    CallError {
        error,
        retryable: false,
    }
}

fn transient(error: SheetsError) -> CallError {
    CallError {
        error,
        retryable: true,
    }
}

impl GoogleSheetsBackend {
    #[must_use]
    pub fn new(tokens: Arc<TokenProvider>, http: reqwest::Client, retry: RetryPolicy) -> Self {
        Self {
            http,
            tokens,
            retry,
        }
    }

    #[instrument(name = "google_call", skip(self, body))]
    async fn call(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, SheetsError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(method.clone(), url.clone(), body).await {
                Ok(value) => return Ok(value),
                Err(failure) if failure.retryable && attempt < self.retry.max_attempts => {
                    tracing::warn!(
                        attempt,
                        error = %failure.error,
                        "google call failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(
                        self.retry.base_backoff_ms.saturating_mul(attempt as u64),
                    ))
                    .await;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, CallError> {
        let token = self.tokens.access_token().await.map_err(fatal)?;
        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| transient(SheetsError::Api(format!("google request failed: {e}"))))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| transient(SheetsError::Api(format!("google response lost: {e}"))))?;
        if (200..300).contains(&status) {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(|e| {
                fatal(SheetsError::Api(format!(
                    "google response was not JSON: {e}"
                )))
            });
        }
        Err(classify_failure(status, &text))
    }

    async fn sheet_metadata(&self, spreadsheet_id: &str) -> Result<Value, SheetsError> {
        let mut url = sheets_url(&[spreadsheet_id])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");
        self.call(Method::GET, url, None).await
    }

    /// Numeric grid id of a worksheet, needed by `batchUpdate` requests.
    async fn grid_id(&self, spreadsheet_id: &str, title: &str) -> Result<i64, SheetsError> {
        let metadata = self.sheet_metadata(spreadsheet_id).await?;
        let grid_id = sheet_properties(&metadata)
            .find(|props| props.get("title").and_then(Value::as_str) == Some(title))
            .and_then(|props| props.get("sheetId").and_then(Value::as_i64))
            .ok_or_else(|| SheetsError::NotFound(format!("worksheet {title} not found")));
        grid_id
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: Value,
    ) -> Result<(), SheetsError> {
        let url = sheets_url(&[&format!("{spreadsheet_id}:batchUpdate")])?;
        self.call(Method::POST, url, Some(&json!({ "requests": requests })))
            .await?;
        Ok(())
    }

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[CellValue],
    ) -> Result<(), SheetsError> {
        let mut url = sheets_url(&[spreadsheet_id, "values", range])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        self.call(Method::PUT, url, Some(&json!({ "values": [values] })))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SheetsBackend for GoogleSheetsBackend {
    fn backend_tag(&self) -> &'static str {
        "google"
    }

    async fn worksheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SheetsError> {
        let metadata = self.sheet_metadata(spreadsheet_id).await?;
        Ok(sheet_properties(&metadata)
            .filter_map(|props| props.get("title").and_then(Value::as_str))
            .map(ToString::to_string)
            .collect())
    }

    async fn read_rows(
        &self,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = sheets_url(&[spreadsheet_id, "values", &quoted_range(title)])?;
        let payload = self.call(Method::GET, url, None).await?;
        Ok(string_rows(payload.get("values")))
    }

    async fn read_header_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<Vec<String>, SheetsError> {
        let range = format!("{}!1:1", quoted_range(title));
        let url = sheets_url(&[spreadsheet_id, "values", &range])?;
        let payload = self.call(Method::GET, url, None).await?;
        let mut rows = string_rows(payload.get("values"));
        Ok(if rows.is_empty() { Vec::new() } else { rows.swap_remove(0) })
    }

    async fn batch_read_rows(
        &self,
        spreadsheet_id: &str,
        titles: &[String],
    ) -> Result<Vec<Vec<Vec<String>>>, SheetsError> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }
        let mut url = sheets_url(&[spreadsheet_id, "values:batchGet"])?;
        {
            let mut pairs = url.query_pairs_mut();
            for title in titles {
                pairs.append_pair("ranges", &quoted_range(title));
            }
        }
        let payload = self.call(Method::GET, url, None).await?;
        let ranges = payload
            .get("valueRanges")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if ranges.len() != titles.len() {
            return Err(SheetsError::Api(format!(
                "batchGet returned {} ranges for {} requested",
                ranges.len(),
                titles.len()
            )));
        }
        Ok(ranges
            .iter()
            .map(|range| string_rows(range.get("values")))
            .collect())
    }

    async fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<(), SheetsError> {
        self.batch_update(
            spreadsheet_id,
            json!([{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows, "columnCount": cols }
                    }
                }
            }]),
        )
        .await
    }

    async fn clear_worksheet(&self, spreadsheet_id: &str, title: &str) -> Result<(), SheetsError> {
        let range = format!("{}:clear", quoted_range(title));
        let url = sheets_url(&[spreadsheet_id, "values", &range])?;
        self.call(Method::POST, url, Some(&json!({}))).await?;
        Ok(())
    }

    async fn update_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
        row: u32,
        values: &[CellValue],
    ) -> Result<(), SheetsError> {
        let range = format!("{}!A{row}", quoted_range(title));
        self.write_range(spreadsheet_id, &range, values).await
    }

    async fn append_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
        values: &[CellValue],
    ) -> Result<(), SheetsError> {
        let range = format!("{}:append", quoted_range(title));
        let mut url = sheets_url(&[spreadsheet_id, "values", &range])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        self.call(Method::POST, url, Some(&json!({ "values": [values] })))
            .await?;
        Ok(())
    }

    async fn insert_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
        row: u32,
        values: &[CellValue],
    ) -> Result<(), SheetsError> {
        let grid_id = self.grid_id(spreadsheet_id, title).await?;
        self.batch_update(
            spreadsheet_id,
            json!([{
                "insertDimension": {
                    "range": {
                        "sheetId": grid_id,
                        "dimension": "ROWS",
                        "startIndex": row - 1,
                        "endIndex": row
                    },
                    "inheritFromBefore": false
                }
            }]),
        )
        .await?;
        let range = format!("{}!A{row}", quoted_range(title));
        self.write_range(spreadsheet_id, &range, values).await
    }

    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        title: &str,
        row: u32,
        col: u32,
        value: &str,
    ) -> Result<(), SheetsError> {
        let range = format!("{}!{}{row}", quoted_range(title), a1_column(col));
        self.write_range(spreadsheet_id, &range, &[CellValue::from(value)])
            .await
    }

    #[instrument(name = "create_spreadsheet", skip(self))]
    async fn create_spreadsheet(&self, title: &str) -> Result<String, SheetsError> {
        let url = base_url(SHEETS_BASE)?;
        let payload = self
            .call(
                Method::POST,
                url,
                Some(&json!({ "properties": { "title": title } })),
            )
            .await?;
        payload
            .get("spreadsheetId")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                SheetsError::Api("spreadsheet created but no spreadsheetId returned".to_string())
            })
    }

    async fn move_to_folder(
        &self,
        spreadsheet_id: &str,
        folder_id: &str,
    ) -> Result<(), SheetsError> {
        let mut lookup = drive_url(&[spreadsheet_id])?;
        lookup.query_pairs_mut().append_pair("fields", "parents");
        let payload = self.call(Method::GET, lookup, None).await?;
        let previous_parents = payload
            .get("parents")
            .and_then(Value::as_array)
            .map(|parents| {
                parents
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();

        let mut url = drive_url(&[spreadsheet_id])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("addParents", folder_id);
            if !previous_parents.is_empty() {
                pairs.append_pair("removeParents", &previous_parents);
            }
            pairs.append_pair("fields", "id");
        }
        self.call(Method::PATCH, url, Some(&json!({}))).await?;
        Ok(())
    }

    async fn grant_writer(&self, spreadsheet_id: &str, email: &str) -> Result<(), SheetsError> {
        let mut url = drive_url(&[spreadsheet_id, "permissions"])?;
        url.query_pairs_mut()
            .append_pair("sendNotificationEmail", "false");
        self.call(
            Method::POST,
            url,
            Some(&json!({
                "type": "user",
                "role": "writer",
                "emailAddress": email
            })),
        )
        .await?;
        Ok(())
    }
}

fn classify_failure(status: u16, body: &str) -> CallError {
    let detail = excerpt(body);
    match status {
        401 => fatal(SheetsError::Auth(format!(
            "google rejected the access token (status 401): {detail}"
        ))),
        403 if body.contains("storageQuotaExceeded") || body.contains("quotaExceeded") => {
            fatal(SheetsError::QuotaExceeded(detail))
        }
        403 => fatal(SheetsError::Auth(format!(
            "google denied access (status 403): {detail}"
        ))),
        404 => fatal(SheetsError::NotFound(format!(
            "google reports not found: {detail}"
        ))),
        // the values API answers 400 for ranges naming an absent worksheet
        400 if body.contains("Unable to parse range") => {
            fatal(SheetsError::NotFound(detail))
        }
        429 => transient(SheetsError::Api(format!(
            "google rate limited (status 429): {detail}"
        ))),
        500..=599 => transient(SheetsError::Api(format!(
            "google call failed status={status}: {detail}"
        ))),
        _ => fatal(SheetsError::Api(format!(
            "google call failed status={status}: {detail}"
        ))),
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= 240 {
        return trimmed.to_string();
    }
    trimmed.chars().take(240).collect()
}

fn base_url(base: &str) -> Result<Url, SheetsError> {
    Url::parse(base).map_err(|e| SheetsError::Api(format!("invalid url {base}: {e}")))
}

fn with_segments(base: &str, segments: &[&str]) -> Result<Url, SheetsError> {
    let mut url = base_url(base)?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| SheetsError::Api(format!("url {base} cannot take segments")))?;
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn sheets_url(segments: &[&str]) -> Result<Url, SheetsError> {
    with_segments(SHEETS_BASE, segments)
}

fn drive_url(segments: &[&str]) -> Result<Url, SheetsError> {
    with_segments(DRIVE_BASE, segments)
}

/// Worksheet titles with apostrophes must double them inside the quoted
/// A1 range.
fn quoted_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn a1_column(col: u32) -> String {
    let mut col = col;
    let mut letters = Vec::new();
    while col > 0 {
        letters.push(b'A' + ((col - 1) % 26) as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn sheet_properties(metadata: &Value) -> impl Iterator<Item = &Value> {
    metadata
        .get("sheets")
        .and_then(Value::as_array)
        .map(|sheets| sheets.iter())
        .into_iter()
        .flatten()
        .filter_map(|sheet| sheet.get("properties"))
}

fn string_rows(values: Option<&Value>) -> Vec<Vec<String>> {
    values
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(cell_text).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_quote_titles_and_double_apostrophes() {
        assert_eq!(quoted_range("Отзывы"), "'Отзывы'");
        assert_eq!(quoted_range("O'Hara"), "'O''Hara'");
    }

    #[test]
    fn a1_columns_roll_over_past_z() {
        assert_eq!(a1_column(1), "A");
        assert_eq!(a1_column(8), "H");
        assert_eq!(a1_column(26), "Z");
        assert_eq!(a1_column(27), "AA");
        assert_eq!(a1_column(52), "AZ");
    }

    #[test]
    fn cyrillic_titles_are_percent_encoded_in_paths() {
        let url = sheets_url(&["book-1", "values", &quoted_range("Утро")]).expect("url");
        assert!(url.as_str().starts_with(SHEETS_BASE));
        assert!(url.as_str().contains("%D0%A3"));
        assert!(!url.as_str().contains("Утро"));
    }

    #[test]
    fn quota_markers_in_403_map_to_quota_exceeded() {
        let failure = classify_failure(403, r#"{"error":{"errors":[{"reason":"storageQuotaExceeded"}]}}"#);
        assert_eq!(failure.error.kind(), "quota_exceeded");
        assert!(!failure.retryable);

        let failure = classify_failure(403, r#"{"error":{"status":"PERMISSION_DENIED"}}"#);
        assert_eq!(failure.error.kind(), "auth");
    }

    #[test]
    fn unparseable_range_answer_is_a_missing_worksheet() {
        let failure = classify_failure(400, r#"{"error":{"message":"Unable to parse range: 'Нет'!A1"}}"#);
        assert_eq!(failure.error.kind(), "not_found");
        assert!(!failure.retryable);
    }

    #[test]
    fn server_errors_and_rate_limits_are_retryable() {
        assert!(classify_failure(500, "oops").retryable);
        assert!(classify_failure(503, "busy").retryable);
        assert!(classify_failure(429, "slow down").retryable);
        assert!(!classify_failure(404, "gone").retryable);
        assert!(!classify_failure(401, "expired").retryable);
    }

    #[test]
    fn grids_keep_numbers_as_display_text() {
        let payload = json!([["Дата", "Неделя"], ["2024-03-01", 9], [null, 8.4]]);
        let rows = string_rows(Some(&payload));
        assert_eq!(rows[1], vec!["2024-03-01".to_string(), "9".to_string()]);
        assert_eq!(rows[2], vec![String::new(), "8.4".to_string()]);
    }

    #[test]
    fn long_error_bodies_are_excerpted() {
        let body = "x".repeat(1000);
        assert_eq!(excerpt(&body).chars().count(), 240);
        assert_eq!(excerpt("  short  "), "short");
    }
}
