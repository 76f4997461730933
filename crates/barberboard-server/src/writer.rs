// SPDX-License-Identifier: Apache-2.0

use crate::ensure::ensure_sheet;
use barberboard_model::{
    Category, CellValue, SHEET_COLS, SHEET_ROWS, SUMMARY_HEADERS, SUMMARY_SHEET_NAME,
};
use barberboard_sheets::{records_from_grid, SheetsBackend, SheetsError};
use serde_json::Value;

/// Writes submission rows into the category worksheet, newest on top. Each
/// row goes in at row 2, right under the header, so the sheet reads latest
/// first without anyone sorting it.
pub async fn append_category_records(
    backend: &dyn SheetsBackend,
    spreadsheet_id: &str,
    category: Category,
    rows: &[Vec<CellValue>],
) -> Result<usize, SheetsError> {
    let schema = category.schema();
    ensure_sheet(
        backend,
        spreadsheet_id,
        schema.sheet_name,
        schema.headers,
        SHEET_ROWS,
        SHEET_COLS,
    )
    .await?;
    for row in rows {
        backend
            .insert_row(spreadsheet_id, schema.sheet_name, 2, row)
            .await?;
    }
    tracing::info!(
        spreadsheet_id,
        category = schema.slug,
        count = rows.len(),
        "recorded submission"
    );
    Ok(rows.len())
}

pub async fn append_summary_rows(
    backend: &dyn SheetsBackend,
    spreadsheet_id: &str,
    rows: &[Vec<CellValue>],
) -> Result<(), SheetsError> {
    ensure_sheet(
        backend,
        spreadsheet_id,
        SUMMARY_SHEET_NAME,
        SUMMARY_HEADERS,
        SHEET_ROWS,
        SHEET_COLS,
    )
    .await?;
    for row in rows {
        backend
            .insert_row(spreadsheet_id, SUMMARY_SHEET_NAME, 2, row)
            .await?;
    }
    Ok(())
}

/// Reads a worksheet as JSON records. A worksheet that was never written is
/// not an error for list endpoints, it is just an empty history.
pub async fn lenient_records(
    backend: &dyn SheetsBackend,
    spreadsheet_id: &str,
    sheet_name: &str,
) -> Result<Vec<Value>, SheetsError> {
    match backend.read_rows(spreadsheet_id, sheet_name).await {
        Ok(grid) => Ok(records_from_grid(&grid)),
        Err(SheetsError::NotFound(_)) => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}
