// SPDX-License-Identifier: Apache-2.0

use barberboard_model::CellValue;
use barberboard_sheets::{SheetsBackend, SheetsError};

/// Makes sure `title` exists inside the spreadsheet with exactly `headers` in
/// row 1. A missing worksheet is created and seeded; a worksheet whose header
/// row drifted from the expected set is cleared and rewritten, which discards
/// whatever rows it held. Drift means the sheet no longer matches the columns
/// the rest of the service writes, so its rows are unreadable anyway.
pub async fn ensure_sheet(
    backend: &dyn SheetsBackend,
    spreadsheet_id: &str,
    title: &str,
    headers: &[&str],
    rows: u32,
    cols: u32,
) -> Result<(), SheetsError> {
    let titles = match backend.worksheet_titles(spreadsheet_id).await {
        Ok(titles) => titles,
        Err(SheetsError::NotFound(_)) => {
            return Err(SheetsError::NotFound(
                "Таблица филиала недоступна. Обратитесь к администратору.".to_string(),
            ));
        }
        Err(err) => return Err(err),
    };

    let header_row: Vec<CellValue> = headers
        .iter()
        .map(|cell| CellValue::Text((*cell).to_string()))
        .collect();

    if !titles.iter().any(|existing| existing == title) {
        backend
            .add_worksheet(spreadsheet_id, title, rows, cols)
            .await?;
        backend
            .update_row(spreadsheet_id, title, 1, &header_row)
            .await?;
        tracing::info!(spreadsheet_id, title, "created worksheet");
        return Ok(());
    }

    let current = backend.read_header_row(spreadsheet_id, title).await?;
    if current.iter().map(String::as_str).eq(headers.iter().copied()) {
        return Ok(());
    }

    tracing::warn!(
        spreadsheet_id,
        title,
        found = ?current,
        "header drift detected, resetting worksheet"
    );
    backend.clear_worksheet(spreadsheet_id, title).await?;
    backend
        .update_row(spreadsheet_id, title, 1, &header_row)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use barberboard_sheets::FakeSheets;
    use std::sync::atomic::Ordering;

    const HEADERS: [&str; 3] = ["Дата отправки", "Филиал", "Комментарий"];

    async fn seed_grid(fake: &FakeSheets, title: &str, grid: Vec<Vec<String>>) {
        let mut books = fake.spreadsheets.lock().await;
        books
            .get_mut("s1")
            .expect("spreadsheet")
            .sheets
            .push((title.to_string(), grid));
    }

    #[tokio::test]
    async fn creates_missing_worksheet_with_headers() {
        let fake = FakeSheets::default();
        fake.insert_spreadsheet("s1", "BarberBoard - Тверская").await;

        ensure_sheet(&fake, "s1", "Утро", &HEADERS, 1000, 20)
            .await
            .unwrap();

        let rows = fake.rows("s1", "Утро").await.unwrap();
        assert_eq!(rows, vec![vec![
            "Дата отправки".to_string(),
            "Филиал".to_string(),
            "Комментарий".to_string(),
        ]]);
    }

    #[tokio::test]
    async fn leaves_matching_worksheet_untouched() {
        let fake = FakeSheets::default();
        fake.insert_spreadsheet("s1", "BarberBoard - Тверская").await;
        ensure_sheet(&fake, "s1", "Утро", &HEADERS, 1000, 20)
            .await
            .unwrap();
        let writes = fake.write_calls.load(Ordering::SeqCst);

        ensure_sheet(&fake, "s1", "Утро", &HEADERS, 1000, 20)
            .await
            .unwrap();
        assert_eq!(fake.write_calls.load(Ordering::SeqCst), writes);
    }

    #[tokio::test]
    async fn drifted_headers_reset_the_worksheet() {
        let fake = FakeSheets::default();
        fake.insert_spreadsheet("s1", "BarberBoard - Тверская").await;
        seed_grid(
            &fake,
            "Утро",
            vec![
                vec!["Старая".to_string(), "Шапка".to_string()],
                vec!["данные".to_string(), "строки".to_string()],
            ],
        )
        .await;

        ensure_sheet(&fake, "s1", "Утро", &HEADERS, 1000, 20)
            .await
            .unwrap();

        let rows = fake.rows("s1", "Утро").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "Дата отправки");
    }

    #[tokio::test]
    async fn missing_spreadsheet_reads_as_branch_sheet_unavailable() {
        let fake = FakeSheets::default();
        let err = ensure_sheet(&fake, "gone", "Утро", &HEADERS, 1000, 20)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert!(err.detail().contains("недоступна"));
    }
}
