// SPDX-License-Identifier: Apache-2.0

use crate::backend::SheetsBackend;
use crate::SheetsError;
use async_trait::async_trait;
use barberboard_model::CellValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

/// One in-memory spreadsheet: its Drive title plus worksheets in creation
/// order, each a plain string grid.
#[derive(Debug, Default, Clone)]
pub struct FakeSpreadsheet {
    pub title: String,
    pub sheets: Vec<(String, Vec<Vec<String>>)>,
}

impl FakeSpreadsheet {
    #[must_use]
    pub fn sheet(&self, title: &str) -> Option<&Vec<Vec<String>>> {
        self.sheets
            .iter()
            .find(|(name, _)| name == title)
            .map(|(_, rows)| rows)
    }

    fn sheet_mut(&mut self, title: &str) -> Option<&mut Vec<Vec<String>>> {
        self.sheets
            .iter_mut()
            .find(|(name, _)| name == title)
            .map(|(_, rows)| rows)
    }
}

/// In-memory stand-in for the Google backend. Fields are public so tests can
/// seed grids and inspect what the service wrote; counters record backend
/// traffic for cache assertions.
#[derive(Debug, Default)]
pub struct FakeSheets {
    pub spreadsheets: Mutex<HashMap<String, FakeSpreadsheet>>,
    pub titles_calls: AtomicU64,
    pub read_calls: AtomicU64,
    pub batch_read_calls: AtomicU64,
    pub write_calls: AtomicU64,
    pub create_calls: AtomicU64,
    /// When set, `create_spreadsheet` fails the way Drive does once the
    /// owning account runs out of storage.
    pub quota_exhausted: AtomicBool,
    pub moved: Mutex<Vec<(String, String)>>,
    pub grants: Mutex<Vec<(String, String)>>,
    next_id: AtomicU64,
}

impl FakeSheets {
    /// Registers an empty spreadsheet under a caller-chosen id.
    pub async fn insert_spreadsheet(&self, spreadsheet_id: &str, title: &str) {
        let mut books = self.spreadsheets.lock().await;
        books.insert(
            spreadsheet_id.to_string(),
            FakeSpreadsheet {
                title: title.to_string(),
                sheets: Vec::new(),
            },
        );
    }

    /// Snapshot of one worksheet's grid, `None` when either id is unknown.
    pub async fn rows(&self, spreadsheet_id: &str, title: &str) -> Option<Vec<Vec<String>>> {
        let books = self.spreadsheets.lock().await;
        books.get(spreadsheet_id)?.sheet(title).cloned()
    }

    async fn with_sheet<T>(
        &self,
        spreadsheet_id: &str,
        title: &str,
        apply: impl FnOnce(&mut Vec<Vec<String>>) -> T,
    ) -> Result<T, SheetsError> {
        let mut books = self.spreadsheets.lock().await;
        let book = books
            .get_mut(spreadsheet_id)
            .ok_or_else(|| missing_spreadsheet(spreadsheet_id))?;
        let rows = book
            .sheet_mut(title)
            .ok_or_else(|| missing_worksheet(title))?;
        Ok(apply(rows))
    }
}

fn missing_spreadsheet(spreadsheet_id: &str) -> SheetsError {
    SheetsError::NotFound(format!("spreadsheet {spreadsheet_id} not found"))
}

fn missing_worksheet(title: &str) -> SheetsError {
    SheetsError::NotFound(format!("worksheet {title} not found"))
}

fn render(values: &[CellValue]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

#[async_trait]
impl SheetsBackend for FakeSheets {
    fn backend_tag(&self) -> &'static str {
        "fake"
    }

    async fn worksheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SheetsError> {
        self.titles_calls.fetch_add(1, Ordering::SeqCst);
        let books = self.spreadsheets.lock().await;
        let book = books
            .get(spreadsheet_id)
            .ok_or_else(|| missing_spreadsheet(spreadsheet_id))?;
        Ok(book.sheets.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn read_rows(
        &self,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.with_sheet(spreadsheet_id, title, |rows| rows.clone())
            .await
    }

    async fn read_header_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<Vec<String>, SheetsError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.with_sheet(spreadsheet_id, title, |rows| {
            rows.first().cloned().unwrap_or_default()
        })
        .await
    }

    async fn batch_read_rows(
        &self,
        spreadsheet_id: &str,
        titles: &[String],
    ) -> Result<Vec<Vec<Vec<String>>>, SheetsError> {
        self.batch_read_calls.fetch_add(1, Ordering::SeqCst);
        let books = self.spreadsheets.lock().await;
        let book = books
            .get(spreadsheet_id)
            .ok_or_else(|| missing_spreadsheet(spreadsheet_id))?;
        let mut grids = Vec::with_capacity(titles.len());
        for title in titles {
            let rows = book.sheet(title).ok_or_else(|| missing_worksheet(title))?;
            grids.push(rows.clone());
        }
        Ok(grids)
    }

    async fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        _rows: u32,
        _cols: u32,
    ) -> Result<(), SheetsError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut books = self.spreadsheets.lock().await;
        let book = books
            .get_mut(spreadsheet_id)
            .ok_or_else(|| missing_spreadsheet(spreadsheet_id))?;
        if book.sheet(title).is_some() {
            return Err(SheetsError::Api(format!(
                "worksheet {title} already exists"
            )));
        }
        book.sheets.push((title.to_string(), Vec::new()));
        Ok(())
    }

    async fn clear_worksheet(&self, spreadsheet_id: &str, title: &str) -> Result<(), SheetsError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.with_sheet(spreadsheet_id, title, Vec::clear).await
    }

    async fn update_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
        row: u32,
        values: &[CellValue],
    ) -> Result<(), SheetsError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let rendered = render(values);
        self.with_sheet(spreadsheet_id, title, |rows| {
            let index = row as usize - 1;
            while rows.len() <= index {
                rows.push(Vec::new());
            }
            rows[index] = rendered;
        })
        .await
    }

    async fn append_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
        values: &[CellValue],
    ) -> Result<(), SheetsError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let rendered = render(values);
        self.with_sheet(spreadsheet_id, title, |rows| rows.push(rendered))
            .await
    }

    async fn insert_row(
        &self,
        spreadsheet_id: &str,
        title: &str,
        row: u32,
        values: &[CellValue],
    ) -> Result<(), SheetsError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let rendered = render(values);
        self.with_sheet(spreadsheet_id, title, |rows| {
            let index = (row as usize - 1).min(rows.len());
            rows.insert(index, rendered);
        })
        .await
    }

    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        title: &str,
        row: u32,
        col: u32,
        value: &str,
    ) -> Result<(), SheetsError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let value = value.to_string();
        self.with_sheet(spreadsheet_id, title, |rows| {
            let row_index = row as usize - 1;
            while rows.len() <= row_index {
                rows.push(Vec::new());
            }
            let cells = &mut rows[row_index];
            let col_index = col as usize - 1;
            while cells.len() <= col_index {
                cells.push(String::new());
            }
            cells[col_index] = value;
        })
        .await
    }

    async fn create_spreadsheet(&self, title: &str) -> Result<String, SheetsError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.quota_exhausted.load(Ordering::SeqCst) {
            return Err(SheetsError::QuotaExceeded(
                "storageQuotaExceeded: the owning account is out of Drive storage".to_string(),
            ));
        }
        let spreadsheet_id = format!("fake-sheet-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.insert_spreadsheet(&spreadsheet_id, title).await;
        Ok(spreadsheet_id)
    }

    async fn move_to_folder(
        &self,
        spreadsheet_id: &str,
        folder_id: &str,
    ) -> Result<(), SheetsError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let books = self.spreadsheets.lock().await;
        if !books.contains_key(spreadsheet_id) {
            return Err(missing_spreadsheet(spreadsheet_id));
        }
        drop(books);
        let mut moved = self.moved.lock().await;
        moved.push((spreadsheet_id.to_string(), folder_id.to_string()));
        Ok(())
    }

    async fn grant_writer(&self, spreadsheet_id: &str, email: &str) -> Result<(), SheetsError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let books = self.spreadsheets.lock().await;
        if !books.contains_key(spreadsheet_id) {
            return Err(missing_spreadsheet(spreadsheet_id));
        }
        drop(books);
        let mut grants = self.grants.lock().await;
        grants.push((spreadsheet_id.to_string(), email.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    #[tokio::test]
    async fn create_seed_and_read_back() {
        let fake = FakeSheets::default();
        let id = fake.create_spreadsheet("BarberBoard - Тверская").await.expect("create");
        assert_eq!(id, "fake-sheet-1");
        fake.add_worksheet(&id, "Утро", 1000, 20).await.expect("add");
        fake.update_row(&id, "Утро", 1, &text_row(&["Дата", "Неделя"]))
            .await
            .expect("header");
        fake.append_row(&id, "Утро", &[CellValue::from("2024-03-01"), CellValue::Int(9)])
            .await
            .expect("append");
        let rows = fake.read_rows(&id, "Утро").await.expect("read");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["2024-03-01".to_string(), "9".to_string()]);
        assert_eq!(fake.read_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fake.write_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn quota_flag_turns_creation_into_quota_error() {
        let fake = FakeSheets::default();
        fake.quota_exhausted.store(true, Ordering::SeqCst);
        let err = fake.create_spreadsheet("anything").await.expect_err("quota");
        assert_eq!(err.kind(), "quota_exceeded");
        assert!(err.to_string().contains("storageQuotaExceeded"));
    }

    #[tokio::test]
    async fn unknown_ids_read_as_not_found() {
        let fake = FakeSheets::default();
        let err = fake.read_rows("ghost", "Утро").await.expect_err("spreadsheet");
        assert_eq!(err.kind(), "not_found");

        fake.insert_spreadsheet("book", "Title").await;
        let err = fake.read_rows("book", "Утро").await.expect_err("worksheet");
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn insert_row_shifts_existing_rows_down() {
        let fake = FakeSheets::default();
        fake.insert_spreadsheet("book", "Title").await;
        fake.add_worksheet("book", "Лист", 10, 5).await.expect("add");
        fake.update_row("book", "Лист", 1, &text_row(&["h"])).await.expect("header");
        fake.insert_row("book", "Лист", 2, &text_row(&["first"])).await.expect("insert");
        fake.insert_row("book", "Лист", 2, &text_row(&["second"])).await.expect("insert");
        let rows = fake.rows("book", "Лист").await.expect("rows");
        assert_eq!(rows[0], vec!["h".to_string()]);
        assert_eq!(rows[1], vec!["second".to_string()]);
        assert_eq!(rows[2], vec!["first".to_string()]);
    }

    #[tokio::test]
    async fn batch_read_fails_when_any_title_is_missing() {
        let fake = FakeSheets::default();
        fake.insert_spreadsheet("book", "Title").await;
        fake.add_worksheet("book", "Есть", 10, 5).await.expect("add");
        let titles = vec!["Есть".to_string(), "Нет".to_string()];
        let err = fake.batch_read_rows("book", &titles).await.expect_err("missing");
        assert_eq!(err.kind(), "not_found");

        let grids = fake
            .batch_read_rows("book", &["Есть".to_string()])
            .await
            .expect("present");
        assert_eq!(grids.len(), 1);
        assert_eq!(fake.batch_read_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn update_cell_pads_short_rows() {
        let fake = FakeSheets::default();
        fake.insert_spreadsheet("book", "Title").await;
        fake.add_worksheet("book", "Лист", 10, 5).await.expect("add");
        fake.update_cell("book", "Лист", 3, 9, "spreadsheet-id").await.expect("cell");
        let rows = fake.rows("book", "Лист").await.expect("rows");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2][8], "spreadsheet-id");
        assert_eq!(rows[2][0], "");
    }

    #[tokio::test]
    async fn duplicate_worksheet_title_is_rejected() {
        let fake = FakeSheets::default();
        fake.insert_spreadsheet("book", "Title").await;
        fake.add_worksheet("book", "Лист", 10, 5).await.expect("add");
        let err = fake.add_worksheet("book", "Лист", 10, 5).await.expect_err("dup");
        assert_eq!(err.kind(), "api");
    }

    #[tokio::test]
    async fn move_and_grant_are_recorded() {
        let fake = FakeSheets::default();
        fake.insert_spreadsheet("book", "Title").await;
        fake.move_to_folder("book", "folder-7").await.expect("move");
        fake.grant_writer("book", "robot@project.iam.gserviceaccount.com")
            .await
            .expect("grant");
        assert_eq!(
            fake.moved.lock().await.as_slice(),
            &[("book".to_string(), "folder-7".to_string())]
        );
        assert_eq!(fake.grants.lock().await.len(), 1);
    }
}
