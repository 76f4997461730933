// SPDX-License-Identifier: Apache-2.0

use crate::cache::{CacheKey, CacheView, ResponseCache};
use crate::ensure::ensure_sheet;
use barberboard_model::{
    BranchRecord, DIRECTORY_HEADERS, DIRECTORY_SHEET_COLS, DIRECTORY_SHEET_NAME,
    DIRECTORY_SHEET_ROWS, SPREADSHEET_ID_COLUMN,
};
use barberboard_sheets::{SheetsBackend, SheetsError};
use serde_json::Value;
use std::sync::Arc;

/// The branch directory: one master spreadsheet row per registered branch,
/// mapping the branch name to its own per-branch spreadsheet.
pub struct Directory {
    backend: Arc<dyn SheetsBackend>,
    cache: Arc<ResponseCache>,
    master_sheet_id: String,
    drive_folder_id: Option<String>,
    grant_email: Option<String>,
}

impl Directory {
    #[must_use]
    pub fn new(
        backend: Arc<dyn SheetsBackend>,
        cache: Arc<ResponseCache>,
        master_sheet_id: String,
        drive_folder_id: Option<String>,
        grant_email: Option<String>,
    ) -> Self {
        Self {
            backend,
            cache,
            master_sheet_id,
            drive_folder_id,
            grant_email,
        }
    }

    async fn ensure_directory_sheet(&self) -> Result<(), SheetsError> {
        match ensure_sheet(
            self.backend.as_ref(),
            &self.master_sheet_id,
            DIRECTORY_SHEET_NAME,
            DIRECTORY_HEADERS,
            DIRECTORY_SHEET_ROWS,
            DIRECTORY_SHEET_COLS,
        )
        .await
        {
            Ok(()) => Ok(()),
            // The master sheet is deployment config, not user data.
            Err(SheetsError::NotFound(_)) => Err(SheetsError::Configuration(format!(
                "directory spreadsheet {} is not reachable, check GOOGLE_SHEET_ID",
                self.master_sheet_id
            ))),
            Err(err) => Err(err),
        }
    }

    /// Finds the directory row for `branch`. The returned row number is the
    /// 1-based sheet row, usable directly in cell updates.
    pub async fn lookup(&self, branch: &str) -> Result<Option<(u32, BranchRecord)>, SheetsError> {
        self.ensure_directory_sheet().await?;
        let grid = self
            .backend
            .read_rows(&self.master_sheet_id, DIRECTORY_SHEET_NAME)
            .await?;
        for (idx, row) in grid.iter().enumerate().skip(1) {
            if let Some(record) = BranchRecord::from_row(row) {
                if record.name == branch {
                    return Ok(Some(((idx + 1) as u32, record)));
                }
            }
        }
        Ok(None)
    }

    /// Resolves a branch name to its spreadsheet id. Cache misses re-read the
    /// directory and verify the mapped spreadsheet still answers before the
    /// mapping is trusted again; branches registered before per-branch sheets
    /// got ids have one created and written back on first use.
    pub async fn resolve(&self, branch: &str) -> Result<String, SheetsError> {
        let key = CacheKey::new(branch, CacheView::SpreadsheetId);
        if let Some(cached) = self.cache.get(&key).await {
            if let Some(id) = cached.as_str() {
                return Ok(id.to_string());
            }
        }

        let Some((row, record)) = self.lookup(branch).await? else {
            return Err(SheetsError::NotFound("Филиал не найден".to_string()));
        };

        if record.spreadsheet_id.is_empty() {
            let id = self.create_branch_spreadsheet(branch).await?;
            self.backend
                .update_cell(
                    &self.master_sheet_id,
                    DIRECTORY_SHEET_NAME,
                    row,
                    SPREADSHEET_ID_COLUMN,
                    &id,
                )
                .await?;
            tracing::info!(branch, spreadsheet_id = %id, "backfilled spreadsheet id");
            self.cache.put(key, Value::String(id.clone())).await;
            return Ok(id);
        }

        match self.backend.worksheet_titles(&record.spreadsheet_id).await {
            Ok(_) => {
                self.cache
                    .put(key, Value::String(record.spreadsheet_id.clone()))
                    .await;
                Ok(record.spreadsheet_id)
            }
            Err(SheetsError::NotFound(_)) => Err(SheetsError::DanglingReference(format!(
                "directory maps {branch} to spreadsheet {} which no longer exists",
                record.spreadsheet_id
            ))),
            Err(err) => Err(err),
        }
    }

    /// Creates the per-branch spreadsheet. Folder placement and writer grants
    /// are best effort: the sheet is usable either way, so failures there are
    /// logged and the id is still returned.
    pub async fn create_branch_spreadsheet(&self, branch: &str) -> Result<String, SheetsError> {
        let id = self
            .backend
            .create_spreadsheet(&format!("BarberBoard - {branch}"))
            .await?;
        if let Some(folder) = &self.drive_folder_id {
            if let Err(err) = self.backend.move_to_folder(&id, folder).await {
                tracing::warn!(branch, spreadsheet_id = %id, error = %err, "folder move failed");
            }
        }
        if let Some(email) = &self.grant_email {
            if let Err(err) = self.backend.grant_writer(&id, email).await {
                tracing::warn!(branch, spreadsheet_id = %id, error = %err, "writer grant failed");
            }
        }
        tracing::info!(branch, spreadsheet_id = %id, "created branch spreadsheet");
        Ok(id)
    }

    pub async fn append_branch(&self, record: &BranchRecord) -> Result<(), SheetsError> {
        self.ensure_directory_sheet().await?;
        self.backend
            .append_row(&self.master_sheet_id, DIRECTORY_SHEET_NAME, &record.to_row())
            .await?;
        self.cache
            .put(
                CacheKey::new(&record.name, CacheView::SpreadsheetId),
                Value::String(record.spreadsheet_id.clone()),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barberboard_sheets::FakeSheets;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const MASTER: &str = "dir-sheet";

    fn directory_row(name: &str, spreadsheet_id: &str) -> Vec<String> {
        vec![
            name.to_string(),
            "ул. Ленина 1".to_string(),
            "Анна".to_string(),
            "+7 900 000-00-00".to_string(),
            "hash".to_string(),
            "tok".to_string(),
            "2024-03-01 10:00:00".to_string(),
            spreadsheet_id.to_string(),
            "active".to_string(),
        ]
    }

    async fn seeded(rows: Vec<Vec<String>>) -> Arc<FakeSheets> {
        let fake = Arc::new(FakeSheets::default());
        fake.insert_spreadsheet(MASTER, "BarberBoard").await;
        let mut grid = vec![DIRECTORY_HEADERS
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>()];
        grid.extend(rows);
        fake.spreadsheets
            .lock()
            .await
            .get_mut(MASTER)
            .expect("master spreadsheet")
            .sheets
            .push((DIRECTORY_SHEET_NAME.to_string(), grid));
        fake
    }

    fn directory(fake: &Arc<FakeSheets>) -> Directory {
        Directory::new(
            fake.clone(),
            Arc::new(ResponseCache::new(Duration::from_secs(60))),
            MASTER.to_string(),
            None,
            None,
        )
    }

    #[tokio::test]
    async fn resolve_verifies_then_caches_the_mapping() {
        let fake = seeded(vec![directory_row("Тверская", "sheet-1")]).await;
        fake.insert_spreadsheet("sheet-1", "BarberBoard - Тверская").await;
        let dir = directory(&fake);

        assert_eq!(dir.resolve("Тверская").await.unwrap(), "sheet-1");
        let reads = fake.read_calls.load(Ordering::SeqCst);
        assert_eq!(dir.resolve("Тверская").await.unwrap(), "sheet-1");
        assert_eq!(fake.read_calls.load(Ordering::SeqCst), reads);
    }

    #[tokio::test]
    async fn resolve_backfills_a_missing_spreadsheet_id() {
        let fake = seeded(vec![directory_row("Тверская", "")]).await;
        let dir = directory(&fake);

        let id = dir.resolve("Тверская").await.unwrap();
        assert_eq!(id, "fake-sheet-1");

        let grid = fake.rows(MASTER, DIRECTORY_SHEET_NAME).await.unwrap();
        assert_eq!(grid[1][SPREADSHEET_ID_COLUMN as usize - 1], "fake-sheet-1");
    }

    #[tokio::test]
    async fn resolve_flags_mappings_to_deleted_spreadsheets() {
        let fake = seeded(vec![directory_row("Тверская", "ghost")]).await;
        let dir = directory(&fake);

        let err = dir.resolve("Тверская").await.unwrap_err();
        assert_eq!(err.kind(), "dangling_reference");
        assert!(err.detail().contains("ghost"));
    }

    #[tokio::test]
    async fn unknown_branch_is_not_found() {
        let fake = seeded(vec![directory_row("Тверская", "sheet-1")]).await;
        let dir = directory(&fake);

        let err = dir.resolve("Арбат").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(err.detail(), "Филиал не найден");
    }

    #[tokio::test]
    async fn missing_master_spreadsheet_reads_as_configuration() {
        let fake = Arc::new(FakeSheets::default());
        let dir = directory(&fake);

        let err = dir.resolve("Тверская").await.unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.detail().contains("GOOGLE_SHEET_ID"));
    }

    #[tokio::test]
    async fn created_spreadsheets_are_moved_and_shared_when_configured() {
        let fake = seeded(vec![directory_row("Тверская", "")]).await;
        let dir = Directory::new(
            fake.clone(),
            Arc::new(ResponseCache::new(Duration::from_secs(60))),
            MASTER.to_string(),
            Some("folder-7".to_string()),
            Some("svc@project.iam.gserviceaccount.com".to_string()),
        );

        let id = dir.resolve("Тверская").await.unwrap();
        assert_eq!(
            fake.moved.lock().await.as_slice(),
            &[(id.clone(), "folder-7".to_string())]
        );
        assert_eq!(
            fake.grants.lock().await.as_slice(),
            &[(id, "svc@project.iam.gserviceaccount.com".to_string())]
        );
    }

    #[tokio::test]
    async fn append_branch_writes_a_directory_row_and_primes_the_cache() {
        let fake = seeded(vec![]).await;
        let dir = directory(&fake);
        let record = BranchRecord::from_row(&directory_row("Арбат", "sheet-9")).unwrap();

        dir.append_branch(&record).await.unwrap();

        let grid = fake.rows(MASTER, DIRECTORY_SHEET_NAME).await.unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[1][0], "Арбат");
        // Lookup after append must see it without another directory read.
        fake.insert_spreadsheet("sheet-9", "BarberBoard - Арбат").await;
        assert_eq!(dir.resolve("Арбат").await.unwrap(), "sheet-9");
    }
}
