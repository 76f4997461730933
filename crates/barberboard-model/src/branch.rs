use crate::category::CellValue;
use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const BRANCH_NAME_MAX_LEN: usize = 120;

pub const DIRECTORY_SHEET_NAME: &str = "Филиалы";
pub const DIRECTORY_HEADERS: &[&str] = &[
    "Название",
    "Адрес",
    "Управляющий",
    "Телефон",
    "Пароль (хеш)",
    "Токен",
    "Дата регистрации",
    "Spreadsheet ID",
    "Статус",
];
pub const DIRECTORY_SHEET_ROWS: u32 = 100;
pub const DIRECTORY_SHEET_COLS: u32 = 10;

/// 1-based column of the per-branch spreadsheet id in the directory sheet.
pub const SPREADSHEET_ID_COLUMN: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct BranchName(String);

impl BranchName {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError("branch name must not be empty".to_string()));
        }
        if trimmed.chars().count() > BRANCH_NAME_MAX_LEN {
            return Err(ValidationError(format!(
                "branch name exceeds max length {BRANCH_NAME_MAX_LEN}"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ValidationError(
                "branch name must not contain control characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for BranchName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStatus {
    Active,
    Blocked,
}

impl BranchStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BranchStatus::Active => "active",
            BranchStatus::Blocked => "blocked",
        }
    }

    /// Directory rows written before the status column existed read as active.
    #[must_use]
    pub fn from_cell(cell: &str) -> BranchStatus {
        let normalized = cell.trim().to_lowercase();
        if normalized == "blocked" || normalized == "заблокирован" {
            BranchStatus::Blocked
        } else {
            BranchStatus::Active
        }
    }
}

impl Display for BranchStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the branch directory sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchRecord {
    pub name: String,
    pub address: String,
    pub manager_name: String,
    pub manager_phone: String,
    pub password_hash: String,
    pub token: String,
    pub registered_at: String,
    pub spreadsheet_id: String,
    pub status: BranchStatus,
}

impl BranchRecord {
    /// Reads a directory row as stored in the sheet. Returns `None` for
    /// blank and padding rows. Short rows are tolerated so directories
    /// written before newer columns existed still resolve.
    #[must_use]
    pub fn from_row(row: &[String]) -> Option<BranchRecord> {
        let cell = |idx: usize| row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default();
        let name = cell(0);
        if name.is_empty() {
            return None;
        }
        Some(BranchRecord {
            name,
            address: cell(1),
            manager_name: cell(2),
            manager_phone: cell(3),
            password_hash: cell(4),
            token: cell(5),
            registered_at: cell(6),
            spreadsheet_id: cell(7),
            status: BranchStatus::from_cell(&cell(8)),
        })
    }

    #[must_use]
    pub fn to_row(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(self.name.clone()),
            CellValue::Text(self.address.clone()),
            CellValue::Text(self.manager_name.clone()),
            CellValue::Text(self.manager_phone.clone()),
            CellValue::Text(self.password_hash.clone()),
            CellValue::Text(self.token.clone()),
            CellValue::Text(self.registered_at.clone()),
            CellValue::Text(self.spreadsheet_id.clone()),
            CellValue::Text(self.status.as_str().to_string()),
        ]
    }
}
