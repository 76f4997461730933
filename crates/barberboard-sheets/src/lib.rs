#![forbid(unsafe_code)]
//! Spreadsheet access layer: credential resolution, the `SheetsBackend`
//! trait, the Google REST implementation and an in-memory fake for tests.

use std::fmt::{Display, Formatter};

mod auth;
mod backend;
mod fake;
mod google;

pub use auth::{
    service_account_email_from_env, CredentialSource, DelegatedUserSecret, ServiceAccountKey,
    TokenProvider, GOOGLE_OAUTH_TOKEN_ENV, GOOGLE_SERVICE_ACCOUNT_JSON_ENV,
};
pub use backend::{records_from_grid, RetryPolicy, SheetsBackend};
pub use fake::{FakeSheets, FakeSpreadsheet};
pub use google::GoogleSheetsBackend;

pub const CRATE_NAME: &str = "barberboard-sheets";

/// Failure taxonomy for remote spreadsheet operations. Each variant carries
/// the full human-readable detail; `kind` is the stable machine tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetsError {
    Configuration(String),
    Auth(String),
    NotFound(String),
    DanglingReference(String),
    QuotaExceeded(String),
    Api(String),
}

impl SheetsError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SheetsError::Configuration(_) => "configuration",
            SheetsError::Auth(_) => "auth",
            SheetsError::NotFound(_) => "not_found",
            SheetsError::DanglingReference(_) => "dangling_reference",
            SheetsError::QuotaExceeded(_) => "quota_exceeded",
            SheetsError::Api(_) => "api",
        }
    }

    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            SheetsError::Configuration(detail)
            | SheetsError::Auth(detail)
            | SheetsError::NotFound(detail)
            | SheetsError::DanglingReference(detail)
            | SheetsError::QuotaExceeded(detail)
            | SheetsError::Api(detail) => detail,
        }
    }
}

impl Display for SheetsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.detail())
    }
}

impl std::error::Error for SheetsError {}
