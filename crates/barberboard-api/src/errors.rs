// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Machine taxonomy tag carried in every error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ApiErrorCode {
    Configuration,
    Auth,
    NotFound,
    DanglingReference,
    Validation,
    QuotaExceeded,
    Internal,
}

impl ApiErrorCode {
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            ApiErrorCode::Configuration => 500,
            ApiErrorCode::Auth => 401,
            ApiErrorCode::NotFound => 404,
            ApiErrorCode::DanglingReference => 500,
            ApiErrorCode::Validation => 400,
            ApiErrorCode::QuotaExceeded => 507,
            ApiErrorCode::Internal => 500,
        }
    }
}

/// Error envelope. `success` is always `false`; clients branch on it first,
/// then on `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    pub code: ApiErrorCode,
    pub request_id: String,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code,
            request_id: "req-unknown".to_string(),
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    #[must_use]
    pub fn validation(error: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Validation, error)
    }

    #[must_use]
    pub fn auth(error: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Auth, error)
    }

    #[must_use]
    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, error)
    }

    #[must_use]
    pub fn internal(error: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, error)
    }

    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}
