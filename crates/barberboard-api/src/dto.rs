// SPDX-License-Identifier: Apache-2.0

use barberboard_model::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError(format!("{field} must not be empty")));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub address: String,
    pub manager_name: String,
    pub manager_phone: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("address", &self.address)?;
        require("manager_name", &self.manager_name)?;
        require("manager_phone", &self.manager_phone)?;
        require("password", &self.password)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("password", &self.password)?;
        Ok(())
    }
}

/// Branch profile returned on login. Field names are part of the client
/// contract and differ from the directory column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchProfile {
    pub name: String,
    pub address: String,
    pub manager: String,
    pub phone: String,
    pub spreadsheet_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub branch: BranchProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Lenient record list: a branch whose sheet does not exist yet reads as an
/// empty list, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordsResponse {
    pub success: bool,
    pub data: Vec<Value>,
}

impl RecordsResponse {
    #[must_use]
    pub fn new(data: Vec<Value>) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// One dashboard tile: records this month against the monthly goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryCard {
    pub current: u32,
    pub goal: u32,
    pub percentage: f64,
    pub label: String,
}

/// POST dashboard body: recompute for another month and/or with adjusted
/// per-category goals (keyed by dashboard key).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DashboardOverrides {
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub goals: Option<HashMap<String, u32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSummaryRequest {
    pub manager: String,
    pub month: String,
}

impl BranchSummaryRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("manager", &self.manager)?;
        require("month", &self.month)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthResponse {
    pub success: bool,
    pub status: String,
    pub version: String,
    pub cache_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheStatsResponse {
    pub success: bool,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub invalidations: u64,
    pub entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_request_requires_every_field() {
        let request = RegisterRequest {
            name: "Центральный".to_string(),
            address: "ул. Ленина 1".to_string(),
            manager_name: "Иван".to_string(),
            manager_phone: "+7 900".to_string(),
            password: "secret".to_string(),
        };
        assert!(request.validate().is_ok());
        let mut blank = request.clone();
        blank.manager_phone = "  ".to_string();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn dashboard_overrides_default_to_none() {
        let overrides: DashboardOverrides = serde_json::from_value(json!({})).expect("empty body");
        assert_eq!(overrides, DashboardOverrides::default());
        let overrides: DashboardOverrides =
            serde_json::from_value(json!({"month": "Март 2024", "goals": {"reviews": 40}}))
                .expect("full body");
        assert_eq!(overrides.month.as_deref(), Some("Март 2024"));
        assert_eq!(
            overrides.goals.as_ref().and_then(|g| g.get("reviews")),
            Some(&40)
        );
    }

    #[test]
    fn login_response_shape_is_stable() {
        let response = LoginResponse {
            success: true,
            token: "tok".to_string(),
            branch: BranchProfile {
                name: "Центральный".to_string(),
                address: "ул. Ленина 1".to_string(),
                manager: "Иван".to_string(),
                phone: "+7 900".to_string(),
                spreadsheet_id: "sheet-42".to_string(),
            },
        };
        let body = serde_json::to_value(&response).expect("serialize");
        assert_eq!(body["branch"]["manager"], "Иван");
        assert_eq!(body["branch"]["spreadsheet_id"], "sheet-42");
    }
}
