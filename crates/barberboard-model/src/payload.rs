// SPDX-License-Identifier: Apache-2.0

//! Category submission payloads: deserialization, validation and the mapping
//! from payload to sheet row. Row layouts must stay aligned with the header
//! tables in `category.rs`; the first cell is always the server timestamp.

use crate::category::CellValue;
use crate::math::{overall_score, plan_fact_pct};
use crate::ValidationError;
use serde::Deserialize;

fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(())
}

fn require_non_negative_int(field: &str, value: i64) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError(format!("{field} must not be negative")));
    }
    Ok(())
}

fn optional_text(value: &Option<String>) -> CellValue {
    match value {
        Some(v) => CellValue::Text(v.clone()),
        None => CellValue::Text(String::new()),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MorningEvent {
    pub week: i64,
    pub date: String,
    pub event_type: String,
    pub participants: i64,
    pub efficiency: i64,
    #[serde(default)]
    pub comment: String,
}

impl MorningEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_range("week", self.week, 1, 53)?;
        require_non_empty("date", &self.date)?;
        require_non_empty("event_type", &self.event_type)?;
        require_range("participants", self.participants, 0, 100)?;
        require_range("efficiency", self.efficiency, 1, 5)?;
        Ok(())
    }

    #[must_use]
    pub fn build_row(&self, timestamp: &str) -> Vec<CellValue> {
        vec![
            CellValue::Text(timestamp.to_string()),
            CellValue::Text(self.date.clone()),
            CellValue::Int(self.week),
            CellValue::Text(self.event_type.clone()),
            CellValue::Int(self.participants),
            CellValue::Int(self.efficiency),
            CellValue::Text(self.comment.clone()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldVisit {
    pub date: String,
    pub master_name: String,
    pub haircut_quality: i64,
    pub service_quality: i64,
    pub additional_services_comment: String,
    pub additional_services_rating: i64,
    pub cosmetics_comment: String,
    pub cosmetics_rating: i64,
    pub standards_comment: String,
    pub standards_rating: i64,
    pub errors_comment: String,
    #[serde(default)]
    pub next_check_date: Option<String>,
}

impl FieldVisit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("date", &self.date)?;
        require_non_empty("master_name", &self.master_name)?;
        require_range("haircut_quality", self.haircut_quality, 1, 10)?;
        require_range("service_quality", self.service_quality, 1, 10)?;
        require_range(
            "additional_services_rating",
            self.additional_services_rating,
            1,
            10,
        )?;
        require_range("cosmetics_rating", self.cosmetics_rating, 1, 10)?;
        require_range("standards_rating", self.standards_rating, 1, 10)?;
        Ok(())
    }

    /// Mean of the five sub-ratings, one decimal.
    #[must_use]
    pub fn overall(&self) -> f64 {
        overall_score([
            self.haircut_quality,
            self.service_quality,
            self.additional_services_rating,
            self.cosmetics_rating,
            self.standards_rating,
        ])
    }

    #[must_use]
    pub fn build_row(&self, timestamp: &str) -> Vec<CellValue> {
        vec![
            CellValue::Text(timestamp.to_string()),
            CellValue::Text(self.date.clone()),
            CellValue::Text(self.master_name.clone()),
            CellValue::Int(self.haircut_quality),
            CellValue::Int(self.service_quality),
            CellValue::Text(self.additional_services_comment.clone()),
            CellValue::Int(self.additional_services_rating),
            CellValue::Text(self.cosmetics_comment.clone()),
            CellValue::Int(self.cosmetics_rating),
            CellValue::Text(self.standards_comment.clone()),
            CellValue::Int(self.standards_rating),
            CellValue::Text(self.errors_comment.clone()),
            CellValue::Float(self.overall()),
            optional_text(&self.next_check_date),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneOnOneMeeting {
    pub date: String,
    pub master_name: String,
    pub goal: String,
    pub results: String,
    pub development_plan: String,
    pub indicator: String,
    #[serde(default)]
    pub next_meeting_date: Option<String>,
}

impl OneOnOneMeeting {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("date", &self.date)?;
        require_non_empty("master_name", &self.master_name)?;
        Ok(())
    }

    #[must_use]
    pub fn build_row(&self, timestamp: &str) -> Vec<CellValue> {
        vec![
            CellValue::Text(timestamp.to_string()),
            CellValue::Text(self.date.clone()),
            CellValue::Text(self.master_name.clone()),
            CellValue::Text(self.goal.clone()),
            CellValue::Text(self.results.clone()),
            CellValue::Text(self.development_plan.clone()),
            CellValue::Text(self.indicator.clone()),
            optional_text(&self.next_meeting_date),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeeklyMetrics {
    pub period: String,
    pub average_check_plan: f64,
    pub average_check_fact: f64,
    pub cosmetics_plan: f64,
    pub cosmetics_fact: f64,
    pub additional_services_plan: f64,
    pub additional_services_fact: f64,
}

impl WeeklyMetrics {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("period", &self.period)?;
        require_non_negative("average_check_plan", self.average_check_plan)?;
        require_non_negative("average_check_fact", self.average_check_fact)?;
        require_non_negative("cosmetics_plan", self.cosmetics_plan)?;
        require_non_negative("cosmetics_fact", self.cosmetics_fact)?;
        require_non_negative("additional_services_plan", self.additional_services_plan)?;
        require_non_negative("additional_services_fact", self.additional_services_fact)?;
        Ok(())
    }

    #[must_use]
    pub fn build_row(&self, timestamp: &str) -> Vec<CellValue> {
        vec![
            CellValue::Text(timestamp.to_string()),
            CellValue::Text(self.period.clone()),
            CellValue::Float(self.average_check_plan),
            CellValue::Float(self.average_check_fact),
            CellValue::Float(self.cosmetics_plan),
            CellValue::Float(self.cosmetics_fact),
            CellValue::Float(self.additional_services_plan),
            CellValue::Float(self.additional_services_fact),
            CellValue::Float(plan_fact_pct(self.average_check_plan, self.average_check_fact)),
            CellValue::Float(plan_fact_pct(self.cosmetics_plan, self.cosmetics_fact)),
            CellValue::Float(plan_fact_pct(
                self.additional_services_plan,
                self.additional_services_fact,
            )),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewbieAdaptation {
    pub start_date: String,
    pub name: String,
    pub haircut_practice: String,
    pub service_standards: String,
    pub hygiene_sanitation: String,
    pub additional_services: String,
    pub cosmetics_sales: String,
    pub iclient_basics: String,
    pub status: String,
}

impl NewbieAdaptation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("start_date", &self.start_date)?;
        require_non_empty("name", &self.name)?;
        Ok(())
    }

    #[must_use]
    pub fn build_row(&self, timestamp: &str) -> Vec<CellValue> {
        vec![
            CellValue::Text(timestamp.to_string()),
            CellValue::Text(self.start_date.clone()),
            CellValue::Text(self.name.clone()),
            CellValue::Text(self.haircut_practice.clone()),
            CellValue::Text(self.service_standards.clone()),
            CellValue::Text(self.hygiene_sanitation.clone()),
            CellValue::Text(self.additional_services.clone()),
            CellValue::Text(self.cosmetics_sales.clone()),
            CellValue::Text(self.iclient_basics.clone()),
            CellValue::Text(self.status.clone()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MasterPlan {
    pub month: String,
    pub master_name: String,
    pub average_check_plan: f64,
    pub average_check_fact: f64,
    pub additional_services_plan: i64,
    pub additional_services_fact: i64,
    pub sales_plan: f64,
    pub sales_fact: f64,
    pub salary_plan: f64,
    pub salary_fact: f64,
}

impl MasterPlan {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("month", &self.month)?;
        require_non_empty("master_name", &self.master_name)?;
        require_non_negative("average_check_plan", self.average_check_plan)?;
        require_non_negative("average_check_fact", self.average_check_fact)?;
        require_non_negative_int("additional_services_plan", self.additional_services_plan)?;
        require_non_negative_int("additional_services_fact", self.additional_services_fact)?;
        require_non_negative("sales_plan", self.sales_plan)?;
        require_non_negative("sales_fact", self.sales_fact)?;
        require_non_negative("salary_plan", self.salary_plan)?;
        require_non_negative("salary_fact", self.salary_fact)?;
        Ok(())
    }

    #[must_use]
    pub fn build_row(&self, timestamp: &str) -> Vec<CellValue> {
        vec![
            CellValue::Text(timestamp.to_string()),
            CellValue::Text(self.month.clone()),
            CellValue::Text(self.master_name.clone()),
            CellValue::Float(self.average_check_plan),
            CellValue::Float(self.average_check_fact),
            CellValue::Int(self.additional_services_plan),
            CellValue::Int(self.additional_services_fact),
            CellValue::Float(self.sales_plan),
            CellValue::Float(self.sales_fact),
            CellValue::Float(self.salary_plan),
            CellValue::Float(self.salary_fact),
            CellValue::Float(plan_fact_pct(self.average_check_plan, self.average_check_fact)),
            CellValue::Float(plan_fact_pct(
                self.additional_services_plan as f64,
                self.additional_services_fact as f64,
            )),
            CellValue::Float(plan_fact_pct(self.sales_plan, self.sales_fact)),
            CellValue::Float(plan_fact_pct(self.salary_plan, self.salary_fact)),
        ]
    }
}

fn default_review_plan() -> i64 {
    13
}

fn default_review_monthly_target() -> i64 {
    52
}

/// The review form submits the week as a label like `1-я неделя`.
#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    pub week: String,
    pub manager_name: String,
    #[serde(default = "default_review_plan")]
    pub plan: i64,
    pub fact: i64,
    #[serde(default = "default_review_monthly_target")]
    pub monthly_target: i64,
}

impl Review {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("week", &self.week)?;
        require_non_empty("manager_name", &self.manager_name)?;
        require_non_negative_int("plan", self.plan)?;
        require_non_negative_int("fact", self.fact)?;
        require_non_negative_int("monthly_target", self.monthly_target)?;
        Ok(())
    }

    #[must_use]
    pub fn build_row(&self, timestamp: &str) -> Vec<CellValue> {
        vec![
            CellValue::Text(timestamp.to_string()),
            CellValue::Text(self.week.clone()),
            CellValue::Text(self.manager_name.clone()),
            CellValue::Int(self.plan),
            CellValue::Int(self.fact),
            CellValue::Int(self.monthly_target),
            CellValue::Float(plan_fact_pct(self.plan as f64, self.fact as f64)),
        ]
    }
}
