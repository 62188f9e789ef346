//! Typed payloads extracted from the free-form `form_data` bag.
//!
//! Template authors may add any fields they like; only the fields a domain
//! rule depends on are parsed here. Numbers may arrive as JSON numbers or
//! numeric strings, dates as `YYYY-MM-DD` or RFC 3339 timestamps.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::{DbId, JsonMap};
use crate::workflow::status::WorkflowType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecruitmentPayload {
    pub offer_amount: Option<f64>,
    pub position: Option<String>,
    pub interview_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResignationPayload {
    pub last_working_day: Option<NaiveDate>,
    pub reason_category: Option<String>,
    pub handover_to: Option<DbId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalaryPayload {
    pub current_amount: Option<f64>,
    pub proposed_amount: Option<f64>,
    pub effective_date: Option<NaiveDate>,
}

/// Strongly-typed view of the domain fields, tagged by workflow type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainPayload {
    Recruitment(RecruitmentPayload),
    Resignation(ResignationPayload),
    Salary(SalaryPayload),
    Generic,
}

impl DomainPayload {
    /// Parse the payload for `workflow_type` out of `form_data`.
    ///
    /// Absent or `null` fields parse as `None`; present fields of the wrong
    /// shape fail with `Validation`.
    pub fn parse(workflow_type: WorkflowType, form_data: &JsonMap) -> Result<Self, CoreError> {
        Ok(match workflow_type {
            WorkflowType::Recruitment => Self::Recruitment(RecruitmentPayload {
                offer_amount: number_field(form_data, "offer_amount")?,
                position: string_field(form_data, "position")?,
                interview_score: number_field(form_data, "interview_score")?,
            }),
            WorkflowType::Resignation => Self::Resignation(ResignationPayload {
                last_working_day: date_field(form_data, "last_working_day")?,
                reason_category: string_field(form_data, "reason_category")?,
                handover_to: id_field(form_data, "handover_to")?,
            }),
            WorkflowType::SalaryAdjustment => Self::Salary(SalaryPayload {
                current_amount: number_field(form_data, "current_amount")?,
                proposed_amount: number_field(form_data, "proposed_amount")?,
                effective_date: date_field(form_data, "effective_date")?,
            }),
            _ => Self::Generic,
        })
    }
}

/// `base` overlaid with `overlay`, matching the engine's shallow merge.
pub fn merged_form_data(base: &JsonMap, overlay: Option<&JsonMap>) -> JsonMap {
    let mut merged = base.clone();
    if let Some(overlay) = overlay {
        for (key, value) in overlay {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

// ---------------------------------------------------------------------------
// Field parsers
// ---------------------------------------------------------------------------

fn present<'a>(form: &'a JsonMap, key: &str) -> Option<&'a Value> {
    form.get(key).filter(|v| !v.is_null())
}

fn invalid(key: &str, expected: &str, got: &Value) -> CoreError {
    CoreError::Validation(format!("Field '{key}' must be {expected}, got {got}"))
}

fn number_field(form: &JsonMap, key: &str) -> Result<Option<f64>, CoreError> {
    let Some(value) = present(form, key) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .map(Some)
        .ok_or_else(|| invalid(key, "a number", value))
}

fn string_field(form: &JsonMap, key: &str) -> Result<Option<String>, CoreError> {
    match present(form, key) {
        None => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(invalid(key, "a string", other)),
    }
}

fn id_field(form: &JsonMap, key: &str) -> Result<Option<DbId>, CoreError> {
    let Some(value) = present(form, key) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<DbId>().ok(),
        _ => None,
    };
    parsed
        .filter(|id| *id > 0)
        .map(Some)
        .ok_or_else(|| invalid(key, "a positive id", value))
}

fn date_field(form: &JsonMap, key: &str) -> Result<Option<NaiveDate>, CoreError> {
    let Some(value) = present(form, key) else {
        return Ok(None);
    };
    let parsed = value.as_str().and_then(|s| {
        let s = s.trim();
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
    });
    parsed
        .map(Some)
        .ok_or_else(|| invalid(key, "a date (YYYY-MM-DD)", value))
}
