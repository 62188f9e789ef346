//! Status and type enumerations shared by templates, instances and steps.
//!
//! Every enum serializes in `snake_case` and round-trips through the string
//! stored in the database via `as_str` / `from_str_db`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Workflow type
// ---------------------------------------------------------------------------

/// The fixed set of HR processes driven by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    Recruitment,
    Onboarding,
    Resignation,
    PerformanceReview,
    Promotion,
    Transfer,
    SalaryAdjustment,
    Training,
    ContractRenewal,
    ProbationAssessment,
    Interview,
    ExitInterview,
    AttendanceCorrection,
    PointsRedemption,
    SalaryCalculation,
}

impl WorkflowType {
    pub const ALL: [WorkflowType; 15] = [
        Self::Recruitment,
        Self::Onboarding,
        Self::Resignation,
        Self::PerformanceReview,
        Self::Promotion,
        Self::Transfer,
        Self::SalaryAdjustment,
        Self::Training,
        Self::ContractRenewal,
        Self::ProbationAssessment,
        Self::Interview,
        Self::ExitInterview,
        Self::AttendanceCorrection,
        Self::PointsRedemption,
        Self::SalaryCalculation,
    ];

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recruitment => "recruitment",
            Self::Onboarding => "onboarding",
            Self::Resignation => "resignation",
            Self::PerformanceReview => "performance_review",
            Self::Promotion => "promotion",
            Self::Transfer => "transfer",
            Self::SalaryAdjustment => "salary_adjustment",
            Self::Training => "training",
            Self::ContractRenewal => "contract_renewal",
            Self::ProbationAssessment => "probation_assessment",
            Self::Interview => "interview",
            Self::ExitInterview => "exit_interview",
            Self::AttendanceCorrection => "attendance_correction",
            Self::PointsRedemption => "points_redemption",
            Self::SalaryCalculation => "salary_calculation",
        }
    }

    /// Parse a workflow type string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid workflow type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Instance status
// ---------------------------------------------------------------------------

/// Lifecycle state of a workflow instance.
///
/// `draft -> active -> {completed, cancelled}`, with `active <-> paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl InstanceStatus {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(CoreError::Validation(format!(
                "Invalid instance status '{s}'. Must be one of: draft, active, paused, completed, cancelled"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled instances never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// Step status
// ---------------------------------------------------------------------------

/// Runtime state of a single step: `pending -> in_progress -> {completed, skipped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(CoreError::Validation(format!(
                "Invalid priority '{s}'. Must be one of: low, medium, high, urgent"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}
