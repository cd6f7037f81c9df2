//! Request bodies as received on the wire, and the validated inputs the
//! storage layer accepts.
//!
//! Wire requests keep every field optional so that a missing field can be
//! reported by name. Dates travel as strings and are accepted either as
//! RFC 3339 timestamps or as plain `YYYY-MM-DD` calendar dates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{
    Category, InitiativeStatus, Level, OkrStatus, Priority, ProjectStatus, Severity, UserProfile,
};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Use together with `#[serde(default)]`.
pub fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parses an RFC 3339 timestamp or a `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub progress: Option<i64>,
    pub start_date: Option<String>,
    pub target_end_date: Option<String>,
    pub actual_end_date: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub progress: Option<i64>,
    pub start_date: Option<String>,
    /// `null` clears the date.
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, nullable)]
    pub target_end_date: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, nullable)]
    pub actual_end_date: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateMilestoneRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    /// Defaults to the project's category.
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateRedFlagRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateKeyResultRequest {
    pub description: Option<String>,
    pub target: Option<f64>,
    pub current: Option<f64>,
    pub unit: Option<String>,
    pub status: Option<OkrStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateObjectiveRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<OkrStatus>,
    pub progress: Option<i64>,
    pub quarter: Option<String>,
    pub target_date: Option<String>,
    pub key_results: Option<Vec<CreateKeyResultRequest>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateObjectiveRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<OkrStatus>,
    pub progress: Option<i64>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, nullable)]
    pub quarter: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, nullable)]
    pub target_date: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateKeyResultRequest {
    pub current: Option<f64>,
    pub status: Option<OkrStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateInitiativeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<InitiativeStatus>,
    pub priority: Option<Priority>,
    pub estimated_effort: Option<Level>,
    pub potential_impact: Option<Level>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateInitiativeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<InitiativeStatus>,
    pub priority: Option<Priority>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<Level>, nullable)]
    pub estimated_effort: Option<Option<Level>>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<Level>, nullable)]
    pub potential_impact: Option<Option<Level>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserProfile,
}

// Validated inputs.

#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub progress: i32,
    /// `None` means "now" at insertion time.
    pub start_date: Option<DateTime<Utc>>,
    pub target_end_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Partial project update. `None` leaves a field untouched; for the nullable
/// dates `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub progress: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub target_end_date: Option<Option<DateTime<Utc>>>,
    pub actual_end_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMilestone {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRedFlag {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewKeyResult {
    pub description: String,
    pub target: f64,
    pub current: f64,
    pub unit: String,
    pub status: OkrStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewObjective {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: OkrStatus,
    pub progress: i32,
    pub quarter: Option<String>,
    pub target_date: Option<DateTime<Utc>>,
    pub key_results: Vec<NewKeyResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectiveChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<OkrStatus>,
    pub progress: Option<i32>,
    pub quarter: Option<Option<String>>,
    pub target_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyResultChanges {
    pub current: Option<f64>,
    pub status: Option<OkrStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInitiative {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: InitiativeStatus,
    pub priority: Priority,
    pub estimated_effort: Option<Level>,
    pub potential_impact: Option<Level>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitiativeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<InitiativeStatus>,
    pub priority: Option<Priority>,
    pub estimated_effort: Option<Option<Level>>,
    pub potential_impact: Option<Option<Level>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// Lower-cased and trimmed.
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}
