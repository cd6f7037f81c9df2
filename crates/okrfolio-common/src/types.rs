use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declares a closed string enum whose wire, database and query-string
/// representation are the same snake_case literal.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
        )]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(format!("unknown {}: {s}", stringify!($name))),
                }
            }
        }
    };
}

wire_enum! {
    /// Life area a project, objective, initiative or milestone belongs to.
    pub enum Category {
        Work => "work",
        Training => "training",
        Music => "music",
        Personal => "personal",
        Learning => "learning",
        Other => "other",
    }
}

wire_enum! {
    pub enum ProjectStatus {
        Planning => "planning",
        Active => "active",
        OnHold => "on_hold",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl ProjectStatus {
    /// Statuses whose projects still count towards average progress.
    pub const OPEN: &'static [ProjectStatus] = &[
        ProjectStatus::Planning,
        ProjectStatus::Active,
        ProjectStatus::OnHold,
    ];
}

wire_enum! {
    /// Priority of a project or initiative.
    pub enum Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

wire_enum! {
    /// Severity of a red flag. Shares the rank table with [`Priority`].
    pub enum Severity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

impl Severity {
    /// Severities surfaced on the dashboard as critical red flags.
    pub const ALARMING: &'static [Severity] = &[Severity::High, Severity::Critical];
}

wire_enum! {
    /// Status shared by objectives and key results.
    pub enum OkrStatus {
        NotStarted => "not_started",
        OnTrack => "on_track",
        AtRisk => "at_risk",
        OffTrack => "off_track",
        Completed => "completed",
    }
}

wire_enum! {
    pub enum InitiativeStatus {
        Idea => "idea",
        Evaluating => "evaluating",
        Approved => "approved",
        InProgress => "in_progress",
        Completed => "completed",
        Rejected => "rejected",
    }
}

wire_enum! {
    /// Coarse estimate used for an initiative's effort and impact.
    pub enum Level {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

/// A dated, completable checkpoint within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Milestone {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub completed: bool,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A recorded risk or blocker against a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RedFlag {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: ProjectStatus,
    pub priority: Priority,
    /// Always within 0..=100.
    pub progress: i32,
    pub start_date: DateTime<Utc>,
    pub target_end_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    /// Ordered by date, earliest first.
    pub milestones: Vec<Milestone>,
    /// Ordered newest first.
    pub red_flags: Vec<RedFlag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Id and title of the project a child entity hangs off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProjectRef {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RedFlagWithProject {
    #[serde(flatten)]
    pub red_flag: RedFlag,
    pub project: ProjectRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MilestoneWithProject {
    #[serde(flatten)]
    pub milestone: Milestone,
    pub project: ProjectRef,
}

/// A measurable target/current/unit triple quantifying progress toward an
/// objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct KeyResult {
    pub id: String,
    pub objective_id: String,
    pub description: String,
    pub target: f64,
    pub current: f64,
    pub unit: String,
    pub status: OkrStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Objective {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: OkrStatus,
    /// Derived from `key_results` whenever at least one of them has a
    /// description; otherwise the stored value.
    pub progress: i32,
    pub quarter: Option<String>,
    pub target_date: Option<DateTime<Utc>>,
    /// Ordered by creation, oldest first.
    pub key_results: Vec<KeyResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A candidate idea not yet committed to as a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Initiative {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: InitiativeStatus,
    pub priority: Priority,
    pub estimated_effort: Option<Level>,
    pub potential_impact: Option<Level>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored account, including the password hash. Never serialized to clients.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            created_at: user.created_at,
        }
    }
}

/// Exact-match filter for project listings. `None` fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub category: Option<Category>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectiveFilter {
    pub status: Option<OkrStatus>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Default)]
pub struct InitiativeFilter {
    pub status: Option<InitiativeStatus>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProjectStats {
    pub total: u64,
    pub active: u64,
    pub completed: u64,
    /// Mean progress of planning, active and on-hold projects.
    pub avg_progress: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ObjectiveStats {
    pub total: u64,
    pub on_track: u64,
    pub at_risk: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct InitiativeStats {
    pub total: u64,
    pub in_progress: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RedFlagStats {
    pub unresolved: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MilestoneStats {
    /// Incomplete milestones inside the upcoming window.
    pub upcoming: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DashboardStats {
    pub projects: ProjectStats,
    pub objectives: ObjectiveStats,
    pub initiatives: InitiativeStats,
    pub red_flags: RedFlagStats,
    pub milestones: MilestoneStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DashboardSummary {
    /// Five most recently updated projects, each with at most three earliest
    /// milestones and three unresolved red flags.
    pub recent_projects: Vec<Project>,
    pub recent_objectives: Vec<Objective>,
    pub recent_initiatives: Vec<Initiative>,
    /// Unresolved high and critical red flags, newest first.
    pub critical_red_flags: Vec<RedFlagWithProject>,
}

/// Milestones of one calendar month on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TimelineMonth {
    /// `YYYY-MM`.
    pub month: String,
    pub milestones: Vec<MilestoneWithProject>,
}
