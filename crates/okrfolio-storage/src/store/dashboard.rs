//! Read-only aggregation over the portfolio tables.
//!
//! Each aggregate issues its independent sub-queries concurrently and fails
//! as a whole if any one of them fails.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use okrfolio_common::rules::{
    average_progress, group_by_month, is_milestone_upcoming, rank_by_severity_or_priority,
};
use okrfolio_common::types::{
    Category, DashboardStats, DashboardSummary, InitiativeStats, InitiativeStatus,
    MilestoneStats, MilestoneWithProject, ObjectiveStats, OkrStatus, ProjectRef, ProjectStats,
    ProjectStatus, RedFlagStats, RedFlagWithProject, Severity, TimelineMonth,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::entities::{initiative, milestone, objective, project, red_flag};
use crate::error::Result;
use crate::store::project::{to_milestone, to_red_flag};
use crate::store::{owned_project_ids, PortfolioStore};

/// Number of entries per family in the dashboard summary.
const SUMMARY_LIMIT: u64 = 5;
/// Children shown per project in the dashboard summary.
const SUMMARY_CHILDREN: usize = 3;

impl PortfolioStore {
    async fn count_projects(&self, owner: &str, status: Option<ProjectStatus>) -> Result<u64> {
        let mut q = project::Entity::find().filter(project::Column::UserId.eq(owner));
        if let Some(status) = status {
            q = q.filter(project::Column::Status.eq(status.as_str()));
        }
        Ok(q.count(self.db()).await?)
    }

    async fn count_objectives(&self, owner: &str, status: Option<OkrStatus>) -> Result<u64> {
        let mut q = objective::Entity::find().filter(objective::Column::UserId.eq(owner));
        if let Some(status) = status {
            q = q.filter(objective::Column::Status.eq(status.as_str()));
        }
        Ok(q.count(self.db()).await?)
    }

    async fn count_initiatives(
        &self,
        owner: &str,
        status: Option<InitiativeStatus>,
    ) -> Result<u64> {
        let mut q = initiative::Entity::find().filter(initiative::Column::UserId.eq(owner));
        if let Some(status) = status {
            q = q.filter(initiative::Column::Status.eq(status.as_str()));
        }
        Ok(q.count(self.db()).await?)
    }

    async fn count_unresolved_red_flags(&self, owner: &str) -> Result<u64> {
        let count = red_flag::Entity::find()
            .filter(red_flag::Column::Resolved.eq(false))
            .filter(red_flag::Column::ProjectId.in_subquery(owned_project_ids(owner)))
            .count(self.db())
            .await?;
        Ok(count)
    }

    async fn open_project_progress(&self, owner: &str) -> Result<Vec<i32>> {
        let open: Vec<&str> = ProjectStatus::OPEN.iter().map(|s| s.as_str()).collect();
        let values: Vec<i32> = project::Entity::find()
            .select_only()
            .column(project::Column::Progress)
            .filter(project::Column::UserId.eq(owner))
            .filter(project::Column::Status.is_in(open))
            .into_tuple()
            .all(self.db())
            .await?;
        Ok(values)
    }

    async fn count_upcoming_milestones(
        &self,
        owner: &str,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Result<u64> {
        let rows = milestone::Entity::find()
            .filter(milestone::Column::Completed.eq(false))
            .filter(milestone::Column::ProjectId.in_subquery(owned_project_ids(owner)))
            .all(self.db())
            .await?;
        let mut upcoming = 0;
        for row in rows {
            if is_milestone_upcoming(&to_milestone(row)?, now, window_days) {
                upcoming += 1;
            }
        }
        Ok(upcoming)
    }

    /// Id and title of every project the owner has, keyed by id.
    async fn owned_project_refs(&self, owner: &str) -> Result<HashMap<String, ProjectRef>> {
        let rows: Vec<(String, String)> = project::Entity::find()
            .select_only()
            .column(project::Column::Id)
            .column(project::Column::Title)
            .filter(project::Column::UserId.eq(owner))
            .into_tuple()
            .all(self.db())
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, title)| (id.clone(), ProjectRef { id, title }))
            .collect())
    }

    /// Unresolved red flags of the owner with their project, newest first,
    /// optionally restricted to the given severities.
    async fn unresolved_flags_with_project(
        &self,
        owner: &str,
        severities: Option<&[Severity]>,
    ) -> Result<Vec<RedFlagWithProject>> {
        let projects = self.owned_project_refs(owner).await?;
        if projects.is_empty() {
            return Ok(Vec::new());
        }
        let mut q = red_flag::Entity::find()
            .filter(red_flag::Column::Resolved.eq(false))
            .filter(red_flag::Column::ProjectId.is_in(projects.keys().cloned()));
        if let Some(severities) = severities {
            q = q.filter(red_flag::Column::Severity.is_in(severities.iter().map(|s| s.as_str())));
        }
        let rows = q
            .order_by_desc(red_flag::Column::CreatedAt)
            .order_by_desc(red_flag::Column::Id)
            .all(self.db())
            .await?;

        let mut flags = Vec::with_capacity(rows.len());
        for row in rows {
            let red_flag = to_red_flag(row)?;
            if let Some(project) = projects.get(&red_flag.project_id) {
                flags.push(RedFlagWithProject {
                    project: project.clone(),
                    red_flag,
                });
            }
        }
        Ok(flags)
    }

    /// Milestones of the owner with their project, earliest first.
    async fn milestones_with_project(
        &self,
        owner: &str,
        category: Option<Category>,
        incomplete_only: bool,
    ) -> Result<Vec<MilestoneWithProject>> {
        let projects = self.owned_project_refs(owner).await?;
        if projects.is_empty() {
            return Ok(Vec::new());
        }
        let mut q = milestone::Entity::find()
            .filter(milestone::Column::ProjectId.is_in(projects.keys().cloned()));
        if let Some(category) = category {
            q = q.filter(milestone::Column::Category.eq(category.as_str()));
        }
        if incomplete_only {
            q = q.filter(milestone::Column::Completed.eq(false));
        }
        let rows = q
            .order_by_asc(milestone::Column::Date)
            .order_by_asc(milestone::Column::Id)
            .all(self.db())
            .await?;

        let mut milestones = Vec::with_capacity(rows.len());
        for row in rows {
            let milestone = to_milestone(row)?;
            if let Some(project) = projects.get(&milestone.project_id) {
                milestones.push(MilestoneWithProject {
                    project: project.clone(),
                    milestone,
                });
            }
        }
        Ok(milestones)
    }

    /// Counts and averages across the owner's portfolio.
    pub async fn dashboard_stats(
        &self,
        owner: &str,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Result<DashboardStats> {
        let (
            total,
            active,
            completed,
            open_progress,
            objectives_total,
            on_track,
            at_risk,
            initiatives_total,
            in_progress,
            unresolved,
            upcoming,
        ) = tokio::try_join!(
            self.count_projects(owner, None),
            self.count_projects(owner, Some(ProjectStatus::Active)),
            self.count_projects(owner, Some(ProjectStatus::Completed)),
            self.open_project_progress(owner),
            self.count_objectives(owner, None),
            self.count_objectives(owner, Some(OkrStatus::OnTrack)),
            self.count_objectives(owner, Some(OkrStatus::AtRisk)),
            self.count_initiatives(owner, None),
            self.count_initiatives(owner, Some(InitiativeStatus::InProgress)),
            self.count_unresolved_red_flags(owner),
            self.count_upcoming_milestones(owner, now, window_days),
        )?;

        Ok(DashboardStats {
            projects: ProjectStats {
                total,
                active,
                completed,
                avg_progress: average_progress(&open_progress),
            },
            objectives: ObjectiveStats {
                total: objectives_total,
                on_track,
                at_risk,
            },
            initiatives: InitiativeStats {
                total: initiatives_total,
                in_progress,
            },
            red_flags: RedFlagStats { unresolved },
            milestones: MilestoneStats { upcoming },
        })
    }

    /// Most recently updated entries per family plus the critical red flags.
    pub async fn dashboard_summary(&self, owner: &str) -> Result<DashboardSummary> {
        let (mut recent_projects, recent_objectives, recent_initiatives, critical_red_flags) = tokio::try_join!(
            self.recent_projects(owner, SUMMARY_LIMIT),
            self.recent_objectives(owner, SUMMARY_LIMIT),
            self.recent_initiatives(owner, SUMMARY_LIMIT),
            self.unresolved_flags_with_project(owner, Some(Severity::ALARMING)),
        )?;

        for project in &mut recent_projects {
            project.milestones.truncate(SUMMARY_CHILDREN);
            project.red_flags.retain(|flag| !flag.resolved);
            project.red_flags.truncate(SUMMARY_CHILDREN);
        }

        Ok(DashboardSummary {
            recent_projects,
            recent_objectives,
            recent_initiatives,
            critical_red_flags,
        })
    }

    /// Every unresolved red flag of the owner, most severe first. Within a
    /// severity the newest flag comes first.
    pub async fn red_flag_board(&self, owner: &str) -> Result<Vec<RedFlagWithProject>> {
        let flags = self.unresolved_flags_with_project(owner, None).await?;
        Ok(rank_by_severity_or_priority(flags, |item| item.red_flag.severity))
    }

    /// Incomplete milestones due within `window_days` of `now`, earliest first.
    pub async fn upcoming_milestones(
        &self,
        owner: &str,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Result<Vec<MilestoneWithProject>> {
        let milestones = self.milestones_with_project(owner, None, true).await?;
        Ok(milestones
            .into_iter()
            .filter(|item| is_milestone_upcoming(&item.milestone, now, window_days))
            .collect())
    }

    /// Milestones grouped by month. With `upcoming_only`, completed and past
    /// milestones are left out.
    pub async fn milestone_timeline(
        &self,
        owner: &str,
        category: Option<Category>,
        upcoming_only: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<TimelineMonth>> {
        let mut milestones = self
            .milestones_with_project(owner, category, upcoming_only)
            .await?;
        if upcoming_only {
            milestones.retain(|item| item.milestone.date >= now);
        }
        Ok(group_by_month(milestones))
    }
}
