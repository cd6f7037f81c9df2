use std::collections::HashMap;

use chrono::Utc;
use okrfolio_common::requests::{NewMilestone, NewProject, NewRedFlag, ProjectChanges};
use okrfolio_common::rules::clamp_progress;
use okrfolio_common::types::{Milestone, Project, ProjectFilter, RedFlag};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};

use crate::entities::{milestone, project, red_flag};
use crate::error::{parse_column, Result};
use crate::store::PortfolioStore;

pub(crate) fn to_milestone(m: milestone::Model) -> Result<Milestone> {
    Ok(Milestone {
        category: parse_column("milestones.category", &m.category)?,
        id: m.id,
        project_id: m.project_id,
        title: m.title,
        description: m.description,
        date: m.date.with_timezone(&Utc),
        completed: m.completed,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn to_red_flag(m: red_flag::Model) -> Result<RedFlag> {
    Ok(RedFlag {
        severity: parse_column("red_flags.severity", &m.severity)?,
        id: m.id,
        project_id: m.project_id,
        title: m.title,
        description: m.description,
        resolved: m.resolved,
        resolved_at: m.resolved_at.map(|ts| ts.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn to_project(
    m: project::Model,
    milestones: Vec<Milestone>,
    red_flags: Vec<RedFlag>,
) -> Result<Project> {
    Ok(Project {
        category: parse_column("projects.category", &m.category)?,
        status: parse_column("projects.status", &m.status)?,
        priority: parse_column("projects.priority", &m.priority)?,
        tags: serde_json::from_str(&m.tags_json)?,
        id: m.id,
        title: m.title,
        description: m.description,
        progress: clamp_progress(m.progress),
        start_date: m.start_date.with_timezone(&Utc),
        target_end_date: m.target_end_date.map(|ts| ts.with_timezone(&Utc)),
        actual_end_date: m.actual_end_date.map(|ts| ts.with_timezone(&Utc)),
        milestones,
        red_flags,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

impl PortfolioStore {
    pub(crate) async fn find_owned_project(
        &self,
        owner: &str,
        id: &str,
    ) -> Result<Option<project::Model>> {
        let model = project::Entity::find_by_id(id)
            .filter(project::Column::UserId.eq(owner))
            .one(self.db())
            .await?;
        Ok(model)
    }

    /// Loads milestones (earliest first) and red flags (newest first) for the
    /// given projects, preserving the input order of the projects.
    pub(crate) async fn with_children(&self, models: Vec<project::Model>) -> Result<Vec<Project>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();

        let milestone_rows = milestone::Entity::find()
            .filter(milestone::Column::ProjectId.is_in(ids.clone()))
            .order_by_asc(milestone::Column::Date)
            .order_by_asc(milestone::Column::Id)
            .all(self.db())
            .await?;
        let flag_rows = red_flag::Entity::find()
            .filter(red_flag::Column::ProjectId.is_in(ids))
            .order_by_desc(red_flag::Column::CreatedAt)
            .order_by_desc(red_flag::Column::Id)
            .all(self.db())
            .await?;

        let mut milestones: HashMap<String, Vec<Milestone>> = HashMap::new();
        for row in milestone_rows {
            let item = to_milestone(row)?;
            milestones.entry(item.project_id.clone()).or_default().push(item);
        }
        let mut red_flags: HashMap<String, Vec<RedFlag>> = HashMap::new();
        for row in flag_rows {
            let item = to_red_flag(row)?;
            red_flags.entry(item.project_id.clone()).or_default().push(item);
        }

        models
            .into_iter()
            .map(|m| {
                let ms = milestones.remove(&m.id).unwrap_or_default();
                let fs = red_flags.remove(&m.id).unwrap_or_default();
                to_project(m, ms, fs)
            })
            .collect()
    }

    /// Projects of `owner` matching `filter`, most recently updated first.
    pub async fn list_projects(&self, owner: &str, filter: &ProjectFilter) -> Result<Vec<Project>> {
        let mut q = project::Entity::find().filter(project::Column::UserId.eq(owner));
        if let Some(category) = filter.category {
            q = q.filter(project::Column::Category.eq(category.as_str()));
        }
        if let Some(status) = filter.status {
            q = q.filter(project::Column::Status.eq(status.as_str()));
        }
        if let Some(priority) = filter.priority {
            q = q.filter(project::Column::Priority.eq(priority.as_str()));
        }
        let rows = q
            .order_by_desc(project::Column::UpdatedAt)
            .order_by_desc(project::Column::Id)
            .all(self.db())
            .await?;
        self.with_children(rows).await
    }

    pub(crate) async fn recent_projects(&self, owner: &str, limit: u64) -> Result<Vec<Project>> {
        let rows = project::Entity::find()
            .filter(project::Column::UserId.eq(owner))
            .order_by_desc(project::Column::UpdatedAt)
            .order_by_desc(project::Column::Id)
            .limit(limit)
            .all(self.db())
            .await?;
        self.with_children(rows).await
    }

    pub async fn get_project(&self, owner: &str, id: &str) -> Result<Option<Project>> {
        let Some(model) = self.find_owned_project(owner, id).await? else {
            return Ok(None);
        };
        Ok(self.with_children(vec![model]).await?.pop())
    }

    pub async fn create_project(&self, owner: &str, input: &NewProject) -> Result<Project> {
        let now = Utc::now();
        let am = project::ActiveModel {
            id: Set(okrfolio_common::id::next_id()),
            user_id: Set(owner.to_owned()),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            category: Set(input.category.as_str().to_owned()),
            status: Set(input.status.as_str().to_owned()),
            priority: Set(input.priority.as_str().to_owned()),
            progress: Set(clamp_progress(input.progress)),
            start_date: Set(input.start_date.unwrap_or(now).fixed_offset()),
            target_end_date: Set(input.target_end_date.map(|d| d.fixed_offset())),
            actual_end_date: Set(input.actual_end_date.map(|d| d.fixed_offset())),
            tags_json: Set(serde_json::to_string(&input.tags)?),
            created_at: Set(now.fixed_offset()),
            updated_at: Set(now.fixed_offset()),
        };
        let model = am.insert(self.db()).await?;
        tracing::info!(owner = %owner, project_id = %model.id, "Project created");
        to_project(model, Vec::new(), Vec::new())
    }

    /// Applies a partial update. Fields left `None` keep their stored value.
    pub async fn update_project(
        &self,
        owner: &str,
        id: &str,
        changes: &ProjectChanges,
    ) -> Result<Option<Project>> {
        let Some(model) = self.find_owned_project(owner, id).await? else {
            return Ok(None);
        };
        let mut am: project::ActiveModel = model.into();
        if let Some(title) = &changes.title {
            am.title = Set(title.clone());
        }
        if let Some(description) = &changes.description {
            am.description = Set(description.clone());
        }
        if let Some(category) = changes.category {
            am.category = Set(category.as_str().to_owned());
        }
        if let Some(status) = changes.status {
            am.status = Set(status.as_str().to_owned());
        }
        if let Some(priority) = changes.priority {
            am.priority = Set(priority.as_str().to_owned());
        }
        if let Some(progress) = changes.progress {
            am.progress = Set(clamp_progress(progress));
        }
        if let Some(start) = changes.start_date {
            am.start_date = Set(start.fixed_offset());
        }
        if let Some(target) = changes.target_end_date {
            am.target_end_date = Set(target.map(|d| d.fixed_offset()));
        }
        if let Some(actual) = changes.actual_end_date {
            am.actual_end_date = Set(actual.map(|d| d.fixed_offset()));
        }
        if let Some(tags) = &changes.tags {
            am.tags_json = Set(serde_json::to_string(tags)?);
        }
        am.updated_at = Set(Utc::now().fixed_offset());
        let updated = am.update(self.db()).await?;
        Ok(self.with_children(vec![updated]).await?.pop())
    }

    /// Deletes a project together with its milestones and red flags.
    pub async fn delete_project(&self, owner: &str, id: &str) -> Result<bool> {
        if self.find_owned_project(owner, id).await?.is_none() {
            return Ok(false);
        }
        let txn = self.db().begin().await?;
        milestone::Entity::delete_many()
            .filter(milestone::Column::ProjectId.eq(id))
            .exec(&txn)
            .await?;
        red_flag::Entity::delete_many()
            .filter(red_flag::Column::ProjectId.eq(id))
            .exec(&txn)
            .await?;
        let res = project::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        tracing::info!(owner = %owner, project_id = %id, "Project deleted");
        Ok(res.rows_affected > 0)
    }

    /// Adds an uncompleted milestone. The category falls back to the
    /// project's own.
    pub async fn add_milestone(
        &self,
        owner: &str,
        project_id: &str,
        input: &NewMilestone,
    ) -> Result<Option<Milestone>> {
        let Some(parent) = self.find_owned_project(owner, project_id).await? else {
            return Ok(None);
        };
        let category = match input.category {
            Some(category) => category.as_str().to_owned(),
            None => parent.category,
        };
        let now = Utc::now().fixed_offset();
        let am = milestone::ActiveModel {
            id: Set(okrfolio_common::id::next_id()),
            project_id: Set(project_id.to_owned()),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            date: Set(input.date.fixed_offset()),
            completed: Set(false),
            category: Set(category),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(Some(to_milestone(model)?))
    }

    /// Flips a milestone's completion. The parent project is left untouched.
    pub async fn toggle_milestone(
        &self,
        owner: &str,
        project_id: &str,
        milestone_id: &str,
    ) -> Result<Option<Milestone>> {
        if self.find_owned_project(owner, project_id).await?.is_none() {
            return Ok(None);
        }
        let Some(model) = milestone::Entity::find_by_id(milestone_id)
            .filter(milestone::Column::ProjectId.eq(project_id))
            .one(self.db())
            .await?
        else {
            return Ok(None);
        };
        let completed = model.completed;
        let mut am: milestone::ActiveModel = model.into();
        am.completed = Set(!completed);
        am.updated_at = Set(Utc::now().fixed_offset());
        let updated = am.update(self.db()).await?;
        Ok(Some(to_milestone(updated)?))
    }

    pub async fn add_red_flag(
        &self,
        owner: &str,
        project_id: &str,
        input: &NewRedFlag,
    ) -> Result<Option<RedFlag>> {
        if self.find_owned_project(owner, project_id).await?.is_none() {
            return Ok(None);
        }
        let now = Utc::now().fixed_offset();
        let am = red_flag::ActiveModel {
            id: Set(okrfolio_common::id::next_id()),
            project_id: Set(project_id.to_owned()),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            severity: Set(input.severity.as_str().to_owned()),
            resolved: Set(false),
            resolved_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(Some(to_red_flag(model)?))
    }

    /// Marks a red flag resolved. Resolving an already-resolved flag returns
    /// it unchanged.
    pub async fn resolve_red_flag(
        &self,
        owner: &str,
        project_id: &str,
        red_flag_id: &str,
    ) -> Result<Option<RedFlag>> {
        if self.find_owned_project(owner, project_id).await?.is_none() {
            return Ok(None);
        }
        let Some(model) = red_flag::Entity::find_by_id(red_flag_id)
            .filter(red_flag::Column::ProjectId.eq(project_id))
            .one(self.db())
            .await?
        else {
            return Ok(None);
        };
        if model.resolved {
            return Ok(Some(to_red_flag(model)?));
        }
        let now = Utc::now().fixed_offset();
        let mut am: red_flag::ActiveModel = model.into();
        am.resolved = Set(true);
        am.resolved_at = Set(Some(now));
        am.updated_at = Set(now);
        let updated = am.update(self.db()).await?;
        Ok(Some(to_red_flag(updated)?))
    }
}
