use chrono::Utc;
use okrfolio_common::requests::{InitiativeChanges, NewInitiative};
use okrfolio_common::types::{Initiative, InitiativeFilter, Level};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entities::initiative::{self, Column, Entity};
use crate::error::{parse_column, Result};
use crate::store::PortfolioStore;

fn level_column(column: &'static str, value: Option<String>) -> Result<Option<Level>> {
    value.map(|v| parse_column(column, &v)).transpose()
}

fn to_initiative(m: initiative::Model) -> Result<Initiative> {
    Ok(Initiative {
        category: parse_column("initiatives.category", &m.category)?,
        status: parse_column("initiatives.status", &m.status)?,
        priority: parse_column("initiatives.priority", &m.priority)?,
        estimated_effort: level_column("initiatives.estimated_effort", m.estimated_effort)?,
        potential_impact: level_column("initiatives.potential_impact", m.potential_impact)?,
        id: m.id,
        title: m.title,
        description: m.description,
        notes: m.notes,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn level_value(level: Option<Level>) -> Option<String> {
    level.map(|l| l.as_str().to_owned())
}

impl PortfolioStore {
    async fn find_owned_initiative(
        &self,
        owner: &str,
        id: &str,
    ) -> Result<Option<initiative::Model>> {
        let model = Entity::find_by_id(id)
            .filter(Column::UserId.eq(owner))
            .one(self.db())
            .await?;
        Ok(model)
    }

    pub async fn list_initiatives(
        &self,
        owner: &str,
        filter: &InitiativeFilter,
    ) -> Result<Vec<Initiative>> {
        let mut q = Entity::find().filter(Column::UserId.eq(owner));
        if let Some(status) = filter.status {
            q = q.filter(Column::Status.eq(status.as_str()));
        }
        if let Some(category) = filter.category {
            q = q.filter(Column::Category.eq(category.as_str()));
        }
        if let Some(priority) = filter.priority {
            q = q.filter(Column::Priority.eq(priority.as_str()));
        }
        let rows = q
            .order_by_desc(Column::UpdatedAt)
            .order_by_desc(Column::Id)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_initiative).collect()
    }

    pub(crate) async fn recent_initiatives(&self, owner: &str, limit: u64) -> Result<Vec<Initiative>> {
        let rows = Entity::find()
            .filter(Column::UserId.eq(owner))
            .order_by_desc(Column::UpdatedAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_initiative).collect()
    }

    pub async fn get_initiative(&self, owner: &str, id: &str) -> Result<Option<Initiative>> {
        self.find_owned_initiative(owner, id)
            .await?
            .map(to_initiative)
            .transpose()
    }

    pub async fn create_initiative(&self, owner: &str, input: &NewInitiative) -> Result<Initiative> {
        let now = Utc::now().fixed_offset();
        let am = initiative::ActiveModel {
            id: Set(okrfolio_common::id::next_id()),
            user_id: Set(owner.to_owned()),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            category: Set(input.category.as_str().to_owned()),
            status: Set(input.status.as_str().to_owned()),
            priority: Set(input.priority.as_str().to_owned()),
            estimated_effort: Set(level_value(input.estimated_effort)),
            potential_impact: Set(level_value(input.potential_impact)),
            notes: Set(input.notes.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        tracing::info!(owner = %owner, initiative_id = %model.id, "Initiative created");
        to_initiative(model)
    }

    pub async fn update_initiative(
        &self,
        owner: &str,
        id: &str,
        changes: &InitiativeChanges,
    ) -> Result<Option<Initiative>> {
        let Some(model) = self.find_owned_initiative(owner, id).await? else {
            return Ok(None);
        };
        let mut am: initiative::ActiveModel = model.into();
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
        if let Some(effort) = changes.estimated_effort {
            am.estimated_effort = Set(level_value(effort));
        }
        if let Some(impact) = changes.potential_impact {
            am.potential_impact = Set(level_value(impact));
        }
        if let Some(notes) = &changes.notes {
            am.notes = Set(notes.clone());
        }
        am.updated_at = Set(Utc::now().fixed_offset());
        let updated = am.update(self.db()).await?;
        Ok(Some(to_initiative(updated)?))
    }

    pub async fn delete_initiative(&self, owner: &str, id: &str) -> Result<bool> {
        let res = Entity::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::UserId.eq(owner))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected > 0)
    }
}
