use std::collections::HashMap;

use chrono::Utc;
use okrfolio_common::requests::{KeyResultChanges, NewObjective, ObjectiveChanges};
use okrfolio_common::rules::{clamp_progress, derived_progress};
use okrfolio_common::types::{KeyResult, Objective, ObjectiveFilter};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};

use crate::entities::{key_result, objective};
use crate::error::{parse_column, Result};
use crate::store::PortfolioStore;

fn to_key_result(m: key_result::Model) -> Result<KeyResult> {
    Ok(KeyResult {
        status: parse_column("key_results.status", &m.status)?,
        id: m.id,
        objective_id: m.objective_id,
        description: m.description,
        target: m.target,
        current: m.current,
        unit: m.unit,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

/// Builds the objective view. Progress comes from the key results when any
/// of them qualifies, otherwise from the stored column.
fn to_objective(m: objective::Model, key_results: Vec<KeyResult>) -> Result<Objective> {
    let progress = derived_progress(&key_results).unwrap_or_else(|| clamp_progress(m.progress));
    Ok(Objective {
        category: parse_column("objectives.category", &m.category)?,
        status: parse_column("objectives.status", &m.status)?,
        id: m.id,
        title: m.title,
        description: m.description,
        progress,
        quarter: m.quarter,
        target_date: m.target_date.map(|ts| ts.with_timezone(&Utc)),
        key_results,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

impl PortfolioStore {
    async fn find_owned_objective(&self, owner: &str, id: &str) -> Result<Option<objective::Model>> {
        let model = objective::Entity::find_by_id(id)
            .filter(objective::Column::UserId.eq(owner))
            .one(self.db())
            .await?;
        Ok(model)
    }

    async fn with_key_results(&self, models: Vec<objective::Model>) -> Result<Vec<Objective>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let rows = key_result::Entity::find()
            .filter(key_result::Column::ObjectiveId.is_in(ids))
            .order_by_asc(key_result::Column::CreatedAt)
            .order_by_asc(key_result::Column::Id)
            .all(self.db())
            .await?;
        let mut grouped: HashMap<String, Vec<KeyResult>> = HashMap::new();
        for row in rows {
            let kr = to_key_result(row)?;
            grouped.entry(kr.objective_id.clone()).or_default().push(kr);
        }
        models
            .into_iter()
            .map(|m| {
                let krs = grouped.remove(&m.id).unwrap_or_default();
                to_objective(m, krs)
            })
            .collect()
    }

    pub async fn list_objectives(
        &self,
        owner: &str,
        filter: &ObjectiveFilter,
    ) -> Result<Vec<Objective>> {
        let mut q = objective::Entity::find().filter(objective::Column::UserId.eq(owner));
        if let Some(status) = filter.status {
            q = q.filter(objective::Column::Status.eq(status.as_str()));
        }
        if let Some(category) = filter.category {
            q = q.filter(objective::Column::Category.eq(category.as_str()));
        }
        let rows = q
            .order_by_desc(objective::Column::UpdatedAt)
            .order_by_desc(objective::Column::Id)
            .all(self.db())
            .await?;
        self.with_key_results(rows).await
    }

    pub(crate) async fn recent_objectives(&self, owner: &str, limit: u64) -> Result<Vec<Objective>> {
        let rows = objective::Entity::find()
            .filter(objective::Column::UserId.eq(owner))
            .order_by_desc(objective::Column::UpdatedAt)
            .order_by_desc(objective::Column::Id)
            .limit(limit)
            .all(self.db())
            .await?;
        self.with_key_results(rows).await
    }

    pub async fn get_objective(&self, owner: &str, id: &str) -> Result<Option<Objective>> {
        let Some(model) = self.find_owned_objective(owner, id).await? else {
            return Ok(None);
        };
        Ok(self.with_key_results(vec![model]).await?.pop())
    }

    /// Creates an objective and its key results in one transaction.
    pub async fn create_objective(&self, owner: &str, input: &NewObjective) -> Result<Objective> {
        let now = Utc::now().fixed_offset();
        let objective_id = okrfolio_common::id::next_id();
        let stored_progress =
            derived_progress(&input.key_results).unwrap_or_else(|| clamp_progress(input.progress));

        let txn = self.db().begin().await?;
        let model = objective::ActiveModel {
            id: Set(objective_id.clone()),
            user_id: Set(owner.to_owned()),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            category: Set(input.category.as_str().to_owned()),
            status: Set(input.status.as_str().to_owned()),
            progress: Set(stored_progress),
            quarter: Set(input.quarter.clone()),
            target_date: Set(input.target_date.map(|d| d.fixed_offset())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut key_results = Vec::with_capacity(input.key_results.len());
        for kr in &input.key_results {
            let row = key_result::ActiveModel {
                id: Set(okrfolio_common::id::next_id()),
                objective_id: Set(objective_id.clone()),
                description: Set(kr.description.clone()),
                target: Set(kr.target),
                current: Set(kr.current),
                unit: Set(kr.unit.clone()),
                status: Set(kr.status.as_str().to_owned()),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            key_results.push(to_key_result(row)?);
        }
        txn.commit().await?;

        tracing::info!(
            owner = %owner,
            objective_id = %objective_id,
            key_results = key_results.len(),
            "Objective created"
        );
        to_objective(model, key_results)
    }

    pub async fn update_objective(
        &self,
        owner: &str,
        id: &str,
        changes: &ObjectiveChanges,
    ) -> Result<Option<Objective>> {
        let Some(model) = self.find_owned_objective(owner, id).await? else {
            return Ok(None);
        };
        let mut am: objective::ActiveModel = model.into();
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
        if let Some(progress) = changes.progress {
            am.progress = Set(clamp_progress(progress));
        }
        if let Some(quarter) = &changes.quarter {
            am.quarter = Set(quarter.clone());
        }
        if let Some(target) = changes.target_date {
            am.target_date = Set(target.map(|d| d.fixed_offset()));
        }
        am.updated_at = Set(Utc::now().fixed_offset());
        let updated = am.update(self.db()).await?;
        Ok(self.with_key_results(vec![updated]).await?.pop())
    }

    /// Deletes an objective together with its key results.
    pub async fn delete_objective(&self, owner: &str, id: &str) -> Result<bool> {
        if self.find_owned_objective(owner, id).await?.is_none() {
            return Ok(false);
        }
        let txn = self.db().begin().await?;
        key_result::Entity::delete_many()
            .filter(key_result::Column::ObjectiveId.eq(id))
            .exec(&txn)
            .await?;
        let res = objective::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        tracing::info!(owner = %owner, objective_id = %id, "Objective deleted");
        Ok(res.rows_affected > 0)
    }

    /// Updates a key result's current value and/or status. The objective's
    /// own timestamp is not touched.
    pub async fn update_key_result(
        &self,
        owner: &str,
        objective_id: &str,
        key_result_id: &str,
        changes: &KeyResultChanges,
    ) -> Result<Option<KeyResult>> {
        if self.find_owned_objective(owner, objective_id).await?.is_none() {
            return Ok(None);
        }
        let Some(model) = key_result::Entity::find_by_id(key_result_id)
            .filter(key_result::Column::ObjectiveId.eq(objective_id))
            .one(self.db())
            .await?
        else {
            return Ok(None);
        };
        let mut am: key_result::ActiveModel = model.into();
        if let Some(current) = changes.current {
            am.current = Set(current);
        }
        if let Some(status) = changes.status {
            am.status = Set(status.as_str().to_owned());
        }
        am.updated_at = Set(Utc::now().fixed_offset());
        let updated = am.update(self.db()).await?;
        Ok(Some(to_key_result(updated)?))
    }
}
