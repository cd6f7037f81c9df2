use chrono::Utc;
use okrfolio_common::requests::NewAccount;
use okrfolio_common::types::User;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, SqlErr};

use crate::entities::user::{self, Column, Entity};
use crate::error::Result;
use crate::password::{hash_password, verify_password};
use crate::store::PortfolioStore;

fn to_user(m: user::Model) -> User {
    User {
        id: m.id,
        email: m.email,
        name: m.name,
        password_hash: m.password_hash,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl PortfolioStore {
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_user))
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let model = Entity::find()
            .filter(Column::Email.eq(email))
            .one(self.db())
            .await?;
        Ok(model.map(to_user))
    }

    /// Creates an account. Returns `None` when the e-mail is already taken,
    /// including when a concurrent registration wins the unique index.
    pub async fn create_user(&self, account: &NewAccount) -> Result<Option<User>> {
        if self.get_user_by_email(&account.email).await?.is_some() {
            return Ok(None);
        }
        let now = Utc::now().fixed_offset();
        let am = user::ActiveModel {
            id: Set(okrfolio_common::id::next_id()),
            email: Set(account.email.clone()),
            name: Set(account.name.clone()),
            password_hash: Set(hash_password(&account.password, self.password_cost)?),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = match am.insert(self.db()).await {
            Ok(model) => model,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                tracing::debug!(error = %e, "E-mail registered concurrently");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(user_id = %model.id, "Account created");
        Ok(Some(to_user(model)))
    }

    /// Returns the account when the e-mail exists and the password matches.
    /// Unknown e-mail and wrong password are indistinguishable.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.get_user_by_email(email).await? else {
            return Ok(None);
        };
        if verify_password(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}
