use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::{Query, SelectStatement};
use sea_orm::{ColumnTrait, ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;

use crate::entities;
use crate::error::Result;

pub mod dashboard;
pub mod initiative;
pub mod objective;
pub mod project;
pub mod user;

/// Unified access layer over the tracker database.
///
/// All methods are `async fn` over SeaORM. Every method that touches a
/// user-owned entity takes the owner id and filters on it.
pub struct PortfolioStore {
    pub(crate) db: DatabaseConnection,
    pub(crate) password_cost: u32,
}

impl PortfolioStore {
    /// Connects to the database and brings the schema up to date.
    ///
    /// - `db_url`: full connection URL, e.g. `sqlite:///data/okrfolio.db?mode=rwc`.
    /// - `data_dir`: local data directory, created when missing.
    pub async fn new(db_url: &str, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db = Database::connect(db_url).await?;

        // WAL only applies to SQLite
        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;
        tracing::info!(db_url = %db_url, "Initialized portfolio store");

        Ok(Self {
            db,
            password_cost: bcrypt::DEFAULT_COST,
        })
    }

    /// Overrides the bcrypt cost used for new password hashes.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// `SELECT id FROM projects WHERE user_id = ?`, for scoping child tables to
/// an owner inside a single query.
pub(crate) fn owned_project_ids(owner: &str) -> SelectStatement {
    Query::select()
        .column(entities::project::Column::Id)
        .from(entities::project::Entity)
        .and_where(entities::project::Column::UserId.eq(owner))
        .to_owned()
}
