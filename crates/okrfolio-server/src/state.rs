use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use okrfolio_storage::PortfolioStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PortfolioStore>,
    pub start_time: DateTime<Utc>,
    pub jwt_secret: Arc<String>,
    pub token_expire_secs: u64,
    pub config: Arc<ServerConfig>,
}
