use okrfolio_common::rules::MAX_UPCOMING_WINDOW_DAYS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Origins allowed by CORS. Empty allows any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            cors_allowed_origins: Vec::new(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

fn default_http_port() -> u16 {
    3001
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL. When unset, a SQLite file under `data_dir` is used.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => {
                let path = std::path::Path::new(&self.data_dir).join("okrfolio.db");
                format!("sqlite://{}?mode=rwc", path.display())
            }
        }
    }

    /// Connection URL with any `user:password@` credentials masked.
    pub fn redacted_url(&self) -> String {
        let url = self.connection_url();
        let Some((scheme, rest)) = url.split_once("://") else {
            return url;
        };
        match rest.split_once('@') {
            Some((_, host)) => format!("{scheme}://***@{host}"),
            None => url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_expire_secs")]
    pub token_expire_secs: u64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_expire_secs: default_token_expire_secs(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

fn default_token_expire_secs() -> u64 {
    7 * 24 * 3600
}

fn default_bcrypt_cost() -> u32 {
    12
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Look-ahead for upcoming milestones, in days.
    #[serde(default = "default_upcoming_window_days")]
    pub upcoming_window_days: i64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            upcoming_window_days: default_upcoming_window_days(),
        }
    }
}

fn default_upcoming_window_days() -> i64 {
    okrfolio_common::rules::UPCOMING_WINDOW_DAYS
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let window = self.dashboard.upcoming_window_days;
        if !(1..=MAX_UPCOMING_WINDOW_DAYS).contains(&window) {
            anyhow::bail!(
                "dashboard.upcoming_window_days must be between 1 and {MAX_UPCOMING_WINDOW_DAYS}, got {window}"
            );
        }
        Ok(())
    }
}
