use crate::error::{ClientError, FieldError, Result};
use async_trait::async_trait;
use okrfolio_common::requests::{
    AuthResponse, CreateInitiativeRequest, CreateMilestoneRequest, CreateObjectiveRequest,
    CreateProjectRequest, CreateRedFlagRequest, LoginRequest, RegisterRequest,
    UpdateInitiativeRequest, UpdateKeyResultRequest, UpdateObjectiveRequest, UpdateProjectRequest,
};
use okrfolio_common::types::{
    Category, DashboardStats, DashboardSummary, Initiative, KeyResult, Milestone,
    MilestoneWithProject, Objective, Project, RedFlag, RedFlagWithProject, TimelineMonth,
    UserProfile,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub version: String,
    pub uptime_secs: i64,
}

/// Every operation of the okrfolio HTTP API.
///
/// Implementations hold the bearer token themselves: `login` and `register`
/// store the issued token, `set_token` restores or clears one.
#[async_trait]
pub trait PortfolioBackend: Send + Sync {
    fn set_token(&self, token: Option<String>);

    async fn health(&self) -> Result<HealthStatus>;

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse>;
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse>;
    async fn me(&self) -> Result<UserProfile>;

    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn get_project(&self, id: &str) -> Result<Project>;
    async fn create_project(&self, req: &CreateProjectRequest) -> Result<Project>;
    async fn update_project(&self, id: &str, req: &UpdateProjectRequest) -> Result<Project>;
    async fn delete_project(&self, id: &str) -> Result<()>;
    async fn add_milestone(
        &self,
        project_id: &str,
        req: &CreateMilestoneRequest,
    ) -> Result<Milestone>;
    async fn toggle_milestone(&self, project_id: &str, milestone_id: &str) -> Result<Milestone>;
    async fn add_red_flag(&self, project_id: &str, req: &CreateRedFlagRequest)
        -> Result<RedFlag>;
    async fn resolve_red_flag(&self, project_id: &str, red_flag_id: &str) -> Result<RedFlag>;

    async fn list_objectives(&self) -> Result<Vec<Objective>>;
    async fn get_objective(&self, id: &str) -> Result<Objective>;
    async fn create_objective(&self, req: &CreateObjectiveRequest) -> Result<Objective>;
    async fn update_objective(&self, id: &str, req: &UpdateObjectiveRequest)
        -> Result<Objective>;
    async fn delete_objective(&self, id: &str) -> Result<()>;
    async fn update_key_result(
        &self,
        objective_id: &str,
        key_result_id: &str,
        req: &UpdateKeyResultRequest,
    ) -> Result<KeyResult>;

    async fn list_initiatives(&self) -> Result<Vec<Initiative>>;
    async fn get_initiative(&self, id: &str) -> Result<Initiative>;
    async fn create_initiative(&self, req: &CreateInitiativeRequest) -> Result<Initiative>;
    async fn update_initiative(
        &self,
        id: &str,
        req: &UpdateInitiativeRequest,
    ) -> Result<Initiative>;
    async fn delete_initiative(&self, id: &str) -> Result<()>;

    async fn dashboard_stats(&self) -> Result<DashboardStats>;
    async fn dashboard_summary(&self) -> Result<DashboardSummary>;
    async fn red_flag_board(&self) -> Result<Vec<RedFlagWithProject>>;
    /// `None` uses the server's configured window.
    async fn upcoming_milestones(&self, window_days: Option<i64>)
        -> Result<Vec<MilestoneWithProject>>;
    async fn milestone_timeline(
        &self,
        category: Option<Category>,
        upcoming_only: bool,
    ) -> Result<Vec<TimelineMonth>>;
}

#[derive(Deserialize)]
struct Envelope {
    err_code: i32,
    #[serde(default)]
    err_msg: String,
    #[serde(default)]
    trace_id: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct ValidationData {
    #[serde(default)]
    errors: Vec<FieldError>,
}

/// Unwraps a response envelope into its `data`, or into
/// [`ClientError::Api`] when `err_code` is non-zero.
pub(crate) fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(e.into()),
        Err(_) => {
            return Err(ClientError::Api {
                status: status.as_u16(),
                err_code: -1,
                err_msg: String::from_utf8_lossy(body).into_owned(),
                trace_id: String::new(),
                fields: Vec::new(),
            })
        }
    };

    if envelope.err_code != 0 || !status.is_success() {
        let fields = serde_json::from_value::<ValidationData>(envelope.data)
            .map(|d| d.errors)
            .unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            err_code: envelope.err_code,
            err_msg: envelope.err_msg,
            trace_id: envelope.trace_id,
            fields,
        });
    }
    if envelope.data.is_null() {
        return Err(ClientError::EmptyData);
    }
    Ok(serde_json::from_value(envelope.data)?)
}

/// `reqwest`-backed [`PortfolioBackend`].
pub struct ApiClient {
    base_url: String,
    client: Client,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// `base_url` is the server origin, e.g. `http://127.0.0.1:3001`.
    pub fn new(base_url: impl Into<String>, timeout_secs: Option<u64>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(
                timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            token: RwLock::new(None),
        })
    }

    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        let result = decode_envelope(status, &body);
        if let Err(ClientError::Api {
            err_code, trace_id, ..
        }) = &result
        {
            tracing::debug!(status = %status, err_code, trace_id = %trace_id, "API call rejected");
        }
        result
    }

    /// For endpoints answering 204 with an empty body.
    async fn send_no_content(&self, builder: RequestBuilder) -> Result<()> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.bytes().await?;
        decode_envelope::<serde_json::Value>(status, &body).map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn with_body<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(self.request(method, path).json(body)).await
    }

    async fn authenticate(&self, path: &str, body: &(impl Serialize + Sync)) -> Result<AuthResponse> {
        let auth: AuthResponse = self.with_body(Method::POST, path, body).await?;
        self.store_token(Some(auth.token.clone()));
        tracing::info!(user_id = %auth.user.id, "Signed in");
        Ok(auth)
    }
}

#[async_trait]
impl PortfolioBackend for ApiClient {
    fn set_token(&self, token: Option<String>) {
        self.store_token(token);
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.get("/v1/health").await
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse> {
        self.authenticate("/v1/auth/register", req).await
    }

    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse> {
        self.authenticate("/v1/auth/login", req).await
    }

    async fn me(&self) -> Result<UserProfile> {
        self.get("/v1/auth/me").await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.get("/v1/projects").await
    }

    async fn get_project(&self, id: &str) -> Result<Project> {
        self.get(&format!("/v1/projects/{id}")).await
    }

    async fn create_project(&self, req: &CreateProjectRequest) -> Result<Project> {
        self.with_body(Method::POST, "/v1/projects", req).await
    }

    async fn update_project(&self, id: &str, req: &UpdateProjectRequest) -> Result<Project> {
        self.with_body(Method::PUT, &format!("/v1/projects/{id}"), req)
            .await
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        self.send_no_content(self.request(Method::DELETE, &format!("/v1/projects/{id}")))
            .await
    }

    async fn add_milestone(
        &self,
        project_id: &str,
        req: &CreateMilestoneRequest,
    ) -> Result<Milestone> {
        self.with_body(
            Method::POST,
            &format!("/v1/projects/{project_id}/milestones"),
            req,
        )
        .await
    }

    async fn toggle_milestone(&self, project_id: &str, milestone_id: &str) -> Result<Milestone> {
        let path = format!("/v1/projects/{project_id}/milestones/{milestone_id}/toggle");
        self.send(self.request(Method::PATCH, &path)).await
    }

    async fn add_red_flag(
        &self,
        project_id: &str,
        req: &CreateRedFlagRequest,
    ) -> Result<RedFlag> {
        self.with_body(
            Method::POST,
            &format!("/v1/projects/{project_id}/red-flags"),
            req,
        )
        .await
    }

    async fn resolve_red_flag(&self, project_id: &str, red_flag_id: &str) -> Result<RedFlag> {
        let path = format!("/v1/projects/{project_id}/red-flags/{red_flag_id}/resolve");
        self.send(self.request(Method::PATCH, &path)).await
    }

    async fn list_objectives(&self) -> Result<Vec<Objective>> {
        self.get("/v1/objectives").await
    }

    async fn get_objective(&self, id: &str) -> Result<Objective> {
        self.get(&format!("/v1/objectives/{id}")).await
    }

    async fn create_objective(&self, req: &CreateObjectiveRequest) -> Result<Objective> {
        self.with_body(Method::POST, "/v1/objectives", req).await
    }

    async fn update_objective(
        &self,
        id: &str,
        req: &UpdateObjectiveRequest,
    ) -> Result<Objective> {
        self.with_body(Method::PUT, &format!("/v1/objectives/{id}"), req)
            .await
    }

    async fn delete_objective(&self, id: &str) -> Result<()> {
        self.send_no_content(self.request(Method::DELETE, &format!("/v1/objectives/{id}")))
            .await
    }

    async fn update_key_result(
        &self,
        objective_id: &str,
        key_result_id: &str,
        req: &UpdateKeyResultRequest,
    ) -> Result<KeyResult> {
        let path = format!("/v1/objectives/{objective_id}/key-results/{key_result_id}");
        self.with_body(Method::PUT, &path, req).await
    }

    async fn list_initiatives(&self) -> Result<Vec<Initiative>> {
        self.get("/v1/initiatives").await
    }

    async fn get_initiative(&self, id: &str) -> Result<Initiative> {
        self.get(&format!("/v1/initiatives/{id}")).await
    }

    async fn create_initiative(&self, req: &CreateInitiativeRequest) -> Result<Initiative> {
        self.with_body(Method::POST, "/v1/initiatives", req).await
    }

    async fn update_initiative(
        &self,
        id: &str,
        req: &UpdateInitiativeRequest,
    ) -> Result<Initiative> {
        self.with_body(Method::PUT, &format!("/v1/initiatives/{id}"), req)
            .await
    }

    async fn delete_initiative(&self, id: &str) -> Result<()> {
        self.send_no_content(self.request(Method::DELETE, &format!("/v1/initiatives/{id}")))
            .await
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        self.get("/v1/dashboard/stats").await
    }

    async fn dashboard_summary(&self) -> Result<DashboardSummary> {
        self.get("/v1/dashboard/summary").await
    }

    async fn red_flag_board(&self) -> Result<Vec<RedFlagWithProject>> {
        self.get("/v1/dashboard/red-flags").await
    }

    async fn upcoming_milestones(
        &self,
        window_days: Option<i64>,
    ) -> Result<Vec<MilestoneWithProject>> {
        let mut builder = self.request(Method::GET, "/v1/dashboard/upcoming-milestones");
        if let Some(days) = window_days {
            builder = builder.query(&[("window_days", days)]);
        }
        self.send(builder).await
    }

    async fn milestone_timeline(
        &self,
        category: Option<Category>,
        upcoming_only: bool,
    ) -> Result<Vec<TimelineMonth>> {
        let view = if upcoming_only { "upcoming" } else { "all" };
        let mut builder = self
            .request(Method::GET, "/v1/dashboard/timeline")
            .query(&[("view", view)]);
        if let Some(category) = category {
            builder = builder.query(&[("category", category.as_str())]);
        }
        self.send(builder).await
    }
}
