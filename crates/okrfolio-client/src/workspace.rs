use crate::client::PortfolioBackend;
use crate::error::Result;
use crate::session::Session;
use chrono::{DateTime, Utc};
use okrfolio_common::requests::{
    CreateInitiativeRequest, CreateMilestoneRequest, CreateObjectiveRequest, CreateProjectRequest,
    CreateRedFlagRequest, LoginRequest, RegisterRequest, UpdateInitiativeRequest,
    UpdateKeyResultRequest, UpdateObjectiveRequest, UpdateProjectRequest,
};
use okrfolio_common::types::{
    Initiative, KeyResult, Milestone, Objective, Project, RedFlag, UserProfile,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Last-known entity lists, as returned by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub projects: Vec<Project>,
    pub objectives: Vec<Objective>,
    pub initiatives: Vec<Initiative>,
    /// `None` until the first successful fetch.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Client-side view of one account's portfolio.
///
/// Every mutation is sent to the backend and followed by a full re-fetch,
/// so the snapshot only ever holds what the server returned. When a session
/// path is set, the token and snapshot are written there after each change.
pub struct Workspace<B> {
    backend: B,
    session_path: Option<PathBuf>,
    token: Option<String>,
    user: Option<UserProfile>,
    snapshot: Snapshot,
}

impl<B: PortfolioBackend> Workspace<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            session_path: None,
            token: None,
            user: None,
            snapshot: Snapshot::default(),
        }
    }

    /// Restores the stored session, if any, for optimistic display. The
    /// restored snapshot may be stale until [`Workspace::refresh`] runs.
    pub async fn open(backend: B, session_path: impl Into<PathBuf>) -> Result<Self> {
        let session_path = session_path.into();
        let mut workspace = Self::new(backend);
        if let Some(session) = Session::load(&session_path).await? {
            workspace.backend.set_token(session.token.clone());
            workspace.token = session.token;
            workspace.user = session.user;
            workspace.snapshot = session.snapshot;
        }
        workspace.session_path = Some(session_path);
        Ok(workspace)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<&Snapshot> {
        let auth = self
            .backend
            .login(&LoginRequest {
                email: Some(email.to_string()),
                password: Some(password.to_string()),
            })
            .await?;
        self.token = Some(auth.token);
        self.user = Some(auth.user);
        self.refresh().await
    }

    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<&Snapshot> {
        let auth = self
            .backend
            .register(&RegisterRequest {
                email: Some(email.to_string()),
                password: Some(password.to_string()),
                name: name.map(str::to_string),
            })
            .await?;
        self.token = Some(auth.token);
        self.user = Some(auth.user);
        self.refresh().await
    }

    /// Forgets the token and the cached portfolio, locally and on disk.
    pub async fn sign_out(&mut self) -> Result<()> {
        self.backend.set_token(None);
        self.token = None;
        self.user = None;
        self.snapshot = Snapshot::default();
        if let Some(path) = &self.session_path {
            Session::clear(path).await?;
        }
        Ok(())
    }

    /// Re-fetches all three entity lists. A rejected credential signs the
    /// workspace out before the error is returned.
    pub async fn refresh(&mut self) -> Result<&Snapshot> {
        let fetched = tokio::try_join!(
            self.backend.list_projects(),
            self.backend.list_objectives(),
            self.backend.list_initiatives(),
        );
        match fetched {
            Ok((projects, objectives, initiatives)) => {
                self.snapshot = Snapshot {
                    projects,
                    objectives,
                    initiatives,
                    fetched_at: Some(Utc::now()),
                };
                tracing::debug!(
                    projects = self.snapshot.projects.len(),
                    objectives = self.snapshot.objectives.len(),
                    initiatives = self.snapshot.initiatives.len(),
                    "Workspace refreshed"
                );
                self.persist().await?;
                Ok(&self.snapshot)
            }
            Err(e) => {
                if e.is_auth_failure() {
                    tracing::warn!(error = %e, "Credential rejected, signing out");
                    self.sign_out().await?;
                }
                Err(e)
            }
        }
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.session_path else {
            return Ok(());
        };
        Session {
            token: self.token.clone(),
            user: self.user.clone(),
            snapshot: self.snapshot.clone(),
            saved_at: Some(Utc::now()),
        }
        .save(path)
        .await
    }

    /// Re-fetches after a successful mutation and hands its result back.
    async fn settle<T>(&mut self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.refresh().await?;
                Ok(value)
            }
            Err(e) => {
                if e.is_auth_failure() {
                    self.sign_out().await?;
                }
                Err(e)
            }
        }
    }

    pub async fn create_project(&mut self, req: &CreateProjectRequest) -> Result<Project> {
        let outcome = self.backend.create_project(req).await;
        self.settle(outcome).await
    }

    pub async fn update_project(
        &mut self,
        id: &str,
        req: &UpdateProjectRequest,
    ) -> Result<Project> {
        let outcome = self.backend.update_project(id, req).await;
        self.settle(outcome).await
    }

    pub async fn delete_project(&mut self, id: &str) -> Result<()> {
        let outcome = self.backend.delete_project(id).await;
        self.settle(outcome).await
    }

    pub async fn add_milestone(
        &mut self,
        project_id: &str,
        req: &CreateMilestoneRequest,
    ) -> Result<Milestone> {
        let outcome = self.backend.add_milestone(project_id, req).await;
        self.settle(outcome).await
    }

    pub async fn toggle_milestone(
        &mut self,
        project_id: &str,
        milestone_id: &str,
    ) -> Result<Milestone> {
        let outcome = self.backend.toggle_milestone(project_id, milestone_id).await;
        self.settle(outcome).await
    }

    pub async fn add_red_flag(
        &mut self,
        project_id: &str,
        req: &CreateRedFlagRequest,
    ) -> Result<RedFlag> {
        let outcome = self.backend.add_red_flag(project_id, req).await;
        self.settle(outcome).await
    }

    pub async fn resolve_red_flag(
        &mut self,
        project_id: &str,
        red_flag_id: &str,
    ) -> Result<RedFlag> {
        let outcome = self.backend.resolve_red_flag(project_id, red_flag_id).await;
        self.settle(outcome).await
    }

    pub async fn create_objective(&mut self, req: &CreateObjectiveRequest) -> Result<Objective> {
        let outcome = self.backend.create_objective(req).await;
        self.settle(outcome).await
    }

    pub async fn update_objective(
        &mut self,
        id: &str,
        req: &UpdateObjectiveRequest,
    ) -> Result<Objective> {
        let outcome = self.backend.update_objective(id, req).await;
        self.settle(outcome).await
    }

    pub async fn delete_objective(&mut self, id: &str) -> Result<()> {
        let outcome = self.backend.delete_objective(id).await;
        self.settle(outcome).await
    }

    pub async fn update_key_result(
        &mut self,
        objective_id: &str,
        key_result_id: &str,
        req: &UpdateKeyResultRequest,
    ) -> Result<KeyResult> {
        let outcome = self
            .backend
            .update_key_result(objective_id, key_result_id, req)
            .await;
        self.settle(outcome).await
    }

    pub async fn create_initiative(
        &mut self,
        req: &CreateInitiativeRequest,
    ) -> Result<Initiative> {
        let outcome = self.backend.create_initiative(req).await;
        self.settle(outcome).await
    }

    pub async fn update_initiative(
        &mut self,
        id: &str,
        req: &UpdateInitiativeRequest,
    ) -> Result<Initiative> {
        let outcome = self.backend.update_initiative(id, req).await;
        self.settle(outcome).await
    }

    pub async fn delete_initiative(&mut self, id: &str) -> Result<()> {
        let outcome = self.backend.delete_initiative(id).await;
        self.settle(outcome).await
    }
}
