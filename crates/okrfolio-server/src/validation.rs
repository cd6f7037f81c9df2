//! Request validation.
//!
//! Wire requests deserialize with every field optional. [`Validate`] turns a
//! wire request into the storage layer's input type, collecting one
//! [`FieldError`] per offending field rather than stopping at the first.
//! The [`ValidatedJson`] and [`ApiQuery`] extractors run before any handler
//! code, so no request reaches the database without passing validation.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use okrfolio_common::requests::{
    parse_date, CreateInitiativeRequest, CreateKeyResultRequest, CreateMilestoneRequest,
    CreateObjectiveRequest, CreateProjectRequest, CreateRedFlagRequest, InitiativeChanges,
    KeyResultChanges, LoginRequest, NewAccount, NewInitiative, NewKeyResult, NewMilestone,
    NewObjective, NewProject, NewRedFlag, ObjectiveChanges, ProjectChanges, RegisterRequest,
    UpdateInitiativeRequest, UpdateKeyResultRequest, UpdateObjectiveRequest,
    UpdateProjectRequest,
};
use okrfolio_common::types::{Category, InitiativeStatus, OkrStatus, Priority};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::validation_error_response;
use crate::logging::TraceId;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// `data` of a 400 response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, Vec<FieldError>>;
}

/// Accumulates field errors while individual fields are checked.
#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn finish<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }

    fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// Present and not blank. Returned trimmed.
    fn required_text(&mut self, field: &str, value: Option<String>) -> Option<String> {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            Some(_) => {
                self.push(field, "must not be empty");
                None
            }
            None => {
                self.push(field, "is required");
                None
            }
        }
    }

    /// Absent is fine, blank is not.
    fn optional_text(&mut self, field: &str, value: Option<String>) -> Option<String> {
        match value.as_deref().map(str::trim) {
            Some("") => {
                self.push(field, "must not be empty");
                None
            }
            Some(v) => Some(v.to_string()),
            None => None,
        }
    }

    fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.push(field, "is required");
        }
        value
    }

    fn progress(&mut self, field: &str, value: Option<i64>) -> Option<i32> {
        match value {
            Some(v) if (0..=100).contains(&v) => i32::try_from(v).ok(),
            Some(_) => {
                self.push(field, "must be between 0 and 100");
                None
            }
            None => None,
        }
    }

    fn date(&mut self, field: &str, value: Option<String>) -> Option<DateTime<Utc>> {
        let raw = value?;
        let parsed = parse_date(&raw);
        if parsed.is_none() {
            self.push(field, "must be an RFC 3339 timestamp or a YYYY-MM-DD date");
        }
        parsed
    }

    fn required_date(&mut self, field: &str, value: Option<String>) -> Option<DateTime<Utc>> {
        if value.is_none() {
            self.push(field, "is required");
            return None;
        }
        self.date(field, value)
    }

    /// `Some(None)` clears the stored date.
    fn nullable_date(
        &mut self,
        field: &str,
        value: Option<Option<String>>,
    ) -> Option<Option<DateTime<Utc>>> {
        match value {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) => self.date(field, Some(raw)).map(Some),
        }
    }

    fn tags(&mut self, field: &str, value: Option<Vec<String>>) -> Option<Vec<String>> {
        let tags = value?;
        let mut cleaned = Vec::with_capacity(tags.len());
        for (i, tag) in tags.iter().enumerate() {
            let tag = tag.trim();
            if tag.is_empty() {
                self.push(format!("{field}[{i}]"), "must not be empty");
            } else {
                cleaned.push(tag.to_string());
            }
        }
        Some(cleaned)
    }

    fn non_negative(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        match value {
            Some(v) if v.is_finite() && v >= 0.0 => Some(v),
            Some(_) => {
                self.push(field, "must be a number >= 0");
                None
            }
            None => None,
        }
    }

    fn positive(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        match value {
            Some(v) if v.is_finite() && v > 0.0 => Some(v),
            Some(_) => {
                self.push(field, "must be a number > 0");
                None
            }
            None => {
                self.push(field, "is required");
                None
            }
        }
    }

    fn email(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let email = self.required_text(field, value)?.to_lowercase();
        if is_well_formed_email(&email) {
            Some(email)
        } else {
            self.push(field, "must be a valid e-mail address");
            None
        }
    }
}

fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

impl Validate for CreateProjectRequest {
    type Output = NewProject;

    fn validate(self) -> Result<NewProject, Vec<FieldError>> {
        let mut c = Checker::default();
        let title = c.required_text("title", self.title);
        let category = c.required("category", self.category);
        let status = c.required("status", self.status);
        let priority = c.required("priority", self.priority);
        let progress = c.progress("progress", self.progress);
        let start_date = c.date("start_date", self.start_date);
        let target_end_date = c.date("target_end_date", self.target_end_date);
        let actual_end_date = c.date("actual_end_date", self.actual_end_date);
        let tags = c.tags("tags", self.tags);

        match (title, category, status, priority) {
            (Some(title), Some(category), Some(status), Some(priority)) if c.is_clean() => {
                Ok(NewProject {
                    title,
                    description: self.description.unwrap_or_default(),
                    category,
                    status,
                    priority,
                    progress: progress.unwrap_or(0),
                    start_date,
                    target_end_date,
                    actual_end_date,
                    tags: tags.unwrap_or_default(),
                })
            }
            _ => Err(c.into_errors()),
        }
    }
}

impl Validate for UpdateProjectRequest {
    type Output = ProjectChanges;

    fn validate(self) -> Result<ProjectChanges, Vec<FieldError>> {
        let mut c = Checker::default();
        let changes = ProjectChanges {
            title: c.optional_text("title", self.title),
            description: self.description,
            category: self.category,
            status: self.status,
            priority: self.priority,
            progress: c.progress("progress", self.progress),
            start_date: c.date("start_date", self.start_date),
            target_end_date: c.nullable_date("target_end_date", self.target_end_date),
            actual_end_date: c.nullable_date("actual_end_date", self.actual_end_date),
            tags: c.tags("tags", self.tags),
        };
        c.finish(changes)
    }
}

impl Validate for CreateMilestoneRequest {
    type Output = NewMilestone;

    fn validate(self) -> Result<NewMilestone, Vec<FieldError>> {
        let mut c = Checker::default();
        let title = c.required_text("title", self.title);
        let date = c.required_date("date", self.date);
        match (title, date) {
            (Some(title), Some(date)) if c.is_clean() => Ok(NewMilestone {
                title,
                description: self.description.unwrap_or_default(),
                date,
                category: self.category,
            }),
            _ => Err(c.into_errors()),
        }
    }
}

impl Validate for CreateRedFlagRequest {
    type Output = NewRedFlag;

    fn validate(self) -> Result<NewRedFlag, Vec<FieldError>> {
        let mut c = Checker::default();
        let title = c.required_text("title", self.title);
        let severity = c.required("severity", self.severity);
        match (title, severity) {
            (Some(title), Some(severity)) if c.is_clean() => Ok(NewRedFlag {
                title,
                description: self.description.unwrap_or_default(),
                severity,
            }),
            _ => Err(c.into_errors()),
        }
    }
}

fn key_result(c: &mut Checker, index: usize, kr: CreateKeyResultRequest) -> Option<NewKeyResult> {
    let field = |name: &str| format!("key_results[{index}].{name}");
    let description = c.required_text(&field("description"), kr.description);
    let unit = c.required_text(&field("unit"), kr.unit);
    let target = c.positive(&field("target"), kr.target);
    let current = c.non_negative(&field("current"), kr.current);
    Some(NewKeyResult {
        description: description?,
        target: target?,
        current: current.unwrap_or(0.0),
        unit: unit?,
        status: kr.status.unwrap_or(OkrStatus::NotStarted),
    })
}

impl Validate for CreateObjectiveRequest {
    type Output = NewObjective;

    fn validate(self) -> Result<NewObjective, Vec<FieldError>> {
        let mut c = Checker::default();
        let title = c.required_text("title", self.title);
        let status = c.required("status", self.status);
        let progress = c.progress("progress", self.progress);
        let target_date = c.date("target_date", self.target_date);
        let key_results: Vec<Option<NewKeyResult>> = self
            .key_results
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, kr)| key_result(&mut c, i, kr))
            .collect();

        match (title, status) {
            (Some(title), Some(status)) if c.is_clean() => Ok(NewObjective {
                title,
                description: self.description.unwrap_or_default(),
                category: self.category.unwrap_or(Category::Other),
                status,
                progress: progress.unwrap_or(0),
                quarter: self
                    .quarter
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty()),
                target_date,
                key_results: key_results.into_iter().flatten().collect(),
            }),
            _ => Err(c.into_errors()),
        }
    }
}

impl Validate for UpdateObjectiveRequest {
    type Output = ObjectiveChanges;

    fn validate(self) -> Result<ObjectiveChanges, Vec<FieldError>> {
        let mut c = Checker::default();
        let changes = ObjectiveChanges {
            title: c.optional_text("title", self.title),
            description: self.description,
            category: self.category,
            status: self.status,
            progress: c.progress("progress", self.progress),
            // A blank quarter clears it like `null` does.
            quarter: self.quarter.map(|q| {
                q.map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty())
            }),
            target_date: c.nullable_date("target_date", self.target_date),
        };
        c.finish(changes)
    }
}

impl Validate for UpdateKeyResultRequest {
    type Output = KeyResultChanges;

    fn validate(self) -> Result<KeyResultChanges, Vec<FieldError>> {
        let mut c = Checker::default();
        let changes = KeyResultChanges {
            current: c.non_negative("current", self.current),
            status: self.status,
        };
        c.finish(changes)
    }
}

impl Validate for CreateInitiativeRequest {
    type Output = NewInitiative;

    fn validate(self) -> Result<NewInitiative, Vec<FieldError>> {
        let mut c = Checker::default();
        let title = c.required_text("title", self.title);
        let status: Option<InitiativeStatus> = c.required("status", self.status);
        match (title, status) {
            (Some(title), Some(status)) if c.is_clean() => Ok(NewInitiative {
                title,
                description: self.description.unwrap_or_default(),
                category: self.category.unwrap_or(Category::Other),
                status,
                priority: self.priority.unwrap_or(Priority::Medium),
                estimated_effort: self.estimated_effort,
                potential_impact: self.potential_impact,
                notes: self.notes.unwrap_or_default(),
            }),
            _ => Err(c.into_errors()),
        }
    }
}

impl Validate for UpdateInitiativeRequest {
    type Output = InitiativeChanges;

    fn validate(self) -> Result<InitiativeChanges, Vec<FieldError>> {
        let mut c = Checker::default();
        let changes = InitiativeChanges {
            title: c.optional_text("title", self.title),
            description: self.description,
            category: self.category,
            status: self.status,
            priority: self.priority,
            estimated_effort: self.estimated_effort,
            potential_impact: self.potential_impact,
            notes: self.notes,
        };
        c.finish(changes)
    }
}

impl Validate for RegisterRequest {
    type Output = NewAccount;

    fn validate(self) -> Result<NewAccount, Vec<FieldError>> {
        let mut c = Checker::default();
        let email = c.email("email", self.email);
        let password = match self.password {
            Some(p) if p.chars().count() >= MIN_PASSWORD_LEN => Some(p),
            Some(_) => {
                c.push(
                    "password",
                    format!("must be at least {MIN_PASSWORD_LEN} characters"),
                );
                None
            }
            None => {
                c.push("password", "is required");
                None
            }
        };
        match (email, password) {
            (Some(email), Some(password)) if c.is_clean() => Ok(NewAccount {
                email,
                password,
                name: self
                    .name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
            }),
            _ => Err(c.into_errors()),
        }
    }
}

/// Login input, e-mail normalized the same way as at registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    type Output = Credentials;

    fn validate(self) -> Result<Credentials, Vec<FieldError>> {
        let mut c = Checker::default();
        let email = c.required_text("email", self.email);
        let password = c.required("password", self.password.filter(|p| !p.is_empty()));
        match (email, password) {
            (Some(email), Some(password)) if c.is_clean() => Ok(Credentials {
                email: email.to_lowercase(),
                password,
            }),
            _ => Err(c.into_errors()),
        }
    }
}

fn request_trace_id(extensions: &axum::http::Extensions) -> String {
    extensions
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default()
}

/// JSON body that has been deserialized and validated. Malformed JSON,
/// unknown enum values and failed checks all become a 400 envelope.
pub struct ValidatedJson<T: Validate>(pub T::Output);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
    T::Output: Send,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let trace_id = request_trace_id(req.extensions());
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                validation_error_response(
                    &trace_id,
                    vec![FieldError {
                        field: "body".to_string(),
                        message: rejection.body_text(),
                    }],
                )
            })?;
        payload
            .validate()
            .map(ValidatedJson)
            .map_err(|errors| validation_error_response(&trace_id, errors))
    }
}

/// Query string extractor whose rejection is a 400 envelope.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::try_from_uri(&parts.uri) {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(validation_error_response(
                &request_trace_id(&parts.extensions),
                vec![FieldError {
                    field: "query".to_string(),
                    message: rejection.body_text(),
                }],
            )),
        }
    }
}
