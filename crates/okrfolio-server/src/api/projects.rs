use crate::api::{
    no_content_response, not_found_response, storage_error_response, success_response, ApiError,
    ListSort,
};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::state::AppState;
use crate::validation::{ApiQuery, ValidatedJson};
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use okrfolio_common::requests::{
    CreateMilestoneRequest, CreateProjectRequest, CreateRedFlagRequest, UpdateProjectRequest,
};
use okrfolio_common::rules::rank_by_severity_or_priority;
use okrfolio_common::types::{
    Category, Milestone, Priority, Project, ProjectFilter, ProjectStatus, RedFlag,
};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectListParams {
    category: Option<Category>,
    status: Option<ProjectStatus>,
    priority: Option<Priority>,
    #[serde(default)]
    sort: ListSort,
}

/// Projects of the caller, most recently updated first.
#[utoipa::path(
    get,
    path = "/v1/projects",
    tag = "Projects",
    security(("bearer_auth" = [])),
    params(ProjectListParams),
    responses(
        (status = 200, description = "Project list", body = Vec<Project>),
        (status = 400, description = "Invalid filter", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
async fn list_projects(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<ProjectListParams>,
) -> impl IntoResponse {
    let filter = ProjectFilter {
        category: params.category,
        status: params.status,
        priority: params.priority,
    };
    match state.store.list_projects(&user.id, &filter).await {
        Ok(projects) => {
            let projects = match params.sort {
                ListSort::Updated => projects,
                ListSort::Priority => rank_by_severity_or_priority(projects, |p| p.priority),
            };
            success_response(StatusCode::OK, &trace_id, projects)
        }
        Err(e) => storage_error_response(&trace_id, &e, "Failed to list projects"),
    }
}

#[utoipa::path(
    post,
    path = "/v1/projects",
    tag = "Projects",
    security(("bearer_auth" = [])),
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
async fn create_project(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedJson(input): ValidatedJson<CreateProjectRequest>,
) -> impl IntoResponse {
    match state.store.create_project(&user.id, &input).await {
        Ok(project) => success_response(StatusCode::CREATED, &trace_id, project),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to create project"),
    }
}

/// One project with its milestones and red flags.
#[utoipa::path(
    get,
    path = "/v1/projects/{id}",
    tag = "Projects",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project", body = Project),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such project", body = ApiError)
    )
)]
async fn get_project(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_project(&user.id, &id).await {
        Ok(Some(project)) => success_response(StatusCode::OK, &trace_id, project),
        Ok(None) => not_found_response(&trace_id, "project not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to get project"),
    }
}

/// Partial update. Absent fields are left as they are.
#[utoipa::path(
    put,
    path = "/v1/projects/{id}",
    tag = "Projects",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Project id")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Updated project", body = Project),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such project", body = ApiError)
    )
)]
async fn update_project(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<UpdateProjectRequest>,
) -> impl IntoResponse {
    match state.store.update_project(&user.id, &id, &changes).await {
        Ok(Some(project)) => success_response(StatusCode::OK, &trace_id, project),
        Ok(None) => not_found_response(&trace_id, "project not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to update project"),
    }
}

/// Deletes a project together with its milestones and red flags.
#[utoipa::path(
    delete,
    path = "/v1/projects/{id}",
    tag = "Projects",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such project", body = ApiError)
    )
)]
async fn delete_project(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_project(&user.id, &id).await {
        Ok(true) => no_content_response(),
        Ok(false) => not_found_response(&trace_id, "project not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to delete project"),
    }
}

#[utoipa::path(
    post,
    path = "/v1/projects/{id}/milestones",
    tag = "Projects",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Project id")),
    request_body = CreateMilestoneRequest,
    responses(
        (status = 201, description = "Milestone created", body = Milestone),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such project", body = ApiError)
    )
)]
async fn add_milestone(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<CreateMilestoneRequest>,
) -> impl IntoResponse {
    match state.store.add_milestone(&user.id, &id, &input).await {
        Ok(Some(milestone)) => success_response(StatusCode::CREATED, &trace_id, milestone),
        Ok(None) => not_found_response(&trace_id, "project not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to add milestone"),
    }
}

/// Flips a milestone between completed and not completed.
#[utoipa::path(
    patch,
    path = "/v1/projects/{project_id}/milestones/{milestone_id}/toggle",
    tag = "Projects",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = String, Path, description = "Project id"),
        ("milestone_id" = String, Path, description = "Milestone id")
    ),
    responses(
        (status = 200, description = "Toggled milestone", body = Milestone),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such project or milestone", body = ApiError)
    )
)]
async fn toggle_milestone(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((project_id, milestone_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match state
        .store
        .toggle_milestone(&user.id, &project_id, &milestone_id)
        .await
    {
        Ok(Some(milestone)) => success_response(StatusCode::OK, &trace_id, milestone),
        Ok(None) => not_found_response(&trace_id, "milestone not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to toggle milestone"),
    }
}

#[utoipa::path(
    post,
    path = "/v1/projects/{id}/red-flags",
    tag = "Projects",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Project id")),
    request_body = CreateRedFlagRequest,
    responses(
        (status = 201, description = "Red flag raised", body = RedFlag),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such project", body = ApiError)
    )
)]
async fn add_red_flag(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<CreateRedFlagRequest>,
) -> impl IntoResponse {
    match state.store.add_red_flag(&user.id, &id, &input).await {
        Ok(Some(flag)) => success_response(StatusCode::CREATED, &trace_id, flag),
        Ok(None) => not_found_response(&trace_id, "project not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to add red flag"),
    }
}

/// Marks a red flag resolved. Resolving twice keeps the first resolution time.
#[utoipa::path(
    patch,
    path = "/v1/projects/{project_id}/red-flags/{red_flag_id}/resolve",
    tag = "Projects",
    security(("bearer_auth" = [])),
    params(
        ("project_id" = String, Path, description = "Project id"),
        ("red_flag_id" = String, Path, description = "Red flag id")
    ),
    responses(
        (status = 200, description = "Resolved red flag", body = RedFlag),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such project or red flag", body = ApiError)
    )
)]
async fn resolve_red_flag(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((project_id, red_flag_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match state
        .store
        .resolve_red_flag(&user.id, &project_id, &red_flag_id)
        .await
    {
        Ok(Some(flag)) => success_response(StatusCode::OK, &trace_id, flag),
        Ok(None) => not_found_response(&trace_id, "red flag not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to resolve red flag"),
    }
}

pub fn project_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_projects, create_project))
        .routes(routes!(get_project, update_project, delete_project))
        .routes(routes!(add_milestone))
        .routes(routes!(toggle_milestone))
        .routes(routes!(add_red_flag))
        .routes(routes!(resolve_red_flag))
}
