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
use okrfolio_common::requests::{CreateInitiativeRequest, UpdateInitiativeRequest};
use okrfolio_common::rules::rank_by_severity_or_priority;
use okrfolio_common::types::{
    Category, Initiative, InitiativeFilter, InitiativeStatus, Priority,
};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InitiativeListParams {
    status: Option<InitiativeStatus>,
    category: Option<Category>,
    priority: Option<Priority>,
    #[serde(default)]
    sort: ListSort,
}

#[utoipa::path(
    get,
    path = "/v1/initiatives",
    tag = "Initiatives",
    security(("bearer_auth" = [])),
    params(InitiativeListParams),
    responses(
        (status = 200, description = "Initiative list", body = Vec<Initiative>),
        (status = 400, description = "Invalid filter", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
async fn list_initiatives(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<InitiativeListParams>,
) -> impl IntoResponse {
    let filter = InitiativeFilter {
        status: params.status,
        category: params.category,
        priority: params.priority,
    };
    match state.store.list_initiatives(&user.id, &filter).await {
        Ok(initiatives) => {
            let initiatives = match params.sort {
                ListSort::Updated => initiatives,
                ListSort::Priority => rank_by_severity_or_priority(initiatives, |i| i.priority),
            };
            success_response(StatusCode::OK, &trace_id, initiatives)
        }
        Err(e) => storage_error_response(&trace_id, &e, "Failed to list initiatives"),
    }
}

#[utoipa::path(
    post,
    path = "/v1/initiatives",
    tag = "Initiatives",
    security(("bearer_auth" = [])),
    request_body = CreateInitiativeRequest,
    responses(
        (status = 201, description = "Initiative created", body = Initiative),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
async fn create_initiative(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedJson(input): ValidatedJson<CreateInitiativeRequest>,
) -> impl IntoResponse {
    match state.store.create_initiative(&user.id, &input).await {
        Ok(initiative) => success_response(StatusCode::CREATED, &trace_id, initiative),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to create initiative"),
    }
}

#[utoipa::path(
    get,
    path = "/v1/initiatives/{id}",
    tag = "Initiatives",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Initiative id")),
    responses(
        (status = 200, description = "Initiative", body = Initiative),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such initiative", body = ApiError)
    )
)]
async fn get_initiative(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_initiative(&user.id, &id).await {
        Ok(Some(initiative)) => success_response(StatusCode::OK, &trace_id, initiative),
        Ok(None) => not_found_response(&trace_id, "initiative not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to get initiative"),
    }
}

/// Partial update. `null` clears effort or impact.
#[utoipa::path(
    put,
    path = "/v1/initiatives/{id}",
    tag = "Initiatives",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Initiative id")),
    request_body = UpdateInitiativeRequest,
    responses(
        (status = 200, description = "Updated initiative", body = Initiative),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such initiative", body = ApiError)
    )
)]
async fn update_initiative(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<UpdateInitiativeRequest>,
) -> impl IntoResponse {
    match state.store.update_initiative(&user.id, &id, &changes).await {
        Ok(Some(initiative)) => success_response(StatusCode::OK, &trace_id, initiative),
        Ok(None) => not_found_response(&trace_id, "initiative not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to update initiative"),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/initiatives/{id}",
    tag = "Initiatives",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Initiative id")),
    responses(
        (status = 204, description = "Initiative deleted"),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such initiative", body = ApiError)
    )
)]
async fn delete_initiative(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_initiative(&user.id, &id).await {
        Ok(true) => no_content_response(),
        Ok(false) => not_found_response(&trace_id, "initiative not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to delete initiative"),
    }
}

pub fn initiative_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_initiatives, create_initiative))
        .routes(routes!(get_initiative, update_initiative, delete_initiative))
}
