use crate::api::{
    no_content_response, not_found_response, storage_error_response, success_response, ApiError,
};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::state::AppState;
use crate::validation::{ApiQuery, ValidatedJson};
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use okrfolio_common::requests::{
    CreateObjectiveRequest, UpdateKeyResultRequest, UpdateObjectiveRequest,
};
use okrfolio_common::types::{Category, KeyResult, Objective, ObjectiveFilter, OkrStatus};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ObjectiveListParams {
    status: Option<OkrStatus>,
    category: Option<Category>,
}

/// Objectives of the caller with their key results. `progress` is derived
/// from the key results whenever any of them has a description.
#[utoipa::path(
    get,
    path = "/v1/objectives",
    tag = "Objectives",
    security(("bearer_auth" = [])),
    params(ObjectiveListParams),
    responses(
        (status = 200, description = "Objective list", body = Vec<Objective>),
        (status = 400, description = "Invalid filter", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
async fn list_objectives(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<ObjectiveListParams>,
) -> impl IntoResponse {
    let filter = ObjectiveFilter {
        status: params.status,
        category: params.category,
    };
    match state.store.list_objectives(&user.id, &filter).await {
        Ok(objectives) => success_response(StatusCode::OK, &trace_id, objectives),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to list objectives"),
    }
}

/// Creates an objective and its key results atomically.
#[utoipa::path(
    post,
    path = "/v1/objectives",
    tag = "Objectives",
    security(("bearer_auth" = [])),
    request_body = CreateObjectiveRequest,
    responses(
        (status = 201, description = "Objective created", body = Objective),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
async fn create_objective(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedJson(input): ValidatedJson<CreateObjectiveRequest>,
) -> impl IntoResponse {
    match state.store.create_objective(&user.id, &input).await {
        Ok(objective) => success_response(StatusCode::CREATED, &trace_id, objective),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to create objective"),
    }
}

#[utoipa::path(
    get,
    path = "/v1/objectives/{id}",
    tag = "Objectives",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Objective id")),
    responses(
        (status = 200, description = "Objective", body = Objective),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such objective", body = ApiError)
    )
)]
async fn get_objective(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_objective(&user.id, &id).await {
        Ok(Some(objective)) => success_response(StatusCode::OK, &trace_id, objective),
        Ok(None) => not_found_response(&trace_id, "objective not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to get objective"),
    }
}

#[utoipa::path(
    put,
    path = "/v1/objectives/{id}",
    tag = "Objectives",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Objective id")),
    request_body = UpdateObjectiveRequest,
    responses(
        (status = 200, description = "Updated objective", body = Objective),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such objective", body = ApiError)
    )
)]
async fn update_objective(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<UpdateObjectiveRequest>,
) -> impl IntoResponse {
    match state.store.update_objective(&user.id, &id, &changes).await {
        Ok(Some(objective)) => success_response(StatusCode::OK, &trace_id, objective),
        Ok(None) => not_found_response(&trace_id, "objective not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to update objective"),
    }
}

/// Deletes an objective and its key results.
#[utoipa::path(
    delete,
    path = "/v1/objectives/{id}",
    tag = "Objectives",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Objective id")),
    responses(
        (status = 204, description = "Objective deleted"),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such objective", body = ApiError)
    )
)]
async fn delete_objective(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_objective(&user.id, &id).await {
        Ok(true) => no_content_response(),
        Ok(false) => not_found_response(&trace_id, "objective not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to delete objective"),
    }
}

/// Records a new current value and/or status on one key result.
#[utoipa::path(
    put,
    path = "/v1/objectives/{objective_id}/key-results/{key_result_id}",
    tag = "Objectives",
    security(("bearer_auth" = [])),
    params(
        ("objective_id" = String, Path, description = "Objective id"),
        ("key_result_id" = String, Path, description = "Key result id")
    ),
    request_body = UpdateKeyResultRequest,
    responses(
        (status = 200, description = "Updated key result", body = KeyResult),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No such objective or key result", body = ApiError)
    )
)]
async fn update_key_result(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((objective_id, key_result_id)): Path<(String, String)>,
    ValidatedJson(changes): ValidatedJson<UpdateKeyResultRequest>,
) -> impl IntoResponse {
    match state
        .store
        .update_key_result(&user.id, &objective_id, &key_result_id, &changes)
        .await
    {
        Ok(Some(kr)) => success_response(StatusCode::OK, &trace_id, kr),
        Ok(None) => not_found_response(&trace_id, "key result not found"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to update key result"),
    }
}

pub fn objective_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_objectives, create_objective))
        .routes(routes!(get_objective, update_objective, delete_objective))
        .routes(routes!(update_key_result))
}
