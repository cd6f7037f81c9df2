use crate::api::{storage_error_response, success_response, validation_error_response, ApiError};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::state::AppState;
use crate::validation::{ApiQuery, FieldError};
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use okrfolio_common::rules::MAX_UPCOMING_WINDOW_DAYS;
use okrfolio_common::types::{
    Category, DashboardStats, DashboardSummary, MilestoneWithProject, RedFlagWithProject,
    TimelineMonth,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UpcomingParams {
    /// Look-ahead in days, 1 to 365. Defaults to the configured window.
    window_days: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimelineView {
    #[default]
    All,
    /// Incomplete milestones dated now or later.
    Upcoming,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TimelineParams {
    category: Option<Category>,
    #[serde(default)]
    view: TimelineView,
}

/// Portfolio counts and averages for the caller.
#[utoipa::path(
    get,
    path = "/v1/dashboard/stats",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
async fn dashboard_stats(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> impl IntoResponse {
    let window = state.config.dashboard.upcoming_window_days;
    match state.store.dashboard_stats(&user.id, Utc::now(), window).await {
        Ok(stats) => success_response(StatusCode::OK, &trace_id, stats),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to compute dashboard stats"),
    }
}

/// Recently updated projects, objectives and initiatives, plus unresolved
/// high and critical red flags.
#[utoipa::path(
    get,
    path = "/v1/dashboard/summary",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardSummary),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
async fn dashboard_summary(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> impl IntoResponse {
    match state.store.dashboard_summary(&user.id).await {
        Ok(summary) => success_response(StatusCode::OK, &trace_id, summary),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to build dashboard summary"),
    }
}

/// Unresolved red flags, most severe first.
#[utoipa::path(
    get,
    path = "/v1/dashboard/red-flags",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Red flag board", body = Vec<RedFlagWithProject>),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
async fn red_flag_board(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> impl IntoResponse {
    match state.store.red_flag_board(&user.id).await {
        Ok(flags) => success_response(StatusCode::OK, &trace_id, flags),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to list red flags"),
    }
}

#[utoipa::path(
    get,
    path = "/v1/dashboard/upcoming-milestones",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    params(UpcomingParams),
    responses(
        (status = 200, description = "Upcoming milestones, earliest first", body = Vec<MilestoneWithProject>),
        (status = 400, description = "Window out of range", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
async fn upcoming_milestones(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<UpcomingParams>,
) -> impl IntoResponse {
    let window = params
        .window_days
        .unwrap_or(state.config.dashboard.upcoming_window_days);
    if !(1..=MAX_UPCOMING_WINDOW_DAYS).contains(&window) {
        return validation_error_response(
            &trace_id,
            vec![FieldError {
                field: "window_days".to_string(),
                message: format!("must be between 1 and {MAX_UPCOMING_WINDOW_DAYS}"),
            }],
        );
    }
    match state
        .store
        .upcoming_milestones(&user.id, Utc::now(), window)
        .await
    {
        Ok(milestones) => success_response(StatusCode::OK, &trace_id, milestones),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to list upcoming milestones"),
    }
}

/// Milestones grouped by calendar month, months ascending.
#[utoipa::path(
    get,
    path = "/v1/dashboard/timeline",
    tag = "Dashboard",
    security(("bearer_auth" = [])),
    params(TimelineParams),
    responses(
        (status = 200, description = "Milestone timeline", body = Vec<TimelineMonth>),
        (status = 400, description = "Invalid filter", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
async fn milestone_timeline(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<TimelineParams>,
) -> impl IntoResponse {
    let upcoming_only = params.view == TimelineView::Upcoming;
    match state
        .store
        .milestone_timeline(&user.id, params.category, upcoming_only, Utc::now())
        .await
    {
        Ok(months) => success_response(StatusCode::OK, &trace_id, months),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to build milestone timeline"),
    }
}

pub fn dashboard_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(dashboard_stats))
        .routes(routes!(dashboard_summary))
        .routes(routes!(red_flag_board))
        .routes(routes!(upcoming_milestones))
        .routes(routes!(milestone_timeline))
}
