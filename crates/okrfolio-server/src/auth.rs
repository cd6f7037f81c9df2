use axum::body::Body;
use axum::extract::{Extension, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use okrfolio_common::requests::{AuthResponse, LoginRequest, RegisterRequest};
use okrfolio_common::types::{User, UserProfile};
use serde::{Deserialize, Serialize};

use crate::api::{error_response, storage_error_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use crate::validation::ValidatedJson;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// Identity of the caller, inserted by [`jwt_auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
}

pub fn create_token(secret: &str, user_id: &str, expire_secs: u64) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + expire_secs,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn validate_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

fn auth_error(trace_id: &str, code: &str, msg: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, trace_id, code, msg)
}

/// Bearer token gate for every protected route.
///
/// A missing header, a bad token and an expired token are rejected with
/// distinct codes, all as 401. A valid token whose account no longer exists
/// counts as invalid.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        None => {
            return auth_error(&trace_id, "unauthorized", "missing authorization header");
        }
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) if !token.is_empty() => token,
            _ => {
                return auth_error(&trace_id, "invalid_token", "invalid authorization header");
            }
        },
    };

    let claims = match validate_token(&state.jwt_secret, token) {
        Ok(claims) => claims,
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
            return auth_error(&trace_id, "token_expired", "token expired");
        }
        Err(_) => {
            return auth_error(&trace_id, "invalid_token", "invalid token");
        }
    };

    match state.store.get_user_by_id(&claims.sub).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(CurrentUser {
                id: user.id,
                email: user.email,
            });
            next.run(req).await
        }
        Ok(None) => {
            tracing::warn!(trace_id = %trace_id, user_id = %claims.sub, "Token for unknown account");
            auth_error(&trace_id, "invalid_token", "invalid token")
        }
        Err(e) => storage_error_response(&trace_id, &e, "Failed to load account for token"),
    }
}

fn issue(state: &AppState, trace_id: &str, status: StatusCode, user: &User) -> Response {
    match create_token(&state.jwt_secret, &user.id, state.token_expire_secs) {
        Ok(token) => success_response(
            status,
            trace_id,
            AuthResponse {
                token,
                expires_in: state.token_expire_secs,
                user: UserProfile::from(user),
            },
        ),
        Err(e) => {
            tracing::error!(trace_id = %trace_id, error = %e, "Failed to create token");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "internal_error",
                "internal error",
            )
        }
    }
}

/// Creates an account and signs it in.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 409, description = "E-mail already registered", body = ApiError)
    )
)]
pub async fn register(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    ValidatedJson(account): ValidatedJson<RegisterRequest>,
) -> impl IntoResponse {
    match state.store.create_user(&account).await {
        Ok(Some(user)) => {
            tracing::info!(user_id = %user.id, "Account registered");
            issue(&state, &trace_id, StatusCode::CREATED, &user)
        }
        Ok(None) => error_response(
            StatusCode::CONFLICT,
            &trace_id,
            "conflict",
            "email already registered",
        ),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to create account"),
    }
}

/// Exchanges e-mail and password for a bearer token.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Wrong e-mail or password", body = ApiError)
    )
)]
pub async fn login(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    ValidatedJson(creds): ValidatedJson<LoginRequest>,
) -> impl IntoResponse {
    match state
        .store
        .verify_credentials(&creds.email, &creds.password)
        .await
    {
        Ok(Some(user)) => issue(&state, &trace_id, StatusCode::OK, &user),
        Ok(None) => auth_error(&trace_id, "unauthorized", "invalid credentials"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to verify credentials"),
    }
}

/// Profile of the signed-in account.
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current account", body = UserProfile),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
pub async fn me(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> impl IntoResponse {
    match state.store.get_user_by_id(&user.id).await {
        Ok(Some(account)) => success_response(StatusCode::OK, &trace_id, UserProfile::from(&account)),
        Ok(None) => auth_error(&trace_id, "invalid_token", "invalid token"),
        Err(e) => storage_error_response(&trace_id, &e, "Failed to load account"),
    }
}
