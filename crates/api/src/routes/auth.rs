//! Authentication routes for register and login.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde_json::json;
use tracing::{error, info};

use crate::{AppState, routes::error_response};
use fatura_core::auth::{hash_password, verify_password};
use fatura_db::UserRepository;
use fatura_db::repositories::UserError;
use fatura_shared::AppError;
use fatura_shared::auth::{LoginRequest, RegisterRequest, TokenResponse};

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

fn user_error(e: UserError) -> AppError {
    match e {
        UserError::EmailTaken(_) => AppError::Conflict(e.to_string()),
        UserError::NotFound(_) => AppError::NotFound(e.to_string()),
        UserError::Database(err) => {
            error!(error = %err, "Database error in auth");
            AppError::Database("An error occurred".to_string())
        }
    }
}

/// POST /auth/register - Create a new user account.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            return error_response(&AppError::Internal("An error occurred".to_string()));
        }
    };

    let user_repo = UserRepository::new((*state.db).clone());
    match user_repo
        .create(&payload.name, &payload.email, &password_hash)
        .await
    {
        Ok(user) => {
            info!(user_id = %user.id, "user registered");
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": user.id,
                    "name": user.name,
                    "email": user.email
                })),
            )
                .into_response()
        }
        Err(e) => error_response(&user_error(e)),
    }
}

/// POST /auth/login - Authenticate and return an access token.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let user_repo = UserRepository::new((*state.db).clone());

    let user = match user_repo.find_by_email(&payload.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!(email = %payload.email, "login attempt for non-existent user");
            return error_response(&AppError::Unauthorized(
                "invalid email or password".to_string(),
            ));
        }
        Err(e) => return error_response(&user_error(e)),
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            info!(user_id = %user.id, "failed login attempt");
            return error_response(&AppError::Unauthorized(
                "invalid email or password".to_string(),
            ));
        }
        Err(e) => {
            error!(error = %e, "Password verification error");
            return error_response(&AppError::Internal("An error occurred".to_string()));
        }
    }

    match state.jwt_service.generate_access_token(user.id, &user.email) {
        Ok(access_token) => Json(TokenResponse {
            access_token,
            expires_in: state.jwt_service.access_token_expires_in(),
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to generate access token");
            error_response(&AppError::Internal("An error occurred".to_string()))
        }
    }
}
