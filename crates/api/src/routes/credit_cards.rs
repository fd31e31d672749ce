//! Credit card management routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser, routes::error_response};
use fatura_db::CreditCardRepository;
use fatura_db::entities::credit_cards;
use fatura_db::repositories::{CreateCreditCardInput, CreditCardError, UpdateCreditCardInput};
use fatura_shared::AppError;
use fatura_shared::types::{format_amount, parse_amount};

/// Creates the credit card routes (requires auth middleware).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/credit-cards", post(create_card))
        .route("/credit-cards", get(list_cards))
        .route("/credit-cards/{id}", patch(update_card))
        .route("/credit-cards/{id}", delete(remove_card))
}

/// Request body for creating a credit card.
#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    /// Card nickname.
    pub nickname: String,
    /// Card brand (e.g. "Visa").
    pub brand: String,
    /// Last four digits.
    pub last4: String,
    /// Optional credit limit as a 2-decimal string.
    pub limit_amount: Option<String>,
}

/// Request body for updating a credit card.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateCardRequest {
    /// New nickname.
    pub nickname: Option<String>,
    /// New brand.
    pub brand: Option<String>,
    /// New last four digits.
    pub last4: Option<String>,
    /// New credit limit as a 2-decimal string.
    pub limit_amount: Option<String>,
}

/// Response for a credit card.
#[derive(Debug, Serialize)]
pub struct CardResponse {
    /// Card ID.
    pub id: Uuid,
    /// Card nickname.
    pub nickname: String,
    /// Card brand.
    pub brand: String,
    /// Last four digits.
    pub last4: String,
    /// Credit limit, 2-decimal string.
    pub limit_amount: Option<String>,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

fn card_response(model: credit_cards::Model) -> CardResponse {
    CardResponse {
        id: model.id,
        nickname: model.nickname,
        brand: model.brand,
        last4: model.last4,
        limit_amount: model.limit_amount.map(format_amount),
        created_at: model.created_at.to_rfc3339(),
        updated_at: model.updated_at.to_rfc3339(),
    }
}

fn card_error(e: CreditCardError) -> AppError {
    match e {
        CreditCardError::NotFound(_) => AppError::NotFound(e.to_string()),
        CreditCardError::NotOwned => AppError::Forbidden(e.to_string()),
        CreditCardError::Database(err) => {
            error!(error = %err, "Database error in credit cards");
            AppError::Database("An error occurred".to_string())
        }
    }
}

/// POST /credit-cards - Create a credit card.
async fn create_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateCardRequest>,
) -> impl IntoResponse {
    let limit_amount = match payload.limit_amount.as_deref().map(parse_amount) {
        None => None,
        Some(Ok(amount)) => Some(amount),
        Some(Err(e)) => return error_response(&AppError::Validation(e.to_string())),
    };

    let repo = CreditCardRepository::new((*state.db).clone());
    let input = CreateCreditCardInput {
        nickname: payload.nickname,
        brand: payload.brand,
        last4: payload.last4,
        limit_amount,
    };
    match repo.create(auth.user_id(), input).await {
        Ok(card) => (StatusCode::CREATED, Json(card_response(card))).into_response(),
        Err(e) => error_response(&card_error(e)),
    }
}

/// GET /credit-cards - List the caller's cards.
async fn list_cards(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let repo = CreditCardRepository::new((*state.db).clone());
    match repo.list(auth.user_id()).await {
        Ok(cards) => {
            let response: Vec<CardResponse> = cards.into_iter().map(card_response).collect();
            Json(json!({ "credit_cards": response })).into_response()
        }
        Err(e) => error_response(&card_error(e)),
    }
}

/// PATCH /credit-cards/{id} - Update a credit card.
async fn update_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCardRequest>,
) -> impl IntoResponse {
    let limit_amount = match payload.limit_amount.as_deref().map(parse_amount) {
        None => None,
        Some(Ok(amount)) => Some(Some(amount)),
        Some(Err(e)) => return error_response(&AppError::Validation(e.to_string())),
    };

    let repo = CreditCardRepository::new((*state.db).clone());
    let patch = UpdateCreditCardInput {
        nickname: payload.nickname,
        brand: payload.brand,
        last4: payload.last4,
        limit_amount,
    };
    match repo.update(id, auth.user_id(), patch).await {
        Ok(card) => Json(card_response(card)).into_response(),
        Err(e) => error_response(&card_error(e)),
    }
}

/// DELETE /credit-cards/{id} - Remove a credit card.
async fn remove_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = CreditCardRepository::new((*state.db).clone());
    match repo.remove(id, auth.user_id()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&card_error(e)),
    }
}
