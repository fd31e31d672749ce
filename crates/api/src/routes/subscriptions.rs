//! Subscription management routes.

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
use fatura_db::SubscriptionRepository;
use fatura_db::entities::subscriptions;
use fatura_db::repositories::{
    CreateSubscriptionInput, SubscriptionError, UpdateSubscriptionInput,
};
use fatura_shared::AppError;
use fatura_shared::types::{format_amount, parse_amount};

/// Creates the subscription routes (requires auth middleware).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/subscriptions", post(create_subscription))
        .route("/subscriptions", get(list_subscriptions))
        .route("/subscriptions/{id}", get(get_subscription))
        .route("/subscriptions/{id}", patch(update_subscription))
        .route("/subscriptions/{id}", delete(remove_subscription))
}

/// Request body for creating a subscription.
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Card charged every month.
    pub credit_card_id: Uuid,
    /// Optional tenant the charge belongs to.
    pub tenant_id: Option<Uuid>,
    /// Free-form description.
    pub description: String,
    /// Flat monthly amount as a 2-decimal string.
    pub amount: String,
    /// Whether the subscription starts active (default true).
    pub active: Option<bool>,
}

/// Request body for updating a subscription.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateSubscriptionRequest {
    /// Move the subscription to another card.
    pub credit_card_id: Option<Uuid>,
    /// Reassign the tenant.
    pub tenant_id: Option<Uuid>,
    /// New description.
    pub description: Option<String>,
    /// New monthly amount as a 2-decimal string.
    pub amount: Option<String>,
    /// Activate / deactivate.
    pub active: Option<bool>,
}

/// Response for a subscription.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    /// Subscription ID.
    pub id: Uuid,
    /// Card charged every month.
    pub credit_card_id: Uuid,
    /// Tenant the charge belongs to.
    pub tenant_id: Option<Uuid>,
    /// Description.
    pub description: String,
    /// Monthly amount, 2-decimal string.
    pub amount: String,
    /// Whether the subscription is active.
    pub active: bool,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

fn subscription_response(model: subscriptions::Model) -> SubscriptionResponse {
    SubscriptionResponse {
        id: model.id,
        credit_card_id: model.credit_card_id,
        tenant_id: model.tenant_id,
        description: model.description,
        amount: format_amount(model.amount),
        active: model.active,
        created_at: model.created_at.to_rfc3339(),
        updated_at: model.updated_at.to_rfc3339(),
    }
}

fn subscription_error(e: SubscriptionError) -> AppError {
    match e {
        SubscriptionError::NotFound(_) => AppError::NotFound(e.to_string()),
        SubscriptionError::NotOwned
        | SubscriptionError::CardNotOwned
        | SubscriptionError::TenantNotOwned => AppError::Forbidden(e.to_string()),
        SubscriptionError::NonPositiveAmount => AppError::Validation(e.to_string()),
        SubscriptionError::Database(err) => {
            error!(error = %err, "Database error in subscriptions");
            AppError::Database("An error occurred".to_string())
        }
    }
}

/// POST /subscriptions - Create a subscription.
async fn create_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> impl IntoResponse {
    let amount = match parse_amount(&payload.amount) {
        Ok(amount) => amount,
        Err(e) => return error_response(&AppError::Validation(e.to_string())),
    };

    let repo = SubscriptionRepository::new((*state.db).clone());
    let input = CreateSubscriptionInput {
        credit_card_id: payload.credit_card_id,
        tenant_id: payload.tenant_id,
        description: payload.description,
        amount,
        active: payload.active.unwrap_or(true),
    };
    match repo.create(auth.user_id(), input).await {
        Ok(subscription) => (
            StatusCode::CREATED,
            Json(subscription_response(subscription)),
        )
            .into_response(),
        Err(e) => error_response(&subscription_error(e)),
    }
}

/// GET /subscriptions - List the caller's subscriptions.
async fn list_subscriptions(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let repo = SubscriptionRepository::new((*state.db).clone());
    match repo.list(auth.user_id()).await {
        Ok(all) => {
            let response: Vec<SubscriptionResponse> =
                all.into_iter().map(subscription_response).collect();
            Json(json!({ "subscriptions": response })).into_response()
        }
        Err(e) => error_response(&subscription_error(e)),
    }
}

/// GET /subscriptions/{id} - Fetch one subscription.
async fn get_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = SubscriptionRepository::new((*state.db).clone());
    match repo.find_owned(id, auth.user_id()).await {
        Ok(subscription) => Json(subscription_response(subscription)).into_response(),
        Err(e) => error_response(&subscription_error(e)),
    }
}

/// PATCH /subscriptions/{id} - Update a subscription.
async fn update_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> impl IntoResponse {
    let amount = match payload.amount.as_deref().map(parse_amount) {
        None => None,
        Some(Ok(amount)) => Some(amount),
        Some(Err(e)) => return error_response(&AppError::Validation(e.to_string())),
    };

    let repo = SubscriptionRepository::new((*state.db).clone());
    let patch = UpdateSubscriptionInput {
        credit_card_id: payload.credit_card_id,
        tenant_id: payload.tenant_id,
        description: payload.description,
        amount,
        active: payload.active,
    };
    match repo.update(id, auth.user_id(), patch).await {
        Ok(subscription) => Json(subscription_response(subscription)).into_response(),
        Err(e) => error_response(&subscription_error(e)),
    }
}

/// DELETE /subscriptions/{id} - Remove a subscription.
async fn remove_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = SubscriptionRepository::new((*state.db).clone());
    match repo.remove(id, auth.user_id()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&subscription_error(e)),
    }
}
