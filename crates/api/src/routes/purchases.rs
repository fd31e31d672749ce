//! Purchase management routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser, routes::error_response};
use fatura_db::PurchaseRepository;
use fatura_db::entities::purchases;
use fatura_db::repositories::{
    CreatePurchaseInput, PurchaseError, PurchaseFilter, UpdatePurchaseInput,
};
use fatura_shared::AppError;
use fatura_shared::types::{format_amount, parse_amount};

/// Creates the purchase routes (requires auth middleware).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/purchases", post(create_purchase))
        .route("/purchases", get(list_purchases))
        .route("/purchases/{id}", patch(update_purchase))
        .route("/purchases/{id}", delete(remove_purchase))
        .route(
            "/purchases/{id}/installments-paid",
            patch(set_installments_paid),
        )
}

/// Request body for creating a purchase.
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    /// Card the purchase was made on.
    pub credit_card_id: Uuid,
    /// Tenant the purchase belongs to.
    pub tenant_id: Uuid,
    /// Free-form description.
    pub description: String,
    /// Calendar date of the purchase.
    pub purchase_date: NaiveDate,
    /// Full purchase amount as a 2-decimal string.
    pub total_amount: String,
    /// Whether the purchase is paid in installments.
    #[serde(default)]
    pub is_installment: bool,
    /// Number of installments.
    pub installments_total: Option<i32>,
    /// Installments already settled.
    #[serde(default)]
    pub installments_paid: i32,
}

/// Request body for updating a purchase.
#[derive(Debug, Deserialize, Default)]
pub struct UpdatePurchaseRequest {
    /// New description.
    pub description: Option<String>,
    /// New purchase date.
    pub purchase_date: Option<NaiveDate>,
    /// New total amount as a 2-decimal string.
    pub total_amount: Option<String>,
    /// New installment flag.
    pub is_installment: Option<bool>,
    /// New installment count.
    pub installments_total: Option<i32>,
    /// New paid counter.
    pub installments_paid: Option<i32>,
}

/// Request body for setting the paid-installments counter.
#[derive(Debug, Deserialize)]
pub struct InstallmentsPaidRequest {
    /// New paid counter (0..=installments_total).
    pub installments_paid: i32,
}

/// Query parameters for listing purchases.
#[derive(Debug, Deserialize)]
pub struct ListPurchasesQuery {
    /// Restrict to one credit card.
    pub credit_card_id: Option<Uuid>,
    /// Restrict to one tenant.
    pub tenant_id: Option<Uuid>,
    /// Restrict to installment / cash purchases.
    pub is_installment: Option<bool>,
    /// Start of an inclusive purchase-date range.
    pub date_start: Option<NaiveDate>,
    /// End of an inclusive purchase-date range.
    pub date_end: Option<NaiveDate>,
}

/// Response for a purchase.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    /// Purchase ID.
    pub id: Uuid,
    /// Card the purchase was made on.
    pub credit_card_id: Uuid,
    /// Tenant the purchase belongs to.
    pub tenant_id: Uuid,
    /// Description.
    pub description: String,
    /// Purchase date (YYYY-MM-DD).
    pub purchase_date: String,
    /// Total amount, 2-decimal string.
    pub total_amount: String,
    /// Installment flag.
    pub is_installment: bool,
    /// Installment count.
    pub installments_total: Option<i32>,
    /// Paid counter.
    pub installments_paid: i32,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

fn purchase_response(model: purchases::Model) -> PurchaseResponse {
    PurchaseResponse {
        id: model.id,
        credit_card_id: model.credit_card_id,
        tenant_id: model.tenant_id,
        description: model.description,
        purchase_date: model.purchase_date.to_string(),
        total_amount: format_amount(model.total_amount),
        is_installment: model.is_installment,
        installments_total: model.installments_total,
        installments_paid: model.installments_paid,
        created_at: model.created_at.to_rfc3339(),
        updated_at: model.updated_at.to_rfc3339(),
    }
}

fn purchase_error(e: PurchaseError) -> AppError {
    match e {
        PurchaseError::NotFound(_) => AppError::NotFound(e.to_string()),
        PurchaseError::NotOwned | PurchaseError::CardNotOwned | PurchaseError::TenantNotOwned => {
            AppError::Forbidden(e.to_string())
        }
        PurchaseError::NonPositiveAmount
        | PurchaseError::InvalidInstallmentsTotal
        | PurchaseError::InstallmentsPaidOutOfBounds
        | PurchaseError::NotInstallment => AppError::Validation(e.to_string()),
        PurchaseError::Database(err) => {
            error!(error = %err, "Database error in purchases");
            AppError::Database("An error occurred".to_string())
        }
    }
}

/// POST /purchases - Create a purchase.
async fn create_purchase(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreatePurchaseRequest>,
) -> impl IntoResponse {
    let total_amount = match parse_amount(&payload.total_amount) {
        Ok(amount) => amount,
        Err(e) => return error_response(&AppError::Validation(e.to_string())),
    };

    let repo = PurchaseRepository::new((*state.db).clone());
    let input = CreatePurchaseInput {
        credit_card_id: payload.credit_card_id,
        tenant_id: payload.tenant_id,
        description: payload.description,
        purchase_date: payload.purchase_date,
        total_amount,
        is_installment: payload.is_installment,
        installments_total: payload.installments_total,
        installments_paid: payload.installments_paid,
    };
    match repo.create(auth.user_id(), input).await {
        Ok(purchase) => (StatusCode::CREATED, Json(purchase_response(purchase))).into_response(),
        Err(e) => error_response(&purchase_error(e)),
    }
}

/// GET /purchases - List purchases with optional filters.
async fn list_purchases(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListPurchasesQuery>,
) -> impl IntoResponse {
    let repo = PurchaseRepository::new((*state.db).clone());
    let filter = PurchaseFilter {
        credit_card_id: query.credit_card_id,
        tenant_id: query.tenant_id,
        is_installment: query.is_installment,
        date_start: query.date_start,
        date_end: query.date_end,
    };
    match repo.list(auth.user_id(), filter).await {
        Ok(all) => {
            let response: Vec<PurchaseResponse> =
                all.into_iter().map(purchase_response).collect();
            Json(json!({ "purchases": response })).into_response()
        }
        Err(e) => error_response(&purchase_error(e)),
    }
}

/// PATCH /purchases/{id} - Update a purchase.
async fn update_purchase(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePurchaseRequest>,
) -> impl IntoResponse {
    let total_amount = match payload.total_amount.as_deref().map(parse_amount) {
        None => None,
        Some(Ok(amount)) => Some(amount),
        Some(Err(e)) => return error_response(&AppError::Validation(e.to_string())),
    };

    let repo = PurchaseRepository::new((*state.db).clone());
    let patch = UpdatePurchaseInput {
        description: payload.description,
        purchase_date: payload.purchase_date,
        total_amount,
        is_installment: payload.is_installment,
        installments_total: payload.installments_total,
        installments_paid: payload.installments_paid,
    };
    match repo.update(id, auth.user_id(), patch).await {
        Ok(purchase) => Json(purchase_response(purchase)).into_response(),
        Err(e) => error_response(&purchase_error(e)),
    }
}

/// PATCH /purchases/{id}/installments-paid - Set the paid counter.
async fn set_installments_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<InstallmentsPaidRequest>,
) -> impl IntoResponse {
    let repo = PurchaseRepository::new((*state.db).clone());
    match repo
        .set_installments_paid(id, auth.user_id(), payload.installments_paid)
        .await
    {
        Ok(purchase) => Json(purchase_response(purchase)).into_response(),
        Err(e) => error_response(&purchase_error(e)),
    }
}

/// DELETE /purchases/{id} - Remove a purchase.
async fn remove_purchase(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = PurchaseRepository::new((*state.db).clone());
    match repo.remove(id, auth.user_id()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&purchase_error(e)),
    }
}
