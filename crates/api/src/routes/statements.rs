//! Statement routes: generation, reads, adjustment, and payment.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser, routes::error_response};
use fatura_db::StatementRepository;
use fatura_db::entities::{statement_items, statements};
use fatura_db::repositories::{
    GenerateStatementInput, StatementError, StatementWithItems, UpdateStatementInput,
};
use fatura_shared::AppError;
use fatura_shared::types::{format_amount, parse_amount};

/// Creates the statement routes (requires auth middleware).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/statements", post(generate_statement))
        .route("/statements", get(list_statements))
        .route("/statements/{id}", get(get_statement))
        .route("/statements/{id}", patch(update_statement))
        .route("/statements/{id}/pay", post(pay_statement))
}

/// Request body for generating a statement.
#[derive(Debug, Deserialize)]
pub struct GenerateStatementRequest {
    /// Card the statement belongs to.
    pub credit_card_id: Uuid,
    /// Statement year (2000+).
    pub year: i32,
    /// Statement month (1-12).
    pub month: u32,
    /// Optional closing date.
    pub closing_date: Option<NaiveDate>,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Whether the statement starts out locked (default false).
    pub locked: Option<bool>,
}

/// Request body for updating a statement.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateStatementRequest {
    /// New closing date.
    pub closing_date: Option<NaiveDate>,
    /// New due date.
    pub due_date: Option<NaiveDate>,
    /// New manual adjustment as a 2-decimal string.
    pub adjustment_amount: Option<String>,
    /// Lock the statement (one-way).
    pub locked: Option<bool>,
}

/// Request body for paying a statement.
#[derive(Debug, Deserialize)]
pub struct PayStatementRequest {
    /// Paid amount as a 2-decimal string.
    pub amount: String,
    /// Optional payment date (interpreted as UTC midnight).
    pub paid_at: Option<NaiveDate>,
}

/// Query parameters for listing statements.
#[derive(Debug, Deserialize)]
pub struct ListStatementsQuery {
    /// Card whose statements are listed.
    pub credit_card_id: Uuid,
    /// Single-statement lookup year.
    pub year: Option<i32>,
    /// Single-statement lookup month.
    pub month: Option<u32>,
}

/// Response for a statement line item.
#[derive(Debug, Serialize)]
pub struct StatementItemResponse {
    /// Item ID.
    pub id: Uuid,
    /// Purchase the fragment belongs to.
    pub purchase_id: Uuid,
    /// Item label, e.g. "Installment 3/6".
    pub label: String,
    /// Item amount, 2-decimal string.
    pub amount: String,
}

/// Response for a statement.
#[derive(Debug, Serialize)]
pub struct StatementResponse {
    /// Statement ID.
    pub id: Uuid,
    /// Card the statement belongs to.
    pub credit_card_id: Uuid,
    /// Statement year.
    pub year: i32,
    /// Statement month (1-12).
    pub month: i32,
    /// Closing date (YYYY-MM-DD).
    pub closing_date: Option<String>,
    /// Due date (YYYY-MM-DD).
    pub due_date: Option<String>,
    /// Derived total, 2-decimal string.
    pub total_amount: String,
    /// Manual adjustment, 2-decimal string.
    pub adjustment_amount: String,
    /// Whether the statement is locked.
    pub locked: bool,
    /// Payment timestamp, RFC 3339.
    pub paid_at: Option<String>,
    /// Paid amount, 2-decimal string.
    pub paid_amount: Option<String>,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
    /// Line items (present on single-statement reads).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<StatementItemResponse>>,
}

fn item_response(model: statement_items::Model) -> StatementItemResponse {
    StatementItemResponse {
        id: model.id,
        purchase_id: model.purchase_id,
        label: model.label,
        amount: format_amount(model.amount),
    }
}

fn statement_response(
    model: statements::Model,
    items: Option<Vec<statement_items::Model>>,
) -> StatementResponse {
    StatementResponse {
        id: model.id,
        credit_card_id: model.credit_card_id,
        year: model.year,
        month: model.month,
        closing_date: model.closing_date.map(|d| d.to_string()),
        due_date: model.due_date.map(|d| d.to_string()),
        total_amount: format_amount(model.total_amount),
        adjustment_amount: format_amount(model.adjustment_amount),
        locked: model.locked,
        paid_at: model.paid_at.map(|t| t.to_rfc3339()),
        paid_amount: model.paid_amount.map(format_amount),
        created_at: model.created_at.to_rfc3339(),
        updated_at: model.updated_at.to_rfc3339(),
        items: items.map(|items| items.into_iter().map(item_response).collect()),
    }
}

fn with_items_response(result: StatementWithItems) -> StatementResponse {
    statement_response(result.statement, Some(result.items))
}

fn statement_error(e: StatementError) -> AppError {
    match e {
        StatementError::NotFound(_) | StatementError::PeriodNotFound { .. } => {
            AppError::NotFound(e.to_string())
        }
        StatementError::NotOwned | StatementError::CardNotOwned => {
            AppError::Forbidden(e.to_string())
        }
        StatementError::AlreadyExists { .. } => AppError::Conflict(e.to_string()),
        StatementError::InvalidPeriod(_)
        | StatementError::LockedImmutable
        | StatementError::UnlockNotAllowed
        | StatementError::NotLocked
        | StatementError::NonPositiveAmount => AppError::Validation(e.to_string()),
        StatementError::Database(err) => {
            error!(error = %err, "Database error in statements");
            AppError::Database("An error occurred".to_string())
        }
    }
}

/// POST /statements - Generate the monthly statement for a card.
async fn generate_statement(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<GenerateStatementRequest>,
) -> impl IntoResponse {
    let repo = StatementRepository::new((*state.db).clone());
    let input = GenerateStatementInput {
        credit_card_id: payload.credit_card_id,
        year: payload.year,
        month: payload.month,
        closing_date: payload.closing_date,
        due_date: payload.due_date,
        locked: payload.locked.unwrap_or(false),
    };
    match repo.generate(auth.user_id(), input).await {
        Ok(result) => (StatusCode::CREATED, Json(with_items_response(result))).into_response(),
        Err(e) => error_response(&statement_error(e)),
    }
}

/// GET /statements - List a card's statements. With year & month returns
/// the single statement for that period, or 404.
async fn list_statements(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListStatementsQuery>,
) -> impl IntoResponse {
    let repo = StatementRepository::new((*state.db).clone());

    if let (Some(year), Some(month)) = (query.year, query.month) {
        return match repo
            .find_by_period(auth.user_id(), query.credit_card_id, year, month)
            .await
        {
            Ok(statement) => Json(statement_response(statement, None)).into_response(),
            Err(e) => error_response(&statement_error(e)),
        };
    }

    match repo.list_by_card(auth.user_id(), query.credit_card_id).await {
        Ok(all) => {
            let response: Vec<StatementResponse> = all
                .into_iter()
                .map(|statement| statement_response(statement, None))
                .collect();
            Json(json!({ "statements": response })).into_response()
        }
        Err(e) => error_response(&statement_error(e)),
    }
}

/// GET /statements/{id} - Fetch a statement with its items.
async fn get_statement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = StatementRepository::new((*state.db).clone());
    match repo.find_by_id(id, auth.user_id()).await {
        Ok(result) => Json(with_items_response(result)).into_response(),
        Err(e) => error_response(&statement_error(e)),
    }
}

/// PATCH /statements/{id} - Update statement metadata/adjustment.
async fn update_statement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatementRequest>,
) -> impl IntoResponse {
    let adjustment_amount = match payload.adjustment_amount.as_deref().map(parse_amount) {
        None => None,
        Some(Ok(amount)) => Some(amount),
        Some(Err(e)) => return error_response(&AppError::Validation(e.to_string())),
    };

    let repo = StatementRepository::new((*state.db).clone());
    let patch = UpdateStatementInput {
        closing_date: payload.closing_date,
        due_date: payload.due_date,
        adjustment_amount,
        locked: payload.locked,
    };
    match repo.update(id, auth.user_id(), patch).await {
        Ok(statement) => Json(statement_response(statement, None)).into_response(),
        Err(e) => error_response(&statement_error(e)),
    }
}

/// POST /statements/{id}/pay - Mark a locked statement as paid.
async fn pay_statement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PayStatementRequest>,
) -> impl IntoResponse {
    let amount = match parse_amount(&payload.amount) {
        Ok(amount) => amount,
        Err(e) => return error_response(&AppError::Validation(e.to_string())),
    };

    let repo = StatementRepository::new((*state.db).clone());
    match repo
        .pay(id, auth.user_id(), amount, payload.paid_at)
        .await
    {
        Ok(result) => Json(with_items_response(result)).into_response(),
        Err(e) => error_response(&statement_error(e)),
    }
}
