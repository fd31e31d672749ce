//! Tenant management routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser, routes::error_response};
use fatura_db::TenantRepository;
use fatura_db::entities::tenants;
use fatura_db::repositories::TenantError;
use fatura_shared::AppError;

/// Creates the tenant routes (requires auth middleware).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants", post(create_tenant))
        .route("/tenants", get(list_tenants))
        .route("/tenants/{id}", patch(update_tenant))
        .route("/tenants/{id}", delete(remove_tenant))
}

/// Request body for creating or renaming a tenant.
#[derive(Debug, Deserialize)]
pub struct TenantRequest {
    /// Tenant name (unique per owner).
    pub name: String,
}

/// Query parameters for listing tenants.
#[derive(Debug, Deserialize)]
pub struct ListTenantsQuery {
    /// Case-insensitive name search.
    pub search: Option<String>,
}

/// Response for a tenant.
#[derive(Debug, Serialize)]
pub struct TenantResponse {
    /// Tenant ID.
    pub id: Uuid,
    /// Tenant name.
    pub name: String,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

fn tenant_response(model: tenants::Model) -> TenantResponse {
    TenantResponse {
        id: model.id,
        name: model.name,
        created_at: model.created_at.to_rfc3339(),
        updated_at: model.updated_at.to_rfc3339(),
    }
}

fn tenant_error(e: TenantError) -> AppError {
    match e {
        TenantError::NotFound(_) => AppError::NotFound(e.to_string()),
        TenantError::NotOwned | TenantError::HasPurchases => AppError::Forbidden(e.to_string()),
        TenantError::NameTaken(_) => AppError::Conflict(e.to_string()),
        TenantError::Database(err) => {
            error!(error = %err, "Database error in tenants");
            AppError::Database("An error occurred".to_string())
        }
    }
}

/// POST /tenants - Create a tenant.
async fn create_tenant(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<TenantRequest>,
) -> impl IntoResponse {
    let repo = TenantRepository::new((*state.db).clone());
    match repo.create(auth.user_id(), &payload.name).await {
        Ok(tenant) => (StatusCode::CREATED, Json(tenant_response(tenant))).into_response(),
        Err(e) => error_response(&tenant_error(e)),
    }
}

/// GET /tenants - List tenants, optionally filtered by name.
async fn list_tenants(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListTenantsQuery>,
) -> impl IntoResponse {
    let repo = TenantRepository::new((*state.db).clone());
    match repo.list(auth.user_id(), query.search.as_deref()).await {
        Ok(all) => {
            let response: Vec<TenantResponse> = all.into_iter().map(tenant_response).collect();
            Json(json!({ "tenants": response })).into_response()
        }
        Err(e) => error_response(&tenant_error(e)),
    }
}

/// PATCH /tenants/{id} - Rename a tenant.
async fn update_tenant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TenantRequest>,
) -> impl IntoResponse {
    let repo = TenantRepository::new((*state.db).clone());
    match repo.update(id, auth.user_id(), &payload.name).await {
        Ok(tenant) => Json(tenant_response(tenant)).into_response(),
        Err(e) => error_response(&tenant_error(e)),
    }
}

/// DELETE /tenants/{id} - Remove a tenant without purchases.
async fn remove_tenant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = TenantRepository::new((*state.db).clone());
    match repo.remove(id, auth.user_id()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&tenant_error(e)),
    }
}
