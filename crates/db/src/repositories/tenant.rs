//! Tenant repository.
//!
//! Tenants group purchases by person under one owning user; names are
//! unique per owner.

use chrono::Utc;
use sea_orm::sea_query::{Expr, extension::postgres::PgExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use uuid::Uuid;

use crate::entities::{purchases, tenants};

/// Error types for tenant operations.
#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    /// Tenant not found.
    #[error("tenant not found: {0}")]
    NotFound(Uuid),

    /// Tenant exists but belongs to another user.
    #[error("tenant is not owned by the caller")]
    NotOwned,

    /// The owner already has a tenant with this name.
    #[error("tenant name already in use: {0}")]
    NameTaken(String),

    /// The tenant still has purchases and cannot be removed.
    #[error("tenant has purchases")]
    HasPurchases,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Tenant repository.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    db: DatabaseConnection,
}

impl TenantRepository {
    /// Creates a new tenant repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a tenant for the given owner.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NameTaken` when the owner already has a tenant
    /// with this name (unique constraint is the final arbiter).
    pub async fn create(&self, user_id: Uuid, name: &str) -> Result<tenants::Model, TenantError> {
        let now = Utc::now().into();
        let tenant = tenants::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_by_user_id: Set(user_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match tenant.insert(&self.db).await {
            Ok(model) => Ok(model),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(TenantError::NameTaken(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lists the owner's tenants ordered by name, optionally filtered by a
    /// case-insensitive name search.
    pub async fn list(
        &self,
        user_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<tenants::Model>, TenantError> {
        let mut query = tenants::Entity::find()
            .filter(tenants::Column::CreatedByUserId.eq(user_id))
            .order_by_asc(tenants::Column::Name);

        if let Some(search) = search {
            query = query.filter(Expr::col(tenants::Column::Name).ilike(format!("%{search}%")));
        }

        Ok(query.all(&self.db).await?)
    }

    /// Loads a tenant and verifies ownership.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NotFound` if absent, `TenantError::NotOwned`
    /// if it belongs to another user.
    pub async fn find_owned(&self, id: Uuid, user_id: Uuid) -> Result<tenants::Model, TenantError> {
        let tenant = tenants::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(TenantError::NotFound(id))?;

        if tenant.created_by_user_id != user_id {
            return Err(TenantError::NotOwned);
        }

        Ok(tenant)
    }

    /// Renames a tenant.
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        name: &str,
    ) -> Result<tenants::Model, TenantError> {
        let tenant = self.find_owned(id, user_id).await?;

        let mut active: tenants::ActiveModel = tenant.into();
        active.name = Set(name.to_string());
        active.updated_at = Set(Utc::now().into());

        match active.update(&self.db).await {
            Ok(model) => Ok(model),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(TenantError::NameTaken(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a tenant. Rejected while the tenant still has purchases.
    pub async fn remove(&self, id: Uuid, user_id: Uuid) -> Result<(), TenantError> {
        self.find_owned(id, user_id).await?;

        let purchase_count = purchases::Entity::find()
            .filter(purchases::Column::TenantId.eq(id))
            .count(&self.db)
            .await?;
        if purchase_count > 0 {
            return Err(TenantError::HasPurchases);
        }

        tenants::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}
