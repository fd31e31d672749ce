//! Subscription repository.
//!
//! Subscriptions are flat monthly charges tied to a credit card; while
//! active they contribute to every statement of that card.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::{credit_cards, subscriptions, tenants};

/// Error types for subscription operations.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// Subscription not found.
    #[error("subscription not found: {0}")]
    NotFound(Uuid),

    /// Subscription exists but belongs to another user.
    #[error("subscription is not owned by the caller")]
    NotOwned,

    /// Credit card absent or owned by another user.
    #[error("credit card not found or not owned by user")]
    CardNotOwned,

    /// Tenant absent or owned by another user.
    #[error("tenant not found or not owned by user")]
    TenantNotOwned,

    /// amount must be greater than zero.
    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a subscription.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionInput {
    /// Card charged every month.
    pub credit_card_id: Uuid,
    /// Optional tenant the charge belongs to.
    pub tenant_id: Option<Uuid>,
    /// Free-form description.
    pub description: String,
    /// Flat monthly amount (> 0).
    pub amount: Decimal,
    /// Whether the subscription is currently active.
    pub active: bool,
}

/// Partial update for a subscription; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateSubscriptionInput {
    /// Move the subscription to another card.
    pub credit_card_id: Option<Uuid>,
    /// Reassign the tenant.
    pub tenant_id: Option<Uuid>,
    /// New description.
    pub description: Option<String>,
    /// New monthly amount.
    pub amount: Option<Decimal>,
    /// Activate / deactivate.
    pub active: Option<bool>,
}

/// Subscription repository.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    db: DatabaseConnection,
}

impl SubscriptionRepository {
    /// Creates a new subscription repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a subscription after verifying card (and tenant) ownership.
    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateSubscriptionInput,
    ) -> Result<subscriptions::Model, SubscriptionError> {
        if input.amount <= Decimal::ZERO {
            return Err(SubscriptionError::NonPositiveAmount);
        }

        self.check_card_owned(input.credit_card_id, user_id).await?;
        if let Some(tenant_id) = input.tenant_id {
            self.check_tenant_owned(tenant_id, user_id).await?;
        }

        let now = Utc::now().into();
        let subscription = subscriptions::ActiveModel {
            id: Set(Uuid::new_v4()),
            credit_card_id: Set(input.credit_card_id),
            tenant_id: Set(input.tenant_id),
            created_by_user_id: Set(user_id),
            description: Set(input.description),
            amount: Set(input.amount),
            active: Set(input.active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(subscription.insert(&self.db).await?)
    }

    /// Lists the owner's subscriptions, newest first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<subscriptions::Model>, SubscriptionError> {
        Ok(subscriptions::Entity::find()
            .filter(subscriptions::Column::CreatedByUserId.eq(user_id))
            .order_by_desc(subscriptions::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Loads a subscription and verifies ownership.
    pub async fn find_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<subscriptions::Model, SubscriptionError> {
        let subscription = subscriptions::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(SubscriptionError::NotFound(id))?;

        if subscription.created_by_user_id != user_id {
            return Err(SubscriptionError::NotOwned);
        }

        Ok(subscription)
    }

    /// Applies a partial update, re-verifying ownership of any newly
    /// referenced card or tenant.
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: UpdateSubscriptionInput,
    ) -> Result<subscriptions::Model, SubscriptionError> {
        let subscription = self.find_owned(id, user_id).await?;

        if let Some(card_id) = patch.credit_card_id {
            self.check_card_owned(card_id, user_id).await?;
        }
        if let Some(tenant_id) = patch.tenant_id {
            self.check_tenant_owned(tenant_id, user_id).await?;
        }
        if let Some(amount) = patch.amount {
            if amount <= Decimal::ZERO {
                return Err(SubscriptionError::NonPositiveAmount);
            }
        }

        let mut active: subscriptions::ActiveModel = subscription.into();
        if let Some(card_id) = patch.credit_card_id {
            active.credit_card_id = Set(card_id);
        }
        if let Some(tenant_id) = patch.tenant_id {
            active.tenant_id = Set(Some(tenant_id));
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(amount) = patch.amount {
            active.amount = Set(amount);
        }
        if let Some(is_active) = patch.active {
            active.active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Deletes a subscription.
    pub async fn remove(&self, id: Uuid, user_id: Uuid) -> Result<(), SubscriptionError> {
        self.find_owned(id, user_id).await?;
        subscriptions::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Sums the active subscription amounts for a card owned by the user,
    /// optionally scoped to one tenant. Returns zero when there are none.
    pub async fn sum_active_by_card(
        &self,
        credit_card_id: Uuid,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> Result<Decimal, SubscriptionError> {
        let mut query = subscriptions::Entity::find()
            .select_only()
            .column_as(subscriptions::Column::Amount.sum(), "total")
            .filter(subscriptions::Column::CreditCardId.eq(credit_card_id))
            .filter(subscriptions::Column::CreatedByUserId.eq(user_id))
            .filter(subscriptions::Column::Active.eq(true));

        if let Some(tenant_id) = tenant_id {
            query = query.filter(subscriptions::Column::TenantId.eq(tenant_id));
        }

        let total: Option<Option<Decimal>> = query.into_tuple().one(&self.db).await?;
        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }

    async fn check_card_owned(
        &self,
        card_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), SubscriptionError> {
        credit_cards::Entity::find_by_id(card_id)
            .filter(credit_cards::Column::CreatedByUserId.eq(user_id))
            .one(&self.db)
            .await?
            .map(|_| ())
            .ok_or(SubscriptionError::CardNotOwned)
    }

    async fn check_tenant_owned(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), SubscriptionError> {
        tenants::Entity::find_by_id(tenant_id)
            .filter(tenants::Column::CreatedByUserId.eq(user_id))
            .one(&self.db)
            .await?
            .map(|_| ())
            .ok_or(SubscriptionError::TenantNotOwned)
    }
}
