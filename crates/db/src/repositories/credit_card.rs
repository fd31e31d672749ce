//! Credit card repository.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use uuid::Uuid;

use crate::entities::credit_cards;

/// Error types for credit card operations.
#[derive(Debug, thiserror::Error)]
pub enum CreditCardError {
    /// Credit card not found.
    #[error("credit card not found: {0}")]
    NotFound(Uuid),

    /// Credit card exists but belongs to another user.
    #[error("credit card is not owned by the caller")]
    NotOwned,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a credit card.
#[derive(Debug, Clone)]
pub struct CreateCreditCardInput {
    /// Card nickname.
    pub nickname: String,
    /// Card brand (e.g. "Visa").
    pub brand: String,
    /// Last four digits.
    pub last4: String,
    /// Optional credit limit.
    pub limit_amount: Option<Decimal>,
}

/// Partial update for a credit card; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateCreditCardInput {
    /// New nickname.
    pub nickname: Option<String>,
    /// New brand.
    pub brand: Option<String>,
    /// New last four digits.
    pub last4: Option<String>,
    /// New credit limit (outer `None` = unchanged, inner = new value).
    pub limit_amount: Option<Option<Decimal>>,
}

/// Credit card repository.
#[derive(Debug, Clone)]
pub struct CreditCardRepository {
    db: DatabaseConnection,
}

impl CreditCardRepository {
    /// Creates a new credit card repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a credit card for the given owner.
    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateCreditCardInput,
    ) -> Result<credit_cards::Model, CreditCardError> {
        let now = Utc::now().into();
        let card = credit_cards::ActiveModel {
            id: Set(Uuid::new_v4()),
            nickname: Set(input.nickname),
            brand: Set(input.brand),
            last4: Set(input.last4),
            limit_amount: Set(input.limit_amount),
            created_by_user_id: Set(user_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(card.insert(&self.db).await?)
    }

    /// Lists the owner's cards ordered by nickname.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<credit_cards::Model>, CreditCardError> {
        Ok(credit_cards::Entity::find()
            .filter(credit_cards::Column::CreatedByUserId.eq(user_id))
            .order_by_asc(credit_cards::Column::Nickname)
            .all(&self.db)
            .await?)
    }

    /// Loads a card and verifies ownership.
    ///
    /// # Errors
    ///
    /// Returns `CreditCardError::NotFound` if absent,
    /// `CreditCardError::NotOwned` if it belongs to another user.
    pub async fn find_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<credit_cards::Model, CreditCardError> {
        let card = credit_cards::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(CreditCardError::NotFound(id))?;

        if card.created_by_user_id != user_id {
            return Err(CreditCardError::NotOwned);
        }

        Ok(card)
    }

    /// Applies a partial update to a card.
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: UpdateCreditCardInput,
    ) -> Result<credit_cards::Model, CreditCardError> {
        let card = self.find_owned(id, user_id).await?;

        let mut active: credit_cards::ActiveModel = card.into();
        if let Some(nickname) = patch.nickname {
            active.nickname = Set(nickname);
        }
        if let Some(brand) = patch.brand {
            active.brand = Set(brand);
        }
        if let Some(last4) = patch.last4 {
            active.last4 = Set(last4);
        }
        if let Some(limit_amount) = patch.limit_amount {
            active.limit_amount = Set(limit_amount);
        }
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Deletes a card.
    pub async fn remove(&self, id: Uuid, user_id: Uuid) -> Result<(), CreditCardError> {
        self.find_owned(id, user_id).await?;
        credit_cards::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
