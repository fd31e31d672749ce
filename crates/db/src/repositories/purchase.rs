//! Purchase repository.
//!
//! Enforces the purchase invariant at every write: non-installment
//! purchases are normalized to `installments_total = None` and
//! `installments_paid = 0`; installment purchases keep their paid counter
//! within `0..=installments_total`.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use uuid::Uuid;

use crate::entities::{credit_cards, purchases, tenants};

/// Error types for purchase operations.
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    /// Purchase not found.
    #[error("purchase not found: {0}")]
    NotFound(Uuid),

    /// Purchase exists but belongs to another user.
    #[error("purchase is not owned by the caller")]
    NotOwned,

    /// Credit card absent or owned by another user.
    #[error("credit card not found or not owned by user")]
    CardNotOwned,

    /// Tenant absent or owned by another user.
    #[error("tenant not found or not owned by user")]
    TenantNotOwned,

    /// total_amount must be greater than zero.
    #[error("total_amount must be greater than zero")]
    NonPositiveAmount,

    /// installments_total must be at least 1 for installment purchases.
    #[error("installments_total must be at least 1")]
    InvalidInstallmentsTotal,

    /// installments_paid must stay within 0..=installments_total.
    #[error("installments_paid must be between 0 and installments_total")]
    InstallmentsPaidOutOfBounds,

    /// Operation requires an installment purchase.
    #[error("purchase is not an installment purchase")]
    NotInstallment,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a purchase.
#[derive(Debug, Clone)]
pub struct CreatePurchaseInput {
    /// Card the purchase was made on.
    pub credit_card_id: Uuid,
    /// Tenant the purchase belongs to.
    pub tenant_id: Uuid,
    /// Free-form description.
    pub description: String,
    /// Calendar date of the purchase.
    pub purchase_date: NaiveDate,
    /// Full purchase amount (> 0).
    pub total_amount: Decimal,
    /// Whether the purchase is paid in installments.
    pub is_installment: bool,
    /// Number of installments (installment purchases only).
    pub installments_total: Option<i32>,
    /// Installments already settled.
    pub installments_paid: i32,
}

/// Partial update for a purchase; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdatePurchaseInput {
    /// New description.
    pub description: Option<String>,
    /// New purchase date.
    pub purchase_date: Option<NaiveDate>,
    /// New total amount.
    pub total_amount: Option<Decimal>,
    /// New installment flag.
    pub is_installment: Option<bool>,
    /// New installment count.
    pub installments_total: Option<i32>,
    /// New paid counter.
    pub installments_paid: Option<i32>,
}

/// Filter options for listing purchases.
#[derive(Debug, Clone, Default)]
pub struct PurchaseFilter {
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

/// Validates the installment fields, returning the normalized
/// (installments_total, installments_paid) pair.
fn validate_installments(
    is_installment: bool,
    installments_total: Option<i32>,
    installments_paid: i32,
) -> Result<(Option<i32>, i32), PurchaseError> {
    if !is_installment {
        return Ok((None, 0));
    }

    let total = installments_total.ok_or(PurchaseError::InvalidInstallmentsTotal)?;
    if total < 1 {
        return Err(PurchaseError::InvalidInstallmentsTotal);
    }
    if installments_paid < 0 || installments_paid > total {
        return Err(PurchaseError::InstallmentsPaidOutOfBounds);
    }

    Ok((Some(total), installments_paid))
}

/// Purchase repository.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    db: DatabaseConnection,
}

impl PurchaseRepository {
    /// Creates a new purchase repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a purchase after validating amounts, installment bounds,
    /// and card/tenant ownership.
    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreatePurchaseInput,
    ) -> Result<purchases::Model, PurchaseError> {
        if input.total_amount <= Decimal::ZERO {
            return Err(PurchaseError::NonPositiveAmount);
        }
        let (installments_total, installments_paid) = validate_installments(
            input.is_installment,
            input.installments_total,
            input.installments_paid,
        )?;

        self.check_card_owned(input.credit_card_id, user_id).await?;
        self.check_tenant_owned(input.tenant_id, user_id).await?;

        let now = Utc::now().into();
        let purchase = purchases::ActiveModel {
            id: Set(Uuid::new_v4()),
            credit_card_id: Set(input.credit_card_id),
            tenant_id: Set(input.tenant_id),
            created_by_user_id: Set(user_id),
            description: Set(input.description),
            purchase_date: Set(input.purchase_date),
            total_amount: Set(input.total_amount),
            is_installment: Set(input.is_installment),
            installments_total: Set(installments_total),
            installments_paid: Set(installments_paid),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(purchase.insert(&self.db).await?)
    }

    /// Lists the owner's purchases, newest first (stable tie-break on
    /// creation time).
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: PurchaseFilter,
    ) -> Result<Vec<purchases::Model>, PurchaseError> {
        let mut query = purchases::Entity::find()
            .filter(purchases::Column::CreatedByUserId.eq(user_id))
            .order_by_desc(purchases::Column::PurchaseDate)
            .order_by_desc(purchases::Column::CreatedAt);

        if let Some(card_id) = filter.credit_card_id {
            query = query.filter(purchases::Column::CreditCardId.eq(card_id));
        }
        if let Some(tenant_id) = filter.tenant_id {
            query = query.filter(purchases::Column::TenantId.eq(tenant_id));
        }
        if let Some(is_installment) = filter.is_installment {
            query = query.filter(purchases::Column::IsInstallment.eq(is_installment));
        }
        if let (Some(start), Some(end)) = (filter.date_start, filter.date_end) {
            query = query.filter(purchases::Column::PurchaseDate.between(start, end));
        }

        Ok(query.all(&self.db).await?)
    }

    /// Loads a purchase and verifies ownership.
    pub async fn find_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<purchases::Model, PurchaseError> {
        let purchase = purchases::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(PurchaseError::NotFound(id))?;

        if purchase.created_by_user_id != user_id {
            return Err(PurchaseError::NotOwned);
        }

        Ok(purchase)
    }

    /// Applies a partial update, re-validating the merged purchase.
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: UpdatePurchaseInput,
    ) -> Result<purchases::Model, PurchaseError> {
        let purchase = self.find_owned(id, user_id).await?;

        let total_amount = patch.total_amount.unwrap_or(purchase.total_amount);
        if total_amount <= Decimal::ZERO {
            return Err(PurchaseError::NonPositiveAmount);
        }

        let is_installment = patch.is_installment.unwrap_or(purchase.is_installment);
        let merged_total = patch.installments_total.or(purchase.installments_total);
        let merged_paid = patch.installments_paid.unwrap_or(purchase.installments_paid);
        let (installments_total, installments_paid) =
            validate_installments(is_installment, merged_total, merged_paid)?;

        let mut active: purchases::ActiveModel = purchase.into();
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(purchase_date) = patch.purchase_date {
            active.purchase_date = Set(purchase_date);
        }
        active.total_amount = Set(total_amount);
        active.is_installment = Set(is_installment);
        active.installments_total = Set(installments_total);
        active.installments_paid = Set(installments_paid);
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Sets the paid-installments counter of an installment purchase.
    pub async fn set_installments_paid(
        &self,
        id: Uuid,
        user_id: Uuid,
        installments_paid: i32,
    ) -> Result<purchases::Model, PurchaseError> {
        let purchase = self.find_owned(id, user_id).await?;

        let Some(total) = purchase.installments_total else {
            return Err(PurchaseError::NotInstallment);
        };
        if !purchase.is_installment {
            return Err(PurchaseError::NotInstallment);
        }
        if installments_paid < 0 || installments_paid > total {
            return Err(PurchaseError::InstallmentsPaidOutOfBounds);
        }

        let mut active: purchases::ActiveModel = purchase.into();
        active.installments_paid = Set(installments_paid);
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Deletes a purchase.
    pub async fn remove(&self, id: Uuid, user_id: Uuid) -> Result<(), PurchaseError> {
        self.find_owned(id, user_id).await?;
        purchases::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    async fn check_card_owned(&self, card_id: Uuid, user_id: Uuid) -> Result<(), PurchaseError> {
        credit_cards::Entity::find_by_id(card_id)
            .filter(credit_cards::Column::CreatedByUserId.eq(user_id))
            .one(&self.db)
            .await?
            .map(|_| ())
            .ok_or(PurchaseError::CardNotOwned)
    }

    async fn check_tenant_owned(&self, tenant_id: Uuid, user_id: Uuid) -> Result<(), PurchaseError> {
        tenants::Entity::find_by_id(tenant_id)
            .filter(tenants::Column::CreatedByUserId.eq(user_id))
            .one(&self.db)
            .await?
            .map(|_| ())
            .ok_or(PurchaseError::TenantNotOwned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_installments_normalizes_cash() {
        let (total, paid) = validate_installments(false, Some(6), 3).unwrap();
        assert_eq!(total, None);
        assert_eq!(paid, 0);
    }

    #[test]
    fn test_validate_installments_bounds() {
        assert!(validate_installments(true, Some(6), 0).is_ok());
        assert!(validate_installments(true, Some(6), 6).is_ok());
        assert!(matches!(
            validate_installments(true, Some(6), 7),
            Err(PurchaseError::InstallmentsPaidOutOfBounds)
        ));
        assert!(matches!(
            validate_installments(true, Some(6), -1),
            Err(PurchaseError::InstallmentsPaidOutOfBounds)
        ));
    }

    #[test]
    fn test_validate_installments_requires_total() {
        assert!(matches!(
            validate_installments(true, None, 0),
            Err(PurchaseError::InvalidInstallmentsTotal)
        ));
        assert!(matches!(
            validate_installments(true, Some(0), 0),
            Err(PurchaseError::InvalidInstallmentsTotal)
        ));
    }
}
