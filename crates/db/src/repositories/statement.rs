//! Statement repository: generation, adjustment, and settlement.
//!
//! A statement is the monthly billing aggregate for one credit card and
//! one (year, month). Generation assembles purchase fragments through the
//! amortizer plus the card's active subscriptions; settlement marks the
//! statement paid and advances each linked installment purchase exactly
//! once. The unique constraint on (credit_card_id, year, month) is the
//! final arbiter for concurrent generation.

use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use fatura_core::billing::{BillingError, BillingMonth, PurchaseTerms, fragment_for};
use fatura_shared::types::round2;

use crate::entities::{credit_cards, purchases, statement_items, statements};
use crate::repositories::SubscriptionRepository;

/// Error types for statement operations.
#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    /// Statement not found.
    #[error("statement not found: {0}")]
    NotFound(Uuid),

    /// Statement exists but belongs to another user's card.
    #[error("statement is not owned by the caller")]
    NotOwned,

    /// Credit card absent or owned by another user.
    #[error("credit card not found or not owned by user")]
    CardNotOwned,

    /// A statement already exists for this card and period.
    #[error("statement already exists for {year}-{month:02}")]
    AlreadyExists {
        /// Statement year.
        year: i32,
        /// Statement month (1-12).
        month: u32,
    },

    /// No statement exists for the requested period.
    #[error("no statement for {year}-{month:02}")]
    PeriodNotFound {
        /// Statement year.
        year: i32,
        /// Statement month (1-12).
        month: u32,
    },

    /// Invalid (year, month) input.
    #[error(transparent)]
    InvalidPeriod(#[from] BillingError),

    /// Locked statements keep their period data frozen.
    #[error("statement is locked; closing_date, due_date and adjustment_amount cannot change")]
    LockedImmutable,

    /// The lock is one-way.
    #[error("statement lock cannot be cleared")]
    UnlockNotAllowed,

    /// Payment requires a locked statement.
    #[error("statement must be locked before payment")]
    NotLocked,

    /// Payment amount must be greater than zero.
    #[error("paid_amount must be greater than zero")]
    NonPositiveAmount,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for generating a statement.
#[derive(Debug, Clone)]
pub struct GenerateStatementInput {
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
    /// Whether the statement starts out locked.
    pub locked: bool,
}

/// Partial update for a statement; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateStatementInput {
    /// New closing date.
    pub closing_date: Option<NaiveDate>,
    /// New due date.
    pub due_date: Option<NaiveDate>,
    /// New manual adjustment; shifts the total by the delta to the
    /// previous adjustment.
    pub adjustment_amount: Option<Decimal>,
    /// Lock the statement (one-way).
    pub locked: Option<bool>,
}

/// A statement together with its items.
#[derive(Debug, Clone)]
pub struct StatementWithItems {
    /// Statement header.
    pub statement: statements::Model,
    /// Generated line items.
    pub items: Vec<statement_items::Model>,
}

/// Statement repository: the generation and settlement engine.
#[derive(Debug, Clone)]
pub struct StatementRepository {
    db: DatabaseConnection,
}

impl StatementRepository {
    /// Creates a new statement repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Generates the statement for (card, year, month).
    ///
    /// Items are persisted before the total is computed, and the total is
    /// persisted before the result is assembled. A concurrent generate for
    /// the same period loses the insert race and surfaces as
    /// `AlreadyExists`.
    ///
    /// # Errors
    ///
    /// - `InvalidPeriod` for a year before 2000 or month outside 1-12
    /// - `CardNotOwned` when the card is absent or owned by someone else
    /// - `AlreadyExists` when the period already has a statement
    pub async fn generate(
        &self,
        user_id: Uuid,
        input: GenerateStatementInput,
    ) -> Result<StatementWithItems, StatementError> {
        let target = BillingMonth::statement_period(input.year, input.month)?;
        let month_column = i32::try_from(input.month)
            .map_err(|_| BillingError::MonthOutOfRange(input.month))?;

        credit_cards::Entity::find_by_id(input.credit_card_id)
            .filter(credit_cards::Column::CreatedByUserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(StatementError::CardNotOwned)?;

        let exists = statements::Entity::find()
            .filter(statements::Column::CreditCardId.eq(input.credit_card_id))
            .filter(statements::Column::Year.eq(input.year))
            .filter(statements::Column::Month.eq(month_column))
            .one(&self.db)
            .await?;
        if exists.is_some() {
            return Err(StatementError::AlreadyExists {
                year: input.year,
                month: input.month,
            });
        }

        let now = Utc::now().into();
        let statement_id = Uuid::new_v4();
        let statement = statements::ActiveModel {
            id: Set(statement_id),
            credit_card_id: Set(input.credit_card_id),
            year: Set(input.year),
            month: Set(month_column),
            closing_date: Set(input.closing_date),
            due_date: Set(input.due_date),
            total_amount: Set(Decimal::ZERO),
            adjustment_amount: Set(Decimal::ZERO),
            locked: Set(input.locked),
            paid_at: Set(None),
            paid_amount: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let statement = match statement.insert(&self.db).await {
            Ok(model) => model,
            // the existence pre-check is racy; the unique constraint decides
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(StatementError::AlreadyExists {
                    year: input.year,
                    month: input.month,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let card_purchases = purchases::Entity::find()
            .filter(purchases::Column::CreditCardId.eq(input.credit_card_id))
            .filter(purchases::Column::CreatedByUserId.eq(user_id))
            .order_by_asc(purchases::Column::PurchaseDate)
            .order_by_asc(purchases::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut items = Vec::new();
        let mut items_sum = Decimal::ZERO;
        for purchase in &card_purchases {
            let terms = PurchaseTerms {
                purchase_date: purchase.purchase_date,
                total_amount: purchase.total_amount,
                is_installment: purchase.is_installment,
                installments_total: purchase.installments_total,
            };
            if let Some(fragment) = fragment_for(&terms, target) {
                items_sum += fragment.amount;
                items.push(statement_items::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    statement_id: Set(statement_id),
                    purchase_id: Set(purchase.id),
                    label: Set(fragment.label),
                    amount: Set(fragment.amount),
                    created_at: Set(now),
                    updated_at: Set(now),
                });
            }
        }

        let item_count = items.len();
        if !items.is_empty() {
            statement_items::Entity::insert_many(items)
                .exec(&self.db)
                .await?;
        }

        let subscriptions_sum = SubscriptionRepository::new(self.db.clone())
            .sum_active_by_card(input.credit_card_id, user_id, None)
            .await
            .map_err(|e| match e {
                crate::repositories::SubscriptionError::Database(e) => StatementError::Database(e),
                // only the card filter applies here; ownership was checked above
                _ => StatementError::CardNotOwned,
            })?;

        let total = round2(items_sum + subscriptions_sum + statement.adjustment_amount);
        debug!(
            statement_id = %statement_id,
            period = %target,
            items = item_count,
            total = %total,
            "generated statement"
        );

        let mut active: statements::ActiveModel = statement.into();
        active.total_amount = Set(total);
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await?;

        self.find_by_id(statement_id, user_id).await
    }

    /// Loads a statement with its items, verifying ownership through the
    /// card's owner.
    pub async fn find_by_id(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<StatementWithItems, StatementError> {
        let statement = self.load_owned(id, user_id).await?;

        let items = statement_items::Entity::find()
            .filter(statement_items::Column::StatementId.eq(id))
            .order_by_asc(statement_items::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(StatementWithItems { statement, items })
    }

    /// Lists a card's statements, newest period first.
    pub async fn list_by_card(
        &self,
        user_id: Uuid,
        credit_card_id: Uuid,
    ) -> Result<Vec<statements::Model>, StatementError> {
        credit_cards::Entity::find_by_id(credit_card_id)
            .filter(credit_cards::Column::CreatedByUserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(StatementError::CardNotOwned)?;

        Ok(statements::Entity::find()
            .filter(statements::Column::CreditCardId.eq(credit_card_id))
            .order_by_desc(statements::Column::Year)
            .order_by_desc(statements::Column::Month)
            .all(&self.db)
            .await?)
    }

    /// Finds the single statement for (card, year, month).
    ///
    /// # Errors
    ///
    /// Returns `PeriodNotFound` when the period has no statement yet.
    pub async fn find_by_period(
        &self,
        user_id: Uuid,
        credit_card_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<statements::Model, StatementError> {
        credit_cards::Entity::find_by_id(credit_card_id)
            .filter(credit_cards::Column::CreatedByUserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(StatementError::CardNotOwned)?;

        let month_column =
            i32::try_from(month).map_err(|_| BillingError::MonthOutOfRange(month))?;

        statements::Entity::find()
            .filter(statements::Column::CreditCardId.eq(credit_card_id))
            .filter(statements::Column::Year.eq(year))
            .filter(statements::Column::Month.eq(month_column))
            .one(&self.db)
            .await?
            .ok_or(StatementError::PeriodNotFound { year, month })
    }

    /// Applies a partial update. A changed adjustment shifts the total by
    /// exactly (new - old), leaving the item sum untouched.
    ///
    /// # Errors
    ///
    /// Returns `LockedImmutable` when editing the frozen fields of a
    /// locked statement and `UnlockNotAllowed` when clearing the lock.
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: UpdateStatementInput,
    ) -> Result<statements::Model, StatementError> {
        let statement = self.load_owned(id, user_id).await?;

        if statement.locked {
            if patch.closing_date.is_some()
                || patch.due_date.is_some()
                || patch.adjustment_amount.is_some()
            {
                return Err(StatementError::LockedImmutable);
            }
            if patch.locked == Some(false) {
                return Err(StatementError::UnlockNotAllowed);
            }
        }

        let mut active: statements::ActiveModel = statement.clone().into();
        if let Some(adjustment) = patch.adjustment_amount {
            let delta = adjustment - statement.adjustment_amount;
            active.adjustment_amount = Set(adjustment);
            active.total_amount = Set(round2(statement.total_amount + delta));
        }
        if let Some(closing_date) = patch.closing_date {
            active.closing_date = Set(Some(closing_date));
        }
        if let Some(due_date) = patch.due_date {
            active.due_date = Set(Some(due_date));
        }
        if let Some(locked) = patch.locked {
            active.locked = Set(locked);
        }
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Settles a statement: marks it paid and advances the paid-installment
    /// counter of every linked installment purchase exactly once.
    ///
    /// The re-read, the installment bumps, and the paid marker run inside
    /// one transaction; the re-read takes a row lock so concurrent pays on
    /// the same statement serialize, and its `paid_at` is the
    /// already-paid guard. Repaying updates the paid fields without
    /// touching installment counters again.
    ///
    /// # Errors
    ///
    /// Returns `NotLocked` when the statement has not been locked yet.
    pub async fn pay(
        &self,
        id: Uuid,
        user_id: Uuid,
        amount: Decimal,
        paid_on: Option<NaiveDate>,
    ) -> Result<StatementWithItems, StatementError> {
        if amount <= Decimal::ZERO {
            return Err(StatementError::NonPositiveAmount);
        }

        let statement = self.load_owned(id, user_id).await?;
        if !statement.locked {
            return Err(StatementError::NotLocked);
        }

        let txn = self.db.begin().await?;

        // the row may have been deleted or paid concurrently between the
        // checks above and the transaction start
        let current = statements::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(StatementError::NotFound(id))?;
        let already_paid = current.paid_at.is_some();

        if !already_paid {
            let items = statement_items::Entity::find()
                .filter(statement_items::Column::StatementId.eq(id))
                .find_also_related(purchases::Entity)
                .all(&txn)
                .await?;

            let mut bumped = 0_usize;
            for (_item, purchase) in items {
                let Some(purchase) = purchase else { continue };
                if !purchase.is_installment {
                    continue;
                }
                let Some(installments_total) = purchase.installments_total else {
                    continue;
                };
                if purchase.installments_paid >= installments_total {
                    continue;
                }

                let installments_paid = purchase.installments_paid + 1;
                let mut active: purchases::ActiveModel = purchase.into();
                active.installments_paid = Set(installments_paid);
                active.updated_at = Set(Utc::now().into());
                active.update(&txn).await?;
                bumped += 1;
            }
            debug!(statement_id = %id, bumped, "advanced installment counters");
        }

        let paid_at = paid_on.map_or_else(
            || Utc::now().into(),
            |date| date.and_time(NaiveTime::MIN).and_utc().into(),
        );

        let mut active: statements::ActiveModel = current.into();
        active.paid_amount = Set(Some(amount));
        active.paid_at = Set(Some(paid_at));
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;

        txn.commit().await?;

        self.find_by_id(id, user_id).await
    }

    /// Loads a statement and verifies ownership via its card's owner.
    async fn load_owned(&self, id: Uuid, user_id: Uuid) -> Result<statements::Model, StatementError> {
        let statement = statements::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StatementError::NotFound(id))?;

        let owned = credit_cards::Entity::find_by_id(statement.credit_card_id)
            .filter(credit_cards::Column::CreatedByUserId.eq(user_id))
            .one(&self.db)
            .await?
            .is_some();
        if !owned {
            return Err(StatementError::NotOwned);
        }

        Ok(statement)
    }
}
