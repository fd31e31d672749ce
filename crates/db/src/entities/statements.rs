//! `SeaORM` Entity for statements table.
//!
//! One statement per (credit card, year, month), enforced by
//! `statements_card_month_uq`. `total_amount` is derived:
//! sum of items + active subscriptions + `adjustment_amount`.

#![allow(missing_docs)]

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "statements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub credit_card_id: Uuid,
    pub year: i32,
    pub month: i32,
    pub closing_date: Option<Date>,
    pub due_date: Option<Date>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub adjustment_amount: Decimal,
    pub locked: bool,
    pub paid_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub paid_amount: Option<Decimal>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::credit_cards::Entity",
        from = "Column::CreditCardId",
        to = "super::credit_cards::Column::Id"
    )]
    CreditCards,
    #[sea_orm(has_many = "super::statement_items::Entity")]
    StatementItems,
}

impl Related<super::credit_cards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditCards.def()
    }
}

impl Related<super::statement_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatementItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
