//! `SeaORM` entity definitions.

pub mod credit_cards;
pub mod purchases;
pub mod statement_items;
pub mod statements;
pub mod subscriptions;
pub mod tenants;
pub mod users;
