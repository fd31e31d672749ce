//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the
//! application. Each repository owns its error type; ownership checks
//! happen here (load-owned-or-fail), not in the HTTP layer.

pub mod credit_card;
pub mod purchase;
pub mod statement;
pub mod subscription;
pub mod tenant;
pub mod user;

pub use credit_card::{
    CreateCreditCardInput, CreditCardError, CreditCardRepository, UpdateCreditCardInput,
};
pub use purchase::{
    CreatePurchaseInput, PurchaseError, PurchaseFilter, PurchaseRepository, UpdatePurchaseInput,
};
pub use statement::{
    GenerateStatementInput, StatementError, StatementRepository, StatementWithItems,
    UpdateStatementInput,
};
pub use subscription::{
    CreateSubscriptionInput, SubscriptionError, SubscriptionRepository, UpdateSubscriptionInput,
};
pub use tenant::{TenantError, TenantRepository};
pub use user::{UserError, UserRepository};
