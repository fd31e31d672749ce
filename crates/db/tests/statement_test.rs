//! Integration tests for statement generation and settlement.
//!
//! Tests run against the database given by `DATABASE_URL` and are
//! skipped when the variable is unset. Each test creates its own user so
//! tests can run concurrently against one database.

#![allow(clippy::similar_names)]

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use fatura_db::entities::{credit_cards, statements, users};
use fatura_db::migration::{Migrator, MigratorTrait};
use fatura_db::repositories::{
    CreateCreditCardInput, CreatePurchaseInput, CreateSubscriptionInput, CreditCardRepository,
    GenerateStatementInput, PurchaseRepository, StatementError, StatementRepository,
    SubscriptionRepository, TenantRepository, UpdateStatementInput, UserRepository,
};

/// Connects to the test database, or returns `None` to skip the test.
async fn connect() -> Option<DatabaseConnection> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };
    let db = Database::connect(&url).await.expect("Failed to connect");
    let _ = Migrator::up(&db, None).await;
    Some(db)
}

struct Fixture {
    user_id: Uuid,
    tenant_id: Uuid,
    card_id: Uuid,
}

/// Creates a user, a tenant, and a credit card.
async fn setup(db: &DatabaseConnection) -> Fixture {
    let suffix = Uuid::new_v4();

    let user = UserRepository::new(db.clone())
        .create(
            "Test User",
            &format!("test-{suffix}@example.com"),
            "$argon2id$not-a-real-hash",
        )
        .await
        .expect("Failed to create user");

    let tenant = TenantRepository::new(db.clone())
        .create(user.id, &format!("Tenant {suffix}"))
        .await
        .expect("Failed to create tenant");

    let card = CreditCardRepository::new(db.clone())
        .create(
            user.id,
            CreateCreditCardInput {
                nickname: "Main Visa".to_string(),
                brand: "Visa".to_string(),
                last4: "1234".to_string(),
                limit_amount: Some(dec!(5000.00)),
            },
        )
        .await
        .expect("Failed to create card");

    Fixture {
        user_id: user.id,
        tenant_id: tenant.id,
        card_id: card.id,
    }
}

/// Removes everything belonging to the fixture user, children first.
async fn cleanup(db: &DatabaseConnection, fixture: &Fixture) {
    statements::Entity::delete_many()
        .filter(statements::Column::CreditCardId.eq(fixture.card_id))
        .exec(db)
        .await
        .ok();

    let purchases = PurchaseRepository::new(db.clone())
        .list(fixture.user_id, Default::default())
        .await
        .unwrap_or_default();
    for purchase in purchases {
        PurchaseRepository::new(db.clone())
            .remove(purchase.id, fixture.user_id)
            .await
            .ok();
    }

    let subscriptions = SubscriptionRepository::new(db.clone())
        .list(fixture.user_id)
        .await
        .unwrap_or_default();
    for subscription in subscriptions {
        SubscriptionRepository::new(db.clone())
            .remove(subscription.id, fixture.user_id)
            .await
            .ok();
    }

    credit_cards::Entity::delete_by_id(fixture.card_id)
        .exec(db)
        .await
        .ok();
    TenantRepository::new(db.clone())
        .remove(fixture.tenant_id, fixture.user_id)
        .await
        .ok();
    users::Entity::delete_by_id(fixture.user_id)
        .exec(db)
        .await
        .ok();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn generate_input(card_id: Uuid, year: i32, month: u32) -> GenerateStatementInput {
    GenerateStatementInput {
        credit_card_id: card_id,
        year,
        month,
        closing_date: None,
        due_date: None,
        locked: false,
    }
}

async fn create_cash_purchase(
    db: &DatabaseConnection,
    fixture: &Fixture,
    amount: rust_decimal::Decimal,
    purchase_date: NaiveDate,
) -> Uuid {
    PurchaseRepository::new(db.clone())
        .create(
            fixture.user_id,
            CreatePurchaseInput {
                credit_card_id: fixture.card_id,
                tenant_id: fixture.tenant_id,
                description: "Groceries".to_string(),
                purchase_date,
                total_amount: amount,
                is_installment: false,
                installments_total: None,
                installments_paid: 0,
            },
        )
        .await
        .expect("Failed to create purchase")
        .id
}

async fn create_installment_purchase(
    db: &DatabaseConnection,
    fixture: &Fixture,
    amount: rust_decimal::Decimal,
    parts: i32,
    purchase_date: NaiveDate,
) -> Uuid {
    PurchaseRepository::new(db.clone())
        .create(
            fixture.user_id,
            CreatePurchaseInput {
                credit_card_id: fixture.card_id,
                tenant_id: fixture.tenant_id,
                description: "Electronics".to_string(),
                purchase_date,
                total_amount: amount,
                is_installment: true,
                installments_total: Some(parts),
                installments_paid: 0,
            },
        )
        .await
        .expect("Failed to create purchase")
        .id
}

#[tokio::test]
async fn test_generate_assembles_items_and_total() {
    let Some(db) = connect().await else { return };
    let fixture = setup(&db).await;
    let repo = StatementRepository::new(db.clone());

    create_cash_purchase(&db, &fixture, dec!(350.40), date(2025, 3, 10)).await;
    create_installment_purchase(&db, &fixture, dec!(1200.00), 6, date(2025, 1, 15)).await;
    SubscriptionRepository::new(db.clone())
        .create(
            fixture.user_id,
            CreateSubscriptionInput {
                credit_card_id: fixture.card_id,
                tenant_id: Some(fixture.tenant_id),
                description: "Streaming".to_string(),
                amount: dec!(19.90),
                active: true,
            },
        )
        .await
        .expect("Failed to create subscription");

    let result = repo
        .generate(fixture.user_id, generate_input(fixture.card_id, 2025, 3))
        .await
        .expect("Failed to generate statement");

    assert_eq!(result.statement.year, 2025);
    assert_eq!(result.statement.month, 3);
    assert_eq!(result.items.len(), 2);

    let labels: Vec<&str> = result.items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"Cash purchase"));
    assert!(labels.contains(&"Installment 3/6"));

    let installment_item = result
        .items
        .iter()
        .find(|i| i.label == "Installment 3/6")
        .expect("installment item");
    assert_eq!(installment_item.amount, dec!(200.00));

    // 350.40 + 200.00 + 19.90 subscription + 0.00 adjustment
    assert_eq!(result.statement.total_amount, dec!(570.30));

    cleanup(&db, &fixture).await;
}

#[tokio::test]
async fn test_generate_outside_installment_window_produces_no_item() {
    let Some(db) = connect().await else { return };
    let fixture = setup(&db).await;
    let repo = StatementRepository::new(db.clone());

    create_installment_purchase(&db, &fixture, dec!(1200.00), 6, date(2025, 1, 15)).await;

    // index 7 >= 6: past the window
    let result = repo
        .generate(fixture.user_id, generate_input(fixture.card_id, 2025, 8))
        .await
        .expect("Failed to generate statement");

    assert!(result.items.is_empty());
    assert_eq!(result.statement.total_amount, dec!(0.00));

    cleanup(&db, &fixture).await;
}

#[tokio::test]
async fn test_generate_twice_conflicts() {
    let Some(db) = connect().await else { return };
    let fixture = setup(&db).await;
    let repo = StatementRepository::new(db.clone());

    repo.generate(fixture.user_id, generate_input(fixture.card_id, 2025, 5))
        .await
        .expect("First generate should succeed");

    let second = repo
        .generate(fixture.user_id, generate_input(fixture.card_id, 2025, 5))
        .await;
    assert!(matches!(
        second,
        Err(StatementError::AlreadyExists {
            year: 2025,
            month: 5
        })
    ));

    cleanup(&db, &fixture).await;
}

#[tokio::test]
async fn test_generate_validates_period_and_ownership() {
    let Some(db) = connect().await else { return };
    let fixture = setup(&db).await;
    let repo = StatementRepository::new(db.clone());

    let bad_year = repo
        .generate(fixture.user_id, generate_input(fixture.card_id, 1999, 5))
        .await;
    assert!(matches!(bad_year, Err(StatementError::InvalidPeriod(_))));

    let bad_month = repo
        .generate(fixture.user_id, generate_input(fixture.card_id, 2025, 13))
        .await;
    assert!(matches!(bad_month, Err(StatementError::InvalidPeriod(_))));

    let stranger = Uuid::new_v4();
    let foreign = repo
        .generate(stranger, generate_input(fixture.card_id, 2025, 5))
        .await;
    assert!(matches!(foreign, Err(StatementError::CardNotOwned)));

    cleanup(&db, &fixture).await;
}

#[tokio::test]
async fn test_update_adjustment_shifts_total_by_delta() {
    let Some(db) = connect().await else { return };
    let fixture = setup(&db).await;
    let repo = StatementRepository::new(db.clone());

    create_cash_purchase(&db, &fixture, dec!(100.00), date(2025, 6, 1)).await;
    let generated = repo
        .generate(fixture.user_id, generate_input(fixture.card_id, 2025, 6))
        .await
        .expect("Failed to generate statement");
    assert_eq!(generated.statement.total_amount, dec!(100.00));

    let updated = repo
        .update(
            generated.statement.id,
            fixture.user_id,
            UpdateStatementInput {
                adjustment_amount: Some(dec!(-15.50)),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update statement");
    assert_eq!(updated.adjustment_amount, dec!(-15.50));
    assert_eq!(updated.total_amount, dec!(84.50));

    // a second change applies only the delta
    let updated = repo
        .update(
            updated.id,
            fixture.user_id,
            UpdateStatementInput {
                adjustment_amount: Some(dec!(4.50)),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update statement");
    assert_eq!(updated.adjustment_amount, dec!(4.50));
    assert_eq!(updated.total_amount, dec!(104.50));

    cleanup(&db, &fixture).await;
}

#[tokio::test]
async fn test_locked_statement_freezes_period_fields() {
    let Some(db) = connect().await else { return };
    let fixture = setup(&db).await;
    let repo = StatementRepository::new(db.clone());

    let generated = repo
        .generate(fixture.user_id, generate_input(fixture.card_id, 2025, 7))
        .await
        .expect("Failed to generate statement");

    let locked = repo
        .update(
            generated.statement.id,
            fixture.user_id,
            UpdateStatementInput {
                locked: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to lock statement");
    assert!(locked.locked);

    let frozen = repo
        .update(
            locked.id,
            fixture.user_id,
            UpdateStatementInput {
                adjustment_amount: Some(dec!(10.00)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(frozen, Err(StatementError::LockedImmutable)));

    let unlock = repo
        .update(
            locked.id,
            fixture.user_id,
            UpdateStatementInput {
                locked: Some(false),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(unlock, Err(StatementError::UnlockNotAllowed)));

    cleanup(&db, &fixture).await;
}

#[tokio::test]
async fn test_pay_requires_lock() {
    let Some(db) = connect().await else { return };
    let fixture = setup(&db).await;
    let repo = StatementRepository::new(db.clone());

    let generated = repo
        .generate(fixture.user_id, generate_input(fixture.card_id, 2025, 9))
        .await
        .expect("Failed to generate statement");

    let result = repo
        .pay(generated.statement.id, fixture.user_id, dec!(10.00), None)
        .await;
    assert!(matches!(result, Err(StatementError::NotLocked)));

    cleanup(&db, &fixture).await;
}

#[tokio::test]
async fn test_pay_bumps_installments_exactly_once() {
    let Some(db) = connect().await else { return };
    let fixture = setup(&db).await;
    let repo = StatementRepository::new(db.clone());
    let purchase_repo = PurchaseRepository::new(db.clone());

    let purchase_id =
        create_installment_purchase(&db, &fixture, dec!(600.00), 3, date(2025, 2, 5)).await;
    create_cash_purchase(&db, &fixture, dec!(50.00), date(2025, 2, 20)).await;

    let generated = repo
        .generate(fixture.user_id, generate_input(fixture.card_id, 2025, 2))
        .await
        .expect("Failed to generate statement");
    assert_eq!(generated.items.len(), 2);

    repo.update(
        generated.statement.id,
        fixture.user_id,
        UpdateStatementInput {
            locked: Some(true),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to lock statement");

    let paid = repo
        .pay(
            generated.statement.id,
            fixture.user_id,
            dec!(250.00),
            Some(date(2025, 3, 1)),
        )
        .await
        .expect("Failed to pay statement");
    assert_eq!(paid.statement.paid_amount, Some(dec!(250.00)));
    assert!(paid.statement.paid_at.is_some());

    let purchase = purchase_repo
        .find_owned(purchase_id, fixture.user_id)
        .await
        .expect("Failed to load purchase");
    assert_eq!(purchase.installments_paid, 1);

    // repay: paid fields move, counters do not
    let repaid = repo
        .pay(generated.statement.id, fixture.user_id, dec!(260.00), None)
        .await
        .expect("Failed to repay statement");
    assert_eq!(repaid.statement.paid_amount, Some(dec!(260.00)));

    let purchase = purchase_repo
        .find_owned(purchase_id, fixture.user_id)
        .await
        .expect("Failed to load purchase");
    assert_eq!(purchase.installments_paid, 1);

    cleanup(&db, &fixture).await;
}

#[tokio::test]
async fn test_pay_does_not_advance_fully_paid_purchases() {
    let Some(db) = connect().await else { return };
    let fixture = setup(&db).await;
    let repo = StatementRepository::new(db.clone());
    let purchase_repo = PurchaseRepository::new(db.clone());

    let purchase_id =
        create_installment_purchase(&db, &fixture, dec!(300.00), 2, date(2025, 4, 5)).await;
    purchase_repo
        .set_installments_paid(purchase_id, fixture.user_id, 2)
        .await
        .expect("Failed to set counter");

    let generated = repo
        .generate(fixture.user_id, generate_input(fixture.card_id, 2025, 4))
        .await
        .expect("Failed to generate statement");

    repo.update(
        generated.statement.id,
        fixture.user_id,
        UpdateStatementInput {
            locked: Some(true),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to lock statement");

    repo.pay(generated.statement.id, fixture.user_id, dec!(150.00), None)
        .await
        .expect("Failed to pay statement");

    let purchase = purchase_repo
        .find_owned(purchase_id, fixture.user_id)
        .await
        .expect("Failed to load purchase");
    assert_eq!(purchase.installments_paid, 2);

    cleanup(&db, &fixture).await;
}

#[tokio::test]
async fn test_list_and_period_lookup() {
    let Some(db) = connect().await else { return };
    let fixture = setup(&db).await;
    let repo = StatementRepository::new(db.clone());

    repo.generate(fixture.user_id, generate_input(fixture.card_id, 2025, 1))
        .await
        .expect("Failed to generate statement");
    repo.generate(fixture.user_id, generate_input(fixture.card_id, 2025, 2))
        .await
        .expect("Failed to generate statement");

    let listed = repo
        .list_by_card(fixture.user_id, fixture.card_id)
        .await
        .expect("Failed to list statements");
    assert_eq!(listed.len(), 2);
    // newest period first
    assert_eq!(listed[0].month, 2);
    assert_eq!(listed[1].month, 1);

    let found = repo
        .find_by_period(fixture.user_id, fixture.card_id, 2025, 2)
        .await
        .expect("Failed to find statement");
    assert_eq!(found.month, 2);

    let missing = repo
        .find_by_period(fixture.user_id, fixture.card_id, 2025, 12)
        .await;
    assert!(matches!(
        missing,
        Err(StatementError::PeriodNotFound {
            year: 2025,
            month: 12
        })
    ));

    cleanup(&db, &fixture).await;
}
