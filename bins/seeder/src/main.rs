//! Database seeder for Fatura development and testing.
//!
//! Seeds an admin user, two tenants, a credit card, and a pair of sample
//! purchases (one cash, one installment) for local development.
//!
//! Usage: cargo run --bin seeder

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::str::FromStr;
use uuid::Uuid;

use fatura_core::auth::hash_password;
use fatura_db::entities::{credit_cards, purchases, tenants, users};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "Admin@123";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = fatura_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding admin user...");
    let admin_id = seed_admin(&db).await;

    println!("Seeding tenants...");
    let john_id = seed_tenant(&db, admin_id, "John Doe").await;
    let jane_id = seed_tenant(&db, admin_id, "Jane Doe").await;

    println!("Seeding credit card...");
    let card_id = seed_card(&db, admin_id).await;

    println!("Seeding purchases...");
    seed_purchases(&db, admin_id, card_id, john_id, jane_id).await;

    println!("Seeding complete!");
}

fn amount(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

/// Seeds the admin user, returning its id.
async fn seed_admin(db: &DatabaseConnection) -> Uuid {
    if let Some(existing) = users::Entity::find()
        .filter(users::Column::Email.eq(ADMIN_EMAIL))
        .one(db)
        .await
        .expect("Failed to query users")
    {
        println!("  Admin user already exists, skipping...");
        return existing.id;
    }

    let now = Utc::now().into();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Admin".to_string()),
        email: Set(ADMIN_EMAIL.to_string()),
        password_hash: Set(hash_password(ADMIN_PASSWORD).expect("Failed to hash password")),
        created_at: Set(now),
        updated_at: Set(now),
    };

    user.insert(db)
        .await
        .expect("Failed to insert admin user")
        .id
}

/// Seeds a tenant, returning its id.
async fn seed_tenant(db: &DatabaseConnection, owner_id: Uuid, name: &str) -> Uuid {
    if let Some(existing) = tenants::Entity::find()
        .filter(tenants::Column::CreatedByUserId.eq(owner_id))
        .filter(tenants::Column::Name.eq(name))
        .one(db)
        .await
        .expect("Failed to query tenants")
    {
        println!("  Tenant {name} already exists, skipping...");
        return existing.id;
    }

    let now = Utc::now().into();
    let tenant = tenants::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_by_user_id: Set(owner_id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    tenant.insert(db).await.expect("Failed to insert tenant").id
}

/// Seeds the main credit card, returning its id.
async fn seed_card(db: &DatabaseConnection, owner_id: Uuid) -> Uuid {
    if let Some(existing) = credit_cards::Entity::find()
        .filter(credit_cards::Column::CreatedByUserId.eq(owner_id))
        .filter(credit_cards::Column::Nickname.eq("Main Visa"))
        .one(db)
        .await
        .expect("Failed to query credit cards")
    {
        println!("  Credit card already exists, skipping...");
        return existing.id;
    }

    let now = Utc::now().into();
    let card = credit_cards::ActiveModel {
        id: Set(Uuid::new_v4()),
        nickname: Set("Main Visa".to_string()),
        brand: Set("Visa".to_string()),
        last4: Set("1234".to_string()),
        limit_amount: Set(Some(amount("5000.00"))),
        created_by_user_id: Set(owner_id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    card.insert(db)
        .await
        .expect("Failed to insert credit card")
        .id
}

/// Seeds one cash and one installment purchase.
async fn seed_purchases(
    db: &DatabaseConnection,
    owner_id: Uuid,
    card_id: Uuid,
    john_id: Uuid,
    jane_id: Uuid,
) {
    let existing = purchases::Entity::find()
        .filter(purchases::Column::CreatedByUserId.eq(owner_id))
        .one(db)
        .await
        .expect("Failed to query purchases");
    if existing.is_some() {
        println!("  Purchases already exist, skipping...");
        return;
    }

    let now = Utc::now();
    let today = now.date_naive();
    let stamp = now.into();

    let groceries = purchases::ActiveModel {
        id: Set(Uuid::new_v4()),
        credit_card_id: Set(card_id),
        tenant_id: Set(john_id),
        created_by_user_id: Set(owner_id),
        description: Set("Groceries".to_string()),
        purchase_date: Set(today),
        total_amount: Set(amount("350.40")),
        is_installment: Set(false),
        installments_total: Set(None),
        installments_paid: Set(0),
        created_at: Set(stamp),
        updated_at: Set(stamp),
    };
    groceries
        .insert(db)
        .await
        .expect("Failed to insert purchase");

    let electronics = purchases::ActiveModel {
        id: Set(Uuid::new_v4()),
        credit_card_id: Set(card_id),
        tenant_id: Set(jane_id),
        created_by_user_id: Set(owner_id),
        description: Set("Electronics".to_string()),
        purchase_date: Set(today),
        total_amount: Set(amount("1200.00")),
        is_installment: Set(true),
        installments_total: Set(Some(6)),
        installments_paid: Set(1),
        created_at: Set(stamp),
        updated_at: Set(stamp),
    };
    electronics
        .insert(db)
        .await
        .expect("Failed to insert purchase");
}
