//! Seeds the database with one account per role and a few catalog items.
//!
//! Safe to run repeatedly: existing users get their name, role and password
//! reset, and products whose code already exists are left alone.

use anyhow::Context;
use chrono::{Duration, Utc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pharmacy_api::auth::hash_password;
use pharmacy_api::config::ApiConfig;
use pharmacy_core::{NewProduct, NewUser, Role, UserStatus, UserUpdate};
use pharmacy_db::{Database, DbConfig};

struct SeedUser {
    name: &'static str,
    username: &'static str,
    password: &'static str,
    role: Role,
    branch: &'static str,
}

const USERS: &[SeedUser] = &[
    SeedUser {
        name: "Mawuliah Mansaray",
        username: "mawuliah",
        password: "Admin@123",
        role: Role::Admin,
        branch: "Freetown",
    },
    SeedUser {
        name: "Princess Kamara",
        username: "princess",
        password: "Salesperson@123",
        role: Role::Salesperson,
        branch: "Bo",
    },
    SeedUser {
        name: "Samuel Kamara",
        username: "samuel",
        password: "Storekeeper@123",
        role: Role::Storekeeper,
        branch: "Makeni",
    },
];

/// (code, category, name, price in cents, quantity, days until expiry)
const PRODUCTS: &[(&str, &str, &str, i64, i64, i64)] = &[
    ("PARA-500", "Tablets", "Paracetamol 500mg", 1_500, 120, 540),
    ("AMOX-250", "Capsules", "Amoxicillin 250mg", 4_500, 8, 200),
    ("ORS-01", "Sachets", "Oral Rehydration Salts", 500, 60, 20),
];

async fn seed_users(db: &Database) -> anyhow::Result<()> {
    for seed in USERS {
        let password_hash = hash_password(seed.password)?;

        let user = match db.users().find_by_username(seed.username).await? {
            Some(existing) => {
                let update = UserUpdate {
                    name: Some(seed.name.to_string()),
                    password_hash: Some(password_hash),
                    role: Some(seed.role),
                    ..Default::default()
                };
                db.users().update(&existing.id, &update).await?
            }
            None => {
                db.users()
                    .create(NewUser {
                        name: seed.name.to_string(),
                        username: seed.username.to_string(),
                        password_hash,
                        role: seed.role,
                        status: UserStatus::Active,
                        phone: Some("0777777777".to_string()),
                        balance_cents: 0,
                        branch: Some(seed.branch.to_string()),
                    })
                    .await?
            }
        };

        info!(username = %user.username, role = %user.role, "Seeded user");
    }
    Ok(())
}

async fn seed_products(db: &Database) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();

    for &(code, category, name, price_cents, quantity, expires_in) in PRODUCTS {
        if !db.products().find_by_references(&[code]).await?.is_empty() {
            info!(code, "Product already present");
            continue;
        }

        let product = NewProduct {
            category: Some(category.to_string()),
            product_name: Some(name.to_string()),
            price_cents: Some(price_cents),
            notes: Some("Seed data".to_string()),
            product_code: Some(code.to_string()),
            expiring_date: Some(today + Duration::days(expires_in)),
            quantity: Some(quantity),
            ..Default::default()
        }
        .validate()?;

        let product = db.products().create(product).await?;
        info!(id = %product.id, name = %product.product_name, "Seeded product");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("seed=info,pharmacy_db=info")),
        )
        .init();

    let config = ApiConfig::load().context("loading configuration")?;
    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .with_context(|| format!("opening {}", config.database_path))?;

    seed_users(&db).await.context("seeding users")?;
    seed_products(&db).await.context("seeding products")?;

    db.close().await;
    info!("Done.");
    Ok(())
}
