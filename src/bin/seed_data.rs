//! Seed data script - populates the database with a demo restaurant
//!
//! Run with: cargo run --bin seed-data -- --migrate
//!
//! This creates:
//! - 8 dining tables
//! - 3 menu categories with subcategories and items
//! - 2 promotions running from today
//! - one admin and one staff account

use std::sync::Arc;

use chrono::Duration;
use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;

use restaurant_api::{
    auth::hash_password,
    db,
    entities::user::{self, UserRole},
    services::{
        menu::{
            CreateCategoryRequest, CreateMenuItemRequest, CreatePromotionRequest,
            CreateSubcategoryRequest, MenuService,
        },
        tables::{CreateTableRequest, TableService},
    },
};

#[derive(Debug, Parser)]
#[command(name = "seed-data", about = "Populate the database with a demo restaurant")]
struct Args {
    /// Database URL; falls back to DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    /// Run migrations before seeding
    #[arg(long)]
    migrate: bool,

    #[arg(long, default_value = "admin@restaurant.local")]
    admin_email: String,

    #[arg(long, default_value = "change-me-admin")]
    admin_password: String,

    #[arg(long, default_value = "staff@restaurant.local")]
    staff_email: String,

    #[arg(long, default_value = "change-me-staff")]
    staff_password: String,
}

/// (category, [(subcategory, [(name, description, price)])])
type MenuSeed = (
    &'static str,
    Vec<(&'static str, Vec<(&'static str, &'static str, Decimal)>)>,
);

fn menu_seed() -> Vec<MenuSeed> {
    vec![
        (
            "Starters",
            vec![
                (
                    "Soups",
                    vec![
                        ("Tomato Basil Soup", "Roasted tomatoes, fresh basil", dec!(180.00)),
                        ("Sweet Corn Soup", "Creamy corn broth with spring onion", dec!(160.00)),
                    ],
                ),
                (
                    "Small Plates",
                    vec![
                        ("Crispy Calamari", "Lemon aioli", dec!(320.00)),
                        ("Bruschetta", "Tomato, garlic, olive oil", dec!(220.00)),
                    ],
                ),
            ],
        ),
        (
            "Mains",
            vec![
                (
                    "Grill",
                    vec![
                        ("Grilled Chicken", "Herb marinade, seasonal vegetables", dec!(450.00)),
                        ("Ribeye Steak", "300g, peppercorn sauce", dec!(980.00)),
                    ],
                ),
                (
                    "Pasta",
                    vec![
                        ("Penne Arrabbiata", "Spicy tomato sauce", dec!(340.00)),
                        ("Mushroom Risotto", "Arborio rice, parmesan", dec!(420.00)),
                    ],
                ),
            ],
        ),
        (
            "Desserts",
            vec![(
                "Sweets",
                vec![
                    ("Chocolate Lava Cake", "Vanilla ice cream", dec!(260.00)),
                    ("Tiramisu", "Espresso, mascarpone", dec!(240.00)),
                ],
            )],
        ),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = args
        .database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://restaurant.db?mode=rwc".to_string());

    info!("Connecting to database: {}", database_url);
    let conn = db::establish_connection(&database_url).await?;
    if args.migrate {
        db::run_migrations(&conn).await?;
        info!("Migrations applied");
    }
    let conn = Arc::new(conn);

    info!("Creating tables...");
    let tables = TableService::new(conn.clone());
    let layout = [(1, 2), (2, 2), (3, 4), (4, 4), (5, 4), (6, 6), (7, 6), (8, 8)];
    for (i, (number, seats)) in layout.into_iter().enumerate() {
        let col = (i % 4) as i32;
        let row = (i / 4) as i32;
        tables
            .create(CreateTableRequest {
                table_number: number,
                seats,
                x_position: col * 120,
                y_position: row * 120,
            })
            .await?;
    }
    info!("  Created {} tables", layout.len());

    info!("Creating menu...");
    let menu = MenuService::new(conn.clone());
    let mut item_ids = Vec::new();
    for (category_name, subcategories) in menu_seed() {
        let category = menu
            .create_category(CreateCategoryRequest {
                name: category_name.to_string(),
                slug: None,
            })
            .await?;
        for (subcategory_name, items) in subcategories {
            let subcategory = menu
                .create_subcategory(CreateSubcategoryRequest {
                    category_id: category.id,
                    name: subcategory_name.to_string(),
                })
                .await?;
            for (name, description, price) in items {
                let item = menu
                    .create_item(CreateMenuItemRequest {
                        subcategory_id: subcategory.id,
                        name: name.to_string(),
                        description: description.to_string(),
                        price,
                        image_url: None,
                        is_available: true,
                    })
                    .await?;
                item_ids.push(item.id);
            }
        }
    }
    info!("  Created {} menu items", item_ids.len());

    info!("Creating promotions...");
    let today = restaurant_api::services::today();
    // Tomato soup and calamari
    let promos = [
        (0, "Soup Week", "Tomato soup at a discount", dec!(0.15)),
        (2, "Calamari Night", "Share a plate for less", dec!(0.20)),
    ];
    for (index, title, description, discount) in promos {
        let Some(&item_id) = item_ids.get(index) else {
            continue;
        };
        menu.create_promotion(CreatePromotionRequest {
            item_id,
            title: title.to_string(),
            description: description.to_string(),
            start_date: today,
            end_date: today + Duration::days(14),
            discount_percent: discount,
        })
        .await?;
    }

    info!("Creating accounts...");
    ensure_account(&conn, &args.admin_email, &args.admin_password, UserRole::Admin).await?;
    ensure_account(&conn, &args.staff_email, &args.staff_password, UserRole::Staff).await?;

    info!("=== Seed Data Complete ===");
    info!("Try: curl http://localhost:8080/api/v1/menu/categories");
    info!("Or explore interactively at: http://localhost:8080/swagger-ui");

    Ok(())
}

async fn ensure_account(
    conn: &DatabaseConnection,
    email: &str,
    password: &str,
    role: UserRole,
) -> anyhow::Result<()> {
    let email = email.trim().to_lowercase();
    if user::Entity::find()
        .filter(user::Column::Email.eq(email.clone()))
        .one(conn)
        .await?
        .is_some()
    {
        info!("  {} already exists; skipped", email);
        return Ok(());
    }

    user::ActiveModel {
        email: Set(email.clone()),
        password_hash: Set(hash_password(password)?),
        first_name: Set(role.to_string()),
        last_name: Set("Account".to_string()),
        phone: Set("0000000000".to_string()),
        address: Set(None),
        date_of_birth: Set(None),
        role: Set(role),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    info!("  Created {} account {}", role, email);
    Ok(())
}
