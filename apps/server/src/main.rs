use anyhow::Context;
use clap::{Parser, Subcommand};
use reclaim_api::{build_router, AppState};
use reclaim_config::load as load_config;
use reclaim_runtime::{telemetry, AppServices};
use sqlx::Row;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "reclaim-server")]
#[command(about = "Reclaim lost-and-found backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Dump listings and claims from the database
    DumpData,
    /// Clear all listings and claims from the database
    ClearData,
    /// Seed the database with test data
    SeedData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::DumpData => dump_data().await,
        Commands::ClearData => clear_data().await,
        Commands::SeedData => seed_data().await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting Reclaim backend");

    let config = load_config().context("failed to load configuration")?;

    let services = AppServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = AppState::new(services.db_pool.clone(), services.authenticator.clone());
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(reclaim_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn dump_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;

    let services = AppServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let items = sqlx::query(
        r#"
        SELECT id, public_id, owner_user_id, kind, title, category, location, status, created_at
        FROM items
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to fetch items")?;

    println!("=== ITEMS ===");
    if items.is_empty() {
        println!("No items found in database");
    } else {
        println!("Found {} items:", items.len());
        println!(
            "{:<5} {:<38} {:<8} {:<8} {:<30} {:<15} {:<10} {:<25}",
            "ID", "Public ID", "Owner", "Kind", "Title", "Category", "Status", "Created At"
        );
        println!("{}", "-".repeat(140));

        for item in items {
            let id: i64 = item.get("id");
            let public_id: String = item.get("public_id");
            let owner_user_id: i64 = item.get("owner_user_id");
            let kind: String = item.get("kind");
            let title: String = item.get("title");
            let category: String = item.get("category");
            let status: String = item.get("status");
            let created_at: String = item.get("created_at");

            println!(
                "{:<5} {:<38} {:<8} {:<8} {:<30} {:<15} {:<10} {:<25}",
                id, public_id, owner_user_id, kind, title, category, status, created_at
            );
        }
    }

    println!("\n=== CLAIMS ===");
    let claims = sqlx::query(
        r#"
        SELECT id, public_id, item_id, claimant_user_id, status, created_at
        FROM claims
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to fetch claims")?;

    if claims.is_empty() {
        println!("No claims found in database");
    } else {
        println!("Found {} claims:", claims.len());
        println!(
            "{:<5} {:<38} {:<8} {:<10} {:<10} {:<25}",
            "ID", "Public ID", "Item", "Claimant", "Status", "Created At"
        );
        println!("{}", "-".repeat(100));

        for claim in claims {
            let id: i64 = claim.get("id");
            let public_id: String = claim.get("public_id");
            let item_id: i64 = claim.get("item_id");
            let claimant_user_id: i64 = claim.get("claimant_user_id");
            let status: String = claim.get("status");
            let created_at: String = claim.get("created_at");

            println!(
                "{:<5} {:<38} {:<8} {:<10} {:<10} {:<25}",
                id, public_id, item_id, claimant_user_id, status, created_at
            );
        }
    }

    Ok(())
}

async fn clear_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("clearing listings and claims from database");

    let config = load_config().context("failed to load configuration")?;

    let services = AppServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    // Claims and conversations cascade from items.
    let items_deleted = sqlx::query("DELETE FROM items")
        .execute(&services.db_pool)
        .await
        .context("failed to delete items")?;

    let notifications_deleted = sqlx::query("DELETE FROM notifications")
        .execute(&services.db_pool)
        .await
        .context("failed to delete notifications")?;

    println!("Database cleared:");
    println!("- {} items deleted", items_deleted.rows_affected());
    println!(
        "- {} notifications deleted",
        notifications_deleted.rows_affected()
    );

    Ok(())
}

async fn seed_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("seeding database with test data");

    let config = load_config().context("failed to load configuration")?;

    let services = AppServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO users (public_id, email, display_name, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind("seed-user-1")
    .bind("seed@example.com")
    .bind("Seed User")
    .bind("individual")
    .bind(&now)
    .bind(&now)
    .execute(&services.db_pool)
    .await
    .context("failed to insert seed user")?;

    let owner_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE public_id = 'seed-user-1'")
        .fetch_one(&services.db_pool)
        .await
        .context("failed to resolve seed user")?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO items (
            public_id, owner_user_id, kind, title, description, category,
            location, occurred_at, status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?)
        "#,
    )
    .bind("seed-item-1")
    .bind(owner_id)
    .bind("found")
    .bind("Black umbrella")
    .bind("Found near the main station entrance")
    .bind("accessories")
    .bind("Central Station")
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(&services.db_pool)
    .await
    .context("failed to insert seed item 1")?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO items (
            public_id, owner_user_id, kind, title, description, category,
            location, occurred_at, status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?)
        "#,
    )
    .bind("seed-item-2")
    .bind(owner_id)
    .bind("lost")
    .bind("Blue backpack")
    .bind("Lost on the number 4 tram")
    .bind("bags")
    .bind("Tram line 4")
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(&services.db_pool)
    .await
    .context("failed to insert seed item 2")?;

    println!("Database seeded with test data:");
    println!("- 1 user created");
    println!("- 2 items created");
    println!("Run 'dump-data' to see the inserted data");

    Ok(())
}
