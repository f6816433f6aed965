use anyhow::Context;
use german_gains::config::AppConfig;
use german_gains::database::migrate_database;
use german_gains::env::load_environment;
use german_gains::seed::{ensure_admin, seed_content};
use german_gains::telemetry::init_tracing;
use sqlx::SqlitePool;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_environment().context("Failed to load environment files")?;
    init_tracing();

    let config = AppConfig::from_figment(&AppConfig::figment())
        .context("Failed to read configuration")?;

    let pool = SqlitePool::connect(&config.database_url)
        .await
        .context("Failed to connect to SQLite database")?;

    migrate_database(&pool).await?;

    let report = seed_content(&pool).await?;
    println!(
        "Seeded {} courses, {} modules, {} lessons, {} exercises, {} sound groups, {} sounds",
        report.courses,
        report.modules,
        report.lessons,
        report.exercises,
        report.sound_groups,
        report.sounds
    );

    let admin_email = dotenvy::var("SEED_ADMIN_EMAIL").ok();
    let admin_password = dotenvy::var("SEED_ADMIN_PASSWORD").ok();

    if let (Some(email), Some(password)) = (admin_email, admin_password) {
        let username = dotenvy::var("SEED_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let id = ensure_admin(&pool, &email, &username, &password).await?;
        info!(user_id = id, "Admin account ready");
    }

    Ok(())
}
