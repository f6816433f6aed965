use std::time::Duration;

use german_gains::config::AppConfig;
use german_gains::database::migrate_database;
use german_gains::db::clean_expired_sessions;
use german_gains::env::load_environment;
use german_gains::error::AppError;
use german_gains::init_rocket;
use german_gains::telemetry::{init_tracing, shutdown_telemetry};
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket, launch, tokio};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("{0}")]
    Figment(#[from] rocket::figment::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

fn spawn_session_cleanup(pool: SqlitePool, interval: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(interval).await;
        }
    });
}

async fn build() -> Result<Rocket<Build>, StartupError> {
    load_environment()?;
    init_tracing();

    let figment = AppConfig::figment();
    let config = AppConfig::from_figment(&figment)?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    info!("Running database migrations...");
    let changes = migrate_database(&pool).await?;
    info!(changes, "Migrations completed successfully");

    spawn_session_cleanup(
        pool.clone(),
        Duration::from_secs(config.session_cleanup_interval_secs.max(60)),
    );

    let rocket = init_rocket(pool, figment)?.attach(AdHoc::on_shutdown(
        "Telemetry shutdown",
        |_| Box::pin(async move { shutdown_telemetry() }),
    ));

    Ok(rocket)
}

#[launch]
async fn rocket() -> _ {
    match build().await {
        Ok(rocket) => rocket,
        Err(e) => {
            error!("Failed to start German Gains: {}", e);
            eprintln!("Failed to start German Gains: {}", e);
            std::process::exit(1);
        }
    }
}
