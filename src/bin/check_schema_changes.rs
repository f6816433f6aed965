use german_gains::config::AppConfig;
use german_gains::database::{CURRENT_SCHEMA, DeclarativeMigrator, DestructiveChanges};
use german_gains::env::load_environment;
use german_gains::error::AppError;
use sqlx::SqlitePool;

#[tokio::main]
async fn main() {
    match get_destructive_changes().await {
        Ok(changes) if changes.is_empty() => println!("Changes passed the check ✓"),
        Ok(changes) => {
            println!("Destructive changes detected:");
            print_string_vec(&changes.tables_removed, "    Table removed:");
            print_string_vec(&changes.indices_removed, "    Index removed:");

            for table in &changes.columns_removed {
                let table_prefix = format!("    Column removed from table {}:", table.name);
                print_string_vec(&table.removed_columns, &table_prefix);
            }

            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to check for destructive changes: {}", e);
            std::process::exit(2);
        }
    }
}

fn print_string_vec(items: &[String], prefix: &str) {
    for item in items {
        println!("{} {}", prefix, item)
    }
}

async fn get_destructive_changes() -> Result<DestructiveChanges, AppError> {
    load_environment().map_err(|e| AppError::Internal(e.to_string()))?;

    let config = AppConfig::from_figment(&AppConfig::figment())
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let pool = SqlitePool::connect(&config.database_url).await?;
    let diff = DeclarativeMigrator::new(&pool, CURRENT_SCHEMA).plan().await?;

    Ok(diff.destructive())
}
