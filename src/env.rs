use std::path::Path;

use tracing::{info, warn};

pub fn is_production() -> bool {
    matches!(
        dotenvy::var("ROCKET_PROFILE").as_deref(),
        Ok("production" | "release")
    )
}

pub fn env_files(production: bool) -> Vec<&'static str> {
    if production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    }
}

pub fn load_environment() -> Result<(), dotenvy::Error> {
    for env_file in env_files(is_production()) {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), dotenvy::Error> {
    if !Path::new(path).exists() {
        warn!("Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}
