use rocket::State;
use serde::Serialize;
use sqlx::{Pool, Sqlite};

use crate::error::AppError;

use super::{ApiResponse, ApiResult};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

#[get("/health")]
pub async fn health(db: &State<Pool<Sqlite>>) -> ApiResult<HealthStatus> {
    sqlx::query("SELECT 1")
        .execute(&**db)
        .await
        .map_err(|e| AppError::ExternalService(format!("Database unreachable: {}", e)))?;

    Ok(ApiResponse::ok(HealthStatus {
        status: "ok",
        database: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}
