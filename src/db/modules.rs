use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};
use validator::Validate;

use crate::error::AppError;
use crate::models::{DbModule, Module};
use crate::validation::Patch;

use super::courses::get_course;

const MODULE_COLUMNS: &str = "id, course_id, title, description, \"order\", required_xp, xp_reward, \
     estimated_time, is_locked, created_at, updated_at";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInput {
    pub course_id: i64,
    #[validate(length(min = 3, message = "Title must be at least 3 characters long"))]
    pub title: String,
    pub description: Option<String>,
    pub order: i64,
    pub required_xp: Option<i64>,
    pub xp_reward: Option<i64>,
    pub estimated_time: Option<i64>,
    pub is_locked: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ModuleUpdate {
    #[validate(length(min = 3, message = "Title must be at least 3 characters long"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub required_xp: Option<i64>,
    pub xp_reward: Option<i64>,
    pub estimated_time: Option<i64>,
    pub is_locked: Option<bool>,
}

impl Patch for ModuleUpdate {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.order.is_none()
            && self.required_xp.is_none()
            && self.xp_reward.is_none()
            && self.estimated_time.is_none()
            && self.is_locked.is_none()
    }
}

#[instrument(skip(pool))]
pub async fn list_modules(
    pool: &Pool<Sqlite>,
    course_id: Option<i64>,
) -> Result<Vec<Module>, AppError> {
    info!("Listing modules");

    let sql = format!(
        "SELECT {} FROM modules WHERE (?1 IS NULL OR course_id = ?1)
         ORDER BY course_id ASC, \"order\" ASC, id ASC",
        MODULE_COLUMNS
    );
    let rows = sqlx::query_as::<_, DbModule>(&sql)
        .bind(course_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Module::from).collect())
}

#[instrument(skip(pool))]
pub async fn modules_for_course(
    pool: &Pool<Sqlite>,
    course_id: i64,
) -> Result<Vec<Module>, AppError> {
    get_course(pool, course_id).await?;
    list_modules(pool, Some(course_id)).await
}

#[instrument(skip(pool))]
pub async fn get_module(pool: &Pool<Sqlite>, id: i64) -> Result<Module, AppError> {
    info!("Fetching module");

    let sql = format!("SELECT {} FROM modules WHERE id = ?", MODULE_COLUMNS);
    let row = sqlx::query_as::<_, DbModule>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Module::from)
        .ok_or_else(|| AppError::NotFound(format!("Module with id {} not found", id)))
}

#[instrument(skip(pool, input), fields(course_id = input.course_id))]
pub async fn create_module(pool: &Pool<Sqlite>, input: &ModuleInput) -> Result<Module, AppError> {
    info!("Creating module");

    get_course(pool, input.course_id).await?;

    let res = sqlx::query(
        "INSERT INTO modules
            (course_id, title, description, \"order\", required_xp, xp_reward, estimated_time, is_locked)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(input.course_id)
    .bind(&input.title)
    .bind(input.description.as_deref().unwrap_or_default())
    .bind(input.order)
    .bind(input.required_xp.unwrap_or(0))
    .bind(input.xp_reward.unwrap_or(0))
    .bind(input.estimated_time.unwrap_or(0))
    .bind(input.is_locked.unwrap_or(false))
    .execute(pool)
    .await?;

    get_module(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool, update))]
pub async fn update_module(
    pool: &Pool<Sqlite>,
    id: i64,
    update: &ModuleUpdate,
) -> Result<Module, AppError> {
    info!("Updating module");

    let res = sqlx::query(
        "UPDATE modules SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            \"order\" = COALESCE(?, \"order\"),
            required_xp = COALESCE(?, required_xp),
            xp_reward = COALESCE(?, xp_reward),
            estimated_time = COALESCE(?, estimated_time),
            is_locked = COALESCE(?, is_locked),
            updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(&update.title)
    .bind(&update.description)
    .bind(update.order)
    .bind(update.required_xp)
    .bind(update.xp_reward)
    .bind(update.estimated_time)
    .bind(update.is_locked)
    .bind(id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Module with id {} not found", id)));
    }

    get_module(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_module(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting module");

    let res = sqlx::query("DELETE FROM modules WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Module with id {} not found", id)));
    }

    Ok(())
}
