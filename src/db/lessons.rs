use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};
use validator::Validate;

use crate::error::AppError;
use crate::models::{DbLesson, Lesson};
use crate::validation::Patch;

use super::modules::get_module;

const LESSON_COLUMNS: &str =
    "id, module_id, title, description, \"order\", xp_reward, estimated_time, created_at, updated_at";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LessonInput {
    pub module_id: i64,
    #[validate(length(min = 3, message = "Title must be at least 3 characters long"))]
    pub title: String,
    pub description: Option<String>,
    pub order: i64,
    #[validate(range(min = 0, message = "XP reward must be a positive number"))]
    pub xp_reward: Option<i64>,
    #[validate(range(min = 0, message = "Estimated time must be a positive number"))]
    pub estimated_time: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LessonUpdate {
    #[validate(length(min = 3, message = "Title must be at least 3 characters long"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    #[validate(range(min = 0, message = "XP reward must be a positive number"))]
    pub xp_reward: Option<i64>,
    #[validate(range(min = 0, message = "Estimated time must be a positive number"))]
    pub estimated_time: Option<i64>,
}

impl Patch for LessonUpdate {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.order.is_none()
            && self.xp_reward.is_none()
            && self.estimated_time.is_none()
    }
}

#[instrument(skip(pool))]
pub async fn list_lessons(
    pool: &Pool<Sqlite>,
    module_id: Option<i64>,
) -> Result<Vec<Lesson>, AppError> {
    info!("Listing lessons");

    let sql = format!(
        "SELECT {} FROM lessons WHERE (?1 IS NULL OR module_id = ?1)
         ORDER BY module_id ASC, \"order\" ASC, id ASC",
        LESSON_COLUMNS
    );
    let rows = sqlx::query_as::<_, DbLesson>(&sql)
        .bind(module_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Lesson::from).collect())
}

#[instrument(skip(pool))]
pub async fn lessons_for_module(
    pool: &Pool<Sqlite>,
    module_id: i64,
) -> Result<Vec<Lesson>, AppError> {
    get_module(pool, module_id).await?;
    list_lessons(pool, Some(module_id)).await
}

#[instrument(skip(pool))]
pub async fn get_lesson(pool: &Pool<Sqlite>, id: i64) -> Result<Lesson, AppError> {
    info!("Fetching lesson");

    let sql = format!("SELECT {} FROM lessons WHERE id = ?", LESSON_COLUMNS);
    let row = sqlx::query_as::<_, DbLesson>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Lesson::from)
        .ok_or_else(|| AppError::NotFound(format!("Lesson with id {} not found", id)))
}

#[instrument(skip(pool, input), fields(module_id = input.module_id))]
pub async fn create_lesson(pool: &Pool<Sqlite>, input: &LessonInput) -> Result<Lesson, AppError> {
    info!("Creating lesson");

    get_module(pool, input.module_id).await?;

    let res = sqlx::query(
        "INSERT INTO lessons (module_id, title, description, \"order\", xp_reward, estimated_time)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(input.module_id)
    .bind(&input.title)
    .bind(input.description.as_deref().unwrap_or_default())
    .bind(input.order)
    .bind(input.xp_reward.unwrap_or(5))
    .bind(input.estimated_time.unwrap_or(0))
    .execute(pool)
    .await?;

    get_lesson(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool, update))]
pub async fn update_lesson(
    pool: &Pool<Sqlite>,
    id: i64,
    update: &LessonUpdate,
) -> Result<Lesson, AppError> {
    info!("Updating lesson");

    let res = sqlx::query(
        "UPDATE lessons SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            \"order\" = COALESCE(?, \"order\"),
            xp_reward = COALESCE(?, xp_reward),
            estimated_time = COALESCE(?, estimated_time),
            updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(&update.title)
    .bind(&update.description)
    .bind(update.order)
    .bind(update.xp_reward)
    .bind(update.estimated_time)
    .bind(id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Lesson with id {} not found", id)));
    }

    get_lesson(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_lesson(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting lesson");

    let res = sqlx::query("DELETE FROM lessons WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Lesson with id {} not found", id)));
    }

    Ok(())
}
