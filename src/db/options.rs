use serde::Deserialize;
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};
use validator::Validate;

use crate::error::AppError;
use crate::models::{DbExerciseOption, ExerciseOption};
use crate::validation::Patch;

use super::exercises::get_exercise;

const OPTION_COLUMNS: &str = "id, exercise_id, text, is_correct, \"order\", image_src, audio_src";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OptionInput {
    pub exercise_id: i64,
    #[validate(length(min = 1, message = "Option text is required"))]
    pub text: String,
    pub is_correct: Option<bool>,
    pub order: Option<i64>,
    pub image_src: Option<String>,
    pub audio_src: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OptionUpdate {
    #[validate(length(min = 1, message = "Option text cannot be empty"))]
    pub text: Option<String>,
    pub is_correct: Option<bool>,
    pub order: Option<i64>,
    pub image_src: Option<String>,
    pub audio_src: Option<String>,
}

impl Patch for OptionUpdate {
    fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.is_correct.is_none()
            && self.order.is_none()
            && self.image_src.is_none()
            && self.audio_src.is_none()
    }
}

pub(crate) async fn fetch_options(
    conn: &mut SqliteConnection,
    exercise_id: i64,
) -> Result<Vec<ExerciseOption>, AppError> {
    let sql = format!(
        "SELECT {} FROM exercise_options WHERE exercise_id = ? ORDER BY \"order\" ASC, id ASC",
        OPTION_COLUMNS
    );
    let rows = sqlx::query_as::<_, DbExerciseOption>(&sql)
        .bind(exercise_id)
        .fetch_all(conn)
        .await?;

    Ok(rows.into_iter().map(ExerciseOption::from).collect())
}

#[instrument(skip(pool))]
pub async fn options_for_exercise(
    pool: &Pool<Sqlite>,
    exercise_id: i64,
) -> Result<Vec<ExerciseOption>, AppError> {
    info!("Listing exercise options");

    get_exercise(pool, exercise_id).await?;
    let mut conn = pool.acquire().await?;
    fetch_options(&mut conn, exercise_id).await
}

#[instrument(skip(pool))]
pub async fn get_option(pool: &Pool<Sqlite>, id: i64) -> Result<ExerciseOption, AppError> {
    info!("Fetching exercise option");

    let sql = format!("SELECT {} FROM exercise_options WHERE id = ?", OPTION_COLUMNS);
    let row = sqlx::query_as::<_, DbExerciseOption>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(ExerciseOption::from)
        .ok_or_else(|| AppError::NotFound(format!("Exercise option with id {} not found", id)))
}

/// Appends an option; without an explicit order it goes after the last one.
#[instrument(skip(pool, input), fields(exercise_id = input.exercise_id))]
pub async fn create_option(
    pool: &Pool<Sqlite>,
    input: &OptionInput,
) -> Result<ExerciseOption, AppError> {
    info!("Creating exercise option");

    get_exercise(pool, input.exercise_id).await?;

    let order = match input.order {
        Some(order) => order,
        None => {
            let (next,): (i64,) = sqlx::query_as(
                "SELECT COALESCE(MAX(\"order\"), 0) + 1 FROM exercise_options WHERE exercise_id = ?",
            )
            .bind(input.exercise_id)
            .fetch_one(pool)
            .await?;
            next
        }
    };

    let res = sqlx::query(
        "INSERT INTO exercise_options (exercise_id, text, is_correct, \"order\", image_src, audio_src)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(input.exercise_id)
    .bind(&input.text)
    .bind(input.is_correct.unwrap_or(false))
    .bind(order)
    .bind(&input.image_src)
    .bind(&input.audio_src)
    .execute(pool)
    .await?;

    get_option(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool, update))]
pub async fn update_option(
    pool: &Pool<Sqlite>,
    id: i64,
    update: &OptionUpdate,
) -> Result<ExerciseOption, AppError> {
    info!("Updating exercise option");

    let res = sqlx::query(
        "UPDATE exercise_options SET
            text = COALESCE(?, text),
            is_correct = COALESCE(?, is_correct),
            \"order\" = COALESCE(?, \"order\"),
            image_src = COALESCE(?, image_src),
            audio_src = COALESCE(?, audio_src)
         WHERE id = ?",
    )
    .bind(&update.text)
    .bind(update.is_correct)
    .bind(update.order)
    .bind(&update.image_src)
    .bind(&update.audio_src)
    .bind(id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Exercise option with id {} not found",
            id
        )));
    }

    get_option(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_option(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting exercise option");

    let res = sqlx::query("DELETE FROM exercise_options WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Exercise option with id {} not found",
            id
        )));
    }

    Ok(())
}
