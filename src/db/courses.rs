use serde::Deserialize;
use sqlx::{Pool, QueryBuilder, Sqlite};
use tracing::{info, instrument};
use validator::Validate;

use crate::error::AppError;
use crate::models::{Course, DbCourse, LanguageLevel};
use crate::validation::Patch;

const COURSE_COLUMNS: &str =
    "id, title, description, level, image_src, \"order\", is_active, created_at, updated_at";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    #[validate(length(min = 3, message = "Title must be at least 3 characters long"))]
    pub title: String,
    #[validate(length(min = 10, message = "Description must be at least 10 characters long"))]
    pub description: String,
    pub level: LanguageLevel,
    pub image_src: Option<String>,
    pub order: i64,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    #[validate(length(min = 3, message = "Title must be at least 3 characters long"))]
    pub title: Option<String>,
    #[validate(length(min = 10, message = "Description must be at least 10 characters long"))]
    pub description: Option<String>,
    pub level: Option<LanguageLevel>,
    pub image_src: Option<String>,
    pub order: Option<i64>,
    pub is_active: Option<bool>,
}

impl Patch for CourseUpdate {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.level.is_none()
            && self.image_src.is_none()
            && self.order.is_none()
            && self.is_active.is_none()
    }
}

#[instrument(skip(pool))]
pub async fn list_courses(
    pool: &Pool<Sqlite>,
    level: Option<LanguageLevel>,
    search: Option<&str>,
) -> Result<Vec<Course>, AppError> {
    info!("Listing courses");

    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM courses WHERE 1 = 1",
        COURSE_COLUMNS
    ));

    if let Some(level) = level {
        query.push(" AND level = ").push_bind(level.as_str());
    }

    if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        query
            .push(" AND (LOWER(title) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(description) LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    query.push(" ORDER BY \"order\" ASC, id ASC");

    let rows = query.build_query_as::<DbCourse>().fetch_all(pool).await?;

    Ok(rows.into_iter().map(Course::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_course(pool: &Pool<Sqlite>, id: i64) -> Result<Course, AppError> {
    info!("Fetching course");

    let sql = format!("SELECT {} FROM courses WHERE id = ?", COURSE_COLUMNS);
    let row = sqlx::query_as::<_, DbCourse>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Course::from)
        .ok_or_else(|| AppError::NotFound(format!("Course with id {} not found", id)))
}

#[instrument(skip(pool, input), fields(title = %input.title))]
pub async fn create_course(pool: &Pool<Sqlite>, input: &CourseInput) -> Result<Course, AppError> {
    info!("Creating course");

    let res = sqlx::query(
        "INSERT INTO courses (title, description, level, image_src, \"order\", is_active)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.level.as_str())
    .bind(&input.image_src)
    .bind(input.order)
    .bind(input.is_active.unwrap_or(true))
    .execute(pool)
    .await?;

    get_course(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool, update))]
pub async fn update_course(
    pool: &Pool<Sqlite>,
    id: i64,
    update: &CourseUpdate,
) -> Result<Course, AppError> {
    info!("Updating course");

    let res = sqlx::query(
        "UPDATE courses SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            level = COALESCE(?, level),
            image_src = COALESCE(?, image_src),
            \"order\" = COALESCE(?, \"order\"),
            is_active = COALESCE(?, is_active),
            updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(&update.title)
    .bind(&update.description)
    .bind(update.level.map(|l| l.as_str()))
    .bind(&update.image_src)
    .bind(update.order)
    .bind(update.is_active)
    .bind(id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Course with id {} not found", id)));
    }

    get_course(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_course(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting course");

    let res = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Course with id {} not found", id)));
    }

    Ok(())
}
