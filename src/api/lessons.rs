use rocket::State;
use rocket::serde::json::Json;
use serde::Serialize;
use sqlx::{Pool, Sqlite};

use crate::auth::{Permission, User};
use crate::db::{
    LessonInput, LessonUpdate, ModuleProgress, create_lesson, delete_lesson, exercises_for_lesson,
    get_lesson, lessons_for_module, list_lessons, module_lessons_progress, update_lesson,
};
use crate::lesson_flow::{AUTO_ADVANCE_DELAY, FlowState, LessonFlow};
use crate::models::{ExerciseWithOptions, Lesson, PublicOption};
use crate::validation::{JsonPatchExt, JsonValidateExt};

use super::{ApiResponse, ApiResult};

#[derive(FromForm)]
pub struct LessonQuery {
    #[field(name = "moduleId")]
    module_id: Option<i64>,
}

/// A lesson as played by learners: exercises with answer-free options and
/// the pacing the client should follow.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDetail {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub exercises: Vec<ExerciseWithOptions<PublicOption>>,
    pub auto_advance_delay_ms: u64,
    pub initial_state: Option<FlowState>,
}

#[get("/?<params..>")]
pub async fn api_list_lessons(
    params: LessonQuery,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<Lesson>> {
    Ok(ApiResponse::ok(list_lessons(db, params.module_id).await?))
}

#[get("/<id>")]
pub async fn api_get_lesson(id: i64, db: &State<Pool<Sqlite>>) -> ApiResult<LessonDetail> {
    let lesson = get_lesson(db, id).await?;
    let exercises: Vec<ExerciseWithOptions<PublicOption>> = exercises_for_lesson(db, id)
        .await?
        .into_iter()
        .map(|item| ExerciseWithOptions {
            exercise: item.exercise,
            options: item.options.into_iter().map(PublicOption::from).collect(),
        })
        .collect();

    let initial_state = LessonFlow::new(exercises.len())
        .ok()
        .map(|flow| flow.state().clone());

    Ok(ApiResponse::ok(LessonDetail {
        lesson,
        exercises,
        auto_advance_delay_ms: AUTO_ADVANCE_DELAY.as_millis() as u64,
        initial_state,
    }))
}

#[get("/module/<module_id>")]
pub async fn api_lessons_for_module(
    module_id: i64,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<Lesson>> {
    Ok(ApiResponse::ok(lessons_for_module(db, module_id).await?))
}

#[get("/module/<module_id>/progress")]
pub async fn api_module_lessons_progress(
    module_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<ModuleProgress> {
    user.require_permission(Permission::ViewOwnProgress)?;

    Ok(ApiResponse::ok(
        module_lessons_progress(db, &user, module_id).await?,
    ))
}

#[post("/", data = "<lesson>")]
pub async fn api_create_lesson(
    lesson: Json<LessonInput>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Lesson> {
    user.require_permission(Permission::ManageContent)?;
    let input = lesson.validate_custom()?;

    let created = create_lesson(db, &input).await?;
    Ok(ApiResponse::with_message(created, "Lesson created successfully"))
}

#[put("/<id>", data = "<lesson>")]
pub async fn api_update_lesson(
    id: i64,
    lesson: Json<LessonUpdate>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Lesson> {
    user.require_permission(Permission::ManageContent)?;
    let update = lesson.validate_patch()?;

    let updated = update_lesson(db, id, &update).await?;
    Ok(ApiResponse::with_message(updated, "Lesson updated successfully"))
}

#[delete("/<id>")]
pub async fn api_delete_lesson(id: i64, user: User, db: &State<Pool<Sqlite>>) -> ApiResult<()> {
    user.require_permission(Permission::ManageContent)?;

    delete_lesson(db, id).await?;
    Ok(ApiResponse::with_message((), "Lesson deleted successfully"))
}
