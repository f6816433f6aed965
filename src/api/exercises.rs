use rocket::State;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::answers::Answer;
use crate::auth::{Permission, User};
use crate::db::{
    AnswerOutcome, ExerciseInput, ExerciseUpdate, LessonStatus, create_exercise, delete_exercise,
    exercises_for_lesson, get_exercise_with_options, lesson_status, list_exercises,
    record_answer, update_exercise,
};
use crate::models::{Exercise, ExerciseOption, ExerciseType, ExerciseWithOptions, PublicOption};
use crate::validation::{JsonPatchExt, JsonValidateExt};

use super::{ApiResponse, ApiResult};

type PublicExercise = ExerciseWithOptions<PublicOption>;

fn to_public(item: ExerciseWithOptions<ExerciseOption>) -> PublicExercise {
    ExerciseWithOptions {
        exercise: item.exercise,
        options: item.options.into_iter().map(PublicOption::from).collect(),
    }
}

#[derive(FromForm)]
pub struct ExerciseQuery {
    #[field(name = "lessonId")]
    lesson_id: Option<i64>,
    #[field(name = "type")]
    exercise_type: Option<ExerciseType>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckAnswerRequest {
    pub answer: Answer,
    /// Seconds the learner took to answer.
    #[validate(range(min = 0, max = 86_400, message = "Time taken must be between 0 and 86400 seconds"))]
    pub time_taken: Option<i64>,
}

#[get("/?<params..>")]
pub async fn api_list_exercises(
    params: ExerciseQuery,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<Exercise>> {
    let exercises = list_exercises(db, params.lesson_id, params.exercise_type).await?;
    Ok(ApiResponse::ok(exercises))
}

#[get("/<id>")]
pub async fn api_get_exercise(id: i64, db: &State<Pool<Sqlite>>) -> ApiResult<PublicExercise> {
    let exercise = get_exercise_with_options(db, id).await?;
    Ok(ApiResponse::ok(to_public(exercise)))
}

#[get("/<id>/admin", rank = 2)]
pub async fn api_get_exercise_admin(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<ExerciseWithOptions<ExerciseOption>> {
    user.require_permission(Permission::ViewAnswers)?;

    Ok(ApiResponse::ok(get_exercise_with_options(db, id).await?))
}

#[get("/lesson/<lesson_id>")]
pub async fn api_exercises_for_lesson(
    lesson_id: i64,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<PublicExercise>> {
    let exercises = exercises_for_lesson(db, lesson_id).await?;
    Ok(ApiResponse::ok(
        exercises.into_iter().map(to_public).collect(),
    ))
}

#[get("/status/lesson/<lesson_id>")]
pub async fn api_lesson_status(
    lesson_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<LessonStatus> {
    user.require_permission(Permission::ViewOwnProgress)?;

    Ok(ApiResponse::ok(lesson_status(db, user.id, lesson_id).await?))
}

#[post("/<id>/check", data = "<request>")]
pub async fn api_check_answer(
    id: i64,
    request: Json<CheckAnswerRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<AnswerOutcome> {
    user.require_permission(Permission::SubmitAnswers)?;
    let request = request.validate_custom()?;

    let outcome = record_answer(db, user.id, id, &request.answer, request.time_taken).await?;
    Ok(ApiResponse::ok(outcome))
}

#[post("/", data = "<exercise>")]
pub async fn api_create_exercise(
    exercise: Json<ExerciseInput>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<ExerciseWithOptions<ExerciseOption>> {
    user.require_permission(Permission::ManageContent)?;
    let input = exercise.validate_custom()?;

    let created = create_exercise(db, &input).await?;
    Ok(ApiResponse::with_message(created, "Exercise created successfully"))
}

#[put("/<id>", data = "<exercise>")]
pub async fn api_update_exercise(
    id: i64,
    exercise: Json<ExerciseUpdate>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<ExerciseWithOptions<ExerciseOption>> {
    user.require_permission(Permission::ManageContent)?;
    let update = exercise.validate_patch()?;

    let updated = update_exercise(db, id, &update).await?;
    Ok(ApiResponse::with_message(updated, "Exercise updated successfully"))
}

#[delete("/<id>")]
pub async fn api_delete_exercise(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<()> {
    user.require_permission(Permission::ManageContent)?;

    delete_exercise(db, id).await?;
    Ok(ApiResponse::with_message((), "Exercise deleted successfully"))
}
