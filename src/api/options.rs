use rocket::State;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Permission, User};
use crate::db::{
    OptionInput, OptionUpdate, create_option, delete_option, get_option, options_for_exercise,
    update_option,
};
use crate::models::{ExerciseOption, PublicOption};
use crate::validation::{JsonPatchExt, JsonValidateExt};

use super::{ApiResponse, ApiResult};

#[get("/exercise/<exercise_id>")]
pub async fn api_options_for_exercise(
    exercise_id: i64,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<PublicOption>> {
    let options = options_for_exercise(db, exercise_id).await?;
    Ok(ApiResponse::ok(
        options.into_iter().map(PublicOption::from).collect(),
    ))
}

#[get("/exercise/<exercise_id>/admin")]
pub async fn api_options_for_exercise_admin(
    exercise_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<ExerciseOption>> {
    user.require_permission(Permission::ViewAnswers)?;

    Ok(ApiResponse::ok(options_for_exercise(db, exercise_id).await?))
}

#[get("/<id>")]
pub async fn api_get_option(id: i64, db: &State<Pool<Sqlite>>) -> ApiResult<PublicOption> {
    let option = get_option(db, id).await?;
    Ok(ApiResponse::ok(PublicOption::from(option)))
}

#[post("/", data = "<option>")]
pub async fn api_create_option(
    option: Json<OptionInput>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<ExerciseOption> {
    user.require_permission(Permission::ManageContent)?;
    let input = option.validate_custom()?;

    let created = create_option(db, &input).await?;
    Ok(ApiResponse::with_message(
        created,
        "Exercise option created successfully",
    ))
}

#[put("/<id>", data = "<option>")]
pub async fn api_update_option(
    id: i64,
    option: Json<OptionUpdate>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<ExerciseOption> {
    user.require_permission(Permission::ManageContent)?;
    let update = option.validate_patch()?;

    let updated = update_option(db, id, &update).await?;
    Ok(ApiResponse::with_message(
        updated,
        "Exercise option updated successfully",
    ))
}

#[delete("/<id>")]
pub async fn api_delete_option(id: i64, user: User, db: &State<Pool<Sqlite>>) -> ApiResult<()> {
    user.require_permission(Permission::ManageContent)?;

    delete_option(db, id).await?;
    Ok(ApiResponse::with_message(
        (),
        "Exercise option deleted successfully",
    ))
}
