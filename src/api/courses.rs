use rocket::State;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Permission, User};
use crate::db::{
    CourseInput, CourseProgress, CourseUpdate, all_courses_progress, course_progress,
    create_course, delete_course, get_course, list_courses, update_course,
};
use crate::models::{Course, LanguageLevel};
use crate::validation::{JsonPatchExt, JsonValidateExt};

use super::{ApiResponse, ApiResult};

#[derive(FromForm)]
pub struct CourseQuery {
    level: Option<LanguageLevel>,
    search: Option<String>,
}

#[get("/?<params..>")]
pub async fn api_list_courses(
    params: CourseQuery,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<Course>> {
    let courses = list_courses(db, params.level, params.search.as_deref()).await?;
    Ok(ApiResponse::ok(courses))
}

#[get("/progress/all")]
pub async fn api_all_courses_progress(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<CourseProgress>> {
    user.require_permission(Permission::ViewOwnProgress)?;

    Ok(ApiResponse::ok(all_courses_progress(db, &user).await?))
}

#[get("/<id>")]
pub async fn api_get_course(id: i64, db: &State<Pool<Sqlite>>) -> ApiResult<Course> {
    Ok(ApiResponse::ok(get_course(db, id).await?))
}

#[get("/<id>/progress")]
pub async fn api_course_progress(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<CourseProgress> {
    user.require_permission(Permission::ViewOwnProgress)?;

    Ok(ApiResponse::ok(course_progress(db, &user, id).await?))
}

#[post("/", data = "<course>")]
pub async fn api_create_course(
    course: Json<CourseInput>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Course> {
    user.require_permission(Permission::ManageContent)?;
    let input = course.validate_custom()?;

    let created = create_course(db, &input).await?;
    Ok(ApiResponse::with_message(created, "Course created successfully"))
}

#[put("/<id>", data = "<course>")]
pub async fn api_update_course(
    id: i64,
    course: Json<CourseUpdate>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Course> {
    user.require_permission(Permission::ManageContent)?;
    let update = course.validate_patch()?;

    let updated = update_course(db, id, &update).await?;
    Ok(ApiResponse::with_message(updated, "Course updated successfully"))
}

#[delete("/<id>")]
pub async fn api_delete_course(id: i64, user: User, db: &State<Pool<Sqlite>>) -> ApiResult<()> {
    user.require_permission(Permission::ManageContent)?;

    delete_course(db, id).await?;
    Ok(ApiResponse::with_message((), "Course deleted successfully"))
}
