use rocket::State;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Permission, User};
use crate::db::{
    ModuleInput, ModuleUpdate, create_module, delete_module, get_module, list_modules,
    modules_for_course, update_module,
};
use crate::models::Module;
use crate::validation::{JsonPatchExt, JsonValidateExt};

use super::{ApiResponse, ApiResult};

#[derive(FromForm)]
pub struct ModuleQuery {
    #[field(name = "courseId")]
    course_id: Option<i64>,
}

#[get("/?<params..>")]
pub async fn api_list_modules(
    params: ModuleQuery,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<Module>> {
    Ok(ApiResponse::ok(list_modules(db, params.course_id).await?))
}

#[get("/<id>")]
pub async fn api_get_module(id: i64, db: &State<Pool<Sqlite>>) -> ApiResult<Module> {
    Ok(ApiResponse::ok(get_module(db, id).await?))
}

#[get("/course/<course_id>")]
pub async fn api_modules_for_course(
    course_id: i64,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<Module>> {
    Ok(ApiResponse::ok(modules_for_course(db, course_id).await?))
}

#[post("/", data = "<module>")]
pub async fn api_create_module(
    module: Json<ModuleInput>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Module> {
    user.require_permission(Permission::ManageContent)?;
    let input = module.validate_custom()?;

    let created = create_module(db, &input).await?;
    Ok(ApiResponse::with_message(created, "Module created successfully"))
}

#[put("/<id>", data = "<module>")]
pub async fn api_update_module(
    id: i64,
    module: Json<ModuleUpdate>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Module> {
    user.require_permission(Permission::ManageContent)?;
    let update = module.validate_patch()?;

    let updated = update_module(db, id, &update).await?;
    Ok(ApiResponse::with_message(updated, "Module updated successfully"))
}

#[delete("/<id>")]
pub async fn api_delete_module(id: i64, user: User, db: &State<Pool<Sqlite>>) -> ApiResult<()> {
    user.require_permission(Permission::ManageContent)?;

    delete_module(db, id).await?;
    Ok(ApiResponse::with_message((), "Module deleted successfully"))
}
