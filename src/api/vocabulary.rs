use rocket::State;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Permission, User};
use crate::db::{
    SoundGroupInput, SoundGroupUpdate, SoundInput, SoundUpdate, add_sound_to_group,
    create_sound, create_sound_group, delete_sound, delete_sound_group, get_sound,
    get_sound_group, list_sound_groups, list_sounds, remove_sound_from_group, update_sound,
    update_sound_group,
};
use crate::models::{SoundGroupWithSounds, SoundType, SoundWithGroups};
use crate::validation::{JsonPatchExt, JsonValidateExt};

use super::{ApiResponse, ApiResult};

#[derive(FromForm)]
pub struct SoundQuery {
    #[field(name = "type")]
    sound_type: Option<SoundType>,
}

#[get("/groups")]
pub async fn api_list_sound_groups(
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<SoundGroupWithSounds>> {
    Ok(ApiResponse::ok(list_sound_groups(db).await?))
}

#[get("/groups/<id>")]
pub async fn api_get_sound_group(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<SoundGroupWithSounds> {
    Ok(ApiResponse::ok(get_sound_group(db, id).await?))
}

#[post("/groups", data = "<group>")]
pub async fn api_create_sound_group(
    group: Json<SoundGroupInput>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<SoundGroupWithSounds> {
    user.require_permission(Permission::ManageVocabulary)?;
    let input = group.validate_custom()?;

    let created = create_sound_group(db, &input).await?;
    Ok(ApiResponse::with_message(created, "Sound group created successfully"))
}

#[put("/groups/<id>", data = "<group>")]
pub async fn api_update_sound_group(
    id: i64,
    group: Json<SoundGroupUpdate>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<SoundGroupWithSounds> {
    user.require_permission(Permission::ManageVocabulary)?;
    let update = group.validate_patch()?;

    let updated = update_sound_group(db, id, &update).await?;
    Ok(ApiResponse::with_message(updated, "Sound group updated successfully"))
}

#[delete("/groups/<id>")]
pub async fn api_delete_sound_group(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<()> {
    user.require_permission(Permission::ManageVocabulary)?;

    delete_sound_group(db, id).await?;
    Ok(ApiResponse::with_message((), "Sound group deleted successfully"))
}

#[get("/sounds?<params..>")]
pub async fn api_list_sounds(
    params: SoundQuery,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<SoundWithGroups>> {
    Ok(ApiResponse::ok(list_sounds(db, params.sound_type).await?))
}

#[get("/sounds/<id>")]
pub async fn api_get_sound(id: i64, db: &State<Pool<Sqlite>>) -> ApiResult<SoundWithGroups> {
    Ok(ApiResponse::ok(get_sound(db, id).await?))
}

#[post("/sounds", data = "<sound>")]
pub async fn api_create_sound(
    sound: Json<SoundInput>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<SoundWithGroups> {
    user.require_permission(Permission::ManageVocabulary)?;
    let input = sound.validate_custom()?;

    let created = create_sound(db, &input).await?;
    Ok(ApiResponse::with_message(created, "Sound created successfully"))
}

#[put("/sounds/<id>", data = "<sound>")]
pub async fn api_update_sound(
    id: i64,
    sound: Json<SoundUpdate>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<SoundWithGroups> {
    user.require_permission(Permission::ManageVocabulary)?;
    let update = sound.validate_patch()?;

    let updated = update_sound(db, id, &update).await?;
    Ok(ApiResponse::with_message(updated, "Sound updated successfully"))
}

#[delete("/sounds/<id>")]
pub async fn api_delete_sound(id: i64, user: User, db: &State<Pool<Sqlite>>) -> ApiResult<()> {
    user.require_permission(Permission::ManageVocabulary)?;

    delete_sound(db, id).await?;
    Ok(ApiResponse::with_message((), "Sound deleted successfully"))
}

#[post("/sounds/<sound_id>/groups/<group_id>")]
pub async fn api_add_sound_to_group(
    sound_id: i64,
    group_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<SoundWithGroups> {
    user.require_permission(Permission::ManageVocabulary)?;

    let sound = add_sound_to_group(db, sound_id, group_id).await?;
    Ok(ApiResponse::with_message(sound, "Sound added to group successfully"))
}

#[delete("/sounds/<sound_id>/groups/<group_id>")]
pub async fn api_remove_sound_from_group(
    sound_id: i64,
    group_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<()> {
    user.require_permission(Permission::ManageVocabulary)?;

    remove_sound_from_group(db, sound_id, group_id).await?;
    Ok(ApiResponse::with_message(
        (),
        "Sound removed from group successfully",
    ))
}
