use serde::Deserialize;
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};
use validator::Validate;

use crate::error::AppError;
use crate::models::{
    DbGermanSound, DbSoundGroup, GermanSound, SoundGroup, SoundGroupWithSounds, SoundType,
    SoundWithGroups,
};
use crate::validation::Patch;

const GROUP_COLUMNS: &str = "g.id, g.name, g.description, g.\"order\"";
const SOUND_COLUMNS: &str = "s.id, s.symbol, s.example_word, s.type AS sound_type, s.audio_src";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SoundGroupInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SoundGroupUpdate {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
}

impl Patch for SoundGroupUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.order.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SoundInput {
    #[validate(length(min = 1, message = "Symbol is required"))]
    pub symbol: String,
    #[validate(length(min = 1, message = "Example word is required"))]
    pub example_word: String,
    #[serde(rename = "type")]
    pub sound_type: SoundType,
    pub audio_src: Option<String>,
    #[serde(default)]
    pub group_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SoundUpdate {
    #[validate(length(min = 1, message = "Symbol cannot be empty"))]
    pub symbol: Option<String>,
    #[validate(length(min = 1, message = "Example word cannot be empty"))]
    pub example_word: Option<String>,
    #[serde(rename = "type")]
    pub sound_type: Option<SoundType>,
    pub audio_src: Option<String>,
    /// Replaces every group membership of the sound when present.
    pub group_ids: Option<Vec<i64>>,
}

impl Patch for SoundUpdate {
    fn is_empty(&self) -> bool {
        self.symbol.is_none()
            && self.example_word.is_none()
            && self.sound_type.is_none()
            && self.audio_src.is_none()
            && self.group_ids.is_none()
    }
}

async fn sounds_in_group(
    conn: &mut SqliteConnection,
    group_id: i64,
) -> Result<Vec<GermanSound>, AppError> {
    let sql = format!(
        "SELECT {} FROM german_sounds s
         JOIN sound_group_sounds gs ON gs.sound_id = s.id
         WHERE gs.group_id = ? ORDER BY s.id ASC",
        SOUND_COLUMNS
    );
    let rows = sqlx::query_as::<_, DbGermanSound>(&sql)
        .bind(group_id)
        .fetch_all(conn)
        .await?;

    Ok(rows.into_iter().map(GermanSound::from).collect())
}

async fn groups_of_sound(
    conn: &mut SqliteConnection,
    sound_id: i64,
) -> Result<Vec<SoundGroup>, AppError> {
    let sql = format!(
        "SELECT {} FROM sound_groups g
         JOIN sound_group_sounds gs ON gs.group_id = g.id
         WHERE gs.sound_id = ? ORDER BY g.\"order\" ASC, g.id ASC",
        GROUP_COLUMNS
    );
    let rows = sqlx::query_as::<_, DbSoundGroup>(&sql)
        .bind(sound_id)
        .fetch_all(conn)
        .await?;

    Ok(rows.into_iter().map(SoundGroup::from).collect())
}

async fn fetch_group(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<SoundGroup, AppError> {
    let sql = format!("SELECT {} FROM sound_groups g WHERE g.id = ?", GROUP_COLUMNS);
    sqlx::query_as::<_, DbSoundGroup>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .map(SoundGroup::from)
        .ok_or_else(|| AppError::NotFound(format!("Sound group with id {} not found", id)))
}

async fn fetch_sound(conn: &mut SqliteConnection, id: i64) -> Result<GermanSound, AppError> {
    let sql = format!("SELECT {} FROM german_sounds s WHERE s.id = ?", SOUND_COLUMNS);
    sqlx::query_as::<_, DbGermanSound>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .map(GermanSound::from)
        .ok_or_else(|| AppError::NotFound(format!("Sound with id {} not found", id)))
}

async fn replace_memberships(
    conn: &mut SqliteConnection,
    sound_id: i64,
    group_ids: &[i64],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sound_group_sounds WHERE sound_id = ?")
        .bind(sound_id)
        .execute(&mut *conn)
        .await?;

    for group_id in group_ids {
        fetch_group(conn, *group_id).await?;
        sqlx::query("INSERT OR IGNORE INTO sound_group_sounds (sound_id, group_id) VALUES (?, ?)")
            .bind(sound_id)
            .bind(group_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn list_sound_groups(
    pool: &Pool<Sqlite>,
) -> Result<Vec<SoundGroupWithSounds>, AppError> {
    info!("Listing sound groups");

    let sql = format!(
        "SELECT {} FROM sound_groups g ORDER BY g.\"order\" ASC, g.id ASC",
        GROUP_COLUMNS
    );
    let groups = sqlx::query_as::<_, DbSoundGroup>(&sql)
        .fetch_all(pool)
        .await?;

    let mut conn = pool.acquire().await?;
    let mut result = Vec::with_capacity(groups.len());
    for group in groups.into_iter().map(SoundGroup::from) {
        let sounds = sounds_in_group(&mut conn, group.id).await?;
        result.push(SoundGroupWithSounds { group, sounds });
    }

    Ok(result)
}

#[instrument(skip(pool))]
pub async fn get_sound_group(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<SoundGroupWithSounds, AppError> {
    info!("Fetching sound group");

    let mut conn = pool.acquire().await?;
    let group = fetch_group(&mut conn, id).await?;
    let sounds = sounds_in_group(&mut conn, id).await?;

    Ok(SoundGroupWithSounds { group, sounds })
}

#[instrument(skip(pool, input), fields(name = %input.name))]
pub async fn create_sound_group(
    pool: &Pool<Sqlite>,
    input: &SoundGroupInput,
) -> Result<SoundGroupWithSounds, AppError> {
    info!("Creating sound group");

    let id = sqlx::query("INSERT INTO sound_groups (name, description, \"order\") VALUES (?, ?, ?)")
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.order.unwrap_or(0))
        .execute(pool)
        .await?
        .last_insert_rowid();

    get_sound_group(pool, id).await
}

#[instrument(skip(pool, update))]
pub async fn update_sound_group(
    pool: &Pool<Sqlite>,
    id: i64,
    update: &SoundGroupUpdate,
) -> Result<SoundGroupWithSounds, AppError> {
    info!("Updating sound group");

    let res = sqlx::query(
        "UPDATE sound_groups SET
            name = COALESCE(?, name),
            description = COALESCE(?, description),
            \"order\" = COALESCE(?, \"order\")
         WHERE id = ?",
    )
    .bind(&update.name)
    .bind(&update.description)
    .bind(update.order)
    .bind(id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Sound group with id {} not found", id)));
    }

    get_sound_group(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_sound_group(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting sound group");

    let res = sqlx::query("DELETE FROM sound_groups WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Sound group with id {} not found", id)));
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn list_sounds(
    pool: &Pool<Sqlite>,
    sound_type: Option<SoundType>,
) -> Result<Vec<SoundWithGroups>, AppError> {
    info!("Listing sounds");

    let sql = format!(
        "SELECT {} FROM german_sounds s WHERE (?1 IS NULL OR s.type = ?1) ORDER BY s.id ASC",
        SOUND_COLUMNS
    );
    let sounds = sqlx::query_as::<_, DbGermanSound>(&sql)
        .bind(sound_type.map(|t| t.as_str()))
        .fetch_all(pool)
        .await?;

    let mut conn = pool.acquire().await?;
    let mut result = Vec::with_capacity(sounds.len());
    for sound in sounds.into_iter().map(GermanSound::from) {
        let groups = groups_of_sound(&mut conn, sound.id).await?;
        result.push(SoundWithGroups { sound, groups });
    }

    Ok(result)
}

#[instrument(skip(pool))]
pub async fn get_sound(pool: &Pool<Sqlite>, id: i64) -> Result<SoundWithGroups, AppError> {
    info!("Fetching sound");

    let mut conn = pool.acquire().await?;
    let sound = fetch_sound(&mut conn, id).await?;
    let groups = groups_of_sound(&mut conn, id).await?;

    Ok(SoundWithGroups { sound, groups })
}

#[instrument(skip(pool, input), fields(symbol = %input.symbol))]
pub async fn create_sound(
    pool: &Pool<Sqlite>,
    input: &SoundInput,
) -> Result<SoundWithGroups, AppError> {
    info!("Creating sound");

    let mut tx = pool.begin().await?;

    let id = sqlx::query(
        "INSERT INTO german_sounds (symbol, example_word, type, audio_src) VALUES (?, ?, ?, ?)",
    )
    .bind(&input.symbol)
    .bind(&input.example_word)
    .bind(input.sound_type.as_str())
    .bind(&input.audio_src)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    replace_memberships(&mut tx, id, &input.group_ids).await?;

    tx.commit().await?;

    get_sound(pool, id).await
}

#[instrument(skip(pool, update))]
pub async fn update_sound(
    pool: &Pool<Sqlite>,
    id: i64,
    update: &SoundUpdate,
) -> Result<SoundWithGroups, AppError> {
    info!("Updating sound");

    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "UPDATE german_sounds SET
            symbol = COALESCE(?, symbol),
            example_word = COALESCE(?, example_word),
            type = COALESCE(?, type),
            audio_src = COALESCE(?, audio_src)
         WHERE id = ?",
    )
    .bind(&update.symbol)
    .bind(&update.example_word)
    .bind(update.sound_type.map(|t| t.as_str()))
    .bind(&update.audio_src)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Sound with id {} not found", id)));
    }

    if let Some(group_ids) = &update.group_ids {
        replace_memberships(&mut tx, id, group_ids).await?;
    }

    tx.commit().await?;

    get_sound(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_sound(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting sound");

    let res = sqlx::query("DELETE FROM german_sounds WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Sound with id {} not found", id)));
    }

    Ok(())
}

/// Idempotent: linking an already linked pair is not an error.
#[instrument(skip(pool))]
pub async fn add_sound_to_group(
    pool: &Pool<Sqlite>,
    sound_id: i64,
    group_id: i64,
) -> Result<SoundWithGroups, AppError> {
    info!("Adding sound to group");

    let mut conn = pool.acquire().await?;
    fetch_sound(&mut conn, sound_id).await?;
    fetch_group(&mut conn, group_id).await?;

    sqlx::query("INSERT OR IGNORE INTO sound_group_sounds (sound_id, group_id) VALUES (?, ?)")
        .bind(sound_id)
        .bind(group_id)
        .execute(&mut *conn)
        .await?;

    drop(conn);
    get_sound(pool, sound_id).await
}

#[instrument(skip(pool))]
pub async fn remove_sound_from_group(
    pool: &Pool<Sqlite>,
    sound_id: i64,
    group_id: i64,
) -> Result<(), AppError> {
    info!("Removing sound from group");

    let res = sqlx::query("DELETE FROM sound_group_sounds WHERE sound_id = ? AND group_id = ?")
        .bind(sound_id)
        .bind(group_id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Sound {} is not associated with group {}",
            sound_id, group_id
        )));
    }

    Ok(())
}
