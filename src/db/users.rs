use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument, warn};

use crate::auth::{DbUser, Role, User};
use crate::error::AppError;
use crate::gamification::next_login_streak;
use crate::practice::DailyGoal;

pub(crate) const USER_COLUMNS: &str = "id, clerk_id, email, username, first_name, last_name, role, \
     level, xp, streak, answer_streak, hearts, last_login, daily_goal_type, daily_goal_target, \
     created_at";

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: Role,
}

/// Identity data sent by the frontend after a Clerk sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClerkProfile {
    pub clerk_user_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub xp: i64,
    pub level: i64,
    pub streak: i64,
}

async fn fetch_user_where(
    conn: &mut SqliteConnection,
    clause: &str,
    value: &str,
) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, clause);
    let row = sqlx::query_as::<_, DbUser>(&sql)
        .bind(value)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(User::from))
}

#[instrument]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query_as::<_, DbUser>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn find_user_by_clerk_id(
    pool: &Pool<Sqlite>,
    clerk_id: &str,
) -> Result<Option<User>, AppError> {
    info!("Fetching user by Clerk ID");
    let mut conn = pool.acquire().await?;
    fetch_user_where(&mut conn, "clerk_id", clerk_id).await
}

#[instrument(skip(pool))]
pub async fn find_user_by_email(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<User>, AppError> {
    info!("Fetching user by email");
    let mut conn = pool.acquire().await?;
    fetch_user_where(&mut conn, "email", email).await
}

#[instrument(skip(pool))]
pub async fn username_exists(pool: &Pool<Sqlite>, username: &str) -> Result<bool, AppError> {
    let mut conn = pool.acquire().await?;
    Ok(fetch_user_where(&mut conn, "username", username)
        .await?
        .is_some())
}

#[instrument(skip(pool, user), fields(email = %user.email, username = %user.username))]
pub async fn create_user(pool: &Pool<Sqlite>, user: NewUser<'_>) -> Result<i64, AppError> {
    info!("Creating new user");

    if find_user_by_email(pool, user.email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }
    if username_exists(pool, user.username).await? {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }

    let hashed_password = if user.password.is_empty() {
        String::new()
    } else {
        bcrypt::hash(user.password, bcrypt::DEFAULT_COST)?
    };

    let res = sqlx::query(
        "INSERT INTO users (email, username, password, first_name, last_name, role)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user.email)
    .bind(user.username)
    .bind(hashed_password)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.role.as_str())
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, password))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");

    let row: Option<(i64, String)> =
        sqlx::query_as("SELECT id, password FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;

    let Some((id, hash)) = row else {
        return Ok(None);
    };

    // Clerk-only accounts have no local password.
    if hash.is_empty() || !bcrypt::verify(password, &hash)? {
        return Ok(None);
    }

    Ok(Some(get_user(pool, id).await?))
}

/// Stamps a login and rolls the daily streak forward.
#[instrument(skip(pool))]
pub async fn record_login(
    pool: &Pool<Sqlite>,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    info!("Recording login");
    let user = get_user(pool, user_id).await?;
    let streak = next_login_streak(user.last_login, user.streak, now);

    sqlx::query(
        "UPDATE users SET last_login = ?, streak = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(now.naive_utc())
    .bind(streak)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_user(pool, user_id).await
}

async fn has_local_password(conn: &mut SqliteConnection, user_id: i64) -> Result<bool, AppError> {
    let (password,): (String,) = sqlx::query_as("SELECT password FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(conn)
        .await?;

    Ok(!password.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

async fn unique_username(
    conn: &mut SqliteConnection,
    profile: &ClerkProfile,
) -> Result<String, AppError> {
    let suffix: String = {
        let chars: Vec<char> = profile.clerk_user_id.chars().collect();
        chars[chars.len().saturating_sub(8)..].iter().collect()
    };
    let requested = non_empty(profile.username.as_deref());

    let mut candidate = match requested {
        Some(username) => username.to_string(),
        None => format!("user_{}", suffix),
    };

    let mut counter = 1;
    while fetch_user_where(conn, "username", &candidate)
        .await?
        .is_some()
    {
        candidate = format!("{}_{}_{}", requested.unwrap_or("user"), suffix, counter);
        counter += 1;
    }

    Ok(candidate)
}

/// Links a Clerk identity to a local user, by Clerk id first and then by
/// email, creating the user when neither matches.
#[instrument(skip(pool, profile), fields(clerk_id = %profile.clerk_user_id))]
pub async fn sync_clerk_user(
    pool: &Pool<Sqlite>,
    profile: &ClerkProfile,
) -> Result<User, AppError> {
    info!("Syncing user with Clerk");

    let first_name = non_empty(profile.first_name.as_deref());
    let last_name = non_empty(profile.last_name.as_deref());
    let mut tx = pool.begin().await?;

    let user_id = if let Some(user) =
        fetch_user_where(&mut tx, "clerk_id", &profile.clerk_user_id).await?
    {
        let username = match non_empty(profile.username.as_deref()) {
            Some(name) if name != user.username => {
                if fetch_user_where(&mut tx, "username", name).await?.is_some() {
                    return Err(AppError::Conflict("Username is already taken".to_string()));
                }
                name.to_string()
            }
            _ => user.username.clone(),
        };

        let email_owner = fetch_user_where(&mut tx, "email", &profile.email).await?;
        if email_owner.is_some_and(|owner| owner.id != user.id) {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        sqlx::query(
            "UPDATE users SET email = ?, first_name = ?, last_name = ?, username = ?,
             updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(&profile.email)
        .bind(first_name.unwrap_or(&user.first_name))
        .bind(last_name.unwrap_or(&user.last_name))
        .bind(username)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

        user.id
    } else if let Some(user) = fetch_user_where(&mut tx, "email", &profile.email).await? {
        // The email in the body is not covered by the token, so only accounts
        // with no other way in may be claimed.
        if user.clerk_id.is_some()
            || user.role == Role::Admin
            || has_local_password(&mut tx, user.id).await?
        {
            warn!(user_id = user.id, "Refusing to link Clerk identity to existing account");
            return Err(AppError::Conflict(
                "Email is already registered to another account".to_string(),
            ));
        }

        info!(user_id = user.id, "Linking existing account to Clerk");

        sqlx::query(
            "UPDATE users SET clerk_id = ?, first_name = ?, last_name = ?,
             updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(&profile.clerk_user_id)
        .bind(first_name.unwrap_or(&user.first_name))
        .bind(last_name.unwrap_or(&user.last_name))
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

        user.id
    } else {
        let username = unique_username(&mut tx, profile).await?;
        info!(username = %username, "Creating user for Clerk identity");

        sqlx::query(
            "INSERT INTO users (clerk_id, email, username, password, first_name, last_name, role)
             VALUES (?, ?, ?, '', ?, ?, 'learner')",
        )
        .bind(&profile.clerk_user_id)
        .bind(&profile.email)
        .bind(username)
        .bind(first_name.unwrap_or_default())
        .bind(last_name.unwrap_or_default())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid()
    };

    tx.commit().await?;

    record_login(pool, user_id, Utc::now()).await
}

#[instrument]
pub async fn get_leaderboard(
    pool: &Pool<Sqlite>,
    limit: i64,
) -> Result<Vec<LeaderboardEntry>, AppError> {
    info!("Fetching leaderboard");

    let rows: Vec<(i64, String, String, String, i64, i64, i64)> = sqlx::query_as(
        "SELECT id, username, first_name, last_name, xp, level, streak
         FROM users ORDER BY xp DESC, level DESC, id ASC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(
            |(i, (id, username, first_name, last_name, xp, level, streak))| LeaderboardEntry {
                rank: i as i64 + 1,
                id,
                username,
                first_name,
                last_name,
                xp,
                level,
                streak,
            },
        )
        .collect())
}

#[instrument(skip(pool))]
pub async fn update_daily_goal(
    pool: &Pool<Sqlite>,
    user_id: i64,
    goal: DailyGoal,
) -> Result<(), AppError> {
    info!("Updating daily goal");

    sqlx::query(
        "UPDATE users SET daily_goal_type = ?, daily_goal_target = ?,
         updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(goal.goal_type.as_str())
    .bind(goal.target)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}
