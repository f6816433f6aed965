use chrono::Utc;
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{ClerkToken, Permission, Role, SESSION_COOKIE, User, UserSession};
use crate::config::AppConfig;
use crate::db::{
    ClerkProfile, LeaderboardEntry, NewUser, authenticate_user, create_user, create_user_session,
    get_leaderboard, get_user, invalidate_session, list_favorite_words, load_practice_log,
    record_login, record_practice, sync_clerk_user, toggle_favorite_word, update_daily_goal,
};
use crate::error::AppError;
use crate::practice::{DailyGoal, PracticeDay, PracticeInput, PracticeLog, PracticeSummary};
use crate::validation::JsonValidateExt;

use super::{ApiResponse, ApiResult};

const DEFAULT_LEADERBOARD_SIZE: i64 = 10;
const MAX_LEADERBOARD_SIZE: i64 = 100;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Email must be valid"))]
    pub email: String,
    #[validate(length(
        min = 3,
        max = 30,
        message = "Username must be between 3 and 30 characters"
    ))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email must be valid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthPayload {
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoritesPayload {
    pub favorites: Vec<String>,
}

async fn open_session(
    db: &Pool<Sqlite>,
    config: &AppConfig,
    cookies: &CookieJar<'_>,
    user: &User,
) -> Result<(), AppError> {
    let token = UserSession::generate_token();
    let expires_at = Utc::now() + config.session_duration();

    create_user_session(db, user.id, &token, expires_at.naive_utc()).await?;

    cookies.add_private(
        Cookie::build((SESSION_COOKIE, token))
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(config.cookie_max_age()),
    );

    Ok(())
}

#[post("/register", data = "<request>")]
pub async fn api_register(
    request: Json<RegisterRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> ApiResult<AuthPayload> {
    let request = request.validate_custom()?;

    let user_id = create_user(
        db,
        NewUser {
            email: &request.email,
            username: &request.username,
            password: &request.password,
            first_name: &request.first_name,
            last_name: &request.last_name,
            role: Role::Learner,
        },
    )
    .await?;

    let user = record_login(db, user_id, Utc::now()).await?;
    open_session(db, config, cookies, &user).await?;

    info!(user_id = user.id, "User registered");
    Ok(ApiResponse::with_message(
        AuthPayload { user },
        "User registered successfully",
    ))
}

#[post("/login", data = "<request>")]
pub async fn api_login(
    request: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> ApiResult<AuthPayload> {
    let request = request.validate_custom()?;

    let Some(user) = authenticate_user(db, &request.email, &request.password).await? else {
        return Err(AppError::Authentication(
            "Invalid email or password".to_string(),
        ));
    };

    let user = record_login(db, user.id, Utc::now()).await?;
    open_session(db, config, cookies, &user).await?;

    Ok(ApiResponse::with_message(
        AuthPayload { user },
        "Logged in successfully",
    ))
}

#[post("/sync-clerk", data = "<profile>")]
pub async fn api_sync_clerk(
    token: ClerkToken,
    profile: Json<ClerkProfile>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> ApiResult<AuthPayload> {
    let ClerkToken(claims) = token;

    if claims.sub != profile.clerk_user_id {
        warn!(sub = %claims.sub, clerk_user_id = %profile.clerk_user_id, "Clerk subject mismatch");
        return Err(AppError::Authentication(
            "Token does not belong to this Clerk user".to_string(),
        ));
    }
    if profile.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    let user = sync_clerk_user(db, &profile).await?;
    open_session(db, config, cookies, &user).await?;

    Ok(ApiResponse::with_message(
        AuthPayload { user },
        "User synced successfully",
    ))
}

#[post("/logout")]
pub async fn api_logout(cookies: &CookieJar<'_>, db: &State<Pool<Sqlite>>) -> ApiResult<()> {
    let token = cookies
        .get_private(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        invalidate_session(db, &token).await?;
    }

    cookies.remove_private(Cookie::build(SESSION_COOKIE));

    Ok(ApiResponse::with_message((), "Logged out successfully"))
}

#[get("/me")]
pub async fn api_me(user: User) -> ApiResult<User> {
    user.require_permission(Permission::ViewOwnProfile)?;
    Ok(ApiResponse::ok(user))
}

#[get("/leaderboard?<limit>")]
pub async fn api_leaderboard(
    limit: Option<i64>,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Vec<LeaderboardEntry>> {
    let limit = limit
        .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
        .clamp(1, MAX_LEADERBOARD_SIZE);

    Ok(ApiResponse::ok(get_leaderboard(db, limit).await?))
}

#[post("/practice", data = "<input>")]
pub async fn api_record_practice(
    input: Json<PracticeInput>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<PracticeDay> {
    user.require_permission(Permission::TrackPractice)?;

    let input = input.validate_custom()?;
    let today = Utc::now().date_naive();
    let day = record_practice(db, user.id, today, &input).await?;

    Ok(ApiResponse::ok(day))
}

#[get("/practice")]
pub async fn api_practice_log(user: User, db: &State<Pool<Sqlite>>) -> ApiResult<PracticeLog> {
    user.require_permission(Permission::TrackPractice)?;

    Ok(ApiResponse::ok(load_practice_log(db, user.id).await?))
}

#[get("/practice/summary")]
pub async fn api_practice_summary(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<PracticeSummary> {
    user.require_permission(Permission::TrackPractice)?;

    let log = load_practice_log(db, user.id).await?;
    let today = Utc::now().date_naive();

    Ok(ApiResponse::ok(PracticeSummary::build(
        &log,
        today,
        user.daily_goal,
    )))
}

#[get("/daily-goal")]
pub async fn api_get_daily_goal(user: User) -> ApiResult<DailyGoal> {
    Ok(ApiResponse::ok(user.daily_goal))
}

#[put("/daily-goal", data = "<goal>")]
pub async fn api_update_daily_goal(
    goal: Json<DailyGoal>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<DailyGoal> {
    user.require_permission(Permission::EditOwnProfile)?;

    let goal = goal.into_inner();
    if goal.target <= 0 {
        return Err(AppError::Validation(
            "Daily goal target must be a positive number".to_string(),
        ));
    }

    update_daily_goal(db, user.id, goal).await?;
    let user = get_user(db, user.id).await?;

    Ok(ApiResponse::with_message(
        user.daily_goal,
        "Daily goal updated successfully",
    ))
}

#[get("/favorites")]
pub async fn api_favorites(user: User, db: &State<Pool<Sqlite>>) -> ApiResult<FavoritesPayload> {
    let favorites = list_favorite_words(db, user.id).await?;
    Ok(ApiResponse::ok(FavoritesPayload { favorites }))
}

#[post("/favorites/<word_id>")]
pub async fn api_toggle_favorite(
    word_id: &str,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<FavoritesPayload> {
    user.require_permission(Permission::TrackPractice)?;

    let favorites = toggle_favorite_word(db, user.id, word_id).await?;
    Ok(ApiResponse::ok(FavoritesPayload { favorites }))
}
