#[macro_use]
extern crate rocket;

pub mod answers;
pub mod api;
pub mod auth;
pub mod config;
pub mod cors;
pub mod database;
pub mod db;
pub mod env;
pub mod error;
pub mod gamification;
pub mod lesson_flow;
pub mod models;
pub mod practice;
pub mod seed;
pub mod speech;
pub mod telemetry;
pub mod validation;
#[cfg(test)]
mod test;

use rocket::figment::Figment;
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use tracing::info;

use api::{
    courses, exercises, health, lessons, modules, options, speech as speech_api, users,
    vocabulary,
};
use auth::{
    ClerkVerifier, bad_request_api, default_api, forbidden_api, not_found_api, unauthorized_api,
    unprocessable_api,
};
use config::AppConfig;
use cors::Cors;
use error::AppError;
use telemetry::TelemetryFairing;

/// Builds the application around an already migrated pool.
pub fn init_rocket(pool: SqlitePool, figment: Figment) -> Result<Rocket<Build>, AppError> {
    let config = AppConfig::from_figment(&figment)
        .map_err(|e| AppError::Internal(format!("Invalid configuration: {}", e)))?;
    let clerk = ClerkVerifier::from_config(&config)?;

    info!(
        frontend_url = %config.frontend_url,
        clerk_enabled = clerk.is_enabled(),
        "Starting German Gains"
    );

    let cors = Cors::new(config.frontend_url.clone());

    Ok(rocket::custom(figment)
        .manage(pool)
        .manage(config)
        .manage(clerk)
        .mount("/api", routes![health::health])
        .mount(
            "/api/courses",
            routes![
                courses::api_list_courses,
                courses::api_all_courses_progress,
                courses::api_get_course,
                courses::api_course_progress,
                courses::api_create_course,
                courses::api_update_course,
                courses::api_delete_course,
            ],
        )
        .mount(
            "/api/modules",
            routes![
                modules::api_list_modules,
                modules::api_get_module,
                modules::api_modules_for_course,
                modules::api_create_module,
                modules::api_update_module,
                modules::api_delete_module,
            ],
        )
        .mount(
            "/api/lesson",
            routes![
                lessons::api_list_lessons,
                lessons::api_get_lesson,
                lessons::api_lessons_for_module,
                lessons::api_module_lessons_progress,
                lessons::api_create_lesson,
                lessons::api_update_lesson,
                lessons::api_delete_lesson,
            ],
        )
        .mount(
            "/api/exercises",
            routes![
                exercises::api_list_exercises,
                exercises::api_get_exercise,
                exercises::api_get_exercise_admin,
                exercises::api_exercises_for_lesson,
                exercises::api_lesson_status,
                exercises::api_check_answer,
                exercises::api_create_exercise,
                exercises::api_update_exercise,
                exercises::api_delete_exercise,
            ],
        )
        .mount(
            "/api/exercise-options",
            routes![
                options::api_options_for_exercise,
                options::api_options_for_exercise_admin,
                options::api_get_option,
                options::api_create_option,
                options::api_update_option,
                options::api_delete_option,
            ],
        )
        .mount(
            "/api/vocabulary",
            routes![
                vocabulary::api_list_sound_groups,
                vocabulary::api_get_sound_group,
                vocabulary::api_create_sound_group,
                vocabulary::api_update_sound_group,
                vocabulary::api_delete_sound_group,
                vocabulary::api_list_sounds,
                vocabulary::api_get_sound,
                vocabulary::api_create_sound,
                vocabulary::api_update_sound,
                vocabulary::api_delete_sound,
                vocabulary::api_add_sound_to_group,
                vocabulary::api_remove_sound_from_group,
            ],
        )
        .mount(
            "/api/users",
            routes![
                users::api_register,
                users::api_login,
                users::api_sync_clerk,
                users::api_logout,
                users::api_me,
                users::api_leaderboard,
                users::api_record_practice,
                users::api_practice_log,
                users::api_practice_summary,
                users::api_get_daily_goal,
                users::api_update_daily_goal,
                users::api_favorites,
                users::api_toggle_favorite,
            ],
        )
        .mount(
            "/api/speak",
            routes![
                speech_api::api_list_phrases,
                speech_api::api_score_pronunciation,
            ],
        )
        .register(
            "/api",
            catchers![
                bad_request_api,
                unauthorized_api,
                forbidden_api,
                not_found_api,
                unprocessable_api,
                default_api,
            ],
        )
        .attach(TelemetryFairing)
        .attach(cors))
}
