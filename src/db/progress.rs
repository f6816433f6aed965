use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use crate::answers::{Answer, evaluate};
use crate::auth::{DbUser, User};
use crate::error::AppError;
use crate::gamification::{
    LevelUp, attempt_score, check_level_up, heart_change, next_answer_streak,
    required_xp_for_level, streak_multiplier, xp_with_multiplier,
};
use crate::models::{
    Course, DbExercise, DbExerciseProgress, Exercise, ExerciseProgress, ExerciseWithOptions,
    Lesson, Module, PublicOption,
};

use super::courses::{get_course, list_courses};
use super::exercises::{EXERCISE_COLUMNS, exercises_for_lesson};
use super::lessons::list_lessons;
use super::modules::{get_module, list_modules};
use super::options::fetch_options;
use super::users::USER_COLUMNS;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub xp_reward: i64,
    pub base_xp_reward: i64,
    pub streak_multiplier: f64,
    pub current_streak: i64,
    pub is_new_completion: bool,
    pub level_up: LevelUp,
    pub correct_answer: Option<String>,
    pub feedback: String,
    pub completion_message: Option<String>,
    pub score: i64,
    pub attempts: i64,
    pub hearts: i64,
    pub heart_change: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseStatus {
    #[serde(flatten)]
    pub exercise: ExerciseWithOptions<PublicOption>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonStatus {
    pub exercises: Vec<ExerciseStatus>,
    pub progress: f64,
    pub completed_exercises: i64,
    pub total_exercises: i64,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl CourseStatus {
    pub fn from_counts(completed: i64, total: i64) -> Self {
        if total > 0 && completed >= total {
            CourseStatus::Completed
        } else if completed > 0 {
            CourseStatus::InProgress
        } else {
            CourseStatus::NotStarted
        }
    }

    pub fn action_label(&self) -> &'static str {
        match self {
            CourseStatus::NotStarted => "Start",
            CourseStatus::InProgress => "Continue",
            CourseStatus::Completed => "Review",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub completed_exercises: i64,
    pub total_exercises: i64,
    pub progress: f64,
    pub is_completed: bool,
    pub is_locked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    #[serde(flatten)]
    pub module: Module,
    pub lessons: Vec<LessonProgress>,
    pub completed_exercises: i64,
    pub total_exercises: i64,
    pub progress: f64,
    pub is_completed: bool,
    pub is_locked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleProgress>,
    pub completed_exercises: i64,
    pub total_exercises: i64,
    pub progress: f64,
    pub is_completed: bool,
    pub status: CourseStatus,
    pub action_label: String,
}

fn ratio(completed: i64, total: i64) -> f64 {
    if total > 0 {
        completed as f64 / total as f64
    } else {
        0.0
    }
}

fn is_complete(completed: i64, total: i64) -> bool {
    total > 0 && completed >= total
}

async fn fetch_progress(
    conn: &mut SqliteConnection,
    user_id: i64,
    exercise_id: i64,
) -> Result<Option<ExerciseProgress>, AppError> {
    let row = sqlx::query_as::<_, DbExerciseProgress>(
        "SELECT id, user_id, exercise_id, completed, completed_at, attempts, score
         FROM exercise_progress WHERE user_id = ? AND exercise_id = ?",
    )
    .bind(user_id)
    .bind(exercise_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(ExerciseProgress::from))
}

/// Completed and total exercise counts per lesson for one user.
async fn lesson_counts(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<HashMap<i64, (i64, i64)>, AppError> {
    let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
        "SELECT e.lesson_id,
                COUNT(CASE WHEN ep.completed THEN 1 END),
                COUNT(e.id)
         FROM exercises e
         LEFT JOIN exercise_progress ep ON ep.exercise_id = e.id AND ep.user_id = ?
         GROUP BY e.lesson_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(lesson_id, completed, total)| (lesson_id, (completed, total)))
        .collect())
}

/// Scores one answer and applies its effects on progress, XP, hearts and
/// the answer streak in a single transaction.
#[instrument(skip(pool, answer))]
pub async fn record_answer(
    pool: &Pool<Sqlite>,
    user_id: i64,
    exercise_id: i64,
    answer: &Answer,
    time_taken: Option<i64>,
) -> Result<AnswerOutcome, AppError> {
    info!("Checking answer");

    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {} FROM exercises WHERE id = ?", EXERCISE_COLUMNS);
    let exercise = sqlx::query_as::<_, DbExercise>(&sql)
        .bind(exercise_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(Exercise::from)
        .ok_or_else(|| AppError::NotFound(format!("Exercise with id {} not found", exercise_id)))?;

    let options = fetch_options(&mut tx, exercise_id).await?;
    let evaluation = evaluate(exercise.exercise_type, &options, answer);
    let is_correct = evaluation.is_correct;

    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let user = sqlx::query_as::<_, DbUser>(&sql)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(User::from)
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;

    let existing = fetch_progress(&mut tx, user_id, exercise_id).await?;
    let already_completed = existing.as_ref().is_some_and(|p| p.completed);
    let is_new_completion = is_correct && !already_completed;

    let hearts_delta = heart_change(is_correct, already_completed, user.hearts);
    let hearts = user.hearts + hearts_delta;
    let answer_streak = next_answer_streak(is_correct, already_completed, user.answer_streak);

    let base_xp_reward = if is_correct { exercise.xp_reward } else { 0 };
    let multiplier = if is_correct {
        streak_multiplier(answer_streak)
    } else {
        1.0
    };
    let xp_reward = if is_new_completion {
        xp_with_multiplier(base_xp_reward, answer_streak)
    } else {
        0
    };

    let level_up = if is_correct {
        check_level_up(user.level, user.xp + xp_reward)
    } else {
        LevelUp {
            leveled_up: false,
            new_level: user.level,
            xp_for_next_level: required_xp_for_level(user.level + 1),
        }
    };

    let attempts = existing.as_ref().map_or(0, |p| p.attempts) + 1;
    let score = attempt_score(is_correct, attempts, time_taken, exercise.time_limit);
    let stored_score = if is_correct {
        score
    } else {
        existing.as_ref().map_or(0, |p| p.score)
    };
    let completed_at: Option<NaiveDateTime> = match &existing {
        Some(p) if p.completed => p.completed_at.map(|at| at.naive_utc()),
        _ if is_correct => Some(Utc::now().naive_utc()),
        _ => None,
    };

    sqlx::query(
        "INSERT INTO exercise_progress (user_id, exercise_id, completed, completed_at, attempts, score)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (user_id, exercise_id) DO UPDATE SET
            completed = excluded.completed,
            completed_at = excluded.completed_at,
            attempts = excluded.attempts,
            score = excluded.score,
            updated_at = CURRENT_TIMESTAMP",
    )
    .bind(user_id)
    .bind(exercise_id)
    .bind(already_completed || is_correct)
    .bind(completed_at)
    .bind(attempts)
    .bind(stored_score)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE users SET xp = xp + ?, level = ?, hearts = ?, answer_streak = ?,
         updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(xp_reward)
    .bind(level_up.new_level)
    .bind(hearts)
    .bind(answer_streak)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let completion_message = if is_correct {
        let (completed, total): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(CASE WHEN ep.completed THEN 1 END), COUNT(e.id)
             FROM exercises e
             LEFT JOIN exercise_progress ep ON ep.exercise_id = e.id AND ep.user_id = ?
             WHERE e.lesson_id = ?",
        )
        .bind(user_id)
        .bind(exercise.lesson_id)
        .fetch_one(&mut *tx)
        .await?;

        if is_complete(completed, total) {
            let (title,): (String,) = sqlx::query_as("SELECT title FROM lessons WHERE id = ?")
                .bind(exercise.lesson_id)
                .fetch_one(&mut *tx)
                .await?;
            Some(format!(
                "Congratulations! You've completed all exercises in \"{}\" lesson. \
                 You can now move to the next lesson or practice this one again.",
                title
            ))
        } else {
            None
        }
    } else {
        None
    };

    tx.commit().await?;

    info!(is_correct, xp_reward, hearts, "Answer recorded");

    Ok(AnswerOutcome {
        is_correct,
        xp_reward,
        base_xp_reward,
        streak_multiplier: multiplier,
        current_streak: answer_streak,
        is_new_completion,
        level_up,
        correct_answer: evaluation.correct_answer,
        feedback: if is_correct { "Correct!" } else { "Uh Oh. Try again." }.to_string(),
        completion_message,
        score,
        attempts,
        hearts,
        heart_change: hearts_delta,
    })
}

#[instrument(skip(pool))]
pub async fn lesson_status(
    pool: &Pool<Sqlite>,
    user_id: i64,
    lesson_id: i64,
) -> Result<LessonStatus, AppError> {
    info!("Fetching lesson status");

    let exercises = exercises_for_lesson(pool, lesson_id).await?;
    let mut conn = pool.acquire().await?;
    let mut statuses = Vec::with_capacity(exercises.len());

    for item in exercises {
        let progress = fetch_progress(&mut conn, user_id, item.exercise.id)
            .await?
            .filter(|p| p.completed);

        statuses.push(ExerciseStatus {
            exercise: ExerciseWithOptions {
                exercise: item.exercise,
                options: item.options.into_iter().map(PublicOption::from).collect(),
            },
            is_completed: progress.is_some(),
            completed_at: progress.and_then(|p| p.completed_at),
        });
    }

    let total_exercises = statuses.len() as i64;
    let completed_exercises = statuses.iter().filter(|s| s.is_completed).count() as i64;

    Ok(LessonStatus {
        exercises: statuses,
        progress: ratio(completed_exercises, total_exercises),
        completed_exercises,
        total_exercises,
        is_completed: is_complete(completed_exercises, total_exercises),
    })
}

/// Lessons are unlocked in order: each waits for the previous one, and all
/// of them wait for the module itself to unlock.
fn build_module_progress(
    module: Module,
    lessons: Vec<Lesson>,
    counts: &HashMap<i64, (i64, i64)>,
    user_xp: i64,
) -> ModuleProgress {
    let module_locked = module.is_locked_for(user_xp);
    let mut previous_blocks = false;
    let mut lesson_progress = Vec::with_capacity(lessons.len());

    for lesson in lessons {
        let (completed, total) = counts.get(&lesson.id).copied().unwrap_or((0, 0));

        lesson_progress.push(LessonProgress {
            is_locked: module_locked || previous_blocks,
            completed_exercises: completed,
            total_exercises: total,
            progress: ratio(completed, total),
            is_completed: is_complete(completed, total),
            lesson,
        });

        // Lessons without exercises do not hold back the next one.
        previous_blocks = total > 0 && completed < total;
    }

    let completed_exercises = lesson_progress.iter().map(|l| l.completed_exercises).sum();
    let total_exercises = lesson_progress.iter().map(|l| l.total_exercises).sum();

    ModuleProgress {
        module,
        lessons: lesson_progress,
        completed_exercises,
        total_exercises,
        progress: ratio(completed_exercises, total_exercises),
        is_completed: is_complete(completed_exercises, total_exercises),
        is_locked: module_locked,
    }
}

#[instrument(skip(pool, user), fields(user_id = user.id))]
pub async fn module_lessons_progress(
    pool: &Pool<Sqlite>,
    user: &User,
    module_id: i64,
) -> Result<ModuleProgress, AppError> {
    info!("Fetching module lessons with progress");

    let module = get_module(pool, module_id).await?;
    let lessons = list_lessons(pool, Some(module_id)).await?;
    let counts = lesson_counts(pool, user.id).await?;

    Ok(build_module_progress(module, lessons, &counts, user.xp))
}

async fn build_course_progress(
    pool: &Pool<Sqlite>,
    course: Course,
    counts: &HashMap<i64, (i64, i64)>,
    user_xp: i64,
) -> Result<CourseProgress, AppError> {
    let mut modules = Vec::new();

    for module in list_modules(pool, Some(course.id)).await? {
        let lessons = list_lessons(pool, Some(module.id)).await?;
        modules.push(build_module_progress(module, lessons, counts, user_xp));
    }

    let completed_exercises = modules.iter().map(|m| m.completed_exercises).sum();
    let total_exercises = modules.iter().map(|m| m.total_exercises).sum();
    let status = CourseStatus::from_counts(completed_exercises, total_exercises);

    Ok(CourseProgress {
        course,
        modules,
        completed_exercises,
        total_exercises,
        progress: ratio(completed_exercises, total_exercises),
        is_completed: status == CourseStatus::Completed,
        action_label: status.action_label().to_string(),
        status,
    })
}

#[instrument(skip(pool, user), fields(user_id = user.id))]
pub async fn course_progress(
    pool: &Pool<Sqlite>,
    user: &User,
    course_id: i64,
) -> Result<CourseProgress, AppError> {
    info!("Fetching course progress");

    let course = get_course(pool, course_id).await?;
    let counts = lesson_counts(pool, user.id).await?;

    build_course_progress(pool, course, &counts, user.xp).await
}

#[instrument(skip(pool, user), fields(user_id = user.id))]
pub async fn all_courses_progress(
    pool: &Pool<Sqlite>,
    user: &User,
) -> Result<Vec<CourseProgress>, AppError> {
    info!("Fetching progress for all courses");

    let counts = lesson_counts(pool, user.id).await?;
    let mut result = Vec::new();

    for course in list_courses(pool, None, None).await? {
        if course.is_active {
            result.push(build_course_progress(pool, course, &counts, user.xp).await?);
        }
    }

    Ok(result)
}
