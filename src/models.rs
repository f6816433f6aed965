use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rocket::FromFormField;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

fn to_utc(dt: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, FromFormField)]
pub enum ExerciseType {
    #[default]
    #[serde(rename = "MULTIPLE_CHOICE")]
    #[field(value = "MULTIPLE_CHOICE")]
    MultipleChoice,
    #[serde(rename = "FILL_IN_BLANK")]
    #[field(value = "FILL_IN_BLANK")]
    FillInBlank,
    #[serde(rename = "VOCABULARY_CHECK")]
    #[field(value = "VOCABULARY_CHECK")]
    VocabularyCheck,
}

impl ExerciseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::MultipleChoice => "MULTIPLE_CHOICE",
            ExerciseType::FillInBlank => "FILL_IN_BLANK",
            ExerciseType::VocabularyCheck => "VOCABULARY_CHECK",
        }
    }

    /// Text answers are compared against the correct option's text, the rest
    /// by option id.
    pub fn answers_with_text(&self) -> bool {
        matches!(
            self,
            ExerciseType::FillInBlank | ExerciseType::VocabularyCheck
        )
    }
}

impl FromStr for ExerciseType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MULTIPLE_CHOICE" => Ok(ExerciseType::MultipleChoice),
            "FILL_IN_BLANK" => Ok(ExerciseType::FillInBlank),
            "VOCABULARY_CHECK" => Ok(ExerciseType::VocabularyCheck),
            _ => Err(AppError::Validation(format!("Unknown exercise type: {}", s))),
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, FromFormField)]
pub enum LanguageLevel {
    #[default]
    #[serde(rename = "A1_1")]
    #[field(value = "A1_1")]
    A1_1,
    #[serde(rename = "A1_2")]
    #[field(value = "A1_2")]
    A1_2,
    #[serde(rename = "A2_1")]
    #[field(value = "A2_1")]
    A2_1,
    #[serde(rename = "A2_2")]
    #[field(value = "A2_2")]
    A2_2,
}

impl LanguageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageLevel::A1_1 => "A1_1",
            LanguageLevel::A1_2 => "A1_2",
            LanguageLevel::A2_1 => "A2_1",
            LanguageLevel::A2_2 => "A2_2",
        }
    }
}

impl FromStr for LanguageLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A1_1" => Ok(LanguageLevel::A1_1),
            "A1_2" => Ok(LanguageLevel::A1_2),
            "A2_1" => Ok(LanguageLevel::A2_1),
            "A2_2" => Ok(LanguageLevel::A2_2),
            _ => Err(AppError::Validation(format!("Unknown course level: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "UPPERCASE")]
pub enum SoundType {
    #[default]
    #[field(value = "VOWEL")]
    Vowel,
    #[field(value = "UMLAUT")]
    Umlaut,
    #[field(value = "CONSONANT")]
    Consonant,
    #[field(value = "DIPHTHONG")]
    Diphthong,
}

impl SoundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundType::Vowel => "VOWEL",
            SoundType::Umlaut => "UMLAUT",
            SoundType::Consonant => "CONSONANT",
            SoundType::Diphthong => "DIPHTHONG",
        }
    }
}

impl FromStr for SoundType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VOWEL" => Ok(SoundType::Vowel),
            "UMLAUT" => Ok(SoundType::Umlaut),
            "CONSONANT" => Ok(SoundType::Consonant),
            "DIPHTHONG" => Ok(SoundType::Diphthong),
            _ => Err(AppError::Validation(format!("Unknown sound type: {}", s))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub level: LanguageLevel,
    pub image_src: Option<String>,
    pub order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbCourse {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub level: Option<String>,
    pub image_src: Option<String>,
    pub order: Option<i64>,
    pub is_active: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbCourse> for Course {
    fn from(db: DbCourse) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            description: db.description.unwrap_or_default(),
            level: db
                .level
                .and_then(|l| l.parse().ok())
                .unwrap_or_default(),
            image_src: db.image_src,
            order: db.order.unwrap_or_default(),
            is_active: db.is_active.unwrap_or(true),
            created_at: db.created_at.map(to_utc).unwrap_or_else(Utc::now),
            updated_at: db.updated_at.map(to_utc).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub order: i64,
    pub required_xp: i64,
    pub xp_reward: i64,
    pub estimated_time: i64,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbModule {
    pub id: Option<i64>,
    pub course_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub required_xp: Option<i64>,
    pub xp_reward: Option<i64>,
    pub estimated_time: Option<i64>,
    pub is_locked: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbModule> for Module {
    fn from(db: DbModule) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            course_id: db.course_id.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            description: db.description.unwrap_or_default(),
            order: db.order.unwrap_or_default(),
            required_xp: db.required_xp.unwrap_or_default(),
            xp_reward: db.xp_reward.unwrap_or_default(),
            estimated_time: db.estimated_time.unwrap_or_default(),
            is_locked: db.is_locked.unwrap_or_default(),
            created_at: db.created_at.map(to_utc).unwrap_or_else(Utc::now),
            updated_at: db.updated_at.map(to_utc).unwrap_or_else(Utc::now),
        }
    }
}

impl Module {
    /// A locked module opens once the learner has enough XP.
    pub fn is_locked_for(&self, user_xp: i64) -> bool {
        self.is_locked && user_xp < self.required_xp
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i64,
    pub module_id: i64,
    pub title: String,
    pub description: String,
    pub order: i64,
    pub xp_reward: i64,
    pub estimated_time: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbLesson {
    pub id: Option<i64>,
    pub module_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub xp_reward: Option<i64>,
    pub estimated_time: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbLesson> for Lesson {
    fn from(db: DbLesson) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            module_id: db.module_id.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            description: db.description.unwrap_or_default(),
            order: db.order.unwrap_or_default(),
            xp_reward: db.xp_reward.unwrap_or(5),
            estimated_time: db.estimated_time.unwrap_or_default(),
            created_at: db.created_at.map(to_utc).unwrap_or_else(Utc::now),
            updated_at: db.updated_at.map(to_utc).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: i64,
    pub lesson_id: i64,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    pub question: String,
    pub instruction: Option<String>,
    pub order: i64,
    pub xp_reward: i64,
    pub time_limit: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbExercise {
    pub id: Option<i64>,
    pub lesson_id: Option<i64>,
    pub exercise_type: Option<String>,
    pub question: Option<String>,
    pub instruction: Option<String>,
    pub order: Option<i64>,
    pub xp_reward: Option<i64>,
    pub time_limit: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbExercise> for Exercise {
    fn from(db: DbExercise) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            lesson_id: db.lesson_id.unwrap_or_default(),
            exercise_type: db
                .exercise_type
                .and_then(|t| t.parse().ok())
                .unwrap_or_default(),
            question: db.question.unwrap_or_default(),
            instruction: db.instruction,
            order: db.order.unwrap_or_default(),
            xp_reward: db.xp_reward.unwrap_or(1),
            time_limit: db.time_limit,
            created_at: db.created_at.map(to_utc).unwrap_or_else(Utc::now),
            updated_at: db.updated_at.map(to_utc).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseOption {
    pub id: i64,
    pub exercise_id: i64,
    pub text: String,
    pub is_correct: bool,
    pub order: i64,
    pub image_src: Option<String>,
    pub audio_src: Option<String>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbExerciseOption {
    pub id: Option<i64>,
    pub exercise_id: Option<i64>,
    pub text: Option<String>,
    pub is_correct: Option<bool>,
    pub order: Option<i64>,
    pub image_src: Option<String>,
    pub audio_src: Option<String>,
}

impl From<DbExerciseOption> for ExerciseOption {
    fn from(db: DbExerciseOption) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            exercise_id: db.exercise_id.unwrap_or_default(),
            text: db.text.unwrap_or_default(),
            is_correct: db.is_correct.unwrap_or_default(),
            order: db.order.unwrap_or_default(),
            image_src: db.image_src,
            audio_src: db.audio_src,
        }
    }
}

/// Option as shown to learners, without the answer flag.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
    pub order: i64,
    pub image_src: Option<String>,
    pub audio_src: Option<String>,
}

impl From<ExerciseOption> for PublicOption {
    fn from(option: ExerciseOption) -> Self {
        Self {
            id: option.id,
            text: option.text,
            order: option.order,
            image_src: option.image_src,
            audio_src: option.audio_src,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseWithOptions<O> {
    #[serde(flatten)]
    pub exercise: Exercise,
    pub options: Vec<O>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseProgress {
    pub id: i64,
    pub user_id: i64,
    pub exercise_id: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: i64,
    pub score: i64,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbExerciseProgress {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub exercise_id: Option<i64>,
    pub completed: Option<bool>,
    pub completed_at: Option<NaiveDateTime>,
    pub attempts: Option<i64>,
    pub score: Option<i64>,
}

impl From<DbExerciseProgress> for ExerciseProgress {
    fn from(db: DbExerciseProgress) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            user_id: db.user_id.unwrap_or_default(),
            exercise_id: db.exercise_id.unwrap_or_default(),
            completed: db.completed.unwrap_or_default(),
            completed_at: db.completed_at.map(to_utc),
            attempts: db.attempts.unwrap_or_default(),
            score: db.score.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoundGroup {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub order: i64,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbSoundGroup {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
}

impl From<DbSoundGroup> for SoundGroup {
    fn from(db: DbSoundGroup) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            name: db.name.unwrap_or_default(),
            description: db.description,
            order: db.order.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GermanSound {
    pub id: i64,
    pub symbol: String,
    pub example_word: String,
    #[serde(rename = "type")]
    pub sound_type: SoundType,
    pub audio_src: Option<String>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbGermanSound {
    pub id: Option<i64>,
    pub symbol: Option<String>,
    pub example_word: Option<String>,
    pub sound_type: Option<String>,
    pub audio_src: Option<String>,
}

impl From<DbGermanSound> for GermanSound {
    fn from(db: DbGermanSound) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            symbol: db.symbol.unwrap_or_default(),
            example_word: db.example_word.unwrap_or_default(),
            sound_type: db
                .sound_type
                .and_then(|t| t.parse().ok())
                .unwrap_or_default(),
            audio_src: db.audio_src,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SoundGroupWithSounds {
    #[serde(flatten)]
    pub group: SoundGroup,
    pub sounds: Vec<GermanSound>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SoundWithGroups {
    #[serde(flatten)]
    pub sound: GermanSound,
    pub groups: Vec<SoundGroup>,
}
