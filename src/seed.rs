//! Starter content for a fresh database: two beginner courses with a few
//! lessons, and the German sound inventory for the vocabulary pages.

use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::Role;
use crate::db::{
    CourseInput, ExerciseInput, LessonInput, ModuleInput, NewUser, OptionDraft, SoundGroupInput,
    SoundInput, create_course, create_exercise, create_lesson, create_module, create_sound,
    create_sound_group, create_user, find_user_by_email,
};
use crate::error::AppError;
use crate::models::{ExerciseType, LanguageLevel, SoundType};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub courses: usize,
    pub modules: usize,
    pub lessons: usize,
    pub exercises: usize,
    pub sound_groups: usize,
    pub sounds: usize,
}

fn option(text: &str, is_correct: bool) -> OptionDraft {
    OptionDraft {
        text: text.to_string(),
        is_correct,
        order: None,
        image_src: None,
        audio_src: None,
    }
}

struct SeedExercise {
    exercise_type: ExerciseType,
    question: &'static str,
    instruction: &'static str,
    xp_reward: i64,
    options: &'static [(&'static str, bool)],
}

struct SeedLesson {
    title: &'static str,
    description: &'static str,
    xp_reward: i64,
    estimated_time: i64,
    exercises: &'static [SeedExercise],
}

struct SeedModule {
    title: &'static str,
    description: &'static str,
    xp_reward: i64,
    estimated_time: i64,
    required_xp: i64,
    is_locked: bool,
    lessons: &'static [SeedLesson],
}

struct SeedCourse {
    title: &'static str,
    description: &'static str,
    level: LanguageLevel,
    modules: &'static [SeedModule],
}

const COURSES: &[SeedCourse] = &[
    SeedCourse {
        title: "German A1.1",
        description: "Beginner German course - first level",
        level: LanguageLevel::A1_1,
        modules: &[
            SeedModule {
                title: "Greetings and Introductions",
                description: "Learn how to greet people and introduce yourself",
                xp_reward: 20,
                estimated_time: 30,
                required_xp: 0,
                is_locked: false,
                lessons: &[
                    SeedLesson {
                        title: "Basic Greetings",
                        description: "Learn how to say hello and goodbye",
                        xp_reward: 10,
                        estimated_time: 15,
                        exercises: &[
                            SeedExercise {
                                exercise_type: ExerciseType::MultipleChoice,
                                question: "What does 'Hallo' mean in English?",
                                instruction: "Select the correct translation",
                                xp_reward: 2,
                                options: &[
                                    ("Hello", true),
                                    ("Goodbye", false),
                                    ("Please", false),
                                    ("Thank you", false),
                                ],
                            },
                            SeedExercise {
                                exercise_type: ExerciseType::FillInBlank,
                                question: "Complete the greeting: '_____, wie geht's?'",
                                instruction: "Fill in the blank with the correct greeting",
                                xp_reward: 3,
                                options: &[("Hallo", true), ("Tschüss", false)],
                            },
                        ],
                    },
                    SeedLesson {
                        title: "Introducing Yourself",
                        description: "Learn how to introduce yourself and ask someone's name",
                        xp_reward: 15,
                        estimated_time: 20,
                        exercises: &[
                            SeedExercise {
                                exercise_type: ExerciseType::VocabularyCheck,
                                question: "Type the German word for 'Goodbye'",
                                instruction: "Write the German translation",
                                xp_reward: 3,
                                options: &[("Tschüss", true), ("Hallo", false)],
                            },
                            SeedExercise {
                                exercise_type: ExerciseType::MultipleChoice,
                                question: "How do you say 'My name is Anna'?",
                                instruction: "Select the correct sentence",
                                xp_reward: 2,
                                options: &[
                                    ("Mein Name ist Anna.", true),
                                    ("Ich bin Name Anna.", false),
                                    ("Anna heißt mein.", false),
                                ],
                            },
                        ],
                    },
                ],
            },
            SeedModule {
                title: "Numbers and Counting",
                description: "Learn numbers from 0 to 100 and how to use them",
                xp_reward: 25,
                estimated_time: 45,
                required_xp: 0,
                is_locked: false,
                lessons: &[SeedLesson {
                    title: "Numbers 0 to 10",
                    description: "Count from zero to ten",
                    xp_reward: 10,
                    estimated_time: 10,
                    exercises: &[SeedExercise {
                        exercise_type: ExerciseType::MultipleChoice,
                        question: "Which word means 'three'?",
                        instruction: "Select the correct number",
                        xp_reward: 2,
                        options: &[("drei", true), ("zwei", false), ("vier", false)],
                    }],
                }],
            },
        ],
    },
    SeedCourse {
        title: "German A1.2",
        description: "Beginner German course - second level",
        level: LanguageLevel::A1_2,
        modules: &[SeedModule {
            title: "Daily Activities",
            description: "Talk about your daily routine",
            xp_reward: 30,
            estimated_time: 60,
            required_xp: 50,
            is_locked: true,
            lessons: &[SeedLesson {
                title: "My Morning",
                description: "Describe what you do in the morning",
                xp_reward: 10,
                estimated_time: 15,
                exercises: &[SeedExercise {
                    exercise_type: ExerciseType::FillInBlank,
                    question: "Complete: 'Ich _____ um sieben Uhr auf.'",
                    instruction: "Fill in the missing verb",
                    xp_reward: 3,
                    options: &[("stehe", true), ("gehe", false)],
                }],
            }],
        }],
    },
];

const SOUND_GROUPS: &[(&str, &str, SoundType, &[(&str, &str)])] = &[
    (
        "Vowels",
        "Long and short vowel sounds",
        SoundType::Vowel,
        &[("a", "Vater"), ("e", "Leben"), ("i", "Liebe"), ("o", "Ofen"), ("u", "Uhr")],
    ),
    (
        "Umlauts",
        "The three umlauted vowels",
        SoundType::Umlaut,
        &[("ä", "Mädchen"), ("ö", "schön"), ("ü", "Tür")],
    ),
    (
        "Consonants",
        "Consonants that differ from English",
        SoundType::Consonant,
        &[("ch", "ich"), ("sch", "Schule"), ("z", "Zeit"), ("w", "Wasser")],
    ),
    (
        "Diphthongs",
        "Vowel combinations gliding into one sound",
        SoundType::Diphthong,
        &[("ei", "mein"), ("eu", "heute"), ("au", "Haus")],
    ),
];

async fn has_content(pool: &Pool<Sqlite>) -> Result<bool, AppError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM courses")
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Inserts the starter content unless any course already exists.
#[instrument(skip(pool))]
pub async fn seed_content(pool: &Pool<Sqlite>) -> Result<SeedReport, AppError> {
    let mut report = SeedReport::default();

    if has_content(pool).await? {
        info!("Database already has content, skipping seed");
        return Ok(report);
    }

    for (course_order, course) in COURSES.iter().enumerate() {
        let created_course = create_course(
            pool,
            &CourseInput {
                title: course.title.to_string(),
                description: course.description.to_string(),
                level: course.level,
                image_src: None,
                order: course_order as i64 + 1,
                is_active: Some(true),
            },
        )
        .await?;
        report.courses += 1;

        for (module_order, module) in course.modules.iter().enumerate() {
            let created_module = create_module(
                pool,
                &ModuleInput {
                    course_id: created_course.id,
                    title: module.title.to_string(),
                    description: Some(module.description.to_string()),
                    order: module_order as i64 + 1,
                    required_xp: Some(module.required_xp),
                    xp_reward: Some(module.xp_reward),
                    estimated_time: Some(module.estimated_time),
                    is_locked: Some(module.is_locked),
                },
            )
            .await?;
            report.modules += 1;

            for (lesson_order, lesson) in module.lessons.iter().enumerate() {
                let created_lesson = create_lesson(
                    pool,
                    &LessonInput {
                        module_id: created_module.id,
                        title: lesson.title.to_string(),
                        description: Some(lesson.description.to_string()),
                        order: lesson_order as i64 + 1,
                        xp_reward: Some(lesson.xp_reward),
                        estimated_time: Some(lesson.estimated_time),
                    },
                )
                .await?;
                report.lessons += 1;

                for (exercise_order, exercise) in lesson.exercises.iter().enumerate() {
                    create_exercise(
                        pool,
                        &ExerciseInput {
                            lesson_id: created_lesson.id,
                            exercise_type: exercise.exercise_type,
                            question: exercise.question.to_string(),
                            instruction: Some(exercise.instruction.to_string()),
                            order: exercise_order as i64 + 1,
                            xp_reward: Some(exercise.xp_reward),
                            time_limit: None,
                            options: exercise
                                .options
                                .iter()
                                .map(|(text, correct)| option(text, *correct))
                                .collect(),
                        },
                    )
                    .await?;
                    report.exercises += 1;
                }
            }
        }
    }

    for (group_order, (name, description, sound_type, sounds)) in SOUND_GROUPS.iter().enumerate()
    {
        let group = create_sound_group(
            pool,
            &SoundGroupInput {
                name: name.to_string(),
                description: Some(description.to_string()),
                order: Some(group_order as i64 + 1),
            },
        )
        .await?;
        report.sound_groups += 1;

        for (symbol, example_word) in sounds.iter() {
            create_sound(
                pool,
                &SoundInput {
                    symbol: symbol.to_string(),
                    example_word: example_word.to_string(),
                    sound_type: *sound_type,
                    audio_src: None,
                    group_ids: vec![group.group.id],
                },
            )
            .await?;
            report.sounds += 1;
        }
    }

    info!(?report, "Seeded starter content");
    Ok(report)
}

/// Creates an admin account unless the email is already registered.
#[instrument(skip(pool, password))]
pub async fn ensure_admin(
    pool: &Pool<Sqlite>,
    email: &str,
    username: &str,
    password: &str,
) -> Result<i64, AppError> {
    if let Some(user) = find_user_by_email(pool, email).await? {
        info!(user_id = user.id, "Admin account already exists");
        return Ok(user.id);
    }

    create_user(
        pool,
        NewUser {
            email,
            username,
            password,
            first_name: "",
            last_name: "",
            role: Role::Admin,
        },
    )
    .await
}
