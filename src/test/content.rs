#[cfg(test)]
mod tests {
    use rocket::tokio;

    use crate::db::{
        CourseUpdate, ExerciseInput, ExerciseUpdate, OptionDraft, OptionInput, SoundGroupInput,
        SoundInput, SoundUpdate, add_sound_to_group, create_exercise, create_option,
        create_sound, create_sound_group, delete_course, delete_exercise, exercises_for_lesson,
        get_course, get_exercise, get_exercise_with_options, get_sound, list_courses,
        list_exercises, list_lessons, list_modules, list_sound_groups, list_sounds,
        modules_for_course, options_for_exercise, remove_sound_from_group, update_course,
        update_exercise, update_sound,
    };
    use crate::error::AppError;
    use crate::models::{ExerciseType, LanguageLevel, SoundType};
    use crate::seed::seed_content;
    use crate::test::test_db::{TestDbBuilder, create_standard_test_db};

    fn draft(text: &str, is_correct: bool) -> OptionDraft {
        OptionDraft {
            text: text.to_string(),
            is_correct,
            order: None,
            image_src: None,
            audio_src: None,
        }
    }

    #[tokio::test]
    async fn test_seeded_courses_are_ordered() {
        let test_db = create_standard_test_db().await;

        let courses = list_courses(&test_db.pool, None, None)
            .await
            .expect("Failed to list courses");

        let titles: Vec<&str> = courses.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["German A1.1", "German A1.2"]);
        assert!(courses.iter().all(|c| c.is_active));
    }

    #[tokio::test]
    async fn test_list_courses_filters() {
        let test_db = create_standard_test_db().await;

        let by_level = list_courses(&test_db.pool, Some(LanguageLevel::A1_2), None)
            .await
            .expect("Failed to filter by level");
        assert_eq!(by_level.len(), 1);
        assert_eq!(by_level[0].title, "German A1.2");

        let by_search = list_courses(&test_db.pool, None, Some("SECOND level"))
            .await
            .expect("Failed to search");
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].level, LanguageLevel::A1_2);

        let blank_search = list_courses(&test_db.pool, None, Some("   "))
            .await
            .expect("Failed to search");
        assert_eq!(blank_search.len(), 2);
    }

    #[tokio::test]
    async fn test_seed_is_skipped_when_content_exists() {
        let test_db = create_standard_test_db().await;

        let report = seed_content(&test_db.pool)
            .await
            .expect("Failed to reseed");
        assert_eq!(report.courses, 0);

        let courses = list_courses(&test_db.pool, None, None)
            .await
            .expect("Failed to list courses");
        assert_eq!(courses.len(), 2);
    }

    #[tokio::test]
    async fn test_modules_and_lessons_follow_order() {
        let test_db = create_standard_test_db().await;
        let course_id = test_db.course_id("German A1.1").await.unwrap();

        let modules = modules_for_course(&test_db.pool, course_id)
            .await
            .expect("Failed to list modules");
        let titles: Vec<&str> = modules.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Greetings and Introductions", "Numbers and Counting"]);

        let lessons = list_lessons(&test_db.pool, Some(modules[0].id))
            .await
            .expect("Failed to list lessons");
        let titles: Vec<&str> = lessons.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Basic Greetings", "Introducing Yourself"]);

        let all_modules = list_modules(&test_db.pool, None)
            .await
            .expect("Failed to list modules");
        assert_eq!(all_modules.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_course_is_not_found() {
        let test_db = create_standard_test_db().await;

        let err = get_course(&test_db.pool, 9999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = modules_for_course(&test_db.pool, 9999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = delete_course(&test_db.pool, 9999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_course_keeps_unset_fields() {
        let test_db = create_standard_test_db().await;
        let course_id = test_db.course_id("German A1.1").await.unwrap();
        let before = get_course(&test_db.pool, course_id).await.unwrap();

        let updated = update_course(
            &test_db.pool,
            course_id,
            &CourseUpdate {
                is_active: Some(false),
                ..CourseUpdate::default()
            },
        )
        .await
        .expect("Failed to update course");

        assert!(!updated.is_active);
        assert_eq!(updated.title, before.title);
        assert_eq!(updated.description, before.description);
    }

    #[tokio::test]
    async fn test_delete_course_cascades() {
        let test_db = create_standard_test_db().await;
        let course_id = test_db.course_id("German A1.2").await.unwrap();

        delete_course(&test_db.pool, course_id)
            .await
            .expect("Failed to delete course");

        let modules = list_modules(&test_db.pool, Some(course_id))
            .await
            .expect("Failed to list modules");
        assert!(modules.is_empty());

        let exercise = test_db.exercise_id("Complete: 'Ich _____ um sieben Uhr auf.'").await;
        assert!(exercise.is_err());
    }

    #[tokio::test]
    async fn test_exercises_for_lesson_include_options_in_order() {
        let test_db = create_standard_test_db().await;
        let lesson_id = test_db.lesson_id("Basic Greetings").await.unwrap();

        let exercises = exercises_for_lesson(&test_db.pool, lesson_id)
            .await
            .expect("Failed to load exercises");

        assert_eq!(exercises.len(), 2);
        assert_eq!(exercises[0].exercise.exercise_type, ExerciseType::MultipleChoice);
        assert_eq!(exercises[1].exercise.exercise_type, ExerciseType::FillInBlank);

        let option_texts: Vec<&str> = exercises[0].options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(option_texts, vec!["Hello", "Goodbye", "Please", "Thank you"]);
        let orders: Vec<i64> = exercises[0].options.iter().map(|o| o.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);

        let err = exercises_for_lesson(&test_db.pool, 9999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_exercises_by_type() {
        let test_db = create_standard_test_db().await;

        let fill = list_exercises(&test_db.pool, None, Some(ExerciseType::FillInBlank))
            .await
            .expect("Failed to list exercises");
        assert_eq!(fill.len(), 2);
        assert!(fill.iter().all(|e| e.exercise_type == ExerciseType::FillInBlank));
    }

    #[tokio::test]
    async fn test_create_exercise_defaults() {
        let test_db = create_standard_test_db().await;
        let lesson_id = test_db.lesson_id("Numbers 0 to 10").await.unwrap();

        let created = create_exercise(
            &test_db.pool,
            &ExerciseInput {
                lesson_id,
                exercise_type: ExerciseType::MultipleChoice,
                question: "Which word means 'ten'?".to_string(),
                instruction: None,
                order: 2,
                xp_reward: None,
                time_limit: None,
                options: vec![draft("zehn", true), draft("elf", false)],
            },
        )
        .await
        .expect("Failed to create exercise");

        assert_eq!(created.exercise.xp_reward, 1);
        assert_eq!(created.options.len(), 2);
        assert_eq!(created.options[1].order, 2);

        let err = create_exercise(
            &test_db.pool,
            &ExerciseInput {
                lesson_id: 9999,
                exercise_type: ExerciseType::MultipleChoice,
                question: "Orphan question".to_string(),
                instruction: None,
                order: 1,
                xp_reward: None,
                time_limit: None,
                options: vec![draft("a", true), draft("b", false)],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_exercise_replaces_options() {
        let test_db = create_standard_test_db().await;
        let exercise_id = test_db
            .exercise_id("Which word means 'three'?")
            .await
            .unwrap();

        let updated = update_exercise(
            &test_db.pool,
            exercise_id,
            &ExerciseUpdate {
                xp_reward: Some(5),
                options: Some(vec![draft("drei", true), draft("dreißig", false)]),
                ..ExerciseUpdate::default()
            },
        )
        .await
        .expect("Failed to update exercise");

        assert_eq!(updated.exercise.xp_reward, 5);
        assert_eq!(updated.exercise.question, "Which word means 'three'?");
        let texts: Vec<&str> = updated.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["drei", "dreißig"]);
    }

    #[tokio::test]
    async fn test_update_exercise_without_options_keeps_them() {
        let test_db = create_standard_test_db().await;
        let exercise_id = test_db
            .exercise_id("Which word means 'three'?")
            .await
            .unwrap();

        let updated = update_exercise(
            &test_db.pool,
            exercise_id,
            &ExerciseUpdate {
                instruction: Some("Pick one".to_string()),
                ..ExerciseUpdate::default()
            },
        )
        .await
        .expect("Failed to update exercise");

        assert_eq!(updated.exercise.instruction.as_deref(), Some("Pick one"));
        assert_eq!(updated.options.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_exercise_removes_options() {
        let test_db = create_standard_test_db().await;
        let exercise_id = test_db
            .exercise_id("Which word means 'three'?")
            .await
            .unwrap();

        delete_exercise(&test_db.pool, exercise_id)
            .await
            .expect("Failed to delete exercise");

        let err = get_exercise(&test_db.pool, exercise_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM exercise_options WHERE exercise_id = ?")
                .bind(exercise_id)
                .fetch_one(&test_db.pool)
                .await
                .unwrap();
        assert_eq!(count, 0);

        let err = delete_exercise(&test_db.pool, exercise_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_option_appends_after_last() {
        let test_db = create_standard_test_db().await;
        let exercise_id = test_db
            .exercise_id("Which word means 'three'?")
            .await
            .unwrap();

        let option = create_option(
            &test_db.pool,
            &OptionInput {
                exercise_id,
                text: "fünf".to_string(),
                is_correct: None,
                order: None,
                image_src: None,
                audio_src: None,
            },
        )
        .await
        .expect("Failed to create option");

        assert_eq!(option.order, 4);
        assert!(!option.is_correct);

        let options = options_for_exercise(&test_db.pool, exercise_id)
            .await
            .expect("Failed to list options");
        assert_eq!(options.last().map(|o| o.id), Some(option.id));

        let with_options = get_exercise_with_options(&test_db.pool, exercise_id)
            .await
            .unwrap();
        assert_eq!(with_options.options.len(), 4);
    }

    #[tokio::test]
    async fn test_create_option_for_missing_exercise() {
        let test_db = create_standard_test_db().await;

        let err = create_option(
            &test_db.pool,
            &OptionInput {
                exercise_id: 9999,
                text: "nothing".to_string(),
                is_correct: Some(true),
                order: Some(1),
                image_src: None,
                audio_src: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_seeded_sound_groups() {
        let test_db = create_standard_test_db().await;

        let groups = list_sound_groups(&test_db.pool)
            .await
            .expect("Failed to list sound groups");

        let names: Vec<&str> = groups.iter().map(|g| g.group.name.as_str()).collect();
        assert_eq!(names, vec!["Vowels", "Umlauts", "Consonants", "Diphthongs"]);
        assert_eq!(groups[1].sounds.len(), 3);

        let umlauts = list_sounds(&test_db.pool, Some(SoundType::Umlaut))
            .await
            .expect("Failed to list sounds");
        let symbols: Vec<&str> = umlauts.iter().map(|s| s.sound.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ä", "ö", "ü"]);
        assert!(umlauts.iter().all(|s| s.groups.len() == 1));
    }

    #[tokio::test]
    async fn test_sound_group_membership() {
        let test_db = TestDbBuilder::new().build().await.unwrap();

        let vowels = create_sound_group(
            &test_db.pool,
            &SoundGroupInput {
                name: "Vowels".to_string(),
                description: None,
                order: Some(1),
            },
        )
        .await
        .unwrap();
        let favourites = create_sound_group(
            &test_db.pool,
            &SoundGroupInput {
                name: "Tricky".to_string(),
                description: None,
                order: Some(2),
            },
        )
        .await
        .unwrap();

        let sound = create_sound(
            &test_db.pool,
            &SoundInput {
                symbol: "ö".to_string(),
                example_word: "schön".to_string(),
                sound_type: SoundType::Umlaut,
                audio_src: None,
                group_ids: vec![vowels.group.id],
            },
        )
        .await
        .unwrap();
        assert_eq!(sound.groups.len(), 1);

        let linked = add_sound_to_group(&test_db.pool, sound.sound.id, favourites.group.id)
            .await
            .expect("Failed to link");
        assert_eq!(linked.groups.len(), 2);

        // Linking twice leaves a single membership.
        let again = add_sound_to_group(&test_db.pool, sound.sound.id, favourites.group.id)
            .await
            .expect("Failed to relink");
        assert_eq!(again.groups.len(), 2);

        remove_sound_from_group(&test_db.pool, sound.sound.id, vowels.group.id)
            .await
            .expect("Failed to unlink");
        let err = remove_sound_from_group(&test_db.pool, sound.sound.id, vowels.group.id)
            .await
            .unwrap_err();
        match err {
            AppError::NotFound(message) => assert_eq!(
                message,
                format!(
                    "Sound {} is not associated with group {}",
                    sound.sound.id, vowels.group.id
                )
            ),
            other => panic!("Unexpected error: {:?}", other),
        }

        let current = get_sound(&test_db.pool, sound.sound.id).await.unwrap();
        let group_names: Vec<&str> = current.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(group_names, vec!["Tricky"]);

        let err = add_sound_to_group(&test_db.pool, sound.sound.id, 9999)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_sound_replaces_groups() {
        let test_db = create_standard_test_db().await;
        let sounds = list_sounds(&test_db.pool, Some(SoundType::Diphthong))
            .await
            .unwrap();
        let sound_id = sounds[0].sound.id;

        let updated = update_sound(
            &test_db.pool,
            sound_id,
            &SoundUpdate {
                example_word: Some("Eis".to_string()),
                group_ids: Some(vec![]),
                ..SoundUpdate::default()
            },
        )
        .await
        .expect("Failed to update sound");

        assert_eq!(updated.sound.example_word, "Eis");
        assert_eq!(updated.sound.symbol, "ei");
        assert!(updated.groups.is_empty());

        let err = update_sound(
            &test_db.pool,
            9999,
            &SoundUpdate {
                symbol: Some("x".to_string()),
                ..SoundUpdate::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
