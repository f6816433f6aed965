#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use validator::Validate;

    use crate::practice::{
        DailyGoal, GoalType, PracticeInput, PracticeLog, PracticeSummary, parse_daily_goal,
        parse_favorite_words, parse_practice_log, toggle_favorite,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn xp(amount: i64) -> PracticeInput {
        PracticeInput {
            xp: Some(amount),
            ..PracticeInput::default()
        }
    }

    #[test]
    fn test_record_accumulates_per_day() {
        let today = date(2024, 5, 10);
        let mut log = PracticeLog::default();

        log.record(today, &xp(10));
        let day = log.record(
            today,
            &PracticeInput {
                xp: Some(5),
                minutes: Some(3),
                correct: Some(2),
                total: Some(3),
                ..PracticeInput::default()
            },
        );

        assert_eq!(day.date, today);
        assert_eq!(day.xp, 15);
        assert_eq!(day.minutes, 3);
        assert_eq!(day.correct, 2);
        assert_eq!(day.total, 3);
        assert_eq!(day.sessions, 2, "each record counts one session");
        assert_eq!(log.days.len(), 1);
    }

    #[test]
    fn test_record_honours_explicit_date_and_sessions() {
        let today = date(2024, 5, 10);
        let mut log = PracticeLog::default();

        let day = log.record(
            today,
            &PracticeInput {
                date: Some(date(2024, 5, 8)),
                sessions: Some(3),
                ..PracticeInput::default()
            },
        );

        assert_eq!(day.date, date(2024, 5, 8));
        assert_eq!(day.sessions, 3);
        assert_eq!(log.day(today).sessions, 0);
    }

    #[test]
    fn test_record_saturates_instead_of_overflowing() {
        let today = date(2024, 5, 10);
        let mut log = PracticeLog::default();

        log.record(today, &xp(i64::MAX));
        let day = log.record(today, &xp(i64::MAX));

        assert_eq!(day.xp, i64::MAX);
        assert_eq!(day.sessions, 2);
    }

    #[test]
    fn test_practice_input_bounds() {
        assert!(xp(250).validate().is_ok());
        assert!(xp(-1).validate().is_err());
        assert!(xp(i64::MAX).validate().is_err());

        let errors = PracticeInput {
            minutes: Some(5_000),
            words: Some(-3),
            ..PracticeInput::default()
        }
        .validate()
        .unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("minutes"));
        assert!(fields.contains_key("words"));
        assert!(!fields.contains_key("xp"));
    }

    #[test]
    fn test_daily_progress() {
        let today = date(2024, 5, 10);
        let mut log = PracticeLog::default();
        log.record(
            today,
            &PracticeInput {
                xp: Some(25),
                minutes: Some(30),
                ..PracticeInput::default()
            },
        );

        let by_xp = log.daily_progress(today, DailyGoal::default());
        assert_eq!(by_xp.value, 25);
        assert_eq!(by_xp.percent, 50.0);

        let by_minutes = log.daily_progress(
            today,
            DailyGoal {
                goal_type: GoalType::Minutes,
                target: 15,
            },
        );
        assert_eq!(by_minutes.value, 30);
        assert_eq!(by_minutes.percent, 100.0, "percent is capped");

        let zero_target = log.daily_progress(
            today,
            DailyGoal {
                goal_type: GoalType::Xp,
                target: 0,
            },
        );
        assert_eq!(zero_target.percent, 0.0);
    }

    #[test]
    fn test_weekly_activity_is_zero_filled_oldest_first() {
        let today = date(2024, 5, 10);
        let mut log = PracticeLog::default();
        log.record(date(2024, 5, 8), &xp(7));

        let week = log.weekly_activity(today, 7);

        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, date(2024, 5, 4));
        assert_eq!(week[6].date, today);
        assert_eq!(week[4].xp, 7);
        assert!(week.iter().filter(|d| d.xp == 0).count() == 6);
    }

    #[test]
    fn test_streak_days() {
        let today = date(2024, 5, 10);
        let mut log = PracticeLog::default();
        assert_eq!(log.streak_days(today), 0);

        log.record(date(2024, 5, 10), &xp(5));
        log.record(date(2024, 5, 9), &xp(5));
        log.record(
            date(2024, 5, 8),
            &PracticeInput {
                words: Some(4),
                ..PracticeInput::default()
            },
        );
        // A session with no xp, minutes or words breaks the streak.
        log.record(date(2024, 5, 7), &PracticeInput::default());
        log.record(date(2024, 5, 6), &xp(5));

        assert_eq!(log.streak_days(today), 3);
        assert_eq!(log.streak_days(date(2024, 5, 11)), 0);
    }

    #[test]
    fn test_totals_and_summary() {
        let today = date(2024, 5, 10);
        let mut log = PracticeLog::default();
        log.record(date(2024, 5, 9), &xp(10));
        log.record(
            today,
            &PracticeInput {
                xp: Some(20),
                lessons: Some(1),
                words: Some(6),
                ..PracticeInput::default()
            },
        );

        let totals = log.totals();
        assert_eq!(totals.xp, 30);
        assert_eq!(totals.lessons, 1);
        assert_eq!(totals.words, 6);
        assert_eq!(totals.sessions, 2);

        let summary = PracticeSummary::build(&log, today, DailyGoal::default());
        assert_eq!(summary.today.value, 20);
        assert_eq!(summary.streak_days, 2);
        assert_eq!(summary.weekly_activity.len(), 7);
        assert_eq!(summary.totals, totals);
    }

    #[test]
    fn test_parsers_fall_back_on_malformed_values() {
        assert_eq!(parse_practice_log(None), PracticeLog::default());
        assert_eq!(parse_practice_log(Some("{not json")), PracticeLog::default());
        assert_eq!(parse_daily_goal(Some("[]")), DailyGoal::default());
        assert!(parse_favorite_words(Some("\"oops\"")).is_empty());

        let log = parse_practice_log(Some(
            r#"{"2024-05-10":{"date":"2024-05-10","xp":12,"lessons":1,"correct":3,"total":4,"minutes":5,"sessions":1,"words":2}}"#,
        ));
        assert_eq!(log.day(date(2024, 5, 10)).xp, 12);

        let goal = parse_daily_goal(Some(r#"{"type":"minutes","target":20}"#));
        assert_eq!(goal.goal_type, GoalType::Minutes);
        assert_eq!(goal.target, 20);

        assert_eq!(
            parse_favorite_words(Some(r#"["hallo","danke"]"#)),
            vec!["hallo".to_string(), "danke".to_string()]
        );
    }

    #[test]
    fn test_toggle_favorite() {
        let favorites = vec!["hallo".to_string(), "danke".to_string()];

        let added = toggle_favorite(&favorites, "bitte");
        assert_eq!(added, vec!["hallo", "danke", "bitte"]);

        let removed = toggle_favorite(&added, "hallo");
        assert_eq!(removed, vec!["danke", "bitte"]);
    }
}
