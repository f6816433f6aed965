#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::gamification::{
        MAX_HEARTS, MIN_CORRECT_SCORE, attempt_score, check_level_up, heart_change, level_for_xp,
        next_answer_streak, next_login_streak, required_xp_for_level, streak_multiplier,
        xp_with_multiplier,
    };

    #[test]
    fn test_required_xp_table() {
        assert_eq!(required_xp_for_level(0), 0);
        assert_eq!(required_xp_for_level(1), 0);
        assert_eq!(required_xp_for_level(2), 50);
        assert_eq!(required_xp_for_level(3), 120);
        assert_eq!(required_xp_for_level(4), 250);
        assert_eq!(required_xp_for_level(5), 370);
        assert_eq!(required_xp_for_level(6), 500);
        // round(100 * 7^1.8)
        assert_eq!(required_xp_for_level(7), 3320);
    }

    #[test]
    fn test_level_for_xp_boundaries() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(49), 1);
        assert_eq!(level_for_xp(50), 2);
        assert_eq!(level_for_xp(119), 2);
        assert_eq!(level_for_xp(120), 3);
        assert_eq!(level_for_xp(500), 6);
        assert_eq!(level_for_xp(3319), 6);
        assert_eq!(level_for_xp(3320), 7);
    }

    #[test]
    fn test_check_level_up() {
        let up = check_level_up(1, 55);
        assert!(up.leveled_up);
        assert_eq!(up.new_level, 2);
        assert_eq!(up.xp_for_next_level, 120);

        let same = check_level_up(2, 60);
        assert!(!same.leveled_up);
        assert_eq!(same.new_level, 2);

        // A stored level is never lowered.
        let kept = check_level_up(4, 10);
        assert!(!kept.leveled_up);
        assert_eq!(kept.new_level, 4);
    }

    #[test]
    fn test_streak_multiplier_bands() {
        assert_eq!(streak_multiplier(0), 1.0);
        assert_eq!(streak_multiplier(4), 1.0);
        assert_eq!(streak_multiplier(5), 2.5);
        assert_eq!(streak_multiplier(10), 2.5);
        assert_eq!(streak_multiplier(11), 3.0);
        assert_eq!(streak_multiplier(15), 3.0);
        assert_eq!(streak_multiplier(16), 4.0);
        assert_eq!(streak_multiplier(100), 4.0);
    }

    #[test]
    fn test_xp_with_multiplier_rounds() {
        assert_eq!(xp_with_multiplier(1, 0), 1);
        assert_eq!(xp_with_multiplier(1, 5), 3);
        assert_eq!(xp_with_multiplier(3, 5), 8);
        assert_eq!(xp_with_multiplier(2, 20), 8);
    }

    #[test]
    fn test_attempt_score() {
        assert_eq!(attempt_score(false, 1, None, None), 0);
        assert_eq!(attempt_score(true, 1, None, None), 100);
        assert_eq!(attempt_score(true, 2, None, None), 80);
        assert_eq!(attempt_score(true, 10, None, None), MIN_CORRECT_SCORE);

        assert_eq!(attempt_score(true, 1, Some(1), Some(30)), 119);
        // An instant answer carries no timing, so no bonus.
        assert_eq!(attempt_score(true, 1, Some(0), Some(30)), 100);
        assert_eq!(attempt_score(true, 1, Some(15), Some(30)), 110);
        // Overtime earns no bonus and no penalty.
        assert_eq!(attempt_score(true, 1, Some(45), Some(30)), 100);
        assert_eq!(attempt_score(true, 1, Some(5), None), 100);
    }

    #[test]
    fn test_attempt_score_extreme_inputs() {
        assert_eq!(attempt_score(true, 1, Some(i64::MIN), Some(30)), 100);
        assert_eq!(attempt_score(true, 1, Some(i64::MAX), Some(30)), 100);
        assert_eq!(attempt_score(true, i64::MAX, None, None), MIN_CORRECT_SCORE);
    }

    #[test]
    fn test_heart_change_bounds() {
        assert_eq!(heart_change(false, false, 3), -1);
        assert_eq!(heart_change(false, false, 0), 0);
        assert_eq!(heart_change(true, false, 3), 1);
        assert_eq!(heart_change(true, false, MAX_HEARTS), 0);
        assert_eq!(heart_change(false, true, 3), 0);
        assert_eq!(heart_change(true, true, 3), 0);
    }

    #[test]
    fn test_next_answer_streak() {
        assert_eq!(next_answer_streak(true, false, 4), 5);
        assert_eq!(next_answer_streak(true, true, 4), 4);
        assert_eq!(next_answer_streak(false, false, 4), 0);
        assert_eq!(next_answer_streak(false, true, 4), 0);
    }

    #[test]
    fn test_login_streak_rules() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();

        assert_eq!(next_login_streak(None, 0, now), 1);

        let earlier_today = now - Duration::hours(3);
        assert_eq!(next_login_streak(Some(earlier_today), 4, now), 4);
        assert_eq!(next_login_streak(Some(earlier_today), 0, now), 1);

        let yesterday_late = Utc.with_ymd_and_hms(2024, 5, 9, 23, 30, 0).unwrap();
        assert_eq!(next_login_streak(Some(yesterday_late), 4, now), 5);

        let two_days_ago = now - Duration::days(2);
        assert_eq!(next_login_streak(Some(two_days_ago), 4, now), 1);
    }
}
