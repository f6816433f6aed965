#[cfg(test)]
mod tests {
    use crate::{
        auth::UserSession,
        db::{
            clean_expired_sessions, create_user_session, get_session_by_token, invalidate_session,
        },
        error::AppError,
        test::test_db::{TestDb, TestDbBuilder},
    };
    use chrono::{Duration, NaiveDateTime, Utc};
    use rocket::tokio;
    use uuid::Uuid;

    async fn session_test_db() -> (TestDb, i64) {
        let test_db = TestDbBuilder::new()
            .learner("test_session_user")
            .build()
            .await
            .expect("Failed to build test database");

        let user_id = test_db
            .user_id("test_session_user")
            .expect("User not found");

        (test_db, user_id)
    }

    fn test_token(label: &str) -> String {
        format!("test_token_{}_{}", label, Uuid::new_v4())
    }

    fn hours_from_now(hours: i64) -> NaiveDateTime {
        (Utc::now() + Duration::hours(hours)).naive_utc()
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (test_db, user_id) = session_test_db().await;
        let token = test_token("valid");
        let expires_at = hours_from_now(1);

        let session_id = create_user_session(&test_db.pool, user_id, &token, expires_at)
            .await
            .expect("Failed to create session");

        assert!(session_id > 0, "Session ID should be positive");

        let session = get_session_by_token(&test_db.pool, &token)
            .await
            .expect("Failed to get session");

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.token, token);

        let expires_diff =
            (session.expires_at.and_utc().timestamp() - expires_at.and_utc().timestamp()).abs();
        assert!(
            expires_diff <= 1,
            "Expiration timestamps should match within 1 second"
        );
    }

    #[tokio::test]
    async fn test_get_nonexistent_session() {
        let test_db = TestDbBuilder::new()
            .build()
            .await
            .expect("Failed to build test database");

        let result = get_session_by_token(&test_db.pool, "nonexistent_token").await;

        match result {
            Err(AppError::Authentication(msg)) => assert_eq!(msg, "Invalid session token"),
            other => panic!("Expected Authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalidate_session() {
        let (test_db, user_id) = session_test_db().await;
        let token = test_token("logout");

        create_user_session(&test_db.pool, user_id, &token, hours_from_now(1))
            .await
            .expect("Failed to create session");

        assert!(get_session_by_token(&test_db.pool, &token).await.is_ok());

        invalidate_session(&test_db.pool, &token)
            .await
            .expect("Failed to invalidate session");

        let result = get_session_by_token(&test_db.pool, &token).await;
        assert!(result.is_err(), "Session should not exist after invalidation");

        // Logging out twice is harmless.
        invalidate_session(&test_db.pool, &token)
            .await
            .expect("Second invalidation should succeed");
    }

    #[tokio::test]
    async fn test_clean_expired_sessions() {
        let (test_db, user_id) = session_test_db().await;
        let pool = test_db.pool.clone();

        let expired = test_token("expired");
        let soon = test_token("soon");
        let later = test_token("later");

        create_user_session(&pool, user_id, &expired, hours_from_now(-1))
            .await
            .expect("Failed to create expired session");
        create_user_session(
            &pool,
            user_id,
            &soon,
            (Utc::now() + Duration::minutes(1)).naive_utc(),
        )
        .await
        .expect("Failed to create expiring soon session");
        create_user_session(&pool, user_id, &later, hours_from_now(24))
            .await
            .expect("Failed to create future session");

        let cleaned_count = clean_expired_sessions(&pool)
            .await
            .expect("Failed to clean expired sessions");

        assert_eq!(cleaned_count, 1, "Should have cleaned exactly 1 expired session");

        assert!(get_session_by_token(&pool, &expired).await.is_err());
        assert!(get_session_by_token(&pool, &soon).await.is_ok());
        assert!(get_session_by_token(&pool, &later).await.is_ok());

        let cleaned_again = clean_expired_sessions(&pool).await.unwrap();
        assert_eq!(cleaned_again, 0);
    }

    #[tokio::test]
    async fn test_session_validity() {
        let (test_db, user_id) = session_test_db().await;

        let expired_token = test_token("expired");
        create_user_session(&test_db.pool, user_id, &expired_token, hours_from_now(-1))
            .await
            .expect("Failed to create expired session");

        let session = get_session_by_token(&test_db.pool, &expired_token)
            .await
            .expect("Should be able to retrieve expired session");
        assert!(!session.is_valid(), "Expired session should be invalid");

        let token = test_token("valid");
        create_user_session(&test_db.pool, user_id, &token, hours_from_now(1))
            .await
            .expect("Failed to create valid session");

        let valid_session = get_session_by_token(&test_db.pool, &token)
            .await
            .expect("Should be able to retrieve valid session");
        assert!(valid_session.is_valid(), "Future session should be valid");
    }

    #[tokio::test]
    async fn test_sessions_removed_with_user() {
        let (test_db, user_id) = session_test_db().await;
        let token = test_token("orphan");

        create_user_session(&test_db.pool, user_id, &token, hours_from_now(1))
            .await
            .unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&test_db.pool)
            .await
            .unwrap();

        assert!(get_session_by_token(&test_db.pool, &token).await.is_err());
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let first = UserSession::generate_token();
        let second = UserSession::generate_token();

        assert_eq!(first.len(), 48);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }
}
