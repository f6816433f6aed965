#[cfg(test)]
pub mod test_db {
    use crate::auth::Role;
    use crate::database::migrate_database;
    use crate::db::{NewUser, create_user};
    use crate::error::AppError;
    use crate::seed::seed_content;
    use sqlx::{Pool, Sqlite, SqlitePool};
    use std::collections::HashMap;
    use std::sync::Once;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        seed_content: bool,
    }

    pub struct TestUser {
        pub username: String,
        pub role: Role,
        pub password: String,
    }

    pub fn email_for(username: &str) -> String {
        format!("{}@example.com", username)
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn learner(self, username: &str) -> Self {
            self.user_with_password(username, Role::Learner, STANDARD_PASSWORD)
        }

        pub fn admin(self, username: &str) -> Self {
            self.user_with_password(username, Role::Admin, STANDARD_PASSWORD)
        }

        pub fn user_with_password(mut self, username: &str, role: Role, password: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role,
                password: password.to_string(),
            });
            self
        }

        pub fn with_seed_content(mut self) -> Self {
            self.seed_content = true;
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .parse_filters("debug")
                    .is_test(true)
                    .try_init();
            });

            let pool = SqlitePool::connect("sqlite::memory:").await?;

            migrate_database(&pool).await?;

            if self.seed_content {
                seed_content(&pool).await?;
            }

            let mut user_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                let email = email_for(&user.username);
                let user_id = create_user(
                    &pool,
                    NewUser {
                        email: &email,
                        username: &user.username,
                        password: &user.password,
                        first_name: "",
                        last_name: "",
                        role: user.role,
                    },
                )
                .await?;

                user_id_map.insert(user.username.clone(), user_id);
            }

            Ok(TestDb { pool, user_id_map })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn user_id(&self, username: &str) -> Option<i64> {
            self.user_id_map.get(username).copied()
        }

        pub async fn lesson_id(&self, title: &str) -> Result<i64, sqlx::Error> {
            let (id,): (i64,) = sqlx::query_as("SELECT id FROM lessons WHERE title = ?")
                .bind(title)
                .fetch_one(&self.pool)
                .await?;
            Ok(id)
        }

        pub async fn module_id(&self, title: &str) -> Result<i64, sqlx::Error> {
            let (id,): (i64,) = sqlx::query_as("SELECT id FROM modules WHERE title = ?")
                .bind(title)
                .fetch_one(&self.pool)
                .await?;
            Ok(id)
        }

        pub async fn course_id(&self, title: &str) -> Result<i64, sqlx::Error> {
            let (id,): (i64,) = sqlx::query_as("SELECT id FROM courses WHERE title = ?")
                .bind(title)
                .fetch_one(&self.pool)
                .await?;
            Ok(id)
        }

        pub async fn exercise_id(&self, question: &str) -> Result<i64, sqlx::Error> {
            let (id,): (i64,) = sqlx::query_as("SELECT id FROM exercises WHERE question = ?")
                .bind(question)
                .fetch_one(&self.pool)
                .await?;
            Ok(id)
        }

        pub async fn option_id(&self, exercise_id: i64, correct: bool) -> Result<i64, sqlx::Error> {
            let (id,): (i64,) = sqlx::query_as(
                "SELECT id FROM exercise_options WHERE exercise_id = ? AND is_correct = ?
                 ORDER BY \"order\" LIMIT 1",
            )
            .bind(exercise_id)
            .bind(correct)
            .fetch_one(&self.pool)
            .await?;
            Ok(id)
        }
    }

    /// A learner, an admin and the starter content.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .learner("learner_user")
            .admin("admin_user")
            .with_seed_content()
            .build()
            .await
            .expect("Failed to build test database")
    }
}

#[cfg(test)]
pub mod test_utils {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use rocket::figment::Figment;
    use rocket::figment::providers::Serialized;
    use rocket::http::{ContentType, Header as HttpHeader, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::{Value, json};

    pub use super::test_db::{
        STANDARD_PASSWORD, TestDb, TestDbBuilder, create_standard_test_db, email_for,
    };
    use crate::auth::ClerkClaims;
    use crate::config::AppConfig;
    use crate::init_rocket;

    pub const TEST_CLERK_ISSUER: &str = "https://clerk.german-gains.test";
    pub const TEST_CLERK_PUBLIC_KEY: &str = include_str!("fixtures/clerk_test_public.pem");
    const TEST_CLERK_PRIVATE_KEY: &str = include_str!("fixtures/clerk_test_private.pem");

    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            clerk_pem_public_key: Some(TEST_CLERK_PUBLIC_KEY.to_string()),
            clerk_issuer: Some(TEST_CLERK_ISSUER.to_string()),
            ..AppConfig::default()
        }
    }

    pub fn test_figment(config: &AppConfig) -> Figment {
        rocket::Config::figment()
            .merge(Serialized::globals(config))
            .merge(("log_level", "off"))
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let config = test_config();
        let rocket = init_rocket(test_db.pool.clone(), test_figment(&config))
            .expect("Failed to build rocket");

        let client = Client::tracked(rocket)
            .await
            .expect("valid rocket instance");

        (client, test_db)
    }

    /// Logs in through the API; the tracked client keeps the session cookie.
    pub async fn login_test_user(client: &Client, username: &str, password: &str) -> Value {
        let response = client
            .post("/api/users/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": email_for(username),
                    "password": password,
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok, "Login failed for {}", username);

        let body: Value = response.into_json().await.expect("login response body");
        body["data"]["user"].clone()
    }

    pub async fn logout(client: &Client) {
        let response = client.post("/api/users/logout").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    pub fn clerk_token_with(sub: &str, issuer: &str, expires_in: Duration) -> String {
        let claims = ClerkClaims {
            sub: sub.to_string(),
            exp: (Utc::now() + expires_in).timestamp() as usize,
            iss: Some(issuer.to_string()),
            sid: Some("sess_test".to_string()),
            azp: None,
        };

        let key = EncodingKey::from_rsa_pem(TEST_CLERK_PRIVATE_KEY.as_bytes())
            .expect("test private key");

        encode(&Header::new(Algorithm::RS256), &claims, &key).expect("signed test token")
    }

    pub fn clerk_token(sub: &str) -> String {
        clerk_token_with(sub, TEST_CLERK_ISSUER, Duration::hours(1))
    }

    pub fn bearer(token: &str) -> HttpHeader<'static> {
        HttpHeader::new("Authorization", format!("Bearer {}", token))
    }
}
