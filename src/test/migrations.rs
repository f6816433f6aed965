#[cfg(test)]
mod tests {
    use crate::database::{CURRENT_SCHEMA, DeclarativeMigrator, migrate_database, normalize_sql};
    use rocket::tokio;
    use sqlx::{Row, SqlitePool};

    const EMPTY_SCHEMA: &str = "";

    const COURSES_SCHEMA: &str = r#"
        CREATE TABLE courses (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL
        );
    "#;

    const COURSES_AND_MODULES_SCHEMA: &str = r#"
        CREATE TABLE courses (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL
        );

        CREATE TABLE modules (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            course_id INTEGER,
            FOREIGN KEY (course_id) REFERENCES courses (id) ON DELETE CASCADE
        );
    "#;

    const COURSES_WITH_LEVEL_SCHEMA: &str = r#"
        CREATE TABLE courses (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            level TEXT NOT NULL DEFAULT 'A1_1'
        );

        CREATE TABLE modules (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            course_id INTEGER,
            FOREIGN KEY (course_id) REFERENCES courses (id) ON DELETE CASCADE
        );
    "#;

    const COURSES_WITHOUT_TITLE_SCHEMA: &str = r#"
    CREATE TABLE courses (
        id INTEGER PRIMARY KEY
        -- title dropped
    );
    "#;

    const WITH_INDEX_SCHEMA: &str = r#"
    CREATE TABLE courses (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL
    );

    CREATE INDEX idx_courses_title ON courses(title);
    "#;

    async fn create_test_db() -> SqlitePool {
        SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database")
    }

    async fn apply(pool: &SqlitePool, schema: &str) {
        sqlx::raw_sql(schema)
            .execute(pool)
            .await
            .expect("Failed to apply starting schema");
    }

    async fn get_table_names(pool: &SqlitePool) -> Vec<String> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .expect("Failed to fetch table names");

        rows.into_iter().map(|row| row.get::<String, _>(0)).collect()
    }

    async fn get_column_names(pool: &SqlitePool, table: &str) -> Vec<String> {
        sqlx::query(&format!("PRAGMA table_info({})", table))
            .fetch_all(pool)
            .await
            .expect("Failed to read table info")
            .iter()
            .map(|row| row.get::<String, _>("name"))
            .collect()
    }

    async fn index_exists(pool: &SqlitePool, name: &str) -> bool {
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'index' AND name = ?")
            .bind(name)
            .fetch_all(pool)
            .await
            .expect("Failed to read indices");
        !rows.is_empty()
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled_by_default() {
        let pool = create_test_db().await;

        let pragma = sqlx::query("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .expect("Failed to get pragma")
            .get::<i64, _>(0);

        // sqlx turns foreign keys on even though SQLite defaults to off.
        assert_eq!(pragma, 1);
    }

    #[tokio::test]
    async fn test_empty_to_empty_no_changes() {
        let pool = create_test_db().await;

        let changes = DeclarativeMigrator::new(&pool, EMPTY_SCHEMA)
            .migrate()
            .await
            .expect("Empty migration failed");

        assert_eq!(changes, 0);
        assert!(get_table_names(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn test_create_first_table() {
        let pool = create_test_db().await;
        let migrator = DeclarativeMigrator::new(&pool, COURSES_SCHEMA);

        let changes = migrator.migrate().await.expect("Migration failed");
        assert!(changes > 0, "Creating first table should report changes");
        assert_eq!(get_table_names(&pool).await, vec!["courses"]);

        let changes = migrator.migrate().await.expect("Rerun failed");
        assert_eq!(changes, 0, "Re-running same migration should be no-op");
    }

    #[tokio::test]
    async fn test_add_second_table() {
        let pool = create_test_db().await;
        apply(&pool, COURSES_SCHEMA).await;

        let diff = DeclarativeMigrator::new(&pool, COURSES_AND_MODULES_SCHEMA)
            .plan()
            .await
            .unwrap();
        assert_eq!(diff.new_tables, vec!["modules".to_string()]);
        assert!(diff.destructive().is_empty());

        let changes = DeclarativeMigrator::new(&pool, COURSES_AND_MODULES_SCHEMA)
            .migrate()
            .await
            .unwrap();
        assert!(changes > 0);
        assert_eq!(get_table_names(&pool).await, vec!["courses", "modules"]);
    }

    #[tokio::test]
    async fn test_rebuild_preserves_rows() {
        let pool = create_test_db().await;
        apply(&pool, COURSES_AND_MODULES_SCHEMA).await;

        sqlx::query("INSERT INTO courses (id, title) VALUES (1, 'German A1.1')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO modules (title, course_id) VALUES ('Greetings', 1)")
            .execute(&pool)
            .await
            .unwrap();

        let migrator = DeclarativeMigrator::new(&pool, COURSES_WITH_LEVEL_SCHEMA);
        let changes = migrator.migrate().await.expect("Rebuild failed");
        assert!(changes > 0);

        let course = sqlx::query("SELECT title, level FROM courses WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(course.get::<String, _>("title"), "German A1.1");
        assert_eq!(course.get::<String, _>("level"), "A1_1");

        // The rebuild must not cascade into child rows.
        let (modules,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM modules")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(modules, 1);

        assert_eq!(migrator.migrate().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_table_deletion_forbidden() {
        let pool = create_test_db().await;
        apply(&pool, COURSES_AND_MODULES_SCHEMA).await;

        let err = DeclarativeMigrator::new(&pool, COURSES_SCHEMA)
            .migrate()
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("modules"), "Error should name the table: {}", message);
        assert!(message.contains("allow_deletions"));

        assert_eq!(get_table_names(&pool).await, vec!["courses", "modules"]);
    }

    #[tokio::test]
    async fn test_table_deletion_allowed() {
        let pool = create_test_db().await;
        apply(&pool, COURSES_AND_MODULES_SCHEMA).await;

        let changes = DeclarativeMigrator::new(&pool, COURSES_SCHEMA)
            .allow_deletions(true)
            .migrate()
            .await
            .expect("Deletion should be allowed");

        assert!(changes > 0);
        assert_eq!(get_table_names(&pool).await, vec!["courses"]);
    }

    #[tokio::test]
    async fn test_column_deletion_forbidden() {
        let pool = create_test_db().await;
        apply(&pool, COURSES_SCHEMA).await;

        let diff = DeclarativeMigrator::new(&pool, COURSES_WITHOUT_TITLE_SCHEMA)
            .plan()
            .await
            .unwrap();
        let destructive = diff.destructive();
        assert_eq!(destructive.columns_removed.len(), 1);
        assert_eq!(destructive.columns_removed[0].removed_columns, vec!["title".to_string()]);

        let err = DeclarativeMigrator::new(&pool, COURSES_WITHOUT_TITLE_SCHEMA)
            .migrate()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("title"));

        assert!(get_column_names(&pool, "courses").await.contains(&"title".to_string()));
    }

    #[tokio::test]
    async fn test_column_deletion_allowed_keeps_other_data() {
        let pool = create_test_db().await;
        apply(&pool, COURSES_SCHEMA).await;

        sqlx::query("INSERT INTO courses (id, title) VALUES (7, 'German A1.2')")
            .execute(&pool)
            .await
            .unwrap();

        DeclarativeMigrator::new(&pool, COURSES_WITHOUT_TITLE_SCHEMA)
            .allow_deletions(true)
            .migrate()
            .await
            .expect("Column removal should be allowed");

        assert_eq!(get_column_names(&pool, "courses").await, vec!["id"]);

        let (id,): (i64,) = sqlx::query_as("SELECT id FROM courses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(id, 7);
    }

    #[tokio::test]
    async fn test_index_deletion_requires_permission() {
        let pool = create_test_db().await;
        apply(&pool, WITH_INDEX_SCHEMA).await;

        let err = DeclarativeMigrator::new(&pool, COURSES_SCHEMA)
            .migrate()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("idx_courses_title"));
        assert!(index_exists(&pool, "idx_courses_title").await);

        DeclarativeMigrator::new(&pool, COURSES_SCHEMA)
            .allow_deletions(true)
            .migrate()
            .await
            .expect("Index removal should be allowed");
        assert!(!index_exists(&pool, "idx_courses_title").await);
    }

    #[tokio::test]
    async fn test_index_added_to_existing_table() {
        let pool = create_test_db().await;
        apply(&pool, COURSES_SCHEMA).await;

        let diff = DeclarativeMigrator::new(&pool, WITH_INDEX_SCHEMA)
            .plan()
            .await
            .unwrap();
        assert_eq!(diff.new_indices, vec!["idx_courses_title".to_string()]);
        assert!(diff.rebuilt_tables.is_empty());

        DeclarativeMigrator::new(&pool, WITH_INDEX_SCHEMA)
            .migrate()
            .await
            .unwrap();
        assert!(index_exists(&pool, "idx_courses_title").await);
    }

    #[tokio::test]
    async fn test_cosmetic_edits_do_not_rebuild() {
        let pool = create_test_db().await;
        apply(&pool, COURSES_SCHEMA).await;

        let reformatted = r#"
            -- same table, different layout
            CREATE TABLE IF NOT EXISTS "courses" (
                id INTEGER PRIMARY KEY ,
                title   TEXT NOT NULL
            );
        "#;

        let diff = DeclarativeMigrator::new(&pool, reformatted).plan().await.unwrap();
        assert!(diff.is_empty(), "Unexpected diff: {:?}", diff);
    }

    #[test]
    fn test_normalize_sql() {
        assert_eq!(
            normalize_sql("CREATE TABLE test( -- comment\n  id INTEGER )"),
            "CREATE TABLE test(id INTEGER)"
        );

        assert_eq!(
            normalize_sql("CREATE TABLE \"quoted\" (id INTEGER, name TEXT)"),
            "CREATE TABLE quoted(id INTEGER,name TEXT)"
        );

        assert_eq!(
            normalize_sql("CREATE INDEX IF NOT EXISTS idx ON t (a)"),
            "CREATE INDEX idx ON t(a)"
        );
    }

    #[tokio::test]
    async fn test_application_schema_is_stable() {
        let pool = create_test_db().await;

        let first = migrate_database(&pool).await.expect("Initial migration failed");
        assert!(first > 0);

        let tables = get_table_names(&pool).await;
        for expected in [
            "users",
            "user_sessions",
            "courses",
            "modules",
            "lessons",
            "exercises",
            "exercise_options",
            "exercise_progress",
            "sound_groups",
            "german_sounds",
            "sound_group_sounds",
            "practice_days",
            "favorite_words",
        ] {
            assert!(tables.contains(&expected.to_string()), "Missing table {}", expected);
        }

        let second = migrate_database(&pool).await.expect("Rerun failed");
        assert_eq!(second, 0);

        let diff = DeclarativeMigrator::new(&pool, CURRENT_SCHEMA).plan().await.unwrap();
        assert!(diff.destructive().is_empty());
    }
}
