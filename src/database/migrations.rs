use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Connection, Executor, Row, SqliteConnection, SqlitePool};
use tracing::{info, instrument, warn};

use crate::error::AppError;

use super::CURRENT_SCHEMA;

static SQL_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"--[^\n]*(\n|$)").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r" *([(),]) *").unwrap());
static QUOTED_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r#""(\w+)""#).unwrap());
static IF_NOT_EXISTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bIF NOT EXISTS ").unwrap());

/// Reduces a CREATE statement to a canonical form so cosmetic edits to the
/// schema file do not trigger table rebuilds.
pub fn normalize_sql(sql: &str) -> String {
    let sql = SQL_COMMENT.replace_all(sql, " ");
    let sql = WHITESPACE.replace_all(&sql, " ");
    let sql = PUNCTUATION.replace_all(&sql, "$1");
    let sql = QUOTED_IDENT.replace_all(&sql, "$1");
    let sql = IF_NOT_EXISTS.replace_all(&sql, "");

    sql.trim().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub sql: String,
    pub columns: Vec<String>,
}

/// Tables, indices and `user_version` as read from `sqlite_master`.
#[derive(Debug, Default, Clone)]
pub struct SchemaSnapshot {
    pub tables: BTreeMap<String, TableDef>,
    pub indices: BTreeMap<String, String>,
    pub user_version: i64,
}

impl SchemaSnapshot {
    #[instrument(skip_all)]
    pub async fn capture(conn: &mut SqliteConnection) -> Result<Self, AppError> {
        let mut snapshot = SchemaSnapshot::default();

        let rows = sqlx::query(
            "SELECT type, name, sql FROM sqlite_master
             WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&mut *conn)
        .await?;

        for row in rows {
            let kind: String = row.get(0);
            let name: String = row.get(1);
            let sql: String = row.get(2);

            match kind.as_str() {
                "table" => {
                    snapshot.tables.insert(
                        name,
                        TableDef {
                            sql,
                            columns: Vec::new(),
                        },
                    );
                }
                "index" => {
                    snapshot.indices.insert(name, sql);
                }
                _ => {}
            }
        }

        for (name, table) in snapshot.tables.iter_mut() {
            let columns = sqlx::query(&format!("PRAGMA table_info(\"{}\")", name))
                .fetch_all(&mut *conn)
                .await?;
            table.columns = columns.iter().map(|row| row.get::<String, _>(1)).collect();
        }

        snapshot.user_version = sqlx::query("PRAGMA user_version")
            .fetch_one(&mut *conn)
            .await?
            .get::<i64, _>(0);

        Ok(snapshot)
    }

    /// Snapshot of a schema applied to an empty in-memory database.
    pub async fn from_schema(schema: &str) -> Result<Self, AppError> {
        let mut pristine = SqliteConnection::connect("sqlite::memory:").await?;

        if !schema.trim().is_empty() {
            pristine
                .execute(sqlx::raw_sql(schema))
                .await
                .map_err(|e| AppError::Internal(format!("Failed to build target schema: {}", e)))?;
        }

        let snapshot = Self::capture(&mut pristine).await?;
        pristine.close().await?;
        Ok(snapshot)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebuiltTable {
    pub name: String,
    pub removed_columns: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SchemaDiff {
    pub new_tables: Vec<String>,
    pub removed_tables: Vec<String>,
    pub rebuilt_tables: Vec<RebuiltTable>,
    pub new_indices: Vec<String>,
    pub removed_indices: Vec<String>,
    pub changed_indices: Vec<String>,
    pub user_version: Option<i64>,
}

/// Changes that would lose data if applied.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DestructiveChanges {
    pub tables_removed: Vec<String>,
    pub indices_removed: Vec<String>,
    pub columns_removed: Vec<RebuiltTable>,
}

impl DestructiveChanges {
    pub fn is_empty(&self) -> bool {
        self.tables_removed.is_empty()
            && self.indices_removed.is_empty()
            && self.columns_removed.is_empty()
    }
}

impl SchemaDiff {
    pub fn between(current: &SchemaSnapshot, target: &SchemaSnapshot) -> Self {
        let mut diff = SchemaDiff::default();

        for (name, target_table) in &target.tables {
            match current.tables.get(name) {
                None => diff.new_tables.push(name.clone()),
                Some(current_table)
                    if normalize_sql(&current_table.sql) != normalize_sql(&target_table.sql) =>
                {
                    let wanted: BTreeSet<_> = target_table.columns.iter().collect();
                    let removed_columns = current_table
                        .columns
                        .iter()
                        .filter(|c| !wanted.contains(c))
                        .cloned()
                        .collect();

                    diff.rebuilt_tables.push(RebuiltTable {
                        name: name.clone(),
                        removed_columns,
                    });
                }
                Some(_) => {}
            }
        }

        diff.removed_tables = current
            .tables
            .keys()
            .filter(|name| !target.tables.contains_key(*name))
            .cloned()
            .collect();

        for (name, sql) in &target.indices {
            match current.indices.get(name) {
                None => diff.new_indices.push(name.clone()),
                Some(current_sql) if normalize_sql(current_sql) != normalize_sql(sql) => {
                    diff.changed_indices.push(name.clone())
                }
                Some(_) => {}
            }
        }

        diff.removed_indices = current
            .indices
            .keys()
            .filter(|name| !target.indices.contains_key(*name))
            .cloned()
            .collect();

        if target.user_version != current.user_version && target.user_version != 0 {
            diff.user_version = Some(target.user_version);
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.new_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.rebuilt_tables.is_empty()
            && self.new_indices.is_empty()
            && self.removed_indices.is_empty()
            && self.changed_indices.is_empty()
            && self.user_version.is_none()
    }

    pub fn destructive(&self) -> DestructiveChanges {
        DestructiveChanges {
            tables_removed: self.removed_tables.clone(),
            indices_removed: self.removed_indices.clone(),
            columns_removed: self
                .rebuilt_tables
                .iter()
                .filter(|t| !t.removed_columns.is_empty())
                .cloned()
                .collect(),
        }
    }
}

/// Brings a live database in line with a schema file by diffing it against a
/// pristine copy, rebuilding changed tables and refusing to drop anything
/// unless deletions are allowed.
pub struct DeclarativeMigrator<'a> {
    pool: &'a SqlitePool,
    target_schema: &'a str,
    allow_deletions: bool,
}

impl<'a> DeclarativeMigrator<'a> {
    pub fn new(pool: &'a SqlitePool, target_schema: &'a str) -> Self {
        Self {
            pool,
            target_schema,
            allow_deletions: false,
        }
    }

    pub fn allow_deletions(mut self, allow: bool) -> Self {
        self.allow_deletions = allow;
        self
    }

    #[instrument(skip(self))]
    pub async fn plan(&self) -> Result<SchemaDiff, AppError> {
        let target = SchemaSnapshot::from_schema(self.target_schema).await?;
        let mut conn = self.pool.acquire().await?;
        let current = SchemaSnapshot::capture(&mut conn).await?;

        Ok(SchemaDiff::between(&current, &target))
    }

    /// Applies the diff and returns the number of statements executed.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<u32, AppError> {
        info!("Starting declarative database migration");

        let target = SchemaSnapshot::from_schema(self.target_schema).await?;

        let mut conn = self.pool.acquire().await?;
        let current = SchemaSnapshot::capture(&mut conn).await?;
        let diff = SchemaDiff::between(&current, &target);

        if diff.is_empty() {
            info!("No schema changes needed");
            return Ok(0);
        }

        let destructive = diff.destructive();
        if !destructive.is_empty() && !self.allow_deletions {
            return Err(AppError::Internal(format!(
                "Refusing destructive migration {:?}. Set allow_deletions to permit this.",
                destructive
            )));
        }

        // A table rebuild drops the old table, which would fire ON DELETE
        // CASCADE on its children if foreign keys stayed on.
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;

        let result = apply_diff(&mut conn, &current, &target, &diff).await;

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await?;

        let statements = result?;

        if statements > 0 {
            info!("Running VACUUM after migration");
            sqlx::query("VACUUM").execute(&mut *conn).await?;
        }

        info!(statements, "Migration completed");
        Ok(statements)
    }
}

struct SchemaChanges {
    statements: u32,
}

impl SchemaChanges {
    async fn execute(
        &mut self,
        conn: &mut SqliteConnection,
        description: &str,
        sql: &str,
    ) -> Result<(), AppError> {
        info!("Database migration: {} with SQL:\n{}", description, sql);
        sqlx::query(sql).execute(conn).await?;
        self.statements += 1;
        Ok(())
    }
}

async fn apply_diff(
    conn: &mut SqliteConnection,
    current: &SchemaSnapshot,
    target: &SchemaSnapshot,
    diff: &SchemaDiff,
) -> Result<u32, AppError> {
    let mut tx = conn.begin().await?;
    let mut changes = SchemaChanges { statements: 0 };

    for name in &diff.removed_indices {
        changes
            .execute(
                &mut tx,
                &format!("Drop obsolete index {}", name),
                &format!("DROP INDEX \"{}\"", name),
            )
            .await?;
    }

    for name in &diff.new_tables {
        if let Some(table) = target.tables.get(name) {
            changes
                .execute(&mut tx, &format!("Create table {}", name), &table.sql)
                .await?;
        }
    }

    for rebuilt in &diff.rebuilt_tables {
        let (Some(old), Some(new)) = (
            current.tables.get(&rebuilt.name),
            target.tables.get(&rebuilt.name),
        ) else {
            continue;
        };

        let temp_name = format!("{}_migration_new", rebuilt.name);
        changes
            .execute(
                &mut tx,
                &format!("Create replacement for {}", rebuilt.name),
                &rename_create_table(&new.sql, &rebuilt.name, &temp_name),
            )
            .await?;

        let kept: Vec<_> = new
            .columns
            .iter()
            .filter(|c| old.columns.contains(c))
            .map(|c| format!("\"{}\"", c))
            .collect();

        if !kept.is_empty() {
            let columns = kept.join(", ");
            changes
                .execute(
                    &mut tx,
                    &format!("Copy rows into replacement for {}", rebuilt.name),
                    &format!(
                        "INSERT INTO \"{}\" ({}) SELECT {} FROM \"{}\"",
                        temp_name, columns, columns, rebuilt.name
                    ),
                )
                .await?;
        }

        changes
            .execute(
                &mut tx,
                &format!("Drop old {}", rebuilt.name),
                &format!("DROP TABLE \"{}\"", rebuilt.name),
            )
            .await?;
        changes
            .execute(
                &mut tx,
                &format!("Rename replacement to {}", rebuilt.name),
                &format!("ALTER TABLE \"{}\" RENAME TO \"{}\"", temp_name, rebuilt.name),
            )
            .await?;
    }

    for name in &diff.removed_tables {
        changes
            .execute(
                &mut tx,
                &format!("Drop table {}", name),
                &format!("DROP TABLE \"{}\"", name),
            )
            .await?;
    }

    // Rebuilt tables lose their indices, so every target index is checked
    // against what is left.
    let mut remaining = SchemaSnapshot::capture(&mut tx).await?.indices;
    for (name, sql) in &target.indices {
        match remaining.remove(name) {
            Some(existing) if normalize_sql(&existing) == normalize_sql(sql) => {}
            Some(_) => {
                changes
                    .execute(
                        &mut tx,
                        &format!("Drop changed index {}", name),
                        &format!("DROP INDEX \"{}\"", name),
                    )
                    .await?;
                changes
                    .execute(&mut tx, &format!("Recreate index {}", name), sql)
                    .await?;
            }
            None => {
                changes
                    .execute(&mut tx, &format!("Create index {}", name), sql)
                    .await?
            }
        }
    }

    if let Some(version) = diff.user_version {
        changes
            .execute(
                &mut tx,
                &format!("Set user_version to {}", version),
                &format!("PRAGMA user_version = {}", version),
            )
            .await?;
    }

    let violations = sqlx::query("PRAGMA foreign_key_check")
        .fetch_all(&mut *tx)
        .await?;
    if !violations.is_empty() {
        warn!(count = violations.len(), "Foreign key violations after migration");
        return Err(AppError::Internal(format!(
            "Migration left {} foreign key violations",
            violations.len()
        )));
    }

    tx.commit().await?;
    Ok(changes.statements)
}

fn rename_create_table(sql: &str, from: &str, to: &str) -> String {
    let pattern = format!(
        r#"(?i)^\s*CREATE\s+TABLE\s+(IF\s+NOT\s+EXISTS\s+)?("{0}"|{0})"#,
        regex::escape(from)
    );

    match Regex::new(&pattern) {
        Ok(re) => re
            .replace(sql, format!("CREATE TABLE \"{}\"", to).as_str())
            .to_string(),
        Err(_) => sql.replacen(from, to, 1),
    }
}

/// Migrates the application database to [`CURRENT_SCHEMA`].
pub async fn migrate_database(pool: &SqlitePool) -> Result<u32, AppError> {
    DeclarativeMigrator::new(pool, CURRENT_SCHEMA).migrate().await
}
