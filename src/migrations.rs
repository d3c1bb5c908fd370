//! Schema migration framework.
//!
//! Numbered SQL migrations are embedded at compile time via `include_str!`.
//! Each migration runs exactly once, tracked by the `schema_version` table.

use rusqlite::Connection;

struct Migration {
    version: i32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("migrations/001_baseline.sql"),
}];

/// Create the `schema_version` table if it doesn't exist.
fn ensure_schema_version_table(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("Failed to create schema_version table: {}", e))
}

/// Return the highest applied migration version, or 0 if none.
fn current_version(conn: &Connection) -> Result<i32, String> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| format!("Failed to read schema version: {}", e))
}

/// Run all pending migrations.
///
/// Returns the number of migrations applied (0 if already up-to-date).
///
/// Forward-compat guard: if the database has a higher version than the
/// highest known migration, returns an error telling the user to update.
pub fn run_migrations(conn: &Connection) -> Result<usize, String> {
    ensure_schema_version_table(conn)?;

    let current = current_version(conn)?;
    let max_known = MIGRATIONS.last().map(|m| m.version).unwrap_or(0);

    if current > max_known {
        return Err(format!(
            "Database schema version ({}) is newer than this version of paceline supports ({}). \
             Please update paceline to the latest version.",
            current, max_known
        ));
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();

    for migration in &pending {
        conn.execute_batch(migration.sql)
            .map_err(|e| format!("Migration v{} failed: {}", migration.version, e))?;

        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [migration.version],
        )
        .map_err(|e| format!("Failed to record migration v{}: {}", migration.version, e))?;

        log::info!("Applied migration v{}", migration.version);
    }

    Ok(pending.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn mem_db() -> Connection {
        Connection::open_in_memory().expect("in-memory db")
    }

    #[test]
    fn test_fresh_db_applies_baseline() {
        let conn = mem_db();
        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, 1, "should apply exactly 1 migration (baseline)");

        let version = current_version(&conn).expect("version query");
        assert_eq!(version, 1);

        // Verify key tables exist
        for table in ["periods", "goals", "tactics", "tasks", "task_logs", "recipients"] {
            let count: i32 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })
                .unwrap_or_else(|_| panic!("{} table should exist", table));
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn test_idempotency() {
        let conn = mem_db();

        let first = run_migrations(&conn).expect("first run");
        assert_eq!(first, 1);

        let second = run_migrations(&conn).expect("second run");
        assert_eq!(second, 0, "second run should apply no migrations");

        let version = current_version(&conn).expect("version query");
        assert_eq!(version, 1);
    }

    #[test]
    fn test_forward_compat_guard() {
        let conn = mem_db();

        ensure_schema_version_table(&conn).unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (999)", [])
            .unwrap();

        let result = run_migrations(&conn);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(
            err.contains("newer than this version"),
            "error should mention version mismatch: {}",
            err
        );
    }

    #[test]
    fn test_single_active_period_index() {
        let conn = mem_db();
        run_migrations(&conn).expect("migrations");

        conn.execute(
            "INSERT INTO periods (name, start_date, end_date, status)
             VALUES ('Q1', '2024-01-01', '2024-03-24', 'active')",
            [],
        )
        .expect("first active period");

        let second = conn.execute(
            "INSERT INTO periods (name, start_date, end_date, status)
             VALUES ('Q2', '2024-04-01', '2024-06-23', 'active')",
            [],
        );
        assert!(second.is_err(), "second active period must violate the index");

        // A completed period alongside an active one is fine
        conn.execute(
            "INSERT INTO periods (name, start_date, end_date, status)
             VALUES ('Q0', '2023-10-01', '2023-12-23', 'completed')",
            [],
        )
        .expect("completed period coexists");
    }

    #[test]
    fn test_task_logs_unique_per_day() {
        let conn = mem_db();
        run_migrations(&conn).expect("migrations");

        // Seed the parent chain so the duplicate insert below is rejected by
        // the UNIQUE (task_id, log_date) index, not the foreign key.
        conn.execute_batch(
            "INSERT INTO periods (name, start_date, end_date, status)
             VALUES ('Q1', '2024-01-01', '2024-03-24', 'active');
             INSERT INTO goals (period_id, title) VALUES (1, 'goal');
             INSERT INTO tactics (goal_id, title) VALUES (1, 'tactic');
             INSERT INTO tasks (tactic_id, title) VALUES (1, 'task');",
        )
        .expect("seed parent rows");

        conn.execute(
            "INSERT INTO task_logs (task_id, log_date, week_number, completed)
             VALUES (1, '2024-01-05', 1, 1)",
            [],
        )
        .expect("first log");

        let duplicate = conn.execute(
            "INSERT INTO task_logs (task_id, log_date, week_number, completed)
             VALUES (1, '2024-01-05', 1, 0)",
            [],
        );
        assert!(duplicate.is_err(), "duplicate (task, day) must be rejected");
    }
}
