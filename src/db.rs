//! Local SQLite database layer for Beanline.
//!
//! Uses rusqlite with WAL mode. Provides schema migrations, settings
//! helpers, and managed state for use across Tauri commands. The store is
//! the single serialization point for queue-number computation: the
//! position query runs inside the same connection that inserted the order.

use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Tauri managed state holding the database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Initialize the database at `{app_data_dir}/beanline.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(app_data_dir: &Path) -> Result<DbState, String> {
    fs::create_dir_all(app_data_dir).map_err(|e| format!("Failed to create data dir: {e}"))?;

    let db_path = app_data_dir.join("beanline.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                // Also remove WAL/SHM files if present
                let wal = db_path.with_extension("db-wal");
                let shm = db_path.with_extension("db-shm");
                let _ = fs::remove_file(&wal);
                let _ = fs::remove_file(&shm);
            }
            open_and_configure(&db_path)
                .map_err(|e| format!("Database open failed after retry: {e}"))?
        }
    };

    run_migrations(&conn)?;

    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> Result<Connection, String> {
    let conn = Connection::open(path).map_err(|e| format!("sqlite open: {e}"))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| format!("pragma setup: {e}"))?;

    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<(), String> {
    // Ensure schema_version table exists first
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("create schema_version: {e}"))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }
    if current < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

/// Migration v1: settings store and the drink/option catalog.
fn migrate_v1(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        -- local_settings (category/key/value store)
        CREATE TABLE IF NOT EXISTS local_settings (
            id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
            setting_category TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            UNIQUE(setting_category, setting_key)
        );

        -- drink_categories
        CREATE TABLE IF NOT EXISTS drink_categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        );

        -- drinks
        CREATE TABLE IF NOT EXISTS drinks (
            id TEXT PRIMARY KEY,
            category_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            preparation_minutes INTEGER NOT NULL DEFAULT 3,
            display_order INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(category_id) REFERENCES drink_categories(id)
        );

        -- option_categories (customization taxonomy, e.g. milk type)
        CREATE TABLE IF NOT EXISTS option_categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            required INTEGER NOT NULL DEFAULT 0,
            display_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        );

        -- option_values
        CREATE TABLE IF NOT EXISTS option_values (
            id TEXT PRIMARY KEY,
            option_category_id TEXT NOT NULL,
            value TEXT NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(option_category_id) REFERENCES option_categories(id) ON DELETE CASCADE
        );

        -- drink_options (which option categories apply to a drink)
        CREATE TABLE IF NOT EXISTS drink_options (
            id TEXT PRIMARY KEY,
            drink_id TEXT NOT NULL,
            option_category_id TEXT NOT NULL,
            default_value_id TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            UNIQUE(drink_id, option_category_id),
            FOREIGN KEY(drink_id) REFERENCES drinks(id) ON DELETE CASCADE,
            FOREIGN KEY(option_category_id) REFERENCES option_categories(id) ON DELETE CASCADE,
            FOREIGN KEY(default_value_id) REFERENCES option_values(id) ON DELETE SET NULL
        );

        -- Record migration
        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| {
        error!("Migration v1 failed: {e}");
        format!("migration v1: {e}")
    })?;

    info!("Applied migration v1 (settings + catalog tables)");
    Ok(())
}

/// Migration v2: orders and the per-order option choices.
fn migrate_v2(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        -- orders
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            guest_name TEXT NOT NULL,
            drink_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK(status IN('pending','ready','completed','cancelled')),
            queue_number INTEGER,
            special_request TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(drink_id) REFERENCES drinks(id)
        );

        -- order_options (guest's chosen value per category)
        CREATE TABLE IF NOT EXISTS order_options (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL,
            option_category_id TEXT NOT NULL,
            option_value_id TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            UNIQUE(order_id, option_category_id),
            FOREIGN KEY(order_id) REFERENCES orders(id) ON DELETE CASCADE,
            FOREIGN KEY(option_category_id) REFERENCES option_categories(id),
            FOREIGN KEY(option_value_id) REFERENCES option_values(id)
        );

        -- Record migration
        INSERT INTO schema_version (version) VALUES (2);
        ",
    )
    .map_err(|e| {
        error!("Migration v2 failed: {e}");
        format!("migration v2: {e}")
    })?;

    info!("Applied migration v2 (orders + order_options)");
    Ok(())
}

/// Migration v3: indexes for the queue-position and dashboard queries.
fn migrate_v3(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_orders_status_created
            ON orders(status, created_at);
        CREATE INDEX IF NOT EXISTS idx_order_options_order_id
            ON order_options(order_id);
        CREATE INDEX IF NOT EXISTS idx_drinks_category_id
            ON drinks(category_id);
        CREATE INDEX IF NOT EXISTS idx_option_values_category_id
            ON option_values(option_category_id);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (3);
        ",
    )
    .map_err(|e| {
        error!("Migration v3 failed: {e}");
        format!("migration v3: {e}")
    })?;

    info!("Applied migration v3 (queue/dashboard indexes)");
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings helpers
// ---------------------------------------------------------------------------

/// Get a single setting value.
pub fn get_setting(conn: &Connection, category: &str, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT setting_value FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
        |row| row.get(0),
    )
    .ok()
}

/// Insert or update a setting.
pub fn set_setting(
    conn: &Connection,
    category: &str,
    key: &str,
    value: &str,
) -> Result<(), String> {
    conn.execute(
        "INSERT INTO local_settings (setting_category, setting_key, setting_value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_category, setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = excluded.updated_at",
        params![category, key, value],
    )
    .map_err(|e| format!("set_setting: {e}"))?;
    Ok(())
}

/// Run all migrations on the given connection (test helper, not public API).
#[cfg(test)]
pub fn run_migrations_for_test(conn: &Connection) {
    run_migrations(conn).expect("run_migrations should succeed in test");
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    /// Open an in-memory database and apply pragmas (mirrors open_and_configure).
    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )
        .expect("pragma setup");
        conn
    }

    /// Helper: list table names in the database.
    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("prepare table list");
        stmt.query_map([], |row| row.get(0))
            .expect("query tables")
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_migrations_v1_to_latest() {
        let conn = test_db();
        run_migrations(&conn).expect("run_migrations should succeed");

        let tables = table_names(&conn);

        // v1 tables
        for table in [
            "local_settings",
            "drink_categories",
            "drinks",
            "option_categories",
            "option_values",
            "drink_options",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }

        // v2 tables
        assert!(tables.contains(&"orders".to_string()), "missing orders");
        assert!(
            tables.contains(&"order_options".to_string()),
            "missing order_options"
        );

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .expect("schema version");
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = test_db();
        run_migrations(&conn).expect("first run");
        run_migrations(&conn).expect("second run should be a no-op");
    }

    #[test]
    fn test_order_status_check_constraint() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        conn.execute(
            "INSERT INTO drink_categories (id, name) VALUES ('c1', 'Coffee')",
            [],
        )
        .expect("insert category");
        conn.execute(
            "INSERT INTO drinks (id, category_id, name) VALUES ('d1', 'c1', 'Latte')",
            [],
        )
        .expect("insert drink");

        let bad = conn.execute(
            "INSERT INTO orders (id, guest_name, drink_id, status, created_at, updated_at)
             VALUES ('o1', 'Ada', 'd1', 'teleported', datetime('now'), datetime('now'))",
            [],
        );
        assert!(bad.is_err(), "unknown status should violate CHECK");
    }

    #[test]
    fn test_order_options_cascade_on_order_delete() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        conn.execute_batch(
            "INSERT INTO drink_categories (id, name) VALUES ('c1', 'Coffee');
             INSERT INTO drinks (id, category_id, name) VALUES ('d1', 'c1', 'Latte');
             INSERT INTO option_categories (id, name) VALUES ('oc1', 'Milk');
             INSERT INTO option_values (id, option_category_id, value) VALUES ('ov1', 'oc1', 'Oat');
             INSERT INTO orders (id, guest_name, drink_id, created_at, updated_at)
                 VALUES ('o1', 'Ada', 'd1', datetime('now'), datetime('now'));
             INSERT INTO order_options (id, order_id, option_category_id, option_value_id)
                 VALUES ('x1', 'o1', 'oc1', 'ov1');",
        )
        .expect("seed");

        conn.execute("DELETE FROM orders WHERE id = 'o1'", [])
            .expect("delete order");
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM order_options", [], |row| row.get(0))
            .expect("count options");
        assert_eq!(remaining, 0, "order_options should cascade");
    }

    #[test]
    fn test_settings_roundtrip_and_upsert() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        set_setting(&conn, "gate", "lockout_attempts", "2").expect("set");
        assert_eq!(
            get_setting(&conn, "gate", "lockout_attempts").as_deref(),
            Some("2")
        );

        set_setting(&conn, "gate", "lockout_attempts", "3").expect("upsert");
        assert_eq!(
            get_setting(&conn, "gate", "lockout_attempts").as_deref(),
            Some("3")
        );

        assert!(get_setting(&conn, "gate", "missing").is_none());
    }
}
