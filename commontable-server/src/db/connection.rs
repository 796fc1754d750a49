use anyhow::{Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use super::schema::{SCHEMA, TEST_DATA};

/// SQLite in-memory database identifier
const MEMORY_DB_PATH: &str = ":memory:";

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Database wrapper with connection pooling support
#[derive(Clone)]
pub struct Database {
    pub pool: DbPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// In-memory databases get a single-connection pool: each sqlite
    /// `:memory:` connection is its own database, so a larger pool would
    /// hand out empty ones.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let is_memory = Self::is_memory_path(&path);
        let manager = Self::create_connection_manager(path)?;
        let builder = if is_memory {
            Pool::builder().max_size(1)
        } else {
            Pool::builder()
        };
        let pool = builder
            .build(manager)
            .context("Failed to create database connection pool")?;
        Ok(Self { pool })
    }

    fn is_memory_path<P: AsRef<Path>>(path: &P) -> bool {
        path.as_ref()
            .to_string_lossy()
            .trim()
            .eq_ignore_ascii_case(MEMORY_DB_PATH)
    }

    /// Create appropriate connection manager based on path
    ///
    /// Foreign keys are enabled per connection; cycle deletion relies on
    /// cascades to clean up opt-ins, responses, seen markers and groups.
    fn create_connection_manager<P: AsRef<Path>>(path: P) -> Result<SqliteConnectionManager> {
        let manager = if Self::is_memory_path(&path) {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path)
        };

        Ok(manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;")))
    }

    /// Create an in-memory database pool (useful for testing)
    pub fn in_memory() -> Result<Self> {
        Self::new(MEMORY_DB_PATH)
    }

    /// Initialize the database schema
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        Ok(())
    }

    /// Seed the database with test data
    pub fn seed_test_data(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(TEST_DATA)
            .context("Failed to seed test data")?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn connection(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .context("Failed to get database connection from pool")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_creation() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().expect("Failed to initialize schema");

        // Verify tables exist
        let conn = db.connection().expect("Failed to get connection");
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .expect("Failed to prepare statement");

        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .expect("Failed to query tables")
            .collect::<Result<Vec<_>, _>>()
            .expect("Failed to collect tables");

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"profiles".to_string()));
        assert!(tables.contains(&"cycles".to_string()));
        assert!(tables.contains(&"opt_ins".to_string()));
        assert!(tables.contains(&"responses".to_string()));
        assert!(tables.contains(&"prompt_seen".to_string()));
        assert!(tables.contains(&"posts".to_string()));
        assert!(tables.contains(&"post_upvotes".to_string()));
        assert!(tables.contains(&"response_votes".to_string()));
        assert!(tables.contains(&"groups".to_string()));
        assert!(tables.contains(&"group_members".to_string()));
        assert!(tables.contains(&"sessions".to_string()));
    }

    #[test]
    fn test_seed_test_data() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().expect("Failed to initialize schema");
        db.seed_test_data().expect("Failed to seed test data");

        let conn = db.connection().expect("Failed to get connection");
        let user_count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE is_test_user = 1",
                [],
                |row| row.get(0),
            )
            .expect("Failed to count test users");
        assert_eq!(user_count, 4);

        // Exactly one active cycle in the seed
        let active_count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM cycles WHERE is_active = 1",
                [],
                |row| row.get(0),
            )
            .expect("Failed to count active cycles");
        assert_eq!(active_count, 1);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::in_memory().expect("Failed to create database");
        db.initialize().expect("Failed to initialize schema");
        db.seed_test_data().expect("Failed to seed test data");
        db.seed_test_data().expect("Second seed should not fail");

        let conn = db.connection().expect("Failed to get connection");
        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .expect("Failed to count users");
        assert_eq!(count, 4);
    }

    #[test]
    fn test_memory_database_detection() {
        let memory_paths = [":memory:", " :memory: ", ":MEMORY:"];

        for path in &memory_paths {
            let db = Database::new(path).expect("Failed to create memory database");
            db.initialize().expect("Failed to initialize schema");
        }
    }
}
