use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use commontable_types::User;

use crate::db::DbPool;

pub struct UserRepository {
    pool: DbPool,
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
        email: row.get(1)?,
        is_admin: row.get::<_, i32>(2)? == 1,
        created_at: row.get::<_, String>(3)?.parse::<DateTime<Utc>>().unwrap(),
        is_test_user: row.get::<_, i32>(4)? == 1,
    })
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user with a bcrypt password hash
    pub fn create(&self, user: &User, password_hash: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO users (id, email, password_hash, is_admin, created_at, is_test_user)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                user.id.to_string(),
                &user.email,
                password_hash,
                if user.is_admin { 1 } else { 0 },
                user.created_at.to_rfc3339(),
                if user.is_test_user { 1 } else { 0 },
            ),
        )
        .context("Failed to create user")?;
        Ok(())
    }

    /// Get user by ID
    pub fn get_by_id(&self, user_id: &Uuid) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, email, is_admin, created_at, is_test_user
             FROM users
             WHERE id = ?",
        )?;

        let user = stmt
            .query_row([user_id.to_string()], row_to_user)
            .optional()?;

        Ok(user)
    }

    /// Get user by email (case-insensitive)
    pub fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, email, is_admin, created_at, is_test_user
             FROM users
             WHERE LOWER(email) = LOWER(?)",
        )?;

        let user = stmt.query_row([email], row_to_user).optional()?;

        Ok(user)
    }

    /// Get the stored password hash for an email, if the account exists
    pub fn get_password_hash(&self, email: &str) -> Result<Option<String>> {
        let conn = self.pool.get()?;
        let hash = conn
            .query_row(
                "SELECT password_hash FROM users WHERE LOWER(email) = LOWER(?)",
                [email],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }
}
