use anyhow::{Context, Result};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use commontable_types::Profile;

use crate::db::DbPool;

pub struct ProfileRepository {
    pool: DbPool,
}

impl ProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a user's profile. Absence is a valid empty state, not an error.
    pub fn get(&self, user_id: &Uuid) -> Result<Option<Profile>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, name, major, year, email
             FROM profiles
             WHERE user_id = ?",
        )?;

        let profile = stmt
            .query_row([user_id.to_string()], |row| {
                Ok(Profile {
                    user_id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                    name: row.get(1)?,
                    major: row.get(2)?,
                    year: row.get(3)?,
                    email: row.get(4)?,
                })
            })
            .optional()?;

        Ok(profile)
    }

    /// Upsert a profile row keyed by user id
    pub fn upsert(&self, profile: &Profile) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO profiles (user_id, name, major, year, email)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(user_id)
             DO UPDATE SET name = excluded.name, major = excluded.major,
                           year = excluded.year, email = excluded.email",
            (
                profile.user_id.to_string(),
                &profile.name,
                &profile.major,
                &profile.year,
                &profile.email,
            ),
        )
        .context("Failed to upsert profile")?;
        Ok(())
    }
}
