use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use commontable_types::CycleResponse;

use crate::db::DbPool;

/// Per-user participation state for a cycle: opt-in rows, prompt answers,
/// and the prompt-seen markers that drive lifecycle routing.
pub struct ParticipationRepository {
    pool: DbPool,
}

impl ParticipationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Whether an opt-in row exists for (user, cycle)
    pub fn is_opted_in(&self, user_id: &Uuid, cycle_id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM opt_ins WHERE user_id = ? AND cycle_id = ?",
            (user_id.to_string(), cycle_id.to_string()),
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether the user has seen the prompt for this cycle
    pub fn has_seen_prompt(&self, user_id: &Uuid, cycle_id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM prompt_seen WHERE user_id = ? AND cycle_id = ?",
            (user_id.to_string(), cycle_id.to_string()),
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Opt into a cycle. Idempotent: a second opt-in is a no-op.
    pub fn opt_in(&self, user_id: &Uuid, cycle_id: &Uuid) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR IGNORE INTO opt_ins (user_id, cycle_id, created_at) VALUES (?, ?, ?)",
            (
                user_id.to_string(),
                cycle_id.to_string(),
                Utc::now().to_rfc3339(),
            ),
        )
        .context("Failed to opt in")?;
        Ok(())
    }

    /// Mark the cycle's prompt as seen for this user. Idempotent.
    pub fn mark_prompt_seen(&self, user_id: &Uuid, cycle_id: &Uuid) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR IGNORE INTO prompt_seen (user_id, cycle_id, created_at) VALUES (?, ?, ?)",
            (
                user_id.to_string(),
                cycle_id.to_string(),
                Utc::now().to_rfc3339(),
            ),
        )
        .context("Failed to mark prompt seen")?;
        Ok(())
    }

    /// Submit a prompt answer: writes the response, the opt-in row, and the
    /// seen marker in one transaction (answering always opts in).
    pub fn submit_answer(&self, user_id: &Uuid, cycle_id: &Uuid, answer: &str) -> Result<Uuid> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let response_id = Uuid::new_v4();

        tx.execute(
            "INSERT INTO responses (id, user_id, cycle_id, answer, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                response_id.to_string(),
                user_id.to_string(),
                cycle_id.to_string(),
                answer,
                &now,
            ),
        )
        .context("Failed to save response")?;

        tx.execute(
            "INSERT OR IGNORE INTO opt_ins (user_id, cycle_id, created_at) VALUES (?, ?, ?)",
            (user_id.to_string(), cycle_id.to_string(), &now),
        )
        .context("Failed to opt in")?;

        tx.execute(
            "INSERT OR IGNORE INTO prompt_seen (user_id, cycle_id, created_at) VALUES (?, ?, ?)",
            (user_id.to_string(), cycle_id.to_string(), &now),
        )
        .context("Failed to mark prompt seen")?;

        tx.commit().context("Failed to commit answer")?;
        Ok(response_id)
    }

    /// Opt out of a cycle: removes the opt-in row, the user's response, and
    /// the seen marker, in one transaction. The user is routed back to the
    /// prompt afterwards.
    pub fn opt_out(&self, user_id: &Uuid, cycle_id: &Uuid) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let user = user_id.to_string();
        let cycle = cycle_id.to_string();

        tx.execute(
            "DELETE FROM opt_ins WHERE user_id = ? AND cycle_id = ?",
            (&user, &cycle),
        )
        .context("Failed to delete opt-in")?;
        tx.execute(
            "DELETE FROM responses WHERE user_id = ? AND cycle_id = ?",
            (&user, &cycle),
        )
        .context("Failed to delete response")?;
        tx.execute(
            "DELETE FROM prompt_seen WHERE user_id = ? AND cycle_id = ?",
            (&user, &cycle),
        )
        .context("Failed to delete prompt-seen marker")?;

        tx.commit().context("Failed to commit opt-out")?;
        Ok(())
    }

    /// Whether a response row exists
    pub fn response_exists(&self, response_id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM responses WHERE id = ?",
            [response_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get a user's response for a cycle
    pub fn get_response(&self, user_id: &Uuid, cycle_id: &Uuid) -> Result<Option<CycleResponse>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.user_id, r.cycle_id, r.answer, r.created_at,
                    (SELECT COUNT(*) FROM response_votes WHERE response_id = r.id) as votes
             FROM responses r
             WHERE r.user_id = ? AND r.cycle_id = ?",
        )?;

        let response = stmt
            .query_row((user_id.to_string(), cycle_id.to_string()), |row| {
                Ok(CycleResponse {
                    id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                    user_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
                    cycle_id: Uuid::parse_str(&row.get::<_, String>(2)?).unwrap(),
                    answer: row.get(3)?,
                    created_at: row.get::<_, String>(4)?.parse::<DateTime<Utc>>().unwrap(),
                    votes: row.get(5)?,
                    user_has_voted: false,
                })
            })
            .optional()?;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::Duration;
    use commontable_types::{Cycle, User};

    fn setup() -> (ParticipationRepository, Uuid, Uuid) {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize database");

        let user = User {
            id: Uuid::new_v4(),
            email: "student@yale.edu".to_string(),
            is_admin: false,
            created_at: Utc::now(),
            is_test_user: false,
        };
        super::super::UserRepository::new(db.pool.clone())
            .create(&user, "hash")
            .expect("Failed to create user");

        let cycle = Cycle {
            id: Uuid::new_v4(),
            title: "Thursday Dinner".to_string(),
            prompt: "prompt".to_string(),
            event_date: Utc::now() + Duration::days(7),
            opt_in_deadline: Utc::now() + Duration::days(5),
            is_active: true,
            created_at: Utc::now(),
        };
        super::super::CycleRepository::new(db.pool.clone())
            .create_active(&cycle)
            .expect("Failed to create cycle");

        (ParticipationRepository::new(db.pool), user.id, cycle.id)
    }

    #[test]
    fn test_opt_in_then_opt_out_leaves_nothing() {
        let (repo, user_id, cycle_id) = setup();

        repo.opt_in(&user_id, &cycle_id).expect("Opt-in failed");
        assert!(repo.is_opted_in(&user_id, &cycle_id).unwrap());

        repo.opt_out(&user_id, &cycle_id).expect("Opt-out failed");
        assert!(!repo.is_opted_in(&user_id, &cycle_id).unwrap());
        assert!(!repo.has_seen_prompt(&user_id, &cycle_id).unwrap());
        assert!(repo.get_response(&user_id, &cycle_id).unwrap().is_none());
    }

    #[test]
    fn test_submit_answer_opts_in_and_marks_seen() {
        let (repo, user_id, cycle_id) = setup();

        repo.submit_answer(&user_id, &cycle_id, "Marie Curie, obviously")
            .expect("Answer failed");

        assert!(repo.is_opted_in(&user_id, &cycle_id).unwrap());
        assert!(repo.has_seen_prompt(&user_id, &cycle_id).unwrap());
        let response = repo
            .get_response(&user_id, &cycle_id)
            .unwrap()
            .expect("Response should exist");
        assert_eq!(response.answer, "Marie Curie, obviously");
    }

    #[test]
    fn test_second_answer_for_same_cycle_is_rejected() {
        let (repo, user_id, cycle_id) = setup();

        repo.submit_answer(&user_id, &cycle_id, "first").unwrap();
        assert!(repo.submit_answer(&user_id, &cycle_id, "second").is_err());

        // The failed transaction must not have clobbered the original
        let response = repo.get_response(&user_id, &cycle_id).unwrap().unwrap();
        assert_eq!(response.answer, "first");
    }

    #[test]
    fn test_answer_after_opt_out_starts_clean() {
        let (repo, user_id, cycle_id) = setup();

        repo.submit_answer(&user_id, &cycle_id, "first").unwrap();
        repo.opt_out(&user_id, &cycle_id).unwrap();
        repo.submit_answer(&user_id, &cycle_id, "second")
            .expect("Answering again after opt-out should work");

        let response = repo.get_response(&user_id, &cycle_id).unwrap().unwrap();
        assert_eq!(response.answer, "second");
    }

    #[test]
    fn test_seen_markers_do_not_leak_across_cycles() {
        let (repo, user_id, cycle_id) = setup();
        repo.mark_prompt_seen(&user_id, &cycle_id).unwrap();

        let other_cycle = Uuid::new_v4();
        assert!(repo.has_seen_prompt(&user_id, &cycle_id).unwrap());
        assert!(!repo.has_seen_prompt(&user_id, &other_cycle).unwrap());
    }
}
