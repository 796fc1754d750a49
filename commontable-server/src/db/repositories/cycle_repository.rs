use anyhow::{Context, Result};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use chrono::{DateTime, Utc};
use commontable_types::{Cycle, CycleStats};

use crate::db::DbPool;

pub struct CycleRepository {
    pool: DbPool,
}

fn row_to_cycle(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cycle> {
    Ok(Cycle {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
        title: row.get(1)?,
        prompt: row.get(2)?,
        event_date: row.get::<_, String>(3)?.parse::<DateTime<Utc>>().unwrap(),
        opt_in_deadline: row.get::<_, String>(4)?.parse::<DateTime<Utc>>().unwrap(),
        is_active: row.get::<_, i32>(5)? == 1,
        created_at: row.get::<_, String>(6)?.parse::<DateTime<Utc>>().unwrap(),
    })
}

const CYCLE_COLUMNS: &str =
    "id, title, prompt, event_date, opt_in_deadline, is_active, created_at";

impl CycleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the active cycle.
    ///
    /// Uniqueness of the active flag is maintained by the activation paths,
    /// not by a schema constraint. If more than one row is active anyway,
    /// the ordering makes the pick deterministic instead of erroring.
    pub fn get_active(&self) -> Result<Option<Cycle>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CYCLE_COLUMNS}
             FROM cycles
             WHERE is_active = 1
             ORDER BY created_at DESC, id
             LIMIT 1"
        ))?;

        let cycle = stmt.query_row([], row_to_cycle).optional()?;
        Ok(cycle)
    }

    /// Get a cycle by ID
    pub fn get_by_id(&self, cycle_id: &Uuid) -> Result<Option<Cycle>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CYCLE_COLUMNS} FROM cycles WHERE id = ?"
        ))?;

        let cycle = stmt
            .query_row([cycle_id.to_string()], row_to_cycle)
            .optional()?;
        Ok(cycle)
    }

    /// List all cycles, newest first
    pub fn list_all(&self) -> Result<Vec<Cycle>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CYCLE_COLUMNS}
             FROM cycles
             ORDER BY created_at DESC, id"
        ))?;

        let cycles = stmt
            .query_map([], row_to_cycle)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cycles)
    }

    /// Create a cycle and make it the single active one.
    ///
    /// Both statements run on one connection inside a transaction so a
    /// failure cannot leave zero or two active cycles.
    pub fn create_active(&self, cycle: &Cycle) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        tx.execute("UPDATE cycles SET is_active = 0 WHERE is_active = 1", [])
            .context("Failed to deactivate existing cycles")?;

        tx.execute(
            "INSERT INTO cycles (id, title, prompt, event_date, opt_in_deadline, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, 1, ?)",
            (
                cycle.id.to_string(),
                &cycle.title,
                &cycle.prompt,
                cycle.event_date.to_rfc3339(),
                cycle.opt_in_deadline.to_rfc3339(),
                cycle.created_at.to_rfc3339(),
            ),
        )
        .context("Failed to create cycle")?;

        tx.commit().context("Failed to commit cycle creation")?;
        Ok(())
    }

    /// Activate or deactivate a cycle. Activation deactivates all others
    /// first; deactivation only clears the flag on the given row.
    pub fn set_active(&self, cycle_id: &Uuid, active: bool) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        if active {
            tx.execute("UPDATE cycles SET is_active = 0 WHERE is_active = 1", [])
                .context("Failed to deactivate existing cycles")?;
        }

        tx.execute(
            "UPDATE cycles SET is_active = ? WHERE id = ?",
            (if active { 1 } else { 0 }, cycle_id.to_string()),
        )
        .context("Failed to toggle cycle")?;

        tx.commit().context("Failed to commit cycle toggle")?;
        Ok(())
    }

    /// Delete a cycle. Foreign keys cascade to opt-ins, responses, seen
    /// markers and groups.
    pub fn delete(&self, cycle_id: &Uuid) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM cycles WHERE id = ?", [cycle_id.to_string()])
            .context("Failed to delete cycle")?;
        Ok(())
    }

    /// Participation counts for the admin dashboard
    pub fn stats(&self, cycle_id: &Uuid) -> Result<CycleStats> {
        let conn = self.pool.get()?;
        let id = cycle_id.to_string();

        let opt_in_count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM opt_ins WHERE cycle_id = ?",
            [&id],
            |row| row.get(0),
        )?;
        let response_count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM responses WHERE cycle_id = ?",
            [&id],
            |row| row.get(0),
        )?;
        let group_count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM groups WHERE cycle_id = ?",
            [&id],
            |row| row.get(0),
        )?;

        Ok(CycleStats {
            opt_in_count,
            response_count,
            group_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::Duration;

    fn setup() -> CycleRepository {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize database");
        CycleRepository::new(db.pool)
    }

    fn cycle(title: &str, created_at: DateTime<Utc>) -> Cycle {
        Cycle {
            id: Uuid::new_v4(),
            title: title.to_string(),
            prompt: "Who would you have dinner with?".to_string(),
            event_date: created_at + Duration::days(7),
            opt_in_deadline: created_at + Duration::days(5),
            is_active: true,
            created_at,
        }
    }

    fn count_active(repo: &CycleRepository) -> i32 {
        let conn = repo.pool.get().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM cycles WHERE is_active = 1",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_create_active_deactivates_others() {
        let repo = setup();
        let first = cycle("First", Utc::now() - Duration::days(14));
        let second = cycle("Second", Utc::now());

        repo.create_active(&first).expect("Failed to create first");
        repo.create_active(&second).expect("Failed to create second");

        assert_eq!(count_active(&repo), 1);
        let active = repo.get_active().expect("Query failed").unwrap();
        assert_eq!(active.id, second.id);
    }

    #[test]
    fn test_set_active_keeps_at_most_one_active() {
        let repo = setup();
        let first = cycle("First", Utc::now() - Duration::days(14));
        let second = cycle("Second", Utc::now());
        repo.create_active(&first).unwrap();
        repo.create_active(&second).unwrap();

        repo.set_active(&first.id, true).expect("Toggle failed");
        assert_eq!(count_active(&repo), 1);
        assert_eq!(repo.get_active().unwrap().unwrap().id, first.id);

        repo.set_active(&first.id, false).expect("Toggle failed");
        assert_eq!(count_active(&repo), 0);
        assert!(repo.get_active().unwrap().is_none());
    }

    #[test]
    fn test_two_active_rows_resolve_deterministically() {
        let repo = setup();
        let older = cycle("Older", Utc::now() - Duration::days(14));
        let newer = cycle("Newer", Utc::now());
        repo.create_active(&older).unwrap();
        repo.create_active(&newer).unwrap();

        // Force the invariant breach directly in SQL. The connection must
        // go back to the pool before the repository queries below.
        {
            let conn = repo.pool.get().unwrap();
            conn.execute("UPDATE cycles SET is_active = 1", []).unwrap();
        }
        assert_eq!(count_active(&repo), 2);

        let picked = repo.get_active().expect("Query failed").unwrap();
        assert_eq!(picked.id, newer.id, "newest created_at wins");
    }

    #[test]
    fn test_delete_cascades_counts_to_zero() {
        let repo = setup();
        let c = cycle("Doomed", Utc::now());
        repo.create_active(&c).unwrap();

        repo.delete(&c.id).expect("Delete failed");
        assert!(repo.get_by_id(&c.id).unwrap().is_none());
    }
}
