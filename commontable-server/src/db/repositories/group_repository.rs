use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use commontable_types::{Group, GroupMember};

use crate::db::DbPool;

/// Matched dinner groups. Groups are written by the external matching
/// process; this repository only reads them.
pub struct GroupRepository {
    pool: DbPool,
}

fn row_to_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
        cycle_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
        location: row.get(2)?,
        created_at: row.get::<_, String>(3)?.parse::<DateTime<Utc>>().unwrap(),
    })
}

impl GroupRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// The user's group for a given cycle, if they were matched
    pub fn for_user_in_cycle(&self, user_id: &Uuid, cycle_id: &Uuid) -> Result<Option<Group>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT g.id, g.cycle_id, g.location, g.created_at
             FROM groups g
             JOIN group_members gm ON gm.group_id = g.id
             WHERE gm.user_id = ? AND g.cycle_id = ?",
        )?;

        let group = stmt
            .query_row((user_id.to_string(), cycle_id.to_string()), row_to_group)
            .optional()?;
        Ok(group)
    }

    /// All groups the user has ever been matched into, newest first
    pub fn history_for_user(&self, user_id: &Uuid) -> Result<Vec<Group>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT g.id, g.cycle_id, g.location, g.created_at
             FROM groups g
             JOIN group_members gm ON gm.group_id = g.id
             WHERE gm.user_id = ?
             ORDER BY g.created_at DESC",
        )?;

        let groups = stmt
            .query_map([user_id.to_string()], row_to_group)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    /// Members of a group with their profile fields, for display at the
    /// table. Members without a saved profile still appear, with empty
    /// display fields.
    pub fn members(&self, group_id: &Uuid) -> Result<Vec<GroupMember>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT gm.group_id, gm.user_id,
                    COALESCE(p.name, ''), COALESCE(p.major, ''), COALESCE(p.year, '')
             FROM group_members gm
             LEFT JOIN profiles p ON p.user_id = gm.user_id
             WHERE gm.group_id = ?
             ORDER BY p.name",
        )?;

        let members = stmt
            .query_map([group_id.to_string()], |row| {
                Ok(GroupMember {
                    group_id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                    user_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
                    name: row.get(2)?,
                    major: row.get(3)?,
                    year: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    const SARAH: &str = "550e8400-e29b-41d4-a716-446655440001";
    const ADMIN: &str = "550e8400-e29b-41d4-a716-446655440004";
    const OCTOBER_CYCLE: &str = "650e8400-e29b-41d4-a716-446655440001";
    const ACTIVE_CYCLE: &str = "650e8400-e29b-41d4-a716-446655440002";

    fn setup() -> GroupRepository {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize database");
        db.seed_test_data().expect("Failed to seed test data");
        GroupRepository::new(db.pool)
    }

    #[test]
    fn test_matched_user_finds_group_with_members() {
        let repo = setup();
        let sarah = Uuid::parse_str(SARAH).unwrap();
        let cycle = Uuid::parse_str(OCTOBER_CYCLE).unwrap();

        let group = repo
            .for_user_in_cycle(&sarah, &cycle)
            .expect("Query failed")
            .expect("Sarah should be matched");
        assert_eq!(group.location, "Commons Dining Hall");

        let members = repo.members(&group.id).expect("Members query failed");
        assert_eq!(members.len(), 3);
        assert!(members.iter().any(|m| m.name == "Sarah Chen"));
    }

    #[test]
    fn test_unmatched_user_has_no_group() {
        let repo = setup();
        let admin = Uuid::parse_str(ADMIN).unwrap();
        let cycle = Uuid::parse_str(OCTOBER_CYCLE).unwrap();

        assert!(repo
            .for_user_in_cycle(&admin, &cycle)
            .expect("Query failed")
            .is_none());
    }

    #[test]
    fn test_no_group_for_cycle_without_matches() {
        let repo = setup();
        let sarah = Uuid::parse_str(SARAH).unwrap();
        let active = Uuid::parse_str(ACTIVE_CYCLE).unwrap();

        assert!(repo
            .for_user_in_cycle(&sarah, &active)
            .expect("Query failed")
            .is_none());
    }

    #[test]
    fn test_history_lists_past_groups() {
        let repo = setup();
        let sarah = Uuid::parse_str(SARAH).unwrap();

        let history = repo.history_for_user(&sarah).expect("Query failed");
        assert_eq!(history.len(), 1);

        let admin = Uuid::parse_str(ADMIN).unwrap();
        assert!(repo.history_for_user(&admin).unwrap().is_empty());
    }
}
