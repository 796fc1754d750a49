use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::db::DbPool;

/// Outcome of a vote toggle, read back from the database after the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub voted: bool,
    pub count: i32,
}

/// Upvotes on posts and votes on prompt responses.
///
/// Both targets use the same toggle shape: a join row keyed by
/// (user, target) enforces at most one vote per user, and the returned
/// count is always recomputed from the rows rather than adjusted by one.
pub struct VoteRepository {
    pool: DbPool,
}

impl VoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Toggle the caller's upvote on a post. Also refreshes the post's
    /// denormalized counter so feed ordering stays consistent.
    pub fn toggle_post_upvote(&self, user_id: &Uuid, post_id: &Uuid) -> Result<ToggleOutcome> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let user = user_id.to_string();
        let post = post_id.to_string();

        let removed = tx
            .execute(
                "DELETE FROM post_upvotes WHERE user_id = ? AND post_id = ?",
                (&user, &post),
            )
            .context("Failed to remove upvote")?;

        let voted = if removed == 0 {
            tx.execute(
                "INSERT INTO post_upvotes (user_id, post_id, created_at) VALUES (?, ?, ?)",
                (&user, &post, Utc::now().to_rfc3339()),
            )
            .context("Failed to add upvote")?;
            true
        } else {
            false
        };

        let count: i32 = tx.query_row(
            "SELECT COUNT(*) FROM post_upvotes WHERE post_id = ?",
            [&post],
            |row| row.get(0),
        )?;
        tx.execute(
            "UPDATE posts SET upvotes = ? WHERE id = ?",
            (count, &post),
        )
        .context("Failed to refresh upvote count")?;

        tx.commit().context("Failed to commit upvote toggle")?;
        Ok(ToggleOutcome { voted, count })
    }

    /// Toggle the caller's vote on a prompt response. Response vote counts
    /// are always derived, so there is no counter to refresh.
    pub fn toggle_response_vote(
        &self,
        user_id: &Uuid,
        response_id: &Uuid,
    ) -> Result<ToggleOutcome> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let user = user_id.to_string();
        let response = response_id.to_string();

        let removed = tx
            .execute(
                "DELETE FROM response_votes WHERE user_id = ? AND response_id = ?",
                (&user, &response),
            )
            .context("Failed to remove vote")?;

        let voted = if removed == 0 {
            tx.execute(
                "INSERT INTO response_votes (user_id, response_id, created_at) VALUES (?, ?, ?)",
                (&user, &response, Utc::now().to_rfc3339()),
            )
            .context("Failed to add vote")?;
            true
        } else {
            false
        };

        let count: i32 = tx.query_row(
            "SELECT COUNT(*) FROM response_votes WHERE response_id = ?",
            [&response],
            |row| row.get(0),
        )?;

        tx.commit().context("Failed to commit vote toggle")?;
        Ok(ToggleOutcome { voted, count })
    }

    /// Whether the user currently has an upvote on the post
    pub fn has_upvoted(&self, user_id: &Uuid, post_id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM post_upvotes WHERE user_id = ? AND post_id = ?",
            (user_id.to_string(), post_id.to_string()),
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::PostRepository;
    use crate::db::Database;

    const SARAH: &str = "550e8400-e29b-41d4-a716-446655440001";
    const ALEX: &str = "550e8400-e29b-41d4-a716-446655440002";
    const MAYA: &str = "550e8400-e29b-41d4-a716-446655440003";
    const PASTA_POST: &str = "950e8400-e29b-41d4-a716-446655440001";
    const POTTERY_RESPONSE: &str = "750e8400-e29b-41d4-a716-446655440001";

    fn setup() -> (VoteRepository, PostRepository) {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize database");
        db.seed_test_data().expect("Failed to seed test data");
        (
            VoteRepository::new(db.pool.clone()),
            PostRepository::new(db.pool),
        )
    }

    #[test]
    fn test_toggle_twice_restores_original_count() {
        let (votes, posts) = setup();
        let sarah = Uuid::parse_str(SARAH).unwrap();
        let post_id = Uuid::parse_str(PASTA_POST).unwrap();

        let before = posts.get_by_id(&post_id, &sarah).unwrap().unwrap().upvotes;

        let on = votes.toggle_post_upvote(&sarah, &post_id).unwrap();
        assert!(on.voted);
        assert_eq!(on.count, before + 1);

        let off = votes.toggle_post_upvote(&sarah, &post_id).unwrap();
        assert!(!off.voted);
        assert_eq!(off.count, before);

        let after = posts.get_by_id(&post_id, &sarah).unwrap().unwrap();
        assert_eq!(after.upvotes, before);
        assert!(!after.user_has_upvoted);
    }

    #[test]
    fn test_count_reflects_all_voters_not_just_caller() {
        let (votes, _) = setup();
        let sarah = Uuid::parse_str(SARAH).unwrap();
        let post_id = Uuid::parse_str(PASTA_POST).unwrap();

        // Alex and Maya already upvoted in the seed
        let outcome = votes.toggle_post_upvote(&sarah, &post_id).unwrap();
        assert_eq!(outcome.count, 3);
    }

    #[test]
    fn test_removing_vote_does_not_touch_other_voters() {
        let (votes, _) = setup();
        let alex = Uuid::parse_str(ALEX).unwrap();
        let maya = Uuid::parse_str(MAYA).unwrap();
        let post_id = Uuid::parse_str(PASTA_POST).unwrap();

        let outcome = votes.toggle_post_upvote(&alex, &post_id).unwrap();
        assert!(!outcome.voted);
        assert_eq!(outcome.count, 1);
        assert!(votes.has_upvoted(&maya, &post_id).unwrap());
    }

    #[test]
    fn test_response_vote_toggle() {
        let (votes, _) = setup();
        let alex = Uuid::parse_str(ALEX).unwrap();
        let response_id = Uuid::parse_str(POTTERY_RESPONSE).unwrap();

        let on = votes.toggle_response_vote(&alex, &response_id).unwrap();
        assert!(on.voted);
        assert_eq!(on.count, 1);

        let off = votes.toggle_response_vote(&alex, &response_id).unwrap();
        assert!(!off.voted);
        assert_eq!(off.count, 0);
    }
}
