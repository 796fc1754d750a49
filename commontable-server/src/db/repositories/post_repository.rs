use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use commontable_types::{FeedSort, Post};

use crate::db::DbPool;

pub struct PostRepository {
    pool: DbPool,
}

const POST_COLUMNS: &str =
    "p.id, p.user_id, p.content, p.image_url, p.upvotes, p.is_anonymous, p.is_featured, p.created_at";

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
        user_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
        content: row.get(2)?,
        image_url: row.get(3)?,
        upvotes: row.get(4)?,
        is_anonymous: row.get::<_, i32>(5)? == 1,
        is_featured: row.get::<_, i32>(6)? == 1,
        created_at: row.get::<_, String>(7)?.parse::<DateTime<Utc>>().unwrap(),
        user_has_upvoted: row.get::<_, i32>(8)? == 1,
    })
}

impl PostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new post. Posts start unfeatured and enter the feed only
    /// once flagged.
    pub fn create(&self, post: &Post) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO posts (id, user_id, content, image_url, upvotes, is_anonymous, is_featured, created_at)
             VALUES (?, ?, ?, ?, 0, ?, ?, ?)",
            (
                post.id.to_string(),
                post.user_id.to_string(),
                &post.content,
                &post.image_url,
                if post.is_anonymous { 1 } else { 0 },
                if post.is_featured { 1 } else { 0 },
                post.created_at.to_rfc3339(),
            ),
        )
        .context("Failed to create post")?;
        Ok(())
    }

    /// Get a post by ID, with the viewer's upvote state
    pub fn get_by_id(&self, post_id: &Uuid, viewer_id: &Uuid) -> Result<Option<Post>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS},
                    EXISTS(SELECT 1 FROM post_upvotes u
                           WHERE u.post_id = p.id AND u.user_id = ?) as user_has_upvoted
             FROM posts p
             WHERE p.id = ?"
        ))?;

        let post = stmt
            .query_row((viewer_id.to_string(), post_id.to_string()), row_to_post)
            .optional()?;
        Ok(post)
    }

    /// The community feed: featured posts only, annotated with whether the
    /// viewer has upvoted each one.
    pub fn featured_feed(&self, viewer_id: &Uuid, sort: FeedSort, limit: i32) -> Result<Vec<Post>> {
        let order = match sort {
            FeedSort::Top => "p.upvotes DESC, p.created_at DESC",
            FeedSort::Newest => "p.created_at DESC",
        };

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS},
                    EXISTS(SELECT 1 FROM post_upvotes u
                           WHERE u.post_id = p.id AND u.user_id = ?) as user_has_upvoted
             FROM posts p
             WHERE p.is_featured = 1
             ORDER BY {order}
             LIMIT ?"
        ))?;

        let posts = stmt
            .query_map((viewer_id.to_string(), limit), row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    const SARAH: &str = "550e8400-e29b-41d4-a716-446655440001";
    const ALEX: &str = "550e8400-e29b-41d4-a716-446655440002";

    fn setup() -> PostRepository {
        let db = Database::in_memory().expect("Failed to create test database");
        db.initialize().expect("Failed to initialize database");
        db.seed_test_data().expect("Failed to seed test data");
        PostRepository::new(db.pool)
    }

    #[test]
    fn test_feed_is_featured_only_sorted_by_upvotes() {
        let repo = setup();
        let viewer = Uuid::parse_str(SARAH).unwrap();

        let feed = repo
            .featured_feed(&viewer, FeedSort::Top, 20)
            .expect("Feed query failed");

        assert_eq!(feed.len(), 3, "unfeatured post must not appear");
        assert!(feed.iter().all(|p| p.is_featured));
        for pair in feed.windows(2) {
            assert!(pair[0].upvotes >= pair[1].upvotes);
        }

        let trimmed = repo.featured_feed(&viewer, FeedSort::Top, 2).unwrap();
        assert_eq!(trimmed.len(), 2);
    }

    #[test]
    fn test_feed_annotates_viewer_upvotes() {
        let repo = setup();
        let alex = Uuid::parse_str(ALEX).unwrap();

        let feed = repo
            .featured_feed(&alex, FeedSort::Top, 20)
            .expect("Feed query failed");

        // Alex upvoted the pasta post in the seed, nothing else
        let upvoted: Vec<_> = feed.iter().filter(|p| p.user_has_upvoted).collect();
        assert_eq!(upvoted.len(), 1);
        assert!(upvoted[0].content.contains("pasta"));
    }

    #[test]
    fn test_create_post_starts_unfeatured_with_zero_upvotes() {
        let repo = setup();
        let author = Uuid::parse_str(SARAH).unwrap();

        let post = Post {
            id: Uuid::new_v4(),
            user_id: author,
            content: "Dinner was great!".to_string(),
            image_url: None,
            upvotes: 99, // ignored on insert
            is_anonymous: false,
            is_featured: false,
            created_at: Utc::now(),
            user_has_upvoted: false,
        };
        repo.create(&post).expect("Create failed");

        let saved = repo
            .get_by_id(&post.id, &author)
            .expect("Query failed")
            .expect("Post should exist");
        assert_eq!(saved.upvotes, 0);
        assert!(!saved.is_featured);

        let feed = repo.featured_feed(&author, FeedSort::Newest, 20).unwrap();
        assert!(!feed.iter().any(|p| p.id == post.id));
    }

    #[test]
    fn test_content_over_limit_rejected() {
        let repo = setup();
        let post = Post {
            id: Uuid::new_v4(),
            user_id: Uuid::parse_str(SARAH).unwrap(),
            content: "x".repeat(501),
            image_url: None,
            upvotes: 0,
            is_anonymous: false,
            is_featured: false,
            created_at: Utc::now(),
            user_has_upvoted: false,
        };
        assert!(repo.create(&post).is_err());
    }
}
