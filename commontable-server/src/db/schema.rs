/// SQL schema for the CommonTable database
/// Creates all tables with proper constraints, foreign keys, and indexes
pub const SCHEMA: &str = r#"
-- Users table (one row per authenticated account)
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    is_admin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    is_test_user INTEGER NOT NULL DEFAULT 0
);

-- Profiles table, 1:1 with users, upserted on save
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    major TEXT NOT NULL DEFAULT '',
    year TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- Dinner cycles. At most one row has is_active = 1; activation paths
-- deactivate all others first.
CREATE TABLE IF NOT EXISTS cycles (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    prompt TEXT NOT NULL,
    event_date TEXT NOT NULL,
    opt_in_deadline TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cycles_is_active ON cycles(is_active);
CREATE INDEX IF NOT EXISTS idx_cycles_created_at ON cycles(created_at DESC);

-- Opt-ins: row existence is the sole signal of "attending"
CREATE TABLE IF NOT EXISTS opt_ins (
    user_id TEXT NOT NULL,
    cycle_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, cycle_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (cycle_id) REFERENCES cycles(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_opt_ins_cycle ON opt_ins(cycle_id);

-- Prompt answers, one per user per cycle
CREATE TABLE IF NOT EXISTS responses (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    cycle_id TEXT NOT NULL,
    answer TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, cycle_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (cycle_id) REFERENCES cycles(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_responses_cycle ON responses(cycle_id);

-- Prompt-seen markers, keyed by cycle id so they never leak across cycles.
-- Set when the user answers or skips the prompt, cleared on opt-out.
CREATE TABLE IF NOT EXISTS prompt_seen (
    user_id TEXT NOT NULL,
    cycle_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, cycle_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (cycle_id) REFERENCES cycles(id) ON DELETE CASCADE
);

-- Community feed posts. The upvotes counter is derived from post_upvotes.
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL CHECK(length(content) <= 500),
    image_url TEXT,
    upvotes INTEGER NOT NULL DEFAULT 0,
    is_anonymous INTEGER NOT NULL DEFAULT 0,
    is_featured INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_posts_featured ON posts(is_featured, upvotes DESC);
CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at DESC);

-- At-most-one-upvote-per-user-per-post, enforced by the primary key
CREATE TABLE IF NOT EXISTS post_upvotes (
    user_id TEXT NOT NULL,
    post_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, post_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_post_upvotes_post ON post_upvotes(post_id);

-- At-most-one-vote-per-user-per-response
CREATE TABLE IF NOT EXISTS response_votes (
    user_id TEXT NOT NULL,
    response_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, response_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (response_id) REFERENCES responses(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_response_votes_response ON response_votes(response_id);

-- Matched dinner groups. Populated by the external matching process;
-- read-only to the API.
CREATE TABLE IF NOT EXISTS groups (
    id TEXT PRIMARY KEY,
    cycle_id TEXT NOT NULL,
    location TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (cycle_id) REFERENCES cycles(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_groups_cycle ON groups(cycle_id);

CREATE TABLE IF NOT EXISTS group_members (
    group_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    PRIMARY KEY (group_id, user_id),
    FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_group_members_user ON group_members(user_id);

-- Sessions table for token authentication
CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
"#;

/// Test data for development and testing
/// Includes:
/// - 4 test users (one admin) with profiles
/// - An active cycle with an event one week out
/// - A finished inactive cycle with a matched group
/// - Featured feed posts with upvotes
pub const TEST_DATA: &str = r#"
-- ============================================================================
-- TEST USERS
-- ============================================================================
-- Password for all seeded users is "dinner123" (bcrypt, cost 10)
INSERT OR IGNORE INTO users (id, email, password_hash, is_admin, created_at, is_test_user) VALUES
    ('550e8400-e29b-41d4-a716-446655440001', 'sarah.chen@yale.edu',   '$2b$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy', 0, '2025-09-01T00:00:00Z', 1),
    ('550e8400-e29b-41d4-a716-446655440002', 'alex.johnson@yale.edu', '$2b$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy', 0, '2025-09-02T00:00:00Z', 1),
    ('550e8400-e29b-41d4-a716-446655440003', 'maya.patel@yale.edu',   '$2b$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy', 0, '2025-09-03T00:00:00Z', 1),
    ('550e8400-e29b-41d4-a716-446655440004', 'admin@yale.edu',        '$2b$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy', 1, '2025-09-01T00:00:00Z', 1);

INSERT OR IGNORE INTO profiles (user_id, name, major, year, email) VALUES
    ('550e8400-e29b-41d4-a716-446655440001', 'Sarah Chen', 'Computer Science', 'Junior', 'sarah.chen@yale.edu'),
    ('550e8400-e29b-41d4-a716-446655440002', 'Alex Johnson', 'Psychology', 'Sophomore', 'alex.johnson@yale.edu'),
    ('550e8400-e29b-41d4-a716-446655440003', 'Maya Patel', 'Economics', 'Senior', 'maya.patel@yale.edu'),
    ('550e8400-e29b-41d4-a716-446655440004', 'Admin', 'Administration', 'Staff', 'admin@yale.edu');

-- ============================================================================
-- CYCLES
-- ============================================================================
-- One finished cycle and one active cycle a week out
INSERT OR IGNORE INTO cycles (id, title, prompt, event_date, opt_in_deadline, is_active, created_at) VALUES
    ('650e8400-e29b-41d4-a716-446655440001', 'October Dinner', 'What''s a skill you''d love to learn but haven''t had time for yet?', '2025-10-16T18:30:00Z', '2025-10-14T23:59:00Z', 0, '2025-10-01T00:00:00Z'),
    ('650e8400-e29b-41d4-a716-446655440002', 'Thursday Dinner', 'If you could have dinner with any historical figure, who would it be and why?', '2025-11-13T18:30:00Z', '2025-11-11T23:59:00Z', 1, '2025-11-01T00:00:00Z');

-- Participation in the finished cycle
INSERT OR IGNORE INTO opt_ins (user_id, cycle_id, created_at) VALUES
    ('550e8400-e29b-41d4-a716-446655440001', '650e8400-e29b-41d4-a716-446655440001', '2025-10-10T12:00:00Z'),
    ('550e8400-e29b-41d4-a716-446655440002', '650e8400-e29b-41d4-a716-446655440001', '2025-10-10T13:00:00Z'),
    ('550e8400-e29b-41d4-a716-446655440003', '650e8400-e29b-41d4-a716-446655440001', '2025-10-11T09:00:00Z');

INSERT OR IGNORE INTO responses (id, user_id, cycle_id, answer, created_at) VALUES
    ('750e8400-e29b-41d4-a716-446655440001', '550e8400-e29b-41d4-a716-446655440001', '650e8400-e29b-41d4-a716-446655440001', 'Pottery. I keep watching wheel-throwing videos at 2am.', '2025-10-10T12:00:00Z'),
    ('750e8400-e29b-41d4-a716-446655440002', '550e8400-e29b-41d4-a716-446655440002', '650e8400-e29b-41d4-a716-446655440001', 'Sailing, before I graduate and move inland forever.', '2025-10-10T13:00:00Z'),
    ('750e8400-e29b-41d4-a716-446655440003', '550e8400-e29b-41d4-a716-446655440003', '650e8400-e29b-41d4-a716-446655440001', 'Bread baking. Real bread, not the no-knead shortcut.', '2025-10-11T09:00:00Z');

INSERT OR IGNORE INTO prompt_seen (user_id, cycle_id, created_at) VALUES
    ('550e8400-e29b-41d4-a716-446655440001', '650e8400-e29b-41d4-a716-446655440001', '2025-10-10T12:00:00Z'),
    ('550e8400-e29b-41d4-a716-446655440002', '650e8400-e29b-41d4-a716-446655440001', '2025-10-10T13:00:00Z'),
    ('550e8400-e29b-41d4-a716-446655440003', '650e8400-e29b-41d4-a716-446655440001', '2025-10-11T09:00:00Z');

-- A matched group for the finished cycle (normally written by the external
-- matching job)
INSERT OR IGNORE INTO groups (id, cycle_id, location, created_at) VALUES
    ('850e8400-e29b-41d4-a716-446655440001', '650e8400-e29b-41d4-a716-446655440001', 'Commons Dining Hall', '2025-10-15T00:00:00Z');

INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES
    ('850e8400-e29b-41d4-a716-446655440001', '550e8400-e29b-41d4-a716-446655440001'),
    ('850e8400-e29b-41d4-a716-446655440001', '550e8400-e29b-41d4-a716-446655440002'),
    ('850e8400-e29b-41d4-a716-446655440001', '550e8400-e29b-41d4-a716-446655440003');

-- ============================================================================
-- FEED POSTS
-- ============================================================================
INSERT OR IGNORE INTO posts (id, user_id, content, image_url, upvotes, is_anonymous, is_featured, created_at) VALUES
    ('950e8400-e29b-41d4-a716-446655440001', '550e8400-e29b-41d4-a716-446655440001', 'Our whole table agreed dining hall pasta peaks on Thursdays. This is science now.', NULL, 2, 0, 1, '2025-10-17T20:00:00Z'),
    ('950e8400-e29b-41d4-a716-446655440002', '550e8400-e29b-41d4-a716-446655440002', 'Met someone who has the same hometown AND the same thesis advisor. Small world.', NULL, 1, 0, 1, '2025-10-17T21:00:00Z'),
    ('950e8400-e29b-41d4-a716-446655440003', '550e8400-e29b-41d4-a716-446655440003', 'hot take from dinner: cereal is soup', NULL, 0, 1, 1, '2025-10-18T09:00:00Z'),
    ('950e8400-e29b-41d4-a716-446655440004', '550e8400-e29b-41d4-a716-446655440001', 'not featured yet, pending review', NULL, 0, 0, 0, '2025-10-18T10:00:00Z');

INSERT OR IGNORE INTO post_upvotes (user_id, post_id, created_at) VALUES
    ('550e8400-e29b-41d4-a716-446655440002', '950e8400-e29b-41d4-a716-446655440001', '2025-10-17T20:05:00Z'),
    ('550e8400-e29b-41d4-a716-446655440003', '950e8400-e29b-41d4-a716-446655440001', '2025-10-17T20:10:00Z'),
    ('550e8400-e29b-41d4-a716-446655440001', '950e8400-e29b-41d4-a716-446655440002', '2025-10-17T21:05:00Z');
"#;
