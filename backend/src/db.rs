//! SQLite persistence: connection opening, schema bootstrap and the seed
//! data the application expects to exist.
//!
//! Connections are opened per request from the configured path; SQLite's
//! uniqueness constraints are the only concurrency control the write
//! endpoints rely on. `init_schema` is idempotent and runs at every start.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::ApiError;

/// Opens a connection with foreign keys enforced.
pub fn open(path: &str) -> Result<Connection, ApiError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(conn)
}

/// Current time as stored in the database (RFC 3339, UTC).
pub fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Parses a stored timestamp back into a `DateTime<Utc>`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn init_schema(conn: &Connection) -> Result<(), ApiError> {
    conn.execute_batch(SCHEMA)?;
    seed_email_templates(conn)?;
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL DEFAULT '',
    full_name     TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1,
    is_staff      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token      TEXT PRIMARY KEY,
    user_id    INTEGER REFERENCES users(id) ON DELETE CASCADE,
    csrf_token TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS password_reset_tokens (
    id         INTEGER PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    used_at    TEXT
);

CREATE TABLE IF NOT EXISTS ingredient_categories (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    slug       TEXT NOT NULL UNIQUE,
    parent_id  INTEGER REFERENCES ingredient_categories(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recipe_categories (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    slug       TEXT NOT NULL UNIQUE,
    parent_id  INTEGER REFERENCES recipe_categories(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ingredients (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    category_id INTEGER REFERENCES ingredient_categories(id),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS measurement_units (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    short_name TEXT NOT NULL,
    unit_type  TEXT NOT NULL CHECK (unit_type IN ('weight', 'volume', 'count')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (name, short_name)
);

CREATE TABLE IF NOT EXISTS meal_types (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    slug       TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cuisines (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    slug       TEXT NOT NULL UNIQUE,
    region     TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cooking_methods (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    slug       TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    slug       TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recipes (
    id               INTEGER PRIMARY KEY,
    title            TEXT NOT NULL,
    slug             TEXT NOT NULL UNIQUE,
    meta_title       TEXT NOT NULL DEFAULT '',
    meta_description TEXT NOT NULL DEFAULT '',
    description      TEXT NOT NULL DEFAULT '',
    description_html TEXT NOT NULL DEFAULT '',
    preparation_time INTEGER NOT NULL,
    cooking_time     INTEGER NOT NULL,
    servings         INTEGER NOT NULL DEFAULT 1,
    difficulty       TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
    image            TEXT,
    video_url        TEXT NOT NULL DEFAULT '',
    published_at     TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recipe_ingredients (
    id            INTEGER PRIMARY KEY,
    recipe_id     INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
    amount        REAL NOT NULL,
    unit_id       INTEGER NOT NULL REFERENCES measurement_units(id),
    note          TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL,
    UNIQUE (recipe_id, ingredient_id)
);

CREATE TABLE IF NOT EXISTS recipe_steps (
    id               INTEGER PRIMARY KEY,
    recipe_id        INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    step_order       INTEGER NOT NULL,
    title            TEXT NOT NULL DEFAULT '',
    description      TEXT NOT NULL,
    description_html TEXT NOT NULL DEFAULT '',
    image            TEXT,
    duration         INTEGER,
    video_url        TEXT NOT NULL DEFAULT '',
    created_at       TEXT NOT NULL,
    UNIQUE (recipe_id, step_order)
);

CREATE TABLE IF NOT EXISTS recipe_tags (
    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    tag_id    INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    UNIQUE (recipe_id, tag_id)
);

CREATE TABLE IF NOT EXISTS recipe_category_links (
    recipe_id   INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    category_id INTEGER NOT NULL REFERENCES recipe_categories(id) ON DELETE CASCADE,
    UNIQUE (recipe_id, category_id)
);

CREATE TABLE IF NOT EXISTS recipe_cuisines (
    recipe_id  INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    cuisine_id INTEGER NOT NULL REFERENCES cuisines(id) ON DELETE CASCADE,
    UNIQUE (recipe_id, cuisine_id)
);

CREATE TABLE IF NOT EXISTS recipe_meal_types (
    recipe_id    INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    meal_type_id INTEGER NOT NULL REFERENCES meal_types(id) ON DELETE CASCADE,
    UNIQUE (recipe_id, meal_type_id)
);

CREATE TABLE IF NOT EXISTS recipe_cooking_methods (
    recipe_id         INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    cooking_method_id INTEGER NOT NULL REFERENCES cooking_methods(id) ON DELETE CASCADE,
    UNIQUE (recipe_id, cooking_method_id)
);

CREATE TABLE IF NOT EXISTS bookmarks (
    id         INTEGER PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    recipe_id  INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, recipe_id)
);

CREATE TABLE IF NOT EXISTS ratings (
    id         INTEGER PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    recipe_id  INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    value      INTEGER NOT NULL CHECK (value BETWEEN 1 AND 5),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (user_id, recipe_id)
);

CREATE TABLE IF NOT EXISTS comments (
    id          INTEGER PRIMARY KEY,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    recipe_id   INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    content     TEXT NOT NULL,
    is_approved INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS email_templates (
    id          INTEGER PRIMARY KEY,
    key         TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    subject     TEXT NOT NULL,
    body_text   TEXT NOT NULL DEFAULT '',
    body_html   TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS site_headers (
    id               INTEGER PRIMARY KEY,
    meta_title       TEXT NOT NULL DEFAULT '',
    meta_description TEXT NOT NULL DEFAULT '',
    meta_keywords    TEXT NOT NULL DEFAULT '',
    description_html TEXT NOT NULL DEFAULT '',
    logo             TEXT,
    is_active        INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS header_menus (
    id          INTEGER PRIMARY KEY,
    header_id   INTEGER NOT NULL REFERENCES site_headers(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    link        TEXT NOT NULL DEFAULT '',
    is_dropdown INTEGER NOT NULL DEFAULT 0,
    icon_svg    TEXT NOT NULL DEFAULT '',
    image       TEXT,
    menu_order  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS header_dropdown_items (
    id         INTEGER PRIMARY KEY,
    menu_id    INTEGER NOT NULL REFERENCES header_menus(id) ON DELETE CASCADE,
    title      TEXT NOT NULL,
    link       TEXT NOT NULL DEFAULT '',
    icon_svg   TEXT NOT NULL DEFAULT '',
    image      TEXT,
    item_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS footers (
    id                INTEGER PRIMARY KEY,
    hero_text_html    TEXT NOT NULL DEFAULT '',
    text_after_footer TEXT NOT NULL DEFAULT '',
    hero_image        TEXT,
    is_active         INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS footer_columns (
    id           INTEGER PRIMARY KEY,
    footer_id    INTEGER NOT NULL REFERENCES footers(id) ON DELETE CASCADE,
    title        TEXT NOT NULL,
    column_order INTEGER NOT NULL DEFAULT 0,
    column_type  TEXT NOT NULL CHECK (column_type IN ('linklist', 'html_text')),
    link_title   TEXT NOT NULL DEFAULT '',
    link         TEXT NOT NULL DEFAULT '',
    html_block   TEXT NOT NULL DEFAULT '',
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS hero_blocks (
    id             INTEGER PRIMARY KEY,
    title          TEXT NOT NULL,
    subtitle       TEXT NOT NULL DEFAULT '',
    hero_text_html TEXT NOT NULL DEFAULT '',
    image          TEXT,
    is_active      INTEGER NOT NULL DEFAULT 1,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);
"#;

/// Inserts the stock email templates unless an operator already created or
/// edited a template under the same key.
fn seed_email_templates(conn: &Connection) -> Result<(), ApiError> {
    let templates: [(&str, &str, &str, &str, &str, &str); 4] = [
        (
            "welcome",
            "Welcome email",
            "Sent after registration or when an account is created for you.",
            "Welcome aboard, {{ user_name }}!",
            "Hello {{ user_name }}!\n\nWe are glad you joined. Sign in to your account and start \
             exploring recipes.\nIf this email reached you by mistake, just ignore it.",
            "<p>Hello <strong>{{ user_name }}</strong>!</p><p>We are glad you joined. Sign in to \
             your account and start exploring recipes.</p><p>If this email reached you by \
             mistake, just ignore it.</p>",
        ),
        (
            "password_reset",
            "Password reset",
            "Standard email with a temporary reset link.",
            "Reset your password",
            "Hello {{ user_name }}!\n\nTo reset your password, follow this link: \
             {{ reset_url }}\nThe link is valid for {{ valid_minutes }} minutes.\nIf you did not \
             request this, ignore the email.",
            "<p>Hello <strong>{{ user_name }}</strong>!</p><p>To reset your password, follow \
             <a href=\"{{ reset_url }}\">this link</a>.</p><p>The link is valid for \
             {{ valid_minutes }} minutes. If you did not request this, ignore the email.</p>",
        ),
        (
            "recipe_review",
            "Recipe awaiting review",
            "Tells the author their submitted recipe is waiting for approval.",
            "Your recipe '{{ recipe_title }}' is awaiting review",
            "Hello {{ user_name }}!\n\nWe received the recipe '{{ recipe_title }}'. The editors \
             will review it and let you know the outcome by email.\nThanks for contributing!",
            "<p>Hello <strong>{{ user_name }}</strong>!</p><p>We received the recipe \
             <em>{{ recipe_title }}</em>. The editors will review it and let you know the \
             outcome by email.</p><p>Thanks for contributing!</p>",
        ),
        (
            "comment_notification",
            "New comment for moderators",
            "Alerts the moderators about a newly submitted comment.",
            "New comment submitted on '{{ recipe_title }}'",
            "Hello,\n\nA new comment was submitted on '{{ recipe_title }}'.\nAuthor: \
             {{ author_name }}\nContent:\n{{ content }}",
            "<p>Hello,</p><p>A new comment was submitted on \
             <strong>{{ recipe_title }}</strong>.</p><ul><li><strong>Author:</strong> \
             {{ author_name }}</li><li><strong>Submitted:</strong> {{ created_at }}</li></ul>\
             <p>{{ content }}</p>",
        ),
    ];

    let now = now();
    for (key, name, description, subject, body_text, body_html) in templates {
        conn.execute(
            "INSERT INTO email_templates
                 (key, name, subject, body_text, body_html, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(key) DO NOTHING",
            rusqlite::params![key, name, subject, body_text, body_html, description, now],
        )?;
    }
    Ok(())
}

#[cfg(test)]
pub mod test_support {
    use rusqlite::Connection;

    /// Fresh in-memory database with the full schema and seeds applied.
    pub fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.pragma_update(None, "foreign_keys", true).unwrap();
        super::init_schema(&conn).expect("init schema");
        conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_bootstrap_is_idempotent() {
        let conn = test_support::memory_db();
        init_schema(&conn).expect("second run");

        let templates: i64 = conn
            .query_row("SELECT COUNT(*) FROM email_templates", [], |row| row.get(0))
            .unwrap();
        assert_eq!(templates, 4);
    }

    #[test]
    fn seeding_keeps_operator_edits() {
        let conn = test_support::memory_db();
        conn.execute(
            "UPDATE email_templates SET subject = 'Custom' WHERE key = 'welcome'",
            [],
        )
        .unwrap();

        init_schema(&conn).unwrap();
        let subject: String = conn
            .query_row(
                "SELECT subject FROM email_templates WHERE key = 'welcome'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(subject, "Custom");
    }

    #[test]
    fn timestamps_roundtrip() {
        let stamp = now();
        assert!(parse_timestamp(&stamp).is_some());
        assert!(parse_timestamp("not-a-date").is_none());
    }
}
