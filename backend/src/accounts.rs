//! User accounts: lookup, creation, password hashing and the random
//! tokens used by sessions and password resets.

use std::collections::HashMap;

use log::{debug, error, warn};
use rand::RngCore;
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::db;
use crate::error::ApiError;
use crate::notifications::mailer::Mailer;
use crate::notifications::{send_templated_email, NotificationError};

const HASH_ITERATIONS: u32 = 24_000;

#[derive(Clone, Debug)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub is_staff: bool,
}

impl User {
    /// Human-facing name: full name, then email, then username.
    pub fn display_name(&self) -> &str {
        if !self.full_name.is_empty() {
            &self.full_name
        } else if !self.email.is_empty() {
            &self.email
        } else {
            &self.username
        }
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        is_active: row.get(4)?,
        is_staff: row.get(5)?,
    })
}

const USER_COLUMNS: &str = "id, username, email, full_name, is_active, is_staff";

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<User>, ApiError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>, ApiError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            [username],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// Case-insensitive email lookup; first match wins.
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>, ApiError> {
    let user = conn
        .query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE email <> '' AND lower(email) = lower(?1)
                 ORDER BY id LIMIT 1"
            ),
            [email],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// Verifies a password against the stored hash of the given user, by id.
pub fn check_password(conn: &Connection, user_id: i64, password: &str) -> Result<bool, ApiError> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(stored.is_some_and(|hash| verify_password(password, &hash)))
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: &'a str,
    pub is_staff: bool,
}

pub fn create_user(conn: &Connection, new_user: &NewUser<'_>) -> Result<User, ApiError> {
    if new_user.username.trim().is_empty() {
        return Err(ApiError::validation("username must not be empty"));
    }
    if new_user.password.len() < 8 {
        return Err(ApiError::validation(
            "password must be at least 8 characters",
        ));
    }

    let now = db::now();
    conn.execute(
        "INSERT INTO users (username, email, full_name, password_hash, is_staff,
                            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        rusqlite::params![
            new_user.username.trim(),
            new_user.email.trim(),
            new_user.full_name.trim(),
            hash_password(new_user.password),
            new_user.is_staff,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or(ApiError::Internal("user vanished after insert".into()))
}

pub fn set_password(conn: &Connection, user_id: i64, password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation(
            "password must be at least 8 characters",
        ));
    }
    conn.execute(
        "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![hash_password(password), db::now(), user_id],
    )?;
    Ok(())
}

/// Welcome email for a freshly created account. Failures are logged and
/// swallowed; account creation already succeeded.
pub fn send_welcome_email(conn: &Connection, mailer: &dyn Mailer, config: &Config, user: &User) {
    if user.email.is_empty() {
        debug!(
            "Skipping welcome email, user has no address (user_id={})",
            user.id
        );
        return;
    }
    let mut context = HashMap::new();
    context.insert("user_name".to_string(), user.display_name().to_string());

    match send_templated_email(
        conn,
        mailer,
        config,
        "welcome",
        &[user.email.clone()],
        &context,
    ) {
        Ok(()) => {}
        Err(NotificationError::TemplateNotFound(key)) => {
            warn!("Missing '{key}' template, welcome email skipped (user_id={})", user.id);
        }
        Err(e) => {
            error!("Failed to send welcome email (user_id={}): {e}", user.id);
        }
    }
}

// --- Password hashing -----------------------------------------------------
//
// Iterated, salted SHA-256 in the format
// `sha256$<iterations>$<salt>$<digest>`. The iteration count is stored per
// hash so it can be raised without invalidating existing credentials.

pub fn hash_password(password: &str) -> String {
    let salt = random_token();
    let digest = digest_password(password, &salt, HASH_ITERATIONS);
    format!("sha256${HASH_ITERATIONS}${salt}${digest}")
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some("sha256"), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    digest_password(password, salt, iterations) == expected
}

fn digest_password(password: &str, salt: &str, iterations: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();
    for _ in 1..iterations {
        digest = Sha256::digest(digest.as_slice());
    }
    to_hex(digest.as_slice())
}

/// 256-bit random token, hex encoded. Used for sessions, CSRF and
/// password reset links.
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}

/// Hex digest of an arbitrary token, for at-rest storage of secrets that
/// only need equality checks.
pub fn token_digest(token: &str) -> String {
    to_hex(Sha256::digest(token.as_bytes()).as_slice())
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_db;

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "garbage"));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn create_and_find_user() {
        let conn = memory_db();
        let user = create_user(
            &conn,
            &NewUser {
                username: "greta",
                email: "Greta@Example.com",
                password: "longenough",
                full_name: "Greta G.",
                is_staff: false,
            },
        )
        .unwrap();

        assert!(find_by_username(&conn, "greta").unwrap().is_some());
        let by_email = find_by_email(&conn, "greta@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert!(check_password(&conn, user.id, "longenough").unwrap());
        assert!(!check_password(&conn, user.id, "nope").unwrap());
    }

    #[test]
    fn short_passwords_are_rejected_before_insert() {
        let conn = memory_db();
        let err = create_user(
            &conn,
            &NewUser {
                username: "x",
                email: "",
                password: "short",
                full_name: "",
                is_staff: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn display_name_prefers_full_name_then_email() {
        let mut user = User {
            id: 1,
            username: "u".into(),
            email: "e@x".into(),
            full_name: "Full Name".into(),
            is_active: true,
            is_staff: false,
        };
        assert_eq!(user.display_name(), "Full Name");
        user.full_name.clear();
        assert_eq!(user.display_name(), "e@x");
        user.email.clear();
        assert_eq!(user.display_name(), "u");
    }
}
