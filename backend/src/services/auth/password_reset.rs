//! Password reset: link issuance over email and token consumption.
//!
//! The reset link points at the frontend
//! (`FRONTEND_URL` + `PASSWORD_RESET_PATH`) with a url-safe-base64 user id
//! and a one-shot token. Only the token's digest is stored; tokens expire
//! after the configured validity window and are invalidated on first use.

use std::collections::HashMap;

use actix_web::{web, HttpRequest, HttpResponse};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use log::{debug, error, warn};
use rusqlite::Connection;

use common::model::user::PasswordResetSent;
use common::requests::{PasswordResetConfirmRequest, PasswordResetRequest};

use crate::accounts::{self, random_token, token_digest, User};
use crate::config::Config;
use crate::db;
use crate::error::ApiError;
use crate::notifications::{send_templated_email, NotificationError};
use crate::state::AppState;

use super::session::verified_session;

fn encode_uid(user_id: i64) -> String {
    URL_SAFE_NO_PAD.encode(user_id.to_string())
}

fn decode_uid(uid: &str) -> Option<i64> {
    let bytes = URL_SAFE_NO_PAD.decode(uid).ok()?;
    String::from_utf8(bytes).ok()?.parse().ok()
}

/// Creates a reset token for the user and returns the full reset URL.
fn issue_reset_link(conn: &Connection, config: &Config, user: &User) -> Result<String, ApiError> {
    let token = random_token();
    let now = db::now();
    let expires_at = (chrono::Utc::now()
        + Duration::minutes(config.password_reset_timeout_minutes))
    .to_rfc3339();
    conn.execute(
        "INSERT INTO password_reset_tokens (user_id, token_hash, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user.id, token_digest(&token), now, expires_at],
    )?;

    let path = config
        .password_reset_path
        .replace("{uid}", &encode_uid(user.id))
        .replace("{token}", &token);
    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    };
    Ok(format!("{}{path}", config.frontend_url))
}

/// Handler for `POST /api/auth/password-reset`.
///
/// Always answers `{sent: true}`; whether a user exists behind the
/// address is not observable from the outside.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<PasswordResetRequest>,
) -> Result<HttpResponse, ApiError> {
    let conn = state.db()?;
    verified_session(&conn, &req)?;

    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("invalid email address"));
    }

    match accounts::find_by_email(&conn, email)? {
        Some(user) if user.is_active => {
            let reset_url = issue_reset_link(&conn, &state.config, &user)?;
            let mut context = HashMap::new();
            context.insert("email".to_string(), user.email.clone());
            context.insert("user_name".to_string(), user.display_name().to_string());
            context.insert("reset_url".to_string(), reset_url);
            context.insert(
                "valid_minutes".to_string(),
                state.config.password_reset_timeout_minutes.to_string(),
            );

            match send_templated_email(
                &conn,
                state.mailer.as_ref(),
                &state.config,
                "password_reset",
                &[user.email.clone()],
                &context,
            ) {
                Ok(()) => {}
                Err(NotificationError::TemplateNotFound(key)) => warn!(
                    "Missing '{key}' template, reset email not sent (user_id={})",
                    user.id
                ),
                Err(e) => error!(
                    "Failed to send password reset email (user_id={}): {e}",
                    user.id
                ),
            }
        }
        _ => debug!("Password reset requested for {email}, no active user found"),
    }

    Ok(HttpResponse::Ok().json(PasswordResetSent { sent: true }))
}

/// Looks up a live reset token row for the user. Returns its id.
fn valid_token_row(
    conn: &Connection,
    user_id: i64,
    token: &str,
) -> Result<Option<i64>, ApiError> {
    use rusqlite::OptionalExtension;
    let row = conn
        .query_row(
            "SELECT id FROM password_reset_tokens
             WHERE user_id = ?1 AND token_hash = ?2 AND used_at IS NULL AND expires_at > ?3",
            rusqlite::params![user_id, token_digest(token), db::now()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(row)
}

/// Handler for `POST /api/auth/password-reset/confirm`.
pub async fn confirm(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<PasswordResetConfirmRequest>,
) -> Result<HttpResponse, ApiError> {
    let conn = state.db()?;
    verified_session(&conn, &req)?;

    let user = decode_uid(&payload.uid)
        .map(|id| accounts::find_by_id(&conn, id))
        .transpose()?
        .flatten()
        .filter(|user| user.is_active);
    let Some(user) = user else {
        return Err(ApiError::validation("invalid or expired reset link"));
    };

    let Some(token_id) = valid_token_row(&conn, user.id, &payload.token)? else {
        return Err(ApiError::validation("invalid or expired reset link"));
    };

    accounts::set_password(&conn, user.id, &payload.new_password)?;
    conn.execute(
        "UPDATE password_reset_tokens SET used_at = ?1 WHERE id = ?2",
        rusqlite::params![db::now(), token_id],
    )?;
    // Any live session of the user predates the new password; drop them.
    conn.execute("DELETE FROM sessions WHERE user_id = ?1", [user.id])?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::NewUser;
    use crate::db::test_support::memory_db;
    use crate::notifications::test_config;

    #[test]
    fn uid_roundtrip() {
        assert_eq!(decode_uid(&encode_uid(42)), Some(42));
        assert_eq!(decode_uid("###"), None);
    }

    #[test]
    fn reset_link_contains_uid_and_token() {
        let conn = memory_db();
        let config = test_config();
        let user = accounts::create_user(
            &conn,
            &NewUser {
                username: "greta",
                email: "g@example.com",
                password: "longenough",
                full_name: "",
                is_staff: false,
            },
        )
        .unwrap();

        let url = issue_reset_link(&conn, &config, &user).unwrap();
        assert!(url.starts_with("http://localhost:5173/auth/reset-password/"));

        let token_part = url.rsplit('/').next().unwrap();
        assert_eq!(
            valid_token_row(&conn, user.id, token_part).unwrap().is_some(),
            true
        );
    }

    #[test]
    fn tokens_are_single_use_and_expiring() {
        let conn = memory_db();
        let config = test_config();
        let user = accounts::create_user(
            &conn,
            &NewUser {
                username: "greta",
                email: "g@example.com",
                password: "longenough",
                full_name: "",
                is_staff: false,
            },
        )
        .unwrap();
        let url = issue_reset_link(&conn, &config, &user).unwrap();
        let token = url.rsplit('/').next().unwrap().to_string();

        let token_id = valid_token_row(&conn, user.id, &token).unwrap().unwrap();
        conn.execute(
            "UPDATE password_reset_tokens SET used_at = ?1 WHERE id = ?2",
            rusqlite::params![db::now(), token_id],
        )
        .unwrap();
        assert!(valid_token_row(&conn, user.id, &token).unwrap().is_none());

        let url = issue_reset_link(&conn, &config, &user).unwrap();
        let token = url.rsplit('/').next().unwrap().to_string();
        conn.execute(
            "UPDATE password_reset_tokens SET expires_at = '2000-01-01T00:00:00+00:00'",
            [],
        )
        .unwrap();
        assert!(valid_token_row(&conn, user.id, &token).unwrap().is_none());
    }

    #[test]
    fn wrong_tokens_do_not_validate() {
        let conn = memory_db();
        let config = test_config();
        let user = accounts::create_user(
            &conn,
            &NewUser {
                username: "greta",
                email: "g@example.com",
                password: "longenough",
                full_name: "",
                is_staff: false,
            },
        )
        .unwrap();
        issue_reset_link(&conn, &config, &user).unwrap();
        assert!(valid_token_row(&conn, user.id, "bogus").unwrap().is_none());
    }
}
