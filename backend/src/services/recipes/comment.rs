//! Comment submission and the moderator notification it triggers.

use std::collections::HashMap;

use actix_web::{web, HttpRequest};
use log::{error, warn};
use rusqlite::Connection;

use common::model::comment::CommentEntry;
use common::requests::CommentCreateRequest;

use crate::accounts::User;
use crate::db;
use crate::error::ApiError;
use crate::notifications::{send_templated_email, NotificationError};
use crate::state::AppState;

use super::bookmark::recipe_exists;
use crate::services::auth::session::require_user;

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 2000;

pub(crate) fn validate_content(content: &str) -> Result<&str, ApiError> {
    let trimmed = content.trim();
    if trimmed.chars().count() < MIN_LENGTH {
        return Err(ApiError::validation(format!(
            "comment must be at least {MIN_LENGTH} characters"
        )));
    }
    if trimmed.chars().count() > MAX_LENGTH {
        return Err(ApiError::validation(format!(
            "comment must be at most {MAX_LENGTH} characters"
        )));
    }
    Ok(trimmed)
}

pub(crate) fn insert_comment(
    conn: &Connection,
    user: &User,
    recipe_id: i64,
    content: &str,
) -> Result<CommentEntry, ApiError> {
    let now = db::now();
    conn.execute(
        "INSERT INTO comments (user_id, recipe_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user.id, recipe_id, content, now],
    )?;
    Ok(CommentEntry {
        id: conn.last_insert_rowid(),
        content: content.to_string(),
        user_name: user.display_name().to_string(),
        is_approved: false,
        created_at: db::parse_timestamp(&now).unwrap_or_else(chrono::Utc::now),
    })
}

/// Emails the configured moderators about a new submission. Every
/// failure mode is logged and swallowed: the comment is already stored.
fn notify_submission(state: &AppState, conn: &Connection, comment: &CommentEntry, recipe_id: i64) {
    let recipients = &state.config.comment_notification_recipients;
    if recipients.is_empty() {
        return;
    }

    let recipe_title: String = match conn.query_row(
        "SELECT title FROM recipes WHERE id = ?1",
        [recipe_id],
        |row| row.get(0),
    ) {
        Ok(title) => title,
        Err(e) => {
            error!("Comment notification skipped, recipe lookup failed: {e}");
            return;
        }
    };

    let mut context = HashMap::new();
    context.insert("recipe_title".to_string(), recipe_title);
    context.insert("author_name".to_string(), comment.user_name.clone());
    context.insert("content".to_string(), comment.content.clone());
    context.insert("created_at".to_string(), comment.created_at.to_rfc3339());

    match send_templated_email(
        conn,
        state.mailer.as_ref(),
        &state.config,
        "comment_notification",
        recipients,
        &context,
    ) {
        Ok(()) => {}
        Err(NotificationError::TemplateNotFound(key)) => {
            warn!(
                "Missing '{key}' template, moderators not notified (comment_id={})",
                comment.id
            );
        }
        Err(e) => {
            error!(
                "Failed to notify moderators about comment (comment_id={}): {e}",
                comment.id
            );
        }
    }
}

/// Handler for `POST /api/recipes/{id}/comments`.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    payload: web::Json<CommentCreateRequest>,
) -> Result<web::Json<CommentEntry>, ApiError> {
    let content = validate_content(&payload.content)?.to_string();

    let conn = state.db()?;
    let user = require_user(&conn, &req)?;
    let recipe_id = path.into_inner();
    recipe_exists(&conn, recipe_id)?;

    let comment = insert_comment(&conn, &user, recipe_id, &content)?;
    notify_submission(&state, &conn, &comment, recipe_id);
    Ok(web::Json(comment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_db;
    use crate::services::recipes::fixtures::{insert_recipe, SeedRecipe};

    #[test]
    fn content_length_limits() {
        assert!(validate_content("ok").is_err());
        assert!(validate_content("  a  ").is_err());
        assert_eq!(validate_content("  yum  ").unwrap(), "yum");
        let long = "x".repeat(2001);
        assert!(validate_content(&long).is_err());
    }

    #[test]
    fn comments_start_unapproved() {
        let conn = memory_db();
        insert_recipe(
            &conn,
            &SeedRecipe {
                id: 1,
                ..Default::default()
            },
        );
        let user_id = crate::services::recipes::fixtures::insert_user(&conn, "c");
        let user = crate::accounts::find_by_id(&conn, user_id).unwrap().unwrap();

        let comment = insert_comment(&conn, &user, 1, "Lovely recipe").unwrap();
        assert!(!comment.is_approved);

        let stored: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM comments WHERE recipe_id = 1 AND is_approved = 0",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, 1);
    }
}
