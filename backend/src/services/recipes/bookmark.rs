//! Bookmark toggling.

use actix_web::{web, HttpRequest};
use rusqlite::Connection;

use common::model::recipe::BookmarkState;

use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

use crate::services::auth::session::require_user;

pub(crate) fn recipe_exists(conn: &Connection, recipe_id: i64) -> Result<(), ApiError> {
    let found: i64 = conn.query_row(
        "SELECT COUNT(*) FROM recipes WHERE id = ?1",
        [recipe_id],
        |row| row.get(0),
    )?;
    if found == 0 {
        return Err(ApiError::NotFound("recipe"));
    }
    Ok(())
}

/// Flips the bookmark for (user, recipe) and returns the new state.
///
/// The insert relies on the unique (user, recipe) constraint: a no-op
/// insert means the row already existed, so the toggle removes it.
/// Concurrent toggles therefore converge without any explicit locking.
pub(crate) fn toggle(conn: &Connection, user_id: i64, recipe_id: i64) -> Result<bool, ApiError> {
    let inserted = conn.execute(
        "INSERT INTO bookmarks (user_id, recipe_id, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, recipe_id) DO NOTHING",
        rusqlite::params![user_id, recipe_id, db::now()],
    )?;
    if inserted == 1 {
        return Ok(true);
    }
    conn.execute(
        "DELETE FROM bookmarks WHERE user_id = ?1 AND recipe_id = ?2",
        rusqlite::params![user_id, recipe_id],
    )?;
    Ok(false)
}

/// Handler for `POST /api/recipes/{id}/bookmark`.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<web::Json<BookmarkState>, ApiError> {
    let conn = state.db()?;
    let user = require_user(&conn, &req)?;
    let recipe_id = path.into_inner();
    recipe_exists(&conn, recipe_id)?;

    let is_bookmarked = toggle(&conn, user.id, recipe_id)?;
    Ok(web::Json(BookmarkState { is_bookmarked }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_db;
    use crate::services::recipes::fixtures::{insert_recipe, insert_user, SeedRecipe};

    fn bookmark_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM bookmarks", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn toggling_never_leaves_duplicates() {
        let conn = memory_db();
        insert_recipe(
            &conn,
            &SeedRecipe {
                id: 1,
                ..Default::default()
            },
        );
        let user_id = insert_user(&conn, "viewer");

        assert!(toggle(&conn, user_id, 1).unwrap());
        assert_eq!(bookmark_count(&conn), 1);

        assert!(!toggle(&conn, user_id, 1).unwrap());
        assert_eq!(bookmark_count(&conn), 0);

        // An odd number of toggles ends with exactly one row.
        for _ in 0..3 {
            toggle(&conn, user_id, 1).unwrap();
        }
        assert_eq!(bookmark_count(&conn), 1);
    }

    #[test]
    fn missing_recipe_is_a_not_found() {
        let conn = memory_db();
        assert!(matches!(
            recipe_exists(&conn, 99),
            Err(ApiError::NotFound("recipe"))
        ));
    }
}
