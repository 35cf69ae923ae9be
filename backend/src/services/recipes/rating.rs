//! Rating submission with upsert semantics.

use actix_web::{web, HttpRequest};
use rusqlite::Connection;

use common::model::recipe::RatingValue;
use common::requests::RatingCreateRequest;

use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

use super::bookmark::recipe_exists;
use crate::services::auth::session::require_user;

/// One rating per (user, recipe); resubmission overwrites the value.
pub(crate) fn upsert(
    conn: &Connection,
    user_id: i64,
    recipe_id: i64,
    value: i64,
) -> Result<i64, ApiError> {
    let now = db::now();
    conn.execute(
        "INSERT INTO ratings (user_id, recipe_id, value, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT(user_id, recipe_id)
         DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        rusqlite::params![user_id, recipe_id, value, now],
    )?;
    let stored = conn.query_row(
        "SELECT value FROM ratings WHERE user_id = ?1 AND recipe_id = ?2",
        rusqlite::params![user_id, recipe_id],
        |row| row.get(0),
    )?;
    Ok(stored)
}

/// Handler for `POST /api/recipes/{id}/rating`.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    payload: web::Json<RatingCreateRequest>,
) -> Result<web::Json<RatingValue>, ApiError> {
    // Range check happens before any lookup or write.
    if !(1..=5).contains(&payload.value) {
        return Err(ApiError::validation("rating must be between 1 and 5"));
    }

    let conn = state.db()?;
    let user = require_user(&conn, &req)?;
    let recipe_id = path.into_inner();
    recipe_exists(&conn, recipe_id)?;

    let value = upsert(&conn, user.id, recipe_id, payload.value)?;
    Ok(web::Json(RatingValue { value }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_db;
    use crate::services::recipes::fixtures::{insert_recipe, insert_user, SeedRecipe};

    #[test]
    fn resubmission_overwrites_the_single_row() {
        let conn = memory_db();
        insert_recipe(
            &conn,
            &SeedRecipe {
                id: 1,
                ..Default::default()
            },
        );
        let user_id = insert_user(&conn, "rater");

        assert_eq!(upsert(&conn, user_id, 1, 3).unwrap(), 3);
        assert_eq!(upsert(&conn, user_id, 1, 5).unwrap(), 5);

        let (count, value): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), MAX(value) FROM ratings WHERE user_id = ?1 AND recipe_id = 1",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(value, 5);
    }

    #[test]
    fn ratings_from_different_users_coexist() {
        let conn = memory_db();
        insert_recipe(
            &conn,
            &SeedRecipe {
                id: 1,
                ..Default::default()
            },
        );
        let a = insert_user(&conn, "a");
        let b = insert_user(&conn, "b");
        upsert(&conn, a, 1, 2).unwrap();
        upsert(&conn, b, 1, 4).unwrap();

        let avg: f64 = conn
            .query_row(
                "SELECT AVG(value) FROM ratings WHERE recipe_id = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(avg, 3.0);
    }
}
