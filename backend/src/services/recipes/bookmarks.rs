//! The viewer's saved recipes.

use actix_web::{web, HttpRequest};

use common::model::recipe::RecipeListResponse;

use crate::error::ApiError;
use crate::state::AppState;

use super::serialize::{map_recipe_row, summaries, RECIPE_COLUMNS};
use crate::services::auth::session::{request_session, session_user};

/// Handler for `GET /api/recipes/bookmarks`. Newest bookmark first; no
/// pagination, the set is naturally small.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<web::Json<RecipeListResponse>, ApiError> {
    let conn = state.db()?;
    let session = request_session(&conn, &req)?;
    let user = session
        .as_ref()
        .map(|s| session_user(&conn, s))
        .transpose()?
        .flatten()
        .ok_or(ApiError::AuthRequired)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r
         JOIN bookmarks b ON b.recipe_id = r.id
         WHERE b.user_id = ?1 ORDER BY b.created_at DESC, b.id DESC"
    ))?;
    let rows = stmt
        .query_map([user.id], map_recipe_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let items = summaries(&conn, &state.config.media_base_url, &rows, Some(user.id))?;
    Ok(web::Json(RecipeListResponse {
        total: items.len() as i64,
        items,
    }))
}
