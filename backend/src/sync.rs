//! Index synchronization hooks.
//!
//! Mutation handlers call these directly after their transaction has
//! committed; nothing here runs inside a transaction. A crash between the
//! commit and the hook leaves the index stale until the next mutation of
//! the same recipe, which the adapter's self-healing upsert tolerates.

use log::info;
use rusqlite::Connection;

use crate::error::ApiError;
use crate::search_index::SearchIndex;

/// Post-commit hook for any durable change touching a recipe: the recipe
/// row itself, its ingredient joins, or its tag/category/cuisine links.
/// The upsert decides on its own whether the durable state maps to a
/// document or a deletion.
pub async fn recipe_saved(search: &SearchIndex, conn: &Connection, recipe_id: i64) {
    search.upsert(conn, recipe_id).await;
}

/// Post-commit hook for a recipe deletion.
pub async fn recipe_deleted(search: &SearchIndex, recipe_id: i64) {
    search.delete(recipe_id).await;
}

/// Re-upserts published recipes into the index, oldest id first. Used for
/// initial seeding and recovery after index loss. `recipe_id` restricts
/// the run to one recipe; `limit` caps the scan.
pub async fn backfill(
    search: &SearchIndex,
    conn: &Connection,
    limit: Option<u32>,
    recipe_id: Option<i64>,
) -> Result<usize, ApiError> {
    if let Some(id) = recipe_id {
        info!("Index backfill: recipe_id={id}");
        search.upsert(conn, id).await;
        return Ok(1);
    }

    let ids: Vec<i64> = match limit {
        Some(cap) => {
            let mut stmt = conn.prepare(
                "SELECT id FROM recipes WHERE published_at IS NOT NULL ORDER BY id LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([cap], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt =
                conn.prepare("SELECT id FROM recipes WHERE published_at IS NOT NULL ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };

    info!("Index backfill: start ({} recipes)", ids.len());
    let mut processed = 0usize;
    for id in ids {
        search.upsert(conn, id).await;
        processed += 1;
        if processed % 100 == 0 {
            info!("Index backfill: {processed}...");
        }
    }
    info!("Index backfill: done ({processed})");
    Ok(processed)
}
