//! Row types and serialization helpers shared by the recipe endpoints.

use std::collections::{HashMap, HashSet};

use rusqlite::types::Value;
use rusqlite::Connection;

use common::model::lookup::Lookup;
use common::model::recipe::{Difficulty, RecipeSummary};

use crate::db;
use crate::error::ApiError;
use crate::images;

/// Column list matching [`map_recipe_row`]; keep the two in sync.
pub(crate) const RECIPE_COLUMNS: &str =
    "r.id, r.title, r.slug, r.difficulty, r.image, r.preparation_time, r.cooking_time, \
     r.servings, r.published_at, r.description, r.description_html, r.video_url";

/// One row of the `recipes` table, as the services consume it.
#[derive(Clone, Debug)]
pub(crate) struct RecipeRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub difficulty: String,
    pub image: Option<String>,
    pub preparation_time: u32,
    pub cooking_time: u32,
    pub servings: u32,
    pub published_at: Option<String>,
    pub description: String,
    pub description_html: String,
    pub video_url: String,
}

pub(crate) fn map_recipe_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        difficulty: row.get(3)?,
        image: row.get(4)?,
        preparation_time: row.get(5)?,
        cooking_time: row.get(6)?,
        servings: row.get(7)?,
        published_at: row.get(8)?,
        description: row.get(9)?,
        description_html: row.get(10)?,
        video_url: row.get(11)?,
    })
}

/// `?, ?, ...` fragment for an IN clause of `n` values.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub(crate) fn id_params(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| Value::Integer(*id)).collect()
}

/// Average and count of ratings for each of the given recipes.
pub(crate) fn ratings_for(
    conn: &Connection,
    ids: &[i64],
) -> Result<HashMap<i64, (Option<f64>, i64)>, ApiError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!(
        "SELECT recipe_id, AVG(value), COUNT(*) FROM ratings
         WHERE recipe_id IN ({}) GROUP BY recipe_id",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(id_params(ids)), |row| {
        Ok((row.get::<_, i64>(0)?, (row.get(1)?, row.get(2)?)))
    })?;
    let mut map = HashMap::new();
    for row in rows {
        let (recipe_id, entry) = row?;
        map.insert(recipe_id, entry);
    }
    Ok(map)
}

/// Tags of each of the given recipes, in insertion order.
pub(crate) fn tags_for(
    conn: &Connection,
    ids: &[i64],
) -> Result<HashMap<i64, Vec<Lookup>>, ApiError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!(
        "SELECT rt.recipe_id, t.id, t.name, t.slug FROM recipe_tags rt
         JOIN tags t ON t.id = rt.tag_id
         WHERE rt.recipe_id IN ({}) ORDER BY t.id",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(id_params(ids)), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            Lookup {
                id: row.get(1)?,
                name: row.get(2)?,
                slug: row.get(3)?,
            },
        ))
    })?;
    let mut map: HashMap<i64, Vec<Lookup>> = HashMap::new();
    for row in rows {
        let (recipe_id, lookup) = row?;
        map.entry(recipe_id).or_default().push(lookup);
    }
    Ok(map)
}

/// Which of the given recipes the viewer has bookmarked, in one batch
/// lookup.
pub(crate) fn bookmarked_among(
    conn: &Connection,
    user_id: i64,
    ids: &[i64],
) -> Result<HashSet<i64>, ApiError> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }
    let sql = format!(
        "SELECT recipe_id FROM bookmarks WHERE user_id = ? AND recipe_id IN ({})",
        placeholders(ids.len())
    );
    let mut params = vec![Value::Integer(user_id)];
    params.extend(id_params(ids));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| row.get(0))?;
    let mut set = HashSet::new();
    for row in rows {
        set.insert(row?);
    }
    Ok(set)
}

pub(crate) fn parse_difficulty(raw: &str) -> Result<Difficulty, ApiError> {
    Difficulty::parse(raw)
        .ok_or_else(|| ApiError::Internal(format!("unexpected difficulty '{raw}' in store")))
}

/// Builds the summaries for an already-ordered batch of rows, attaching
/// rating aggregates, tags and the viewer's bookmark flags.
pub(crate) fn summaries(
    conn: &Connection,
    media_base_url: &str,
    rows: &[RecipeRow],
    viewer: Option<i64>,
) -> Result<Vec<RecipeSummary>, ApiError> {
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let ratings = ratings_for(conn, &ids)?;
    let tags = tags_for(conn, &ids)?;
    let bookmarked = match viewer {
        Some(user_id) => bookmarked_among(conn, user_id, &ids)?,
        None => HashSet::new(),
    };

    rows.iter()
        .map(|row| summary_from_row(media_base_url, row, &ratings, &tags, &bookmarked))
        .collect()
}

pub(crate) fn summary_from_row(
    media_base_url: &str,
    row: &RecipeRow,
    ratings: &HashMap<i64, (Option<f64>, i64)>,
    tags: &HashMap<i64, Vec<Lookup>>,
    bookmarked: &HashSet<i64>,
) -> Result<RecipeSummary, ApiError> {
    let (rating_average, rating_count) = ratings.get(&row.id).copied().unwrap_or((None, 0));
    Ok(RecipeSummary {
        id: row.id,
        title: row.title.clone(),
        slug: row.slug.clone(),
        difficulty: parse_difficulty(&row.difficulty)?,
        images: images::image_set(media_base_url, row.image.as_deref()),
        preparation_time: row.preparation_time,
        cooking_time: row.cooking_time,
        servings: row.servings,
        published_at: row.published_at.as_deref().and_then(db::parse_timestamp),
        rating_average,
        rating_count,
        tags: tags.get(&row.id).cloned().unwrap_or_default(),
        is_bookmarked: bookmarked.contains(&row.id),
    })
}
