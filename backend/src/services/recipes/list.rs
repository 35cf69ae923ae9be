//! Recipe listing with dual-source pagination.
//!
//! A free-text query is answered by the external search index when the
//! adapter is enabled and the requested offset is inside the ranked
//! window (the index API has no offset of its own, so pagination happens
//! locally over at most [`MAX_RANKED_RESULTS`] ids). When the adapter is
//! disabled, errors out, or the offset lies beyond the window, the text
//! match falls back to a case-insensitive substring filter in the store.
//! Taxonomy and difficulty filters always apply at the relational level,
//! on both paths.

use actix_web::{web, HttpRequest};
use rusqlite::types::Value;
use rusqlite::Connection;

use common::model::recipe::{Difficulty, RecipeListResponse};
use common::requests::RecipeFilters;

use crate::error::ApiError;
use crate::search_index::MAX_RANKED_RESULTS;
use crate::state::AppState;

use super::serialize::{
    id_params, map_recipe_row, placeholders, summaries, RecipeRow, RECIPE_COLUMNS,
};
use crate::services::auth::session::request_user;

/// Validated filter set. Blank strings are treated as absent.
pub(crate) struct ListingFilters {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub category: Option<String>,
    pub cuisine: Option<String>,
    pub meal_type: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub limit: usize,
    pub offset: usize,
}

pub(crate) fn normalize(raw: &RecipeFilters) -> Result<ListingFilters, ApiError> {
    if !(1..=100).contains(&raw.limit) {
        return Err(ApiError::validation("limit must be between 1 and 100"));
    }
    let difficulty = raw
        .difficulty
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            Difficulty::parse(value)
                .ok_or_else(|| ApiError::validation(format!("unknown difficulty '{value}'")))
        })
        .transpose()?;

    let clean = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    Ok(ListingFilters {
        search: clean(&raw.search),
        tag: clean(&raw.tag),
        category: clean(&raw.category),
        cuisine: clean(&raw.cuisine),
        meal_type: clean(&raw.meal_type),
        difficulty,
        limit: raw.limit as usize,
        offset: raw.offset as usize,
    })
}

/// Whether the index should be consulted at all for this request.
/// Offsets at or beyond the ranked window always use the fallback path,
/// regardless of index availability.
pub(crate) fn consults_index(has_search: bool, index_enabled: bool, offset: usize) -> bool {
    has_search && index_enabled && offset < MAX_RANKED_RESULTS
}

/// The `[offset, offset+limit)` window over the ranked id list.
pub(crate) fn ranked_window(ranked: &[i64], offset: usize, limit: usize) -> &[i64] {
    if offset >= ranked.len() {
        return &[];
    }
    let end = (offset + limit).min(ranked.len());
    &ranked[offset..end]
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// WHERE fragments for the relational filters. The text condition is
/// included only on the fallback path; on the index-ranked path the
/// candidate set already encodes the query.
fn build_conditions(
    filters: &ListingFilters,
    include_text: bool,
) -> (Vec<String>, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if include_text {
        if let Some(search) = &filters.search {
            let pattern = format!("%{}%", escape_like(search));
            conditions.push(
                "(r.title LIKE ? ESCAPE '\\' OR r.description LIKE ? ESCAPE '\\' \
                 OR r.description_html LIKE ? ESCAPE '\\')"
                    .to_string(),
            );
            for _ in 0..3 {
                params.push(Value::Text(pattern.clone()));
            }
        }
    }

    let mut slug_filter = |sql: &str, slug: &Option<String>| {
        if let Some(slug) = slug {
            conditions.push(sql.to_string());
            params.push(Value::Text(slug.clone()));
        }
    };
    slug_filter(
        "EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
         WHERE rt.recipe_id = r.id AND t.slug = ?)",
        &filters.tag,
    );
    slug_filter(
        "EXISTS (SELECT 1 FROM recipe_category_links rcl \
         JOIN recipe_categories c ON c.id = rcl.category_id \
         WHERE rcl.recipe_id = r.id AND c.slug = ?)",
        &filters.category,
    );
    slug_filter(
        "EXISTS (SELECT 1 FROM recipe_cuisines rc JOIN cuisines cu ON cu.id = rc.cuisine_id \
         WHERE rc.recipe_id = r.id AND cu.slug = ?)",
        &filters.cuisine,
    );
    slug_filter(
        "EXISTS (SELECT 1 FROM recipe_meal_types rmt JOIN meal_types mt ON mt.id = rmt.meal_type_id \
         WHERE rmt.recipe_id = r.id AND mt.slug = ?)",
        &filters.meal_type,
    );

    if let Some(difficulty) = filters.difficulty {
        conditions.push("r.difficulty = ?".to_string());
        params.push(Value::Text(difficulty.as_str().to_string()));
    }

    (conditions, params)
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

/// Executes the relational part of the listing. `ranked` carries the
/// index-ranked candidate ids when that path is active; `None` selects
/// the fallback path.
pub(crate) fn query_listing(
    conn: &Connection,
    media_base_url: &str,
    filters: &ListingFilters,
    ranked: Option<&[i64]>,
    viewer: Option<i64>,
) -> Result<RecipeListResponse, ApiError> {
    match ranked {
        Some(ranked_ids) => {
            if ranked_ids.is_empty() {
                return Ok(RecipeListResponse {
                    total: 0,
                    items: Vec::new(),
                });
            }

            let (conditions, params) = build_conditions(filters, false);
            let mut count_conditions = conditions.clone();
            count_conditions.push(format!("r.id IN ({})", placeholders(ranked_ids.len())));
            let mut count_params = params.clone();
            count_params.extend(id_params(ranked_ids));

            let total: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM recipes r{}",
                    where_clause(&count_conditions)
                ),
                rusqlite::params_from_iter(count_params),
                |row| row.get(0),
            )?;

            let window = ranked_window(ranked_ids, filters.offset, filters.limit);
            if window.is_empty() {
                return Ok(RecipeListResponse {
                    total,
                    items: Vec::new(),
                });
            }

            let mut page_conditions = conditions;
            page_conditions.push(format!("r.id IN ({})", placeholders(window.len())));
            let mut page_params = params;
            page_params.extend(id_params(window));

            let sql = format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes r{}",
                where_clause(&page_conditions)
            );
            let mut stmt = conn.prepare(&sql)?;
            let fetched = stmt
                .query_map(rusqlite::params_from_iter(page_params), map_recipe_row)?
                .collect::<Result<Vec<_>, _>>()?;

            // A ranked id may have dropped out of the relational filters
            // since it was indexed; the fetch above silently narrows the
            // window. What survives keeps its rank order, once per id.
            let mut by_id: std::collections::HashMap<i64, RecipeRow> =
                fetched.into_iter().map(|row| (row.id, row)).collect();
            let mut seen = std::collections::HashSet::new();
            let ordered: Vec<RecipeRow> = window
                .iter()
                .filter(|id| seen.insert(**id))
                .filter_map(|id| by_id.remove(id))
                .collect();

            Ok(RecipeListResponse {
                total,
                items: summaries(conn, media_base_url, &ordered, viewer)?,
            })
        }
        None => {
            let (conditions, params) = build_conditions(filters, true);

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM recipes r{}", where_clause(&conditions)),
                rusqlite::params_from_iter(params.clone()),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes r{} \
                 ORDER BY r.published_at DESC, r.updated_at DESC, r.id DESC \
                 LIMIT ? OFFSET ?",
                where_clause(&conditions)
            );
            let mut page_params = params;
            page_params.push(Value::Integer(filters.limit as i64));
            page_params.push(Value::Integer(filters.offset as i64));
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(page_params), map_recipe_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(RecipeListResponse {
                total,
                items: summaries(conn, media_base_url, &rows, viewer)?,
            })
        }
    }
}

/// Handler for `GET /api/recipes`.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<RecipeFilters>,
) -> Result<web::Json<RecipeListResponse>, ApiError> {
    let filters = normalize(&query)?;
    let conn = state.db()?;
    let viewer = request_user(&conn, &req)?.map(|user| user.id);

    // `None` from the adapter means disabled-or-failed; the relational
    // fallback below must not mistake it for an empty result.
    let ranked = match &filters.search {
        Some(search)
            if consults_index(true, state.search.enabled(), filters.offset) =>
        {
            state.search.search(search, MAX_RANKED_RESULTS).await
        }
        _ => None,
    };

    let response = query_listing(
        &conn,
        &state.config.media_base_url,
        &filters,
        ranked.as_deref(),
        viewer,
    )?;
    Ok(web::Json(response))
}
