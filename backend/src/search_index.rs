//! Adapter for the external search index holding the denormalized recipe
//! documents.
//!
//! The index is treated as an unreliable collaborator: every operation is
//! a no-op when the integration is unconfigured, and any transport or
//! protocol failure is logged and swallowed. Mutation handlers must never
//! fail because the index is down, and the listing pipeline must be able
//! to tell "no results" (`Some(vec![])`) apart from "index unavailable"
//! (`None`).
//!
//! Only published recipes live in the index. `upsert` re-reads the recipe
//! and turns into a delete when the row is gone or unpublished, so the
//! index self-heals toward the invariant "document exists iff
//! `published_at` is set".

use log::{error, warn};
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db;
use crate::error::ApiError;

/// Hard cap on ranked results requested from the index. The index API has
/// no offset parameter, so pagination happens locally over this window.
pub const MAX_RANKED_RESULTS: usize = 1000;

fn document_id(recipe_id: i64) -> String {
    format!("recipe:{recipe_id}")
}

/// Extracts the recipe id from a document id of the form `recipe:<int>`.
/// Anything else is rejected so foreign documents are skipped silently.
pub fn parse_document_id(document_id: &str) -> Option<i64> {
    let raw = document_id.strip_prefix("recipe:")?;
    raw.trim().parse().ok()
}

/// Searchable text fields of one document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentContent {
    pub title: String,
    pub description: String,
    pub description_html: String,
    pub ingredients: String,
    pub cuisines: String,
    pub categories: String,
    pub tags: String,
}

/// Scalar payload carried alongside the searchable text.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub recipe_id: i64,
    pub slug: String,
    pub difficulty: String,
    pub preparation_time: u32,
    pub cooking_time: u32,
    pub servings: u32,
    pub published_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub content: DocumentContent,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Client for the search index REST API, owned by the shared application
/// state and passed to whoever needs it.
pub struct SearchIndex {
    enabled: bool,
    http: reqwest::Client,
    base_url: String,
    token: String,
    index: String,
}

impl SearchIndex {
    /// Builds the client from configuration. The integration is enabled
    /// only when the feature flag is on and both credentials are present;
    /// the decision is made once, here, not rechecked per call.
    pub fn from_config(config: &Config) -> Self {
        let enabled = config.search_enabled
            && !config.search_rest_url.is_empty()
            && !config.search_rest_token.is_empty();
        if config.search_enabled && !enabled {
            warn!("Search index credentials missing, integration disabled");
        }
        Self {
            enabled,
            http: reqwest::Client::new(),
            base_url: config.search_rest_url.trim_end_matches('/').to_string(),
            token: config.search_rest_token.clone(),
            index: config.search_index.clone(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Reindexes one recipe. Missing or unpublished recipes are removed
    /// from the index instead. Errors are logged, never returned.
    pub async fn upsert(&self, conn: &Connection, recipe_id: i64) {
        if !self.enabled {
            return;
        }

        let document = match load_document(conn, recipe_id) {
            Ok(doc) => doc,
            Err(e) => {
                error!("Search index: failed to load recipe {recipe_id}: {e}");
                return;
            }
        };

        let result = match document {
            Some(doc) => {
                self.post(
                    "upsert",
                    &serde_json::json!({ "index": &self.index, "documents": [doc] }),
                )
                .await
            }
            None => self.delete_document(recipe_id).await,
        };
        if let Err(e) = result {
            error!("Search index: upsert failed (recipe_id={recipe_id}): {e}");
        }
    }

    /// Removes one recipe document. Errors are logged, never returned.
    pub async fn delete(&self, recipe_id: i64) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.delete_document(recipe_id).await {
            error!("Search index: delete failed (recipe_id={recipe_id}): {e}");
        }
    }

    /// Runs a ranked query and returns de-duplicated recipe ids in rank
    /// order. `None` means the index is disabled or unreachable and the
    /// caller must fall back to the relational store; a blank query is
    /// answered locally with an empty list.
    pub async fn search(&self, query: &str, limit: usize) -> Option<Vec<i64>> {
        if !self.enabled {
            return None;
        }
        let cleaned = query.trim();
        if cleaned.is_empty() {
            return Some(Vec::new());
        }

        let body = serde_json::json!({
            "index": &self.index,
            "query": cleaned,
            "limit": limit,
        });
        let response: SearchResponse = match self.post("search", &body).await {
            Ok(response) => match response.json().await {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!("Search index: malformed search response: {e}");
                    return None;
                }
            },
            Err(e) => {
                error!("Search index: search failed: {e}");
                return None;
            }
        };

        let mut ids = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for hit in response.results {
            if let Some(recipe_id) = parse_document_id(&hit.id) {
                if seen.insert(recipe_id) {
                    ids.push(recipe_id);
                }
            }
        }
        Some(ids)
    }

    async fn delete_document(&self, recipe_id: i64) -> Result<reqwest::Response, reqwest::Error> {
        self.post(
            "delete",
            &serde_json::json!({ "index": &self.index, "ids": [document_id(recipe_id)] }),
        )
        .await
    }

    async fn post(
        &self,
        operation: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .post(format!("{}/{operation}", self.base_url))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?
            .error_for_status()
    }
}

/// Builds the index document for a recipe, or `None` when the recipe does
/// not exist or is not published.
pub fn load_document(conn: &Connection, recipe_id: i64) -> Result<Option<SearchDocument>, ApiError> {
    let row = conn
        .query_row(
            "SELECT id, title, slug, description, description_html, difficulty,
                    preparation_time, cooking_time, servings, published_at
             FROM recipes WHERE id = ?1 AND published_at IS NOT NULL",
            [recipe_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, u32>(6)?,
                    row.get::<_, u32>(7)?,
                    row.get::<_, u32>(8)?,
                    row.get::<_, Option<String>>(9)?,
                ))
            },
        )
        .optional()?;

    let Some((
        id,
        title,
        slug,
        description,
        description_html,
        difficulty,
        preparation_time,
        cooking_time,
        servings,
        published_at,
    )) = row
    else {
        return Ok(None);
    };

    let ingredients = related_names(
        conn,
        "SELECT i.name FROM recipe_ingredients ri
         JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = ?1 ORDER BY ri.id",
        id,
    )?;
    let cuisines = related_names(
        conn,
        "SELECT c.name FROM recipe_cuisines rc
         JOIN cuisines c ON c.id = rc.cuisine_id
         WHERE rc.recipe_id = ?1 ORDER BY c.id",
        id,
    )?;
    let categories = related_names(
        conn,
        "SELECT c.name FROM recipe_category_links rcl
         JOIN recipe_categories c ON c.id = rcl.category_id
         WHERE rcl.recipe_id = ?1 ORDER BY c.id",
        id,
    )?;
    let tags = related_names(
        conn,
        "SELECT t.name FROM recipe_tags rt
         JOIN tags t ON t.id = rt.tag_id
         WHERE rt.recipe_id = ?1 ORDER BY t.id",
        id,
    )?;

    // Published timestamps are normalized to RFC 3339 for the metadata,
    // matching what the API serves.
    let published_iso = published_at
        .as_deref()
        .and_then(db::parse_timestamp)
        .map(|dt| dt.to_rfc3339());

    Ok(Some(SearchDocument {
        id: document_id(id),
        content: DocumentContent {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            description_html: strip_tags(&description_html).trim().to_string(),
            ingredients: compact_join(&ingredients),
            cuisines: compact_join(&cuisines),
            categories: compact_join(&categories),
            tags: compact_join(&tags),
        },
        metadata: DocumentMetadata {
            recipe_id: id,
            slug,
            difficulty,
            preparation_time,
            cooking_time,
            servings,
            published_at: published_iso,
        },
    }))
}

fn related_names(conn: &Connection, sql: &str, recipe_id: i64) -> Result<Vec<String>, ApiError> {
    let mut stmt = conn.prepare(sql)?;
    let names = stmt
        .query_map([recipe_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Joins related-entity names with commas, dropping blank members while
/// preserving order.
pub fn compact_join(values: &[String]) -> String {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Removes markup so only searchable text reaches the index.
pub fn strip_tags(html: &str) -> String {
    // Unterminated tags swallow the rest of the input, same as naive
    // markup strippers elsewhere; acceptable for editor-produced HTML.
    let re = Regex::new(r"<[^>]*>").expect("static regex");
    re.replace_all(html, "").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_db;

    #[test]
    fn document_id_parsing() {
        assert_eq!(parse_document_id("recipe:42"), Some(42));
        assert_eq!(parse_document_id("recipe: 42 "), Some(42));
        assert_eq!(parse_document_id("recipe:"), None);
        assert_eq!(parse_document_id("recipe:abc"), None);
        assert_eq!(parse_document_id("user:42"), None);
        assert_eq!(parse_document_id(""), None);
    }

    #[test]
    fn compact_join_filters_blanks() {
        let values = vec![
            "Flour".to_string(),
            "  ".to_string(),
            " Sugar ".to_string(),
            String::new(),
        ];
        assert_eq!(compact_join(&values), "Flour, Sugar");
    }

    #[test]
    fn strip_tags_removes_markup() {
        assert_eq!(
            strip_tags("<p>Bake <strong>slowly</strong></p>"),
            "Bake slowly"
        );
        assert_eq!(strip_tags("plain text"), "plain text");
    }

    fn insert_recipe(conn: &Connection, id: i64, published: bool) {
        let now = crate::db::now();
        let published_at = published.then(|| now.clone());
        // The schema enforces a UNIQUE slug; published recipes carry the
        // canonical slug (asserted below), drafts get a per-id slug so
        // multiple fixture rows can share one connection without colliding.
        let slug = if published {
            "beet-soup".to_string()
        } else {
            format!("beet-soup-draft-{id}")
        };
        conn.execute(
            "INSERT INTO recipes (id, title, slug, description, description_html,
                                  preparation_time, cooking_time, servings, difficulty,
                                  published_at, created_at, updated_at)
             VALUES (?1, 'Beet Soup', ?4, 'Classic cold soup.',
                     '<p>Serve <em>cold</em>.</p>', 15, 30, 4, 'easy', ?2, ?3, ?3)",
            rusqlite::params![id, published_at, now, slug],
        )
        .unwrap();
    }

    #[test]
    fn document_built_only_for_published_recipes() {
        let conn = memory_db();
        insert_recipe(&conn, 1, false);
        assert!(load_document(&conn, 1).unwrap().is_none());

        insert_recipe(&conn, 2, true);
        let doc = load_document(&conn, 2).unwrap().expect("document");
        assert_eq!(doc.id, "recipe:2");
        assert_eq!(doc.content.description_html, "Serve cold.");
        assert_eq!(doc.metadata.slug, "beet-soup");
        assert!(doc.metadata.published_at.is_some());
    }

    #[test]
    fn document_denormalizes_relations() {
        let conn = memory_db();
        insert_recipe(&conn, 3, true);
        let now = crate::db::now();
        conn.execute(
            "INSERT INTO tags (id, name, slug, created_at, updated_at)
             VALUES (1, 'Vegan', 'vegan', ?1, ?1), (2, 'Soup', 'soup', ?1, ?1)",
            rusqlite::params![now],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (3, 1), (3, 2)",
            [],
        )
        .unwrap();

        let doc = load_document(&conn, 3).unwrap().expect("document");
        assert_eq!(doc.content.tags, "Vegan, Soup");
        assert_eq!(doc.content.ingredients, "");
    }

    #[test]
    fn missing_recipe_yields_no_document() {
        let conn = memory_db();
        assert!(load_document(&conn, 999).unwrap().is_none());
    }

    #[test]
    fn missing_credentials_disable_the_integration() {
        let mut config = crate::notifications::test_config();
        config.search_enabled = true;
        assert!(!SearchIndex::from_config(&config).enabled());

        config.search_rest_url = "https://search.example".into();
        assert!(!SearchIndex::from_config(&config).enabled());

        config.search_rest_token = "token".into();
        assert!(SearchIndex::from_config(&config).enabled());

        config.search_enabled = false;
        assert!(!SearchIndex::from_config(&config).enabled());
    }

    #[actix_web::test]
    async fn blank_queries_short_circuit_to_empty() {
        let mut config = crate::notifications::test_config();
        config.search_enabled = true;
        config.search_rest_url = "https://search.invalid".into();
        config.search_rest_token = "token".into();
        let index = SearchIndex::from_config(&config);

        // Answered locally; nothing is sent to the index.
        assert_eq!(index.search("   ", 10).await, Some(Vec::new()));
    }

    #[actix_web::test]
    async fn disabled_adapter_is_inert() {
        let mut config = crate::notifications::test_config();
        config.search_enabled = true;
        let index = SearchIndex::from_config(&config);

        // Even a blank query answers None while disabled.
        assert_eq!(index.search("soup", 10).await, None);
        assert_eq!(index.search("", 10).await, None);

        // Upsert and delete are no-ops; nothing is contacted.
        let conn = memory_db();
        insert_recipe(&conn, 1, true);
        index.upsert(&conn, 1).await;
        index.delete(1).await;
    }
}
