//! Staff recipe mutations.
//!
//! Each handler performs its store write inside one transaction and only
//! after a successful commit invokes the index synchronization hook. The
//! hook itself never fails the request; the relational write is the
//! source of truth and the index converges on the next mutation at the
//! latest.

use actix_web::{web, HttpRequest, HttpResponse};
use rusqlite::{Connection, Transaction};

use common::model::recipe::Difficulty;
use common::requests::{RecipeStepWrite, RecipeWrite};

use crate::db;
use crate::error::ApiError;
use crate::slug::unique_slug;
use crate::state::AppState;
use crate::sync;

use super::require_staff;

fn validate(payload: &RecipeWrite) -> Result<Difficulty, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::validation("title must not be empty"));
    }
    if payload.servings == 0 {
        return Err(ApiError::validation("servings must be at least 1"));
    }
    let difficulty = Difficulty::parse(&payload.difficulty)
        .ok_or_else(|| ApiError::validation(format!("unknown difficulty '{}'", payload.difficulty)))?;

    let mut orders: Vec<u32> = payload.steps.iter().map(|step| step.order).collect();
    orders.sort_unstable();
    orders.dedup();
    if orders.len() != payload.steps.len() {
        return Err(ApiError::validation("step orders must be unique"));
    }

    let mut ingredient_ids: Vec<i64> = payload
        .ingredients
        .iter()
        .map(|line| line.ingredient_id)
        .collect();
    ingredient_ids.sort_unstable();
    ingredient_ids.dedup();
    if ingredient_ids.len() != payload.ingredients.len() {
        return Err(ApiError::validation(
            "each ingredient may appear only once per recipe",
        ));
    }

    Ok(difficulty)
}

/// Maps FK violations from editor-supplied ids onto a validation error
/// instead of a 500.
fn constraint_as_validation(e: rusqlite::Error, what: &str) -> ApiError {
    match e.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => {
            ApiError::validation(format!("unknown or conflicting {what}"))
        }
        _ => ApiError::Database(e),
    }
}

fn write_links(tx: &Transaction<'_>, recipe_id: i64, payload: &RecipeWrite) -> Result<(), ApiError> {
    let joins: [(&str, &str, &Vec<i64>); 5] = [
        ("recipe_tags", "tag_id", &payload.tags),
        ("recipe_category_links", "category_id", &payload.categories),
        ("recipe_cuisines", "cuisine_id", &payload.cuisines),
        ("recipe_meal_types", "meal_type_id", &payload.meal_types),
        (
            "recipe_cooking_methods",
            "cooking_method_id",
            &payload.cooking_methods,
        ),
    ];
    for (table, column, ids) in joins {
        tx.execute(&format!("DELETE FROM {table} WHERE recipe_id = ?1"), [recipe_id])?;
        let sql = format!("INSERT INTO {table} (recipe_id, {column}) VALUES (?1, ?2)");
        for id in ids {
            tx.execute(&sql, rusqlite::params![recipe_id, id])
                .map_err(|e| constraint_as_validation(e, column))?;
        }
    }
    Ok(())
}

fn write_ingredients(
    tx: &Transaction<'_>,
    recipe_id: i64,
    payload: &RecipeWrite,
) -> Result<(), ApiError> {
    tx.execute(
        "DELETE FROM recipe_ingredients WHERE recipe_id = ?1",
        [recipe_id],
    )?;
    let now = db::now();
    for line in &payload.ingredients {
        tx.execute(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, unit_id, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                recipe_id,
                line.ingredient_id,
                line.amount,
                line.unit_id,
                line.note.as_deref().unwrap_or(""),
                now,
            ],
        )
        .map_err(|e| constraint_as_validation(e, "ingredient or unit"))?;
    }
    Ok(())
}

fn write_steps(tx: &Transaction<'_>, recipe_id: i64, steps: &[RecipeStepWrite]) -> Result<(), ApiError> {
    tx.execute("DELETE FROM recipe_steps WHERE recipe_id = ?1", [recipe_id])?;
    let now = db::now();
    for step in steps {
        tx.execute(
            "INSERT INTO recipe_steps (recipe_id, step_order, title, description,
                                       description_html, image, duration, video_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                recipe_id,
                step.order,
                step.title.as_deref().unwrap_or(""),
                step.description,
                step.description_html.as_deref().unwrap_or(""),
                step.image,
                step.duration,
                step.video_url.as_deref().unwrap_or(""),
                now,
            ],
        )?;
    }
    Ok(())
}

pub(crate) fn create_recipe(
    conn: &mut Connection,
    payload: &RecipeWrite,
) -> Result<(i64, String), ApiError> {
    let difficulty = validate(payload)?;

    let tx = conn.transaction()?;
    let slug = unique_slug(&tx, "recipes", &payload.title, None)?;
    let now = db::now();
    let meta_title = payload
        .meta_title
        .clone()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| payload.title.clone());
    tx.execute(
        "INSERT INTO recipes (title, slug, meta_title, meta_description, description,
                              description_html, preparation_time, cooking_time, servings,
                              difficulty, image, video_url, published_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
        rusqlite::params![
            payload.title.trim(),
            slug,
            meta_title,
            payload.meta_description.as_deref().unwrap_or(""),
            payload.description.as_deref().unwrap_or(""),
            payload.description_html.as_deref().unwrap_or(""),
            payload.preparation_time,
            payload.cooking_time,
            payload.servings,
            difficulty.as_str(),
            payload.image,
            payload.video_url.as_deref().unwrap_or(""),
            payload.published_at.map(|dt| dt.to_rfc3339()),
            now,
        ],
    )?;
    let recipe_id = tx.last_insert_rowid();
    write_links(&tx, recipe_id, payload)?;
    write_ingredients(&tx, recipe_id, payload)?;
    write_steps(&tx, recipe_id, &payload.steps)?;
    tx.commit()?;

    Ok((recipe_id, slug))
}

pub(crate) fn update_recipe(
    conn: &mut Connection,
    recipe_id: i64,
    payload: &RecipeWrite,
) -> Result<String, ApiError> {
    let difficulty = validate(payload)?;

    let tx = conn.transaction()?;
    let exists: i64 = tx.query_row(
        "SELECT COUNT(*) FROM recipes WHERE id = ?1",
        [recipe_id],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(ApiError::NotFound("recipe"));
    }

    // Slugs are stable across edits; links keep working after a retitle.
    let slug: String = tx.query_row(
        "SELECT slug FROM recipes WHERE id = ?1",
        [recipe_id],
        |row| row.get(0),
    )?;
    let meta_title = payload
        .meta_title
        .clone()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| payload.title.clone());
    tx.execute(
        "UPDATE recipes SET title = ?1, meta_title = ?2, meta_description = ?3,
                            description = ?4, description_html = ?5, preparation_time = ?6,
                            cooking_time = ?7, servings = ?8, difficulty = ?9, image = ?10,
                            video_url = ?11, published_at = ?12, updated_at = ?13
         WHERE id = ?14",
        rusqlite::params![
            payload.title.trim(),
            meta_title,
            payload.meta_description.as_deref().unwrap_or(""),
            payload.description.as_deref().unwrap_or(""),
            payload.description_html.as_deref().unwrap_or(""),
            payload.preparation_time,
            payload.cooking_time,
            payload.servings,
            difficulty.as_str(),
            payload.image,
            payload.video_url.as_deref().unwrap_or(""),
            payload.published_at.map(|dt| dt.to_rfc3339()),
            db::now(),
            recipe_id,
        ],
    )?;
    write_links(&tx, recipe_id, payload)?;
    write_ingredients(&tx, recipe_id, payload)?;
    write_steps(&tx, recipe_id, &payload.steps)?;
    tx.commit()?;

    Ok(slug)
}

pub(crate) fn delete_recipe(conn: &mut Connection, recipe_id: i64) -> Result<(), ApiError> {
    let tx = conn.transaction()?;
    let deleted = tx.execute("DELETE FROM recipes WHERE id = ?1", [recipe_id])?;
    if deleted == 0 {
        return Err(ApiError::NotFound("recipe"));
    }
    tx.commit()?;
    Ok(())
}

/// Handler for `POST /api/staff/recipes`.
pub async fn create(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<RecipeWrite>,
) -> Result<HttpResponse, ApiError> {
    let mut conn = state.db()?;
    require_staff(&conn, &req)?;

    let (recipe_id, slug) = create_recipe(&mut conn, &payload)?;
    // Transaction committed; the index may now observe the durable state.
    sync::recipe_saved(&state.search, &conn, recipe_id).await;

    Ok(HttpResponse::Created().json(serde_json::json!({ "id": recipe_id, "slug": slug })))
}

/// Handler for `PUT /api/staff/recipes/{id}`.
pub async fn update(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    payload: web::Json<RecipeWrite>,
) -> Result<HttpResponse, ApiError> {
    let mut conn = state.db()?;
    require_staff(&conn, &req)?;
    let recipe_id = path.into_inner();

    let slug = update_recipe(&mut conn, recipe_id, &payload)?;
    sync::recipe_saved(&state.search, &conn, recipe_id).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "id": recipe_id, "slug": slug })))
}

/// Handler for `DELETE /api/staff/recipes/{id}`.
pub async fn remove(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let mut conn = state.db()?;
    require_staff(&conn, &req)?;
    let recipe_id = path.into_inner();

    delete_recipe(&mut conn, recipe_id)?;
    sync::recipe_deleted(&state.search, recipe_id).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_db;
    use common::requests::RecipeIngredientWrite;

    fn base_payload() -> RecipeWrite {
        RecipeWrite {
            title: "Cold Beet Soup".into(),
            meta_title: None,
            meta_description: None,
            description: Some("Classic summer soup.".into()),
            description_html: None,
            preparation_time: 15,
            cooking_time: 25,
            servings: 4,
            difficulty: "easy".into(),
            image: None,
            video_url: None,
            published_at: None,
            categories: vec![],
            tags: vec![],
            cuisines: vec![],
            meal_types: vec![],
            cooking_methods: vec![],
            ingredients: vec![],
            steps: vec![],
        }
    }

    #[test]
    fn create_generates_slug_and_defaults_meta_title() {
        let mut conn = memory_db();
        let (id, slug) = create_recipe(&mut conn, &base_payload()).unwrap();
        assert_eq!(slug, "cold-beet-soup");

        let meta_title: String = conn
            .query_row(
                "SELECT meta_title FROM recipes WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(meta_title, "Cold Beet Soup");

        // Same title again: suffixed slug.
        let (_, slug2) = create_recipe(&mut conn, &base_payload()).unwrap();
        assert_eq!(slug2, "cold-beet-soup-1");
    }

    #[test]
    fn duplicate_step_orders_are_rejected_before_any_write() {
        let mut conn = memory_db();
        let mut payload = base_payload();
        payload.steps = vec![
            RecipeStepWrite {
                order: 1,
                title: None,
                description: "Mix.".into(),
                description_html: None,
                duration: None,
                video_url: None,
                image: None,
            },
            RecipeStepWrite {
                order: 1,
                title: None,
                description: "Mix again.".into(),
                description_html: None,
                duration: None,
                video_url: None,
                image: None,
            },
        ];
        assert!(create_recipe(&mut conn, &payload).is_err());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn unknown_taxonomy_ids_surface_as_validation_errors() {
        let mut conn = memory_db();
        let mut payload = base_payload();
        payload.tags = vec![12345];
        let err = create_recipe(&mut conn, &payload).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn update_rewrites_joins_and_keeps_slug() {
        let mut conn = memory_db();
        conn.execute_batch(
            "INSERT INTO tags (id, name, slug, created_at, updated_at)
             VALUES (1, 'A', 'a', '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00'),
                    (2, 'B', 'b', '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');",
        )
        .unwrap();

        let mut payload = base_payload();
        payload.tags = vec![1];
        let (id, slug) = create_recipe(&mut conn, &payload).unwrap();

        let mut update_payload = base_payload();
        update_payload.title = "Renamed Entirely".into();
        update_payload.tags = vec![2];
        let kept_slug = update_recipe(&mut conn, id, &update_payload).unwrap();
        assert_eq!(kept_slug, slug);

        let tag_ids: Vec<i64> = conn
            .prepare("SELECT tag_id FROM recipe_tags WHERE recipe_id = ?1")
            .unwrap()
            .query_map([id], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tag_ids, vec![2]);
    }

    #[test]
    fn delete_cascades_to_children() {
        let mut conn = memory_db();
        let mut payload = base_payload();
        payload.steps = vec![RecipeStepWrite {
            order: 1,
            title: None,
            description: "Mix.".into(),
            description_html: None,
            duration: None,
            video_url: None,
            image: None,
        }];
        let (id, _) = create_recipe(&mut conn, &payload).unwrap();

        delete_recipe(&mut conn, id).unwrap();
        let steps: i64 = conn
            .query_row("SELECT COUNT(*) FROM recipe_steps", [], |row| row.get(0))
            .unwrap();
        assert_eq!(steps, 0);

        assert!(matches!(
            delete_recipe(&mut conn, id),
            Err(ApiError::NotFound("recipe"))
        ));
    }

    #[test]
    fn ingredient_lines_are_written_with_the_recipe() {
        let mut conn = memory_db();
        conn.execute_batch(
            "INSERT INTO ingredient_categories (id, name, slug, created_at, updated_at)
             VALUES (1, 'Basics', 'basics', '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');
             INSERT INTO ingredients (id, name, slug, category_id, created_at, updated_at)
             VALUES (1, 'Beet', 'beet', 1, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');
             INSERT INTO measurement_units (id, name, short_name, unit_type, created_at, updated_at)
             VALUES (1, 'Gram', 'g', 'weight', '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');",
        )
        .unwrap();

        let mut payload = base_payload();
        payload.ingredients = vec![RecipeIngredientWrite {
            ingredient_id: 1,
            amount: 500.0,
            unit_id: 1,
            note: None,
        }];
        let (id, _) = create_recipe(&mut conn, &payload).unwrap();

        let amount: f64 = conn
            .query_row(
                "SELECT amount FROM recipe_ingredients WHERE recipe_id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(amount, 500.0);
    }
}
