//! Full recipe detail by slug.

use actix_web::{web, HttpRequest};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use common::model::comment::CommentEntry;
use common::model::lookup::Lookup;
use common::model::recipe::{RecipeDetail, RecipeIngredientEntry, RecipeStepEntry, UnitRef};

use crate::db;
use crate::error::ApiError;
use crate::images;
use crate::state::AppState;

use super::serialize::{
    bookmarked_among, map_recipe_row, ratings_for, summary_from_row, tags_for, RecipeRow,
    RECIPE_COLUMNS,
};
use crate::services::auth::session::request_user;

fn find_by_slug(conn: &Connection, slug: &str) -> Result<Option<RecipeRow>, ApiError> {
    let row = conn
        .query_row(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.slug = ?1"),
            [slug],
            map_recipe_row,
        )
        .optional()?;
    Ok(row)
}

fn lookups(conn: &Connection, sql: &str, recipe_id: i64) -> Result<Vec<Lookup>, ApiError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([recipe_id], |row| {
            Ok(Lookup {
                id: row.get(0)?,
                name: row.get(1)?,
                slug: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn ingredients(conn: &Connection, recipe_id: i64) -> Result<Vec<RecipeIngredientEntry>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT ri.id, ri.amount, ri.note, i.id, i.name, i.slug, u.id, u.name, u.short_name
         FROM recipe_ingredients ri
         JOIN ingredients i ON i.id = ri.ingredient_id
         JOIN measurement_units u ON u.id = ri.unit_id
         WHERE ri.recipe_id = ?1 ORDER BY ri.id",
    )?;
    let rows = stmt
        .query_map([recipe_id], |row| {
            Ok(RecipeIngredientEntry {
                id: row.get(0)?,
                amount: row.get(1)?,
                note: row.get::<_, String>(2).map(noneable)?,
                ingredient: Lookup {
                    id: row.get(3)?,
                    name: row.get(4)?,
                    slug: row.get(5)?,
                },
                unit: UnitRef {
                    id: row.get(6)?,
                    name: row.get(7)?,
                    short_name: row.get(8)?,
                },
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn steps(
    conn: &Connection,
    media_base_url: &str,
    recipe_id: i64,
) -> Result<Vec<RecipeStepEntry>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, step_order, title, description, description_html, image, duration, video_url
         FROM recipe_steps WHERE recipe_id = ?1 ORDER BY step_order",
    )?;
    let rows = stmt
        .query_map([recipe_id], |row| {
            Ok(RecipeStepEntry {
                id: row.get(0)?,
                order: row.get(1)?,
                title: row.get::<_, String>(2).map(noneable)?,
                description: row.get(3)?,
                description_html: row.get::<_, String>(4).map(noneable)?,
                duration: row.get::<_, Option<u32>>(6)?,
                video_url: row.get::<_, String>(7).map(noneable)?,
                images: images::image_set(media_base_url, row.get::<_, Option<String>>(5)?.as_deref()),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Comments visible to this viewer: everything approved, plus the
/// viewer's own pending ones.
fn visible_comments(
    conn: &Connection,
    recipe_id: i64,
    viewer: Option<i64>,
) -> Result<Vec<CommentEntry>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.content, c.is_approved, c.created_at, c.user_id,
                u.username, u.email, u.full_name
         FROM comments c JOIN users u ON u.id = c.user_id
         WHERE c.recipe_id = ?1 ORDER BY c.created_at DESC",
    )?;
    let rows = stmt
        .query_map([recipe_id], |row| {
            let full_name: String = row.get(7)?;
            let email: String = row.get(6)?;
            let username: String = row.get(5)?;
            let user_name = if !full_name.is_empty() {
                full_name
            } else if !email.is_empty() {
                email
            } else {
                username
            };
            Ok((
                row.get::<_, i64>(4)?,
                CommentEntry {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    user_name,
                    is_approved: row.get(2)?,
                    created_at: row
                        .get::<_, String>(3)
                        .map(|raw| db::parse_timestamp(&raw).unwrap_or(DateTime::<Utc>::MIN_UTC))?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .filter(|(author_id, comment)| comment.is_approved || Some(*author_id) == viewer)
        .map(|(_, comment)| comment)
        .collect())
}

fn noneable(value: String) -> Option<String> {
    Some(value).filter(|value| !value.is_empty())
}

/// Handler for `GET /api/recipes/{slug}`.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<web::Json<RecipeDetail>, ApiError> {
    let conn = state.db()?;
    let slug = path.into_inner();
    let row = find_by_slug(&conn, &slug)?.ok_or(ApiError::NotFound("recipe"))?;
    let viewer = request_user(&conn, &req)?.map(|user| user.id);
    let media = &state.config.media_base_url;

    let ids = [row.id];
    let ratings = ratings_for(&conn, &ids)?;
    let tags = tags_for(&conn, &ids)?;
    let bookmarked = match viewer {
        Some(user_id) => bookmarked_among(&conn, user_id, &ids)?,
        None => Default::default(),
    };
    let summary = summary_from_row(media, &row, &ratings, &tags, &bookmarked)?;

    let user_rating = match viewer {
        Some(user_id) => conn
            .query_row(
                "SELECT value FROM ratings WHERE user_id = ?1 AND recipe_id = ?2",
                rusqlite::params![user_id, row.id],
                |r| r.get(0),
            )
            .optional()?,
        None => None,
    };

    let detail = RecipeDetail {
        description: noneable(row.description.clone()),
        description_html: noneable(row.description_html.clone()),
        video_url: noneable(row.video_url.clone()),
        categories: lookups(
            &conn,
            "SELECT c.id, c.name, c.slug FROM recipe_category_links rcl
             JOIN recipe_categories c ON c.id = rcl.category_id
             WHERE rcl.recipe_id = ?1 ORDER BY c.id",
            row.id,
        )?,
        meal_types: lookups(
            &conn,
            "SELECT mt.id, mt.name, mt.slug FROM recipe_meal_types rmt
             JOIN meal_types mt ON mt.id = rmt.meal_type_id
             WHERE rmt.recipe_id = ?1 ORDER BY mt.id",
            row.id,
        )?,
        cuisines: lookups(
            &conn,
            "SELECT cu.id, cu.name, cu.slug FROM recipe_cuisines rc
             JOIN cuisines cu ON cu.id = rc.cuisine_id
             WHERE rc.recipe_id = ?1 ORDER BY cu.id",
            row.id,
        )?,
        cooking_methods: lookups(
            &conn,
            "SELECT cm.id, cm.name, cm.slug FROM recipe_cooking_methods rcm
             JOIN cooking_methods cm ON cm.id = rcm.cooking_method_id
             WHERE rcm.recipe_id = ?1 ORDER BY cm.id",
            row.id,
        )?,
        ingredients: ingredients(&conn, row.id)?,
        steps: steps(&conn, media, row.id)?,
        comments: visible_comments(&conn, row.id, viewer)?,
        user_rating,
        summary,
    };
    Ok(web::Json(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_db;
    use crate::services::recipes::fixtures::{insert_recipe, insert_user, SeedRecipe};

    fn seed_comment(conn: &Connection, id: i64, user_id: i64, approved: bool) {
        conn.execute(
            "INSERT INTO comments (id, user_id, recipe_id, content, is_approved, created_at)
             VALUES (?1, ?2, 1, 'hello', ?3, '2024-01-01T00:00:00+00:00')",
            rusqlite::params![id, user_id, approved],
        )
        .unwrap();
    }

    #[test]
    fn pending_comments_are_visible_only_to_their_author() {
        let conn = memory_db();
        insert_recipe(
            &conn,
            &SeedRecipe {
                id: 1,
                ..Default::default()
            },
        );
        let author = insert_user(&conn, "author");
        let other = insert_user(&conn, "other");
        seed_comment(&conn, 1, author, false);
        seed_comment(&conn, 2, author, true);

        let own_view = visible_comments(&conn, 1, Some(author)).unwrap();
        assert_eq!(own_view.len(), 2);

        let other_view = visible_comments(&conn, 1, Some(other)).unwrap();
        assert_eq!(other_view.len(), 1);
        assert!(other_view[0].is_approved);

        let anonymous = visible_comments(&conn, 1, None).unwrap();
        assert_eq!(anonymous.len(), 1);
    }

    #[test]
    fn missing_slug_is_none() {
        let conn = memory_db();
        assert!(find_by_slug(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn ingredients_and_steps_are_ordered() {
        let conn = memory_db();
        insert_recipe(
            &conn,
            &SeedRecipe {
                id: 1,
                ..Default::default()
            },
        );
        conn.execute_batch(
            "INSERT INTO ingredient_categories (id, name, slug, created_at, updated_at)
             VALUES (1, 'Basics', 'basics', '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');
             INSERT INTO ingredients (id, name, slug, category_id, created_at, updated_at)
             VALUES (1, 'Flour', 'flour', 1, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00'),
                    (2, 'Salt', 'salt', 1, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');
             INSERT INTO measurement_units (id, name, short_name, unit_type, created_at, updated_at)
             VALUES (1, 'Gram', 'g', 'weight', '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');
             INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, unit_id, note, created_at)
             VALUES (1, 1, 500, 1, '', '2024-01-01T00:00:00+00:00'),
                    (1, 2, 10, 1, 'to taste', '2024-01-01T00:00:00+00:00');
             INSERT INTO recipe_steps (recipe_id, step_order, description, created_at)
             VALUES (1, 2, 'Bake.', '2024-01-01T00:00:00+00:00'),
                    (1, 1, 'Mix.', '2024-01-01T00:00:00+00:00');",
        )
        .unwrap();

        let items = ingredients(&conn, 1).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].ingredient.name, "Flour");
        assert_eq!(items[1].note.as_deref(), Some("to taste"));
        assert_eq!(items[0].unit.short_name, "g");

        let steps = steps(&conn, "http://m", 1).unwrap();
        assert_eq!(
            steps.iter().map(|s| s.order).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(steps[0].description, "Mix.");
    }
}
