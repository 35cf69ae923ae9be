//! Slug generation for named entities.

use rusqlite::Connection;
use uuid::Uuid;

use crate::error::ApiError;

/// Lowercases, strips accents down to ASCII alphanumerics and joins words
/// with hyphens. Returns an empty string when nothing usable remains.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_was_hyphen = true;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    slug.trim_matches('-').to_string()
}

/// Derives a slug from `value` that is unique within `table`.
///
/// Falls back to a random hex slug when the input slugifies to nothing,
/// and resolves collisions with `-1`, `-2`, ... suffixes. `exclude_id`
/// keeps an existing row from colliding with itself on update.
pub fn unique_slug(
    conn: &Connection,
    table: &str,
    value: &str,
    exclude_id: Option<i64>,
) -> Result<String, ApiError> {
    let base = {
        let s = slugify(value);
        if s.is_empty() {
            Uuid::new_v4().simple().to_string()
        } else {
            s
        }
    };

    let sql = format!(
        "SELECT COUNT(*) FROM {table} WHERE slug = ?1 AND id IS NOT ?2"
    );
    let mut candidate = base.clone();
    let mut counter = 1u32;
    loop {
        let taken: i64 = conn.query_row(&sql, rusqlite::params![candidate, exclude_id], |row| {
            row.get(0)
        })?;
        if taken == 0 {
            return Ok(candidate);
        }
        candidate = format!("{base}-{counter}");
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_db;

    #[test]
    fn slugify_basics() {
        assert_eq!(slugify("Creamy Mushroom Soup"), "creamy-mushroom-soup");
        assert_eq!(slugify("  Spicy -- Thai!  "), "spicy-thai");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn collisions_get_numeric_suffixes() {
        let conn = memory_db();
        let now = crate::db::now();
        for slug in ["pancakes", "pancakes-1"] {
            conn.execute(
                "INSERT INTO tags (name, slug, created_at, updated_at) VALUES ('Pancakes', ?1, ?2, ?2)",
                rusqlite::params![slug, now],
            )
            .unwrap();
        }

        let slug = unique_slug(&conn, "tags", "Pancakes", None).unwrap();
        assert_eq!(slug, "pancakes-2");
    }

    #[test]
    fn update_does_not_collide_with_itself() {
        let conn = memory_db();
        let now = crate::db::now();
        conn.execute(
            "INSERT INTO tags (id, name, slug, created_at, updated_at) VALUES (7, 'Soup', 'soup', ?1, ?1)",
            rusqlite::params![now],
        )
        .unwrap();

        let slug = unique_slug(&conn, "tags", "Soup", Some(7)).unwrap();
        assert_eq!(slug, "soup");
    }

    #[test]
    fn empty_titles_fall_back_to_random_slug() {
        let conn = memory_db();
        let slug = unique_slug(&conn, "tags", "!!!", None).unwrap();
        assert_eq!(slug.len(), 32);
    }
}
