//! Active site header with its menu tree.

use actix_web::{web, HttpResponse};
use rusqlite::{Connection, OptionalExtension};

use common::model::sitecontent::{HeaderDropdown, HeaderMenu, SiteHeader};

use crate::error::ApiError;
use crate::state::AppState;

use super::{media_url, noneable};

fn dropdowns(
    conn: &Connection,
    media: &str,
    menu_id: i64,
) -> Result<Vec<HeaderDropdown>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, link, icon_svg, image, item_order
         FROM header_dropdown_items WHERE menu_id = ?1 ORDER BY item_order",
    )?;
    let rows = stmt
        .query_map([menu_id], |row| {
            Ok(HeaderDropdown {
                id: row.get(0)?,
                title: row.get(1)?,
                link: row.get::<_, String>(2).map(noneable)?,
                icon_svg: row.get::<_, String>(3).map(noneable)?,
                image: row.get::<_, Option<String>>(4)?,
                order: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .map(|mut item| {
            item.image = media_url(media, item.image.take());
            item
        })
        .collect())
}

fn menus(conn: &Connection, media: &str, header_id: i64) -> Result<Vec<HeaderMenu>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, link, is_dropdown, icon_svg, image, menu_order
         FROM header_menus WHERE header_id = ?1 ORDER BY menu_order, title",
    )?;
    let rows = stmt
        .query_map([header_id], |row| {
            Ok(HeaderMenu {
                id: row.get(0)?,
                title: row.get(1)?,
                link: row.get::<_, String>(2).map(noneable)?,
                is_dropdown: row.get(3)?,
                icon_svg: row.get::<_, String>(4).map(noneable)?,
                image: row.get::<_, Option<String>>(5)?,
                order: row.get(6)?,
                dropdown_items: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|mut menu| {
            menu.image = media_url(media, menu.image.take());
            menu.dropdown_items = dropdowns(conn, media, menu.id)?;
            Ok(menu)
        })
        .collect()
}

pub(crate) fn active_header(conn: &Connection, media: &str) -> Result<Option<SiteHeader>, ApiError> {
    let header = conn
        .query_row(
            "SELECT id, meta_title, meta_description, meta_keywords, description_html, logo
             FROM site_headers WHERE is_active = 1 ORDER BY updated_at DESC LIMIT 1",
            [],
            |row| {
                Ok(SiteHeader {
                    id: row.get(0)?,
                    meta_title: row.get::<_, String>(1).map(noneable)?,
                    meta_description: row.get::<_, String>(2).map(noneable)?,
                    meta_keywords: row.get::<_, String>(3).map(noneable)?,
                    description_html: row.get::<_, String>(4).map(noneable)?,
                    logo: row.get::<_, Option<String>>(5)?,
                    menu_items: Vec::new(),
                })
            },
        )
        .optional()?;

    match header {
        Some(mut header) => {
            header.logo = media_url(media, header.logo.take());
            header.menu_items = menus(conn, media, header.id)?;
            Ok(Some(header))
        }
        None => Ok(None),
    }
}

/// Handler for `GET /api/sitecontent/header`.
pub async fn process(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let conn = state.db()?;
    let header = active_header(&conn, &state.config.media_base_url)?;
    Ok(HttpResponse::Ok().json(header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_db;

    #[test]
    fn newest_active_header_wins() {
        let conn = memory_db();
        conn.execute_batch(
            "INSERT INTO site_headers (id, meta_title, is_active, created_at, updated_at)
             VALUES (1, 'Old', 1, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00'),
                    (2, 'New', 1, '2024-02-01T00:00:00+00:00', '2024-02-01T00:00:00+00:00'),
                    (3, 'Inactive', 0, '2024-03-01T00:00:00+00:00', '2024-03-01T00:00:00+00:00');",
        )
        .unwrap();

        let header = active_header(&conn, "http://m").unwrap().unwrap();
        assert_eq!(header.meta_title.as_deref(), Some("New"));
    }

    #[test]
    fn menu_tree_is_ordered() {
        let conn = memory_db();
        conn.execute_batch(
            "INSERT INTO site_headers (id, is_active, created_at, updated_at)
             VALUES (1, 1, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');
             INSERT INTO header_menus (id, header_id, title, is_dropdown, menu_order, created_at, updated_at)
             VALUES (1, 1, 'Recipes', 1, 2, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00'),
                    (2, 1, 'Home', 0, 1, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');
             INSERT INTO header_dropdown_items (id, menu_id, title, item_order, created_at, updated_at)
             VALUES (1, 1, 'Soups', 2, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00'),
                    (2, 1, 'Salads', 1, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');",
        )
        .unwrap();

        let header = active_header(&conn, "http://m").unwrap().unwrap();
        let titles: Vec<_> = header.menu_items.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Home", "Recipes"]);
        let dropdown_titles: Vec<_> = header.menu_items[1]
            .dropdown_items
            .iter()
            .map(|d| d.title.as_str())
            .collect();
        assert_eq!(dropdown_titles, vec!["Salads", "Soups"]);
    }

    #[test]
    fn no_active_header_serializes_to_null() {
        let conn = memory_db();
        assert!(active_header(&conn, "http://m").unwrap().is_none());
    }
}
