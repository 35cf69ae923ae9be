//! Active footer with its ordered columns.

use actix_web::{web, HttpResponse};
use rusqlite::{Connection, OptionalExtension};

use common::model::sitecontent::{Footer, FooterColumn};

use crate::error::ApiError;
use crate::state::AppState;

use super::{media_url, noneable};

fn columns(conn: &Connection, footer_id: i64) -> Result<Vec<FooterColumn>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, column_order, column_type, link_title, link, html_block
         FROM footer_columns WHERE footer_id = ?1 ORDER BY column_order",
    )?;
    let rows = stmt
        .query_map([footer_id], |row| {
            Ok(FooterColumn {
                id: row.get(0)?,
                title: row.get(1)?,
                order: row.get(2)?,
                column_type: row.get(3)?,
                link_title: row.get::<_, String>(4).map(noneable)?,
                link: row.get::<_, String>(5).map(noneable)?,
                html_block: row.get::<_, String>(6).map(noneable)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn active_footer(conn: &Connection, media: &str) -> Result<Option<Footer>, ApiError> {
    let footer = conn
        .query_row(
            "SELECT id, hero_text_html, text_after_footer, hero_image
             FROM footers WHERE is_active = 1 ORDER BY updated_at DESC LIMIT 1",
            [],
            |row| {
                Ok(Footer {
                    id: row.get(0)?,
                    hero_text_html: row.get::<_, String>(1).map(noneable)?,
                    text_after_footer: row.get::<_, String>(2).map(noneable)?,
                    hero_image: row.get::<_, Option<String>>(3)?,
                    columns: Vec::new(),
                })
            },
        )
        .optional()?;

    match footer {
        Some(mut footer) => {
            footer.hero_image = media_url(media, footer.hero_image.take());
            footer.columns = columns(conn, footer.id)?;
            Ok(Some(footer))
        }
        None => Ok(None),
    }
}

/// Handler for `GET /api/sitecontent/footer`.
pub async fn process(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let conn = state.db()?;
    let footer = active_footer(&conn, &state.config.media_base_url)?;
    Ok(HttpResponse::Ok().json(footer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_db;

    #[test]
    fn columns_come_back_in_order() {
        let conn = memory_db();
        conn.execute_batch(
            "INSERT INTO footers (id, is_active, created_at, updated_at)
             VALUES (1, 1, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');
             INSERT INTO footer_columns (id, footer_id, title, column_order, column_type, created_at, updated_at)
             VALUES (1, 1, 'About', 2, 'html_text', '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00'),
                    (2, 1, 'Links', 1, 'linklist', '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');",
        )
        .unwrap();

        let footer = active_footer(&conn, "http://m").unwrap().unwrap();
        let titles: Vec<_> = footer.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Links", "About"]);
    }
}
