//! Active hero blocks.

use actix_web::{web, HttpResponse};

use common::model::sitecontent::HeroBlock;

use crate::error::ApiError;
use crate::state::AppState;

use super::{media_url, noneable};

/// Handler for `GET /api/sitecontent/heroes`.
pub async fn process(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let conn = state.db()?;
    let media = &state.config.media_base_url;

    let mut stmt = conn.prepare(
        "SELECT id, title, subtitle, hero_text_html, image
         FROM hero_blocks WHERE is_active = 1 ORDER BY title",
    )?;
    let heroes = stmt
        .query_map([], |row| {
            Ok(HeroBlock {
                id: row.get(0)?,
                title: row.get(1)?,
                subtitle: row.get::<_, String>(2).map(noneable)?,
                hero_text_html: row.get::<_, String>(3).map(noneable)?,
                image: row.get::<_, Option<String>>(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|mut hero| {
            hero.image = media_url(media, hero.image.take());
            hero
        })
        .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(heroes))
}
