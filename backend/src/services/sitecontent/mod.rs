//! # Site Content Service Module
//!
//! Read-only delivery of the singleton page chrome managed by editors:
//!
//! *   **`GET /api/sitecontent/header`**: newest active header with its
//!     ordered menu tree, or `null`.
//! *   **`GET /api/sitecontent/footer`**: newest active footer with its
//!     ordered columns, or `null`.
//! *   **`GET /api/sitecontent/heroes`**: all active hero blocks.

mod footer;
mod header;
mod heroes;

use actix_web::web::{get, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/sitecontent";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/header", get().to(header::process))
        .route("/footer", get().to(footer::process))
        .route("/heroes", get().to(heroes::process))
}

/// Media paths are stored relative to the media root; clients get
/// absolute URLs.
pub(crate) fn media_url(media_base_url: &str, rel: Option<String>) -> Option<String> {
    rel.filter(|rel| !rel.is_empty())
        .map(|rel| format!("{media_base_url}/{rel}"))
}

pub(crate) fn noneable(value: String) -> Option<String> {
    Some(value).filter(|value| !value.is_empty())
}
