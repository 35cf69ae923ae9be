//! # Recipes Service Module
//!
//! Public recipe endpoints under `/api/recipes`:
//!
//! *   **`GET /`**: listing with filters, dual-source pagination
//!     (external search index when available, relational fallback
//!     otherwise). See `list`.
//! *   **`GET /bookmarks`**: the authenticated viewer's saved recipes.
//! *   **`GET /{slug}`**: full detail for one recipe.
//! *   **`POST /{id}/bookmark`**: toggle a bookmark (auth + CSRF).
//! *   **`POST /{id}/comments`**: submit a comment for moderation
//!     (auth + CSRF); moderators are notified by email.
//! *   **`POST /{id}/rating`**: upsert the viewer's 1–5 rating
//!     (auth + CSRF).

mod bookmark;
mod bookmarks;
mod comment;
mod detail;
pub(crate) mod list;
mod rating;
pub(crate) mod serialize;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/recipes";

pub fn configure_routes() -> Scope {
    // "/bookmarks" must register before "/{slug}".
    scope(API_PATH)
        .route("", get().to(list::process))
        .route("/bookmarks", get().to(bookmarks::process))
        .route("/{slug}", get().to(detail::process))
        .route("/{id}/bookmark", post().to(bookmark::process))
        .route("/{id}/comments", post().to(comment::process))
        .route("/{id}/rating", post().to(rating::process))
}
