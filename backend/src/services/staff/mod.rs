//! # Staff Service Module
//!
//! Write surface for content editors, under `/api/staff`. All routes
//! require an authenticated staff account and the CSRF header.
//!
//! *   **`POST   /recipes`**: create a recipe with nested steps,
//!     ingredient lines and taxonomy links.
//! *   **`PUT    /recipes/{id}`**: full update; join rows are rewritten.
//! *   **`DELETE /recipes/{id}`**: delete the recipe and its children.
//! *   **`POST   /media`**: multipart image upload; stores the file
//!     under the media root and generates the derivative set.
//!
//! Every recipe mutation calls into the index synchronization hooks
//! strictly after its transaction has committed.

mod media;
mod recipes;

use actix_web::web::{delete, post, put, scope};
use actix_web::{HttpRequest, Scope};
use rusqlite::Connection;

use crate::accounts::User;
use crate::error::ApiError;
use crate::services::auth::session::require_user;

const API_PATH: &str = "/api/staff";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/recipes", post().to(recipes::create))
        .route("/recipes/{id}", put().to(recipes::update))
        .route("/recipes/{id}", delete().to(recipes::remove))
        .route("/media", post().to(media::process))
}

pub(crate) fn require_staff(conn: &Connection, req: &HttpRequest) -> Result<User, ApiError> {
    let user = require_user(conn, req)?;
    if !user.is_staff {
        return Err(ApiError::Forbidden("staff access required"));
    }
    Ok(user)
}
