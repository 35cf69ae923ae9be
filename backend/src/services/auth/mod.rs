//! # Auth Service Module
//!
//! Session-cookie authentication for the API:
//! - `GET  /api/auth/session`: current session state; establishes an
//!   anonymous session (and CSRF token) for first-time visitors.
//! - `POST /api/auth/login`: credential check by username or email,
//!   session rotation.
//! - `POST /api/auth/logout`: session teardown.
//! - `POST /api/auth/password-reset`: emails a reset link; always
//!   answers `{sent: true}` so addresses cannot be probed.
//! - `POST /api/auth/password-reset/confirm`: consumes a reset token.
//!
//! All state-changing routes require the `X-CSRF-Token` header to match
//! the token bound to the caller's session.

mod login;
mod logout;
mod password_reset;
pub mod session;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

use common::model::user::{SessionInfo, UserPublic};

use crate::accounts::User;
use session::SessionRecord;

const API_PATH: &str = "/api/auth";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/session", get().to(session::process))
        .route("/login", post().to(login::process))
        .route("/logout", post().to(logout::process))
        .route("/password-reset", post().to(password_reset::process))
        .route(
            "/password-reset/confirm",
            post().to(password_reset::confirm),
        )
}

pub(crate) fn serialize_user(user: &User) -> UserPublic {
    UserPublic {
        id: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        full_name: Some(user.full_name.clone()).filter(|name| !name.is_empty()),
    }
}

pub(crate) fn session_payload(session: &SessionRecord, user: Option<&User>) -> SessionInfo {
    SessionInfo {
        is_authenticated: user.is_some(),
        csrf_token: session.csrf_token.clone(),
        user: user.map(serialize_user),
    }
}
