//! Session records, the session cookie and the CSRF check.
//!
//! A session row exists for every visitor, authenticated or not; the
//! anonymous row only carries the CSRF token handed out by
//! `GET /api/auth/session`. Logging in rotates both the session token and
//! the CSRF token.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use rusqlite::{Connection, OptionalExtension};

use crate::accounts::{self, random_token, User};
use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sessionid";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

#[derive(Clone, Debug)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: Option<i64>,
    pub csrf_token: String,
}

pub fn create_session(conn: &Connection, user_id: Option<i64>) -> Result<SessionRecord, ApiError> {
    let record = SessionRecord {
        token: random_token(),
        user_id,
        csrf_token: random_token(),
    };
    conn.execute(
        "INSERT INTO sessions (token, user_id, csrf_token, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![record.token, record.user_id, record.csrf_token, db::now()],
    )?;
    Ok(record)
}

pub fn delete_session(conn: &Connection, token: &str) -> Result<(), ApiError> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
    Ok(())
}

fn find_session(conn: &Connection, token: &str) -> Result<Option<SessionRecord>, ApiError> {
    let record = conn
        .query_row(
            "SELECT token, user_id, csrf_token FROM sessions WHERE token = ?1",
            [token],
            |row| {
                Ok(SessionRecord {
                    token: row.get(0)?,
                    user_id: row.get(1)?,
                    csrf_token: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

/// The session referenced by the request cookie, if it is still alive.
pub fn request_session(
    conn: &Connection,
    req: &HttpRequest,
) -> Result<Option<SessionRecord>, ApiError> {
    match req.cookie(SESSION_COOKIE) {
        Some(cookie) => find_session(conn, cookie.value()),
        None => Ok(None),
    }
}

/// The authenticated user behind the request, if any. Inactive accounts
/// are treated as anonymous.
pub fn request_user(conn: &Connection, req: &HttpRequest) -> Result<Option<User>, ApiError> {
    let Some(session) = request_session(conn, req)? else {
        return Ok(None);
    };
    session_user(conn, &session)
}

pub fn session_user(conn: &Connection, session: &SessionRecord) -> Result<Option<User>, ApiError> {
    let Some(user_id) = session.user_id else {
        return Ok(None);
    };
    Ok(accounts::find_by_id(conn, user_id)?.filter(|user| user.is_active))
}

/// Session + user for a state-changing request: the session must exist
/// and the CSRF header must match it. Authentication is checked by the
/// caller where required.
pub fn verified_session(
    conn: &Connection,
    req: &HttpRequest,
) -> Result<SessionRecord, ApiError> {
    let session = request_session(conn, req)?
        .ok_or(ApiError::Forbidden("CSRF token missing or incorrect"))?;
    let header = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if header.is_empty() || header != session.csrf_token {
        return Err(ApiError::Forbidden("CSRF token missing or incorrect"));
    }
    Ok(session)
}

/// Authenticated user for a state-changing request, after the CSRF check.
pub fn require_user(conn: &Connection, req: &HttpRequest) -> Result<User, ApiError> {
    let session = verified_session(conn, req)?;
    session_user(conn, &session)?.ok_or(ApiError::AuthRequired)
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// Handler for `GET /api/auth/session`.
///
/// Returns the session payload and makes sure the caller leaves with a
/// valid session cookie and CSRF token.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let conn = state.db()?;
    let (session, fresh) = match request_session(&conn, &req)? {
        Some(session) => (session, false),
        None => (create_session(&conn, None)?, true),
    };
    let user = session_user(&conn, &session)?;
    let payload = super::session_payload(&session, user.as_ref());

    let mut response = HttpResponse::Ok();
    if fresh {
        response.cookie(session_cookie(&session.token));
    }
    Ok(response.json(payload))
}
