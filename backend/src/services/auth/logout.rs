//! Session teardown.

use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::ApiError;
use crate::state::AppState;

use super::session::{create_session, delete_session, session_cookie, verified_session};

/// Handler for `POST /api/auth/logout`. Drops the current session and
/// hands out a fresh anonymous one so the client keeps a usable CSRF
/// token.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let conn = state.db()?;
    let old_session = verified_session(&conn, &req)?;

    delete_session(&conn, &old_session.token)?;
    let session = create_session(&conn, None)?;
    let payload = super::session_payload(&session, None);

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session.token))
        .json(payload))
}
