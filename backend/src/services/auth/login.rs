//! Credential verification and session establishment.

use actix_web::{web, HttpRequest, HttpResponse};
use rusqlite::Connection;

use common::requests::LoginRequest;

use crate::accounts::{self, User};
use crate::error::ApiError;
use crate::state::AppState;

use super::session::{
    create_session, delete_session, session_cookie, verified_session,
};

/// Resolves the identifier to a user and checks the password. The
/// identifier is tried as a username first; when it looks like an email
/// address, a case-insensitive email lookup is the fallback.
fn authenticate(
    conn: &Connection,
    identifier: &str,
    password: &str,
) -> Result<Option<User>, ApiError> {
    let identity = identifier.trim();

    if let Some(user) = accounts::find_by_username(conn, identity)? {
        if accounts::check_password(conn, user.id, password)? {
            return Ok(Some(user));
        }
        return Ok(None);
    }

    if identity.contains('@') {
        if let Some(user) = accounts::find_by_email(conn, identity)? {
            if accounts::check_password(conn, user.id, password)? {
                return Ok(Some(user));
            }
        }
    }
    Ok(None)
}

/// Handler for `POST /api/auth/login`.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let conn = state.db()?;
    let old_session = verified_session(&conn, &req)?;

    let user = authenticate(&conn, &payload.identifier, &payload.password)?
        .ok_or(ApiError::InvalidCredentials)?;
    if !user.is_active {
        return Err(ApiError::Forbidden("account is inactive"));
    }

    // Rotate the session and CSRF token on privilege change.
    delete_session(&conn, &old_session.token)?;
    let session = create_session(&conn, Some(user.id))?;
    let payload = super::session_payload(&session, Some(&user));

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session.token))
        .json(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::NewUser;
    use crate::db::test_support::memory_db;

    fn seed_user(conn: &Connection) -> User {
        accounts::create_user(
            conn,
            &NewUser {
                username: "greta",
                email: "Greta@Example.com",
                password: "longenough",
                full_name: "",
                is_staff: false,
            },
        )
        .unwrap()
    }

    #[test]
    fn authenticates_by_username() {
        let conn = memory_db();
        seed_user(&conn);
        assert!(authenticate(&conn, "greta", "longenough").unwrap().is_some());
        assert!(authenticate(&conn, "greta", "wrong").unwrap().is_none());
    }

    #[test]
    fn falls_back_to_email_lookup() {
        let conn = memory_db();
        seed_user(&conn);
        let user = authenticate(&conn, "greta@example.com", "longenough")
            .unwrap()
            .expect("email login");
        assert_eq!(user.username, "greta");
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let conn = memory_db();
        seed_user(&conn);
        assert!(authenticate(&conn, "nobody", "longenough").unwrap().is_none());
        assert!(authenticate(&conn, "nobody@example.com", "longenough")
            .unwrap()
            .is_none());
    }
}
