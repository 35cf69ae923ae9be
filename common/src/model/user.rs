use serde::{Deserialize, Serialize};

/// Public view of an account, safe to hand to any authenticated client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
}

/// Session status returned by the auth endpoints.
///
/// `csrf_token` must be echoed back in the `X-CSRF-Token` header on every
/// state-changing request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub is_authenticated: bool,
    pub csrf_token: String,
    pub user: Option<UserPublic>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PasswordResetSent {
    pub sent: bool,
}
