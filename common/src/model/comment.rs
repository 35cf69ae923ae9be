use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recipe comment as exposed to clients.
///
/// Unapproved comments are only ever serialized for their own author.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentEntry {
    pub id: i64,
    pub content: String,
    pub user_name: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}
