use serde::{Deserialize, Serialize};

/// Minimal reference to a named entity (tag, category, cuisine, ...).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lookup {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
}
