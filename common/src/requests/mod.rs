//! Request payloads accepted by the backend API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query parameters of the recipe listing endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeFilters {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub category: Option<String>,
    pub cuisine: Option<String>,
    pub meal_type: Option<String>,
    pub difficulty: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

impl Default for RecipeFilters {
    fn default() -> Self {
        Self {
            search: None,
            tag: None,
            category: None,
            cuisine: None,
            meal_type: None,
            difficulty: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Username or email address.
    pub identifier: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub uid: String,
    pub token: String,
    pub new_password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentCreateRequest {
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RatingCreateRequest {
    pub value: i64,
}

/// One ingredient line in a staff recipe write.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeIngredientWrite {
    pub ingredient_id: i64,
    pub amount: f64,
    pub unit_id: i64,
    #[serde(default)]
    pub note: Option<String>,
}

/// One step in a staff recipe write. `order` must be unique per recipe.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeStepWrite {
    pub order: u32,
    #[serde(default)]
    pub title: Option<String>,
    pub description: String,
    #[serde(default)]
    pub description_html: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Full recipe payload for the staff create/update endpoints.
///
/// Taxonomy links are given by id; join rows are rewritten to match on
/// every update. `image` is a media-relative path previously returned by
/// the staff upload endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeWrite {
    pub title: String,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_html: Option<String>,
    pub preparation_time: u32,
    pub cooking_time: u32,
    pub servings: u32,
    pub difficulty: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub categories: Vec<i64>,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub cuisines: Vec<i64>,
    #[serde(default)]
    pub meal_types: Vec<i64>,
    #[serde(default)]
    pub cooking_methods: Vec<i64>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredientWrite>,
    #[serde(default)]
    pub steps: Vec<RecipeStepWrite>,
}
