use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::comment::CommentEntry;
use crate::model::image::ImageSet;
use crate::model::lookup::Lookup;

/// Recipe difficulty scale. Serialized lowercase, matching the stored values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// A measurement unit as shown next to an ingredient amount.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitRef {
    pub id: i64,
    pub name: String,
    pub short_name: String,
}

/// One ingredient line of a recipe.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeIngredientEntry {
    pub id: i64,
    pub amount: f64,
    pub note: Option<String>,
    pub ingredient: Lookup,
    pub unit: UnitRef,
}

/// One preparation step, ordered within its recipe.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeStepEntry {
    pub id: i64,
    pub order: u32,
    pub title: Option<String>,
    pub description: String,
    pub description_html: Option<String>,
    pub duration: Option<u32>,
    pub video_url: Option<String>,
    pub images: Option<ImageSet>,
}

/// Compact recipe representation used by listings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub difficulty: Difficulty,
    pub images: Option<ImageSet>,
    pub preparation_time: u32,
    pub cooking_time: u32,
    pub servings: u32,
    pub published_at: Option<DateTime<Utc>>,
    pub rating_average: Option<f64>,
    pub rating_count: i64,
    pub tags: Vec<Lookup>,
    pub is_bookmarked: bool,
}

/// Everything the recipe page needs, on top of the summary fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub description: Option<String>,
    pub description_html: Option<String>,
    pub video_url: Option<String>,
    pub categories: Vec<Lookup>,
    pub meal_types: Vec<Lookup>,
    pub cuisines: Vec<Lookup>,
    pub cooking_methods: Vec<Lookup>,
    pub ingredients: Vec<RecipeIngredientEntry>,
    pub steps: Vec<RecipeStepEntry>,
    pub comments: Vec<CommentEntry>,
    pub user_rating: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeListResponse {
    pub total: i64,
    pub items: Vec<RecipeSummary>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookmarkState {
    pub is_bookmarked: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RatingValue {
    pub value: i64,
}
