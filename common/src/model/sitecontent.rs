use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeaderDropdown {
    pub id: i64,
    pub title: String,
    pub link: Option<String>,
    pub icon_svg: Option<String>,
    pub image: Option<String>,
    pub order: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeaderMenu {
    pub id: i64,
    pub title: String,
    pub link: Option<String>,
    pub is_dropdown: bool,
    pub icon_svg: Option<String>,
    pub image: Option<String>,
    pub order: u32,
    pub dropdown_items: Vec<HeaderDropdown>,
}

/// Site-wide header block: SEO fields, logo and the main menu tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteHeader {
    pub id: i64,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub description_html: Option<String>,
    pub logo: Option<String>,
    pub menu_items: Vec<HeaderMenu>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FooterColumn {
    pub id: i64,
    pub title: String,
    pub order: u32,
    pub column_type: String,
    pub link_title: Option<String>,
    pub link: Option<String>,
    pub html_block: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Footer {
    pub id: i64,
    pub hero_text_html: Option<String>,
    pub text_after_footer: Option<String>,
    pub hero_image: Option<String>,
    pub columns: Vec<FooterColumn>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeroBlock {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub hero_text_html: Option<String>,
    pub image: Option<String>,
}
