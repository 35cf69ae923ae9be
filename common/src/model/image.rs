use serde::{Deserialize, Serialize};

/// One derived size of an image, in both delivery codecs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImageVariant {
    pub avif: Option<String>,
    pub webp: Option<String>,
}

/// Full set of URLs for an uploaded image and its derivatives.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImageSet {
    pub original: Option<String>,
    pub thumb: Option<ImageVariant>,
    pub small: Option<ImageVariant>,
    pub medium: Option<ImageVariant>,
    pub large: Option<ImageVariant>,
}
