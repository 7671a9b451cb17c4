//! # Detail Panel
//!
//! View-model for the slide-up panel that presents a found product.
//!
//! ```text
//! ┌───────────────────────────────────────┐  ◄── snap 85%
//! │ ┌───────┐  Nutella                    │
//! │ │ image │  Ferrero                    │
//! │ └───────┘                             │
//! │  [ E ] Nutri-Score    [ NOVA 4 ]      │  ◄── snap 25%
//! │  Fat ........... high                 │
//! │  Sugars ........ high                 │
//! └───────────────────────────────────────┘
//! ```

use serde::Serialize;
use ts_rs::TS;

use crate::grading::{nova_color, nutri_score_color, nutrient_level_color};
use crate::types::{Nutrient, NutrientLevel, Product};

pub const UNKNOWN_PRODUCT: &str = "Unknown Product";
pub const UNKNOWN_BRAND: &str = "Unknown Brand";
pub const NO_IMAGE: &str = "No Image Available";

/// Panel heights as a percentage of the screen.
pub const SNAP_POINTS: [u8; 2] = [25, 85];

/// A coloured label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Badge {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum ProductImage {
    Url(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct NutrientRow {
    pub nutrient: Nutrient,
    pub label: String,
    pub level: NutrientLevel,
    pub color: String,
}

/// Everything the panel draws for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ProductCard {
    pub title: String,
    pub brand: String,
    pub image: ProductImage,
    pub nutri_score: Option<Badge>,
    pub nova: Option<Badge>,
    pub nutrients: Vec<NutrientRow>,
    /// Heights the panel rests at, smallest first.
    pub snap_points: [u8; 2],
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        let image = match product.image_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => ProductImage::Url(url.to_string()),
            _ => ProductImage::Placeholder(NO_IMAGE.to_string()),
        };

        // Badge shows whatever grade string came back, uppercased; colour
        // falls back to grey for non a–e values.
        let nutri_score = product
            .nutrition_grade
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(|raw| Badge {
                label: raw.to_uppercase(),
                color: nutri_score_color(product.nutri_grade()).to_string(),
            });

        let nova = product.nova().map(|group| Badge {
            label: format!("NOVA {}", group),
            color: nova_color(Some(group)).to_string(),
        });

        let nutrients = Nutrient::ALL
            .iter()
            .filter_map(|nutrient| {
                product.level(*nutrient).map(|level| NutrientRow {
                    nutrient: *nutrient,
                    label: nutrient.label().to_string(),
                    level,
                    color: nutrient_level_color(level).to_string(),
                })
            })
            .collect();

        Self {
            title: product.display_name().unwrap_or(UNKNOWN_PRODUCT).to_string(),
            brand: product.display_brand().unwrap_or(UNKNOWN_BRAND).to_string(),
            image,
            nutri_score,
            nova,
            nutrients,
            snap_points: SNAP_POINTS,
        }
    }
}
