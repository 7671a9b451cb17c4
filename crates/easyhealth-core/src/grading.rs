//! # Grading Colours
//!
//! Badge colours for Nutri-Score letters and Nova groups.
//!
//! ```text
//! Nutri-Score                    Nova
//! ┌───┬─────────┐                ┌───┬─────────┐
//! │ A │ #008b4c │ dark green     │ 1 │ #00aa00 │ unprocessed
//! │ B │ #85bb2f │ light green    │ 2 │ #ffcc00 │ culinary ingredient
//! │ C │ #fecb02 │ yellow         │ 3 │ #ff6600 │ processed
//! │ D │ #ee8100 │ orange         │ 4 │ #ee0000 │ ultra-processed
//! │ E │ #e63e11 │ red            └───┴─────────┘
//! └───┴─────────┘
//! anything else → FALLBACK_COLOR
//! ```

use crate::types::{NovaGroup, NutriGrade, NutrientLevel};

/// Grey used for missing or unrecognised grades.
pub const FALLBACK_COLOR: &str = "#999";

pub fn nutri_score_color(grade: Option<NutriGrade>) -> &'static str {
    match grade {
        Some(NutriGrade::A) => "#008b4c",
        Some(NutriGrade::B) => "#85bb2f",
        Some(NutriGrade::C) => "#fecb02",
        Some(NutriGrade::D) => "#ee8100",
        Some(NutriGrade::E) => "#e63e11",
        None => FALLBACK_COLOR,
    }
}

/// Colour for a raw grade string straight from the API.
pub fn nutri_score_color_for(raw: Option<&str>) -> &'static str {
    nutri_score_color(raw.and_then(|r| r.parse().ok()))
}

pub fn nova_color(group: Option<NovaGroup>) -> &'static str {
    match group.map(NovaGroup::value) {
        Some(1) => "#00aa00",
        Some(2) => "#ffcc00",
        Some(3) => "#ff6600",
        Some(4) => "#ee0000",
        _ => FALLBACK_COLOR,
    }
}

/// Traffic-light colour for a nutrient row in the panel.
pub fn nutrient_level_color(level: NutrientLevel) -> &'static str {
    match level {
        NutrientLevel::Low => nutri_score_color(Some(NutriGrade::A)),
        NutrientLevel::Moderate => nutri_score_color(Some(NutriGrade::C)),
        NutrientLevel::High => nutri_score_color(Some(NutriGrade::E)),
        NutrientLevel::Unknown => FALLBACK_COLOR,
    }
}
