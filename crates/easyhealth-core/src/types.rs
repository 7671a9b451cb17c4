//! # Domain Types
//!
//! Core domain types used throughout EasyHealth.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      User       │   │    Session      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_name   │   │  id (UUID)      │   │  access_token   │       │
//! │  │  brands         │   │  email          │   │  refresh_token  │       │
//! │  │  nutrition_gr.. │   └─────────────────┘   │  expires_at     │       │
//! │  │  nova_group     │                         │  user           │       │
//! │  │  nutrient_lev.. │                         └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   NutriGrade    │   │   NovaGroup     │   │ BarcodeFormat   │       │
//! │  │  A B C D E      │   │  1 2 3 4        │   │  ean13 ean8     │       │
//! │  └─────────────────┘   └─────────────────┘   │  upc_a upc_e    │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sourcing
//! `Product` mirrors the product database's JSON keys (`product_name`,
//! `brands`, `nutrition_grades`, ...) and keeps the raw values. Typed views
//! such as [`Product::nutri_grade`] are derived on demand, so an odd value in
//! one field never costs us the rest of the record.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Nutri-Score
// =============================================================================

/// Nutri-Score letter grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum NutriGrade {
    A,
    B,
    C,
    D,
    E,
}

impl NutriGrade {
    pub const ALL: [NutriGrade; 5] = [
        NutriGrade::A,
        NutriGrade::B,
        NutriGrade::C,
        NutriGrade::D,
        NutriGrade::E,
    ];

    /// Lowercase form, as the product database spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            NutriGrade::A => "a",
            NutriGrade::B => "b",
            NutriGrade::C => "c",
            NutriGrade::D => "d",
            NutriGrade::E => "e",
        }
    }

    /// Uppercase letter shown on the badge.
    pub fn letter(self) -> char {
        match self {
            NutriGrade::A => 'A',
            NutriGrade::B => 'B',
            NutriGrade::C => 'C',
            NutriGrade::D => 'D',
            NutriGrade::E => 'E',
        }
    }
}

impl fmt::Display for NutriGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for NutriGrade {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(NutriGrade::A),
            "b" => Ok(NutriGrade::B),
            "c" => Ok(NutriGrade::C),
            "d" => Ok(NutriGrade::D),
            "e" => Ok(NutriGrade::E),
            _ => Err(CoreError::UnknownNutriGrade(s.to_string())),
        }
    }
}

// =============================================================================
// Nova Group
// =============================================================================

/// Nova food-processing group, 1 (unprocessed) to 4 (ultra-processed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, TS)]
#[ts(export)]
pub struct NovaGroup(u8);

impl NovaGroup {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    /// Creates a Nova group, rejecting anything outside 1–4.
    pub fn new(value: i64) -> CoreResult<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(NovaGroup(value as u8))
        } else {
            Err(CoreError::InvalidNovaGroup(value))
        }
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for NovaGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Nutrient Levels
// =============================================================================

/// Traffic-light level for a single nutrient.
///
/// Anything the database sends besides low/moderate/high lands in `Unknown`
/// rather than failing the whole product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum NutrientLevel {
    Low,
    Moderate,
    High,
    Unknown,
}

impl NutrientLevel {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => NutrientLevel::Low,
            "moderate" => NutrientLevel::Moderate,
            "high" => NutrientLevel::High,
            _ => NutrientLevel::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NutrientLevel::Low => "low",
            NutrientLevel::Moderate => "moderate",
            NutrientLevel::High => "high",
            NutrientLevel::Unknown => "unknown",
        }
    }
}

impl<'de> Deserialize<'de> for NutrientLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(NutrientLevel::parse_lenient)
            .unwrap_or(NutrientLevel::Unknown))
    }
}

/// Nutrients the database reports levels for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum Nutrient {
    Fat,
    SaturatedFat,
    Sugars,
    Salt,
}

impl Nutrient {
    pub const ALL: [Nutrient; 4] = [
        Nutrient::Fat,
        Nutrient::SaturatedFat,
        Nutrient::Sugars,
        Nutrient::Salt,
    ];

    /// Key used in the `nutrient_levels` map.
    pub fn key(self) -> &'static str {
        match self {
            Nutrient::Fat => "fat",
            Nutrient::SaturatedFat => "saturated-fat",
            Nutrient::Sugars => "sugars",
            Nutrient::Salt => "salt",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Nutrient::Fat => "Fat",
            Nutrient::SaturatedFat => "Saturated fat",
            Nutrient::Sugars => "Sugars",
            Nutrient::Salt => "Salt",
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A food or drink item as returned by the product database.
///
/// Read-only: fetched per scan, shown in the panel, discarded on dismiss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(rename = "product_name", default)]
    pub name: Option<String>,

    #[serde(rename = "brands", default)]
    pub brand: Option<String>,

    /// Raw grade string; see [`Product::nutri_grade`].
    #[serde(rename = "nutrition_grades", default)]
    pub nutrition_grade: Option<String>,

    #[serde(default, deserialize_with = "deserialize_nova_group")]
    pub nova_group: Option<u8>,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default, deserialize_with = "deserialize_nutrient_levels")]
    pub nutrient_levels: BTreeMap<String, NutrientLevel>,
}

impl Product {
    /// Typed Nutri-Score, `None` for absent or non a–e values.
    pub fn nutri_grade(&self) -> Option<NutriGrade> {
        self.nutrition_grade
            .as_deref()
            .and_then(|raw| raw.parse().ok())
    }

    /// Typed Nova group, `None` for absent or out-of-range values.
    pub fn nova(&self) -> Option<NovaGroup> {
        self.nova_group
            .and_then(|value| NovaGroup::new(i64::from(value)).ok())
    }

    pub fn level(&self, nutrient: Nutrient) -> Option<NutrientLevel> {
        self.nutrient_levels.get(nutrient.key()).copied()
    }

    /// Name if present and non-blank.
    pub fn display_name(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }

    /// Brand if present and non-blank.
    pub fn display_brand(&self) -> Option<&str> {
        non_blank(self.brand.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The database has shipped `nova_group` as a number, a numeric string and a
/// float over the years.
fn deserialize_nova_group<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    #[allow(dead_code)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Int(n)) => u8::try_from(n).ok(),
        Some(Raw::Float(f)) if f.fract() == 0.0 && (0.0..=255.0).contains(&f) => Some(f as u8),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn deserialize_nutrient_levels<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, NutrientLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, NutrientLevel>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Lookup Response
// =============================================================================

/// Body status flag meaning "product found".
pub const LOOKUP_STATUS_FOUND: i64 = 1;

/// Envelope of `GET /api/v2/product/{barcode}.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub status: i64,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub status_verbose: Option<String>,

    #[serde(default)]
    pub product: Option<Product>,
}

impl LookupResponse {
    pub fn is_found(&self) -> bool {
        self.status == LOOKUP_STATUS_FOUND && self.product.is_some()
    }

    /// The product, only when the status flag says it was found.
    pub fn into_product(self) -> Option<Product> {
        if self.status == LOOKUP_STATUS_FOUND {
            self.product
        } else {
            None
        }
    }
}

// =============================================================================
// Barcode Format
// =============================================================================

/// Barcode symbologies the scanner accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
}

impl BarcodeFormat {
    pub const ACCEPTED: [BarcodeFormat; 4] = [
        BarcodeFormat::Ean13,
        BarcodeFormat::Ean8,
        BarcodeFormat::UpcA,
        BarcodeFormat::UpcE,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BarcodeFormat::Ean13 => "ean13",
            BarcodeFormat::Ean8 => "ean8",
            BarcodeFormat::UpcA => "upc_a",
            BarcodeFormat::UpcE => "upc_e",
        }
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarcodeFormat {
    type Err = CoreError;

    /// Accepts `ean13`, `EAN-13`, `ean_13`, `upc_a`, `UPC-A`, `upca`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "ean13" => Ok(BarcodeFormat::Ean13),
            "ean8" => Ok(BarcodeFormat::Ean8),
            "upca" => Ok(BarcodeFormat::UpcA),
            "upce" => Ok(BarcodeFormat::UpcE),
            _ => Err(CoreError::UnsupportedBarcodeFormat(s.to_string())),
        }
    }
}

// =============================================================================
// User & Session
// =============================================================================

/// The authenticated account, as far as the app cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    #[ts(as = "String")]
    pub id: Uuid,

    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session.
///
/// Serialized to JSON this is the opaque blob kept in the credential store.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    pub expires_at: DateTime<Utc>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True once `now` is within `margin` of expiry.
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }

    /// Time left before expiry, never negative.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Kinds of session change the session service reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for AuthChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthChangeEvent::InitialSession => "INITIAL_SESSION",
            AuthChangeEvent::SignedIn => "SIGNED_IN",
            AuthChangeEvent::SignedOut => "SIGNED_OUT",
            AuthChangeEvent::TokenRefreshed => "TOKEN_REFRESHED",
            AuthChangeEvent::UserUpdated => "USER_UPDATED",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
