use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::HydroError;
use crate::utils::validation::{validate_finite, Validate};

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    #[serde(alias = "US")]
    Us,
    #[serde(alias = "Metric")]
    Metric,
}

impl UnitSystem {
    pub fn volume_label(&self) -> &'static str {
        match self {
            UnitSystem::Us => "gallons",
            UnitSystem::Metric => "liters",
        }
    }
}

impl FromStr for UnitSystem {
    type Err = HydroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "us" | "usgallons" | "gal" | "gallons" => Ok(UnitSystem::Us),
            "metric" | "liters" | "litres" | "l" => Ok(UnitSystem::Metric),
            _ => Err(HydroError::validation(format!(
                "Unknown unit system '{}' (expected US or Metric)",
                s
            ))),
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitSystem::Us => write!(f, "US"),
            UnitSystem::Metric => write!(f, "Metric"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrowthStage {
    Seedling,
    #[serde(rename = "Early Veg")]
    EarlyVeg,
    #[serde(rename = "Late Veg")]
    LateVeg,
    #[serde(rename = "Pre-Flower")]
    PreFlower,
    #[serde(rename = "Early Flower")]
    EarlyFlower,
    #[serde(rename = "Mid Flower")]
    MidFlower,
    #[serde(rename = "Late Flower")]
    LateFlower,
    Flush,
}

impl GrowthStage {
    pub const ALL: [GrowthStage; 8] = [
        GrowthStage::Seedling,
        GrowthStage::EarlyVeg,
        GrowthStage::LateVeg,
        GrowthStage::PreFlower,
        GrowthStage::EarlyFlower,
        GrowthStage::MidFlower,
        GrowthStage::LateFlower,
        GrowthStage::Flush,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GrowthStage::Seedling => "Seedling",
            GrowthStage::EarlyVeg => "Early Veg",
            GrowthStage::LateVeg => "Late Veg",
            GrowthStage::PreFlower => "Pre-Flower",
            GrowthStage::EarlyFlower => "Early Flower",
            GrowthStage::MidFlower => "Mid Flower",
            GrowthStage::LateFlower => "Late Flower",
            GrowthStage::Flush => "Flush",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            GrowthStage::Seedling => "🌱",
            GrowthStage::EarlyVeg | GrowthStage::LateVeg => "🌿",
            GrowthStage::PreFlower => "🌸",
            GrowthStage::EarlyFlower | GrowthStage::MidFlower | GrowthStage::LateFlower => "🌺",
            GrowthStage::Flush => "💧",
        }
    }

    /// Fraction of full strength fed at this stage.
    pub fn multiplier(&self) -> f64 {
        match self {
            GrowthStage::Seedling => 0.25,
            GrowthStage::EarlyVeg => 0.5,
            GrowthStage::LateVeg => 0.75,
            GrowthStage::PreFlower => 0.8,
            GrowthStage::EarlyFlower | GrowthStage::MidFlower => 1.0,
            GrowthStage::LateFlower => 0.75,
            GrowthStage::Flush => 0.0,
        }
    }
}

impl FromStr for GrowthStage {
    type Err = HydroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        GrowthStage::ALL
            .into_iter()
            .find(|stage| normalize(stage.label()) == wanted)
            .ok_or_else(|| {
                HydroError::validation(format!(
                    "Unknown growth stage '{}' (expected one of: {})",
                    s,
                    GrowthStage::ALL
                        .iter()
                        .map(|g| g.label())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

impl fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientKind {
    Micro,
    Grow,
    Bloom,
    Base,
    BaseA,
    BaseB,
    Calmag,
    Silica,
    PkBoost,
    Root,
    Humic,
    Ripening,
    Enzyme,
    Biostimulant,
    Supplement,
}

impl NutrientKind {
    pub fn is_base_trio(&self) -> bool {
        matches!(
            self,
            NutrientKind::Micro | NutrientKind::Grow | NutrientKind::Bloom
        )
    }

    pub fn category(&self) -> NutrientCategory {
        match self {
            NutrientKind::Micro
            | NutrientKind::Grow
            | NutrientKind::Bloom
            | NutrientKind::Base
            | NutrientKind::BaseA
            | NutrientKind::BaseB => NutrientCategory::Base,
            NutrientKind::Calmag | NutrientKind::Silica | NutrientKind::PkBoost => {
                NutrientCategory::Supplement
            }
            _ => NutrientCategory::Additive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NutrientKind::Micro => "micro",
            NutrientKind::Grow => "grow",
            NutrientKind::Bloom => "bloom",
            NutrientKind::Base => "base",
            NutrientKind::BaseA => "base_a",
            NutrientKind::BaseB => "base_b",
            NutrientKind::Calmag => "calmag",
            NutrientKind::Silica => "silica",
            NutrientKind::PkBoost => "pk_boost",
            NutrientKind::Root => "root",
            NutrientKind::Humic => "humic",
            NutrientKind::Ripening => "ripening",
            NutrientKind::Enzyme => "enzyme",
            NutrientKind::Biostimulant => "biostimulant",
            NutrientKind::Supplement => "supplement",
        }
    }
}

impl fmt::Display for NutrientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientCategory {
    Base,
    Supplement,
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DoseUnit {
    #[default]
    #[serde(rename = "ml")]
    Ml,
    #[serde(rename = "g")]
    Grams,
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoseUnit::Ml => write!(f, "ml"),
            DoseUnit::Grams => write!(f, "g"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientProduct {
    pub name: String,
    pub kind: NutrientKind,
    /// Dose per US gallon at 100% strength.
    pub max_strength: f64,
    #[serde(default)]
    pub unit: DoseUnit,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_use: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub benefits: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cautions: Vec<String>,
}

impl NutrientProduct {
    pub fn category(&self) -> NutrientCategory {
        self.kind.category()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientLine {
    pub name: String,
    pub description: String,
    pub base_nutrients: Vec<NutrientProduct>,
    #[serde(default)]
    pub supplements: Vec<NutrientProduct>,
}

impl NutrientLine {
    pub fn base(&self, name: &str) -> Option<&NutrientProduct> {
        self.base_nutrients
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn supplement(&self, name: &str) -> Option<&NutrientProduct> {
        self.supplements
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn product(&self, name: &str) -> Option<&NutrientProduct> {
        self.base(name).or_else(|| self.supplement(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeedingType {
    Light,
    #[default]
    Medium,
    Heavy,
}

impl FeedingType {
    pub fn multiplier(&self) -> f64 {
        match self {
            FeedingType::Light => 0.75,
            FeedingType::Medium => 1.0,
            FeedingType::Heavy => 1.25,
        }
    }
}

impl FromStr for FeedingType {
    type Err = HydroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "light" | "lightfeeder" => Ok(FeedingType::Light),
            "medium" | "mediumfeeder" => Ok(FeedingType::Medium),
            "heavy" | "heavyfeeder" => Ok(FeedingType::Heavy),
            _ => Err(HydroError::validation(format!(
                "Unknown feeding type '{}' (expected Light, Medium or Heavy)",
                s
            ))),
        }
    }
}

impl fmt::Display for FeedingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedingType::Light => write!(f, "Light"),
            FeedingType::Medium => write!(f, "Medium"),
            FeedingType::Heavy => write!(f, "Heavy"),
        }
    }
}

/// Inclusive numeric range such as an EC or pH target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Both bounds finite and ordered.
    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Distance from the nearest bound; zero inside the range.
    pub fn deviation(&self, value: f64) -> f64 {
        if value < self.min {
            self.min - value
        } else if value > self.max {
            value - self.max
        } else {
            0.0
        }
    }
}

impl FromStr for Range {
    type Err = HydroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HydroError::validation(format!("Invalid range '{}' (expected e.g. 1.2-1.8)", s));
        let (lo, hi) = s.trim().split_once('-').ok_or_else(invalid)?;
        let min: f64 = lo.trim().parse().map_err(|_| invalid())?;
        let max: f64 = hi.trim().parse().map_err(|_| invalid())?;
        if min > max {
            return Err(invalid());
        }
        Ok(Range { min, max })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", one_decimal_min(self.min), one_decimal_min(self.max))
    }
}

// 1 -> "1.0", 1.25 -> "1.25"
fn one_decimal_min(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strain {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub feeding_type: FeedingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec_range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph_range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Strain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            feeding_type: FeedingType::default(),
            ec_range: None,
            ph_range: None,
            notes: None,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeEntry {
    pub product: String,
    pub amount: f64,
    pub unit: DoseUnit,
    pub kind: NutrientKind,
    pub per_gallon: f64,
    pub per_liter: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_use: Option<String>,
}

impl RecipeEntry {
    pub fn amount_label(&self) -> String {
        format!("{} {}", self.amount, self.unit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub nutrient_line: String,
    pub volume: f64,
    pub unit_system: UnitSystem,
    pub gallons: f64,
    pub strength_percent: f64,
    pub growth_stage: GrowthStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strain: Option<String>,
    #[serde(default)]
    pub feeding_type: FeedingType,
    pub target_ec: Range,
    pub target_ph: Range,
    pub entries: Vec<RecipeEntry>,
}

impl Recipe {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, product: &str) -> Option<&RecipeEntry> {
        self.entries
            .iter()
            .find(|e| e.product.eq_ignore_ascii_case(product))
    }

    pub fn volume_label(&self) -> String {
        format!("{} {}", self.volume, self.unit_system.volume_label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepAmount {
    pub product: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub label: String,
    pub value: String,
}

impl Measurement {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixingStep {
    pub step: usize,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equipment: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amounts: Vec<StepAmount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measurements: Vec<Measurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph_impact: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    Optimal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compliance {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Caution,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_f: Option<f64>,
}

impl Validate for Reading {
    fn validate(&self) -> crate::utils::error::Result<()> {
        for (field, value) in [
            ("ec", self.ec),
            ("ph", self.ph),
            ("temperature_f", self.temperature_f),
        ] {
            if let Some(value) = value {
                validate_finite(field, value)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeResult {
    pub date: String,
    pub reading: Reading,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecipe {
    pub recipe_id: u64,
    pub name: String,
    pub recipe: Recipe,
    pub created_at: String,
    pub last_modified: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strain: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mixing_instructions: Vec<MixingStep>,
    #[serde(default)]
    pub results: Vec<RecipeResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicated_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<String>,
}

fn default_version() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_stage_parsing_is_lenient() {
        assert_eq!("early veg".parse::<GrowthStage>().unwrap(), GrowthStage::EarlyVeg);
        assert_eq!("Pre-Flower".parse::<GrowthStage>().unwrap(), GrowthStage::PreFlower);
        assert_eq!("pre_flower".parse::<GrowthStage>().unwrap(), GrowthStage::PreFlower);
        assert!("harvest".parse::<GrowthStage>().is_err());
    }

    #[test]
    fn test_growth_stage_serializes_with_label() {
        let json = serde_json::to_string(&GrowthStage::MidFlower).unwrap();
        assert_eq!(json, "\"Mid Flower\"");
    }

    #[test]
    fn test_unit_system_parsing() {
        assert_eq!("US Gallons".parse::<UnitSystem>().unwrap(), UnitSystem::Us);
        assert_eq!("Liters".parse::<UnitSystem>().unwrap(), UnitSystem::Metric);
        assert_eq!("metric".parse::<UnitSystem>().unwrap(), UnitSystem::Metric);
        assert!("furlongs".parse::<UnitSystem>().is_err());
    }

    #[test]
    fn test_range_parse_and_display() {
        let range: Range = "1.2-1.8".parse().unwrap();
        assert_eq!(range, Range::new(1.2, 1.8));
        assert_eq!(range.to_string(), "1.2-1.8");
        assert!(range.contains(1.5));
        assert!((range.deviation(2.0) - 0.2).abs() < 1e-9);
        assert!("1.8-1.2".parse::<Range>().is_err());
        assert!("abc".parse::<Range>().is_err());
    }

    #[test]
    fn test_range_well_formed() {
        assert!(Range::new(1.2, 1.8).is_well_formed());
        assert!(Range::new(6.0, 6.0).is_well_formed());
        assert!(!Range::new(2.2, 1.6).is_well_formed());
        assert!(!Range::new(f64::NAN, 1.8).is_well_formed());
        assert!(!Range::new(1.2, f64::INFINITY).is_well_formed());
    }

    #[test]
    fn test_reading_rejects_non_finite_values() {
        let reading = Reading {
            ec: Some(1.4),
            ph: Some(6.0),
            temperature_f: None,
        };
        assert!(reading.validate().is_ok());
        assert!(Reading::default().validate().is_ok());

        let reading = Reading {
            ph: Some(f64::NAN),
            ..reading
        };
        assert!(reading.validate().is_err());
    }

    #[test]
    fn test_kind_categories() {
        assert_eq!(NutrientKind::Micro.category(), NutrientCategory::Base);
        assert_eq!(NutrientKind::BaseA.category(), NutrientCategory::Base);
        assert_eq!(NutrientKind::Silica.category(), NutrientCategory::Supplement);
        assert_eq!(NutrientKind::Enzyme.category(), NutrientCategory::Additive);
        assert!(!NutrientKind::Base.is_base_trio());
    }

    #[test]
    fn test_strain_deserializes_with_defaults() {
        let strain: Strain =
            serde_json::from_str(r#"{"name": "Blue Dream", "category": "Balanced Hybrid", "thc": "18%"}"#)
                .unwrap();
        assert_eq!(strain.name, "Blue Dream");
        assert_eq!(strain.feeding_type, FeedingType::Medium);
        assert!(strain.ec_range.is_none());
    }
}
