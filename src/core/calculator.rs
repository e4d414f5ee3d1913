use serde::{Deserialize, Serialize};

use crate::core::catalog::Catalog;
use crate::core::instructions::{ec_range, DEFAULT_PH};
use crate::core::units::{round_to, Conversions};
use crate::domain::model::{
    FeedingType, GrowthStage, NutrientKind, NutrientProduct, Recipe, RecipeEntry, Strain,
    UnitSystem,
};
use crate::utils::error::{HydroError, Result};
use crate::utils::validation::{validate_finite, validate_range};

pub const MIN_VOLUME: f64 = 1.0;
pub const MAX_VOLUME: f64 = 10_000.0;
pub const MIN_STRENGTH: f64 = 25.0;
pub const MAX_STRENGTH: f64 = 125.0;

/// Supplement kinds dosed when the caller does not pick supplements explicitly.
pub const AUTO_SUPPLEMENT_KINDS: [NutrientKind; 3] =
    [NutrientKind::Calmag, NutrientKind::Silica, NutrientKind::PkBoost];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub nutrient_line: String,
    pub volume: f64,
    #[serde(default)]
    pub unit_system: UnitSystem,
    pub growth_stage: GrowthStage,
    /// Percentage of the manufacturer's full-strength dose.
    #[serde(default = "default_strength")]
    pub strength_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strain: Option<Strain>,
}

fn default_strength() -> f64 {
    100.0
}

impl CalculationRequest {
    pub fn new(nutrient_line: impl Into<String>, volume: f64, growth_stage: GrowthStage) -> Self {
        Self {
            nutrient_line: nutrient_line.into(),
            volume,
            unit_system: UnitSystem::Us,
            growth_stage,
            strength_percent: default_strength(),
            supplements: None,
            strain: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_finite("volume", self.volume)?;
        validate_finite("strength", self.strength_percent)?;
        validate_range("volume", self.volume, MIN_VOLUME, MAX_VOLUME)?;
        validate_range("strength", self.strength_percent, MIN_STRENGTH, MAX_STRENGTH)?;
        if let Some(strain) = &self.strain {
            let malformed = [strain.ec_range, strain.ph_range]
                .into_iter()
                .flatten()
                .any(|r| !r.is_well_formed());
            if malformed {
                return Err(HydroError::validation(format!(
                    "Strain '{}' has a malformed EC/pH range",
                    strain.name
                )));
            }
        }
        Ok(())
    }
}

pub struct Calculator<'a> {
    catalog: &'a Catalog,
    conversions: Conversions,
}

impl<'a> Calculator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            conversions: Conversions::default(),
        }
    }

    pub fn with_conversions(mut self, conversions: Conversions) -> Self {
        self.conversions = conversions;
        self
    }

    pub fn calculate(&self, request: &CalculationRequest) -> Result<Recipe> {
        request.validate()?;
        let line = self.catalog.line(&request.nutrient_line)?;

        let gallons = self.conversions.to_gallons(request.volume, request.unit_system);
        let feeding = request
            .strain
            .as_ref()
            .map(|s| s.feeding_type)
            .unwrap_or(FeedingType::Medium);
        let final_strength = (request.strength_percent / 100.0)
            * request.growth_stage.multiplier()
            * feeding.multiplier();

        tracing::debug!(
            "Dosing {} gal of {} at {:.3} of full strength ({} / {} feeder)",
            gallons,
            line.name,
            final_strength,
            request.growth_stage,
            feeding
        );

        let mut entries: Vec<RecipeEntry> = line
            .base_nutrients
            .iter()
            .map(|p| self.dose(p, final_strength, gallons))
            .collect();

        match &request.supplements {
            Some(names) => {
                for name in names {
                    let product = line.supplement(name).ok_or_else(|| HydroError::CalculationError {
                        message: format!("'{}' is not a supplement of {}", name, line.name),
                    })?;
                    entries.push(self.dose(product, final_strength, gallons));
                }
            }
            None => entries.extend(
                line.supplements
                    .iter()
                    .filter(|p| AUTO_SUPPLEMENT_KINDS.contains(&p.kind))
                    .map(|p| self.dose(p, final_strength, gallons)),
            ),
        }

        let target_ec = request
            .strain
            .as_ref()
            .and_then(|s| s.ec_range)
            .unwrap_or_else(|| ec_range(&entries));
        let target_ph = request
            .strain
            .as_ref()
            .and_then(|s| s.ph_range)
            .unwrap_or(DEFAULT_PH);

        Ok(Recipe {
            nutrient_line: line.name.clone(),
            volume: request.volume,
            unit_system: request.unit_system,
            gallons: round_to(gallons, 2),
            strength_percent: request.strength_percent,
            growth_stage: request.growth_stage,
            strain: request.strain.as_ref().map(|s| s.name.clone()),
            feeding_type: feeding,
            target_ec,
            target_ph,
            entries,
        })
    }

    fn dose(&self, product: &NutrientProduct, final_strength: f64, gallons: f64) -> RecipeEntry {
        let per_gallon = product.max_strength * final_strength;
        RecipeEntry {
            product: product.name.clone(),
            amount: round_to(per_gallon * gallons, 1),
            unit: product.unit,
            kind: product.kind,
            per_gallon: round_to(per_gallon, 2),
            per_liter: round_to(self.conversions.per_liter(per_gallon), 2),
            notes: product.description.clone(),
            npk: product.npk.clone(),
            when_to_use: product.when_to_use.clone(),
        }
    }
}
