use serde::{Deserialize, Serialize};

use crate::domain::model::UnitSystem;

pub const GAL_TO_L: f64 = 3.78541;
pub const L_TO_GAL: f64 = 0.264172;

/// Volume conversion factors, overridable from the `[conversions]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conversions {
    #[serde(default = "default_gal_to_l")]
    pub gal_to_l: f64,
    #[serde(default = "default_l_to_gal")]
    pub l_to_gal: f64,
}

fn default_gal_to_l() -> f64 {
    GAL_TO_L
}

fn default_l_to_gal() -> f64 {
    L_TO_GAL
}

impl Default for Conversions {
    fn default() -> Self {
        Self {
            gal_to_l: GAL_TO_L,
            l_to_gal: L_TO_GAL,
        }
    }
}

impl Conversions {
    pub fn to_gallons(&self, volume: f64, unit_system: UnitSystem) -> f64 {
        match unit_system {
            UnitSystem::Us => volume,
            UnitSystem::Metric => volume * self.l_to_gal,
        }
    }

    pub fn to_liters(&self, volume: f64, unit_system: UnitSystem) -> f64 {
        match unit_system {
            UnitSystem::Us => volume * self.gal_to_l,
            UnitSystem::Metric => volume,
        }
    }

    /// Converts a per-gallon dose into a per-liter dose.
    pub fn per_liter(&self, per_gallon: f64) -> f64 {
        per_gallon * self.l_to_gal
    }
}

pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
