use serde::Serialize;

use crate::domain::model::{Compliance, Range, Reading, ReadingStatus, Recipe, Severity};

pub const EC_TOLERANCE: f64 = 0.2;
pub const PH_TOLERANCE: f64 = 0.3;
pub const TEMPERATURE_RANGE_F: Range = Range::new(65.0, 75.0);
pub const TEMPERATURE_TOLERANCE_F: f64 = 3.0;

// Float slack so a reading exactly at the tolerance edge is not critical.
const EPSILON: f64 = 1e-9;

/// Status of a single measured value against its target range.
pub fn assess(value: f64, range: Range, tolerance: f64) -> ReadingStatus {
    if !value.is_finite() {
        return ReadingStatus::Critical;
    }
    let deviation = range.deviation(value);
    if deviation == 0.0 {
        ReadingStatus::Optimal
    } else if deviation <= tolerance + EPSILON {
        ReadingStatus::Warning
    } else {
        ReadingStatus::Critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Issue {
    HighEc,
    LowEc,
    PhFluctuation,
    Precipitation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advice {
    pub issue: &'static str,
    pub solution: &'static str,
    pub severity: Severity,
}

pub fn troubleshoot(issue: Issue) -> Advice {
    match issue {
        Issue::HighEc => Advice {
            issue: "High EC",
            solution: "Dilute with fresh water, recheck after circulation",
            severity: Severity::Warning,
        },
        Issue::LowEc => Advice {
            issue: "Low EC",
            solution: "Add nutrients proportionally to reach target",
            severity: Severity::Warning,
        },
        Issue::PhFluctuation => Advice {
            issue: "pH Fluctuation",
            solution: "Allow solution to stabilize before final adjustment",
            severity: Severity::Caution,
        },
        Issue::Precipitation => Advice {
            issue: "Precipitation",
            solution: "Mix more slowly, ensure proper order of addition",
            severity: Severity::Danger,
        },
    }
}

/// The full troubleshooting guide in display order.
pub fn troubleshooting_guide() -> Vec<Advice> {
    [
        Issue::HighEc,
        Issue::LowEc,
        Issue::PhFluctuation,
        Issue::Precipitation,
    ]
    .into_iter()
    .map(troubleshoot)
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Assessment {
    pub value: f64,
    pub target: Range,
    pub status: ReadingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    pub ec: Option<Assessment>,
    pub ph: Option<Assessment>,
    pub temperature_f: Option<Assessment>,
    pub compliance: Compliance,
    pub advice: Vec<Advice>,
}

impl ComplianceReport {
    pub fn statuses(&self) -> impl Iterator<Item = ReadingStatus> + '_ {
        [self.ec, self.ph, self.temperature_f]
            .into_iter()
            .flatten()
            .map(|a| a.status)
    }
}

/// Compares measured reservoir values with the recipe's targets.
pub fn check(recipe: &Recipe, reading: &Reading) -> ComplianceReport {
    let ec = reading.ec.map(|v| Assessment {
        value: v,
        target: recipe.target_ec,
        status: assess(v, recipe.target_ec, EC_TOLERANCE),
    });
    let ph = reading.ph.map(|v| Assessment {
        value: v,
        target: recipe.target_ph,
        status: assess(v, recipe.target_ph, PH_TOLERANCE),
    });
    let temperature_f = reading.temperature_f.map(|v| Assessment {
        value: v,
        target: TEMPERATURE_RANGE_F,
        status: assess(v, TEMPERATURE_RANGE_F, TEMPERATURE_TOLERANCE_F),
    });

    let mut advice = Vec::new();
    if let Some(a) = ec {
        if a.value > a.target.max {
            advice.push(troubleshoot(Issue::HighEc));
        } else if a.value < a.target.min {
            advice.push(troubleshoot(Issue::LowEc));
        }
    }
    if let Some(a) = ph {
        if a.status != ReadingStatus::Optimal {
            advice.push(troubleshoot(Issue::PhFluctuation));
        }
    }

    let mut report = ComplianceReport {
        ec,
        ph,
        temperature_f,
        compliance: Compliance::Pass,
        advice,
    };
    report.compliance = if report.statuses().any(|s| s == ReadingStatus::Critical) {
        Compliance::Fail
    } else if report.statuses().any(|s| s == ReadingStatus::Warning) {
        Compliance::Warning
    } else {
        Compliance::Pass
    };
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculator::{CalculationRequest, Calculator};
    use crate::core::catalog::Catalog;
    use crate::domain::model::GrowthStage;

    fn gh_recipe() -> Recipe {
        let catalog = Catalog::builtin();
        Calculator::new(&catalog)
            .calculate(&CalculationRequest::new(
                "General Hydroponics",
                10.0,
                GrowthStage::MidFlower,
            ))
            .unwrap()
    }

    #[test]
    fn test_assess_tiers() {
        let range = Range::new(1.2, 1.8);
        assert_eq!(assess(1.5, range, EC_TOLERANCE), ReadingStatus::Optimal);
        assert_eq!(assess(1.9, range, EC_TOLERANCE), ReadingStatus::Warning);
        assert_eq!(assess(2.0, range, EC_TOLERANCE), ReadingStatus::Warning);
        assert_eq!(assess(2.3, range, EC_TOLERANCE), ReadingStatus::Critical);
        assert_eq!(assess(0.9, range, EC_TOLERANCE), ReadingStatus::Critical);
    }

    #[test]
    fn test_reading_in_range_passes() {
        let report = check(
            &gh_recipe(),
            &Reading {
                ec: Some(1.5),
                ph: Some(6.0),
                temperature_f: Some(70.0),
            },
        );
        assert_eq!(report.compliance, Compliance::Pass);
        assert!(report.advice.is_empty());
    }

    #[test]
    fn test_high_ec_warns_with_advice() {
        let report = check(
            &gh_recipe(),
            &Reading {
                ec: Some(1.9),
                ph: Some(6.0),
                temperature_f: None,
            },
        );
        assert_eq!(report.compliance, Compliance::Warning);
        assert_eq!(report.advice[0].issue, "High EC");
        assert!(report.temperature_f.is_none());
    }

    #[test]
    fn test_critical_ph_fails() {
        let report = check(
            &gh_recipe(),
            &Reading {
                ec: Some(1.3),
                ph: Some(7.0),
                temperature_f: Some(72.0),
            },
        );
        assert_eq!(report.ph.unwrap().status, ReadingStatus::Critical);
        assert_eq!(report.compliance, Compliance::Fail);
        assert_eq!(report.advice[0].severity, Severity::Caution);
    }

    #[test]
    fn test_nan_reading_fails() {
        let report = check(
            &gh_recipe(),
            &Reading {
                ec: Some(f64::NAN),
                ph: Some(f64::NAN),
                temperature_f: Some(f64::NAN),
            },
        );
        assert!(report.statuses().all(|s| s == ReadingStatus::Critical));
        assert_eq!(report.compliance, Compliance::Fail);
        assert_eq!(report.advice.len(), 1);
        assert_eq!(report.advice[0].issue, "pH Fluctuation");
        assert_eq!(assess(f64::INFINITY, Range::new(1.2, 1.8), EC_TOLERANCE), ReadingStatus::Critical);
    }

    #[test]
    fn test_temperature_tiers() {
        let reading = |temperature_f| Reading {
            ec: Some(1.5),
            ph: Some(6.0),
            temperature_f: Some(temperature_f),
        };

        let warm = check(&gh_recipe(), &reading(77.0));
        assert_eq!(warm.temperature_f.unwrap().status, ReadingStatus::Warning);
        assert_eq!(warm.compliance, Compliance::Warning);
        assert!(warm.advice.is_empty());

        let edge = check(&gh_recipe(), &reading(62.0));
        assert_eq!(edge.temperature_f.unwrap().status, ReadingStatus::Warning);

        let hot = check(&gh_recipe(), &reading(80.0));
        assert_eq!(hot.temperature_f.unwrap().status, ReadingStatus::Critical);
        assert_eq!(hot.temperature_f.unwrap().target, TEMPERATURE_RANGE_F);
        assert_eq!(hot.compliance, Compliance::Fail);
    }

    #[test]
    fn test_empty_reading_passes() {
        let report = check(&gh_recipe(), &Reading::default());
        assert_eq!(report.compliance, Compliance::Pass);
    }

    #[test]
    fn test_guide_has_four_rows() {
        let guide = troubleshooting_guide();
        assert_eq!(guide.len(), 4);
        assert_eq!(guide[3].severity, Severity::Danger);
        assert_eq!(guide[3], troubleshoot(Issue::Precipitation));
        assert_eq!(
            troubleshoot(Issue::Precipitation).solution,
            "Mix more slowly, ensure proper order of addition"
        );
    }
}
