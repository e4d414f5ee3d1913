//! Mixing order, per-kind warnings and the step-by-step mixing protocol for a recipe.

use serde::Serialize;
use std::fmt::Write as _;

use crate::domain::model::{
    Measurement, MixingStep, NutrientKind, Range, Recipe, RecipeEntry, StepAmount,
};

pub const DEFAULT_PH: Range = Range::new(5.8, 6.2);
pub const TEMPERATURE_TARGET: &str = "65-75°F (18-24°C)";

/// Position of a nutrient kind in the mixing sequence; lower goes in first.
pub fn mixing_order(kind: NutrientKind) -> u32 {
    match kind {
        NutrientKind::Silica => 1,
        NutrientKind::Calmag => 2,
        NutrientKind::Micro => 3,
        NutrientKind::Grow => 4,
        NutrientKind::Bloom => 5,
        NutrientKind::PkBoost => 6,
        NutrientKind::Supplement => 7,
        _ => 999,
    }
}

pub fn warning_for(kind: NutrientKind) -> &'static str {
    match kind {
        NutrientKind::Calmag => "Monitor pH, can increase significantly",
        NutrientKind::Base => "Check for precipitation, ensure proper mixing",
        NutrientKind::Micro => "Add first of base nutrients",
        NutrientKind::Grow => "Add second, after micro",
        NutrientKind::Bloom => "Add last of base nutrients",
        NutrientKind::Supplement => "Add slowly, watch for reactions",
        NutrientKind::Silica => "Must be added first, raises pH significantly",
        NutrientKind::Enzyme => "Temperature sensitive, verify water temp",
        NutrientKind::PkBoost => "Monitor EC closely, can build up salts",
        _ => "Monitor solution for any reactions",
    }
}

/// Best-effort kind for a product known only by name.
pub fn kind_from_name(name: &str) -> NutrientKind {
    let name = name.to_lowercase();
    if name.contains("cal") && name.contains("mag") {
        NutrientKind::Calmag
    } else if name.contains("micro") {
        NutrientKind::Micro
    } else if name.contains("grow") {
        NutrientKind::Grow
    } else if name.contains("bloom") {
        NutrientKind::Bloom
    } else if name.contains("silica") {
        NutrientKind::Silica
    } else if ["pk", "p/k", "phosphorus"].iter().any(|x| name.contains(x)) {
        NutrientKind::PkBoost
    } else {
        NutrientKind::Supplement
    }
}

/// Target EC band derived from how many of micro/grow/bloom the recipe uses.
pub fn ec_range(entries: &[RecipeEntry]) -> Range {
    let base_count = entries.iter().filter(|e| e.kind.is_base_trio()).count();
    match base_count {
        0..=2 => Range::new(1.0, 1.4),
        3 => Range::new(1.2, 1.8),
        _ => Range::new(1.4, 2.0),
    }
}

/// Entries sorted by mixing order; ties keep recipe order.
pub fn sorted_by_mixing_order(entries: &[RecipeEntry]) -> Vec<&RecipeEntry> {
    let mut sorted: Vec<&RecipeEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| mixing_order(e.kind));
    sorted
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn amounts<'a>(entries: impl Iterator<Item = &'a RecipeEntry>) -> Vec<StepAmount> {
    entries
        .map(|e| StepAmount {
            product: e.product.clone(),
            amount: e.amount_label(),
        })
        .collect()
}

fn step(title: &str, description: impl Into<String>, tips: &[&str]) -> MixingStep {
    MixingStep {
        step: 0,
        title: title.to_string(),
        description: description.into(),
        tips: strings(tips),
        equipment: Vec::new(),
        amounts: Vec::new(),
        measurements: Vec::new(),
        wait_time: None,
        ph_impact: None,
    }
}

pub fn generate_mixing_instructions(recipe: &Recipe) -> Vec<MixingStep> {
    let mut steps = Vec::new();
    let entries = &recipe.entries;

    let mut prep = step(
        "Preparation",
        "Prepare your mixing environment and equipment",
        &[
            "Clean all mixing equipment thoroughly",
            "Calibrate pH and EC meters",
            "Prepare measuring syringes/cups",
            "Have paper towels ready for spills",
            "Wear protective gloves if needed",
        ],
    );
    prep.equipment = strings(&[
        "Clean mixing container",
        "Measuring syringes/cups",
        "Stirring tool",
        "pH meter",
        "EC/PPM meter",
        "Thermometer",
    ]);
    steps.push(prep);

    let mut water = step(
        "Water Preparation",
        format!(
            "Fill container with {} of water at room temperature",
            recipe.volume_label()
        ),
        &[
            "Use RO or filtered water if possible",
            "Check water temperature (65-75°F ideal)",
            "Measure initial EC/PPM of water",
            "Record initial pH reading",
            "Let chlorinated water sit for 24h or use dechlorinator",
        ],
    );
    water.measurements = vec![
        Measurement::new("Target Temperature", "68-72°F"),
        Measurement::new("Starting EC", "<0.1 for RO, <0.5 for tap"),
        Measurement::new("Starting pH", "Record initial reading"),
    ];
    steps.push(water);

    let mut initial_ph = step(
        "Initial pH Adjustment",
        "Adjust water pH if needed before adding nutrients",
        &[
            "Target pH: 5.5-6.0 for initial mix",
            "Add pH adjusters slowly (1ml at a time)",
            "Mix thoroughly between additions",
            "Wait 30 seconds before retesting",
            "Consider water source (RO vs Tap)",
        ],
    );
    initial_ph.measurements = vec![
        Measurement::new("Target pH", "5.5-6.0"),
        Measurement::new("Wait Time", "30 seconds between adjustments"),
    ];
    steps.push(initial_ph);

    if entries.iter().any(|e| e.kind == NutrientKind::Silica) {
        let mut silica = step(
            "Add Silica",
            "Add silica supplement first and mix thoroughly",
            &[
                "Add silica FIRST before other nutrients",
                "Mix thoroughly for 2 minutes",
                "Wait 15 minutes before next addition",
                "Check pH after mixing (silica raises pH)",
                "Do not mix directly with concentrated nutrients",
            ],
        );
        silica.amounts = amounts(entries.iter().filter(|e| e.kind == NutrientKind::Silica));
        silica.wait_time = Some("15 minutes".to_string());
        silica.ph_impact = Some("Increases pH significantly".to_string());
        steps.push(silica);
    }

    if entries.iter().any(|e| e.kind == NutrientKind::Calmag) {
        let mut calmag = step(
            "Add CalMag",
            "Add calcium/magnesium supplements",
            &[
                "Add CalMag before base nutrients",
                "Mix thoroughly for 1 minute",
                "Wait 5 minutes before next addition",
                "Check for any precipitation",
                "Monitor solution clarity",
            ],
        );
        calmag.amounts = amounts(entries.iter().filter(|e| e.kind == NutrientKind::Calmag));
        calmag.wait_time = Some("5 minutes".to_string());
        calmag.ph_impact = Some("May slightly affect pH".to_string());
        steps.push(calmag);
    }

    if entries.iter().any(|e| e.kind.is_base_trio()) {
        let mut base = step(
            "Add Base Nutrients",
            "Add base nutrients in specific order",
            &[
                "Always add in order: Micro → Grow → Bloom",
                "Mix thoroughly between each addition",
                "Wait 60 seconds between each nutrient",
                "Check EC after each addition",
                "Watch for any reactions or precipitation",
            ],
        );
        let mut trio: Vec<&RecipeEntry> = entries.iter().filter(|e| e.kind.is_base_trio()).collect();
        trio.sort_by_key(|e| mixing_order(e.kind));
        base.amounts = amounts(trio.into_iter());
        base.measurements = vec![Measurement::new("Target EC", recipe.target_ec.to_string())];
        base.wait_time = Some("60 seconds between each, mix 30 seconds".to_string());
        steps.push(base);
    }

    let mut rest: Vec<&RecipeEntry> = entries
        .iter()
        .filter(|e| {
            !e.kind.is_base_trio() && e.kind != NutrientKind::Silica && e.kind != NutrientKind::Calmag
        })
        .collect();
    if !rest.is_empty() {
        rest.sort_by_key(|e| mixing_order(e.kind));
        let mut supplements = step(
            "Add Supplements",
            "Add remaining supplements in optimal order",
            &[
                "Add one supplement at a time",
                "Mix thoroughly between additions",
                "Monitor EC changes closely",
                "Watch for any reactions",
                "Check pH after each addition",
            ],
        );
        supplements.amounts = amounts(rest.into_iter());
        supplements.measurements = vec![Measurement::new(
            "Recommended Order",
            "Root enhancers, Humic/Fulvic acids, PK boosters, Enzymes, Beneficial bacteria",
        )];
        supplements.wait_time = Some("60 seconds between each".to_string());
        steps.push(supplements);
    }

    let mut finish = step(
        "Final Adjustments",
        "Make final pH and EC adjustments",
        &[
            "Adjust pH to target range",
            "Verify final EC/PPM",
            "Let solution sit for 15 minutes",
            "Take final readings",
            "Document all measurements",
        ],
    );
    finish.measurements = vec![
        Measurement::new("Final pH", recipe.target_ph.to_string()),
        Measurement::new("Final EC", recipe.target_ec.to_string()),
        Measurement::new("Solution Temp", "65-75°F"),
    ];
    steps.push(finish);

    for (i, s) in steps.iter_mut().enumerate() {
        s.step = i + 1;
    }
    steps
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Critical,
    Moderate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolStep {
    pub action: String,
    pub detail: String,
    pub warning: String,
}

impl ProtocolStep {
    fn new(action: impl Into<String>, detail: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            detail: detail.into(),
            warning: warning.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phase {
    pub title: String,
    pub icon: String,
    pub importance: Importance,
    pub steps: Vec<ProtocolStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetParameters {
    pub ec_range: Range,
    pub ph_range: Range,
    pub temperature: String,
}

/// A printable mixing protocol: fixed phases around a recipe-specific sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Protocol {
    pub nutrient_line: String,
    pub preparation: Phase,
    pub sequence: Phase,
    pub supplements: Phase,
    pub verification: Phase,
    pub targets: TargetParameters,
}

fn preparation_phase() -> Phase {
    Phase {
        title: "Preparation Phase".to_string(),
        icon: "🔍".to_string(),
        importance: Importance::Critical,
        steps: vec![
            ProtocolStep::new(
                "Clean all mixing equipment thoroughly",
                "Use food-grade sanitizer, rinse 3x with RO water",
                "Contamination can lead to root problems",
            ),
            ProtocolStep::new(
                "Calibrate pH and EC/PPM meters",
                "Use fresh calibration solutions, verify accuracy",
                "Inaccurate readings can lead to nutrient lockout",
            ),
            ProtocolStep::new(
                "Verify water temperature",
                "Target: 65-75°F (18-24°C)",
                "Temperature affects nutrient availability",
            ),
            ProtocolStep::new(
                "Record starting parameters",
                "Log: pH, EC/PPM, temperature, date/time",
                "Documentation required for compliance",
            ),
        ],
    }
}

fn supplement_phase() -> Phase {
    Phase {
        title: "Supplement Addition".to_string(),
        icon: "🧬".to_string(),
        importance: Importance::Moderate,
        steps: vec![
            ProtocolStep::new(
                "Add pH buffers if needed",
                "Target pH range: 5.5-6.3",
                "Add slowly, allow stabilization",
            ),
            ProtocolStep::new(
                "Add organic supplements",
                "Follow manufacturer's order of addition",
                "Some may affect pH/EC significantly",
            ),
            ProtocolStep::new(
                "Add beneficial microbes",
                "Water temp must be below 75°F",
                "Chlorine must be removed first",
            ),
        ],
    }
}

fn verification_phase() -> Phase {
    Phase {
        title: "Final Verification".to_string(),
        icon: "✅".to_string(),
        importance: Importance::Critical,
        steps: vec![
            ProtocolStep::new(
                "Top off to final volume",
                "Use RO/filtered water only",
                "Record final volume added",
            ),
            ProtocolStep::new(
                "Verify EC/PPM levels",
                "Compare to target range for growth stage",
                "Document any adjustments made",
            ),
            ProtocolStep::new(
                "Final pH adjustment",
                "Adjust slowly, verify stability",
                "Allow 15-30 minutes between adjustments",
            ),
            ProtocolStep::new(
                "Final documentation",
                "Record all parameters and calculations",
                "Required for compliance tracking",
            ),
        ],
    }
}

pub fn protocol(recipe: &Recipe) -> Protocol {
    let sequence = sorted_by_mixing_order(&recipe.entries)
        .into_iter()
        .map(|e| {
            ProtocolStep::new(
                format!("Add {}", e.product),
                format!("Amount: {} - {}", e.amount_label(), e.notes),
                warning_for(e.kind),
            )
        })
        .collect();

    Protocol {
        nutrient_line: recipe.nutrient_line.clone(),
        preparation: preparation_phase(),
        sequence: Phase {
            title: "Mixing Sequence".to_string(),
            icon: "⚗️".to_string(),
            importance: Importance::Critical,
            steps: sequence,
        },
        supplements: supplement_phase(),
        verification: verification_phase(),
        targets: TargetParameters {
            ec_range: recipe.target_ec,
            ph_range: recipe.target_ph,
            temperature: TEMPERATURE_TARGET.to_string(),
        },
    }
}

impl Protocol {
    pub fn phases(&self) -> [&Phase; 4] {
        [
            &self.preparation,
            &self.sequence,
            &self.supplements,
            &self.verification,
        ]
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "📋 Professional Mixing Protocol ({})", self.nutrient_line);
        for phase in self.phases() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{} {}", phase.icon, phase.title);
            for step in &phase.steps {
                let _ = writeln!(out, "  • {}", step.action);
                let _ = writeln!(out, "      {}", step.detail);
                let _ = writeln!(out, "      ⚠️ {}", step.warning);
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "🎯 Target Parameters");
        let _ = writeln!(out, "  EC Range:    {}", self.targets.ec_range);
        let _ = writeln!(out, "  pH Range:    {}", self.targets.ph_range);
        let _ = writeln!(out, "  Temperature: {}", self.targets.temperature);
        out
    }
}

pub fn render_steps(steps: &[MixingStep]) -> String {
    let mut out = String::new();
    for s in steps {
        let _ = writeln!(out, "Step {}: {}", s.step, s.title);
        let _ = writeln!(out, "  {}", s.description);
        for a in &s.amounts {
            let _ = writeln!(out, "  - {}: {}", a.product, a.amount);
        }
        for m in &s.measurements {
            let _ = writeln!(out, "  {}: {}", m.label, m.value);
        }
        if let Some(wait) = &s.wait_time {
            let _ = writeln!(out, "  Wait: {}", wait);
        }
        for tip in &s.tips {
            let _ = writeln!(out, "  • {}", tip);
        }
    }
    out
}
