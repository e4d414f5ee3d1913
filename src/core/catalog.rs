use crate::domain::model::{DoseUnit, NutrientKind, NutrientLine, NutrientProduct};
use crate::utils::error::{HydroError, Result};

/// The nutrient product lines the calculator knows how to dose.
#[derive(Debug, Clone)]
pub struct Catalog {
    lines: Vec<NutrientLine>,
}

impl Catalog {
    pub fn new(lines: Vec<NutrientLine>) -> Self {
        Self { lines }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            generic(),
            general_hydroponics(),
            advanced_nutrients(),
            athena(),
            house_and_garden(),
            canna(),
        ])
    }

    pub fn lines(&self) -> &[NutrientLine] {
        &self.lines
    }

    pub fn line_names(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn line(&self, name: &str) -> Result<&NutrientLine> {
        self.lines
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| HydroError::not_found("nutrient line", name))
    }

    pub fn product(&self, line: &str, product: &str) -> Result<&NutrientProduct> {
        self.line(line)?
            .product(product)
            .ok_or_else(|| HydroError::not_found("nutrient product", product))
    }

    /// Adds a line, replacing any existing line with the same name.
    pub fn insert(&mut self, line: NutrientLine) {
        match self
            .lines
            .iter_mut()
            .find(|l| l.name.eq_ignore_ascii_case(&line.name))
        {
            Some(existing) => *existing = line,
            None => self.lines.push(line),
        }
    }

    /// Loads extra lines from a JSON array and merges them over the current set.
    /// Nothing is merged unless every line is valid.
    pub fn merge_json(&mut self, json: &str) -> Result<usize> {
        let lines: Vec<NutrientLine> = serde_json::from_str(json)?;
        for line in &lines {
            validate_line(line)?;
        }
        let count = lines.len();
        for line in lines {
            self.insert(line);
        }
        Ok(count)
    }
}

fn validate_line(line: &NutrientLine) -> Result<()> {
    if line.base_nutrients.is_empty() {
        return Err(HydroError::validation(format!(
            "Nutrient line '{}' has no base nutrients",
            line.name
        )));
    }
    if let Some(bad) = line
        .base_nutrients
        .iter()
        .chain(&line.supplements)
        .find(|p| !p.max_strength.is_finite() || p.max_strength <= 0.0)
    {
        return Err(HydroError::validation(format!(
            "Product '{}' in line '{}' needs a positive max_strength (got {})",
            bad.name, line.name, bad.max_strength
        )));
    }
    Ok(())
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn product(name: &str, kind: NutrientKind, max_strength: f64, description: &str) -> NutrientProduct {
    NutrientProduct {
        name: name.to_string(),
        kind,
        max_strength,
        unit: DoseUnit::Ml,
        description: description.to_string(),
        npk: None,
        when_to_use: None,
        benefits: Vec::new(),
        cautions: Vec::new(),
    }
}

trait ProductExt {
    fn npk(self, npk: &str) -> Self;
    fn when(self, when: &str) -> Self;
    fn benefits(self, items: &[&str]) -> Self;
    fn cautions(self, items: &[&str]) -> Self;
    fn grams(self) -> Self;
}

impl ProductExt for NutrientProduct {
    fn npk(mut self, npk: &str) -> Self {
        self.npk = Some(npk.to_string());
        self
    }

    fn when(mut self, when: &str) -> Self {
        self.when_to_use = Some(when.to_string());
        self
    }

    fn benefits(mut self, items: &[&str]) -> Self {
        self.benefits = items.iter().map(|s| s.to_string()).collect();
        self
    }

    fn cautions(mut self, items: &[&str]) -> Self {
        self.cautions = items.iter().map(|s| s.to_string()).collect();
        self
    }

    fn grams(mut self) -> Self {
        self.unit = DoseUnit::Grams;
        self
    }
}

fn line(
    name: &str,
    description: &str,
    base_nutrients: Vec<NutrientProduct>,
    supplements: Vec<NutrientProduct>,
) -> NutrientLine {
    NutrientLine {
        name: name.to_string(),
        description: description.to_string(),
        base_nutrients,
        supplements,
    }
}

fn generic() -> NutrientLine {
    use NutrientKind::*;
    line(
        "Generic",
        "Standard nutrient components for any brand",
        vec![
            product("Micro", Micro, 3.0, "Micronutrient blend").npk("5-0-1"),
            product("Grow", Grow, 3.0, "Vegetative growth nutrient").npk("3-1-3"),
            product("Bloom", Bloom, 3.0, "Flowering nutrient").npk("0-5-4"),
        ],
        vec![
            product("CalMag", Calmag, 5.0, "Calcium-Magnesium supplement")
                .when("Throughout grow cycle"),
            product("Silica", Silica, 2.0, "Silica supplement for strength")
                .when("Add first, throughout cycle"),
            product("PK Booster", PkBoost, 2.0, "Phosphorus-Potassium boost")
                .when("Mid to late flower"),
        ],
    )
}

fn general_hydroponics() -> NutrientLine {
    use NutrientKind::*;
    line(
        "General Hydroponics",
        "Industry standard 3-part system with comprehensive supplements",
        vec![
            product("Flora Micro", Micro, 4.0, "Concentrated micronutrients and calcium")
                .npk("5-0-1"),
            product("Flora Grow", Grow, 4.0, "Promotes structural and vegetative growth")
                .npk("2-1-6")
                .when("Heavy in veg, reduced in flower")
                .benefits(&["Promotes leaf growth", "Enhances node spacing", "Builds structure"])
                .cautions(&["Add after Flora Micro", "Reduce during flowering"]),
            product("Flora Bloom", Bloom, 4.0, "Promotes flower development and fruiting")
                .npk("0-5-4")
                .when("During flowering phase")
                .benefits(&["Enhances flower development", "Improves yield", "Boosts essential oils"])
                .cautions(&["Add last of base nutrients", "Monitor EC levels"]),
        ],
        vec![
            product("CaliMagic", Calmag, 5.0, "GH's calcium and magnesium supplement")
                .npk("1-0-0")
                .when("Throughout grow cycle, essential with RO water")
                .benefits(&[
                    "Prevents calcium deficiency",
                    "Strengthens cell walls",
                    "Improves nutrient uptake",
                    "Prevents magnesium deficiency",
                ])
                .cautions(&["Check water hardness first", "Can raise pH"]),
            product("Rapid Start", Root, 2.0, "GH's root development enhancer")
                .when("Early growth and transplanting")
                .benefits(&[
                    "Accelerates root development",
                    "Improves nutrient uptake",
                    "Reduces transplant shock",
                    "Enhances stress tolerance",
                ])
                .cautions(&["Reduce after established roots", "Monitor pH"]),
            product("Diamond Nectar", Humic, 2.0, "GH's premium humic acid supplement")
                .when("Throughout grow cycle")
                .benefits(&[
                    "Improves nutrient uptake",
                    "Enhances root development",
                    "Increases chelation",
                    "Improves soil structure",
                ])
                .cautions(&["Can darken solution", "Monitor pH"]),
            product("Armor Si", Silica, 2.0, "GH's silica supplement")
                .when("Throughout grow cycle")
                .benefits(&[
                    "Strengthens cell walls",
                    "Improves heat tolerance",
                    "Enhances pest resistance",
                    "Supports heavy flowers",
                ])
                .cautions(&[
                    "Must be added FIRST to nutrient solution",
                    "Raises pH significantly",
                    "Don't mix directly with concentrated nutrients",
                ]),
            product("Liquid KoolBloom", PkBoost, 2.5, "GH's liquid P-K booster")
                .npk("0-10-10")
                .when("Early to mid flowering")
                .benefits(&[
                    "Enhances flower formation",
                    "Improves flower size",
                    "Boosts essential oil production",
                ])
                .cautions(&["Monitor EC", "Can build up salts"]),
            product("Dry KoolBloom", Ripening, 1.5, "GH's flowering finisher powder")
                .grams()
                .npk("0-27-27")
                .when("Last 2-3 weeks of flower")
                .benefits(&[
                    "Triggers ripening",
                    "Increases resin production",
                    "Enhances flower density",
                    "Improves essential oil content",
                ])
                .cautions(&[
                    "Use only in late flower",
                    "Monitor EC carefully",
                    "Can cause lockout if overused",
                    "Dissolve completely before adding other nutrients",
                ]),
            product("Floralicious Plus", Enzyme, 1.0, "GH's organic bioactivator")
                .when("Throughout grow cycle")
                .benefits(&[
                    "Enhances nutrient uptake",
                    "Improves flavor profiles",
                    "Boosts terpene production",
                    "Supports beneficial microbes",
                ])
                .cautions(&[
                    "Shake well before use",
                    "Can cloud reservoir",
                    "Add last to nutrient solution",
                ]),
            product("Florablend", Biostimulant, 2.0, "GH's organic vegan supplement")
                .when("Throughout grow cycle")
                .benefits(&[
                    "Enhances nutrient uptake",
                    "Improves plant vigor",
                    "Supports beneficial microbes",
                    "Adds trace elements",
                ])
                .cautions(&[
                    "Shake well before use",
                    "Can settle in reservoir",
                    "Add after base nutrients",
                ]),
        ],
    )
}

fn advanced_nutrients() -> NutrientLine {
    use NutrientKind::*;
    line(
        "Advanced Nutrients",
        "pH Perfect technology with premium supplements",
        vec![
            product("pH Perfect Micro", Micro, 4.0, "Self-adjusting pH micronutrient formula")
                .npk("5-0-1"),
            product("pH Perfect Grow", Grow, 4.0, "Vegetative growth formula").npk("4-0-1"),
            product("pH Perfect Bloom", Bloom, 4.0, "Flowering phase formula").npk("0-5-4"),
        ],
        Vec::new(),
    )
}

fn athena() -> NutrientLine {
    use NutrientKind::*;
    line(
        "Athena",
        "Professional grade blended nutrient system",
        vec![
            product("Core", Base, 3.0, "Complete nutrient solution").npk("4-0-1"),
            product("Bloom", Bloom, 3.0, "Flower enhancer").npk("0-5-4"),
        ],
        Vec::new(),
    )
}

fn house_and_garden() -> NutrientLine {
    use NutrientKind::*;
    line(
        "House & Garden",
        "Premium Dutch nutrients with specialized additives",
        vec![
            product("Aqua Flakes A", BaseA, 3.0, "Part A base nutrient").npk("5-0-3"),
            product("Aqua Flakes B", BaseB, 3.0, "Part B base nutrient").npk("1-4-5"),
        ],
        Vec::new(),
    )
}

fn canna() -> NutrientLine {
    use NutrientKind::*;
    line(
        "Canna",
        "Research-based nutrients optimized for various media",
        vec![
            product("Canna A", BaseA, 3.0, "Part A complete nutrient").npk("5-0-1"),
            product("Canna B", BaseB, 3.0, "Part B complete nutrient").npk("0-4-2"),
        ],
        Vec::new(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lines() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.line_names(),
            vec![
                "Generic",
                "General Hydroponics",
                "Advanced Nutrients",
                "Athena",
                "House & Garden",
                "Canna"
            ]
        );
    }

    #[test]
    fn test_line_lookup_is_case_insensitive() {
        let catalog = Catalog::builtin();
        let gh = catalog.line("general hydroponics").unwrap();
        assert_eq!(gh.base_nutrients.len(), 3);
        assert_eq!(gh.supplements.len(), 8);
        assert!(catalog.line("Fox Farm").is_err());
    }

    #[test]
    fn test_dry_koolbloom_is_dosed_in_grams() {
        let catalog = Catalog::builtin();
        let dry = catalog.product("General Hydroponics", "Dry KoolBloom").unwrap();
        assert_eq!(dry.unit, DoseUnit::Grams);
        assert_eq!(dry.kind, NutrientKind::Ripening);
    }

    #[test]
    fn test_merge_json_replaces_existing_line() {
        let mut catalog = Catalog::builtin();
        let json = r#"[{
            "name": "Canna",
            "description": "Coco variant",
            "base_nutrients": [
                {"name": "Coco A", "kind": "base_a", "max_strength": 2.5},
                {"name": "Coco B", "kind": "base_b", "max_strength": 2.5}
            ]
        }]"#;
        assert_eq!(catalog.merge_json(json).unwrap(), 1);
        assert_eq!(catalog.lines().len(), 6);
        assert!(catalog.product("Canna", "Coco A").is_ok());
    }

    #[test]
    fn test_merge_json_rejects_line_without_bases() {
        let mut catalog = Catalog::builtin();
        let json = r#"[{"name": "Empty", "description": "", "base_nutrients": []}]"#;
        assert!(catalog.merge_json(json).is_err());
    }

    #[test]
    fn test_merge_json_is_all_or_nothing() {
        let mut catalog = Catalog::builtin();
        let json = r#"[
            {
                "name": "Good Line",
                "description": "",
                "base_nutrients": [{"name": "Good Base", "kind": "base", "max_strength": 2.0}]
            },
            {
                "name": "Bad Line",
                "description": "",
                "base_nutrients": [{"name": "Bad Base", "kind": "base", "max_strength": -1.0}]
            }
        ]"#;
        let err = catalog.merge_json(json).unwrap_err();
        assert!(err.to_string().contains("Bad Base"));
        assert_eq!(catalog.lines().len(), 6);
        assert!(catalog.line("Good Line").is_err());

        let zero = r#"[{
            "name": "Zero",
            "description": "",
            "base_nutrients": [{"name": "Base", "kind": "base", "max_strength": 2.0}],
            "supplements": [{"name": "Nothing", "kind": "supplement", "max_strength": 0.0}]
        }]"#;
        assert!(catalog.merge_json(zero).is_err());
    }
}
