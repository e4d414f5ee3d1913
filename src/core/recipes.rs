use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::instructions::generate_mixing_instructions;
use crate::domain::model::{GrowthStage, Reading, Recipe, RecipeResult, SavedRecipe};
use crate::domain::ports::Storage;
use crate::utils::error::{HydroError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RecipeFile {
    #[serde(default)]
    recipe_count: u64,
    #[serde(default)]
    recipes: Vec<SavedRecipe>,
}

/// Filter for [`RecipeBook::history`]. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeFilter {
    #[serde(default)]
    pub strain: Option<String>,
    #[serde(default)]
    pub growth_stage: Option<GrowthStage>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Importable {
    Saved(Box<SavedRecipe>),
    Bare(Recipe),
}

#[derive(Serialize)]
struct CsvRow<'a> {
    product: &'a str,
    amount: f64,
    unit: String,
    per_gallon: f64,
    per_liter: f64,
    kind: &'a str,
}

/// Saved recipes with their mixing instructions and logged results.
pub struct RecipeBook<S: Storage> {
    storage: S,
    file: String,
    state: RecipeFile,
    clock: Clock,
}

impl<S: Storage> RecipeBook<S> {
    pub async fn open(storage: S, file: impl Into<String>) -> Result<Self> {
        let file = file.into();
        let state = if storage.exists(&file).await {
            let bytes = storage.read_file(&file).await?;
            serde_json::from_slice(&bytes)?
        } else {
            RecipeFile::default()
        };
        tracing::debug!("Loaded {} saved recipes from {}", state.recipes.len(), file);

        Ok(Self {
            storage,
            file,
            state,
            clock: Arc::new(Local::now),
        })
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> String {
        (self.clock)().format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn len(&self) -> usize {
        self.state.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.recipes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SavedRecipe> {
        self.state.recipes.iter().find(|r| r.name == name)
    }

    pub fn require(&self, name: &str) -> Result<&SavedRecipe> {
        self.get(name)
            .ok_or_else(|| HydroError::not_found("recipe", name))
    }

    pub fn list(&self) -> Vec<&str> {
        self.state.recipes.iter().map(|r| r.name.as_str()).collect()
    }

    pub async fn save(&mut self, name: &str, recipe: Recipe) -> Result<SavedRecipe> {
        let strain = recipe.strain.clone();
        self.save_with_metadata(name, recipe, strain, Vec::new())
            .await
    }

    pub async fn save_with_metadata(
        &mut self,
        name: &str,
        recipe: Recipe,
        strain: Option<String>,
        tags: Vec<String>,
    ) -> Result<SavedRecipe> {
        let saved = self.build(name, recipe, strain, tags)?;
        self.insert(saved.clone()).await?;
        tracing::info!("✅ Recipe saved successfully: {}", name);
        Ok(saved)
    }

    fn build(
        &self,
        name: &str,
        recipe: Recipe,
        strain: Option<String>,
        tags: Vec<String>,
    ) -> Result<SavedRecipe> {
        validate_non_empty_string("recipe name", name)?;
        if recipe.is_empty() {
            return Err(HydroError::validation("Recipe has no nutrients"));
        }

        let now = self.now();
        Ok(SavedRecipe {
            recipe_id: self.state.recipe_count + 1,
            name: name.to_string(),
            mixing_instructions: generate_mixing_instructions(&recipe),
            recipe,
            created_at: now.clone(),
            last_modified: now,
            version: 1,
            strain,
            tags,
            results: Vec::new(),
            duplicated_from: None,
            imported_at: None,
            exported_at: None,
        })
    }

    async fn insert(&mut self, saved: SavedRecipe) -> Result<()> {
        let mut next = self.state.clone();
        match next.recipes.iter_mut().find(|r| r.name == saved.name) {
            Some(existing) => *existing = saved,
            None => next.recipes.push(saved),
        }
        next.recipe_count += 1;
        self.commit(next).await
    }

    pub async fn delete(&mut self, name: &str) -> Result<bool> {
        if self.get(name).is_none() {
            return Ok(false);
        }
        let mut next = self.state.clone();
        next.recipes.retain(|r| r.name != name);
        self.commit(next).await?;
        Ok(true)
    }

    pub fn all_strains(&self) -> Vec<String> {
        self.state
            .recipes
            .iter()
            .filter_map(|r| r.strain.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn all_tags(&self) -> Vec<String> {
        self.state
            .recipes
            .iter()
            .flat_map(|r| r.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Matching recipes, newest first.
    pub fn history(&self, filter: &RecipeFilter) -> Vec<&SavedRecipe> {
        let mut matches: Vec<&SavedRecipe> = self
            .state
            .recipes
            .iter()
            .filter(|r| {
                filter
                    .strain
                    .as_ref()
                    .is_none_or(|s| r.strain.as_ref() == Some(s))
            })
            .filter(|r| {
                filter
                    .growth_stage
                    .is_none_or(|g| r.recipe.growth_stage == g)
            })
            .filter(|r| filter.tags.iter().all(|t| r.tags.contains(t)))
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches
    }

    pub async fn add_result(
        &mut self,
        name: &str,
        reading: Reading,
        notes: Option<String>,
    ) -> Result<RecipeResult> {
        reading.validate()?;
        let now = self.now();
        let mut next = self.state.clone();
        let saved = next
            .recipes
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| HydroError::not_found("recipe", name))?;

        let result = RecipeResult {
            date: now.clone(),
            reading,
            notes,
        };
        saved.results.push(result.clone());
        saved.last_modified = now;
        self.commit(next).await?;
        tracing::info!("📝 Result added to recipe: {}", name);
        Ok(result)
    }

    pub fn export(&self, name: &str) -> Result<String> {
        let mut saved = self.require(name)?.clone();
        saved.exported_at = Some(self.now());
        Ok(serde_json::to_string_pretty(&saved)?)
    }

    /// Imports either a previously exported recipe or a bare calculated recipe.
    pub async fn import(&mut self, name: &str, json: &str) -> Result<SavedRecipe> {
        validate_non_empty_string("recipe name", name)?;
        let now = self.now();

        let saved = match serde_json::from_str::<Importable>(json)? {
            Importable::Saved(saved) => {
                let mut saved = *saved;
                saved.recipe_id = self.state.recipe_count + 1;
                saved.name = name.to_string();
                saved.created_at = now.clone();
                saved.last_modified = now.clone();
                saved.mixing_instructions = generate_mixing_instructions(&saved.recipe);
                saved.imported_at = Some(now);
                saved.exported_at = None;
                saved
            }
            Importable::Bare(recipe) => {
                let strain = recipe.strain.clone();
                let mut saved = self.build(name, recipe, strain, Vec::new())?;
                saved.imported_at = Some(now);
                saved
            }
        };
        if saved.recipe.is_empty() {
            return Err(HydroError::validation("Recipe has no nutrients"));
        }

        self.insert(saved.clone()).await?;
        tracing::info!("📥 Recipe imported: {}", name);
        Ok(saved)
    }

    pub async fn duplicate(&mut self, name: &str, new_name: &str) -> Result<SavedRecipe> {
        validate_non_empty_string("recipe name", new_name)?;
        let mut copy = self.require(name)?.clone();
        let now = self.now();

        copy.recipe_id = self.state.recipe_count + 1;
        copy.name = new_name.to_string();
        copy.duplicated_from = Some(name.to_string());
        copy.created_at = now.clone();
        copy.last_modified = now;
        copy.version = 1;
        copy.results.clear();
        copy.imported_at = None;
        copy.exported_at = None;

        self.insert(copy.clone()).await?;
        Ok(copy)
    }

    pub fn export_csv(&self, name: &str) -> Result<String> {
        let saved = self.require(name)?;
        let mut writer = csv::Writer::from_writer(Vec::new());
        for entry in &saved.recipe.entries {
            writer.serialize(CsvRow {
                product: &entry.product,
                amount: entry.amount,
                unit: entry.unit.to_string(),
                per_gallon: entry.per_gallon,
                per_liter: entry.per_liter,
                kind: entry.kind.as_str(),
            })?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| HydroError::IoError(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Writes `next` and only then makes it the in-memory state.
    async fn commit(&mut self, next: RecipeFile) -> Result<()> {
        let json = serde_json::to_vec_pretty(&next)?;
        self.storage.write_file(&self.file, &json).await?;
        self.state = next;
        Ok(())
    }
}
