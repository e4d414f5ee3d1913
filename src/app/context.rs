use crate::adapters::{LocalStorage, StrainApiClient};
use crate::config::AppConfig;
use crate::core::calculator::Calculator;
use crate::core::catalog::Catalog;
use crate::core::recipes::RecipeBook;
use crate::core::strains::StrainDatabase;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::time::Duration;

/// Everything a command or request handler needs: the nutrient catalogue plus
/// the persisted strain and recipe stores under the configured data directory.
pub struct AppContext<S: Storage + Clone = LocalStorage> {
    pub config: AppConfig,
    pub catalog: Catalog,
    pub strains: StrainDatabase<S>,
    pub recipes: RecipeBook<S>,
}

impl AppContext<LocalStorage> {
    pub async fn open(config: AppConfig) -> Result<Self> {
        let storage = LocalStorage::new(config.storage.data_dir.clone());
        Self::with_storage(config, storage).await
    }
}

impl<S: Storage + Clone> AppContext<S> {
    pub async fn with_storage(config: AppConfig, storage: S) -> Result<Self> {
        let mut catalog = Catalog::builtin();
        if let Some(file) = &config.storage.nutrient_lines {
            let bytes = storage.read_file(file).await?;
            let merged = catalog.merge_json(&String::from_utf8_lossy(&bytes))?;
            tracing::info!("📦 Loaded {} custom nutrient lines from {}", merged, file);
        }

        let strains = StrainDatabase::open(storage.clone(), config.storage.strain_db.clone()).await?;
        let recipes = RecipeBook::open(storage, config.storage.recipes.clone()).await?;
        tracing::debug!(
            "Context ready: {} lines, {} strains, {} recipes",
            catalog.lines().len(),
            strains.len(),
            recipes.len()
        );

        Ok(Self {
            config,
            catalog,
            strains,
            recipes,
        })
    }

    pub fn calculator(&self) -> Calculator<'_> {
        Calculator::new(&self.catalog).with_conversions(self.config.conversions)
    }

    /// Remote strain client, when `[strain_api]` is configured.
    pub fn strain_client(&self) -> Result<Option<StrainApiClient>> {
        self.config
            .strain_api
            .as_ref()
            .map(|api| {
                StrainApiClient::new(
                    api.base_url.clone(),
                    Duration::from_secs(api.timeout_seconds),
                )
            })
            .transpose()
    }
}
