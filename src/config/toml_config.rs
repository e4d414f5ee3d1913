use crate::core::calculator::{MAX_STRENGTH, MIN_STRENGTH};
use crate::core::units::Conversions;
use crate::domain::model::UnitSystem;
use crate::utils::error::{HydroError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "hydro-calc.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub strain_api: Option<StrainApiConfig>,
    #[serde(default)]
    pub conversions: Conversions,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default = "default_themes")]
    pub themes: BTreeMap<String, Theme>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            strain_api: None,
            conversions: Conversions::default(),
            defaults: DefaultsConfig::default(),
            themes: default_themes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub title: String,
    pub emoji: String,
    pub version: String,
    pub company: String,
    pub support_email: String,
    pub theme: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            title: "Professional Hydroponic Calculator".to_string(),
            emoji: "🌱".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            company: "Professional Hydro".to_string(),
            support_email: "support@professional-hydro.com".to_string(),
            theme: "Professional".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8501
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_strain_db")]
    pub strain_db: String,
    #[serde(default = "default_recipes")]
    pub recipes: String,
    /// Optional JSON file with extra nutrient lines, relative to `data_dir`.
    #[serde(default)]
    pub nutrient_lines: Option<String>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_strain_db() -> String {
    "strains.json".to_string()
}

fn default_recipes() -> String {
    "recipes.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            strain_db: default_strain_db(),
            recipes: default_recipes(),
            nutrient_lines: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrainApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub unit_system: UnitSystem,
    #[serde(default = "default_strength")]
    pub strength_percent: f64,
    #[serde(default = "default_line")]
    pub nutrient_line: String,
}

fn default_strength() -> f64 {
    100.0
}

fn default_line() -> String {
    "General Hydroponics".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            unit_system: UnitSystem::Us,
            strength_percent: default_strength(),
            nutrient_line: default_line(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub primary: String,
    pub secondary: String,
    pub background: String,
}

fn theme(primary: &str, secondary: &str, background: &str) -> Theme {
    Theme {
        primary: primary.to_string(),
        secondary: secondary.to_string(),
        background: background.to_string(),
    }
}

fn default_themes() -> BTreeMap<String, Theme> {
    BTreeMap::from([
        (
            "Professional".to_string(),
            theme("#2E7D32", "#1565C0", "#FAFAFA"),
        ),
        (
            "High Contrast".to_string(),
            theme("#000000", "#FFFFFF", "#FFFFFF"),
        ),
        (
            "Dark Mode".to_string(),
            theme("#81C784", "#64B5F6", "#212121"),
        ),
    ])
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| HydroError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        let mut config: AppConfig =
            toml::from_str(&processed).map_err(|e| HydroError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        if config.themes.is_empty() {
            config.themes = default_themes();
        }
        Ok(config)
    }

    /// Explicit path, else `hydro-calc.toml` in the working directory, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// 替換環境變數 (例如 ${STRAIN_API_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| HydroError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn active_theme(&self) -> Option<&Theme> {
        self.themes.get(&self.app.theme)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.server.host)?;
        if self.server.port == 0 {
            return Err(HydroError::InvalidConfigValueError {
                field: "server.port".to_string(),
                value: "0".to_string(),
                reason: "Port must be non-zero".to_string(),
            });
        }

        let data_dir = self.storage.data_dir.to_string_lossy();
        validation::validate_path("storage.data_dir", &data_dir)?;
        validation::validate_path("storage.strain_db", &self.storage.strain_db)?;
        validation::validate_path("storage.recipes", &self.storage.recipes)?;

        if let Some(api) = &self.strain_api {
            validation::validate_url("strain_api.base_url", &api.base_url)?;
            if api.timeout_seconds == 0 {
                return Err(HydroError::InvalidConfigValueError {
                    field: "strain_api.timeout_seconds".to_string(),
                    value: "0".to_string(),
                    reason: "Timeout must be at least one second".to_string(),
                });
            }
        }

        for (field, value) in [
            ("conversions.gal_to_l", self.conversions.gal_to_l),
            ("conversions.l_to_gal", self.conversions.l_to_gal),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(HydroError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: "Conversion factor must be positive".to_string(),
                });
            }
        }

        let strength = self.defaults.strength_percent;
        if !(MIN_STRENGTH..=MAX_STRENGTH).contains(&strength) {
            return Err(HydroError::InvalidConfigValueError {
                field: "defaults.strength_percent".to_string(),
                value: strength.to_string(),
                reason: format!("Value must be between {} and {}", MIN_STRENGTH, MAX_STRENGTH),
            });
        }

        if self.active_theme().is_none() {
            return Err(HydroError::InvalidConfigValueError {
                field: "app.theme".to_string(),
                value: self.app.theme.clone(),
                reason: format!(
                    "Unknown theme. Available: {}",
                    self.themes.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
