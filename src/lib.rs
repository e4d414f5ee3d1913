pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{LocalStorage, StrainApiClient};
pub use app::context::AppContext;
pub use config::AppConfig;
pub use core::calculator::{CalculationRequest, Calculator};
pub use core::catalog::Catalog;
pub use utils::error::{HydroError, Result};
