// Adapters layer: concrete implementations for external systems (storage, strain service).

pub mod storage;
pub mod strain_api;

pub use storage::LocalStorage;
pub use strain_api::StrainApiClient;
