use crate::domain::model::Strain;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// Remote catalogue of strains (search, categories, random generation).
#[async_trait]
pub trait StrainSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Strain>>;
    async fn categories(&self) -> Result<Vec<String>>;
    async fn generate(&self, category: &str) -> Result<Option<Strain>>;
}
