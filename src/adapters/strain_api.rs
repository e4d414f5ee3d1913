use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::core::strains::default_categories;
use crate::domain::model::Strain;
use crate::domain::ports::StrainSource;
use crate::utils::error::Result;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Strain>,
}

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    #[serde(default)]
    categories: Vec<String>,
}

/// HTTP client for the remote strain catalogue.
#[derive(Debug, Clone)]
pub struct StrainApiClient {
    base_url: String,
    client: Client,
}

impl StrainApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl StrainSource for StrainApiClient {
    async fn search(&self, query: &str) -> Result<Vec<Strain>> {
        tracing::debug!("Searching strains for '{}'", query);
        let response = self
            .client
            .get(self.url("/api/search"))
            .query(&[("q", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!("⚠️ Strain search returned {}", response.status());
            return Ok(Vec::new());
        }
        let body: SearchResponse = response.json().await?;
        Ok(body.results)
    }

    /// Falls back to the built-in categories whenever the service is unavailable.
    async fn categories(&self) -> Result<Vec<String>> {
        let response = match self.client.get(self.url("/api/categories")).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!("⚠️ Category lookup returned {}, using defaults", response.status());
                return Ok(default_categories());
            }
            Err(e) => {
                tracing::warn!("⚠️ Category lookup failed ({}), using defaults", e);
                return Ok(default_categories());
            }
        };

        match response.json::<CategoriesResponse>().await {
            Ok(body) if !body.categories.is_empty() => Ok(body.categories),
            Ok(_) => Ok(default_categories()),
            Err(e) => {
                tracing::warn!("⚠️ Unreadable category response ({}), using defaults", e);
                Ok(default_categories())
            }
        }
    }

    async fn generate(&self, category: &str) -> Result<Option<Strain>> {
        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&serde_json::json!({ "category": category }))
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!("⚠️ Strain generation returned {}", response.status());
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> StrainApiClient {
        StrainApiClient::new(server.base_url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_results() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/api/search").query_param("q", "dream");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "results": [
                        {"name": "Blue Dream", "category": "Balanced Hybrid", "feeding_type": "Heavy"},
                        {"name": "Dream Queen"}
                    ]
                }));
        });

        let results = client(&server).search("dream").await.unwrap();

        api_mock.assert();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "Blue Dream");
        assert_eq!(
            results[0].feeding_type,
            crate::domain::model::FeedingType::Heavy
        );
    }

    #[tokio::test]
    async fn test_search_non_success_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/search");
            then.status(503);
        });

        let results = client(&server).search("anything").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_categories_fall_back_to_defaults() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/categories");
            then.status(500);
        });

        let categories = client(&server).categories().await.unwrap();
        assert_eq!(categories.len(), 6);
        assert_eq!(categories[0], "Flavor Focused");
    }

    #[tokio::test]
    async fn test_categories_from_service() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/categories");
            then.status(200)
                .json_body(serde_json::json!({"categories": ["Sativa", "Indica"]}));
        });

        let categories = client(&server).categories().await.unwrap();
        assert_eq!(categories, vec!["Sativa", "Indica"]);
    }

    #[tokio::test]
    async fn test_generate_posts_category() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .json_body(serde_json::json!({"category": "Medical"}));
            then.status(200)
                .json_body(serde_json::json!({"name": "Harlequin", "category": "Medical"}));
        });

        let strain = client(&server).generate("Medical").await.unwrap();

        api_mock.assert();
        assert_eq!(strain.unwrap().name, "Harlequin");
    }

    #[tokio::test]
    async fn test_generate_failure_is_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(404);
        });

        assert!(client(&server).generate("Medical").await.unwrap().is_none());
    }
}
