use crate::app::context::AppContext;
use crate::core::calculator::CalculationRequest;
use crate::core::catalog::Catalog;
use crate::core::compliance::{self, ComplianceReport};
use crate::core::instructions::{self, Protocol};
use crate::core::recipes::{RecipeBook, RecipeFilter};
use crate::core::strains::StrainDatabase;
use crate::core::units::Conversions;
use crate::domain::model::{
    GrowthStage, MixingStep, NutrientLine, Reading, Recipe, RecipeResult, SavedRecipe, Strain,
};
use crate::domain::ports::Storage;
use crate::utils::error::{ErrorCategory, HydroError};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct ServerState<S: Storage> {
    catalog: Catalog,
    conversions: Conversions,
    strains: RwLock<StrainDatabase<S>>,
    recipes: RwLock<RecipeBook<S>>,
}

type Shared<S> = State<Arc<ServerState<S>>>;

/// JSON error body with a status derived from the error category.
pub struct ApiError(HydroError);

impl From<HydroError> for ApiError {
    fn from(err: HydroError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match (&self.0, self.0.category()) {
            (HydroError::NotFound { .. }, _) => StatusCode::NOT_FOUND,
            (_, ErrorCategory::Input | ErrorCategory::Calculation) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("❌ Request failed: {} ({:?})", self.0, self.0.category());
        } else {
            tracing::debug!("Rejected request: {}", self.0);
        }
        let body = json!({
            "error": self.0.user_friendly_message(),
            "suggestion": self.0.recovery_suggestion(),
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct CalculateBody {
    #[serde(flatten)]
    pub request: CalculationRequest,
    /// Name of a stored strain, used when no inline strain is given.
    #[serde(default)]
    pub strain_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InstructionsResponse {
    pub recipe: Recipe,
    pub steps: Vec<MixingStep>,
    pub protocol: Protocol,
}

#[derive(Debug, Deserialize)]
pub struct ComplianceBody {
    #[serde(default)]
    pub recipe: Option<Recipe>,
    #[serde(default)]
    pub recipe_name: Option<String>,
    pub reading: Reading,
}

#[derive(Debug, Deserialize)]
pub struct SaveRecipeBody {
    pub name: String,
    pub recipe: Recipe,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResultBody {
    pub reading: Reading,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub strain: Option<String>,
    pub growth_stage: Option<GrowthStage>,
    /// Comma-separated; a recipe must carry every listed tag.
    pub tag: Option<String>,
}

impl HistoryQuery {
    pub fn tags(&self) -> Vec<String> {
        self.tag
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub fn router<S: Storage + Clone + 'static>(ctx: AppContext<S>) -> Router {
    let state = Arc::new(ServerState {
        catalog: ctx.catalog,
        conversions: ctx.config.conversions,
        strains: RwLock::new(ctx.strains),
        recipes: RwLock::new(ctx.recipes),
    });

    Router::new()
        .route("/health", get(health))
        .route("/api/lines", get(list_lines::<S>))
        .route("/api/lines/{name}", get(get_line::<S>))
        .route("/api/calculate", axum::routing::post(calculate::<S>))
        .route("/api/instructions", axum::routing::post(mixing_instructions::<S>))
        .route("/api/compliance", axum::routing::post(check_compliance::<S>))
        .route("/api/troubleshooting", get(troubleshooting))
        .route("/api/strains", get(list_strains::<S>).post(upsert_strain::<S>))
        .route(
            "/api/strains/{name}",
            get(get_strain::<S>).delete(delete_strain::<S>),
        )
        .route("/api/recipes", get(recipe_history::<S>).post(save_recipe::<S>))
        .route(
            "/api/recipes/{name}",
            get(get_recipe::<S>).delete(delete_recipe::<S>),
        )
        .route(
            "/api/recipes/{name}/results",
            axum::routing::post(add_result::<S>),
        )
        .with_state(state)
}

/// Binds to the configured address and serves until the process is stopped.
pub async fn serve<S: Storage + Clone + 'static>(ctx: AppContext<S>) -> crate::utils::error::Result<()> {
    let addr = ctx.config.bind_address();
    let app = router(ctx);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn list_lines<S: Storage>(State(state): Shared<S>) -> Json<Vec<serde_json::Value>> {
    let lines = state
        .catalog
        .lines()
        .iter()
        .map(|l| {
            json!({
                "name": l.name,
                "description": l.description,
                "base_nutrients": l.base_nutrients.len(),
                "supplements": l.supplements.len(),
            })
        })
        .collect();
    Json(lines)
}

async fn get_line<S: Storage>(
    State(state): Shared<S>,
    Path(name): Path<String>,
) -> ApiResult<Json<NutrientLine>> {
    Ok(Json(state.catalog.line(&name)?.clone()))
}

async fn resolve_request<S: Storage>(
    state: &ServerState<S>,
    body: CalculateBody,
) -> ApiResult<Recipe> {
    let mut request = body.request;
    if request.strain.is_none() {
        if let Some(name) = body.strain_name {
            request.strain = Some(state.strains.read().await.require(&name)?.clone());
        }
    }
    let calculator = crate::core::calculator::Calculator::new(&state.catalog)
        .with_conversions(state.conversions);
    Ok(calculator.calculate(&request)?)
}

async fn calculate<S: Storage>(
    State(state): Shared<S>,
    Json(body): Json<CalculateBody>,
) -> ApiResult<Json<Recipe>> {
    Ok(Json(resolve_request(&state, body).await?))
}

async fn mixing_instructions<S: Storage>(
    State(state): Shared<S>,
    Json(body): Json<CalculateBody>,
) -> ApiResult<Json<InstructionsResponse>> {
    let recipe = resolve_request(&state, body).await?;
    Ok(Json(InstructionsResponse {
        steps: instructions::generate_mixing_instructions(&recipe),
        protocol: instructions::protocol(&recipe),
        recipe,
    }))
}

async fn check_compliance<S: Storage>(
    State(state): Shared<S>,
    Json(body): Json<ComplianceBody>,
) -> ApiResult<Json<ComplianceReport>> {
    let recipe = match (body.recipe, body.recipe_name) {
        (Some(recipe), _) => recipe,
        (None, Some(name)) => state.recipes.read().await.require(&name)?.recipe.clone(),
        (None, None) => {
            return Err(HydroError::validation("Provide either recipe or recipe_name").into())
        }
    };
    Ok(Json(compliance::check(&recipe, &body.reading)))
}

async fn troubleshooting() -> Json<Vec<compliance::Advice>> {
    Json(compliance::troubleshooting_guide())
}

async fn list_strains<S: Storage>(
    State(state): Shared<S>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<Strain>> {
    let db = state.strains.read().await;
    let strains = match query.q.as_deref() {
        Some(q) => db.search(q).into_iter().cloned().collect(),
        None => db.list().to_vec(),
    };
    Json(strains)
}

async fn get_strain<S: Storage>(
    State(state): Shared<S>,
    Path(name): Path<String>,
) -> ApiResult<Json<Strain>> {
    Ok(Json(state.strains.read().await.require(&name)?.clone()))
}

async fn upsert_strain<S: Storage>(
    State(state): Shared<S>,
    Json(strain): Json<Strain>,
) -> ApiResult<(StatusCode, Json<Strain>)> {
    let replaced = state.strains.write().await.upsert(strain.clone()).await?;
    let status = if replaced {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(strain)))
}

async fn delete_strain<S: Storage>(
    State(state): Shared<S>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    if state.strains.write().await.remove(&name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HydroError::not_found("strain", name).into())
    }
}

async fn recipe_history<S: Storage>(
    State(state): Shared<S>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<SavedRecipe>> {
    let filter = RecipeFilter {
        tags: query.tags(),
        strain: query.strain,
        growth_stage: query.growth_stage,
    };
    let book = state.recipes.read().await;
    Json(book.history(&filter).into_iter().cloned().collect())
}

async fn get_recipe<S: Storage>(
    State(state): Shared<S>,
    Path(name): Path<String>,
) -> ApiResult<Json<SavedRecipe>> {
    Ok(Json(state.recipes.read().await.require(&name)?.clone()))
}

async fn save_recipe<S: Storage>(
    State(state): Shared<S>,
    Json(body): Json<SaveRecipeBody>,
) -> ApiResult<(StatusCode, Json<SavedRecipe>)> {
    let strain = body.recipe.strain.clone();
    let saved = state
        .recipes
        .write()
        .await
        .save_with_metadata(&body.name, body.recipe, strain, body.tags)
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn delete_recipe<S: Storage>(
    State(state): Shared<S>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    if state.recipes.write().await.delete(&name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HydroError::not_found("recipe", name).into())
    }
}

async fn add_result<S: Storage>(
    State(state): Shared<S>,
    Path(name): Path<String>,
    Json(body): Json<ResultBody>,
) -> ApiResult<(StatusCode, Json<RecipeResult>)> {
    let result = state
        .recipes
        .write()
        .await
        .add_result(&name, body.reading, body.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::memory::MemoryStorage;
    use crate::config::AppConfig;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn app() -> Router {
        let ctx = AppContext::with_storage(AppConfig::default(), MemoryStorage::new())
            .await
            .unwrap();
        router(ctx)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_and_lines() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (_, lines) = send(&app, Method::GET, "/api/lines", None).await;
        assert_eq!(lines.as_array().unwrap().len(), 6);

        let (status, _) = send(&app, Method::GET, "/api/lines/Nonexistent", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_calculate_endpoint() {
        let app = app().await;
        let (status, recipe) = send(
            &app,
            Method::POST,
            "/api/calculate",
            Some(json!({
                "nutrient_line": "General Hydroponics",
                "volume": 10.0,
                "growth_stage": "Early Flower"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(recipe["entries"][0]["product"], "Flora Micro");
        assert_eq!(recipe["entries"][0]["amount"], 40.0);
    }

    #[tokio::test]
    async fn test_calculate_rejects_out_of_range_volume() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/calculate",
            Some(json!({
                "nutrient_line": "General Hydroponics",
                "volume": 0.0,
                "growth_stage": "Seedling"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_strain_crud_and_named_strain_calculation() {
        let app = app().await;
        let strain = json!({"name": "Gorilla Glue", "feeding_type": "Heavy", "category": "High THC"});
        let (status, _) = send(&app, Method::POST, "/api/strains", Some(strain.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&app, Method::POST, "/api/strains", Some(strain)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, found) = send(&app, Method::GET, "/api/strains?q=gorilla", None).await;
        assert_eq!(found.as_array().unwrap().len(), 1);

        let (_, recipe) = send(
            &app,
            Method::POST,
            "/api/calculate",
            Some(json!({
                "nutrient_line": "General Hydroponics",
                "volume": 10.0,
                "growth_stage": "Mid Flower",
                "strain_name": "Gorilla Glue"
            })),
        )
        .await;
        assert_eq!(recipe["entries"][0]["amount"], 50.0);

        let (status, _) = send(&app, Method::DELETE, "/api/strains/Gorilla%20Glue", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, "/api/strains/Gorilla%20Glue", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_recipe_lifecycle() {
        let app = app().await;
        let (_, recipe) = send(
            &app,
            Method::POST,
            "/api/calculate",
            Some(json!({
                "nutrient_line": "Canna",
                "volume": 20.0,
                "unit_system": "Metric",
                "growth_stage": "Late Veg"
            })),
        )
        .await;

        let (status, saved) = send(
            &app,
            Method::POST,
            "/api/recipes",
            Some(json!({"name": "canna veg", "recipe": recipe, "tags": ["veg"]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(saved["recipe_id"], 1);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/recipes/canna%20veg/results",
            Some(json!({"reading": {"ec": 1.3, "ph": 6.0}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, history) = send(&app, Method::GET, "/api/recipes?tag=veg", None).await;
        assert_eq!(history[0]["results"].as_array().unwrap().len(), 1);

        let (status, report) = send(
            &app,
            Method::POST,
            "/api/compliance",
            Some(json!({"recipe_name": "canna veg", "reading": {"ph": 7.5}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["ph"]["status"], "critical");
        assert_eq!(report["compliance"], "fail");

        let (status, _) = send(&app, Method::DELETE, "/api/recipes/canna%20veg", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_history_filters_on_every_listed_tag() {
        let app = app().await;
        let (_, recipe) = send(
            &app,
            Method::POST,
            "/api/calculate",
            Some(json!({
                "nutrient_line": "Canna",
                "volume": 10.0,
                "growth_stage": "Late Veg"
            })),
        )
        .await;
        for (name, tags) in [("both", json!(["veg", "canna"])), ("veg only", json!(["veg"]))] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/api/recipes",
                Some(json!({"name": name, "recipe": recipe, "tags": tags})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, history) = send(&app, Method::GET, "/api/recipes?tag=veg", None).await;
        assert_eq!(history.as_array().unwrap().len(), 2);

        let (status, history) = send(&app, Method::GET, "/api/recipes?tag=veg,%20canna", None).await;
        assert_eq!(status, StatusCode::OK);
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["name"], "both");

        let (_, history) = send(&app, Method::GET, "/api/recipes?tag=veg,,", None).await;
        assert_eq!(history.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_instructions_endpoint() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/instructions",
            Some(json!({
                "nutrient_line": "General Hydroponics",
                "volume": 5.0,
                "growth_stage": "Early Veg"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["steps"][0]["step"], 1);
        assert!(body["protocol"]["verification"].is_object());
    }
}
