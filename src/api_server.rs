// Axum API Server Module
//
// REST resource API (categories, products, municipalities, sowings, prices)
// plus the viability, weather and stats endpoints, with bearer-token auth
// and role gating.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use moka::future::Cache;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::auth::{AuthError, Authenticator};
use crate::config::Config;
use crate::models::{
    Id, MunicipalityInput, PriceInput, ProductInput, Role, SowingInput, User,
};
use crate::stats::{self, DEFAULT_ALERT_THRESHOLD};
use crate::store::{SowingFilter, Store, StoreError};
use crate::viability::{self, ConditionOverrides, Conditions};
use crate::weather::{WeatherClient, WeatherError, WeatherReport};
use crate::web::handlers::pages;

/// Weather responses are reused for this long before hitting the upstream
/// API again.
const WEATHER_CACHE_TTL: Duration = Duration::from_secs(600);

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub auth: Arc<Authenticator>,
    pub weather: Arc<WeatherClient>,
    pub weather_cache: Cache<Id, WeatherReport>,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        tracing::info!("Initializing weather client...");
        let weather = Arc::new(WeatherClient::new(config)?);

        tracing::info!("Initializing weather cache...");
        let weather_cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(WEATHER_CACHE_TTL)
            .build();

        Ok(Self {
            store: Arc::new(Store::new()),
            auth: Arc::new(Authenticator::new()),
            weather,
            weather_cache,
        })
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Server-rendered pages
        .route("/", get(pages::home_page))
        .route("/viability", get(pages::viability_page))

        // Auth
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/users", post(create_user))

        // Catalog resources
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/api/municipalities",
            get(list_municipalities).post(create_municipality),
        )
        .route(
            "/api/municipalities/:id",
            get(get_municipality)
                .put(update_municipality)
                .delete(delete_municipality),
        )

        // Sowings
        // IMPORTANT: stats route must come before :id route (Axum matches in order)
        .route("/api/sowings/stats", get(sowing_stats))
        .route("/api/sowings", get(list_sowings).post(create_sowing))
        .route(
            "/api/sowings/:id",
            get(get_sowing).put(update_sowing).delete(delete_sowing),
        )

        // Prices
        .route("/api/prices", get(list_prices).post(create_price))

        // Weather + viability
        .route("/api/weather/:municipality_id", get(get_weather))
        .route("/api/viability", post(check_viability))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Auth Extractor
// ============================================================================

/// Authenticated user, resolved from the `Authorization: Bearer` header.
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
        state
            .auth
            .authenticate(token)
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("invalid or expired token".to_string()))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn require_admin(user: &User) -> Result<(), AppError> {
    if user.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("administrator role required".to_string()))
    }
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// ----------------------------------------------------------------------------
// Auth
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    username: String,
    password: String,
    #[serde(default)]
    role: Role,
}

/// Open self-registration; always creates a farmer account.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state
        .auth
        .register(&payload.username, &payload.password, Role::Farmer)?;
    tracing::info!("registered farmer `{}`", user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (token, user) = state.auth.login(&payload.username, &payload.password)?;
    Ok(Json(serde_json::json!({ "token": token, "user": user })))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
    state.auth.logout(token);
    Ok(StatusCode::NO_CONTENT)
}

/// Admin-only user creation, for provisioning other admins.
async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    require_admin(&user)?;
    let created = state
        .auth
        .register(&payload.username, &payload.password, payload.role)?;
    tracing::info!("admin `{}` created user `{}`", user.username, created.username);
    Ok((StatusCode::CREATED, Json(created)))
}

// ----------------------------------------------------------------------------
// Categories
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CategoryPayload {
    name: String,
}

async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Json<serde_json::Value> {
    let categories = state.store.list_categories();
    Json(serde_json::json!({ "rows": categories.len(), "data": categories }))
}

async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CategoryPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    require_admin(&user)?;
    let category = state.store.create_category(payload.name.trim())?;
    Ok((StatusCode::CREATED, Json(serde_json::to_value(category)?)))
}

async fn get_category(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<Id>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::to_value(state.store.get_category(id)?)?))
}

async fn update_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Id>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&user)?;
    let category = state.store.update_category(id, payload.name.trim())?;
    Ok(Json(serde_json::to_value(category)?))
}

async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Id>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;
    state.store.delete_category(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Products
// ----------------------------------------------------------------------------

/// Query params for product listings.
#[derive(Debug, Deserialize)]
struct ProductFilters {
    category: Option<Id>,
    name: Option<String>,
}

async fn list_products(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(filters): Query<ProductFilters>,
) -> Json<serde_json::Value> {
    let products = state
        .store
        .list_products(filters.category, filters.name.as_deref());
    Json(serde_json::json!({ "rows": products.len(), "data": products }))
}

async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ProductInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    require_admin(&user)?;
    let product = state.store.create_product(&payload)?;
    Ok((StatusCode::CREATED, Json(serde_json::to_value(product)?)))
}

async fn get_product(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<Id>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::to_value(state.store.get_product(id)?)?))
}

async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Id>,
    Json(payload): Json<ProductInput>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&user)?;
    let product = state.store.update_product(id, &payload)?;
    Ok(Json(serde_json::to_value(product)?))
}

async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Id>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;
    state.store.delete_product(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Municipalities
// ----------------------------------------------------------------------------

async fn list_municipalities(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Json<serde_json::Value> {
    let municipalities = state.store.list_municipalities();
    Json(serde_json::json!({ "rows": municipalities.len(), "data": municipalities }))
}

async fn create_municipality(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<MunicipalityInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    require_admin(&user)?;
    let municipality = state.store.create_municipality(&payload)?;
    Ok((StatusCode::CREATED, Json(serde_json::to_value(municipality)?)))
}

async fn get_municipality(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<Id>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::to_value(state.store.get_municipality(id)?)?))
}

async fn update_municipality(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Id>,
    Json(payload): Json<MunicipalityInput>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&user)?;
    let municipality = state.store.update_municipality(id, &payload)?;
    // Coordinates may have changed; drop any cached weather.
    state.weather_cache.invalidate(&id).await;
    Ok(Json(serde_json::to_value(municipality)?))
}

async fn delete_municipality(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Id>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;
    state.store.delete_municipality(id)?;
    state.weather_cache.invalidate(&id).await;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Sowings
// ----------------------------------------------------------------------------

/// Query params for sowing listings.
#[derive(Debug, Deserialize)]
struct SowingFilters {
    product: Option<Id>,
    municipality: Option<Id>,
}

/// Farmers only ever see their own sowings; admins see all.
fn scoped_filter(user: &User, filters: &SowingFilters) -> SowingFilter {
    SowingFilter {
        farmer_id: (user.role == Role::Farmer).then_some(user.id),
        product_id: filters.product,
        municipality_id: filters.municipality,
    }
}

async fn list_sowings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filters): Query<SowingFilters>,
) -> Json<serde_json::Value> {
    let sowings = state.store.list_sowings(scoped_filter(&user, &filters));
    Json(serde_json::json!({ "rows": sowings.len(), "data": sowings }))
}

async fn create_sowing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<SowingInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let sowing = state.store.create_sowing(user.id, &payload)?;
    tracing::info!(
        "farmer `{}` registered sowing {} (product {})",
        user.username,
        sowing.id,
        sowing.product_id
    );
    Ok((StatusCode::CREATED, Json(serde_json::to_value(sowing)?)))
}

/// Fetch a sowing, hiding other farmers' records behind a 404.
fn owned_sowing(state: &AppState, user: &User, id: Id) -> Result<crate::models::Sowing, AppError> {
    let sowing = state.store.get_sowing(id)?;
    if user.role == Role::Farmer && sowing.farmer_id != user.id {
        return Err(AppError::NotFound("sowing not found".to_string()));
    }
    Ok(sowing)
}

async fn get_sowing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Id>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::to_value(owned_sowing(&state, &user, id)?)?))
}

async fn update_sowing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Id>,
    Json(payload): Json<SowingInput>,
) -> Result<Json<serde_json::Value>, AppError> {
    owned_sowing(&state, &user, id)?;
    let sowing = state.store.update_sowing(id, &payload)?;
    Ok(Json(serde_json::to_value(sowing)?))
}

async fn delete_sowing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Id>,
) -> Result<StatusCode, AppError> {
    owned_sowing(&state, &user, id)?;
    state.store.delete_sowing(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Stats (admin dashboard)
// ----------------------------------------------------------------------------

/// Query params for the stats endpoint.
#[derive(Debug, Deserialize)]
struct StatsQuery {
    /// Overplanting share in [0, 1]; defaults to 0.6.
    threshold: Option<f64>,
    municipality: Option<Id>,
}

async fn sowing_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<StatsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&user)?;
    let threshold = params.threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(AppError::BadRequest(
            "threshold must be between 0 and 1".to_string(),
        ));
    }

    let sowings = state.store.list_sowings(SowingFilter {
        municipality_id: params.municipality,
        ..Default::default()
    });
    let stats = stats::aggregate(
        &sowings,
        &state.store.list_products(None, None),
        &state.store.list_categories(),
        &state.store.list_municipalities(),
        threshold,
    );
    Ok(Json(serde_json::to_value(stats)?))
}

// ----------------------------------------------------------------------------
// Prices
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PriceFilters {
    product: Option<Id>,
}

async fn list_prices(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(filters): Query<PriceFilters>,
) -> Json<serde_json::Value> {
    let prices = state.store.list_prices(filters.product);
    Json(serde_json::json!({ "rows": prices.len(), "data": prices }))
}

async fn create_price(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<PriceInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let price = state.store.create_price(Some(user.id), &payload)?;
    Ok((StatusCode::CREATED, Json(serde_json::to_value(price)?)))
}

// ----------------------------------------------------------------------------
// Weather
// ----------------------------------------------------------------------------

async fn get_weather(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(municipality_id): Path<Id>,
) -> Result<Json<serde_json::Value>, AppError> {
    let municipality = state.store.get_municipality(municipality_id)?;
    let report = municipality_weather(&state, municipality_id).await?;

    Ok(Json(serde_json::json!({
        "municipality": municipality.name,
        "temperature": report.temperature_c,
        "humidity": report.humidity_pct,
        "rainfall": report.rainfall_mm,
        "description": report.description,
        "wind_speed": report.wind_speed,
    })))
}

/// Cached current conditions for a municipality.
async fn municipality_weather(
    state: &AppState,
    municipality_id: Id,
) -> Result<WeatherReport, AppError> {
    if let Some(cached) = state.weather_cache.get(&municipality_id).await {
        tracing::debug!("weather cache hit for municipality {}", municipality_id);
        return Ok(cached);
    }

    let municipality = state.store.get_municipality(municipality_id)?;
    let (Some(lat), Some(lon)) = (municipality.latitude, municipality.longitude) else {
        return Err(AppError::from(WeatherError::MissingCoordinates));
    };

    let report = state.weather.current(lat, lon).await?;
    state
        .weather_cache
        .insert(municipality_id, report.clone())
        .await;
    Ok(report)
}

// ----------------------------------------------------------------------------
// Viability
// ----------------------------------------------------------------------------

/// Body of a viability check. Condition overrides are optional; anything
/// missing is filled from live weather, then neutral defaults.
#[derive(Debug, Deserialize)]
struct ViabilityRequest {
    product_id: Id,
    municipality_id: Id,
    #[allow(dead_code)]
    sowing_date: Option<NaiveDate>,
    #[serde(flatten)]
    overrides: ConditionOverrides,
}

async fn check_viability(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Json(payload): Json<ViabilityRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let product = state.store.get_product(payload.product_id)?;
    // Validate the municipality up front so a typo'd id is a 404, not a
    // silent neutral-conditions evaluation.
    state.store.get_municipality(payload.municipality_id)?;

    // Live weather is best-effort: a failed upstream call degrades the
    // check to overrides + neutral defaults rather than failing it.
    let weather = if payload.overrides.is_complete() {
        None
    } else {
        match municipality_weather(&state, payload.municipality_id).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("viability check falling back to defaults: {:?}", e);
                None
            }
        }
    };
    let conditions = Conditions::resolve(&payload.overrides, weather.as_ref());

    let municipality_sowings = state.store.list_sowings(SowingFilter {
        municipality_id: Some(payload.municipality_id),
        ..Default::default()
    });
    let catalog = state.store.list_products(None, None);
    let report = viability::evaluate(&product, &conditions, &municipality_sowings, &catalog);

    tracing::info!(
        "viability of `{}`: {} ({})",
        report.product_name,
        report.score,
        report.level.display_text()
    );

    Ok(Json(serde_json::json!({
        "conditions": conditions,
        "result": report,
    })))
}

// ============================================================================
// Error Mapping
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Upstream(String),
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => AppError::NotFound(e.to_string()),
            _ => AppError::BadRequest(e.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Unauthorized(e.to_string()),
            _ => AppError::BadRequest(e.to_string()),
        }
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::MissingCoordinates => AppError::BadRequest(e.to_string()),
            _ => AppError::Upstream(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
