// Page handlers for HTML rendering with Askama

use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::api_server::AppState;
use crate::store::SowingFilter;

// ============================================================================
// Home Page
// ============================================================================

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub title: String,
    pub product_count: usize,
    pub municipality_count: usize,
    pub sowing_count: usize,
}

pub async fn home_page(State(state): State<AppState>) -> impl IntoResponse {
    let template = HomeTemplate {
        title: "Agroplan".to_string(),
        product_count: state.store.list_products(None, None).len(),
        municipality_count: state.store.list_municipalities().len(),
        sowing_count: state.store.list_sowings(SowingFilter::default()).len(),
    };
    Html(template.render().unwrap_or_else(|e| {
        format!("Template error: {}", e)
    }))
}

// ============================================================================
// Viability Check Page
// ============================================================================

#[derive(Template)]
#[template(path = "pages/viability.html")]
pub struct ViabilityTemplate {
    pub title: String,
}

pub async fn viability_page() -> impl IntoResponse {
    let template = ViabilityTemplate {
        title: "Viability Check".to_string(),
    };
    Html(template.render().unwrap_or_else(|e| {
        format!("Template error: {}", e)
    }))
}
