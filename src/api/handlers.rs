use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::{
        ActivityDataPoint, CatalogueEntry, ContentDetails, ProfileOverview, ProfileStats,
        ProfileView, TopContentItem, ViewingRecord,
    },
    services::{catalogue, content, history, profiles},
};

use super::params::{
    self, ActivityQuery, CatalogueQuery, LimitQuery, ProfileFormat, ProfileQuery,
};
use super::AppState;

// Response types

#[derive(Debug, Serialize)]
pub struct CatalogueFiltersResponse {
    pub years: Vec<i32>,
}

/// `/profiles/{name}` answers with either representation
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProfileResponse {
    Stats(ProfileStats),
    Overview(ProfileOverview),
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Most recent viewing records
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<ViewingRecord>>> {
    let limit = params::parse_limit(
        query.limit.as_deref(),
        params::DEFAULT_HISTORY_LIMIT,
        params::MAX_HISTORY_LIMIT,
    )?;

    let records = history::recent_history(state.store(), None, limit).await?;
    Ok(Json(records))
}

/// Most recent viewing records of one content type
pub async fn get_history_by_type(
    State(state): State<AppState>,
    Path(content_type): Path<String>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<ViewingRecord>>> {
    let content_type = params::parse_content_type(&content_type)?;
    let limit = params::parse_limit(
        query.limit.as_deref(),
        params::DEFAULT_HISTORY_LIMIT,
        params::MAX_HISTORY_LIMIT,
    )?;

    let records = history::recent_history(state.store(), Some(content_type), limit).await?;
    Ok(Json(records))
}

/// Distinct titles with aggregated views
pub async fn get_catalogue(
    State(state): State<AppState>,
    Query(query): Query<CatalogueQuery>,
) -> AppResult<Json<Vec<CatalogueEntry>>> {
    let filter = query.into_filter()?;

    tracing::info!(
        content_type = ?filter.content_type,
        year = ?filter.year,
        search = ?filter.title,
        "Processing catalogue request"
    );

    let entries = catalogue::get_catalogue(state.store(), filter).await?;
    Ok(Json(entries))
}

/// Values available to the catalogue filters
pub async fn get_catalogue_filters(
    State(state): State<AppState>,
) -> AppResult<Json<CatalogueFiltersResponse>> {
    let years = catalogue::available_years(state.store()).await?;
    Ok(Json(CatalogueFiltersResponse { years }))
}

/// Details of one title, including seasons for TV shows
pub async fn get_content_details(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> AppResult<Json<ContentDetails>> {
    let details = content::get_content_details(state.store(), &title).await?;
    Ok(Json(details))
}

/// Per-profile views of one title
pub async fn get_content_profiles(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> AppResult<Json<Vec<ProfileView>>> {
    let views = content::get_content_profiles(state.store(), &title).await?;
    Ok(Json(views))
}

/// All known profile names
pub async fn get_profiles(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let names = profiles::list_profiles(state.store()).await?;
    Ok(Json(names))
}

/// Statistics for one profile; `?view=overview` returns the dashboard aggregates
pub async fn get_profile(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ProfileQuery>,
) -> AppResult<Json<ProfileResponse>> {
    let response = match params::parse_profile_format(query.view.as_deref())? {
        ProfileFormat::Stats => {
            ProfileResponse::Stats(profiles::get_profile_stats(state.store(), &name).await?)
        }
        ProfileFormat::Overview => {
            ProfileResponse::Overview(profiles::get_profile_overview(state.store(), &name).await?)
        }
    };
    Ok(Json(response))
}

/// Activity histogram for one profile
pub async fn get_profile_activity(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<ActivityDataPoint>>> {
    let timeframe = params::parse_timeframe(query.timeframe.as_deref())?;
    let activity = profiles::get_activity(state.store(), &name, timeframe).await?;
    Ok(Json(activity))
}

/// Most watched titles of one profile
pub async fn get_profile_top_content(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<TopContentItem>>> {
    let limit = params::parse_limit(
        query.limit.as_deref(),
        params::DEFAULT_TOP_CONTENT_LIMIT,
        params::MAX_TOP_CONTENT_LIMIT,
    )?;

    let items = profiles::get_top_content(state.store(), &name, limit).await?;
    Ok(Json(items))
}
