use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ContentType;

/// One distinct title in the catalogue with its aggregated history
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueEntry {
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub first_viewed_date: DateTime<Utc>,
    pub total_views: u64,
    pub total_duration: u64,
}

/// Views of a title attributed to one profile
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBreakdown {
    pub profile_name: String,
    pub view_count: u64,
    pub total_duration: u64,
}

/// Everything known about a single title
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetails {
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub total_views: u64,
    pub total_duration: u64,
    pub first_viewed_date: DateTime<Utc>,
    pub last_viewed_date: DateTime<Utc>,
    pub unique_profiles: Vec<String>,
    pub views_by_profile: Vec<ProfileBreakdown>,
    pub device_types: Vec<String>,
    pub countries: Vec<String>,
    /// Present for TV shows only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasons: Option<Vec<SeasonInfo>>,
}

/// Per-profile summary returned by `/content/{title}/profiles`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub profile_name: String,
    pub view_count: u64,
    pub total_duration: u64,
    pub last_viewed_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeInfo {
    pub episode_title: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub viewed_date: DateTime<Utc>,
    pub duration: u64,
    pub profile_name: Option<String>,
}

/// Episodes of one season; season 0 collects titles without a parseable season
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeasonInfo {
    pub season_number: u32,
    pub episodes: Vec<EpisodeInfo>,
}
