use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ContentType;

/// Headline statistics for one profile
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub profile_name: String,
    pub total_views: u64,
    pub total_watch_time_seconds: u64,
    pub unique_titles: u64,
    pub movie_count: u64,
    pub tv_show_count: u64,
    pub first_view_date: DateTime<Utc>,
    pub last_view_date: DateTime<Utc>,
    pub top_device_type: String,
    pub top_country: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TitleCount {
    pub title: String,
    pub count: u64,
}

/// Records per calendar month, keyed `yyyy-MM`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthCount {
    pub date: String,
    pub count: u64,
}

/// Records per hour of day (UTC)
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HourCount {
    pub hour: u32,
    pub count: u64,
}

/// Index-side aggregations over a single profile's records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileAggregates {
    pub total_records: u64,
    pub total_duration: u64,
    pub movie_count: u64,
    pub tv_show_count: u64,
    pub top_movies: Vec<TitleCount>,
    pub top_series: Vec<TitleCount>,
    pub activity_over_time: Vec<MonthCount>,
    pub activity_by_hour: Vec<HourCount>,
}

/// Another profile ranked by how many of the top titles it also watched
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SimilarProfile {
    pub name: String,
    pub score: u64,
}

/// Dashboard view of a profile built from index aggregations
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOverview {
    pub profile_name: String,
    pub total_movies: u64,
    pub total_series: u64,
    pub total_duration: u64,
    pub top_movies: Vec<TitleCount>,
    pub top_series: Vec<TitleCount>,
    pub activity_over_time: Vec<MonthCount>,
    pub activity_by_hour: Vec<HourCount>,
    pub similar_profiles: Vec<SimilarProfile>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopContentItem {
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub view_count: u64,
    pub total_duration: u64,
    pub last_viewed_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDataPoint {
    /// Bucket key: `yyyy-MM-dd` for days and weeks, `yyyy-MM` for months
    pub date: String,
    pub view_count: u64,
    pub total_duration: u64,
}

/// Bucket width for profile activity timelines
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Day,
    /// Weeks start on Sunday
    Week,
    Month,
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Timeframe::Day),
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            other => Err(format!("Unknown timeframe: {}", other)),
        }
    }
}
