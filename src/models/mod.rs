use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod content;
pub mod profile;

pub use content::{
    CatalogueEntry, ContentDetails, EpisodeInfo, ProfileBreakdown, ProfileView, SeasonInfo,
};
pub use profile::{
    ActivityDataPoint, HourCount, MonthCount, ProfileAggregates, ProfileOverview, ProfileStats,
    SimilarProfile, Timeframe, TitleCount, TopContentItem,
};

/// Kind of content a viewing record refers to
///
/// Serialized with the exact keyword values stored in the index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContentType {
    #[serde(rename = "Movie")]
    Movie,
    #[serde(rename = "TV Show")]
    TvShow,
}

impl ContentType {
    /// Keyword value used by the index
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "Movie",
            ContentType::TvShow => "TV Show",
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Movie" => Ok(ContentType::Movie),
            "TV Show" => Ok(ContentType::TvShow),
            other => Err(format!("Unknown content type: {}", other)),
        }
    }
}

/// One logged playback event, exactly as stored in the index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewingRecord {
    pub title: String,
    pub date: DateTime<Utc>,
    /// Watched duration in seconds
    pub duration: u64,
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub country: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default)]
    pub profile_name: Option<String>,
}

impl ViewingRecord {
    /// Profile the record is attributed to, if it has a non-blank one
    pub fn profile(&self) -> Option<&str> {
        self.profile_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

// ============================================================================
// Record queries
// ============================================================================

/// How a title filter matches the stored title
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleMatch {
    /// Keyword equality on the full title
    Exact(String),
    /// Every whitespace-separated token must appear, case-insensitively
    AllTokens(String),
}

impl TitleMatch {
    /// Tokens of an `AllTokens` query, lowercased
    pub fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_lowercase).collect()
    }

    pub fn matches(&self, title: &str) -> bool {
        match self {
            TitleMatch::Exact(expected) => title == expected,
            TitleMatch::AllTokens(text) => {
                let haystack = title.to_lowercase();
                Self::tokens(text)
                    .iter()
                    .all(|token| haystack.contains(token.as_str()))
            }
        }
    }
}

/// Filter applied to viewing records; every present field must match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub content_type: Option<ContentType>,
    pub year: Option<i32>,
    pub title: Option<TitleMatch>,
    pub profile_name: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &ViewingRecord) -> bool {
        if let Some(content_type) = self.content_type {
            if record.content_type != content_type {
                return false;
            }
        }
        if let Some(year) = self.year {
            if record.year() != year {
                return false;
            }
        }
        if let Some(title) = &self.title {
            if !title.matches(&record.title) {
                return false;
            }
        }
        if let Some(profile) = &self.profile_name {
            if record.profile_name.as_deref() != Some(profile.as_str()) {
                return false;
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self == &RecordFilter::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recent `date` first
    NewestFirst,
    /// Whatever order the store yields
    Unsorted,
}

/// A filtered, capped request for viewing records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub filter: RecordFilter,
    pub limit: usize,
    pub sort: SortOrder,
}

impl RecordQuery {
    pub fn new(filter: RecordFilter, limit: usize) -> Self {
        Self {
            filter,
            limit,
            sort: SortOrder::Unsorted,
        }
    }

    pub fn newest_first(mut self) -> Self {
        self.sort = SortOrder::NewestFirst;
        self
    }
}
