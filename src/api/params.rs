//! Query-string parsing and validation
//!
//! Parameters arrive as raw strings so that malformed values produce the same
//! `{error}` JSON body as out-of-range ones instead of axum's plain-text
//! rejection. Empty values are treated as absent.

use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{ContentType, RecordFilter, Timeframe, TitleMatch},
};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const MAX_HISTORY_LIMIT: usize = 10_000;
pub const DEFAULT_TOP_CONTENT_LIMIT: usize = 10;
pub const MAX_TOP_CONTENT_LIMIT: usize = 100;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogueQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub year: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub timeframe: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub view: Option<String>,
}

/// Which representation `/profiles/{name}` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    Stats,
    Overview,
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

/// Parse a limit in `1..=max`, defaulting when absent
pub fn parse_limit(raw: Option<&str>, default: usize, max: usize) -> AppResult<usize> {
    let Some(raw) = present(raw) else {
        return Ok(default);
    };

    match raw.parse::<usize>() {
        Ok(limit) if (1..=max).contains(&limit) => Ok(limit),
        _ => Err(AppError::InvalidInput(format!(
            "Invalid limit parameter. Must be between 1 and {}",
            max
        ))),
    }
}

pub fn parse_content_type(raw: &str) -> AppResult<ContentType> {
    raw.parse::<ContentType>().map_err(|_| {
        AppError::InvalidInput(
            "Invalid type parameter. Must be \"Movie\" or \"TV Show\"".to_string(),
        )
    })
}

pub fn parse_year(raw: &str) -> AppResult<i32> {
    match raw.parse::<i32>() {
        Ok(year) if (MIN_YEAR..=MAX_YEAR).contains(&year) => Ok(year),
        _ => Err(AppError::InvalidInput("Invalid year parameter".to_string())),
    }
}

pub fn parse_timeframe(raw: Option<&str>) -> AppResult<Timeframe> {
    match present(raw) {
        None => Ok(Timeframe::default()),
        Some(raw) => raw.parse::<Timeframe>().map_err(|_| {
            AppError::InvalidInput(
                "Invalid timeframe parameter. Must be \"day\", \"week\", or \"month\"".to_string(),
            )
        }),
    }
}

pub fn parse_profile_format(raw: Option<&str>) -> AppResult<ProfileFormat> {
    match present(raw) {
        None | Some("stats") => Ok(ProfileFormat::Stats),
        Some("overview") => Ok(ProfileFormat::Overview),
        Some(_) => Err(AppError::InvalidInput(
            "Invalid view parameter. Must be \"stats\" or \"overview\"".to_string(),
        )),
    }
}

impl CatalogueQuery {
    /// Validate the catalogue filters into a record filter
    pub fn into_filter(self) -> AppResult<RecordFilter> {
        let year = present(self.year.as_deref()).map(parse_year).transpose()?;
        let content_type = present(self.content_type.as_deref())
            .map(parse_content_type)
            .transpose()?;
        let title = present(self.search.as_deref())
            .map(|search| TitleMatch::AllTokens(search.to_string()));

        Ok(RecordFilter {
            content_type,
            year,
            title,
            profile_name: None,
        })
    }
}
