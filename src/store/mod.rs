/// Record store gateway
///
/// Every read of viewing history goes through the [`RecordStore`] trait so the
/// aggregation services never see the wire format of the backing index. The
/// production implementation talks to Elasticsearch; the in-memory one
/// evaluates the same queries over a vector and backs tests and demos.
use crate::{
    error::AppResult,
    models::{
        ProfileAggregates, RecordFilter, RecordQuery, SimilarProfile, TitleMatch, ViewingRecord,
    },
};

pub mod elasticsearch;
pub mod memory;

pub use elasticsearch::ElasticsearchStore;
pub use memory::InMemoryStore;

/// Cap for title lookups, matching the index's default result window
pub const TITLE_LOOKUP_LIMIT: usize = 10_000;

/// Number of top titles per content type in profile aggregates
pub const TOP_TITLES_PER_TYPE: usize = 5;

/// Read-only access to the viewing history
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch records matching the query's filter, up to its limit
    async fn find(&self, query: &RecordQuery) -> AppResult<Vec<ViewingRecord>>;

    /// Distinct years that contain at least one record, newest first
    async fn available_years(&self) -> AppResult<Vec<i32>>;

    /// Distinct non-blank profile names, trimmed and sorted
    async fn profile_names(&self) -> AppResult<Vec<String>>;

    /// Totals, per-type counts, top titles and time histograms for one profile
    async fn profile_aggregates(&self, profile_name: &str) -> AppResult<ProfileAggregates>;

    /// Count records of `titles` held by profiles other than `excluded_profile`
    ///
    /// Ranked by count descending, ties by name ascending, at most `size` entries.
    async fn profiles_sharing_titles(
        &self,
        titles: &[String],
        excluded_profile: &str,
        size: usize,
    ) -> AppResult<Vec<SimilarProfile>>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

/// Look up every record for a title
///
/// Tries an exact keyword match first and only falls back to the looser
/// all-tokens match when the exact one finds nothing.
pub async fn find_by_title(store: &dyn RecordStore, title: &str) -> AppResult<Vec<ViewingRecord>> {
    let exact = RecordQuery::new(
        RecordFilter {
            title: Some(TitleMatch::Exact(title.to_string())),
            ..Default::default()
        },
        TITLE_LOOKUP_LIMIT,
    );

    let records = store.find(&exact).await?;
    if !records.is_empty() {
        return Ok(records);
    }

    tracing::debug!(
        title = %title,
        store = store.name(),
        "No exact title match, falling back to token match"
    );

    let loose = RecordQuery::new(
        RecordFilter {
            title: Some(TitleMatch::AllTokens(title.to_string())),
            ..Default::default()
        },
        TITLE_LOOKUP_LIMIT,
    );

    store.find(&loose).await
}
