use crate::{
    error::AppResult,
    models::{
        ContentType, HourCount, MonthCount, ProfileAggregates, RecordQuery, SimilarProfile,
        SortOrder, TitleCount, ViewingRecord,
    },
    store::{RecordStore, TOP_TITLES_PER_TYPE},
};
use chrono::Timelike;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Record store over a fixed set of records held in memory
///
/// Mirrors the index's semantics: keyword equality for exact matches,
/// case-insensitive token containment for token matches, and terms-style
/// ranking (count descending, key ascending) for aggregations.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Vec<ViewingRecord>,
}

impl InMemoryStore {
    pub fn new(records: Vec<ViewingRecord>) -> Self {
        Self { records }
    }

    fn profile_records<'a>(
        &'a self,
        profile_name: &'a str,
    ) -> impl Iterator<Item = &'a ViewingRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.profile_name.as_deref() == Some(profile_name))
    }
}

/// Ranks keys the way a terms aggregation does
fn rank_terms(counts: HashMap<String, u64>, size: usize) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(size);
    ranked
}

fn top_titles<'a>(
    records: impl Iterator<Item = &'a ViewingRecord>,
    content_type: ContentType,
) -> Vec<TitleCount> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for record in records.filter(|r| r.content_type == content_type) {
        *counts.entry(record.title.clone()).or_default() += 1;
    }

    rank_terms(counts, TOP_TITLES_PER_TYPE)
        .into_iter()
        .map(|(title, count)| TitleCount { title, count })
        .collect()
}

#[async_trait::async_trait]
impl RecordStore for InMemoryStore {
    async fn find(&self, query: &RecordQuery) -> AppResult<Vec<ViewingRecord>> {
        let mut matched: Vec<ViewingRecord> = self
            .records
            .iter()
            .filter(|r| query.filter.matches(r))
            .cloned()
            .collect();

        if query.sort == SortOrder::NewestFirst {
            matched.sort_by(|a, b| b.date.cmp(&a.date));
        }
        matched.truncate(query.limit);

        Ok(matched)
    }

    async fn available_years(&self) -> AppResult<Vec<i32>> {
        let years: BTreeSet<i32> = self.records.iter().map(ViewingRecord::year).collect();
        Ok(years.into_iter().rev().collect())
    }

    async fn profile_names(&self) -> AppResult<Vec<String>> {
        let names: BTreeSet<String> = self
            .records
            .iter()
            .filter_map(ViewingRecord::profile)
            .map(|name| name.trim().to_string())
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn profile_aggregates(&self, profile_name: &str) -> AppResult<ProfileAggregates> {
        let mut aggregates = ProfileAggregates::default();
        let mut months: BTreeMap<String, u64> = BTreeMap::new();
        let mut hours: BTreeMap<u32, u64> = BTreeMap::new();

        for record in self.profile_records(profile_name) {
            aggregates.total_records += 1;
            aggregates.total_duration += record.duration;
            match record.content_type {
                ContentType::Movie => aggregates.movie_count += 1,
                ContentType::TvShow => aggregates.tv_show_count += 1,
            }
            *months
                .entry(record.date.format("%Y-%m").to_string())
                .or_default() += 1;
            *hours.entry(record.date.hour()).or_default() += 1;
        }

        aggregates.top_movies = top_titles(self.profile_records(profile_name), ContentType::Movie);
        aggregates.top_series = top_titles(self.profile_records(profile_name), ContentType::TvShow);
        aggregates.activity_over_time = months
            .into_iter()
            .map(|(date, count)| MonthCount { date, count })
            .collect();
        aggregates.activity_by_hour = hours
            .into_iter()
            .map(|(hour, count)| HourCount { hour, count })
            .collect();

        Ok(aggregates)
    }

    async fn profiles_sharing_titles(
        &self,
        titles: &[String],
        excluded_profile: &str,
        size: usize,
    ) -> AppResult<Vec<SimilarProfile>> {
        let wanted: HashSet<&str> = titles.iter().map(String::as_str).collect();
        let mut counts: HashMap<String, u64> = HashMap::new();

        for record in self.records.iter().filter(|r| wanted.contains(r.title.as_str())) {
            match record.profile() {
                Some(profile) if profile != excluded_profile => {
                    *counts.entry(profile.to_string()).or_default() += 1;
                }
                _ => {}
            }
        }

        Ok(rank_terms(counts, size)
            .into_iter()
            .map(|(name, score)| SimilarProfile { name, score })
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
