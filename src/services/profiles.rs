use chrono::{DateTime, Datelike, Duration, Utc};
use std::collections::{BTreeMap, HashSet};

use crate::{
    error::{AppError, AppResult},
    models::{
        ActivityDataPoint, ContentType, ProfileOverview, ProfileStats, RecordFilter, RecordQuery,
        Timeframe, TopContentItem, ViewingRecord,
    },
    services::{
        grouping::{mode, OrderedGroups},
        similarity,
    },
    store::RecordStore,
};

/// Maximum records fetched for a single profile
pub const PROFILE_HISTORY_LIMIT: usize = 10_000;

const UNKNOWN: &str = "Unknown";

fn not_found(profile_name: &str) -> AppError {
    AppError::NotFound(format!("No history found for profile: {}", profile_name))
}

async fn profile_history(
    store: &dyn RecordStore,
    profile_name: &str,
) -> AppResult<Vec<ViewingRecord>> {
    let filter = RecordFilter {
        profile_name: Some(profile_name.to_string()),
        ..Default::default()
    };
    store
        .find(&RecordQuery::new(filter, PROFILE_HISTORY_LIMIT).newest_first())
        .await
}

/// Most frequent non-blank value, or `Unknown` when every value is blank
fn most_common<'a>(values: impl Iterator<Item = &'a str>) -> String {
    mode(values.filter(|value| !value.trim().is_empty())).unwrap_or_else(|| UNKNOWN.to_string())
}

/// Headline statistics over a profile's records
pub fn profile_stats(profile_name: &str, records: &[ViewingRecord]) -> AppResult<ProfileStats> {
    let (Some(first_view_date), Some(last_view_date)) = (
        records.iter().map(|r| r.date).min(),
        records.iter().map(|r| r.date).max(),
    ) else {
        return Err(not_found(profile_name));
    };

    let count_of = |content_type: ContentType| {
        records
            .iter()
            .filter(|r| r.content_type == content_type)
            .count() as u64
    };
    let unique_titles: HashSet<&str> = records.iter().map(|r| r.title.as_str()).collect();

    Ok(ProfileStats {
        profile_name: profile_name.to_string(),
        total_views: records.len() as u64,
        total_watch_time_seconds: records.iter().map(|r| r.duration).sum(),
        unique_titles: unique_titles.len() as u64,
        movie_count: count_of(ContentType::Movie),
        tv_show_count: count_of(ContentType::TvShow),
        first_view_date,
        last_view_date,
        top_device_type: most_common(records.iter().map(|r| r.device_type.as_str())),
        top_country: most_common(records.iter().map(|r| r.country.as_str())),
    })
}

/// Most watched titles, by number of viewing records
pub fn top_content(records: &[ViewingRecord], limit: usize) -> Vec<TopContentItem> {
    let mut groups: OrderedGroups<TopContentItem> = OrderedGroups::new();

    for record in records {
        let item = groups.entry_or_insert_with(&record.title, || TopContentItem {
            title: record.title.clone(),
            content_type: record.content_type,
            view_count: 0,
            total_duration: 0,
            last_viewed_date: record.date,
        });
        item.view_count += 1;
        item.total_duration += record.duration;
        if record.date > item.last_viewed_date {
            item.last_viewed_date = record.date;
        }
    }

    let mut items = groups.into_values();
    items.sort_by(|a, b| b.view_count.cmp(&a.view_count));
    items.truncate(limit);
    items
}

/// Bucket key of a date for the given timeframe (UTC)
pub fn bucket_key(date: DateTime<Utc>, timeframe: Timeframe) -> String {
    match timeframe {
        Timeframe::Day => date.format("%Y-%m-%d").to_string(),
        Timeframe::Week => {
            let days_since_sunday = i64::from(date.weekday().num_days_from_sunday());
            (date.date_naive() - Duration::days(days_since_sunday))
                .format("%Y-%m-%d")
                .to_string()
        }
        Timeframe::Month => date.format("%Y-%m").to_string(),
    }
}

/// Views and watch time per bucket, oldest bucket first
pub fn activity_timeline(records: &[ViewingRecord], timeframe: Timeframe) -> Vec<ActivityDataPoint> {
    let mut buckets: BTreeMap<String, (u64, u64)> = BTreeMap::new();

    for record in records {
        let bucket = buckets
            .entry(bucket_key(record.date, timeframe))
            .or_default();
        bucket.0 += 1;
        bucket.1 += record.duration;
    }

    buckets
        .into_iter()
        .map(|(date, (view_count, total_duration))| ActivityDataPoint {
            date,
            view_count,
            total_duration,
        })
        .collect()
}

pub async fn list_profiles(store: &dyn RecordStore) -> AppResult<Vec<String>> {
    store.profile_names().await
}

pub async fn get_profile_stats(
    store: &dyn RecordStore,
    profile_name: &str,
) -> AppResult<ProfileStats> {
    let records = profile_history(store, profile_name).await?;
    profile_stats(profile_name, &records)
}

pub async fn get_top_content(
    store: &dyn RecordStore,
    profile_name: &str,
    limit: usize,
) -> AppResult<Vec<TopContentItem>> {
    let records = profile_history(store, profile_name).await?;
    Ok(top_content(&records, limit))
}

pub async fn get_activity(
    store: &dyn RecordStore,
    profile_name: &str,
    timeframe: Timeframe,
) -> AppResult<Vec<ActivityDataPoint>> {
    let records = profile_history(store, profile_name).await?;
    let timeline = activity_timeline(&records, timeframe);

    tracing::debug!(
        profile = %profile_name,
        records = records.len(),
        buckets = timeline.len(),
        ?timeframe,
        "Activity timeline built"
    );

    Ok(timeline)
}

/// Dashboard overview built from index aggregations plus similar profiles
pub async fn get_profile_overview(
    store: &dyn RecordStore,
    profile_name: &str,
) -> AppResult<ProfileOverview> {
    let aggregates = store.profile_aggregates(profile_name).await?;
    if aggregates.total_records == 0 {
        return Err(not_found(profile_name));
    }

    let top_titles: Vec<String> = aggregates
        .top_movies
        .iter()
        .chain(aggregates.top_series.iter())
        .map(|t| t.title.clone())
        .collect();
    let similar_profiles = similarity::similar_profiles(store, profile_name, &top_titles).await;

    Ok(ProfileOverview {
        profile_name: profile_name.to_string(),
        total_movies: aggregates.movie_count,
        total_series: aggregates.tv_show_count,
        total_duration: aggregates.total_duration,
        top_movies: aggregates.top_movies,
        top_series: aggregates.top_series,
        activity_over_time: aggregates.activity_over_time,
        activity_by_hour: aggregates.activity_by_hour,
        similar_profiles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileAggregates;
    use crate::store::{test_support::record, InMemoryStore, MockRecordStore};

    fn kim_records() -> Vec<ViewingRecord> {
        let mut on_phone = record("Up", "2024-03-09T23:30:00Z", 600, ContentType::Movie, "Kim");
        on_phone.device_type = "Phone".to_string();
        on_phone.country = "FR (France)".to_string();
        vec![
            record("Dark: Season 1: Secrets", "2024-03-10T20:00:00Z", 3000, ContentType::TvShow, "Kim"),
            record("Dark: Season 1: Lies", "2024-03-12T21:00:00Z", 2800, ContentType::TvShow, "Kim"),
            on_phone,
            record("Up", "2024-04-02T19:00:00Z", 5000, ContentType::Movie, "Kim"),
            record("Up", "2024-04-03T19:00:00Z", 400, ContentType::Movie, "Kim"),
        ]
    }

    #[test]
    fn test_profile_stats() {
        let stats = profile_stats("Kim", &kim_records()).unwrap();

        assert_eq!(stats.total_views, 5);
        assert_eq!(stats.total_watch_time_seconds, 11_800);
        assert_eq!(stats.unique_titles, 3);
        assert_eq!(stats.movie_count, 3);
        assert_eq!(stats.tv_show_count, 2);
        assert_eq!(stats.first_view_date.to_rfc3339(), "2024-03-09T23:30:00+00:00");
        assert_eq!(stats.last_view_date.to_rfc3339(), "2024-04-03T19:00:00+00:00");
        assert_eq!(stats.top_device_type, "Smart TV");
        assert_eq!(stats.top_country, "US (United States)");
    }

    #[test]
    fn test_blank_device_and_country_are_not_reported() {
        let mut records = kim_records();
        for record in records.iter_mut() {
            record.device_type = String::new();
            record.country = String::new();
        }
        records[0].country = "FR (France)".to_string();

        let stats = profile_stats("Kim", &records).unwrap();
        assert_eq!(stats.top_device_type, "Unknown");
        assert_eq!(stats.top_country, "FR (France)");
    }

    #[test]
    fn test_profile_stats_of_nothing_is_not_found() {
        assert!(matches!(
            profile_stats("Ghost", &[]),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_top_content_ranks_and_limits() {
        let top = top_content(&kim_records(), 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].title, "Up");
        assert_eq!(top[0].view_count, 3);
        assert_eq!(top[0].total_duration, 6000);
        assert_eq!(top[0].last_viewed_date.to_rfc3339(), "2024-04-03T19:00:00+00:00");
        assert_eq!(top[1].title, "Dark: Season 1: Secrets");
    }

    #[test]
    fn test_bucket_keys() {
        let saturday = DateTime::parse_from_rfc3339("2024-03-09T23:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(bucket_key(saturday, Timeframe::Day), "2024-03-09");
        assert_eq!(bucket_key(saturday, Timeframe::Week), "2024-03-03");
        assert_eq!(bucket_key(saturday, Timeframe::Month), "2024-03");

        let sunday = DateTime::parse_from_rfc3339("2024-03-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(bucket_key(sunday, Timeframe::Week), "2024-03-10");
    }

    #[test]
    fn test_activity_buckets_partition_records() {
        let records = kim_records();
        for timeframe in [Timeframe::Day, Timeframe::Week, Timeframe::Month] {
            let timeline = activity_timeline(&records, timeframe);
            let views: u64 = timeline.iter().map(|p| p.view_count).sum();
            assert_eq!(views, records.len() as u64);

            for pair in timeline.windows(2) {
                assert!(pair[0].date < pair[1].date);
            }
        }

        let weekly = activity_timeline(&records, Timeframe::Week);
        assert_eq!(weekly.len(), 3);
        assert_eq!(weekly[0].date, "2024-03-03");
        assert_eq!(weekly[0].total_duration, 600);

        let monthly = activity_timeline(&records, Timeframe::Month);
        assert_eq!(monthly[1].date, "2024-04");
        assert_eq!(monthly[1].view_count, 2);
    }

    #[tokio::test]
    async fn test_overview_combines_aggregates_and_similar_profiles() {
        let mut records = kim_records();
        records.push(record("Up", "2024-05-01T20:00:00Z", 100, ContentType::Movie, "Sam"));
        let store = InMemoryStore::new(records);

        let overview = get_profile_overview(&store, "Kim").await.unwrap();
        assert_eq!(overview.total_movies, 3);
        assert_eq!(overview.total_series, 2);
        assert_eq!(overview.total_duration, 11_800);
        assert_eq!(overview.top_movies[0].title, "Up");
        assert_eq!(overview.similar_profiles[0].name, "Sam");
    }

    #[tokio::test]
    async fn test_overview_of_unknown_profile_is_not_found() {
        let mut store = MockRecordStore::new();
        store
            .expect_profile_aggregates()
            .returning(|_| Ok(ProfileAggregates::default()));
        store.expect_profiles_sharing_titles().never();

        let result = get_profile_overview(&store, "Ghost").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_profile_stats_reads_only_that_profile() {
        let mut records = kim_records();
        records.push(record("Heat", "2024-05-01T20:00:00Z", 100, ContentType::Movie, "Sam"));
        let store = InMemoryStore::new(records);

        let stats = get_profile_stats(&store, "Kim").await.unwrap();
        assert_eq!(stats.total_views, 5);
    }
}
