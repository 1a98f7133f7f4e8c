use crate::{
    error::AppResult,
    models::{ContentType, RecordFilter, RecordQuery, ViewingRecord},
    store::RecordStore,
};

/// Most recent viewing records, optionally restricted to one content type
pub async fn recent_history(
    store: &dyn RecordStore,
    content_type: Option<ContentType>,
    limit: usize,
) -> AppResult<Vec<ViewingRecord>> {
    let filter = RecordFilter {
        content_type,
        ..Default::default()
    };
    store
        .find(&RecordQuery::new(filter, limit).newest_first())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{test_support::record, InMemoryStore};

    #[tokio::test]
    async fn test_recent_history_filters_by_type() {
        let store = InMemoryStore::new(vec![
            record("Up", "2021-01-01T20:00:00Z", 10, ContentType::Movie, "Kim"),
            record("Dark: Season 1: Lies", "2021-02-01T20:00:00Z", 10, ContentType::TvShow, "Kim"),
            record("Heat", "2022-01-01T20:00:00Z", 10, ContentType::Movie, "Kim"),
        ]);

        let movies = recent_history(&store, Some(ContentType::Movie), 100)
            .await
            .unwrap();
        let titles: Vec<&str> = movies.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Heat", "Up"]);

        let latest = recent_history(&store, None, 1).await.unwrap();
        assert_eq!(latest[0].title, "Heat");
    }
}
