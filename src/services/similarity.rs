use crate::{models::SimilarProfile, store::RecordStore};

/// Number of similar profiles reported
pub const SIMILAR_PROFILES_LIMIT: usize = 5;

/// Rank other profiles by how many records they hold for `top_titles`
///
/// This is a best-effort enrichment: a store failure is logged and yields an
/// empty list instead of failing the surrounding request.
pub async fn similar_profiles(
    store: &dyn RecordStore,
    profile_name: &str,
    top_titles: &[String],
) -> Vec<SimilarProfile> {
    if top_titles.is_empty() {
        tracing::debug!(profile = %profile_name, "No top titles, skipping similar profiles");
        return Vec::new();
    }

    match store
        .profiles_sharing_titles(top_titles, profile_name, SIMILAR_PROFILES_LIMIT)
        .await
    {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::warn!(
                error = %e,
                profile = %profile_name,
                store = store.name(),
                "Similar profile lookup failed, returning no suggestions"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::store::MockRecordStore;

    #[test]
    fn test_empty_titles_skip_the_store() {
        let mut store = MockRecordStore::new();
        store.expect_profiles_sharing_titles().never();

        let result = tokio_test::block_on(similar_profiles(&store, "Kim", &[]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_failure_degrades_to_empty() {
        let mut store = MockRecordStore::new();
        store
            .expect_profiles_sharing_titles()
            .times(1)
            .returning(|_, _, _| Err(AppError::Retrieval("index down".to_string())));
        store.expect_name().return_const("mock");

        let titles = vec!["Dark".to_string()];
        let result = tokio_test::block_on(similar_profiles(&store, "Kim", &titles));
        assert!(result.is_empty());
    }

    #[test]
    fn test_passes_profile_and_limit_through() {
        let mut store = MockRecordStore::new();
        store
            .expect_profiles_sharing_titles()
            .withf(|titles, excluded, size| {
                titles.len() == 2 && excluded == "Kim" && *size == SIMILAR_PROFILES_LIMIT
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![SimilarProfile {
                    name: "Sam".to_string(),
                    score: 4,
                }])
            });

        let titles = vec!["Dark".to_string(), "Up".to_string()];
        let result = tokio_test::block_on(similar_profiles(&store, "Kim", &titles));
        assert_eq!(result[0].name, "Sam");
        assert_eq!(result[0].score, 4);
    }
}
