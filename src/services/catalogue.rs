use crate::{
    error::AppResult,
    models::{CatalogueEntry, RecordFilter, RecordQuery, ViewingRecord},
    services::grouping::OrderedGroups,
    store::RecordStore,
};

/// Maximum records aggregated into one catalogue listing
pub const CATALOGUE_FETCH_LIMIT: usize = 10_000;

/// Collapse records into one entry per exact title
///
/// Entries are ordered by first viewing, most recent first. Titles whose
/// first viewing is the same instant keep the order they were first seen in.
pub fn group_catalogue(records: &[ViewingRecord]) -> Vec<CatalogueEntry> {
    let mut groups: OrderedGroups<CatalogueEntry> = OrderedGroups::new();

    for record in records {
        let entry = groups.entry_or_insert_with(&record.title, || CatalogueEntry {
            title: record.title.clone(),
            content_type: record.content_type,
            first_viewed_date: record.date,
            total_views: 0,
            total_duration: 0,
        });
        entry.total_views += 1;
        entry.total_duration += record.duration;
        if record.date < entry.first_viewed_date {
            entry.first_viewed_date = record.date;
        }
    }

    let mut entries = groups.into_values();
    entries.sort_by(|a, b| b.first_viewed_date.cmp(&a.first_viewed_date));
    entries
}

/// Catalogue of distinct titles matching the filter
pub async fn get_catalogue(
    store: &dyn RecordStore,
    filter: RecordFilter,
) -> AppResult<Vec<CatalogueEntry>> {
    let query = RecordQuery::new(filter, CATALOGUE_FETCH_LIMIT).newest_first();
    let records = store.find(&query).await?;
    let entries = group_catalogue(&records);

    tracing::info!(
        records = records.len(),
        titles = entries.len(),
        "Catalogue built"
    );

    Ok(entries)
}

/// Years offered by the catalogue's year filter
pub async fn available_years(store: &dyn RecordStore) -> AppResult<Vec<i32>> {
    store.available_years().await
}
