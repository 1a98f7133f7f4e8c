use std::collections::BTreeSet;

use crate::{
    error::{AppError, AppResult},
    models::{ContentDetails, ContentType, ProfileBreakdown, ProfileView, ViewingRecord},
    services::{episodes, grouping::OrderedGroups},
    store::{self, RecordStore},
};

/// All records for a title, widened to the full series for TV shows
async fn title_history(store: &dyn RecordStore, title: &str) -> AppResult<Vec<ViewingRecord>> {
    let records = store::find_by_title(store, title).await?;
    episodes::expand_series(store, title, records).await
}

fn distinct_non_empty<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Aggregate every record of a title into its details view
///
/// Records without a profile name count towards the totals but are left out
/// of the profile set and breakdown.
pub fn content_details(title: &str, records: &[ViewingRecord]) -> AppResult<ContentDetails> {
    let (Some(first_viewed_date), Some(last_viewed_date)) = (
        records.iter().map(|r| r.date).min(),
        records.iter().map(|r| r.date).max(),
    ) else {
        return Err(AppError::NotFound(format!(
            "No viewing history found for title: {}",
            title
        )));
    };
    let content_type = records[0].content_type;

    let mut by_profile: OrderedGroups<ProfileBreakdown> = OrderedGroups::new();
    for record in records {
        let Some(profile) = record.profile() else {
            continue;
        };
        let breakdown = by_profile.entry_or_insert_with(profile, || ProfileBreakdown {
            profile_name: profile.to_string(),
            view_count: 0,
            total_duration: 0,
        });
        breakdown.view_count += 1;
        breakdown.total_duration += record.duration;
    }

    let seasons = (content_type == ContentType::TvShow).then(|| episodes::group_into_seasons(records));

    Ok(ContentDetails {
        title: title.to_string(),
        content_type,
        total_views: records.len() as u64,
        total_duration: records.iter().map(|r| r.duration).sum(),
        first_viewed_date,
        last_viewed_date,
        unique_profiles: distinct_non_empty(records.iter().filter_map(ViewingRecord::profile)),
        views_by_profile: by_profile.into_values(),
        device_types: distinct_non_empty(records.iter().map(|r| r.device_type.as_str())),
        countries: distinct_non_empty(records.iter().map(|r| r.country.as_str())),
        seasons,
    })
}

/// Per-profile summary of a title's records, most views first
pub fn content_profiles(records: &[ViewingRecord]) -> Vec<ProfileView> {
    let mut groups: OrderedGroups<ProfileView> = OrderedGroups::new();

    for record in records {
        let Some(profile) = record.profile() else {
            continue;
        };
        let view = groups.entry_or_insert_with(profile, || ProfileView {
            profile_name: profile.to_string(),
            view_count: 0,
            total_duration: 0,
            last_viewed_date: record.date,
        });
        view.view_count += 1;
        view.total_duration += record.duration;
        if record.date > view.last_viewed_date {
            view.last_viewed_date = record.date;
        }
    }

    let mut views = groups.into_values();
    views.sort_by(|a, b| b.view_count.cmp(&a.view_count));
    views
}

pub async fn get_content_details(
    store: &dyn RecordStore,
    title: &str,
) -> AppResult<ContentDetails> {
    let records = title_history(store, title).await?;
    let details = content_details(title, &records)?;

    tracing::info!(
        title = %title,
        records = records.len(),
        seasons = details.seasons.as_ref().map_or(0, Vec::len),
        "Content details built"
    );

    Ok(details)
}

pub async fn get_content_profiles(
    store: &dyn RecordStore,
    title: &str,
) -> AppResult<Vec<ProfileView>> {
    let records = title_history(store, title).await?;
    Ok(content_profiles(&records))
}
