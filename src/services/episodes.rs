//! Season/episode extraction from free-text titles
//!
//! Streaming exports flatten series into titles such as
//! `"The Crown: Season 2: Misadventure (Episode 4)"` or
//! `"Lupin : Saison 1 : Chapitre 3"`. The rules below recover the season and
//! episode numbers in English and French, and rebuild a per-season view of a
//! series from its records.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::{
    error::AppResult,
    models::{ContentType, EpisodeInfo, RecordFilter, RecordQuery, SeasonInfo, TitleMatch, ViewingRecord},
    store::{RecordStore, TITLE_LOOKUP_LIMIT},
};

/// Season assigned to episodes whose title carries no season number
pub const UNKNOWN_SEASON: u32 = 0;

/// Season/episode numbers recovered from a title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeMarker {
    None,
    SeasonOnly(u32),
    SeasonAndEpisode(u32, u32),
}

impl EpisodeMarker {
    pub fn season(&self) -> Option<u32> {
        match self {
            EpisodeMarker::None => None,
            EpisodeMarker::SeasonOnly(season) | EpisodeMarker::SeasonAndEpisode(season, _) => {
                Some(*season)
            }
        }
    }

    pub fn episode(&self) -> Option<u32> {
        match self {
            EpisodeMarker::SeasonAndEpisode(_, episode) => Some(*episode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RuleKind {
    SeasonAndEpisode,
    SeasonOnly,
}

/// Ordered parse rules; the first matching rule wins
static MARKER_RULES: LazyLock<Vec<(Regex, RuleKind)>> = LazyLock::new(|| {
    [
        // "Season 2: Episode 3", "Saison 1 : Titre (Épisode 4)"
        (
            r"(?i)\b(?:season|saison)\s*(\d+)\b.*?\b(?:episode|épisode)\s*(\d+)",
            RuleKind::SeasonAndEpisode,
        ),
        // "S2 E3", "S02E03", "S1:E4"
        (
            r"(?i)\bS(\d{1,2})\s*[:.]?\s*E(\d{1,3})\b",
            RuleKind::SeasonAndEpisode,
        ),
        // "Season 1"
        (r"(?i)\b(?:season|saison)\s*(\d+)\b", RuleKind::SeasonOnly),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).expect("Invalid episode marker regex"), kind))
    .collect()
});

/// Suffixes stripped, in order, to recover a series name from an episode title
static SERIES_SUFFIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\s*:\s*(?:saison|season)\s+\d+.*$",
        r"(?i)\s*:\s*(?:épisode|episode).*$",
        r"\s*\(.*\)$",
        r"(?i)\s*-\s*(?:saison|season).*$",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid series suffix regex"))
    .collect()
});

/// Extract season and episode numbers from a title
pub fn parse_episode_marker(title: &str) -> EpisodeMarker {
    for (regex, kind) in MARKER_RULES.iter() {
        let Some(captures) = regex.captures(title) else {
            continue;
        };

        let number = |group: usize| {
            captures
                .get(group)
                .and_then(|m| m.as_str().parse::<u32>().ok())
        };

        let parsed = match kind {
            RuleKind::SeasonAndEpisode => number(1)
                .zip(number(2))
                .map(|(season, episode)| EpisodeMarker::SeasonAndEpisode(season, episode)),
            RuleKind::SeasonOnly => number(1).map(EpisodeMarker::SeasonOnly),
        };

        if let Some(marker) = parsed {
            return marker;
        }
    }

    EpisodeMarker::None
}

/// Strip season, episode and parenthetical suffixes from a title
pub fn series_base_name(title: &str) -> String {
    SERIES_SUFFIXES
        .iter()
        .fold(title.to_string(), |name, regex| {
            regex.replace(&name, "").into_owned()
        })
        .trim()
        .to_string()
}

/// Display title of an episode: the last `": "`-separated segment
pub fn episode_title(title: &str) -> String {
    title
        .rsplit(": ")
        .next()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .unwrap_or(title)
        .to_string()
}

/// Group TV records by parsed season
///
/// Seasons ascend with [`UNKNOWN_SEASON`] first. Within a season, numbered
/// episodes come first ordered by episode number, then unnumbered ones; both
/// fall back to viewing date.
pub fn group_into_seasons(records: &[ViewingRecord]) -> Vec<SeasonInfo> {
    let mut seasons: BTreeMap<u32, Vec<EpisodeInfo>> = BTreeMap::new();

    for record in records {
        let marker = parse_episode_marker(&record.title);
        let season_number = marker.season().unwrap_or(UNKNOWN_SEASON);

        seasons.entry(season_number).or_default().push(EpisodeInfo {
            episode_title: episode_title(&record.title),
            season: marker.season(),
            episode: marker.episode(),
            viewed_date: record.date,
            duration: record.duration,
            profile_name: record.profile().map(str::to_string),
        });
    }

    seasons
        .into_iter()
        .map(|(season_number, mut episodes)| {
            episodes.sort_by_key(|e| (e.episode.is_none(), e.episode.unwrap_or(0), e.viewed_date));
            SeasonInfo {
                season_number,
                episodes,
            }
        })
        .collect()
}

/// Widen a title lookup to the whole series it belongs to
///
/// A title lookup for a TV show often lands on a single episode. The series
/// name is recovered from `title` and re-queried; the broader result replaces
/// `records` only when it is strictly larger.
pub async fn expand_series(
    store: &dyn RecordStore,
    title: &str,
    records: Vec<ViewingRecord>,
) -> AppResult<Vec<ViewingRecord>> {
    let is_series = records
        .first()
        .is_some_and(|r| r.content_type == ContentType::TvShow);
    if !is_series {
        return Ok(records);
    }

    let base_name = series_base_name(title);
    if base_name.is_empty() {
        tracing::debug!(title = %title, "Empty series name, skipping series expansion");
        return Ok(records);
    }

    let query = RecordQuery::new(
        RecordFilter {
            content_type: Some(ContentType::TvShow),
            title: Some(TitleMatch::AllTokens(base_name.clone())),
            ..Default::default()
        },
        TITLE_LOOKUP_LIMIT,
    );
    let series = store.find(&query).await?;

    if series.len() > records.len() {
        tracing::info!(
            title = %title,
            series = %base_name,
            matched = records.len(),
            series_records = series.len(),
            "Title matched part of a series, using full series history"
        );
        Ok(series)
    } else {
        tracing::debug!(
            title = %title,
            series = %base_name,
            matched = records.len(),
            series_records = series.len(),
            "Series query found nothing new, keeping title matches"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{test_support::record, MockRecordStore};

    #[test]
    fn test_parse_season_and_episode() {
        assert_eq!(
            parse_episode_marker("Show: Season 2: Episode 3"),
            EpisodeMarker::SeasonAndEpisode(2, 3)
        );
    }

    #[test]
    fn test_parse_season_only() {
        let marker = parse_episode_marker("Show: Season 1");
        assert_eq!(marker, EpisodeMarker::SeasonOnly(1));
        assert_eq!(marker.episode(), None);
    }

    #[test]
    fn test_parse_nothing() {
        let marker = parse_episode_marker("Random Movie");
        assert_eq!(marker, EpisodeMarker::None);
        assert_eq!(marker.season(), None);
    }

    #[test]
    fn test_parse_french_vocabulary() {
        assert_eq!(
            parse_episode_marker("Lupin : Saison 1 : Chapitre 1 (Épisode 1)"),
            EpisodeMarker::SeasonAndEpisode(1, 1)
        );
        assert_eq!(
            parse_episode_marker("Dix pour cent : Saison 4"),
            EpisodeMarker::SeasonOnly(4)
        );
    }

    #[test]
    fn test_parse_compact_form() {
        assert_eq!(
            parse_episode_marker("Dark S01E05"),
            EpisodeMarker::SeasonAndEpisode(1, 5)
        );
        assert_eq!(
            parse_episode_marker("Dark: S2 E8"),
            EpisodeMarker::SeasonAndEpisode(2, 8)
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        for title in [
            "Show: Season 2: Episode 3",
            "The Crown: Season 3: Aberfan",
            "Random Movie",
        ] {
            assert_eq!(parse_episode_marker(title), parse_episode_marker(title));
        }
    }

    #[test]
    fn test_series_base_name() {
        assert_eq!(series_base_name("The Crown: Season 2: Misadventure"), "The Crown");
        assert_eq!(series_base_name("Lupin : Saison 1 : Chapitre 3"), "Lupin");
        assert_eq!(series_base_name("Chernobyl: Episode 2"), "Chernobyl");
        assert_eq!(series_base_name("Narcos (Limited Series)"), "Narcos");
        assert_eq!(series_base_name("Elite - Season 3"), "Elite");
        assert_eq!(series_base_name("Dark"), "Dark");
    }

    #[test]
    fn test_episode_title_takes_last_segment() {
        assert_eq!(episode_title("The Crown: Season 2: Misadventure"), "Misadventure");
        assert_eq!(episode_title("Inception"), "Inception");
    }

    #[test]
    fn test_group_into_seasons_orders_seasons_and_episodes() {
        let records = vec![
            record("Show: Season 2: Episode 3", "2022-01-03T20:00:00Z", 100, ContentType::TvShow, "A"),
            record("Show: Season 1: Episode 2", "2022-01-02T20:00:00Z", 100, ContentType::TvShow, "A"),
            record("Show: Season 1: Episode 1", "2022-01-05T20:00:00Z", 100, ContentType::TvShow, "A"),
            record("Show: Season 1: Pilot", "2022-01-01T20:00:00Z", 100, ContentType::TvShow, "A"),
            record("Show: Special", "2022-01-04T20:00:00Z", 100, ContentType::TvShow, "A"),
        ];

        let seasons = group_into_seasons(&records);
        let numbers: Vec<u32> = seasons.iter().map(|s| s.season_number).collect();
        assert_eq!(numbers, vec![UNKNOWN_SEASON, 1, 2]);

        let first_season: Vec<Option<u32>> =
            seasons[1].episodes.iter().map(|e| e.episode).collect();
        assert_eq!(first_season, vec![Some(1), Some(2), None]);
        assert_eq!(seasons[1].episodes[2].episode_title, "Pilot");
        assert_eq!(seasons[0].episodes[0].season, None);
    }

    #[tokio::test]
    async fn test_expand_series_replaces_with_larger_set() {
        let mut store = MockRecordStore::new();
        store
            .expect_find()
            .withf(|q| {
                q.filter.content_type == Some(ContentType::TvShow)
                    && q.filter.title == Some(TitleMatch::AllTokens("Show".to_string()))
            })
            .times(1)
            .returning(|_| {
                Ok(vec![
                    record("Show: Season 1: Episode 1", "2022-01-01T20:00:00Z", 100, ContentType::TvShow, "A"),
                    record("Show: Season 1: Episode 2", "2022-01-02T20:00:00Z", 100, ContentType::TvShow, "A"),
                ])
            });

        let original = vec![record(
            "Show: Season 1: Episode 1",
            "2022-01-01T20:00:00Z",
            100,
            ContentType::TvShow,
            "A",
        )];
        let expanded = expand_series(&store, "Show: Season 1: Episode 1", original)
            .await
            .unwrap();
        assert_eq!(expanded.len(), 2);
    }

    #[tokio::test]
    async fn test_expand_series_keeps_original_when_not_larger() {
        let mut store = MockRecordStore::new();
        store.expect_find().times(1).returning(|_| Ok(vec![]));

        let original = vec![record("Show: Season 1", "2022-01-01T20:00:00Z", 100, ContentType::TvShow, "A")];
        let kept = expand_series(&store, "Show: Season 1", original.clone())
            .await
            .unwrap();
        assert_eq!(kept, original);
    }

    #[tokio::test]
    async fn test_expand_series_skips_movies() {
        let mut store = MockRecordStore::new();
        store.expect_find().never();

        let original = vec![record("Up", "2022-01-01T20:00:00Z", 100, ContentType::Movie, "A")];
        let kept = expand_series(&store, "Up", original.clone()).await.unwrap();
        assert_eq!(kept, original);
    }
}
