/// Elasticsearch-backed record store
///
/// Talks to the `_search` endpoint of a single index over plain HTTP. Queries
/// are built as query-DSL JSON; hits and aggregation buckets are decoded into
/// typed structs so a malformed response surfaces as a retrieval error instead
/// of silently producing empty view models.
///
/// Keyword sub-fields (`title.keyword`, `type.keyword`, `profileName.keyword`)
/// are used for exact matches and terms aggregations, the analysed `title`
/// field for token matches.
use crate::{
    error::{AppError, AppResult},
    models::{
        ContentType, HourCount, MonthCount, ProfileAggregates, RecordFilter, RecordQuery,
        SimilarProfile, SortOrder, TitleCount, TitleMatch, ViewingRecord,
    },
    store::{RecordStore, TOP_TITLES_PER_TYPE},
};
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Upper bound on distinct profiles returned by the names aggregation
const PROFILE_NAMES_SIZE: usize = 1000;

#[derive(Clone)]
pub struct ElasticsearchStore {
    http_client: HttpClient,
    base_url: String,
    index: String,
}

impl ElasticsearchStore {
    /// Creates a store for `index` on the node at `base_url`
    pub fn new(base_url: &str, index: &str, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        tracing::info!(url = %base_url, index = %index, "Elasticsearch store configured");

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/{}/_search", self.base_url, self.index)
    }

    /// Runs a search request and decodes the response body
    async fn search<T: DeserializeOwned>(&self, body: Value) -> AppResult<T> {
        tracing::debug!(index = %self.index, query = %body, "Sending search request");

        let response = self
            .http_client
            .post(self.search_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Elasticsearch unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval(format!(
                "Elasticsearch returned status {}: {}",
                status, body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to read Elasticsearch response: {}", e)))?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                index = %self.index,
                "Failed to deserialize Elasticsearch response"
            );
            AppError::Retrieval(format!("Malformed Elasticsearch response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl RecordStore for ElasticsearchStore {
    async fn find(&self, query: &RecordQuery) -> AppResult<Vec<ViewingRecord>> {
        let response: HitsResponse = self.search(search_body(query)).await?;

        let records: Vec<ViewingRecord> = response
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| hit.source)
            .collect();

        tracing::debug!(
            returned = records.len(),
            limit = query.limit,
            "Record search completed"
        );

        Ok(records)
    }

    async fn available_years(&self) -> AppResult<Vec<i32>> {
        let response: AggResponse<YearsAggs> = self.search(years_body()).await?;

        response
            .aggregations
            .years
            .buckets
            .into_iter()
            .map(|bucket| {
                bucket.key_as_string.parse::<i32>().map_err(|_| {
                    AppError::Retrieval(format!("Invalid year bucket: {}", bucket.key_as_string))
                })
            })
            .collect()
    }

    async fn profile_names(&self) -> AppResult<Vec<String>> {
        let response: AggResponse<ProfileNamesAggs> =
            self.search(profile_names_body()).await?;

        let mut names: Vec<String> = response
            .aggregations
            .profiles
            .buckets
            .into_iter()
            .filter_map(|bucket| bucket.key_string())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();

        Ok(names)
    }

    async fn profile_aggregates(&self, profile_name: &str) -> AppResult<ProfileAggregates> {
        let response: AggResponse<ProfileAggs> =
            self.search(profile_aggregates_body(profile_name)).await?;
        let aggs = response.aggregations;

        let type_count = |content_type: ContentType| {
            aggs.by_type
                .buckets
                .iter()
                .find(|b| b.key_string().as_deref() == Some(content_type.as_str()))
                .map(|b| b.doc_count)
                .unwrap_or(0)
        };
        let movie_count = type_count(ContentType::Movie);
        let tv_show_count = type_count(ContentType::TvShow);

        let activity_by_hour = aggs
            .activity_by_hour
            .buckets
            .iter()
            .map(|bucket| {
                bucket
                    .key_u32()
                    .map(|hour| HourCount {
                        hour,
                        count: bucket.doc_count,
                    })
                    .ok_or_else(|| {
                        AppError::Retrieval(format!("Invalid hour bucket: {}", bucket.key))
                    })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(ProfileAggregates {
            total_records: response.hits.total.value,
            total_duration: aggs.total_duration.value.unwrap_or(0.0).max(0.0) as u64,
            movie_count,
            tv_show_count,
            top_movies: aggs.top_movies.titles.into_title_counts(),
            top_series: aggs.top_series.titles.into_title_counts(),
            activity_over_time: aggs
                .activity_over_time
                .buckets
                .into_iter()
                .map(|bucket| MonthCount {
                    date: bucket.key_as_string,
                    count: bucket.doc_count,
                })
                .collect(),
            activity_by_hour,
        })
    }

    async fn profiles_sharing_titles(
        &self,
        titles: &[String],
        excluded_profile: &str,
        size: usize,
    ) -> AppResult<Vec<SimilarProfile>> {
        let response: AggResponse<ProfileNamesAggs> = self
            .search(shared_titles_body(titles, excluded_profile, size))
            .await?;

        Ok(response
            .aggregations
            .profiles
            .buckets
            .into_iter()
            .filter_map(|bucket| {
                let name = bucket.key_string()?;
                (!name.trim().is_empty()).then_some(SimilarProfile {
                    name,
                    score: bucket.doc_count,
                })
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "elasticsearch"
    }
}

// ============================================================================
// Query DSL
// ============================================================================

fn filter_clauses(filter: &RecordFilter) -> Vec<Value> {
    let mut must = Vec::new();

    if let Some(content_type) = filter.content_type {
        must.push(json!({ "term": { "type.keyword": content_type.as_str() } }));
    }

    if let Some(year) = filter.year {
        must.push(json!({
            "range": {
                "date": {
                    "gte": format!("{}-01-01", year),
                    "lte": format!("{}-12-31T23:59:59", year)
                }
            }
        }));
    }

    match &filter.title {
        Some(TitleMatch::Exact(title)) => {
            must.push(json!({ "term": { "title.keyword": title } }));
        }
        Some(TitleMatch::AllTokens(text)) => {
            must.push(json!({
                "match": { "title": { "query": text, "operator": "and" } }
            }));
        }
        None => {}
    }

    if let Some(profile) = &filter.profile_name {
        must.push(json!({ "term": { "profileName.keyword": profile } }));
    }

    must
}

fn query_for(filter: &RecordFilter) -> Value {
    let must = filter_clauses(filter);
    if must.is_empty() {
        json!({ "match_all": {} })
    } else {
        json!({ "bool": { "must": must } })
    }
}

fn search_body(query: &RecordQuery) -> Value {
    let mut body = json!({
        "query": query_for(&query.filter),
        "size": query.limit,
    });

    if query.sort == SortOrder::NewestFirst {
        body["sort"] = json!([{ "date": { "order": "desc" } }]);
    }

    body
}

fn years_body() -> Value {
    json!({
        "size": 0,
        "aggs": {
            "years": {
                "date_histogram": {
                    "field": "date",
                    "calendar_interval": "year",
                    "format": "yyyy",
                    "min_doc_count": 1,
                    "order": { "_key": "desc" }
                }
            }
        }
    })
}

fn profile_names_body() -> Value {
    json!({
        "size": 0,
        "aggs": {
            "profiles": {
                "terms": {
                    "field": "profileName.keyword",
                    "size": PROFILE_NAMES_SIZE,
                    "order": { "_key": "asc" }
                }
            }
        }
    })
}

fn top_titles_agg(content_type: ContentType) -> Value {
    json!({
        "filter": { "term": { "type.keyword": content_type.as_str() } },
        "aggs": {
            "titles": {
                "terms": { "field": "title.keyword", "size": TOP_TITLES_PER_TYPE }
            }
        }
    })
}

fn profile_aggregates_body(profile_name: &str) -> Value {
    json!({
        "size": 0,
        "track_total_hits": true,
        "query": { "term": { "profileName.keyword": profile_name } },
        "aggs": {
            "total_duration": { "sum": { "field": "duration" } },
            "by_type": { "terms": { "field": "type.keyword" } },
            "top_movies": top_titles_agg(ContentType::Movie),
            "top_series": top_titles_agg(ContentType::TvShow),
            "activity_over_time": {
                "date_histogram": {
                    "field": "date",
                    "calendar_interval": "month",
                    "format": "yyyy-MM",
                    "min_doc_count": 1
                }
            },
            "activity_by_hour": {
                "terms": {
                    "script": "doc['date'].value.getHour()",
                    "size": 24,
                    "order": { "_key": "asc" }
                }
            }
        }
    })
}

fn shared_titles_body(titles: &[String], excluded_profile: &str, size: usize) -> Value {
    json!({
        "size": 0,
        "query": {
            "bool": {
                "must": [{ "terms": { "title.keyword": titles } }],
                "must_not": [
                    { "term": { "profileName.keyword": excluded_profile } },
                    { "term": { "profileName.keyword": "" } }
                ]
            }
        },
        "aggs": {
            "profiles": {
                "terms": {
                    "field": "profileName.keyword",
                    "size": size,
                    "order": [{ "_count": "desc" }, { "_key": "asc" }]
                }
            }
        }
    })
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct HitsResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: Option<ViewingRecord>,
}

#[derive(Debug, Deserialize)]
struct AggResponse<A> {
    #[serde(default)]
    hits: TotalHits,
    aggregations: A,
}

#[derive(Debug, Default, Deserialize)]
struct TotalHits {
    #[serde(default)]
    total: TotalValue,
}

#[derive(Debug, Default, Deserialize)]
struct TotalValue {
    #[serde(default)]
    value: u64,
}

#[derive(Debug, Deserialize)]
struct HistogramAgg {
    buckets: Vec<HistogramBucket>,
}

#[derive(Debug, Deserialize)]
struct HistogramBucket {
    key_as_string: String,
    doc_count: u64,
}

#[derive(Debug, Deserialize)]
struct TermsAgg {
    buckets: Vec<TermsBucket>,
}

impl TermsAgg {
    fn into_title_counts(self) -> Vec<TitleCount> {
        self.buckets
            .into_iter()
            .filter_map(|bucket| {
                let count = bucket.doc_count;
                bucket.key_string().map(|title| TitleCount { title, count })
            })
            .collect()
    }
}

/// Terms bucket; keys are strings for keyword fields and numbers for scripts
#[derive(Debug, Deserialize)]
struct TermsBucket {
    key: Value,
    doc_count: u64,
}

impl TermsBucket {
    fn key_string(&self) -> Option<String> {
        self.key.as_str().map(str::to_string)
    }

    fn key_u32(&self) -> Option<u32> {
        match &self.key {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SumAgg {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FilteredTitles {
    titles: TermsAgg,
}

#[derive(Debug, Deserialize)]
struct YearsAggs {
    years: HistogramAgg,
}

#[derive(Debug, Deserialize)]
struct ProfileNamesAggs {
    profiles: TermsAgg,
}

#[derive(Debug, Deserialize)]
struct ProfileAggs {
    total_duration: SumAgg,
    by_type: TermsAgg,
    top_movies: FilteredTitles,
    top_series: FilteredTitles,
    activity_over_time: HistogramAgg,
    activity_by_hour: TermsAgg,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_uses_match_all() {
        let query = RecordQuery::new(RecordFilter::default(), 100).newest_first();
        let body = search_body(&query);

        assert_eq!(body["query"], json!({ "match_all": {} }));
        assert_eq!(body["size"], 100);
        assert_eq!(body["sort"][0]["date"]["order"], "desc");
    }

    #[test]
    fn test_unsorted_query_has_no_sort() {
        let query = RecordQuery::new(RecordFilter::default(), 10);
        assert!(search_body(&query).get("sort").is_none());
    }

    #[test]
    fn test_filters_become_must_clauses() {
        let filter = RecordFilter {
            content_type: Some(ContentType::TvShow),
            year: Some(2022),
            title: Some(TitleMatch::AllTokens("the crown".to_string())),
            profile_name: Some("Sam".to_string()),
        };
        let must = filter_clauses(&filter);

        assert_eq!(must.len(), 4);
        assert_eq!(must[0]["term"]["type.keyword"], "TV Show");
        assert_eq!(must[1]["range"]["date"]["gte"], "2022-01-01");
        assert_eq!(must[1]["range"]["date"]["lte"], "2022-12-31T23:59:59");
        assert_eq!(must[2]["match"]["title"]["operator"], "and");
        assert_eq!(must[3]["term"]["profileName.keyword"], "Sam");
    }

    #[test]
    fn test_exact_title_uses_keyword_term() {
        let filter = RecordFilter {
            title: Some(TitleMatch::Exact("Dark".to_string())),
            ..Default::default()
        };
        assert_eq!(filter_clauses(&filter)[0]["term"]["title.keyword"], "Dark");
    }

    #[test]
    fn test_shared_titles_excludes_profile() {
        let titles = vec!["Dark".to_string(), "Up".to_string()];
        let body = shared_titles_body(&titles, "Alex", 5);

        assert_eq!(body["query"]["bool"]["must"][0]["terms"]["title.keyword"][1], "Up");
        assert_eq!(
            body["query"]["bool"]["must_not"][0]["term"]["profileName.keyword"],
            "Alex"
        );
        assert_eq!(body["aggs"]["profiles"]["terms"]["size"], 5);
    }

    #[test]
    fn test_shared_titles_excludes_blank_profiles_before_ranking() {
        let body = shared_titles_body(&["Up".to_string()], "Alex", 5);

        let must_not = body["query"]["bool"]["must_not"].as_array().unwrap();
        assert!(must_not
            .iter()
            .any(|clause| clause["term"]["profileName.keyword"] == ""));
    }

    #[test]
    fn test_hits_response_deserialization() {
        let json = r#"{
            "took": 3,
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "hits": [{
                    "_index": "historic_netflix",
                    "_id": "abc",
                    "_source": {
                        "title": "Up",
                        "date": "2021-05-01T18:00:00.000Z",
                        "duration": 5760,
                        "deviceType": "iPad",
                        "country": "FR (France)",
                        "type": "Movie",
                        "profileName": "Kim"
                    }
                }]
            }
        }"#;

        let response: HitsResponse = serde_json::from_str(json).unwrap();
        let record = response.hits.hits[0].source.as_ref().unwrap();
        assert_eq!(record.title, "Up");
        assert_eq!(record.content_type, ContentType::Movie);
    }

    #[test]
    fn test_profile_aggs_deserialization() {
        let json = r#"{
            "hits": { "total": { "value": 3, "relation": "eq" }, "hits": [] },
            "aggregations": {
                "total_duration": { "value": 7200.0 },
                "by_type": { "buckets": [
                    { "key": "TV Show", "doc_count": 2 },
                    { "key": "Movie", "doc_count": 1 }
                ]},
                "top_movies": { "doc_count": 1, "titles": { "buckets": [
                    { "key": "Up", "doc_count": 1 }
                ]}},
                "top_series": { "doc_count": 2, "titles": { "buckets": [
                    { "key": "Dark: Season 1: Secrets", "doc_count": 2 }
                ]}},
                "activity_over_time": { "buckets": [
                    { "key_as_string": "2021-05", "key": 1619827200000, "doc_count": 3 }
                ]},
                "activity_by_hour": { "buckets": [
                    { "key": 18, "doc_count": 1 },
                    { "key": "21", "doc_count": 2 }
                ]}
            }
        }"#;

        let response: AggResponse<ProfileAggs> = serde_json::from_str(json).unwrap();
        assert_eq!(response.hits.total.value, 3);
        assert_eq!(response.aggregations.activity_by_hour.buckets[0].key_u32(), Some(18));
        assert_eq!(response.aggregations.activity_by_hour.buckets[1].key_u32(), Some(21));
        let top = response.aggregations.top_series.titles.into_title_counts();
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn test_store_name_and_url() {
        let store =
            ElasticsearchStore::new("http://localhost:9200/", "history", Duration::from_secs(5))
                .unwrap();
        assert_eq!(store.search_url(), "http://localhost:9200/history/_search");
        assert_eq!(store.name(), "elasticsearch");
    }

    #[tokio::test]
    async fn test_unreachable_index_is_retrieval_error() {
        let store =
            ElasticsearchStore::new("http://127.0.0.1:1", "history", Duration::from_secs(2))
                .unwrap();

        let result = store.available_years().await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_truncated_body_is_retrieval_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            // Promise more bytes than are sent, then hang up
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 512\r\n\r\n{\"hits\"")
                .await;
        });

        let store = ElasticsearchStore::new(
            &format!("http://{}", address),
            "history",
            Duration::from_secs(5),
        )
        .unwrap();

        let result = store.available_years().await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }
}
