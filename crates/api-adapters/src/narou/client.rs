//! HTTP client for the novel search and ranking API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

use domains::{
    BackendError, ItemMetadata, MetadataBackend, NativeRankingBackend, NativeRankingEntry, PeriodKind,
    RankingHistoryBackend, RankingHistoryEntry, SearchBackend, SearchPage, SearchRequest, Site,
};

use super::params::{self, MAX_LIMIT, MAX_START};
use super::wire;

/// Endpoints and timeouts of [`NarouClient`].
#[derive(Debug, Clone)]
pub struct NarouClientConfig {
    pub search_url: String,
    pub r18_search_url: String,
    pub ranking_url: String,
    pub ranking_history_url: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for NarouClientConfig {
    fn default() -> Self {
        Self {
            search_url: "https://api.syosetu.com/novelapi/api/".into(),
            r18_search_url: "https://api.syosetu.com/novel18api/api/".into(),
            ranking_url: "https://api.syosetu.com/rank/rankget/".into(),
            ranking_history_url: "https://api.syosetu.com/rank/rankin/".into(),
            user_agent: concat!("narou-ranking/", env!("CARGO_PKG_VERSION")).into(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Implements every backend port against the public API.
#[derive(Clone)]
pub struct NarouClient {
    http: Client,
    config: NarouClientConfig,
}

impl std::fmt::Debug for NarouClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarouClient")
            .field("search_url", &self.config.search_url)
            .field("request_timeout", &self.config.request_timeout)
            .finish()
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(err.to_string())
    } else if err.is_decode() {
        BackendError::Decode(err.to_string())
    } else {
        BackendError::Transport(err.to_string())
    }
}

impl NarouClient {
    pub fn new(config: NarouClientConfig) -> Result<Self, BackendError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &NarouClientConfig {
        &self.config
    }

    fn search_url(&self, site: Site) -> &str {
        match site {
            Site::General => &self.config.search_url,
            Site::R18 => &self.config.r18_search_url,
        }
    }

    /// Metadata lookups against one site's search endpoint.
    pub fn metadata_source(&self, site: Site) -> NarouMetadataSource {
        NarouMetadataSource { client: self.clone(), site }
    }

    async fn get(&self, url: &str, query: &[(&'static str, String)]) -> Result<Vec<u8>, BackendError> {
        tracing::debug!(url, params = query.len(), "GET");
        let response = self.http.get(url).query(query).send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        let body = response.bytes().await.map_err(transport_error)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl SearchBackend for NarouClient {
    #[tracing::instrument(skip(self, request), fields(order = %request.order, start = request.start))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, BackendError> {
        if request.start >= MAX_START {
            tracing::debug!("offset beyond the backend's reach, returning an empty chunk");
            return Ok(SearchPage::default());
        }
        let body = self.get(self.search_url(request.domain.site()), &params::search_params(request)).await?;
        wire::parse_search_page(&body)
    }
}

#[async_trait]
impl RankingHistoryBackend for NarouClient {
    async fn fetch_history(&self, ncode: &str) -> Result<Vec<RankingHistoryEntry>, BackendError> {
        let query = [("out", "json".to_string()), ("ncode", ncode.to_string())];
        let body = self.get(&self.config.ranking_history_url, &query).await?;
        wire::parse_history(&body)
    }
}

#[async_trait]
impl NativeRankingBackend for NarouClient {
    async fn fetch_ranking(&self, period: PeriodKind, date: NaiveDate) -> Result<Vec<NativeRankingEntry>, BackendError> {
        let query = [("out", "json".to_string()), ("rtype", params::rtype(period, date))];
        let body = self.get(&self.config.ranking_url, &query).await?;
        wire::parse_snapshot(&body)
    }
}

/// [`MetadataBackend`] bound to one site.
#[derive(Debug, Clone)]
pub struct NarouMetadataSource {
    client: NarouClient,
    site: Site,
}

#[async_trait]
impl MetadataBackend for NarouMetadataSource {
    async fn fetch_metadata(&self, ncodes: &[String]) -> Result<Vec<ItemMetadata>, BackendError> {
        let mut items = Vec::with_capacity(ncodes.len());
        for chunk in ncodes.chunks(MAX_LIMIT) {
            let body = self.client.get(self.client.search_url(self.site), &params::metadata_params(chunk)).await?;
            items.extend(wire::parse_metadata(&body)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{FieldSet, RankingOrder, RankingQuery, StatusFilter};

    fn unreachable_client() -> NarouClient {
        NarouClient::new(NarouClientConfig {
            search_url: "http://127.0.0.1:9/novelapi/api/".into(),
            r18_search_url: "http://127.0.0.1:9/novel18api/api/".into(),
            connect_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(500),
            ..NarouClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn picks_search_url_per_site() {
        let client = unreachable_client();
        assert!(client.search_url(Site::General).ends_with("/novelapi/api/"));
        assert!(client.search_url(Site::R18).ends_with("/novel18api/api/"));
    }

    #[tokio::test]
    async fn offsets_past_the_ceiling_return_empty_without_a_request() {
        let client = unreachable_client();
        let query = RankingQuery::new(RankingOrder::Daily);
        let request = SearchRequest::for_chunk(&query, StatusFilter::All, &FieldSet::new(), 100, 20);

        let page = client.search(&request).await.unwrap();
        assert_eq!(page, SearchPage::default());
    }

    #[tokio::test]
    async fn connection_failures_surface_as_backend_errors() {
        let client = unreachable_client();
        let query = RankingQuery::new(RankingOrder::Daily);
        let request = SearchRequest::for_chunk(&query, StatusFilter::All, &FieldSet::new(), 100, 0);

        let err = client.search(&request).await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_) | BackendError::Timeout(_)));
    }
}
