use std::sync::Arc;

use anyhow::Context;
use api_adapters::{NarouClient, NarouClientConfig};
use configs::Settings;
use domains::Site;
use services::{LoaderOptions, MetadataLoader, NativeRankingService, PipelineOptions, RankingHistoryService, RankingService};
use storage_adapters::{CacheOptions, InMemoryPageCache};

/// Adapters built once from settings; services are cheap to build per command.
pub struct App {
    pub settings: Settings,
    client: NarouClient,
    cache: Arc<InMemoryPageCache>,
}

impl App {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let backend = &settings.backend;
        let client = NarouClient::new(NarouClientConfig {
            search_url: backend.search_url.clone(),
            r18_search_url: backend.r18_search_url.clone(),
            ranking_url: backend.ranking_url.clone(),
            ranking_history_url: backend.ranking_history_url.clone(),
            user_agent: backend.user_agent.clone(),
            connect_timeout: backend.connect_timeout(),
            request_timeout: backend.request_timeout(),
        })
        .context("building HTTP client")?;

        let cache = Arc::new(InMemoryPageCache::new(CacheOptions {
            ttl: settings.cache.ttl(),
            max_entries: settings.cache.max_entries,
        }));

        tracing::debug!(?client, "adapters ready");
        Ok(Self { settings, client, cache })
    }

    pub fn ranking_service(&self) -> RankingService {
        let options = PipelineOptions {
            chunk_size: self.settings.pipeline.chunk_size,
            page_size: self.settings.pipeline.page_size,
            max_backend_pages: self.settings.pipeline.max_backend_pages(),
        };
        RankingService::new(Arc::new(self.client.clone()), self.cache.clone(), options)
    }

    pub fn loader(&self, site: Site) -> MetadataLoader {
        let options = LoaderOptions {
            max_batch_size: self.settings.loader.max_batch_size,
            batch_delay: self.settings.loader.batch_delay(),
        };
        MetadataLoader::new(Arc::new(self.client.metadata_source(site)), options)
    }

    pub fn native_service(&self) -> NativeRankingService {
        NativeRankingService::new(Arc::new(self.client.clone()), self.settings.pipeline.page_size)
    }

    pub fn history_service(&self) -> RankingHistoryService {
        RankingHistoryService::new(Arc::new(self.client.clone()))
    }
}
