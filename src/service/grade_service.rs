use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;

use crate::config::types::ServiceConfig;
use crate::error;
use crate::index::student_index::{RebuildSummary, StudentIndex};
use crate::parser::flatten::GradeRow;
use crate::pipeline::filter::ExclusionFilter;
use crate::pipeline::resolver::GradeResolver;
use crate::report::trends::{build_trends, ClassTrend};
use crate::resilience::retry::RetrySettings;
use crate::sources::fetch::PaginatedFetcher;
use crate::sources::oauth2::TokenManager;

/// Everything a caller needs: grade lookup, trend tables and index rebuild.
#[derive(Debug, Clone)]
pub struct GradeService {
    fetcher: Arc<PaginatedFetcher>,
    index: StudentIndex,
    resolver: GradeResolver,
}

impl GradeService {
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let api = &config.api;
        let client = Client::builder()
            .timeout(Duration::from_millis(api.request_timeout_ms))
            .build()
            .context("failed to build HTTP client")?;

        let endpoints = api.endpoints();
        let tokens = TokenManager::new(
            client.clone(),
            endpoints.token_url.clone(),
            api.credential(),
            api.reuse_token,
            api.token_safety_margin_seconds,
        );
        let fetcher = Arc::new(PaginatedFetcher::new(
            client,
            tokens,
            endpoints,
            api.page_size,
            api.rate_limit_low_water,
            RetrySettings::from(&config.settings.retry),
        ));

        let index = StudentIndex::open(&config.index)
            .await
            .with_context(|| format!("failed to open student index '{}'", config.index.path.display()))?;

        let resolver = GradeResolver::new(
            fetcher.clone(),
            index.clone(),
            ExclusionFilter::new(&config.pipeline.excluded_classes),
            config.pipeline.fetch_class_list,
        );

        info!(school = %api.school, "grade service ready");
        Ok(Self { fetcher, index, resolver })
    }

    pub async fn resolve_grades(&self, email: &str) -> error::Result<Vec<GradeRow>> {
        self.resolver.resolve_grades(email).await
    }

    pub async fn trends(&self, email: &str) -> error::Result<Vec<ClassTrend>> {
        let rows = self.resolve_grades(email).await?;
        Ok(build_trends(&rows))
    }

    pub async fn rebuild_student_index(&self) -> error::Result<RebuildSummary> {
        self.index.rebuild(&self.fetcher).await
    }

    pub fn index(&self) -> &StudentIndex {
        &self.index
    }
}
