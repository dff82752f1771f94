use std::sync::Arc;

use async_trait::async_trait;
use dockex_common::Result;
use dockex_docker::DockerApi;
use tracing::debug;

use crate::{
    metrics::{MetricSink, descriptors},
    scraper::{ScrapeContext, Scraper},
};

/// Container totals from the daemon's system info.
pub struct InfoScraper;

#[async_trait]
impl Scraper for InfoScraper {
    fn name(&self) -> &'static str {
        "info"
    }

    fn help(&self) -> &'static str {
        "Collect the daemon's container counts"
    }

    async fn scrape(
        &self,
        _ctx: &ScrapeContext,
        docker: &Arc<dyn DockerApi>,
        sink: &MetricSink,
    ) -> Result<()> {
        let info = docker.info().await?;
        debug!(
            server_version = %info.server_version,
            containers = info.containers,
            "fetched daemon info"
        );

        let containers = &descriptors().containers;
        sink.gauge(containers, info.containers as f64, &["total"]);
        sink.gauge(containers, info.containers_running as f64, &["running"]);
        sink.gauge(containers, info.containers_stopped as f64, &["stopped"]);

        Ok(())
    }
}
