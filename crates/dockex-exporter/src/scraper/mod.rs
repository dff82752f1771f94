pub mod container;
pub mod image;
pub mod info;

use std::sync::Arc;

use async_trait::async_trait;
use dockex_common::Result;
use dockex_docker::DockerApi;
use tokio::time::Instant;

use crate::metrics::{HistogramMetric, MetricSink};

pub use container::ContainerScraper;
pub use image::ImageScraper;
pub use info::InfoScraper;

/// Name reserved for the daemon reachability check in the `collector` label.
pub const PING_COLLECTOR: &str = "ping";

/// An independently failable collection routine run once per cycle.
///
/// Implementations are stateless. A failed `scrape` may already have written
/// some samples to the sink.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Stable identifier, used as `--collect.<name>` and as the `collector` label.
    fn name(&self) -> &'static str;

    fn help(&self) -> &'static str;

    fn enabled_by_default(&self) -> bool {
        true
    }

    async fn scrape(
        &self,
        ctx: &ScrapeContext,
        docker: &Arc<dyn DockerApi>,
        sink: &MetricSink,
    ) -> Result<()>;
}

/// Per-cycle parameters handed to every scraper.
#[derive(Clone)]
pub struct ScrapeContext {
    deadline: Instant,
    container_concurrency: usize,
    inspect_duration: Arc<HistogramMetric>,
}

impl ScrapeContext {
    pub fn new(
        deadline: Instant,
        container_concurrency: usize,
        inspect_duration: Arc<HistogramMetric>,
    ) -> Self {
        Self {
            deadline,
            container_concurrency: container_concurrency.max(1),
            inspect_duration,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn container_concurrency(&self) -> usize {
        self.container_concurrency
    }

    pub fn inspect_duration(&self) -> &Arc<HistogramMetric> {
        &self.inspect_duration
    }
}

/// The scrapers compiled into the exporter, in registration order.
pub fn builtin_scrapers() -> Vec<Arc<dyn Scraper>> {
    vec![
        Arc::new(InfoScraper),
        Arc::new(ContainerScraper),
        Arc::new(ImageScraper),
    ]
}

#[cfg(test)]
pub(crate) fn test_context() -> ScrapeContext {
    use crate::metrics::{DURATION_BUCKETS, descriptors};

    ScrapeContext::new(
        Instant::now() + std::time::Duration::from_secs(30),
        4,
        Arc::new(HistogramMetric::new(
            &descriptors().probe_inspect_duration_seconds,
            DURATION_BUCKETS,
        )),
    )
}
