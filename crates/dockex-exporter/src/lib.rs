pub mod build_info;
pub mod exporter;
pub mod handlers;
pub mod metrics;
pub mod router;
pub mod scraper;

#[cfg(test)]
pub(crate) mod testing;

pub use build_info::BuildInfo;
pub use exporter::{CycleReport, Exporter, ExporterConfig, ScrapeOutcome};
pub use router::{AppState, exporter_router};
pub use scraper::{ScrapeContext, Scraper, builtin_scrapers};
