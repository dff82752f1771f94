use std::{collections::HashSet, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use dockex_common::{DockexError, Result};
use dockex_docker::DockerApi;
use futures::FutureExt;
use tokio::{
    sync::Mutex,
    task::JoinSet,
    time::{Instant, timeout_at},
};
use tracing::{debug, error, info, warn};

use crate::{
    metrics::{
        CounterMetric, DURATION_BUCKETS, GaugeMetric, HistogramMetric, MetricSink, Snapshot,
        descriptors,
    },
    scraper::{PING_COLLECTOR, ScrapeContext, Scraper},
};

pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONTAINER_CONCURRENCY: usize = 32;

#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub scrape_timeout: Duration,
    pub container_concurrency: usize,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            scrape_timeout: DEFAULT_SCRAPE_TIMEOUT,
            container_concurrency: DEFAULT_CONTAINER_CONCURRENCY,
        }
    }
}

/// Exporter self-state carried from one cycle to the next.
pub struct ExporterMetrics {
    scrapes_total: CounterMetric,
    scrape_errors: CounterMetric,
    last_scrape_error: GaugeMetric,
    up: GaugeMetric,
    last_success: GaugeMetric,
    inspect_duration: Arc<HistogramMetric>,
}

impl ExporterMetrics {
    pub fn new<'a>(scraper_names: impl IntoIterator<Item = &'a str>) -> Self {
        let d = descriptors();
        let metrics = Self {
            scrapes_total: CounterMetric::new(&d.scrapes_total),
            scrape_errors: CounterMetric::new(&d.scrape_errors_total),
            last_scrape_error: GaugeMetric::new(&d.last_scrape_error),
            up: GaugeMetric::new(&d.up),
            last_success: GaugeMetric::new(&d.probe_successfully_completed_time),
            inspect_duration: Arc::new(HistogramMetric::new(
                &d.probe_inspect_duration_seconds,
                DURATION_BUCKETS,
            )),
        };

        metrics.scrapes_total.touch(&[]);
        for name in scraper_names {
            metrics.scrape_errors.touch(&[name]);
        }
        metrics.last_scrape_error.set(&[], 0.0);
        metrics.up.set(&[], 0.0);
        metrics.last_success.set(&[], 0.0);
        metrics.inspect_duration.touch(&[]);

        metrics
    }

    pub fn scrapes_total(&self) -> u64 {
        self.scrapes_total.get(&[])
    }

    pub fn scrape_errors(&self, scraper: &str) -> u64 {
        self.scrape_errors.get(&[scraper])
    }

    fn mark_down(&self) {
        self.up.set(&[], 0.0);
        self.last_scrape_error.set(&[], 1.0);
    }

    fn record_failure(&self, scraper: &str) {
        self.scrape_errors.inc_one(&[scraper]);
        self.last_scrape_error.set(&[], 1.0);
    }

    fn emit(&self, sink: &MetricSink) {
        self.scrapes_total.emit(sink);
        self.last_scrape_error.emit(sink);
        self.scrape_errors.emit(sink);
        self.up.emit(sink);
        self.last_success.emit(sink);
    }
}

/// Result of one scraper invocation within a cycle.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub scraper: &'static str,
    pub duration: Duration,
    pub error: Option<DockexError>,
}

impl ScrapeOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub struct CycleReport {
    pub daemon_up: bool,
    pub outcomes: Vec<ScrapeOutcome>,
}

/// Runs collection cycles against one daemon.
pub struct Exporter {
    docker: Arc<dyn DockerApi>,
    scrapers: Vec<Arc<dyn Scraper>>,
    metrics: Arc<ExporterMetrics>,
    config: ExporterConfig,
    cycle: Mutex<()>,
}

impl Exporter {
    pub fn new(
        docker: Arc<dyn DockerApi>,
        scrapers: Vec<Arc<dyn Scraper>>,
        config: ExporterConfig,
    ) -> Result<Self> {
        if config.container_concurrency == 0 {
            return Err(DockexError::InvalidArgument(
                "container concurrency must be at least 1".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for scraper in &scrapers {
            let name = scraper.name();
            if name.is_empty() || name == PING_COLLECTOR {
                return Err(DockexError::InvalidArgument(format!(
                    "scraper name {name:?} is reserved"
                )));
            }
            if !names.insert(name) {
                return Err(DockexError::InvalidArgument(format!(
                    "scraper {name} registered twice"
                )));
            }
        }

        let metrics = Arc::new(ExporterMetrics::new(
            scrapers.iter().map(|scraper| scraper.name()),
        ));

        Ok(Self {
            docker,
            scrapers,
            metrics,
            config,
            cycle: Mutex::new(()),
        })
    }

    pub fn scrapers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.scrapers.iter().map(|scraper| scraper.name())
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    /// Runs one cycle and returns everything it emitted.
    pub async fn snapshot(&self) -> Snapshot {
        let (sink, receiver) = MetricSink::channel();
        let collect = async move {
            self.collect(&sink).await;
        };
        let (_, snapshot) = tokio::join!(collect, Snapshot::drain(receiver));
        snapshot
    }

    /// Runs one cycle, streaming samples into `sink`.
    ///
    /// Never fails: an unreachable daemon or failing scrapers show up in the
    /// emitted health metrics instead.
    pub async fn collect(&self, sink: &MetricSink) -> CycleReport {
        let _cycle = self.cycle.lock().await;
        let metrics = &self.metrics;
        metrics.scrapes_total.inc_one(&[]);

        let deadline = Instant::now() + self.config.scrape_timeout;
        let started_at = Instant::now();
        let ping = timeout_at(deadline, self.docker.ping()).await;

        let report = match ping {
            Ok(Ok(())) => {
                metrics.up.set(&[], 1.0);
                metrics.last_scrape_error.set(&[], 0.0);
                sink.gauge(
                    &descriptors().collector_duration_seconds,
                    started_at.elapsed().as_secs_f64(),
                    &[PING_COLLECTOR],
                );

                let ctx = ScrapeContext::new(
                    deadline,
                    self.config.container_concurrency,
                    Arc::clone(&metrics.inspect_duration),
                );
                let outcomes = self.scrape_all(&ctx, sink).await;
                metrics.last_success.set_to_current_time(&[]);

                CycleReport {
                    daemon_up: true,
                    outcomes,
                }
            }
            Ok(Err(err)) => {
                error!(error = %err, "docker daemon is unreachable");
                metrics.mark_down();
                CycleReport {
                    daemon_up: false,
                    outcomes: Vec::new(),
                }
            }
            Err(_) => {
                error!(
                    timeout_secs = self.config.scrape_timeout.as_secs_f64(),
                    "docker ping timed out"
                );
                metrics.mark_down();
                CycleReport {
                    daemon_up: false,
                    outcomes: Vec::new(),
                }
            }
        };

        metrics.emit(sink);
        debug!(
            daemon_up = report.daemon_up,
            failed = report.outcomes.iter().filter(|outcome| !outcome.succeeded()).count(),
            "scrape cycle finished"
        );
        report
    }

    async fn scrape_all(&self, ctx: &ScrapeContext, sink: &MetricSink) -> Vec<ScrapeOutcome> {
        let mut tasks = JoinSet::new();
        for scraper in &self.scrapers {
            tasks.spawn(run_scraper(
                Arc::clone(scraper),
                ctx.clone(),
                Arc::clone(&self.docker),
                Arc::clone(&self.metrics),
                sink.clone(),
            ));
        }

        let mut outcomes = Vec::with_capacity(self.scrapers.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => warn!(error = %err, "scraper task did not complete"),
            }
        }
        outcomes
    }
}

async fn run_scraper(
    scraper: Arc<dyn Scraper>,
    ctx: ScrapeContext,
    docker: Arc<dyn DockerApi>,
    metrics: Arc<ExporterMetrics>,
    sink: MetricSink,
) -> ScrapeOutcome {
    let name = scraper.name();
    let started_at = Instant::now();

    let invocation = AssertUnwindSafe(scraper.scrape(&ctx, &docker, &sink)).catch_unwind();
    let result = match timeout_at(ctx.deadline(), invocation).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(DockexError::InternalError(format!("scraper {name} panicked"))),
        Err(_) => Err(DockexError::DeadlineExceeded(format!(
            "scraper {name} did not finish before the scrape timeout"
        ))),
    };
    let duration = started_at.elapsed();

    let error = match result {
        Ok(()) => None,
        Err(err) => {
            error!(scraper = name, kind = err.kind(), error = %err, "scraper failed");
            metrics.record_failure(name);
            Some(err)
        }
    };

    sink.gauge(
        &descriptors().collector_duration_seconds,
        duration.as_secs_f64(),
        &[name],
    );

    ScrapeOutcome {
        scraper: name,
        duration,
        error,
    }
}

/// Logs which scrapers a configured exporter will run.
pub fn log_enabled_scrapers(exporter: &Exporter) {
    for name in exporter.scrapers() {
        info!(scraper = name, "scraper enabled");
    }
}
