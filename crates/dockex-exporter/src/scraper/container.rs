use std::sync::Arc;

use async_trait::async_trait;
use dockex_common::{DockexError, Result, time};
use dockex_docker::{ContainerInspect, ContainerStats, DockerApi};
use tokio::{sync::Semaphore, task::JoinSet, time::Instant};
use tracing::{debug, warn};

use crate::{
    metrics::{HistogramMetric, MetricSink, descriptors},
    scraper::{ScrapeContext, Scraper},
};

const SHORT_ID_LEN: usize = 12;

/// Status and resource usage of every container, running or not.
pub struct ContainerScraper;

#[async_trait]
impl Scraper for ContainerScraper {
    fn name(&self) -> &'static str {
        "container"
    }

    fn help(&self) -> &'static str {
        "Collect the container status & resource"
    }

    async fn scrape(
        &self,
        ctx: &ScrapeContext,
        docker: &Arc<dyn DockerApi>,
        sink: &MetricSink,
    ) -> Result<()> {
        let containers = docker.list_containers(true).await?;
        debug!(count = containers.len(), "listed containers");

        let limit = Arc::new(Semaphore::new(ctx.container_concurrency()));
        let mut tasks = JoinSet::new();

        for container in containers {
            let permit = Arc::clone(&limit)
                .acquire_owned()
                .await
                .map_err(|err| DockexError::InternalError(err.to_string()))?;
            let docker = Arc::clone(docker);
            let inspect_duration = Arc::clone(ctx.inspect_duration());
            let sink = sink.clone();

            tasks.spawn(async move {
                collect_container(docker.as_ref(), &container.id, &inspect_duration, &sink).await;
                drop(permit);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "container task did not complete");
            }
        }

        ctx.inspect_duration().emit(sink);
        Ok(())
    }
}

async fn collect_container(
    docker: &dyn DockerApi,
    id: &str,
    inspect_duration: &HistogramMetric,
    sink: &MetricSink,
) {
    let started_at = Instant::now();
    let inspected = docker.inspect_container(id).await;
    inspect_duration.observe(&[], started_at.elapsed().as_secs_f64());

    let inspect = match inspected {
        Ok(inspect) => inspect,
        Err(err) => {
            warn!(container = short_id(id), error = %err, "failed to inspect container");
            return;
        }
    };

    let snapshot = ContainerSnapshot::from_inspect(&inspect);
    snapshot.emit(sink);

    if snapshot.state != LifecycleState::Running {
        return;
    }

    match docker.container_stats(id).await {
        Ok(stats) => ResourceUsage::from_stats(&stats).emit(&snapshot.name, sink),
        Err(err) => {
            warn!(container = short_id(id), error = %err, "failed to read container stats");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Restarting,
    Stopped,
}

impl LifecycleState {
    pub fn gauge_value(self) -> f64 {
        match self {
            Self::Running => 1.0,
            Self::Restarting => 0.5,
            Self::Stopped => 0.0,
        }
    }
}

/// What one inspect call says about a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSnapshot {
    pub name: String,
    pub state: LifecycleState,
    pub restart_count: i64,
    /// Whole seconds since the epoch; only set for running containers.
    pub started_at: Option<i64>,
}

impl ContainerSnapshot {
    pub fn from_inspect(inspect: &ContainerInspect) -> Self {
        let state = if inspect.state.running {
            LifecycleState::Running
        } else if inspect.state.restarting {
            LifecycleState::Restarting
        } else {
            LifecycleState::Stopped
        };

        let started_at = match state {
            LifecycleState::Running => {
                time::parse_rfc3339(&inspect.state.started_at).map(|started| started.timestamp())
            }
            _ => None,
        };

        Self {
            name: display_name(&inspect.name, &inspect.id),
            state,
            restart_count: inspect.restart_count,
            started_at,
        }
    }

    fn emit(&self, sink: &MetricSink) {
        let d = descriptors();
        let labels = [self.name.as_str()];

        sink.gauge(&d.container_restart_count, self.restart_count as f64, &labels);
        sink.gauge(&d.container_running_state, self.state.gauge_value(), &labels);
        if let Some(started_at) = self.started_at {
            sink.gauge(&d.container_start_time_seconds, started_at as f64, &labels);
        }
    }
}

/// Resource counters from one stats response, reported all or nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceUsage {
    pub cpu_used: u64,
    pub cpu_capacity: u64,
    pub memory_used: u64,
    pub network_in: u64,
    pub network_out: u64,
    pub disk_read: u64,
    pub disk_write: u64,
}

impl ResourceUsage {
    pub fn from_stats(stats: &ContainerStats) -> Self {
        let (network_in, network_out) = stats
            .networks
            .iter()
            .flat_map(|networks| networks.values())
            .fold((0_u64, 0_u64), |(rx, tx), network| {
                (
                    rx.saturating_add(network.rx_bytes),
                    tx.saturating_add(network.tx_bytes),
                )
            });

        let mut disk_read = 0_u64;
        let mut disk_write = 0_u64;
        for entry in &stats.blkio_stats.io_service_bytes_recursive {
            if entry.op.eq_ignore_ascii_case("read") {
                disk_read = disk_read.saturating_add(entry.value);
            } else if entry.op.eq_ignore_ascii_case("write") {
                disk_write = disk_write.saturating_add(entry.value);
            }
        }

        Self {
            cpu_used: stats.cpu_stats.cpu_usage.total_usage,
            cpu_capacity: stats.cpu_stats.system_cpu_usage,
            memory_used: stats.memory_stats.usage,
            network_in,
            network_out,
            disk_read,
            disk_write,
        }
    }

    fn emit(&self, name: &str, sink: &MetricSink) {
        let d = descriptors();
        let labels = [name];

        sink.gauge(&d.container_cpu_used_total, self.cpu_used as f64, &labels);
        sink.gauge(&d.container_cpu_capacity_total, self.cpu_capacity as f64, &labels);
        sink.gauge(&d.container_memory_used_bytes, self.memory_used as f64, &labels);
        sink.gauge(&d.container_network_in_bytes, self.network_in as f64, &labels);
        sink.gauge(&d.container_network_out_bytes, self.network_out as f64, &labels);
        sink.gauge(&d.container_disk_read_bytes, self.disk_read as f64, &labels);
        sink.gauge(&d.container_disk_write_bytes, self.disk_write as f64, &labels);
    }
}

fn display_name(name: &str, id: &str) -> String {
    let trimmed = name.trim_matches('/');
    if trimmed.is_empty() {
        short_id(id).to_string()
    } else {
        trimmed.to_string()
    }
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}
