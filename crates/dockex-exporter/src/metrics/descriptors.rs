//! Every metric the exporter can emit, declared once per process.

use std::sync::LazyLock;

use crate::metrics::types::{MetricDescriptor, MetricType};

pub const NAMESPACE: &str = "docker";
pub const EXPORTER_SUBSYSTEM: &str = "exporter";
pub const CONTAINER_SUBSYSTEM: &str = "container";
pub const IMAGE_SUBSYSTEM: &str = "image";

/// Bucket bounds, in seconds, for daemon call latencies.
pub const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

const COLLECTOR_LABELS: &[&str] = &["collector"];
const CONTAINER_LABELS: &[&str] = &["name"];
const IMAGE_LABELS: &[&str] = &["id", "repo", "tag"];

pub struct Descriptors {
    pub up: MetricDescriptor,
    pub probe_successfully_completed_time: MetricDescriptor,
    pub scrapes_total: MetricDescriptor,
    pub scrape_errors_total: MetricDescriptor,
    pub last_scrape_error: MetricDescriptor,
    pub collector_duration_seconds: MetricDescriptor,

    pub containers: MetricDescriptor,

    pub container_restart_count: MetricDescriptor,
    pub container_running_state: MetricDescriptor,
    pub container_start_time_seconds: MetricDescriptor,
    pub probe_inspect_duration_seconds: MetricDescriptor,
    pub container_cpu_used_total: MetricDescriptor,
    pub container_cpu_capacity_total: MetricDescriptor,
    pub container_memory_used_bytes: MetricDescriptor,
    pub container_network_in_bytes: MetricDescriptor,
    pub container_network_out_bytes: MetricDescriptor,
    pub container_disk_read_bytes: MetricDescriptor,
    pub container_disk_write_bytes: MetricDescriptor,

    pub image_size: MetricDescriptor,
}

static DESCRIPTORS: LazyLock<Descriptors> = LazyLock::new(Descriptors::build);

pub fn descriptors() -> &'static Descriptors {
    &DESCRIPTORS
}

impl Descriptors {
    fn build() -> Self {
        Self {
            up: MetricDescriptor::new(
                NAMESPACE,
                "",
                "up",
                "Whether the docker daemon is up.",
                MetricType::Gauge,
                &[],
            ),
            probe_successfully_completed_time: MetricDescriptor::new(
                NAMESPACE,
                "",
                "probe_successfully_completed_time",
                "When the last Docker probe was successfully completed.",
                MetricType::Gauge,
                &[],
            ),
            scrapes_total: MetricDescriptor::new(
                NAMESPACE,
                EXPORTER_SUBSYSTEM,
                "scrapes_total",
                "Total number of times docker was scraped for metrics.",
                MetricType::Counter,
                &[],
            ),
            scrape_errors_total: MetricDescriptor::new(
                NAMESPACE,
                EXPORTER_SUBSYSTEM,
                "scrape_errors_total",
                "Total number of times an error occurred scraping docker, by collector.",
                MetricType::Counter,
                COLLECTOR_LABELS,
            ),
            last_scrape_error: MetricDescriptor::new(
                NAMESPACE,
                EXPORTER_SUBSYSTEM,
                "last_scrape_error",
                "Whether the last scrape of metrics from docker resulted in an error (1 for error, 0 for success).",
                MetricType::Gauge,
                &[],
            ),
            collector_duration_seconds: MetricDescriptor::new(
                NAMESPACE,
                EXPORTER_SUBSYSTEM,
                "collector_duration_seconds",
                "Collector time duration.",
                MetricType::Gauge,
                COLLECTOR_LABELS,
            ),
            containers: MetricDescriptor::new(
                NAMESPACE,
                "",
                "containers",
                "Number of containers that exist.",
                MetricType::Gauge,
                &["status"],
            ),
            container_restart_count: MetricDescriptor::new(
                NAMESPACE,
                CONTAINER_SUBSYSTEM,
                "restart_count",
                "Number of times the runtime has restarted this container without explicit user action, since the container was last started.",
                MetricType::Gauge,
                CONTAINER_LABELS,
            ),
            container_running_state: MetricDescriptor::new(
                NAMESPACE,
                CONTAINER_SUBSYSTEM,
                "running_state",
                "Whether the container is running (1), restarting (0.5) or stopped (0).",
                MetricType::Gauge,
                CONTAINER_LABELS,
            ),
            container_start_time_seconds: MetricDescriptor::new(
                NAMESPACE,
                CONTAINER_SUBSYSTEM,
                "start_time_seconds",
                "Timestamp indicating when the container was started. Does not get reset by automatic restarts.",
                MetricType::Gauge,
                CONTAINER_LABELS,
            ),
            probe_inspect_duration_seconds: MetricDescriptor::new(
                NAMESPACE,
                "",
                "probe_inspect_duration_seconds",
                "How long it takes to query Docker for the basic information about a single container. Includes failed requests.",
                MetricType::Histogram,
                &[],
            ),
            container_cpu_used_total: MetricDescriptor::new(
                NAMESPACE,
                CONTAINER_SUBSYSTEM,
                "cpu_used_total",
                "Accumulated CPU usage of a container, in unspecified units, averaged for all logical CPUs usable by the container.",
                MetricType::Gauge,
                CONTAINER_LABELS,
            ),
            container_cpu_capacity_total: MetricDescriptor::new(
                NAMESPACE,
                CONTAINER_SUBSYSTEM,
                "cpu_capacity_total",
                "All potential CPU usage available to a container, in unspecified units, averaged for all logical CPUs usable by the container. Start point of measurement is undefined, only relative values should be used.",
                MetricType::Gauge,
                CONTAINER_LABELS,
            ),
            container_memory_used_bytes: MetricDescriptor::new(
                NAMESPACE,
                CONTAINER_SUBSYSTEM,
                "memory_used_bytes",
                "Memory usage of a container.",
                MetricType::Gauge,
                CONTAINER_LABELS,
            ),
            container_network_in_bytes: MetricDescriptor::new(
                NAMESPACE,
                CONTAINER_SUBSYSTEM,
                "network_in_bytes",
                "Total bytes received by the container's network interfaces.",
                MetricType::Gauge,
                CONTAINER_LABELS,
            ),
            container_network_out_bytes: MetricDescriptor::new(
                NAMESPACE,
                CONTAINER_SUBSYSTEM,
                "network_out_bytes",
                "Total bytes sent by the container's network interfaces.",
                MetricType::Gauge,
                CONTAINER_LABELS,
            ),
            container_disk_read_bytes: MetricDescriptor::new(
                NAMESPACE,
                CONTAINER_SUBSYSTEM,
                "disk_read_bytes",
                "Total bytes read from disk by a container.",
                MetricType::Gauge,
                CONTAINER_LABELS,
            ),
            container_disk_write_bytes: MetricDescriptor::new(
                NAMESPACE,
                CONTAINER_SUBSYSTEM,
                "disk_write_bytes",
                "Total bytes written to disk by a container.",
                MetricType::Gauge,
                CONTAINER_LABELS,
            ),
            image_size: MetricDescriptor::new(
                NAMESPACE,
                IMAGE_SUBSYSTEM,
                "size",
                "Docker image size.",
                MetricType::Gauge,
                IMAGE_LABELS,
            ),
        }
    }

    /// All descriptors in exposition order.
    pub fn all(&self) -> [&MetricDescriptor; 19] {
        [
            &self.up,
            &self.probe_successfully_completed_time,
            &self.scrapes_total,
            &self.scrape_errors_total,
            &self.last_scrape_error,
            &self.collector_duration_seconds,
            &self.containers,
            &self.container_restart_count,
            &self.container_running_state,
            &self.container_start_time_seconds,
            &self.probe_inspect_duration_seconds,
            &self.container_cpu_used_total,
            &self.container_cpu_capacity_total,
            &self.container_memory_used_bytes,
            &self.container_network_in_bytes,
            &self.container_network_out_bytes,
            &self.container_disk_read_bytes,
            &self.container_disk_write_bytes,
            &self.image_size,
        ]
    }
}
