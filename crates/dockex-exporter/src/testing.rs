//! Scripted in-memory daemon used by the scraper and orchestrator tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use dockex_docker::{
    BlkioEntry, BlkioStats, ContainerInspect, ContainerState, ContainerStats, ContainerSummary,
    CpuStats, CpuUsage, DockerApi, DockerError, ImageSummary, MemoryStats, NetworkStats,
    SystemInfo, error::Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FakeOp {
    Ping,
    Info,
    ListContainers,
    Inspect,
    Stats,
    ListImages,
}

impl FakeOp {
    fn path(self) -> &'static str {
        match self {
            Self::Ping => "/_ping",
            Self::Info => "/info",
            Self::ListContainers => "/containers/json",
            Self::Inspect => "/containers/{id}/json",
            Self::Stats => "/containers/{id}/stats",
            Self::ListImages => "/images/json",
        }
    }
}

pub(crate) const STARTED_AT: &str = "2024-03-01T10:15:30.123456789Z";
pub(crate) const STARTED_AT_UNIX: f64 = 1_709_288_130.0;

#[derive(Default)]
pub(crate) struct FakeDocker {
    info: SystemInfo,
    containers: Vec<ContainerSummary>,
    inspects: HashMap<String, ContainerInspect>,
    stats: HashMap<String, ContainerStats>,
    images: Vec<ImageSummary>,
    failing: Mutex<HashSet<FakeOp>>,
    hanging: Mutex<HashSet<FakeOp>>,
    failing_ids: HashSet<String>,
    calls: Mutex<HashMap<FakeOp, usize>>,
}

impl FakeDocker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_info(mut self, total: i64, running: i64, stopped: i64) -> Self {
        self.info = SystemInfo {
            containers: total,
            containers_running: running,
            containers_stopped: stopped,
            server_version: "25.0.3".to_string(),
            ..SystemInfo::default()
        };
        self
    }

    pub(crate) fn with_running(self, id: &str, name: &str, stats: ContainerStats) -> Self {
        let state = ContainerState {
            status: "running".to_string(),
            running: true,
            started_at: STARTED_AT.to_string(),
            ..ContainerState::default()
        };
        let mut fake = self.with_container(id, name, state, 0);
        fake.stats.insert(id.to_string(), stats);
        fake
    }

    pub(crate) fn with_restarting(self, id: &str, name: &str, restart_count: i64) -> Self {
        let state = ContainerState {
            status: "restarting".to_string(),
            restarting: true,
            started_at: STARTED_AT.to_string(),
            ..ContainerState::default()
        };
        self.with_container(id, name, state, restart_count)
    }

    pub(crate) fn with_stopped(self, id: &str, name: &str) -> Self {
        let state = ContainerState {
            status: "exited".to_string(),
            started_at: STARTED_AT.to_string(),
            finished_at: "2024-03-01T11:00:00Z".to_string(),
            ..ContainerState::default()
        };
        self.with_container(id, name, state, 0)
    }

    pub(crate) fn with_container(
        mut self,
        id: &str,
        name: &str,
        state: ContainerState,
        restart_count: i64,
    ) -> Self {
        self.containers.push(ContainerSummary {
            id: id.to_string(),
            names: vec![format!("/{name}")],
            image: "busybox:latest".to_string(),
            state: state.status.clone(),
        });
        self.inspects.insert(
            id.to_string(),
            ContainerInspect {
                id: id.to_string(),
                name: format!("/{name}"),
                restart_count,
                state,
            },
        );
        self
    }

    pub(crate) fn with_image(mut self, id: &str, repo_tags: &[&str], size: i64) -> Self {
        self.images.push(ImageSummary {
            id: id.to_string(),
            repo_tags: repo_tags.iter().map(|tag| (*tag).to_string()).collect(),
            size,
        });
        self
    }

    /// Per-container failure of inspect or stats for `id`.
    pub(crate) fn failing_for(mut self, id: &str) -> Self {
        self.failing_ids.insert(id.to_string());
        self
    }

    pub(crate) fn failing(self, op: FakeOp) -> Self {
        self.set_failing(op, true);
        self
    }

    pub(crate) fn hanging(self, op: FakeOp) -> Self {
        if let Ok(mut hanging) = self.hanging.lock() {
            hanging.insert(op);
        }
        self
    }

    pub(crate) fn set_failing(&self, op: FakeOp, failing: bool) {
        if let Ok(mut ops) = self.failing.lock() {
            if failing {
                ops.insert(op);
            } else {
                ops.remove(&op);
            }
        }
    }

    pub(crate) fn calls(&self, op: FakeOp) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(&op).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    async fn enter(&self, op: FakeOp, id: Option<&str>) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(op).or_default() += 1;
        }

        let hangs = self
            .hanging
            .lock()
            .map(|hanging| hanging.contains(&op))
            .unwrap_or_default();
        if hangs {
            std::future::pending::<()>().await;
        }

        let fails = self
            .failing
            .lock()
            .map(|failing| failing.contains(&op))
            .unwrap_or_default()
            || id.is_some_and(|id| self.failing_ids.contains(id));
        if fails {
            return Err(DockerError::Status {
                path: op.path().to_string(),
                status: 500,
                message: "scripted failure".to_string(),
            });
        }

        Ok(())
    }

    fn missing(op: FakeOp, id: &str) -> DockerError {
        DockerError::Status {
            path: op.path().replace("{id}", id),
            status: 404,
            message: format!("No such container: {id}"),
        }
    }
}

#[async_trait]
impl DockerApi for FakeDocker {
    async fn ping(&self) -> Result<()> {
        self.enter(FakeOp::Ping, None).await
    }

    async fn list_containers(&self, _all: bool) -> Result<Vec<ContainerSummary>> {
        self.enter(FakeOp::ListContainers, None).await?;
        Ok(self.containers.clone())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspect> {
        self.enter(FakeOp::Inspect, Some(id)).await?;
        self.inspects
            .get(id)
            .cloned()
            .ok_or_else(|| Self::missing(FakeOp::Inspect, id))
    }

    async fn container_stats(&self, id: &str) -> Result<ContainerStats> {
        self.enter(FakeOp::Stats, Some(id)).await?;
        self.stats
            .get(id)
            .cloned()
            .ok_or_else(|| Self::missing(FakeOp::Stats, id))
    }

    async fn list_images(&self, _all: bool) -> Result<Vec<ImageSummary>> {
        self.enter(FakeOp::ListImages, None).await?;
        Ok(self.images.clone())
    }

    async fn info(&self) -> Result<SystemInfo> {
        self.enter(FakeOp::Info, None).await?;
        Ok(self.info.clone())
    }
}

/// Stats fixture without network interfaces or block io entries.
pub(crate) fn bare_stats(cpu_used: u64, cpu_capacity: u64, memory: u64) -> ContainerStats {
    ContainerStats {
        cpu_stats: CpuStats {
            cpu_usage: CpuUsage {
                total_usage: cpu_used,
            },
            system_cpu_usage: cpu_capacity,
            online_cpus: 4,
        },
        memory_stats: MemoryStats {
            usage: memory,
            limit: memory * 4,
        },
        ..ContainerStats::default()
    }
}

pub(crate) fn with_network(
    mut stats: ContainerStats,
    interface: &str,
    rx_bytes: u64,
    tx_bytes: u64,
) -> ContainerStats {
    stats
        .networks
        .get_or_insert_with(HashMap::new)
        .insert(interface.to_string(), NetworkStats { rx_bytes, tx_bytes });
    stats
}

pub(crate) fn with_blkio(mut stats: ContainerStats, op: &str, value: u64) -> ContainerStats {
    let BlkioStats {
        io_service_bytes_recursive,
    } = &mut stats.blkio_stats;
    io_service_bytes_recursive.push(BlkioEntry {
        major: 8,
        minor: 0,
        op: op.to_string(),
        value,
    });
    stats
}
