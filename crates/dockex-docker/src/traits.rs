use async_trait::async_trait;

use crate::{
    error::Result,
    types::{ContainerInspect, ContainerStats, ContainerSummary, ImageSummary, SystemInfo},
};

/// The daemon operations the exporter consumes.
#[async_trait]
pub trait DockerApi: Send + Sync {
    async fn ping(&self) -> Result<()>;
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>>;
    async fn inspect_container(&self, id: &str) -> Result<ContainerInspect>;
    /// A single resource-usage snapshot, not a stream.
    async fn container_stats(&self, id: &str) -> Result<ContainerStats>;
    async fn list_images(&self, all: bool) -> Result<Vec<ImageSummary>>;
    async fn info(&self) -> Result<SystemInfo>;
}
