pub mod client;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use client::DockerClient;
pub use config::{DockerConfig, DockerEndpoint};
pub use error::{DockerError, Result};
pub use traits::DockerApi;
pub use types::{
    BlkioEntry, BlkioStats, ContainerInspect, ContainerState, ContainerStats, ContainerSummary,
    CpuStats, CpuUsage, ImageSummary, MemoryStats, NetworkStats, SystemInfo,
};
