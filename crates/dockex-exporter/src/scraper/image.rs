use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use dockex_common::Result;
use dockex_docker::{DockerApi, ImageSummary};
use tracing::{debug, warn};

use crate::{
    metrics::{MetricSink, descriptors},
    scraper::{ScrapeContext, Scraper},
};

const SHORT_ID_LEN: usize = 12;
const UNTAGGED: &str = "<none>";

/// Size of every local image, labeled by short id and primary tag.
pub struct ImageScraper;

#[async_trait]
impl Scraper for ImageScraper {
    fn name(&self) -> &'static str {
        "image"
    }

    fn help(&self) -> &'static str {
        "Collect the image info"
    }

    async fn scrape(
        &self,
        _ctx: &ScrapeContext,
        docker: &Arc<dyn DockerApi>,
        sink: &MetricSink,
    ) -> Result<()> {
        let images = docker.list_images(true).await?;
        debug!(count = images.len(), "listed images");

        let image_size = &descriptors().image_size;
        let mut seen = HashSet::new();

        for image in &images {
            let Some(snapshot) = ImageSnapshot::from_summary(image) else {
                warn!(
                    image = %image.id,
                    repo_tag = image.repo_tags.first().map(String::as_str).unwrap_or_default(),
                    "skipping image with malformed repository tag"
                );
                continue;
            };

            let labels = [snapshot.id.as_str(), snapshot.repo.as_str(), snapshot.tag.as_str()];
            if !seen.insert(labels.map(str::to_string)) {
                continue;
            }

            sink.gauge(image_size, snapshot.size as f64, &labels);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSnapshot {
    pub id: String,
    pub repo: String,
    pub tag: String,
    pub size: i64,
}

impl ImageSnapshot {
    /// `None` when the primary repository tag has no usable tag part.
    pub fn from_summary(image: &ImageSummary) -> Option<Self> {
        let (repo, tag) = match image.repo_tags.first() {
            Some(repo_tag) => split_repo_tag(repo_tag)?,
            None => (UNTAGGED, UNTAGGED),
        };

        Some(Self {
            id: short_image_id(&image.id).to_string(),
            repo: repo.to_string(),
            tag: tag.to_string(),
            size: image.size,
        })
    }
}

fn short_image_id(id: &str) -> &str {
    let digest = id.split_once(':').map_or(id, |(_, digest)| digest);
    digest.get(..SHORT_ID_LEN).unwrap_or(digest)
}

// The registry host may carry a port, so only the last colon separates the tag.
fn split_repo_tag(repo_tag: &str) -> Option<(&str, &str)> {
    let (repo, tag) = repo_tag.rsplit_once(':')?;
    if repo.is_empty() || tag.is_empty() || tag.contains('/') {
        return None;
    }
    Some((repo, tag))
}
