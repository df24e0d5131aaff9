//! Package and layer analysis of resolved images

pub mod syft;
pub mod types;

pub use syft::SyftCli;
pub use types::{ContainerImage, ContainerPackage, ContainerResolution, Layer, ResolvedLocation};

use crate::types::ImageModel;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, error, info};

/// Produces the layer and package inventory of an image
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(&self, image: &ImageModel) -> Result<ContainerResolution>;
}

/// Analyzes each image in order. Images that fail are logged and skipped.
pub async fn analyze_images(
    analyzer: &dyn ImageAnalyzer,
    images: &[ImageModel],
) -> Vec<ContainerResolution> {
    let mut resolutions = Vec::with_capacity(images.len());

    for image in images {
        debug!(image = %image.name, "Analyzing image");

        match analyzer.analyze(image).await {
            Ok(resolution) => {
                info!(
                    image = %image.name,
                    packages = resolution.container_packages.len(),
                    paths = %image.paths(),
                    "Analyzed image"
                );
                resolutions.push(resolution);
            }
            Err(err) => {
                error!(image = %image.name, error = %err, "Could not analyze image");
            }
        }
    }

    resolutions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Origin;
    use anyhow::bail;

    struct FailingOn(&'static str);

    #[async_trait]
    impl ImageAnalyzer for FailingOn {
        async fn analyze(&self, image: &ImageModel) -> Result<ContainerResolution> {
            if image.name == self.0 {
                bail!("pull failed");
            }
            Ok(ContainerResolution {
                container_image: ContainerImage {
                    image_id: image.name.clone(),
                    ..Default::default()
                },
                container_packages: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_failed_images_are_skipped() {
        let images = vec![
            ImageModel::found_at("alpine:3.19", Origin::Dockerfile, "Dockerfile"),
            ImageModel::found_at("private/app:1.0", Origin::DockerCompose, "docker-compose.yml"),
            ImageModel::user_input("redis"),
        ];

        let resolutions = analyze_images(&FailingOn("private/app:1.0"), &images).await;

        let ids: Vec<&str> = resolutions
            .iter()
            .map(|r| r.container_image.image_id.as_str())
            .collect();
        assert_eq!(ids, vec!["alpine:3.19", "redis:latest"]);
    }

    #[tokio::test]
    async fn test_no_images() {
        assert!(analyze_images(&FailingOn(""), &[]).await.is_empty());
    }
}
