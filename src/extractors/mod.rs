//! Image reference extraction
//!
//! `ImagesExtractor` ties the pieces together: discovery produces the
//! classified files and settings table, each format parser turns its files
//! into image models, and the merger deduplicates them with user input.

pub mod compose;
pub mod dockerfile;
pub mod helm;
pub mod merge;

pub use dockerfile::{DockerfileParser, StageAliases};
pub use merge::{merge_images, ImageMerger};

use crate::config::ResolverConfig;
use crate::discovery::{extract_root, load_settings, PathWalker};
use crate::error::{ResolverError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::helm::{HelmCli, HelmRenderer};
use crate::types::{FileImages, ImageModel, SettingsTable};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output of the discovery stage
#[derive(Debug, Clone)]
pub struct ExtractedFiles {
    pub files: FileImages,
    pub settings: SettingsTable,
    /// Directory that was walked. Differs from the scan path for archives.
    pub working_dir: PathBuf,
}

pub struct ImagesExtractor<F: FileSystem = RealFileSystem> {
    fs: F,
    config: ResolverConfig,
    renderer: Box<dyn HelmRenderer>,
}

impl ImagesExtractor<RealFileSystem> {
    /// Creates an extractor that renders charts with the configured helm binary
    pub fn new(config: ResolverConfig) -> Self {
        let renderer = Box::new(HelmCli::from_config(&config));
        Self::with_renderer(config, renderer)
    }

    pub fn with_renderer(config: ResolverConfig, renderer: Box<dyn HelmRenderer>) -> Self {
        Self::with_fs(RealFileSystem::new(), config, renderer)
    }

    /// Unpacks the scan path if needed, then classifies files and loads settings
    pub fn extract_files(&self, scan_path: &Path) -> Result<ExtractedFiles> {
        let working_dir = extract_root(scan_path)?;

        let walk = PathWalker::new(working_dir.clone(), self.config.clone())
            .walk()
            .map_err(|e| ResolverError::discovery(&working_dir, e))?;

        let settings = load_settings(&self.fs, &walk.settings_files);

        info!(
            scan_path = %scan_path.display(),
            working_dir = %working_dir.display(),
            dockerfiles = walk.files.dockerfiles.len(),
            compose_files = walk.files.docker_compose.len(),
            helm_charts = walk.files.helm.len(),
            settings_dirs = settings.len(),
            "Extracted files"
        );

        Ok(ExtractedFiles {
            files: walk.files,
            settings,
            working_dir,
        })
    }
}

impl<F: FileSystem> ImagesExtractor<F> {
    pub fn with_fs(fs: F, config: ResolverConfig, renderer: Box<dyn HelmRenderer>) -> Self {
        Self {
            fs,
            config,
            renderer,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Runs every parser over the classified files and merges the results
    /// with the user-supplied image names.
    ///
    /// Per-file failures are logged and skipped, so this only fails if the
    /// merge itself cannot run.
    pub fn extract_and_merge_images(
        &self,
        files: &FileImages,
        user_images: &[String],
        settings: &SettingsTable,
    ) -> anyhow::Result<Vec<ImageModel>> {
        let user_models: Vec<ImageModel> = user_images
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(ImageModel::user_input)
            .collect();

        let parser = DockerfileParser::new(self.config.max_alias_depth);
        let dockerfile_images = dockerfile::extract_images(&self.fs, &parser, &files.dockerfiles, settings);
        let compose_images = compose::extract_images(&self.fs, &files.docker_compose, settings);
        let helm_images = helm::extract_images(self.renderer.as_ref(), &files.helm);

        debug!(
            user = user_models.len(),
            dockerfile = dockerfile_images.len(),
            compose = compose_images.len(),
            helm = helm_images.len(),
            "Merging extracted images"
        );

        let merged = merge_images(user_models, dockerfile_images, compose_images, helm_images);

        info!(images = merged.len(), "Extracted images");
        for image in &merged {
            debug!(image = %image.name, paths = %image.paths(), "Image to analyze");
        }

        Ok(merged)
    }
}

pub(crate) fn log_found_images(path: &str, images: &[ImageModel]) {
    if images.is_empty() {
        debug!(path = path, "No images found in file");
    } else {
        let names: Vec<&str> = images.iter().map(|i| i.name.as_str()).collect();
        debug!(path = path, images = %names.join(", "), "Found images in file");
    }
}
