//! End-to-end resolution: discover files, extract and merge images, analyze
//! them and persist the result.

use crate::analysis::{analyze_images, ContainerResolution, ImageAnalyzer, SyftCli};
use crate::config::ResolverConfig;
use crate::error::{ResolverError, Result};
use crate::extractors::ImagesExtractor;
use crate::helm::HelmRenderer;
use crate::types::ImageModel;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// File written into the resolution folder
pub const RESOLUTION_FILE_NAME: &str = "containers-resolution.json";

pub struct Resolver {
    extractor: Arc<ImagesExtractor>,
    analyzer: Box<dyn ImageAnalyzer>,
}

impl Resolver {
    /// Uses `helm` and `syft` as configured
    pub fn new(config: ResolverConfig) -> Self {
        let analyzer = Box::new(SyftCli::from_config(&config));
        Self {
            extractor: Arc::new(ImagesExtractor::new(config)),
            analyzer,
        }
    }

    pub fn with_collaborators(
        config: ResolverConfig,
        renderer: Box<dyn HelmRenderer>,
        analyzer: Box<dyn ImageAnalyzer>,
    ) -> Self {
        Self {
            extractor: Arc::new(ImagesExtractor::with_renderer(config, renderer)),
            analyzer,
        }
    }

    /// Resolves every image found under `scan_path` plus `user_images`, and
    /// writes the result to `<resolution_folder>/containers-resolution.json`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid resolution folder or scan path, on archive
    /// extraction errors and when the result cannot be written. Individual
    /// files and images that fail are skipped.
    pub async fn resolve(
        &self,
        scan_path: &Path,
        resolution_folder: &Path,
        user_images: &[String],
    ) -> Result<Vec<ContainerResolution>> {
        let start = Instant::now();
        info!(
            scan_path = %scan_path.display(),
            resolution_folder = %resolution_folder.display(),
            images = ?user_images,
            "Starting resolution"
        );

        if !resolution_folder.is_dir() {
            return Err(ResolverError::InvalidResolutionFolder(
                resolution_folder.to_path_buf(),
            ));
        }

        let images = self.extract(scan_path, user_images).await?;
        let resolutions = analyze_images(self.analyzer.as_ref(), &images).await;
        save_resolution(resolution_folder, &resolutions)?;

        info!(
            resolved = resolutions.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Resolution completed"
        );
        Ok(resolutions)
    }

    /// Discovers and merges image references without analyzing them.
    ///
    /// Archive unpacking, the directory walk and helm rendering block, so
    /// they run on the blocking thread pool.
    pub async fn extract(&self, scan_path: &Path, user_images: &[String]) -> Result<Vec<ImageModel>> {
        if !scan_path.exists() {
            return Err(ResolverError::ScanPathNotFound(scan_path.to_path_buf()));
        }

        let extractor = Arc::clone(&self.extractor);
        let scan_path = scan_path.to_path_buf();
        let user_images = user_images.to_vec();

        tokio::task::spawn_blocking(move || extract_with_cleanup(&extractor, &scan_path, &user_images))
            .await?
    }
}

/// Runs discovery and merging, then removes any extracted archive directory
/// whether or not merging succeeded
fn extract_with_cleanup(
    extractor: &ImagesExtractor,
    scan_path: &Path,
    user_images: &[String],
) -> Result<Vec<ImageModel>> {
    let extracted = extractor.extract_files(scan_path)?;
    let outcome = extractor
        .extract_and_merge_images(&extracted.files, user_images, &extracted.settings)
        .map_err(|e| ResolverError::discovery(&extracted.working_dir, e));
    cleanup(scan_path, &extracted.working_dir);
    outcome
}

/// Convenience wrapper around [`Resolver::resolve`] with the default collaborators
pub async fn resolve(
    scan_path: &Path,
    resolution_folder: &Path,
    user_images: &[String],
    config: ResolverConfig,
) -> Result<Vec<ContainerResolution>> {
    config.validate()?;
    Resolver::new(config)
        .resolve(scan_path, resolution_folder, user_images)
        .await
}

/// Writes the resolutions as pretty-printed JSON and returns the file path
pub fn save_resolution(
    resolution_folder: &Path,
    resolutions: &[ContainerResolution],
) -> Result<PathBuf> {
    let path = resolution_folder.join(RESOLUTION_FILE_NAME);
    let json = serde_json::to_string_pretty(resolutions)?;
    fs::write(&path, json).map_err(|e| ResolverError::io(&path, e))?;
    info!(path = %path.display(), entries = resolutions.len(), "Saved resolution");
    Ok(path)
}

/// Removes an extracted archive directory. The scan path itself is never removed.
fn cleanup(scan_path: &Path, working_dir: &Path) {
    if working_dir == scan_path {
        return;
    }
    if let Err(err) = fs::remove_dir_all(working_dir) {
        warn!(path = %working_dir.display(), error = %err, "Could not remove extracted files");
    }
}
