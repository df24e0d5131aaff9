//! containers-resolver - finds the container images a project depends on
//!
//! A scan path (a directory, or a `.zip`/`.tar`/`.tar.gz` archive of one) is
//! walked for Dockerfiles, docker-compose files and Helm charts. Image
//! references are extracted from each, placeholders are substituted from
//! build arguments and settings files, and the results are merged with any
//! images the caller names explicitly. Each merged image remembers every
//! place it was found.
//!
//! The merged list is then handed to an [`analysis::ImageAnalyzer`] (syft by
//! default) and the inventory is written to `containers-resolution.json`.
//!
//! ```ignore
//! use containers_resolver::{resolve, ResolverConfig};
//! use std::path::Path;
//!
//! let resolutions = resolve(
//!     Path::new("repo.zip"),
//!     Path::new("out"),
//!     &["nginx:1.25".to_string()],
//!     ResolverConfig::default(),
//! )
//! .await?;
//! ```
//!
//! # Project Structure
//!
//! - [`discovery`]: archive extraction, file classification and settings files
//! - [`extractors`]: per-format image extraction and merging
//! - [`analysis`]: image inventory through syft
//! - [`resolver`]: the end-to-end flow

pub mod analysis;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extractors;
pub mod fs;
pub mod helm;
pub mod resolver;
pub mod types;
pub mod util;

pub use analysis::{ContainerImage, ContainerPackage, ContainerResolution, ImageAnalyzer, SyftCli};
pub use config::{ConfigError, ResolverConfig};
pub use error::ResolverError;
pub use extractors::ImagesExtractor;
pub use helm::{HelmCli, HelmRenderer};
pub use resolver::{resolve, save_resolution, Resolver, RESOLUTION_FILE_NAME};
pub use types::{
    normalize_reference, FileImages, FilePath, HelmChartInfo, ImageLocation, ImageModel, Origin,
    SettingsTable,
};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
