//! Image analysis backed by the `syft` command line tool
//!
//! `syft <image> -o syft-json` is run for each image and its document is
//! mapped onto the resolution model.

use super::types::{ContainerImage, ContainerPackage, ContainerResolution, Layer, ResolvedLocation};
use super::ImageAnalyzer;
use crate::config::ResolverConfig;
use crate::types::{ImageModel, DEFAULT_TAG, NO_FILE_PATH};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, warn};

const SHA256_PREFIX: &str = "sha256:";

/// Package types whose names are qualified with their group id
const GROUPED_PACKAGE_TYPES: &[&str] = &["java-archive", "maven", "ios", "pod", "cocoapodspkg"];

fn purl_group_regex() -> &'static Regex {
    static PURL_GROUP_REGEX: OnceLock<Regex> = OnceLock::new();
    PURL_GROUP_REGEX.get_or_init(|| Regex::new(r"/(.*?)/").expect("Invalid purl regex"))
}

#[derive(Debug, Default, Deserialize)]
pub struct SyftDocument {
    #[serde(default)]
    pub artifacts: Vec<SyftArtifact>,
    #[serde(default)]
    pub source: Option<SyftSource>,
    #[serde(default)]
    pub distro: Option<SyftDistro>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyftArtifact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "type", default)]
    pub package_type: String,
    #[serde(default)]
    pub purl: String,
    #[serde(default)]
    pub licenses: Vec<SyftLicense>,
    #[serde(default)]
    pub locations: Vec<SyftLocation>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Older syft releases emit plain strings, newer ones objects
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SyftLicense {
    Plain(String),
    Detailed { value: String },
}

impl SyftLicense {
    fn value(&self) -> &str {
        match self {
            SyftLicense::Plain(v) => v,
            SyftLicense::Detailed { value } => value,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SyftLocation {
    #[serde(rename = "layerID", default)]
    pub layer_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyftSource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub metadata: SyftImageMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyftImageMetadata {
    #[serde(default)]
    pub layers: Vec<SyftLayer>,
    /// Base64 encoded image config
    #[serde(default)]
    pub config: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyftLayer {
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub size: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyftDistro {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "versionID", default)]
    pub version_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ImageConfig {
    #[serde(default)]
    history: Vec<HistoryEntry>,
    #[serde(default)]
    rootfs: RootFs,
}

#[derive(Debug, Default, Deserialize)]
struct HistoryEntry {
    #[serde(default)]
    created_by: String,
    #[serde(default)]
    empty_layer: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RootFs {
    #[serde(default)]
    diff_ids: Vec<String>,
}

/// Runs `syft` as a subprocess
#[derive(Debug, Clone)]
pub struct SyftCli {
    binary: String,
    platform: String,
}

impl SyftCli {
    pub fn new(binary: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            platform: platform.into(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.syft_bin.clone(), config.platform.clone())
    }

    async fn run(&self, reference: &str) -> Result<SyftDocument> {
        let output = Command::new(&self.binary)
            .arg(reference)
            .args(["-o", "syft-json", "-q"])
            .arg("--platform")
            .arg(&self.platform)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} exited with {} for {}: {}",
                self.binary,
                output.status,
                reference,
                stderr.trim()
            );
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("Failed to parse syft output for {}", reference))
    }
}

#[async_trait]
impl ImageAnalyzer for SyftCli {
    async fn analyze(&self, image: &ImageModel) -> Result<ContainerResolution> {
        debug!(image = %image.name, paths = %image.paths(), platform = %self.platform, "Running syft");
        let document = self.run(&image.name).await?;
        Ok(to_resolution(&document, image))
    }
}

/// Maps a syft document onto the resolution model
pub fn to_resolution(document: &SyftDocument, image: &ImageModel) -> ContainerResolution {
    let distribution = distribution(document.distro.as_ref());
    let source = document.source.as_ref();

    let history = source
        .map(|s| extract_history(&s.metadata))
        .unwrap_or_default();
    let layers = history
        .iter()
        .filter(|l| !l.layer_id.is_empty())
        .map(|l| l.layer_id.clone())
        .collect();

    let (name, tag) = match image.name.split_once('@') {
        Some(_) => (image.name.as_str(), ""),
        None => (image.repository(), image.tag()),
    };

    let container_image = ContainerImage {
        image_name: name.to_string(),
        image_tag: if tag.is_empty() { DEFAULT_TAG.to_string() } else { tag.to_string() },
        image_id: image.name.clone(),
        image_hash: source.map(|s| s.id.clone()).unwrap_or_default(),
        distribution: distribution.clone(),
        layers,
        history,
        image_locations: image.locations.iter().map(ResolvedLocation::from).collect(),
    };

    ContainerResolution {
        container_image,
        container_packages: extract_packages(&document.artifacts, &distribution),
    }
}

fn distribution(distro: Option<&SyftDistro>) -> String {
    match distro {
        Some(d) if !d.id.is_empty() && !d.version_id.is_empty() => format!("{}:{}", d.id, d.version_id),
        _ => NO_FILE_PATH.to_string(),
    }
}

fn strip_sha256(value: &str) -> &str {
    value.strip_prefix(SHA256_PREFIX).unwrap_or(value)
}

fn extract_history(metadata: &SyftImageMetadata) -> Vec<Layer> {
    let config = match decode_config(&metadata.config) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "Could not decode image config, history omitted");
            return Vec::new();
        }
    };

    let mut diff_ids = config.rootfs.diff_ids.iter();

    config
        .history
        .iter()
        .enumerate()
        .map(|(order, entry)| {
            let layer_id = if entry.empty_layer {
                String::new()
            } else {
                diff_ids
                    .next()
                    .map(|id| strip_sha256(id).to_string())
                    .unwrap_or_default()
            };
            let size = layer_size(&layer_id, &metadata.layers);

            Layer {
                order,
                size,
                layer_id,
                command: entry.created_by.clone(),
            }
        })
        .collect()
}

fn decode_config(encoded: &str) -> Result<ImageConfig> {
    if encoded.is_empty() {
        return Ok(ImageConfig::default());
    }
    let raw = STANDARD.decode(encoded).context("Image config is not valid base64")?;
    serde_json::from_slice(&raw).context("Image config is not valid JSON")
}

fn layer_size(layer_id: &str, layers: &[SyftLayer]) -> i64 {
    if layer_id.is_empty() {
        return 0;
    }
    layers
        .iter()
        .find(|l| strip_sha256(&l.digest) == layer_id)
        .map(|l| l.size)
        .unwrap_or(0)
}

fn extract_packages(artifacts: &[SyftArtifact], distribution: &str) -> Vec<ContainerPackage> {
    let mut seen = HashSet::new();
    let mut packages = Vec::new();

    for artifact in artifacts {
        if artifact.name.is_empty() || artifact.version.is_empty() {
            continue;
        }
        if !seen.insert((artifact.name.as_str(), artifact.version.as_str())) {
            debug!(package = %artifact.name, version = %artifact.version, "Skipping duplicate package");
            continue;
        }

        let (source_name, source_version) = source_package(artifact);

        packages.push(ContainerPackage {
            name: package_name(artifact),
            version: artifact.version.clone(),
            distribution: distribution.to_string(),
            package_type: artifact.package_type.clone(),
            source_name,
            source_version,
            licenses: artifact.licenses.iter().map(|l| l.value().to_string()).collect(),
            layer_ids: artifact
                .locations
                .iter()
                .filter(|l| !l.layer_id.is_empty())
                .map(|l| strip_sha256(&l.layer_id).to_string())
                .collect(),
        });
    }

    packages
}

/// Qualifies grouped ecosystems (maven, cocoapods) as `group:name`
fn package_name(artifact: &SyftArtifact) -> String {
    let package_type = artifact.package_type.to_lowercase();
    if !GROUPED_PACKAGE_TYPES.contains(&package_type.as_str()) {
        return artifact.name.clone();
    }

    let group_id = artifact
        .metadata
        .pointer("/pomProperties/groupId")
        .and_then(|v| v.as_str())
        .filter(|g| !g.trim().is_empty())
        .map(str::to_string)
        .or_else(|| {
            purl_group_regex()
                .captures(&artifact.purl)
                .map(|caps| caps[1].trim().to_string())
                .filter(|g| !g.is_empty())
        });

    match group_id {
        Some(group) if group != artifact.name => format!("{}:{}", group, artifact.name),
        _ => artifact.name.clone(),
    }
}

/// Source package recorded by apk, deb and rpm databases
fn source_package(artifact: &SyftArtifact) -> (String, String) {
    let field = |name: &str| {
        artifact
            .metadata
            .get(name)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let (source_name, version_field) = match artifact.package_type.as_str() {
        "apk" => (field("originPackage"), field("version")),
        "deb" => (field("source"), field("sourceVersion")),
        "rpm" => (field("sourceRpm"), field("version")),
        _ => return (String::new(), String::new()),
    };

    if source_name.is_empty() {
        return (String::new(), String::new());
    }

    let source_version = if version_field.is_empty() {
        artifact.version.clone()
    } else {
        version_field
    };

    (source_name, source_version)
}
