//! Image references from rendered Helm manifests
//!
//! Rendered output is a stream of YAML documents, each preceded by a
//! `# Source: <template>` comment. Images are read from the `spec.image`
//! block (`registry`, `name`, `tag`) of each document.

use crate::helm::HelmRenderer;
use crate::types::{HelmChartInfo, ImageModel, Origin, DEFAULT_TAG};
use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{debug, error, warn};

fn separator_regex() -> &'static Regex {
    static SEPARATOR_REGEX: OnceLock<Regex> = OnceLock::new();
    SEPARATOR_REGEX.get_or_init(|| Regex::new(r"(?m)^---[ \t]*$").expect("Invalid separator regex"))
}

fn source_regex() -> &'static Regex {
    static SOURCE_REGEX: OnceLock<Regex> = OnceLock::new();
    SOURCE_REGEX.get_or_init(|| Regex::new(r"#\s*Source:\s*([^\n]+)").expect("Invalid source regex"))
}

#[derive(Debug, Default, Deserialize)]
struct Resource {
    #[serde(default)]
    spec: Option<ResourceSpec>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceSpec {
    #[serde(default)]
    image: Option<ImageSpec>,
}

// Tags are often rendered unquoted, so scalars are accepted in any YAML type
#[derive(Debug, Default, Deserialize)]
struct ImageSpec {
    #[serde(default)]
    registry: Option<serde_yaml::Value>,
    #[serde(default)]
    name: Option<serde_yaml::Value>,
    #[serde(default)]
    tag: Option<serde_yaml::Value>,
}

fn scalar(value: &Option<serde_yaml::Value>) -> String {
    match value {
        Some(serde_yaml::Value::String(s)) => s.trim().to_string(),
        Some(serde_yaml::Value::Number(n)) => n.to_string(),
        Some(serde_yaml::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

impl ImageSpec {
    fn reference(&self) -> Option<String> {
        let name = scalar(&self.name);
        if name.is_empty() {
            return None;
        }

        let tag = match scalar(&self.tag) {
            t if t.is_empty() => DEFAULT_TAG.to_string(),
            t => t,
        };

        let registry = scalar(&self.registry);
        let registry = registry.trim_end_matches('/');
        if registry.is_empty() {
            Some(format!("{}:{}", name, tag))
        } else {
            Some(format!("{}/{}:{}", registry, name, tag))
        }
    }
}

/// Template path named by the section's `# Source:` comment
pub fn section_source(section: &str) -> Option<String> {
    source_regex()
        .captures(section)
        .map(|caps| caps[1].trim().to_string())
}

fn has_yaml_content(section: &str) -> bool {
    section.lines().any(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with('#')
    })
}

/// Extracts one image per rendered document that carries a `spec.image` block.
///
/// Documents that do not decode, or whose image has no name, are skipped.
pub fn parse_rendered(manifest: &str) -> Vec<ImageModel> {
    let mut images = Vec::new();

    for section in separator_regex().split(manifest) {
        if !has_yaml_content(section) {
            continue;
        }

        let source = section_source(section).unwrap_or_else(|| {
            warn!("Rendered helm section has no Source comment");
            String::new()
        });

        let resource: Resource = match serde_yaml::from_str(section) {
            Ok(resource) => resource,
            Err(err) => {
                warn!(source = %source, error = %err, "Could not decode rendered helm section");
                continue;
            }
        };

        let reference = resource
            .spec
            .and_then(|spec| spec.image)
            .and_then(|image| image.reference());

        match reference {
            Some(name) => images.push(ImageModel::found_at(name, Origin::Helm, source)),
            None => debug!(source = %source, "Rendered helm section has no image"),
        }
    }

    images
}

/// Renders and parses a single chart
pub fn extract_chart_images(renderer: &dyn HelmRenderer, chart: &HelmChartInfo) -> Result<Vec<ImageModel>> {
    let manifest = renderer.render(chart)?;
    Ok(parse_rendered(&manifest))
}

/// Extracts images from every chart. A chart that fails to render
/// contributes nothing.
pub fn extract_images(renderer: &dyn HelmRenderer, charts: &[HelmChartInfo]) -> Vec<ImageModel> {
    let mut images = Vec::new();

    for chart in charts {
        let directory = chart.directory.display().to_string();
        debug!(chart = %directory, "Extracting images from helm chart");

        match extract_chart_images(renderer, chart) {
            Ok(found) => {
                super::log_found_images(&directory, &found);
                images.extend(found);
            }
            Err(err) => {
                error!(chart = %directory, error = %err, "Could not render helm chart");
            }
        }
    }

    images
}
