//! docker-compose image extraction

use crate::discovery::resolve_for_file;
use crate::fs::FileSystem;
use crate::types::{normalize_reference, FilePath, ImageModel, Origin, SettingsTable};
use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use tracing::{debug, warn};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"\$\{(\w+)(?::-([^}]*))?\}|\{\{\s*(\w+)\s*\}\}")
            .expect("Invalid compose placeholder regex")
    })
}

#[derive(Debug, Default, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    services: Option<BTreeMap<String, Option<ComposeService>>>,
}

#[derive(Debug, Default, Deserialize)]
struct ComposeService {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    build: Option<serde_yaml::Value>,
}

/// Substitutes `${VAR}`, `{{VAR}}` and `${VAR:-default}` placeholders.
///
/// Known variables win over the inline default. Placeholders with neither a
/// known value nor a default are left as written.
pub fn substitute(value: &str, vars: &HashMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(value, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();

            if let Some(known) = vars.get(name) {
                return known.clone();
            }
            match caps.get(2) {
                Some(default) => default.as_str().to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Extracts one image per service that declares `image:`, including images
/// inherited through YAML merge keys.
///
/// Services are visited in name order. Build-only services contribute nothing.
pub fn parse_compose(
    content: &str,
    relative_path: &str,
    vars: &HashMap<String, String>,
) -> Result<Vec<ImageModel>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut document: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Failed to parse docker compose file {}", relative_path))?;
    if document.is_null() {
        return Ok(Vec::new());
    }
    // `<<: *anchor` keys are kept verbatim by serde_yaml until merged
    document
        .apply_merge()
        .with_context(|| format!("Failed to expand merge keys in {}", relative_path))?;
    let compose: ComposeFile = serde_yaml::from_value(document)
        .with_context(|| format!("Failed to parse docker compose file {}", relative_path))?;

    let mut images = Vec::new();

    for (service, definition) in compose.services.unwrap_or_default() {
        let definition = definition.unwrap_or_default();
        let image = match definition.image.as_deref().map(str::trim) {
            Some(image) if !image.is_empty() => image,
            _ => {
                if definition.build.is_some() {
                    debug!(path = relative_path, service = %service, "Service is built locally, no image");
                } else {
                    debug!(path = relative_path, service = %service, "Service declares no image");
                }
                continue;
            }
        };

        let resolved = substitute(image, vars);
        let name = normalize_reference(&resolved);
        if name.is_empty() {
            debug!(path = relative_path, service = %service, "Image resolved to an empty reference");
            continue;
        }
        if name.contains("${") || name.contains("{{") {
            debug!(path = relative_path, service = %service, image = %name, "Image still contains placeholders");
        }

        images.push(ImageModel::found_at(name, Origin::DockerCompose, relative_path));
    }

    Ok(images)
}

/// Reads and parses a single compose file
pub fn extract_file_images<F: FileSystem>(
    fs: &F,
    file: &FilePath,
    settings: &SettingsTable,
) -> Result<Vec<ImageModel>> {
    let content = fs
        .read_to_string(&file.full_path)
        .with_context(|| format!("Failed to read docker compose file {}", file.relative_path))?;
    let vars = resolve_for_file(settings, &file.full_path);
    parse_compose(&content, &file.relative_path, &vars)
}

/// Extracts images from every compose file. Files that fail to read or
/// parse contribute nothing.
pub fn extract_images<F: FileSystem>(
    fs: &F,
    files: &[FilePath],
    settings: &SettingsTable,
) -> Vec<ImageModel> {
    let mut images = Vec::new();

    for file in files {
        debug!(path = %file.relative_path, "Extracting images from docker compose file");
        match extract_file_images(fs, file, settings) {
            Ok(found) => {
                super::log_found_images(&file.relative_path, &found);
                images.extend(found);
            }
            Err(err) => {
                warn!(path = %file.relative_path, error = %err, "Could not extract images from docker compose file");
            }
        }
    }

    images
}
