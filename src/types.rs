//! Core data model shared by discovery, extraction and analysis
//!
//! An image reference is carried as a normalized `name:tag` string. Equality
//! for deduplication is exact string equality on that value.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Provenance path recorded for images that did not come from a file
pub const NO_FILE_PATH: &str = "NONE";

/// Tag applied when a reference carries none
pub const DEFAULT_TAG: &str = "latest";

/// Kind of source an image reference was discovered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    #[serde(rename = "UserInput")]
    UserInput,
    #[serde(rename = "Dockerfile")]
    Dockerfile,
    #[serde(rename = "DockerCompose")]
    DockerCompose,
    #[serde(rename = "Helm")]
    Helm,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Origin::UserInput => "UserInput",
            Origin::Dockerfile => "Dockerfile",
            Origin::DockerCompose => "DockerCompose",
            Origin::Helm => "Helm",
        };
        f.write_str(name)
    }
}

/// One place an image reference was found
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageLocation {
    pub origin: Origin,
    pub path: String,
}

impl ImageLocation {
    pub fn new(origin: Origin, path: impl Into<String>) -> Self {
        Self {
            origin,
            path: path.into(),
        }
    }
}

/// A unique image reference and every location it was discovered at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageModel {
    pub name: String,
    pub locations: Vec<ImageLocation>,
}

impl ImageModel {
    /// Creates a model with a single provenance entry
    pub fn found_at(name: impl Into<String>, origin: Origin, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locations: vec![ImageLocation::new(origin, path)],
        }
    }

    /// Creates a model for an image supplied on the command line
    pub fn user_input(name: &str) -> Self {
        Self::found_at(normalize_reference(name), Origin::UserInput, NO_FILE_PATH)
    }

    /// Appends a location unless the same `(origin, path)` pair is already recorded
    pub fn add_location(&mut self, location: ImageLocation) -> bool {
        if self.locations.contains(&location) {
            return false;
        }
        self.locations.push(location);
        true
    }

    /// Image name without the tag
    pub fn repository(&self) -> &str {
        split_reference(&self.name).0
    }

    /// Image tag, `latest` when none is present
    pub fn tag(&self) -> &str {
        split_reference(&self.name).1.unwrap_or(DEFAULT_TAG)
    }

    /// Comma-separated list of provenance paths, for log lines
    pub fn paths(&self) -> String {
        self.locations
            .iter()
            .map(|l| l.path.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A file identified both by its working path and by its path relative to the scan root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePath {
    pub full_path: PathBuf,
    pub relative_path: String,
}

impl FilePath {
    pub fn new(full_path: impl Into<PathBuf>, relative_path: impl Into<String>) -> Self {
        Self {
            full_path: full_path.into(),
            relative_path: relative_path.into(),
        }
    }
}

/// A directory recognized as a Helm chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmChartInfo {
    /// Working path of the chart directory
    pub directory: PathBuf,
    /// `values.yaml` relative to the scan root
    pub values_file: String,
    pub template_files: Vec<FilePath>,
}

/// Classified files found while walking a scan root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileImages {
    pub dockerfiles: Vec<FilePath>,
    pub docker_compose: Vec<FilePath>,
    pub helm: Vec<HelmChartInfo>,
}

impl FileImages {
    pub fn is_empty(&self) -> bool {
        self.dockerfiles.is_empty() && self.docker_compose.is_empty() && self.helm.is_empty()
    }
}

/// Variables defined by settings files, keyed by the directory that holds them
pub type SettingsTable = HashMap<PathBuf, HashMap<String, String>>;

/// Splits `registry:5000/name:tag` into `("registry:5000/name", Some("tag"))`.
///
/// A colon only separates a tag when it comes after the last `/`, so registry
/// ports are never mistaken for tags.
pub fn split_reference(reference: &str) -> (&str, Option<&str>) {
    let last_slash = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    match reference[last_slash..].rfind(':') {
        Some(idx) => {
            let idx = last_slash + idx;
            (&reference[..idx], Some(&reference[idx + 1..]))
        }
        None => (reference, None),
    }
}

/// Normalizes an image reference to `name:tag`, defaulting the tag to `latest`.
///
/// Digest references (`name@sha256:...`) are returned unchanged.
pub fn normalize_reference(reference: &str) -> String {
    let reference = reference.trim();
    if reference.is_empty() || reference.contains('@') {
        return reference.to_string();
    }
    match split_reference(reference) {
        (name, Some(tag)) if !tag.is_empty() => format!("{}:{}", name, tag),
        (name, _) => format!("{}:{}", name, DEFAULT_TAG),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        bare = { "alpine", "alpine:latest" },
        tagged = { "alpine:3.19", "alpine:3.19" },
        namespaced = { "minio/minio:RELEASE.2020-06-22T03-12-50Z", "minio/minio:RELEASE.2020-06-22T03-12-50Z" },
        registry_port = { "localhost:5000/app", "localhost:5000/app:latest" },
        registry_port_tagged = { "localhost:5000/app:1.2", "localhost:5000/app:1.2" },
        trailing_colon = { "nginx:", "nginx:latest" },
        digest = { "nginx@sha256:abc", "nginx@sha256:abc" },
        padded = { "  redis  ", "redis:latest" },
    )]
    fn test_normalize_reference(input: &str, expected: &str) {
        assert_eq!(normalize_reference(input), expected);
    }

    #[test]
    fn test_split_reference() {
        assert_eq!(split_reference("golang:1.20"), ("golang", Some("1.20")));
        assert_eq!(split_reference("golang"), ("golang", None));
        assert_eq!(
            split_reference("registry.io:443/team/api"),
            ("registry.io:443/team/api", None)
        );
    }

    #[test]
    fn test_add_location_deduplicates() {
        let mut model = ImageModel::found_at("nginx:latest", Origin::Dockerfile, "Dockerfile");

        assert!(!model.add_location(ImageLocation::new(Origin::Dockerfile, "Dockerfile")));
        assert!(model.add_location(ImageLocation::new(Origin::DockerCompose, "Dockerfile")));
        assert_eq!(model.locations.len(), 2);
        assert_eq!(model.paths(), "Dockerfile,Dockerfile");
    }

    #[test]
    fn test_user_input_model() {
        let model = ImageModel::user_input("alpine");

        assert_eq!(model.name, "alpine:latest");
        assert_eq!(model.repository(), "alpine");
        assert_eq!(model.tag(), "latest");
        assert_eq!(
            model.locations,
            vec![ImageLocation::new(Origin::UserInput, NO_FILE_PATH)]
        );
    }

    #[test]
    fn test_origin_serializes_to_display_name() {
        let json = serde_json::to_string(&Origin::DockerCompose).unwrap();
        assert_eq!(json, "\"DockerCompose\"");
        assert_eq!(Origin::Helm.to_string(), "Helm");
    }
}
