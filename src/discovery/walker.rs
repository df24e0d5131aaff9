//! Scan-root walk that classifies Dockerfiles, compose files, Helm charts and settings files

use crate::config::ResolverConfig;
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{FileImages, FilePath, HelmChartInfo};
use anyhow::{Context, Result};
use ignore::{DirEntry, WalkBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

const DOCKERFILE_SUFFIX: &str = "Dockerfile";
const COMPOSE_SUFFIXES: &[&str] = &["docker-compose.yml", "docker-compose.yaml"];
const HELM_CHART_FILE: &str = "Chart.yaml";
const HELM_VALUES_FILE: &str = "values.yaml";
const HELM_TEMPLATES_DIR: &str = "templates";

/// Everything classified during a walk
#[derive(Debug, Clone, Default)]
pub struct WalkResult {
    pub files: FileImages,
    /// Settings files grouped by their containing directory
    pub settings_files: BTreeMap<PathBuf, Vec<PathBuf>>,
    pub entries_visited: usize,
}

/// Recursively classifies the files under a scan root. No file content is read.
pub struct PathWalker<F: FileSystem = RealFileSystem> {
    root: PathBuf,
    fs: F,
    config: ResolverConfig,
}

impl PathWalker<RealFileSystem> {
    pub fn new(root: PathBuf, config: ResolverConfig) -> Self {
        Self::with_fs(root, RealFileSystem::new(), config)
    }
}

impl<F: FileSystem> PathWalker<F> {
    pub fn with_fs(root: PathBuf, fs: F, config: ResolverConfig) -> Self {
        Self { root, fs, config }
    }

    pub fn walk(&self) -> Result<WalkResult> {
        let start = Instant::now();

        if !self.fs.is_dir(&self.root) {
            anyhow::bail!("Scan root is not a directory: {:?}", self.root);
        }

        info!(root = %self.root.display(), "Walking scan root");

        let mut result = WalkResult::default();

        for entry in self.walker(&self.root) {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable directory entry");
                    continue;
                }
            };
            result.entries_visited += 1;

            if is_dir_entry(&entry) {
                if self.is_helm_chart(entry.path()) {
                    match self.helm_chart(entry.path()) {
                        Ok(chart) => {
                            debug!(
                                chart = %chart.directory.display(),
                                templates = chart.template_files.len(),
                                "Found helm chart"
                            );
                            result.files.helm.push(chart);
                        }
                        Err(err) => {
                            warn!(path = %entry.path().display(), error = %err, "Could not read helm chart");
                        }
                    }
                }
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let path = entry.path();

            if name.ends_with(DOCKERFILE_SUFFIX) {
                result.files.dockerfiles.push(self.file_path(path));
            } else if COMPOSE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                result.files.docker_compose.push(self.file_path(path));
            } else if self.config.is_settings_file(name) {
                let dir = path.parent().unwrap_or(&self.root).to_path_buf();
                result
                    .settings_files
                    .entry(dir)
                    .or_default()
                    .push(path.to_path_buf());
            }
        }

        log_found(&result.files.dockerfiles, "Found dockerfiles");
        log_found(&result.files.docker_compose, "Found docker compose files");

        info!(
            dockerfiles = result.files.dockerfiles.len(),
            compose_files = result.files.docker_compose.len(),
            helm_charts = result.files.helm.len(),
            settings_dirs = result.settings_files.len(),
            entries = result.entries_visited,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Walk completed"
        );

        Ok(result)
    }

    fn walker(&self, dir: &Path) -> ignore::Walk {
        WalkBuilder::new(dir)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build()
    }

    fn is_helm_chart(&self, dir: &Path) -> bool {
        self.fs.is_file(&dir.join(HELM_CHART_FILE))
            && self.fs.is_file(&dir.join(HELM_VALUES_FILE))
            && self.fs.is_dir(&dir.join(HELM_TEMPLATES_DIR))
    }

    fn helm_chart(&self, dir: &Path) -> Result<HelmChartInfo> {
        let templates_dir = dir.join(HELM_TEMPLATES_DIR);
        let mut template_files = Vec::new();

        for entry in self.walker(&templates_dir) {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", templates_dir))?;
            if !is_dir_entry(&entry) && is_yaml_file(entry.path()) {
                template_files.push(self.file_path(entry.path()));
            }
        }

        Ok(HelmChartInfo {
            directory: dir.to_path_buf(),
            values_file: self.relative_path(&dir.join(HELM_VALUES_FILE)),
            template_files,
        })
    }

    fn file_path(&self, path: &Path) -> FilePath {
        FilePath::new(path, self.relative_path(path))
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }
}

fn is_dir_entry(entry: &DirEntry) -> bool {
    entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
}

fn is_yaml_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("yml") | Some("yaml")
    )
}

fn log_found(files: &[FilePath], message: &str) {
    let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
    debug!(files = %paths.join(", "), "{}", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(base: &Path, rel: &str, content: &str) {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn create_test_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        let base = dir.path();

        write(base, "Dockerfile", "FROM alpine\n");
        write(base, "services/api/api.Dockerfile", "FROM golang:1.20\n");
        write(base, "services/api/.env", "TAG=1\n");
        write(base, "docker-compose.yml", "services: {}\n");
        write(base, "deploy/docker-compose.yaml", "services: {}\n");
        write(base, ".env", "TAG=root\n");
        write(base, ".env_cxcontainers", "REGISTRY=r\n");
        write(base, "README.md", "# readme\n");

        write(base, "chart/Chart.yaml", "name: app\n");
        write(base, "chart/values.yaml", "image: {}\n");
        write(base, "chart/templates/deployment.yaml", "kind: Deployment\n");
        write(base, "chart/templates/service.yml", "kind: Service\n");
        write(base, "chart/templates/_helpers.tpl", "{{- define \"x\" -}}\n");

        // Missing templates/ directory: not a chart
        write(base, "notchart/Chart.yaml", "name: other\n");
        write(base, "notchart/values.yaml", "{}\n");

        dir
    }

    fn walk(dir: &TempDir) -> WalkResult {
        PathWalker::new(dir.path().to_path_buf(), ResolverConfig::builtin())
            .walk()
            .unwrap()
    }

    #[test]
    fn test_classifies_dockerfiles() {
        let temp = create_test_repo();
        let result = walk(&temp);

        let rel: Vec<&str> = result
            .files
            .dockerfiles
            .iter()
            .map(|f| f.relative_path.as_str())
            .collect();
        assert_eq!(rel, vec!["Dockerfile", "services/api/api.Dockerfile"]);
        assert!(result.files.dockerfiles[0].full_path.is_absolute());
    }

    #[test]
    fn test_classifies_compose_files() {
        let temp = create_test_repo();
        let result = walk(&temp);

        let rel: Vec<&str> = result
            .files
            .docker_compose
            .iter()
            .map(|f| f.relative_path.as_str())
            .collect();
        assert_eq!(rel, vec!["deploy/docker-compose.yaml", "docker-compose.yml"]);
    }

    #[test]
    fn test_detects_helm_chart_with_yaml_templates() {
        let temp = create_test_repo();
        let result = walk(&temp);

        assert_eq!(result.files.helm.len(), 1);
        let chart = &result.files.helm[0];
        assert_eq!(chart.directory, temp.path().join("chart"));
        assert_eq!(chart.values_file, "chart/values.yaml");

        let templates: Vec<&str> = chart
            .template_files
            .iter()
            .map(|f| f.relative_path.as_str())
            .collect();
        assert_eq!(
            templates,
            vec!["chart/templates/deployment.yaml", "chart/templates/service.yml"]
        );
    }

    #[test]
    fn test_groups_settings_files_by_directory() {
        let temp = create_test_repo();
        let result = walk(&temp);

        assert_eq!(result.settings_files.len(), 2);
        let root_files = &result.settings_files[temp.path()];
        assert_eq!(root_files.len(), 2);
        assert!(result
            .settings_files
            .contains_key(&temp.path().join("services/api")));
    }

    #[test]
    fn test_empty_directory() {
        let temp = TempDir::new().unwrap();
        let result = walk(&temp);

        assert!(result.files.is_empty());
        assert!(result.settings_files.is_empty());
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("Dockerfile");
        fs::write(&file, "FROM alpine").unwrap();

        let walker = PathWalker::new(file, ResolverConfig::builtin());
        assert!(walker.walk().is_err());
    }

    #[test]
    fn test_is_yaml_file() {
        assert!(is_yaml_file(Path::new("a/b.yaml")));
        assert!(is_yaml_file(Path::new("a/b.YML")));
        assert!(!is_yaml_file(Path::new("a/NOTES.txt")));
        assert!(!is_yaml_file(Path::new("a/yaml")));
    }
}
