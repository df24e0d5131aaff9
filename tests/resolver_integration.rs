//! End-to-end resolution over real directories and archives, with helm and
//! syft replaced by in-process stubs.

use anyhow::{bail, Result};
use async_trait::async_trait;
use containers_resolver::analysis::{ContainerImage, ContainerPackage, ResolvedLocation};
use containers_resolver::{
    ContainerResolution, HelmChartInfo, HelmRenderer, ImageAnalyzer, ImageModel, Origin, Resolver,
    ResolverConfig, ResolverError, RESOLUTION_FILE_NAME,
};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

const RENDERED_CHART: &str = "---
# Source: app/templates/deployment.yaml
spec:
  image:
    registry: quay.io
    name: team/api
    tag: \"2.1\"
---
# Source: app/templates/cache.yaml
spec:
  image:
    name: redis
    tag: 7
";

struct StaticRenderer;

impl HelmRenderer for StaticRenderer {
    fn render(&self, _chart: &HelmChartInfo) -> Result<String> {
        Ok(RENDERED_CHART.to_string())
    }
}

/// Reports one package per image and fails for anything under `private/`
struct StubAnalyzer;

#[async_trait]
impl ImageAnalyzer for StubAnalyzer {
    async fn analyze(&self, image: &ImageModel) -> Result<ContainerResolution> {
        if image.name.starts_with("private/") {
            bail!("unauthorized: {}", image.name);
        }
        Ok(ContainerResolution {
            container_image: ContainerImage {
                image_name: image.repository().to_string(),
                image_tag: image.tag().to_string(),
                image_id: image.name.clone(),
                distribution: "alpine:3.19".to_string(),
                image_locations: image.locations.iter().map(ResolvedLocation::from).collect(),
                ..Default::default()
            },
            container_packages: vec![ContainerPackage {
                name: "musl".to_string(),
                version: "1.2.4".to_string(),
                package_type: "apk".to_string(),
                ..Default::default()
            }],
        })
    }
}

fn resolver() -> Resolver {
    Resolver::with_collaborators(
        ResolverConfig::builtin(),
        Box::new(StaticRenderer),
        Box::new(StubAnalyzer),
    )
}

fn write(base: &Path, rel: &str, content: &str) {
    let path = base.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn create_project(base: &Path) {
    write(base, ".env", "PY_VERSION=3.12\nTAG=1.25\n");
    write(
        base,
        "backend/Dockerfile",
        "ARG BASE=python\nFROM ${BASE}:${PY_VERSION} AS build\nRUN pip install .\nFROM build\n",
    );
    write(base, "backend/.env", "PY_VERSION=3.11\n");
    write(
        base,
        "docker-compose.yml",
        "services:\n  web:\n    image: nginx:${TAG}\n  worker:\n    image: private/worker:1.0\n  api:\n    build: ./backend\n",
    );
    write(base, "chart/Chart.yaml", "name: app\nversion: 0.1.0\n");
    write(base, "chart/values.yaml", "image: {}\n");
    write(base, "chart/templates/deployment.yaml", "kind: Deployment\n");
}

fn read_resolution(folder: &Path) -> serde_json::Value {
    let content = fs::read_to_string(folder.join(RESOLUTION_FILE_NAME)).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[tokio::test]
async fn test_resolves_project_directory() {
    let scan = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    create_project(scan.path());

    let resolutions = resolver()
        .resolve(scan.path(), out.path(), &["nginx:1.25".to_string()])
        .await
        .unwrap();

    let ids: Vec<&str> = resolutions
        .iter()
        .map(|r| r.container_image.image_id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec!["nginx:1.25", "python:3.11", "quay.io/team/api:2.1", "redis:7"]
    );

    let nginx = &resolutions[0].container_image;
    let origins: Vec<Origin> = nginx.image_locations.iter().map(|l| l.origin).collect();
    assert_eq!(origins, vec![Origin::UserInput, Origin::DockerCompose]);
    assert_eq!(nginx.image_locations[1].path, "docker-compose.yml");

    let written = read_resolution(out.path());
    assert_eq!(written.as_array().unwrap().len(), 4);
    assert_eq!(written[1]["ContainerImage"]["ImageName"], "python");
    assert_eq!(written[1]["ContainerImage"]["ImageTag"], "3.11");
    assert_eq!(
        written[1]["ContainerImage"]["ImageLocations"][0]["Path"],
        "backend/Dockerfile"
    );
    assert_eq!(written[3]["ContainerPackages"][0]["Type"], "apk");

    assert!(scan.path().join("docker-compose.yml").exists());
}

#[tokio::test]
async fn test_extract_lists_images_without_analysis() {
    let scan = TempDir::new().unwrap();
    create_project(scan.path());

    let images = resolver().extract(scan.path(), &[]).await.unwrap();

    let names: Vec<&str> = images.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "python:3.11",
            "nginx:1.25",
            "private/worker:1.0",
            "quay.io/team/api:2.1",
            "redis:7"
        ]
    );
    assert_eq!(images[3].locations[0].origin, Origin::Helm);
    assert_eq!(images[3].locations[0].path, "app/templates/deployment.yaml");
}

#[tokio::test]
async fn test_resolves_zip_archive_and_cleans_up() {
    let workspace = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let archive = workspace.path().join("project.zip");

    let file = fs::File::create(&archive).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("project/Dockerfile", options).unwrap();
    zip.write_all(b"FROM alpine:3.19\n").unwrap();
    zip.start_file("project/deploy/docker-compose.yaml", options).unwrap();
    zip.write_all(b"services:\n  db:\n    image: postgres:16\n").unwrap();
    zip.finish().unwrap();

    let resolutions = resolver().resolve(&archive, out.path(), &[]).await.unwrap();

    let ids: Vec<&str> = resolutions
        .iter()
        .map(|r| r.container_image.image_id.as_str())
        .collect();
    assert_eq!(ids, vec!["alpine:3.19", "postgres:16"]);
    assert_eq!(
        resolutions[1].container_image.image_locations[0].path,
        "deploy/docker-compose.yaml"
    );

    assert!(!workspace.path().join("extracted_zip").exists());
    assert!(archive.exists());
}

#[tokio::test]
async fn test_unsupported_archive_is_rejected() {
    let workspace = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let archive = workspace.path().join("project.rar");
    fs::write(&archive, b"not an archive").unwrap();

    let err = resolver().resolve(&archive, out.path(), &[]).await.unwrap_err();

    assert!(matches!(err, ResolverError::UnsupportedArchive(_)));
    assert!(!out.path().join(RESOLUTION_FILE_NAME).exists());
}

#[tokio::test]
async fn test_empty_project_without_images() {
    let scan = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let resolutions = resolver()
        .resolve(scan.path(), out.path(), &["  ".to_string()])
        .await
        .unwrap();

    assert!(resolutions.is_empty());
    assert_eq!(read_resolution(out.path()), serde_json::json!([]));
}
