//! Helm chart rendering
//!
//! Charts are rendered to plain multi-document YAML before image references
//! are read from them. `HelmCli` shells out to the `helm` binary.

use crate::config::ResolverConfig;
use crate::types::HelmChartInfo;
use anyhow::{bail, Context, Result};
use std::process::Command;
use tracing::debug;

/// Release name used for client-side rendering
pub const RELEASE_NAME: &str = "temp-release";

/// Renders a chart directory into manifest text
pub trait HelmRenderer: Send + Sync {
    fn render(&self, chart: &HelmChartInfo) -> Result<String>;
}

/// Renders charts with `helm template`
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: String,
}

impl HelmCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.helm_bin.clone())
    }
}

impl Default for HelmCli {
    fn default() -> Self {
        Self::new("helm")
    }
}

impl HelmRenderer for HelmCli {
    fn render(&self, chart: &HelmChartInfo) -> Result<String> {
        debug!(chart = %chart.directory.display(), binary = %self.binary, "Rendering helm chart");

        let output = Command::new(&self.binary)
            .arg("template")
            .arg(RELEASE_NAME)
            .arg(&chart.directory)
            .output()
            .with_context(|| format!("Failed to run {}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} template exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            );
        }

        String::from_utf8(output.stdout).context("Rendered chart is not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn chart() -> HelmChartInfo {
        HelmChartInfo {
            directory: PathBuf::from("/charts/app"),
            values_file: "charts/app/values.yaml".to_string(),
            template_files: Vec::new(),
        }
    }

    #[test]
    fn test_missing_binary_is_error() {
        let renderer = HelmCli::new("definitely-not-a-helm-binary");
        let err = renderer.render(&chart()).unwrap_err();
        assert!(err.to_string().contains("definitely-not-a-helm-binary"));
    }

    #[cfg(unix)]
    #[test]
    fn test_passes_template_arguments() {
        let renderer = HelmCli::new("echo");
        let output = renderer.render(&chart()).unwrap();
        assert_eq!(output.trim(), "template temp-release /charts/app");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_error() {
        let renderer = HelmCli::new("false");
        assert!(renderer.render(&chart()).is_err());
    }

    #[test]
    fn test_from_config() {
        let mut config = ResolverConfig::builtin();
        config.helm_bin = "/opt/helm/bin/helm".to_string();
        let renderer = HelmCli::from_config(&config);
        assert_eq!(renderer.binary, "/opt/helm/bin/helm");
    }
}
