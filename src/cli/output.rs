//! Rendering of extracted image lists for the `extract` command

use crate::types::ImageModel;
use anyhow::{Context, Result};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_images(&self, images: &[ImageModel]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(images).context("Failed to serialize images to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(images).context("Failed to serialize images to YAML")
            }
            OutputFormat::Human => Ok(self.format_human(images)),
        }
    }

    fn format_human(&self, images: &[ImageModel]) -> String {
        if images.is_empty() {
            return "No container images found\n".to_string();
        }

        let mut out = String::new();
        let _ = writeln!(out, "Found {} container image(s):", images.len());

        for image in images {
            let _ = writeln!(out);
            let _ = writeln!(out, "  {}", image.name);
            for location in &image.locations {
                let _ = writeln!(out, "    - {:<14} {}", location.origin, location.path);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageLocation, Origin};

    fn images() -> Vec<ImageModel> {
        let mut nginx = ImageModel::found_at("nginx:1.25", Origin::Dockerfile, "web/Dockerfile");
        nginx.add_location(ImageLocation::new(Origin::DockerCompose, "docker-compose.yml"));
        vec![nginx, ImageModel::user_input("redis")]
    }

    #[test]
    fn test_json_output() {
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_images(&images())
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed[0]["name"], "nginx:1.25");
        assert_eq!(parsed[0]["locations"][1]["origin"], "DockerCompose");
        assert_eq!(parsed[1]["locations"][0]["path"], "NONE");
    }

    #[test]
    fn test_yaml_output() {
        let output = OutputFormatter::new(OutputFormat::Yaml)
            .format_images(&images())
            .unwrap();
        let parsed: Vec<ImageModel> = serde_yaml::from_str(&output).unwrap();
        assert_eq!(parsed, images());
    }

    #[test]
    fn test_human_output() {
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_images(&images())
            .unwrap();

        assert!(output.starts_with("Found 2 container image(s):"));
        assert!(output.contains("  nginx:1.25\n"));
        assert!(output.contains("Dockerfile"));
        assert!(output.contains("docker-compose.yml"));
        assert!(output.contains("redis:latest"));
    }

    #[test]
    fn test_human_output_empty() {
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_images(&[])
            .unwrap();
        assert_eq!(output, "No container images found\n");
    }
}
