//! Resolution records written to `containers-resolution.json`

use crate::types::{ImageLocation, Origin};
use serde::{Deserialize, Serialize};

/// Analysis result for one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerResolution {
    pub container_image: ContainerImage,
    pub container_packages: Vec<ContainerPackage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerImage {
    pub image_name: String,
    pub image_tag: String,
    /// The `name:tag` reference that was analyzed
    pub image_id: String,
    pub image_hash: String,
    /// `id:version` of the base distribution, `NONE` when unknown
    pub distribution: String,
    /// Ids of the non-empty layers, in build order
    pub layers: Vec<String>,
    pub history: Vec<Layer>,
    pub image_locations: Vec<ResolvedLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerPackage {
    pub name: String,
    pub version: String,
    pub distribution: String,
    /// Package type as reported by the cataloguer
    #[serde(rename = "Type")]
    pub package_type: String,
    pub source_name: String,
    pub source_version: String,
    pub licenses: Vec<String>,
    pub layer_ids: Vec<String>,
}

/// One entry of the image build history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Layer {
    pub order: usize,
    pub size: i64,
    /// Empty for history entries that did not produce a layer
    pub layer_id: String,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedLocation {
    pub origin: Origin,
    pub path: String,
}

impl From<&ImageLocation> for ResolvedLocation {
    fn from(location: &ImageLocation) -> Self {
        Self {
            origin: location.origin,
            path: location.path.clone(),
        }
    }
}
