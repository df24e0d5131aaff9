//! Deduplication of image references across sources

use crate::types::ImageModel;
use std::collections::HashMap;

/// Collects images by name, unioning their locations.
///
/// Names keep the order in which they were first added. Locations keep
/// first-seen order with duplicate `(origin, path)` pairs dropped.
#[derive(Debug, Default)]
pub struct ImageMerger {
    images: Vec<ImageModel>,
    index: HashMap<String, usize>,
}

impl ImageMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, image: ImageModel) {
        match self.index.get(&image.name) {
            Some(&idx) => {
                let existing = &mut self.images[idx];
                for location in image.locations {
                    existing.add_location(location);
                }
            }
            None => {
                let mut fresh = ImageModel {
                    name: image.name,
                    locations: Vec::with_capacity(image.locations.len()),
                };
                for location in image.locations {
                    fresh.add_location(location);
                }
                self.index.insert(fresh.name.clone(), self.images.len());
                self.images.push(fresh);
            }
        }
    }

    pub fn extend(&mut self, images: impl IntoIterator<Item = ImageModel>) {
        for image in images {
            self.add(image);
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn into_images(self) -> Vec<ImageModel> {
        self.images
    }
}

/// Merges the per-source lists in priority order: user input, Dockerfiles,
/// compose files, then Helm charts.
pub fn merge_images(
    user_images: Vec<ImageModel>,
    dockerfile_images: Vec<ImageModel>,
    compose_images: Vec<ImageModel>,
    helm_images: Vec<ImageModel>,
) -> Vec<ImageModel> {
    let mut merger = ImageMerger::new();
    merger.extend(user_images);
    merger.extend(dockerfile_images);
    merger.extend(compose_images);
    merger.extend(helm_images);
    merger.into_images()
}
