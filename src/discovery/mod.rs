//! Locating the files that may name container images

pub mod archive;
pub mod settings;
pub mod walker;

pub use archive::{extract_root, TAR_EXTRACT_DIR, ZIP_EXTRACT_DIR};
pub use settings::{load_settings, resolve_for_file};
pub use walker::{PathWalker, WalkResult};
