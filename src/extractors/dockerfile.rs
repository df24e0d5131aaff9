//! Dockerfile image extraction
//!
//! Lines are scanned in order. `ARG`/`ENV` definitions feed a per-file
//! variable table, every line is substituted against that table and the
//! settings visible to the file, and `FROM` instructions yield images unless
//! they point at `scratch` or at an earlier build stage.

use crate::discovery::resolve_for_file;
use crate::fs::FileSystem;
use crate::types::{normalize_reference, FilePath, ImageModel, Origin, SettingsTable};
use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::{debug, warn};

const SCRATCH_IMAGE: &str = "scratch";

fn build_var_regex() -> &'static Regex {
    static BUILD_VAR_REGEX: OnceLock<Regex> = OnceLock::new();
    BUILD_VAR_REGEX.get_or_init(|| {
        Regex::new(r"^\s*(?i:ARG|ENV)\s+(\w+)=(\S+)").expect("Invalid ARG/ENV regex")
    })
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"\$\{(\w+)(:?-([^}]*))?\}|\$(\w+)").expect("Invalid placeholder regex")
    })
}

/// Build-stage names introduced by `FROM ... AS <alias>`. Names are
/// matched case-insensitively.
#[derive(Debug)]
pub struct StageAliases {
    aliases: HashMap<String, String>,
    max_depth: usize,
}

impl StageAliases {
    pub fn new(max_depth: usize) -> Self {
        Self {
            aliases: HashMap::new(),
            max_depth,
        }
    }

    /// Records `alias` as a stage built from `image`, following `image`
    /// through earlier aliases to the image it ultimately starts from
    pub fn define(&mut self, alias: &str, image: &str) {
        let target = self.resolve(image).unwrap_or_else(|| {
            debug!(alias = alias, image = image, "Alias chain did not resolve");
            image.to_string()
        });
        self.aliases.insert(alias.to_ascii_lowercase(), target);
    }

    /// Walks the alias chain starting at `name`.
    ///
    /// Returns `None` when the chain loops back on itself or is longer than
    /// the configured depth.
    pub fn resolve(&self, name: &str) -> Option<String> {
        let mut current = name.to_string();
        let mut visited = HashSet::new();

        for _ in 0..=self.max_depth {
            let Some(target) = self.aliases.get(&current.to_ascii_lowercase()) else {
                return Some(current);
            };
            if target.eq_ignore_ascii_case(&current) {
                return Some(current);
            }
            if !visited.insert(current.clone()) {
                return None;
            }
            current = target.clone();
        }

        None
    }

    /// True when `image` names an earlier build stage rather than a pullable image
    pub fn is_stage(&self, image: &str) -> bool {
        self.aliases
            .get(&image.to_ascii_lowercase())
            .map(|target| !target.eq_ignore_ascii_case(image))
            .unwrap_or(false)
    }

    #[cfg(test)]
    fn insert_raw(&mut self, alias: &str, target: &str) {
        self.aliases.insert(alias.to_ascii_lowercase(), target.to_string());
    }
}

/// A parsed `FROM` instruction
#[derive(Debug, Clone, PartialEq, Eq)]
struct FromInstruction<'a> {
    image: &'a str,
    alias: Option<&'a str>,
}

fn parse_from(line: &str) -> Option<FromInstruction<'_>> {
    let mut tokens = line.split_whitespace();
    if !tokens.next()?.eq_ignore_ascii_case("FROM") {
        return None;
    }

    let image = tokens.find(|t| !t.starts_with("--"))?;
    let alias = match tokens.next() {
        Some(kw) if kw.eq_ignore_ascii_case("AS") => tokens.next(),
        _ => None,
    };

    Some(FromInstruction { image, alias })
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

/// Line-oriented Dockerfile parser
#[derive(Debug, Clone)]
pub struct DockerfileParser {
    max_alias_depth: usize,
}

impl DockerfileParser {
    pub fn new(max_alias_depth: usize) -> Self {
        Self { max_alias_depth }
    }

    /// Extracts the images referenced by one Dockerfile.
    ///
    /// `settings` holds the settings-file variables visible to the file; build
    /// variables defined in the file take precedence over them.
    pub fn parse(
        &self,
        content: &str,
        relative_path: &str,
        settings: &HashMap<String, String>,
    ) -> Vec<ImageModel> {
        let mut images = Vec::new();
        let mut stages = StageAliases::new(self.max_alias_depth);
        let mut build_vars: HashMap<String, String> = HashMap::new();

        for raw_line in content.lines() {
            let trimmed = raw_line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(caps) = build_var_regex().captures(raw_line) {
                let value = substitute(unquote(&caps[2]), settings, &build_vars);
                build_vars.insert(caps[1].to_string(), value);
            }

            let line = substitute(raw_line, settings, &build_vars);

            let Some(from) = parse_from(&line) else {
                continue;
            };

            if from.image.eq_ignore_ascii_case(SCRATCH_IMAGE) {
                continue;
            }

            let is_stage = stages.is_stage(from.image);

            if let Some(alias) = from.alias {
                stages.define(alias, from.image);
            }

            if is_stage {
                debug!(path = relative_path, stage = from.image, "Skipping build stage reference");
                continue;
            }

            if from.image.contains('$') {
                debug!(path = relative_path, image = from.image, "Skipping unresolved image reference");
                continue;
            }

            images.push(ImageModel::found_at(
                normalize_reference(from.image),
                Origin::Dockerfile,
                relative_path,
            ));
        }

        images
    }
}

/// Replaces `${VAR}`, `${VAR:-default}`, `${VAR-default}` and `$VAR`
/// placeholders. Build variables override settings values. `:-` also falls
/// back on an empty value. Unknown placeholders without a default are left
/// untouched.
fn substitute(
    line: &str,
    settings: &HashMap<String, String>,
    build_vars: &HashMap<String, String>,
) -> String {
    if !line.contains('$') {
        return line.to_string();
    }

    placeholder_regex()
        .replace_all(line, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let value = build_vars.get(name).or_else(|| settings.get(name));

            match (value, caps.get(2), caps.get(3)) {
                (Some(v), Some(op), Some(default)) if v.is_empty() && op.as_str().starts_with(':') => {
                    default.as_str().to_string()
                }
                (Some(v), _, _) => v.clone(),
                (None, _, Some(default)) => default.as_str().to_string(),
                (None, _, None) => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Reads and parses a single Dockerfile
pub fn extract_file_images<F: FileSystem>(
    fs: &F,
    parser: &DockerfileParser,
    file: &FilePath,
    settings: &SettingsTable,
) -> Result<Vec<ImageModel>> {
    let content = fs
        .read_to_string(&file.full_path)
        .with_context(|| format!("Failed to read dockerfile {}", file.relative_path))?;
    let vars = resolve_for_file(settings, &file.full_path);
    Ok(parser.parse(&content, &file.relative_path, &vars))
}

/// Extracts images from every Dockerfile. Files that cannot be read
/// contribute nothing.
pub fn extract_images<F: FileSystem>(
    fs: &F,
    parser: &DockerfileParser,
    files: &[FilePath],
    settings: &SettingsTable,
) -> Vec<ImageModel> {
    let mut images = Vec::new();

    for file in files {
        debug!(path = %file.relative_path, "Extracting images from dockerfile");
        match extract_file_images(fs, parser, file, settings) {
            Ok(found) => {
                super::log_found_images(&file.relative_path, &found);
                images.extend(found);
            }
            Err(err) => {
                warn!(path = %file.relative_path, error = %err, "Could not extract images from dockerfile");
            }
        }
    }

    images
}
