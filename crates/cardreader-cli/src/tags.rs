//! Loading the tag registry from the command line.

use std::path::Path;

use anyhow::{Context, Result};
use cardreader_core::{TagIdentifier, TagRecord, TagRegistry};
use tracing::info;

/// Parse a `LABEL=A3 47 64 B7` argument.
pub fn parse_tag_arg(arg: &str) -> std::result::Result<TagRecord, String> {
    let (label, uid) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=UID, got {arg:?}"))?;

    let label = label.trim();
    if label.is_empty() {
        return Err("tag label must not be empty".to_string());
    }

    let identifier: TagIdentifier = uid.parse().map_err(|e| format!("{e}"))?;
    Ok(TagRecord::new(label, identifier))
}

/// Read a JSON array of `{ "label": ..., "identifier": ... }` records.
pub fn load_tag_file(path: &Path) -> Result<Vec<TagRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tag file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid tag file {}", path.display()))
}

/// Build the registry from tag files followed by `--tag` arguments.
///
/// Later entries replace earlier ones with the same identifier.
pub fn build_registry(files: &[impl AsRef<Path>], tags: &[TagRecord]) -> Result<TagRegistry> {
    let mut registry = TagRegistry::new();

    for file in files {
        let path = file.as_ref();
        let records = load_tag_file(path)?;
        registry
            .extend(records)
            .with_context(|| format!("invalid tag in {}", path.display()))?;
    }

    registry
        .extend(tags.iter().cloned())
        .context("invalid --tag argument")?;

    info!("Registered {} tags", registry.len());
    Ok(registry)
}
