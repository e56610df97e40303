use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use docbind_types::SchemaManifest;
use docbind_util::expand_tilde;
use tracing::debug;

/// Environment variable naming the schema manifest to load.
pub const SCHEMA_PATH_ENV: &str = "DOCBIND_SCHEMA_PATH";

/// Get the default path for the schema manifest.
pub fn default_manifest_path() -> PathBuf {
    if let Ok(path) = env::var(SCHEMA_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docbind")
        .join("schemas.yaml")
}

/// Reads a manifest file; `.json` files are parsed as JSON, anything else as YAML.
pub fn load_manifest(path: &Path) -> Result<SchemaManifest> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read schema manifest {}", path.display()))?;
    let manifest = parse_manifest(&content, is_json(path)).with_context(|| format!("invalid schema manifest {}", path.display()))?;
    debug!(path = %path.display(), models = manifest.models.len(), "loaded schema manifest");
    Ok(manifest)
}

fn parse_manifest(content: &str, json: bool) -> Result<SchemaManifest> {
    if json {
        return Ok(serde_json::from_str(content)?);
    }
    Ok(serde_yaml::from_str(content)?)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}
