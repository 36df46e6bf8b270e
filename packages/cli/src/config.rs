use anyhow::Context;
use pagecraft_common::{Config, PartialData, DEFAULT_CONFIG_NAME};
use pagecraft_editor::HistorySnapshot;
use std::path::{Path, PathBuf};

/// Load the component registry.
///
/// An explicit `--config` path must exist; otherwise `pagecraft.config.json`
/// in the working directory is used when present, and an empty registry when not.
pub fn load_registry(explicit: Option<&Path>, cwd: &str) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read config {}", path.display()))?;
            Config::from_json(&content)
                .with_context(|| format!("Invalid config {}", path.display()))
        }
        None => Config::load(&PathBuf::from(cwd))
            .with_context(|| format!("Invalid {} in {}", DEFAULT_CONFIG_NAME, cwd)),
    }
}

/// Read a document, accepting partial input (missing root, content or zones)
pub fn read_document(path: &Path) -> anyhow::Result<PartialData> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read document {}", path.display()))?;
    PartialData::from_json(&content).with_context(|| format!("Invalid document {}", path.display()))
}

pub fn read_history(path: &Path) -> anyhow::Result<HistorySnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read history {}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}
