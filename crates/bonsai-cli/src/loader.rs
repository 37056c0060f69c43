use std::path::Path;

use anyhow::{Context, Result};
use bonsai_bt::TreeDefinition;

/// Reads a tree definition. `.json` files are parsed as JSON, anything else as YAML.
pub fn load_definition(path: &Path) -> Result<TreeDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tree definition from {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let mut definition: TreeDefinition = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON tree from {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML tree from {}", path.display()))?
    };

    if definition.name.is_empty() {
        if let Some(stem) = path.file_stem() {
            definition.name = stem.to_string_lossy().into_owned();
        }
    }
    Ok(definition)
}
