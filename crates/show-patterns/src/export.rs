//! Formation export as indented JSON documents

use show_core::{CoreResult, Formation};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Serialize a formation to an indented JSON document
pub fn to_json(formation: &Formation) -> CoreResult<String> {
    Ok(serde_json::to_string_pretty(formation)?)
}

/// Parse a formation previously written by [`to_json`]
pub fn from_json(document: &str) -> CoreResult<Formation> {
    Ok(serde_json::from_str(document)?)
}

/// Download name for a formation: every whitespace run, leading and
/// trailing ones included, becomes a single `_`
pub fn export_file_name(formation: &Formation) -> String {
    let mut stem = String::with_capacity(formation.name.len());
    let mut in_run = false;
    for c in formation.name.chars() {
        if c.is_whitespace() {
            if !in_run {
                stem.push('_');
            }
            in_run = true;
        } else {
            stem.push(c);
            in_run = false;
        }
    }
    format!("{stem}.json")
}

/// Write `formation` into `dir`, creating it if needed, and return the file path
pub fn write_to_dir(formation: &Formation, dir: impl AsRef<Path>) -> CoreResult<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let path = dir.join(export_file_name(formation));
    fs::write(&path, to_json(formation)?)?;

    info!("Exported {} to {}", formation.name, path.display());
    Ok(path)
}

/// Read a formation document from disk
pub fn read_from_file(path: impl AsRef<Path>) -> CoreResult<Formation> {
    let document = fs::read_to_string(path)?;
    from_json(&document)
}

// ============================================================================
// TESTS
// ============================================================================
