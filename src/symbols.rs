use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::SymbolFileError;
use crate::model::profile::SymbolProfile;

/// Tracked symbols keyed by upper-cased symbol.
pub type SymbolRegistry = BTreeMap<String, SymbolProfile>;

/// Load one `*.json` profile per symbol from `dir`.
///
/// The directory is created if it does not exist. Files that cannot be read,
/// parsed, or validated are skipped with a warning.
pub fn load_symbols(dir: &Path) -> Result<SymbolRegistry> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create symbols dir {}", dir.display()))?;

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read symbols dir {}", dir.display()))?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut out = SymbolRegistry::new();
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match load_profile(&path) {
            Ok(profile) => {
                if out.contains_key(&profile.symbol) {
                    tracing::warn!(file = %name, symbol = %profile.symbol, "Duplicate symbol, later file wins");
                }
                out.insert(profile.symbol.clone(), profile);
            }
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Skipping symbol file");
            }
        }
    }

    if out.is_empty() {
        tracing::warn!(
            dir = %dir.display(),
            "No symbols found. Add JSON files like AAPL.json to the symbols directory"
        );
    }

    Ok(out)
}

/// Parse and validate a single profile file.
pub fn load_profile(path: &Path) -> Result<SymbolProfile, SymbolFileError> {
    let payload = std::fs::read_to_string(path)?;
    parse_profile(&payload)
}

pub fn parse_profile(payload: &str) -> Result<SymbolProfile, SymbolFileError> {
    let mut profile: SymbolProfile = serde_json::from_str(payload)?;

    profile.symbol = profile.symbol.trim().to_ascii_uppercase();
    if profile.symbol.is_empty() {
        return Err(SymbolFileError::MissingSymbol);
    }
    check_threshold("min_change_abs", profile.min_change_abs)?;
    check_threshold("min_change_pct", profile.min_change_pct)?;

    Ok(profile)
}

fn check_threshold(field: &'static str, value: Option<f64>) -> Result<(), SymbolFileError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(SymbolFileError::InvalidThreshold { field, value: v })
        }
        _ => Ok(()),
    }
}
