use std::path::Path;

use quarry_query::CompilerConfig;

use crate::error::CliError;

pub const CONFIG_PATH_VAR: &str = "QUARRY_CONFIG";
pub const ALWAYS_PROJECTED_VAR: &str = "QUARRY_ALWAYS_PROJECTED";

/// Load the compiler config from `QUARRY_CONFIG` (if set), then apply the
/// `QUARRY_ALWAYS_PROJECTED` override.
pub fn load() -> Result<CompilerConfig, CliError> {
    let mut config = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => from_file(Path::new(&path))?,
        Err(_) => CompilerConfig::default(),
    };
    if let Ok(fields) = std::env::var(ALWAYS_PROJECTED_VAR) {
        config.always_projected = parse_field_list(&fields);
    }
    Ok(config)
}

fn from_file(path: &Path) -> Result<CompilerConfig, CliError> {
    let bytes = std::fs::read(path)
        .map_err(|e| CliError::Config(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CliError::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Comma-separated field names; blanks are ignored.
pub fn parse_field_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}
