use serde::Deserialize;

/// Compiler settings shared by every pipeline it builds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
    /// Fields kept in every top-level projection regardless of selection.
    pub always_projected: Vec<String>,
}

impl CompilerConfig {
    pub const DEFAULT_ALWAYS_PROJECTED: [&'static str; 2] = ["createdBy", "updatedBy"];
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            always_projected: Self::DEFAULT_ALWAYS_PROJECTED
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}
