//! Configuration management for ddlgraph tools.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`DDLGRAPH__` prefix, `__` separator)
//! 2. Config file (`ddlgraph.toml`, `[ddlgraph]` section)
//! 3. Defaults

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration shared by the ddlgraph binaries.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DdlConfig {
    /// Base URI every entity IRI is built on.
    #[serde(default = "default_base_uri")]
    pub base_uri: String,

    /// Persisted schema graph (Turtle or N-Triples).
    #[serde(default)]
    pub graph_path: Option<String>,

    /// Where to write the edited graph. Defaults to overwriting `graph_path`.
    #[serde(default)]
    pub output_path: Option<String>,

    /// SHACL shapes to validate against. The bundled ddl shapes are used
    /// when unset.
    #[serde(default)]
    pub shapes_path: Option<String>,

    /// Validate the edited graph before writing it.
    #[serde(default)]
    pub validate: bool,

    /// Directory for finalized change logs.
    #[serde(default = "default_changelog_dir")]
    pub changelog_dir: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json_logs: bool,
}

fn default_base_uri() -> String {
    "http://ddlgraph.local/".to_string()
}

fn default_changelog_dir() -> String {
    "./changelogs".to_string()
}

impl Default for DdlConfig {
    fn default() -> Self {
        Self {
            base_uri: default_base_uri(),
            graph_path: None,
            output_path: None,
            shapes_path: None,
            validate: false,
            changelog_dir: default_changelog_dir(),
            json_logs: false,
        }
    }
}

/// Load configuration from `{file_prefix}.toml` and the environment.
///
/// A missing file or a missing `[ddlgraph]` section yields defaults; a file
/// that exists but cannot be parsed is an error.
pub fn load(file_prefix: &str) -> Result<DdlConfig, ConfigError> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("DDLGRAPH")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<DdlConfig>("ddlgraph") {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(_)) => Ok(DdlConfig::default()),
        Err(e) => Err(e.into()),
    }
}
