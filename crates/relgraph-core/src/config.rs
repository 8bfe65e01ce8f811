//! TOML configuration.
//!
//! Every field has a default, so an absent file and an empty file behave
//! the same. Lookup order for the file itself is an explicit path, then
//! `./relgraph.toml`, then `<config dir>/relgraph/config.toml`.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::status;
use crate::registry::{EdgeStyle, RelationshipType, TypeInfo, TypeRegistry};
use crate::store::ResolvePolicy;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "relgraph.toml";

/// Environment variable overriding the database path.
pub const DB_ENV_VAR: &str = "RELGRAPH_DB";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub relationship_types: Vec<CustomTypeConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Children at or above this status no longer block their parent.
    #[serde(default = "default_resolved_threshold")]
    pub resolved_threshold: u16,
    /// Bugs at or above this status cannot be edited.
    #[serde(default = "default_resolved_threshold")]
    pub read_only_threshold: u16,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            resolved_threshold: default_resolved_threshold(),
            read_only_threshold: default_resolved_threshold(),
        }
    }
}

/// Access levels of the single viewer the CLI acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default = "default_current_level")]
    pub current_level: u16,
    #[serde(default = "default_view_threshold")]
    pub view_threshold: u16,
    #[serde(default = "default_update_threshold")]
    pub update_threshold: u16,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            current_level: default_current_level(),
            view_threshold: default_view_threshold(),
            update_threshold: default_update_threshold(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Bug summaries longer than this are truncated with `...`.
    #[serde(default = "default_summary_width")]
    pub width: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            width: default_summary_width(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

/// One `[[relationship_types]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTypeConfig {
    pub code: i32,
    pub name: String,
    pub description: String,
    pub complementary: i32,
    #[serde(default = "default_true")]
    pub forward: bool,
    #[serde(default)]
    pub edge_style: Option<EdgeStyle>,
}

impl Config {
    /// Built-in types plus every configured custom type.
    ///
    /// # Errors
    ///
    /// Duplicate codes or names, and pairings that do not validate.
    pub fn registry(&self) -> crate::error::Result<TypeRegistry> {
        let mut builder = TypeRegistry::builder();
        for custom in &self.relationship_types {
            let mut info = TypeInfo::new(
                custom.name.clone(),
                custom.description.clone(),
                RelationshipType::from_code(custom.complementary),
                custom.forward,
            );
            if let Some(style) = &custom.edge_style {
                info = info.with_edge_style(style.clone());
            }
            builder.register(RelationshipType::from_code(custom.code), info)?;
        }
        builder.build()
    }

    #[must_use]
    pub const fn resolve_policy(&self) -> ResolvePolicy {
        ResolvePolicy {
            resolved_status: self.status.resolved_threshold,
        }
    }
}

/// Parse one config file.
///
/// # Errors
///
/// Unreadable or malformed files.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// First config file that exists: `<cwd>/relgraph.toml`, then the user
/// config directory.
#[must_use]
pub fn discover_config_path(cwd: &Path) -> Option<PathBuf> {
    let local = cwd.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("relgraph/config.toml");
    user.is_file().then_some(user)
}

/// Load the explicit file when given, otherwise the discovered one, else
/// defaults.
///
/// # Errors
///
/// A missing explicit file, and any read or parse failure.
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("config file {} does not exist", path.display());
        }
        return load_config(path);
    }

    match discover_config_path(cwd) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            load_config(&path)
        }
        None => Ok(Config::default()),
    }
}

/// Database path precedence: `--db` flag, `RELGRAPH_DB`, config file.
#[must_use]
pub fn resolve_database_path(
    cli_path: Option<&Path>,
    env_path: Option<String>,
    config: &Config,
) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Some(path) = env_path.filter(|value| !value.trim().is_empty()) {
        return PathBuf::from(path);
    }
    config.database.path.clone()
}

const fn default_true() -> bool {
    true
}

fn default_database_path() -> PathBuf {
    PathBuf::from("relgraph.sqlite3")
}

const fn default_resolved_threshold() -> u16 {
    status::RESOLVED
}

const fn default_current_level() -> u16 {
    55
}

const fn default_view_threshold() -> u16 {
    10
}

const fn default_update_threshold() -> u16 {
    40
}

const fn default_summary_width() -> usize {
    42
}

const fn default_max_depth() -> usize {
    2
}
