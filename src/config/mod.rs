pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::Cli;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "baton.toml";

/// Load configuration by merging global, project, and CLI sources.
/// Precedence: CLI > project config (or `--config`) > global config > defaults.
///
/// Missing default-location config files are handled gracefully (defaults
/// apply). An explicit `--config` path must exist and parse.
pub fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    // Layer 1: Global config (~/.config/baton/baton.toml or platform equivalent)
    let global = load_global_config();

    // Layer 2: Project config (explicit path, or ./baton.toml)
    let project = match &cli.config {
        Some(path) => load_required(path)?,
        None => load_toml_file(Path::new(CONFIG_FILE_NAME)).unwrap_or_default(),
    };

    // Layer 3: CLI args (converted to PartialConfig)
    let cli_partial = cli_to_partial(cli);

    cli_partial
        .with_fallback(project)
        .with_fallback(global)
        .finalize()
}

/// Load global config from the platform-specific config directory.
/// Returns empty PartialConfig if file not found.
fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => load_toml_file(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

/// Parse a TOML document into a PartialConfig.
pub fn parse_toml(contents: &str, path: &Path) -> Result<PartialConfig, ConfigError> {
    toml::from_str::<ConfigFile>(contents)
        .map(ConfigFile::to_partial)
        .map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Load a config file that the user named explicitly.
fn load_required(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let partial = parse_toml(&contents, path)?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(partial)
}

/// Load and parse a TOML config file into a PartialConfig.
/// Returns None on file-not-found; logs parse errors and returns None.
fn load_toml_file(path: &Path) -> Option<PartialConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_toml(&contents, path) {
            Ok(partial) => {
                tracing::info!("Loaded config from {}", path.display());
                Some(partial)
            }
            Err(e) => {
                tracing::warn!("Config parse error: {e}");
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Failed to read config at {}: {}", path.display(), e);
            None
        }
    }
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/baton/baton.toml
/// macOS: ~/Library/Application Support/baton/baton.toml
fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "baton").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(cli: &Cli) -> PartialConfig {
    PartialConfig {
        model: cli.model.clone(),
        max_iterations: cli.max_iterations,
        task_file: cli.task_file.clone(),
        ..Default::default()
    }
}
