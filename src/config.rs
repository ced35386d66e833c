//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/fmanalysis/fmanalysis.toml`
//! 3. Local config: an explicit file passed by the caller
//! 4. Environment variables: `FMANALYSIS_*` prefix, `__` between sections
//!    (e.g. `FMANALYSIS_EVALUATION__WORKER_THREADS=4`)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

/// How computation graphs are evaluated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Distribute independent roots over a worker pool
    pub parallel: bool,
    /// Worker pool size, None lets rayon pick one thread per core
    pub worker_threads: Option<usize>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            worker_threads: None,
        }
    }
}

/// Progress reporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProgressConfig {
    /// Emit progress reports as tracing events
    pub enabled: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Unified configuration for fmanalysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub evaluation: EvaluationConfig,
    pub progress: ProgressConfig,
}

/// Get the XDG config directory for fmanalysis.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fmanalysis").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("fmanalysis.toml"))
}

impl Settings {
    /// Load configuration from all layers.
    ///
    /// `local` is an optional project-specific TOML file; it must exist if given.
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let defaults = Settings::default();
        let defaults_toml = toml::to_string(&defaults).map_err(|e| ApplicationError::Config {
            message: format!("serialize defaults: {e}"),
        })?;

        // 1. Compiled defaults
        let mut builder =
            Config::builder().add_source(File::from_str(&defaults_toml, FileFormat::Toml));

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        // 3. Local config
        if let Some(local_path) = local {
            debug!("load: local config {}", local_path.display());
            builder = builder.add_source(File::from(local_path.to_path_buf()).required(true));
        }

        // 4. Environment variables (explicit override)
        builder = builder.add_source(
            Environment::with_prefix("FMANALYSIS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        config.try_deserialize().map_err(config_err)
    }

    /// Number of worker threads the evaluator should use, None for sequential.
    pub fn effective_workers(&self) -> Option<usize> {
        if !self.evaluation.parallel {
            return None;
        }
        Some(
            self.evaluation
                .worker_threads
                .filter(|&n| n > 0)
                .unwrap_or_else(rayon::current_num_threads),
        )
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# fmanalysis configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/fmanalysis/fmanalysis.toml
#   Local:  file passed explicitly by the embedding application
#   Env:    FMANALYSIS_* environment variables, e.g. FMANALYSIS_EVALUATION__PARALLEL=false

[evaluation]
# Distribute independent analyses over a worker pool
# parallel = true

# Worker pool size (default: one per core)
# worker_threads = 4

[progress]
# Emit progress reports as tracing events
# enabled = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
