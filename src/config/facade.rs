//! Config loading facade over the `config` crate.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::TinyConfig;
use crate::error::ConfigError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads `TinyConfig` from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the workspace at `workspace_root`.
    pub fn load(workspace_root: &Path) -> Result<TinyConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: TinyConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from one explicit file on top of the defaults.
    ///
    /// Environment overrides still apply; the global and workspace files do not.
    pub fn load_from_file(path: &Path) -> Result<TinyConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true));
        let builder = environment::add_to_builder(builder);

        let config: TinyConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }

    /// Location of the global configuration file
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
