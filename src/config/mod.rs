//! Repository configuration: the component table and operator settings.
pub mod components;
pub mod settings;
pub mod toml_loader;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use self::components::{Component, ComponentsFile};
use self::settings::Settings;

/// Everything loaded from the `conf/` directory of a repository root.
#[derive(Debug)]
pub struct Config {
    /// Repository root holding `conf/` and the payload directory.
    pub root: PathBuf,
    /// Category names in display order.
    pub categories: Vec<String>,
    /// Component declarations in declaration order.
    pub components: Vec<Component>,
    /// Operator settings; defaults when `conf/settings.toml` is absent.
    pub settings: Settings,
}

impl Config {
    /// Load `conf/components.toml` (required) and `conf/settings.toml`
    /// (optional) from `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the component table is absent, or if either file
    /// cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let conf = root.join("conf");

        let components_path = conf.join("components.toml");
        if !components_path.is_file() {
            return Err(ConfigError::Missing {
                path: components_path.display().to_string(),
            });
        }
        let ComponentsFile {
            categories,
            components,
        } = toml_loader::load_config(&components_path)?;

        let settings: Settings = toml_loader::load_config(&conf.join("settings.toml"))?;

        Ok(Self {
            root: root.to_path_buf(),
            categories,
            components,
            settings,
        })
    }

    /// Directory holding the payload files referenced by `deploy-file` actions.
    #[must_use]
    pub fn payload_dir(&self) -> PathBuf {
        self.root.join(&self.settings.paths.payload)
    }
}
