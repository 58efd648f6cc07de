use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt, Result};

/// the only on-disk format this crate reads and writes
pub const FORMAT_VERSION: u32 = 0;

/// branch HEAD points at in a fresh repository
pub const DEFAULT_BRANCH: &str = "main";

/// repository configuration stored in config.toml
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub core: CoreConfig,
    /// identity used for commits when none is given explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub format_version: u32,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    pub email: String,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

impl Config {
    /// load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }

    /// `Name <email>` for the configured user, if any
    pub fn identity(&self) -> Option<String> {
        self.user
            .as_ref()
            .map(|u| format!("{} <{}>", u.name, u.email))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig {
                format_version: FORMAT_VERSION,
                default_branch: default_branch(),
            },
            user: None,
        }
    }
}
