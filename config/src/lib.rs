//! Load configuration from XDG `config.toml` and the project `.env`, then apply it to the
//! process environment with priority: **existing env > .env > XDG**.
//!
//! The XDG file is `$XDG_CONFIG_HOME/<app>/config.toml` (platform config dir when
//! `XDG_CONFIG_HOME` is unset) and only its `[env]` table is read:
//!
//! ```toml
//! [env]
//! ANTHROPIC_API_KEY = "sk-..."
//! MEGABYZUS_MAX_ITERATIONS = "8"
//! ```

mod dotenv_file;
#[cfg(feature = "tracing-init")]
pub mod tracing_init;
mod xdg_toml;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    Dotenv(#[from] dotenv::Error),
}

/// Path of the XDG config file for `app_name`, whether or not it exists.
pub fn config_file_path(app_name: &str) -> Result<PathBuf, LoadError> {
    xdg_toml::config_path(app_name)
}

/// Sets environment variables from `.env` and the XDG `[env]` table, only for keys that
/// are **not** already set. Returns the keys that were applied.
///
/// * `app_name`: e.g. `"megabyzus"`; selects `<config dir>/<app_name>/config.toml`.
/// * `override_dir`: look for `.env` here instead of the current directory.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<Vec<String>, LoadError> {
    let xdg_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = dotenv_file::load_env_map(override_dir)?;

    let keys: HashSet<&String> = xdg_map.keys().chain(dotenv_map.keys()).collect();
    let mut applied = Vec::new();
    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(v) = dotenv_map.get(key).or_else(|| xdg_map.get(key)) {
            std::env::set_var(key, v);
            applied.push(key.clone());
        }
    }
    applied.sort();
    Ok(applied)
}
