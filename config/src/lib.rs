//! Configuration loading for tokenmeter.
//!
//! Two sources are read: the XDG file `$XDG_CONFIG_HOME/<app>/config.toml` and the project
//! `.env`. [`load_and_apply`] copies `[env]` values and `.env` pairs into the process
//! environment with priority **existing env > .env > XDG**; [`load_section`] deserializes one
//! typed table (e.g. `[tracker]`) out of the same TOML file.

mod dotenv_file;
mod xdg_toml;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use xdg_toml::config_path;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: no config directory for this platform")]
    NoConfigDir,
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("read .env: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

/// Applies `.env` and XDG `[env]` values to the process environment for keys that are not
/// already set.
///
/// * `app_name`: directory under `$XDG_CONFIG_HOME`, e.g. `"tokenmeter"`.
/// * `override_dir`: look for `.env` here instead of the current directory.
///
/// Returns the keys that were set, sorted.
pub fn load_and_apply(
    app_name: &str,
    override_dir: Option<&Path>,
) -> Result<Vec<String>, LoadError> {
    let xdg = xdg_toml::load_env_table(app_name)?;
    let dotenv = dotenv_file::load_pairs(override_dir)?;

    let mut merged: BTreeMap<String, String> = xdg;
    merged.extend(dotenv);

    let mut applied = Vec::new();
    for (key, value) in merged {
        if std::env::var_os(&key).is_some() {
            continue;
        }
        std::env::set_var(&key, value);
        applied.push(key);
    }
    Ok(applied)
}

/// Deserializes the `[section]` table of the XDG config file into `T`.
///
/// A missing file or missing section yields `T::default()`.
pub fn load_section<T>(app_name: &str, section: &str) -> Result<T, LoadError>
where
    T: DeserializeOwned + Default,
{
    match xdg_toml::load_document(app_name)? {
        Some((path, doc)) => match doc.get(section) {
            Some(table) => table
                .clone()
                .try_into()
                .map_err(|source| LoadError::Parse { path, source }),
            None => Ok(T::default()),
        },
        None => Ok(T::default()),
    }
}
