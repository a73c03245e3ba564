//! Locate and parse `$XDG_CONFIG_HOME/<app>/config.toml`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::LoadError;

/// Path of the app's config file, whether or not it exists.
///
/// `XDG_CONFIG_HOME` wins when set; otherwise the platform config dir from `dirs`.
pub fn config_path(app_name: &str) -> Result<PathBuf, LoadError> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::config_dir().ok_or(LoadError::NoConfigDir)?,
    };
    Ok(base.join(app_name).join("config.toml"))
}

/// Whole document, or `None` when the file does not exist.
pub(crate) fn load_document(app_name: &str) -> Result<Option<(PathBuf, toml::Table)>, LoadError> {
    let path = config_path(app_name)?;
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|source| LoadError::Read {
        path: path.clone(),
        source,
    })?;
    let doc: toml::Table = toml::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok(Some((path, doc)))
}

#[derive(serde::Deserialize, Default)]
struct EnvSection {
    #[serde(default)]
    env: BTreeMap<String, String>,
}

/// The `[env]` table; empty when the file or the table is missing.
pub(crate) fn load_env_table(app_name: &str) -> Result<BTreeMap<String, String>, LoadError> {
    let Some((path, doc)) = load_document(app_name)? else {
        return Ok(BTreeMap::new());
    };
    let section: EnvSection = toml::Value::Table(doc)
        .try_into()
        .map_err(|source| LoadError::Parse { path, source })?;
    Ok(section.env)
}
