//! Read `.env` pairs without touching the process environment; `lib` decides what to apply.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn dotenv_path(override_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = override_dir
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())?;
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Pairs from `.env` in `override_dir` (or the current directory). Missing file: empty map.
pub(crate) fn load_pairs(
    override_dir: Option<&Path>,
) -> Result<BTreeMap<String, String>, dotenvy::Error> {
    let Some(path) = dotenv_path(override_dir) else {
        return Ok(BTreeMap::new());
    };
    dotenvy::from_path_iter(&path)?.collect()
}
