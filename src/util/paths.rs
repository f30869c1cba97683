//! XDG-style directories for settings and logs.

use std::env;
use std::path::{Path, PathBuf};

/// Application directory name under the config base.
const APP_DIR: &str = "loctable";

/// Resolve an XDG base directory from environment or default to `$HOME` + segments.
///
/// Inputs:
/// - `var`: Environment variable to check (e.g., `XDG_CONFIG_HOME`).
/// - `home_default`: Fallback path segments relative to `$HOME` if `var` is unset/empty.
///
/// Output: Resolved base directory path.
fn xdg_base_dir(var: &str, home_default: &[&str]) -> PathBuf {
    if let Ok(p) = env::var(var)
        && !p.trim().is_empty()
    {
        return PathBuf::from(p);
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let mut base = PathBuf::from(home);
    for seg in home_default {
        base = base.join(seg);
    }
    base
}

/// Config directory: `$XDG_CONFIG_HOME/loctable` or `$HOME/.config/loctable`.
///
/// The directory is not created here; writers create it on demand.
#[must_use]
pub fn config_dir() -> PathBuf {
    xdg_base_dir("XDG_CONFIG_HOME", &[".config"]).join(APP_DIR)
}

/// Settings file holding the persisted locale.
#[must_use]
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.conf")
}

/// Logs directory under config (ensured to exist when possible).
#[must_use]
pub fn logs_dir() -> PathBuf {
    let dir = config_dir().join("logs");
    ensure_dir(&dir);
    dir
}

/// Create `dir` and its parents, logging instead of failing.
fn ensure_dir(dir: &Path) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::warn!(path = %dir.display(), error = %e, "Failed to create directory");
    }
}
