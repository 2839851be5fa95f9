// src/infra/paths.rs — XDG-compliant path management
//
// All paths respect the POMOTASK_HOME environment variable for isolation.
// When POMOTASK_HOME is set, config and data live under that directory.
// When unset, config uses ~/.pomotask/ and data uses XDG_DATA_HOME/pomotask.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Returns the POMOTASK_HOME override, if set.
fn pomotask_home() -> Option<PathBuf> {
    std::env::var_os("POMOTASK_HOME").map(PathBuf::from)
}

/// Configuration directory: $POMOTASK_HOME/ or ~/.pomotask/
pub fn config_dir() -> PathBuf {
    if let Some(home) = pomotask_home() {
        return home;
    }
    match BaseDirs::new() {
        Some(base) => base.home_dir().join(".pomotask"),
        None => PathBuf::from(".pomotask"),
    }
}

/// Data directory: $POMOTASK_HOME/data/ or ~/.local/share/pomotask/
pub fn data_dir() -> PathBuf {
    if let Some(home) = pomotask_home() {
        return home.join("data");
    }
    match ProjectDirs::from("", "", "pomotask") {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => config_dir().join("data"),
    }
}

/// Default database path
pub fn db_path() -> PathBuf {
    data_dir().join("pomotask.db")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Ensure the directories the server writes to exist
pub async fn ensure_dirs() -> anyhow::Result<()> {
    for dir in [config_dir(), data_dir()] {
        tokio::fs::create_dir_all(&dir).await?;
    }
    Ok(())
}
