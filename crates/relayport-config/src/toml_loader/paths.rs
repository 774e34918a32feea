//! Where the config file lives, and seeding it on first run.

use std::path::{Path, PathBuf};

use relayport_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;

const APP_DIR: &str = "relayport";
const FILE_NAME: &str = "config.toml";

/// `<platform config dir>/relayport/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| config_path_in(&dir))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

fn config_path_in(dir: &Path) -> PathBuf {
    dir.join(APP_DIR).join(FILE_NAME)
}

/// Write the commented template to `path`, creating parent directories.
/// An existing file is left untouched.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    let io_error = |what: &str, at: &Path, e: std::io::Error| {
        ConfigError::ParseError(format!("cannot {what} {}: {e}", at.display()))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
    }
    std::fs::write(path, default_config_toml()).map_err(|e| io_error("write", path, e))?;

    info!(path = %path.display(), "Wrote default relay config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_app_dir_then_file() {
        let path = config_path_in(Path::new("/home/u/.config"));
        assert_eq!(path, PathBuf::from("/home/u/.config/relayport/config.toml"));
    }

    #[test]
    fn existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[relay]\nservice = \"scaledrone\"\n").unwrap();

        create_default_config(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("scaledrone"));
    }
}
