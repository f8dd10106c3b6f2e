//! Configuration management for rcon-hub

mod connection;
mod hub;
pub mod serde_utils;

pub use connection::{ConnectionSpec, CONNECTION_FORMAT};
pub use hub::{ConnectionEntry, HubConfig, UserEntry, DEFAULT_BIND_ADDRESS, DEFAULT_HISTORY_SIZE};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// File name looked up in each configuration directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Directories searched for a configuration file, in priority order
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/rcon-hub").join(CONFIG_FILE_NAME)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".rcon-hub").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(".").join(CONFIG_FILE_NAME));
    paths
}

/// Find the first existing configuration file on the search path
pub fn find_config_file() -> Option<PathBuf> {
    config_search_paths().into_iter().find(|path| path.exists())
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    tracing::debug!("Loading configuration from {:?}", path);
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_missing_file() {
        let result: Result<HubConfig, _> = load_config(Path::new("/nonexistent/rcon-hub.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind = ":2323"
history_size = 50
host_key_file = "/var/lib/rcon-hub/host_key"

[users.admin]
password = "hunter2"

[connections.survival]
address = "mc.example.net:25575"
password = "rconpw"
auto_disconnect = true
read_timeout = 30

[connections.creative]
address = "127.0.0.1:25576"
password = "other"
"#
        )
        .unwrap();

        let config: HubConfig = load_config(file.path()).unwrap();
        assert_eq!(config.bind, ":2323");
        assert_eq!(config.history_size, 50);
        assert_eq!(
            config.host_key_file.as_deref(),
            Some(Path::new("/var/lib/rcon-hub/host_key"))
        );
        assert_eq!(config.users["admin"].password, "hunter2");

        let survival = &config.connections["survival"];
        assert!(survival.auto_disconnect);
        assert_eq!(survival.read_timeout, Some(std::time::Duration::from_secs(30)));

        let creative = &config.connections["creative"];
        assert!(!creative.auto_disconnect);
        assert_eq!(creative.read_timeout, None);
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "bind = [unterminated").unwrap();

        let result: Result<HubConfig, _> = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_search_paths_end_with_working_directory() {
        let paths = config_search_paths();
        assert_eq!(paths.first().unwrap(), Path::new("/etc/rcon-hub/config.toml"));
        assert_eq!(paths.last().unwrap(), Path::new("./config.toml"));
    }
}
