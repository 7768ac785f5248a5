use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::Config;

/// Resolve a directory path, expanding ~ to the home directory.
pub fn resolve_dir(path: &str) -> PathBuf {
    if path.starts_with("~/") || path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home.join(path.strip_prefix("~/").unwrap_or(""));
        }
    }
    PathBuf::from(path)
}

/// Find the config file by searching standard locations.
pub fn find_config_path() -> PathBuf {
    // 1. Current directory
    let local = Path::new("config.json");
    if local.exists() {
        return local.to_path_buf();
    }

    // 2. ~/.redraft/config.json
    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".redraft").join("config.json");
        if home_config.exists() {
            return home_config;
        }
    }

    // Default: ~/.redraft/config.json (will use defaults if missing)
    dirs::home_dir()
        .map(|h| h.join(".redraft").join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

/// Load configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config '{}'", path.display()))?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

/// Save configuration to a JSON file.
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    let contents = serde_json::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create config directory '{}'",
                parent.to_string_lossy()
            )
        })?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/config.json")).unwrap();
        assert_eq!(config.trace.dir, "traces");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.trace.dir = "my-traces".into();
        save_config(&path, &config).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.trace.dir, "my-traces");
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_resolve_dir_plain() {
        assert_eq!(resolve_dir("traces"), PathBuf::from("traces"));
    }
}
