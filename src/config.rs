use anyhow::{anyhow, Result};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Persistent defaults read from `~/.rowport/config.json`.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub base_url: Option<String>,
    pub token: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub fn global_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(".rowport").join("config.json"))
}

/// Missing or unreadable files yield an empty config; problems are logged.
pub fn load_file(path: &Path) -> Config {
    let file_contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Config::default(),
        Err(e) => {
            warn!("could not read {}: {e}", path.display());
            return Config::default();
        }
    };

    let config: Config = match serde_json::from_str(&file_contents) {
        Ok(c) => c,
        Err(e) => {
            warn!("could not parse {}: {e}", path.display());
            return Config::default();
        }
    };

    for key in config.extra.keys() {
        warn!("unknown config key {} in {}", key, path.display());
    }

    debug!("loaded config from {}", path.display());
    config
}

pub fn load_global() -> Result<Config> {
    Ok(load_file(&global_path()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_file_reads_known_keys_and_keeps_unknown_ones_aside() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"base_url":"https://acct.example.com/rest/v2","token":"abc","colour":"blue"}"#,
        )?;

        let config = load_file(&path);
        assert_eq!(
            config.base_url.as_deref(),
            Some("https://acct.example.com/rest/v2")
        );
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert!(config.extra.contains_key("colour"));
        Ok(())
    }

    #[test]
    fn missing_or_malformed_files_yield_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = load_file(&dir.path().join("absent.json"));
        assert!(missing.base_url.is_none());

        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json")?;
        assert!(load_file(&path).token.is_none());
        Ok(())
    }
}
