//! Client configuration.
//!
//! Reads/writes `~/.escrow/config.toml`. `ESCROW_SERVER` and `ESCROW_ENV`
//! override the file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use escrow_client::CookiePolicy;
use escrow_notify::SurfaceConfig;
use serde::{Deserialize, Serialize};

/// Deployment the client talks to. Production credentials are only ever
/// sent over secure transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => anyhow::bail!("unknown environment \"{}\"", other),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Production => "production",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL (e.g. "https://escrow.example.com/api").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,

    #[serde(default)]
    pub environment: Environment,

    /// Where the credential is kept. Defaults to `session.json` next to
    /// the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_bell_page_size")]
    pub bell_page_size: u32,

    #[serde(default = "default_list_page_size")]
    pub list_page_size: u32,
}

fn default_poll_interval() -> u64 {
    30
}

fn default_bell_page_size() -> u32 {
    10
}

fn default_list_page_size() -> u32 {
    20
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            environment: Environment::default(),
            token_file: None,
            poll_interval_secs: default_poll_interval(),
            bell_page_size: default_bell_page_size(),
            list_page_size: default_list_page_size(),
        }
    }
}

impl ClientConfig {
    /// Default config file path: ~/.escrow/config.toml.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_overrides(
            std::env::var("ESCROW_SERVER").ok(),
            std::env::var("ESCROW_ENV").ok(),
        )?;
        Ok(config)
    }

    fn apply_overrides(
        &mut self,
        server: Option<String>,
        environment: Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(server) = server.filter(|s| !s.is_empty()) {
            self.server = server;
        }
        if let Some(env) = environment.filter(|s| !s.is_empty()) {
            self.environment = env.parse()?;
        }
        Ok(())
    }

    /// Save config to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The server URL, or an error telling the user how to set it.
    pub fn server(&self) -> anyhow::Result<&str> {
        if self.server.is_empty() {
            anyhow::bail!(
                "No server URL configured. Run `escrow config set --server <url>` or set ESCROW_SERVER."
            );
        }
        Ok(&self.server)
    }

    pub fn token_path(&self, config_path: &Path) -> PathBuf {
        self.token_file.clone().unwrap_or_else(|| {
            config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(dirs_path)
                .join("session.json")
        })
    }

    pub fn cookie_policy(&self) -> CookiePolicy {
        CookiePolicy::for_environment(self.environment.is_production())
    }

    pub fn surfaces(&self) -> SurfaceConfig {
        SurfaceConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            bell_page_size: self.bell_page_size.max(1),
            list_page_size: self.list_page_size.max(1),
        }
    }
}

/// Return the escrow config directory (~/.escrow).
fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".escrow")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.server.is_empty());
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.surfaces().poll_interval, Duration::from_secs(30));
        assert!(!config.cookie_policy().secure);
    }

    #[test]
    fn test_roundtrip() {
        let config = ClientConfig {
            server: "https://escrow.example.com/api".to_string(),
            environment: Environment::Production,
            token_file: Some(PathBuf::from("/tmp/escrow-session.json")),
            poll_interval_secs: 15,
            ..ClientConfig::default()
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("environment = \"production\""));
        let back: ClientConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.server, config.server);
        assert!(back.cookie_policy().secure);
        assert_eq!(back.poll_interval_secs, 15);
        assert_eq!(back.list_page_size, 20);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ClientConfig = toml::from_str("server = \"http://localhost:8000\"").unwrap();
        assert_eq!(config.bell_page_size, 10);
        assert_eq!(config.poll_interval_secs, 30);
    }

    #[test]
    fn test_overrides() {
        let mut config = ClientConfig::default();
        config
            .apply_overrides(Some("http://api.test".into()), Some("prod".into()))
            .unwrap();
        assert_eq!(config.server().unwrap(), "http://api.test");
        assert!(config.environment.is_production());

        assert!(config.apply_overrides(None, Some("staging".into())).is_err());
    }

    #[test]
    fn test_load_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        assert!(ClientConfig::load(&path).unwrap().server.is_empty());

        let config = ClientConfig {
            server: "http://localhost:8000".into(),
            ..ClientConfig::default()
        };
        config.save(&path).unwrap();
        let back = ClientConfig::load(&path).unwrap();
        assert_eq!(back.server, "http://localhost:8000");
        assert_eq!(
            back.token_path(&path),
            dir.path().join("nested").join("session.json")
        );
    }
}
