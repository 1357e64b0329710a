use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "cloudsync.json";
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: String,
    /// Value of the `Cookie` header, e.g. `session=...`, copied from a signed in browser.
    pub session_cookie: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: DEFAULT_SERVER.to_string(),
            session_cookie: None,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Config> {
        let config_str = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let demo_config = serde_json::to_string_pretty(&Config::default())?;
                tracing::warn!(
                    "{} does not exist, using defaults. Create it with content like:\n{}",
                    path.display(),
                    demo_config
                );
                return Ok(Config::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Config = serde_json::from_str(&config_str)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.normalized()
    }

    pub fn with_overrides(mut self, server: Option<&str>, cookie: Option<&str>) -> Result<Config> {
        if let Some(server) = server {
            self.server = server.to_string();
        }
        if let Some(cookie) = cookie {
            self.session_cookie = Some(cookie.to_string());
        }
        self.normalized()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.server)
    }

    fn normalized(mut self) -> Result<Config> {
        let trimmed = self.server.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(Error::Config(format!(
                "server must be an http(s) URL, got {:?}",
                self.server
            )));
        }
        self.server = trimmed.to_string();
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }
        if let Some(cookie) = &self.session_cookie {
            if cookie.trim().is_empty() {
                self.session_cookie = None;
            }
        }
        Ok(self)
    }
}
