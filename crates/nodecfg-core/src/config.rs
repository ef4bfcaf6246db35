//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use nodecfg_browse::BrowseOptions;

use crate::error::CoreError;
use crate::Result;

const MAX_RECENT_ENDPOINTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint offered when the user opens the connect form
    pub default_endpoint: String,
    /// Most recently used endpoints, newest first
    pub recent_endpoints: Vec<String>,
    /// Time budget for one complete browse, all pages included
    pub browse_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Upper bound on continuation pages per browse
    pub max_browse_pages: usize,
    /// Where exported configurations are written
    pub export_dir: PathBuf,
}

impl Config {
    pub fn new(export_dir: PathBuf) -> Self {
        Self {
            default_endpoint: "opc.tcp://localhost:4840".to_string(),
            recent_endpoints: vec![
                "opc.tcp://localhost:4840".to_string(),
                "opc.tcp://localhost:48010".to_string(),
                "opc.tcp://127.0.0.1:4840".to_string(),
            ],
            browse_timeout_ms: 15_000,
            read_timeout_ms: 5_000,
            max_browse_pages: 10_000,
            export_dir,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.browse_timeout_ms == 0 || self.read_timeout_ms == 0 {
            return Err(CoreError::Config("timeouts must be greater than zero".into()));
        }
        if self.max_browse_pages == 0 {
            return Err(CoreError::Config("max_browse_pages must be at least 1".into()));
        }
        Ok(())
    }

    pub fn browse_options(&self) -> BrowseOptions {
        BrowseOptions::default()
            .with_timeout(Duration::from_millis(self.browse_timeout_ms))
            .with_max_pages(self.max_browse_pages)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Move `endpoint` to the front of the recent list
    pub fn remember_endpoint(&mut self, endpoint: &str) {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return;
        }
        self.recent_endpoints.retain(|e| e != endpoint);
        self.recent_endpoints.insert(0, endpoint.to_string());
        self.recent_endpoints.truncate(MAX_RECENT_ENDPOINTS);
    }

    pub fn default_export_dir() -> PathBuf {
        dirs::document_dir()
            .map(|d| d.join("NodeConfigurator"))
            .unwrap_or_else(|| PathBuf::from(".nodecfg"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::default_export_dir())
    }
}

// Platform document directory lookup
mod dirs {
    use std::path::PathBuf;

    pub fn document_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("USERPROFILE")
                .ok()
                .map(|h| PathBuf::from(h).join("Documents"))
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Documents"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DOCUMENTS_DIR")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join("Documents"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new(PathBuf::from("/tmp/exports"));
        assert_eq!(config.default_endpoint, "opc.tcp://localhost:4840");
        assert_eq!(config.browse_options().timeout, Duration::from_secs(15));
        assert_eq!(config.browse_options().max_pages, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = Config::from_json(r#"{"browse_timeout_ms": 2000}"#).unwrap();
        assert_eq!(config.browse_timeout_ms, 2000);
        assert_eq!(config.read_timeout_ms, 5_000);
        assert_eq!(config.recent_endpoints.len(), 3);
    }

    #[test]
    fn test_from_json_rejects_zero_timeout() {
        let err = Config::from_json(r#"{"read_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));

        let err = Config::from_json("not json").unwrap_err();
        assert!(matches!(err, CoreError::Serialization(_)));
    }

    #[test]
    fn test_remember_endpoint() {
        let mut config = Config::new(PathBuf::from("/tmp"));
        config.remember_endpoint("opc.tcp://127.0.0.1:4840");
        assert_eq!(config.recent_endpoints[0], "opc.tcp://127.0.0.1:4840");
        assert_eq!(config.recent_endpoints.len(), 3);

        for port in 0..20 {
            config.remember_endpoint(&format!("opc.tcp://plc:{}", 5000 + port));
        }
        assert_eq!(config.recent_endpoints.len(), MAX_RECENT_ENDPOINTS);
        assert_eq!(config.recent_endpoints[0], "opc.tcp://plc:5019");

        config.remember_endpoint("   ");
        assert_eq!(config.recent_endpoints[0], "opc.tcp://plc:5019");
    }
}
