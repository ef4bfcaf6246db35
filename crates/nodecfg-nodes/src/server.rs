//! Server connection settings
//!
//! Passed through untouched to the remote client; the only thing checked
//! here is that the endpoint is an absolute URL with a host.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::NodeError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecurityMode {
    #[default]
    None,
    Sign,
    SignAndEncrypt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecurityPolicy {
    #[default]
    None,
    Basic128Rsa15,
    Basic256,
    Basic256Sha256,
    #[serde(rename = "Aes128_Sha256_RsaOaep")]
    Aes128Sha256RsaOaep,
    #[serde(rename = "Aes256_Sha256_RsaPss")]
    Aes256Sha256RsaPss,
}

impl SecurityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityMode::None => "None",
            SecurityMode::Sign => "Sign",
            SecurityMode::SignAndEncrypt => "SignAndEncrypt",
        }
    }
}

impl SecurityPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityPolicy::None => "None",
            SecurityPolicy::Basic128Rsa15 => "Basic128Rsa15",
            SecurityPolicy::Basic256 => "Basic256",
            SecurityPolicy::Basic256Sha256 => "Basic256Sha256",
            SecurityPolicy::Aes128Sha256RsaOaep => "Aes128_Sha256_RsaOaep",
            SecurityPolicy::Aes256Sha256RsaPss => "Aes256_Sha256_RsaPss",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConnectionConfig {
    #[serde(alias = "Url")]
    pub url: String,
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(alias = "Password")]
    pub password: String,
    #[serde(alias = "SecurityMode")]
    pub security_mode: SecurityMode,
    #[serde(alias = "SecurityPolicy")]
    pub security_policy: SecurityPolicy,
    #[serde(alias = "AutoAcceptCertificates")]
    pub auto_accept_certificates: bool,
    /// Connect and per-operation timeout
    #[serde(alias = "Timeout")]
    pub timeout_ms: u64,
    #[serde(alias = "SessionTimeout")]
    pub session_timeout_ms: u64,
}

impl ServerConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(self.url.trim())
            .map_err(|e| NodeError::InvalidEndpoint(format!("{}: {}", self.url, e)))?;

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(NodeError::InvalidEndpoint(format!(
                "{}: missing host",
                self.url
            )));
        }

        if self.timeout_ms == 0 {
            return Err(NodeError::InvalidEndpoint(
                "timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// Copy safe to write into an exported configuration
    pub fn without_secrets(&self) -> Self {
        Self {
            password: String::new(),
            ..self.clone()
        }
    }
}

impl Default for ServerConnectionConfig {
    fn default() -> Self {
        Self {
            url: "opc.tcp://localhost:4840".to_string(),
            username: String::new(),
            password: String::new(),
            security_mode: SecurityMode::None,
            security_policy: SecurityPolicy::None,
            auto_accept_certificates: true,
            timeout_ms: 15_000,
            session_timeout_ms: 60_000,
        }
    }
}

impl std::fmt::Debug for ServerConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConnectionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("security_mode", &self.security_mode)
            .field("security_policy", &self.security_policy)
            .field("auto_accept_certificates", &self.auto_accept_certificates)
            .field("timeout_ms", &self.timeout_ms)
            .field("session_timeout_ms", &self.session_timeout_ms)
            .finish()
    }
}
