//! TOML configuration loading and defaulting.
//!
//! Splits the on-disk shape (`RawConfig`, all-optional so a partial file is
//! valid TOML) from the resolved shape the rest of the server consumes
//! (`ServerSettings`), the same split as the server this is grounded on.
use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 21;
const DEFAULT_PUBLIC_HOST: &str = "127.0.0.1";
const DEFAULT_START_PORT: u16 = 1024;
const DEFAULT_END_PORT: u16 = 65535;

/// Mirrors the TOML keys verbatim; every field is optional so a config file
/// only needs to override what it cares about.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    pub service: Option<String>,
    pub host: Option<String>,
    pub port: Option<i32>,
    #[serde(rename = "public-host")]
    pub public_host: Option<String>,
    #[serde(rename = "start-port")]
    pub start_port: Option<u16>,
    #[serde(rename = "end-port")]
    pub end_port: Option<u16>,
    pub users: Option<HashMap<String, String>>,
}

impl RawConfig {
    pub fn load(path: &Path) -> Result<RawConfig> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::protocol(format!("invalid config at {}: {e}", path.display())))
    }

    /// Applies the default-value rules: `port = 0` means the well-known FTP
    /// port, `port = -1` means let the OS choose an ephemeral one.
    pub fn resolve(self) -> ServerSettings {
        let port = match self.port {
            None | Some(0) => DEFAULT_PORT,
            Some(-1) => 0,
            Some(p) => p as u16,
        };
        let mut users = self.users.unwrap_or_default();
        if users.is_empty() {
            users.insert("anonymous".to_string(), String::new());
        }
        ServerSettings {
            service: self.service.unwrap_or_default(),
            listen_host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            listen_port: port,
            public_host: self.public_host.unwrap_or_else(|| DEFAULT_PUBLIC_HOST.to_string()),
            data_port_range: PortRange {
                start: self.start_port.unwrap_or(DEFAULT_START_PORT),
                end: self.end_port.unwrap_or(DEFAULT_END_PORT),
            },
            users,
        }
    }
}

/// Range of ports offered to passive-mode data connections.
#[derive(Debug, Clone, Copy)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

/// The resolved, always-valid configuration the rest of the server consumes.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub service: String,
    pub listen_host: String,
    pub listen_port: u16,
    pub public_host: String,
    pub data_port_range: PortRange,
    pub users: HashMap<String, String>,
}

impl ServerSettings {
    /// Built-in defaults, used when no `-c` flag is given.
    pub fn defaults() -> ServerSettings {
        RawConfig::default().resolve()
    }

    pub fn from_file(path: &Path) -> Result<ServerSettings> {
        Ok(RawConfig::load(path)?.resolve())
    }

    /// An empty password authenticates the anonymous user; any other
    /// username must have its password match exactly.
    pub fn authenticate(&self, user: &str, pass: &str) -> bool {
        match self.users.get(user) {
            Some(expected) => expected.is_empty() || expected == pass,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let s = ServerSettings::defaults();
        assert_eq!(s.listen_host, "0.0.0.0");
        assert_eq!(s.listen_port, 21);
        assert_eq!(s.public_host, "127.0.0.1");
        assert_eq!(s.data_port_range.start, 1024);
        assert_eq!(s.data_port_range.end, 65535);
        assert!(s.authenticate("anonymous", "anything@example.com"));
    }

    #[test]
    fn port_minus_one_means_os_chosen() {
        let raw = RawConfig {
            port: Some(-1),
            ..Default::default()
        };
        assert_eq!(raw.resolve().listen_port, 0);
    }

    #[test]
    fn toml_round_trip_overrides_host_and_port() {
        let raw: RawConfig = toml::from_str("host = \"127.0.0.1\"\nport = 2121\n").unwrap();
        let settings = raw.resolve();
        assert_eq!(settings.listen_host, "127.0.0.1");
        assert_eq!(settings.listen_port, 2121);
    }

    #[test]
    fn non_anonymous_user_requires_matching_password() {
        let mut users = HashMap::new();
        users.insert("alice".to_string(), "secret".to_string());
        let raw = RawConfig {
            users: Some(users),
            ..Default::default()
        };
        let settings = raw.resolve();
        assert!(settings.authenticate("alice", "secret"));
        assert!(!settings.authenticate("alice", "wrong"));
        assert!(!settings.authenticate("bob", ""));
    }
}
