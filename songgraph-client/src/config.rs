//! Client configuration
//!
//! Server URL resolves CLI → `SONGGRAPH_SERVER` → TOML `[client]` → default.

use songgraph_common::config::{env_value, resolve, TomlConfig};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Resolved client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub log_level: String,
}

impl ClientSettings {
    pub fn resolve(cli_server: Option<String>, toml: &TomlConfig) -> Self {
        let server_url = resolve(
            cli_server,
            env_value("SONGGRAPH_SERVER"),
            toml.client.server_url.clone(),
            DEFAULT_SERVER_URL.to_string(),
        );
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            log_level: toml.logging.level.clone(),
        }
    }
}
