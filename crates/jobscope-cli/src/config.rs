//! CLI configuration.
//!
//! Settings are read from `~/.jobscope/config.toml` (or the file named by
//! `--config` / `JOBSCOPE_CONFIG`). Command-line flags and environment
//! variables override the file; the file overrides built-in defaults.
//!
//! ```toml
//! gateway_url = "ws://tracking.internal:8080"
//! host = "https://tracking.internal"
//! username = "adam"
//! connect_timeout_secs = 10
//! request_timeout_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CliError;

/// Directory under the home directory holding config and state.
pub const CONFIG_DIR_NAME: &str = ".jobscope";

/// Config file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Gateway used when neither flag, environment nor file names one.
pub const DEFAULT_GATEWAY_URL: &str = "ws://localhost:8080";

/// CLI configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliConfig {
    /// Gateway WebSocket URL.
    pub gateway_url: String,
    /// Web host serving the dashboard. Derived from the gateway when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Owner assumed for project names given without `owner/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Directory for persisted context. Defaults to `~/.jobscope`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            host: None,
            username: None,
            state_dir: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl CliConfig {
    /// Default config file location, `~/.jobscope/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the configuration.
    ///
    /// An explicitly named file must exist. The default file is optional;
    /// when it is missing the built-in defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read, parsed or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        debug!(path = %path.display(), "loaded config file");
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let config: Self =
            toml::from_str(content).map_err(|e| CliError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), CliError> {
        validate_gateway_url(&self.gateway_url)?;

        if let Some(host) = &self.host {
            if !host.starts_with("http://") && !host.starts_with("https://") {
                return Err(CliError::Config(format!(
                    "host must start with http:// or https://, got '{host}'"
                )));
            }
        }

        if let Some(username) = &self.username {
            if username.trim().is_empty() {
                return Err(CliError::Config("username cannot be empty".to_string()));
            }
        }

        if self.connect_timeout_secs == 0 {
            return Err(CliError::Config(
                "connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(CliError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// State directory, preferring `explicit` over the file and the default.
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is configured and the home directory
    /// cannot be determined.
    pub fn state_dir(&self, explicit: Option<&Path>) -> Result<PathBuf, CliError> {
        if let Some(dir) = explicit.or(self.state_dir.as_deref()) {
            return Ok(dir.to_path_buf());
        }
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME))
            .ok_or_else(|| {
                CliError::Config(
                    "cannot determine home directory; pass --state-dir".to_string(),
                )
            })
    }

    /// Dashboard URL: `<host>/app`, with the host derived from the gateway
    /// URL when not configured.
    #[must_use]
    pub fn dashboard_url(&self, gateway_url: &str) -> String {
        let host = self.host.clone().unwrap_or_else(|| http_base(gateway_url));
        format!("{}/app", host.trim_end_matches('/'))
    }
}

/// Check that a gateway URL uses a WebSocket scheme.
///
/// # Errors
///
/// Returns a configuration error otherwise.
pub fn validate_gateway_url(url: &str) -> Result<(), CliError> {
    if url.is_empty() {
        return Err(CliError::Config("gateway_url cannot be empty".to_string()));
    }
    if !url.starts_with("ws://") && !url.starts_with("wss://") {
        return Err(CliError::Config(format!(
            "invalid gateway URL: {url}, must start with ws:// or wss://"
        )));
    }
    Ok(())
}

fn http_base(gateway_url: &str) -> String {
    let (scheme, rest) = match gateway_url.split_once("://") {
        Some(("wss", rest)) => ("https", rest),
        Some((_, rest)) => ("http", rest),
        None => ("http", gateway_url),
    };
    let authority = rest.split('/').next().unwrap_or(rest);
    format!("{scheme}://{authority}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn defaults_are_valid() {
        let config = CliConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.gateway_url, DEFAULT_GATEWAY_URL);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn parses_full_file() {
        let config = CliConfig::from_toml(
            r#"
            gateway_url = "wss://tracking.example.com/ws"
            host = "https://tracking.example.com"
            username = "adam"
            state_dir = "/var/lib/jobscope"
            connect_timeout_secs = 5
            request_timeout_secs = 60
            "#,
        )
        .expect("valid config");

        assert_eq!(config.username.as_deref(), Some("adam"));
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(
            config.state_dir(None).expect("state dir"),
            PathBuf::from("/var/lib/jobscope")
        );
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = CliConfig::from_toml(r#"username = "adam""#).expect("valid config");
        assert_eq!(config.gateway_url, DEFAULT_GATEWAY_URL);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test_case(r#"gateway_url = "http://nope""# ; "non websocket gateway")]
    #[test_case(r#"gateway_url = """# ; "empty gateway")]
    #[test_case(r#"host = "tracking.example.com""# ; "host without scheme")]
    #[test_case(r#"username = "  ""# ; "blank username")]
    #[test_case("connect_timeout_secs = 0" ; "zero connect timeout")]
    #[test_case("request_timeout_secs = 0" ; "zero request timeout")]
    #[test_case("gateway_url = [" ; "broken toml")]
    fn rejects_invalid_config(content: &str) {
        let err = CliConfig::from_toml(content).expect_err("invalid");
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = CliConfig::load(Some(&dir.path().join("absent.toml"))).expect_err("missing");
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "username = \"eve\"\n").expect("write");

        let config = CliConfig::load(Some(&path)).expect("load");
        assert_eq!(config.username.as_deref(), Some("eve"));
    }

    #[test]
    fn explicit_state_dir_wins() {
        let config = CliConfig {
            state_dir: Some(PathBuf::from("/from/file")),
            ..CliConfig::default()
        };
        let dir = config
            .state_dir(Some(Path::new("/from/flag")))
            .expect("state dir");
        assert_eq!(dir, PathBuf::from("/from/flag"));
    }

    #[test_case("ws://localhost:8080", "http://localhost:8080/app" ; "plain")]
    #[test_case("wss://tracking.example.com/ws", "https://tracking.example.com/app" ; "tls with path")]
    fn dashboard_url_from_gateway(gateway: &str, expected: &str) {
        assert_eq!(CliConfig::default().dashboard_url(gateway), expected);
    }

    #[test]
    fn dashboard_url_prefers_host() {
        let config = CliConfig {
            host: Some("https://ui.example.com/".into()),
            ..CliConfig::default()
        };
        assert_eq!(
            config.dashboard_url("ws://localhost:8080"),
            "https://ui.example.com/app"
        );
    }
}
