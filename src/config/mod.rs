use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 4600;
const DEFAULT_PROVIDER_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_PROVIDER_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 180;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── StorageConfig ────────────────────────────────────────────────────────────

/// SQLite pool settings (`[storage]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Maximum pooled connections. Default: 20.
    pub max_connections: u32,
    /// Idle connection timeout in seconds. Default: 30.
    pub idle_timeout_secs: u64,
    /// Log SQLite queries that exceed this threshold (milliseconds).
    /// Set to 0 to disable slow query logging. Default: 100.
    pub slow_query_threshold_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            idle_timeout_secs: 30,
            slow_query_threshold_ms: 100,
        }
    }
}

// ─── AiConfig ─────────────────────────────────────────────────────────────────

/// Generation transport settings (`[ai]` in config.toml).
///
/// `mode = "lambda"` relays to pre-deployed endpoints that hold the provider
/// credentials; `mode = "direct"` calls the provider with a local API key.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AiConfig {
    /// Transport mode: "lambda" (default) | "direct".
    pub mode: String,
    /// Resume relay endpoint URL (lambda mode). None = feature unavailable.
    pub resume_url: Option<String>,
    /// Interview relay endpoint URL (lambda mode). None = feature unavailable.
    pub interview_url: Option<String>,
    /// Provider base URL (direct mode).
    pub base_url: String,
    /// Provider model ID (direct mode).
    pub model: String,
    /// Provider API key (direct mode). Prefer CAMPUSD_AI_API_KEY over TOML.
    pub api_key: Option<String>,
    /// End-to-end generation timeout in seconds. Default: 180.
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            mode: "lambda".to_string(),
            resume_url: None,
            interview_url: None,
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            model: DEFAULT_PROVIDER_MODEL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
        }
    }
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP server port (default: 4600).
    port: Option<u16>,
    /// Log level filter string, e.g. "debug", "info,campusd=trace" (default: "info").
    log: Option<String>,
    /// Bind address for the HTTP server (default: "127.0.0.1").
    bind_address: Option<String>,
    /// Log output format: "pretty" (default) | "json".
    log_format: Option<String>,
    /// SQLite pool settings (`[storage]`).
    storage: Option<StorageConfig>,
    /// Generation transport settings (`[ai]`).
    ai: Option<AiConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── ServiceConfig ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub log: String,
    /// Bind address for the HTTP server (CAMPUSD_BIND env var, default: "127.0.0.1").
    pub bind_address: String,
    /// Log output format: "pretty" (default) | "json".
    pub log_format: String,
    /// SQLite pool settings.
    pub storage: StorageConfig,
    /// Generation transport settings.
    pub ai: AiConfig,
}

impl ServiceConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(std::env::var("CAMPUSD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = std::env::var("CAMPUSD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let storage = toml.storage.unwrap_or_default();

        let mut ai = toml.ai.unwrap_or_default();
        if let Ok(url) = std::env::var("CAMPUSD_RESUME_URL") {
            if !url.is_empty() {
                ai.resume_url = Some(url);
            }
        }
        if let Ok(url) = std::env::var("CAMPUSD_INTERVIEW_URL") {
            if !url.is_empty() {
                ai.interview_url = Some(url);
            }
        }
        if let Ok(key) = std::env::var("CAMPUSD_AI_API_KEY") {
            if !key.is_empty() {
                ai.api_key = Some(key);
            }
        }

        Self {
            port,
            data_dir,
            log,
            bind_address,
            log_format,
            storage,
            ai,
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/campusd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("campusd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/campusd or ~/.local/share/campusd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("campusd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("campusd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\campusd
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("campusd");
        }
    }
    // Fallback
    PathBuf::from(".campusd")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ServiceConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.log, "info");
        assert_eq!(cfg.ai.mode, "lambda");
        assert_eq!(cfg.ai.timeout_secs, 180);
        assert_eq!(cfg.storage.max_connections, 20);
    }

    #[test]
    fn toml_overrides_defaults_and_cli_overrides_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "port = 9000\nlog = \"debug\"\n\n[ai]\nmode = \"direct\"\ntimeout_secs = 30\n",
        )
        .unwrap();

        let cfg = ServiceConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.log, "debug");
        assert_eq!(cfg.ai.mode, "direct");
        assert_eq!(cfg.ai.timeout_secs, 30);

        let cfg = ServiceConfig::new(Some(4601), Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.port, 4601);
    }

    #[test]
    fn malformed_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "port = \"oops").unwrap();
        let cfg = ServiceConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
    }
}
