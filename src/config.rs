use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub database: DbConfig,
}

/// Tunables for the resolution pipeline. Loaded from config.toml with
/// environment overrides; callers may also build one directly.
#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    /// Host the streaming proxy is reachable on (builds proxy_base)
    #[serde(default = "default_proxy_host")]
    pub proxy_host: String,

    /// Port the streaming proxy is reachable on
    #[serde(default = "default_proxy_port")]
    pub proxy_port: u16,

    /// Chrome/Chromium executable path
    #[serde(default = "default_chrome_path")]
    pub chrome_path: Option<String>,

    /// Number of browser pages shared by concurrent episode tasks
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,

    /// Per-attempt wait for the sniffer to surface a video URL, in seconds
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Retries after the initial attempt for each episode
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Timeout for plain HTTP session/API requests, in seconds
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
}

fn default_proxy_host() -> String {
    "localhost".to_string()
}
fn default_proxy_port() -> u16 {
    8585
}
fn default_chrome_path() -> Option<String> {
    Some("/usr/bin/google-chrome-stable".to_string())
}
fn default_pool_capacity() -> usize {
    6
}
fn default_attempt_timeout() -> u64 {
    5
}
fn default_max_retries() -> usize {
    2
}
fn default_session_timeout() -> u64 {
    15
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            proxy_host: default_proxy_host(),
            proxy_port: default_proxy_port(),
            chrome_path: default_chrome_path(),
            pool_capacity: default_pool_capacity(),
            attempt_timeout_secs: default_attempt_timeout(),
            max_retries: default_max_retries(),
            session_timeout_secs: default_session_timeout(),
        }
    }
}

impl ScraperConfig {
    /// Base URL prefix for proxy-relative paths stored downstream
    pub fn proxy_base(&self) -> String {
        format!("http://{}:{}", self.proxy_host, self.proxy_port)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Apply environment overrides (API_HOST, API_PORT, CHROME_PATH)
    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("API_HOST") {
            if !host.is_empty() {
                self.proxy_host = host;
            }
        }
        if let Ok(port) = std::env::var("API_PORT") {
            if let Ok(port) = port.parse() {
                self.proxy_port = port;
            }
        }
        if let Ok(path) = std::env::var("CHROME_PATH") {
            if !path.is_empty() {
                self.chrome_path = Some(path);
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_name")]
    pub dbname: String,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default = "default_db_password")]
    pub password: String,
}

fn default_db_host() -> String {
    "localhost".to_string()
}
fn default_db_port() -> u16 {
    5432
}
fn default_db_name() -> String {
    "drama_catalog".to_string()
}
fn default_db_user() -> String {
    "drama_admin".to_string()
}
fn default_db_password() -> String {
    "drama_password".to_string()
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            dbname: default_db_name(),
            user: default_db_user(),
            password: default_db_password(),
        }
    }
}

impl DbConfig {
    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("DATABASE_HOST") {
            if !host.is_empty() {
                self.host = host;
            }
        }
        if let Ok(port) = std::env::var("DATABASE_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(name) = std::env::var("DATABASE_NAME") {
            if !name.is_empty() {
                self.dbname = name;
            }
        }
        if let Ok(user) = std::env::var("DATABASE_USER") {
            if !user.is_empty() {
                self.user = user;
            }
        }
        if let Ok(pass) = std::env::var("DATABASE_PASSWORD") {
            if !pass.is_empty() {
                self.password = pass;
            }
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let mut cfg = Self::default();
        let path = Path::new("config.toml");
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(parsed) = toml::from_str::<Config>(&content) {
                    cfg = parsed;
                }
            }
        }
        cfg.scraper.apply_env();
        cfg.database.apply_env();
        cfg
    }
}
