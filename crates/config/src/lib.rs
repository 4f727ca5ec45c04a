use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "campus.toml",
    "config/campus.toml",
    "crates/config/campus.toml",
    "../campus.toml",
    "../config/campus.toml",
    "../crates/config/campus.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            media: MediaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://campus.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: 86_400,
        }
    }
}

impl AuthConfig {
    fn default_session_ttl() -> u64 {
        86_400
    }
}

/// Settings for the local media store that resolves uploaded attachments
/// into stable URLs.
///
/// ```
/// use campus_config::MediaConfig;
///
/// let media = MediaConfig::default();
/// assert_eq!(media.root_dir, "media");
/// assert_eq!(media.base_url, "/media");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "MediaConfig::default_root_dir")]
    pub root_dir: String,
    #[serde(default = "MediaConfig::default_base_url")]
    pub base_url: String,
}

impl MediaConfig {
    fn default_root_dir() -> String {
        "media".to_string()
    }

    fn default_base_url() -> String {
        "/media".to_string()
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root_dir: Self::default_root_dir(),
            base_url: Self::default_base_url(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use campus_config::load;
///
/// std::env::remove_var("CAMPUS_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let db_max = defaults.database.max_connections as i64;
    let session_ttl = defaults.auth.session_ttl_seconds;
    let session_ttl_i64 = if session_ttl > i64::MAX as u64 {
        i64::MAX
    } else {
        session_ttl as i64
    };

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("http.address", defaults.http.address.clone())
        .unwrap()
        .set_default("http.port", i64::from(defaults.http.port))
        .unwrap()
        .set_default("database.url", defaults.database.url.clone())
        .unwrap()
        .set_default("database.max_connections", db_max)
        .unwrap()
        .set_default("auth.session_ttl_seconds", session_ttl_i64)
        .unwrap()
        .set_default("media.root_dir", defaults.media.root_dir.clone())
        .unwrap()
        .set_default("media.base_url", defaults.media.base_url.clone())
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("CAMPUS").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("CAMPUS_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via CAMPUS_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.session_ttl_seconds > i64::MAX as u64 {
        config.auth.session_ttl_seconds = i64::MAX as u64;
    }

    debug!(?config, "loaded backend configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn defaults_apply_without_config_file() {
        std::env::remove_var("CAMPUS_CONFIG");

        let config = load().expect("load with defaults");
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.session_ttl_seconds, 86_400);
    }

    #[test]
    #[serial]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("campus.toml");
        let mut file = std::fs::File::create(&path).expect("create config file");
        writeln!(
            file,
            "[http]\naddress = \"0.0.0.0\"\nport = 9000\n\n[database]\nurl = \"sqlite://override.db\"\nmax_connections = 3"
        )
        .expect("write config file");

        std::env::set_var("CAMPUS_CONFIG", &path);
        let config = load().expect("load with file");
        std::env::remove_var("CAMPUS_CONFIG");

        assert_eq!(config.http.address, "0.0.0.0");
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.database.url, "sqlite://override.db");
        assert_eq!(config.database.max_connections, 3);
    }
}
