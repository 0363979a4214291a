use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: PathBuf,
    pub host: String,
    pub port: u16,
    /// Directory for daily rotated log files, stdout when unset
    pub log_dir: Option<PathBuf>,
    /// `tracing_subscriber::EnvFilter` directive, `RUST_LOG` takes precedence
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub tls: Option<TlsConfig>,
    pub auth: AuthConfig,
    pub quiz: QuizConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("database/course.db"),
            host: "127.0.0.1".to_string(),
            port: 8090,
            log_dir: None,
            log_level: "info".to_string(),
            request_timeout_secs: 30,
            tls: None,
            auth: AuthConfig::default(),
            quiz: QuizConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Falls back to the `JWT_SECRET` environment variable
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: 24,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "***"))
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

impl AuthConfig {
    pub fn resolve_secret(&self) -> anyhow::Result<String> {
        if let Some(secret) = &self.jwt_secret {
            return Ok(secret.clone());
        }
        let _ = dotenvy::dotenv();
        dotenvy::var("JWT_SECRET")
            .map_err(|e| anyhow::anyhow!("JWT secret is not configured: {}", e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    pub time_limit_secs: u64,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 300,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config = toml::from_str::<Config>(&content)?;
        Ok(config)
    }

    pub fn quiz_time_limit(&self) -> time::Duration {
        time::Duration::seconds(self.quiz.time_limit_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "port = 9000\n[quiz]\ntime_limit_secs = 60\n[auth]\njwt_secret = \"s3cret\"\n",
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.quiz.time_limit_secs, 60);
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.auth.resolve_secret().unwrap(), "s3cret");
        assert!(config.tls.is_none());
    }

    #[test]
    fn secret_is_not_printed() {
        let auth = AuthConfig {
            jwt_secret: Some("hunter2".to_string()),
            token_ttl_hours: 1,
        };
        assert!(!format!("{:?}", auth).contains("hunter2"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load("/definitely/not/here.toml").is_err());
    }
}
