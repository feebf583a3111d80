//! Layered service configuration
//!
//! Sources, lowest priority first: built-in defaults, `config/default`,
//! `config/{APP_ENV}`, `config/local`, then environment variables prefixed
//! with `MARKET` using `__` as the section separator (e.g.
//! `MARKET__JWT__SECRET`). Explicit overrides beat every source.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub app: AppSettings,
    pub jwt: JwtSettings,
    pub cors: CorsSettings,
    #[serde(default)]
    pub cloudinary: CloudinarySettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub name: String,
    pub version: String,
    pub commit: Option<String>,
    pub debug: bool,
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    /// Token lifetime in seconds
    pub expiration: u64,
    pub issuer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CloudinarySettings {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitSettings {
    pub max_attempts: u32,
    pub window_seconds: u64,
    pub lockout_seconds: u64,
}

pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

impl Settings {
    /// Load settings from `./config` for a service listening on `default_port`
    pub fn load(default_port: u16) -> Result<Self, ConfigError> {
        let run_mode = env::var("APP_ENV").ok();
        Self::load_with_options("config", default_port, run_mode, None)
    }

    pub fn load_with_options<P: AsRef<Path>>(
        path: P,
        default_port: u16,
        run_mode: Option<String>,
        overrides: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let dir = path.as_ref().to_string_lossy().to_string();

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", i64::from(default_port))?
            .set_default("app.name", "Home Services Marketplace")?
            .set_default("app.version", "v1")?
            .set_default("app.debug", false)?
            .set_default("app.url", "http://localhost")?
            .set_default("jwt.secret", DEFAULT_JWT_SECRET)?
            .set_default("jwt.expiration", 3600)?
            .set_default("jwt.issuer", "marketplace")?
            .set_default(
                "cors.allowed_origins",
                vec!["http://localhost", "http://localhost:3000"],
            )?
            .set_default("rate_limit.max_attempts", 5)?
            .set_default("rate_limit.window_seconds", 900)?
            .set_default("rate_limit.lockout_seconds", 900)?
            .add_source(File::with_name(&format!("{}/default", dir)).required(false));

        if let Some(mode) = run_mode.filter(|m| !m.is_empty()) {
            builder =
                builder.add_source(File::with_name(&format!("{}/{}", dir, mode)).required(false));
        }

        builder = builder.add_source(File::with_name(&format!("{}/local", dir)).required(false));

        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                builder = builder.set_override(key, value)?;
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("MARKET")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins"),
        );

        builder.build()?.try_deserialize()
    }

    /// Whether the signing secret is still the shipped placeholder
    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt.secret == DEFAULT_JWT_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const MISSING_DIR: &str = "./does-not-exist";

    #[test]
    #[serial]
    fn defaults_apply_without_files() {
        let settings =
            Settings::load_with_options(MISSING_DIR, 3001, None, None).expect("load settings");

        assert_eq!(settings.server.port, 3001);
        assert_eq!(settings.server.bind_address(), "0.0.0.0:3001");
        assert_eq!(settings.jwt.expiration, 3600);
        assert!(settings.uses_default_jwt_secret());
        assert_eq!(settings.rate_limit.max_attempts, 5);
        assert_eq!(settings.rate_limit.lockout_seconds, 900);
        assert!(!settings.app.debug);
        assert!(settings.cloudinary.cloud_name.is_none());
        assert_eq!(
            settings.cors.allowed_origins,
            vec!["http://localhost", "http://localhost:3000"]
        );
    }

    #[test]
    #[serial]
    fn explicit_overrides_win_over_defaults() {
        let mut overrides = HashMap::new();
        overrides.insert("server.port".to_string(), "9000".to_string());
        overrides.insert("cloudinary.cloud_name".to_string(), "demo".to_string());

        let settings = Settings::load_with_options(MISSING_DIR, 3000, None, Some(overrides))
            .expect("load settings");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.cloudinary.cloud_name.as_deref(), Some("demo"));
    }

    #[test]
    #[serial]
    fn environment_overrides_everything() {
        unsafe {
            env::set_var("MARKET__JWT__SECRET", "from-env");
            env::set_var("MARKET__APP__DEBUG", "true");
        }

        let settings =
            Settings::load_with_options(MISSING_DIR, 3000, None, None).expect("load settings");
        assert_eq!(settings.jwt.secret, "from-env");
        assert!(settings.app.debug);
        assert!(!settings.uses_default_jwt_secret());

        unsafe {
            env::remove_var("MARKET__JWT__SECRET");
            env::remove_var("MARKET__APP__DEBUG");
        }
    }
}
