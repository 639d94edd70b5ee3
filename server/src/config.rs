use anyhow::{Context, Result, anyhow};
use platform_authn::MIN_SECRET_LEN;
use platform_db::DatabaseSettings;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:4200";

#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: Vec<u8>,
    pub database: DatabaseSettings,
    pub cors_allowed_origins: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"<redacted>")
            .field("database", &self.database)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let jwt_secret = env_required("JWT_SECRET")?.into_bytes();
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(anyhow!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} bytes"
            ));
        }

        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.into()),
        );

        Ok(Self {
            jwt_secret,
            database: DatabaseSettings::from_env(),
            cors_allowed_origins,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn env_required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing env {key}"))
}
