use std::env;

use thiserror::Error;

/// Environment variable holding the token signing secret. It has no fallback.
pub const JWT_SECRET_VAR: &str = "JWT_SECRET";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared read-only through `AppState` (pulled out by handlers via `FromRef`).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls cookie hardening and log format.
    pub env: Env,
    pub port: u16,
    // Postgres connection string. `None` is only accepted in Env::Local,
    // where the in-memory repository is used instead.
    pub db_url: Option<String>,
    // HMAC secret used to sign and verify session tokens.
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    // OAuth client id that Google ID tokens must be issued for.
    pub google_client_id: Option<String>,
    // Present when uploads go to the S3-compatible blob store.
    pub blob_store: Option<BlobStoreConfig>,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    // When true, the first X-Forwarded-For hop identifies the client.
    pub trust_proxy: bool,
    pub admin_invite_code: Option<String>,
    pub admin_emails: Vec<String>,
}

/// BlobStoreConfig
///
/// Credentials and addressing for the S3-compatible image host.
#[derive(Clone, Debug, PartialEq)]
pub struct BlobStoreConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    // Public base URL objects are fetched from, e.g. https://cdn.example.com/bucket
    pub public_base_url: String,
    // Key prefix for every uploaded image.
    pub folder: String,
}

/// Env
///
/// Defines the runtime context.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test state setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: 3000,
            db_url: None,
            jwt_secret: "portfolio-test-signing-secret".to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
            google_client_id: Some("test-client-id.apps.googleusercontent.com".to_string()),
            blob_store: None,
            upload_dir: "uploads".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            rate_limit_max: 1000,
            rate_limit_window_secs: 900,
            trust_proxy: false,
            admin_invite_code: None,
            admin_emails: vec![],
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment. Missing secrets are reported as
    /// `ConfigError` so startup can fail before binding a socket.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").unwrap_or_default().as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = non_empty(JWT_SECRET_VAR).ok_or(ConfigError::Missing(JWT_SECRET_VAR))?;

        let db_url = non_empty("DATABASE_URL");
        if env == Env::Production && db_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            env,
            port: parse_or("PORT", 3000)?,
            db_url,
            jwt_secret,
            cors_origins: non_empty("CORS_ORIGINS")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(|| vec!["http://localhost:5173".to_string()]),
            google_client_id: non_empty("GOOGLE_CLIENT_ID"),
            blob_store: load_blob_store()?,
            upload_dir: non_empty("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            rate_limit_max: parse_or("RATE_LIMIT_MAX", 100)?,
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", 900)?,
            trust_proxy: parse_or("TRUST_PROXY", false)?,
            admin_invite_code: non_empty("ADMIN_INVITE_CODE"),
            admin_emails: non_empty("ADMIN_EMAILS")
                .map(|raw| split_list(&raw).into_iter().map(|e| e.to_lowercase()).collect())
                .unwrap_or_default(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.env == Env::Production
    }
}

/// The blob store is enabled by the presence of its bucket name; once enabled,
/// its credentials become mandatory.
fn load_blob_store() -> Result<Option<BlobStoreConfig>, ConfigError> {
    let Some(bucket) = non_empty("S3_BUCKET_NAME") else {
        return Ok(None);
    };

    Ok(Some(BlobStoreConfig {
        endpoint: non_empty("S3_ENDPOINT"),
        region: non_empty("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        access_key: non_empty("S3_ACCESS_KEY").ok_or(ConfigError::Missing("S3_ACCESS_KEY"))?,
        secret_key: non_empty("S3_SECRET_KEY").ok_or(ConfigError::Missing("S3_SECRET_KEY"))?,
        public_base_url: non_empty("S3_PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or(ConfigError::Missing("S3_PUBLIC_URL"))?,
        folder: non_empty("S3_FOLDER")
            .map(|f| f.trim_matches('/').to_string())
            .unwrap_or_else(|| "portfolio".to_string()),
        bucket,
    }))
}

fn non_empty(var: &'static str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(var) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
