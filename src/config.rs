//! Runtime configuration loaded from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_ORGANIZATION_ADDRESS: &str = "12 rue de la République, 69002 Lyon";
const DEFAULT_ORIGIN: &str = "http://localhost:8080";
const DEFAULT_TEMPLATE_FILE: &str = "./data/profile_templates.json";
const DEFAULT_EMPLOYEE_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Everything the service needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Public origin embedded in profile QR codes, e.g. `https://rh.example.org`.
    pub public_origin: String,
    pub template_file: PathBuf,
    pub employee_api_url: String,
    pub employee_api_token: Option<String>,
    pub organization_address: String,
    pub max_upload_bytes: usize,
    pub export_pixel_ratio: f32,
    pub view_ttl: Duration,
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            public_origin: DEFAULT_ORIGIN.to_string(),
            template_file: PathBuf::from(DEFAULT_TEMPLATE_FILE),
            employee_api_url: DEFAULT_EMPLOYEE_API_URL.to_string(),
            employee_api_token: None,
            organization_address: DEFAULT_ORGANIZATION_ADDRESS.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            export_pixel_ratio: 2.0,
            view_ttl: Duration::from_secs(30 * 60),
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let allowed_origins = match env::var("PROFILE_ALLOWED_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => defaults.allowed_origins,
        };

        Ok(Self {
            bind_addr: env::var("PROFILE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_var("PROFILE_PORT", defaults.port)?,
            public_origin: env::var("PROFILE_PUBLIC_ORIGIN").unwrap_or(defaults.public_origin),
            template_file: env::var("PROFILE_TEMPLATE_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.template_file),
            employee_api_url: env::var("EMPLOYEE_API_URL").unwrap_or(defaults.employee_api_url),
            employee_api_token: env::var("EMPLOYEE_API_TOKEN").ok().filter(|t| !t.is_empty()),
            organization_address: env::var("PROFILE_ORGANIZATION_ADDRESS")
                .unwrap_or(defaults.organization_address),
            max_upload_bytes: parse_var("PROFILE_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            export_pixel_ratio: parse_var("PROFILE_EXPORT_PIXEL_RATIO", defaults.export_pixel_ratio)?
                .max(2.0),
            view_ttl: Duration::from_secs(parse_var(
                "PROFILE_VIEW_TTL_SECS",
                defaults.view_ttl.as_secs(),
            )?),
            allowed_origins,
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_uses_default_when_missing() {
        let value: u16 = parse_var("PROFILE_TEST_SURELY_UNSET_PORT", 9090).unwrap();
        assert_eq!(value, 9090);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        std::env::set_var("PROFILE_TEST_BAD_NUMBER", "douze");
        let result: Result<u16, _> = parse_var("PROFILE_TEST_BAD_NUMBER", 1);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "PROFILE_TEST_BAD_NUMBER", .. })
        ));
    }

    #[test]
    fn test_default_pixel_ratio_is_at_least_two() {
        assert!(AppConfig::default().export_pixel_ratio >= 2.0);
    }
}
