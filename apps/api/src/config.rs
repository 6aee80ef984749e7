use anyhow::{Context, Result};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
/// Matches the upload limit advertised to users ("PDF up to 10MB").
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_PDF_ENGINE: &str = "wkhtmltopdf";

/// Application configuration loaded from environment variables.
///
/// The Gemini API key is optional here on purpose: a missing key is only
/// reported when the first tuning request is attempted.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_api_base: String,
    pub gemini_max_retries: u32,
    pub max_upload_bytes: usize,
    pub pdf_engine: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_api_base: optional_env("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            gemini_max_retries: parse_env("GEMINI_MAX_RETRIES", 0)
                .context("GEMINI_MAX_RETRIES must be a non-negative integer")?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            pdf_engine: optional_env("PDF_ENGINE")
                .unwrap_or_else(|| DEFAULT_PDF_ENGINE.to_string()),
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gemini_api_key: None,
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            gemini_max_retries: 0,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            pdf_engine: DEFAULT_PDF_ENGINE.to_string(),
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

/// Empty values count as unset so `GEMINI_API_KEY=` in a .env behaves like a missing key.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Invalid value '{raw}' for environment variable '{key}'")),
        None => Ok(default),
    }
}
