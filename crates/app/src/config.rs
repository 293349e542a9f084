use dotenvy::dotenv;

pub const DEFAULT_DB_URL: &str = "sqlite://lms.sqlite3";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
}

impl Config {
    /// Load `.env` if present, then read `LMS_DB_URL` and `RUST_LOG`.
    #[must_use]
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; missing or blank values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        Self {
            database_url: read("LMS_DB_URL", DEFAULT_DB_URL),
            rust_log: read("RUST_LOG", DEFAULT_LOG_FILTER),
        }
    }
}
