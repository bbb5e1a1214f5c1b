use std::path::PathBuf;

use crate::merge::DEFAULT_MERGED_FILE_NAME;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub merged_file: PathBuf,
    pub db_url: Option<String>,
    pub db_max_connections: u32,
    pub strict_country_bounds: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "./data".to_string()));
        let merged_file = lookup("MERGED_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(DEFAULT_MERGED_FILE_NAME));

        Self {
            data_dir,
            merged_file,
            db_url: lookup("DB_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            strict_country_bounds: lookup("STRICT_COUNTRY_BOUNDS")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}
