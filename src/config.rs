use std::path::PathBuf;

use crate::enrich::limiter::DEFAULT_INTERVAL_SECS;

/// Runtime configuration assembled from the command line and platform
/// defaults before the app starts.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SerpAPI key; can also be typed into the dashboard.
    pub api_key: Option<String>,
    /// CSV file to load immediately on startup.
    pub csv_path: Option<PathBuf>,
    /// Installed-app client secret for the spreadsheet path.
    pub client_secret_path: PathBuf,
    /// Where the reusable credential is persisted between runs.
    pub token_cache_path: PathBuf,
    /// Where CSV downloads land.
    pub export_dir: PathBuf,
    /// Default pacing interval offered in the UI, in seconds.
    pub rate_limit_secs: f64,
}

impl AppConfig {
    pub fn resolve(
        api_key: Option<String>,
        csv_path: Option<PathBuf>,
        client_secret_path: Option<PathBuf>,
        token_cache_path: Option<PathBuf>,
        rate_limit_secs: Option<f64>,
    ) -> Self {
        AppConfig {
            api_key,
            csv_path,
            client_secret_path: client_secret_path
                .unwrap_or_else(|| PathBuf::from("client_secret.json")),
            token_cache_path: token_cache_path.unwrap_or_else(default_token_cache_path),
            export_dir: default_export_dir(),
            rate_limit_secs: rate_limit_secs.unwrap_or(DEFAULT_INTERVAL_SECS),
        }
    }
}

fn default_token_cache_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("tabscout").join("token.json"))
        .unwrap_or_else(|| PathBuf::from("token.json"))
}

fn default_export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}
