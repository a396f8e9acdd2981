//! Shell configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The single remote origin the shell hosts
pub const DEFAULT_START_URL: &str = "https://bithash.apps.adpumb.com/";

/// Shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// URL of the hosted web app; all same-origin navigation stays inline
    pub start_url: String,

    /// Inbound deep link to load first instead of `start_url`. Only honored
    /// when it carries the configured origin prefix.
    pub entry_url: Option<String>,

    /// Identity-provider patterns trusted to complete an auth redirect
    /// inside the embedded browser. Patterns containing a `/` are matched as
    /// host+path substrings; bare hosts match exactly or as a domain suffix.
    pub auth_allowlist: Vec<String>,

    /// Delay before revealing content after a finished load, in milliseconds
    pub content_reveal_delay_ms: u64,

    /// Delay before the diagnostic-triggered recovery reload, in milliseconds
    pub diagnostic_reload_delay_ms: u64,

    /// Directory downloads are persisted to
    pub download_dir: PathBuf,

    /// User agent string for the content webview
    pub user_agent: String,

    /// Window title
    pub window_title: String,

    /// Initial window size (logical pixels)
    pub window_width: f64,
    pub window_height: f64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            entry_url: None,
            auth_allowlist: vec![
                "accounts.google.com".to_string(),
                "google.com/oauth".to_string(),
                "securetoken.googleapis.com".to_string(),
                "firebaseapp.com".to_string(),
                "__/auth/handler".to_string(),
            ],
            content_reveal_delay_ms: 300,
            diagnostic_reload_delay_ms: 1000,
            download_dir: dirs::download_dir()
                .unwrap_or_else(|| PathBuf::from(".").join("downloads")),
            user_agent: format!(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) BithashShell/{}",
                env!("CARGO_PKG_VERSION")
            ),
            window_title: "Bithash".to_string(),
            window_width: 480.0,
            window_height: 840.0,
        }
    }
}
