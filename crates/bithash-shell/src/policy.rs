//! Navigation routing policy
//!
//! Decides, for every attempted navigation, whether the embedded browser may
//! follow it inline or whether it is handed to the system browser. The
//! decision is a pure function of the configuration and the target URL, so
//! webview callbacks can take it without touching controller state.

use bithash_core::ShellConfig;
use url::Url;

/// Routing verdict for a navigation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Let the embedded browser navigate in place
    Inline,
    /// Block inline navigation and open the URL in the system browser
    External,
}

/// Classify a navigation target.
///
/// Same-origin URLs and identity-provider URLs stay inline; everything else
/// is delegated to the system browser.
pub fn decide_navigation(config: &ShellConfig, target: &str) -> NavigationDecision {
    // Blank/internal documents are the webview's own business
    if target == "about:blank" || target.starts_with("data:") {
        return NavigationDecision::Inline;
    }

    let origin = config.start_url.trim_end_matches('/');
    if target.starts_with(origin) {
        return NavigationDecision::Inline;
    }

    if matches_auth_allowlist(config, target) {
        return NavigationDecision::Inline;
    }

    NavigationDecision::External
}

/// True if the URL belongs to a trusted identity-provider domain.
///
/// Patterns containing a `/` are matched as host+path substrings; bare host
/// patterns match the host exactly or as a domain suffix.
pub fn matches_auth_allowlist(config: &ShellConfig, target: &str) -> bool {
    let parsed = match Url::parse(target) {
        Ok(url) => url,
        Err(err) => {
            log::debug!("Unparsable navigation target {}: {}", target, err);
            return false;
        }
    };
    let host = match parsed.host_str() {
        Some(host) => host,
        None => return false,
    };
    let host_and_path = format!("{}{}", host, parsed.path());

    config.auth_allowlist.iter().any(|pattern| {
        if pattern.contains('/') {
            host_and_path.contains(pattern.as_str())
        } else {
            host == pattern || host.ends_with(&format!(".{}", pattern))
        }
    })
}
