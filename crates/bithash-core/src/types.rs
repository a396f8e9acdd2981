//! Common types used throughout the Bithash shell

use serde::{Deserialize, Serialize};

/// Lifecycle state of the hosted page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Loading,
    Content,
    Error,
}

/// The single logical browsing session.
///
/// Created at startup, mutated only by the lifecycle controller, discarded on
/// shutdown. Never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    pub current_url: Option<String>,
    pub state: LifecycleState,
    pub error_shown: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            current_url: None,
            state: LifecycleState::Loading,
            error_shown: false,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Error display payload: a fixed title plus detail text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub title: String,
    pub detail: String,
}

impl ErrorInfo {
    fn fixed(title: &str, detail: &str) -> Self {
        Self {
            title: title.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn no_internet() -> Self {
        Self::fixed(
            "No internet connection",
            "Please check your connection and try again.",
        )
    }

    pub fn load_failure() -> Self {
        Self::fixed(
            "Failed to Load",
            "Unable to load the content. Please check internet and try again later.",
        )
    }

    pub fn server_error() -> Self {
        Self::fixed(
            "Server Error",
            "The server encountered an error. Please try again later.",
        )
    }

    pub fn security_error() -> Self {
        Self::fixed(
            "Security Error",
            "There was a security issue loading the page. Please check your connection and try again.",
        )
    }

    pub fn auth_error() -> Self {
        Self::fixed(
            "Authentication Error",
            "Sign-in could not be completed. Please try again.",
        )
    }
}

/// A navigation attempt reported by the embedded browser
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    pub target_url: String,
    pub is_main_frame: bool,
}

impl NavigationRequest {
    pub fn main_frame(url: impl Into<String>) -> Self {
        Self {
            target_url: url.into(),
            is_main_frame: true,
        }
    }
}

/// Outcome of an authentication attempt reported by the hosted page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthOutcomeKind {
    Error,
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub kind: AuthOutcomeKind,
    pub payload: String,
}
