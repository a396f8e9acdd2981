//! Page lifecycle controller
//!
//! The single consolidated state machine behind the shell: decides what the
//! window shows (loading / content / error), which navigations stay inline,
//! and when the auth-compat patch or the recovery reload fire.
//!
//! The controller never touches a webview. Callbacks arriving from the
//! embedded browser runtime are expressed as [`BrowserEvent`]s; every
//! operation returns the [`Effect`]s the app layer must apply on the owner
//! thread. Deferred effects (`ScheduleRevealContent`, `ScheduleReload`) are
//! fire-and-forget and never cancelled, so their completion events must
//! no-op when the state has moved on.

use bithash_core::types::{
    AuthOutcome, AuthOutcomeKind, ErrorInfo, LifecycleState, NavigationRequest, Session,
};
use bithash_core::ShellConfig;

use crate::policy::{self, NavigationDecision};
use crate::probe::NetworkProbe;

/// Console output that marks the stranded-redirect condition and schedules
/// the recovery reload
const DIAGNOSTIC_MARKERS: [&str; 3] = ["missing initial state", "sessionStorage", "auth/redirect"];

/// Auth failure payloads that surface the authentication error state
const AUTH_FAILURE_MARKERS: [&str; 2] = ["missing initial state", "sessionStorage"];

/// Callback variants delivered by the embedded browser runtime and the host
/// bridge, dispatched into the controller's single-threaded queue
#[derive(Debug, Clone)]
pub enum BrowserEvent {
    /// A top-level document navigation began
    MainFrameNavigationStarted { url: String },
    /// The current document finished loading
    PageLoadFinished { url: String },
    /// The top-level document failed to load
    MainFrameLoadFailed { detail: String },
    /// An HTTP error status came back for a resource
    HttpError { status: u16, is_main_frame: bool },
    /// TLS/certificate failure, any frame
    SecureTransportError { detail: String },
    /// The hosted page reported an authentication result via the bridge
    AuthOutcome(AuthOutcome),
    /// A console message surfaced from the page
    ConsoleDiagnostic { text: String },
    /// Deferred content reveal fired (scheduled after a finished load)
    RevealContent,
    /// Deferred recovery reload fired
    ReloadPage,
    /// The user pressed the retry button on the error panel
    Retry,
    /// Back affordance pressed; the flag reports embedded-browser history
    BackPressed { can_go_back: bool },
}

/// Side effects the app layer applies against the window and webviews
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Point the content webview at a URL
    Navigate(String),
    ShowLoading,
    ShowContent,
    ShowError(ErrorInfo),
    /// Open a URL in the system browser
    OpenExternal(String),
    /// Evaluate the auth-compat patch in the page context
    InjectAuthCompat,
    /// Fire `RevealContent` after the configured delay
    ScheduleRevealContent,
    /// Fire `ReloadPage` after the configured delay
    ScheduleReload,
    /// Reload the content webview
    Reload,
    /// Navigate the embedded browser history backward
    GoBack,
    /// Delegate the back action to the enclosing shell (close the window)
    CloseShell,
}

/// The lifecycle state machine. One instance per app run, owned behind the
/// app's mutex; only the owner thread applies the effects it returns.
pub struct PageLifecycleController {
    config: ShellConfig,
    session: Session,
    probe: Box<dyn NetworkProbe>,
}

impl PageLifecycleController {
    pub fn new(config: ShellConfig, probe: Box<dyn NetworkProbe>) -> Self {
        Self {
            config,
            session: Session::new(),
            probe,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Initial load: probe connectivity, then either navigate to the
    /// configured origin or surface the no-internet error without
    /// attempting navigation.
    pub fn start(&mut self) -> Vec<Effect> {
        if !self.probe.is_online() {
            log::warn!("Connectivity unavailable at start");
            return self.enter_error(ErrorInfo::no_internet());
        }

        let target = self
            .config
            .entry_url
            .clone()
            .unwrap_or_else(|| self.config.start_url.clone());
        log::info!("Starting session at {}", target);
        self.session.state = LifecycleState::Loading;
        self.session.current_url = Some(target.clone());
        vec![Effect::ShowLoading, Effect::Navigate(target)]
    }

    /// Routing decision for a navigation attempt. Returns `true` when the
    /// navigation is delegated to the system browser (with exactly one
    /// `OpenExternal` effect), `false` when the embedded browser may follow
    /// it inline.
    pub fn on_navigation_requested(&self, req: &NavigationRequest) -> (bool, Vec<Effect>) {
        match policy::decide_navigation(&self.config, &req.target_url) {
            NavigationDecision::Inline => (false, Vec::new()),
            NavigationDecision::External => {
                log::info!("Delegating navigation to system browser: {}", req.target_url);
                (true, vec![Effect::OpenExternal(req.target_url.clone())])
            }
        }
    }

    pub fn handle(&mut self, event: BrowserEvent) -> Vec<Effect> {
        match event {
            BrowserEvent::MainFrameNavigationStarted { url } => self.on_navigation_started(url),
            BrowserEvent::PageLoadFinished { url } => self.on_load_finished(url),
            BrowserEvent::MainFrameLoadFailed { detail } => self.on_load_failed(&detail),
            BrowserEvent::HttpError {
                status,
                is_main_frame,
            } => self.on_http_error(status, is_main_frame),
            BrowserEvent::SecureTransportError { detail } => self.on_tls_error(&detail),
            BrowserEvent::AuthOutcome(outcome) => self.on_auth_outcome(outcome),
            BrowserEvent::ConsoleDiagnostic { text } => self.on_console_diagnostic(&text),
            BrowserEvent::RevealContent => self.on_reveal_content(),
            BrowserEvent::ReloadPage => {
                log::info!("Recovery reload firing");
                vec![Effect::Reload]
            }
            BrowserEvent::Retry => self.retry(),
            BrowserEvent::BackPressed { can_go_back } => self.on_back_pressed(can_go_back),
        }
    }

    fn on_navigation_started(&mut self, url: String) -> Vec<Effect> {
        self.session.error_shown = false;
        self.session.current_url = Some(url.clone());

        if policy::matches_auth_allowlist(&self.config, &url) {
            log::info!("Entering identity-provider domain, applying auth-compat patch");
            vec![Effect::InjectAuthCompat]
        } else {
            Vec::new()
        }
    }

    fn on_load_finished(&mut self, url: String) -> Vec<Effect> {
        log::debug!("Page load finished: {}", url);
        // Reveal is deferred so fast loads do not flicker the spinner
        vec![Effect::ScheduleRevealContent]
    }

    fn on_reveal_content(&mut self) -> Vec<Effect> {
        // A stale timer may fire after an error superseded the load
        if self.session.state != LifecycleState::Loading {
            return Vec::new();
        }
        self.session.state = LifecycleState::Content;
        vec![Effect::ShowContent]
    }

    fn on_load_failed(&mut self, detail: &str) -> Vec<Effect> {
        log::warn!("Main frame load failed: {}", detail);
        if !self.probe.is_online() {
            self.enter_error(ErrorInfo::no_internet())
        } else {
            self.enter_error(ErrorInfo::load_failure())
        }
    }

    fn on_http_error(&mut self, status: u16, is_main_frame: bool) -> Vec<Effect> {
        if !is_main_frame {
            log::debug!("Ignoring sub-frame HTTP error {}", status);
            return Vec::new();
        }
        log::warn!("Main frame HTTP error {}", status);
        self.enter_error(ErrorInfo::server_error())
    }

    fn on_tls_error(&mut self, detail: &str) -> Vec<Effect> {
        // Fail closed, sub-frames included
        log::warn!("Secure transport error: {}", detail);
        self.enter_error(ErrorInfo::security_error())
    }

    fn on_auth_outcome(&mut self, outcome: AuthOutcome) -> Vec<Effect> {
        match outcome.kind {
            AuthOutcomeKind::Success => {
                log::info!("Authentication succeeded");
                Vec::new()
            }
            AuthOutcomeKind::Error => {
                if AUTH_FAILURE_MARKERS
                    .iter()
                    .any(|marker| outcome.payload.contains(marker))
                {
                    log::warn!("Authentication failed: {}", outcome.payload);
                    self.enter_error(ErrorInfo::auth_error())
                } else {
                    log::warn!("Ignoring auth error outside the stranded-redirect condition: {}", outcome.payload);
                    Vec::new()
                }
            }
        }
    }

    fn on_console_diagnostic(&mut self, text: &str) -> Vec<Effect> {
        log::debug!("Page console: {}", text);
        if DIAGNOSTIC_MARKERS.iter().any(|marker| text.contains(marker)) {
            log::info!("Stranded-redirect diagnostic seen, scheduling recovery reload");
            vec![Effect::ScheduleReload]
        } else {
            Vec::new()
        }
    }

    fn retry(&mut self) -> Vec<Effect> {
        if self.session.state != LifecycleState::Error {
            return Vec::new();
        }
        log::info!("Retrying after error");
        self.session.error_shown = false;
        self.start()
    }

    fn on_back_pressed(&mut self, can_go_back: bool) -> Vec<Effect> {
        if can_go_back && self.session.state != LifecycleState::Error {
            vec![Effect::GoBack]
        } else {
            vec![Effect::CloseShell]
        }
    }

    fn enter_error(&mut self, info: ErrorInfo) -> Vec<Effect> {
        self.session.state = LifecycleState::Error;
        self.session.error_shown = true;
        vec![Effect::ShowError(info)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::FixedProbe;
    use bithash_core::config::DEFAULT_START_URL;

    fn controller(online: bool) -> PageLifecycleController {
        PageLifecycleController::new(ShellConfig::default(), Box::new(FixedProbe(online)))
    }

    /// Drive a controller to the Content state
    fn loaded_controller() -> PageLifecycleController {
        let mut c = controller(true);
        c.start();
        c.handle(BrowserEvent::PageLoadFinished {
            url: DEFAULT_START_URL.to_string(),
        });
        c.handle(BrowserEvent::RevealContent);
        c
    }

    #[test]
    fn test_start_online_navigates_to_origin() {
        let mut c = controller(true);
        let effects = c.start();
        assert_eq!(
            effects,
            vec![
                Effect::ShowLoading,
                Effect::Navigate(DEFAULT_START_URL.to_string())
            ]
        );
        assert_eq!(c.session().state, LifecycleState::Loading);
    }

    #[test]
    fn test_start_honors_an_origin_deep_link() {
        let mut config = ShellConfig::default();
        let deep_link = format!("{}reports/42", DEFAULT_START_URL);
        config.entry_url = Some(deep_link.clone());
        let mut c = PageLifecycleController::new(config, Box::new(FixedProbe(true)));

        let effects = c.start();
        assert_eq!(
            effects,
            vec![Effect::ShowLoading, Effect::Navigate(deep_link)]
        );
        // Routing still keys off the origin, not the deep link
        let (external, _) = c.on_navigation_requested(&NavigationRequest::main_frame(
            DEFAULT_START_URL,
        ));
        assert!(!external);
    }

    #[test]
    fn test_start_offline_errors_without_navigating() {
        let mut c = controller(false);
        let effects = c.start();
        assert_eq!(effects, vec![Effect::ShowError(ErrorInfo::no_internet())]);
        assert_eq!(c.session().state, LifecycleState::Error);
        assert!(c.session().error_shown);
        assert!(!effects.iter().any(|e| matches!(e, Effect::Navigate(_))));
    }

    #[test]
    fn test_origin_navigation_is_inline() {
        let c = controller(true);
        let (external, effects) = c.on_navigation_requested(&NavigationRequest::main_frame(
            "https://bithash.apps.adpumb.com/invoices",
        ));
        assert!(!external);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_identity_provider_navigation_is_inline() {
        let c = controller(true);
        let (external, _) = c.on_navigation_requested(&NavigationRequest::main_frame(
            "https://accounts.google.com/o/oauth2/v2/auth",
        ));
        assert!(!external);
    }

    #[test]
    fn test_external_navigation_opens_exactly_once_with_unmodified_url() {
        let c = controller(true);
        let url = "https://example.com/docs?q=1";
        let (external, effects) = c.on_navigation_requested(&NavigationRequest::main_frame(url));
        assert!(external);
        assert_eq!(effects, vec![Effect::OpenExternal(url.to_string())]);
    }

    #[test]
    fn test_load_finished_defers_the_reveal() {
        let mut c = controller(true);
        c.start();
        let effects = c.handle(BrowserEvent::PageLoadFinished {
            url: DEFAULT_START_URL.to_string(),
        });
        assert_eq!(effects, vec![Effect::ScheduleRevealContent]);
        // Content is not shown until the deferred event fires
        assert_eq!(c.session().state, LifecycleState::Loading);

        let effects = c.handle(BrowserEvent::RevealContent);
        assert_eq!(effects, vec![Effect::ShowContent]);
        assert_eq!(c.session().state, LifecycleState::Content);
    }

    #[test]
    fn test_stale_reveal_after_error_is_a_no_op() {
        let mut c = controller(true);
        c.start();
        c.handle(BrowserEvent::PageLoadFinished {
            url: DEFAULT_START_URL.to_string(),
        });
        c.handle(BrowserEvent::HttpError {
            status: 503,
            is_main_frame: true,
        });
        let effects = c.handle(BrowserEvent::RevealContent);
        assert!(effects.is_empty());
        assert_eq!(c.session().state, LifecycleState::Error);
    }

    #[test]
    fn test_load_failure_classifies_by_connectivity() {
        let mut offline = controller(false);
        offline.session.state = LifecycleState::Loading;
        let effects = offline.handle(BrowserEvent::MainFrameLoadFailed {
            detail: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        });
        assert_eq!(effects, vec![Effect::ShowError(ErrorInfo::no_internet())]);

        let mut online = controller(true);
        online.start();
        let effects = online.handle(BrowserEvent::MainFrameLoadFailed {
            detail: "net::ERR_CONNECTION_RESET".to_string(),
        });
        assert_eq!(effects, vec![Effect::ShowError(ErrorInfo::load_failure())]);
    }

    #[test]
    fn test_http_error_ignores_sub_frames() {
        let mut c = loaded_controller();
        let effects = c.handle(BrowserEvent::HttpError {
            status: 404,
            is_main_frame: false,
        });
        assert!(effects.is_empty());
        assert_eq!(c.session().state, LifecycleState::Content);
    }

    #[test]
    fn test_tls_error_fails_closed_even_for_sub_frames() {
        let mut c = loaded_controller();
        let effects = c.handle(BrowserEvent::SecureTransportError {
            detail: "certificate expired (iframe)".to_string(),
        });
        assert_eq!(effects, vec![Effect::ShowError(ErrorInfo::security_error())]);
        assert_eq!(c.session().state, LifecycleState::Error);
    }

    #[test]
    fn test_auth_error_with_missing_initial_state_enters_error() {
        let mut c = loaded_controller();
        let effects = c.handle(BrowserEvent::AuthOutcome(AuthOutcome {
            kind: AuthOutcomeKind::Error,
            payload: "auth/missing initial state in storage".to_string(),
        }));
        assert_eq!(effects, vec![Effect::ShowError(ErrorInfo::auth_error())]);
    }

    #[test]
    fn test_auth_success_leaves_state_unchanged() {
        let mut c = loaded_controller();
        let effects = c.handle(BrowserEvent::AuthOutcome(AuthOutcome {
            kind: AuthOutcomeKind::Success,
            payload: "uid-1234".to_string(),
        }));
        assert!(effects.is_empty());
        assert_eq!(c.session().state, LifecycleState::Content);
    }

    #[test]
    fn test_unrelated_auth_error_is_logged_only() {
        let mut c = loaded_controller();
        let effects = c.handle(BrowserEvent::AuthOutcome(AuthOutcome {
            kind: AuthOutcomeKind::Error,
            payload: "auth/popup-closed-by-user".to_string(),
        }));
        assert!(effects.is_empty());
        assert_eq!(c.session().state, LifecycleState::Content);
    }

    #[test]
    fn test_diagnostic_console_text_schedules_reload() {
        let mut c = loaded_controller();
        for text in [
            "Unable to process request due to missing initial state",
            "sessionStorage is not available",
            "auth/redirect-cancelled-by-user",
        ] {
            let effects = c.handle(BrowserEvent::ConsoleDiagnostic {
                text: text.to_string(),
            });
            assert_eq!(effects, vec![Effect::ScheduleReload], "{}", text);
        }
        // Display state is untouched by the heuristic
        assert_eq!(c.session().state, LifecycleState::Content);
    }

    #[test]
    fn test_ordinary_console_text_is_ignored() {
        let mut c = loaded_controller();
        let effects = c.handle(BrowserEvent::ConsoleDiagnostic {
            text: "render took 32ms".to_string(),
        });
        assert!(effects.is_empty());
    }

    #[test]
    fn test_retry_from_error_reruns_the_connectivity_check() {
        let mut c = controller(false);
        c.start();
        assert!(c.session().error_shown);

        // Probe still offline: retry clears the flag, re-probes, errors again
        let effects = c.handle(BrowserEvent::Retry);
        assert_eq!(effects, vec![Effect::ShowError(ErrorInfo::no_internet())]);
    }

    #[test]
    fn test_retry_back_online_reloads_the_origin() {
        let mut c = controller(true);
        c.start();
        c.handle(BrowserEvent::MainFrameLoadFailed {
            detail: "net::ERR_TIMED_OUT".to_string(),
        });
        assert_eq!(c.session().state, LifecycleState::Error);

        let effects = c.handle(BrowserEvent::Retry);
        assert_eq!(
            effects,
            vec![
                Effect::ShowLoading,
                Effect::Navigate(DEFAULT_START_URL.to_string())
            ]
        );
        assert!(!c.session().error_shown);
        assert_eq!(c.session().state, LifecycleState::Loading);
    }

    #[test]
    fn test_retry_outside_error_is_a_no_op() {
        let mut c = loaded_controller();
        let effects = c.handle(BrowserEvent::Retry);
        assert!(effects.is_empty());
        assert_eq!(c.session().state, LifecycleState::Content);
    }

    #[test]
    fn test_navigation_started_clears_error_flag_and_patches_idp_domains() {
        let mut c = loaded_controller();
        c.session.error_shown = true;

        let effects = c.handle(BrowserEvent::MainFrameNavigationStarted {
            url: "https://demo.firebaseapp.com/__/auth/handler".to_string(),
        });
        assert!(!c.session().error_shown);
        assert_eq!(effects, vec![Effect::InjectAuthCompat]);

        let effects = c.handle(BrowserEvent::MainFrameNavigationStarted {
            url: DEFAULT_START_URL.to_string(),
        });
        assert!(effects.is_empty());
    }

    #[test]
    fn test_back_goes_backward_only_with_history_and_no_error() {
        let mut c = loaded_controller();
        assert_eq!(
            c.handle(BrowserEvent::BackPressed { can_go_back: true }),
            vec![Effect::GoBack]
        );
        assert_eq!(
            c.handle(BrowserEvent::BackPressed { can_go_back: false }),
            vec![Effect::CloseShell]
        );

        c.handle(BrowserEvent::SecureTransportError {
            detail: "bad cert".to_string(),
        });
        assert_eq!(
            c.handle(BrowserEvent::BackPressed { can_go_back: true }),
            vec![Effect::CloseShell]
        );
    }

    #[test]
    fn test_deferred_reload_fires_unconditionally() {
        let mut c = loaded_controller();
        assert_eq!(c.handle(BrowserEvent::ReloadPage), vec![Effect::Reload]);
    }
}
