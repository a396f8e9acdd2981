//! Shell surface - the overlay webview rendering loading/error states
//!
//! The overlay is a full-window child webview layered above the content
//! webview. All state changes are pushed into it with fire-and-forget
//! `evaluate_script` calls against the `bithashShell` page namespace; when
//! content is revealed the overlay collapses to zero-size bounds so the
//! content webview receives input.

use bithash_core::types::ErrorInfo;
use wry::dpi::{LogicalPosition, LogicalSize};
use wry::{Rect, WebView};

/// Convert logical position/size to a WRY Rect
pub fn make_rect(x: f64, y: f64, width: f64, height: f64) -> Rect {
    Rect {
        position: LogicalPosition::new(x, y).into(),
        size: LogicalSize::new(width, height).into(),
    }
}

pub struct ShellSurface {
    webview: WebView,
}

impl ShellSurface {
    pub fn new(webview: WebView) -> Self {
        Self { webview }
    }

    pub fn set_bounds(&self, rect: Rect) {
        let _ = self.webview.set_bounds(rect);
    }

    pub fn show_loading(&self) {
        self.eval(&surface_call("showLoading", &[]));
    }

    pub fn show_content(&self) {
        self.eval(&surface_call("showContent", &[]));
    }

    pub fn show_error(&self, info: &ErrorInfo) {
        self.eval(&surface_call("showError", &[&info.title, &info.detail]));
    }

    fn eval(&self, script: &str) {
        if let Err(err) = self.webview.evaluate_script(script) {
            log::warn!("Overlay script evaluation failed: {}", err);
        }
    }
}

/// Build a guarded call into the overlay page namespace, JSON-escaping every
/// argument
fn surface_call(func: &str, args: &[&str]) -> String {
    let rendered: Vec<String> = args
        .iter()
        .map(|arg| serde_json::to_string(arg).unwrap_or_else(|_| "\"\"".to_string()))
        .collect();
    format!(
        "if (window.bithashShell) {{ bithashShell.{}({}); }}",
        func,
        rendered.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_call_without_args() {
        assert_eq!(
            surface_call("showLoading", &[]),
            "if (window.bithashShell) { bithashShell.showLoading(); }"
        );
    }

    #[test]
    fn test_surface_call_escapes_arguments() {
        let script = surface_call("showError", &["Server Error", "a \"quoted\" detail\nline"]);
        assert!(script.contains("bithashShell.showError(\"Server Error\", "));
        assert!(script.contains("\\\"quoted\\\""));
        assert!(script.contains("\\n"));
        // No raw newline may survive into the script text
        assert!(!script.contains('\n'));
    }
}
