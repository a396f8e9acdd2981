//! Host bridge and IPC wire format
//!
//! The hosted page talks to the shell through a `window.Android` object the
//! initialization script installs in the content webview (the name is part
//! of the page's contract and kept as-is). Every call posts a JSON message
//! over the wry IPC channel; the handler forwards it to the event loop, so
//! no state is touched off the owner thread.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

use bithash_core::types::AuthOutcomeKind;
use bithash_core::BithashResult;
use bithash_shell::BrowserEvent;

/// Console output that indicates a TLS/certificate failure on a page
/// resource. The embedded runtime reports these through the console rather
/// than a dedicated callback.
const TLS_FAILURE_MARKERS: [&str; 3] = ["ERR_CERT", "ERR_SSL", "SSL_ERROR"];

/// IPC message posted by the content or overlay webview
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum BridgeMessage {
    /// `Android.persistFile(data, filename)`
    PersistFile { data: String, filename: String },
    /// `Android.reportAuthOutcome(kind, payload)`
    ReportAuthOutcome {
        kind: AuthOutcomeKind,
        payload: String,
    },
    /// Mirrored page console output
    ConsoleDiagnostic { text: String },
    /// Main-document HTTP status, read from navigation timing after load
    PageStatus { status: u16 },
    /// Back affordance (overlay button or Alt+Left in the page)
    GoBack,
    /// Retry button on the error panel
    Retry,
}

/// Initialization script for the content webview: installs the `Android`
/// bridge, mirrors console output, reports the main-document HTTP status,
/// and forwards the back gesture.
pub const CONTENT_BRIDGE_SCRIPT: &str = r#"
(function() {
    if (window.Android) { return; }
    var post = function(msg) {
        try { window.ipc.postMessage(JSON.stringify(msg)); } catch (e) {}
    };

    window.Android = {
        persistFile: function(data, filename) {
            post({ cmd: 'persist_file', data: String(data), filename: String(filename) });
        },
        reportAuthOutcome: function(kind, payload) {
            post({
                cmd: 'report_auth_outcome',
                kind: String(kind).toLowerCase() === 'error' ? 'error' : 'success',
                payload: String(payload == null ? '' : payload)
            });
        }
    };

    ['log', 'warn', 'error'].forEach(function(level) {
        var original = console[level];
        console[level] = function() {
            var text = Array.prototype.map.call(arguments, String).join(' ');
            post({ cmd: 'console_diagnostic', text: text });
            return original.apply(console, arguments);
        };
    });
    window.addEventListener('error', function(e) {
        post({ cmd: 'console_diagnostic', text: String(e.message || e) });
    });

    window.addEventListener('load', function() {
        try {
            var entries = performance.getEntriesByType('navigation');
            if (entries.length && typeof entries[0].responseStatus === 'number'
                && entries[0].responseStatus > 0) {
                post({ cmd: 'page_status', status: entries[0].responseStatus });
            }
        } catch (e) {}
    });

    window.addEventListener('keydown', function(e) {
        if (e.altKey && e.key === 'ArrowLeft') {
            e.preventDefault();
            post({ cmd: 'go_back' });
        }
    });

    // Transient notification rendered inside the page, used for download
    // results while the shell overlay is collapsed
    window.__bithashToast = function(message) {
        var node = document.createElement('div');
        node.textContent = String(message);
        node.style.cssText = 'position:fixed;left:50%;bottom:24px;transform:translateX(-50%);'
            + 'background:rgba(31,36,48,0.92);color:#fff;padding:9px 16px;border-radius:18px;'
            + 'font-size:13px;z-index:2147483647;max-width:80%;pointer-events:none;'
            + 'transition:opacity 0.25s;';
        document.body.appendChild(node);
        setTimeout(function() { node.style.opacity = '0'; }, 3500);
        setTimeout(function() { node.remove(); }, 3800);
    };
})();
"#;

/// Script evaluating a page-side toast with the message JSON-escaped
pub fn toast_script(message: &str) -> String {
    let escaped = serde_json::to_string(message).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "if (window.__bithashToast) {{ __bithashToast({}); }}",
        escaped
    )
}

/// Map mirrored console text onto a lifecycle event. Certificate failures on
/// sub-resources surface here, which is the only channel the runtime gives
/// us for them.
pub fn console_event(text: String) -> BrowserEvent {
    if TLS_FAILURE_MARKERS.iter().any(|marker| text.contains(marker)) {
        BrowserEvent::SecureTransportError { detail: text }
    } else {
        BrowserEvent::ConsoleDiagnostic { text }
    }
}

/// Decode a base64 (optionally data-URL-prefixed) payload and write it to a
/// uniquely named file under `download_dir`. Returns the path written.
pub fn persist_file(download_dir: &Path, data: &str, filename: &str) -> BithashResult<PathBuf> {
    let encoded = match data.split_once(',') {
        Some((_, tail)) => tail,
        None => data,
    };
    let bytes = BASE64.decode(encoded.trim())?;

    fs::create_dir_all(download_dir)?;
    let path = unique_download_path(download_dir, filename);
    fs::write(&path, bytes)?;
    log::info!("Saved download to {}", path.display());
    Ok(path)
}

/// Historical collision naming: `name(1).pdf`, `name(2).pdf`, ... The
/// counter always lands ahead of a literal `.pdf` suffix, whatever the
/// original extension.
fn unique_download_path(dir: &Path, file_name: &str) -> PathBuf {
    let mut candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let base = file_name.strip_suffix(".pdf").unwrap_or(file_name);
    let mut counter = 1;
    loop {
        candidate = dir.join(format!("{}({}).pdf", base, counter));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
