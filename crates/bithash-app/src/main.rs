//! Bithash shell - main application entry point
//!
//! Hosts the remote Bithash web app in a content webview, with a full-window
//! overlay webview for the loading and error states. All lifecycle decisions
//! live in bithash-shell's `PageLifecycleController`; this file owns the tao
//! event loop, translates wry callbacks into `BrowserEvent`s, and applies the
//! returned `Effect`s against the webviews on the owner thread.

mod bridge;
mod probe;
mod surface;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tao::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy},
    window::{Window, WindowBuilder},
};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use wry::{WebView, WebViewBuilder};

use bithash_core::types::{AuthOutcome, NavigationRequest};
use bithash_core::ShellConfig;
use bithash_shell::compat::AUTH_COMPAT_SCRIPT;
use bithash_shell::{BrowserEvent, Effect, PageLifecycleController};
use bridge::BridgeMessage;
use probe::TcpProbe;
use surface::{make_rect, ShellSurface};

/// The HTML content for the loading/error overlay
const SHELL_HTML: &str = include_str!("ui/shell.html");

/// Main-frame loads still pending after this long are failed over to the
/// error state (the webview runtime exposes no load-failure callback)
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// User events marshaled onto the owner thread
#[derive(Debug)]
enum UserEvent {
    /// A lifecycle event for the controller
    Browser(BrowserEvent),
    /// Effects already computed inside a webview callback
    Effects(Vec<Effect>),
    /// An IPC message from the content or overlay webview
    Bridge(BridgeMessage),
    /// Load watchdog fired; stale once the sequence number moved on
    LoadTimeout { seq: u64 },
}

/// Blank/internal documents (the initial placeholder page) carry no
/// lifecycle meaning
fn is_blank_document(url: &str) -> bool {
    url == "about:blank" || url.starts_with("data:")
}

/// Fire-and-forget deferred event on the owner thread's queue
fn schedule(proxy: &EventLoopProxy<UserEvent>, delay: Duration, event: UserEvent) {
    let proxy = proxy.clone();
    thread::spawn(move || {
        thread::sleep(delay);
        let _ = proxy.send_event(event);
    });
}

fn handle_locked(
    controller: &Arc<Mutex<PageLifecycleController>>,
    event: BrowserEvent,
) -> Vec<Effect> {
    match controller.lock() {
        Ok(mut c) => c.handle(event),
        Err(poisoned) => poisoned.into_inner().handle(event),
    }
}

/// Content always fills the window; the overlay either covers it or is
/// collapsed out of the way so the page receives input
fn layout(window: &Window, surface: &ShellSurface, content: &WebView, overlay_active: bool) {
    let scale = window.scale_factor();
    let size = window.inner_size();
    let width = size.width as f64 / scale;
    let height = size.height as f64 / scale;
    let _ = content.set_bounds(make_rect(0.0, 0.0, width, height));
    surface.set_bounds(if overlay_active {
        make_rect(0.0, 0.0, width, height)
    } else {
        make_rect(0.0, 0.0, 0.0, 0.0)
    });
}

#[allow(clippy::too_many_arguments)]
fn apply_effect(
    effect: Effect,
    window: &Window,
    surface: &ShellSurface,
    content: &WebView,
    proxy: &EventLoopProxy<UserEvent>,
    reveal_delay: Duration,
    reload_delay: Duration,
    overlay_active: &mut bool,
    control_flow: &mut ControlFlow,
) {
    match effect {
        Effect::Navigate(url) => {
            if let Err(err) = content.load_url(&url) {
                error!("Failed to load {}: {}", url, err);
            }
        }
        Effect::ShowLoading => {
            *overlay_active = true;
            surface.show_loading();
            layout(window, surface, content, *overlay_active);
        }
        Effect::ShowContent => {
            *overlay_active = false;
            surface.show_content();
            layout(window, surface, content, *overlay_active);
        }
        Effect::ShowError(info) => {
            *overlay_active = true;
            surface.show_error(&info);
            layout(window, surface, content, *overlay_active);
        }
        Effect::OpenExternal(url) => {
            info!("Opening in system browser: {}", url);
            if let Err(err) = open::that(&url) {
                error!("Failed to open {} externally: {}", url, err);
            }
        }
        Effect::InjectAuthCompat => {
            let _ = content.evaluate_script(AUTH_COMPAT_SCRIPT);
        }
        Effect::ScheduleRevealContent => schedule(
            proxy,
            reveal_delay,
            UserEvent::Browser(BrowserEvent::RevealContent),
        ),
        Effect::ScheduleReload => schedule(
            proxy,
            reload_delay,
            UserEvent::Browser(BrowserEvent::ReloadPage),
        ),
        Effect::Reload => {
            let _ = content.evaluate_script("location.reload();");
        }
        Effect::GoBack => {
            let _ = content.evaluate_script("history.back();");
        }
        Effect::CloseShell => {
            info!("Back action delegated to the shell, exiting");
            *control_flow = ControlFlow::Exit;
        }
    }
}

fn main() {
    // Initialize logging with log compatibility
    tracing_log::LogTracer::init().expect("Failed to set log tracer");
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let mut config = ShellConfig::default();
    // Single inbound deep-link case: an origin-prefixed URL on the command line
    if let Some(arg) = std::env::args().nth(1) {
        if arg.starts_with(config.start_url.trim_end_matches('/')) {
            info!("Starting from deep link {}", arg);
            config.entry_url = Some(arg);
        } else {
            warn!("Ignoring non-origin start URL {}", arg);
        }
    }

    info!("Starting Bithash shell for {}", config.start_url);

    let probe = match TcpProbe::for_origin(&config.start_url) {
        Ok(probe) => probe,
        Err(err) => {
            error!("Failed to initialize connectivity probe: {}", err);
            panic!("Failed to initialize connectivity probe: {}", err);
        }
    };
    let controller = Arc::new(Mutex::new(PageLifecycleController::new(
        config.clone(),
        Box::new(probe),
    )));

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let window = WindowBuilder::new()
        .with_title(config.window_title.as_str())
        .with_inner_size(LogicalSize::new(config.window_width, config.window_height))
        .build(&event_loop)
        .expect("Failed to create window");

    let window_size = window.inner_size();
    let scale = window.scale_factor();
    let full_bounds = make_rect(
        0.0,
        0.0,
        window_size.width as f64 / scale,
        window_size.height as f64 / scale,
    );

    // Watchdog sequence, bumped on every load start and finish so a stale
    // timeout no-ops
    let load_seq = Arc::new(AtomicU64::new(0));

    // === CONTENT WEBVIEW (created first, the overlay layers above it) ===
    let nav_controller = Arc::clone(&controller);
    let nav_proxy = proxy.clone();
    let load_proxy = proxy.clone();
    let load_seq_for_loads = Arc::clone(&load_seq);
    let ipc_proxy = proxy.clone();

    let content_webview = WebViewBuilder::new()
        .with_html("<!DOCTYPE html><html></html>")
        .with_devtools(cfg!(debug_assertions))
        .with_user_agent(&config.user_agent)
        .with_initialization_script(bridge::CONTENT_BRIDGE_SCRIPT)
        .with_bounds(full_bounds)
        .with_navigation_handler(move |url| {
            let req = NavigationRequest::main_frame(url);
            let (external, effects) = match nav_controller.lock() {
                Ok(c) => c.on_navigation_requested(&req),
                Err(poisoned) => poisoned.into_inner().on_navigation_requested(&req),
            };
            if !effects.is_empty() {
                let _ = nav_proxy.send_event(UserEvent::Effects(effects));
            }
            // wry semantics: true lets the embedded browser navigate inline
            !external
        })
        .with_on_page_load_handler(move |event, url| {
            if is_blank_document(&url) {
                return;
            }
            match event {
                wry::PageLoadEvent::Started => {
                    let seq = load_seq_for_loads.fetch_add(1, Ordering::SeqCst) + 1;
                    schedule(&load_proxy, LOAD_TIMEOUT, UserEvent::LoadTimeout { seq });
                    let _ = load_proxy.send_event(UserEvent::Browser(
                        BrowserEvent::MainFrameNavigationStarted { url },
                    ));
                }
                wry::PageLoadEvent::Finished => {
                    load_seq_for_loads.fetch_add(1, Ordering::SeqCst);
                    let _ = load_proxy
                        .send_event(UserEvent::Browser(BrowserEvent::PageLoadFinished { url }));
                }
            }
        })
        .with_ipc_handler(move |message| {
            match serde_json::from_str::<BridgeMessage>(message.body()) {
                Ok(msg) => {
                    let _ = ipc_proxy.send_event(UserEvent::Bridge(msg));
                }
                Err(err) => error!("Failed to parse bridge IPC: {}", err),
            }
        })
        .build_as_child(&window)
        .expect("Failed to create content WebView");

    // === OVERLAY WEBVIEW (loading/error panels, retry button) ===
    let overlay_proxy = proxy.clone();
    let overlay_webview = WebViewBuilder::new()
        .with_html(SHELL_HTML)
        .with_devtools(cfg!(debug_assertions))
        .with_bounds(full_bounds)
        .with_ipc_handler(move |message| {
            match serde_json::from_str::<BridgeMessage>(message.body()) {
                Ok(msg) => {
                    let _ = overlay_proxy.send_event(UserEvent::Bridge(msg));
                }
                Err(err) => error!("Failed to parse overlay IPC: {}", err),
            }
        })
        .build_as_child(&window)
        .expect("Failed to create overlay WebView");

    let surface = ShellSurface::new(overlay_webview);

    info!("Webviews created");

    // Kick off the initial load once the loop starts
    {
        let effects = match controller.lock() {
            Ok(mut c) => c.start(),
            Err(poisoned) => poisoned.into_inner().start(),
        };
        let _ = proxy.send_event(UserEvent::Effects(effects));
    }

    let loop_controller = Arc::clone(&controller);
    let loop_proxy = proxy.clone();
    let load_seq_for_timeouts = Arc::clone(&load_seq);
    let download_dir = config.download_dir.clone();
    let reveal_delay = Duration::from_millis(config.content_reveal_delay_ms);
    let reload_delay = Duration::from_millis(config.diagnostic_reload_delay_ms);

    let mut overlay_active = true;
    // Approximate embedded-browser history from main-frame navigations; the
    // runtime exposes no can-go-back query. A navigation back to the
    // previous entry pops, anything else new pushes.
    let mut history_stack: Vec<String> = Vec::new();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                info!("Window close requested");
                *control_flow = ControlFlow::Exit;
            }
            Event::WindowEvent {
                event: WindowEvent::Resized(_),
                ..
            } => {
                layout(&window, &surface, &content_webview, overlay_active);
            }
            Event::UserEvent(user_event) => {
                let mut effects: Vec<Effect> = Vec::new();
                match user_event {
                    UserEvent::Effects(list) => effects = list,
                    UserEvent::Browser(browser_event) => {
                        if let BrowserEvent::MainFrameNavigationStarted { url } = &browser_event {
                            if history_stack.last() != Some(url) {
                                let went_back = history_stack.len() >= 2
                                    && history_stack[history_stack.len() - 2] == *url;
                                if went_back {
                                    history_stack.pop();
                                } else {
                                    history_stack.push(url.clone());
                                }
                            }
                        }
                        effects = handle_locked(&loop_controller, browser_event);
                    }
                    UserEvent::Bridge(msg) => match msg {
                        BridgeMessage::PersistFile { data, filename } => {
                            match bridge::persist_file(&download_dir, &data, &filename) {
                                Ok(path) => {
                                    let name = path
                                        .file_name()
                                        .map(|n| n.to_string_lossy().into_owned())
                                        .unwrap_or(filename);
                                    let _ = content_webview.evaluate_script(
                                        &bridge::toast_script(&format!(
                                            "Saved to Downloads: {}",
                                            name
                                        )),
                                    );
                                }
                                Err(err) => {
                                    warn!("Download failed: {}", err);
                                    let _ = content_webview.evaluate_script(
                                        &bridge::toast_script(&format!(
                                            "Error saving file: {}",
                                            err
                                        )),
                                    );
                                }
                            }
                        }
                        BridgeMessage::ReportAuthOutcome { kind, payload } => {
                            effects = handle_locked(
                                &loop_controller,
                                BrowserEvent::AuthOutcome(AuthOutcome { kind, payload }),
                            );
                        }
                        BridgeMessage::ConsoleDiagnostic { text } => {
                            effects =
                                handle_locked(&loop_controller, bridge::console_event(text));
                        }
                        BridgeMessage::PageStatus { status } => {
                            if status >= 400 {
                                effects = handle_locked(
                                    &loop_controller,
                                    BrowserEvent::HttpError {
                                        status,
                                        is_main_frame: true,
                                    },
                                );
                            }
                        }
                        BridgeMessage::GoBack => {
                            effects = handle_locked(
                                &loop_controller,
                                BrowserEvent::BackPressed {
                                    can_go_back: history_stack.len() > 1,
                                },
                            );
                        }
                        BridgeMessage::Retry => {
                            effects = handle_locked(&loop_controller, BrowserEvent::Retry);
                        }
                    },
                    UserEvent::LoadTimeout { seq } => {
                        if seq == load_seq_for_timeouts.load(Ordering::SeqCst) {
                            warn!("Main frame load timed out");
                            effects = handle_locked(
                                &loop_controller,
                                BrowserEvent::MainFrameLoadFailed {
                                    detail: "load timed out".to_string(),
                                },
                            );
                        }
                    }
                }
                for effect in effects {
                    apply_effect(
                        effect,
                        &window,
                        &surface,
                        &content_webview,
                        &loop_proxy,
                        reveal_delay,
                        reload_delay,
                        &mut overlay_active,
                        control_flow,
                    );
                }
            }
            _ => {}
        }
    });
}
