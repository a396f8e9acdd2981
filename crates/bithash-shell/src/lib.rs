//! Page lifecycle state machine - loading/content/error states, navigation
//! routing, and the auth-compat recovery heuristics
//!
//! Everything in this crate is UI-free: the controller consumes
//! [`BrowserEvent`]s and emits [`Effect`]s that the app layer applies against
//! the actual webviews on the owner thread.

pub mod compat;
pub mod lifecycle;
pub mod policy;
pub mod probe;

pub use lifecycle::{BrowserEvent, Effect, PageLifecycleController};
pub use policy::{decide_navigation, NavigationDecision};
pub use probe::NetworkProbe;
