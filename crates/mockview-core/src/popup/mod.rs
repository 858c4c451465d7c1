//! Checkout popup coordination.
//!
//! The parent opens the checkout page in a separate window and learns that
//! the user is done only by noticing that the window closed. Nothing is
//! communicated back from the checkout page itself, so a closed popup says
//! nothing about whether a payment went through.
//!
//! ```text
//! PopupLauncher::launch ──open──▶ PopupHost ──▶ window
//!        │                                         ▲
//!        └──watch──▶ ClosureWatcher ──poll (1s)────┘
//!                         │
//!                         └──first closed tick──▶ on_close (e.g. TokenRefresher)
//! ```

mod geometry;
mod launcher;
mod watcher;

pub use geometry::{PopupGeometry, ScreenSize};
pub use launcher::{
    checkout_target, Launched, PopupHost, PopupLauncher, PopupOptions, PopupRequest, PopupWindow,
    POPUP_BLOCKED_NOTICE,
};
pub use watcher::{on_close, ClosureWatcher, CloseFuture, OnClose, PopupSession};

use std::time::Duration;

/// Path of the checkout page loaded inside the popup.
pub const CHECKOUT_PATH: &str = "/payments/checkout";

/// Default popup width and height in pixels.
pub const DEFAULT_POPUP_SIZE: f64 = 700.0;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// How often the watcher checks whether the popup has closed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
