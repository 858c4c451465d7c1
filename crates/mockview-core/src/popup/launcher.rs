//! Popup launcher: opens the checkout page in a centered window.

use std::time::Duration;

use super::geometry::{PopupGeometry, ScreenSize};
use super::watcher::{on_close, ClosureWatcher, OnClose, PopupSession};
use super::{CHECKOUT_PATH, DEFAULT_POPUP_SIZE};
use crate::error::PopupError;

/// Shown when the host refuses to open the popup.
pub const POPUP_BLOCKED_NOTICE: &str =
    "The checkout window was blocked. Allow popups for this site and try again.";

/// A window opened by a [`PopupHost`].
pub trait PopupWindow: Send + 'static {
    /// Whether the user (or the page itself) has closed the window.
    fn is_closed(&mut self) -> bool;

    /// Close the window. Called at most once, and only while it is open.
    fn close(&mut self);
}

/// The environment the launcher opens windows in.
///
/// Screen size and window creation are injected so the launcher never
/// touches a real display in tests.
pub trait PopupHost {
    type Window: PopupWindow;

    /// Screen dimensions at call time.
    fn screen_size(&self) -> ScreenSize;

    /// Open a new top-level window for `request`.
    fn open(&self, request: &PopupRequest) -> Result<Self::Window, PopupError>;

    /// Show a blocking notice to the user.
    fn notify(&self, message: &str);
}

/// Everything a host needs to open the checkout popup.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupRequest {
    /// Checkout path, possibly with a `packageId` query parameter.
    pub target: String,
    pub geometry: PopupGeometry,
    pub resizable: bool,
    pub scrollbars: bool,
}

impl PopupRequest {
    /// Window feature string in the `window.open` format.
    pub fn features(&self) -> String {
        let yes_no = |on: bool| if on { "yes" } else { "no" };
        format!(
            "width={},height={},left={},top={},resizable={},scrollbars={}",
            self.geometry.width,
            self.geometry.height,
            self.geometry.left,
            self.geometry.top,
            yes_no(self.resizable),
            yes_no(self.scrollbars),
        )
    }
}

/// Build the checkout target. An empty package id counts as absent.
///
/// The id is opaque and appended as given.
pub fn checkout_target(path: &str, package_id: Option<&str>) -> String {
    match package_id.filter(|id| !id.is_empty()) {
        Some(id) => format!("{path}?packageId={id}"),
        None => path.to_string(),
    }
}

/// Options for a single [`PopupLauncher::launch`] call.
pub struct PopupOptions {
    pub package_id: Option<String>,
    pub on_close: Option<OnClose>,
    pub width: f64,
    pub height: f64,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            package_id: None,
            on_close: None,
            width: DEFAULT_POPUP_SIZE,
            height: DEFAULT_POPUP_SIZE,
        }
    }
}

impl PopupOptions {
    pub fn package_id(mut self, id: impl Into<String>) -> Self {
        self.package_id = Some(id.into());
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Run `f` once the popup closes. Switches the launch result from a raw
    /// window to a watched [`PopupSession`].
    pub fn on_close<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.on_close = Some(on_close(f));
        self
    }
}

/// Result of a successful launch.
pub enum Launched<W: PopupWindow> {
    /// No completion callback was given; the caller owns the window.
    Window(W),
    /// A watcher owns the window; the session is the caller's cleanup handle.
    Watching(PopupSession<W>),
}

impl<W: PopupWindow> Launched<W> {
    pub fn into_window(self) -> Option<W> {
        match self {
            Launched::Window(window) => Some(window),
            Launched::Watching(_) => None,
        }
    }

    pub fn into_session(self) -> Option<PopupSession<W>> {
        match self {
            Launched::Window(_) => None,
            Launched::Watching(session) => Some(session),
        }
    }
}

/// Opens checkout popups through a [`PopupHost`].
pub struct PopupLauncher<H> {
    host: H,
    checkout_path: String,
    watcher: ClosureWatcher,
}

impl<H: PopupHost> PopupLauncher<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            checkout_path: CHECKOUT_PATH.to_string(),
            watcher: ClosureWatcher::default(),
        }
    }

    pub fn with_checkout_path(mut self, path: impl Into<String>) -> Self {
        self.checkout_path = path.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.watcher = ClosureWatcher::new(interval);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// The request `launch` would send for `options`, using the current screen size.
    pub fn request_for(&self, options: &PopupOptions) -> PopupRequest {
        let screen = self.host.screen_size();
        PopupRequest {
            target: checkout_target(&self.checkout_path, options.package_id.as_deref()),
            geometry: PopupGeometry::centered(screen, options.width, options.height),
            resizable: false,
            scrollbars: false,
        }
    }

    /// Open the checkout popup.
    ///
    /// Returns `None` when the host refuses to open it; the user has already
    /// been notified and no watcher exists. With an `on_close` callback the
    /// window is handed to a [`ClosureWatcher`], which requires a tokio runtime.
    pub fn launch(&self, mut options: PopupOptions) -> Option<Launched<H::Window>> {
        let request = self.request_for(&options);
        tracing::debug!(
            url = %request.target,
            features = %request.features(),
            "opening checkout popup"
        );

        let window = match self.host.open(&request) {
            Ok(window) => window,
            Err(err) => {
                tracing::warn!(error = %err, url = %request.target, "checkout popup not opened");
                self.host.notify(POPUP_BLOCKED_NOTICE);
                return None;
            }
        };

        match options.on_close.take() {
            None => Some(Launched::Window(window)),
            Some(callback) => Some(Launched::Watching(self.watcher.watch(window, callback))),
        }
    }
}
