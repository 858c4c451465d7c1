//! Popup host backed by a browser process.
//!
//! With `checkout.browser` set (e.g. `chromium`), the checkout page opens as
//! a chromeless app window at the requested size and position, and the
//! window counts as closed once the browser process exits. Otherwise the
//! page is handed to the platform opener, which returns as soon as an
//! existing browser has the URL. That window cannot be observed, so it never
//! reports closed and callers must ask the user instead.

use std::process::{Child, Command, Stdio};

use mockview_core::popup::ScreenSize;
use mockview_core::{Config, PopupError, PopupHost, PopupRequest, PopupWindow};
use url::Url;

pub struct BrowserHost {
    origin: Url,
    browser: Option<String>,
    screen: ScreenSize,
}

impl BrowserHost {
    pub fn from_config(config: &Config) -> Result<Self, url::ParseError> {
        Ok(Self {
            origin: Url::parse(&config.app.base_url)?,
            browser: config.checkout.browser.clone().filter(|b| !b.is_empty()),
            screen: config.checkout.screen(),
        })
    }

    /// Whether opened windows report their own closure.
    pub fn observes_closure(&self) -> bool {
        self.browser.is_some()
    }

    fn app_command(browser: &str, url: &Url, request: &PopupRequest) -> Command {
        let (left, top) = request.geometry.rounded_position();
        let mut command = Command::new(browser);
        command
            .arg(format!("--app={url}"))
            .arg(format!(
                "--window-size={},{}",
                request.geometry.width.round() as i64,
                request.geometry.height.round() as i64
            ))
            .arg(format!("--window-position={left},{top}"));
        command
    }
}

pub enum BrowserWindow {
    /// A browser process we started and own.
    App(Child),
    /// Handed to the platform opener; nothing to poll or close.
    Detached,
}

impl PopupWindow for BrowserWindow {
    fn is_closed(&mut self) -> bool {
        match self {
            // An unreadable status means we lost the process; treat it as gone.
            BrowserWindow::App(child) => !matches!(child.try_wait(), Ok(None)),
            BrowserWindow::Detached => false,
        }
    }

    fn close(&mut self) {
        let BrowserWindow::App(child) = self else {
            return;
        };
        if let Err(err) = child.kill() {
            tracing::debug!(error = %err, "browser process already gone");
        }
        if let Err(err) = child.wait() {
            tracing::debug!(error = %err, "could not reap browser process");
        }
    }
}

impl PopupHost for BrowserHost {
    type Window = BrowserWindow;

    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn open(&self, request: &PopupRequest) -> Result<BrowserWindow, PopupError> {
        let url = self
            .origin
            .join(&request.target)
            .map_err(|e| PopupError::Window(format!("bad checkout url: {e}")))?;

        let Some(browser) = &self.browser else {
            // Tries each platform opener in turn.
            open::that_detached(url.as_str())
                .map_err(|e| PopupError::Blocked(format!("could not open a browser: {e}")))?;
            tracing::debug!(%url, "checkout page handed to the platform opener");
            return Ok(BrowserWindow::Detached);
        };

        let child = Self::app_command(browser, &url, request)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PopupError::Blocked(format!("could not start browser: {e}")))?;

        tracing::debug!(pid = child.id(), %url, "checkout window opened");
        Ok(BrowserWindow::App(child))
    }

    fn notify(&self, message: &str) {
        eprintln!("{message}");
    }
}
