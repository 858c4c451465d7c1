//! End-to-end checkout popup flow: launch, poll, close, refresh.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mockito::{Matcher, Server};
use mockview_core::popup::ScreenSize;
use mockview_core::{
    BackendClient, BalanceCache, BalanceSource, Launched, PopupError, PopupHost, PopupLauncher,
    PopupOptions, PopupRequest, PopupWindow, TokenBalance, TokenRefresher, UserContext,
};
use uuid::Uuid;

#[derive(Default)]
struct WindowProbe {
    polls: AtomicUsize,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    closes_on_poll: Option<usize>,
}

struct FakeWindow(Arc<WindowProbe>);

impl PopupWindow for FakeWindow {
    fn is_closed(&mut self) -> bool {
        let n = self.0.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.0.closes_on_poll.is_some_and(|at| n >= at) {
            self.0.closed.store(true, Ordering::SeqCst);
        }
        self.0.closed.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.0.close_calls.fetch_add(1, Ordering::SeqCst);
        self.0.closed.store(true, Ordering::SeqCst);
    }
}

struct FakeHost {
    screen: ScreenSize,
    probe: Arc<WindowProbe>,
    requests: Mutex<Vec<PopupRequest>>,
    notices: Mutex<Vec<String>>,
    blocked: bool,
}

impl FakeHost {
    fn new(probe: Arc<WindowProbe>) -> Self {
        Self {
            screen: ScreenSize::new(1920.0, 1080.0),
            probe,
            requests: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
            blocked: false,
        }
    }
}

impl PopupHost for FakeHost {
    type Window = FakeWindow;

    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn open(&self, request: &PopupRequest) -> Result<FakeWindow, PopupError> {
        if self.blocked {
            return Err(PopupError::Blocked("blocked by test".into()));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(FakeWindow(Arc::clone(&self.probe)))
    }

    fn notify(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }
}

/// Balance source that counts fetches and returns a fixed value.
struct FixedBalance {
    tokens: i64,
    fetches: AtomicUsize,
}

impl BalanceSource for FixedBalance {
    async fn fetch_balance(&self, _user: &UserContext) -> mockview_core::error::Result<TokenBalance> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(TokenBalance(self.tokens))
    }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn pro_monthly_checkout_refreshes_once_after_third_tick() {
    let probe = Arc::new(WindowProbe {
        closes_on_poll: Some(3),
        ..WindowProbe::default()
    });
    let launcher = PopupLauncher::new(FakeHost::new(Arc::clone(&probe)));
    let source = Arc::new(FixedBalance {
        tokens: 120,
        fetches: AtomicUsize::new(0),
    });
    let cache = BalanceCache::new(Some(TokenBalance(20)));
    let refresher = TokenRefresher::new(
        Arc::clone(&source),
        UserContext::new(Uuid::new_v4(), "jwt"),
        cache.clone(),
    );

    let mut options = PopupOptions::default().package_id("pro_monthly").size(700.0, 700.0);
    options.on_close = Some(refresher.on_close());
    let mut session = launcher
        .launch(options)
        .and_then(Launched::into_session)
        .expect("popup should open");

    {
        let requests = launcher.host().requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target, "/payments/checkout?packageId=pro_monthly");
        assert_eq!(requests[0].geometry.left, 610.0);
        assert_eq!(requests[0].geometry.top, 190.0);
        assert!(!requests[0].resizable);
        assert!(!requests[0].scrollbars);
    }

    sleep_ms(2500).await;
    assert_eq!(probe.polls.load(Ordering::SeqCst), 2);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    assert_eq!(cache.get(), Some(TokenBalance(20)));

    sleep_ms(1000).await;
    assert_eq!(probe.polls.load(Ordering::SeqCst), 3);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get(), Some(TokenBalance(120)));

    sleep_ms(5000).await;
    assert_eq!(probe.polls.load(Ordering::SeqCst), 3);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

    session.cleanup();
    assert_eq!(probe.close_calls.load(Ordering::SeqCst), 0);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    session.finished().await;
}

#[tokio::test(start_paused = true)]
async fn blocked_checkout_never_refreshes() {
    let probe = Arc::new(WindowProbe::default());
    let mut host = FakeHost::new(Arc::clone(&probe));
    host.blocked = true;
    let launcher = PopupLauncher::new(host);
    let source = Arc::new(FixedBalance {
        tokens: 1,
        fetches: AtomicUsize::new(0),
    });
    let refresher = TokenRefresher::new(
        Arc::clone(&source),
        UserContext::new(Uuid::new_v4(), "jwt"),
        BalanceCache::default(),
    );

    let mut options = PopupOptions::default();
    options.on_close = Some(refresher.on_close());
    assert!(launcher.launch(options).is_none());
    assert_eq!(launcher.host().notices.lock().unwrap().len(), 1);

    sleep_ms(30_000).await;
    assert_eq!(probe.polls.load(Ordering::SeqCst), 0);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn abandoning_checkout_closes_popup_without_refresh() {
    let probe = Arc::new(WindowProbe::default());
    let launcher = PopupLauncher::new(FakeHost::new(Arc::clone(&probe)));
    let source = Arc::new(FixedBalance {
        tokens: 1,
        fetches: AtomicUsize::new(0),
    });
    let refresher = TokenRefresher::new(
        Arc::clone(&source),
        UserContext::new(Uuid::new_v4(), "jwt"),
        BalanceCache::default(),
    );

    let mut options = PopupOptions::default();
    options.on_close = Some(refresher.on_close());
    let session = launcher
        .launch(options)
        .and_then(Launched::into_session)
        .expect("popup should open");

    sleep_ms(4500).await;
    session.cleanup();
    assert_eq!(probe.close_calls.load(Ordering::SeqCst), 1);

    let polls = probe.polls.load(Ordering::SeqCst);
    sleep_ms(30_000).await;
    assert_eq!(probe.polls.load(Ordering::SeqCst), polls);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn closed_popup_refreshes_from_backend() {
    let user_id = Uuid::new_v4();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/v1/profiles")
        .match_query(Matcher::UrlEncoded("id".into(), format!("eq.{user_id}")))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"tokens": 55}]"#)
        .create_async()
        .await;

    let probe = Arc::new(WindowProbe {
        closes_on_poll: Some(2),
        ..WindowProbe::default()
    });
    let launcher = PopupLauncher::new(FakeHost::new(Arc::clone(&probe)))
        .with_poll_interval(Duration::from_millis(10));
    let backend = Arc::new(BackendClient::new(&server.url(), "anon").unwrap());
    let cache = BalanceCache::default();
    let refresher = TokenRefresher::new(backend, UserContext::new(user_id, "jwt"), cache.clone());

    let mut options = PopupOptions::default();
    options.on_close = Some(refresher.on_close());
    let mut session = launcher
        .launch(options)
        .and_then(Launched::into_session)
        .expect("popup should open");

    session.finished().await;
    assert_eq!(cache.get(), Some(TokenBalance(55)));
    mock.assert_async().await;
}

#[tokio::test]
async fn failed_backend_refresh_leaves_cached_balance() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/v1/profiles")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let probe = Arc::new(WindowProbe {
        closes_on_poll: Some(1),
        ..WindowProbe::default()
    });
    let launcher = PopupLauncher::new(FakeHost::new(Arc::clone(&probe)))
        .with_poll_interval(Duration::from_millis(10));
    let backend = Arc::new(BackendClient::new(&server.url(), "anon").unwrap());
    let cache = BalanceCache::new(Some(TokenBalance(8)));
    let refresher =
        TokenRefresher::new(backend, UserContext::new(Uuid::new_v4(), "jwt"), cache.clone());

    let mut options = PopupOptions::default();
    options.on_close = Some(refresher.on_close());
    launcher
        .launch(options)
        .and_then(Launched::into_session)
        .expect("popup should open")
        .finished()
        .await;

    assert_eq!(cache.get(), Some(TokenBalance(8)));
}
