use std::future::Future;
use std::sync::Arc;

use clap::Subcommand;
use mockview_core::{
    BalanceCache, PopupLauncher, PopupOptions, PopupSession, PopupWindow, TokenBalance,
    TokenRefresher,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{print_json, CommandResult, Session};
use crate::browser::BrowserHost;

#[derive(Subcommand)]
pub enum TokensAction {
    /// Show the current token balance
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Open the checkout window and wait for it to close
    Buy {
        /// Package to preselect on the checkout page
        #[arg(long)]
        package_id: Option<String>,
        /// Window width in pixels (default from checkout.width)
        #[arg(long)]
        width: Option<u32>,
        /// Window height in pixels (default from checkout.height)
        #[arg(long)]
        height: Option<u32>,
    },
}

#[derive(Serialize)]
struct BalanceOutput {
    user_id: String,
    tokens: i64,
}

pub async fn run(action: TokensAction) -> CommandResult {
    let session = Session::load()?;
    match action {
        TokensAction::Show { json } => {
            let balance = session.backend.fetch_token_balance(&session.user).await?;
            if json {
                print_json(&BalanceOutput {
                    user_id: session.user.user_id.to_string(),
                    tokens: balance.0,
                })?;
            } else {
                println!("{balance}");
            }
        }
        TokensAction::Buy {
            package_id,
            width,
            height,
        } => buy(session, package_id, width, height).await?,
    }
    Ok(())
}

async fn buy(
    session: Session,
    package_id: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
) -> CommandResult {
    let Session {
        config,
        backend,
        user,
    } = session;
    let checkout = &config.checkout;

    let cache = BalanceCache::default();
    let refresher = TokenRefresher::new(Arc::new(backend), user, cache.clone());
    let before = refresher.refresh().await;

    let launcher = PopupLauncher::new(BrowserHost::from_config(&config)?)
        .with_checkout_path(checkout.path.clone())
        .with_poll_interval(checkout.poll_interval());

    let mut options = PopupOptions::default().size(
        width.unwrap_or(checkout.width) as f64,
        height.unwrap_or(checkout.height) as f64,
    );
    if let Some(id) = package_id {
        options = options.package_id(id);
    }

    let cancelled = if launcher.host().observes_closure() {
        options.on_close = Some(refresher.clone().on_close());
        let Some(launched) = launcher.launch(options) else {
            return Err("checkout was not started".into());
        };
        let Some(mut popup) = launched.into_session() else {
            return Err("checkout window is not being watched".into());
        };
        println!("Checkout opened. Close the window when you are done (Ctrl-C cancels).");
        wait_for_close(&mut popup, ctrl_c()).await
    } else {
        // The platform opener gives us nothing to poll; the user tells us.
        if launcher.launch(options).is_none() {
            return Err("checkout was not started".into());
        }
        println!("Checkout opened in your browser. Press Enter when you are done (Ctrl-C cancels).");
        let cancelled = tokio::select! {
            line = wait_for_enter() => {
                line?;
                false
            }
            _ = ctrl_c() => true,
        };
        if !cancelled {
            refresher.refresh().await;
        }
        cancelled
    };

    if cancelled {
        println!("Checkout cancelled.");
    }
    println!("{}", balance_report(before, cache.get()));
    Ok(())
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn wait_for_enter() -> std::io::Result<()> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(())
}

/// Wait for the watched popup to close, or for `cancel`, which cleans it up.
/// Returns whether the checkout was cancelled.
async fn wait_for_close<W: PopupWindow>(
    popup: &mut PopupSession<W>,
    cancel: impl Future<Output = ()>,
) -> bool {
    let cancelled = tokio::select! {
        _ = popup.finished() => false,
        _ = cancel => {
            popup.cleanup();
            true
        }
    };
    popup.finished().await;
    cancelled
}

// Closing the window says nothing about whether a payment happened;
// report whatever the backend now says.
fn balance_report(before: Option<TokenBalance>, now: Option<TokenBalance>) -> String {
    match (before, now) {
        (Some(old), Some(new)) if new > old => format!("Balance: {new} (was {old})"),
        (_, Some(new)) => format!("Balance: {new}"),
        (_, None) => "Balance unavailable; try `mockview-cli tokens show` later.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockview_core::popup::on_close;
    use mockview_core::ClosureWatcher;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeWindow {
        polls: usize,
        closes_on_poll: Option<usize>,
        closed: Arc<AtomicBool>,
    }

    impl PopupWindow for FakeWindow {
        fn is_closed(&mut self) -> bool {
            self.polls += 1;
            if self.closes_on_poll.is_some_and(|at| self.polls >= at) {
                self.closed.store(true, Ordering::SeqCst);
            }
            self.closed.load(Ordering::SeqCst)
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    type Watched = (PopupSession<FakeWindow>, Arc<AtomicBool>, Arc<AtomicUsize>);

    fn watch(closes_on_poll: Option<usize>) -> Watched {
        let closed = Arc::new(AtomicBool::new(false));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let session = ClosureWatcher::default().watch(
            FakeWindow {
                polls: 0,
                closes_on_poll,
                closed: Arc::clone(&closed),
            },
            on_close(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (session, closed, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn user_closing_window_completes_checkout() {
        let (mut popup, _closed, fired) = watch(Some(3));

        let cancelled = wait_for_close(&mut popup, std::future::pending()).await;

        assert!(!cancelled);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_closes_window_without_refresh() {
        let (mut popup, closed, fired) = watch(None);

        let cancelled = wait_for_close(
            &mut popup,
            tokio::time::sleep(Duration::from_millis(2500)),
        )
        .await;

        assert!(cancelled);
        assert!(closed.load(Ordering::SeqCst));
        assert!(!popup.is_watching());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn balance_report_mentions_increase_only() {
        let (five, ten) = (Some(TokenBalance(5)), Some(TokenBalance(10)));
        assert_eq!(balance_report(five, ten), "Balance: 10 tokens (was 5 tokens)");
        assert_eq!(balance_report(ten, ten), "Balance: 10 tokens");
        assert_eq!(balance_report(None, Some(TokenBalance(1))), "Balance: 1 token");
        assert!(balance_report(five, None).starts_with("Balance unavailable"));
    }
}
