//! Token (credit) balance: explicit user context, shared cache, refresher.
//!
//! After a checkout popup closes the parent cannot tell whether anything was
//! bought, so it simply asks the backend again. [`TokenRefresher::refresh`]
//! is unconditional, idempotent and never fails loudly: on error the cached
//! balance stays as it was until the next refresh.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::Result;
use crate::popup::{on_close, OnClose};

/// The signed-in user, passed explicitly to every user-scoped call.
#[derive(Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: Uuid,
    pub access_token: String,
}

impl UserContext {
    pub fn new(user_id: Uuid, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            access_token: access_token.into(),
        }
    }
}

// Keeps the access token out of logs.
impl fmt::Debug for UserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserContext")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenBalance(pub i64);

impl fmt::Display for TokenBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => write!(f, "1 token"),
            n => write!(f, "{n} tokens"),
        }
    }
}

/// Anything that can report a user's authoritative balance.
pub trait BalanceSource: Send + Sync + 'static {
    fn fetch_balance(
        &self,
        user: &UserContext,
    ) -> impl Future<Output = Result<TokenBalance>> + Send;
}

/// Last known balance, shared between whoever displays it and the refresher.
///
/// Updates replace the whole value; subscribers see every change.
#[derive(Debug, Clone)]
pub struct BalanceCache {
    tx: Arc<watch::Sender<Option<TokenBalance>>>,
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl BalanceCache {
    pub fn new(initial: Option<TokenBalance>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> Option<TokenBalance> {
        *self.tx.borrow()
    }

    pub fn replace(&self, balance: TokenBalance) -> Option<TokenBalance> {
        self.tx.send_replace(Some(balance))
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TokenBalance>> {
        self.tx.subscribe()
    }
}

/// Re-fetches the balance for one user into a [`BalanceCache`].
pub struct TokenRefresher<S> {
    source: Arc<S>,
    user: UserContext,
    cache: BalanceCache,
}

impl<S> Clone for TokenRefresher<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            user: self.user.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S: BalanceSource> TokenRefresher<S> {
    pub fn new(source: Arc<S>, user: UserContext, cache: BalanceCache) -> Self {
        Self {
            source,
            user,
            cache,
        }
    }

    pub fn cache(&self) -> &BalanceCache {
        &self.cache
    }

    /// Fetch the balance and replace the cached value.
    ///
    /// Returns the fresh balance, or `None` if the fetch failed and the
    /// previous value was kept.
    pub async fn refresh(&self) -> Option<TokenBalance> {
        match self.source.fetch_balance(&self.user).await {
            Ok(balance) => {
                let previous = self.cache.replace(balance);
                if previous != Some(balance) {
                    tracing::info!(user_id = %self.user.user_id, %balance, "token balance updated");
                }
                Some(balance)
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %self.user.user_id,
                    error = %err,
                    "token balance refresh failed; keeping cached value"
                );
                None
            }
        }
    }

    /// Completion callback for a checkout popup.
    pub fn on_close(self) -> OnClose {
        on_close(move || async move {
            self.refresh().await;
        })
    }
}
