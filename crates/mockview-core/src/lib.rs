//! # Mockview Core Library
//!
//! Core logic for the Mockview mock-interview service. The CLI is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Popup**: opens the checkout page in a centered window and watches it
//!   until it closes. Closure is the only signal the parent gets back.
//! - **Tokens**: the explicit current user, a shared balance cache and the
//!   refresher run after checkout.
//! - **Backend**: typed client for the hosted database (interviews, questions,
//!   answers, profiles, notifications) with the admin role gate.
//! - **Storage**: TOML-based configuration; the access token is kept in the
//!   OS keyring.
//!
//! ## Key Components
//!
//! - [`PopupLauncher`]: opens checkout popups through a [`PopupHost`]
//! - [`ClosureWatcher`]: polls a popup and fires a callback exactly once
//! - [`TokenRefresher`]: re-fetches the credit balance into a [`BalanceCache`]
//! - [`BackendClient`]: hosted database REST client
//! - [`Config`]: application configuration

pub mod backend;
pub mod error;
pub mod popup;
pub mod storage;
pub mod tokens;

pub use backend::{BackendClient, Interview, InterviewAnswer, InterviewQuestion, Notification, Profile};
pub use error::{BackendError, ConfigError, CoreError, PopupError};
pub use popup::{
    ClosureWatcher, Launched, PopupHost, PopupLauncher, PopupOptions, PopupRequest, PopupSession,
    PopupWindow,
};
pub use storage::Config;
pub use tokens::{BalanceCache, BalanceSource, TokenBalance, TokenRefresher, UserContext};
