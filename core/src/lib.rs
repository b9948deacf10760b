// src/lib.rs

//! Tuckshop: the client side of the eTuckshop storefront.
//!
//! Everything business-related lives on a remote backend; this crate wraps
//! it with:
//!  - A typed API client behind a pluggable `Transport`.
//!  - Signed session tokens carrying the user's identity and backend token.
//!  - A per-session query cache with stale times, optimistic mutation and rollback.
//!  - Cart, checkout, payment polling and order cancellation.
//!  - The admin order desk: completion, rejection, QR scanning, reporting.
//!  - A server-push listener that invalidates cached views and raises toasts.
//!  - A small step-flow engine that checkout and sign-in run on.

pub mod admin;
pub mod api;
pub mod auth;
pub mod cache;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod flow;
pub mod models;
pub mod notify;
pub mod orders;
pub mod realtime;
pub mod session;
pub mod shop;
pub mod validation;

// --- Re-exports for the Public API ---

pub use crate::admin::{AdminDesk, CompletionOutcome, ScanResult};
pub use crate::api::{ApiClient, EventSource, HttpTransport, Transport};
pub use crate::auth::{Authenticated, Authenticator};
pub use crate::cache::{QueryCache, QueryKey, StalePolicy};
pub use crate::cart::CartStore;
pub use crate::catalog::Catalog;
pub use crate::error::{FieldErrors, Result, TuckshopError};
pub use crate::flow::{Flow, FlowControl, FlowError, FlowOutcome, Shared};
pub use crate::notify::{Notifier, Toast, ToastLevel};
pub use crate::orders::Orders;
pub use crate::realtime::{PushEvent, RealtimeListener};
pub use crate::session::{SessionClaims, SessionSigner, SignedSession};
pub use crate::shop::{ShopSettings, Storefront, View};
