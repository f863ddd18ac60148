//! Request-scoped credential context.
//!
//! One [`RequestContext`] is created per inbound request and bound to the
//! dynamic extent of that request's handling via a tokio task-local. Every
//! asynchronous continuation reachable from the handler observes the same
//! context through [`current`], and concurrently handled requests can never
//! observe each other's context: the task-local is scoped lexically around
//! the request future, so propagation survives every suspension point the
//! runtime supports, on any worker thread.
//!
//! The store keeps no global table of contexts. The only shared state is an
//! atomic gauge of currently active extents, maintained by a drop guard so
//! it returns to zero even when a request future panics or is cancelled.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use uuid::Uuid;

use crate::types::BearerToken;

tokio::task_local! {
    static CURRENT: RequestContext;
}

static EXTENTS: ExtentGauge = ExtentGauge::new();

/// Per-request context, exclusively owned by one request-handling extent.
///
/// Created when a request begins being handled and discarded when its
/// handling extent ends. Never shared for writing across requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id for log lines emitted while handling this request.
    request_id: Uuid,
    /// Credential extracted from the inbound `Authorization` header, if any.
    bearer_token: Option<BearerToken>,
}

impl RequestContext {
    /// Create a context carrying the given credential (or none).
    pub fn new(bearer_token: Option<BearerToken>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            bearer_token,
        }
    }

    /// Create a context for a request that presented no credential.
    pub fn anonymous() -> Self {
        Self::new(None)
    }

    /// Correlation id of this request.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The extracted credential, if the request presented one.
    pub fn bearer_token(&self) -> Option<&BearerToken> {
        self.bearer_token.as_ref()
    }
}

/// Run `future` with `context` installed for its full dynamic extent.
///
/// A [`current`] lookup anywhere inside `future` (including across await
/// points) returns exactly `context`. Concurrent `scope` invocations with
/// distinct contexts are fully isolated from one another.
pub async fn scope<F>(context: RequestContext, future: F) -> F::Output
where
    F: Future,
{
    let _extent = EXTENTS.enter();
    CURRENT.scope(context, future).await
}

/// The context of the dynamically enclosing request, or `None` when invoked
/// outside any request-handling extent.
pub fn current() -> Option<RequestContext> {
    CURRENT.try_with(|context| context.clone()).ok()
}

/// The bearer token of the dynamically enclosing request, if both a context
/// and a token exist.
pub fn bearer_token() -> Option<BearerToken> {
    CURRENT
        .try_with(|context| context.bearer_token.clone())
        .ok()
        .flatten()
}

/// Number of request-handling extents currently in flight process-wide.
pub fn active_extents() -> usize {
    EXTENTS.active()
}

/// Gauge of in-flight extents, balanced by [`ExtentGuard`].
#[derive(Debug)]
struct ExtentGauge(AtomicUsize);

impl ExtentGauge {
    const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    fn enter(&self) -> ExtentGuard<'_> {
        self.0.fetch_add(1, Ordering::SeqCst);
        ExtentGuard(&self.0)
    }

    fn active(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decrements the gauge on drop, so the count stays balanced across normal
/// completion, panics, and cancellation alike.
struct ExtentGuard<'a>(&'a AtomicUsize);

impl Drop for ExtentGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
