use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Finalization action run once per workflow execution
///
/// The handler itself may be reused across executions; each execution
/// arms its own [`CleanupScope`] with [`CleanupHandler::scope`].
#[derive(Clone)]
pub struct CleanupHandler {
    action: Arc<dyn Fn() + Send + Sync>,
}

impl CleanupHandler {
    pub fn new(action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            action: Arc::new(action),
        }
    }

    /// A handler with nothing to release.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Arm a fresh scope for one execution.
    pub fn scope(&self) -> CleanupScope {
        CleanupScope {
            inner: Arc::new(ScopeInner {
                fired: AtomicBool::new(false),
                action: Arc::clone(&self.action),
            }),
        }
    }
}

impl Default for CleanupHandler {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for CleanupHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupHandler").finish_non_exhaustive()
    }
}

struct ScopeInner {
    fired: AtomicBool,
    action: Arc<dyn Fn() + Send + Sync>,
}

/// One armed cleanup; clones share the "already cleaned up" flag
#[derive(Clone)]
pub struct CleanupScope {
    inner: Arc<ScopeInner>,
}

impl CleanupScope {
    /// Run the handler unless some clone of this scope already did.
    ///
    /// Returns `true` only for the call that actually ran it.
    pub fn fire(&self) -> bool {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        tracing::debug!("Running cleanup handler");
        (self.inner.action)();
        true
    }

    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Fire this scope when the returned guard is dropped.
    pub fn guard(&self) -> CleanupGuard {
        CleanupGuard {
            scope: self.clone(),
        }
    }

    pub fn same_scope(&self, other: &CleanupScope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CleanupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupScope")
            .field("fired", &self.is_fired())
            .finish()
    }
}

/// Drop guard releasing a [`CleanupScope`]
#[must_use = "the scope is fired as soon as the guard is dropped"]
pub struct CleanupGuard {
    scope: CleanupScope,
}

impl CleanupGuard {
    pub fn scope(&self) -> &CleanupScope {
        &self.scope
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.scope.fire();
    }
}
