use stepcore::CleanupScope;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Exit status used when a run is interrupted with Ctrl-C
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Cleanup scopes that must also fire on abnormal process termination
///
/// A runner given a `ProcessHooks` watches its scope for the duration of a
/// run. [`ProcessHooks::install`] wires the set to a panic hook and to
/// Ctrl-C; [`ProcessHooks::new`] only keeps the set, for callers that
/// trigger [`ProcessHooks::fire_all`] themselves.
#[derive(Clone, Default)]
pub struct ProcessHooks {
    watched: Arc<Mutex<HashMap<u64, CleanupScope>>>,
    next_id: Arc<AtomicU64>,
}

impl ProcessHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide set, installing the triggers on first use.
    ///
    /// The panic hook is installed once per process and chains to whatever
    /// hook was set before it. The Ctrl-C listener is spawned once, by the
    /// first call made inside a tokio runtime. Every call returns a handle
    /// to the same set.
    pub fn install() -> Self {
        static INSTALLED: OnceLock<ProcessHooks> = OnceLock::new();
        static LISTENING: AtomicBool = AtomicBool::new(false);

        let hooks = INSTALLED
            .get_or_init(|| {
                let hooks = Self::new();
                let on_panic = hooks.clone();
                let previous = std::panic::take_hook();
                std::panic::set_hook(Box::new(move |info| {
                    let fired = on_panic.fire_all();
                    if fired > 0 {
                        tracing::warn!("Panic: ran {} cleanup handler(s)", fired);
                    }
                    previous(info);
                }));
                hooks
            })
            .clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                if !LISTENING.swap(true, Ordering::SeqCst) {
                    let on_interrupt = hooks.clone();
                    handle.spawn(async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            tracing::warn!("Interrupted, running cleanup");
                            on_interrupt.fire_all();
                            std::process::exit(INTERRUPTED_EXIT_CODE);
                        }
                    });
                }
            }
            Err(_) => {
                tracing::debug!("No tokio runtime; Ctrl-C hook not installed");
            }
        }

        hooks
    }

    /// Whether two handles share the same watched set
    pub fn same_set(&self, other: &ProcessHooks) -> bool {
        Arc::ptr_eq(&self.watched, &other.watched)
    }

    /// Watch a scope until the returned registration is dropped.
    pub fn watch(&self, scope: CleanupScope) -> HookRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, scope);
        HookRegistration {
            hooks: self.clone(),
            id,
        }
    }

    /// Fire every watched scope; returns how many actually ran.
    pub fn fire_all(&self) -> usize {
        // Snapshot first so a handler can drop its own registration.
        let scopes: Vec<CleanupScope> = self.lock().values().cloned().collect();
        scopes.iter().filter(|scope| scope.fire()).count()
    }

    /// Number of scopes currently watched
    pub fn watched(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, CleanupScope>> {
        // Reached from the panic hook, so a poisoned lock is still usable.
        self.watched.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps a scope watched; unwatches on drop
pub struct HookRegistration {
    hooks: ProcessHooks,
    id: u64,
}

impl Drop for HookRegistration {
    fn drop(&mut self) {
        self.hooks.lock().remove(&self.id);
    }
}
