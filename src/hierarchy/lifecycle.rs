//! The shared hierarchy cache.
//!
//! A [`HierarchyLifecycle`] owns one snapshot bound to one [`InputScope`].
//! `ensure_refreshed` decides between a full rebuild, an in-place refresh and
//! doing nothing. While a snapshot exists the lifecycle is subscribed to the
//! database with a single sink; stale signals set a flag and notify listeners,
//! change trees go through the [`ChangeDeltaProcessor`].
//!
//! ## Usage
//!
//! ```ignore
//! let lifecycle = Arc::new(HierarchyLifecycle::new(db, HierarchyMode::Full));
//! lifecycle.ensure_refreshed(&InputScope::Type(focus), &CancellationToken::new())?;
//! let view = HierarchyView::new(lifecycle.clone(), ViewPolicy::Traditional, config);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use super::delta::{ChangeDeltaProcessor, ChangedTypes};
use super::error::{HierarchyError, HierarchyResult};
use super::events::{HierarchyEvent, ListenerId, ListenerRegistry};
use super::scope::InputScope;
use crate::config::HierarchyConfig;
use crate::model::{
    ChangeEvent, HierarchyMode, HierarchySnapshot, ModelError, ModelEvent, ModelEventSink,
    SubscriptionId, SymbolDatabase,
};

/// What `ensure_refreshed` / `force_full_rebuild` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot replaced the previous one.
    Rebuilt,
    /// The existing snapshot was recomputed in place.
    Refreshed,
    /// The snapshot was already current.
    Unchanged,
    /// The focus no longer exists (or there is no scope); the lifecycle is empty.
    Cleared,
}

#[derive(Default)]
struct LifecycleState {
    snapshot: Option<Arc<dyn HierarchySnapshot>>,
    scope: Option<InputScope>,
    generation: u64,
}

impl LifecycleState {
    fn replace(&mut self, snapshot: Option<Arc<dyn HierarchySnapshot>>, scope: Option<InputScope>) {
        self.snapshot = snapshot;
        self.scope = scope;
        self.generation += 1;
    }
}

struct LifecycleInner {
    db: Arc<dyn SymbolDatabase>,
    mode: HierarchyMode,
    state: RwLock<LifecycleState>,
    stale: AtomicBool,
    listeners: ListenerRegistry,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl LifecycleInner {
    fn on_stale(&self) {
        tracing::trace!("[LIFECYCLE] Hierarchy marked stale");
        self.stale.store(true, Ordering::SeqCst);
        self.listeners.fire(&HierarchyEvent::Full);
    }

    fn on_changed(&self, delta: &ChangeEvent) {
        // A pending rebuild will pick the change up anyway.
        if self.stale.load(Ordering::SeqCst) {
            return;
        }
        let Some(snapshot) = self.state.read().snapshot.clone() else {
            return;
        };
        let changed = ChangeDeltaProcessor::new(self.db.as_ref(), snapshot.as_ref()).process(delta);
        match changed {
            ChangedTypes::Full => self.listeners.fire(&HierarchyEvent::Full),
            ChangedTypes::Types(types) if !types.is_empty() => {
                tracing::trace!("[LIFECYCLE] {} type(s) changed", types.len());
                self.listeners.fire(&HierarchyEvent::TypesChanged(types));
            }
            ChangedTypes::Types(_) => {}
        }
    }
}

/// The one sink a lifecycle registers; it receives both event kinds.
struct LifecycleSink(Weak<LifecycleInner>);

impl ModelEventSink for LifecycleSink {
    fn notify(&self, event: &ModelEvent) {
        let Some(inner) = self.0.upgrade() else {
            return;
        };
        match event {
            ModelEvent::HierarchyStale => inner.on_stale(),
            ModelEvent::Changed(delta) => inner.on_changed(delta),
        }
    }
}

/// Shared, incrementally refreshed hierarchy cache.
pub struct HierarchyLifecycle {
    inner: Arc<LifecycleInner>,
    /// Serializes rebuild, refresh and free.
    writer: Mutex<()>,
}

impl HierarchyLifecycle {
    /// Create an empty lifecycle. `mode` applies to every single-type scope.
    pub fn new(db: Arc<dyn SymbolDatabase>, mode: HierarchyMode) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                db,
                mode,
                state: RwLock::new(LifecycleState::default()),
                stale: AtomicBool::new(false),
                listeners: ListenerRegistry::default(),
                subscription: Mutex::new(None),
            }),
            writer: Mutex::new(()),
        }
    }

    /// Create an empty lifecycle using the configured mode.
    pub fn from_config(db: Arc<dyn SymbolDatabase>, config: &HierarchyConfig) -> Self {
        Self::new(db, config.mode)
    }

    // ==================== Accessors ====================

    pub fn database(&self) -> &Arc<dyn SymbolDatabase> {
        &self.inner.db
    }

    pub fn mode(&self) -> HierarchyMode {
        self.inner.mode
    }

    /// The current snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<dyn HierarchySnapshot>> {
        self.inner.state.read().snapshot.clone()
    }

    /// The scope the current snapshot was computed for.
    pub fn input_scope(&self) -> Option<InputScope> {
        self.inner.state.read().scope.clone()
    }

    /// Bumped on every rebuild, refresh and free.
    pub fn generation(&self) -> u64 {
        self.inner.state.read().generation
    }

    /// Whether the database signalled staleness since the last computation.
    pub fn is_stale(&self) -> bool {
        self.inner.stale.load(Ordering::SeqCst)
    }

    // ==================== Listeners ====================

    pub fn add_change_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&HierarchyEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.add(Arc::new(listener))
    }

    /// Returns false if the listener was not registered.
    pub fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    // ==================== Refresh ====================

    /// Make the snapshot current for `scope`.
    ///
    /// Rebuilds when there is no snapshot or the scope changed, refreshes in
    /// place when the database signalled staleness, and does nothing
    /// otherwise. A single-type scope whose type no longer exists clears the
    /// lifecycle.
    pub fn ensure_refreshed(
        &self,
        scope: &InputScope,
        cancel: &CancellationToken,
    ) -> HierarchyResult<RefreshOutcome> {
        let _writer = self.writer.lock();

        if let Some(focus) = scope.focus() {
            if !self.inner.db.exists(focus) {
                tracing::debug!("[LIFECYCLE] Focus {} no longer exists", focus);
                self.clear();
                return Ok(RefreshOutcome::Cleared);
            }
        }

        let (has_snapshot, same_scope) = {
            let state = self.inner.state.read();
            (state.snapshot.is_some(), state.scope.as_ref() == Some(scope))
        };

        if !has_snapshot || !same_scope {
            self.rebuild(scope, cancel)?;
            Ok(RefreshOutcome::Rebuilt)
        } else if self.is_stale() {
            self.refresh(cancel)?;
            Ok(RefreshOutcome::Refreshed)
        } else {
            Ok(RefreshOutcome::Unchanged)
        }
    }

    /// Rebuild the snapshot for the current scope unconditionally.
    pub fn force_full_rebuild(&self, cancel: &CancellationToken) -> HierarchyResult<RefreshOutcome> {
        let _writer = self.writer.lock();

        let Some(scope) = self.input_scope() else {
            return Ok(RefreshOutcome::Cleared);
        };
        if let Some(focus) = scope.focus() {
            if !self.inner.db.exists(focus) {
                self.clear();
                return Ok(RefreshOutcome::Cleared);
            }
        }
        self.rebuild(&scope, cancel)?;
        Ok(RefreshOutcome::Rebuilt)
    }

    /// Drop the snapshot and unsubscribe from the database.
    pub fn free(&self) {
        let _writer = self.writer.lock();
        self.clear();
    }

    fn rebuild(&self, scope: &InputScope, cancel: &CancellationToken) -> HierarchyResult<()> {
        let inner = &self.inner;
        self.detach();

        tracing::debug!("[LIFECYCLE] Building hierarchy for {:?}", scope);
        let started = Instant::now();
        let built = scope
            .build_request(inner.db.as_ref(), inner.mode)
            .and_then(|request| inner.db.build_hierarchy(&request, cancel));

        match built {
            Ok(snapshot) => {
                tracing::debug!(
                    "[LIFECYCLE] Built hierarchy of {} type(s) in {:?}",
                    snapshot.len(),
                    started.elapsed()
                );
                inner
                    .state
                    .write()
                    .replace(Some(snapshot), Some(scope.clone()));
                inner.stale.store(false, Ordering::SeqCst);
                self.attach();
                Ok(())
            }
            Err(err) => Err(self.recover(err)),
        }
    }

    fn refresh(&self, cancel: &CancellationToken) -> HierarchyResult<()> {
        let inner = &self.inner;
        let Some(snapshot) = self.snapshot() else {
            return Ok(());
        };
        self.detach();

        tracing::debug!("[LIFECYCLE] Refreshing hierarchy in place");
        let started = Instant::now();
        match snapshot.refresh(cancel) {
            Ok(()) => {
                tracing::debug!(
                    "[LIFECYCLE] Refreshed hierarchy of {} type(s) in {:?}",
                    snapshot.len(),
                    started.elapsed()
                );
                inner.state.write().generation += 1;
                inner.stale.store(false, Ordering::SeqCst);
                self.attach();
                Ok(())
            }
            Err(err) => Err(self.recover(err)),
        }
    }

    /// Restore a consistent state after a failed computation.
    ///
    /// Cancellation keeps the previous snapshot; any other failure clears.
    fn recover(&self, err: ModelError) -> HierarchyError {
        let err = HierarchyError::from(err);
        match err {
            HierarchyError::Cancelled => {
                tracing::debug!("[LIFECYCLE] Computation cancelled");
                if self.inner.state.read().snapshot.is_some() {
                    self.attach();
                }
            }
            HierarchyError::Compute(ref cause) => {
                tracing::debug!("[LIFECYCLE] Computation failed: {}", cause);
                self.clear();
            }
        }
        err
    }

    fn clear(&self) {
        self.detach();
        self.inner.state.write().replace(None, None);
        self.inner.stale.store(false, Ordering::SeqCst);
    }

    fn attach(&self) {
        let mut subscription = self.inner.subscription.lock();
        if subscription.is_none() {
            let sink = Arc::new(LifecycleSink(Arc::downgrade(&self.inner)));
            *subscription = Some(self.inner.db.subscribe(sink));
        }
    }

    fn detach(&self) {
        if let Some(id) = self.inner.subscription.lock().take() {
            self.inner.db.unsubscribe(id);
        }
    }
}

impl Drop for HierarchyLifecycle {
    fn drop(&mut self) {
        self.detach();
    }
}
