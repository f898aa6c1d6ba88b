use crate::action::{ActionOutcome, BoxError, NamedAction};
use crate::error::{ActionError, TeardownError, TeardownResult};
use crate::hooks::TeardownHook;
use std::{
    future::Future,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Configuration for TeardownRegistry.
#[derive(Debug, Clone, Copy)]
pub struct TeardownConfig {
    /// Keep walking past a failed action and return all failures at the end,
    /// instead of aborting on the first one.
    pub continue_on_failure: bool,

    /// Log registrations that arrive after the trigger at `warn` level.
    pub warn_on_late_registration: bool,
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            continue_on_failure: false,
            warn_on_late_registration: true,
        }
    }
}

/// Which path a [`TeardownRegistry::register`] call took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The action was stored and will run during the trigger walk.
    Queued,

    /// The trigger had already fired; the action ran inside the register
    /// call itself and will not appear in any walk.
    RanImmediately,
}

/// Ordered collection of cleanup actions for a resource being shut down.
///
/// Actions registered before [`trigger`](Self::trigger) run in registration
/// order, exactly once, when the trigger fires; an action that returns
/// [`ActionOutcome::Pending`] suspends the walk until it resolves. Actions
/// registered after the trigger run immediately instead of being stored.
///
/// The registry is shareable: wrap it in [`Arc`] (or use
/// [`shared`](Self::shared)) to register actions from multiple tasks, or from
/// within a draining action.
pub struct TeardownRegistry {
    actions: Mutex<Vec<NamedAction>>,
    triggered: AtomicBool,
    next_index: AtomicUsize,
    config: TeardownConfig,
}

impl Default for TeardownRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TeardownRegistry {
    pub fn new(config: TeardownConfig) -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            triggered: AtomicBool::new(false),
            next_index: AtomicUsize::new(0),
            config,
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TeardownConfig::default())
    }

    /// Create a shared registry wrapped in [`Arc`].
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::with_defaults())
    }

    /// Whether [`trigger`](Self::trigger) has been called at least once.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Number of actions currently queued for the trigger walk.
    pub fn queued_actions(&self) -> usize {
        self.lock_actions().len()
    }

    /// Register a raw action with an auto-generated name.
    ///
    /// See [`register_named`](Self::register_named).
    pub fn register<F>(&self, action: F) -> Registration
    where
        F: FnOnce() -> ActionOutcome + Send + 'static,
    {
        let name = self.next_name();
        self.register_named(name, action)
    }

    /// Register a raw action under `name`.
    ///
    /// If the trigger has not fired yet the action is queued and this returns
    /// [`Registration::Queued`]. Otherwise the action is invoked here,
    /// synchronously, and this returns [`Registration::RanImmediately`]; a
    /// [`Pending`](ActionOutcome::Pending) remainder is detached onto the
    /// current tokio runtime and its result only logged. Registering after
    /// the trigger is never an error.
    pub fn register_named<F>(&self, name: impl Into<String>, action: F) -> Registration
    where
        F: FnOnce() -> ActionOutcome + Send + 'static,
    {
        self.register_entry(NamedAction {
            name: name.into(),
            action: Box::new(action),
        })
    }

    /// Register a synchronous action with an auto-generated name.
    pub fn register_sync<F, E>(&self, f: F) -> Registration
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        let name = self.next_name();
        self.register_sync_named(name, f)
    }

    /// Register a synchronous action under `name`.
    pub fn register_sync_named<F, E>(&self, name: impl Into<String>, f: F) -> Registration
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        self.register_named(name, move || {
            ActionOutcome::Completed(f().map_err(Into::into))
        })
    }

    /// Register an asynchronous action with an auto-generated name.
    pub fn register_async<F, Fut, E>(&self, f: F) -> Registration
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let name = self.next_name();
        self.register_async_named(name, f)
    }

    /// Register an asynchronous action under `name`.
    ///
    /// `f` itself runs synchronously at invocation time; the future it
    /// returns is what suspends the walk.
    pub fn register_async_named<F, Fut, E>(&self, name: impl Into<String>, f: F) -> Registration
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.register_named(name, move || {
            let fut = f();
            ActionOutcome::pending(async move { fut.await.map_err(Into::into) })
        })
    }

    /// Register any hook that implements [`TeardownHook`], under its own name.
    pub fn register_hook(&self, hook: Arc<dyn TeardownHook>) -> Registration {
        let name = hook.name().to_string();
        self.register_named(name, move || {
            ActionOutcome::pending(async move { hook.teardown().await })
        })
    }

    /// Run all registered actions in registration order.
    ///
    /// Only the first call drains the queue; later calls find it empty and
    /// resolve `Ok(())` without re-invoking anything. Synchronous actions run
    /// back to back without the returned future ever suspending, so a walk
    /// over purely-synchronous actions completes on its first poll.
    ///
    /// With the default configuration the first failure aborts the walk and
    /// the remaining actions are never invoked, not even by a later trigger.
    pub async fn trigger(&self) -> TeardownResult<()> {
        let drained = {
            let mut actions = self.lock_actions();
            // Flag flip and drain happen under the same lock, so no register
            // call can queue an action that the walk would miss.
            self.triggered.store(true, Ordering::SeqCst);
            std::mem::take(&mut *actions)
        };

        if drained.is_empty() {
            debug!("teardown triggered with no queued actions");
            return Ok(());
        }

        info!(actions = drained.len(), "draining teardown actions");

        let mut failures: Vec<ActionError> = Vec::new();
        for entry in drained {
            let result = match (entry.action)() {
                ActionOutcome::Completed(result) => result,
                ActionOutcome::Pending(fut) => fut.await,
            };

            match result {
                Ok(()) => debug!(action = %entry.name, "teardown action completed"),
                Err(source) => {
                    let failure = ActionError::execution(entry.name, source);
                    error!(error = %failure, "teardown action failed");

                    if self.config.continue_on_failure {
                        failures.push(failure);
                    } else {
                        return Err(TeardownError::action_failed(failure));
                    }
                }
            }
        }

        if failures.is_empty() {
            info!("teardown complete");
            Ok(())
        } else {
            Err(TeardownError::actions_failed(failures))
        }
    }

    fn register_entry(&self, entry: NamedAction) -> Registration {
        {
            let mut actions = self.lock_actions();
            if !self.triggered.load(Ordering::SeqCst) {
                debug!(action = %entry.name, "queued teardown action");
                actions.push(entry);
                return Registration::Queued;
            }
        }

        self.run_late(entry);
        Registration::RanImmediately
    }

    fn run_late(&self, entry: NamedAction) {
        if self.config.warn_on_late_registration {
            warn!(action = %entry.name, "registered after trigger, running immediately");
        } else {
            debug!(action = %entry.name, "registered after trigger, running immediately");
        }

        match (entry.action)() {
            ActionOutcome::Completed(Ok(())) => {}
            ActionOutcome::Completed(Err(source)) => {
                warn!(action = %entry.name, error = %source, "late teardown action failed");
            }
            ActionOutcome::Pending(fut) => {
                let name = entry.name;
                match Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            if let Err(source) = fut.await {
                                warn!(action = %name, error = %source, "late teardown action failed");
                            }
                        });
                    }
                    Err(_) => {
                        warn!(
                            action = %name,
                            "no tokio runtime, pending part of late teardown action discarded"
                        );
                    }
                }
            }
        }
    }

    fn lock_actions(&self) -> MutexGuard<'_, Vec<NamedAction>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_name(&self) -> String {
        format!("action-{}", self.next_index.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TeardownConfig::default();
        assert!(!config.continue_on_failure);
        assert!(config.warn_on_late_registration);
    }

    #[test]
    fn test_queued_actions_count() {
        let registry = TeardownRegistry::with_defaults();
        assert_eq!(registry.queued_actions(), 0);

        registry.register_sync(|| Ok::<_, BoxError>(()));
        registry.register_sync_named("second", || Ok::<_, BoxError>(()));
        assert_eq!(registry.queued_actions(), 2);
        assert!(!registry.is_triggered());
    }

    #[tokio::test]
    async fn test_trigger_sets_flag_and_drains() {
        let registry = TeardownRegistry::with_defaults();
        registry.register_sync(|| Ok::<_, BoxError>(()));

        registry.trigger().await.unwrap();
        assert!(registry.is_triggered());
        assert_eq!(registry.queued_actions(), 0);
    }

    #[tokio::test]
    async fn test_auto_generated_names_appear_in_errors() {
        let registry = TeardownRegistry::with_defaults();
        registry.register_sync(|| Err::<(), _>(std::io::Error::other("boom")));

        let err = registry.trigger().await.unwrap_err();
        match err {
            TeardownError::ActionFailed { failure } => {
                assert_eq!(failure.action_name, "action-0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
