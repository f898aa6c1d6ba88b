use std::{future::Future, pin::Pin};

/// Error type that individual teardown actions report failure with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The asynchronous remainder of an action that did not finish within its own
/// invocation.
pub type PendingAction = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

/// What invoking a teardown action's closure produced.
pub enum ActionOutcome {
    /// The action finished inside the call itself. The walk moves on to the
    /// next action without yielding.
    Completed(Result<(), BoxError>),

    /// The action started asynchronous work. The walk suspends until it
    /// resolves before invoking the next action.
    Pending(PendingAction),
}

impl ActionOutcome {
    /// Synchronous success.
    pub fn done() -> Self {
        Self::Completed(Ok(()))
    }

    /// Synchronous failure.
    pub fn failed<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Completed(Err(source.into()))
    }

    /// Suspend the walk on `fut`.
    pub fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::Pending(Box::pin(fut))
    }
}

pub(crate) type Action = Box<dyn FnOnce() -> ActionOutcome + Send + 'static>;

/// A queued action together with the name used in logs and errors.
pub(crate) struct NamedAction {
    pub name: String,
    pub action: Action,
}
