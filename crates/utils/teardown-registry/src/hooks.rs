use async_trait::async_trait;

use crate::action::BoxError;

/// Trait for resources that carry their own named cleanup routine.
///
/// Implementors are registered through
/// [`TeardownRegistry::register_hook`](crate::TeardownRegistry::register_hook)
/// and drained like any other action, in registration order.
#[async_trait]
pub trait TeardownHook: Send + Sync + 'static {
    /// Name used in logs and in [`ActionError`](crate::ActionError).
    fn name(&self) -> &str;

    /// Cleanup body. Runs at most once, when the registry drains (or
    /// immediately, if registered after the trigger).
    async fn teardown(&self) -> Result<(), BoxError>;
}
