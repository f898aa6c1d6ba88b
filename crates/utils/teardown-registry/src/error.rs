use crate::action::BoxError;
use thiserror::Error;

/// Error that occurs when a registered teardown action fails.
#[derive(Debug, Error)]
#[error("teardown action '{action_name}' failed: {kind}")]
#[non_exhaustive]
pub struct ActionError {
    pub action_name: String,
    #[source]
    pub kind: ActionErrorKind,
}

impl ActionError {
    pub fn new(action_name: impl Into<String>, kind: ActionErrorKind) -> Self {
        Self {
            action_name: action_name.into(),
            kind,
        }
    }

    pub fn execution<E>(action_name: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::new(
            action_name,
            ActionErrorKind::Execution {
                source: source.into(),
            },
        )
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ActionErrorKind {
    #[error("execution error")]
    #[non_exhaustive]
    Execution {
        #[source]
        source: BoxError,
    },
}

/// Error returned by [`TeardownRegistry::trigger`](crate::TeardownRegistry::trigger).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TeardownError {
    /// An action failed and the walk was aborted; later actions never ran.
    #[error("teardown aborted")]
    ActionFailed {
        #[source]
        failure: ActionError,
    },

    /// Multiple actions failed while the walk kept going
    /// (`continue_on_failure` mode).
    #[error("{} action(s) failed during teardown", .failures.len())]
    ActionsFailed { failures: Vec<ActionError> },
}

impl TeardownError {
    /// Create an abort error from the first failure.
    pub fn action_failed(failure: ActionError) -> Self {
        Self::ActionFailed { failure }
    }

    /// Create an aggregate error from all collected failures.
    pub fn actions_failed(failures: Vec<ActionError>) -> Self {
        Self::ActionsFailed { failures }
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

pub type TeardownResult<T> = Result<T, TeardownError>;
