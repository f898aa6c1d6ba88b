pub mod action;
pub mod error;
pub mod hooks;
pub mod registry;
pub use action::{ActionOutcome, BoxError, PendingAction};
pub use error::{ActionError, ActionErrorKind, ActionResult, TeardownError, TeardownResult};
pub use hooks::TeardownHook;
pub use registry::{Registration, TeardownConfig, TeardownRegistry};
