//! Typed errors for accessibility port operations.

use crate::ids::Pid;

/// Result alias for port operations.
pub type PortResult<T> = Result<T, PortError>;

/// Failure modes of the accessibility port. Each has a fixed recovery policy
/// in the engine; none of them is fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The host refused the operation. Surfaced once per session; all port
    /// writes are disabled afterwards.
    #[error("accessibility permission denied")]
    PermissionDenied,

    /// The target window no longer exists. The engine synthesizes a
    /// `WindowDestroyed` event and drops the operation.
    #[error("window is gone")]
    Gone,

    /// The requested attribute is not present on the element. Classifier
    /// reads fall back to a safe default.
    #[error("attribute {0} is missing")]
    AttributeMissing(&'static str),

    /// Registering for per-process notifications failed. The engine falls
    /// back to polling for that pid and retries on the next activation.
    #[error("event subscription failed for {0}")]
    SubscriptionFailed(Pid),

    /// The backend cannot perform this operation at all.
    #[error("unsupported port operation: {0}")]
    Unsupported(&'static str),
}
