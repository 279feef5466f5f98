//! Framework-level errors.

/// Errors that can occur within the actor framework itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    /// The caller's expected version did not match the committed one.
    #[error("Version conflict: expected {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },
}
