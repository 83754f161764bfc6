use std::{error, fmt, result};

/// The single error type crossing every service boundary: generator, editor,
/// booking orchestrator and replan pipeline all return `plan_core::Result`.
#[derive(Debug)]
pub enum PlanError {
    /// A request failed an invariant check before anything was persisted.
    Validation(String),
    /// The referenced entity does not exist.
    NotFound(String),
    /// The request conflicts with the entity's current state (e.g. an edit
    /// against a stale version, or a booking already in a terminal state).
    Conflict(String),
    /// The same idempotency key was replayed against a different request body.
    IdempotencyConflict(String),
    /// A provider adapter reported that a booking attempt failed outright.
    BookingFailed(String),
    /// A provider adapter (booking, routing, weather, catalog) errored. Callers
    /// may retry `transient` errors; `terminal` ones should not be retried.
    ProviderError { message: String, transient: bool },
    /// A replan proposal could not be produced or applied.
    ReplanFailed(String),
    /// A rollback was requested after its window expired.
    ForbiddenRollback(String),
    /// The plan store is unreachable or failed for reasons unrelated to the
    /// request's content.
    StorageUnavailable(Box<dyn error::Error + Send + Sync>),
    /// Escape hatch for anything not worth a dedicated variant.
    Other(Box<dyn error::Error + Send + Sync>),
}

pub type Result<T> = result::Result<T, PlanError>;

impl PlanError {
    pub fn other<E: error::Error + Send + Sync + 'static>(why: E) -> Self {
        Self::Other(Box::new(why))
    }

    pub fn storage<E: error::Error + Send + Sync + 'static>(why: E) -> Self {
        Self::StorageUnavailable(Box::new(why))
    }

    /// Stable machine-readable code for the outward error surface.
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::Validation(_) => "VALIDATION_ERROR",
            PlanError::NotFound(_) => "NOT_FOUND",
            PlanError::Conflict(_) => "CONFLICT",
            PlanError::IdempotencyConflict(_) => "IDEMPOTENCY_CONFLICT",
            PlanError::BookingFailed(_) => "BOOKING_FAILED",
            PlanError::ProviderError { .. } => "PROVIDER_ERROR",
            PlanError::ReplanFailed(_) => "REPLAN_FAILED",
            PlanError::ForbiddenRollback(_) => "ROLLBACK_EXPIRED",
            PlanError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            PlanError::Other(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlanError::StorageUnavailable(_) | PlanError::ProviderError { transient: true, .. }
        )
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::Validation(msg) => write!(f, "validation error: {msg}"),
            PlanError::NotFound(what) => write!(f, "not found: {what}"),
            PlanError::Conflict(msg) => write!(f, "conflict: {msg}"),
            PlanError::IdempotencyConflict(msg) => write!(f, "idempotency conflict: {msg}"),
            PlanError::BookingFailed(msg) => write!(f, "booking failed: {msg}"),
            PlanError::ProviderError { message, transient } => {
                write!(f, "provider error ({}): {message}", if *transient { "transient" } else { "terminal" })
            }
            PlanError::ReplanFailed(msg) => write!(f, "replan failed: {msg}"),
            PlanError::ForbiddenRollback(msg) => write!(f, "rollback expired: {msg}"),
            PlanError::StorageUnavailable(why) => write!(f, "storage unavailable: {why}"),
            PlanError::Other(why) => write!(f, "{why}"),
        }
    }
}

impl error::Error for PlanError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            PlanError::StorageUnavailable(why) | PlanError::Other(why) => Some(why.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(PlanError::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(PlanError::NotFound("trip".into()).code(), "NOT_FOUND");
        assert_eq!(PlanError::IdempotencyConflict("x".into()).code(), "IDEMPOTENCY_CONFLICT");
    }

    #[test]
    fn only_transient_provider_errors_are_retryable() {
        assert!(PlanError::ProviderError { message: "timeout".into(), transient: true }.is_retryable());
        assert!(!PlanError::ProviderError { message: "rejected".into(), transient: false }.is_retryable());
        assert!(!PlanError::Validation("bad".into()).is_retryable());
    }
}
