//! Errors for the probabilistic-site substrate.

/// Result alias for trace operations that may produce [`TraceError`].
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors raised by [`crate::probability::Trace`].
///
/// Site names identify stochastic draws across repeated model executions,
/// so registering the same name twice within one trace is always a bug in
/// the calling model, never a recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    /// A site with this name has already been registered in this trace.
    DuplicateSite { name: String },

    /// A factor site carried a NaN value.
    NanFactor { name: String },
}

impl std::error::Error for TraceError {}

impl std::fmt::Display for TraceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceError::DuplicateSite { name } => {
                write!(f, "Site {name:?} was registered twice in the same trace.")
            }
            TraceError::NanFactor { name } => {
                write!(f, "Factor site {name:?} carries a NaN value.")
            }
        }
    }
}
