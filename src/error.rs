//! # Error Handling
//!
//! Every fallible engine operation returns [`RotateResult`]. Errors carry an
//! [`ErrorContext`] with a timestamp, the operation that failed and a severity, so
//! the caller can log them uniformly and decide whether the stream can continue.
//!
//! ## Categories
//!
//! | Variant | Raised by | Typical severity |
//! |---------|-----------|------------------|
//! | `Geometry` | target-size computation, table builders | Error |
//! | `Allocation` | buffer manager, table builders | Critical |
//! | `ThreadSpawn` | worker pool start | Critical |
//! | `Worker` | a kernel panicked while processing a frame | Error |
//! | `State` | calling into a context that is not open | Warning |
//! | `Validation` | bad configuration or an undersized input frame | Error |
//! | `Io` | mapped buffer creation | Critical |
//!
//! ## Usage
//!
//! ```rust
//! use frame_rotate::error::{RotateError, classify};
//!
//! let error = RotateError::validation("line_size", "must be >= width", "1000")
//!     .with_context("opening 1920x1080 stream");
//! assert_eq!(error.category(), "validation");
//! assert!(classify::is_fatal(&error));
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

use rotate_geometry::GeometryError;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Caller misuse that leaves the context untouched
    Warning,
    /// The current operation failed, the context is still usable
    Error,
    /// Resources could not be obtained; rotation is disabled
    Critical,
    /// Unrecoverable
    Fatal,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            severity: ErrorSeverity::Error,
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Base error type for the rotation engine
#[derive(Debug)]
pub enum RotateError {
    /// Target-size or lookup-table computation failed
    Geometry {
        source: GeometryError,
        context: ErrorContext,
    },
    /// A buffer or table could not be reserved
    Allocation {
        resource: String,
        bytes: usize,
        context: ErrorContext,
    },
    /// Fewer worker threads than requested could be started
    ThreadSpawn {
        created: usize,
        requested: usize,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// A worker failed while processing its rows
    Worker {
        worker: usize,
        reason: String,
        context: ErrorContext,
    },
    /// Operation not valid in the current lifecycle state
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Invalid parameter or input frame
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        source: std::io::Error,
        context: ErrorContext,
    },
}

impl RotateError {
    pub fn geometry(source: GeometryError) -> Self {
        Self::Geometry { source, context: ErrorContext::new() }
    }

    pub fn allocation(resource: impl Into<String>, bytes: usize) -> Self {
        Self::Allocation {
            resource: resource.into(),
            bytes,
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    pub fn thread_spawn(created: usize, requested: usize, source: std::io::Error) -> Self {
        Self::ThreadSpawn {
            created,
            requested,
            source,
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    pub fn worker(worker: usize, reason: impl Into<String>) -> Self {
        Self::Worker { worker, reason: reason.into(), context: ErrorContext::new() }
    }

    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Geometry { context, .. } => context,
            Self::Allocation { context, .. } => context,
            Self::ThreadSpawn { context, .. } => context,
            Self::Worker { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::Io { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Geometry { context, .. } => context,
            Self::Allocation { context, .. } => context,
            Self::ThreadSpawn { context, .. } => context,
            Self::Worker { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::Io { context, .. } => context,
        }
    }

    /// Short category name, stable for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Geometry { .. } => "geometry",
            Self::Allocation { .. } => "allocation",
            Self::ThreadSpawn { .. } => "thread_spawn",
            Self::Worker { .. } => "worker",
            Self::State { .. } => "state",
            Self::Validation { .. } => "validation",
            Self::Io { .. } => "io",
        }
    }
}

impl fmt::Display for RotateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotateError::Geometry { source, .. } => write!(f, "Geometry error: {}", source),
            RotateError::Allocation { resource, bytes, .. } => {
                write!(f, "Failed to allocate {} bytes for {}", bytes, resource)
            }
            RotateError::ThreadSpawn { created, requested, source, .. } => write!(
                f,
                "Started {} of {} worker threads: {}",
                created, requested, source
            ),
            RotateError::Worker { worker, reason, .. } => {
                write!(f, "Worker {} failed: {}", worker, reason)
            }
            RotateError::State { current_state, attempted_operation, reason, .. } => write!(
                f,
                "Invalid state '{}' when attempting '{}': {}",
                current_state, attempted_operation, reason
            ),
            RotateError::Validation { field, constraint, value, .. } => write!(
                f,
                "Validation failed for '{}': {} (value: {})",
                field, constraint, value
            ),
            RotateError::Io { operation, source, .. } => {
                write!(f, "I/O error during {}: {}", operation, source)
            }
        }
    }
}

impl StdError for RotateError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Geometry { source, .. } => Some(source),
            Self::ThreadSpawn { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type RotateResult<T> = Result<T, RotateError>;

/// Trait for errors that report a severity
pub trait HasSeverity {
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for RotateError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Retrying the same call may succeed (memory pressure, thread limits).
    pub fn is_transient(error: &RotateError) -> bool {
        matches!(error, RotateError::Allocation { .. } | RotateError::ThreadSpawn { .. })
    }

    /// Retrying with the same parameters will fail again.
    pub fn is_fatal(error: &RotateError) -> bool {
        matches!(error, RotateError::Geometry { .. } | RotateError::Validation { .. })
            || error.severity() == ErrorSeverity::Fatal
    }
}

impl From<std::io::Error> for RotateError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<GeometryError> for RotateError {
    fn from(error: GeometryError) -> Self {
        match error {
            GeometryError::Allocation { table, bytes } => Self::allocation(table, bytes),
            other => Self::geometry(other),
        }
    }
}
