//! Error types for quantities, ranges and registries.

use std::fmt;

use crate::hardware::HardwareError;

/// Result type alias for quantity operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which hardware hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareOp {
    /// The read hook.
    Read,
    /// The write hook.
    Write,
}

impl fmt::Display for HardwareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Errors that can occur when working with quantities.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An input could not be converted to the declared type.
    #[error("cannot convert {input} to {target}: {reason}")]
    TypeCoercion {
        target: String,
        input: String,
        reason: String,
    },

    /// A registry already holds a quantity or range with this name.
    #[error("a quantity named '{0}' already exists")]
    DuplicateName(String),

    /// A registry holds nothing with this name.
    #[error("no quantity named '{0}'")]
    KeyNotFound(String),

    /// A choice index outside the choice list.
    #[error("choice index {index} is out of range for '{name}' ({len} choices)")]
    IndexOutOfRange {
        name: String,
        index: usize,
        len: usize,
    },

    /// A hardware hook reported a failure.
    #[error("hardware {operation} failed for '{name}': {source}")]
    Hardware {
        name: String,
        operation: HardwareOp,
        #[source]
        source: HardwareError,
    },

    /// A display format pattern could not be parsed.
    #[error("invalid format pattern '{pattern}': {reason}")]
    InvalidFormat { pattern: String, reason: String },

    /// A range model was built from unsuitable quantities.
    #[error("invalid range '{name}': {reason}")]
    InvalidRange { name: String, reason: String },

    /// A widget adapter cannot perform the requested operation.
    #[error("widget '{widget}' does not support {operation}")]
    UnsupportedWidget { widget: String, operation: String },
}

impl Error {
    /// Create a coercion error.
    pub fn coercion(
        target: impl fmt::Display,
        input: impl fmt::Debug,
        reason: impl Into<String>,
    ) -> Self {
        Self::TypeCoercion {
            target: target.to_string(),
            input: format!("{input:?}"),
            reason: reason.into(),
        }
    }

    /// Create a hardware error.
    pub fn hardware(name: impl Into<String>, operation: HardwareOp, source: HardwareError) -> Self {
        Self::Hardware {
            name: name.into(),
            operation,
            source,
        }
    }

    /// Create a format error.
    pub fn invalid_format(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create a range error.
    pub fn invalid_range(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported widget error.
    pub fn unsupported_widget(widget: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedWidget {
            widget: widget.into(),
            operation: operation.into(),
        }
    }

    /// Whether this is a [`Error::TypeCoercion`].
    pub fn is_coercion(&self) -> bool {
        matches!(self, Self::TypeCoercion { .. })
    }
}
