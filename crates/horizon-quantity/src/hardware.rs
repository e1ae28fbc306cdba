//! Hardware read/write hooks.
//!
//! A quantity may mirror a setting on an instrument. The instrument side is
//! expressed as a pair of synchronous functions: a read hook returning a value
//! that coerces to the quantity's type, and a write hook accepting the
//! coerced value. Failures are reported as [`HardwareError`] and surface to
//! the caller of `update_value` or `read_from_hardware`; retries are the
//! adapter's business.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Result type returned by hardware hooks.
pub type HardwareResult<T> = std::result::Result<T, HardwareError>;

/// Read hook: fetch the current value from the device.
pub type ReadFn = Arc<dyn Fn() -> HardwareResult<Value> + Send + Sync>;

/// Write hook: command a new value on the device.
pub type WriteFn = Arc<dyn Fn(&Value) -> HardwareResult<()> + Send + Sync>;

/// A failure reported by a hardware hook.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HardwareError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl HardwareError {
    /// Create an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for HardwareError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source("device I/O error", err)
    }
}

/// The read/write hook pair attached to a quantity.
#[derive(Clone, Default)]
pub struct HardwareHooks {
    pub(crate) read: Option<ReadFn>,
    pub(crate) write: Option<WriteFn>,
}

impl HardwareHooks {
    /// Hooks with neither read nor write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a read hook.
    pub fn with_read<F>(mut self, read: F) -> Self
    where
        F: Fn() -> HardwareResult<Value> + Send + Sync + 'static,
    {
        self.read = Some(Arc::new(read));
        self
    }

    /// Attach a write hook.
    pub fn with_write<F>(mut self, write: F) -> Self
    where
        F: Fn(&Value) -> HardwareResult<()> + Send + Sync + 'static,
    {
        self.write = Some(Arc::new(write));
        self
    }

    /// Whether a read hook is attached.
    pub fn has_read(&self) -> bool {
        self.read.is_some()
    }

    /// Whether a write hook is attached.
    pub fn has_write(&self) -> bool {
        self.write.is_some()
    }
}

impl fmt::Debug for HardwareHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardwareHooks")
            .field("read", &self.read.is_some())
            .field("write", &self.write.is_some())
            .finish()
    }
}
