//! Core systems for Horizon Quantity.
//!
//! This crate provides the notification primitives that the quantity crate is
//! built on:
//!
//! - **Signal/Slot System**: Fan-out of change notifications to any number of
//!   observers, with per-slot fault isolation and re-entrant emission
//! - **Bindings**: Lazily computed values that cache until invalidated
//! - **Logging**: Tracing targets and span names shared by the workspace
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_quantity_core::Signal;
//!
//! // Create a signal that notifies when a value changes
//! let value_changed = Signal::<i32>::new();
//!
//! // Connect a slot to handle the signal
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! // Emit the signal
//! value_changed.emit(42);
//!
//! // Disconnect when done
//! value_changed.disconnect(conn_id);
//! ```

pub mod binding;
pub mod logging;
pub mod signal;

pub use binding::Binding;
pub use logging::PerfSpan;
pub use signal::{ConnectionId, Signal};
