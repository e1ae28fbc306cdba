//! Horizon Quantity - typed, observable values for instrument control.
//!
//! A [`LoggedQuantity`] is a named value with a fixed type, optional hardware
//! read/write hooks, and a [`ChangeNotifier`] that announces every distinct
//! change on a small set of named channels. A [`RangeModel`] links several
//! quantities into an evenly spaced sequence, and a [`QuantityRegistry`] owns
//! them all by name.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use horizon_quantity::{DType, QuantityOptions, QuantityRegistry, Value};
//!
//! let mut settings = QuantityRegistry::new();
//! let temperature = settings.create(
//!     "temperature",
//!     DType::Float,
//!     QuantityOptions::new().initial(20.0).format("%.1f").unit("C"),
//! )?;
//!
//! let updates = Arc::new(AtomicUsize::new(0));
//! let counter = updates.clone();
//! temperature.notifier().on_text(move |text| {
//!     println!("temperature is now {text}");
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! settings.set_value("temperature", "21.5")?;
//! settings.set_value("temperature", 21.5)?; // unchanged: no notification
//!
//! assert_eq!(updates.load(Ordering::SeqCst), 1);
//! assert_eq!(temperature.to_display_string(), "21.5");
//! assert_eq!(settings.get_value("temperature")?, Value::Float(21.5));
//! # Ok::<(), horizon_quantity::Error>(())
//! ```
//!
//! # Threading
//!
//! Everything is `Send + Sync` and synchronous. Subscribers and hardware hooks
//! run on the thread that triggered the change, with no internal lock held,
//! so they may re-enter any quantity.

pub mod error;
pub mod format;
pub mod hardware;
pub mod notifier;
pub mod options;
pub mod quantity;
pub mod range;
pub mod registry;
pub mod value;
pub mod widget;

pub use error::{Error, HardwareOp, Result};
pub use format::NumberFormat;
pub use hardware::{HardwareError, HardwareHooks, HardwareResult};
pub use notifier::{ChangeNotifier, Channel, Notification, SubscriptionHandle};
pub use options::{Choice, QuantityOptions, RangeOptions, UpdateOptions};
pub use quantity::LoggedQuantity;
pub use range::{RangeMembers, RangeModel};
pub use registry::QuantityRegistry;
pub use value::{DType, NdArray, Value};
pub use widget::WidgetAdapter;

pub use horizon_quantity_core::{ConnectionId, Signal};
