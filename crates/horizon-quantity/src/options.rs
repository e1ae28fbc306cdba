//! Construction and update options.

use crate::hardware::{HardwareHooks, HardwareResult};
use crate::value::{DType, Value};

/// A labelled entry of a choice list.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub label: String,
    pub value: Value,
}

impl Choice {
    /// A choice with an explicit label.
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// A choice labelled with the value's own text.
    pub fn from_value(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            label: value.to_settings_string(),
            value,
        }
    }
}

impl<L: Into<String>, V: Into<Value>> From<(L, V)> for Choice {
    fn from((label, value): (L, V)) -> Self {
        Self::new(label, value)
    }
}

/// Options for creating a quantity.
///
/// # Example
///
/// ```
/// use horizon_quantity::{DType, LoggedQuantity, QuantityOptions};
///
/// let exposure = LoggedQuantity::new(
///     "exposure",
///     DType::Float,
///     QuantityOptions::new()
///         .initial(0.5)
///         .format("%.3f")
///         .unit("s")
///         .bounds(0.001, 60.0),
/// )?;
/// assert_eq!(exposure.to_display_string(), "0.500");
/// # Ok::<(), horizon_quantity::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct QuantityOptions {
    pub(crate) initial: Option<Value>,
    pub(crate) format: String,
    pub(crate) unit: Option<String>,
    pub(crate) min: Option<Value>,
    pub(crate) max: Option<Value>,
    pub(crate) choices: Option<Vec<Choice>>,
    pub(crate) read_only: bool,
    pub(crate) decimals: Option<u32>,
    pub(crate) step_increment: Option<f64>,
    pub(crate) si: bool,
    pub(crate) reread_after_write: bool,
    pub(crate) hardware: HardwareHooks,
}

impl Default for QuantityOptions {
    fn default() -> Self {
        Self {
            initial: None,
            format: "%g".to_owned(),
            unit: None,
            min: None,
            max: None,
            choices: None,
            read_only: false,
            decimals: None,
            step_increment: None,
            si: false,
            reread_after_write: false,
            hardware: HardwareHooks::default(),
        }
    }
}

impl QuantityOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial value. Defaults to the zero value of the dtype.
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    /// printf-style display pattern for numeric values. Defaults to `%g`.
    pub fn format(mut self, pattern: impl Into<String>) -> Self {
        self.format = pattern.into();
        self
    }

    /// Physical unit shown next to the value by widgets.
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Advisory inclusive bounds.
    pub fn bounds(mut self, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        self.min = Some(min.into());
        self.max = Some(max.into());
        self
    }

    /// Advisory lower bound only.
    pub fn min(mut self, min: impl Into<Value>) -> Self {
        self.min = Some(min.into());
        self
    }

    /// Advisory upper bound only.
    pub fn max(mut self, max: impl Into<Value>) -> Self {
        self.max = Some(max.into());
        self
    }

    /// Choice list. Accepts `Choice`s or `(label, value)` pairs.
    pub fn choices<I, C>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Choice>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Decimal places shown by spin boxes. Also sets the range step tolerance.
    pub fn decimals(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    /// Spin box single-step increment.
    pub fn step_increment(mut self, step: f64) -> Self {
        self.step_increment = Some(step);
        self
    }

    /// Prefer SI-prefixed spin boxes.
    pub fn si(mut self, si: bool) -> Self {
        self.si = si;
        self
    }

    /// Read back from hardware after every write.
    pub fn reread_after_write(mut self, reread: bool) -> Self {
        self.reread_after_write = reread;
        self
    }

    /// Attach a hardware read hook.
    pub fn hardware_read<F>(mut self, read: F) -> Self
    where
        F: Fn() -> HardwareResult<Value> + Send + Sync + 'static,
    {
        self.hardware = self.hardware.with_read(read);
        self
    }

    /// Attach a hardware write hook.
    pub fn hardware_write<F>(mut self, write: F) -> Self
    where
        F: Fn(&Value) -> HardwareResult<()> + Send + Sync + 'static,
    {
        self.hardware = self.hardware.with_write(write);
        self
    }

    /// Replace both hardware hooks.
    pub fn hardware(mut self, hooks: HardwareHooks) -> Self {
        self.hardware = hooks;
        self
    }
}

/// Per-call options for [`LoggedQuantity::update_value_with`].
///
/// [`LoggedQuantity::update_value_with`]: crate::LoggedQuantity::update_value_with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Call the hardware write hook.
    pub update_hardware: bool,
    /// Notify subscribers.
    pub send_signal: bool,
    /// Read back after writing. `None` uses the quantity's policy.
    pub reread_hardware: Option<bool>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            update_hardware: true,
            send_signal: true,
            reread_hardware: None,
        }
    }
}

impl UpdateOptions {
    /// Update the stored value and notify, without touching hardware.
    pub fn local() -> Self {
        Self {
            update_hardware: false,
            ..Self::default()
        }
    }

    /// Update the stored value only.
    pub fn silent() -> Self {
        Self {
            update_hardware: false,
            send_signal: false,
            reread_hardware: None,
        }
    }

    pub fn reread(mut self, reread: bool) -> Self {
        self.reread_hardware = Some(reread);
        self
    }
}

/// Options for [`QuantityRegistry::create_range`].
///
/// [`QuantityRegistry::create_range`]: crate::QuantityRegistry::create_range
#[derive(Debug, Clone)]
pub struct RangeOptions {
    pub(crate) dtype: DType,
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) num: i64,
    pub(crate) format: String,
    pub(crate) unit: Option<String>,
    pub(crate) decimals: Option<u32>,
    pub(crate) si: bool,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            dtype: DType::Float,
            min: 0.0,
            max: 1.0,
            num: 2,
            format: "%g".to_owned(),
            unit: None,
            decimals: None,
            si: false,
        }
    }
}

impl RangeOptions {
    /// A range from `min` to `max` with `num` points.
    pub fn new(min: f64, max: f64, num: i64) -> Self {
        Self {
            min,
            max,
            num,
            ..Self::default()
        }
    }

    /// Element type of min/max/step/center/span. Defaults to float.
    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn format(mut self, pattern: impl Into<String>) -> Self {
        self.format = pattern.into();
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn decimals(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn si(mut self, si: bool) -> Self {
        self.si = si;
        self
    }

    /// The options each member quantity other than `num` is created with.
    pub(crate) fn member(&self, initial: f64) -> QuantityOptions {
        let mut options = QuantityOptions::new()
            .initial(initial)
            .format(self.format.clone())
            .si(self.si);
        options.unit = self.unit.clone();
        options.decimals = self.decimals;
        options
    }
}
