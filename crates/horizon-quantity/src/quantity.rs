//! Logged quantities: named, typed, observable values.
//!
//! A [`LoggedQuantity`] is the single source of truth for one piece of
//! application or instrument state. Every mutation path (user edits through a
//! widget, programmatic updates, hardware reads, range cascades) ends in
//! [`LoggedQuantity::notify`], which fans the change out on the named
//! channels of the quantity's [`ChangeNotifier`] only when the value actually
//! differs from the last value that was announced.
//!
//! # Hardware echo loops
//!
//! With reread-after-write enabled, `update_value` writes the commanded value
//! to the device, reads the device back and keeps what the device reports.
//! Devices rarely echo exactly what they were told, so observers reacting to
//! the read-back value may push it straight back into `update_value`. A
//! per-quantity suppression flag is set for the duration of one
//! write-then-verify sequence (including its notification fan-out); while it
//! is set, further updates change the stored value but do not write to the
//! device. The flag is also cleared by any update that finds the value
//! already settled. Together these bound every `update_value` call to at most
//! one hardware write and one hardware read.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use horizon_quantity_core::logging::targets;
use horizon_quantity_core::Signal;
use parking_lot::{Mutex, RwLock};

use crate::error::{Error, HardwareOp, Result};
use crate::format::NumberFormat;
use crate::hardware::{HardwareHooks, HardwareResult};
use crate::notifier::{Channel, ChangeNotifier, Notification, SubscriptionHandle, Update};
use crate::options::{Choice, QuantityOptions, UpdateOptions};
use crate::value::{DType, NdArray, Value};
use crate::widget::WidgetAdapter;

struct State {
    value: Value,
    /// The value as of the last notification (or before the last mutation).
    previous: Option<Value>,
    suppress_reread: bool,
    /// Set while subscribers are being called.
    publishing: bool,
    /// A notification requested mid-fan-out, with its `force` flag.
    pending: Option<bool>,
    min: Option<Value>,
    max: Option<Value>,
    choices: Option<Vec<Choice>>,
    read_only: bool,
}

/// A named, typed, observable value with optional hardware hooks.
///
/// Quantities are shared as `Arc<LoggedQuantity>`; all methods take `&self`.
/// No lock is held while hardware hooks or subscribers run, so subscribers
/// may freely read or update any quantity, including the one notifying them.
pub struct LoggedQuantity {
    name: String,
    dtype: DType,
    array: bool,
    format: NumberFormat,
    unit: Option<String>,
    decimals: u32,
    step_increment: f64,
    si: bool,
    reread_after_write: AtomicBool,
    state: Mutex<State>,
    hardware: RwLock<HardwareHooks>,
    notifier: ChangeNotifier,
    min_max_changed: Signal<(Option<Value>, Option<Value>)>,
    read_only_changed: Signal<bool>,
    choices_changed: Signal<Vec<Choice>>,
    widgets: Mutex<Vec<Arc<dyn WidgetAdapter>>>,
}

impl LoggedQuantity {
    /// Create a scalar quantity.
    pub fn new(name: impl Into<String>, dtype: DType, options: QuantityOptions) -> Result<Self> {
        Self::build(name.into(), dtype, false, options)
    }

    /// Create an array quantity whose elements are of `dtype`.
    ///
    /// Array quantities notify only the `Value` and `Text` channels.
    pub fn new_array(
        name: impl Into<String>,
        dtype: DType,
        options: QuantityOptions,
    ) -> Result<Self> {
        Self::build(name.into(), dtype, true, options)
    }

    fn build(name: String, dtype: DType, array: bool, options: QuantityOptions) -> Result<Self> {
        let format = NumberFormat::parse(&options.format)?;
        let coerce = |value: Value| -> Result<Value> {
            if array {
                NdArray::coerce(dtype, &value).map(Value::Array)
            } else {
                dtype.coerce(&value)
            }
        };

        let value = match options.initial {
            Some(initial) => coerce(initial)?,
            None if array => Value::Array(NdArray::empty()),
            None => dtype.zero(),
        };
        let min = options.min.map(|v| dtype.coerce(&v)).transpose()?;
        let max = options.max.map(|v| dtype.coerce(&v)).transpose()?;
        let choices = options
            .choices
            .map(|choices| {
                choices
                    .into_iter()
                    .map(|c| Ok(Choice::new(c.label, coerce(c.value)?)))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let decimals = options
            .decimals
            .unwrap_or(if dtype == DType::Int { 0 } else { 2 });
        let step_increment = options
            .step_increment
            .unwrap_or(if dtype == DType::Int { 1.0 } else { 0.1 });

        Ok(Self {
            name,
            dtype,
            array,
            format,
            unit: options.unit,
            decimals,
            step_increment,
            si: options.si,
            reread_after_write: AtomicBool::new(options.reread_after_write),
            state: Mutex::new(State {
                value,
                previous: None,
                suppress_reread: false,
                publishing: false,
                pending: None,
                min,
                max,
                choices,
                read_only: options.read_only,
            }),
            hardware: RwLock::new(options.hardware),
            notifier: ChangeNotifier::new(),
            min_max_changed: Signal::new(),
            read_only_changed: Signal::new(),
            choices_changed: Signal::new(),
            widgets: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scalar type, or the element type of an array quantity.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn format(&self) -> &NumberFormat {
        &self.format
    }

    /// Decimal places for spin boxes, and the range step tolerance exponent.
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn step_increment(&self) -> f64 {
        self.step_increment
    }

    pub fn si(&self) -> bool {
        self.si
    }

    /// The current value.
    pub fn value(&self) -> Value {
        self.state.lock().value.clone()
    }

    /// The current value as a float, for numeric scalars.
    pub fn value_f64(&self) -> Option<f64> {
        self.state.lock().value.as_f64()
    }

    /// The value as of the last notification or before the last mutation.
    pub fn previous_value(&self) -> Option<Value> {
        self.state.lock().previous.clone()
    }

    pub fn min(&self) -> Option<Value> {
        self.state.lock().min.clone()
    }

    pub fn max(&self) -> Option<Value> {
        self.state.lock().max.clone()
    }

    pub fn choices(&self) -> Option<Vec<Choice>> {
        self.state.lock().choices.clone()
    }

    pub fn is_read_only(&self) -> bool {
        self.state.lock().read_only
    }

    /// Whether a reread-suppression sequence is in progress.
    pub fn is_reread_suppressed(&self) -> bool {
        self.state.lock().suppress_reread
    }

    /// Convert an input to this quantity's type.
    pub fn coerce(&self, input: impl Into<Value>) -> Result<Value> {
        let input = input.into();
        if self.array {
            NdArray::coerce(self.dtype, &input).map(Value::Array)
        } else {
            self.dtype.coerce(&input)
        }
    }

    /// Change detection. Arrays compare shape first, then elements.
    pub fn equals(&self, a: &Value, b: &Value) -> bool {
        a == b
    }

    /// Update the value, writing to hardware and notifying subscribers.
    pub fn update_value(&self, new_value: impl Into<Value>) -> Result<()> {
        self.update_value_with(new_value, UpdateOptions::default())
    }

    /// Update the value with explicit hardware and notification options.
    ///
    /// A value equal to the current one is a settled no-op: no hardware
    /// write, no notification, and the reread suppression flag is cleared.
    /// A failed hardware write restores the previous value. A failed
    /// read-back keeps the commanded value but skips notification.
    pub fn update_value_with(&self, new_value: impl Into<Value>, options: UpdateOptions) -> Result<()> {
        let new_value = self.coerce(new_value)?;

        let (prior_previous, suppressed) = {
            let mut state = self.state.lock();
            if self.equals(&state.value, &new_value) {
                state.suppress_reread = false;
                tracing::trace!(target: targets::QUANTITY, name = %self.name, "value settled");
                return Ok(());
            }
            let old = std::mem::replace(&mut state.value, new_value.clone());
            (state.previous.replace(old), state.suppress_reread)
        };

        let mut suppression = None;
        let write = if options.update_hardware && !suppressed {
            self.hardware.read().write.clone()
        } else {
            None
        };
        if let Some(write) = write {
            tracing::debug!(target: targets::HARDWARE, name = %self.name, value = %new_value, "writing to hardware");
            if let Err(source) = write(&new_value) {
                self.rollback(prior_previous);
                return Err(Error::hardware(&self.name, HardwareOp::Write, source));
            }

            let reread = options
                .reread_hardware
                .unwrap_or_else(|| self.reread_after_write());
            if reread {
                suppression = Some(RereadSuppression::enter(self));
                if let Some(read_back) = self.read_hook_value()? {
                    self.state.lock().value = read_back;
                }
            }
        }

        if options.send_signal {
            self.notify(false);
        }
        drop(suppression);
        Ok(())
    }

    fn rollback(&self, prior_previous: Option<Value>) {
        let mut state = self.state.lock();
        if let Some(old) = state.previous.take() {
            state.value = old;
        }
        state.previous = prior_previous;
    }

    /// Overwrite the value without hardware access or notification.
    ///
    /// The last announced value is left untouched, so a later
    /// [`notify`](Self::notify) still reports the change.
    pub(crate) fn set_value_silently(&self, new_value: impl Into<Value>) -> Result<()> {
        let new_value = self.coerce(new_value)?;
        self.state.lock().value = new_value;
        Ok(())
    }

    /// Read the device and store the result. Without a read hook this
    /// returns the current value unchanged.
    pub fn read_from_hardware(&self, send_signal: bool) -> Result<Value> {
        let Some(read_back) = self.read_hook_value()? else {
            return Ok(self.value());
        };
        {
            let mut state = self.state.lock();
            let old = std::mem::replace(&mut state.value, read_back);
            state.previous = Some(old);
        }
        if send_signal {
            self.notify(false);
        }
        Ok(self.value())
    }

    fn read_hook_value(&self) -> Result<Option<Value>> {
        let Some(read) = self.hardware.read().read.clone() else {
            return Ok(None);
        };
        let raw = read().map_err(|source| Error::hardware(&self.name, HardwareOp::Read, source))?;
        let value = self.coerce(raw)?;
        tracing::debug!(target: targets::HARDWARE, name = %self.name, value = %value, "read from hardware");
        Ok(Some(value))
    }

    /// Announce the current value if it changed since the last announcement,
    /// or unconditionally when `force` is set.
    ///
    /// A call made from inside one of this quantity's own subscribers is
    /// queued and delivered once the running fan-out has reached every
    /// subscriber, so all of them see changes in the order they happened.
    ///
    /// Returns whether anything was emitted or queued.
    pub fn notify(&self, force: bool) -> bool {
        let mut state = self.state.lock();
        if state.publishing {
            *state.pending.get_or_insert(false) |= force;
            return true;
        }

        let mut force = force;
        let mut emitted = false;
        loop {
            let changed = match &state.previous {
                Some(previous) => !self.equals(previous, &state.value),
                None => true,
            };
            if !changed && !force {
                state.publishing = false;
                if !emitted {
                    tracing::trace!(target: targets::QUANTITY, name = %self.name, "no change to announce");
                }
                return emitted;
            }
            state.previous = Some(state.value.clone());
            state.publishing = true;
            let value = state.value.clone();
            drop(state);

            tracing::debug!(target: targets::QUANTITY, name = %self.name, force, "sending display updates");
            let failures = self.notifier.publish(self.project(value));
            if failures > 0 {
                tracing::warn!(target: targets::QUANTITY, name = %self.name, failures, "subscribers failed during notification");
            }
            emitted = true;

            state = self.state.lock();
            force = state.pending.take().unwrap_or(false);
        }
    }

    fn project(&self, value: Value) -> Update {
        let text = self.display(&value);
        if self.array {
            return Update {
                value,
                text,
                numeric: None,
                integer: None,
                truth: None,
                choice_index: None,
            };
        }
        let numeric = self.dtype.is_numeric();
        Update {
            numeric: if numeric { value.as_f64() } else { None },
            integer: if numeric { value.as_i64() } else { None },
            truth: value.as_bool(),
            choice_index: self.choice_index_of(&value),
            value,
            text,
        }
    }

    fn display(&self, value: &Value) -> String {
        match value {
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Array(a) => a.to_json_string(),
            numeric => self.format.format(numeric),
        }
    }

    /// The display form: verbatim for strings, the format pattern for
    /// numbers, JSON for arrays.
    pub fn to_display_string(&self) -> String {
        self.display(&self.value())
    }

    /// Full-precision text for persistence; coerces back to the same value.
    pub fn to_settings_string(&self) -> String {
        self.value().to_settings_string()
    }

    fn choice_index_of(&self, value: &Value) -> Option<usize> {
        self.state
            .lock()
            .choices
            .as_ref()?
            .iter()
            .position(|c| &c.value == value)
    }

    /// Index of the current value in the choice list.
    pub fn choice_index(&self) -> Option<usize> {
        self.choice_index_of(&self.value())
    }

    /// Select the `index`-th choice through [`update_value`](Self::update_value).
    pub fn set_choice_by_index(&self, index: usize) -> Result<()> {
        let choice = {
            let state = self.state.lock();
            let choices = state.choices.as_deref().unwrap_or_default();
            match choices.get(index) {
                Some(choice) => choice.value.clone(),
                None => {
                    return Err(Error::IndexOutOfRange {
                        name: self.name.clone(),
                        index,
                        len: choices.len(),
                    });
                }
            }
        };
        self.update_value(choice)
    }

    /// Replace the choice list and push it to connected widgets.
    pub fn change_choice_list<I, C>(&self, choices: I) -> Result<()>
    where
        I: IntoIterator<Item = C>,
        C: Into<Choice>,
    {
        let choices = choices
            .into_iter()
            .map(|c| {
                let c: Choice = c.into();
                Ok(Choice::new(c.label, self.coerce(c.value)?))
            })
            .collect::<Result<Vec<_>>>()?;
        self.state.lock().choices = Some(choices.clone());

        let mut first_error = None;
        for widget in self.widgets() {
            if let Err(err) = widget.set_choices(&choices) {
                first_error.get_or_insert(err);
            }
        }
        self.choices_changed.emit(choices);
        first_error.map_or(Ok(()), Err)
    }

    /// Replace the advisory bounds and push them to connected widgets.
    pub fn change_min_max(&self, min: Option<Value>, max: Option<Value>) -> Result<()> {
        let min = min.map(|v| self.dtype.coerce(&v)).transpose()?;
        let max = max.map(|v| self.dtype.coerce(&v)).transpose()?;
        {
            let mut state = self.state.lock();
            state.min = min.clone();
            state.max = max.clone();
        }
        for widget in self.widgets() {
            widget.set_range(min.as_ref(), max.as_ref());
        }
        self.min_max_changed.emit((min, max));
        Ok(())
    }

    /// Change the read-only flag and push it to connected widgets.
    pub fn change_read_only(&self, read_only: bool) {
        self.state.lock().read_only = read_only;
        for widget in self.widgets() {
            widget.set_read_only(read_only);
        }
        self.read_only_changed.emit(read_only);
    }

    /// Bind a widget: configure it, keep it refreshed from its channel and
    /// bring every observer in sync with a forced notification.
    pub fn connect_widget(&self, widget: Arc<dyn WidgetAdapter>) -> Result<SubscriptionHandle> {
        widget.configure(self)?;
        let target = widget.clone();
        let handle = self
            .notifier
            .subscribe(widget.channel(), move |n| target.refresh(n));
        widget.set_read_only(self.is_read_only());
        self.widgets.lock().push(widget);
        self.notify(true);
        Ok(handle)
    }

    fn widgets(&self) -> Vec<Arc<dyn WidgetAdapter>> {
        self.widgets.lock().clone()
    }

    /// Number of connected widgets.
    pub fn widget_count(&self) -> usize {
        self.widgets.lock().len()
    }

    /// The notification channels.
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Subscribe a channel-agnostic callback.
    pub fn subscribe<F>(&self, channel: Channel, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.notifier.subscribe(channel, callback)
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.notifier.unsubscribe(handle)
    }

    /// Emitted with `(min, max)` after [`change_min_max`](Self::change_min_max).
    pub fn min_max_changed(&self) -> &Signal<(Option<Value>, Option<Value>)> {
        &self.min_max_changed
    }

    /// Emitted after [`change_read_only`](Self::change_read_only).
    pub fn read_only_changed(&self) -> &Signal<bool> {
        &self.read_only_changed
    }

    /// Emitted after [`change_choice_list`](Self::change_choice_list).
    pub fn choices_changed(&self) -> &Signal<Vec<Choice>> {
        &self.choices_changed
    }

    pub fn reread_after_write(&self) -> bool {
        self.reread_after_write.load(Ordering::SeqCst)
    }

    pub fn set_reread_after_write(&self, reread: bool) {
        self.reread_after_write.store(reread, Ordering::SeqCst);
    }

    pub fn hardware(&self) -> HardwareHooks {
        self.hardware.read().clone()
    }

    pub fn set_hardware(&self, hooks: HardwareHooks) {
        *self.hardware.write() = hooks;
    }

    pub fn set_hardware_read<F>(&self, read: F)
    where
        F: Fn() -> HardwareResult<Value> + Send + Sync + 'static,
    {
        let mut hooks = self.hardware.write();
        *hooks = std::mem::take(&mut *hooks).with_read(read);
    }

    pub fn set_hardware_write<F>(&self, write: F)
    where
        F: Fn(&Value) -> HardwareResult<()> + Send + Sync + 'static,
    {
        let mut hooks = self.hardware.write();
        *hooks = std::mem::take(&mut *hooks).with_write(write);
    }
}

impl fmt::Debug for LoggedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LoggedQuantity")
            .field("name", &self.name)
            .field("dtype", &self.dtype)
            .field("array", &self.array)
            .field("value", &state.value)
            .field("previous", &state.previous)
            .field("read_only", &state.read_only)
            .finish_non_exhaustive()
    }
}

/// Holds the reread suppression flag for one write-then-verify sequence.
struct RereadSuppression<'a> {
    quantity: &'a LoggedQuantity,
}

impl<'a> RereadSuppression<'a> {
    fn enter(quantity: &'a LoggedQuantity) -> Self {
        quantity.state.lock().suppress_reread = true;
        Self { quantity }
    }
}

impl Drop for RereadSuppression<'_> {
    fn drop(&mut self) {
        self.quantity.state.lock().suppress_reread = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::HardwareError;
    use std::sync::atomic::AtomicUsize;

    fn float(name: &str, initial: f64) -> LoggedQuantity {
        LoggedQuantity::new(name, DType::Float, QuantityOptions::new().initial(initial)).unwrap()
    }

    fn count_value_signals(q: &LoggedQuantity) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        q.notifier().on_value(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn test_defaults_per_dtype() {
        let i = LoggedQuantity::new("i", DType::Int, QuantityOptions::new()).unwrap();
        assert_eq!(i.value(), Value::Int(0));
        assert_eq!(i.decimals(), 0);
        assert_eq!(i.step_increment(), 1.0);

        let x = LoggedQuantity::new("x", DType::Float, QuantityOptions::new()).unwrap();
        assert_eq!(x.decimals(), 2);
        assert_eq!(x.format().pattern(), "%g");

        let a = LoggedQuantity::new_array("a", DType::Float, QuantityOptions::new()).unwrap();
        assert_eq!(a.to_display_string(), "[]");
    }

    #[test]
    fn test_initial_value_is_coerced() {
        let q = LoggedQuantity::new("q", DType::Int, QuantityOptions::new().initial("12")).unwrap();
        assert_eq!(q.value(), Value::Int(12));

        let err = LoggedQuantity::new("q", DType::Float, QuantityOptions::new().initial("x"));
        assert!(err.unwrap_err().is_coercion());
    }

    #[test]
    fn test_bad_format_is_rejected() {
        let err = LoggedQuantity::new("q", DType::Float, QuantityOptions::new().format("%y"));
        assert!(matches!(err, Err(Error::InvalidFormat { .. })));
    }

    #[test]
    fn test_equal_update_is_silent() {
        let q = float("q", 5.0);
        q.notify(false);
        let count = count_value_signals(&q);

        q.update_value(5.0).unwrap();
        q.update_value("5").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        q.update_value(6.0).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(q.previous_value(), Some(Value::Float(6.0)));
    }

    #[test]
    fn test_coercion_failure_aborts_update() {
        let q = float("q", 1.0);
        let count = count_value_signals(&q);

        let err = q.update_value("not a number").unwrap_err();
        assert!(err.is_coercion());
        assert_eq!(q.value(), Value::Float(1.0));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_silent_update_defers_notification() {
        let q = float("q", 1.0);
        q.notify(false);
        let count = count_value_signals(&q);

        q.update_value_with(2.0, UpdateOptions::silent()).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert!(q.notify(false));
        assert!(!q.notify(false));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(q.notify(true));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_write_restores_value() {
        let q = float("q", 1.0);
        q.set_hardware_write(|_| Err(HardwareError::new("device offline")));
        let count = count_value_signals(&q);

        let err = q.update_value(2.0).unwrap_err();
        assert!(matches!(err, Error::Hardware { operation: HardwareOp::Write, .. }));
        assert_eq!(q.value(), Value::Float(1.0));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_local_update_skips_hardware() {
        let writes = Arc::new(AtomicUsize::new(0));
        let writes_clone = writes.clone();
        let q = float("q", 0.0);
        q.set_hardware_write(move |_| {
            writes_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        q.update_value_with(3.0, UpdateOptions::local()).unwrap();
        assert_eq!(writes.load(Ordering::SeqCst), 0);
        q.update_value(4.0).unwrap();
        assert_eq!(writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_from_hardware_without_hook() {
        let q = float("q", 3.0);
        assert_eq!(q.read_from_hardware(true).unwrap(), Value::Float(3.0));
    }

    #[test]
    fn test_read_from_hardware_notifies_on_change() {
        let q = float("q", 3.0);
        q.notify(false);
        q.set_hardware_read(|| Ok(Value::Str("4.5".into())));
        let count = count_value_signals(&q);

        assert_eq!(q.read_from_hardware(true).unwrap(), Value::Float(4.5));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        q.read_from_hardware(true).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_choice_index_projection() {
        let q = LoggedQuantity::new(
            "mode",
            DType::Int,
            QuantityOptions::new().initial(1).choices([("low", 1), ("high", 5)]),
        )
        .unwrap();
        assert_eq!(q.choice_index(), Some(0));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        q.notifier().on_choice_index(move |i| seen_clone.lock().push(i));

        q.set_choice_by_index(1).unwrap();
        assert_eq!(q.value(), Value::Int(5));
        assert_eq!(*seen.lock(), vec![1]);

        q.update_value(3).unwrap();
        assert_eq!(q.choice_index(), None);
        assert_eq!(*seen.lock(), vec![1]);

        let err = q.set_choice_by_index(2).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 2, len: 2, .. }));
    }

    #[test]
    fn test_string_quantity_channels() {
        let q = LoggedQuantity::new("label", DType::Str, QuantityOptions::new()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for channel in Channel::ALL {
            let seen = seen.clone();
            q.subscribe(channel, move |n| seen.lock().push(n.channel()));
        }

        q.update_value("sample A").unwrap();
        assert_eq!(*seen.lock(), vec![Channel::Value, Channel::Text]);
        assert_eq!(q.to_display_string(), "sample A");
    }

    #[test]
    fn test_bool_display_round_trip() {
        let q = LoggedQuantity::new("shutter", DType::Bool, QuantityOptions::new()).unwrap();
        q.update_value(true).unwrap();
        assert_eq!(q.to_display_string(), "true");
        assert_eq!(q.coerce(q.to_display_string()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_change_min_max_emits() {
        let q = float("q", 0.0);
        let got = Arc::new(Mutex::new(None));
        let got_clone = got.clone();
        q.min_max_changed().connect(move |bounds| *got_clone.lock() = Some(bounds.clone()));

        q.change_min_max(Some(Value::Int(-1)), Some(Value::from("10"))).unwrap();
        assert_eq!(q.min(), Some(Value::Float(-1.0)));
        assert_eq!(
            *got.lock(),
            Some((Some(Value::Float(-1.0)), Some(Value::Float(10.0))))
        );
    }

    #[test]
    fn test_change_read_only_emits() {
        let q = float("q", 0.0);
        let got = Arc::new(AtomicBool::new(false));
        let got_clone = got.clone();
        q.read_only_changed().connect(move |&ro| got_clone.store(ro, Ordering::SeqCst));

        q.change_read_only(true);
        assert!(q.is_read_only());
        assert!(got.load(Ordering::SeqCst));
    }
}
