//! Linear ranges built from member quantities.
//!
//! A [`RangeModel`] ties `min`, `max`, `step` and `num` (and optionally
//! `center` and `span`) together so that they always describe the same evenly
//! spaced sequence. Editing any member re-derives the others:
//!
//! - `min`/`max`: `step` is recomputed for the current `num`; `center` and
//!   `span` follow.
//! - `num`: `step` is recomputed.
//! - `step`: `num` becomes `floor((max - min) / step) + 1` and `step` snaps to
//!   the value that `num` actually yields. A step already within
//!   `10^-decimals` of the current one is left alone, which is what ends the
//!   step/num feedback cycle. A step that yields no valid point count is
//!   put back to the current one.
//! - `center`/`span`: `min` and `max` are pushed through their normal update
//!   path.
//!
//! Observers are only guaranteed a consistent range after the triggering call
//! returns.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use horizon_quantity_core::logging::{span_names, targets};
use horizon_quantity_core::{Binding, ConnectionId, PerfSpan, Signal};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::notifier::{Channel, Notification, SubscriptionHandle};
use crate::quantity::LoggedQuantity;
use crate::value::{DType, Value};

/// The quantities a range is assembled from.
#[derive(Debug, Clone)]
pub struct RangeMembers {
    pub min: Arc<LoggedQuantity>,
    pub max: Arc<LoggedQuantity>,
    pub step: Arc<LoggedQuantity>,
    pub num: Arc<LoggedQuantity>,
    pub center: Option<Arc<LoggedQuantity>>,
    pub span: Option<Arc<LoggedQuantity>>,
}

impl RangeMembers {
    fn validate(&self, name: &str) -> Result<()> {
        if self.num.dtype() != DType::Int || self.num.is_array() {
            return Err(Error::invalid_range(
                name,
                format!("'{}' must be an int quantity", self.num.name()),
            ));
        }
        let numeric = [&self.min, &self.max, &self.step]
            .into_iter()
            .chain(self.center.iter())
            .chain(self.span.iter());
        for member in numeric {
            if !member.dtype().is_numeric() || member.is_array() {
                return Err(Error::invalid_range(
                    name,
                    format!("'{}' must be a numeric scalar", member.name()),
                ));
            }
        }
        if self.center.is_some() != self.span.is_some() {
            return Err(Error::invalid_range(name, "center and span must be given together"));
        }
        Ok(())
    }
}

/// An evenly spaced sequence described by linked quantities.
///
/// Dropping the model disconnects it from its members; the member quantities
/// themselves live on wherever else they are held.
pub struct RangeModel {
    inner: Arc<RangeInner>,
}

struct RangeInner {
    name: String,
    min: Arc<LoggedQuantity>,
    max: Arc<LoggedQuantity>,
    step: Arc<LoggedQuantity>,
    num: Arc<LoggedQuantity>,
    center: Option<Arc<LoggedQuantity>>,
    span: Option<Arc<LoggedQuantity>>,
    cache: Binding<Vec<f64>>,
    /// Set while center/span and min/max are pushing into each other.
    syncing: AtomicBool,
    range_updated: Signal<()>,
    subscriptions: Mutex<Vec<(Arc<LoggedQuantity>, SubscriptionHandle)>>,
}

impl RangeModel {
    /// Link the members. `step` (and `center`/`span`, if present) are
    /// brought in line with `min`, `max` and `num` before any observer is
    /// attached.
    pub fn new(name: impl Into<String>, members: RangeMembers) -> Result<Self> {
        let name = name.into();
        members.validate(&name)?;

        let cache = {
            let (min, max, num) = (members.min.clone(), members.max.clone(), members.num.clone());
            Binding::new(move || linspace(read(&min), read(&max), read_num(&num)))
        };

        let inner = Arc::new(RangeInner {
            name,
            min: members.min,
            max: members.max,
            step: members.step,
            num: members.num,
            center: members.center,
            span: members.span,
            cache,
            syncing: AtomicBool::new(false),
            range_updated: Signal::new(),
            subscriptions: Mutex::new(Vec::new()),
        });

        inner.push(&inner.step, inner.step_for(inner.num_value()));
        inner.sync_center_span();

        let mut subscriptions = vec![
            watch(&inner, &inner.min, Channel::Float, RangeInner::on_min_max),
            watch(&inner, &inner.max, Channel::Float, RangeInner::on_min_max),
            watch(&inner, &inner.step, Channel::Float, RangeInner::on_step),
            watch(&inner, &inner.num, Channel::Int, RangeInner::on_num),
        ];
        if let (Some(center), Some(span)) = (&inner.center, &inner.span) {
            subscriptions.push(watch(&inner, center, Channel::Float, RangeInner::on_center_span));
            subscriptions.push(watch(&inner, span, Channel::Float, RangeInner::on_center_span));
        }
        *inner.subscriptions.lock() = subscriptions;

        tracing::debug!(target: targets::RANGE, name = %inner.name, "range linked");
        Ok(Self { inner })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn min(&self) -> &Arc<LoggedQuantity> {
        &self.inner.min
    }

    pub fn max(&self) -> &Arc<LoggedQuantity> {
        &self.inner.max
    }

    pub fn step(&self) -> &Arc<LoggedQuantity> {
        &self.inner.step
    }

    pub fn num(&self) -> &Arc<LoggedQuantity> {
        &self.inner.num
    }

    pub fn center(&self) -> Option<&Arc<LoggedQuantity>> {
        self.inner.center.as_ref()
    }

    pub fn span(&self) -> Option<&Arc<LoggedQuantity>> {
        self.inner.span.as_ref()
    }

    /// The evenly spaced sequence from `min` to `max` with `num` points.
    ///
    /// Computed on first use after any member change and cached until the
    /// next one.
    pub fn array(&self) -> Vec<f64> {
        self.inner.cache.get()
    }

    /// The step `num` points between the current `min` and `max` would have.
    /// With fewer than two points this is the full extent `max - min`.
    pub fn step_for(&self, num: i64) -> f64 {
        self.inner.step_for(num)
    }

    /// Drop the cached sequence.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate();
    }

    /// Subscribe to the composite "range updated" event.
    pub fn on_range_updated<F>(&self, callback: F) -> ConnectionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.range_updated.connect(move |_| callback())
    }

    pub fn range_updated(&self) -> &Signal<()> {
        &self.inner.range_updated
    }
}

impl Drop for RangeModel {
    fn drop(&mut self) {
        for (quantity, handle) in self.inner.subscriptions.lock().drain(..) {
            quantity.unsubscribe(handle);
        }
    }
}

impl fmt::Debug for RangeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeModel")
            .field("name", &self.inner.name)
            .field("min", &read(&self.inner.min))
            .field("max", &read(&self.inner.max))
            .field("step", &read(&self.inner.step))
            .field("num", &self.inner.num_value())
            .finish_non_exhaustive()
    }
}

impl RangeInner {
    fn num_value(&self) -> i64 {
        read_num(&self.num)
    }

    fn step_for(&self, num: i64) -> f64 {
        let extent = read(&self.max) - read(&self.min);
        if num > 1 { extent / (num - 1) as f64 } else { extent }
    }

    fn push(&self, quantity: &LoggedQuantity, value: impl Into<Value>) {
        if let Err(err) = quantity.update_value(value) {
            tracing::error!(
                target: targets::RANGE,
                range = %self.name,
                member = quantity.name(),
                error = %err,
                "failed to update range member"
            );
        }
    }

    fn on_min_max(&self, _: &Notification) {
        let _span = PerfSpan::new(span_names::RANGE);
        self.cache.invalidate();
        self.push(&self.step, self.step_for(self.num_value()));
        self.sync_center_span();
        tracing::debug!(target: targets::RANGE, range = %self.name, "recomputed after min/max change");
        self.range_updated.emit(());
    }

    fn on_num(&self, notification: &Notification) {
        let Notification::Int(num) = *notification else {
            return;
        };
        let _span = PerfSpan::new(span_names::RANGE);
        self.cache.invalidate();
        self.push(&self.step, self.step_for(num));
        self.step.notify(true);
        tracing::debug!(target: targets::RANGE, range = %self.name, num, "recomputed after num change");
        self.range_updated.emit(());
    }

    fn on_step(&self, notification: &Notification) {
        let Notification::Float(new_step) = *notification else {
            return;
        };
        let current = self.step_for(self.num_value());
        let tolerance = 10f64.powi(-(self.step.decimals() as i32));
        if (current - new_step).abs() < tolerance {
            tracing::trace!(target: targets::RANGE, range = %self.name, new_step, "step already consistent");
            return;
        }

        let extent = read(&self.max) - read(&self.min);
        let implied = (extent / new_step).floor() + 1.0;
        if new_step == 0.0 || !implied.is_finite() || implied < 1.0 {
            tracing::warn!(target: targets::RANGE, range = %self.name, new_step, "rejecting step that yields no valid point count");
            self.push(&self.step, current);
            return;
        }
        let new_num = implied as i64;

        let _span = PerfSpan::new(span_names::RANGE);
        self.cache.invalidate();
        if let Err(err) = self.step.set_value_silently(self.step_for(new_num)) {
            tracing::error!(target: targets::RANGE, range = %self.name, error = %err, "failed to snap step");
        }
        self.push(&self.num, new_num);
        // Announces the snapped step when `num` did not change and so
        // triggered no re-announcement of its own.
        self.step.notify(false);
        tracing::debug!(target: targets::RANGE, range = %self.name, new_step, new_num, "recomputed after step change");
        self.range_updated.emit(());
    }

    fn on_center_span(&self, _: &Notification) {
        let (Some(center), Some(span)) = (&self.center, &self.span) else {
            return;
        };
        let Some(guard) = SyncGuard::enter(&self.syncing) else {
            return;
        };
        let (c, s) = (read(center), read(span));
        self.push(&self.min, c - 0.5 * s);
        self.push(&self.max, c + 0.5 * s);
        drop(guard);
        // Settle both from the final min/max, e.g. after int truncation.
        self.sync_center_span();
    }

    fn sync_center_span(&self) {
        let (Some(center), Some(span)) = (&self.center, &self.span) else {
            return;
        };
        let Some(_guard) = SyncGuard::enter(&self.syncing) else {
            return;
        };
        let (min, max) = (read(&self.min), read(&self.max));
        self.push(center, 0.5 * (min + max));
        self.push(span, max - min);
    }
}

struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    /// `None` if another sync is already in progress.
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::SeqCst)).then_some(Self(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn watch(
    inner: &Arc<RangeInner>,
    quantity: &Arc<LoggedQuantity>,
    channel: Channel,
    react: fn(&RangeInner, &Notification),
) -> (Arc<LoggedQuantity>, SubscriptionHandle) {
    let weak: Weak<RangeInner> = Arc::downgrade(inner);
    let handle = quantity.subscribe(channel, move |notification| {
        if let Some(inner) = weak.upgrade() {
            react(&inner, notification);
        }
    });
    (quantity.clone(), handle)
}

fn read(quantity: &LoggedQuantity) -> f64 {
    quantity.value_f64().unwrap_or(f64::NAN)
}

fn read_num(quantity: &LoggedQuantity) -> i64 {
    quantity.value().as_i64().unwrap_or(0)
}

fn linspace(min: f64, max: f64, num: i64) -> Vec<f64> {
    match num {
        n if n < 1 => Vec::new(),
        1 => vec![min],
        n => {
            let step = (max - min) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { max } else { min + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::QuantityOptions;
    use std::sync::atomic::AtomicUsize;

    fn quantity(name: &str, dtype: DType, initial: impl Into<Value>) -> Arc<LoggedQuantity> {
        Arc::new(LoggedQuantity::new(name, dtype, QuantityOptions::new().initial(initial)).unwrap())
    }

    fn members(min: f64, max: f64, num: i64) -> RangeMembers {
        RangeMembers {
            min: quantity("x_min", DType::Float, min),
            max: quantity("x_max", DType::Float, max),
            step: quantity("x_step", DType::Float, 0.0),
            num: quantity("x_num", DType::Int, num),
            center: None,
            span: None,
        }
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 0), Vec::<f64>::new());
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(1.0, 0.0, 3), vec![1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_construction_sets_step() {
        let range = RangeModel::new("x", members(0.0, 10.0, 11)).unwrap();
        assert_eq!(range.step().value(), Value::Float(1.0));
        assert_eq!(range.array().len(), 11);
    }

    #[test]
    fn test_single_point() {
        let range = RangeModel::new("x", members(2.0, 6.0, 1)).unwrap();
        assert_eq!(range.step().value(), Value::Float(4.0));
        assert_eq!(range.array(), vec![2.0]);

        range.max().update_value(8.0).unwrap();
        assert_eq!(range.num().value(), Value::Int(1));
        assert_eq!(range.step().value(), Value::Float(6.0));
    }

    #[test]
    fn test_num_must_be_int() {
        let mut m = members(0.0, 1.0, 2);
        m.num = quantity("x_num", DType::Float, 2.0);
        assert!(matches!(RangeModel::new("x", m), Err(Error::InvalidRange { .. })));
    }

    #[test]
    fn test_center_needs_span() {
        let mut m = members(0.0, 1.0, 2);
        m.center = Some(quantity("x_center", DType::Float, 0.5));
        assert!(matches!(RangeModel::new("x", m), Err(Error::InvalidRange { .. })));
    }

    #[test]
    fn test_cache_is_invalidated_by_min_change() {
        let range = RangeModel::new("x", members(0.0, 4.0, 5)).unwrap();
        assert_eq!(range.array(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        range.min().update_value(2.0).unwrap();
        assert_eq!(range.array(), vec![2.0, 2.5, 3.0, 3.5, 4.0]);
        assert_eq!(range.step().value(), Value::Float(0.5));
    }

    #[test]
    fn test_invalid_step_is_restored() {
        let range = RangeModel::new("x", members(0.0, 10.0, 11)).unwrap();
        range.step().update_value(0.0).unwrap();
        assert_eq!(range.num().value(), Value::Int(11));
        assert_eq!(range.step().value(), Value::Float(1.0));

        range.step().update_value(-2.0).unwrap();
        assert_eq!(range.num().value(), Value::Int(11));
        assert_eq!(range.step().value(), Value::Float(1.0));
    }

    #[test]
    fn test_drop_disconnects() {
        let m = members(0.0, 10.0, 11);
        let min = m.min.clone();
        let updates = Arc::new(AtomicUsize::new(0));

        let range = RangeModel::new("x", m).unwrap();
        let updates_clone = updates.clone();
        range.on_range_updated(move || {
            updates_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(min.notifier().subscriber_count(Channel::Float), 1);

        drop(range);
        assert_eq!(min.notifier().subscriber_count(Channel::Float), 0);
        min.update_value(5.0).unwrap();
        assert_eq!(updates.load(Ordering::SeqCst), 0);
    }
}
