//! Named collections of quantities and ranges.

use std::sync::Arc;

use horizon_quantity_core::logging::{span_names, targets};
use horizon_quantity_core::PerfSpan;
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::options::{QuantityOptions, RangeOptions};
use crate::quantity::LoggedQuantity;
use crate::range::{RangeMembers, RangeModel};
use crate::value::{DType, Value};

const RANGE_MEMBERS: [&str; 6] = ["min", "max", "step", "num", "center", "span"];

/// An insertion-ordered collection of quantities and ranges.
///
/// Value access ([`get_value`](Self::get_value) /
/// [`set_value`](Self::set_value)) and object access
/// ([`get_quantity`](Self::get_quantity)) are separate methods.
///
/// # Example
///
/// ```
/// use horizon_quantity::{DType, QuantityOptions, QuantityRegistry, Value};
///
/// let mut settings = QuantityRegistry::new();
/// settings.create("gain", DType::Int, QuantityOptions::new().initial(2))?;
///
/// settings.set_value("gain", "8")?;
/// assert_eq!(settings.get_value("gain")?, Value::Int(8));
/// # Ok::<(), horizon_quantity::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct QuantityRegistry {
    quantities: IndexMap<String, Arc<LoggedQuantity>>,
    ranges: IndexMap<String, RangeModel>,
}

impl QuantityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a scalar quantity.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        dtype: DType,
        options: QuantityOptions,
    ) -> Result<Arc<LoggedQuantity>> {
        let name = name.into();
        self.ensure_free(&name)?;
        let quantity = LoggedQuantity::new(name, dtype, options)?;
        self.add(Arc::new(quantity))
    }

    /// Create and register an array quantity.
    pub fn create_array(
        &mut self,
        name: impl Into<String>,
        dtype: DType,
        options: QuantityOptions,
    ) -> Result<Arc<LoggedQuantity>> {
        let name = name.into();
        self.ensure_free(&name)?;
        let quantity = LoggedQuantity::new_array(name, dtype, options)?;
        self.add(Arc::new(quantity))
    }

    /// Register a quantity built elsewhere.
    pub fn add(&mut self, quantity: Arc<LoggedQuantity>) -> Result<Arc<LoggedQuantity>> {
        self.ensure_free(quantity.name())?;
        tracing::debug!(target: targets::REGISTRY, name = quantity.name(), dtype = %quantity.dtype(), "registered quantity");
        self.quantities
            .insert(quantity.name().to_owned(), quantity.clone());
        Ok(quantity)
    }

    /// Create `{base}_min`, `_max`, `_step`, `_num`, `_center` and `_span`
    /// and link them into a range.
    ///
    /// Nothing is registered if any of the six names is taken.
    pub fn create_range(&mut self, base: impl Into<String>, options: RangeOptions) -> Result<&RangeModel> {
        let base = base.into();
        if self.ranges.contains_key(&base) {
            return Err(Error::DuplicateName(base));
        }
        let names = RANGE_MEMBERS.map(|member| format!("{base}_{member}"));
        for name in &names {
            self.ensure_free(name)?;
        }
        let [min, max, step, num, center, span] = names;

        let member = |name: String, initial: f64| -> Result<Arc<LoggedQuantity>> {
            LoggedQuantity::new(name, options.dtype, options.member(initial)).map(Arc::new)
        };
        let members = RangeMembers {
            min: member(min, options.min)?,
            max: member(max, options.max)?,
            step: member(step, 0.0)?,
            num: Arc::new(LoggedQuantity::new(
                num,
                DType::Int,
                QuantityOptions::new().initial(options.num).min(1),
            )?),
            center: Some(member(center, 0.5 * (options.min + options.max))?),
            span: Some(member(span, options.max - options.min)?),
        };
        let range = RangeModel::new(base.clone(), members.clone())?;

        let RangeMembers { min, max, step, num, center, span } = members;
        for quantity in [Some(min), Some(max), Some(step), Some(num), center, span]
            .into_iter()
            .flatten()
        {
            self.quantities.insert(quantity.name().to_owned(), quantity);
        }
        tracing::debug!(target: targets::REGISTRY, name = %base, "registered range");
        Ok(self.ranges.entry(base).or_insert(range))
    }

    fn ensure_free(&self, name: &str) -> Result<()> {
        if self.quantities.contains_key(name) {
            Err(Error::DuplicateName(name.to_owned()))
        } else {
            Ok(())
        }
    }

    /// The current value of `name`.
    pub fn get_value(&self, name: &str) -> Result<Value> {
        self.get_quantity(name).map(|q| q.value())
    }

    /// Update `name` through its normal update path.
    pub fn set_value(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.get_quantity(name)?.update_value(value)
    }

    /// The quantity registered as `name`.
    pub fn get_quantity(&self, name: &str) -> Result<&Arc<LoggedQuantity>> {
        self.quantities
            .get(name)
            .ok_or_else(|| Error::KeyNotFound(name.to_owned()))
    }

    /// The range created with base name `name`.
    pub fn get_range(&self, name: &str) -> Result<&RangeModel> {
        self.ranges
            .get(name)
            .ok_or_else(|| Error::KeyNotFound(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.quantities.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Quantities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<LoggedQuantity>)> {
        self.quantities.iter().map(|(name, q)| (name.as_str(), q))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.quantities.keys().map(String::as_str)
    }

    /// Ranges in insertion order.
    pub fn ranges(&self) -> impl Iterator<Item = (&str, &RangeModel)> {
        self.ranges.iter().map(|(name, r)| (name.as_str(), r))
    }

    /// `(name, settings string)` pairs in insertion order.
    pub fn to_settings(&self) -> Vec<(String, String)> {
        self.quantities
            .iter()
            .map(|(name, q)| (name.clone(), q.to_settings_string()))
            .collect()
    }

    /// Apply saved settings through [`set_value`](Self::set_value).
    ///
    /// Unknown names are skipped. Returns the number of settings applied.
    pub fn load_settings<I, K, V>(&self, settings: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let _span = PerfSpan::new(span_names::SETTINGS);
        let mut applied = 0;
        for (name, value) in settings {
            let name = name.as_ref();
            if !self.contains(name) {
                tracing::warn!(target: targets::REGISTRY, name, "skipping setting for unknown quantity");
                continue;
            }
            self.set_value(name, value)?;
            applied += 1;
        }
        tracing::debug!(target: targets::REGISTRY, applied, "settings loaded");
        Ok(applied)
    }
}
