//! The widget adapter contract.
//!
//! The GUI layer provides one [`WidgetAdapter`] per concrete widget kind
//! (spin box, check box, line edit, combo box, label...). The quantity never
//! inspects widget types; it only calls the adapter through this trait.
//!
//! An adapter is expected to:
//!
//! 1. render the initial display in [`WidgetAdapter::configure`] or on the
//!    first [`WidgetAdapter::refresh`];
//! 2. refresh its display whenever its [`WidgetAdapter::channel`] fires;
//! 3. call [`LoggedQuantity::update_value`] when the user edits the widget.
//!
//! Adapters usually hold a `Weak<LoggedQuantity>` for step 3 so that the
//! quantity and its widgets do not keep each other alive.
//!
//! [`LoggedQuantity::update_value`]: crate::LoggedQuantity::update_value

use crate::error::{Error, Result};
use crate::notifier::{Channel, Notification};
use crate::options::Choice;
use crate::quantity::LoggedQuantity;
use crate::value::Value;

/// A bidirectional binding between one widget and one quantity.
pub trait WidgetAdapter: Send + Sync {
    /// Short widget kind, used in error messages.
    fn kind(&self) -> &str;

    /// The channel whose payload this widget displays.
    fn channel(&self) -> Channel;

    /// Show a new value.
    fn refresh(&self, notification: &Notification);

    /// One-time setup when the widget is connected (bounds, decimals,
    /// suffix, choice entries...).
    fn configure(&self, _quantity: &LoggedQuantity) -> Result<()> {
        Ok(())
    }

    /// Enable or disable editing.
    fn set_read_only(&self, _read_only: bool) {}

    /// Apply new advisory bounds.
    fn set_range(&self, _min: Option<&Value>, _max: Option<&Value>) {}

    /// Replace the displayed choice entries.
    fn set_choices(&self, _choices: &[Choice]) -> Result<()> {
        Err(Error::unsupported_widget(self.kind(), "choice lists"))
    }
}
