//! Named notification channels.
//!
//! Every quantity owns a [`ChangeNotifier`]. Each channel carries a different
//! projection of the same change, so subscribers pick the channel whose
//! payload type they want instead of converting values themselves.
//!
//! | Channel       | Payload             | Emitted for                         |
//! |---------------|---------------------|-------------------------------------|
//! | `Value`       | the full [`Value`]  | every quantity                      |
//! | `Text`        | display string      | every quantity                      |
//! | `Float`/`Int` | numeric projection  | int and float scalars               |
//! | `Bool`        | truth projection    | bool, int and float scalars         |
//! | `ChoiceIndex` | index in choices    | scalars whose value is a choice     |

use std::fmt;

use horizon_quantity_core::{ConnectionId, Signal};

use crate::value::Value;

/// A notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Value,
    Text,
    Bool,
    Int,
    Float,
    ChoiceIndex,
}

impl Channel {
    /// All channels, in emission order.
    pub const ALL: [Channel; 6] = [
        Channel::Value,
        Channel::Text,
        Channel::Float,
        Channel::Int,
        Channel::Bool,
        Channel::ChoiceIndex,
    ];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Value => "value",
            Self::Text => "text",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::ChoiceIndex => "choice-index",
        };
        f.write_str(name)
    }
}

/// The payload delivered to a channel-agnostic subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Value(Value),
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    ChoiceIndex(usize),
}

impl Notification {
    /// The channel this payload was delivered on.
    pub fn channel(&self) -> Channel {
        match self {
            Self::Value(_) => Channel::Value,
            Self::Text(_) => Channel::Text,
            Self::Bool(_) => Channel::Bool,
            Self::Int(_) => Channel::Int,
            Self::Float(_) => Channel::Float,
            Self::ChoiceIndex(_) => Channel::ChoiceIndex,
        }
    }
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    channel: Channel,
    id: ConnectionId,
}

impl SubscriptionHandle {
    /// The channel the subscription is attached to.
    pub fn channel(&self) -> Channel {
        self.channel
    }
}

/// One projected change, ready for fan-out.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Update {
    pub value: Value,
    pub text: String,
    pub numeric: Option<f64>,
    /// Exact integer form; not derived from `numeric` so large ints survive.
    pub integer: Option<i64>,
    pub truth: Option<bool>,
    pub choice_index: Option<usize>,
}

/// Per-quantity fan-out over the named channels.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    value: Signal<Value>,
    text: Signal<String>,
    boolean: Signal<bool>,
    int: Signal<i64>,
    float: Signal<f64>,
    choice_index: Signal<usize>,
}

impl ChangeNotifier {
    /// A notifier with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to any channel with a channel-agnostic callback.
    pub fn subscribe<F>(&self, channel: Channel, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = match channel {
            Channel::Value => self.value.connect(move |v| callback(&Notification::Value(v.clone()))),
            Channel::Text => self.text.connect(move |s| callback(&Notification::Text(s.clone()))),
            Channel::Bool => self.boolean.connect(move |&b| callback(&Notification::Bool(b))),
            Channel::Int => self.int.connect(move |&i| callback(&Notification::Int(i))),
            Channel::Float => self.float.connect(move |&x| callback(&Notification::Float(x))),
            Channel::ChoiceIndex => self
                .choice_index
                .connect(move |&i| callback(&Notification::ChoiceIndex(i))),
        };
        SubscriptionHandle { channel, id }
    }

    /// Subscribe to the full value.
    pub fn on_value<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.value.connect(callback);
        SubscriptionHandle { channel: Channel::Value, id }
    }

    /// Subscribe to the display string.
    pub fn on_text<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = self.text.connect(move |s: &String| callback(s));
        SubscriptionHandle { channel: Channel::Text, id }
    }

    pub fn on_bool<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.boolean.connect(move |&b| callback(b));
        SubscriptionHandle { channel: Channel::Bool, id }
    }

    pub fn on_int<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        let id = self.int.connect(move |&i| callback(i));
        SubscriptionHandle { channel: Channel::Int, id }
    }

    pub fn on_float<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let id = self.float.connect(move |&x| callback(x));
        SubscriptionHandle { channel: Channel::Float, id }
    }

    pub fn on_choice_index<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let id = self.choice_index.connect(move |&i| callback(i));
        SubscriptionHandle { channel: Channel::ChoiceIndex, id }
    }

    /// Remove a subscription. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        match handle.channel {
            Channel::Value => self.value.disconnect(handle.id),
            Channel::Text => self.text.disconnect(handle.id),
            Channel::Bool => self.boolean.disconnect(handle.id),
            Channel::Int => self.int.disconnect(handle.id),
            Channel::Float => self.float.disconnect(handle.id),
            Channel::ChoiceIndex => self.choice_index.disconnect(handle.id),
        }
    }

    /// Number of subscribers on a channel.
    pub fn subscriber_count(&self, channel: Channel) -> usize {
        match channel {
            Channel::Value => self.value.connection_count(),
            Channel::Text => self.text.connection_count(),
            Channel::Bool => self.boolean.connection_count(),
            Channel::Int => self.int.connection_count(),
            Channel::Float => self.float.connection_count(),
            Channel::ChoiceIndex => self.choice_index.connection_count(),
        }
    }

    /// Suspend or resume delivery on every channel.
    pub fn set_blocked(&self, blocked: bool) {
        self.value.set_blocked(blocked);
        self.text.set_blocked(blocked);
        self.boolean.set_blocked(blocked);
        self.int.set_blocked(blocked);
        self.float.set_blocked(blocked);
        self.choice_index.set_blocked(blocked);
    }

    /// Deliver one change on every channel it projects onto.
    ///
    /// Returns the number of subscribers that panicked.
    pub(crate) fn publish(&self, update: Update) -> usize {
        let Update {
            value,
            text,
            numeric,
            integer,
            truth,
            choice_index,
        } = update;

        let mut failures = self.value.emit(value);
        failures += self.text.emit(text);
        if let Some(x) = numeric {
            failures += self.float.emit(x);
        }
        if let Some(i) = integer {
            failures += self.int.emit(i);
        }
        if let Some(b) = truth {
            failures += self.boolean.emit(b);
        }
        if let Some(index) = choice_index {
            failures += self.choice_index.emit(index);
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn update(value: Value) -> Update {
        Update {
            text: value.to_settings_string(),
            numeric: value.as_f64(),
            integer: value.as_i64(),
            truth: value.as_bool(),
            choice_index: None,
            value,
        }
    }

    #[test]
    fn test_publish_projects_numbers() {
        let notifier = ChangeNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for channel in Channel::ALL {
            let seen = seen.clone();
            notifier.subscribe(channel, move |n| seen.lock().push(n.clone()));
        }

        notifier.publish(update(Value::Float(2.5)));

        assert_eq!(
            *seen.lock(),
            vec![
                Notification::Value(Value::Float(2.5)),
                Notification::Text("2.5".into()),
                Notification::Float(2.5),
                Notification::Int(2),
                Notification::Bool(true),
            ]
        );
    }

    #[test]
    fn test_array_only_reaches_value_and_text() {
        let notifier = ChangeNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for channel in Channel::ALL {
            let seen = seen.clone();
            notifier.subscribe(channel, move |n| seen.lock().push(n.channel()));
        }

        notifier.publish(update(vec![1.0, 2.0].into()));
        assert_eq!(*seen.lock(), vec![Channel::Value, Channel::Text]);
    }

    #[test]
    fn test_unsubscribe() {
        let notifier = ChangeNotifier::new();
        let handle = notifier.on_float(|_| {});
        assert_eq!(notifier.subscriber_count(Channel::Float), 1);
        assert!(notifier.unsubscribe(handle));
        assert!(!notifier.unsubscribe(handle));
        assert_eq!(notifier.subscriber_count(Channel::Float), 0);
    }

    #[test]
    fn test_faulty_subscriber_is_counted() {
        let notifier = ChangeNotifier::new();
        let got = Arc::new(Mutex::new(None));
        notifier.on_text(|_| panic!("broken widget"));
        let got_clone = got.clone();
        notifier.on_text(move |s| *got_clone.lock() = Some(s.to_owned()));

        let failures = notifier.publish(update(Value::Int(3)));
        assert_eq!(failures, 1);
        assert_eq!(got.lock().as_deref(), Some("3"));
    }
}
