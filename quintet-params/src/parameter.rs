//! Observable, mapped parameter values

use std::cell::Cell;
use std::fmt;

use crate::mapping::ValueMapping;
use crate::observable::{Observable, Subscription};
use crate::print::PrintMapping;

/// A typed value with a mapping, a print mapping and observers
///
/// Writes are clamped into the mapping's domain. Observers hear about a
/// write only when it changes the stored value, and receive the parameter
/// itself so they can read the new value.
pub struct Parameter<T: Copy + PartialEq + 'static> {
    mapping: Box<dyn ValueMapping<T>>,
    print: PrintMapping<T>,
    default: T,
    value: Cell<T>,
    observers: Observable<Parameter<T>>,
}

pub type FloatParameter = Parameter<f64>;
pub type IntParameter = Parameter<i32>;
pub type BoolParameter = Parameter<bool>;

impl<T: Copy + PartialEq + 'static> Parameter<T> {
    pub fn new(mapping: impl ValueMapping<T> + 'static, print: PrintMapping<T>, value: T) -> Self {
        let value = mapping.clamp(value);
        Self {
            mapping: Box::new(mapping),
            print,
            default: value,
            value: Cell::new(value),
            observers: Observable::new(),
        }
    }

    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Store a new value, returns `true` if the stored value changed
    pub fn set(&self, value: T) -> bool {
        let value = self.mapping.clamp(value);
        if value == self.value.get() {
            return false;
        }
        self.value.set(value);
        self.observers.notify(self);
        true
    }

    pub fn get_normalized(&self) -> f64 {
        self.mapping.to_normalized(self.value.get())
    }

    pub fn set_normalized(&self, normalized: f64) -> bool {
        self.set(self.mapping.from_normalized(normalized))
    }

    pub fn default_value(&self) -> T {
        self.default
    }

    /// Return to the value the parameter was created with
    pub fn reset(&self) -> bool {
        self.set(self.default)
    }

    pub fn mapping(&self) -> &dyn ValueMapping<T> {
        self.mapping.as_ref()
    }

    /// Current value as text, without units
    pub fn print(&self) -> String {
        self.print.print(self.value.get())
    }

    /// Current value as text, with units
    pub fn print_with_units(&self) -> String {
        self.print.print_with_units(self.value.get())
    }

    /// Parse text and store the result; unparsable text is ignored
    pub fn parse(&self, text: &str) -> bool {
        match self.print.parse(text) {
            Some(value) => self.set(value),
            None => false,
        }
    }

    /// Observe changes; with `notify_now` the observer also runs once
    /// immediately with the current value
    pub fn subscribe(
        &self,
        observer: impl Fn(&Parameter<T>) + 'static,
        notify_now: bool,
    ) -> Subscription {
        if notify_now {
            observer(self);
        }
        self.observers.subscribe(observer)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Drop every observer
    pub fn terminate(&self) {
        self.observers.clear();
    }
}

impl<T: Copy + PartialEq + fmt::Debug + 'static> fmt::Debug for Parameter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("value", &self.value.get())
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}
