//! Parameter model for Quintet
//!
//! Typed values with a normalized `[0, 1]` view, text formatting and
//! change observation:
//! - Mapping: linear, integer, exponential, boolean and volume curves
//! - Print: text formatting and parsing with units
//! - Observable: observer lists with revocable subscriptions
//! - Terminable: ordered teardown of subscriptions and resources

mod mapping;
mod observable;
mod parameter;
mod print;
mod terminable;

pub use mapping::{BooleanMapping, Exponential, IntegerLinear, Linear, ValueMapping, Volume};
pub use observable::{Observable, Subscription};
pub use parameter::{BoolParameter, FloatParameter, IntParameter, Parameter};
pub use print::PrintMapping;
pub use terminable::{Terminable, Terminator};
