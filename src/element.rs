//! Input elements
//!
//! An input element owns a matcher and the state that matched messages
//! update. The registry feeds every decoded message and every periodic tick
//! to all of its elements, one call at a time.

mod registry;
mod value;

pub use registry::ElementRegistry;
pub use value::{ControlValue, ValueMatcher};

use crate::midi::{ChannelMessage, MessageType};

/// Interface between input elements and the loop that drives them
pub trait InputElement {
    /// Message type this element listens to
    fn message_type(&self) -> MessageType;

    /// Offer a message to the element. Returns true if it matched.
    fn update_with(&mut self, msg: &ChannelMessage) -> bool;

    /// Periodic housekeeping (e.g. meter decay)
    fn tick(&mut self) {}

    /// Reset all state to its initial value and mark the element dirty
    fn reset(&mut self);

    /// True if the visible state changed since the flag was last cleared
    fn is_dirty(&self) -> bool;

    fn clear_dirty(&mut self);

    /// Short human readable summary of the visible state
    fn describe(&self) -> String;
}

/// Note On and Note Off share one address space, so elements listening to
/// either accept both.
pub fn accepts(expected: MessageType, received: MessageType) -> bool {
    expected == received || (expected.is_note() && received.is_note())
}
