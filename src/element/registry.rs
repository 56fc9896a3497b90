//! Element registry: routes decoded messages and ticks to named elements

use tracing::{debug, trace};

use crate::address::Cable;
use crate::element::InputElement;
use crate::midi::{format_hex, ChannelMessage};

/// Named input elements, updated in registration order
#[derive(Default)]
pub struct ElementRegistry {
    elements: Vec<(String, Box<dyn InputElement>)>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, element: Box<dyn InputElement>) {
        self.elements.push((name.into(), element));
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Offer a message to every element; returns how many matched
    pub fn dispatch(&mut self, msg: &ChannelMessage) -> usize {
        let mut matched = 0;
        for (name, element) in &mut self.elements {
            if element.update_with(msg) {
                debug!("{} matched {}", msg, name);
                matched += 1;
            }
        }
        matched
    }

    /// Decode raw bytes received on `cable` and dispatch them.
    /// Messages that are not channel messages are ignored.
    pub fn dispatch_raw(&mut self, data: &[u8], cable: Cable) -> usize {
        match ChannelMessage::parse(data, cable) {
            Some(msg) => self.dispatch(&msg),
            None => {
                trace!("Ignoring non-channel message: {}", format_hex(data));
                0
            }
        }
    }

    pub fn tick(&mut self) {
        for (_, element) in &mut self.elements {
            element.tick();
        }
    }

    pub fn reset(&mut self) {
        for (_, element) in &mut self.elements {
            element.reset();
        }
    }

    /// Names and summaries of dirty elements; clears their dirty flags
    pub fn take_dirty(&mut self) -> Vec<(String, String)> {
        self.elements
            .iter_mut()
            .filter(|(_, element)| element.is_dirty())
            .map(|(name, element)| {
                element.clear_dirty();
                (name.clone(), element.describe())
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn InputElement> {
        self.elements
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, element)| element.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn InputElement)> {
        self.elements
            .iter()
            .map(|(name, element)| (name.as_str(), element.as_ref()))
    }
}
