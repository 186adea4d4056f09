//! Outbound messages handed to the delivery channel.

use serde::{Deserialize, Serialize};

/// A button-like control attached to a message. `action` is the opaque
/// payload the platform sends back when the control is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveControl {
    pub label: String,
    pub action: String,
}

impl InteractiveControl {
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<InteractiveControl>,
}

impl OutboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            controls: Vec::new(),
        }
    }

    pub fn with_control(mut self, control: InteractiveControl) -> Self {
        self.controls.push(control);
        self
    }
}
