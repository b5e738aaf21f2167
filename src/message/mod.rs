//! Message and recipient value objects.

mod phone;

pub use phone::PhoneNumber;

use std::collections::HashMap;

/// The kind of message a gateway should deliver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageType {
    /// Plain text SMS.
    #[default]
    Text,
    /// Voice call reading the content out.
    Voice,
}

/// An outbound message.
///
/// Content-based vendors read `content`; template-based vendors read
/// `template` and `data`. A message may name explicit gateways to try
/// instead of the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct Message {
    message_type: MessageType,
    content: Option<String>,
    template: Option<String>,
    data: HashMap<String, String>,
    gateways: Vec<String>,
}

impl Message {
    /// Create an empty text message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the message type.
    pub fn with_message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    /// Set the literal message body.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the vendor template identifier.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Set the template data map.
    pub fn with_data(mut self, data: HashMap<String, String>) -> Self {
        self.data = data;
        self
    }

    /// Add a single template data entry.
    pub fn with_data_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Restrict this send to the given gateways instead of the configured
    /// defaults.
    pub fn with_gateways(mut self, gateways: Vec<String>) -> Self {
        self.gateways = gateways;
        self
    }

    /// The message type.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The literal message body, if set.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// The vendor template identifier, if set.
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// The template data map.
    pub fn data(&self) -> &HashMap<String, String> {
        &self.data
    }

    /// Explicit gateways for this message; empty means use the defaults.
    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }
}
