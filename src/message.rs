use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// A message delivered by the transport. The payload is opaque: no schema
/// is assumed and no validation is performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Destination the message was delivered on
    pub destination: String,
    /// Transport-defined headers/properties, rendered as strings
    pub headers: BTreeMap<String, String>,
    /// Raw message body
    pub body: Vec<u8>,
}

impl InboundMessage {
    /// The body as text, with invalid UTF-8 replaced rather than rejected.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.destination)?;
        if !self.headers.is_empty() {
            let headers = serde_json::to_string(&self.headers).map_err(|_| fmt::Error)?;
            write!(f, " {headers}")?;
        }
        write!(f, " {}", self.body_text())
    }
}
