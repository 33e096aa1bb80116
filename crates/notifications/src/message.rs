use serde::{Deserialize, Serialize};

use till_core::ValueObject;

/// The closed notification taxonomy. Presentation picks icon and colour from it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    InvalidInput,
    Success,
    Unknown,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::InvalidInput => "InvalidInput",
            MessageKind::Success => "Success",
            MessageKind::Unknown => "Unknown",
        }
    }

    /// Look up a taxonomy member by its wire name.
    pub fn from_type(kind: &str) -> Option<Self> {
        match kind {
            "InvalidInput" => Some(MessageKind::InvalidInput),
            "Success" => Some(MessageKind::Success),
            "Unknown" => Some(MessageKind::Unknown),
            _ => None,
        }
    }
}

impl core::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One notification. Immutable once created.
///
/// On the wire every variant is `{"type": ..., "message": ...}`. `Opaque`
/// carries a pre-shaped error forwarded from elsewhere whose `type` is not
/// part of the taxonomy; it is kept verbatim so nothing is lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireMessage", into = "WireMessage")]
pub enum Message {
    InvalidInput(String),
    Success(String),
    Unknown(String),
    Opaque { kind: String, text: String },
}

impl Message {
    pub fn invalid_input(text: impl Into<String>) -> Self {
        Self::InvalidInput(text.into())
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::Success(text.into())
    }

    pub fn unknown(text: impl Into<String>) -> Self {
        Self::Unknown(text.into())
    }

    /// Build from a `type`/`message` pair, mapping taxonomy names onto their
    /// variants and everything else onto `Opaque`.
    pub fn from_parts(kind: impl Into<String>, text: impl Into<String>) -> Self {
        let kind = kind.into();
        let text = text.into();
        match MessageKind::from_type(&kind) {
            Some(MessageKind::InvalidInput) => Self::InvalidInput(text),
            Some(MessageKind::Success) => Self::Success(text),
            Some(MessageKind::Unknown) => Self::Unknown(text),
            None => Self::Opaque { kind, text },
        }
    }

    /// The wire `type` of this message.
    pub fn kind(&self) -> &str {
        match self {
            Message::InvalidInput(_) => MessageKind::InvalidInput.as_str(),
            Message::Success(_) => MessageKind::Success.as_str(),
            Message::Unknown(_) => MessageKind::Unknown.as_str(),
            Message::Opaque { kind, .. } => kind,
        }
    }

    /// Taxonomy member, or `None` for an opaque pass-through.
    pub fn taxonomy(&self) -> Option<MessageKind> {
        match self {
            Message::InvalidInput(_) => Some(MessageKind::InvalidInput),
            Message::Success(_) => Some(MessageKind::Success),
            Message::Unknown(_) => Some(MessageKind::Unknown),
            Message::Opaque { .. } => None,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Message::InvalidInput(text)
            | Message::Success(text)
            | Message::Unknown(text)
            | Message::Opaque { text, .. } => text,
        }
    }
}

impl ValueObject for Message {}

impl core::fmt::Display for Message {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.text())
    }
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Message::from_parts(wire.kind, wire.message)
    }
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        let kind = message.kind().to_string();
        let message = match message {
            Message::InvalidInput(text)
            | Message::Success(text)
            | Message::Unknown(text)
            | Message::Opaque { text, .. } => text,
        };
        WireMessage { kind, message }
    }
}
