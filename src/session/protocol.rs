//! Wire format of the `/ws` endpoint.
//!
//! ## Message Format:
//! - **Client -> Server, binary**: one complete WAV utterance
//! - **Client -> Server, text**: `{"text": "Wie wird das Wetter morgen?"}`; text
//!   that is not JSON is taken as the query itself
//! - **Server -> Client**: `{"type": "transcription", "text": ...}` or
//!   `{"type": "error", "message": ...}`

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sent after an empty transcript in place of an analysis.
pub const NO_SPEECH_NOTICE: &str = "Keine Sprache erkannt.";

/// One frame received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Raw bytes of one utterance
    Audio(Vec<u8>),
    /// Raw text frame, not yet parsed
    Text(String),
}

impl InboundFrame {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundFrame::Audio(_) => "audio",
            InboundFrame::Text(_) => "text",
        }
    }
}

/// Message sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Transcription { text: String },
    Error { message: String },
}

impl OutboundMessage {
    pub fn transcription(text: impl Into<String>) -> Self {
        OutboundMessage::Transcription { text: text.into() }
    }
}

/// The one place where frame failures become client-visible messages.
impl From<SessionError> for OutboundMessage {
    fn from(err: SessionError) -> Self {
        OutboundMessage::Error {
            message: err.to_string(),
        }
    }
}

/// Extract the query text from a text frame.
///
/// ## Accepted shapes:
/// - `{"text": "..."}`: the `text` field
/// - a JSON string literal: its content
/// - anything that is not JSON: the frame as-is
///
/// A JSON object without a string `text` field (or any other JSON value) is a
/// malformed frame.
pub fn parse_text_frame(raw: &str) -> Result<String, SessionError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => match fields.get("text") {
            Some(Value::String(text)) => Ok(text.clone()),
            _ => Err(SessionError::MalformedFrame(
                "expected a string field \"text\"".to_string(),
            )),
        },
        Ok(Value::String(text)) => Ok(text),
        Ok(_) => Err(SessionError::MalformedFrame(
            "expected a JSON object with a \"text\" field".to_string(),
        )),
        Err(_) => Ok(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_wire_shapes() {
        let json = serde_json::to_value(OutboundMessage::transcription("hallo")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "transcription", "text": "hallo"}));

        let json = serde_json::to_value(OutboundMessage::from(SessionError::EngineUnavailable))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "error", "message": "Speech recognition not available"})
        );
    }

    #[test]
    fn test_parse_json_text_frame() {
        assert_eq!(
            parse_text_frame(r#"{"text": "Wetter in Bonn"}"#).unwrap(),
            "Wetter in Bonn"
        );
    }

    #[test]
    fn test_parse_plain_text_frame() {
        assert_eq!(parse_text_frame("Wetter heute").unwrap(), "Wetter heute");
        assert_eq!(parse_text_frame(r#""Wetter heute""#).unwrap(), "Wetter heute");
    }

    #[test]
    fn test_parse_rejects_object_without_text() {
        assert!(matches!(
            parse_text_frame(r#"{"query": "Wetter"}"#),
            Err(SessionError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_text_frame(r#"{"text": 42}"#),
            Err(SessionError::MalformedFrame(_))
        ));
        assert!(matches!(parse_text_frame("[1, 2]"), Err(SessionError::MalformedFrame(_))));
    }

    #[test]
    fn test_frame_kind() {
        assert_eq!(InboundFrame::Audio(vec![]).kind(), "audio");
        assert_eq!(InboundFrame::Text(String::new()).kind(), "text");
    }
}
