//! Event frames for conversational streaming
//!
//! Wire form, one object per line:
//! `{"e":"start"}`, `{"e":"data","k":<key>,"c":<content>}`, `{"e":"end"}`,
//! and `{"e":"error","message":<text>}` when generation broke off after
//! output had already been sent.

use lexiflow_common::FramePayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "e", rename_all = "lowercase")]
pub enum EventFrame {
    Start,
    Data {
        #[serde(rename = "k", alias = "key")]
        key: String,
        #[serde(rename = "c", alias = "content")]
        content: Value,
    },
    End,
    Error {
        message: String,
    },
}

impl EventFrame {
    pub fn data(key: impl Into<String>, content: impl Into<Value>) -> Self {
        EventFrame::Data {
            key: key.into(),
            content: content.into(),
        }
    }

    /// Serialized frame followed by the line terminator
    pub fn to_line(&self) -> String {
        // Serializing a derived enum of strings and JSON values cannot fail
        let mut line = serde_json::to_string(self).unwrap_or_default();
        line.push('\n');
        line
    }

    /// Unwrap a `data` frame into the payload handed to application code
    pub fn into_payload(self) -> Option<FramePayload> {
        match self {
            EventFrame::Data { key, content } => Some(FramePayload { key, content }),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            EventFrame::Start => "start",
            EventFrame::Data { .. } => "data",
            EventFrame::End => "end",
            EventFrame::Error { .. } => "error",
        }
    }
}
