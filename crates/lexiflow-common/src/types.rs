//! Record types delivered over the streaming endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A vocabulary entry for a learner (English headword, Vietnamese meaning)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub example: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
}

/// A product suggestion (course, book, subscription)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListing {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Grading of a written or spoken IELTS answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Band score; models emit it as either a number or a string
    pub band: Value,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

/// Payload of a `data` event frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePayload {
    pub key: String,
    pub content: Value,
}

impl FramePayload {
    /// Content as text, if the fragment is a JSON string
    pub fn text(&self) -> Option<&str> {
        self.content.as_str()
    }
}
