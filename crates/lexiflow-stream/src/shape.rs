//! Shape contracts: the minimal fields a record needs to count as valid
//!
//! The validator produces untyped JSON objects; a [`RecordShape`] turns each
//! one into a typed record or a [`Rejection`]. Everything downstream of this
//! boundary works with strongly shaped values.

use crate::record::EventFrame;
use crate::validator::Rejection;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// What a required field must hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A string that is not blank
    String,
    /// An array with at least one element
    Array,
    /// Any value other than null or a blank string
    Any,
}

#[derive(Debug, Clone, PartialEq)]
struct RequiredField {
    name: String,
    kind: FieldKind,
}

/// Required, non-empty fields for one record kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeContract {
    fields: Vec<RequiredField>,
}

impl ShapeContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(RequiredField {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn require_string(self, name: impl Into<String>) -> Self {
        self.require(name, FieldKind::String)
    }

    pub fn require_array(self, name: impl Into<String>) -> Self {
        self.require(name, FieldKind::Array)
    }

    pub fn require_any(self, name: impl Into<String>) -> Self {
        self.require(name, FieldKind::Any)
    }

    /// Check `object` against every required field
    pub fn check(&self, object: &Map<String, Value>) -> Result<(), Rejection> {
        for field in &self.fields {
            let present = match (object.get(&field.name), field.kind) {
                (Some(Value::String(s)), FieldKind::String | FieldKind::Any) => !s.trim().is_empty(),
                (Some(Value::Array(items)), FieldKind::Array) => !items.is_empty(),
                (Some(Value::Null) | None, _) => false,
                (Some(_), FieldKind::Any) => true,
                (Some(_), _) => false,
            };
            if !present {
                return Err(Rejection::Shape(format!(
                    "missing or empty field '{}'",
                    field.name
                )));
            }
        }
        Ok(())
    }
}

/// Converts a validated JSON object into a typed record
pub trait RecordShape: Send + Sync {
    type Record: Send;

    /// Short label for logs
    fn kind(&self) -> &str;

    fn accept(&self, object: Map<String, Value>) -> Result<Self::Record, Rejection>;
}

/// A domain record: contract check, then deserialization into `T`
pub struct DomainShape<T> {
    kind: String,
    contract: ShapeContract,
    _record: PhantomData<fn() -> T>,
}

impl<T> DomainShape<T> {
    pub fn new(kind: impl Into<String>, contract: ShapeContract) -> Self {
        Self {
            kind: kind.into(),
            contract,
            _record: PhantomData,
        }
    }
}

impl<T> Clone for DomainShape<T> {
    fn clone(&self) -> Self {
        Self::new(self.kind.clone(), self.contract.clone())
    }
}

impl<T> RecordShape for DomainShape<T>
where
    T: DeserializeOwned + Send,
{
    type Record = T;

    fn kind(&self) -> &str {
        &self.kind
    }

    fn accept(&self, object: Map<String, Value>) -> Result<T, Rejection> {
        self.contract.check(&object)?;
        serde_json::from_value(Value::Object(object)).map_err(|e| Rejection::Shape(e.to_string()))
    }
}

/// Event frames: tag `e` must be one of `start`, `data`, `end`, `error`
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameShape;

impl RecordShape for FrameShape {
    type Record = EventFrame;

    fn kind(&self) -> &str {
        "frame"
    }

    fn accept(&self, object: Map<String, Value>) -> Result<EventFrame, Rejection> {
        if !object.contains_key("e") {
            return Err(Rejection::Shape("missing tag field 'e'".to_string()));
        }
        let frame: EventFrame = serde_json::from_value(Value::Object(object))
            .map_err(|e| Rejection::Shape(e.to_string()))?;
        if let EventFrame::Data { key, .. } = &frame {
            if key.trim().is_empty() {
                return Err(Rejection::Shape("data frame with empty key".to_string()));
            }
        }
        Ok(frame)
    }
}
