//! Field contracts for the record kinds served by Lexiflow
//!
//! The server checks these before writing a record and the client checks
//! them again on arrival.

use crate::shape::{DomainShape, ShapeContract};
use lexiflow_common::{Evaluation, ProductListing, VocabularyItem};

pub fn vocabulary_contract() -> ShapeContract {
    ShapeContract::new().require_string("word").require_string("meaning")
}

pub fn product_contract() -> ShapeContract {
    ShapeContract::new().require_string("name").require_array("tags")
}

pub fn evaluation_contract() -> ShapeContract {
    ShapeContract::new().require_string("feedback").require_any("band")
}

pub fn vocabulary_shape() -> DomainShape<VocabularyItem> {
    DomainShape::new("vocabulary", vocabulary_contract())
}

pub fn product_shape() -> DomainShape<ProductListing> {
    DomainShape::new("product", product_contract())
}

pub fn evaluation_shape() -> DomainShape<Evaluation> {
    DomainShape::new("evaluation", evaluation_contract())
}
