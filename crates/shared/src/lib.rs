//! Vocabulary shared between the annotation core and its front ends: identifiers,
//! object types, and the JSON records exchanged with the course backend.

pub mod domain;
pub mod error;
pub mod protocol;
