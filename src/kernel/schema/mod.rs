//! Schema document → typed field descriptors.
//!
//! The schema is an ordered JSON document supplied once per session. Nothing
//! here performs I/O; fetching the document is the caller's job.

pub mod descriptor;
pub mod interpreter;
pub mod kind;

pub use descriptor::{FieldDescriptor, FieldSpec};
pub use interpreter::{interpret, interpret_section};
pub use kind::{normalize_tag, FieldKind};
