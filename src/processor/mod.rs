pub mod python;
pub mod schema;

pub use python::SubprocessDataProcessor;
pub use schema::{parse_transform_output, Schema, SchemaKind};
