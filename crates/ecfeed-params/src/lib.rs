//! Request configuration for the test-case generation service.
//!
//! Everything here is plain data: generator kinds, output templates, the
//! closed set of option values that travel inside a request, and the
//! per-generator parameter structs callers fill in.

pub mod generators;
pub mod options;
pub mod types;

pub use generators::{
    CartesianParams, CommonParams, GenerationRequest, GeneratorParams, NWiseParams,
    PairwiseParams, RandomParams, StaticParams,
};
pub use options::{serialize, serialize_entry, Choices, Constraints, OptionValue, TestSuites};
pub use types::{DataSource, TemplateType, UnknownVariant};
