//! OpenAPI 3.x / Swagger 2.0 to Go code generation.
//!
//! [`pipeline::generate`] turns a parsed [`parsers::Document`] and a
//! [`config::GenerationConfig`] into named Go source artifacts plus a flat
//! list of issues. The pass is synchronous and owns all of its state, so
//! independent passes can run on separate threads.

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod generators;
pub mod naming;
pub mod operation_processor;
pub mod parsers;
pub mod pipeline;
pub mod schema_processor;
pub mod security_processor;
pub mod split_planner;

pub use config::{Config, GenerationConfig};
pub use diagnostics::{Issue, IssueKind, Severity};
pub use error::{Error, Result};
pub use generators::{Artifact, Generator, GeneratorRegistry};
pub use pipeline::{generate, generate_from_config, generate_with, GenerationOutput};
