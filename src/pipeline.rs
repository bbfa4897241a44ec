//! One generation pass: document + configuration -> artifacts + issues.
//!
//! Stages run in a fixed order on one [`GenerationContext`]: the generator
//! reserves its own names, component schemas are resolved, operations are
//! bound (resolving their inline schemas), security is compiled, output units
//! are planned and finally rendered. Nothing here touches the filesystem
//! except [`load_document`], which the CLI and [`generate_from_config`] use.

use serde::Serialize;

use crate::config::{Config, GenerationConfig, InputConfig};
use crate::context::GenerationContext;
use crate::diagnostics::{Issue, Severity};
use crate::error::{Error, Result};
use crate::generators::{Artifact, Generator, GolangGenerator};
use crate::operation_processor::{bind_operations, OperationBinding};
use crate::parsers::{parse_yaml, Document, ParserRegistry};
use crate::schema_processor::{TypeGraph, TypeResolver};
use crate::security_processor::{compile_security, SecurityPlan};
use crate::split_planner::{plan_split, SplitPlan};

/// Everything a generator needs to render. Produced once identifier
/// allocation is complete, so names in here are final.
#[derive(Debug)]
pub struct GenerationPlan<'d> {
    pub document: &'d Document,
    pub graph: TypeGraph,
    pub operations: Vec<OperationBinding>,
    pub security: SecurityPlan,
    pub split: SplitPlan,
}

/// Result of one pass: the artifacts in emission order plus the issues.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutput {
    pub artifacts: Vec<Artifact>,
    pub issues: Vec<Issue>,
}

impl GenerationOutput {
    /// No Critical issue was recorded.
    pub fn is_success(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    pub fn artifact(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    /// Issues that fail a strict pass.
    pub fn blocking_issue_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity >= Severity::Warning)
            .count()
    }
}

/// Run one pass with the Go generator.
pub fn generate(document: &Document, config: &GenerationConfig) -> Result<GenerationOutput> {
    generate_with(&GolangGenerator, document, config)
}

/// Run one pass with any generator.
///
/// Configuration errors fail before any work. Otherwise the pass always runs
/// to completion; in strict mode a Warning-or-worse issue turns the output
/// into [`Error::Strict`], which still carries it.
pub fn generate_with(
    generator: &dyn Generator,
    document: &Document,
    config: &GenerationConfig,
) -> Result<GenerationOutput> {
    config.validate()?;
    generator.validate_config(config)?;

    let mut ctx = GenerationContext::new(config);
    generator.reserve_identifiers(&mut ctx.allocator);

    let mut resolver = TypeResolver::new(document);
    resolver.resolve_components(&mut ctx);
    let operations = bind_operations(document, &mut resolver, &mut ctx);
    let graph = resolver.finish(&mut ctx);
    tracing::info!(
        types = graph.named().len(),
        operations = operations.len(),
        "resolved types and bound operations"
    );

    let security = compile_security(document, &operations, &mut ctx);
    let split = plan_split(&graph, &operations, &config.split);

    let plan = GenerationPlan {
        document,
        graph,
        operations,
        security,
        split,
    };
    let artifacts = generator.render(&plan, config)?;

    let strict_failure = config.strict && ctx.diagnostics.has_at_least(Severity::Warning);
    let output = GenerationOutput {
        artifacts,
        issues: ctx.diagnostics.into_issues(config.include_info),
    };
    tracing::info!(
        artifacts = output.artifacts.len(),
        issues = output.issues.len(),
        success = output.is_success(),
        "generation finished"
    );

    if strict_failure {
        return Err(Error::Strict(Box::new(output)));
    }
    Ok(output)
}

/// Read the document an [`InputConfig`] points at, or parse the inline one.
pub fn load_document(input: &InputConfig) -> Result<Document> {
    let registry = ParserRegistry::new();
    let format = input.format.as_deref();
    match (&input.source, &input.document) {
        (Some(source), None) => registry.parse_file(source, format),
        (None, Some(inline)) => {
            let text = serde_yaml::to_string(inline)?;
            registry.parse_value(parse_yaml(&text)?, format)
        }
        (Some(_), Some(_)) => Err(Error::config(
            "input.source and input.document are mutually exclusive",
        )),
        (None, None) => Err(Error::config("no input: set input.source or input.document")),
    }
}

/// Validate a full configuration, load its input and run one pass.
pub fn generate_from_config(config: &Config) -> Result<GenerationOutput> {
    config.validate()?;
    let input = config
        .input
        .as_ref()
        .ok_or_else(|| Error::config("no input: set input.source or input.document"))?;
    let document = load_document(input)?;
    generate(&document, &config.generation)
}
