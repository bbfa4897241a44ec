//! Effective security requirements per operation.
//!
//! An operation's own `security` list replaces the document default; an
//! empty list or an empty alternative means no credentials are needed.
//! Alternatives naming an undeclared scheme can never be satisfied and are
//! dropped.

use serde::Serialize;

use crate::context::GenerationContext;
use crate::diagnostics::IssueKind;
use crate::operation_processor::OperationBinding;
use crate::parsers::{Document, SecurityRequirement};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemeScopes {
    pub scheme_name: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationSecurity {
    pub method_name: String,
    /// Each inner list must be satisfied together; any one list suffices
    pub alternatives: Vec<Vec<SchemeScopes>>,
    /// Callable without credentials
    pub anonymous: bool,
    /// Requirements come from the document default
    pub inherited: bool,
}

#[derive(Debug, Clone, Default)]
struct Resolved {
    alternatives: Vec<Vec<SchemeScopes>>,
    anonymous: bool,
}

pub fn resolve_requirements(
    document: &Document,
    operations: &[OperationBinding],
    ctx: &mut GenerationContext,
) -> Vec<OperationSecurity> {
    // Reported once at the document level, not per inheriting operation
    let defaults = resolve(document, &document.security, "#/security", ctx);

    operations
        .iter()
        .map(|op| {
            let (resolved, inherited) = match &op.security {
                Some(own) => (resolve(document, own, &op.location, ctx), false),
                None => (defaults.clone(), true),
            };
            OperationSecurity {
                method_name: op.method_name.clone(),
                alternatives: resolved.alternatives,
                anonymous: resolved.anonymous,
                inherited,
            }
        })
        .collect()
}

fn resolve(
    document: &Document,
    requirements: &[SecurityRequirement],
    location: &str,
    ctx: &mut GenerationContext,
) -> Resolved {
    let mut resolved = Resolved {
        alternatives: Vec::new(),
        anonymous: requirements.is_empty(),
    };

    for requirement in requirements {
        if requirement.is_empty() {
            resolved.anonymous = true;
            continue;
        }

        let undefined: Vec<&str> = requirement
            .keys()
            .filter(|name| !document.security_schemes.contains_key(*name))
            .map(String::as_str)
            .collect();
        if !undefined.is_empty() {
            ctx.diagnostics.error(
                IssueKind::UndefinedReference,
                location,
                format!(
                    "security requirement names undeclared scheme(s) {}; that alternative is dropped",
                    undefined.join(", ")
                ),
            );
            continue;
        }

        let mut alternative: Vec<SchemeScopes> = requirement
            .iter()
            .map(|(name, scopes)| SchemeScopes {
                scheme_name: name.clone(),
                scopes: scopes.clone(),
            })
            .collect();
        alternative.sort_by(|a, b| a.scheme_name.cmp(&b.scheme_name));
        if !resolved.alternatives.contains(&alternative) {
            resolved.alternatives.push(alternative);
        }
    }

    resolved
}
