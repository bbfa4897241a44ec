use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::case::{is_reserved_word, to_camel_case, to_pascal_case};
use crate::diagnostics::{Diagnostics, IssueKind};

/// An emission scope. Identifiers are unique within one scope only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// Package-level declarations: types, enum constants, helper functions
    Package,
    /// Fields of one declared struct (keyed by the struct identifier)
    Fields(String),
    /// Positional arguments of one method (keyed by the method identifier)
    Params(String),
    /// Client and server method names
    Methods,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Package => f.write_str("package"),
            Scope::Fields(owner) => write!(f, "fields of {owner}"),
            Scope::Params(method) => write!(f, "arguments of {method}"),
            Scope::Methods => f.write_str("methods"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentCase {
    /// Types, fields, constants, methods
    Pascal,
    /// Parameters and locals
    Camel,
}

#[derive(Debug, Default)]
struct ScopeTable {
    taken: HashSet<String>,
    /// Lower-cased names that can never be handed out as-is
    reserved: HashSet<String>,
}

impl ScopeTable {
    fn is_free(&self, ident: &str) -> bool {
        !self.taken.contains(ident) && !self.reserved.contains(&ident.to_lowercase())
    }
}

/// Deterministic, collision-free identifier assignment.
///
/// One allocator lives for exactly one generation pass and is threaded through
/// every stage via [`GenerationContext`](crate::context::GenerationContext).
/// Given the same sequence of requests it always hands out the same names;
/// callers are responsible for issuing requests in a stable (sorted) order.
#[derive(Debug, Default)]
pub struct IdentifierAllocator {
    scopes: BTreeMap<Scope, ScopeTable>,
}

impl IdentifierAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block names in a scope (compared case-insensitively). Used for the
    /// emitter's own declarations and for keywords.
    pub fn reserve<I, S>(&mut self, scope: &Scope, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let table = self.scopes.entry(scope.clone()).or_default();
        for name in names {
            table.reserved.insert(name.as_ref().to_lowercase());
        }
    }

    /// Mark an already-decided identifier as used without allocating.
    pub fn claim(&mut self, scope: &Scope, ident: &str) {
        self.scopes
            .entry(scope.clone())
            .or_default()
            .taken
            .insert(ident.to_string());
    }

    pub fn is_taken(&self, scope: &Scope, ident: &str) -> bool {
        self.scopes
            .get(scope)
            .map(|t| !t.is_free(ident))
            .unwrap_or(false)
    }

    /// Normalize `original` into the requested case and make it unique in `scope`.
    pub fn allocate(
        &mut self,
        scope: &Scope,
        original: &str,
        case: IdentCase,
        diagnostics: &mut Diagnostics,
    ) -> String {
        let base = normalize_identifier(original, case);
        self.allocate_normalized(scope, base, original, diagnostics)
    }

    /// Make an identifier that was composed by the caller (already in the
    /// target case, e.g. `StatusAvailable`) unique in `scope`.
    pub fn allocate_normalized(
        &mut self,
        scope: &Scope,
        base: String,
        original: &str,
        diagnostics: &mut Diagnostics,
    ) -> String {
        let table = self.scopes.entry(scope.clone()).or_default();
        if table.is_free(&base) {
            table.taken.insert(base.clone());
            return base;
        }

        let mut n = 2usize;
        let ident = loop {
            let candidate = format!("{base}{n}");
            if table.is_free(&candidate) {
                break candidate;
            }
            n += 1;
        };
        table.taken.insert(ident.clone());

        diagnostics.info(
            IssueKind::NamingCollisionResolved,
            scope.to_string(),
            format!("'{original}' renamed to {ident} ({base} is already in use)"),
        );
        ident
    }

    /// All identifiers handed out in a scope, sorted.
    pub fn identifiers(&self, scope: &Scope) -> Vec<String> {
        let mut idents: Vec<String> = self
            .scopes
            .get(scope)
            .map(|t| t.taken.iter().cloned().collect())
            .unwrap_or_default();
        idents.sort();
        idents
    }
}

/// Turn an arbitrary UTF-8 name into a valid Go identifier in the given case.
///
/// Leading digits get an `N`/`n` prefix, PascalCase identifiers whose first
/// letter has no upper-case form get an `X` prefix so they stay exported,
/// empty results become `Empty`/`empty`, and camelCase identifiers that hit a
/// reserved word get a trailing `_`.
pub fn normalize_identifier(original: &str, case: IdentCase) -> String {
    let mut ident = match case {
        IdentCase::Pascal => to_pascal_case(original),
        IdentCase::Camel => to_camel_case(original),
    };

    if ident.is_empty() {
        ident = match case {
            IdentCase::Pascal => "Empty".to_string(),
            IdentCase::Camel => "empty".to_string(),
        };
    }

    match (ident.chars().next(), case) {
        (Some(c), IdentCase::Pascal) if c.is_ascii_digit() => ident.insert(0, 'N'),
        (Some(c), IdentCase::Camel) if c.is_ascii_digit() => ident.insert(0, 'n'),
        (Some(c), IdentCase::Pascal) if !c.is_uppercase() => ident.insert(0, 'X'),
        _ => {}
    }

    if case == IdentCase::Camel && is_reserved_word(&ident) {
        ident.push('_');
    }

    ident
}
