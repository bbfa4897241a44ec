//! Go emitter.
//!
//! Views are computed in Rust; the embedded tera templates only loop over
//! them and interpolate. Every artifact gets the generated-code header, the
//! package clause and exactly the imports its body uses.

pub mod client;
pub mod security;
pub mod types;

use serde::Serialize;
use tera::{Context, Tera};

use super::{Artifact, Generator};
use crate::config::GenerationConfig;
use crate::error::Result;
use crate::naming::{IdentifierAllocator, Scope};
use crate::pipeline::GenerationPlan;
use crate::schema_processor::TypeKind;
use crate::split_planner::CLIENT_ARTIFACT;
use client::{ClientMethodView, OperationRenderer, ParamsView, RouteView};
use security::{FuncView, OAuth2View, OidcView, ProviderView, RequirementView};
use types::{go_string, mapped_type, DeclView, TypeRenderer};

pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

const TEMPLATES: &[(&str, &str)] = &[
    ("types.go", include_str!("../../../templates/golang/types.go.tera")),
    ("client.go", include_str!("../../../templates/golang/client.go.tera")),
    ("server.go", include_str!("../../../templates/golang/server.go.tera")),
    (
        "security_helpers.go",
        include_str!("../../../templates/golang/security_helpers.go.tera"),
    ),
    (
        "credentials.go",
        include_str!("../../../templates/golang/credentials.go.tera"),
    ),
    (
        "security_enforce.go",
        include_str!("../../../templates/golang/security_enforce.go.tera"),
    ),
    ("oauth2.go", include_str!("../../../templates/golang/oauth2.go.tera")),
    (
        "oidc_discovery.go",
        include_str!("../../../templates/golang/oidc_discovery.go.tera"),
    ),
];

/// Package-level names the emitted code declares.
const PACKAGE_DECLARATIONS: &[&str] = &[
    // client
    "DefaultUserAgent",
    "DefaultServerURL",
    "HttpRequestDoer",
    "RequestEditorFn",
    "Client",
    "ClientOption",
    "NewClient",
    "WithHTTPClient",
    "WithBaseURL",
    "WithUserAgent",
    "WithRequestEditorFn",
    "APIError",
    "decodeResponse",
    "paramString",
    "encodePathParam",
    // server
    "ServerInterface",
    "RegisterHandlers",
    "errMissingParam",
    "writeParamError",
    "cookieValues",
    "pathPart",
    "parseParam",
    // unions
    "ErrMissingDiscriminator",
    "ErrUnknownDiscriminator",
    "setDiscriminator",
    // security
    "SecurityAlternative",
    "OperationSecurity",
    "OperationSecurityRequirements",
    "ErrUnauthorized",
    "Authorize",
    "satisfiesAlternative",
    "requireEnv",
];

/// Fields and helper methods of `Client`; operations may not take them.
const CLIENT_MEMBERS: &[&str] = &[
    "Server",
    "HTTPClient",
    "UserAgent",
    "RequestEditors",
    "newRequest",
    "do",
];

/// Standard library packages the templates and views may use, keyed by
/// their qualifier.
const STD_PACKAGES: &[(&str, &str)] = &[
    ("bytes", "bytes"),
    ("context", "context"),
    ("encoding", "encoding"),
    ("json", "encoding/json"),
    ("errors", "errors"),
    ("fmt", "fmt"),
    ("io", "io"),
    ("http", "net/http"),
    ("url", "net/url"),
    ("os", "os"),
    ("strconv", "strconv"),
    ("strings", "strings"),
    ("sync", "sync"),
    ("time", "time"),
];

pub struct GolangGenerator;

impl Generator for GolangGenerator {
    fn name(&self) -> &str {
        "golang"
    }

    fn file_extension(&self) -> &str {
        "go"
    }

    fn reserve_identifiers(&self, allocator: &mut IdentifierAllocator) {
        allocator.reserve(&Scope::Package, PACKAGE_DECLARATIONS);
        allocator.reserve(&Scope::Methods, CLIENT_MEMBERS);
    }

    fn render(&self, plan: &GenerationPlan<'_>, config: &GenerationConfig) -> Result<Vec<Artifact>> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())?;
        tera.autoescape_on(vec![]);

        let emitter = Emitter {
            plan,
            config,
            tera,
            mapped_imports: config
                .type_mapping
                .values()
                .filter_map(|spec| match mapped_type(spec) {
                    (expr, Some(path)) => {
                        let qualifier = expr.split('.').next().unwrap_or_default().to_string();
                        Some((qualifier, path))
                    }
                    _ => None,
                })
                .collect(),
        };
        emitter.render_all()
    }
}

#[derive(Serialize)]
struct TypesView {
    support: bool,
    decls: Vec<DeclView>,
}

#[derive(Serialize)]
struct ClientView<'a> {
    base: bool,
    title: &'a str,
    user_agent: String,
    server_url: Option<String>,
    params: Vec<ParamsView>,
    methods: Vec<ClientMethodView>,
}

#[derive(Serialize)]
struct ServerView<'a> {
    title: &'a str,
    params: Vec<ParamsView>,
    routes: Vec<RouteView>,
}

#[derive(Serialize)]
struct ProvidersView {
    providers: Vec<ProviderView>,
}

#[derive(Serialize)]
struct FunctionsView {
    functions: Vec<FuncView>,
}

#[derive(Serialize)]
struct EnforcementView {
    requirements: Vec<RequirementView>,
}

struct Emitter<'p, 'd> {
    plan: &'p GenerationPlan<'d>,
    config: &'p GenerationConfig,
    tera: Tera,
    /// (qualifier, import path) of user-mapped types
    mapped_imports: Vec<(String, String)>,
}

impl Emitter<'_, '_> {
    fn render_all(&self) -> Result<Vec<Artifact>> {
        let plan = self.plan;
        let toggles = &self.config.generate;
        let mut artifacts = Vec::new();

        if toggles.types {
            artifacts.extend(self.render_types()?);
        }
        if toggles.client {
            artifacts.extend(self.render_client()?);
        }
        if toggles.server {
            artifacts.push(self.render_server()?);
        }

        let security = &plan.security;
        if !security.bindings.is_empty() {
            let view = ProvidersView {
                providers: security.bindings.iter().map(security::provider).collect(),
            };
            artifacts.push(self.render("security_helpers", "security_helpers.go", &view)?);
        }
        for oauth in &security.oauth2 {
            let view: OAuth2View = security::oauth2(oauth);
            artifacts.push(self.render(&oauth.artifact, "oauth2.go", &view)?);
        }
        if !security.credentials.is_empty() {
            let view = FunctionsView {
                functions: security.credentials.iter().map(security::credential).collect(),
            };
            artifacts.push(self.render("credentials", "credentials.go", &view)?);
        }
        if !security.enforcement.is_empty() {
            let view = EnforcementView {
                requirements: security.enforcement.iter().map(security::requirement).collect(),
            };
            artifacts.push(self.render("security_enforce", "security_enforce.go", &view)?);
        }
        if let Some(oidc) = &security.oidc {
            let view: OidcView = security::oidc(oidc);
            artifacts.push(self.render("oidc_discovery", "oidc_discovery.go", &view)?);
        }

        tracing::debug!(artifacts = artifacts.len(), "rendered Go artifacts");
        Ok(artifacts)
    }

    fn render_types(&self) -> Result<Vec<Artifact>> {
        let graph = &self.plan.graph;
        let renderer = TypeRenderer::new(
            graph,
            self.config.optional_pointers,
            self.config.emit_validation,
        );
        let needs_support = graph.nodes().iter().any(|node| {
            node.name.is_some()
                && matches!(&node.kind, TypeKind::Union(u) if u.discriminator.is_some())
        });

        self.plan
            .split
            .types
            .iter()
            .enumerate()
            .map(|(index, unit)| {
                let view = TypesView {
                    support: index == 0 && needs_support,
                    decls: unit.types.iter().filter_map(|id| renderer.decl(*id)).collect(),
                };
                self.render(&unit.artifact, "types.go", &view)
            })
            .collect()
    }

    fn client_view(&self, base: bool, operations: &[usize]) -> ClientView<'_> {
        let renderer = OperationRenderer::new(&self.plan.graph);
        let ops: Vec<_> = operations
            .iter()
            .filter_map(|i| self.plan.operations.get(*i))
            .collect();
        ClientView {
            base,
            title: &self.plan.document.info.title,
            user_agent: go_string(
                self.config
                    .user_agent
                    .as_deref()
                    .unwrap_or(&format!("oapi-go-gen/{GENERATOR_VERSION}")),
            ),
            server_url: self.plan.document.base_url.as_deref().map(go_string),
            params: ops.iter().filter_map(|op| renderer.params_struct(op)).collect(),
            methods: ops.iter().map(|op| renderer.client_method(op)).collect(),
        }
    }

    fn render_client(&self) -> Result<Vec<Artifact>> {
        let split = &self.plan.split;
        let mut artifacts = vec![self.render(
            CLIENT_ARTIFACT,
            "client.go",
            &self.client_view(true, &split.base_operations),
        )?];
        for unit in &split.client_units {
            artifacts.push(self.render(
                &unit.artifact,
                "client.go",
                &self.client_view(false, &unit.operations),
            )?);
        }
        Ok(artifacts)
    }

    fn render_server(&self) -> Result<Artifact> {
        let renderer = OperationRenderer::new(&self.plan.graph);
        let operations = &self.plan.operations;
        // Parameter structs live with the client when there is one
        let params = if self.config.generate.client {
            Vec::new()
        } else {
            operations
                .iter()
                .filter_map(|op| renderer.params_struct(op))
                .collect()
        };
        let view = ServerView {
            title: &self.plan.document.info.title,
            params,
            routes: operations.iter().map(|op| renderer.route(op)).collect(),
        };
        self.render("server", "server.go", &view)
    }

    fn render(&self, artifact: &str, template: &str, view: &impl Serialize) -> Result<Artifact> {
        let context = Context::from_serialize(view)?;
        let body = self.tera.render(template, &context)?;
        Ok(Artifact {
            name: artifact.to_string(),
            content: self.assemble(&body),
        })
    }

    /// Header, package clause and imports, then the body.
    fn assemble(&self, body: &str) -> String {
        let info = &self.plan.document.info;
        let source = format!("{} {}", info.title, info.version);
        let source = source.lines().next().unwrap_or_default().trim();

        let mut out = format!(
            "// Code generated by oapi-go-gen {GENERATOR_VERSION}. DO NOT EDIT.\n// Source: {source}\n\npackage {}\n",
            self.config.package.trim()
        );

        let imports = imports_for(body, &self.mapped_imports);
        if !imports.is_empty() {
            out.push_str("\nimport (\n");
            for path in imports {
                out.push_str(&format!("\t\"{path}\"\n"));
            }
            out.push_str(")\n");
        }
        out.push('\n');
        out.push_str(body);
        tidy(&out)
    }
}

/// Import paths whose qualifier appears in code (not in comments or
/// string literals), sorted.
pub fn imports_for(body: &str, mapped: &[(String, String)]) -> Vec<String> {
    let code = strip_comments_and_strings(body);
    let mut imports: Vec<String> = STD_PACKAGES
        .iter()
        .map(|(q, p)| (q.to_string(), p.to_string()))
        .chain(mapped.iter().cloned())
        .filter(|(qualifier, _)| uses_qualifier(&code, qualifier))
        .map(|(_, path)| path)
        .collect();
    imports.sort();
    imports.dedup();
    imports
}

fn uses_qualifier(code: &str, qualifier: &str) -> bool {
    let needle = format!("{qualifier}.");
    code.match_indices(&needle).any(|(at, _)| {
        code[..at]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '.'))
    })
}

/// Blank out `//` comments and string/rune literal contents.
fn strip_comments_and_strings(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '"' | '\'' => {
                out.push(' ');
                while let Some(next) = chars.next() {
                    match next {
                        '\\' => {
                            chars.next();
                        }
                        '\n' => {
                            out.push('\n');
                            break;
                        }
                        _ if next == c => break,
                        _ => {}
                    }
                }
                out.push(' ');
            }
            '`' => {
                out.push(' ');
                for next in chars.by_ref() {
                    if next == '`' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Trim trailing whitespace, collapse blank runs and drop blank lines
/// directly inside braces.
pub fn tidy(source: &str) -> String {
    let lines: Vec<&str> = source.lines().map(str::trim_end).collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            let previous = out.last().copied().unwrap_or("");
            let next = lines[i + 1..]
                .iter()
                .find(|l| !l.is_empty())
                .map(|l| l.trim_start())
                .unwrap_or("");
            if out.is_empty()
                || previous.is_empty()
                || previous.ends_with('{')
                || previous.ends_with('(')
                || next.starts_with('}')
                || next.starts_with(')')
                || next.is_empty()
            {
                continue;
            }
        }
        out.push(line);
    }
    let mut text = out.join("\n");
    text.push('\n');
    text
}
