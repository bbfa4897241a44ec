//! Security scheme compilation.
//!
//! Every declared scheme gets one provider (`<Scheme>Provider` /
//! `New<Scheme>Provider`) and an injection site. Token-flow clients, OIDC
//! discovery, environment credentials and the per-operation requirement table
//! are planned here as well when their toggles are on; rendering them is left
//! to the generator.

pub mod enforcement;

use std::collections::HashSet;

use serde::Serialize;

use crate::context::GenerationContext;
use crate::diagnostics::IssueKind;
use crate::naming::{
    normalize_identifier, to_pascal_case, to_screaming_snake_case, to_snake_case, IdentCase, Scope,
};
use crate::operation_processor::OperationBinding;
use crate::parsers::{ApiKeyLocation, Document, OAuthFlow, SecurityScheme, SecuritySchemeKind};

pub use enforcement::{resolve_requirements, OperationSecurity, SchemeScopes};

/// Where a provider puts its credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "site", rename_all = "snake_case")]
pub enum InjectionSite {
    Header { name: String },
    Query { name: String },
    Cookie { name: String },
    /// `Authorization: Basic base64(user:password)`
    Basic,
    /// `Authorization: <scheme> <token>`
    Authorization { scheme: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeKind {
    ApiKey,
    HttpBasic,
    HttpBearer,
    /// HTTP scheme without a dedicated helper
    HttpOther,
    OAuth2,
    OpenIdConnect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityBinding {
    pub scheme_name: String,
    pub kind: SchemeKind,
    pub injection: InjectionSite,
    /// Provider type
    pub helper: String,
    pub constructor: String,
    /// OAuth2 scopes of every flow, first declaration wins
    pub scopes: Vec<(String, String)>,
    /// Extra documentation lines (bearer format, discovery URL, flow URLs)
    pub documentation: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OAuth2Plan {
    pub scheme_name: String,
    pub artifact: String,
    pub client_type: String,
    pub constructor: String,
    pub token_type: String,
    pub flows: Vec<OAuthFlow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OidcScheme {
    pub scheme_name: String,
    pub url_const: String,
    pub constructor: String,
    pub discovery_url: String,
}

/// One artifact shared by every openIdConnect scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OidcPlan {
    pub configuration_type: String,
    pub client_type: String,
    pub constructor: String,
    pub schemes: Vec<OidcScheme>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSlot {
    pub name: String,
    pub env_var: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialPlan {
    pub scheme_name: String,
    pub function: String,
    pub helper: String,
    pub constructor: String,
    /// Constructor arguments, in order
    pub slots: Vec<CredentialSlot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecurityPlan {
    pub bindings: Vec<SecurityBinding>,
    pub oauth2: Vec<OAuth2Plan>,
    pub oidc: Option<OidcPlan>,
    pub credentials: Vec<CredentialPlan>,
    pub enforcement: Vec<OperationSecurity>,
}

impl SecurityPlan {
    pub fn binding(&self, scheme_name: &str) -> Option<&SecurityBinding> {
        self.bindings.iter().find(|b| b.scheme_name == scheme_name)
    }
}

/// Compile the document's security schemes. Schemes are visited in sorted
/// name order.
pub fn compile_security(
    document: &Document,
    operations: &[OperationBinding],
    ctx: &mut GenerationContext,
) -> SecurityPlan {
    let toggles = ctx.config.security.clone();
    let mut schemes: Vec<(&String, &SecurityScheme)> = document.security_schemes.iter().collect();
    schemes.sort_by(|a, b| a.0.cmp(b.0));

    let mut plan = SecurityPlan::default();

    if toggles.helpers {
        for (name, scheme) in &schemes {
            plan.bindings.push(compile_scheme(name, scheme, ctx));
        }
    }

    if toggles.oauth2_flows {
        let mut artifacts = HashSet::new();
        for (name, scheme) in &schemes {
            if let SecuritySchemeKind::OAuth2 { flows } = &scheme.kind {
                plan.oauth2.push(plan_oauth2(name, flows, &mut artifacts, ctx));
            }
        }
    }

    if toggles.oidc_discovery {
        plan.oidc = plan_oidc(&schemes, ctx);
    }

    if toggles.credentials {
        if toggles.helpers {
            let package = ctx.config.package.clone();
            plan.credentials = plan
                .bindings
                .iter()
                .map(|binding| plan_credentials(&package, binding, ctx))
                .collect();
        } else if !schemes.is_empty() {
            ctx.diagnostics.warning(
                IssueKind::UnsupportedFeature,
                "#/config/security",
                "credential providers need the security helpers; the credentials artifact is skipped",
            );
        }
    }

    if toggles.enforcement {
        plan.enforcement = resolve_requirements(document, operations, ctx);
    }

    tracing::info!(
        schemes = schemes.len(),
        helpers = plan.bindings.len(),
        oauth2 = plan.oauth2.len(),
        enforced_operations = plan.enforcement.len(),
        "compiled security schemes"
    );
    plan
}

/// PascalCase stem for every identifier derived from a scheme name. A name
/// starting with a digit is prefixed before any suffix is appended.
fn scheme_base(name: &str) -> String {
    if to_pascal_case(name).is_empty() {
        "Security".to_string()
    } else {
        normalize_identifier(name, IdentCase::Pascal)
    }
}

fn compile_scheme(name: &str, scheme: &SecurityScheme, ctx: &mut GenerationContext) -> SecurityBinding {
    let location = format!("#/securitySchemes/{name}");
    let base = scheme_base(name);

    let helper = ctx.allocator.allocate_normalized(
        &Scope::Package,
        format!("{base}Provider"),
        name,
        &mut ctx.diagnostics,
    );
    let constructor = ctx.allocator.allocate_normalized(
        &Scope::Package,
        format!("New{helper}"),
        name,
        &mut ctx.diagnostics,
    );

    let mut documentation = Vec::new();
    let mut scopes: Vec<(String, String)> = Vec::new();

    let (kind, injection) = match &scheme.kind {
        SecuritySchemeKind::ApiKey { name: key, location: site } => {
            let injection = match site {
                ApiKeyLocation::Header => InjectionSite::Header { name: key.clone() },
                ApiKeyLocation::Query => InjectionSite::Query { name: key.clone() },
                ApiKeyLocation::Cookie => InjectionSite::Cookie { name: key.clone() },
            };
            (SchemeKind::ApiKey, injection)
        }
        SecuritySchemeKind::Http {
            scheme: http_scheme,
            bearer_format,
        } => match http_scheme.to_ascii_lowercase().as_str() {
            "basic" => (SchemeKind::HttpBasic, InjectionSite::Basic),
            "bearer" => {
                if let Some(format) = bearer_format {
                    documentation.push(format!("Bearer format: {format}"));
                }
                (
                    SchemeKind::HttpBearer,
                    InjectionSite::Authorization {
                        scheme: "Bearer".to_string(),
                    },
                )
            }
            other => {
                ctx.diagnostics.warning(
                    IssueKind::UnsupportedFeature,
                    &location,
                    format!(
                        "http scheme '{other}' has no dedicated helper; the provider sends 'Authorization: {} <credential>'",
                        to_pascal_case(other)
                    ),
                );
                (
                    SchemeKind::HttpOther,
                    InjectionSite::Authorization {
                        scheme: to_pascal_case(other),
                    },
                )
            }
        },
        SecuritySchemeKind::OAuth2 { flows } => {
            for flow in flows {
                let mut line = format!("OAuth2 {} flow", flow.kind.as_str());
                if let Some(url) = &flow.authorization_url {
                    line.push_str(&format!(", authorization URL {url}"));
                }
                if let Some(url) = &flow.token_url {
                    line.push_str(&format!(", token URL {url}"));
                }
                documentation.push(line);
                for (scope, description) in &flow.scopes {
                    if !scopes.iter().any(|(s, _)| s == scope) {
                        scopes.push((scope.clone(), description.clone()));
                    }
                }
            }
            (
                SchemeKind::OAuth2,
                InjectionSite::Authorization {
                    scheme: "Bearer".to_string(),
                },
            )
        }
        SecuritySchemeKind::OpenIdConnect { url } => {
            documentation.push(format!("OpenID Connect discovery: {url}"));
            (
                SchemeKind::OpenIdConnect,
                InjectionSite::Authorization {
                    scheme: "Bearer".to_string(),
                },
            )
        }
    };

    tracing::debug!(scheme = name, helper = %helper, "compiled security scheme");

    SecurityBinding {
        scheme_name: name.to_string(),
        kind,
        injection,
        helper,
        constructor,
        scopes,
        documentation,
        description: scheme.description.clone(),
    }
}

fn plan_oauth2(
    name: &str,
    flows: &[OAuthFlow],
    artifacts: &mut HashSet<String>,
    ctx: &mut GenerationContext,
) -> OAuth2Plan {
    let base = scheme_base(name);
    let allocate = |suffix: &str, ctx: &mut GenerationContext| {
        ctx.allocator.allocate_normalized(
            &Scope::Package,
            format!("{base}{suffix}"),
            name,
            &mut ctx.diagnostics,
        )
    };
    let client_type = allocate("OAuth2Client", ctx);
    let token_type = allocate("Token", ctx);
    let constructor = ctx.allocator.allocate_normalized(
        &Scope::Package,
        format!("New{client_type}"),
        name,
        &mut ctx.diagnostics,
    );

    let stem = format!("oauth2_{}", to_snake_case(name));
    let mut artifact = stem.clone();
    let mut n = 2;
    while !artifacts.insert(artifact.clone()) {
        artifact = format!("{stem}_{n}");
        n += 1;
    }

    let mut flows = flows.to_vec();
    flows.sort_by_key(|f| f.kind);

    OAuth2Plan {
        scheme_name: name.to_string(),
        artifact,
        client_type,
        constructor,
        token_type,
        flows,
    }
}

fn plan_oidc(schemes: &[(&String, &SecurityScheme)], ctx: &mut GenerationContext) -> Option<OidcPlan> {
    let oidc: Vec<(&String, &String)> = schemes
        .iter()
        .filter_map(|(name, scheme)| match &scheme.kind {
            SecuritySchemeKind::OpenIdConnect { url } => Some((*name, url)),
            _ => None,
        })
        .collect();
    if oidc.is_empty() {
        return None;
    }

    let allocate = |base: &str, ctx: &mut GenerationContext| {
        ctx.allocator.allocate_normalized(
            &Scope::Package,
            base.to_string(),
            base,
            &mut ctx.diagnostics,
        )
    };
    let configuration_type = allocate("OIDCConfiguration", ctx);
    let client_type = allocate("OIDCDiscoveryClient", ctx);
    let constructor = allocate(&format!("New{client_type}"), ctx);

    let schemes = oidc
        .into_iter()
        .map(|(name, url)| {
            let base = scheme_base(name);
            OidcScheme {
                scheme_name: name.clone(),
                url_const: allocate(&format!("{base}DiscoveryURL"), ctx),
                constructor: allocate(&format!("New{base}Discovery"), ctx),
                discovery_url: url.clone(),
            }
        })
        .collect();

    Some(OidcPlan {
        configuration_type,
        client_type,
        constructor,
        schemes,
    })
}

fn plan_credentials(package: &str, binding: &SecurityBinding, ctx: &mut GenerationContext) -> CredentialPlan {
    let slot_names: &[&str] = match binding.injection {
        InjectionSite::Header { .. } | InjectionSite::Query { .. } | InjectionSite::Cookie { .. } => {
            &["key"]
        }
        InjectionSite::Basic => &["username", "password"],
        InjectionSite::Authorization { .. } => &["token"],
    };
    let prefix = format!(
        "{}_{}",
        to_screaming_snake_case(package),
        to_screaming_snake_case(&binding.scheme_name)
    );
    let slots = slot_names
        .iter()
        .map(|slot| CredentialSlot {
            name: slot.to_string(),
            env_var: format!("{prefix}_{}", to_screaming_snake_case(slot)),
        })
        .collect();

    let base = scheme_base(&binding.scheme_name);
    let function = ctx.allocator.allocate_normalized(
        &Scope::Package,
        format!("{base}FromEnv"),
        &binding.scheme_name,
        &mut ctx.diagnostics,
    );

    CredentialPlan {
        scheme_name: binding.scheme_name.clone(),
        function,
        helper: binding.helper.clone(),
        constructor: binding.constructor.clone(),
        slots,
    }
}

#[cfg(test)]
mod tests;
