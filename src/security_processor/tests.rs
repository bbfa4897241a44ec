use serde_json::{json, Value as JsonValue};

use super::*;
use crate::config::GenerationConfig;
use crate::diagnostics::{Issue, Severity};
use crate::operation_processor::bind_operations;
use crate::parsers::{InputParser, OAuthFlowKind, OpenApiParser};
use crate::schema_processor::TypeResolver;

fn document(schemes: JsonValue, security: JsonValue, paths: JsonValue) -> Document {
    OpenApiParser
        .parse_value(json!({
            "openapi": "3.0.3",
            "info": {"title": "t", "version": "1"},
            "security": security,
            "paths": paths,
            "components": {
                "securitySchemes": schemes,
                "schemas": {
                    "ApiKeyProvider": {"type": "object", "properties": {"x": {"type": "string"}}}
                }
            }
        }))
        .unwrap()
}

fn compile(document: &Document, config: &GenerationConfig) -> (SecurityPlan, Vec<Issue>) {
    let mut ctx = GenerationContext::new(config);
    let mut resolver = TypeResolver::new(document);
    resolver.resolve_components(&mut ctx);
    let operations = bind_operations(document, &mut resolver, &mut ctx);
    let plan = compile_security(document, &operations, &mut ctx);
    (plan, ctx.diagnostics.into_issues(true))
}

fn all_toggles() -> GenerationConfig {
    let mut config = GenerationConfig::new("api");
    config.security.oauth2_flows = true;
    config.security.credentials = true;
    config.security.enforcement = true;
    config.security.oidc_discovery = true;
    config
}

fn mixed_schemes() -> JsonValue {
    json!({
        "api_key": {"type": "apiKey", "in": "header", "name": "X-API-Key"},
        "basicAuth": {"type": "http", "scheme": "basic"},
        "jwt": {"type": "http", "scheme": "bearer", "bearerFormat": "JWT"},
        "digest": {"type": "http", "scheme": "digest"},
        "petstore_auth": {
            "type": "oauth2",
            "flows": {
                "authorizationCode": {
                    "authorizationUrl": "https://auth.example.com/authorize",
                    "tokenUrl": "https://auth.example.com/token",
                    "scopes": {"read:pets": "read", "write:pets": "write"}
                },
                "clientCredentials": {
                    "tokenUrl": "https://auth.example.com/token",
                    "scopes": {"read:pets": "read again", "admin": "admin"}
                }
            }
        },
        "corp": {"type": "openIdConnect", "openIdConnectUrl": "https://id.example.com/.well-known/openid-configuration"}
    })
}

#[test]
fn api_key_header_helper() {
    let doc = document(
        json!({"api_key": {"type": "apiKey", "in": "header", "name": "X-API-Key"}}),
        json!([]),
        json!({}),
    );
    let config = GenerationConfig::new("api");
    let (plan, issues) = compile(&doc, &config);

    assert_eq!(plan.bindings.len(), 1);
    let binding = &plan.bindings[0];
    assert_eq!(binding.kind, SchemeKind::ApiKey);
    assert_eq!(
        binding.injection,
        InjectionSite::Header {
            name: "X-API-Key".into()
        }
    );
    // The schema named ApiKeyProvider was allocated first
    assert_eq!(binding.helper, "ApiKeyProvider2");
    assert_eq!(binding.constructor, "NewApiKeyProvider2");
    assert!(issues
        .iter()
        .any(|i| i.kind == IssueKind::NamingCollisionResolved));

    let (again, _) = compile(&doc, &config);
    assert_eq!(plan, again);
}

#[test]
fn scheme_kinds_and_injection_sites() {
    let doc = document(mixed_schemes(), json!([]), json!({}));
    let (plan, issues) = compile(&doc, &GenerationConfig::new("api"));

    let names: Vec<&str> = plan.bindings.iter().map(|b| b.scheme_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["api_key", "basicAuth", "corp", "digest", "jwt", "petstore_auth"]
    );

    let basic = plan.binding("basicAuth").unwrap();
    assert_eq!(basic.kind, SchemeKind::HttpBasic);
    assert_eq!(basic.injection, InjectionSite::Basic);
    assert_eq!(basic.helper, "BasicAuthProvider");

    let jwt = plan.binding("jwt").unwrap();
    assert_eq!(jwt.kind, SchemeKind::HttpBearer);
    assert_eq!(
        jwt.injection,
        InjectionSite::Authorization {
            scheme: "Bearer".into()
        }
    );
    assert_eq!(jwt.documentation, vec!["Bearer format: JWT"]);

    let digest = plan.binding("digest").unwrap();
    assert_eq!(digest.kind, SchemeKind::HttpOther);
    let warnings: Vec<&Issue> = issues
        .iter()
        .filter(|i| i.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("digest"));

    let oauth = plan.binding("petstore_auth").unwrap();
    assert_eq!(oauth.kind, SchemeKind::OAuth2);
    let scopes: Vec<&str> = oauth.scopes.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(scopes, vec!["read:pets", "write:pets", "admin"]);
    assert_eq!(oauth.scopes[0].1, "read");

    let corp = plan.binding("corp").unwrap();
    assert_eq!(corp.kind, SchemeKind::OpenIdConnect);
    assert!(corp.documentation[0].contains("id.example.com"));

    // Optional artifacts stay off by default
    assert!(plan.oauth2.is_empty());
    assert!(plan.oidc.is_none());
    assert!(plan.credentials.is_empty());
    assert!(plan.enforcement.is_empty());
}

#[test]
fn optional_artifacts() {
    let doc = document(mixed_schemes(), json!([]), json!({}));
    let (plan, _) = compile(&doc, &all_toggles());

    assert_eq!(plan.oauth2.len(), 1);
    let oauth = &plan.oauth2[0];
    assert_eq!(oauth.artifact, "oauth2_petstore_auth");
    assert_eq!(oauth.client_type, "PetstoreAuthOAuth2Client");
    assert_eq!(oauth.constructor, "NewPetstoreAuthOAuth2Client");
    assert_eq!(oauth.token_type, "PetstoreAuthToken");
    let kinds: Vec<OAuthFlowKind> = oauth.flows.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![OAuthFlowKind::ClientCredentials, OAuthFlowKind::AuthorizationCode]
    );

    let oidc = plan.oidc.as_ref().unwrap();
    assert_eq!(oidc.client_type, "OIDCDiscoveryClient");
    assert_eq!(oidc.schemes.len(), 1);
    assert_eq!(oidc.schemes[0].url_const, "CorpDiscoveryURL");

    let key = plan
        .credentials
        .iter()
        .find(|c| c.scheme_name == "api_key")
        .unwrap();
    assert_eq!(key.function, "ApiKeyFromEnv");
    assert_eq!(key.slots.len(), 1);
    assert_eq!(key.slots[0].env_var, "API_API_KEY_KEY");

    let basic = plan
        .credentials
        .iter()
        .find(|c| c.scheme_name == "basicAuth")
        .unwrap();
    let vars: Vec<&str> = basic.slots.iter().map(|s| s.env_var.as_str()).collect();
    assert_eq!(vars, vec!["API_BASIC_AUTH_USERNAME", "API_BASIC_AUTH_PASSWORD"]);
}

#[test]
fn credentials_need_helpers() {
    let doc = document(mixed_schemes(), json!([]), json!({}));
    let mut config = all_toggles();
    config.security.helpers = false;
    let (plan, issues) = compile(&doc, &config);

    assert!(plan.bindings.is_empty());
    assert!(plan.credentials.is_empty());
    assert!(issues
        .iter()
        .any(|i| i.severity == Severity::Warning && i.message.contains("credential")));
}

#[test]
fn enforcement_overrides_and_undefined_schemes() {
    let ok = json!({"200": {"description": "ok"}});
    let doc = document(
        json!({
            "api_key": {"type": "apiKey", "in": "header", "name": "X-API-Key"},
            "jwt": {"type": "http", "scheme": "bearer"}
        }),
        json!([{"api_key": []}]),
        json!({
            "/inherits": {"get": {"operationId": "inherits", "responses": ok}},
            "/open": {"get": {"operationId": "open", "security": [], "responses": ok}},
            "/either": {"get": {"operationId": "either", "security": [{"jwt": []}, {"api_key": [], "jwt": []}, {}], "responses": ok}},
            "/broken": {"get": {"operationId": "broken", "security": [{"ghost": ["x"]}], "responses": ok}}
        }),
    );
    let (plan, issues) = compile(&doc, &all_toggles());
    let by_name = |name: &str| {
        plan.enforcement
            .iter()
            .find(|e| e.method_name == name)
            .unwrap()
    };

    let inherits = by_name("Inherits");
    assert!(inherits.inherited);
    assert!(!inherits.anonymous);
    assert_eq!(inherits.alternatives.len(), 1);
    assert_eq!(inherits.alternatives[0][0].scheme_name, "api_key");

    let open = by_name("Open");
    assert!(open.anonymous);
    assert!(open.alternatives.is_empty());

    let either = by_name("Either");
    assert!(either.anonymous);
    assert_eq!(either.alternatives.len(), 2);
    let second: Vec<&str> = either.alternatives[1]
        .iter()
        .map(|s| s.scheme_name.as_str())
        .collect();
    assert_eq!(second, vec!["api_key", "jwt"]);

    let broken = by_name("Broken");
    assert!(!broken.anonymous);
    assert!(broken.alternatives.is_empty());

    let errors: Vec<&Issue> = issues
        .iter()
        .filter(|i| i.kind == IssueKind::UndefinedReference)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].severity, Severity::Error);
    assert!(errors[0].message.contains("ghost"));
}

#[test]
fn digit_leading_scheme_names_are_prefixed() {
    let doc = document(
        json!({
            "2fa": {"type": "apiKey", "in": "header", "name": "X-OTP"},
            "3legged": {
                "type": "oauth2",
                "flows": {"clientCredentials": {"tokenUrl": "https://auth.example.com/token", "scopes": {}}}
            },
            "9id": {"type": "openIdConnect", "openIdConnectUrl": "https://id.example.com/.well-known/openid-configuration"}
        }),
        json!([]),
        json!({}),
    );
    let (plan, _) = compile(&doc, &all_toggles());

    let helpers: Vec<&str> = plan.bindings.iter().map(|b| b.helper.as_str()).collect();
    assert_eq!(helpers, vec!["N2faProvider", "N3leggedProvider", "N9idProvider"]);

    let oauth = &plan.oauth2[0];
    assert_eq!(oauth.client_type, "N3leggedOAuth2Client");
    assert_eq!(oauth.token_type, "N3leggedToken");

    let credentials: Vec<&str> = plan.credentials.iter().map(|c| c.function.as_str()).collect();
    assert!(credentials.contains(&"N2faFromEnv"));

    let oidc = plan.oidc.as_ref().unwrap();
    assert_eq!(oidc.schemes[0].url_const, "N9idDiscoveryURL");
    assert_eq!(oidc.schemes[0].constructor, "NewN9idDiscovery");
}
