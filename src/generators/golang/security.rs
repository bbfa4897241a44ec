//! Security artifacts: providers, credentials, token flows, discovery and
//! the requirement table.

use serde::Serialize;

use super::types::go_string;
use crate::parsers::{OAuthFlow, OAuthFlowKind};
use crate::security_processor::{
    CredentialPlan, InjectionSite, OAuth2Plan, OidcPlan, OperationSecurity, SecurityBinding,
};

/// A Go function or method: header line plus body statements.
#[derive(Debug, Serialize)]
pub struct FuncView {
    pub doc: Vec<String>,
    pub header: String,
    pub body: Vec<String>,
}

impl FuncView {
    fn new(doc: impl Into<String>, header: impl Into<String>, body: Vec<String>) -> Self {
        Self {
            doc: vec![doc.into()],
            header: header.into(),
            body,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProviderView {
    pub name: String,
    pub doc: Vec<String>,
    pub fields: Vec<String>,
    pub constructor: FuncView,
    pub intercept: FuncView,
}

#[derive(Debug, Serialize)]
pub struct RequirementView {
    /// Go literal of the operation method name
    pub key: String,
    /// `OperationSecurity` composite literal
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct OAuth2View {
    pub scheme_name: String,
    pub client_type: String,
    pub token_type: String,
    pub doc: Vec<String>,
    pub functions: Vec<FuncView>,
}

#[derive(Debug, Serialize)]
pub struct OidcView {
    pub configuration_type: String,
    pub client_type: String,
    pub constructor: String,
    pub schemes: Vec<OidcSchemeView>,
}

#[derive(Debug, Serialize)]
pub struct OidcSchemeView {
    pub scheme_name: String,
    pub url_const: String,
    pub url: String,
    pub constructor: String,
}

/// Collapse whitespace runs, newlines included, so text fits one comment line.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Constructor arguments of a provider, matching the credential slots.
fn credential_fields(injection: &InjectionSite) -> &'static [&'static str] {
    match injection {
        InjectionSite::Header { .. } | InjectionSite::Query { .. } | InjectionSite::Cookie { .. } => {
            &["key"]
        }
        InjectionSite::Basic => &["username", "password"],
        InjectionSite::Authorization { .. } => &["token"],
    }
}

pub fn provider(binding: &SecurityBinding) -> ProviderView {
    let helper = &binding.helper;
    let fields = credential_fields(&binding.injection);

    let site = match &binding.injection {
        InjectionSite::Header { name } => format!("the {name:?} header"),
        InjectionSite::Query { name } => format!("the {name:?} query parameter"),
        InjectionSite::Cookie { name } => format!("the {name:?} cookie"),
        InjectionSite::Basic => "HTTP basic authentication".to_string(),
        InjectionSite::Authorization { scheme } => {
            format!("the Authorization header ({scheme} scheme)")
        }
    };
    let mut doc = vec![format!(
        "// {helper} sends the {:?} credential in {site}.",
        binding.scheme_name
    )];
    if let Some(description) = binding.description.as_deref().map(str::trim) {
        if !description.is_empty() {
            doc.push("//".to_string());
            doc.extend(description.lines().map(|l| format!("// {}", l.trim_end())));
        }
    }
    for line in &binding.documentation {
        doc.push(format!("// {}", one_line(line)));
    }
    if !binding.scopes.is_empty() {
        doc.push("//".to_string());
        doc.push("// Scopes:".to_string());
        for (scope, description) in &binding.scopes {
            doc.push(format!("//   - {}: {}", one_line(scope), one_line(description)));
        }
    }

    let intercept = match &binding.injection {
        InjectionSite::Header { name } => vec![format!("req.Header.Set({}, p.key)", go_string(name))],
        InjectionSite::Query { name } => vec![
            "query := req.URL.Query()".to_string(),
            format!("query.Set({}, p.key)", go_string(name)),
            "req.URL.RawQuery = query.Encode()".to_string(),
        ],
        InjectionSite::Cookie { name } => vec![format!(
            "req.AddCookie(&http.Cookie{{Name: {}, Value: p.key}})",
            go_string(name)
        )],
        InjectionSite::Basic => vec!["req.SetBasicAuth(p.username, p.password)".to_string()],
        InjectionSite::Authorization { scheme } => vec![format!(
            "req.Header.Set(\"Authorization\", {}+p.token)",
            go_string(&format!("{scheme} "))
        )],
    };

    let init: Vec<String> = fields.iter().map(|f| format!("{f}: {f}")).collect();
    ProviderView {
        name: helper.clone(),
        doc,
        fields: fields.iter().map(|f| format!("{f} string")).collect(),
        constructor: FuncView::new(
            format!("// {} returns a provider holding the given credential.", binding.constructor),
            format!(
                "func {}({} string) *{helper}",
                binding.constructor,
                fields.join(", ")
            ),
            vec![format!("return &{helper}{{{}}}", init.join(", "))],
        ),
        intercept: FuncView::new(
            "// Intercept adds the credential to req. It satisfies RequestEditorFn.",
            format!("func (p *{helper}) Intercept(ctx context.Context, req *http.Request) error"),
            intercept.into_iter().chain(["return nil".to_string()]).collect(),
        ),
    }
}

pub fn credential(plan: &CredentialPlan) -> FuncView {
    let vars: Vec<String> = plan.slots.iter().map(|s| s.env_var.clone()).collect();
    let mut body = Vec::new();
    for slot in &plan.slots {
        body.extend([
            format!("{}, err := requireEnv({})", slot.name, go_string(&slot.env_var)),
            "if err != nil {".to_string(),
            "\treturn nil, err".to_string(),
            "}".to_string(),
        ]);
    }
    let args: Vec<&str> = plan.slots.iter().map(|s| s.name.as_str()).collect();
    body.push(format!("return {}({}), nil", plan.constructor, args.join(", ")));

    FuncView::new(
        format!(
            "// {} builds a {} from {}.",
            plan.function,
            plan.helper,
            vars.join(", ")
        ),
        format!("func {}() (*{}, error)", plan.function, plan.helper),
        body,
    )
}

pub fn requirement(security: &OperationSecurity) -> RequirementView {
    let alternatives: Vec<String> = security
        .alternatives
        .iter()
        .map(|alternative| {
            let entries: Vec<String> = alternative
                .iter()
                .map(|s| {
                    let scopes: Vec<String> = s.scopes.iter().map(|x| go_string(x)).collect();
                    format!("{}: {{{}}}", go_string(&s.scheme_name), scopes.join(", "))
                })
                .collect();
            format!("{{{}}}", entries.join(", "))
        })
        .collect();

    let mut parts = Vec::new();
    if security.anonymous {
        parts.push("Anonymous: true".to_string());
    }
    if !alternatives.is_empty() {
        parts.push(format!(
            "Alternatives: []SecurityAlternative{{{}}}",
            alternatives.join(", ")
        ));
    }
    RequirementView {
        key: go_string(&security.method_name),
        value: format!("{{{}}}", parts.join(", ")),
    }
}

pub fn oauth2(plan: &OAuth2Plan) -> OAuth2View {
    let client = &plan.client_type;
    let token = &plan.token_type;
    let mut functions = vec![FuncView::new(
        format!("// {} returns a client for the {:?} flows.", plan.constructor, plan.scheme_name),
        format!(
            "func {}(clientID, clientSecret, redirectURL string) *{client}",
            plan.constructor
        ),
        vec![format!(
            "return &{client}{{ClientID: clientID, ClientSecret: clientSecret, RedirectURL: redirectURL}}"
        )],
    )];

    for flow in &plan.flows {
        functions.extend(flow_methods(client, token, flow));
    }

    let refresh = plan
        .flows
        .iter()
        .find_map(|f| f.refresh_url.clone())
        .or_else(|| plan.flows.iter().find_map(|f| f.token_url.clone()));
    if let Some(endpoint) = refresh {
        functions.push(FuncView::new(
            "// Refresh exchanges a refresh token for a new access token.",
            format!(
                "func (c *{client}) Refresh(ctx context.Context, refreshToken string) (*{token}, error)"
            ),
            vec![
                "form := url.Values{}".to_string(),
                "form.Set(\"grant_type\", \"refresh_token\")".to_string(),
                "form.Set(\"refresh_token\", refreshToken)".to_string(),
                format!("return c.requestToken(ctx, {}, form)", go_string(&endpoint)),
            ],
        ));
    }

    let mut doc = vec![format!(
        "// {client} runs the OAuth2 flows declared by {:?}.",
        plan.scheme_name
    )];
    for flow in &plan.flows {
        doc.push(format!("//   - {}", flow.kind.as_str()));
    }

    OAuth2View {
        scheme_name: plan.scheme_name.clone(),
        client_type: client.clone(),
        token_type: token.clone(),
        doc,
        functions,
    }
}

fn flow_methods(client: &str, token: &str, flow: &OAuthFlow) -> Vec<FuncView> {
    let token_request = |name: &str, doc: &str, args: &str, grant: &str, extra: Vec<String>| {
        flow.token_url.as_ref().map(|endpoint| {
            let mut body = vec![
                "form := url.Values{}".to_string(),
                format!("form.Set(\"grant_type\", {})", go_string(grant)),
            ];
            body.extend(extra);
            body.push(format!("return c.requestToken(ctx, {}, form)", go_string(endpoint)));
            FuncView::new(
                format!("// {name} {doc}"),
                format!("func (c *{client}) {name}(ctx context.Context{args}) (*{token}, error)"),
                body,
            )
        })
    };
    let scope_lines = || {
        vec![
            "if len(scopes) > 0 {".to_string(),
            "\tform.Set(\"scope\", strings.Join(scopes, \" \"))".to_string(),
            "}".to_string(),
        ]
    };
    let auth_url = |name: &str, response_type: &str| {
        flow.authorization_url.as_ref().map(|endpoint| {
            FuncView::new(
                format!("// {name} returns the URL the user is sent to for consent."),
                format!("func (c *{client}) {name}(state string, scopes ...string) string"),
                vec![format!(
                    "return c.authURL({}, {}, state, scopes)",
                    go_string(endpoint),
                    go_string(response_type)
                )],
            )
        })
    };

    let methods = match flow.kind {
        OAuthFlowKind::Implicit => vec![auth_url("ImplicitURL", "token")],
        OAuthFlowKind::AuthorizationCode => vec![
            auth_url("AuthorizationCodeURL", "code"),
            token_request(
                "ExchangeCode",
                "trades an authorization code for a token.",
                ", code string",
                "authorization_code",
                vec![
                    "form.Set(\"code\", code)".to_string(),
                    "if c.RedirectURL != \"\" {".to_string(),
                    "\tform.Set(\"redirect_uri\", c.RedirectURL)".to_string(),
                    "}".to_string(),
                ],
            ),
        ],
        OAuthFlowKind::Password => vec![token_request(
            "PasswordToken",
            "requests a token with the resource owner's credentials.",
            ", username, password string, scopes ...string",
            "password",
            [
                vec![
                    "form.Set(\"username\", username)".to_string(),
                    "form.Set(\"password\", password)".to_string(),
                ],
                scope_lines(),
            ]
            .concat(),
        )],
        OAuthFlowKind::ClientCredentials => vec![token_request(
            "ClientCredentialsToken",
            "requests a token for the client itself.",
            ", scopes ...string",
            "client_credentials",
            scope_lines(),
        )],
    };
    methods.into_iter().flatten().collect()
}

pub fn oidc(plan: &OidcPlan) -> OidcView {
    OidcView {
        configuration_type: plan.configuration_type.clone(),
        client_type: plan.client_type.clone(),
        constructor: plan.constructor.clone(),
        schemes: plan
            .schemes
            .iter()
            .map(|s| OidcSchemeView {
                scheme_name: s.scheme_name.clone(),
                url_const: s.url_const.clone(),
                url: go_string(&s.discovery_url),
                constructor: s.constructor.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security_processor::SchemeKind;

    #[test]
    fn multi_line_scope_descriptions_stay_commented() {
        let binding = SecurityBinding {
            scheme_name: "petstore_auth".to_string(),
            kind: SchemeKind::OAuth2,
            injection: InjectionSite::Authorization {
                scheme: "Bearer".to_string(),
            },
            helper: "PetstoreAuthProvider".to_string(),
            constructor: "NewPetstoreAuthProvider".to_string(),
            scopes: vec![("read:pets".to_string(), "Read your pets\nand their owners".to_string())],
            documentation: vec!["Bearer format: JWT\r\nsigned".to_string()],
            description: Some("First line\nsecond line".to_string()),
        };

        let view = provider(&binding);
        assert!(view.doc.iter().all(|line| line.starts_with("//")));
        assert!(view
            .doc
            .contains(&"//   - read:pets: Read your pets and their owners".to_string()));
        assert!(view.doc.contains(&"// Bearer format: JWT signed".to_string()));
        assert!(view.doc.contains(&"// second line".to_string()));
    }
}
