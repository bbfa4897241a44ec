//! Security scheme objects of both dialects.
//!
//! Swagger 2.0 `securityDefinitions` and OpenAPI 3.x
//! `components.securitySchemes` are deserialized into one permissive shape and
//! then folded into [`SecurityScheme`].

use indexmap::IndexMap;
use serde::Deserialize;

use super::document::{ApiKeyLocation, OAuthFlow, OAuthFlowKind, SecurityScheme, SecuritySchemeKind};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSecurityScheme {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,

    // apiKey
    pub name: Option<String>,
    #[serde(rename = "in")]
    pub location: Option<String>,

    // http (3.x)
    pub scheme: Option<String>,
    pub bearer_format: Option<String>,

    // oauth2 (3.x)
    pub flows: Option<IndexMap<String, RawOAuthFlow>>,

    // oauth2 (2.0)
    pub flow: Option<String>,
    pub authorization_url: Option<String>,
    pub token_url: Option<String>,
    #[serde(default)]
    pub scopes: IndexMap<String, String>,

    // openIdConnect
    pub open_id_connect_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOAuthFlow {
    pub authorization_url: Option<String>,
    pub token_url: Option<String>,
    pub refresh_url: Option<String>,
    #[serde(default)]
    pub scopes: IndexMap<String, String>,
}

impl RawSecurityScheme {
    /// Fold into the dialect-neutral model. Returns a reason when the scheme
    /// is missing fields its type needs.
    pub fn into_scheme(self) -> Result<SecurityScheme, String> {
        let kind = match self.kind.as_str() {
            "apiKey" => {
                let name = self.name.ok_or("apiKey scheme without 'name'")?;
                let location = match self.location.as_deref() {
                    Some("header") => ApiKeyLocation::Header,
                    Some("query") => ApiKeyLocation::Query,
                    Some("cookie") => ApiKeyLocation::Cookie,
                    other => return Err(format!("apiKey scheme with unsupported 'in': {other:?}")),
                };
                SecuritySchemeKind::ApiKey { name, location }
            }
            // Swagger 2.0 only knows basic
            "basic" => SecuritySchemeKind::Http {
                scheme: "basic".to_string(),
                bearer_format: None,
            },
            "http" => SecuritySchemeKind::Http {
                scheme: self
                    .scheme
                    .ok_or("http scheme without 'scheme'")?
                    .to_lowercase(),
                bearer_format: self.bearer_format,
            },
            "oauth2" => {
                let flows = match self.flows {
                    Some(flows) => flows
                        .into_iter()
                        .filter_map(|(key, flow)| {
                            let kind = match key.as_str() {
                                "implicit" => OAuthFlowKind::Implicit,
                                "password" => OAuthFlowKind::Password,
                                "clientCredentials" => OAuthFlowKind::ClientCredentials,
                                "authorizationCode" => OAuthFlowKind::AuthorizationCode,
                                _ => return None,
                            };
                            Some(OAuthFlow {
                                kind,
                                authorization_url: flow.authorization_url,
                                token_url: flow.token_url,
                                refresh_url: flow.refresh_url,
                                scopes: flow.scopes,
                            })
                        })
                        .collect(),
                    None => {
                        let kind = match self.flow.as_deref() {
                            Some("implicit") => OAuthFlowKind::Implicit,
                            Some("password") => OAuthFlowKind::Password,
                            Some("application") => OAuthFlowKind::ClientCredentials,
                            Some("accessCode") => OAuthFlowKind::AuthorizationCode,
                            other => {
                                return Err(format!("oauth2 scheme with unsupported flow: {other:?}"))
                            }
                        };
                        vec![OAuthFlow {
                            kind,
                            authorization_url: self.authorization_url,
                            token_url: self.token_url,
                            refresh_url: None,
                            scopes: self.scopes,
                        }]
                    }
                };
                SecuritySchemeKind::OAuth2 { flows }
            }
            "openIdConnect" => SecuritySchemeKind::OpenIdConnect {
                url: self
                    .open_id_connect_url
                    .ok_or("openIdConnect scheme without 'openIdConnectUrl'")?,
            },
            other => return Err(format!("unknown security scheme type '{other}'")),
        };

        Ok(SecurityScheme {
            kind,
            description: self.description,
        })
    }
}

/// Read a map of raw scheme objects, skipping (and logging) unusable entries.
pub fn read_security_schemes(
    raw: Option<&serde_json::Value>,
) -> IndexMap<String, SecurityScheme> {
    let Some(map) = raw.and_then(serde_json::Value::as_object) else {
        return IndexMap::new();
    };

    let mut schemes = IndexMap::new();
    for (name, value) in map {
        let parsed = serde_json::from_value::<RawSecurityScheme>(value.clone())
            .map_err(|e| e.to_string())
            .and_then(RawSecurityScheme::into_scheme);
        match parsed {
            Ok(scheme) => {
                schemes.insert(name.clone(), scheme);
            }
            Err(reason) => tracing::warn!(scheme = %name, "skipping security scheme: {reason}"),
        }
    }
    schemes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_oas3_schemes() {
        let schemes = read_security_schemes(Some(&json!({
            "api_key": {"type": "apiKey", "in": "header", "name": "X-API-Key"},
            "bearer": {"type": "http", "scheme": "Bearer", "bearerFormat": "JWT"},
            "oidc": {"type": "openIdConnect", "openIdConnectUrl": "https://id.example.com/.well-known/openid-configuration"},
            "oauth": {
                "type": "oauth2",
                "flows": {
                    "clientCredentials": {"tokenUrl": "https://id.example.com/token", "scopes": {"read": "Read"}},
                    "authorizationCode": {
                        "authorizationUrl": "https://id.example.com/auth",
                        "tokenUrl": "https://id.example.com/token",
                        "scopes": {"write": "Write"}
                    }
                }
            }
        })));

        assert_eq!(schemes.len(), 4);
        assert_eq!(
            schemes["api_key"].kind,
            SecuritySchemeKind::ApiKey {
                name: "X-API-Key".into(),
                location: ApiKeyLocation::Header
            }
        );
        assert!(matches!(
            &schemes["bearer"].kind,
            SecuritySchemeKind::Http { scheme, bearer_format: Some(f) } if scheme == "bearer" && f == "JWT"
        ));
        let SecuritySchemeKind::OAuth2 { flows } = &schemes["oauth"].kind else {
            panic!("expected oauth2");
        };
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[0].kind, OAuthFlowKind::ClientCredentials);
    }

    #[test]
    fn reads_swagger_schemes() {
        let schemes = read_security_schemes(Some(&json!({
            "basic": {"type": "basic"},
            "petstore_auth": {
                "type": "oauth2",
                "flow": "accessCode",
                "authorizationUrl": "https://petstore.example.com/oauth/dialog",
                "tokenUrl": "https://petstore.example.com/oauth/token",
                "scopes": {"write:pets": "modify pets"}
            }
        })));

        assert!(matches!(&schemes["basic"].kind, SecuritySchemeKind::Http { scheme, .. } if scheme == "basic"));
        let SecuritySchemeKind::OAuth2 { flows } = &schemes["petstore_auth"].kind else {
            panic!("expected oauth2");
        };
        assert_eq!(flows[0].kind, OAuthFlowKind::AuthorizationCode);
        assert_eq!(flows[0].scopes["write:pets"], "modify pets");
    }

    #[test]
    fn skips_unusable_schemes() {
        let schemes = read_security_schemes(Some(&json!({
            "broken": {"type": "apiKey", "in": "header"},
            "mystery": {"type": "mutualTLS"}
        })));
        assert!(schemes.is_empty());
    }
}
