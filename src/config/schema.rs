use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::naming::case::is_reserved_word;

/// Top-level configuration file.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub input: Option<InputConfig>,

    #[serde(default)]
    pub output: Option<PathBuf>,

    #[serde(flatten)]
    pub generation: GenerationConfig,
}

/// Where the API document comes from. Exactly one of `source` and
/// `document` must be set.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct InputConfig {
    /// `openapi` or `swagger`; detected from the document when absent
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub source: Option<PathBuf>,

    /// The document itself, embedded in the configuration
    #[serde(default)]
    pub document: Option<serde_yaml::Value>,
}

/// Everything one generation pass needs besides the document.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// Go package name of the emitted code. Required; left empty when the
    /// configuration does not name one so validation can reject it.
    pub package: String,

    pub generate: GenerateToggles,

    /// Optional fields become pointers (`*T`) rather than plain values
    pub optional_pointers: bool,

    /// Emit `validate:"..."` struct tags from schema constraints
    pub emit_validation: bool,

    /// Fail the pass when any Warning-or-worse issue was recorded
    pub strict: bool,

    /// Keep Info issues in the returned issue list
    pub include_info: bool,

    /// `User-Agent` sent by the emitted client; `oapi-go-gen/<version>` when unset
    pub user_agent: Option<String>,

    pub non_string_enums: NonStringEnumPolicy,

    /// Schema `format` -> Go type, overriding the built-in mapping
    pub type_mapping: IndexMap<String, String>,

    pub split: SplitConfig,

    pub security: SecurityConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct GenerateToggles {
    pub client: bool,
    pub server: bool,
    pub types: bool,
}

/// How integer, number and boolean enums are emitted.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NonStringEnumPolicy {
    /// Named type plus one constant per value (`Level1`, `Level2`)
    #[default]
    Constants,
    /// Plain alias of the scalar base type, values only documented
    Scalar,
}

/// Output splitting thresholds. `0` disables a threshold.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct SplitConfig {
    pub max_lines: i64,
    pub max_types: i64,
    pub max_operations: i64,
    pub by_tag: bool,
    pub by_path_prefix: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct SecurityConfig {
    /// `security_helpers`: one provider per scheme
    pub helpers: bool,
    /// `oauth2_<scheme>`: token flow helpers
    pub oauth2_flows: bool,
    /// `credentials`: environment-backed credential providers
    pub credentials: bool,
    /// `security_enforce`: per-operation acceptable scheme combinations
    pub enforcement: bool,
    /// `oidc_discovery`: OpenID Connect discovery client
    pub oidc_discovery: bool,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            input: None,
            output: Some(PathBuf::from("generated")),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            package: String::new(),
            generate: GenerateToggles::default(),
            optional_pointers: true,
            emit_validation: false,
            strict: false,
            include_info: false,
            user_agent: None,
            non_string_enums: NonStringEnumPolicy::default(),
            type_mapping: IndexMap::new(),
            split: SplitConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for GenerateToggles {
    fn default() -> Self {
        Self {
            client: true,
            server: false,
            types: true,
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_lines: 0,
            max_types: 0,
            max_operations: 0,
            by_tag: true,
            by_path_prefix: true,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            helpers: true,
            oauth2_flows: false,
            credentials: false,
            enforcement: false,
            oidc_discovery: false,
        }
    }
}

impl SplitConfig {
    /// Thresholds as unsigned limits, `None` for unlimited. Call after validation.
    pub fn limits(&self) -> (Option<usize>, Option<usize>, Option<usize>) {
        let limit = |v: i64| usize::try_from(v).ok().filter(|n| *n > 0);
        (
            limit(self.max_lines),
            limit(self.max_types),
            limit(self.max_operations),
        )
    }
}

impl GenerationConfig {
    /// Default options for the given Go package.
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    /// Reject configurations no generation pass can work with.
    pub fn validate(&self) -> Result<()> {
        let package = self.package.trim();
        if package.is_empty() {
            return Err(Error::config(
                "package is required: set `package` in the configuration or pass --package",
            ));
        }
        if !is_valid_package_name(package) {
            return Err(Error::config(format!(
                "'{package}' is not a valid Go package name"
            )));
        }

        for (name, value) in [
            ("split.max_lines", self.split.max_lines),
            ("split.max_types", self.split.max_types),
            ("split.max_operations", self.split.max_operations),
        ] {
            if value < 0 {
                return Err(Error::config(format!(
                    "{name} must be zero (unlimited) or positive, got {value}"
                )));
            }
        }

        if let Some(agent) = &self.user_agent {
            if agent.trim().is_empty() {
                return Err(Error::config("user_agent must not be blank when set"));
            }
        }

        Ok(())
    }
}

impl Config {
    /// Validate the input selection and the generation options.
    pub fn validate(&self) -> Result<()> {
        match &self.input {
            None => return Err(Error::config("no input: set input.source or input.document")),
            Some(input) => match (&input.source, &input.document) {
                (Some(_), Some(_)) => {
                    return Err(Error::config(
                        "input.source and input.document are mutually exclusive",
                    ))
                }
                (None, None) => {
                    return Err(Error::config("no input: set input.source or input.document"))
                }
                _ => {}
            },
        }
        self.generation.validate()
    }
}

fn is_valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !is_reserved_word(name)
}
