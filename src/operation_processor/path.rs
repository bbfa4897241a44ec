//! Path templates and derived method names.

use crate::naming::to_pascal_case;
use crate::parsers::HttpMethod;

/// One piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPart {
    Literal(String),
    Param(String),
}

/// Split `/pets/{petId}/photo.{ext}` into literal and placeholder parts.
/// An unterminated `{` is kept as literal text.
pub fn parse_template(path: &str) -> Vec<PathPart> {
    let mut parts = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        if open > 0 {
            parts.push(PathPart::Literal(rest[..open].to_string()));
        }
        parts.push(PathPart::Param(rest[open + 1..open + close].to_string()));
        rest = &rest[open + close + 1..];
    }
    if !rest.is_empty() {
        parts.push(PathPart::Literal(rest.to_string()));
    }
    parts
}

/// Placeholder names in order of appearance, without duplicates.
pub fn placeholders(path: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for part in parse_template(path) {
        if let PathPart::Param(name) = part {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Method name for an operation without `operationId`: verb plus the path
/// segments, with placeholders spelled `By<Param>`.
///
/// `GET /pets/{petId}/toys` -> `GetPetsByPetIdToys`
pub fn derive_method_name(method: HttpMethod, path: &str) -> String {
    let mut name = to_pascal_case(&method.as_str().to_lowercase());
    let mut any_segment = false;

    for part in parse_template(path) {
        match part {
            PathPart::Literal(text) => {
                let words = to_pascal_case(&text);
                if !words.is_empty() {
                    any_segment = true;
                    name.push_str(&words);
                }
            }
            PathPart::Param(param) => {
                any_segment = true;
                name.push_str("By");
                name.push_str(&to_pascal_case(&param));
            }
        }
    }

    if !any_segment {
        name.push_str("Root");
    }
    name
}
