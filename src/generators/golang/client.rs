//! Client methods, server routes and parameter structs.

use std::collections::HashSet;

use serde::Serialize;

use super::types::{doc_lines, go_string, go_type};
use crate::operation_processor::path::{parse_template, PathPart};
use crate::operation_processor::{
    BodyEncoding, OperationBinding, ParameterBinding, ParamsStruct, ResponseBinding,
};
use crate::parsers::ParameterLocation;
use crate::schema_processor::{TypeGraph, TypeKind};

#[derive(Debug, Serialize)]
pub struct ParamsView {
    pub name: String,
    pub doc: Vec<String>,
    pub fields: Vec<ParamFieldView>,
}

#[derive(Debug, Serialize)]
pub struct ParamFieldView {
    pub doc: Vec<String>,
    pub declaration: String,
}

#[derive(Debug, Serialize)]
pub struct ClientMethodView {
    pub name: String,
    pub doc: Vec<String>,
    pub signature: String,
    pub returns: String,
    /// Statements, relative to the method body indentation
    pub body: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RouteView {
    pub name: String,
    pub doc: Vec<String>,
    /// Go literal of the ServeMux pattern
    pub pattern: String,
    /// Interface method parameters after `w, r`
    pub arguments: String,
    /// Handler statements ending in the interface call
    pub body: Vec<String>,
}

pub struct OperationRenderer<'g> {
    graph: &'g TypeGraph,
}

impl<'g> OperationRenderer<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self { graph }
    }

    pub fn params_struct(&self, op: &OperationBinding) -> Option<ParamsView> {
        let params = op.params.as_ref()?;
        Some(ParamsView {
            name: params.identifier.clone(),
            doc: vec![format!(
                "// {} holds the query, header and cookie parameters of {}.",
                params.identifier, op.method_name
            )],
            fields: params
                .fields
                .iter()
                .map(|field| {
                    let mut doc = doc_lines(
                        &field.identifier,
                        field.description.as_deref(),
                        field.deprecated,
                    );
                    if doc.is_empty() {
                        doc.push(format!(
                            "// {} is the {} parameter {:?}.",
                            field.identifier,
                            field.location.as_str(),
                            field.original_name
                        ));
                    }
                    ParamFieldView {
                        doc,
                        declaration: format!("{} {}", field.identifier, self.param_type(field)),
                    }
                })
                .collect(),
        })
    }

    fn param_type(&self, param: &ParameterBinding) -> String {
        let ty = go_type(self.graph, param.ty);
        if param.pointer {
            format!("*{ty}")
        } else {
            ty
        }
    }

    fn item_type(&self, param: &ParameterBinding) -> String {
        match &self.graph.get(self.graph.resolve_alias(param.ty)).kind {
            TypeKind::Slice { item } => go_type(self.graph, *item),
            _ => go_type(self.graph, param.ty),
        }
    }

    fn response_type(&self, op: &OperationBinding) -> String {
        match &op.response {
            ResponseBinding::Typed { ty, .. } => format!("*{}", go_type(self.graph, *ty)),
            ResponseBinding::Transport => "*http.Response".to_string(),
        }
    }

    pub fn client_method(&self, op: &OperationBinding) -> ClientMethodView {
        let mut args = vec!["ctx context.Context".to_string()];
        for param in &op.path_params {
            args.push(format!("{} {}", param.identifier, self.param_type(param)));
        }
        if let Some(params) = &op.params {
            args.push(format!("params *{}", params.identifier));
        }
        if let Some(body) = &op.body {
            let ty = match (body.encoding, body.ty) {
                (BodyEncoding::Json, Some(ty)) => go_type(self.graph, ty),
                _ => "[]byte".to_string(),
            };
            args.push(format!("body {ty}"));
        }
        args.push("reqEditors ...RequestEditorFn".to_string());

        let mut body = Vec::new();
        let query_fields = located(op, ParameterLocation::Query);
        let query = if query_fields.is_empty() {
            "nil"
        } else {
            body.push("query := url.Values{}".to_string());
            body.push("if params != nil {".to_string());
            for field in &query_fields {
                body.extend(indent(self.send_statements(field, |wire, value| {
                    format!("query.Add({wire}, paramString({value}))")
                })));
            }
            body.push("}".to_string());
            "query"
        };

        let (reader, content_type) = match &op.body {
            Some(b) if b.encoding == BodyEncoding::Json => {
                body.extend([
                    "buf, err := json.Marshal(body)".to_string(),
                    "if err != nil {".to_string(),
                    "\treturn nil, err".to_string(),
                    "}".to_string(),
                ]);
                ("bytes.NewReader(buf)".to_string(), go_string(&b.content_type))
            }
            Some(b) => ("bytes.NewReader(body)".to_string(), go_string(&b.content_type)),
            None => ("nil".to_string(), "\"\"".to_string()),
        };

        body.push(format!(
            "req, err := c.newRequest(ctx, {}, {}, {query}, {reader}, {content_type})",
            go_string(op.http_method.as_str()),
            self.path_expression(op)
        ));
        body.extend(error_return());

        let header_fields = located(op, ParameterLocation::Header);
        let cookie_fields = located(op, ParameterLocation::Cookie);
        if !header_fields.is_empty() || !cookie_fields.is_empty() {
            body.push("if params != nil {".to_string());
            for field in header_fields {
                body.extend(indent(self.send_statements(field, |wire, value| {
                    format!("req.Header.Add({wire}, paramString({value}))")
                })));
            }
            for field in cookie_fields {
                body.extend(indent(self.send_statements(field, |wire, value| {
                    format!("req.AddCookie(&http.Cookie{{Name: {wire}, Value: paramString({value})}})")
                })));
            }
            body.push("}".to_string());
        }

        body.push("resp, err := c.do(req, reqEditors)".to_string());
        body.extend(error_return());

        match &op.response {
            ResponseBinding::Typed {
                ty, from_default, ..
            } => {
                let partial = if *from_default { "out" } else { "nil" };
                body.extend([
                    "defer resp.Body.Close()".to_string(),
                    format!("out := new({})", go_type(self.graph, *ty)),
                    format!("if err := decodeResponse(resp, out, {from_default}); err != nil {{"),
                    format!("\treturn {partial}, err"),
                    "}".to_string(),
                    "return out, nil".to_string(),
                ]);
            }
            ResponseBinding::Transport => body.push("return resp, nil".to_string()),
        }

        ClientMethodView {
            name: op.method_name.clone(),
            doc: self.operation_doc(op),
            signature: args.join(", "),
            returns: format!("({}, error)", self.response_type(op)),
            body,
        }
    }

    /// Statements adding one parameter to the request. Optional values are
    /// skipped when unset; slices send one value per element.
    fn send_statements(
        &self,
        field: &ParameterBinding,
        add: impl Fn(&str, &str) -> String,
    ) -> Vec<String> {
        let wire = go_string(&field.original_name);
        let access = format!("params.{}", field.identifier);
        if field.multi {
            return vec![
                format!("for _, item := range {access} {{"),
                format!("\t{}", add(&wire, "item")),
                "}".to_string(),
            ];
        }
        if field.pointer {
            return vec![
                format!("if {access} != nil {{"),
                format!("\t{}", add(&wire, &format!("*{access}"))),
                "}".to_string(),
            ];
        }
        if !field.required && self.graph.is_nilable(field.ty) {
            return vec![
                format!("if {access} != nil {{"),
                format!("\t{}", add(&wire, &access)),
                "}".to_string(),
            ];
        }
        vec![add(&wire, &access)]
    }

    /// Go expression building the request path.
    pub fn path_expression(&self, op: &OperationBinding) -> String {
        let parts: Vec<String> = parse_template(&op.path)
            .into_iter()
            .map(|part| match part {
                PathPart::Literal(text) => go_string(&text),
                PathPart::Param(name) => {
                    let ident = op
                        .path_params
                        .iter()
                        .find(|p| p.original_name == name)
                        .map(|p| p.identifier.as_str())
                        .unwrap_or("\"\"");
                    format!("encodePathParam({ident})")
                }
            })
            .collect();
        if parts.is_empty() {
            "\"\"".to_string()
        } else {
            parts.join(" + ")
        }
    }

    fn operation_doc(&self, op: &OperationBinding) -> Vec<String> {
        let text = match (&op.summary, &op.description) {
            (Some(summary), Some(description)) => Some(format!("{summary}\n\n{description}")),
            (Some(text), None) | (None, Some(text)) => Some(text.clone()),
            (None, None) => None,
        };
        let mut doc = doc_lines(&op.method_name, text.as_deref(), false);
        if doc.is_empty() {
            doc.push(format!("// {} calls {} {}.", op.method_name, op.http_method.as_str(), op.path));
        } else {
            doc.push("//".to_string());
            doc.push(format!("// {} {}", op.http_method.as_str(), op.path));
        }
        if op.deprecated {
            doc.push("//".to_string());
            doc.push(format!(
                "// Deprecated: {} is marked deprecated by the API description.",
                op.method_name
            ));
        }
        doc
    }

    pub fn route(&self, op: &OperationBinding) -> RouteView {
        let mut arguments = Vec::new();
        let mut call = vec!["w".to_string(), "r".to_string()];
        let mut body = Vec::new();

        let (pattern, sources) = self.route_pattern(op);
        for (param, source) in op.path_params.iter().zip(sources) {
            arguments.push(format!("{} {}", param.identifier, self.param_type(param)));
            call.push(param.identifier.clone());
            body.push(format!("var {} {}", param.identifier, self.param_type(param)));
            body.extend(parse_into(
                &source,
                &format!("&{}", param.identifier),
                &go_string(&param.original_name),
            ));
        }

        if let Some(params) = &op.params {
            arguments.push(format!("params {}", params.identifier));
            call.push("params".to_string());
            body.extend(self.read_params(params));
        }

        body.push(format!("si.{}({})", op.method_name, call.join(", ")));

        RouteView {
            name: op.method_name.clone(),
            doc: self.operation_doc(op),
            pattern: go_string(&pattern),
            arguments: arguments.join(", "),
            body,
        }
    }

    /// ServeMux pattern plus, per path argument, the expression yielding
    /// its raw text. A segment mixing placeholders with literal text is
    /// matched whole under one wildcard and cut apart with `pathPart`.
    fn route_pattern(&self, op: &OperationBinding) -> (String, Vec<String>) {
        let ident_of = |name: &str| {
            op.path_params
                .iter()
                .find(|p| p.original_name == name)
                .map(|p| p.identifier.clone())
        };

        let mut pattern = String::new();
        let mut wildcards: HashSet<String> = HashSet::new();
        let mut by_name: Vec<(String, String)> = Vec::new();
        for segment in op.path.split('/').skip(1) {
            pattern.push('/');
            let parts = parse_template(segment);
            let params: Vec<&str> = parts
                .iter()
                .filter_map(|p| match p {
                    PathPart::Param(name) => Some(name.as_str()),
                    PathPart::Literal(_) => None,
                })
                .collect();
            let Some(ident) = params.first().and_then(|name| ident_of(name)) else {
                pattern.push_str(segment);
                continue;
            };

            // Wildcard names must be unique within one pattern
            let mut wildcard = ident.clone();
            let mut n = 2;
            while !wildcards.insert(wildcard.clone()) {
                wildcard = format!("{ident}_{n}");
                n += 1;
            }
            pattern.push_str(&format!("{{{wildcard}}}"));

            let value = format!("r.PathValue({})", go_string(&wildcard));
            if let [PathPart::Param(name)] = parts.as_slice() {
                by_name.push((name.clone(), value));
                continue;
            }

            let (prefix, suffix, separators) = segment_literals(&parts);
            let separators: String = separators
                .iter()
                .map(|sep| format!(", {}", go_string(sep)))
                .collect();
            for (index, name) in params.iter().enumerate() {
                by_name.push((
                    name.to_string(),
                    format!(
                        "pathPart({value}, {index}, {}, {}{separators})",
                        go_string(prefix),
                        go_string(suffix)
                    ),
                ));
            }
        }
        if pattern.is_empty() || pattern.ends_with('/') {
            pattern.push_str("{$}");
            if !pattern.starts_with('/') {
                pattern.insert(0, '/');
            }
        }

        let sources = op
            .path_params
            .iter()
            .map(|param| {
                by_name
                    .iter()
                    .find(|(name, _)| *name == param.original_name)
                    .map(|(_, source)| source.clone())
                    .unwrap_or_else(|| "\"\"".to_string())
            })
            .collect();
        (format!("{} {pattern}", op.http_method.as_str()), sources)
    }

    fn read_params(&self, params: &ParamsStruct) -> Vec<String> {
        let mut body = vec![format!("var params {}", params.identifier)];
        if params
            .fields
            .iter()
            .any(|f| f.location == ParameterLocation::Query)
        {
            body.push("query := r.URL.Query()".to_string());
        }

        for field in &params.fields {
            let wire = go_string(&field.original_name);
            let values = match field.location {
                ParameterLocation::Query => format!("query[{wire}]"),
                ParameterLocation::Header => format!("r.Header.Values({wire})"),
                _ => format!("cookieValues(r, {wire})"),
            };
            let target = format!("params.{}", field.identifier);

            if field.multi {
                body.push(format!("for _, raw := range {values} {{"));
                body.push(format!("\tvar item {}", self.item_type(field)));
                body.extend(indent(parse_into("raw", "&item", &wire)));
                body.push(format!("\t{target} = append({target}, item)"));
                body.push("}".to_string());
                if field.required {
                    body.extend([
                        format!("if len({target}) == 0 {{"),
                        format!("\twriteParamError(w, {wire}, errMissingParam)"),
                        "\treturn".to_string(),
                        "}".to_string(),
                    ]);
                }
                continue;
            }

            body.push(format!("if values := {values}; len(values) > 0 {{"));
            if field.pointer {
                body.push(format!("\t{target} = new({})", go_type(self.graph, field.ty)));
                body.extend(indent(parse_into("values[0]", &target, &wire)));
            } else {
                body.extend(indent(parse_into("values[0]", &format!("&{target}"), &wire)));
            }
            if field.required {
                body.extend([
                    "} else {".to_string(),
                    format!("\twriteParamError(w, {wire}, errMissingParam)"),
                    "\treturn".to_string(),
                ]);
            }
            body.push("}".to_string());
        }
        body
    }
}

fn located(op: &OperationBinding, location: ParameterLocation) -> Vec<&ParameterBinding> {
    op.params
        .iter()
        .flat_map(|p| p.fields.iter())
        .filter(|f| f.location == location)
        .collect()
}

/// Leading literal, trailing literal and the literals between consecutive
/// placeholders of one segment (`""` where two placeholders touch).
fn segment_literals(parts: &[PathPart]) -> (&str, &str, Vec<&str>) {
    fn text(part: Option<&PathPart>) -> Option<&str> {
        match part {
            Some(PathPart::Literal(text)) => Some(text.as_str()),
            _ => None,
        }
    }
    let prefix = text(parts.first()).unwrap_or("");
    let suffix = match parts {
        [_, .., last] => text(Some(last)).unwrap_or(""),
        _ => "",
    };

    let mut separators = Vec::new();
    let mut after_param = false;
    let mut pending = "";
    for part in parts {
        match part {
            PathPart::Param(_) => {
                if after_param {
                    separators.push(pending);
                }
                after_param = true;
                pending = "";
            }
            PathPart::Literal(text) => pending = text.as_str(),
        }
    }
    (prefix, suffix, separators)
}

fn parse_into(source: &str, target: &str, wire: &str) -> Vec<String> {
    vec![
        format!("if err := parseParam({source}, {target}); err != nil {{"),
        format!("\twriteParamError(w, {wire}, err)"),
        "\treturn".to_string(),
        "}".to_string(),
    ]
}

fn error_return() -> [String; 3] {
    [
        "if err != nil {".to_string(),
        "\treturn nil, err".to_string(),
        "}".to_string(),
    ]
}

fn indent(lines: Vec<String>) -> impl Iterator<Item = String> {
    lines.into_iter().map(|line| format!("\t{line}"))
}
