//! TOML template definitions and curation checks.
//!
//! A definition file declares one template: identity, description facets,
//! typed parameters and the `{{placeholder}}` body. Loading rejects
//! definitions that could never customize cleanly.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::warn;

use atg_protocol::{ParamValue, ResourceKind, Syntax};

use crate::error::{TemplateError, TemplateResult};
use crate::placeholder;
use crate::types::{ParamType, ParameterSpec, Template};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTemplate {
    id: String,
    #[serde(default = "default_version")]
    version: u32,
    resource_kind: ResourceKind,
    #[serde(default)]
    syntax: Syntax,
    description: String,
    body: String,
    #[serde(default)]
    parameters: Vec<RawParameter>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParameter {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    required: bool,
    default: Option<toml::Value>,
    min: Option<i64>,
    max: Option<i64>,
    #[serde(default)]
    allowed: Vec<String>,
    #[serde(default)]
    references: Vec<ResourceKind>,
    description: Option<String>,
}

fn default_version() -> u32 {
    1
}

/// Parse and curate a single template definition.
///
/// `source_name` only labels parse errors (usually the file name).
pub fn parse_definition(source_name: &str, text: &str) -> TemplateResult<Template> {
    let raw: RawTemplate = toml::from_str(text).map_err(|e| TemplateError::Parse {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })?;
    build(raw)
}

fn build(raw: RawTemplate) -> TemplateResult<Template> {
    let id = raw.id.trim().to_string();
    if id.is_empty() {
        return Err(TemplateError::Invalid {
            id,
            message: "template id is empty".into(),
        });
    }
    if raw.body.trim().is_empty() {
        return Err(invalid(&id, "template body is empty"));
    }
    if raw.description.trim().is_empty() {
        return Err(invalid(&id, "template description is empty"));
    }

    let mut seen = HashSet::new();
    let mut parameters = Vec::with_capacity(raw.parameters.len());
    for param in raw.parameters {
        if !seen.insert(param.name.clone()) {
            return Err(invalid(
                &id,
                format!("duplicate parameter name `{}`", param.name),
            ));
        }
        parameters.push(build_parameter(&id, param)?);
    }

    let template = Template {
        id,
        version: raw.version,
        resource_kind: raw.resource_kind,
        syntax: raw.syntax,
        description: raw.description.trim().to_string(),
        parameters,
        body: raw.body,
    };
    report_placeholder_drift(&template);
    Ok(template)
}

fn build_parameter(id: &str, raw: RawParameter) -> TemplateResult<ParameterSpec> {
    if !is_placeholder_name(&raw.name) {
        return Err(invalid(
            id,
            format!("parameter name `{}` is not a valid placeholder name", raw.name),
        ));
    }

    let kind = match raw.kind.as_str() {
        "string" => ParamType::String,
        "list" => ParamType::List,
        "integer" => {
            if let (Some(min), Some(max)) = (raw.min, raw.max)
                && min > max
            {
                return Err(invalid(
                    id,
                    format!("parameter `{}` has min {min} > max {max}", raw.name),
                ));
            }
            ParamType::Integer {
                min: raw.min,
                max: raw.max,
            }
        }
        "enum" => {
            if raw.allowed.is_empty() {
                return Err(invalid(
                    id,
                    format!("enum parameter `{}` declares no allowed values", raw.name),
                ));
            }
            ParamType::Enum {
                allowed: raw.allowed,
            }
        }
        "reference" => {
            if raw.references.is_empty() {
                return Err(invalid(
                    id,
                    format!("reference parameter `{}` names no resource kinds", raw.name),
                ));
            }
            ParamType::Reference {
                references: raw.references,
            }
        }
        other => {
            return Err(invalid(
                id,
                format!("parameter `{}` has unknown type `{other}`", raw.name),
            ));
        }
    };

    let default = match raw.default {
        Some(value) => Some(convert_default(id, &raw.name, &kind, value)?),
        None => None,
    };

    Ok(ParameterSpec {
        name: raw.name,
        kind,
        required: raw.required,
        default,
        description: raw.description,
    })
}

fn convert_default(
    id: &str,
    name: &str,
    kind: &ParamType,
    value: toml::Value,
) -> TemplateResult<ParamValue> {
    let converted = match value {
        toml::Value::Integer(n) => ParamValue::Int(n),
        toml::Value::String(s) => ParamValue::Text(s),
        toml::Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    toml::Value::String(s) => list.push(s),
                    other => {
                        return Err(invalid(
                            id,
                            format!(
                                "default of `{name}` contains a non-string item: {other}"
                            ),
                        ));
                    }
                }
            }
            ParamValue::List(list)
        }
        other => {
            return Err(invalid(
                id,
                format!("default of `{name}` has unsupported TOML type `{}`", other.type_str()),
            ));
        }
    };

    if converted.shape() != kind.shape() {
        return Err(invalid(
            id,
            format!("default of `{name}` does not match declared type `{}`", kind.name()),
        ));
    }

    match (kind, &converted) {
        (ParamType::Integer { min, max }, ParamValue::Int(n)) => {
            if min.is_some_and(|lo| *n < lo) || max.is_some_and(|hi| *n > hi) {
                return Err(invalid(
                    id,
                    format!("default {n} of `{name}` lies outside its [min, max] range"),
                ));
            }
        }
        (ParamType::Enum { allowed }, ParamValue::Text(s)) => {
            if !allowed.iter().any(|a| a == s) {
                return Err(invalid(
                    id,
                    format!("default `{s}` of `{name}` is not an allowed value"),
                ));
            }
        }
        _ => {}
    }
    Ok(converted)
}

/// Mismatches between declared parameters and body placeholders are
/// reported, not rejected. Undeclared placeholders surface later as
/// validation failures.
fn report_placeholder_drift(template: &Template) {
    let used = template.placeholders();
    for param in &template.parameters {
        if !used.iter().any(|u| *u == param.name) {
            warn!(template = %template.id, parameter = %param.name, "Declared parameter is never used in the body");
        }
    }
    for name in &used {
        if template.parameter(name).is_none() {
            warn!(template = %template.id, placeholder = %name, "Body placeholder has no declared parameter");
        }
    }
}

fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn invalid(id: &str, message: impl Into<String>) -> TemplateError {
    TemplateError::Invalid {
        id: id.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
id = "storage"
version = 3
resource_kind = "storage"
description = """
Storage account.

Replication.
"""
body = '''
resource "azurerm_storage_account" "storage" {
  location = "{{region}}"
  replication = "{{replication}}"
}
'''

[[parameters]]
name = "region"
type = "string"
required = true

[[parameters]]
name = "replication"
type = "enum"
allowed = ["LRS", "GRS"]
default = "LRS"
"#;

    fn with_parameters(params: &str) -> String {
        format!(
            "id = \"t\"\nresource_kind = \"vm\"\ndescription = \"vm\"\nbody = \"{{{{quantity}}}}\"\n{params}"
        )
    }

    #[test]
    fn parses_minimal_definition() {
        let t = parse_definition("storage.toml", MINIMAL).unwrap();
        assert_eq!(t.id, "storage");
        assert_eq!(t.version, 3);
        assert_eq!(t.resource_kind, ResourceKind::Storage);
        assert_eq!(t.syntax, Syntax::Hcl);
        assert_eq!(t.parameters.len(), 2);
        assert!(t.parameters[0].required);
        assert_eq!(
            t.parameter("replication").unwrap().default,
            Some(ParamValue::Text("LRS".into()))
        );
    }

    #[test]
    fn version_defaults_to_one() {
        let text = with_parameters("");
        let t = parse_definition("t.toml", &text).unwrap();
        assert_eq!(t.version, 1);
        assert!(t.parameters.is_empty());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = parse_definition("broken.toml", "id = ").unwrap_err();
        assert!(matches!(err, TemplateError::Parse { ref source_name, .. } if source_name == "broken.toml"));
    }

    #[test]
    fn rejects_duplicate_parameter_names() {
        let text = with_parameters(
            "[[parameters]]\nname = \"quantity\"\ntype = \"integer\"\n\n[[parameters]]\nname = \"quantity\"\ntype = \"string\"\n",
        );
        let err = parse_definition("t.toml", &text).unwrap_err();
        assert!(err.to_string().contains("duplicate parameter"));
    }

    #[test]
    fn rejects_default_outside_range() {
        let text = with_parameters(
            "[[parameters]]\nname = \"quantity\"\ntype = \"integer\"\ndefault = 20\nmin = 1\nmax = 10\n",
        );
        let err = parse_definition("t.toml", &text).unwrap_err();
        assert!(matches!(err, TemplateError::Invalid { .. }));
    }

    #[test]
    fn rejects_min_above_max() {
        let text = with_parameters(
            "[[parameters]]\nname = \"quantity\"\ntype = \"integer\"\nmin = 5\nmax = 1\n",
        );
        let err = parse_definition("t.toml", &text).unwrap_err();
        assert!(err.to_string().contains("min 5 > max 1"));
    }

    #[test]
    fn rejects_enum_default_not_allowed() {
        let text = with_parameters(
            "[[parameters]]\nname = \"quantity\"\ntype = \"enum\"\nallowed = [\"a\"]\ndefault = \"b\"\n",
        );
        assert!(parse_definition("t.toml", &text).is_err());
    }

    #[test]
    fn rejects_default_of_wrong_shape() {
        let text = with_parameters(
            "[[parameters]]\nname = \"quantity\"\ntype = \"integer\"\ndefault = \"three\"\n",
        );
        assert!(parse_definition("t.toml", &text).is_err());
    }

    #[test]
    fn rejects_unknown_parameter_type() {
        let text = with_parameters("[[parameters]]\nname = \"quantity\"\ntype = \"float\"\n");
        let err = parse_definition("t.toml", &text).unwrap_err();
        assert!(err.to_string().contains("unknown type"));
    }

    #[test]
    fn rejects_invalid_parameter_name() {
        let text = with_parameters("[[parameters]]\nname = \"Quantity\"\ntype = \"string\"\n");
        assert!(parse_definition("t.toml", &text).is_err());
    }

    #[test]
    fn reference_requires_targets() {
        let text = with_parameters("[[parameters]]\nname = \"quantity\"\ntype = \"reference\"\n");
        assert!(parse_definition("t.toml", &text).is_err());
    }

    #[test]
    fn list_default_converts() {
        let text = with_parameters(
            "[[parameters]]\nname = \"quantity\"\ntype = \"list\"\ndefault = [\"10.0.0.4\"]\n",
        );
        let t = parse_definition("t.toml", &text).unwrap();
        assert_eq!(
            t.parameters[0].default,
            Some(ParamValue::List(vec!["10.0.0.4".into()]))
        );
    }

    #[test]
    fn unused_parameter_is_accepted() {
        let text = with_parameters(
            "[[parameters]]\nname = \"quantity\"\ntype = \"integer\"\n\n[[parameters]]\nname = \"owner\"\ntype = \"string\"\n",
        );
        let t = parse_definition("t.toml", &text).unwrap();
        assert_eq!(t.parameters.len(), 2);
    }
}
