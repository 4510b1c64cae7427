//! Single-template customization.
//!
//! Pure: the same template and bag always give the same artifact. The
//! customizer knows nothing about other templates in the batch; it only
//! stamps the bag's cross-reference key on the artifact so the validator
//! can check references later.

use std::collections::HashMap;

use atg_protocol::{
    Completeness, CustomizedArtifact, NoteKind, ParamValue, ParameterBag, PlaceholderResolution,
    ResolutionNote, ResolutionSource, Syntax, ValueShape,
};
use atg_templates::placeholder;
use atg_templates::{ParamType, ParameterSpec, Template};

/// Resolve every placeholder of `template` against `bag`.
///
/// Priority per placeholder: bag value, then template default, then
/// unresolved. Unresolved optional placeholders render empty; unresolved
/// required and undeclared ones stay verbatim for the validator to report.
/// Required parameters the body never mentions still get a resolution.
pub fn customize(template: &Template, bag: &ParameterBag) -> CustomizedArtifact {
    let mut notes = Vec::new();
    let mut resolutions = Vec::new();
    let mut rendered: HashMap<String, String> = HashMap::new();

    let mut names = template.placeholders();
    let declared_only: Vec<String> = template
        .required_parameters()
        .map(|p| p.name.clone())
        .filter(|name| !names.contains(name))
        .collect();
    names.extend(declared_only);

    for name in names {
        let Some(spec) = template.parameter(&name) else {
            notes.push(ResolutionNote {
                field: name.clone(),
                kind: NoteKind::Undeclared,
                note: "placeholder has no declared parameter".into(),
            });
            resolutions.push(PlaceholderResolution {
                name,
                required: false,
                source: ResolutionSource::Unresolved,
                value: None,
                references: Vec::new(),
            });
            continue;
        };

        let (source, value) = resolve(spec, bag, &mut notes);
        match &value {
            Some(v) => {
                rendered.insert(name.clone(), render_escaped(v, template.syntax));
            }
            None if !spec.required => {
                rendered.insert(name.clone(), String::new());
            }
            None => {}
        }
        resolutions.push(PlaceholderResolution {
            name,
            required: spec.required,
            source,
            value,
            references: spec.references().to_vec(),
        });
    }

    let body = placeholder::render(&template.body, |name| rendered.get(name).cloned());

    tracing::debug!(
        template = %template.id,
        resolved = resolutions.iter().filter(|r| r.is_resolved()).count(),
        unresolved = resolutions.iter().filter(|r| !r.is_resolved()).count(),
        notes = notes.len(),
        "customized template"
    );

    CustomizedArtifact {
        template_id: template.id.clone(),
        template_version: template.version,
        resource_kind: template.resource_kind,
        xref_key: bag.cross_ref(template.resource_kind),
        syntax: template.syntax,
        body,
        resolutions,
        notes,
    }
}

fn resolve(
    spec: &ParameterSpec,
    bag: &ParameterBag,
    notes: &mut Vec<ResolutionNote>,
) -> (ResolutionSource, Option<ParamValue>) {
    if let Some(entry) = bag.entry(&spec.name) {
        let source = match entry.completeness {
            Completeness::Explicit => ResolutionSource::Request,
            _ => ResolutionSource::Inferred,
        };
        match conform(spec, &entry.value, notes) {
            Ok(value) => return (source, Some(value)),
            Err(reason) => {
                let fallback = match &spec.default {
                    Some(d) => format!("using default {d}"),
                    None => "no default to fall back to".to_string(),
                };
                notes.push(ResolutionNote {
                    field: spec.name.clone(),
                    kind: NoteKind::Fallback,
                    note: format!("{reason}; {fallback}"),
                });
            }
        }
    }

    match &spec.default {
        Some(default) => (ResolutionSource::Default, Some(default.clone())),
        None => (ResolutionSource::Unresolved, None),
    }
}

/// Render `value` for the inside of a string literal in `syntax`.
///
/// List items are quoted and escaped one by one.
fn render_escaped(value: &ParamValue, syntax: Syntax) -> String {
    let escape = |text: &str| match syntax {
        Syntax::Hcl => escape_hcl(text),
        Syntax::Json => escape_json(text),
    };
    match value {
        ParamValue::Int(n) => n.to_string(),
        ParamValue::Text(text) => escape(text),
        ParamValue::List(items) => {
            let quoted: Vec<String> = items.iter().map(|i| format!("\"{}\"", escape(i))).collect();
            format!("[{}]", quoted.join(", "))
        }
    }
}

/// Escape text for an HCL quoted string. `${` and `%{` become the literal
/// forms `$${` and `%%{`.
fn escape_hcl(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn escape_json(text: &str) -> String {
    let quoted = serde_json::Value::from(text).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Fit a bag value to the parameter's declared type.
fn conform(
    spec: &ParameterSpec,
    value: &ParamValue,
    notes: &mut Vec<ResolutionNote>,
) -> Result<ParamValue, String> {
    match &spec.kind {
        ParamType::Integer { min, max } => {
            let requested = value
                .as_int()
                .ok_or_else(|| format!("{value} is not an integer"))?;
            let lower = min.unwrap_or(i64::MIN);
            let upper = max.unwrap_or(i64::MAX);
            let clamped = requested.clamp(lower, upper);
            if clamped != requested {
                notes.push(ResolutionNote {
                    field: spec.name.clone(),
                    kind: NoteKind::Clamped,
                    note: format!("requested {requested}, clamped to {clamped}"),
                });
            }
            Ok(ParamValue::Int(clamped))
        }
        ParamType::Enum { allowed } => {
            let text = value.render();
            allowed
                .iter()
                .find(|a| a.eq_ignore_ascii_case(text.trim()))
                .map(|a| ParamValue::Text(a.clone()))
                .ok_or_else(|| format!("{text} is not one of {}", allowed.join(", ")))
        }
        ParamType::List => value
            .clone()
            .coerce(ValueShape::List)
            .ok_or_else(|| format!("{value} is not a list")),
        ParamType::String | ParamType::Reference { .. } => value
            .clone()
            .coerce(ValueShape::Text)
            .ok_or_else(|| format!("{value} is not text")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use atg_protocol::ResourceKind;
    use atg_templates::definition::parse_definition;
    use atg_templates::{BuiltinTemplateSource, TemplateCatalog, TemplateStore};

    async fn catalog() -> Arc<TemplateCatalog> {
        TemplateStore::new(Arc::new(BuiltinTemplateSource))
            .reload()
            .await
            .unwrap()
    }

    fn bag(
        catalog: &TemplateCatalog,
        values: &[(&str, ParamValue, Completeness)],
    ) -> ParameterBag {
        let mut bag = ParameterBag::new();
        for (name, value, completeness) in values {
            bag.insert(catalog.known_parameters(), name, value.clone(), *completeness);
        }
        bag
    }

    #[tokio::test]
    async fn vm_scenario_fills_request_and_defaults() {
        let catalog = catalog().await;
        let vm = catalog.get("virtual_machine").unwrap();
        let bag = bag(
            &catalog,
            &[
                ("region", "East US".into(), Completeness::Explicit),
                ("quantity", ParamValue::Int(2), Completeness::Explicit),
            ],
        );

        let artifact = customize(vm, &bag);
        assert!(artifact.is_complete());
        assert!(artifact.body.contains(r#"location = "East US""#));
        assert!(artifact.body.contains("count               = 2"));
        assert!(artifact.body.contains(r#"size                = "Standard_B2s""#));
        assert!(artifact.body.contains(r#"owner       = """#));
        assert_eq!(
            artifact.resolution("quantity").unwrap().source,
            ResolutionSource::Request
        );
        assert_eq!(
            artifact.resolution("vm_size").unwrap().source,
            ResolutionSource::Default
        );
        assert_eq!(
            artifact.resolution("owner").unwrap().source,
            ResolutionSource::Unresolved
        );
        assert_eq!(artifact.xref_key, "vm");
        assert!(placeholder::leftovers(&artifact.body).is_empty());
    }

    #[tokio::test]
    async fn out_of_range_quantity_is_clamped_and_noted() {
        let catalog = catalog().await;
        let vm = catalog.get("virtual_machine").unwrap();
        let bag = bag(
            &catalog,
            &[
                ("region", "East US".into(), Completeness::Explicit),
                ("quantity", ParamValue::Int(50), Completeness::Explicit),
            ],
        );

        let artifact = customize(vm, &bag);
        assert_eq!(
            artifact.resolution("quantity").unwrap().value,
            Some(ParamValue::Int(10))
        );
        let note = &artifact.notes[0];
        assert_eq!(note.field, "quantity");
        assert_eq!(note.kind, NoteKind::Clamped);
        assert!(note.note.contains("50"));
    }

    #[tokio::test]
    async fn enum_values_match_case_insensitively_or_fall_back() {
        let catalog = catalog().await;
        let vm = catalog.get("virtual_machine").unwrap();

        let ok = bag(
            &catalog,
            &[("vm_size", "standard_d4s_v3".into(), Completeness::Explicit)],
        );
        let artifact = customize(vm, &ok);
        assert_eq!(
            artifact.resolution("vm_size").unwrap().value,
            Some(ParamValue::Text("Standard_D4s_v3".into()))
        );

        let bad = bag(
            &catalog,
            &[("vm_size", "Standard_M416ms_v2".into(), Completeness::Explicit)],
        );
        let artifact = customize(vm, &bad);
        let resolution = artifact.resolution("vm_size").unwrap();
        assert_eq!(resolution.source, ResolutionSource::Default);
        assert_eq!(resolution.value, Some(ParamValue::Text("Standard_B2s".into())));
        assert_eq!(artifact.notes[0].kind, NoteKind::Fallback);
    }

    #[tokio::test]
    async fn missing_required_region_stays_verbatim() {
        let catalog = catalog().await;
        let storage = catalog.get("storage").unwrap();
        let artifact = customize(storage, &ParameterBag::new());
        assert!(!artifact.is_complete());
        assert!(artifact.body.contains("{{region}}"));
        let names: Vec<&str> = artifact
            .unresolved_required()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["region"]);
    }

    #[tokio::test]
    async fn implied_values_are_marked_inferred() {
        let catalog = catalog().await;
        let vm = catalog.get("virtual_machine").unwrap();
        let bag = bag(
            &catalog,
            &[("quantity", ParamValue::Int(1), Completeness::InferredDefault)],
        );
        let artifact = customize(vm, &bag);
        assert_eq!(
            artifact.resolution("quantity").unwrap().source,
            ResolutionSource::Inferred
        );
    }

    #[tokio::test]
    async fn every_template_completes_when_required_values_are_present() {
        let catalog = catalog().await;
        for template in catalog.templates() {
            let mut bag = ParameterBag::new();
            for spec in template.required_parameters() {
                let value = match &spec.kind {
                    ParamType::Integer { min, .. } => ParamValue::Int(min.unwrap_or(1)),
                    ParamType::Enum { allowed } => allowed[0].as_str().into(),
                    ParamType::List => ParamValue::List(vec!["x".into()]),
                    ParamType::Reference { references } => references[0].slug().into(),
                    ParamType::String => "x".into(),
                };
                bag.insert(catalog.known_parameters(), &spec.name, value, Completeness::Explicit);
            }
            let artifact = customize(template, &bag);
            assert!(artifact.is_complete(), "{} left required placeholders", template.id);
        }
    }

    #[tokio::test]
    async fn request_text_is_escaped_into_one_string() {
        let catalog = catalog().await;
        let vm = catalog.get("virtual_machine").unwrap();
        let bag = bag(
            &catalog,
            &[(
                "region",
                r#"East US", custom_data = "${file("/etc/passwd")}"#.into(),
                Completeness::Explicit,
            )],
        );

        let artifact = customize(vm, &bag);
        assert!(artifact.body.contains(
            r#"location = "East US\", custom_data = \"$${file(\"/etc/passwd\")}\"""#
        ));
        assert!(!artifact.body.contains(r#"custom_data = "${"#));
        // Template-owned interpolation is untouched
        assert!(artifact.body.contains("${count.index}"));
    }

    #[test]
    fn hcl_escaping_covers_quotes_backslashes_and_templates() {
        assert_eq!(escape_hcl(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape_hcl("x${y} %{if} $5 100%"), "x$${y} %%{if} $5 100%");
        assert_eq!(escape_hcl("one\ntwo"), r"one\ntwo");
        assert_eq!(
            render_escaped(
                &ParamValue::List(vec!["10.0.0.4".into(), r#"a"b"#.into()]),
                Syntax::Hcl
            ),
            r#"["10.0.0.4", "a\"b"]"#
        );
        assert_eq!(escape_json(r#"say "hi"\"#), r#"say \"hi\"\\"#);
    }

    #[test]
    fn required_parameter_missing_from_body_is_still_resolved() {
        let template = parse_definition(
            "drifted.toml",
            r#"
id = "drifted"
resource_kind = "vnet"
syntax = "hcl"
description = "virtual network whose body lost its location"
body = 'name = "{{vnet_name}}"'

[[parameters]]
name = "vnet_name"
type = "string"
default = "net"

[[parameters]]
name = "region"
type = "string"
required = true

[[parameters]]
name = "owner"
type = "string"
"#,
        )
        .unwrap();

        let artifact = customize(&template, &ParameterBag::new());
        let names: Vec<&str> = artifact.resolutions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["vnet_name", "region"]);
        assert!(!artifact.is_complete());

        let verdict = crate::validate::validate(vec![artifact]);
        assert!(verdict.has_reason("region", atg_protocol::Problem::UnresolvedRequired));
    }

    #[test]
    fn undeclared_placeholder_is_noted_and_kept() {
        let template = parse_definition(
            "odd.toml",
            r#"
id = "odd"
resource_kind = "vnet"
syntax = "hcl"
description = "virtual network with an odd body"
body = 'name = "{{vnet_name}}-{{mystery}}"'

[[parameters]]
name = "vnet_name"
type = "string"
default = "net"
"#,
        )
        .unwrap();

        let artifact = customize(&template, &ParameterBag::new());
        assert_eq!(artifact.body, r#"name = "net-{{mystery}}""#);
        assert_eq!(artifact.notes[0].kind, NoteKind::Undeclared);
        assert!(artifact.is_complete());
        assert_eq!(artifact.resource_kind, ResourceKind::Vnet);
    }
}
