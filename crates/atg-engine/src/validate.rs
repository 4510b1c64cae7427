//! Rule-based validation of a customized batch.
//!
//! Every rule runs over every artifact and all problems are reported; the
//! validator never stops at the first one and never edits an artifact.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use atg_protocol::{
    CustomizedArtifact, NoteKind, ParamValue, Problem, ResolutionSource, Syntax, ValidationIssue,
    ValidationVerdict,
};
use atg_templates::placeholder;

static RESOURCE_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*resource\s+"([^"]+)"\s+"([^"]+)""#).expect("resource regex is valid")
});

/// Validate `artifacts` as one batch.
pub fn validate(artifacts: Vec<CustomizedArtifact>) -> ValidationVerdict {
    let mut reasons = Vec::new();
    let mut warnings = Vec::new();

    let unresolved = check_unresolved(&artifacts, &mut reasons);
    check_references(&artifacts, &mut reasons, &mut warnings);
    check_interpolation(&artifacts, &mut reasons);
    for artifact in &artifacts {
        if let Some(issue) = check_structure(artifact) {
            reasons.push(issue);
        }
    }
    check_leftovers(&artifacts, &unresolved, &mut reasons);
    check_json(&artifacts, &mut reasons);
    check_addresses(&artifacts, &mut reasons);

    for artifact in &artifacts {
        for note in artifact.notes.iter().filter(|n| n.kind == NoteKind::Clamped) {
            warnings.push(ValidationIssue::new(
                &artifact.template_id,
                &note.field,
                Problem::Clamped,
                &note.note,
            ));
        }
    }

    if reasons.is_empty() {
        tracing::debug!(artifacts = artifacts.len(), warnings = warnings.len(), "batch accepted");
        ValidationVerdict::Accepted { artifacts, warnings }
    } else {
        tracing::debug!(reasons = reasons.len(), "batch rejected");
        ValidationVerdict::Rejected { reasons, warnings }
    }
}

/// Returns `(template_id, name)` pairs already reported.
fn check_unresolved(
    artifacts: &[CustomizedArtifact],
    reasons: &mut Vec<ValidationIssue>,
) -> HashSet<(String, String)> {
    let mut reported = HashSet::new();
    for artifact in artifacts {
        for resolution in artifact.unresolved_required() {
            reasons.push(ValidationIssue::new(
                &artifact.template_id,
                &resolution.name,
                Problem::UnresolvedRequired,
                "no value in request and no default",
            ));
            reported.insert((artifact.template_id.clone(), resolution.name.clone()));
        }
    }
    reported
}

fn check_references(
    artifacts: &[CustomizedArtifact],
    reasons: &mut Vec<ValidationIssue>,
    warnings: &mut Vec<ValidationIssue>,
) {
    for (i, artifact) in artifacts.iter().enumerate() {
        for resolution in artifact.resolutions.iter().filter(|r| !r.references.is_empty()) {
            let Some(ParamValue::Text(key)) = &resolution.value else {
                continue;
            };
            let found = artifacts.iter().enumerate().any(|(j, other)| {
                j != i && other.xref_key == *key && resolution.references.contains(&other.resource_kind)
            });
            if found {
                continue;
            }

            let allowed: Vec<&str> = resolution.references.iter().map(|k| k.slug()).collect();
            let detail = format!(
                "\"{key}\" matches no {} artifact in this batch",
                allowed.join("/")
            );
            if resolution.source == ResolutionSource::Request {
                warnings.push(ValidationIssue::new(
                    &artifact.template_id,
                    &resolution.name,
                    Problem::ExplicitValueKept,
                    detail,
                ));
            } else {
                reasons.push(ValidationIssue::new(
                    &artifact.template_id,
                    &resolution.name,
                    Problem::DanglingReference,
                    detail,
                ));
            }
        }
    }
}

/// Values taken from the request may not carry template sequences, even
/// though rendering escapes them.
fn check_interpolation(artifacts: &[CustomizedArtifact], reasons: &mut Vec<ValidationIssue>) {
    for artifact in artifacts {
        for resolution in &artifact.resolutions {
            if !matches!(
                resolution.source,
                ResolutionSource::Request | ResolutionSource::Inferred
            ) {
                continue;
            }
            let texts: Vec<&str> = match &resolution.value {
                Some(ParamValue::Text(text)) => vec![text.as_str()],
                Some(ParamValue::List(items)) => items.iter().map(String::as_str).collect(),
                _ => continue,
            };
            if let Some(text) = texts.iter().find(|t| t.contains("${") || t.contains("%{")) {
                reasons.push(ValidationIssue::new(
                    &artifact.template_id,
                    &resolution.name,
                    Problem::InterpolationInValue,
                    format!("{text:?} contains a template sequence"),
                ));
            }
        }
    }
}

/// First delimiter or string problem in the body, if any.
///
/// Understands `#`, `//` and `/* */` comments and backslash escapes.
/// Quoted strings may not span lines.
fn check_structure(artifact: &CustomizedArtifact) -> Option<ValidationIssue> {
    let issue = |problem, detail: String| {
        Some(ValidationIssue::new(
            &artifact.template_id,
            "body",
            problem,
            detail,
        ))
    };

    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut string_start: Option<usize> = None;
    let mut chars = artifact.body.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        if c == '\n' {
            if let Some(opened) = string_start {
                return issue(
                    Problem::UnterminatedString,
                    format!("string opened on line {opened} is not closed"),
                );
            }
            line += 1;
            continue;
        }

        if string_start.is_some() {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => string_start = None,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => string_start = Some(line),
            '#' => skip_line(&mut chars),
            '/' if chars.peek() == Some(&'/') => skip_line(&mut chars),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '{' | '[' | '(' => stack.push((c, line)),
            '}' | ']' | ')' => {
                let expected = match c {
                    '}' => '{',
                    ']' => '[',
                    _ => '(',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, opened)) => {
                        return issue(
                            Problem::UnbalancedDelimiter,
                            format!("line {line}: '{c}' closes '{open}' from line {opened}"),
                        );
                    }
                    None => {
                        return issue(
                            Problem::UnbalancedDelimiter,
                            format!("line {line}: unexpected '{c}'"),
                        );
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(opened) = string_start {
        return issue(
            Problem::UnterminatedString,
            format!("string opened on line {opened} is not closed"),
        );
    }
    if let Some((open, opened)) = stack.pop() {
        return issue(
            Problem::UnbalancedDelimiter,
            format!("'{open}' opened on line {opened} is not closed"),
        );
    }
    None
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while let Some(&c) = chars.peek() {
        if c == '\n' {
            break;
        }
        chars.next();
    }
}

fn check_leftovers(
    artifacts: &[CustomizedArtifact],
    already: &HashSet<(String, String)>,
    reasons: &mut Vec<ValidationIssue>,
) {
    for artifact in artifacts {
        let mut seen = HashSet::new();
        for token in placeholder::leftovers(&artifact.body) {
            let field = placeholder::leftover_name(&token).unwrap_or_else(|| token.clone());
            if already.contains(&(artifact.template_id.clone(), field.clone())) {
                continue;
            }
            if seen.insert(field.clone()) {
                reasons.push(ValidationIssue::new(
                    &artifact.template_id,
                    field,
                    Problem::LeftoverPlaceholder,
                    format!("{token} left in output"),
                ));
            }
        }
    }
}

fn check_json(artifacts: &[CustomizedArtifact], reasons: &mut Vec<ValidationIssue>) {
    for artifact in artifacts.iter().filter(|a| a.syntax == Syntax::Json) {
        if let Err(e) = serde_json::from_str::<serde_json::Value>(&artifact.body) {
            reasons.push(ValidationIssue::new(
                &artifact.template_id,
                "body",
                Problem::InvalidJson,
                e.to_string(),
            ));
        }
    }
}

fn check_addresses(artifacts: &[CustomizedArtifact], reasons: &mut Vec<ValidationIssue>) {
    let mut owners: HashMap<String, &str> = HashMap::new();
    for artifact in artifacts {
        for caps in RESOURCE_ADDRESS.captures_iter(&artifact.body) {
            let address = format!("{}.{}", &caps[1], &caps[2]);
            match owners.get(address.as_str()) {
                Some(owner) => reasons.push(ValidationIssue::new(
                    &artifact.template_id,
                    &address,
                    Problem::DuplicateResourceAddress,
                    format!("{address} is also declared by {owner}"),
                )),
                None => {
                    owners.insert(address, &artifact.template_id);
                }
            }
        }
    }
}
