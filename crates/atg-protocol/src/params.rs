use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resource::ResourceKind;

/// A typed parameter value.
///
/// Enum and reference parameters travel as `Text`; the template schema
/// decides whether the text is one of an allowed set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn shape(&self) -> ValueShape {
        match self {
            Self::Int(_) => ValueShape::Integer,
            Self::Text(_) => ValueShape::Text,
            Self::List(_) => ValueShape::List,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::List(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into `shape`, if the conversion is lossless enough to trust.
    pub fn coerce(self, shape: ValueShape) -> Option<ParamValue> {
        match (self, shape) {
            (v @ Self::Int(_), ValueShape::Integer) => Some(v),
            (v @ Self::Text(_), ValueShape::Text) => Some(v),
            (v @ Self::List(_), ValueShape::List) => Some(v),
            (Self::Int(n), ValueShape::Text) => Some(Self::Text(n.to_string())),
            (Self::Text(s), ValueShape::Integer) => s.trim().parse().ok().map(Self::Int),
            (Self::Text(s), ValueShape::List) => Some(Self::List(
                s.split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect(),
            )),
            (Self::List(items), ValueShape::Text) if items.len() == 1 => {
                items.into_iter().next().map(Self::Text)
            }
            _ => None,
        }
    }

    /// Render the value as it should appear inside a configuration body.
    ///
    /// Lists render as a quoted, comma-separated HCL list literal.
    pub fn render(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => {
                let quoted: Vec<String> = items.iter().map(|i| format!("\"{i}\"")).collect();
                format!("[{}]", quoted.join(", "))
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Storage shape of a parameter, independent of per-template constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    Integer,
    Text,
    List,
}

/// How a field of the bag came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    /// Stated in the request.
    Explicit,
    /// Implied by the phrasing ("a VM" means one VM).
    InferredDefault,
    /// Not mentioned.
    Absent,
}

/// Union of parameter names (and their shapes) across all known templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownParameters {
    shapes: BTreeMap<String, ValueShape>,
}

impl KnownParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a name. Returns the previously registered shape if it differs.
    pub fn register(&mut self, name: impl Into<String>, shape: ValueShape) -> Option<ValueShape> {
        let name = name.into();
        match self.shapes.get(&name) {
            Some(existing) if *existing != shape => Some(*existing),
            Some(_) => None,
            None => {
                self.shapes.insert(name, shape);
                None
            }
        }
    }

    pub fn shape_of(&self, name: &str) -> Option<ValueShape> {
        self.shapes.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// A bag value together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagEntry {
    pub value: ParamValue,
    pub completeness: Completeness,
}

/// Structured, request-scoped form of a natural-language request.
///
/// Every key in `params` is a known parameter name; anything else is refused
/// at insertion time and recorded in `dropped`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterBag {
    /// Requested resource kinds, in order of first mention.
    #[serde(default)]
    pub resource_kinds: Vec<ResourceKind>,
    #[serde(default)]
    params: BTreeMap<String, BagEntry>,
    /// Stable cross-reference key per requested kind.
    #[serde(default)]
    cross_refs: BTreeMap<ResourceKind, String>,
    /// Keys refused because no template declares them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<String>,
}

impl ParameterBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource_kind(&mut self, kind: ResourceKind) {
        if !self.resource_kinds.contains(&kind) {
            self.resource_kinds.push(kind);
        }
    }

    pub fn requests(&self, kind: ResourceKind) -> bool {
        self.resource_kinds.contains(&kind)
    }

    /// Insert a value for a known parameter.
    ///
    /// Unknown names and values that cannot be coerced to the registered
    /// shape are dropped with a warning. Returns whether the value was kept.
    pub fn insert(
        &mut self,
        known: &KnownParameters,
        name: &str,
        value: ParamValue,
        completeness: Completeness,
    ) -> bool {
        let Some(shape) = known.shape_of(name) else {
            tracing::warn!(parameter = %name, "dropping unrecognized parameter");
            self.dropped.push(name.to_string());
            return false;
        };
        let Some(value) = value.coerce(shape) else {
            tracing::warn!(parameter = %name, expected = ?shape, "dropping parameter with mismatched type");
            self.dropped.push(name.to_string());
            return false;
        };
        self.params
            .insert(name.to_string(), BagEntry { value, completeness });
        true
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name).map(|e| &e.value)
    }

    pub fn entry(&self, name: &str) -> Option<&BagEntry> {
        self.params.get(name)
    }

    pub fn completeness(&self, name: &str) -> Completeness {
        self.params
            .get(name)
            .map_or(Completeness::Absent, |e| e.completeness)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &BagEntry)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.resource_kinds.is_empty()
    }

    /// Cross-reference key for `kind`; the kind slug unless overridden.
    pub fn cross_ref(&self, kind: ResourceKind) -> String {
        self.cross_refs
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| kind.slug().to_string())
    }

    pub fn set_cross_ref(&mut self, kind: ResourceKind, key: impl Into<String>) {
        self.cross_refs.insert(kind, key.into());
    }

    /// Fill fields this bag lacks from `other`, leaving present fields alone.
    pub fn fill_absent_from(&mut self, other: ParameterBag) {
        for kind in other.resource_kinds {
            self.add_resource_kind(kind);
        }
        for (name, entry) in other.params {
            self.params.entry(name).or_insert(entry);
        }
        for (kind, key) in other.cross_refs {
            self.cross_refs.entry(kind).or_insert(key);
        }
        self.dropped.extend(other.dropped);
    }
}
