//! Language-model extraction tier.
//!
//! Only consulted when the rules find no resource kind. The model answers
//! with a JSON object; anything unparseable yields an empty bag rather than
//! an error, so a confused model degrades to "out of scope" instead of
//! failing the request.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use atg_protocol::{
    CapabilityError, Completeness, KnownParameters, ParamValue, ParameterBag, ResourceKind,
    ValueShape,
};

use super::regions::canonical_region;
use crate::error::PipelineError;
use crate::llm::{LanguageModel, extract_json};

const SYSTEM_PROMPT: &str = r#"You extract Azure infrastructure requirements from operator requests.

Respond with ONLY a JSON object of this form:
{"resource_kinds": ["vm"], "parameters": {"region": "East US", "quantity": 2}}

resource_kinds uses these slugs, in the order the request mentions them:
- vm: virtual machines, servers
- aks: Azure Kubernetes Service clusters
- storage: storage accounts, blob containers
- vnet: virtual networks, subnets
- lb: load balancers

Include a parameter only when the request states it. Use an empty list for
resource_kinds when the request is not about these resources.

Parameters you may set:"#;

#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    resource_kinds: Vec<String>,
    #[serde(default)]
    parameters: serde_json::Map<String, serde_json::Value>,
}

/// Model-backed extractor with a hard deadline.
pub struct LlmExtractor {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl LlmExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn extract(
        &self,
        text: &str,
        known: &KnownParameters,
    ) -> Result<ParameterBag, PipelineError> {
        let system = system_prompt(known);
        let reply = match tokio::time::timeout(self.timeout, self.model.complete(&system, text)).await {
            Err(_) => {
                return Err(PipelineError::ExtractionTimeout(self.timeout.as_millis() as u64));
            }
            Ok(Err(CapabilityError::Malformed(reason))) => {
                tracing::warn!(model = %self.model.name(), %reason, "malformed extraction reply");
                return Ok(ParameterBag::new());
            }
            Ok(Err(err)) => return Err(PipelineError::from_extractor(err)),
            Ok(Ok(reply)) => reply,
        };
        Ok(parse_reply(&reply, known))
    }
}

fn system_prompt(known: &KnownParameters) -> String {
    let mut prompt = String::from(SYSTEM_PROMPT);
    for name in known.names() {
        let shape = match known.shape_of(name) {
            Some(ValueShape::Integer) => "integer",
            Some(ValueShape::List) => "list of strings",
            _ => "string",
        };
        prompt.push_str(&format!("\n- {name} ({shape})"));
    }
    prompt
}

/// Turn a model reply into a bag. Unknown kinds and values are skipped.
pub fn parse_reply(reply: &str, known: &KnownParameters) -> ParameterBag {
    let mut bag = ParameterBag::new();
    let raw: RawExtraction = match serde_json::from_str(extract_json(reply)) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "extraction reply is not the expected JSON");
            return bag;
        }
    };

    for name in &raw.resource_kinds {
        match ResourceKind::from_name(name) {
            Some(kind) => bag.add_resource_kind(kind),
            None => tracing::debug!(kind = %name, "ignoring unknown resource kind"),
        }
    }

    for (name, value) in raw.parameters {
        let value = match value {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(n) => ParamValue::Int(n),
                None => continue,
            },
            serde_json::Value::String(s) if name == "region" => {
                match canonical_region(&s) {
                    Some(region) => region.into(),
                    None => s.into(),
                }
            }
            serde_json::Value::String(s) => s.into(),
            serde_json::Value::Array(items) => ParamValue::List(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        serde_json::Value::String(s) => Some(s),
                        serde_json::Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => continue,
        };
        bag.insert(known, &name, value, Completeness::Explicit);
    }

    bag
}
