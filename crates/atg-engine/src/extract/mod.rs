//! Parameter extraction: natural-language request to [`ParameterBag`].
//!
//! Two tiers. The rule tier always runs; the language-model tier only runs
//! when the rules recognize no resource kind, and can only fill fields the
//! rules left absent.

pub mod llm;
pub mod regions;
pub mod rules;

use atg_protocol::{Completeness, KnownParameters, ParameterBag, ResourceKind};

use crate::error::PipelineError;

pub use llm::LlmExtractor;
pub use regions::{canonical_region, find_region};
pub use rules::{RuleExtractor, name_parameter};

/// Tiered extractor.
pub struct ParameterExtractor {
    max_input_bytes: usize,
    rules: RuleExtractor,
    llm: Option<LlmExtractor>,
}

impl ParameterExtractor {
    pub fn new(max_input_bytes: usize) -> Self {
        Self {
            max_input_bytes,
            rules: RuleExtractor::new(),
            llm: None,
        }
    }

    pub fn with_llm(mut self, llm: LlmExtractor) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Reject input over the byte limit.
    pub fn check_input(&self, text: &str) -> Result<(), PipelineError> {
        if text.len() > self.max_input_bytes {
            return Err(PipelineError::InputTooLong {
                len: text.len(),
                max: self.max_input_bytes,
            });
        }
        Ok(())
    }

    /// Build the bag for one request.
    ///
    /// Fails only on oversize input or when the model tier is consulted and
    /// times out or is unreachable.
    pub async fn extract(
        &self,
        text: &str,
        known: &KnownParameters,
    ) -> Result<ParameterBag, PipelineError> {
        self.check_input(text)?;

        let mut bag = self.rules.extract(text, known);
        if bag.resource_kinds.is_empty() {
            if let Some(llm) = &self.llm {
                tracing::debug!(model = %llm.model_name(), "rules found no resource, asking model");
                let fallback = llm.extract(text, known).await?;
                bag.fill_absent_from(fallback);
            }
        }

        link_cross_refs(&mut bag, known);
        tracing::debug!(
            kinds = ?bag.resource_kinds,
            params = bag.len(),
            dropped = bag.dropped.len(),
            "extracted parameters"
        );
        Ok(bag)
    }
}

/// Give every requested kind its stable key, and point a requested load
/// balancer at the VM pool (or the network) when the request did not.
fn link_cross_refs(bag: &mut ParameterBag, known: &KnownParameters) {
    for kind in bag.resource_kinds.clone() {
        bag.set_cross_ref(kind, kind.slug());
    }

    if !bag.requests(ResourceKind::Lb) || bag.completeness("backend_ref") != Completeness::Absent {
        return;
    }
    let target = [ResourceKind::Vm, ResourceKind::Vnet]
        .into_iter()
        .find(|kind| bag.requests(*kind));
    if let Some(target) = target {
        let key = bag.cross_ref(target);
        bag.insert(known, "backend_ref", key.into(), Completeness::InferredDefault);
    }
}
