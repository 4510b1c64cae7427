//! Scope-aware retrieval for one request.

use std::sync::Arc;

use atg_protocol::{ParameterBag, RetrievalResult};

use crate::error::IndexResult;
use crate::index::{EmbeddingIndex, IndexSnapshot};

/// Ranks every template for a request and classifies scope.
pub struct Retriever {
    index: Arc<EmbeddingIndex>,
    scope_threshold: f64,
}

impl Retriever {
    pub fn new(index: Arc<EmbeddingIndex>, scope_threshold: f64) -> Self {
        Self {
            index,
            scope_threshold,
        }
    }

    pub fn scope_threshold(&self) -> f64 {
        self.scope_threshold
    }

    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    /// Deterministic query text: the raw request, then the display names of
    /// any resource kinds the extractor found.
    pub fn query_text(bag: &ParameterBag, raw_text: &str) -> String {
        if bag.resource_kinds.is_empty() {
            return raw_text.to_string();
        }
        let names: Vec<&str> = bag
            .resource_kinds
            .iter()
            .map(|k| k.display_name())
            .collect();
        format!("{raw_text} | resources: {}", names.join(", "))
    }

    /// Retrieve against the current snapshot.
    pub async fn retrieve(&self, bag: &ParameterBag, raw_text: &str) -> IndexResult<RetrievalResult> {
        let snapshot = self.index.snapshot()?;
        self.retrieve_in(&snapshot, bag, raw_text).await
    }

    /// Retrieve against a pinned snapshot with `k` = corpus size.
    pub async fn retrieve_in(
        &self,
        snapshot: &IndexSnapshot,
        bag: &ParameterBag,
        raw_text: &str,
    ) -> IndexResult<RetrievalResult> {
        let query = Self::query_text(bag, raw_text);
        let ranked = self
            .index
            .query_snapshot(snapshot, &query, snapshot.len().max(1))
            .await?;
        let result = RetrievalResult::from_ranked(
            ranked
                .into_iter()
                .map(|s| (s.template_id, s.resource_kind, s.score))
                .collect(),
            self.scope_threshold,
            snapshot.version(),
        );
        tracing::info!(
            candidates = result.candidates.len(),
            in_scope = result.in_scope().count(),
            out_of_scope = result.out_of_scope,
            best = result.best().map(|c| c.score).unwrap_or(0.0),
            "Retrieval complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConceptEmbedder, IndexConfig};
    use atg_protocol::{ResourceKind, RetrievalResult};
    use atg_templates::{BuiltinTemplateSource, TemplateStore};

    async fn retriever(threshold: f64) -> Retriever {
        let catalog = TemplateStore::new(Arc::new(BuiltinTemplateSource))
            .load()
            .await
            .unwrap();
        let index = Arc::new(EmbeddingIndex::new(
            Arc::new(ConceptEmbedder),
            IndexConfig::default(),
        ));
        index.build(Arc::new(catalog)).await.unwrap();
        Retriever::new(index, threshold)
    }

    fn bag(kinds: &[ResourceKind]) -> ParameterBag {
        let mut bag = ParameterBag::new();
        for k in kinds {
            bag.add_resource_kind(*k);
        }
        bag
    }

    #[test]
    fn query_text_appends_kind_hints() {
        let b = bag(&[ResourceKind::Vm, ResourceKind::Lb]);
        assert_eq!(
            Retriever::query_text(&b, "two vms"),
            "two vms | resources: Virtual Machine, Load Balancer"
        );
        assert_eq!(Retriever::query_text(&ParameterBag::new(), "raw"), "raw");
    }

    #[tokio::test]
    async fn vm_and_lb_request_is_in_scope_for_both() {
        let r = retriever(0.75).await;
        let text = "Create 2 virtual machines in East US with a load balancer";
        let b = bag(&[ResourceKind::Vm, ResourceKind::Lb]);
        let result = r.retrieve(&b, text).await.unwrap();

        assert!(!result.out_of_scope);
        assert_eq!(result.candidates.len(), 5);
        let in_scope: Vec<&str> = result.in_scope().map(|c| c.template_id.as_str()).collect();
        assert_eq!(in_scope, vec!["lb", "virtual_machine"]);
        let picked = result.selection(&b.resource_kinds, false);
        assert_eq!(picked.len(), 2);
        assert_eq!(result.index_version, 1);
    }

    #[tokio::test]
    async fn unrelated_request_is_out_of_scope_but_ranked() {
        let r = retriever(0.75).await;
        let result: RetrievalResult = r
            .retrieve(&ParameterBag::new(), "Deploy a quantum database mesh")
            .await
            .unwrap();
        assert!(result.out_of_scope);
        assert_eq!(result.candidates.len(), 5);
        assert!(result.candidates.iter().all(|c| !c.in_scope));
    }

    #[tokio::test]
    async fn threshold_is_configurable() {
        let r = retriever(0.5).await;
        let result = r
            .retrieve(&bag(&[ResourceKind::Vm]), "a virtual machine")
            .await
            .unwrap();
        assert_eq!(result.in_scope().count(), 5);
        assert_eq!(result.scope_threshold, 0.5);
    }
}
