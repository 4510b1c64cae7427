//! Versioned embedding index with atomic snapshot swaps.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use atg_protocol::{CapabilityError, ResourceKind};
use atg_templates::{Template, TemplateCatalog};

use crate::chunk::chunk_template;
use crate::embedder::Embedder;
use crate::error::{IndexError, IndexResult};
use crate::vector::cosine_similarity;

/// Index tuning knobs.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Scores closer than this are ties, broken by template id.
    pub tie_epsilon: f64,
    pub chunk_max_chars: usize,
    /// Deadline for every embedder call.
    pub embedding_timeout: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            tie_epsilon: 1e-6,
            chunk_max_chars: 400,
            embedding_timeout: Duration::from_secs(5),
        }
    }
}

/// One template's score for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTemplate {
    pub template_id: String,
    pub resource_kind: ResourceKind,
    pub score: f64,
}

#[derive(Debug)]
struct ChunkVector {
    /// Position of the owning template in the catalog.
    template: usize,
    vector: Vec<f32>,
}

/// An immutable, fully built index generation.
#[derive(Debug)]
pub struct IndexSnapshot {
    version: u64,
    built_at: DateTime<Utc>,
    embedder: String,
    catalog: Arc<TemplateCatalog>,
    chunks: Vec<ChunkVector>,
    dimension: usize,
    fingerprints: BTreeMap<String, String>,
    changed: Vec<String>,
}

impl IndexSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn embedder(&self) -> &str {
        &self.embedder
    }

    pub fn catalog(&self) -> &Arc<TemplateCatalog> {
        &self.catalog
    }

    pub fn template(&self, id: &str) -> Option<&Arc<Template>> {
        self.catalog.get(id)
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Content fingerprint each template was embedded from.
    pub fn fingerprint(&self, id: &str) -> Option<&str> {
        self.fingerprints.get(id).map(String::as_str)
    }

    /// Ids that were new or changed relative to the previous generation.
    pub fn changed_templates(&self) -> &[String] {
        &self.changed
    }

    /// Max-pooled cosine score of every template, in catalog order.
    ///
    /// Degenerate comparisons (zero-norm vectors) score 0.
    fn score_all(&self, query: &[f32]) -> Vec<ScoredTemplate> {
        let mut best = vec![f64::NEG_INFINITY; self.catalog.len()];
        for chunk in &self.chunks {
            let score = cosine_similarity(query, &chunk.vector).unwrap_or(0.0);
            if score > best[chunk.template] {
                best[chunk.template] = score;
            }
        }
        self.catalog
            .templates()
            .iter()
            .zip(best)
            .map(|(t, score)| ScoredTemplate {
                template_id: t.id.clone(),
                resource_kind: t.resource_kind,
                score: if score.is_finite() { score } else { 0.0 },
            })
            .collect()
    }
}

/// Sort by descending score, break near-ties by ascending id, keep `k`.
///
/// Scores within `epsilon` of the first score of a run form one tie group,
/// which is ordered by id. The result is deterministic for a given input.
pub fn rank(mut scored: Vec<ScoredTemplate>, k: usize, epsilon: f64) -> Vec<ScoredTemplate> {
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.template_id.cmp(&b.template_id))
    });

    let mut start = 0;
    while start < scored.len() {
        let lead = scored[start].score;
        let mut end = start + 1;
        while end < scored.len() && lead - scored[end].score <= epsilon {
            end += 1;
        }
        scored[start..end].sort_by(|a, b| a.template_id.cmp(&b.template_id));
        start = end;
    }

    scored.truncate(k);
    scored
}

/// Embedding index over a template catalog.
///
/// Reads clone the current snapshot `Arc` and never block on a rebuild for
/// longer than the pointer swap. Rebuilds are serialized.
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    config: IndexConfig,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    versions: AtomicU64,
    build_lock: tokio::sync::Mutex<()>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn Embedder>, config: IndexConfig) -> Self {
        Self {
            embedder,
            config,
            current: RwLock::new(None),
            versions: AtomicU64::new(0),
            build_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> IndexResult<Arc<IndexSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(IndexError::Unavailable)
    }

    /// Current version, or 0 when nothing has been built.
    pub fn version(&self) -> u64 {
        self.snapshot().map(|s| s.version()).unwrap_or(0)
    }

    /// Rebuild from `catalog` and publish the result.
    ///
    /// Everything is embedded before the swap. On failure the previous
    /// snapshot keeps serving.
    pub async fn build(&self, catalog: Arc<TemplateCatalog>) -> IndexResult<Arc<IndexSnapshot>> {
        let _guard = self.build_lock.lock().await;

        let mut owners = Vec::new();
        let mut texts = Vec::new();
        for (i, template) in catalog.templates().iter().enumerate() {
            for chunk in chunk_template(template, self.config.chunk_max_chars) {
                owners.push(i);
                texts.push(chunk.text);
            }
        }

        let vectors = match self.embed(&texts).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Index build failed, keeping previous snapshot");
                return Err(e);
            }
        };
        if vectors.len() != texts.len() {
            return Err(IndexError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension || v.is_empty()) {
            warn!(expected = dimension, got = bad.len(), "Index build failed, inconsistent vector dimensions");
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                got: bad.len(),
            });
        }

        let fingerprints: BTreeMap<String, String> = catalog
            .templates()
            .iter()
            .map(|t| (t.id.clone(), t.content_fingerprint()))
            .collect();
        let previous = self.snapshot().ok();
        let changed: Vec<String> = fingerprints
            .iter()
            .filter(|(id, fp)| {
                previous
                    .as_ref()
                    .and_then(|p| p.fingerprint(id))
                    .is_none_or(|old| old != fp.as_str())
            })
            .map(|(id, _)| id.clone())
            .collect();

        let chunks = owners
            .into_iter()
            .zip(vectors)
            .map(|(template, vector)| ChunkVector { template, vector })
            .collect::<Vec<_>>();

        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(IndexSnapshot {
            version,
            built_at: Utc::now(),
            embedder: self.embedder.name().to_string(),
            catalog,
            chunks,
            dimension,
            fingerprints,
            changed,
        });

        {
            let mut guard = self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = Some(Arc::clone(&snapshot));
        }

        info!(
            version,
            templates = snapshot.len(),
            chunks = snapshot.chunk_count(),
            dimension,
            changed = snapshot.changed_templates().len(),
            embedder = %snapshot.embedder(),
            "Embedding index swapped"
        );
        Ok(snapshot)
    }

    /// Query the current snapshot.
    pub async fn query(&self, text: &str, k: usize) -> IndexResult<Vec<ScoredTemplate>> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        let snapshot = self.snapshot()?;
        self.query_snapshot(&snapshot, text, k).await
    }

    /// Query a specific snapshot; a request pins one snapshot for its lifetime.
    pub async fn query_snapshot(
        &self,
        snapshot: &IndexSnapshot,
        text: &str,
        k: usize,
    ) -> IndexResult<Vec<ScoredTemplate>> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        let mut vectors = self.embed(&[text.to_string()]).await?;
        let query = vectors.pop().ok_or(IndexError::CountMismatch {
            expected: 1,
            got: 0,
        })?;
        if query.len() != snapshot.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: snapshot.dimension(),
                got: query.len(),
            });
        }

        let ranked = rank(snapshot.score_all(&query), k, self.config.tie_epsilon);
        for s in &ranked {
            debug!(template = %s.template_id, score = s.score, "Candidate score");
        }
        Ok(ranked)
    }

    async fn embed(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        let timeout = self.config.embedding_timeout;
        match tokio::time::timeout(timeout, self.embedder.embed(texts)).await {
            Ok(Ok(vectors)) => Ok(vectors),
            Ok(Err(CapabilityError::Timeout(ms))) => Err(IndexError::EmbeddingTimeout(ms)),
            Ok(Err(e)) => Err(IndexError::Embedder(e)),
            Err(_) => Err(IndexError::EmbeddingTimeout(timeout.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConceptEmbedder, FixedEmbedder, SlowEmbedder};
    use atg_templates::{BuiltinTemplateSource, TemplateStore};

    async fn builtin_catalog() -> Arc<TemplateCatalog> {
        Arc::new(
            TemplateStore::new(Arc::new(BuiltinTemplateSource))
                .load()
                .await
                .unwrap(),
        )
    }

    fn concept_index() -> EmbeddingIndex {
        EmbeddingIndex::new(Arc::new(ConceptEmbedder), IndexConfig::default())
    }

    fn scored(id: &str, score: f64) -> ScoredTemplate {
        ScoredTemplate {
            template_id: id.into(),
            resource_kind: ResourceKind::Vm,
            score,
        }
    }

    #[tokio::test]
    async fn unbuilt_index_is_unavailable() {
        let index = concept_index();
        assert!(matches!(
            index.query("virtual machine", 3).await,
            Err(IndexError::Unavailable)
        ));
        assert_eq!(index.version(), 0);
    }

    #[tokio::test]
    async fn zero_k_is_rejected() {
        let index = concept_index();
        index.build(builtin_catalog().await).await.unwrap();
        assert!(matches!(
            index.query("virtual machine", 0).await,
            Err(IndexError::InvalidK)
        ));
    }

    #[tokio::test]
    async fn results_are_sorted_unique_and_bounded() {
        let index = concept_index();
        index.build(builtin_catalog().await).await.unwrap();
        let queries = [
            "two virtual machines",
            "a kubernetes cluster with a load balancer",
            "storage account with GRS",
            "quantum database mesh",
            "",
        ];
        for q in queries {
            for k in [1, 2, 5, 50] {
                let out = index.query(q, k).await.unwrap();
                assert!(out.len() <= k.min(5), "{q} k={k}");
                for pair in out.windows(2) {
                    assert!(pair[0].score + 1e-6 >= pair[1].score, "{q}");
                }
                let mut ids: Vec<&str> = out.iter().map(|s| s.template_id.as_str()).collect();
                ids.sort();
                ids.dedup();
                assert_eq!(ids.len(), out.len());
            }
        }
    }

    #[tokio::test]
    async fn best_match_follows_resource_kind() {
        let index = concept_index();
        index.build(builtin_catalog().await).await.unwrap();
        let out = index.query("I need a storage account", 5).await.unwrap();
        assert_eq!(out[0].template_id, "storage");
        assert!((out[0].score - 1.0).abs() < 1e-6);
        assert!(out[1].score < 0.75);
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let index = concept_index();
        let catalog = builtin_catalog().await;
        let first = index.build(Arc::clone(&catalog)).await.unwrap();
        let q = "virtual machines behind a load balancer";
        let a = index.query(q, 5).await.unwrap();

        let second = index.build(catalog).await.unwrap();
        let b = index.query(q, 5).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(first.version() + 1, second.version());
        assert_eq!(first.changed_templates().len(), 5);
        assert!(second.changed_templates().is_empty());
    }

    #[tokio::test]
    async fn equal_scores_break_ties_by_id() {
        let index = EmbeddingIndex::new(
            Arc::new(FixedEmbedder::new(vec![1.0, 1.0])),
            IndexConfig::default(),
        );
        index.build(builtin_catalog().await).await.unwrap();
        let out = index.query("anything", 5).await.unwrap();
        let ids: Vec<&str> = out.iter().map(|s| s.template_id.as_str()).collect();
        assert_eq!(ids, vec!["aks", "lb", "storage", "virtual_machine", "vnet"]);
    }

    #[test]
    fn near_ties_within_epsilon_use_id_order() {
        let out = rank(
            vec![scored("b", 0.5 + 1e-9), scored("a", 0.5), scored("c", 0.9)],
            3,
            1e-6,
        );
        let ids: Vec<&str> = out.iter().map(|s| s.template_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn differences_beyond_epsilon_keep_score_order() {
        let out = rank(vec![scored("a", 0.5), scored("b", 0.6)], 2, 1e-6);
        assert_eq!(out[0].template_id, "b");
    }

    #[tokio::test]
    async fn query_timeout_is_reported() {
        let slow = SlowEmbedder::new(Arc::new(ConceptEmbedder), Duration::from_millis(300))
            .after_calls(1);
        let index = EmbeddingIndex::new(
            Arc::new(slow),
            IndexConfig {
                embedding_timeout: Duration::from_millis(50),
                ..IndexConfig::default()
            },
        );
        index.build(builtin_catalog().await).await.unwrap();
        assert!(matches!(
            index.query("virtual machine", 1).await,
            Err(IndexError::EmbeddingTimeout(50))
        ));
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_previous_snapshot() {
        let slow = SlowEmbedder::new(Arc::new(ConceptEmbedder), Duration::from_millis(300))
            .after_calls(1);
        let index = EmbeddingIndex::new(
            Arc::new(slow),
            IndexConfig {
                embedding_timeout: Duration::from_millis(50),
                ..IndexConfig::default()
            },
        );
        let catalog = builtin_catalog().await;
        index.build(Arc::clone(&catalog)).await.unwrap();
        assert!(index.build(catalog).await.is_err());
        assert_eq!(index.snapshot().unwrap().version(), 1);
    }

    #[tokio::test]
    async fn query_dimension_mismatch_is_an_error() {
        let embedder = FixedEmbedder::new(vec![1.0, 0.0]).with_rule("odd", vec![1.0, 0.0, 0.0]);
        let index = EmbeddingIndex::new(Arc::new(embedder), IndexConfig::default());
        index.build(builtin_catalog().await).await.unwrap();
        assert!(matches!(
            index.query("odd request", 1).await,
            Err(IndexError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        ));
    }
}
