//! Deterministic, offline embedder over the resource vocabulary.

use async_trait::async_trait;

use atg_protocol::{CapabilityError, ResourceKind};

/// Weight of the shared "infrastructure" axis.
const INFRA_WEIGHT: f32 = 1.5;

/// Embeds text as a concept vector over resource kinds.
///
/// Dimension 0 is an infrastructure axis, set whenever any kind is
/// mentioned. Dimensions 1..=5 hold one axis per [`ResourceKind`]; the
/// mentioned kinds share unit mass (`1/sqrt(n)` each) so requests naming
/// several resources still sit close to each single-kind template. Text
/// that mentions no kind embeds to the zero vector and matches nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConceptEmbedder;

impl ConceptEmbedder {
    pub const DIMENSION: usize = 1 + ResourceKind::ALL.len();

    pub fn new() -> Self {
        Self
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; Self::DIMENSION];
        let hits: Vec<usize> = ResourceKind::ALL
            .iter()
            .enumerate()
            .filter(|(_, kind)| kind.mentioned_in(text))
            .map(|(i, _)| i + 1)
            .collect();
        if hits.is_empty() {
            return v;
        }

        let share = 1.0 / (hits.len() as f32).sqrt();
        v[0] = INFRA_WEIGHT;
        for i in hits {
            v[i] = share;
        }
        v
    }
}

#[async_trait]
impl crate::embedder::Embedder for ConceptEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn name(&self) -> &str {
        "concept"
    }
}
