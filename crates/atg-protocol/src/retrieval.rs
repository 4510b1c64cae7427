use serde::{Deserialize, Serialize};

use crate::resource::ResourceKind;

/// One ranked template for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub template_id: String,
    pub resource_kind: ResourceKind,
    /// Cosine similarity in [-1, 1].
    pub score: f64,
    pub in_scope: bool,
}

/// Ranked retrieval output with per-candidate and aggregate scope verdicts.
///
/// Candidates are sorted by descending score with at most one entry per
/// template id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub candidates: Vec<Candidate>,
    pub scope_threshold: f64,
    /// Set when no candidate reaches the scope threshold.
    pub out_of_scope: bool,
    /// Index snapshot the ranking was computed against.
    pub index_version: u64,
}

impl RetrievalResult {
    /// Classify ranked `(template_id, kind, score)` triples against `threshold`.
    ///
    /// `ranked` must already be in ranking order (the index owns tie-breaking);
    /// later duplicates of a template id are discarded.
    pub fn from_ranked(
        ranked: Vec<(String, ResourceKind, f64)>,
        threshold: f64,
        index_version: u64,
    ) -> Self {
        let mut candidates: Vec<Candidate> = Vec::with_capacity(ranked.len());
        for (template_id, resource_kind, score) in ranked {
            if candidates.iter().any(|c| c.template_id == template_id) {
                continue;
            }
            candidates.push(Candidate {
                in_scope: score >= threshold,
                template_id,
                resource_kind,
                score,
            });
        }
        let out_of_scope = !candidates.iter().any(|c| c.in_scope);
        Self {
            candidates,
            scope_threshold: threshold,
            out_of_scope,
            index_version,
        }
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn in_scope(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.in_scope)
    }

    /// Candidates to customize for a request naming `kinds`.
    ///
    /// With named kinds: the best candidate of each named kind, in ranking
    /// order. Without: the single best candidate. Unless `ignore_scope` is
    /// set, only in-scope candidates qualify.
    pub fn selection(&self, kinds: &[ResourceKind], ignore_scope: bool) -> Vec<&Candidate> {
        let eligible = self
            .candidates
            .iter()
            .filter(|c| ignore_scope || c.in_scope);

        if kinds.is_empty() {
            return eligible.take(1).collect();
        }

        let mut picked: Vec<&Candidate> = Vec::new();
        for candidate in eligible {
            if kinds.contains(&candidate.resource_kind)
                && !picked
                    .iter()
                    .any(|p| p.resource_kind == candidate.resource_kind)
            {
                picked.push(candidate);
            }
        }
        picked
    }
}
