//! Deterministic embedder stubs for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use atg_protocol::CapabilityError;

use crate::embedder::Embedder;

/// Returns a fixed vector per text: the first rule whose needle occurs in
/// the text (case-insensitive), otherwise the fallback.
#[derive(Debug, Clone)]
pub struct FixedEmbedder {
    rules: Vec<(String, Vec<f32>)>,
    fallback: Vec<f32>,
    calls: Arc<AtomicUsize>,
}

impl FixedEmbedder {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_rule(mut self, needle: impl Into<String>, vector: Vec<f32>) -> Self {
        self.rules.push((needle.into().to_lowercase(), vector));
        self
    }

    /// Number of `embed` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|(needle, _)| lower.contains(needle.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Wraps another embedder and sleeps before each call.
///
/// The first `fast_calls` calls skip the delay, so an index can be built
/// quickly and then time out on queries.
pub struct SlowEmbedder {
    inner: Arc<dyn Embedder>,
    delay: Duration,
    fast_calls: usize,
    calls: AtomicUsize,
}

impl SlowEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            fast_calls: 0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn after_calls(mut self, fast_calls: usize) -> Self {
        self.fast_calls = fast_calls;
        self
    }
}

#[async_trait]
impl Embedder for SlowEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n >= self.fast_calls {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.embed(texts).await
    }

    fn name(&self) -> &str {
        "slow"
    }
}
