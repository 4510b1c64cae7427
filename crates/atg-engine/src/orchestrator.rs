//! Request state machine.
//!
//! `Extracting → Retrieving → (OutOfScope | Customizing) → Validating →
//! (Accepted | Rejected)`, with `Failed` reachable from every non-terminal
//! state. Each request pins one index snapshot at entry and uses it (and
//! the catalog it was built from) until the end, so a concurrent reload
//! never mixes two corpora in one answer.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use atg_protocol::{
    Outcome, ParameterBag, PipelineReport, PipelineState, RetrievalResult, ValidationVerdict,
};
use atg_retrieval::{
    ConceptEmbedder, Embedder, EmbeddingIndex, IndexSnapshot, OllamaEmbedder,
    OllamaEmbedderConfig, Retriever,
};
use atg_templates::{BuiltinTemplateSource, DirTemplateSource, TemplateSource, TemplateStore};

use crate::advisor::LlmAdvisor;
use crate::compose::compose;
use crate::config::{EmbedderKind, EngineConfig};
use crate::customize::customize;
use crate::error::{PipelineError, ReloadError};
use crate::extract::{LlmExtractor, ParameterExtractor};
use crate::llm::LanguageModel;
use crate::sink::ArtifactSink;
use crate::validate::validate;

/// One generation request.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    /// Customize the best candidates even when nothing is in scope.
    #[serde(default)]
    pub allow_out_of_scope: bool,
}

impl GenerateRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            allow_out_of_scope: false,
        }
    }
}

/// Visited states of one run.
struct Trace {
    states: Vec<PipelineState>,
}

impl Trace {
    fn new() -> Self {
        Self {
            states: vec![PipelineState::Extracting],
        }
    }

    fn current(&self) -> PipelineState {
        self.states
            .last()
            .copied()
            .unwrap_or(PipelineState::Extracting)
    }

    /// Record `next`. An illegal edge is a pipeline bug: it panics in debug
    /// builds and is logged in release builds.
    fn enter(&mut self, next: PipelineState) {
        let from = self.current();
        debug_assert!(
            from.can_transition_to(next),
            "illegal pipeline transition {from:?} -> {next:?}"
        );
        if !from.can_transition_to(next) {
            warn!(?from, to = ?next, "illegal pipeline transition");
        }
        debug!(?from, to = ?next, "pipeline transition");
        self.states.push(next);
    }
}

/// Race `fut` against cancellation.
async fn guarded<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        result = fut => result,
    }
}

/// Owns the shared, read-mostly state and runs requests against it.
pub struct Orchestrator {
    store: Arc<TemplateStore>,
    index: Arc<EmbeddingIndex>,
    retriever: Retriever,
    extractor: ParameterExtractor,
    advisor: Option<LlmAdvisor>,
    sink: Option<Arc<dyn ArtifactSink>>,
    provider_preamble: bool,
}

impl Orchestrator {
    pub fn new(
        store: Arc<TemplateStore>,
        index: Arc<EmbeddingIndex>,
        extractor: ParameterExtractor,
        scope_threshold: f64,
    ) -> Self {
        Self {
            retriever: Retriever::new(Arc::clone(&index), scope_threshold),
            store,
            index,
            extractor,
            advisor: None,
            sink: None,
            provider_preamble: true,
        }
    }

    /// Wire everything from configuration. `model` backs the extraction
    /// fallback and, when enabled, the advisory review.
    pub fn from_config(
        config: &EngineConfig,
        model: Option<Arc<dyn LanguageModel>>,
        sink: Option<Arc<dyn ArtifactSink>>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let source: Arc<dyn TemplateSource> = match &config.template_dir {
            Some(dir) => Arc::new(DirTemplateSource::new(dir)),
            None => Arc::new(BuiltinTemplateSource),
        };
        let embedder: Arc<dyn Embedder> = match config.embedder.kind {
            EmbedderKind::Concept => Arc::new(ConceptEmbedder::new()),
            EmbedderKind::Ollama => Arc::new(OllamaEmbedder::new(OllamaEmbedderConfig {
                host: config.embedder.host.clone(),
                model: config.embedder.model.clone(),
                timeout_secs: config.embedding_timeout_secs,
            })?),
        };

        let mut extractor = ParameterExtractor::new(config.max_input_bytes);
        let mut advisor = None;
        if let Some(model) = model {
            extractor = extractor.with_llm(LlmExtractor::new(
                Arc::clone(&model),
                config.extraction_timeout(),
            ));
            if config.llm.advisory {
                advisor = Some(LlmAdvisor::new(model, config.extraction_timeout()));
            }
        }

        let mut orchestrator = Self::new(
            Arc::new(TemplateStore::new(source)),
            Arc::new(EmbeddingIndex::new(embedder, config.index_config())),
            extractor,
            config.scope_threshold,
        )
        .with_preamble(config.provider_preamble);
        if let Some(advisor) = advisor {
            orchestrator = orchestrator.with_advisor(advisor);
        }
        if let Some(sink) = sink {
            orchestrator = orchestrator.with_sink(sink);
        }
        Ok(orchestrator)
    }

    pub fn with_advisor(mut self, advisor: LlmAdvisor) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_preamble(mut self, enabled: bool) -> Self {
        self.provider_preamble = enabled;
        self
    }

    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    pub fn store(&self) -> &Arc<TemplateStore> {
        &self.store
    }

    pub fn scope_threshold(&self) -> f64 {
        self.retriever.scope_threshold()
    }

    /// Re-read the template source and rebuild the index.
    ///
    /// Requests in flight finish on the snapshot they pinned. On failure
    /// the previous snapshot keeps serving.
    pub async fn reload(&self) -> Result<Arc<IndexSnapshot>, ReloadError> {
        let catalog = self.store.reload().await?;
        Ok(self.index.build(catalog).await?)
    }

    /// Run one request to a terminal state. Never panics and never returns
    /// without a report; infrastructure problems become `Failed`.
    pub async fn run(&self, request: GenerateRequest, cancel: CancellationToken) -> PipelineReport {
        let request_id = Uuid::now_v7();
        let started_at = Utc::now();
        let mut trace = Trace::new();

        let outcome = match self.pipeline(&request, &cancel, &mut trace).await {
            Ok(outcome) => outcome,
            Err(err) => {
                trace.enter(PipelineState::Failed);
                warn!(%request_id, failure = %err.failure_kind(), error = %err, "Request failed");
                Outcome::Failed {
                    failure: err.failure_kind(),
                    message: err.to_string(),
                }
            }
        };

        if let (Some(sink), Outcome::Accepted { composed, .. }) = (&self.sink, &outcome) {
            match sink.deliver(request_id, composed).await {
                Ok(location) => info!(%request_id, %location, "Configuration delivered"),
                Err(e) => warn!(%request_id, sink = %sink.describe(), error = %e, "Delivery failed"),
            }
        }

        info!(
            %request_id,
            outcome = outcome.label(),
            states = trace.states.len(),
            "Request finished"
        );
        PipelineReport {
            request_id,
            started_at,
            finished_at: Utc::now(),
            trace: trace.states,
            outcome,
        }
    }

    async fn pipeline(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
        trace: &mut Trace,
    ) -> Result<Outcome, PipelineError> {
        self.extractor.check_input(&request.text)?;
        let snapshot = self.index.snapshot()?;
        let catalog = Arc::clone(snapshot.catalog());

        let bag = guarded(
            cancel,
            self.extractor.extract(&request.text, catalog.known_parameters()),
        )
        .await?;

        trace.enter(PipelineState::Retrieving);
        let retrieval = guarded(cancel, async {
            self.retriever
                .retrieve_in(&snapshot, &bag, &request.text)
                .await
                .map_err(PipelineError::from)
        })
        .await?;

        let selection: Vec<_> = retrieval
            .selection(&bag.resource_kinds, request.allow_out_of_scope)
            .into_iter()
            .filter_map(|c| snapshot.template(&c.template_id).cloned())
            .collect();
        if selection.is_empty() {
            trace.enter(PipelineState::OutOfScope);
            let explanation = explain(&bag, &retrieval);
            return Ok(Outcome::OutOfScope {
                bag,
                retrieval,
                explanation,
            });
        }
        for kind in &bag.resource_kinds {
            if !selection.iter().any(|t| t.resource_kind == *kind) {
                warn!(kind = %kind, "requested resource has no in-scope template");
            }
        }

        trace.enter(PipelineState::Customizing);
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let artifacts: Vec<_> = selection.iter().map(|t| customize(t, &bag)).collect();

        trace.enter(PipelineState::Validating);
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        match validate(artifacts.clone()) {
            ValidationVerdict::Accepted {
                artifacts,
                warnings,
            } => {
                let advisories = match &self.advisor {
                    Some(advisor) => {
                        let review = async { Ok::<_, PipelineError>(advisor.review(&artifacts).await) };
                        guarded(cancel, review).await?
                    }
                    None => Vec::new(),
                };
                let composed = compose(&artifacts, self.provider_preamble);
                trace.enter(PipelineState::Accepted);
                Ok(Outcome::Accepted {
                    bag,
                    retrieval,
                    artifacts,
                    composed,
                    warnings,
                    advisories,
                })
            }
            ValidationVerdict::Rejected { reasons, warnings } => {
                trace.enter(PipelineState::Rejected);
                Ok(Outcome::Rejected {
                    bag,
                    retrieval,
                    artifacts,
                    reasons,
                    warnings,
                })
            }
        }
    }
}

fn explain(bag: &ParameterBag, retrieval: &RetrievalResult) -> String {
    if !retrieval.out_of_scope {
        let kinds: Vec<&str> = bag.resource_kinds.iter().map(|k| k.display_name()).collect();
        return format!(
            "no in-scope template covers the requested resources ({})",
            kinds.join(", ")
        );
    }
    match retrieval.best() {
        Some(best) => format!(
            "closest template {} scored {:.3}, below the scope threshold {:.2}",
            best.template_id, best.score, retrieval.scope_threshold
        ),
        None => "no templates are indexed".to_string(),
    }
}
