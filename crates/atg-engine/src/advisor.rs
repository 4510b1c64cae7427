//! Optional soft review of an accepted batch by a language model.
//!
//! Advisories are informational. A slow, unreachable or confused model
//! produces no advisories; it never fails or changes the verdict.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use atg_protocol::{Advisory, CustomizedArtifact};

use crate::llm::{LanguageModel, extract_json};

const SYSTEM_PROMPT: &str = r#"You review Terraform configurations for Azure before they are applied.

Point out risky or unusual settings (public exposure, weak SKUs for production, missing tags, oversized capacity). Do not rewrite the configuration.

Respond with ONLY a JSON object:
{"advisories": [{"template_id": "<id from the header>", "message": "<one sentence>"}]}

Use an empty list when nothing stands out."#;

/// Upper bound on advisories kept from one review.
const MAX_ADVISORIES: usize = 10;

#[derive(Debug, Deserialize)]
struct RawReview {
    #[serde(default)]
    advisories: Vec<RawAdvisory>,
}

#[derive(Debug, Deserialize)]
struct RawAdvisory {
    template_id: Option<String>,
    message: String,
}

pub struct LlmAdvisor {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl LlmAdvisor {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub async fn review(&self, artifacts: &[CustomizedArtifact]) -> Vec<Advisory> {
        let user = review_prompt(artifacts);
        let reply = match tokio::time::timeout(self.timeout, self.model.complete(SYSTEM_PROMPT, &user)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::warn!(model = %self.model.name(), error = %e, "advisory review failed");
                return Vec::new();
            }
            Err(_) => {
                tracing::warn!(model = %self.model.name(), "advisory review timed out");
                return Vec::new();
            }
        };

        let review: RawReview = match serde_json::from_str(extract_json(&reply)) {
            Ok(review) => review,
            Err(e) => {
                tracing::warn!(error = %e, "advisory reply is not the expected JSON");
                return Vec::new();
            }
        };

        review
            .advisories
            .into_iter()
            .filter(|a| !a.message.trim().is_empty())
            .take(MAX_ADVISORIES)
            .map(|a| Advisory {
                template_id: a
                    .template_id
                    .filter(|id| artifacts.iter().any(|art| art.template_id == *id)),
                message: a.message.trim().to_string(),
            })
            .collect()
    }
}

fn review_prompt(artifacts: &[CustomizedArtifact]) -> String {
    let mut prompt = String::new();
    for artifact in artifacts {
        prompt.push_str(&format!("### template_id: {}\n", artifact.template_id));
        prompt.push_str(&artifact.body);
        if !artifact.body.ends_with('\n') {
            prompt.push('\n');
        }
        prompt.push('\n');
    }
    prompt
}
