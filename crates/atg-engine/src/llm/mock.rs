//! Scripted language models for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use atg_protocol::CapabilityError;

use super::LanguageModel;

/// Replays scripted replies in order; the last reply repeats.
pub struct MockLanguageModel {
    replies: Mutex<Vec<Result<String, CapabilityError>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLanguageModel {
    pub fn new(replies: Vec<Result<String, CapabilityError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A model that always answers `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(text.into())])
    }

    /// A model that always fails with `err`.
    pub fn failing(err: CapabilityError) -> Self {
        Self::new(vec![Err(err)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(user.to_string());
        let mut replies = self
            .replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match replies.len() {
            0 => Err(CapabilityError::Unavailable("no scripted reply".into())),
            1 => replies[0].clone(),
            _ => replies.remove(0),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Sleeps for `delay`, then answers `reply`.
pub struct SlowModel {
    delay: Duration,
    reply: String,
}

impl SlowModel {
    pub fn new(delay: Duration, reply: impl Into<String>) -> Self {
        Self {
            delay,
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for SlowModel {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, CapabilityError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_order_then_repeats_last() {
        let m = MockLanguageModel::new(vec![Ok("a".into()), Ok("b".into())]);
        assert_eq!(m.complete("s", "1").await.unwrap(), "a");
        assert_eq!(m.complete("s", "2").await.unwrap(), "b");
        assert_eq!(m.complete("s", "3").await.unwrap(), "b");
        assert_eq!(m.calls(), 3);
        assert_eq!(m.prompts(), vec!["1", "2", "3"]);
    }
}
