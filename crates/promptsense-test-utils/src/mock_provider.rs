// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use promptsense_core::PromptSenseError;
use promptsense_core::traits::{PluginAdapter, ProviderAdapter};
use promptsense_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage,
};

/// A mock chat provider that returns pre-configured responses.
///
/// Replies are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned. Every request is recorded
/// for later inspection.
pub struct MockProvider {
    replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
    scheduled_failures: Arc<Mutex<HashMap<usize, String>>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl MockProvider {
    /// Create a new mock provider with an empty response queue.
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            requests: Arc::new(Mutex::new(Vec::new())),
            scheduled_failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Sleep for `delay` before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: String) {
        self.replies.lock().await.push_back(Ok(text));
    }

    /// Make the next call fail with a provider error carrying `message`.
    pub async fn fail_next(&self, message: &str) {
        self.replies.lock().await.push_front(Err(message.to_string()));
    }

    /// Make the `call`-th request (1-based, counted from construction) fail.
    ///
    /// Scheduled failures do not consume queued replies.
    pub async fn fail_call(&self, call: usize, message: &str) {
        self.scheduled_failures
            .lock()
            .await
            .insert(call, message.to_string());
    }

    /// Every request received so far, in call order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_reply(&self) -> Result<String, String> {
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok("mock response".to_string()))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, PromptSenseError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PromptSenseError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, PromptSenseError> {
        let model = request.model.clone().unwrap_or_else(|| "mock-model".to_string());
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().await.push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scheduled = self.scheduled_failures.lock().await.remove(&call);
        let reply = match scheduled {
            Some(message) => Err(message),
            None => self.next_reply().await,
        };

        match reply {
            Ok(text) => Ok(ProviderResponse {
                id: format!("mock-resp-{}", uuid::Uuid::new_v4()),
                content: text,
                model,
                stop_reason: Some("stop".to_string()),
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 20,
                },
            }),
            Err(message) => Err(PromptSenseError::Provider {
                message,
                source: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptsense_core::types::ProviderMessage;

    fn req() -> ProviderRequest {
        ProviderRequest {
            model: None,
            messages: vec![ProviderMessage::user("hi")],
            max_tokens: 100,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn default_response_when_queue_empty() {
        let provider = MockProvider::new();
        let resp = provider.complete(req()).await.unwrap();
        assert_eq!(resp.content, "mock response");
        assert_eq!(resp.model, "mock-model");
    }

    #[tokio::test]
    async fn queued_responses_returned_in_order() {
        let provider = MockProvider::with_responses(vec![
            "first".to_string(),
            "second".to_string(),
            "third".to_string(),
        ]);

        assert_eq!(provider.complete(req()).await.unwrap().content, "first");
        assert_eq!(provider.complete(req()).await.unwrap().content, "second");
        assert_eq!(provider.complete(req()).await.unwrap().content, "third");
        // Queue exhausted, falls back to default
        assert_eq!(provider.complete(req()).await.unwrap().content, "mock response");
    }

    #[tokio::test]
    async fn fail_next_jumps_the_queue() {
        let provider = MockProvider::with_responses(vec!["queued".to_string()]);
        provider.fail_next("rate limited").await;

        let err = provider.complete(req()).await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
        assert_eq!(provider.complete(req()).await.unwrap().content, "queued");
    }

    #[tokio::test]
    async fn scheduled_failure_keeps_the_queue() {
        let provider = MockProvider::with_responses(vec!["a".to_string(), "b".to_string()]);
        provider.fail_call(2, "flaky").await;

        assert_eq!(provider.complete(req()).await.unwrap().content, "a");
        assert!(provider.complete(req()).await.is_err());
        assert_eq!(provider.complete(req()).await.unwrap().content, "b");
    }

    #[tokio::test]
    async fn records_requests() {
        let provider = MockProvider::new();
        provider.add_response("dynamic response".to_string()).await;
        let mut request = req();
        request.model = Some("gpt-test".into());
        let resp = provider.complete(request).await.unwrap();
        assert_eq!(resp.content, "dynamic response");
        assert_eq!(resp.model, "gpt-test");

        let seen = provider.requests().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages[0].content, "hi");
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_applied() {
        let provider = MockProvider::new().with_delay(Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        provider.complete(req()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
