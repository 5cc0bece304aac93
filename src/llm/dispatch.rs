//! Fan-out of one conversation to many models
//!
//! Every error below this layer ends at [`Dispatcher::query_model`]: a failed
//! query becomes `None` in the result set and the other queries carry on.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{CouncilError, Result};
use crate::llm::message::{Message, QueryResult, ResultSet};
use crate::llm::provider::ChatTransport;

/// Per-query timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Sends the same messages to any number of models concurrently
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn ChatTransport>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query one model with the dispatcher's timeout
    pub async fn query_model(&self, model: &str, messages: &[Message]) -> Option<QueryResult> {
        self.query_model_with_timeout(model, messages, self.timeout)
            .await
    }

    /// Query one model, returning `None` on any failure
    pub async fn query_model_with_timeout(
        &self,
        model: &str,
        messages: &[Message],
        timeout: Duration,
    ) -> Option<QueryResult> {
        match self.try_query(model, messages, timeout).await {
            Ok(result) => {
                debug!(model, "Model responded");
                Some(result)
            }
            Err(e) => {
                warn!(
                    model,
                    transport = self.transport.name(),
                    error = %e,
                    "Error querying model"
                );
                None
            }
        }
    }

    async fn try_query(
        &self,
        model: &str,
        messages: &[Message],
        timeout: Duration,
    ) -> Result<QueryResult> {
        if model.trim().is_empty() {
            return Err(CouncilError::InvalidRequest(
                "model identifier is empty".to_string(),
            ));
        }
        if messages.is_empty() {
            return Err(CouncilError::InvalidRequest(
                "no messages to send".to_string(),
            ));
        }
        if timeout.is_zero() {
            return Err(CouncilError::InvalidRequest(
                "timeout must be positive".to_string(),
            ));
        }

        tokio::time::timeout(timeout, self.transport.complete(model, messages, timeout))
            .await
            .map_err(|_| CouncilError::Timeout(timeout.as_secs_f64()))?
    }

    /// Query every model concurrently and wait for all of them.
    ///
    /// The returned map has one entry per distinct identifier in `models`.
    /// When an identifier repeats, the later query's outcome wins.
    pub async fn query_models_parallel<S: AsRef<str>>(
        &self,
        models: &[S],
        messages: &[Message],
    ) -> ResultSet {
        let queries = models.iter().map(|model| async move {
            let model = model.as_ref();
            (model.to_string(), self.query_model(model, messages).await)
        });

        let responses = join_all(queries).await;

        let results: ResultSet = responses.into_iter().collect();
        debug!(
            requested = models.len(),
            succeeded = results.values().filter(|r| r.is_some()).count(),
            "Dispatch complete"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::time::Instant;

    enum Behavior {
        Reply(&'static str, Duration),
        Fail,
        Hang,
    }

    /// In-process backend keyed by model name
    struct FakeTransport {
        behaviors: HashMap<&'static str, Behavior>,
    }

    impl FakeTransport {
        fn new(behaviors: Vec<(&'static str, Behavior)>) -> Arc<Self> {
            Arc::new(Self {
                behaviors: behaviors.into_iter().collect(),
            })
        }
    }

    #[async_trait::async_trait]
    impl ChatTransport for FakeTransport {
        async fn complete(
            &self,
            model: &str,
            _messages: &[Message],
            _timeout: Duration,
        ) -> Result<QueryResult> {
            match self.behaviors.get(model) {
                Some(Behavior::Reply(text, delay)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(QueryResult {
                        content: Some(text.to_string()),
                        reasoning_details: None,
                    })
                }
                Some(Behavior::Fail) | None => Err(CouncilError::Provider {
                    status: 500,
                    body: "boom".to_string(),
                }),
                Some(Behavior::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("hung request outlived its timeout")
                }
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn hi() -> Vec<Message> {
        vec![Message::user("hi")]
    }

    fn content(results: &ResultSet, model: &str) -> Option<String> {
        results.get(model).cloned().flatten().and_then(|r| r.content)
    }

    #[tokio::test]
    async fn test_all_models_succeed() {
        let transport = FakeTransport::new(vec![
            ("m1", Behavior::Reply("one", Duration::ZERO)),
            ("m2", Behavior::Reply("two", Duration::ZERO)),
        ]);
        let dispatcher = Dispatcher::new(transport);

        let results = dispatcher.query_models_parallel(&["m1", "m2"], &hi()).await;

        assert_eq!(results.len(), 2);
        assert_eq!(content(&results, "m1").as_deref(), Some("one"));
        assert_eq!(content(&results, "m2").as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_timeout_only_affects_slow_model() {
        let transport = FakeTransport::new(vec![
            ("m1", Behavior::Hang),
            ("m2", Behavior::Reply("two", Duration::from_millis(10))),
        ]);
        let dispatcher = Dispatcher::new(transport).with_timeout(Duration::from_millis(200));

        let results = dispatcher.query_models_parallel(&["m1", "m2"], &hi()).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results.get("m1"), Some(&None));
        assert_eq!(content(&results, "m2").as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_duplicate_models_collapse() {
        let transport = FakeTransport::new(vec![("m1", Behavior::Reply("one", Duration::ZERO))]);
        let dispatcher = Dispatcher::new(transport);

        let results = dispatcher.query_models_parallel(&["m1", "m1"], &hi()).await;

        assert_eq!(results.len(), 1);
        assert_eq!(content(&results, "m1").as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn test_total_failure_keeps_every_key() {
        let transport = FakeTransport::new(vec![("m1", Behavior::Fail), ("m2", Behavior::Fail)]);
        let dispatcher = Dispatcher::new(transport);

        let results = dispatcher
            .query_models_parallel(&["m1", "m2", "m3"], &hi())
            .await;

        assert_eq!(results.len(), 3);
        assert!(results.values().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_latency_bounded_by_slowest_query() {
        let transport = FakeTransport::new(vec![
            ("m1", Behavior::Reply("one", Duration::from_millis(100))),
            ("m2", Behavior::Reply("two", Duration::from_millis(200))),
            ("m3", Behavior::Reply("three", Duration::from_millis(300))),
        ]);
        let dispatcher = Dispatcher::new(transport);

        let started = Instant::now();
        let results = dispatcher
            .query_models_parallel(&["m1", "m2", "m3"], &hi())
            .await;
        let elapsed = started.elapsed();

        assert!(results.values().all(Option::is_some));
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(550), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_empty_model_set() {
        let transport = FakeTransport::new(vec![]);
        let dispatcher = Dispatcher::new(transport);

        let results = dispatcher.query_models_parallel::<&str>(&[], &hi()).await;

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_inputs_are_sentinels() {
        let transport = FakeTransport::new(vec![("m1", Behavior::Reply("one", Duration::ZERO))]);
        let dispatcher = Dispatcher::new(transport);

        assert!(dispatcher.query_model("", &hi()).await.is_none());
        assert!(dispatcher.query_model("m1", &[]).await.is_none());
        assert!(dispatcher
            .query_model_with_timeout("m1", &hi(), Duration::ZERO)
            .await
            .is_none());
    }

    #[test]
    fn test_default_timeout() {
        let dispatcher = Dispatcher::new(FakeTransport::new(vec![]));
        assert_eq!(dispatcher.timeout(), Duration::from_secs(120));
    }
}
