//! Fan-out/fan-in dispatch of one prompt to every configured provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::ChorusError;
use crate::providers::traits::Provider;

/// Terminal result of one provider's call within a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// One provider's entry within a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundEntry {
    pub provider: String,
    pub label: String,
    pub outcome: Outcome,
}

/// Per-round mapping from provider to outcome.
///
/// Always holds exactly one entry per registered provider, in roster order,
/// regardless of completion order or individual failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    entries: Vec<RoundEntry>,
}

impl RoundResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoundEntry> {
        self.entries.iter()
    }

    pub fn get(&self, provider: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|e| e.provider == provider)
            .map(|e| &e.outcome)
    }
}

pub struct Dispatcher {
    providers: Vec<Arc<dyn Provider>>,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            providers,
            timeout: None,
        }
    }

    /// Cap each provider's call at `timeout`; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask every provider concurrently and wait for all of them.
    ///
    /// Returns only after the slowest provider has terminated, so the round's
    /// wall-clock cost is the max of the individual latencies, not the sum.
    /// A provider error, deadline, or panicked task becomes a `Failure` entry
    /// for that provider alone; the round itself cannot fail.
    pub async fn run(&self, prompt: &str) -> RoundResult {
        let mut join_set = JoinSet::new();
        let mut task_slots: HashMap<tokio::task::Id, usize> = HashMap::new();

        for (slot, provider) in self.providers.iter().enumerate() {
            let provider = Arc::clone(provider);
            let prompt = prompt.to_string();
            let timeout = self.timeout;

            let handle = join_set.spawn(async move {
                let result = match timeout {
                    Some(limit) => {
                        match tokio::time::timeout(limit, provider.complete(&prompt)).await {
                            Ok(result) => result,
                            Err(_) => Err(ChorusError::Timeout {
                                seconds: limit.as_secs(),
                            }),
                        }
                    }
                    None => provider.complete(&prompt).await,
                };

                let outcome = match result {
                    Ok(text) => Outcome::Success(text),
                    Err(e) => Outcome::Failure(e.to_string()),
                };
                (slot, outcome)
            });
            task_slots.insert(handle.id(), slot);
        }

        // Each task writes exactly one slot, so the writes never collide;
        // the vector is only read after the join barrier below.
        let mut slots: Vec<Option<Outcome>> = vec![None; self.providers.len()];

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_, (slot, outcome))) => {
                    let name = self.providers[slot].name();
                    match &outcome {
                        Outcome::Success(_) => debug!(provider = name, "provider responded"),
                        Outcome::Failure(message) => {
                            warn!(provider = name, error = %message, "provider failed");
                        }
                    }
                    slots[slot] = Some(outcome);
                }
                Err(join_err) => {
                    // A panicked adapter still gets an entry for its provider.
                    if let Some(&slot) = task_slots.get(&join_err.id()) {
                        warn!(
                            provider = self.providers[slot].name(),
                            "provider task failed: {join_err}"
                        );
                        slots[slot] =
                            Some(Outcome::Failure(format!("provider task failed: {join_err}")));
                    }
                }
            }
        }

        let entries = self
            .providers
            .iter()
            .zip(slots)
            .map(|(provider, outcome)| RoundEntry {
                provider: provider.name().to_string(),
                label: provider.label().to_string(),
                outcome: outcome
                    .unwrap_or_else(|| Outcome::Failure("no outcome recorded".to_string())),
            })
            .collect();

        RoundResult { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::providers::traits::Credential;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct MockProvider {
        name: &'static str,
        delay: Duration,
        reply: std::result::Result<&'static str, &'static str>,
        panics: bool,
        credential: Credential,
    }

    impl MockProvider {
        fn replying(name: &'static str, reply: &'static str) -> Self {
            Self {
                name,
                delay: Duration::ZERO,
                reply: Ok(reply),
                panics: false,
                credential: Credential::fixed("MOCK_KEY", "mock"),
            }
        }

        fn failing(name: &'static str, message: &'static str) -> Self {
            Self {
                reply: Err(message),
                ..Self::replying(name, "")
            }
        }

        fn panicking(name: &'static str) -> Self {
            Self {
                panics: true,
                ..Self::replying(name, "")
            }
        }

        fn after(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn label(&self) -> &str {
            self.name
        }

        fn model(&self) -> &str {
            "mock"
        }

        fn credential(&self) -> &Credential {
            &self.credential
        }

        async fn complete(&self, _prompt: &str) -> Result<String> {
            if self.delay > Duration::ZERO {
                tokio::time::sleep(self.delay).await;
            }
            if self.panics {
                panic!("mock provider exploded");
            }
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(message) => Err(ChorusError::ProviderApi {
                    message: message.to_string(),
                    status: None,
                }),
            }
        }
    }

    fn roster(mocks: Vec<MockProvider>) -> Vec<Arc<dyn Provider>> {
        mocks
            .into_iter()
            .map(|m| Arc::new(m) as Arc<dyn Provider>)
            .collect()
    }

    #[tokio::test]
    async fn every_provider_gets_an_entry() {
        let dispatcher = Dispatcher::new(roster(vec![
            MockProvider::replying("a", "4"),
            MockProvider::failing("b", "boom"),
            MockProvider::replying("c", "4"),
        ]));

        let round = dispatcher.run("2+2?").await;

        assert_eq!(round.len(), 3);
        let names: Vec<_> = round.iter().map(|e| e.provider.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn all_success_round() {
        let dispatcher = Dispatcher::new(roster(vec![
            MockProvider::replying("a", "4"),
            MockProvider::replying("b", "4"),
            MockProvider::replying("c", "4"),
        ]));

        let round = dispatcher.run("2+2?").await;

        for name in ["a", "b", "c"] {
            assert_eq!(round.get(name), Some(&Outcome::Success("4".to_string())));
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_disturb_the_others() {
        let dispatcher = Dispatcher::new(roster(vec![
            MockProvider::replying("a", "hi-A"),
            MockProvider::failing("b", "simulated network failure"),
            MockProvider::replying("c", "hi-C"),
        ]));

        let round = dispatcher.run("hello").await;

        assert_eq!(round.get("a"), Some(&Outcome::Success("hi-A".to_string())));
        assert_eq!(round.get("c"), Some(&Outcome::Success("hi-C".to_string())));
        match round.get("b").unwrap() {
            Outcome::Failure(message) => assert!(message.contains("network")),
            Outcome::Success(_) => panic!("expected b to fail"),
        }
    }

    #[tokio::test]
    async fn panicking_provider_is_substituted_at_the_join() {
        let dispatcher = Dispatcher::new(roster(vec![
            MockProvider::replying("a", "ok"),
            MockProvider::panicking("b"),
        ]));

        let round = dispatcher.run("hello").await;

        assert_eq!(round.len(), 2);
        assert_eq!(round.get("a"), Some(&Outcome::Success("ok".to_string())));
        match round.get("b").unwrap() {
            Outcome::Failure(message) => assert!(message.contains("task failed")),
            Outcome::Success(_) => panic!("expected b to fail"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn round_cost_is_the_slowest_provider_not_the_sum() {
        let dispatcher = Dispatcher::new(roster(vec![
            MockProvider::replying("a", "fast").after(Duration::from_secs(1)),
            MockProvider::replying("b", "medium").after(Duration::from_secs(2)),
            MockProvider::replying("c", "slow").after(Duration::from_secs(3)),
        ]));

        let start = tokio::time::Instant::now();
        let round = dispatcher.run("race").await;
        let elapsed = start.elapsed();

        assert_eq!(round.len(), 3);
        assert!(elapsed >= Duration::from_secs(3));
        // Well under the 6s a sequential run would take
        assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_turns_a_hang_into_a_failure() {
        let dispatcher = Dispatcher::new(roster(vec![
            MockProvider::replying("a", "quick"),
            MockProvider::replying("b", "never").after(Duration::from_secs(600)),
        ]))
        .with_timeout(Some(Duration::from_secs(5)));

        let round = dispatcher.run("hello").await;

        assert_eq!(round.get("a"), Some(&Outcome::Success("quick".to_string())));
        match round.get("b").unwrap() {
            Outcome::Failure(message) => assert!(message.contains("timed out")),
            Outcome::Success(_) => panic!("expected b to time out"),
        }
    }

    #[tokio::test]
    async fn deterministic_rounds_are_equal() {
        let dispatcher = Dispatcher::new(roster(vec![
            MockProvider::replying("a", "alpha"),
            MockProvider::failing("b", "down"),
        ]));

        let first = dispatcher.run("same prompt").await;
        let second = dispatcher.run("same prompt").await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_prompt_is_still_dispatched() {
        let dispatcher = Dispatcher::new(roster(vec![MockProvider::replying("a", "hm")]));

        let round = dispatcher.run("").await;

        assert_eq!(round.get("a"), Some(&Outcome::Success("hm".to_string())));
    }
}
