use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::gateway::{GatewayError, SummaryGateway, SummaryRecord};
use crate::history::{HistoryRecord, HistoryStore};
use crate::state::{Depth, Phase, RequestId, SessionResult, SessionState, Submission};

/// Fallback shown when the backend fails without a structured payload.
pub const GENERIC_ERROR: &str = "The research agent encountered an error.";

/// Dedicated message for a lookup miss, distinct from the generic failure.
pub const NOT_FOUND_ERROR: &str =
    "No fresh cached summary for this topic and depth. It may have expired; run a fresh search instead.";

/// How a submission ended from the caller's point of view.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Summary stored and displayed. Carries a warning when the history
    /// write failed: the result is shown, durability is degraded.
    Success { storage_warning: Option<String> },
    /// Request ended in the error phase; the message is in the state.
    Failed,
    /// Response arrived for a request that is no longer current.
    Stale,
}

/// Drives the per-request state machine and owns the session state, the
/// history cache, and the gateway.
pub struct ResearchSession {
    gateway: Arc<dyn SummaryGateway>,
    history: HistoryStore,
    state: SessionState,
    next_request: u64,
}

impl ResearchSession {
    pub fn new(gateway: Arc<dyn SummaryGateway>, history: HistoryStore) -> Self {
        Self {
            gateway,
            history,
            state: SessionState::new(),
            next_request: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    pub fn depth(&self) -> Depth {
        self.state.depth
    }

    pub fn set_depth(&mut self, depth: Depth) {
        self.state.depth = depth;
    }

    /// Current result, if any request has succeeded.
    pub fn result(&self) -> Option<&SessionResult> {
        self.state.result.as_ref()
    }

    /// Submit a fresh search. Holds the Loading phase for the duration of
    /// the gateway call, then lands in Success or Error.
    pub async fn fresh_search(&mut self, topic: &str, depth: Depth) -> Result<Outcome> {
        let topic = validated(topic)?;
        let id = self.begin(Submission::Fresh {
            topic: topic.to_string(),
            depth,
        });
        info!(request = %id, topic, depth = %depth, "fresh search started");
        let result = self.gateway.create_summary(topic, depth).await;
        Ok(self.finish(id, result))
    }

    /// Submit a backend cache lookup. A miss surfaces the dedicated
    /// expired-or-not-found message; a hit upserts the history cache with
    /// the record's original creation timestamp.
    pub async fn cached_load(&mut self, topic: &str, depth: Depth) -> Result<Outcome> {
        let topic = validated(topic)?;
        let id = self.begin(Submission::Cached {
            topic: topic.to_string(),
            depth,
        });
        info!(request = %id, topic, depth = %depth, "cache lookup started");
        let result = self.gateway.lookup_summary(topic, depth).await;
        Ok(self.finish(id, result))
    }

    /// Re-invoke the last submission with the same parameters.
    pub async fn retry(&mut self) -> Result<Outcome> {
        match self.state.last_submission.clone() {
            Some(Submission::Fresh { topic, depth }) => self.fresh_search(&topic, depth).await,
            Some(Submission::Cached { topic, depth }) => self.cached_load(&topic, depth).await,
            None => anyhow::bail!("nothing to retry yet"),
        }
    }

    /// Redisplay a cached record without a network round trip.
    pub fn restore(&mut self, index: usize) -> Option<&SessionResult> {
        let record = self.history.get(index)?.clone();
        self.state.depth = record.depth;
        self.state.result = Some(SessionResult {
            topic: record.topic,
            depth: record.depth,
            summary: record.summary,
            created_at: record.created_at,
        });
        self.state.phase = Phase::Success;
        self.state.result.as_ref()
    }

    fn begin(&mut self, submission: Submission) -> RequestId {
        self.next_request += 1;
        let id = RequestId(self.next_request);
        self.state.phase = Phase::Loading { request: id };
        self.state.last_submission = Some(submission);
        id
    }

    /// True while `id` is still the request the session is waiting on.
    fn is_current(&self, id: RequestId) -> bool {
        matches!(self.state.phase, Phase::Loading { request } if request == id)
    }

    /// Apply a gateway outcome to the state machine. A response whose id no
    /// longer matches the in-flight request is discarded.
    fn finish(
        &mut self,
        id: RequestId,
        result: Result<SummaryRecord, GatewayError>,
    ) -> Outcome {
        if !self.is_current(id) {
            warn!(request = %id, "discarding stale response");
            return Outcome::Stale;
        }
        match result {
            Ok(record) => {
                let storage_warning = self.store_result(record);
                Outcome::Success { storage_warning }
            }
            Err(err) => {
                info!(request = %id, error = %err, "request failed");
                self.state.phase = Phase::Error {
                    message: user_message(&err),
                };
                Outcome::Failed
            }
        }
    }

    /// Store a successful response: upsert the history cache with the
    /// backend's timestamp, then expose the result. A failed history write
    /// degrades to a warning; the fetched summary is not discarded.
    fn store_result(&mut self, record: SummaryRecord) -> Option<String> {
        let storage_warning = match self.history.upsert(HistoryRecord {
            topic: record.topic.clone(),
            depth: record.depth,
            summary: record.summary.clone(),
            created_at: record.created_at,
        }) {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "history write failed");
                Some(format!("history not saved: {:#}", e))
            }
        };
        self.state.result = Some(SessionResult {
            topic: record.topic,
            depth: record.depth,
            summary: record.summary,
            created_at: record.created_at,
        });
        self.state.phase = Phase::Success;
        storage_warning
    }
}

fn validated(topic: &str) -> Result<&str> {
    let topic = topic.trim();
    if topic.is_empty() {
        anyhow::bail!("topic must not be empty");
    }
    Ok(topic)
}

/// Map a gateway error to the message shown to the user. Backend payloads
/// pass through verbatim; transport failures get the generic fallback.
fn user_message(err: &GatewayError) -> String {
    match err {
        GatewayError::NotFound => NOT_FOUND_ERROR.to_string(),
        GatewayError::Backend(message) => message.clone(),
        GatewayError::Transport(_) => GENERIC_ERROR.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    /// Gateway that replays a scripted queue of responses and records the
    /// calls it receives.
    struct ScriptedGateway {
        responses: Mutex<VecDeque<Result<SummaryRecord, GatewayError>>>,
        calls: Mutex<Vec<(&'static str, String, Depth)>>,
    }

    impl ScriptedGateway {
        fn with(responses: Vec<Result<SummaryRecord, GatewayError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn next(&self, op: &'static str, topic: &str, depth: Depth) -> Result<SummaryRecord, GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push((op, topic.to_string(), depth));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted gateway ran out of responses")
        }

        fn calls(&self) -> Vec<(&'static str, String, Depth)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SummaryGateway for ScriptedGateway {
        async fn create_summary(
            &self,
            topic: &str,
            depth: Depth,
        ) -> Result<SummaryRecord, GatewayError> {
            self.next("create", topic, depth)
        }

        async fn lookup_summary(
            &self,
            topic: &str,
            depth: Depth,
        ) -> Result<SummaryRecord, GatewayError> {
            self.next("lookup", topic, depth)
        }
    }

    fn summary(topic: &str, depth: Depth, text: &str) -> SummaryRecord {
        SummaryRecord {
            topic: topic.to_string(),
            depth,
            summary: text.to_string(),
            created_at: Utc::now(),
        }
    }

    fn session(dir: &TempDir, gateway: Arc<ScriptedGateway>) -> ResearchSession {
        let history = HistoryStore::open(dir.path().join("history.json"));
        ResearchSession::new(gateway, history)
    }

    #[tokio::test]
    async fn test_fresh_search_success_updates_state_and_history() {
        let dir = TempDir::new().unwrap();
        let gateway = ScriptedGateway::with(vec![Ok(summary(
            "rust async",
            Depth::Medium,
            "# Rust async\n\nDetails.",
        ))]);
        let mut s = session(&dir, gateway);

        let outcome = s.fresh_search("rust async", Depth::Medium).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Success {
                storage_warning: None
            }
        );
        assert_eq!(s.state().phase, Phase::Success);
        assert_eq!(s.result().unwrap().topic, "rust async");
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.history().records()[0].summary, "# Rust async\n\nDetails.");
    }

    #[tokio::test]
    async fn test_backend_error_message_shown_verbatim() {
        let dir = TempDir::new().unwrap();
        let gateway = ScriptedGateway::with(vec![Err(GatewayError::Backend(
            "Tavily search failed: rate limited".to_string(),
        ))]);
        let mut s = session(&dir, gateway);

        let outcome = s.fresh_search("anything", Depth::Low).await.unwrap();
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(
            s.state().phase,
            Phase::Error {
                message: "Tavily search failed: rate limited".to_string()
            }
        );
        assert!(s.history().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_maps_to_generic_message() {
        let dir = TempDir::new().unwrap();
        let gateway = ScriptedGateway::with(vec![Err(GatewayError::Transport(
            "connection refused".to_string(),
        ))]);
        let mut s = session(&dir, gateway);

        s.fresh_search("anything", Depth::Low).await.unwrap();
        assert_eq!(
            s.state().phase,
            Phase::Error {
                message: GENERIC_ERROR.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_lookup_not_found_gets_dedicated_message() {
        let dir = TempDir::new().unwrap();
        let gateway = ScriptedGateway::with(vec![Err(GatewayError::NotFound)]);
        let mut s = session(&dir, gateway);

        let outcome = s.cached_load("unknown topic", Depth::High).await.unwrap();
        assert_eq!(outcome, Outcome::Failed);
        let Phase::Error { message } = &s.state().phase else {
            panic!("expected error phase");
        };
        assert_eq!(message, NOT_FOUND_ERROR);
        assert_ne!(message, GENERIC_ERROR);
    }

    #[tokio::test]
    async fn test_cached_load_preserves_original_timestamp() {
        let dir = TempDir::new().unwrap();
        let original = Utc.with_ymd_and_hms(2026, 8, 2, 9, 0, 0).unwrap();
        let gateway = ScriptedGateway::with(vec![Ok(SummaryRecord {
            topic: "graph databases".to_string(),
            depth: Depth::Medium,
            summary: "cached".to_string(),
            created_at: original,
        })]);
        let mut s = session(&dir, gateway);

        s.cached_load("graph databases", Depth::Medium).await.unwrap();
        assert_eq!(s.history().records()[0].created_at, original);
        assert_eq!(s.result().unwrap().created_at, original);
    }

    #[tokio::test]
    async fn test_empty_topic_rejected_without_state_change() {
        let dir = TempDir::new().unwrap();
        let gateway = ScriptedGateway::with(vec![]);
        let mut s = session(&dir, gateway.clone());

        assert!(s.fresh_search("   ", Depth::Medium).await.is_err());
        assert_eq!(s.state().phase, Phase::Idle);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_retry_reissues_last_submission() {
        let dir = TempDir::new().unwrap();
        let gateway = ScriptedGateway::with(vec![
            Err(GatewayError::Transport("timeout".to_string())),
            Ok(summary("solar sails", Depth::High, "ok")),
        ]);
        let mut s = session(&dir, gateway.clone());

        s.fresh_search("solar sails", Depth::High).await.unwrap();
        assert_eq!(s.state().phase, Phase::Error {
            message: GENERIC_ERROR.to_string()
        });

        let outcome = s.retry().await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Success {
                storage_warning: None
            }
        );
        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ("create", "solar sails".to_string(), Depth::High));
        assert_eq!(calls[1], ("create", "solar sails".to_string(), Depth::High));
    }

    #[tokio::test]
    async fn test_retry_with_no_prior_submission_errors() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, ScriptedGateway::with(vec![]));
        assert!(s.retry().await.is_err());
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, ScriptedGateway::with(vec![]));

        let first = s.begin(Submission::Fresh {
            topic: "first".to_string(),
            depth: Depth::Low,
        });
        let second = s.begin(Submission::Fresh {
            topic: "second".to_string(),
            depth: Depth::Low,
        });

        // The first request resolves after the second was submitted.
        let outcome = s.finish(first, Ok(summary("first", Depth::Low, "stale")));
        assert_eq!(outcome, Outcome::Stale);
        assert_eq!(s.state().phase, Phase::Loading { request: second });
        assert!(s.result().is_none());
        assert!(s.history().is_empty());

        let outcome = s.finish(second, Ok(summary("second", Depth::Low, "fresh")));
        assert!(matches!(outcome, Outcome::Success { .. }));
        assert_eq!(s.result().unwrap().topic, "second");
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_warning_but_keeps_result() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let history = HistoryStore::open(blocker.join("history.json"));
        let gateway =
            ScriptedGateway::with(vec![Ok(summary("topic", Depth::Medium, "body"))]);
        let mut s = ResearchSession::new(gateway, history);

        let outcome = s.fresh_search("topic", Depth::Medium).await.unwrap();
        let Outcome::Success { storage_warning } = outcome else {
            panic!("expected success");
        };
        assert!(storage_warning.is_some());
        assert_eq!(s.state().phase, Phase::Success);
        assert_eq!(s.result().unwrap().summary, "body");
    }

    #[tokio::test]
    async fn test_restore_redisplays_without_network() {
        let dir = TempDir::new().unwrap();
        let gateway = ScriptedGateway::with(vec![Ok(summary(
            "old topic",
            Depth::Low,
            "stored summary",
        ))]);
        let mut s = session(&dir, gateway.clone());
        s.fresh_search("old topic", Depth::Low).await.unwrap();

        s.set_depth(Depth::High);
        let restored = s.restore(0).unwrap();
        assert_eq!(restored.summary, "stored summary");
        assert_eq!(s.depth(), Depth::Low);
        assert_eq!(gateway.calls().len(), 1);
    }
}
