//! One tokio task per delivered job event

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, Instrument};

use super::controller::{JobController, JobOutcome};
use super::types::{Job, JobId};

/// Runs job pipelines concurrently, one per event.
///
/// A panic inside a pipeline ends only that task; the dispatcher and other
/// pipelines are unaffected.
#[derive(Clone)]
pub struct JobDispatcher {
    controller: Arc<JobController>,
    in_flight: Option<Arc<Mutex<HashSet<JobId>>>>,
}

impl JobDispatcher {
    pub fn new(controller: Arc<JobController>) -> Self {
        Self {
            controller,
            in_flight: None,
        }
    }

    /// Drop redelivered events for a job whose pipeline is still running
    pub fn with_in_flight_dedup(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(|| Arc::new(Mutex::new(HashSet::new())));
        self
    }

    pub fn controller(&self) -> &Arc<JobController> {
        &self.controller
    }

    /// Start processing `job`; `None` when the event was dropped as a duplicate
    pub async fn dispatch(&self, job: Job) -> Option<JoinHandle<JobOutcome>> {
        let job_id = job.id;

        if let Some(in_flight) = &self.in_flight {
            if !in_flight.lock().await.insert(job_id) {
                debug!(job_id, phase = %job.phase, "Pipeline already running, dropping event");
                return None;
            }
        }

        let controller = Arc::clone(&self.controller);
        let in_flight = self.in_flight.clone();
        let span = info_span!("job", job_id, phase = %job.phase);

        let handle = tokio::spawn(
            async move {
                let pipeline = tokio::spawn(async move { controller.handle(&job).await });

                let outcome = match pipeline.await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        error!(job_id, error = %err, "Job pipeline aborted");
                        JobOutcome::Failed {
                            reason: format!("pipeline aborted: {err}"),
                        }
                    }
                };

                if let Some(in_flight) = in_flight {
                    in_flight.lock().await.remove(&job_id);
                }
                outcome
            }
            .instrument(span),
        );

        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::sink::MemorySink;
    use crate::jobs::types::JobPhase;
    use crate::offerings::{
        DeliverableResult, ExecuteJob, HandlerError, HandlerExports, MemorySource,
        OfferingRegistry, Requirements,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Blocks until released, so tests can hold a pipeline open
    struct Gate(Arc<Notify>);

    #[async_trait]
    impl ExecuteJob for Gate {
        async fn execute_job(
            &self,
            _request: &Requirements,
        ) -> Result<DeliverableResult, HandlerError> {
            self.0.notified().await;
            Ok(DeliverableResult::new("done"))
        }
    }

    async fn dispatcher(gate: Arc<Notify>, dedup: bool) -> (JobDispatcher, Arc<MemorySink>) {
        let source = Arc::new(MemorySource::new());
        source
            .put_offering(
                "slow",
                json!({"name": "slow", "description": "waits", "jobFee": 1, "requiredFunds": false}),
                HandlerExports::builder().execute_job(Arc::new(Gate(gate))).build(),
            )
            .await;

        let sink = Arc::new(MemorySink::new());
        let controller = JobController::new(Arc::new(OfferingRegistry::new(source)), sink.clone());
        let dispatcher = JobDispatcher::new(Arc::new(controller)).with_in_flight_dedup(dedup);
        (dispatcher, sink)
    }

    fn job(id: JobId) -> Job {
        Job {
            id,
            phase: JobPhase::Transaction,
            client_address: "0xclient".to_string(),
            provider_address: None,
            price: 1.0,
            context: json!({"offeringName": "slow"}),
            memos: vec![],
        }
    }

    #[tokio::test]
    async fn test_duplicate_event_dropped_while_running() {
        let gate = Arc::new(Notify::new());
        let (dispatcher, sink) = dispatcher(gate.clone(), true).await;

        let first = dispatcher.dispatch(job(1)).await.unwrap();
        assert!(dispatcher.dispatch(job(1)).await.is_none());

        gate.notify_one();
        let outcome = first.await.unwrap();
        assert_eq!(outcome, JobOutcome::Delivered { offering: "slow".to_string() });
        assert_eq!(sink.actions_for(1).await.len(), 1);

        // Finished pipelines no longer block redelivery
        let again = dispatcher.dispatch(job(1)).await.unwrap();
        gate.notify_one();
        again.await.unwrap();
        assert_eq!(sink.actions_for(1).await.len(), 2);
    }

    #[tokio::test]
    async fn test_slow_job_does_not_block_other_jobs() {
        let gate = Arc::new(Notify::new());
        let (dispatcher, sink) = dispatcher(gate.clone(), false).await;

        let slow = dispatcher.dispatch(job(1)).await.unwrap();

        let mut other = job(2);
        other.context = json!({});
        let quick = dispatcher.dispatch(other).await.unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), quick)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, JobOutcome::Unrouted);
        assert!(sink.actions_for(1).await.is_empty());

        gate.notify_one();
        slow.await.unwrap();
        assert_eq!(sink.actions_for(1).await.len(), 1);
    }
}
