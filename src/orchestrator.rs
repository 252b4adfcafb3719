use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::da::{ApiError, WorkItem, WorkItemApi, WorkItemDetails, WorkItemStatus};
use crate::state_machine::{OutcomeKind, PollConfig, PollMachine, Transition, WorkItemOutcome};

/// Suspension between status reads. Injected so tests run without delay.
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer.
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Progress hooks for the terminal UI. Every method defaults to a no-op.
pub trait PollReporter {
    fn submitted(&self, _work_item_id: &str) {}

    fn polled(&self, _attempt: u32, _max_attempts: u32, _status: &WorkItemStatus) {}
}

impl PollReporter for () {}

/// Submits one work item and drives it to a final outcome.
pub struct WorkItemOrchestrator<'a, A, S = TokioSleeper> {
    api: &'a A,
    sleeper: S,
    config: PollConfig,
}

impl<'a, A: WorkItemApi> WorkItemOrchestrator<'a, A> {
    pub fn new(api: &'a A, config: PollConfig) -> Self {
        Self::with_sleeper(api, TokioSleeper, config)
    }
}

impl<'a, A: WorkItemApi, S: Sleeper> WorkItemOrchestrator<'a, A, S> {
    pub fn with_sleeper(api: &'a A, sleeper: S, config: PollConfig) -> Self {
        Self {
            api,
            sleeper,
            config,
        }
    }

    /// Submit a work item against `activity_id` (`name+alias`) and poll it.
    ///
    /// A failed submission is returned as an error and never retried. Every
    /// ending after a successful submission is an `Ok` outcome; non-success
    /// endings carry the server record from one extra status read.
    pub async fn submit(
        &self,
        activity_id: &str,
        input_url: &str,
        output_url: &str,
        reporter: &impl PollReporter,
    ) -> Result<WorkItemOutcome, ApiError> {
        let started_at = Utc::now();
        let item = WorkItem::new(activity_id, input_url, output_url);

        info!(activity = activity_id, "submitting work item");
        let created = self.api.create_work_item(&item).await.inspect_err(|e| {
            error!(error = %e, status = ?e.status(), "work item submission failed");
        })?;
        info!(
            work_item = %created.id,
            interval_secs = self.config.interval.as_secs(),
            budget_secs = self.config.budget().as_secs(),
            "work item created, polling"
        );
        reporter.submitted(&created.id);

        let mut machine = PollMachine::new(self.config.max_attempts);
        let outcome = loop {
            match machine.transition() {
                Transition::Poll => {
                    self.sleeper.sleep(self.config.interval).await;
                    match self.api.get_work_item(&created.id).await {
                        Ok(details) => {
                            machine.observe(details.status);
                            info!(
                                work_item = %created.id,
                                status = %machine.status(),
                                attempt = machine.attempts(),
                                "status read"
                            );
                            let status = machine.status();
                            if !status.is_active()
                                && *status != WorkItemStatus::Success
                                && !status.is_terminal_failure()
                            {
                                warn!(work_item = %created.id, %status, "unexpected status ends polling");
                            }
                            reporter.polled(
                                machine.attempts(),
                                machine.max_attempts(),
                                machine.status(),
                            );
                        }
                        Err(e) => {
                            warn!(
                                work_item = %created.id,
                                error = %e,
                                status = ?e.status(),
                                "status read failed"
                            );
                            machine.read_failed(e.to_string());
                        }
                    }
                }
                Transition::Complete(outcome) => break outcome,
            }
        };

        let details = match &outcome {
            OutcomeKind::Succeeded => {
                info!(work_item = %created.id, "work item completed successfully");
                None
            }
            failure => {
                warn!(work_item = %created.id, outcome = %failure, "work item did not succeed");
                self.diagnostics(&created.id).await
            }
        };

        let completed_at = Utc::now();
        Ok(WorkItemOutcome {
            work_item_id: created.id,
            outcome,
            polls: machine.attempts(),
            max_polls: machine.max_attempts(),
            status_history: machine.history().to_vec(),
            details,
            started_at,
            completed_at,
            duration_ms: (completed_at - started_at).num_milliseconds(),
        })
    }

    /// One extra read to attach the full server record to a failure report.
    async fn diagnostics(&self, id: &str) -> Option<WorkItemDetails> {
        match self.api.get_work_item(id).await {
            Ok(details) => Some(details),
            Err(e) => {
                warn!(work_item = id, error = %e, "could not fetch failure details");
                None
            }
        }
    }
}
