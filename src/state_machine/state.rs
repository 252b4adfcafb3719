use super::work_item::OutcomeKind;
use crate::da::WorkItemStatus;

/// What the polling loop must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Sleep one interval, then read the status again.
    Poll,
    /// Polling is over.
    Complete(OutcomeKind),
}

/// State of the status-polling loop for one work item.
///
/// Starts in `pending` with no reads. Every successful read replaces the
/// current status with whatever the server reported; the server is the only
/// authority on transitions. A failed read ends polling.
#[derive(Debug, Clone)]
pub struct PollMachine {
    status: WorkItemStatus,
    attempts: u32,
    max_attempts: u32,
    history: Vec<WorkItemStatus>,
    read_error: Option<String>,
}

impl PollMachine {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            status: WorkItemStatus::Pending,
            attempts: 0,
            max_attempts,
            history: Vec::new(),
            read_error: None,
        }
    }

    /// Compute the next step from the current state.
    ///
    /// - A failed read completes with `PollFailed`.
    /// - `success` completes with `Succeeded`.
    /// - `pending`/`inprogress` polls again while reads remain, otherwise
    ///   completes with `TimedOut`.
    /// - Any other status completes with `Failed`.
    pub fn transition(&self) -> Transition {
        if let Some(error) = &self.read_error {
            return Transition::Complete(OutcomeKind::PollFailed {
                error: error.clone(),
            });
        }

        match &self.status {
            WorkItemStatus::Success => Transition::Complete(OutcomeKind::Succeeded),
            status if status.is_active() => {
                if self.attempts < self.max_attempts {
                    Transition::Poll
                } else {
                    Transition::Complete(OutcomeKind::TimedOut {
                        last_status: status.clone(),
                    })
                }
            }
            status => Transition::Complete(OutcomeKind::Failed {
                status: status.clone(),
            }),
        }
    }

    /// Record a successful status read.
    pub fn observe(&mut self, status: WorkItemStatus) {
        self.attempts += 1;
        self.history.push(status.clone());
        self.status = status;
    }

    /// Record a status read that did not return a status.
    pub fn read_failed(&mut self, error: String) {
        self.attempts += 1;
        self.read_error = Some(error);
    }

    pub fn status(&self) -> &WorkItemStatus {
        &self.status
    }

    /// Reads issued so far, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn history(&self) -> &[WorkItemStatus] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_pending_and_polls() {
        let machine = PollMachine::new(60);
        assert_eq!(machine.status(), &WorkItemStatus::Pending);
        assert_eq!(machine.attempts(), 0);
        assert_eq!(machine.transition(), Transition::Poll);
    }

    #[test]
    fn success_completes() {
        let mut machine = PollMachine::new(60);
        machine.observe(WorkItemStatus::Pending);
        assert_eq!(machine.transition(), Transition::Poll);
        machine.observe(WorkItemStatus::InProgress);
        assert_eq!(machine.transition(), Transition::Poll);
        machine.observe(WorkItemStatus::Success);
        assert_eq!(machine.transition(), Transition::Complete(OutcomeKind::Succeeded));
        assert_eq!(
            machine.history(),
            &[WorkItemStatus::Pending, WorkItemStatus::InProgress, WorkItemStatus::Success]
        );
    }

    #[test]
    fn terminal_failures_complete_before_budget() {
        for status in [
            WorkItemStatus::FailedLimitProcessingTime,
            WorkItemStatus::FailedLimitDataSize,
            WorkItemStatus::FailedDownload,
            WorkItemStatus::FailedInstructions,
            WorkItemStatus::FailedUpload,
        ] {
            let mut machine = PollMachine::new(60);
            machine.observe(status.clone());
            assert_eq!(
                machine.transition(),
                Transition::Complete(OutcomeKind::Failed { status })
            );
            assert_eq!(machine.attempts(), 1);
        }
    }

    #[test]
    fn unknown_and_cancelled_statuses_end_polling() {
        let mut machine = PollMachine::new(60);
        machine.observe(WorkItemStatus::Cancelled);
        assert!(matches!(machine.transition(), Transition::Complete(OutcomeKind::Failed { .. })));

        let mut machine = PollMachine::new(60);
        machine.observe(WorkItemStatus::Other("paused".into()));
        assert_eq!(
            machine.transition(),
            Transition::Complete(OutcomeKind::Failed {
                status: WorkItemStatus::Other("paused".into())
            })
        );
    }

    #[test]
    fn budget_exhaustion_times_out() {
        let mut machine = PollMachine::new(3);
        for _ in 0..3 {
            assert_eq!(machine.transition(), Transition::Poll);
            machine.observe(WorkItemStatus::InProgress);
        }
        assert_eq!(
            machine.transition(),
            Transition::Complete(OutcomeKind::TimedOut {
                last_status: WorkItemStatus::InProgress
            })
        );
        assert_eq!(machine.attempts(), 3);
    }

    #[test]
    fn success_on_last_allowed_read_is_success() {
        let mut machine = PollMachine::new(2);
        machine.observe(WorkItemStatus::Pending);
        machine.observe(WorkItemStatus::Success);
        assert_eq!(machine.transition(), Transition::Complete(OutcomeKind::Succeeded));
    }

    #[test]
    fn zero_budget_times_out_without_reading() {
        let machine = PollMachine::new(0);
        assert_eq!(
            machine.transition(),
            Transition::Complete(OutcomeKind::TimedOut {
                last_status: WorkItemStatus::Pending
            })
        );
    }

    #[test]
    fn read_failure_completes_immediately() {
        let mut machine = PollMachine::new(60);
        machine.observe(WorkItemStatus::Pending);
        machine.read_failed("network error: connection reset".into());
        assert_eq!(
            machine.transition(),
            Transition::Complete(OutcomeKind::PollFailed {
                error: "network error: connection reset".into()
            })
        );
        assert_eq!(machine.attempts(), 2);
        assert_eq!(machine.status(), &WorkItemStatus::Pending);
    }
}
