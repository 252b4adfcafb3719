mod state;
mod work_item;

pub use state::{PollMachine, Transition};
pub use work_item::{OutcomeKind, PollConfig, WorkItemOutcome};
