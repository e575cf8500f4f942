//! Run orchestration.

mod orchestrator;
mod outcome;

pub use orchestrator::Pipeline;
pub use outcome::{AbortReason, RunOptions, RunOutcome, RunReport};
