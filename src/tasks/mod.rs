//! Run orchestration: the per-run state machine, the recurrence rule
//! provider, and the scheduler/worker pair that connects them.
//!
//! ```text
//! Scheduler ──RunRequest──▶ Worker ──▶ TaskExecutor ──▶ Store
//!     ▲                                     │
//!     └──── TaskConfigProvider ◀── Store ◀──┘
//! ```

use serde::{Deserialize, Serialize};

pub mod executor;
pub mod provider;
pub mod scheduler;
pub mod worker;

pub use executor::TaskExecutor;
pub use provider::{RecurrenceRule, TaskConfigProvider};
pub use scheduler::Scheduler;
pub use worker::Worker;

/// Payload of a triggered run, snapshotted from the task configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub magic_word: String,
}
