//! # Conductor
//!
//! A plan orchestration engine for multi-agent systems. Conductor takes a
//! high-level goal, asks an external reasoning oracle to decompose it into
//! an ordered plan, dispatches each task to a specialized executor with
//! dependency results injected as context, and re-plans adaptively after
//! every step, without ever letting a revision corrupt already-completed
//! work.
//!
//! The engine is deliberately tolerant of an unreliable oracle: malformed
//! structure and undecodable blocks are retried with a corrective prompt,
//! hallucinated executor roles reject the plan outright, and a revision
//! that tampers with completed tasks is spliced away rather than trusted.
//!
//! The oracle, the concrete executors, and the audit sink are external
//! collaborators behind the [`Oracle`], [`Executor`], and [`Reporter`]
//! traits; the engine itself owns parsing, validation, sequencing,
//! revision, and cancellation.

pub mod error;
pub mod events;
pub mod executor;
pub mod oracle;
pub mod orchestrator;
pub mod parser;
pub mod plan;
pub mod prompts;
pub mod registry;
pub mod revision;
pub mod roles;
pub mod task;

pub use error::{OrchestratorError, PlanParseError};
pub use events::{LogReporter, NullReporter, Reporter};
pub use executor::{Executor, ExecutorReply, ExecutorSet};
pub use oracle::{Oracle, OracleReply};
pub use orchestrator::{CancellationToken, Orchestrator, OrchestratorConfig, RunSummary};
pub use plan::Plan;
pub use registry::TaskRegistry;
pub use revision::RevisionController;
pub use roles::AgentRole;
pub use task::{PlannedTask, Task, TaskResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
