//! Interface to the external reasoning oracle.
//!
//! The oracle converts prompts into plan or revision text. The engine
//! treats the call as synchronous from its own perspective: nothing else
//! proceeds while a request is outstanding.

use async_trait::async_trait;

use crate::error::OrchestratorError;

/// One oracle response: the answer text plus any separate reasoning text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleReply {
    /// The answer, expected to carry a fenced json plan block or the
    /// literal no-update token on the revision path.
    pub answer: String,
    /// Free-form reasoning emitted alongside the answer. Not parsed.
    pub reasoning: String,
}

impl OracleReply {
    /// Convenience constructor for replies without separate reasoning.
    pub fn answer_only(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            reasoning: String::new(),
        }
    }
}

/// The external reasoning component that produces plan and revision text.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send a prompt and wait for the oracle's reply.
    async fn request(&self, prompt: &str) -> Result<OracleReply, OrchestratorError>;
}
