//! Closed enumeration of executor roles.
//!
//! The oracle names roles as free text; everything downstream works with
//! this enum, so an unknown role can only surface as a parse failure and
//! never as a per-task dispatch miss.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The executor capability a task is bound to.
///
/// Matching against oracle text is case-insensitive via [`AgentRole::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Writes and runs code.
    Coder,
    /// File-system management.
    File,
    /// Web browsing and research.
    Web,
    /// Conversational fallback.
    Casual,
}

impl AgentRole {
    /// Every role, in a stable order. Used to validate executor bindings
    /// at configuration time.
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Coder,
        AgentRole::File,
        AgentRole::Web,
        AgentRole::Casual,
    ];

    /// The canonical lowercase name for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Coder => "coder",
            AgentRole::File => "file",
            AgentRole::Web => "web",
            AgentRole::Casual => "casual",
        }
    }

    /// Parse a role from oracle-produced text, case-insensitively.
    ///
    /// Returns `None` for anything outside the known set; callers decide
    /// whether that is fatal (it is, for plan parsing).
    pub fn parse(text: &str) -> Option<AgentRole> {
        match text.trim().to_ascii_lowercase().as_str() {
            "coder" => Some(AgentRole::Coder),
            "file" => Some(AgentRole::File),
            "web" => Some(AgentRole::Web),
            "casual" => Some(AgentRole::Casual),
            _ => None,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
