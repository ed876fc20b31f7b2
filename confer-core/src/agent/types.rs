//! Sub-agent kinds
//!
//! - Research: answers from the academic paper index
//! - Dev: inspects the code repository

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which specialist a delegation goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum AgentKind {
    /// DevLead - code, repositories, git history
    Dev,
    /// Researcher - papers and theory
    Research,
}

impl AgentKind {
    /// All agent kinds
    pub fn all() -> &'static [AgentKind] {
        &[AgentKind::Dev, AgentKind::Research]
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Dev => "devlead",
            AgentKind::Research => "researcher",
        }
    }

    /// What the agent is for, as shown to the controller model
    pub fn description(&self) -> &'static str {
        match self {
            AgentKind::Dev => {
                "Delegate a coding task to the DEV agent: repository exploration, file reading, \
                 git history, implementation analysis and debugging."
            }
            AgentKind::Research => {
                "Delegate a research task to the RESEARCH agent: academic papers, theoretical \
                 concepts and research methodology."
            }
        }
    }

    /// Name of the delegation tool for this agent
    pub fn tool_name(&self) -> &'static str {
        match self {
            AgentKind::Dev => "call_coder",
            AgentKind::Research => "call_researcher",
        }
    }

    /// Agent behind a delegation tool name
    pub fn from_tool_name(name: &str) -> Option<AgentKind> {
        Self::all().iter().copied().find(|kind| kind.tool_name() == name)
    }

    /// Label used in routing decisions
    pub fn route_label(&self) -> &'static str {
        match self {
            AgentKind::Dev => "DEV",
            AgentKind::Research => "RESEARCH",
        }
    }

    /// Fallback tool result when a run produced no summary
    pub fn empty_context(&self) -> &'static str {
        match self {
            AgentKind::Dev => "No code context found",
            AgentKind::Research => "No research context found",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.route_label())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" | "devlead" | "coder" | "code" => Ok(AgentKind::Dev),
            "research" | "researcher" => Ok(AgentKind::Research),
            _ => Err(format!("Unknown agent: {}", s)),
        }
    }
}

impl TryFrom<String> for AgentKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_round_trip() {
        for kind in AgentKind::all() {
            assert_eq!(AgentKind::from_tool_name(kind.tool_name()), Some(*kind));
        }
        assert_eq!(AgentKind::from_tool_name("call_code_reader"), None);
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!("DEV".parse::<AgentKind>().unwrap(), AgentKind::Dev);
        assert_eq!("research".parse::<AgentKind>().unwrap(), AgentKind::Research);
        assert_eq!("Coder".parse::<AgentKind>().unwrap(), AgentKind::Dev);
        assert!("ops".parse::<AgentKind>().is_err());
    }

    #[test]
    fn test_serde_uses_route_labels() {
        assert_eq!(serde_json::to_string(&AgentKind::Dev).unwrap(), "\"DEV\"");
        let kind: AgentKind = serde_json::from_str("\"research\"").unwrap();
        assert_eq!(kind, AgentKind::Research);
        assert!(serde_json::from_str::<AgentKind>("\"OPS\"").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(AgentKind::Research.to_string(), "RESEARCH");
        assert_eq!(AgentKind::Dev.name(), "devlead");
    }
}
