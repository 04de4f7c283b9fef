//! Output types produced by a single transition-engine invocation.

use quorumkeeper_types::{NodeId, ReplicationState};

/// One `(node, newGoalState, humanDescription)` triple from spec.md §4.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub node_id: NodeId,
    pub new_goal_state: ReplicationState,
    pub description: String,
}

impl Assignment {
    pub fn new(node_id: NodeId, new_goal_state: ReplicationState, description: impl Into<String>) -> Self {
        Self {
            node_id,
            new_goal_state,
            description: description.into(),
        }
    }
}

/// A non-fatal inconsistency the engine noticed but could not act on.
/// Corresponds to spec.md §7 error kind 1 ("Inconsistent snapshot"): the
/// engine stays total by returning this instead of panicking or erroring,
/// and the caller is responsible for logging it and surfacing a failure
/// to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// The reporting node's id was not present in the supplied snapshot.
    ReportingNodeNotFound,
    /// A rule needed the group's current primary-like node but none
    /// could be located by scanning reported/goal state.
    PrimaryNotLocatable,
}

/// The result of one `evaluate` call: zero or more assignments plus an
/// optional diagnostic. A plain struct the caller inspects field-by-field,
/// not a `Result`, since "no rule fires" is a normal outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub assignments: Vec<Assignment>,
    pub diagnostic: Option<Diagnostic>,
}

impl EngineOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(assignment: Assignment) -> Self {
        Self {
            assignments: vec![assignment],
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(diagnostic: Diagnostic) -> Self {
        Self {
            assignments: Vec::new(),
            diagnostic: Some(diagnostic),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty() && self.diagnostic.is_none()
    }
}
