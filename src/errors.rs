// Copyright 2025 Cornell University
// released under MIT License

use crate::ir::{ComponentId, ScenarioId};
use thiserror::Error;

/// Main error type of the synthesis pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// The input references something it does not contain
    #[error("inconsistent specification: {0}")]
    InconsistentSpecification(#[from] InconsistencyError),
    /// A state that the pipeline should never reach
    #[error("internal invariant violated: {0}")]
    InvariantViolation(#[from] InvariantError),
    /// Rendering the processes failed
    #[error("failed to write output: {0}")]
    Output(String),
}

/// Referential problems detected while traversing a `Specification`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InconsistencyError {
    /// A continuation edge or marker points at a scenario that does not exist
    #[error("{context} references unknown bMSC {scenario}")]
    UnknownScenario {
        scenario: ScenarioId,
        context: String,
    },
    /// A component id that is not part of the specification
    #[error("unknown component {component}")]
    UnknownComponent { component: ComponentId },
}

/// Broken grammar invariants
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    /// An alternative whose start symbol differs from the rule it belongs to
    #[error("alternative `{alternative}` does not start with the symbol of rule `{rule}`")]
    MisplacedAlternative { rule: String, alternative: String },
    /// A rule stored under a different symbol than its own
    #[error("rule `{rule}` is stored under symbol `{key}`")]
    MisplacedRule { rule: String, key: String },
}

// Convenience constructors
impl SynthesisError {
    pub fn unknown_scenario(scenario: ScenarioId, context: impl Into<String>) -> Self {
        SynthesisError::InconsistentSpecification(InconsistencyError::UnknownScenario {
            scenario,
            context: context.into(),
        })
    }

    pub fn unknown_component(component: ComponentId) -> Self {
        SynthesisError::InconsistentSpecification(InconsistencyError::UnknownComponent {
            component,
        })
    }

    pub fn misplaced_alternative(rule: impl Into<String>, alternative: impl Into<String>) -> Self {
        SynthesisError::InvariantViolation(InvariantError::MisplacedAlternative {
            rule: rule.into(),
            alternative: alternative.into(),
        })
    }

    pub fn misplaced_rule(rule: impl Into<String>, key: impl Into<String>) -> Self {
        SynthesisError::InvariantViolation(InvariantError::MisplacedRule {
            rule: rule.into(),
            key: key.into(),
        })
    }
}

impl From<std::io::Error> for SynthesisError {
    fn from(e: std::io::Error) -> Self {
        SynthesisError::Output(e.to_string())
    }
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;
