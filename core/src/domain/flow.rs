// Copyright (c) 2026 flowforge contributors
// SPDX-License-Identifier: MIT

//! Flow Graph Domain Model
//!
//! A Studio flow is a directed graph of typed states. Each state carries a
//! widget (the kind-specific payload) and an ordered list of transitions;
//! the reserved `END` target terminates a path without naming a state.
//!
//! # Design Principles
//!
//! 1. **Immutability:** a definition is built once and never mutated
//! 2. **Type Safety:** widgets are a tagged sum type, not a property bag
//! 3. **Self-Validating:** `FlowDefinition::new` enforces graph invariants
//!    at construction time instead of deferring them to remote validation

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::parameters::ParameterSet;

// ============================================================================
// Value Objects: Identifiers
// ============================================================================

/// Unique name of a state within a flow (e.g. "Trigger", "Split_0")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateName(String);

impl StateName {
    /// Reserved terminal transition target. Never a materialized state.
    pub const END: &'static str = "END";

    pub fn new(name: impl Into<String>) -> Result<Self, FlowError> {
        let name = name.into();
        if name.is_empty() {
            return Err(FlowError::InvalidStateName(
                "state name cannot be empty".to_string(),
            ));
        }
        Ok(Self(name))
    }

    /// The terminal `END` target.
    pub fn end() -> Self {
        Self(Self::END.to_string())
    }

    pub fn is_end(&self) -> bool {
        self.0 == Self::END
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Value Objects: Transitions
// ============================================================================

/// Edge from one state to another (or to the terminal `END`).
///
/// The optional event label is omitted from the wire form when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub next: StateName,
}

impl Transition {
    /// Unconditional transition with no event label.
    pub fn to(next: StateName) -> Self {
        Self { event: None, next }
    }

    /// Transition taken on a named event.
    pub fn on(event: impl Into<String>, next: StateName) -> Self {
        Self {
            event: Some(event.into()),
            next,
        }
    }
}

// ============================================================================
// Value Objects: Widgets (state kinds)
// ============================================================================

/// Kind-specific payload of a state.
///
/// Serialized adjacently as `"type"` + `"properties"`, matching the Studio
/// wire format for flow definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "snake_case")]
pub enum Widget {
    /// The flow's single entry point, declaring the input variable schema.
    Trigger(TriggerProperties),
    /// Binds flow input values to named variables.
    SetVariables(SetVariablesProperties),
    /// Routes execution by evaluating an expression against prior state.
    SplitBasedOn(SplitProperties),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerProperties {
    /// Trigger channel; synthesized flows are REST-invoked ("rest_api").
    pub trigger: String,
    /// Declared input schema: variable name -> sample value.
    pub variables: ParameterSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetVariablesProperties {
    pub variables: Vec<VariableBinding>,
}

/// One `{key, value}` binding; `value` is a reference expression such as
/// `{{flow.data.destination}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableBinding {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitProperties {
    /// The expression being branched on.
    pub input: String,
}

// ============================================================================
// Entities: States and the Definition Aggregate
// ============================================================================

/// One node in the flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    pub name: StateName,
    #[serde(flatten)]
    pub widget: Widget,
    pub transitions: Vec<Transition>,
}

/// Graph-level options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowFlags {
    pub allow_concurrent_calls: bool,
}

/// Complete flow definition as submitted to the Studio API.
///
/// # Invariants
/// - At least one state
/// - `initial_state` equals the first state's name
/// - State names are unique
/// - Exactly one `trigger` state and exactly one `set_variables` state
/// - Every transition target names an existing state or the terminal `END`
///
/// Declaration order of `states` carries no runtime semantics beyond
/// readability; transitions are the only traversal edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub description: String,
    pub states: Vec<FlowState>,
    pub initial_state: StateName,
    pub flags: FlowFlags,
}

impl FlowDefinition {
    /// Create a definition, enforcing the graph invariants.
    pub fn new(
        description: impl Into<String>,
        states: Vec<FlowState>,
        initial_state: StateName,
        flags: FlowFlags,
    ) -> Result<Self, FlowError> {
        let first = states.first().ok_or(FlowError::NoStates)?;
        if first.name != initial_state {
            return Err(FlowError::InitialStateMismatch {
                initial: initial_state,
                first: first.name.clone(),
            });
        }

        let mut names = HashSet::with_capacity(states.len());
        for state in &states {
            if !names.insert(state.name.clone()) {
                return Err(FlowError::DuplicateState(state.name.clone()));
            }
        }

        let triggers = states
            .iter()
            .filter(|s| matches!(s.widget, Widget::Trigger(_)))
            .count();
        if triggers != 1 {
            return Err(FlowError::TriggerCount(triggers));
        }
        let setters = states
            .iter()
            .filter(|s| matches!(s.widget, Widget::SetVariables(_)))
            .count();
        if setters != 1 {
            return Err(FlowError::SetVariablesCount(setters));
        }

        for state in &states {
            for transition in &state.transitions {
                if !transition.next.is_end() && !names.contains(&transition.next) {
                    return Err(FlowError::UnresolvedTarget {
                        from: state.name.clone(),
                        target: transition.next.clone(),
                    });
                }
            }
        }

        Ok(Self {
            description: description.into(),
            states,
            initial_state,
            flags,
        })
    }

    pub fn get_state(&self, name: &StateName) -> Option<&FlowState> {
        self.states.iter().find(|s| &s.name == name)
    }
}

// ============================================================================
// Publish Result
// ============================================================================

/// What the hosting service returns after a create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub sid: String,
    pub status: String,
}

// ============================================================================
// Domain Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("flow must have at least one state")]
    NoStates,

    #[error("initial state '{initial}' does not match first state '{first}'")]
    InitialStateMismatch { initial: StateName, first: StateName },

    #[error("duplicate state name '{0}'")]
    DuplicateState(StateName),

    #[error("flow must have exactly one trigger state, found {0}")]
    TriggerCount(usize),

    #[error("flow must have exactly one set_variables state, found {0}")]
    SetVariablesCount(usize),

    #[error("transition target '{target}' not found (from state '{from}')")]
    UnresolvedTarget { from: StateName, target: StateName },

    #[error("invalid state name: {0}")]
    InvalidStateName(String),
}
