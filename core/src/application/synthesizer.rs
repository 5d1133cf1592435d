// Copyright (c) 2026 flowforge contributors
// SPDX-License-Identifier: MIT

//! Flow Graph Synthesizer
//!
//! Pure, deterministic construction of a flow definition from a parameter
//! set and the ordered list of deployed units. No I/O, no clock, no
//! randomness: re-synthesizing from equal inputs yields byte-identical
//! serialized output.
//!
//! The generated graph is always
//!
//! ```text
//! Trigger -> SetVariables -> Split_0 .. Split_{n-1} -> END
//! ```
//!
//! with a direct `SetVariables -> END` transition when no units exist.

use crate::domain::flow::{
    FlowDefinition, FlowFlags, FlowState, SetVariablesProperties, SplitProperties, StateName,
    Transition, TriggerProperties, VariableBinding, Widget,
};
use crate::domain::parameters::ParameterSet;

/// Friendly name of a deployed callable unit, as returned by the catalog.
///
/// Order matters: a unit's position in the resolved sequence determines the
/// positional suffix of its `Split_<i>` state.
pub type UnitName = String;

pub const TRIGGER_STATE: &str = "Trigger";
pub const SET_VARIABLES_STATE: &str = "SetVariables";

const FLOW_DESCRIPTION: &str = "Auto-generated Studio Flow";
const REST_API_TRIGGER: &str = "rest_api";
const NEXT_EVENT: &str = "next";
const MATCH_EVENT: &str = "match";

/// Synthesize a flow definition routing through the given units.
///
/// Total over any well-formed input: an empty parameter set yields a
/// `SetVariables` state with zero bindings, an empty unit list yields a
/// graph that ends right after `SetVariables`. Duplicate unit names are
/// not de-duplicated; synthesis is a pure positional map and any
/// disambiguation belongs upstream in the resolver.
pub fn synthesize(parameters: &ParameterSet, units: &[UnitName]) -> FlowDefinition {
    // The unit count is fixed before any state is generated; positional
    // Split_<i> names must stay dense and contiguous from 0.
    let unit_count = units.len();
    let mut states = Vec::with_capacity(unit_count + 2);

    states.push(FlowState {
        name: state_name(TRIGGER_STATE),
        widget: Widget::Trigger(TriggerProperties {
            trigger: REST_API_TRIGGER.to_string(),
            variables: parameters.clone(),
        }),
        transitions: vec![Transition::to(state_name(SET_VARIABLES_STATE))],
    });

    let bindings = parameters
        .keys()
        .map(|key| VariableBinding {
            key: key.clone(),
            value: format!("{{{{flow.data.{key}}}}}"),
        })
        .collect();
    let fan_out = if unit_count == 0 {
        vec![Transition::to(StateName::end())]
    } else {
        (0..unit_count)
            .map(|index| Transition::on(NEXT_EVENT, state_name(&split_name(index))))
            .collect()
    };
    states.push(FlowState {
        name: state_name(SET_VARIABLES_STATE),
        widget: Widget::SetVariables(SetVariablesProperties { variables: bindings }),
        transitions: fan_out,
    });

    for (index, unit) in units.iter().enumerate() {
        states.push(FlowState {
            name: state_name(&split_name(index)),
            widget: Widget::SplitBasedOn(SplitProperties {
                input: format!("{{{{widgets.{SET_VARIABLES_STATE}.parsed.{unit}}}}}"),
            }),
            transitions: vec![Transition::on(MATCH_EVENT, StateName::end())],
        });
    }

    FlowDefinition::new(
        FLOW_DESCRIPTION,
        states,
        state_name(TRIGGER_STATE),
        FlowFlags {
            allow_concurrent_calls: true,
        },
    )
    .expect("Invariant: synthesized states satisfy the flow constructor")
}

fn split_name(index: usize) -> String {
    format!("Split_{index}")
}

fn state_name(name: &str) -> StateName {
    StateName::new(name).expect("Invariant: synthesized state names are non-empty")
}
