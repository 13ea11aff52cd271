// src/build/steps.rs

//! Fixed composition of each named pipeline step.

use crate::types::BuildStep;

/// One unit of work inside a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Invoke an engine method under the log watchdog.
    Engine(&'static str),
    /// Run the configured post-resource shell hooks.
    ResourceHooks,
}

const REBUILD_RESOURCE: [StepAction; 2] = [
    StepAction::Engine("BuildResource"),
    StepAction::ResourceHooks,
];

/// Actions of `step`, in order. Execution stops at the first non-zero exit.
pub fn actions_for(step: BuildStep) -> Vec<StepAction> {
    match step {
        BuildStep::RebuildAll => {
            let mut actions = REBUILD_RESOURCE.to_vec();
            actions.push(StepAction::Engine("BuildCode"));
            actions
        }
        BuildStep::RebuildResource => REBUILD_RESOURCE.to_vec(),
        BuildStep::RefreshUiAtlas => vec![StepAction::Engine("RefreshUIAtlas")],
        BuildStep::RecreateRolePrefab => vec![
            StepAction::Engine("RecreateRoleSprites"),
            StepAction::Engine("RecreateRolePrefab"),
        ],
    }
}

/// Engine methods `step` may invoke, in order.
pub fn engine_methods(step: BuildStep) -> Vec<&'static str> {
    actions_for(step)
        .into_iter()
        .filter_map(|a| match a {
            StepAction::Engine(method) => Some(method),
            StepAction::ResourceHooks => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_all_builds_resources_before_code() {
        assert_eq!(
            actions_for(BuildStep::RebuildAll),
            vec![
                StepAction::Engine("BuildResource"),
                StepAction::ResourceHooks,
                StepAction::Engine("BuildCode"),
            ]
        );
    }

    #[test]
    fn every_step_invokes_the_engine() {
        for step in BuildStep::ALL {
            assert!(!engine_methods(step).is_empty(), "{step} has no engine call");
        }
        assert_eq!(
            engine_methods(BuildStep::RecreateRolePrefab),
            vec!["RecreateRoleSprites", "RecreateRolePrefab"]
        );
    }
}
