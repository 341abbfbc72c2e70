//! Auto-train coordination
//!
//! Download completions accumulate in `completed`. Once every required
//! artifact has been seen (and auto-train is enabled), exactly one training
//! trigger fires and the set is cleared for the next cycle.
//!
//! The check-and-clear happens inside the state actor, so two completions
//! arriving together are applied one after the other and only the second
//! can observe the satisfied set.

use std::collections::BTreeSet;

use crate::event_log::NewEvent;

use super::state::DashboardState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoTrainConfig {
    pub enabled: bool,
    required: BTreeSet<String>,
    completed: BTreeSet<String>,
}

impl AutoTrainConfig {
    pub fn new(enabled: bool, required: impl IntoIterator<Item = String>) -> Self {
        Self {
            enabled,
            required: required.into_iter().collect(),
            completed: BTreeSet::new(),
        }
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    pub fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }

    /// Artifacts still missing in the current cycle
    pub fn pending(&self) -> impl Iterator<Item = &String> {
        self.required.difference(&self.completed)
    }

    fn is_satisfied(&self) -> bool {
        !self.required.is_empty() && self.required.is_subset(&self.completed)
    }
}

/// Outcome of observing one artifact completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoTrainDecision {
    /// Not a required artifact; nothing recorded
    Ignored,
    /// Recorded; the cycle is not yet satisfied (or auto-train is disabled)
    Recorded,
    /// Cycle satisfied: the caller must trigger training exactly once
    Fire,
}

pub struct AutoTrainCoordinator;

impl AutoTrainCoordinator {
    /// Record a completed download artifact and decide whether training fires.
    /// When it does, `completed` has already been cleared.
    pub fn observe(state: &mut DashboardState, artifact: &str) -> AutoTrainDecision {
        let auto = &mut state.auto_train;

        if !auto.required.contains(artifact) {
            tracing::debug!(artifact, "artifact not required for auto-train");
            return AutoTrainDecision::Ignored;
        }

        auto.completed.insert(artifact.to_string());

        if !auto.enabled || !auto.is_satisfied() {
            tracing::debug!(
                artifact,
                done = auto.completed.len(),
                needed = auto.required.len(),
                "auto-train artifact recorded"
            );
            return AutoTrainDecision::Recorded;
        }

        auto.completed.clear();
        tracing::info!("all required artifacts present, triggering training");
        state.events.append(
            NewEvent::info("All required data downloaded, starting auto-training")
                .with_category("auto_train"),
        );
        AutoTrainDecision::Fire
    }

    pub fn set_enabled(state: &mut DashboardState, enabled: bool) {
        if state.auto_train.enabled == enabled {
            return;
        }
        state.auto_train.enabled = enabled;
        let message = if enabled {
            "Auto-training enabled"
        } else {
            "Auto-training disabled"
        };
        tracing::info!(enabled, "auto-train toggled");
        state
            .events
            .append(NewEvent::info(message).with_category("auto_train"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;

    fn state() -> DashboardState {
        DashboardState::new(&DashboardConfig::default())
    }

    fn assert_subset(state: &DashboardState) {
        let auto = &state.auto_train;
        assert!(auto.completed().is_subset(auto.required()));
    }

    #[test]
    fn test_fires_once_in_any_order() {
        let mut state = state();
        let order = ["validation.parquet", "live.parquet", "train.parquet"];

        let decisions: Vec<_> = order
            .iter()
            .map(|a| {
                let d = AutoTrainCoordinator::observe(&mut state, a);
                assert_subset(&state);
                d
            })
            .collect();

        assert_eq!(
            decisions,
            vec![
                AutoTrainDecision::Recorded,
                AutoTrainDecision::Recorded,
                AutoTrainDecision::Fire
            ]
        );
        assert!(state.auto_train.completed().is_empty());
    }

    #[test]
    fn test_two_of_three_never_fires() {
        let mut state = state();
        for a in ["train.parquet", "live.parquet", "train.parquet"] {
            assert_ne!(
                AutoTrainCoordinator::observe(&mut state, a),
                AutoTrainDecision::Fire
            );
        }
        assert_eq!(state.auto_train.completed().len(), 2);
        let pending: Vec<_> = state.auto_train.pending().cloned().collect();
        assert_eq!(pending, vec!["validation.parquet".to_string()]);
    }

    #[test]
    fn test_unknown_artifact_ignored() {
        let mut state = state();
        assert_eq!(
            AutoTrainCoordinator::observe(&mut state, "features.json"),
            AutoTrainDecision::Ignored
        );
        assert!(state.auto_train.completed().is_empty());
        assert_subset(&state);
    }

    #[test]
    fn test_disabled_accumulates_without_firing() {
        let mut state = state();
        AutoTrainCoordinator::set_enabled(&mut state, false);
        for a in ["train.parquet", "validation.parquet", "live.parquet"] {
            assert_eq!(
                AutoTrainCoordinator::observe(&mut state, a),
                AutoTrainDecision::Recorded
            );
        }
        assert_eq!(state.auto_train.completed().len(), 3);

        // Re-enabling keeps partial progress; the next completion fires.
        AutoTrainCoordinator::set_enabled(&mut state, true);
        assert_eq!(
            AutoTrainCoordinator::observe(&mut state, "live.parquet"),
            AutoTrainDecision::Fire
        );
        assert!(state.auto_train.completed().is_empty());
    }

    #[test]
    fn test_second_cycle_fires_again() {
        let mut state = state();
        let all = ["train.parquet", "validation.parquet", "live.parquet"];
        let fires = all
            .iter()
            .chain(all.iter())
            .filter(|a| AutoTrainCoordinator::observe(&mut state, a) == AutoTrainDecision::Fire)
            .count();
        assert_eq!(fires, 2);
    }

    #[test]
    fn test_empty_required_set_never_fires() {
        let mut state = state();
        state.auto_train = AutoTrainConfig::new(true, Vec::<String>::new());
        assert_eq!(
            AutoTrainCoordinator::observe(&mut state, "train.parquet"),
            AutoTrainDecision::Ignored
        );
    }

    #[test]
    fn test_toggle_logs_only_on_change() {
        let mut state = state();
        AutoTrainCoordinator::set_enabled(&mut state, true);
        assert!(state.events.is_empty());
        AutoTrainCoordinator::set_enabled(&mut state, false);
        assert_eq!(state.events.last().unwrap().message, "Auto-training disabled");
    }
}
