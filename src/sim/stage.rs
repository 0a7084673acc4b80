//! Hysteretic stage machine driven by the control variable magnitude

use serde::{Deserialize, Serialize};

use crate::consts::{AGITATED_THRESHOLD, BREAKAWAY_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    Calm,
    Agitated,
    Breakaway,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Calm => "calm",
            Stage::Agitated => "agitated",
            Stage::Breakaway => "breakaway",
        }
    }
}

/// Independent up/down thresholds. `*_down` must not exceed `*_up`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageThresholds {
    pub agitate_up: f32,
    pub agitate_down: f32,
    pub breakaway_up: f32,
    pub breakaway_down: f32,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            agitate_up: AGITATED_THRESHOLD,
            agitate_down: AGITATED_THRESHOLD * 0.9,
            breakaway_up: BREAKAWAY_THRESHOLD,
            breakaway_down: BREAKAWAY_THRESHOLD - 0.02,
        }
    }
}

impl StageThresholds {
    /// Thresholds are ordered so that every band is non-empty
    pub fn is_ordered(&self) -> bool {
        self.agitate_down <= self.agitate_up
            && self.breakaway_down <= self.breakaway_up
            && self.agitate_up <= self.breakaway_up
            && self.agitate_down <= self.breakaway_down
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,
}

impl StageTransition {
    /// Constraints must be dropped
    pub fn detaches(&self) -> bool {
        self.to == Stage::Breakaway
    }

    /// Constraints must be restored
    pub fn reattaches(&self) -> bool {
        self.from == Stage::Breakaway
    }
}

#[derive(Debug, Clone, Default)]
pub struct StageMachine {
    stage: Stage,
    thresholds: StageThresholds,
}

impl StageMachine {
    pub fn new(thresholds: StageThresholds) -> Self {
        Self {
            stage: Stage::Calm,
            thresholds,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn reset(&mut self) {
        self.stage = Stage::Calm;
    }

    /// Feed the current control magnitude; returns the transition, if any
    pub fn update(&mut self, magnitude: f32) -> Option<StageTransition> {
        let t = &self.thresholds;
        let next = match self.stage {
            Stage::Calm | Stage::Agitated if magnitude > t.breakaway_up => Stage::Breakaway,
            Stage::Calm if magnitude > t.agitate_up => Stage::Agitated,
            Stage::Agitated if magnitude < t.agitate_down => Stage::Calm,
            Stage::Breakaway if magnitude < t.breakaway_down => {
                if magnitude < t.agitate_down {
                    Stage::Calm
                } else {
                    Stage::Agitated
                }
            }
            current => current,
        };
        if next == self.stage {
            return None;
        }
        let transition = StageTransition {
            from: self.stage,
            to: next,
        };
        self.stage = next;
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_climbs_through_stages() {
        let mut machine = StageMachine::new(StageThresholds::default());
        assert_eq!(machine.update(0.05), None);
        let t = machine.update(0.11).unwrap();
        assert_eq!((t.from, t.to), (Stage::Calm, Stage::Agitated));
        let t = machine.update(0.16).unwrap();
        assert!(t.detaches());
        assert_eq!(machine.stage(), Stage::Breakaway);
    }

    #[test]
    fn test_no_chatter_inside_band() {
        let mut machine = StageMachine::new(StageThresholds::default());
        machine.update(0.2);
        // Oscillate between breakaway_down + e and breakaway_up - e
        for i in 0..100 {
            let m = if i % 2 == 0 { 0.131 } else { 0.149 };
            assert_eq!(machine.update(m), None);
        }
        assert_eq!(machine.stage(), Stage::Breakaway);

        let t = machine.update(0.12).unwrap();
        assert!(t.reattaches());
        assert_eq!(t.to, Stage::Agitated);
    }

    #[test]
    fn test_drop_straight_to_calm() {
        let mut machine = StageMachine::new(StageThresholds::default());
        machine.update(0.5);
        let t = machine.update(0.002).unwrap();
        assert_eq!((t.from, t.to), (Stage::Breakaway, Stage::Calm));
        assert!(t.reattaches() && !t.detaches());
    }

    #[test]
    fn test_default_thresholds_ordered() {
        assert!(StageThresholds::default().is_ordered());
        let bad = StageThresholds {
            agitate_down: 0.2,
            ..Default::default()
        };
        assert!(!bad.is_ordered());
    }
}
