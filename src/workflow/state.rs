//! Workflow states and their numeric/symbolic mapping
//!
//! With M review steps the states form a dense enumeration:
//!
//! ```text
//! SUBMIT=0, STEP1POOL=1, STEP1=2, ..., STEPMPOOL=2M-1, STEPM=2M, ARCHIVE=2M+1
//! ```

use serde::{Deserialize, Serialize};

/// Returned by name lookups that do not match any state
pub const UNKNOWN_STATE: i32 = -1;

pub const DEFAULT_STEPS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowState {
    Submit,
    /// Unclaimed, visible to the step's reviewer group
    Pool(u8),
    /// Claimed by one reviewer
    Claimed(u8),
    Archive,
}

impl WorkflowState {
    /// Review step this state belongs to, if any
    pub fn step(&self) -> Option<u8> {
        match self {
            Self::Pool(step) | Self::Claimed(step) => Some(*step),
            Self::Submit | Self::Archive => None,
        }
    }

    pub fn is_pool(&self) -> bool {
        matches!(self, Self::Pool(_))
    }

    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed(_))
    }
}

/// The state space for a configured number of review steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowStates {
    steps: u8,
}

impl Default for WorkflowStates {
    fn default() -> Self {
        Self::new(DEFAULT_STEPS)
    }
}

impl WorkflowStates {
    pub fn new(steps: u8) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> u8 {
        self.steps
    }

    /// Number of states, SUBMIT and ARCHIVE included
    pub fn count(&self) -> usize {
        2 * self.steps as usize + 2
    }

    pub fn contains(&self, state: WorkflowState) -> bool {
        match state.step() {
            Some(step) => step >= 1 && step <= self.steps,
            None => true,
        }
    }

    pub fn id(&self, state: WorkflowState) -> i32 {
        match state {
            WorkflowState::Submit => 0,
            WorkflowState::Pool(step) => 2 * step as i32 - 1,
            WorkflowState::Claimed(step) => 2 * step as i32,
            WorkflowState::Archive => 2 * self.steps as i32 + 1,
        }
    }

    pub fn from_id(&self, id: i32) -> Option<WorkflowState> {
        let archive = 2 * self.steps as i32 + 1;
        match id {
            0 => Some(WorkflowState::Submit),
            id if id == archive => Some(WorkflowState::Archive),
            id if id > 0 && id < archive => {
                let step = ((id + 1) / 2) as u8;
                if id % 2 == 1 {
                    Some(WorkflowState::Pool(step))
                } else {
                    Some(WorkflowState::Claimed(step))
                }
            }
            _ => None,
        }
    }

    pub fn name(&self, state: WorkflowState) -> String {
        match state {
            WorkflowState::Submit => "SUBMIT".to_string(),
            WorkflowState::Pool(step) => format!("STEP{}POOL", step),
            WorkflowState::Claimed(step) => format!("STEP{}", step),
            WorkflowState::Archive => "ARCHIVE".to_string(),
        }
    }

    pub fn name_of(&self, id: i32) -> Option<String> {
        self.from_id(id).map(|s| self.name(s))
    }

    /// Case-insensitive lookup; `UNKNOWN_STATE` when nothing matches
    pub fn id_of(&self, name: &str) -> i32 {
        self.parse(name)
            .map(|s| self.id(s))
            .unwrap_or(UNKNOWN_STATE)
    }

    pub fn parse(&self, name: &str) -> Option<WorkflowState> {
        let upper = name.trim().to_ascii_uppercase();
        self.all().find(|s| self.name(*s) == upper)
    }

    /// Every state in id order
    pub fn all(&self) -> impl Iterator<Item = WorkflowState> + '_ {
        (0..self.count() as i32).filter_map(move |id| self.from_id(id))
    }

    /// Where an approval from `state` leads: SUBMIT to the first pool, a
    /// claimed step to the next pool, the last claimed step to ARCHIVE
    pub fn next_after_approval(&self, state: WorkflowState) -> Option<WorkflowState> {
        match state {
            WorkflowState::Submit if self.steps == 0 => Some(WorkflowState::Archive),
            WorkflowState::Submit => Some(WorkflowState::Pool(1)),
            WorkflowState::Claimed(step) if step >= self.steps => Some(WorkflowState::Archive),
            WorkflowState::Claimed(step) => Some(WorkflowState::Pool(step + 1)),
            WorkflowState::Pool(_) | WorkflowState::Archive => None,
        }
    }
}
