//! Plans: ordered, cost-weighted action sequences generated for one goal.
//!
//! Generation is deliberately fixed: every sufficiently strong belief yields an
//! "analyze" action followed by an "optimize" action, both tying the belief
//! (precondition) to the goal (effect).

use serde::Serialize;

use crate::atom::{AtomHandle, AtomId};
use crate::error::{AgencyResult, PlanError};

/// Name of the first action generated per belief.
pub const ANALYZE_STATE: &str = "analyze_state";
/// Name of the second action generated per belief.
pub const EXECUTE_OPTIMIZATION: &str = "execute_optimization";

const ANALYZE_COST: f32 = 1.0;
const OPTIMIZE_COST: f32 = 2.0;
/// Beliefs must be strictly stronger than this to contribute actions.
const BELIEF_STRENGTH_CUTOFF: f32 = 0.5;

/// Identifier of a plan within its agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PlanId(pub u64);

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "plan:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A single plan step. Precondition and effect are non-owning atom ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    name: String,
    precondition: AtomId,
    effect: AtomId,
    cost: f32,
    priority: i32,
    completed: bool,
}

impl Action {
    /// Create an action. `cost` must be `>= 0`.
    pub fn new(name: &str, precondition: AtomId, effect: AtomId, cost: f32) -> AgencyResult<Self> {
        if name.is_empty() {
            return Err(PlanError::EmptyActionName.into());
        }
        if cost.is_nan() || cost < 0.0 {
            return Err(PlanError::NegativeCost {
                name: name.to_string(),
                cost,
            }
            .into());
        }
        Ok(Self {
            name: name.to_string(),
            precondition,
            effect,
            cost,
            priority: 0,
            completed: false,
        })
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn precondition(&self) -> AtomId {
        self.precondition
    }

    pub fn effect(&self) -> AtomId {
        self.effect
    }

    pub fn cost(&self) -> f32 {
        self.cost
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// An ordered list of actions serving one goal. Holds a reference on the goal.
#[derive(Debug, Clone)]
pub struct Plan {
    id: PlanId,
    goal: AtomHandle,
    actions: Vec<Action>,
    total_cost: f32,
    valid: bool,
}

impl Plan {
    /// Empty, valid plan for `goal`.
    pub fn new(id: PlanId, goal: AtomHandle) -> Self {
        Self {
            id,
            goal,
            actions: Vec::new(),
            total_cost: 0.0,
            valid: true,
        }
    }

    /// Build the fixed plan for `goal` from `beliefs`.
    pub fn generate(id: PlanId, goal: &AtomHandle, beliefs: &[AtomHandle]) -> AgencyResult<Self> {
        let mut plan = Self::new(id, goal.clone());
        for belief in beliefs {
            if belief.truth().strength <= BELIEF_STRENGTH_CUTOFF {
                continue;
            }
            plan.add_action(Action::new(ANALYZE_STATE, belief.id(), goal.id(), ANALYZE_COST)?);
            plan.add_action(Action::new(
                EXECUTE_OPTIMIZATION,
                belief.id(),
                goal.id(),
                OPTIMIZE_COST,
            )?);
        }
        Ok(plan)
    }

    /// Append an action and accumulate its cost.
    pub fn add_action(&mut self, action: Action) {
        self.total_cost += action.cost;
        self.actions.push(action);
    }

    pub fn id(&self) -> PlanId {
        self.id
    }

    pub fn goal(&self) -> &AtomHandle {
        &self.goal
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn total_cost(&self) -> f32 {
        self.total_cost
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether every action has completed (vacuously true when empty).
    pub fn is_complete(&self) -> bool {
        self.actions.iter().all(|a| a.completed)
    }

    /// Mark every pending action completed, returning how many were pending.
    pub(crate) fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        for action in self.actions.iter_mut().filter(|a| !a.completed) {
            action.completed = true;
            ran += 1;
        }
        ran
    }

    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }
}
