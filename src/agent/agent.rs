//! The agent: goals, beliefs, knowledge, a FIFO inbox and owned plans behind
//! one lock.
//!
//! Operations that need only the agent's own state live here. Operations that
//! also touch the shared atomspace or rule registry (`reason`, `apply_rules`,
//! `send`) are driven by [`Agency`](crate::agency::Agency), which calls the
//! crate-private phase methods below so that no agent lock is ever held while
//! another agent's or the agency's lock is taken.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::atom::{AtomHandle, TruthValue, bounded_name};
use crate::error::{AgencyResult, AgentError, PlanError};

use super::message::Message;
use super::plan::{Plan, PlanId};

/// Strength a belief needs to count as useful during the reasoning pass.
const USEFUL_STRENGTH: f32 = 0.7;
/// Confidence a belief needs to count as useful during the reasoning pass.
const USEFUL_CONFIDENCE: f32 = 0.6;

/// Agent identifier, unique within an agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AgentId(pub u64);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent:{}", self.0)
    }
}

/// Opaque handle to the external task an agent is bound to. Never dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TaskHandle(pub u64);

/// Opaque port handle for an external messaging layer. Never dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct PortHandle(pub u64);

/// What an agent is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AgentState {
    Idle,
    Reasoning,
    Acting,
    Learning,
    /// Entered by the sender of a message; left on the next state change.
    Communicating,
    /// Reserved.
    Blocked,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentState::Idle => "idle",
            AgentState::Reasoning => "reasoning",
            AgentState::Acting => "acting",
            AgentState::Learning => "learning",
            AgentState::Communicating => "communicating",
            AgentState::Blocked => "blocked",
        };
        f.write_str(s)
    }
}

/// Point-in-time counters and collection sizes of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStats {
    pub state: AgentState,
    pub reasoning_cycles: u64,
    pub actions_executed: u64,
    pub messages_processed: u64,
    pub messages_sent: u64,
    pub goals: usize,
    pub beliefs: usize,
    pub knowledge: usize,
    pub plans: usize,
    pub pending_messages: usize,
}

#[derive(Debug)]
struct AgentInner {
    state: AgentState,
    goals: Vec<AtomHandle>,
    beliefs: Vec<AtomHandle>,
    knowledge: Vec<AtomHandle>,
    inbox: VecDeque<Message>,
    plans: Vec<Plan>,
    current_plan: Option<PlanId>,
    next_plan_id: u64,
    next_timestamp: u64,
    reasoning_cycles: u64,
    actions_executed: u64,
    messages_processed: u64,
    messages_sent: u64,
    control_port: PortHandle,
    message_port: PortHandle,
}

/// Everything an agent owned, handed back on teardown so the caller can drop
/// it outside the agent lock.
#[derive(Debug, Default)]
pub(crate) struct Released {
    pub atoms: Vec<AtomHandle>,
    pub plans: Vec<Plan>,
    pub messages: Vec<Message>,
}

/// A stateful actor holding atom references and an inbox.
#[derive(Debug)]
pub struct Agent {
    id: AgentId,
    name: String,
    task: TaskHandle,
    inner: Mutex<AgentInner>,
}

impl Agent {
    pub(crate) fn new(id: AgentId, name: &str, task: TaskHandle) -> Self {
        Self {
            id,
            name: bounded_name(name),
            task,
            inner: Mutex::new(AgentInner {
                state: AgentState::Idle,
                goals: Vec::new(),
                beliefs: Vec::new(),
                knowledge: Vec::new(),
                inbox: VecDeque::new(),
                plans: Vec::new(),
                current_plan: None,
                next_plan_id: 1,
                next_timestamp: 0,
                reasoning_cycles: 0,
                actions_executed: 0,
                messages_processed: 0,
                messages_sent: 0,
                control_port: PortHandle::default(),
                message_port: PortHandle::default(),
            }),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task(&self) -> TaskHandle {
        self.task
    }

    pub fn state(&self) -> AgentState {
        self.lock().state
    }

    /// Record the external control and message ports.
    pub fn bind_ports(&self, control: PortHandle, message: PortHandle) {
        let mut inner = self.lock();
        inner.control_port = control;
        inner.message_port = message;
    }

    /// `(control, message)` ports.
    pub fn ports(&self) -> (PortHandle, PortHandle) {
        let inner = self.lock();
        (inner.control_port, inner.message_port)
    }

    // -----------------------------------------------------------------------
    // Reference sets
    // -----------------------------------------------------------------------

    /// Append `goal` to the goal set. Duplicates are kept.
    pub fn add_goal(&self, goal: &AtomHandle) {
        self.lock().goals.push(goal.clone());
    }

    /// Append `belief` to the belief set. Duplicates are kept.
    pub fn add_belief(&self, belief: &AtomHandle) {
        self.lock().beliefs.push(belief.clone());
    }

    pub fn goals(&self) -> Vec<AtomHandle> {
        self.lock().goals.clone()
    }

    pub fn beliefs(&self) -> Vec<AtomHandle> {
        self.lock().beliefs.clone()
    }

    pub fn knowledge(&self) -> Vec<AtomHandle> {
        self.lock().knowledge.clone()
    }

    // -----------------------------------------------------------------------
    // Acting and learning
    // -----------------------------------------------------------------------

    /// Execute the current plan, or perform one trivial action when there is
    /// none.
    pub fn act(&self) -> AgencyResult<()> {
        let mut inner = self.lock();
        if inner.current_plan.is_some() {
            return self.execute_locked(&mut inner);
        }
        inner.state = AgentState::Acting;
        inner.actions_executed += 1;
        inner.state = AgentState::Idle;
        tracing::debug!(agent = %self.name, "default action executed");
        Ok(())
    }

    /// Reinforce `experience` by `step` and append it to knowledge.
    ///
    /// `step` must lie in [0.0, 1.0]; otherwise nothing changes.
    pub fn learn(&self, experience: &AtomHandle, step: f32) -> AgencyResult<TruthValue> {
        if !(0.0..=1.0).contains(&step) {
            return Err(AgentError::LearningStepOutOfRange { step }.into());
        }
        let mut inner = self.lock();
        inner.state = AgentState::Learning;
        let truth = experience.reinforce(step);
        inner.knowledge.push(experience.clone());
        inner.state = AgentState::Idle;
        tracing::debug!(
            agent = %self.name,
            atom = experience.id().get(),
            confidence = truth.confidence,
            "experience learned"
        );
        Ok(truth)
    }

    // -----------------------------------------------------------------------
    // Planning
    // -----------------------------------------------------------------------

    /// Generate the fixed plan for `goal` from current beliefs and store it.
    ///
    /// The plan becomes current only if no plan is current yet.
    pub fn create_plan(&self, goal: &AtomHandle) -> AgencyResult<PlanId> {
        let mut inner = self.lock();
        let id = PlanId(inner.next_plan_id);
        let plan = Plan::generate(id, goal, &inner.beliefs)?;
        inner.next_plan_id += 1;
        tracing::debug!(
            agent = %self.name,
            plan = %id,
            actions = plan.action_count(),
            cost = plan.total_cost(),
            "plan created"
        );
        inner.plans.push(plan);
        if inner.current_plan.is_none() {
            inner.current_plan = Some(id);
        }
        Ok(id)
    }

    /// Run every pending action of the current plan.
    ///
    /// A plan whose actions are all complete is invalidated and stops being
    /// current; other stored plans are not promoted.
    pub fn execute_plan(&self) -> AgencyResult<()> {
        let mut inner = self.lock();
        self.execute_locked(&mut inner)
    }

    fn execute_locked(&self, inner: &mut AgentInner) -> AgencyResult<()> {
        let Some(id) = inner.current_plan else {
            return Err(PlanError::NoCurrentPlan { agent_id: self.id.0 }.into());
        };
        inner.state = AgentState::Acting;
        let (ran, complete) = match inner.plans.iter_mut().find(|p| p.id() == id) {
            Some(plan) => {
                let ran = plan.run_pending();
                let complete = plan.is_complete();
                if complete {
                    plan.invalidate();
                }
                (ran, complete)
            }
            // Current id always names a stored plan; treat a miss as finished.
            None => (0, true),
        };
        inner.actions_executed += ran as u64;
        if complete {
            inner.current_plan = None;
        }
        inner.state = AgentState::Idle;
        tracing::debug!(agent = %self.name, plan = %id, ran, complete, "plan executed");
        Ok(())
    }

    pub fn current_plan(&self) -> Option<Plan> {
        let inner = self.lock();
        let id = inner.current_plan?;
        inner.plans.iter().find(|p| p.id() == id).cloned()
    }

    pub fn plan(&self, id: PlanId) -> Option<Plan> {
        self.lock().plans.iter().find(|p| p.id() == id).cloned()
    }

    pub fn plans(&self) -> Vec<Plan> {
        self.lock().plans.clone()
    }

    // -----------------------------------------------------------------------
    // Messaging
    // -----------------------------------------------------------------------

    /// Pop the oldest queued message. An empty inbox yields `None`.
    pub fn receive(&self) -> Option<Message> {
        let message = self.lock().inbox.pop_front();
        if let Some(m) = &message {
            tracing::debug!(
                agent = %self.name,
                from = %m.sender(),
                atom = m.content().id().get(),
                "message received"
            );
        }
        message
    }

    pub fn pending_messages(&self) -> usize {
        self.lock().inbox.len()
    }

    pub(crate) fn enqueue(&self, sender: AgentId, content: &AtomHandle) {
        let mut inner = self.lock();
        let timestamp = inner.next_timestamp;
        inner.next_timestamp += 1;
        inner.inbox.push_back(Message::new(sender, content.clone(), timestamp));
        inner.messages_processed += 1;
    }

    pub(crate) fn note_sent(&self) {
        let mut inner = self.lock();
        inner.messages_sent += 1;
        inner.state = AgentState::Communicating;
    }

    // -----------------------------------------------------------------------
    // Reasoning phases
    // -----------------------------------------------------------------------

    /// Phase 1 of a reasoning cycle: filter beliefs against goals with the
    /// fixed usefulness heuristic. Returns the number of useful pairs.
    pub(crate) fn screen_beliefs(&self) -> usize {
        let mut inner = self.lock();
        inner.state = AgentState::Reasoning;
        let useful = inner
            .beliefs
            .iter()
            .filter(|b| {
                let t = b.truth();
                t.strength > USEFUL_STRENGTH && t.confidence > USEFUL_CONFIDENCE
            })
            .count()
            * inner.goals.len();
        inner.reasoning_cycles += 1;
        useful
    }

    /// Start a rule pass: enter `Reasoning` and snapshot the beliefs.
    pub(crate) fn begin_rule_pass(&self) -> Vec<AtomHandle> {
        let mut inner = self.lock();
        inner.state = AgentState::Reasoning;
        inner.beliefs.clone()
    }

    /// Finish a rule pass: append derived atoms and return to `Idle`.
    pub(crate) fn finish_rule_pass(&self, derived: Vec<AtomHandle>) {
        let mut inner = self.lock();
        inner.knowledge.extend(derived);
        inner.state = AgentState::Idle;
    }

    pub(crate) fn set_state(&self, state: AgentState) {
        self.lock().state = state;
    }

    // -----------------------------------------------------------------------
    // Introspection and teardown
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> AgentStats {
        let inner = self.lock();
        AgentStats {
            state: inner.state,
            reasoning_cycles: inner.reasoning_cycles,
            actions_executed: inner.actions_executed,
            messages_processed: inner.messages_processed,
            messages_sent: inner.messages_sent,
            goals: inner.goals.len(),
            beliefs: inner.beliefs.len(),
            knowledge: inner.knowledge.len(),
            plans: inner.plans.len(),
            pending_messages: inner.inbox.len(),
        }
    }

    /// Empty every owned collection. The caller drops the result after the
    /// agent lock is gone.
    pub(crate) fn release_all(&self) -> Released {
        let mut inner = self.lock();
        let mut atoms = std::mem::take(&mut inner.goals);
        atoms.append(&mut inner.beliefs);
        atoms.append(&mut inner.knowledge);
        inner.current_plan = None;
        Released {
            atoms,
            plans: std::mem::take(&mut inner.plans),
            messages: inner.inbox.drain(..).collect(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AgentInner> {
        self.inner.lock().expect("agent lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomType;
    use crate::atomspace::Atomspace;

    fn agent() -> Agent {
        Agent::new(AgentId(1), "tester", TaskHandle(42))
    }

    #[test]
    fn new_agent_is_idle_and_empty() {
        let a = agent();
        assert_eq!(a.state(), AgentState::Idle);
        assert_eq!(a.task(), TaskHandle(42));
        let s = a.stats();
        assert_eq!(s.reasoning_cycles + s.actions_executed, 0);
        assert_eq!(s.goals + s.beliefs + s.knowledge + s.plans, 0);
        assert!(a.current_plan().is_none());
    }

    #[test]
    fn add_goal_and_belief_take_references_without_dedup() {
        let space = Atomspace::new(4);
        let atom = space.allocate(AtomType::Belief, "b").unwrap();
        let a = agent();
        a.add_belief(&atom);
        a.add_belief(&atom);
        a.add_goal(&atom);
        assert_eq!(a.stats().beliefs, 2);
        assert_eq!(a.stats().goals, 1);
        // space + local + three entries
        assert_eq!(atom.ref_count(), 5);
    }

    #[test]
    fn act_without_plan_counts_one_action() {
        let a = agent();
        a.act().unwrap();
        a.act().unwrap();
        assert_eq!(a.stats().actions_executed, 2);
        assert_eq!(a.state(), AgentState::Idle);
    }

    #[test]
    fn execute_plan_without_current_plan_is_invalid() {
        let err = agent().execute_plan().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn first_plan_wins() {
        let space = Atomspace::new(4);
        let goal = space.allocate(AtomType::Goal, "g").unwrap();
        let belief = space.allocate(AtomType::Belief, "b").unwrap();
        belief.set_truth(0.9, 0.9).unwrap();
        let a = agent();
        a.add_belief(&belief);
        let first = a.create_plan(&goal).unwrap();
        let second = a.create_plan(&goal).unwrap();
        assert_ne!(first, second);
        assert_eq!(a.current_plan().unwrap().id(), first);
        assert_eq!(a.plans().len(), 2);

        a.execute_plan().unwrap();
        assert!(a.current_plan().is_none());
        assert!(!a.plan(first).unwrap().is_valid());
        // no promotion of the queued plan
        assert!(a.plan(second).unwrap().is_valid());
        assert!(a.execute_plan().is_err());
        assert_eq!(a.stats().actions_executed, 2);
    }

    #[test]
    fn act_delegates_to_current_plan() {
        let space = Atomspace::new(4);
        let goal = space.allocate(AtomType::Goal, "g").unwrap();
        let belief = space.allocate(AtomType::Belief, "b").unwrap();
        belief.set_truth(0.8, 0.9).unwrap();
        let a = agent();
        a.add_belief(&belief);
        a.create_plan(&goal).unwrap();
        a.act().unwrap();
        assert_eq!(a.stats().actions_executed, 2);
        assert!(a.current_plan().is_none());
    }

    #[test]
    fn learn_reinforces_and_appends() {
        let space = Atomspace::new(4);
        let exp = space.allocate(AtomType::Concept, "exp").unwrap();
        let a = agent();
        let t = a.learn(&exp, 0.05).unwrap();
        assert!((t.confidence - 0.55).abs() < 1e-6);
        assert_eq!(t.count, 1);
        a.learn(&exp, 0.05).unwrap();
        assert_eq!(a.stats().knowledge, 2);
        assert_eq!(a.state(), AgentState::Idle);
    }

    #[test]
    fn learn_rejects_step_outside_unit_range() {
        let space = Atomspace::new(4);
        let exp = space.allocate(AtomType::Concept, "exp").unwrap();
        let a = agent();
        let before = exp.truth();
        for step in [-2.0, -0.01, 1.5, f32::NAN, f32::INFINITY] {
            let err = a.learn(&exp, step).unwrap_err();
            assert!(err.is_invalid_argument());
        }
        assert_eq!(exp.truth(), before);
        assert_eq!(a.stats().knowledge, 0);
        assert_eq!(a.state(), AgentState::Idle);

        let t = a.learn(&exp, 1.0).unwrap();
        assert_eq!(t.confidence, 1.0);
        assert!(a.learn(&exp, 0.0).is_ok());
    }

    #[test]
    fn inbox_is_fifo_with_logical_timestamps() {
        let space = Atomspace::new(4);
        let m1 = space.allocate(AtomType::Concept, "m1").unwrap();
        let m2 = space.allocate(AtomType::Concept, "m2").unwrap();
        let a = agent();
        assert!(a.receive().is_none());
        a.enqueue(AgentId(9), &m1);
        a.enqueue(AgentId(9), &m2);
        assert_eq!(a.pending_messages(), 2);
        let first = a.receive().unwrap();
        assert_eq!(first.content(), &m1);
        assert_eq!(first.sender(), AgentId(9));
        assert_eq!(first.timestamp(), 0);
        assert_eq!(a.receive().unwrap().timestamp(), 1);
        assert_eq!(a.pending_messages(), 0);
        assert_eq!(a.stats().messages_processed, 2);
    }

    #[test]
    fn screen_beliefs_counts_useful_pairs() {
        let space = Atomspace::new(4);
        let goal = space.allocate(AtomType::Goal, "g").unwrap();
        let strong = space.allocate(AtomType::Belief, "s").unwrap();
        let weak = space.allocate(AtomType::Belief, "w").unwrap();
        strong.set_truth(0.9, 0.7).unwrap();
        weak.set_truth(0.9, 0.6).unwrap();
        let a = agent();
        a.add_goal(&goal);
        a.add_belief(&strong);
        a.add_belief(&weak);
        assert_eq!(a.screen_beliefs(), 1);
        assert_eq!(a.state(), AgentState::Reasoning);
        assert_eq!(a.stats().reasoning_cycles, 1);
    }

    #[test]
    fn release_all_returns_every_owned_reference() {
        let space = Atomspace::new(4);
        let atom = space.allocate(AtomType::Goal, "g").unwrap();
        atom.set_truth(0.9, 0.9).unwrap();
        let a = agent();
        a.add_goal(&atom);
        a.add_belief(&atom);
        a.create_plan(&atom).unwrap();
        a.enqueue(AgentId(2), &atom);
        let released = a.release_all();
        assert_eq!(released.atoms.len(), 2);
        assert_eq!(released.plans.len(), 1);
        assert_eq!(released.messages.len(), 1);
        drop(released);
        assert_eq!(atom.ref_count(), 2);
        assert_eq!(a.stats().plans, 0);
    }

    #[test]
    fn long_agent_names_are_truncated() {
        let a = Agent::new(AgentId(1), &"x".repeat(100), TaskHandle(0));
        assert_eq!(a.name().len(), crate::atom::MAX_NAME_LEN);
    }
}
