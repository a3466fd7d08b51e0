//! The agency: context object owning the shared atomspace, every agent and
//! every rule.
//!
//! Created with [`Agency::init`] and torn down with [`Agency::shutdown`].
//! Every operation takes `&self`, so an `Arc<Agency>` can be shared freely
//! between threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId, AgentState, TaskHandle};
use crate::atom::{AtomHandle, TruthValue};
use crate::atomspace::Atomspace;
use crate::config::AgencyConfig;
use crate::error::{AgencyResult, AgentError};
use crate::rules::{Rule, RuleOutcome, match_beliefs};

/// Snapshot of agency-wide counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyStats {
    pub agents: usize,
    pub atoms: usize,
    pub rules: usize,
    pub max_atoms: usize,
}

/// Registry of agents and rules around one shared atomspace.
pub struct Agency {
    config: AgencyConfig,
    atomspace: Atomspace,
    agents: DashMap<AgentId, Arc<Agent>>,
    rules: RwLock<Vec<Arc<Rule>>>,
    next_agent_id: AtomicU64,
}

impl Agency {
    /// Validate `config` and build an empty agency.
    pub fn init(config: AgencyConfig) -> AgencyResult<Self> {
        config.validate()?;
        tracing::info!(
            max_atoms = config.max_atoms,
            learning_step = config.learning_step,
            "initializing cognitive agency"
        );
        Ok(Self {
            atomspace: Atomspace::new(config.max_atoms),
            config,
            agents: DashMap::new(),
            rules: RwLock::new(Vec::new()),
            next_agent_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &AgencyConfig {
        &self.config
    }

    /// The shared atomspace.
    pub fn atomspace(&self) -> &Atomspace {
        &self.atomspace
    }

    // -----------------------------------------------------------------------
    // Agents
    // -----------------------------------------------------------------------

    /// Create and register an agent bound to `task`.
    pub fn create_agent(&self, name: &str, task: TaskHandle) -> AgencyResult<Arc<Agent>> {
        if name.is_empty() {
            return Err(AgentError::EmptyName.into());
        }
        let id = AgentId(self.next_agent_id.fetch_add(1, Ordering::Relaxed));
        let agent = Arc::new(Agent::new(id, name, task));
        self.agents.insert(id, Arc::clone(&agent));
        tracing::info!(agent = %agent.name(), id = id.0, task = task.0, "agent registered");
        Ok(agent)
    }

    /// Deregister an agent and release everything it owns.
    pub fn remove_agent(&self, id: AgentId) -> AgencyResult<()> {
        let (_, agent) = self
            .agents
            .remove(&id)
            .ok_or(AgentError::NotFound { id: id.0 })?;
        let released = agent.release_all();
        tracing::info!(
            agent = %agent.name(),
            id = id.0,
            atoms = released.atoms.len(),
            plans = released.plans.len(),
            messages = released.messages.len(),
            "agent removed"
        );
        drop(released);
        Ok(())
    }

    pub fn agent(&self, id: AgentId) -> Option<Arc<Agent>> {
        self.agents.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Every registered agent, ordered by id.
    pub fn agents(&self) -> Vec<Arc<Agent>> {
        let mut agents: Vec<_> = self.agents.iter().map(|e| Arc::clone(e.value())).collect();
        agents.sort_by_key(|a| a.id());
        agents
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    // -----------------------------------------------------------------------
    // Rules
    // -----------------------------------------------------------------------

    /// Register a rule. Rules are never removed.
    pub fn add_rule(&self, rule: Rule) -> Arc<Rule> {
        let rule = Arc::new(rule);
        let mut rules = self.rules.write().expect("rule registry lock poisoned");
        rules.push(Arc::clone(&rule));
        tracing::info!(
            rule = %rule.name(),
            condition = %rule.condition_type(),
            conclusion = %rule.conclusion_type(),
            threshold = rule.confidence_threshold(),
            "rule registered"
        );
        rule
    }

    /// Registered rules in registration order.
    pub fn rules(&self) -> Vec<Arc<Rule>> {
        self.rules.read().expect("rule registry lock poisoned").clone()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.read().expect("rule registry lock poisoned").len()
    }

    /// Run every rule against every belief of `agent`.
    ///
    /// Each match allocates a conclusion atom in the shared atomspace and
    /// appends it to the agent's knowledge. A full atomspace drops that
    /// derivation with a warning. The agent lock and the rule registry lock
    /// are never held together.
    pub fn apply_rules(&self, agent: &Agent) -> AgencyResult<RuleOutcome> {
        let beliefs = agent.begin_rule_pass();

        let inference = &self.config.inference;
        let mut derived = Vec::new();
        let mut failure = None;
        {
            let rules = self.rules.read().expect("rule registry lock poisoned");
            for derivation in match_beliefs(&rules, &beliefs) {
                let rule = &derivation.rule;
                let atom = match self
                    .atomspace
                    .allocate(rule.conclusion_type(), &inference.conclusion_name)
                {
                    Ok(atom) => atom,
                    Err(e) if e.is_resource_exhausted() => {
                        tracing::warn!(
                            agent = %agent.name(),
                            rule = %rule.name(),
                            capacity = self.atomspace.max_atoms(),
                            "atomspace full, derivation dropped"
                        );
                        continue;
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                };
                let (strength, confidence) = derivation.conclusion_truth(inference);
                if let Err(e) = atom.set_truth(strength, confidence) {
                    failure = Some(e);
                    break;
                }
                rule.record_application();
                tracing::debug!(
                    agent = %agent.name(),
                    rule = %rule.name(),
                    atom = atom.id().get(),
                    strength,
                    confidence,
                    "knowledge derived"
                );
                derived.push(atom);
            }
        }

        let count = derived.len();
        agent.finish_rule_pass(derived);
        match failure {
            Some(e) => Err(e),
            None => Ok(RuleOutcome::from_count(count)),
        }
    }

    /// One reasoning cycle: screen beliefs against goals, then apply rules.
    ///
    /// The two phases are not atomic with respect to each other.
    pub fn reason(&self, agent: &Agent) -> AgencyResult<RuleOutcome> {
        let useful = agent.screen_beliefs();
        tracing::debug!(agent = %agent.name(), useful, "beliefs screened");
        let outcome = self.apply_rules(agent);
        agent.set_state(AgentState::Idle);
        outcome
    }

    /// Reinforce `experience` with the configured learning step.
    pub fn learn(&self, agent: &Agent, experience: &AtomHandle) -> AgencyResult<TruthValue> {
        agent.learn(experience, self.config.learning_step)
    }

    // -----------------------------------------------------------------------
    // Messaging
    // -----------------------------------------------------------------------

    /// Queue `content` on `to` and mark `from` as communicating.
    pub fn send(&self, from: &Agent, to: &Agent, content: &AtomHandle) {
        to.enqueue(from.id(), content);
        from.note_sent();
        tracing::debug!(
            from = %from.name(),
            to = %to.name(),
            atom = content.id().get(),
            "message sent"
        );
    }

    /// Pop `agent`'s oldest message and hand its content to the caller.
    pub fn receive(&self, agent: &Agent) -> Option<AtomHandle> {
        agent.receive().map(|m| m.into_content())
    }

    pub fn pending_messages(&self, agent: &Agent) -> usize {
        agent.pending_messages()
    }

    // -----------------------------------------------------------------------
    // Introspection and teardown
    // -----------------------------------------------------------------------

    pub fn atom_count(&self) -> usize {
        self.atomspace.atom_count()
    }

    pub fn stats(&self) -> AgencyStats {
        AgencyStats {
            agents: self.agent_count(),
            atoms: self.atom_count(),
            rules: self.rule_count(),
            max_atoms: self.atomspace.max_atoms(),
        }
    }

    /// Release every agent, then destroy the atomspace.
    ///
    /// Atom handles still held elsewhere survive but come back detached.
    pub fn shutdown(self) {
        let stats = self.stats();
        let ids: Vec<AgentId> = self.agents.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, agent)) = self.agents.remove(&id) {
                drop(agent.release_all());
            }
        }
        let Agency { atomspace, .. } = self;
        atomspace.destroy();
        tracing::info!(
            agents = stats.agents,
            atoms = stats.atoms,
            rules = stats.rules,
            "cognitive agency shut down"
        );
    }
}

impl std::fmt::Debug for Agency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agency")
            .field("agents", &self.agent_count())
            .field("atoms", &self.atom_count())
            .field("rules", &self.rule_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomType;

    fn agency(max_atoms: usize) -> Agency {
        Agency::init(AgencyConfig::with_max_atoms(max_atoms)).unwrap()
    }

    #[test]
    fn init_rejects_invalid_config() {
        assert!(Agency::init(AgencyConfig::with_max_atoms(0)).is_err());
    }

    #[test]
    fn agent_registry() {
        let agency = agency(10);
        let a = agency.create_agent("a", TaskHandle(1)).unwrap();
        let b = agency.create_agent("b", TaskHandle(2)).unwrap();
        assert_eq!(agency.agent_count(), 2);
        assert!(a.id() < b.id());
        assert_eq!(agency.agent(a.id()).unwrap().name(), "a");
        assert_eq!(
            agency.agents().iter().map(|x| x.id()).collect::<Vec<_>>(),
            vec![a.id(), b.id()]
        );

        agency.remove_agent(a.id()).unwrap();
        assert_eq!(agency.agent_count(), 1);
        assert!(agency.agent(a.id()).is_none());
        assert!(agency.remove_agent(a.id()).unwrap_err().is_invalid_argument());
        assert!(agency.create_agent("", TaskHandle(3)).is_err());
    }

    #[test]
    fn remove_agent_releases_references() {
        let agency = agency(10);
        let atom = agency.atomspace().allocate(AtomType::Goal, "g").unwrap();
        let agent = agency.create_agent("a", TaskHandle(0)).unwrap();
        agent.add_goal(&atom);
        agent.add_belief(&atom);
        agent.create_plan(&atom).unwrap();
        agency.send(&agent, &agent, &atom);
        assert_eq!(atom.ref_count(), 6);
        agency.remove_agent(agent.id()).unwrap();
        assert_eq!(atom.ref_count(), 2);
    }

    #[test]
    fn apply_rules_without_match_is_not_an_error() {
        let agency = agency(10);
        let agent = agency.create_agent("a", TaskHandle(0)).unwrap();
        assert_eq!(agency.apply_rules(&agent).unwrap(), RuleOutcome::NoMatch);
        assert_eq!(agent.state(), AgentState::Idle);
    }

    #[test]
    fn apply_rules_skips_derivations_when_full() {
        let agency = agency(2);
        let belief = agency.atomspace().allocate(AtomType::Concept, "b").unwrap();
        belief.set_truth(0.9, 0.9).unwrap();
        let agent = agency.create_agent("a", TaskHandle(0)).unwrap();
        agent.add_belief(&belief);
        agent.add_belief(&belief);
        let rule = agency.add_rule(Rule::new("r", AtomType::Concept, AtomType::Action, 0.5).unwrap());

        let outcome = agency.apply_rules(&agent).unwrap();
        assert_eq!(outcome, RuleOutcome::Derived { count: 1 });
        assert_eq!(rule.times_applied(), 1);
        assert_eq!(agency.atom_count(), 2);
        assert_eq!(agent.stats().knowledge, 1);
    }

    #[test]
    fn reason_counts_cycle_and_returns_to_idle() {
        let agency = agency(10);
        let agent = agency.create_agent("a", TaskHandle(0)).unwrap();
        let outcome = agency.reason(&agent).unwrap();
        assert!(!outcome.is_success());
        assert_eq!(agent.stats().reasoning_cycles, 1);
        assert_eq!(agent.state(), AgentState::Idle);
    }

    #[test]
    fn send_marks_sender_communicating() {
        let agency = agency(10);
        let msg = agency.atomspace().allocate(AtomType::Concept, "m").unwrap();
        let x = agency.create_agent("x", TaskHandle(0)).unwrap();
        let y = agency.create_agent("y", TaskHandle(0)).unwrap();
        agency.send(&x, &y, &msg);
        assert_eq!(x.state(), AgentState::Communicating);
        assert_eq!(agency.pending_messages(&y), 1);
        assert_eq!(agency.receive(&y).unwrap(), msg);
        assert!(agency.receive(&y).is_none());
        // persists until the next state change
        assert_eq!(x.state(), AgentState::Communicating);
        x.act().unwrap();
        assert_eq!(x.state(), AgentState::Idle);
    }

    #[test]
    fn learn_uses_configured_step() {
        let cfg = AgencyConfig {
            learning_step: 0.25,
            ..Default::default()
        };
        let agency = Agency::init(cfg).unwrap();
        let exp = agency.atomspace().allocate(AtomType::Concept, "e").unwrap();
        let agent = agency.create_agent("a", TaskHandle(0)).unwrap();
        assert_eq!(agency.learn(&agent, &exp).unwrap().confidence, 0.75);
        assert_eq!(agency.learn(&agent, &exp).unwrap().confidence, 1.0);
        assert_eq!(agency.learn(&agent, &exp).unwrap().confidence, 1.0);
    }

    #[test]
    fn shutdown_detaches_outstanding_atoms() {
        let agency = agency(10);
        let atom = agency.atomspace().allocate(AtomType::Concept, "c").unwrap();
        let agent = agency.create_agent("a", TaskHandle(0)).unwrap();
        agent.add_belief(&atom);
        agency.add_rule(Rule::new("r", AtomType::Concept, AtomType::Action, 0.0).unwrap());
        assert_eq!(
            agency.stats(),
            AgencyStats {
                agents: 1,
                atoms: 1,
                rules: 1,
                max_atoms: 10
            }
        );
        agency.shutdown();
        assert!(atom.is_detached());
        assert_eq!(atom.ref_count(), 1);
        assert_eq!(agent.stats().beliefs, 0);
    }
}
