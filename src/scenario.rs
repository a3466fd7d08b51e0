//! Scheduler-optimization walk-through.
//!
//! A system monitor spots high CPU load and tells a scheduler optimizer, which
//! reasons over its beliefs, plans, acts and learns from the result. Used by
//! the `cogagency scenario` command and as an end-to-end exercise of the API.

use serde::Serialize;

use crate::agency::{Agency, AgencyStats};
use crate::agent::{AgentStats, PortHandle, TaskHandle};
use crate::atom::AtomType;
use crate::error::AgencyResult;
use crate::rules::Rule;

/// Link tag for "A affects B".
pub const AFFECTS: u32 = 1;

/// Per-agent line of a [`ScenarioReport`].
#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub stats: AgentStats,
}

/// What the walk-through produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub agency: AgencyStats,
    pub links: usize,
    /// Concepts reachable in one hop from `cpu_load`.
    pub related: Vec<String>,
    pub derived: usize,
    pub plan_actions: usize,
    pub plan_cost: f32,
    /// Confidence of the learned experience after reinforcement.
    pub learned_confidence: f32,
    pub agents: Vec<AgentReport>,
}

/// Run the walk-through against `agency`. Needs room for at least 8 atoms.
pub fn run(agency: &Agency) -> AgencyResult<ScenarioReport> {
    let space = agency.atomspace();

    // Agents
    let optimizer = agency.create_agent("scheduler optimizer", TaskHandle(1))?;
    let monitor = agency.create_agent("system monitor", TaskHandle(2))?;
    optimizer.bind_ports(PortHandle(10), PortHandle(11));
    monitor.bind_ports(PortHandle(20), PortHandle(21));

    // Knowledge graph
    let cpu_load = space.allocate(AtomType::Concept, "cpu_load")?;
    let context_switches = space.allocate(AtomType::Concept, "context_switches")?;
    let performance = space.allocate(AtomType::Concept, "performance")?;
    space.allocate(AtomType::Predicate, "affects")?;
    cpu_load.set_truth(0.85, 0.8)?;
    context_switches.set_truth(0.85, 0.8)?;
    cpu_load.create_link(&context_switches, AFFECTS, 0.85)?;
    cpu_load.create_link(&performance, AFFECTS, 0.8)?;
    context_switches.create_link(&performance, AFFECTS, 0.8)?;
    let links: usize = [&cpu_load, &context_switches, &performance]
        .iter()
        .map(|a| a.outgoing_count())
        .sum();

    // Agent cognition
    let goal = space.allocate(AtomType::Goal, "minimize_context_switches")?;
    goal.set_truth(1.0, 0.9)?;
    let high_load = space.allocate(AtomType::Belief, "cpu_load_high")?;
    high_load.set_truth(0.9, 0.7)?;
    optimizer.add_goal(&goal);
    optimizer.add_belief(&cpu_load);
    monitor.add_belief(&high_load);
    agency.add_rule(Rule::new("overload", AtomType::Concept, AtomType::Action, 0.7)?);

    // Communication
    agency.send(&monitor, &optimizer, &high_load);
    if let Some(content) = agency.receive(&optimizer) {
        optimizer.add_belief(&content);
    }

    // Reasoning
    let outcome = agency.reason(&optimizer)?;
    let mut related = Vec::new();
    cpu_load.traverse_links(|target| related.push(target.name().to_string()));

    // Planning and acting
    let plan_id = optimizer.create_plan(&goal)?;
    let (plan_actions, plan_cost) = optimizer
        .plan(plan_id)
        .map(|p| (p.action_count(), p.total_cost()))
        .unwrap_or_default();
    optimizer.act()?;
    monitor.act()?;

    // Learning
    let experience = space.allocate(AtomType::Value, "context_switch_reduction")?;
    experience.set_truth(0.65, 0.8)?;
    let learned = agency.learn(&optimizer, &experience)?;

    let agents = agency
        .agents()
        .iter()
        .map(|a| AgentReport {
            name: a.name().to_string(),
            stats: a.stats(),
        })
        .collect();

    Ok(ScenarioReport {
        agency: agency.stats(),
        links,
        related,
        derived: outcome.derived(),
        plan_actions,
        plan_cost,
        learned_confidence: learned.confidence,
        agents,
    })
}
