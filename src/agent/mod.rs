//! Agent layer: stateful actors holding atom references, an inbox and plans.
//!
//! - **Agent** (goals, beliefs, knowledge, state machine, counters)
//! - **Messages** (FIFO inbox, content atom owned by the envelope)
//! - **Plans** (fixed two-action generation per strong belief)

pub mod agent;
pub mod message;
pub mod plan;

pub use agent::{Agent, AgentId, AgentState, AgentStats, PortHandle, TaskHandle};
pub use message::Message;
pub use plan::{Action, Plan, PlanId};
