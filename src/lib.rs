// The error enums in `error` interpolate variant fields (`{strength}`, `{path}`)
// in thiserror messages; rustc flags those fields as never read.
#![allow(unused_assignments)]

//! # cognitive-agency
//!
//! In-process knowledge atoms, agents, forward-chaining rules and simple plans.
//!
//! ## Architecture
//!
//! - **Atoms** (`atom`): typed, named units with a probabilistic truth value and directed links
//! - **Atomspace** (`atomspace`): capacity-bounded, insertion-ordered atom collection
//! - **Agents** (`agent`): goals, beliefs, knowledge, a FIFO inbox and owned plans
//! - **Rules** (`rules`): type/threshold matching that derives new atoms from beliefs
//! - **Agency** (`agency`): context object tying one atomspace to every agent and rule
//!
//! ## Library usage
//!
//! ```no_run
//! use cognitive_agency::agency::Agency;
//! use cognitive_agency::agent::TaskHandle;
//! use cognitive_agency::atom::AtomType;
//! use cognitive_agency::config::AgencyConfig;
//! use cognitive_agency::rules::Rule;
//!
//! let agency = Agency::init(AgencyConfig::default()).unwrap();
//! let cpu_load = agency.atomspace().allocate(AtomType::Concept, "cpu_load").unwrap();
//! cpu_load.set_truth(0.9, 0.8).unwrap();
//!
//! let monitor = agency.create_agent("monitor", TaskHandle(1)).unwrap();
//! monitor.add_belief(&cpu_load);
//! agency.add_rule(Rule::new("overload", AtomType::Concept, AtomType::Action, 0.7).unwrap());
//! assert!(agency.apply_rules(&monitor).unwrap().is_success());
//! agency.shutdown();
//! ```

pub mod agency;
pub mod agent;
pub mod atom;
pub mod atomspace;
pub mod config;
pub mod error;
pub mod rules;
pub mod scenario;

pub use agency::{Agency, AgencyStats};
pub use atom::{AtomHandle, AtomId, AtomType, TruthValue};
pub use error::{AgencyError, AgencyResult, ErrorKind};
