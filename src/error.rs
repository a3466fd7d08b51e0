//! Diagnostic error types for the cognitive agency.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! so callers get an error code and a hint about what to change. Every variant
//! also folds into the coarse [`ErrorKind`] taxonomy through [`AgencyError::kind`].

use miette::Diagnostic;
use thiserror::Error;

/// Coarse classification shared by every error in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty name, value out of range, missing link, unknown agent, no plan.
    InvalidArgument,
    /// A bounded container is full.
    ResourceExhausted,
    /// Configuration could not be read, parsed or validated.
    Config,
}

/// Top-level error type for the cognitive agency.
///
/// Each variant wraps a subsystem-specific error, preserving its diagnostic
/// code and help text through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum AgencyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Atom(#[from] AtomError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Atomspace(#[from] AtomspaceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

impl AgencyError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgencyError::Atomspace(AtomspaceError::Full { .. }) => ErrorKind::ResourceExhausted,
            AgencyError::Config(_) => ErrorKind::Config,
            _ => ErrorKind::InvalidArgument,
        }
    }

    /// Shorthand for `kind() == ErrorKind::InvalidArgument`.
    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }

    /// Shorthand for `kind() == ErrorKind::ResourceExhausted`.
    pub fn is_resource_exhausted(&self) -> bool {
        self.kind() == ErrorKind::ResourceExhausted
    }
}

// ---------------------------------------------------------------------------
// Atom errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AtomError {
    #[error("truth value out of range: strength {strength}, confidence {confidence}")]
    #[diagnostic(
        code(agency::atom::truth_out_of_range),
        help("Both strength and confidence must lie in [0.0, 1.0]. The atom was left unchanged.")
    )]
    TruthOutOfRange { strength: f32, confidence: f32 },

    #[error("link strength out of range: {strength}")]
    #[diagnostic(
        code(agency::atom::link_strength),
        help("Link strength must lie in [0.0, 1.0].")
    )]
    LinkStrengthOutOfRange { strength: f32 },

    #[error("no link from atom {from} to atom {to}")]
    #[diagnostic(
        code(agency::atom::link_not_found),
        help(
            "There is no outgoing link between these atoms. \
             Check the direction: links are removed from the source side."
        )
    )]
    LinkNotFound { from: u64, to: u64 },

    #[error("atom id allocator exhausted")]
    #[diagnostic(
        code(agency::atom::ids_exhausted),
        help("The atom id space is exhausted. This requires 2^64 allocations and indicates an allocation loop.")
    )]
    IdsExhausted,
}

// ---------------------------------------------------------------------------
// Atomspace errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AtomspaceError {
    #[error("atomspace full: {capacity} atoms")]
    #[diagnostic(
        code(agency::atomspace::full),
        help(
            "The atomspace is at capacity. Release atoms that are no longer needed, \
             or raise `max_atoms` in the agency configuration."
        )
    )]
    Full { capacity: usize },

    #[error("atom name cannot be empty")]
    #[diagnostic(
        code(agency::atomspace::empty_name),
        help("Every atom needs a non-empty name so it can be looked up later.")
    )]
    EmptyName,

    #[error("atom {id} is not a member of this atomspace")]
    #[diagnostic(
        code(agency::atomspace::not_member),
        help("The atom was never allocated here or has already been released.")
    )]
    NotMember { id: u64 },
}

// ---------------------------------------------------------------------------
// Agent errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    #[error("agent name cannot be empty")]
    #[diagnostic(code(agency::agent::empty_name), help("Give the agent a non-empty name."))]
    EmptyName,

    #[error("agent not found: {id}")]
    #[diagnostic(
        code(agency::agent::not_found),
        help("The agent is not registered. It may have been removed already.")
    )]
    NotFound { id: u64 },

    #[error("learning step out of range: {step}")]
    #[diagnostic(
        code(agency::agent::learning_step),
        help("The learning step must lie in [0.0, 1.0]. The experience atom was left unchanged.")
    )]
    LearningStepOutOfRange { step: f32 },
}

// ---------------------------------------------------------------------------
// Rule errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RuleError {
    #[error("rule name cannot be empty")]
    #[diagnostic(code(agency::rule::empty_name), help("Give the rule a non-empty name."))]
    EmptyName,

    #[error("confidence threshold {threshold} for rule \"{name}\" is out of range")]
    #[diagnostic(
        code(agency::rule::threshold),
        help("The confidence threshold must lie in [0.0, 1.0].")
    )]
    ThresholdOutOfRange { name: String, threshold: f32 },
}

// ---------------------------------------------------------------------------
// Plan errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PlanError {
    #[error("action \"{name}\" has negative cost {cost}")]
    #[diagnostic(code(agency::plan::negative_cost), help("Action costs must be >= 0."))]
    NegativeCost { name: String, cost: f32 },

    #[error("action name cannot be empty")]
    #[diagnostic(code(agency::plan::empty_name), help("Give the action a non-empty name."))]
    EmptyActionName,

    #[error("agent {agent_id} has no current plan")]
    #[diagnostic(
        code(agency::plan::no_current_plan),
        help("Create a plan with `agent.create_plan(goal)` before executing one.")
    )]
    NoCurrentPlan { agent_id: u64 },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read agency config: {path}")]
    #[diagnostic(
        code(agency::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse agency config: {path}: {message}")]
    #[diagnostic(code(agency::config::parse), help("Check the TOML syntax of the config file."))]
    Parse { path: String, message: String },

    #[error("failed to write agency config: {path}")]
    #[diagnostic(
        code(agency::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize agency config: {message}")]
    #[diagnostic(
        code(agency::config::serialize),
        help("The configuration holds a value TOML cannot represent.")
    )]
    Serialize { message: String },

    #[error("invalid agency config: {message}")]
    #[diagnostic(code(agency::config::invalid), help("{message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning agency results.
pub type AgencyResult<T> = std::result::Result<T, AgencyError>;
