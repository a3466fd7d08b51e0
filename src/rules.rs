//! Forward-chaining rules over agent beliefs.
//!
//! A rule fires on every belief of its condition type whose confidence
//! reaches the rule's threshold, deriving one new atom of the conclusion type.
//! Matching is pure; the agency performs the allocation and bookkeeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::atom::{AtomHandle, AtomType, TruthValue, bounded_name};
use crate::config::InferenceConfig;
use crate::error::{AgencyResult, RuleError};

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Maps beliefs of one atom type, above a confidence threshold, to a derived
/// atom of another type.
#[derive(Debug)]
pub struct Rule {
    name: String,
    condition_type: AtomType,
    conclusion_type: AtomType,
    confidence_threshold: f32,
    times_applied: AtomicU64,
}

impl Rule {
    /// Create a rule. The threshold must lie in [0.0, 1.0].
    pub fn new(
        name: &str,
        condition_type: AtomType,
        conclusion_type: AtomType,
        confidence_threshold: f32,
    ) -> AgencyResult<Self> {
        if name.is_empty() {
            return Err(RuleError::EmptyName.into());
        }
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(RuleError::ThresholdOutOfRange {
                name: name.to_string(),
                threshold: confidence_threshold,
            }
            .into());
        }
        Ok(Self {
            name: bounded_name(name),
            condition_type,
            conclusion_type,
            confidence_threshold,
            times_applied: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn condition_type(&self) -> AtomType {
        self.condition_type
    }

    pub fn conclusion_type(&self) -> AtomType {
        self.conclusion_type
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// How many atoms this rule has derived so far.
    pub fn times_applied(&self) -> u64 {
        self.times_applied.load(Ordering::Relaxed)
    }

    /// Whether a belief of `atom_type` with `truth` triggers this rule.
    pub fn matches(&self, atom_type: AtomType, truth: &TruthValue) -> bool {
        atom_type == self.condition_type && truth.confidence >= self.confidence_threshold
    }

    pub(crate) fn record_application(&self) {
        self.times_applied.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// One pending derivation: `rule` fired on a belief with truth `premise`.
#[derive(Debug, Clone)]
pub struct Derivation {
    pub rule: Arc<Rule>,
    pub premise: TruthValue,
}

impl Derivation {
    /// Truth of the derived atom: the premise scaled by the inference factors.
    pub fn conclusion_truth(&self, inference: &InferenceConfig) -> (f32, f32) {
        (
            self.premise.strength * inference.strength_factor,
            self.premise.confidence * inference.confidence_factor,
        )
    }
}

/// Every `(rule, belief)` match, rules in registration order and beliefs in
/// insertion order. Duplicate conclusions across calls are not suppressed.
pub fn match_beliefs(rules: &[Arc<Rule>], beliefs: &[AtomHandle]) -> Vec<Derivation> {
    let mut matches = Vec::new();
    for rule in rules {
        for belief in beliefs {
            let premise = belief.truth();
            if rule.matches(belief.atom_type(), &premise) {
                matches.push(Derivation {
                    rule: Arc::clone(rule),
                    premise,
                });
            }
        }
    }
    matches
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of one rule application pass. `NoMatch` is a signal, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// At least one atom was derived.
    Derived { count: usize },
    /// No rule matched any belief, or every derivation was dropped.
    NoMatch,
}

impl RuleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RuleOutcome::Derived { .. })
    }

    /// Number of derived atoms (0 for `NoMatch`).
    pub fn derived(&self) -> usize {
        match self {
            RuleOutcome::Derived { count } => *count,
            RuleOutcome::NoMatch => 0,
        }
    }

    pub(crate) fn from_count(count: usize) -> Self {
        if count == 0 {
            RuleOutcome::NoMatch
        } else {
            RuleOutcome::Derived { count }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomspace::Atomspace;

    #[test]
    fn threshold_is_validated() {
        assert!(Rule::new("r", AtomType::Concept, AtomType::Action, 0.0).is_ok());
        assert!(Rule::new("r", AtomType::Concept, AtomType::Action, 1.0).is_ok());
        let err = Rule::new("r", AtomType::Concept, AtomType::Action, 1.2).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(Rule::new("r", AtomType::Concept, AtomType::Action, -0.1).is_err());
        assert!(Rule::new("", AtomType::Concept, AtomType::Action, 0.5).is_err());
    }

    #[test]
    fn matches_type_and_threshold_inclusive() {
        let rule = Rule::new("r", AtomType::Concept, AtomType::Action, 0.7).unwrap();
        let at = |c| TruthValue {
            strength: 0.5,
            confidence: c,
            count: 0,
        };
        assert!(rule.matches(AtomType::Concept, &at(0.7)));
        assert!(rule.matches(AtomType::Concept, &at(0.9)));
        assert!(!rule.matches(AtomType::Concept, &at(0.69)));
        assert!(!rule.matches(AtomType::Belief, &at(0.9)));
    }

    #[test]
    fn match_beliefs_iterates_rules_then_beliefs() {
        let space = Atomspace::new(10);
        let b1 = space.allocate(AtomType::Concept, "b1").unwrap();
        let b2 = space.allocate(AtomType::Concept, "b2").unwrap();
        let b3 = space.allocate(AtomType::Goal, "b3").unwrap();
        b1.set_truth(0.9, 0.8).unwrap();
        b2.set_truth(0.4, 0.3).unwrap();
        b3.set_truth(0.9, 0.9).unwrap();

        let concept = Arc::new(Rule::new("c", AtomType::Concept, AtomType::Action, 0.2).unwrap());
        let goal = Arc::new(Rule::new("g", AtomType::Goal, AtomType::Schema, 0.5).unwrap());
        let found = match_beliefs(&[goal, concept], &[b1, b2, b3]);

        let order: Vec<_> = found.iter().map(|d| (d.rule.name(), d.premise.strength)).collect();
        assert_eq!(order, vec![("g", 0.9), ("c", 0.9), ("c", 0.4)]);
    }

    #[test]
    fn conclusion_truth_scales_premise() {
        let rule = Arc::new(Rule::new("r", AtomType::Concept, AtomType::Action, 0.7).unwrap());
        let d = Derivation {
            rule,
            premise: TruthValue {
                strength: 0.9,
                confidence: 0.8,
                count: 1,
            },
        };
        let (s, c) = d.conclusion_truth(&InferenceConfig::default());
        assert!((s - 0.72).abs() < 1e-6);
        assert!((c - 0.72).abs() < 1e-6);
    }

    #[test]
    fn outcome_signals() {
        assert_eq!(RuleOutcome::from_count(0), RuleOutcome::NoMatch);
        assert!(!RuleOutcome::NoMatch.is_success());
        let o = RuleOutcome::from_count(2);
        assert!(o.is_success());
        assert_eq!(o.derived(), 2);
    }

    #[test]
    fn times_applied_counts() {
        let rule = Rule::new("r", AtomType::Concept, AtomType::Action, 0.7).unwrap();
        assert_eq!(rule.times_applied(), 0);
        rule.record_application();
        rule.record_application();
        assert_eq!(rule.times_applied(), 2);
    }
}
