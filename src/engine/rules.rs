//! Override rules evaluated after the per-gene pass
//!
//! A rule watches one gene. When that gene's module class and level meet
//! the rule's condition, the rule's effect is applied to the running yield.
//! Rules run in declared order, so an absolute override declared first is
//! still scaled by multiplicative rules declared after it.

use std::collections::HashSet;
use serde::{Serialize, Deserialize};

use crate::core::error::SimulationError;
use crate::engine::flux::saturate;
use crate::engine::ResolvedGene;
use crate::model::catalog::ModuleClass;
use crate::model::pathway::Pathway;

/// Which gene a rule watches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    /// By gene identifier
    Gene(String),
    /// By 1-based step order
    Step(u32),
}

/// Constraint on the watched gene's level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LevelBound {
    /// Strictly greater than
    Above(f64),
    /// Greater than or equal to
    AtLeast(f64),
    /// Strictly less than
    Below(f64),
    Any,
}

impl LevelBound {
    pub fn admits(&self, level: f64) -> bool {
        match *self {
            LevelBound::Above(bound) => level > bound,
            LevelBound::AtLeast(bound) => level >= bound,
            LevelBound::Below(bound) => level < bound,
            LevelBound::Any => true,
        }
    }
}

impl Default for LevelBound {
    fn default() -> Self {
        LevelBound::Any
    }
}

/// Predicate over the watched gene's assignment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleCondition {
    pub class: ModuleClass,
    #[serde(default)]
    pub level: LevelBound,
}

/// What a firing rule does to the yield
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuleEffect {
    /// Replace the yield outright
    Override(f64),
    Multiply(f64),
    Add(f64),
}

impl RuleEffect {
    pub fn apply(&self, yield_multiplier: f64) -> f64 {
        match *self {
            RuleEffect::Override(value) => value,
            RuleEffect::Multiply(factor) => yield_multiplier * factor,
            RuleEffect::Add(delta) => yield_multiplier + delta,
        }
    }

    fn magnitude(&self) -> f64 {
        match *self {
            RuleEffect::Override(v) | RuleEffect::Multiply(v) | RuleEffect::Add(v) => v,
        }
    }
}

/// Declarative override rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverrideRule {
    pub name: String,
    pub target: RuleTarget,
    pub condition: RuleCondition,
    pub effect: RuleEffect,
    /// Name the watched gene as the bottleneck when the rule fires
    #[serde(default)]
    pub marks_bottleneck: bool,
    /// Human-readable explanation reported when the rule fires
    #[serde(default)]
    pub note: Option<String>,
}

/// A rule that fired during evaluation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FiredRule {
    pub rule: String,
    pub gene: String,
    pub note: Option<String>,
}

/// Result of running the rule list
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub yield_multiplier: f64,
    pub bottleneck: Option<String>,
    pub fired: Vec<FiredRule>,
}

#[derive(Debug, Clone)]
struct BoundRule {
    rule: OverrideRule,
    position: usize,
}

/// Ordered rule list bound to a pathway
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<BoundRule>,
}

impl RuleSet {
    /// Bind rules to pathway positions, rejecting unknown targets
    pub fn new(rules: Vec<OverrideRule>, pathway: &Pathway) -> Result<Self, SimulationError> {
        let mut names = HashSet::new();
        let mut bound = Vec::with_capacity(rules.len());

        for rule in rules {
            if !names.insert(rule.name.clone()) {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "duplicate rule name: {}", rule.name
                )));
            }
            if !rule.effect.magnitude().is_finite() {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "rule {} has a non-finite effect", rule.name
                )));
            }

            let position = match &rule.target {
                RuleTarget::Gene(gene) => pathway.position(gene),
                RuleTarget::Step(step) => pathway.step_at(*step).and_then(|s| pathway.position(&s.gene)),
            }
            .ok_or_else(|| SimulationError::InvalidConfiguration(format!(
                "rule {} targets {:?}, which is not in the pathway", rule.name, rule.target
            )))?;

            bound.push(BoundRule { rule, position });
        }

        Ok(Self { rules: bound })
    }

    /// Parse a JSON rule list and bind it
    pub fn from_json(text: &str, pathway: &Pathway) -> Result<Self, SimulationError> {
        let rules: Vec<OverrideRule> = serde_json::from_str(text)?;
        Self::new(rules, pathway)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[cfg(test)]
    pub fn rules(&self) -> impl Iterator<Item = &OverrideRule> {
        self.rules.iter().map(|b| &b.rule)
    }

    /// Apply every matching rule in declared order.
    ///
    /// `genes` must be the resolved pathway in chain order. The first
    /// bottleneck-marking rule to fire names the bottleneck.
    pub fn evaluate(&self, genes: &[ResolvedGene<'_>], yield_multiplier: f64) -> RuleOutcome {
        let mut outcome = RuleOutcome {
            yield_multiplier,
            bottleneck: None,
            fired: Vec::new(),
        };

        for bound in &self.rules {
            let Some(watched) = genes.get(bound.position) else {
                continue;
            };
            let condition = &bound.rule.condition;
            if watched.module.class() != condition.class || !condition.level.admits(watched.level) {
                continue;
            }

            outcome.yield_multiplier = saturate(bound.rule.effect.apply(outcome.yield_multiplier));
            if bound.rule.marks_bottleneck && outcome.bottleneck.is_none() {
                outcome.bottleneck = Some(watched.step.gene.clone());
            }
            outcome.fired.push(FiredRule {
                rule: bound.rule.name.clone(),
                gene: watched.step.gene.clone(),
                note: bound.rule.note.clone(),
            });
        }

        outcome
    }
}
