//! Linear pathway topology
//!
//! A pathway is an ordered chain of gene steps. Order is fixed by
//! `step_order`, which must run 1..=n without gaps.

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

use crate::core::error::SimulationError;

/// One step of the pathway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneStep {
    /// Gene identifier, unique within the pathway
    pub gene: String,
    /// Position in the chain, starting at 1
    pub step_order: u32,
    /// Baseline catalytic/expression rate
    pub baseline_k: f64,
    /// Weight of this gene's expression toward metabolic burden
    pub burden_w: f64,
}

impl GeneStep {
    pub fn new(gene: &str, step_order: u32, baseline_k: f64, burden_w: f64) -> Self {
        Self {
            gene: gene.to_string(),
            step_order,
            baseline_k,
            burden_w,
        }
    }
}

/// Validated, ordered pathway
#[derive(Debug, Clone)]
pub struct Pathway {
    steps: Vec<GeneStep>,
    index: HashMap<String, usize>,
}

impl Pathway {
    /// Build a pathway from unordered steps, validating the topology
    pub fn new(mut steps: Vec<GeneStep>) -> Result<Self, SimulationError> {
        if steps.is_empty() {
            return Err(SimulationError::InvalidConfiguration(
                "pathway has no steps".to_string()
            ));
        }

        steps.sort_by_key(|s| s.step_order);

        let mut index = HashMap::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            if step.gene.trim().is_empty() {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "step {} has an empty gene identifier", step.step_order
                )));
            }
            if step.step_order as usize != i + 1 {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "step orders must run 1..={} without gaps, found {} at position {}",
                    steps.len(), step.step_order, i + 1
                )));
            }
            if !step.baseline_k.is_finite() || step.baseline_k <= 0.0 {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "gene {} has non-positive baseline_k {}", step.gene, step.baseline_k
                )));
            }
            if !step.burden_w.is_finite() || step.burden_w < 0.0 {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "gene {} has negative burden_w {}", step.gene, step.burden_w
                )));
            }
            if index.insert(step.gene.clone(), i).is_some() {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "duplicate gene identifier: {}", step.gene
                )));
            }
        }

        Ok(Self { steps, index })
    }

    /// Steps in chain order
    pub fn steps(&self) -> &[GeneStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Gene identifiers in chain order
    pub fn genes(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.gene.as_str())
    }

    /// Index of a gene in chain order
    pub fn position(&self, gene: &str) -> Option<usize> {
        self.index.get(gene).copied()
    }

    pub fn contains(&self, gene: &str) -> bool {
        self.index.contains_key(gene)
    }

    /// Look up the step at a given 1-based order
    pub fn step_at(&self, step_order: u32) -> Option<&GeneStep> {
        if step_order == 0 {
            return None;
        }
        self.steps.get(step_order as usize - 1)
    }
}
