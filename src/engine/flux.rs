//! Flux/yield engine
//!
//! Yield starts at 1.0. Each gene's module contributes in pathway order
//! (activators add, repressors scale, binary locks add a bonus once on),
//! then the override rule list runs, then the result is clamped.

use serde::Serialize;

use crate::core::config::SimulationParams;
use crate::core::error::SimulationError;
use crate::engine::rules::{FiredRule, RuleSet};
use crate::engine::{resolve_assignments, ResolvedGene};
use crate::model::assignment::AssignmentMap;
use crate::model::catalog::{ModuleBehavior, ModuleCatalog};
use crate::model::pathway::Pathway;

/// Lowest reportable yield multiplier
pub const YIELD_FLOOR: f64 = 0.05;
/// Highest reportable yield multiplier
pub const YIELD_CEILING: f64 = 5.0;

/// Pull an overflowed running yield back to the largest finite value,
/// so a later `* 0.0` gives 0.0 instead of NaN
pub(crate) fn saturate(yield_multiplier: f64) -> f64 {
    if yield_multiplier.is_nan() {
        return YIELD_FLOOR;
    }
    yield_multiplier.clamp(-f64::MAX, f64::MAX)
}

/// Yield for one assignment state
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YieldOutcome {
    /// Clamped to [YIELD_FLOOR, YIELD_CEILING]
    pub yield_multiplier: f64,
    /// Set only when a bottleneck-marking rule fires
    pub bottleneck: Option<String>,
    /// Genes under an activator, or a binary lock that is switched on
    pub active_genes: usize,
    /// Yield after the per-gene pass, before rules and clamping
    pub pre_override_yield: f64,
    pub fired_rules: Vec<FiredRule>,
}

/// Apply each gene's module in pathway order.
/// Returns the running yield and the active gene count.
pub fn per_gene_pass(genes: &[ResolvedGene<'_>]) -> (f64, usize) {
    let mut yield_multiplier = 1.0;
    let mut active = 0;

    for gene in genes {
        match gene.module.behavior {
            ModuleBehavior::Activator { gain } => {
                yield_multiplier += gene.level * gain;
                active += 1;
            }
            ModuleBehavior::Repressor { knockdown } => {
                yield_multiplier *= 1.0 - gene.level * knockdown;
            }
            ModuleBehavior::Binary { bonus, .. } => {
                if gene.module.behavior.is_switched_on(gene.level) {
                    yield_multiplier += bonus;
                    active += 1;
                }
            }
            ModuleBehavior::Neutral => {}
        }
        yield_multiplier = saturate(yield_multiplier);
    }

    (yield_multiplier, active)
}

/// Yield for already-resolved genes
pub fn evaluate_yield(genes: &[ResolvedGene<'_>], rules: &RuleSet) -> YieldOutcome {
    let (pre_override_yield, active_genes) = per_gene_pass(genes);
    let outcome = rules.evaluate(genes, pre_override_yield);

    YieldOutcome {
        yield_multiplier: saturate(outcome.yield_multiplier).clamp(YIELD_FLOOR, YIELD_CEILING),
        bottleneck: outcome.bottleneck,
        active_genes,
        pre_override_yield,
        fired_rules: outcome.fired,
    }
}

/// Compute yield, bottleneck and active gene count for an assignment map.
///
/// `params` are validated but do not enter the yield formula; they only
/// drive the capacity diagnostics.
pub fn compute_yield(
    pathway: &Pathway,
    catalog: &ModuleCatalog,
    rules: &RuleSet,
    assignments: &AssignmentMap,
    params: &SimulationParams,
) -> Result<YieldOutcome, SimulationError> {
    params.validate()?;
    let genes = resolve_assignments(pathway, catalog, assignments)?;
    Ok(evaluate_yield(&genes, rules))
}
