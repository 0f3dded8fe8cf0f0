//! Soft-min flux capacity diagnostics
//!
//! Estimates how much flux the chain can carry from Hill-type response
//! curves, a soft minimum over step activities, the upstream supply cap and
//! imbalance/burden penalties. The report sits next to the heuristic yield
//! and never feeds into it.

use serde::Serialize;

use crate::engine::ResolvedGene;
use crate::model::catalog::{ModuleBehavior, ResponseCurve};
use crate::core::config::SimulationParams;

/// Activity floor so the soft minimum stays finite
const MIN_ACTIVITY: f64 = 1e-9;
/// Activity/flux ratio above which a step counts as over-expressed
const IMBALANCE_TOLERANCE: f64 = 2.0;
const IMBALANCE_ALPHA: f64 = 0.15;

/// Capacity report for one assignment state
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CapacityReport {
    /// Effective activity per gene, pathway order
    pub activities: Vec<(String, f64)>,
    /// Soft-min core flux before the supply cap
    pub core_flux: f64,
    /// Core flux limited by the supply cap
    pub flux: f64,
    /// Gene with the lowest activity
    pub limiting_step: String,
    pub imbalance_penalty: f64,
    /// Burden load, sum of burden weight times activity
    pub burden_phi: f64,
    pub burden_penalty: f64,
    /// flux * imbalance_penalty * burden_penalty
    pub capacity_score: f64,
}

fn hill(level: f64, curve: &ResponseCurve) -> f64 {
    let x = level.clamp(0.0, 1.0).powf(curve.hill);
    x / (x + curve.ec50.powf(curve.hill))
}

/// Fold change of expression produced by a module at a level
pub fn fold_change(behavior: &ModuleBehavior, curve: &ResponseCurve, level: f64) -> f64 {
    match behavior {
        ModuleBehavior::Activator { .. } => 1.0 + (curve.a_max - 1.0) * hill(level, curve),
        ModuleBehavior::Repressor { .. } => {
            curve.min_fold
                + (1.0 - curve.min_fold) / (1.0 + (level / curve.ec50).powf(curve.hill))
                + curve.leak
        }
        ModuleBehavior::Binary { .. } => {
            let on = if behavior.is_switched_on(level) { 1.0 } else { 0.0 };
            on + curve.leak
        }
        ModuleBehavior::Neutral => 1.0,
    }
}

/// Smooth approximation of the minimum; larger `p` is closer to the hard min
pub fn softmin(values: &[f64], p: f64) -> f64 {
    let sum: f64 = values
        .iter()
        .map(|v| v.max(MIN_ACTIVITY).powf(-p))
        .sum();
    sum.powf(-1.0 / p)
}

/// Build the capacity report for resolved genes
pub fn compute_capacity(genes: &[ResolvedGene<'_>], params: &SimulationParams) -> CapacityReport {
    let activities: Vec<f64> = genes
        .iter()
        .map(|g| g.step.baseline_k * fold_change(&g.module.behavior, &g.module.response, g.level))
        .collect();

    let core_flux = softmin(&activities, params.p_softmin);
    let flux = core_flux.min(params.supply_cap);

    let excess: f64 = activities
        .iter()
        .map(|a| (a / (core_flux + MIN_ACTIVITY) - IMBALANCE_TOLERANCE).max(0.0))
        .sum();
    let imbalance_penalty = (-IMBALANCE_ALPHA * excess).exp();

    let burden_phi: f64 = genes
        .iter()
        .zip(&activities)
        .map(|(g, a)| g.step.burden_w * a)
        .sum();
    let overload = burden_phi - genes.len() as f64;
    let burden_penalty = 1.0 / (1.0 + params.gamma_burden * overload * overload);

    let limiting = activities
        .iter()
        .enumerate()
        .fold(0, |best, (i, a)| if *a < activities[best] { i } else { best });

    CapacityReport {
        activities: genes
            .iter()
            .zip(&activities)
            .map(|(g, a)| (g.step.gene.clone(), *a))
            .collect(),
        core_flux,
        flux,
        limiting_step: genes[limiting].step.gene.clone(),
        imbalance_penalty,
        burden_phi,
        burden_penalty,
        capacity_score: flux * imbalance_penalty * burden_penalty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::resolve_assignments;
    use crate::model::assignment::{AssignmentMap, GeneAssignment};
    use crate::model::reference::ReferenceData;

    fn report_for(edits: &[(&str, &str, f64)]) -> CapacityReport {
        report_with(edits, &SimulationParams::default())
    }

    fn report_with(edits: &[(&str, &str, f64)], params: &SimulationParams) -> CapacityReport {
        let data = ReferenceData::builtin().unwrap();
        let mut assignments = AssignmentMap::defaults(&data.pathway, &data.catalog);
        for (gene, module, level) in edits {
            assignments.insert(gene, GeneAssignment::new(module, *level).unwrap());
        }
        let genes = resolve_assignments(&data.pathway, &data.catalog, &assignments).unwrap();
        compute_capacity(&genes, params)
    }

    #[test]
    fn test_all_neutral_reference() {
        let report = report_for(&[]);
        let expected_core = 5f64.powf(-1.0 / 6.0);
        assert!((report.core_flux - expected_core).abs() < 1e-12);
        assert_eq!(report.flux, report.core_flux);
        assert_eq!(report.imbalance_penalty, 1.0);
        assert!((report.burden_phi - 5.2).abs() < 1e-12);
        assert!((report.burden_penalty - 1.0 / (1.0 + 0.05 * 0.04)).abs() < 1e-12);
        assert_eq!(report.limiting_step, "VioA");
    }

    #[test]
    fn test_fold_changes() {
        let curve = ResponseCurve::default();
        let activator = ModuleBehavior::Activator { gain: 1.0 };
        // Half-maximal at EC50
        assert!((fold_change(&activator, &curve, 0.5) - 2.0).abs() < 1e-12);
        assert_eq!(fold_change(&activator, &curve, 0.0), 1.0);

        let repressor = ModuleBehavior::Repressor { knockdown: 0.8 };
        assert!((fold_change(&repressor, &curve, 0.5) - 0.6).abs() < 1e-12);
        assert!((fold_change(&repressor, &curve, 0.0) - 1.0).abs() < 1e-12);

        let binary = ModuleBehavior::Binary { bonus: 0.3, threshold: 0.5 };
        assert_eq!(fold_change(&binary, &curve, 0.4), 0.0);
        assert_eq!(fold_change(&binary, &curve, 0.6), 1.0);
    }

    #[test]
    fn test_softmin_tracks_minimum() {
        let values = [1.0, 4.0, 4.0];
        let soft = softmin(&values, 8.0);
        assert!(soft < 1.0 && soft > 0.9);
        assert!(softmin(&[0.0, 1.0], 6.0) < 1e-8);
    }

    #[test]
    fn test_repressed_gene_limits_flux() {
        let report = report_for(&[("VioD", "CRISPRi_dCas9", 1.0)]);
        assert_eq!(report.limiting_step, "VioD");

        let params = SimulationParams { supply_cap: 1.5, ..SimulationParams::default() };
        let boosted = report_with(&[
            ("VioA", "CRISPRa_Ec", 1.0),
            ("VioB", "CRISPRa_Ec", 1.0),
            ("VioE", "CRISPRa_Ec", 1.0),
            ("VioD", "CRISPRa_Ec", 1.0),
            ("VioC", "CRISPRa_Ec", 1.0),
        ], &params);
        assert!(boosted.core_flux > 1.9);
        assert_eq!(boosted.flux, 1.5);
        assert!(boosted.burden_penalty < 1.0);
    }
}
