//! Per-gene sensitivity scores
//!
//! Scores start from a fixed baseline profile and are scaled by the
//! gene's current module class and level, then clamped to [0, 1].

use serde::Serialize;

use crate::core::error::SimulationError;
use crate::engine::ResolvedGene;
use crate::model::catalog::ModuleBehavior;
use crate::model::pathway::Pathway;

/// Baseline sensitivity of each gene, aligned to pathway order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityProfile {
    scores: Vec<f64>,
}

impl SensitivityProfile {
    /// Align `(gene, score)` pairs to the pathway. Every gene needs a score.
    pub fn new(pathway: &Pathway, pairs: &[(String, f64)]) -> Result<Self, SimulationError> {
        let mut scores = vec![None; pathway.len()];
        for (gene, score) in pairs {
            let position = pathway
                .position(gene)
                .ok_or_else(|| SimulationError::UnknownGene(gene.clone()))?;
            if !(0.0..=1.0).contains(score) {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "baseline sensitivity for {} must lie in [0, 1], got {}", gene, score
                )));
            }
            scores[position] = Some(*score);
        }

        let scores = scores
            .into_iter()
            .zip(pathway.genes())
            .map(|(score, gene)| score.ok_or_else(|| SimulationError::InvalidConfiguration(format!(
                "no baseline sensitivity for gene {}", gene
            ))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { scores })
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }
}

/// Scale factor a module applies to its gene's baseline sensitivity
fn sensitivity_factor(behavior: &ModuleBehavior, level: f64) -> f64 {
    match behavior {
        ModuleBehavior::Activator { .. } => 1.0 + level * 0.5,
        ModuleBehavior::Repressor { .. } => 1.0 - level * 0.4,
        ModuleBehavior::Binary { .. } => {
            if behavior.is_switched_on(level) { 1.3 } else { 0.7 }
        }
        ModuleBehavior::Neutral => 1.0,
    }
}

/// Sensitivity of every gene in pathway order
pub fn compute_sensitivities(
    genes: &[ResolvedGene<'_>],
    profile: &SensitivityProfile,
) -> Vec<(String, f64)> {
    genes
        .iter()
        .zip(profile.scores())
        .map(|(resolved, baseline)| {
            let score = baseline * sensitivity_factor(&resolved.module.behavior, resolved.level);
            (resolved.step.gene.clone(), score.clamp(0.0, 1.0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::resolve_assignments;
    use crate::model::assignment::{AssignmentMap, GeneAssignment};
    use crate::model::reference::ReferenceData;

    fn sensitivities_for(edits: &[(&str, &str, f64)]) -> Vec<(String, f64)> {
        let data = ReferenceData::builtin().unwrap();
        let mut assignments = AssignmentMap::defaults(&data.pathway, &data.catalog);
        for (gene, module, level) in edits {
            assignments.insert(gene, GeneAssignment::new(module, *level).unwrap());
        }
        let genes = resolve_assignments(&data.pathway, &data.catalog, &assignments).unwrap();
        compute_sensitivities(&genes, &data.sensitivity)
    }

    #[test]
    fn test_neutral_returns_baseline() {
        let scores = sensitivities_for(&[]);
        let expected = [("VioA", 0.75), ("VioB", 0.45), ("VioE", 0.90), ("VioD", 0.60), ("VioC", 0.30)];
        for ((gene, score), (want_gene, want)) in scores.iter().zip(expected) {
            assert_eq!(gene, want_gene);
            assert!((score - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_class_scaling() {
        let scores = sensitivities_for(&[
            ("VioA", "CRISPRa_Ec", 0.4),
            ("VioB", "CRISPRi_dCas9", 1.0),
            ("VioD", "Methylation", 0.2),
            ("VioC", "Methylation", 0.8),
        ]);
        assert!((scores[0].1 - 0.75 * 1.2).abs() < 1e-12);
        assert!((scores[1].1 - 0.45 * 0.6).abs() < 1e-12);
        assert!((scores[3].1 - 0.60 * 0.7).abs() < 1e-12);
        assert!((scores[4].1 - 0.30 * 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_scores_clamped_to_unit_interval() {
        // 0.90 * 1.5 would exceed 1.0
        let scores = sensitivities_for(&[("VioE", "CRISPRa_Ec", 1.0)]);
        assert_eq!(scores[2].1, 1.0);

        for level in [0.0, 0.25, 0.5, 0.75, 1.0] {
            for module in ["CRISPRa_Ec", "CRISPRi_dCas9", "Methylation", "neutral"] {
                let scores = sensitivities_for(&[
                    ("VioA", module, level),
                    ("VioE", module, level),
                ]);
                assert!(scores.iter().all(|(_, s)| (0.0..=1.0).contains(s)));
            }
        }
    }

    #[test]
    fn test_profile_requires_every_gene() {
        let data = ReferenceData::builtin().unwrap();
        let pairs = vec![("VioA".to_string(), 0.5)];
        assert!(SensitivityProfile::new(&data.pathway, &pairs).is_err());

        let pairs = vec![("VioQ".to_string(), 0.5)];
        assert_eq!(
            SensitivityProfile::new(&data.pathway, &pairs).unwrap_err(),
            SimulationError::UnknownGene("VioQ".to_string())
        );
    }
}
