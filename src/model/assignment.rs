//! Per-gene control assignments

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

use crate::core::error::SimulationError;
use crate::model::catalog::ModuleCatalog;
use crate::model::pathway::Pathway;

/// Level every gene starts from and is reset to
pub const DEFAULT_LEVEL: f64 = 0.5;

/// Clamp a level into [0, 1]. Non-finite levels cannot be clamped
/// meaningfully and are rejected.
pub fn clamp_level(level: f64) -> Result<f64, SimulationError> {
    if !level.is_finite() {
        return Err(SimulationError::InvalidAssignment(format!(
            "level must be a finite number, got {}", level
        )));
    }
    Ok(level.clamp(0.0, 1.0))
}

/// Control state of one gene
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneAssignment {
    /// Catalog module name
    pub module: String,
    /// Expression-control intensity in [0, 1]
    pub level: f64,
}

impl GeneAssignment {
    pub fn new(module: &str, level: f64) -> Result<Self, SimulationError> {
        Ok(Self {
            module: module.to_string(),
            level: clamp_level(level)?,
        })
    }
}

/// Assignment per gene, keyed by gene identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentMap {
    inner: HashMap<String, GeneAssignment>,
}

impl AssignmentMap {
    /// Every gene on the neutral module at the default level
    pub fn defaults(pathway: &Pathway, catalog: &ModuleCatalog) -> Self {
        let neutral = catalog.neutral().name.as_str();
        let inner = pathway
            .genes()
            .map(|gene| (gene.to_string(), GeneAssignment {
                module: neutral.to_string(),
                level: DEFAULT_LEVEL,
            }))
            .collect();
        Self { inner }
    }

    /// Build from module/level arrays aligned to pathway order
    pub fn from_parallel(
        pathway: &Pathway,
        catalog: &ModuleCatalog,
        modules: &[String],
        levels: &[f64],
    ) -> Result<Self, SimulationError> {
        if modules.len() != pathway.len() || levels.len() != pathway.len() {
            return Err(SimulationError::InvalidAssignment(format!(
                "expected {} modules and levels, got {} modules and {} levels",
                pathway.len(), modules.len(), levels.len()
            )));
        }

        let mut inner = HashMap::with_capacity(pathway.len());
        for ((gene, module), level) in pathway.genes().zip(modules).zip(levels) {
            catalog.get(module)?;
            inner.insert(gene.to_string(), GeneAssignment::new(module, *level)?);
        }
        Ok(Self { inner })
    }

    #[cfg(test)]
    pub fn get(&self, gene: &str) -> Option<&GeneAssignment> {
        self.inner.get(gene)
    }

    /// Assignment for a gene, or an error if the map does not cover it
    pub fn require(&self, gene: &str) -> Result<&GeneAssignment, SimulationError> {
        self.inner.get(gene).ok_or_else(|| SimulationError::InvalidAssignment(format!(
            "no assignment for gene {}", gene
        )))
    }

    /// Set a gene's assignment, returning the previous one
    pub fn insert(&mut self, gene: &str, assignment: GeneAssignment) -> Option<GeneAssignment> {
        self.inner.insert(gene.to_string(), assignment)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Assignments in pathway order
    pub fn ordered<'a>(&'a self, pathway: &'a Pathway) -> Vec<(&'a str, Option<&'a GeneAssignment>)> {
        pathway.genes().map(|gene| (gene, self.inner.get(gene))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::reference::ReferenceData;

    #[test]
    fn test_clamp_level() {
        assert_eq!(clamp_level(1.7).unwrap(), 1.0);
        assert_eq!(clamp_level(-0.2).unwrap(), 0.0);
        assert_eq!(clamp_level(0.35).unwrap(), 0.35);
        assert!(clamp_level(f64::NAN).is_err());
        assert!(clamp_level(f64::INFINITY).is_err());
    }

    #[test]
    fn test_defaults_are_neutral() {
        let data = ReferenceData::builtin().unwrap();
        let map = AssignmentMap::defaults(&data.pathway, &data.catalog);
        assert_eq!(map.len(), 5);
        for (_, assignment) in map.ordered(&data.pathway) {
            let assignment = assignment.unwrap();
            assert_eq!(assignment.module, "neutral");
            assert_eq!(assignment.level, DEFAULT_LEVEL);
        }
    }

    #[test]
    fn test_from_parallel_validates() {
        let data = ReferenceData::builtin().unwrap();
        let modules: Vec<String> = vec!["neutral".to_string(); 5];

        let map = AssignmentMap::from_parallel(&data.pathway, &data.catalog, &modules, &[0.1, 0.2, 2.0, 0.4, 0.5]).unwrap();
        assert_eq!(map.get("VioE").unwrap().level, 1.0);

        let err = AssignmentMap::from_parallel(&data.pathway, &data.catalog, &modules, &[0.5; 4]).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidAssignment(_)));

        let mut bad = modules.clone();
        bad[1] = "VPR_Activation".to_string();
        let err = AssignmentMap::from_parallel(&data.pathway, &data.catalog, &bad, &[0.5; 5]).unwrap_err();
        assert_eq!(err, SimulationError::UnknownModule("VPR_Activation".to_string()));
    }
}
