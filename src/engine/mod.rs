//! Simulation engines
//!
//! Every engine here is a pure function of reference data plus an
//! assignment map. Nothing is cached between calls.

pub mod rules;
pub mod flux;
pub mod sensitivity;
pub mod capacity;
pub mod grid_search;

use serde::Serialize;

use crate::core::config::SimulationParams;
use crate::core::error::SimulationError;
use crate::engine::capacity::{compute_capacity, CapacityReport};
use crate::engine::flux::{compute_yield, YieldOutcome};
use crate::engine::sensitivity::compute_sensitivities;
use crate::model::assignment::{clamp_level, AssignmentMap};
use crate::model::catalog::{ModuleCatalog, ModuleDefinition};
use crate::model::pathway::{GeneStep, Pathway};
use crate::model::reference::ReferenceData;

/// A pathway step with its assignment resolved against the catalog
#[derive(Debug, Clone, Copy)]
pub struct ResolvedGene<'a> {
    pub step: &'a GeneStep,
    pub module: &'a ModuleDefinition,
    pub level: f64,
}

/// Resolve every pathway gene's assignment, in pathway order
pub fn resolve_assignments<'a>(
    pathway: &'a Pathway,
    catalog: &'a ModuleCatalog,
    assignments: &AssignmentMap,
) -> Result<Vec<ResolvedGene<'a>>, SimulationError> {
    pathway
        .steps()
        .iter()
        .map(|step| {
            let assignment = assignments.require(&step.gene)?;
            Ok(ResolvedGene {
                step,
                module: catalog.get(&assignment.module)?,
                level: clamp_level(assignment.level)?,
            })
        })
        .collect()
}

/// Full result of one simulation call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimulationOutcome {
    #[serde(flatten)]
    pub yield_outcome: YieldOutcome,
    /// (gene, score) in pathway order
    pub sensitivities: Vec<(String, f64)>,
    pub capacity: CapacityReport,
    /// One line per fired override rule
    pub notes: Vec<String>,
}

/// Run the yield, sensitivity and capacity engines over one assignment state
pub fn simulate(
    reference: &ReferenceData,
    assignments: &AssignmentMap,
    params: &SimulationParams,
) -> Result<SimulationOutcome, SimulationError> {
    let yield_outcome = compute_yield(
        &reference.pathway,
        &reference.catalog,
        &reference.rules,
        assignments,
        params,
    )?;
    let genes = resolve_assignments(&reference.pathway, &reference.catalog, assignments)?;

    let sensitivities = compute_sensitivities(&genes, &reference.sensitivity);
    let capacity = compute_capacity(&genes, params);
    let notes = yield_outcome
        .fired_rules
        .iter()
        .map(|fired| match &fired.note {
            Some(note) => note.clone(),
            None => format!("{} applied to {}", fired.rule, fired.gene),
        })
        .collect();

    Ok(SimulationOutcome { yield_outcome, sensitivities, capacity, notes })
}
