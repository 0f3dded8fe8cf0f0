use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;
use log::debug;

use crate::core::config::SimulationParams;
use crate::core::error::SimulationError;
use crate::engine::{simulate, SimulationOutcome};
use crate::model::assignment::{clamp_level, AssignmentMap, GeneAssignment};
use crate::model::reference::ReferenceData;

/// A state change requested by a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SessionCommand {
    SetModule { gene: String, module: String },
    SetLevel { gene: String, level: f64 },
    /// Advance to the next catalog module, wrapping at the end
    CycleModule { gene: String },
    ResetAll,
    SetParams { params: SimulationParams },
}

/// One gene's current control state
#[derive(Debug, Clone, Serialize)]
pub struct GeneState {
    pub gene: String,
    pub module: String,
    pub level: f64,
}

/// Session state together with its latest simulation
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Pathway order
    pub assignments: Vec<GeneState>,
    pub params: SimulationParams,
    pub outcome: SimulationOutcome,
}

/// Interactive assignment state owned by one client
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    reference: Arc<ReferenceData>,
    assignments: AssignmentMap,
    params: SimulationParams,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// New session with every gene neutral at the default level
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        let assignments = AssignmentMap::defaults(&reference.pathway, &reference.catalog);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            reference,
            assignments,
            params: SimulationParams::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    #[cfg(test)]
    pub fn assignments(&self) -> &AssignmentMap {
        &self.assignments
    }

    #[cfg(test)]
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Simulate the current state
    pub fn simulate(&self) -> Result<SimulationOutcome, SimulationError> {
        simulate(&self.reference, &self.assignments, &self.params)
    }

    fn current(&self, gene: &str) -> Result<&GeneAssignment, SimulationError> {
        if !self.reference.pathway.contains(gene) {
            return Err(SimulationError::UnknownGene(gene.to_string()));
        }
        self.assignments.require(gene)
    }

    /// Apply a command and recompute.
    ///
    /// Everything is validated before the assignment map is touched, so a
    /// failed command leaves the session exactly as it was.
    pub fn apply(&mut self, command: SessionCommand) -> Result<SimulationOutcome, SimulationError> {
        debug!("Session {} applying {:?}", self.id, command);
        let catalog = &self.reference.catalog;

        match command {
            SessionCommand::SetModule { gene, module } => {
                let level = self.current(&gene)?.level;
                catalog.get(&module)?;
                self.assignments.insert(&gene, GeneAssignment { module, level });
            }
            SessionCommand::SetLevel { gene, level } => {
                let module = self.current(&gene)?.module.clone();
                let level = clamp_level(level)?;
                self.assignments.insert(&gene, GeneAssignment { module, level });
            }
            SessionCommand::CycleModule { gene } => {
                let current = self.current(&gene)?;
                let next = catalog.next_after(&current.module)?.name.clone();
                let level = current.level;
                self.assignments.insert(&gene, GeneAssignment { module: next, level });
            }
            SessionCommand::ResetAll => {
                self.assignments = AssignmentMap::defaults(&self.reference.pathway, catalog);
            }
            SessionCommand::SetParams { params } => {
                params.validate()?;
                self.params = params;
            }
        }

        self.updated_at = Utc::now();
        self.simulate()
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, SimulationError> {
        self.snapshot_with(self.simulate()?)
    }

    /// Snapshot around an outcome already computed for the current state,
    /// such as the one `apply` returns
    pub fn snapshot_with(&self, outcome: SimulationOutcome) -> Result<SessionSnapshot, SimulationError> {
        let assignments = self.assignments
            .ordered(&self.reference.pathway)
            .into_iter()
            .map(|(gene, assignment)| {
                let assignment = assignment.ok_or_else(|| SimulationError::InvalidAssignment(format!(
                    "no assignment for gene {}", gene
                )))?;
                Ok(GeneState {
                    gene: gene.to_string(),
                    module: assignment.module.clone(),
                    level: assignment.level,
                })
            })
            .collect::<Result<Vec<_>, SimulationError>>()?;

        Ok(SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            assignments,
            params: self.params,
            outcome,
        })
    }
}
