use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::core::config::SimulationParams;
use crate::core::metrics::MetricsSummary;
use crate::core::session::{GeneState, SessionSnapshot};
use crate::engine::grid_search::{GridSearchReport, GridSearchResult};
use crate::engine::SimulationOutcome;
use crate::model::catalog::ModuleDefinition;
use crate::model::pathway::GeneStep;

/// Wire encoding of a missing bottleneck
pub const NO_BOTTLENECK: &str = "None";

fn bottleneck_label(bottleneck: &Option<String>) -> String {
    bottleneck.clone().unwrap_or_else(|| NO_BOTTLENECK.to_string())
}

/// Simulation request; arrays are aligned to pathway order
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SimulateRequest {
    pub modules: Option<Vec<String>>,
    pub levels: Option<Vec<f64>>,
    pub supply_cap: Option<f64>,
    pub gamma_burden: Option<f64>,
    pub p_softmin: Option<f64>,
}

impl SimulateRequest {
    pub fn params(&self) -> SimulationParams {
        SimulationParams::from_options(self.supply_cap, self.gamma_burden, self.p_softmin)
    }
}

/// Grid search request
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GridSearchRequest {
    pub supply_cap: Option<f64>,
    pub gamma_burden: Option<f64>,
    pub p_softmin: Option<f64>,
    /// Candidate modules; the catalog's first activator when omitted
    pub modules: Option<Vec<String>>,
    /// Candidate levels; off/medium/full when omitted
    pub levels: Option<Vec<f64>>,
    /// Number of ranked entries to return
    pub limit: Option<usize>,
}

impl GridSearchRequest {
    pub fn params(&self) -> SimulationParams {
        SimulationParams::from_options(self.supply_cap, self.gamma_burden, self.p_softmin)
    }
}

/// Flux section of a simulation response
#[derive(Debug, Serialize, Deserialize)]
pub struct FluxResponse {
    pub bottleneck_gene: String,
    #[serde(rename = "Fcore")]
    pub core_flux: f64,
    #[serde(rename = "F")]
    pub flux: f64,
    pub limiting_step: String,
    pub capacity_score: f64,
}

/// Burden section of a simulation response
#[derive(Debug, Serialize, Deserialize)]
pub struct BurdenResponse {
    pub phi: f64,
    pub penalty: f64,
}

/// Simulation response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimulateResponse {
    #[serde(rename = "yield")]
    pub yield_multiplier: f64,
    pub pre_override_yield: f64,
    pub active_genes: usize,
    pub flux: FluxResponse,
    pub sensitivities: Vec<(String, f64)>,
    pub burden: BurdenResponse,
    pub imbalance_penalty: f64,
    pub notes: Vec<String>,
}

impl From<SimulationOutcome> for SimulateResponse {
    fn from(outcome: SimulationOutcome) -> Self {
        let capacity = outcome.capacity;
        Self {
            yield_multiplier: outcome.yield_outcome.yield_multiplier,
            pre_override_yield: outcome.yield_outcome.pre_override_yield,
            active_genes: outcome.yield_outcome.active_genes,
            flux: FluxResponse {
                bottleneck_gene: bottleneck_label(&outcome.yield_outcome.bottleneck),
                core_flux: capacity.core_flux,
                flux: capacity.flux,
                limiting_step: capacity.limiting_step,
                capacity_score: capacity.capacity_score,
            },
            sensitivities: outcome.sensitivities,
            burden: BurdenResponse {
                phi: capacity.burden_phi,
                penalty: capacity.burden_penalty,
            },
            imbalance_penalty: capacity.imbalance_penalty,
            notes: outcome.notes,
        }
    }
}

/// One ranked grid configuration
#[derive(Debug, Serialize, Deserialize)]
pub struct GridSearchEntry {
    pub config: String,
    #[serde(rename = "Yield")]
    pub yield_multiplier: f64,
    #[serde(rename = "Bottleneck")]
    pub bottleneck: String,
    pub modules: Vec<String>,
    pub levels: Vec<f64>,
}

impl From<&GridSearchResult> for GridSearchEntry {
    fn from(result: &GridSearchResult) -> Self {
        Self {
            config: result.config.clone(),
            yield_multiplier: result.yield_multiplier,
            bottleneck: bottleneck_label(&result.bottleneck),
            modules: result.modules.clone(),
            levels: result.levels.clone(),
        }
    }
}

/// Grid search response
#[derive(Debug, Serialize, Deserialize)]
pub struct GridSearchResponse {
    pub results: Vec<GridSearchEntry>,
    pub total_combinations: usize,
    /// Configurations actually evaluated
    pub evaluated: usize,
    pub sampled: bool,
}

impl GridSearchResponse {
    pub fn from_report(report: &GridSearchReport, limit: usize) -> Self {
        Self {
            results: report.results.iter().take(limit).map(GridSearchEntry::from).collect(),
            total_combinations: report.total_combinations,
            evaluated: report.results.len(),
            sampled: report.sampled,
        }
    }
}

/// Pathway description
#[derive(Debug, Serialize, Deserialize)]
pub struct PathwayResponse {
    pub genes: Vec<String>,
    pub pathway_data: Vec<GeneStep>,
    pub baseline_k: Vec<f64>,
    pub burden_w: Vec<f64>,
    pub sensitivity: Vec<f64>,
}

/// Module catalog listing
#[derive(Debug, Serialize)]
pub struct ModulesResponse {
    pub modules: Vec<ModuleDefinition>,
    pub module_names: Vec<String>,
    /// Default and reset module
    pub neutral: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub genes: usize,
    pub modules: usize,
    pub rules: usize,
    pub timestamp: DateTime<Utc>,
}

/// Service statistics
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub metrics: MetricsSummary,
    pub active_sessions: usize,
    pub cached_grids: usize,
}

/// Set a gene's module
#[derive(Debug, Deserialize, Serialize)]
pub struct SetModuleRequest {
    pub gene: String,
    pub module: String,
}

/// Set a gene's level
#[derive(Debug, Deserialize, Serialize)]
pub struct SetLevelRequest {
    pub gene: String,
    pub level: f64,
}

/// Cycle a gene to the next module
#[derive(Debug, Deserialize, Serialize)]
pub struct CycleModuleRequest {
    pub gene: String,
}

/// Replace a session's simulation parameters; omitted fields take defaults
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SetParamsRequest {
    pub supply_cap: Option<f64>,
    pub gamma_burden: Option<f64>,
    pub p_softmin: Option<f64>,
}

impl SetParamsRequest {
    pub fn params(&self) -> SimulationParams {
        SimulationParams::from_options(self.supply_cap, self.gamma_burden, self.p_softmin)
    }
}

/// Session state on the wire
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assignments: Vec<GeneState>,
    pub params: SimulationParams,
    pub result: SimulateResponse,
}

impl From<SessionSnapshot> for SessionResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            success: true,
            session_id: snapshot.id,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            assignments: snapshot.assignments,
            params: snapshot.params,
            result: snapshot.outcome.into(),
        }
    }
}

/// Generic response
#[derive(Serialize)]
pub struct GenericResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
}
