//! Reference data loading
//!
//! The pathway table, module catalog, override rules and sensitivity
//! profile are read once at startup and shared read-only afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use csv::{ReaderBuilder, Trim};
use log::{info, debug};
use serde::Deserialize;

use crate::core::error::SimulationError;
use crate::engine::rules::RuleSet;
use crate::engine::sensitivity::SensitivityProfile;
use crate::model::catalog::{
    ModuleBehavior, ModuleCatalog, ModuleClass, ModuleDefinition, ResponseCurve,
    DEFAULT_BONUS, DEFAULT_GAIN, DEFAULT_KNOCKDOWN, DEFAULT_THRESHOLD,
};
use crate::model::pathway::{GeneStep, Pathway};

const BUNDLED_PATHWAY: &str = include_str!("../../assets/violacein_pathway.tsv");
const BUNDLED_MODULES: &str = include_str!("../../assets/epigenetic_modules.csv");
const BUNDLED_RULES: &str = include_str!("../../assets/override_rules.json");

/// Baseline sensitivity for pathway rows that leave the column blank
const DEFAULT_SENSITIVITY: f64 = 0.5;

/// Everything the engines read but never modify
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub pathway: Pathway,
    pub catalog: ModuleCatalog,
    pub rules: RuleSet,
    pub sensitivity: SensitivityProfile,
}

#[derive(Debug, Deserialize)]
struct PathwayRow {
    gene: String,
    step_order: u32,
    baseline_k: f64,
    burden_w: f64,
    #[serde(default)]
    sensitivity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ModuleRow {
    module: String,
    #[serde(rename = "type")]
    class: String,
    #[serde(default)]
    gain: Option<f64>,
    #[serde(default)]
    knockdown: Option<f64>,
    #[serde(default)]
    bonus: Option<f64>,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(rename = "EC50", default)]
    ec50: Option<f64>,
    #[serde(default)]
    h: Option<f64>,
    #[serde(default)]
    leak: Option<f64>,
    #[serde(rename = "A_max", default)]
    a_max: Option<f64>,
    #[serde(default)]
    min_fold: Option<f64>,
}

impl ModuleRow {
    fn into_definition(self) -> Result<ModuleDefinition, SimulationError> {
        let class: ModuleClass = self.class.parse()?;
        let behavior = match class {
            ModuleClass::Activator => ModuleBehavior::Activator {
                gain: self.gain.unwrap_or(DEFAULT_GAIN),
            },
            ModuleClass::Repressor => ModuleBehavior::Repressor {
                knockdown: self.knockdown.unwrap_or(DEFAULT_KNOCKDOWN),
            },
            ModuleClass::Binary => ModuleBehavior::Binary {
                bonus: self.bonus.unwrap_or(DEFAULT_BONUS),
                threshold: self.threshold.unwrap_or(DEFAULT_THRESHOLD),
            },
            ModuleClass::Neutral => ModuleBehavior::Neutral,
        };

        let defaults = ResponseCurve::default();
        let response = ResponseCurve {
            ec50: self.ec50.unwrap_or(defaults.ec50),
            hill: self.h.unwrap_or(defaults.hill),
            leak: self.leak.unwrap_or(defaults.leak),
            a_max: self.a_max.unwrap_or(defaults.a_max),
            min_fold: self.min_fold.unwrap_or(defaults.min_fold),
        };

        Ok(ModuleDefinition::new(&self.module, behavior).with_response(response))
    }
}

/// Parse a tab-separated pathway table and its sensitivity column
pub fn parse_pathway(text: &str) -> Result<(Pathway, Vec<(String, f64)>), SimulationError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut steps = Vec::new();
    let mut sensitivities = Vec::new();
    for row in rdr.deserialize::<PathwayRow>() {
        let row = row?;
        sensitivities.push((row.gene.clone(), row.sensitivity.unwrap_or(DEFAULT_SENSITIVITY)));
        steps.push(GeneStep::new(&row.gene, row.step_order, row.baseline_k, row.burden_w));
    }

    Ok((Pathway::new(steps)?, sensitivities))
}

/// Parse a comma-separated module catalog. Blank cells take class defaults.
pub fn parse_catalog(text: &str) -> Result<ModuleCatalog, SimulationError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let modules = rdr
        .deserialize::<ModuleRow>()
        .map(|row| row.map_err(SimulationError::from).and_then(ModuleRow::into_definition))
        .collect::<Result<Vec<_>, _>>()?;

    ModuleCatalog::new(modules)
}

impl ReferenceData {
    /// Assemble from raw texts
    pub fn from_texts(pathway: &str, modules: &str, rules: &str) -> Result<Self, SimulationError> {
        let (pathway, sensitivities) = parse_pathway(pathway)?;
        let catalog = parse_catalog(modules)?;
        let rules = RuleSet::from_json(rules, &pathway)?;
        let sensitivity = SensitivityProfile::new(&pathway, &sensitivities)?;

        Ok(Self { pathway, catalog, rules, sensitivity })
    }

    /// The bundled violacein pathway, catalog and rules
    #[cfg(test)]
    pub fn builtin() -> Result<Self, SimulationError> {
        Self::from_texts(BUNDLED_PATHWAY, BUNDLED_MODULES, BUNDLED_RULES)
    }
}

/// Provider of reference data
#[cfg_attr(test, mockall::automock)]
pub trait ReferenceSource {
    /// Short description for logs
    fn describe(&self) -> String;

    fn load(&self) -> Result<ReferenceData, SimulationError>;
}

/// Reference files on disk; any path left unset falls back to the bundled copy
#[derive(Debug, Clone, Default)]
pub struct ReferenceFiles {
    pub pathway: Option<PathBuf>,
    pub modules: Option<PathBuf>,
    pub rules: Option<PathBuf>,
}

fn read_or_bundled(path: Option<&Path>, bundled: &'static str) -> Result<String, SimulationError> {
    match path {
        Some(path) => {
            debug!("Reading reference file {}", path.display());
            fs::read_to_string(path).map_err(|e| SimulationError::InvalidConfiguration(format!(
                "cannot read {}: {}", path.display(), e
            )))
        }
        None => Ok(bundled.to_string()),
    }
}

impl ReferenceSource for ReferenceFiles {
    fn describe(&self) -> String {
        let show = |p: &Option<PathBuf>| {
            p.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "bundled".to_string())
        };
        format!(
            "pathway={} modules={} rules={}",
            show(&self.pathway), show(&self.modules), show(&self.rules)
        )
    }

    fn load(&self) -> Result<ReferenceData, SimulationError> {
        let pathway = read_or_bundled(self.pathway.as_deref(), BUNDLED_PATHWAY)?;
        let modules = read_or_bundled(self.modules.as_deref(), BUNDLED_MODULES)?;
        let rules = read_or_bundled(self.rules.as_deref(), BUNDLED_RULES)?;

        let data = ReferenceData::from_texts(&pathway, &modules, &rules)?;
        info!(
            "Loaded {} genes, {} modules, {} override rules",
            data.pathway.len(), data.catalog.modules().len(), data.rules.len()
        );
        Ok(data)
    }
}
