//! Grid search optimizer
//!
//! Enumerates every per-gene (module, level) choice of a discrete space,
//! evaluates each configuration with the yield engine and ranks them.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use log::{debug, info};

use crate::core::config::SimulationParams;
use crate::core::error::SimulationError;
use crate::engine::flux::evaluate_yield;
use crate::engine::rules::RuleSet;
use crate::engine::ResolvedGene;
use crate::model::assignment::{clamp_level, DEFAULT_LEVEL};
use crate::model::catalog::{ModuleCatalog, ModuleClass, ModuleDefinition};
use crate::model::pathway::Pathway;

/// Off / medium / full
pub const REFERENCE_LEVELS: [f64; 3] = [0.05, 0.5, 1.0];

/// Seed for subset sampling of oversized grids
const SAMPLE_SEED: u64 = 0x5EED_0F1A;

/// Candidate modules and levels tried for every gene
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSpace {
    pub modules: Vec<String>,
    pub levels: Vec<f64>,
}

impl GridSpace {
    /// Validate candidates against the catalog. Levels are clamped.
    pub fn new(catalog: &ModuleCatalog, modules: Vec<String>, levels: Vec<f64>) -> Result<Self, SimulationError> {
        if modules.is_empty() {
            return Err(SimulationError::InvalidConfiguration(
                "grid space needs at least one module".to_string()
            ));
        }
        let mut needs_levels = false;
        for name in &modules {
            needs_levels |= catalog.get(name)?.class() != ModuleClass::Neutral;
        }
        if needs_levels && levels.is_empty() {
            return Err(SimulationError::InvalidConfiguration(
                "grid space needs at least one level".to_string()
            ));
        }
        let levels = levels
            .into_iter()
            .map(clamp_level)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { modules, levels })
    }

    /// The catalog's first activator at off / medium / full
    pub fn reference(catalog: &ModuleCatalog) -> Result<Self, SimulationError> {
        let activator = catalog
            .first_of_class(ModuleClass::Activator)
            .ok_or_else(|| SimulationError::InvalidConfiguration(
                "catalog has no activator for the reference grid".to_string()
            ))?;
        Ok(Self {
            modules: vec![activator.name.clone()],
            levels: REFERENCE_LEVELS.to_vec(),
        })
    }

    /// Per-gene choices. A neutral module counts once since its level is inert.
    fn choices<'a>(&self, catalog: &'a ModuleCatalog) -> Result<Vec<(&'a ModuleDefinition, f64)>, SimulationError> {
        let mut choices = Vec::new();
        for name in &self.modules {
            let module = catalog.get(name)?;
            if module.class() == ModuleClass::Neutral {
                choices.push((module, DEFAULT_LEVEL));
            } else {
                choices.extend(self.levels.iter().map(|&level| (module, level)));
            }
        }
        Ok(choices)
    }
}

/// One evaluated configuration
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GridSearchResult {
    pub config: String,
    pub yield_multiplier: f64,
    pub bottleneck: Option<String>,
    /// Module per gene, pathway order
    pub modules: Vec<String>,
    /// Level per gene, pathway order
    pub levels: Vec<f64>,
}

/// Ranked grid search output
#[derive(Debug, Clone, Serialize)]
pub struct GridSearchReport {
    /// Sorted by yield, highest first
    pub results: Vec<GridSearchResult>,
    /// Size of the full configuration space
    pub total_combinations: usize,
    /// Whether only a sampled subset was evaluated
    pub sampled: bool,
}

/// Split a configuration index into per-gene choice indices,
/// first gene most significant
fn decode(mut index: usize, genes: usize, radix: usize) -> Vec<usize> {
    let mut digits = vec![0; genes];
    for digit in digits.iter_mut().rev() {
        *digit = index % radix;
        index /= radix;
    }
    digits
}

fn label(pathway: &Pathway, picked: &[(&ModuleDefinition, f64)], single_module: bool) -> String {
    pathway
        .genes()
        .zip(picked)
        .map(|(gene, (module, level))| {
            if single_module {
                format!("{}:{:.2}", gene, level)
            } else {
                format!("{}:{}@{:.2}", gene, module.name, level)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Evaluate and rank a grid.
///
/// Grids larger than `max_configurations` are reduced to exactly that many
/// distinct configurations drawn with a fixed seed.
pub fn grid_search(
    pathway: &Pathway,
    catalog: &ModuleCatalog,
    rules: &RuleSet,
    space: &GridSpace,
    params: &SimulationParams,
    max_configurations: usize,
) -> Result<GridSearchReport, SimulationError> {
    params.validate()?;
    if max_configurations == 0 {
        return Err(SimulationError::InvalidConfiguration(
            "max_configurations must be positive".to_string()
        ));
    }

    let choices = space.choices(catalog)?;
    let genes = pathway.len();
    let total_combinations = u32::try_from(genes)
        .ok()
        .and_then(|n| choices.len().checked_pow(n))
        .ok_or_else(|| SimulationError::InvalidConfiguration(format!(
            "grid of {} choices over {} genes is too large", choices.len(), genes
        )))?;

    let sampled = total_combinations > max_configurations;
    let indices: Vec<usize> = if sampled {
        let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
        let mut picked = index::sample(&mut rng, total_combinations, max_configurations).into_vec();
        picked.sort_unstable();
        info!("Sampling {} of {} grid configurations", max_configurations, total_combinations);
        picked
    } else {
        (0..total_combinations).collect()
    };

    let single_module = space.modules.len() == 1;
    let mut results: Vec<GridSearchResult> = indices
        .par_iter()
        .map(|&config_index| {
            let picked: Vec<(&ModuleDefinition, f64)> = decode(config_index, genes, choices.len())
                .into_iter()
                .map(|digit| choices[digit])
                .collect();
            let resolved: Vec<ResolvedGene<'_>> = pathway
                .steps()
                .iter()
                .zip(&picked)
                .map(|(step, &(module, level))| ResolvedGene { step, module, level })
                .collect();
            let outcome = evaluate_yield(&resolved, rules);

            GridSearchResult {
                config: label(pathway, &picked, single_module),
                yield_multiplier: outcome.yield_multiplier,
                bottleneck: outcome.bottleneck,
                modules: picked.iter().map(|(m, _)| m.name.clone()).collect(),
                levels: picked.iter().map(|(_, l)| *l).collect(),
            }
        })
        .collect();

    // stable: ties keep enumeration order
    results.sort_by(|a, b| b.yield_multiplier.total_cmp(&a.yield_multiplier));
    debug!("Grid search evaluated {} configurations", results.len());

    Ok(GridSearchReport { results, total_combinations, sampled })
}

/// Full ranked list as CSV, one module and level column per gene
pub fn to_csv(pathway: &Pathway, results: &[GridSearchResult]) -> Result<String, SimulationError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "rank".to_string(),
        "config".to_string(),
        "yield".to_string(),
        "bottleneck".to_string(),
    ];
    for gene in pathway.genes() {
        header.push(format!("{}_module", gene));
        header.push(format!("{}_level", gene));
    }
    writer.write_record(&header)?;

    for (rank, result) in results.iter().enumerate() {
        let mut record = vec![
            (rank + 1).to_string(),
            result.config.clone(),
            format!("{:.4}", result.yield_multiplier),
            result.bottleneck.clone().unwrap_or_else(|| "None".to_string()),
        ];
        for (module, level) in result.modules.iter().zip(&result.levels) {
            record.push(module.clone());
            record.push(format!("{:.2}", level));
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| SimulationError::InvalidConfiguration(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| SimulationError::InvalidConfiguration(format!("CSV export failed: {}", e)))
}

// Tests for grid search
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::flux::YIELD_CEILING;
    use crate::model::reference::ReferenceData;

    fn run(data: &ReferenceData, space: &GridSpace, max: usize) -> GridSearchReport {
        grid_search(&data.pathway, &data.catalog, &data.rules, space, &SimulationParams::default(), max).unwrap()
    }

    #[test]
    fn test_reference_grid() {
        let data = ReferenceData::builtin().unwrap();
        let space = GridSpace::reference(&data.catalog).unwrap();
        assert_eq!(space.modules, vec!["CRISPRa_Ec".to_string()]);

        let report = run(&data, &space, 250_000);
        assert_eq!(report.total_combinations, 243);
        assert_eq!(report.results.len(), 243);
        assert!(!report.sampled);

        let best = &report.results[0];
        assert_eq!(best.yield_multiplier, YIELD_CEILING);
        // earliest of the tied configurations in enumeration order
        assert_eq!(best.config, "VioA:0.05 VioB:1.00 VioE:1.00 VioD:1.00 VioC:1.00");

        let worst = report.results.last().unwrap();
        assert_eq!(worst.config, "VioA:0.05 VioB:0.05 VioE:0.05 VioD:0.05 VioC:0.05");
        assert!((worst.yield_multiplier - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_results_sorted_and_ties_stable() {
        let data = ReferenceData::builtin().unwrap();
        let space = GridSpace::reference(&data.catalog).unwrap();
        let report = run(&data, &space, 250_000);

        assert!(report.results.windows(2).all(|w| w[0].yield_multiplier >= w[1].yield_multiplier));

        let ceiling: Vec<&GridSearchResult> = report.results
            .iter()
            .filter(|r| r.yield_multiplier == YIELD_CEILING)
            .collect();
        assert_eq!(ceiling.len(), 21);
        assert!(ceiling.iter().any(|r| r.levels == vec![1.0; 5]));

        // Ties appear in odometer order, which is lexicographic over level digits
        let digits = |r: &GridSearchResult| -> Vec<usize> {
            r.levels.iter().map(|l| REFERENCE_LEVELS.iter().position(|x| x == l).unwrap()).collect()
        };
        assert!(ceiling.windows(2).all(|w| digits(w[0]) < digits(w[1])));
    }

    #[test]
    fn test_multi_module_space() {
        let data = ReferenceData::builtin().unwrap();
        let space = GridSpace::new(
            &data.catalog,
            vec!["CRISPRi_dCas9".to_string(), "neutral".to_string()],
            vec![0.9],
        ).unwrap();
        let report = run(&data, &space, 250_000);

        assert_eq!(report.total_combinations, 32);
        assert_eq!(report.results[0].yield_multiplier, 1.0);
        assert_eq!(
            report.results[0].config,
            "VioA:neutral@0.50 VioB:neutral@0.50 VioE:neutral@0.50 VioD:neutral@0.50 VioC:neutral@0.50"
        );
        assert!(report.results.iter().any(|r| r.bottleneck.as_deref() == Some("VioE")));
    }

    #[test]
    fn test_sampling_is_exact_and_repeatable() {
        let data = ReferenceData::builtin().unwrap();
        let space = GridSpace::reference(&data.catalog).unwrap();

        let first = run(&data, &space, 50);
        let second = run(&data, &space, 50);
        assert!(first.sampled);
        assert_eq!(first.total_combinations, 243);
        assert_eq!(first.results.len(), 50);
        assert_eq!(first.results, second.results);

        let mut configs: Vec<&str> = first.results.iter().map(|r| r.config.as_str()).collect();
        configs.sort_unstable();
        configs.dedup();
        assert_eq!(configs.len(), 50);
    }

    #[test]
    fn test_invalid_spaces() {
        let data = ReferenceData::builtin().unwrap();
        assert!(matches!(
            GridSpace::new(&data.catalog, vec![], vec![0.5]),
            Err(SimulationError::InvalidConfiguration(_))
        ));
        assert_eq!(
            GridSpace::new(&data.catalog, vec!["VPR".to_string()], vec![0.5]).unwrap_err(),
            SimulationError::UnknownModule("VPR".to_string())
        );
        assert!(GridSpace::new(&data.catalog, vec!["CRISPRa_Ec".to_string()], vec![]).is_err());
        assert!(GridSpace::new(&data.catalog, vec!["neutral".to_string()], vec![]).is_ok());
        assert!(matches!(
            GridSpace::new(&data.catalog, vec!["CRISPRa_Ec".to_string()], vec![f64::NAN]),
            Err(SimulationError::InvalidAssignment(_))
        ));

        let space = GridSpace::reference(&data.catalog).unwrap();
        let err = grid_search(&data.pathway, &data.catalog, &data.rules, &space, &SimulationParams::default(), 0);
        assert!(err.is_err());
    }

    #[test]
    fn test_csv_export() {
        let data = ReferenceData::builtin().unwrap();
        let space = GridSpace::reference(&data.catalog).unwrap();
        let report = run(&data, &space, 250_000);
        let csv = to_csv(&data.pathway, &report.results).unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 244);
        assert!(lines[0].starts_with("rank,config,yield,bottleneck,VioA_module,VioA_level"));
        assert!(lines[1].starts_with("1,VioA:0.05 VioB:1.00 VioE:1.00 VioD:1.00 VioC:1.00,5.0000,None,CRISPRa_Ec,0.05"));
    }
}
