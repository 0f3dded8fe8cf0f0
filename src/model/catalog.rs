//! Control module catalog
//!
//! Each module belongs to one behavioral class. The class decides which
//! yield rule applies; the class parameters set its magnitude.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use serde::{Serialize, Deserialize};

use crate::core::error::SimulationError;

pub const DEFAULT_GAIN: f64 = 1.0;
pub const DEFAULT_KNOCKDOWN: f64 = 0.8;
pub const DEFAULT_BONUS: f64 = 0.3;
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Behavioral class of a control module
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModuleClass {
    Activator,
    Repressor,
    Binary,
    Neutral,
}

impl Display for ModuleClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleClass::Activator => write!(f, "activator"),
            ModuleClass::Repressor => write!(f, "repressor"),
            ModuleClass::Binary => write!(f, "binary"),
            ModuleClass::Neutral => write!(f, "neutral"),
        }
    }
}

impl FromStr for ModuleClass {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "activator" => Ok(ModuleClass::Activator),
            "repressor" => Ok(ModuleClass::Repressor),
            "binary" => Ok(ModuleClass::Binary),
            "neutral" => Ok(ModuleClass::Neutral),
            other => Err(SimulationError::InvalidConfiguration(format!(
                "unknown module class: {}", other
            ))),
        }
    }
}

/// Class together with the class-specific effect parameters
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "class", rename_all = "lowercase")]
pub enum ModuleBehavior {
    /// Adds `level * gain` to the yield
    Activator { gain: f64 },
    /// Scales the yield by `1 - level * knockdown`
    Repressor { knockdown: f64 },
    /// Adds `bonus` once `level >= threshold`
    Binary { bonus: f64, threshold: f64 },
    Neutral,
}

impl ModuleBehavior {
    pub fn class(&self) -> ModuleClass {
        match self {
            ModuleBehavior::Activator { .. } => ModuleClass::Activator,
            ModuleBehavior::Repressor { .. } => ModuleClass::Repressor,
            ModuleBehavior::Binary { .. } => ModuleClass::Binary,
            ModuleBehavior::Neutral => ModuleClass::Neutral,
        }
    }

    /// Whether a binary module is switched on at this level.
    /// Non-binary modules are never "on" in this sense.
    pub fn is_switched_on(&self, level: f64) -> bool {
        match self {
            ModuleBehavior::Binary { threshold, .. } => level >= *threshold,
            _ => false,
        }
    }
}

/// Dose-response parameters used by the capacity diagnostics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseCurve {
    /// Level giving half-maximal response
    pub ec50: f64,
    /// Hill coefficient
    pub hill: f64,
    /// Residual expression added on top of the curve
    pub leak: f64,
    /// Maximal fold change for activators
    pub a_max: f64,
    /// Residual fold change when fully repressed
    pub min_fold: f64,
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self {
            ec50: 0.5,
            hill: 2.0,
            leak: 0.0,
            a_max: 3.0,
            min_fold: 0.2,
        }
    }
}

/// One control module type
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModuleDefinition {
    pub name: String,
    #[serde(flatten)]
    pub behavior: ModuleBehavior,
    pub response: ResponseCurve,
}

impl ModuleDefinition {
    pub fn new(name: &str, behavior: ModuleBehavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            response: ResponseCurve::default(),
        }
    }

    pub fn with_response(mut self, response: ResponseCurve) -> Self {
        self.response = response;
        self
    }

    pub fn class(&self) -> ModuleClass {
        self.behavior.class()
    }

    fn validate(&self) -> Result<(), SimulationError> {
        let bad = |what: &str, value: f64| -> Result<(), SimulationError> {
            Err(SimulationError::InvalidConfiguration(format!(
                "module {} has invalid {}: {}", self.name, what, value
            )))
        };

        if self.name.trim().is_empty() {
            return Err(SimulationError::InvalidConfiguration(
                "module with empty name".to_string()
            ));
        }
        match self.behavior {
            ModuleBehavior::Activator { gain } => {
                if !gain.is_finite() || gain < 0.0 {
                    return bad("gain", gain);
                }
            }
            ModuleBehavior::Repressor { knockdown } => {
                if !(0.0..=1.0).contains(&knockdown) {
                    return bad("knockdown", knockdown);
                }
            }
            ModuleBehavior::Binary { bonus, threshold } => {
                if !bonus.is_finite() {
                    return bad("bonus", bonus);
                }
                if !(0.0..=1.0).contains(&threshold) {
                    return bad("threshold", threshold);
                }
            }
            ModuleBehavior::Neutral => {}
        }

        let r = &self.response;
        if !r.ec50.is_finite() || r.ec50 <= 0.0 {
            return bad("EC50", r.ec50);
        }
        if !r.hill.is_finite() || r.hill <= 0.0 {
            return bad("Hill coefficient", r.hill);
        }
        if !r.leak.is_finite() || r.leak < 0.0 {
            return bad("leak", r.leak);
        }
        if !r.a_max.is_finite() || r.a_max < 1.0 {
            return bad("A_max", r.a_max);
        }
        if !(0.0..=1.0).contains(&r.min_fold) {
            return bad("min_fold", r.min_fold);
        }
        Ok(())
    }
}

/// Ordered, validated set of module definitions.
///
/// Exactly one neutral-class module is required; it is the default and
/// reset state for every gene.
#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    modules: Vec<ModuleDefinition>,
    index: HashMap<String, usize>,
    neutral: usize,
}

impl ModuleCatalog {
    pub fn new(modules: Vec<ModuleDefinition>) -> Result<Self, SimulationError> {
        let mut index = HashMap::with_capacity(modules.len());
        let mut neutral = None;

        for (i, module) in modules.iter().enumerate() {
            module.validate()?;
            if index.insert(module.name.clone(), i).is_some() {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "duplicate module name: {}", module.name
                )));
            }
            if module.class() == ModuleClass::Neutral {
                if let Some(existing) = neutral {
                    let existing: &ModuleDefinition = &modules[existing];
                    return Err(SimulationError::InvalidConfiguration(format!(
                        "catalog has more than one neutral module: {} and {}",
                        existing.name, module.name
                    )));
                }
                neutral = Some(i);
            }
        }

        let neutral = neutral.ok_or_else(|| SimulationError::InvalidConfiguration(
            "catalog has no neutral module".to_string()
        ))?;

        Ok(Self { modules, index, neutral })
    }

    /// Resolve a module by name
    pub fn get(&self, name: &str) -> Result<&ModuleDefinition, SimulationError> {
        self.index
            .get(name)
            .map(|&i| &self.modules[i])
            .ok_or_else(|| SimulationError::UnknownModule(name.to_string()))
    }

    /// The default/reset module
    pub fn neutral(&self) -> &ModuleDefinition {
        &self.modules[self.neutral]
    }

    /// Modules in catalog order
    pub fn modules(&self) -> &[ModuleDefinition] {
        &self.modules
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    /// First module of a class in catalog order
    pub fn first_of_class(&self, class: ModuleClass) -> Option<&ModuleDefinition> {
        self.modules.iter().find(|m| m.class() == class)
    }

    /// The module following `name` in catalog order, wrapping at the end
    pub fn next_after(&self, name: &str) -> Result<&ModuleDefinition, SimulationError> {
        let current = self.index
            .get(name)
            .copied()
            .ok_or_else(|| SimulationError::UnknownModule(name.to_string()))?;
        Ok(&self.modules[(current + 1) % self.modules.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_modules() -> Vec<ModuleDefinition> {
        vec![
            ModuleDefinition::new("CRISPRa_Ec", ModuleBehavior::Activator { gain: DEFAULT_GAIN }),
            ModuleDefinition::new("CRISPRi_dCas9", ModuleBehavior::Repressor { knockdown: DEFAULT_KNOCKDOWN }),
            ModuleDefinition::new("Methylation", ModuleBehavior::Binary { bonus: DEFAULT_BONUS, threshold: DEFAULT_THRESHOLD }),
            ModuleDefinition::new("neutral", ModuleBehavior::Neutral),
        ]
    }

    #[test]
    fn test_lookup_and_neutral() {
        let catalog = ModuleCatalog::new(reference_modules()).unwrap();
        assert_eq!(catalog.neutral().name, "neutral");
        assert_eq!(catalog.get("Methylation").unwrap().class(), ModuleClass::Binary);
        assert_eq!(
            catalog.get("VPR").unwrap_err(),
            SimulationError::UnknownModule("VPR".to_string())
        );
        assert_eq!(
            catalog.first_of_class(ModuleClass::Activator).map(|m| m.name.as_str()),
            Some("CRISPRa_Ec")
        );
    }

    #[test]
    fn test_next_after_wraps() {
        let catalog = ModuleCatalog::new(reference_modules()).unwrap();
        assert_eq!(catalog.next_after("CRISPRa_Ec").unwrap().name, "CRISPRi_dCas9");
        assert_eq!(catalog.next_after("neutral").unwrap().name, "CRISPRa_Ec");
        assert!(catalog.next_after("missing").is_err());
    }

    #[test]
    fn test_requires_exactly_one_neutral() {
        let mut modules = reference_modules();
        modules.pop();
        assert!(ModuleCatalog::new(modules).is_err());

        let mut modules = reference_modules();
        modules.push(ModuleDefinition::new("off", ModuleBehavior::Neutral));
        assert!(ModuleCatalog::new(modules).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_parameters() {
        let mut modules = reference_modules();
        modules[1].behavior = ModuleBehavior::Repressor { knockdown: 1.5 };
        assert!(ModuleCatalog::new(modules).is_err());

        let mut modules = reference_modules();
        modules[0].response.ec50 = 0.0;
        assert!(ModuleCatalog::new(modules).is_err());
    }

    #[test]
    fn test_class_parsing() {
        assert_eq!(" Repressor ".parse::<ModuleClass>().unwrap(), ModuleClass::Repressor);
        assert!("enhancer".parse::<ModuleClass>().is_err());
    }

    #[test]
    fn test_binary_switch() {
        let behavior = ModuleBehavior::Binary { bonus: 0.3, threshold: 0.5 };
        assert!(behavior.is_switched_on(0.5));
        assert!(!behavior.is_switched_on(0.49));
        assert!(!ModuleBehavior::Neutral.is_switched_on(1.0));
    }
}
