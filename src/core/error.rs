use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error type for simulation and reference-data operations
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// An assignment names a module that is not in the catalog
    UnknownModule(String),
    /// A command or assignment names a gene that is not in the pathway
    UnknownGene(String),
    /// Pathway, catalog, rule or parameter input is malformed
    InvalidConfiguration(String),
    /// Assignment data cannot be interpreted (length mismatch, non-finite level)
    InvalidAssignment(String),
}

impl SimulationError {
    /// Stable machine-readable code used in error responses
    pub fn code(&self) -> &'static str {
        match self {
            SimulationError::UnknownModule(_) => "UNKNOWN_MODULE",
            SimulationError::UnknownGene(_) => "UNKNOWN_GENE",
            SimulationError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            SimulationError::InvalidAssignment(_) => "INVALID_ASSIGNMENT",
        }
    }
}

impl Display for SimulationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::UnknownModule(name) => write!(f, "Unknown module: {}", name),
            SimulationError::UnknownGene(gene) => write!(f, "Unknown gene: {}", gene),
            SimulationError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            SimulationError::InvalidAssignment(msg) => write!(f, "Invalid assignment: {}", msg),
        }
    }
}

impl Error for SimulationError {}

impl From<csv::Error> for SimulationError {
    fn from(err: csv::Error) -> Self {
        SimulationError::InvalidConfiguration(format!("CSV parse error: {}", err))
    }
}

impl From<serde_json::Error> for SimulationError {
    fn from(err: serde_json::Error) -> Self {
        SimulationError::InvalidConfiguration(format!("JSON parse error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_code() {
        let err = SimulationError::UnknownModule("KRAB".to_string());
        assert_eq!(err.to_string(), "Unknown module: KRAB");
        assert_eq!(err.code(), "UNKNOWN_MODULE");

        let err = SimulationError::InvalidAssignment("levels has 3 entries".to_string());
        assert_eq!(err.code(), "INVALID_ASSIGNMENT");
    }
}
