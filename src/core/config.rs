use std::env;
use std::path::PathBuf;
use serde::{Serialize, Deserialize};
use log::warn;

use crate::core::error::SimulationError;

/// Global knobs accepted by every simulation call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimulationParams {
    /// Upstream precursor supply cap on flux
    pub supply_cap: f64,
    /// Burden sensitivity
    pub gamma_burden: f64,
    /// Soft-min exponent; larger is closer to a hard minimum
    pub p_softmin: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            supply_cap: 2.0,
            gamma_burden: 0.05,
            p_softmin: 6.0,
        }
    }
}

impl SimulationParams {
    /// Overlay optional wire values on the defaults
    pub fn from_options(supply_cap: Option<f64>, gamma_burden: Option<f64>, p_softmin: Option<f64>) -> Self {
        let defaults = Self::default();
        Self {
            supply_cap: supply_cap.unwrap_or(defaults.supply_cap),
            gamma_burden: gamma_burden.unwrap_or(defaults.gamma_burden),
            p_softmin: p_softmin.unwrap_or(defaults.p_softmin),
        }
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.supply_cap.is_finite() || self.supply_cap <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "supply_cap must be positive, got {}", self.supply_cap
            )));
        }
        if !self.gamma_burden.is_finite() || self.gamma_burden < 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "gamma_burden must be non-negative, got {}", self.gamma_burden
            )));
        }
        if !self.p_softmin.is_finite() || self.p_softmin <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "p_softmin must be positive, got {}", self.p_softmin
            )));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    pub bind_address: String,
    /// Port to listen on
    pub port: u16,
    /// Pathway TSV; bundled violacein data when unset
    pub pathway_path: Option<PathBuf>,
    /// Module catalog CSV; bundled catalog when unset
    pub modules_path: Option<PathBuf>,
    /// Override rules JSON; bundled rules when unset
    pub rules_path: Option<PathBuf>,
    /// Number of grid search results kept in the cache
    pub grid_cache_capacity: usize,
    /// Largest grid evaluated exhaustively before sampling
    pub max_configurations: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            pathway_path: None,
            modules_path: None,
            rules_path: None,
            grid_cache_capacity: 32,
            max_configurations: 250_000,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `VIOFLUX_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(bind) = env::var("VIOFLUX_BIND") {
            config.bind_address = bind;
        }
        if let Some(port) = parse_var("VIOFLUX_PORT") {
            config.port = port;
        }
        config.pathway_path = env::var_os("VIOFLUX_PATHWAY").map(PathBuf::from);
        config.modules_path = env::var_os("VIOFLUX_MODULES").map(PathBuf::from);
        config.rules_path = env::var_os("VIOFLUX_RULES").map(PathBuf::from);
        if let Some(capacity) = parse_var("VIOFLUX_GRID_CACHE") {
            config.grid_cache_capacity = capacity;
        }
        if let Some(max) = parse_var("VIOFLUX_MAX_CONFIGURATIONS") {
            config.max_configurations = max;
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        let params = SimulationParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.supply_cap, 2.0);
    }

    #[test]
    fn test_from_options_overlays_defaults() {
        let params = SimulationParams::from_options(Some(1.5), None, Some(4.0));
        assert_eq!(params.supply_cap, 1.5);
        assert_eq!(params.gamma_burden, 0.05);
        assert_eq!(params.p_softmin, 4.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SimulationParams { supply_cap: 0.0, ..Default::default() }.validate().is_err());
        assert!(SimulationParams { gamma_burden: -0.1, ..Default::default() }.validate().is_err());
        assert!(SimulationParams { p_softmin: f64::INFINITY, ..Default::default() }.validate().is_err());
    }

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert!(config.pathway_path.is_none());
        assert_eq!(config.max_configurations, 250_000);
    }
}
