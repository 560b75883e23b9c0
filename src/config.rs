use crate::numerics::parallel::ExecutionBackend;
use crate::physics::psi::{ElectrostaticParams, SolverParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for '{key}' ({value}): {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Run parameters for the Poisson driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub ntotal: [usize; 3],
    pub nhalo: usize,
    pub backend: ExecutionBackend,
    pub electrostatics: ElectrostaticParams,
    pub solver: SolverParams,
    pub output_dir: PathBuf,
    pub logging: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ntotal: [4, 4, 64],
            nhalo: 1,
            backend: ExecutionBackend::default(),
            electrostatics: ElectrostaticParams::default(),
            solver: SolverParams::default(),
            output_dir: PathBuf::from("output/main"),
            logging: true,
        }
    }
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nhalo < 1 {
            return Err(ConfigError::InvalidValue {
                key: "nhalo",
                value: self.nhalo.to_string(),
                reason: "the Poisson stencil needs at least one halo plane",
            });
        }
        if self.ntotal.iter().any(|&n| n == 0 || n % 2 != 0) {
            return Err(ConfigError::InvalidValue {
                key: "ntotal",
                value: format!("{:?}", self.ntotal),
                reason: "red/black ordering needs even, non-zero extents",
            });
        }
        if self.ntotal[2] <= 2 {
            return Err(ConfigError::InvalidValue {
                key: "ntotal",
                value: format!("{:?}", self.ntotal),
                reason: "the slab needs interior planes between its walls",
            });
        }
        if !(self.electrostatics.epsilon > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "electrostatics.epsilon",
                value: self.electrostatics.epsilon.to_string(),
                reason: "permittivity must be positive",
            });
        }
        if !(self.solver.abstol > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "solver.abstol",
                value: self.solver.abstol.to_string(),
                reason: "tolerance must be positive",
            });
        }
        if !(self.solver.reltol > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "solver.reltol",
                value: self.solver.reltol.to_string(),
                reason: "tolerance must be positive",
            });
        }
        if self.solver.nfreq == 0 {
            return Err(ConfigError::InvalidValue {
                key: "solver.nfreq",
                value: "0".into(),
                reason: "report frequency must be at least 1",
            });
        }
        Ok(())
    }
}
