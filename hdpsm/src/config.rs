use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HdpError, Result};

/// Concentration and smoothing parameters of the franchise.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    /// Document level concentration. Larger values open new tables more often.
    pub alpha: f64,
    /// Corpus level concentration. Larger values create new topics more often.
    pub gamma: f64,
    /// Symmetric Dirichlet smoothing of each topic's term distribution.
    pub beta: f64,
}

impl Hyperparameters {
    pub const DEFAULT_ALPHA: f64 = 1.0;
    pub const DEFAULT_GAMMA: f64 = 1.5;
    pub const DEFAULT_BETA: f64 = 0.5;

    /// Create validated hyperparameters.
    pub fn new(alpha: f64, gamma: f64, beta: f64) -> Result<Self> {
        let params = Self { alpha, gamma, beta };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("gamma", self.gamma),
            ("beta", self.beta),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(HdpError::InvalidHyperparameter { name, value });
            }
        }
        Ok(())
    }
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            alpha: Self::DEFAULT_ALPHA,
            gamma: Self::DEFAULT_GAMMA,
            beta: Self::DEFAULT_BETA,
        }
    }
}

/// Settings of one training run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of full sweeps to run.
    pub max_iterations: usize,
    /// Shuffle documents and words every `shuffle_lag` sweeps; 0 disables.
    pub shuffle_lag: usize,
    /// Number of topics created when seeding.
    pub initial_topics: usize,
    /// Seed of the random stream. Drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Verify all bookkeeping invariants after every sweep.
    pub check_invariants: bool,
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.initial_topics == 0 {
            return Err(HdpError::InvalidConfig(
                "initial_topics must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            shuffle_lag: 0,
            initial_topics: 1,
            seed: None,
            check_invariants: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HdpConfig {
    pub hyperparameters: Hyperparameters,
    pub training: TrainingConfig,
}

impl HdpConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.hyperparameters.validate()?;
        self.training.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HdpConfig::default();
        assert::close(config.hyperparameters.alpha, 1.0, 1E-12);
        assert::close(config.hyperparameters.gamma, 1.5, 1E-12);
        assert::close(config.hyperparameters.beta, 0.5, 1E-12);
        assert_eq!(config.training.shuffle_lag, 0);
        assert_eq!(config.training.initial_topics, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = HdpConfig::from_json_str(
            r#"{ "hyperparameters": { "beta": 0.1 }, "training": { "max_iterations": 7, "seed": 42 } }"#,
        )
        .expect("valid config");

        assert::close(config.hyperparameters.alpha, 1.0, 1E-12);
        assert::close(config.hyperparameters.beta, 0.1, 1E-12);
        assert_eq!(config.training.max_iterations, 7);
        assert_eq!(config.training.seed, Some(42));
        assert_eq!(config.training.initial_topics, 1);
    }

    #[test]
    fn rejects_bad_hyperparameters() {
        assert!(matches!(
            Hyperparameters::new(0.0, 1.0, 1.0),
            Err(HdpError::InvalidHyperparameter { name: "alpha", .. })
        ));
        assert!(matches!(
            Hyperparameters::new(1.0, f64::NAN, 1.0),
            Err(HdpError::InvalidHyperparameter { name: "gamma", .. })
        ));
        assert!(matches!(
            HdpConfig::from_json_str(r#"{ "hyperparameters": { "beta": -1.0 } }"#),
            Err(HdpError::InvalidHyperparameter { name: "beta", .. })
        ));
    }

    #[test]
    fn rejects_zero_initial_topics() {
        assert!(matches!(
            HdpConfig::from_json_str(r#"{ "training": { "initial_topics": 0 } }"#),
            Err(HdpError::InvalidConfig(_))
        ));
    }

    #[test]
    fn from_path_round_trip() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let config = HdpConfig {
            hyperparameters: Hyperparameters::new(0.5, 2.0, 0.01).expect("valid"),
            training: TrainingConfig {
                max_iterations: 3,
                shuffle_lag: 2,
                ..TrainingConfig::default()
            },
        };
        serde_json::to_writer(&mut file, &config).expect("to write config");

        let loaded = HdpConfig::from_path(file.path()).expect("to read config");
        assert_eq!(loaded, config);
    }
}
