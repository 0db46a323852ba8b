//! Hierarchical Dirichlet Process topic models fitted by collapsed Gibbs
//! sampling of the Chinese Restaurant Franchise.
pub mod config;
pub mod data;
pub mod error;
pub mod mcmc;
pub mod models;
pub mod trainer;
pub mod utils;

pub use config::{HdpConfig, Hyperparameters, TrainingConfig};
pub use data::corpus::Corpus;
pub use error::{HdpError, Result};
pub use mcmc::samplers::franchise::gibbs::FranchiseGibbs;
pub use mcmc::Sampler;
pub use models::franchise::FranchiseModel;
pub use models::hdp::{Hdp, WordAssignment};
pub use models::Model;
pub use trainer::{
    CancelHandle, IterationReport, ProgressSink, Trainer, TrainingOutcome, TrainingState,
    TsvProgress,
};
