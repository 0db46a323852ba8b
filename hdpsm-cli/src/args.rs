// Command-line argument parsing for the hdpsm trainer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hdpsm::HdpConfig;

/// Fit a Hierarchical Dirichlet Process topic model to an LDA-C corpus.
#[derive(Parser, Debug)]
#[command(name = "hdpsm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Corpus in LDA-C format, one `M term:count ...` document per line
    pub corpus: PathBuf,

    /// Vocabulary file, one word per line
    #[arg(long)]
    pub vocabulary: Option<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Document-level concentration
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Topic-term Dirichlet smoothing
    #[arg(long)]
    pub beta: Option<f64>,

    /// Franchise-level concentration
    #[arg(long)]
    pub gamma: Option<f64>,

    /// Number of Gibbs sweeps
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Shuffle documents and words every N sweeps (0 disables)
    #[arg(long)]
    pub shuffle_lag: Option<usize>,

    /// Number of topics to seed with
    #[arg(long)]
    pub initial_topics: Option<usize>,

    /// Random seed
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Read at most this many documents
    #[arg(long)]
    pub max_documents: Option<usize>,

    /// Skip malformed corpus lines instead of failing
    #[arg(long)]
    pub skip_malformed: bool,

    /// Verify the sampler's bookkeeping after every sweep
    #[arg(long)]
    pub check_invariants: bool,

    /// Write the topic-term count matrix here
    #[arg(long)]
    pub topics_out: Option<PathBuf>,

    /// Write per-word topic and table assignments here
    #[arg(long)]
    pub assignments_out: Option<PathBuf>,

    /// Write a JSON summary of the trained model here
    #[arg(long)]
    pub summary_out: Option<PathBuf>,

    /// Log the N most frequent words of every topic (needs --vocabulary)
    #[arg(long, default_value_t = 10)]
    pub top_terms: usize,

    /// More verbose logging, repeat for trace output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Load the configuration file, if any, and apply the flag overrides.
    pub fn config(&self) -> Result<HdpConfig> {
        let mut config = match &self.config {
            Some(path) => HdpConfig::from_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => HdpConfig::default(),
        };

        let hyper = &mut config.hyperparameters;
        if let Some(alpha) = self.alpha {
            hyper.alpha = alpha;
        }
        if let Some(beta) = self.beta {
            hyper.beta = beta;
        }
        if let Some(gamma) = self.gamma {
            hyper.gamma = gamma;
        }

        let training = &mut config.training;
        if let Some(n) = self.iterations {
            training.max_iterations = n;
        }
        if let Some(lag) = self.shuffle_lag {
            training.shuffle_lag = lag;
        }
        if let Some(k) = self.initial_topics {
            training.initial_topics = k;
        }
        if self.seed.is_some() {
            training.seed = self.seed;
        }
        training.check_invariants |= self.check_invariants;

        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
