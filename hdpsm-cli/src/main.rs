//! hdpsm command line trainer
//!
//! Reads an LDA-C corpus, runs the Gibbs sampler and writes the trained state.

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use hdpsm::data::export::{self, write_assignments, write_summary_json, write_topic_term_counts};
use hdpsm::data::ldac::LdacReader;
use hdpsm::data::vocabulary::Vocabulary;
use hdpsm::{FranchiseModel, Hdp, Trainer, TsvProgress};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod args;

use args::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .with_writer(io::stderr)
        .init();

    let config = cli.config()?;

    let mut reader = LdacReader::new().skip_malformed(cli.skip_malformed);
    if let Some(n) = cli.max_documents {
        reader = reader.with_max_documents(n);
    }
    let ldac = reader
        .read_path(&cli.corpus)
        .with_context(|| format!("failed to read corpus {}", cli.corpus.display()))?;

    let vocabulary = cli
        .vocabulary
        .as_ref()
        .map(|path| {
            Vocabulary::read_path(path)
                .with_context(|| format!("failed to read vocabulary {}", path.display()))
        })
        .transpose()?;

    if let Some(first) = ldac.documents.first() {
        if let Some(words) = vocabulary.as_ref().and_then(|v| v.describe_document(first)) {
            debug!(document = 0, "{words}");
        }
    }

    let corpus = ldac
        .into_corpus(vocabulary.as_ref().map(Vocabulary::len))
        .context("corpus does not fit the vocabulary")?;
    println!("vocabulary size: {}", corpus.vocabulary_size());
    println!("words: {}", corpus.n_words());
    println!("documents: {}", corpus.n_documents());

    let model = Hdp::new(corpus, config.hyperparameters)?;
    let mut trainer = Trainer::from_config(model, config.training)?;
    trainer.seed()?;

    let mut progress = TsvProgress::new(io::stdout().lock());
    let outcome = trainer.run(&mut progress)?;
    if outcome.cancelled {
        warn!(iterations = outcome.iterations, "training stopped early");
    }

    let model = trainer
        .into_model()
        .context("trainer lost its model")?;

    if let Some(path) = &cli.topics_out {
        export::to_path(path, |w| write_topic_term_counts(w, model.topic_term_counts()))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = &cli.assignments_out {
        export::to_path(path, |w| write_assignments(w, &model.assignments()))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = &cli.summary_out {
        export::to_path(path, |w| write_summary_json(w, &model.summary()))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if let Some(vocabulary) = &vocabulary {
        for (topic, row) in model.topic_term_counts().iter().enumerate() {
            let words = vocabulary
                .top_terms(row, cli.top_terms)
                .into_iter()
                .map(|(word, count)| format!("{word}[{count}]"))
                .collect::<Vec<_>>()
                .join(" ");
            info!(topic, n_words = model.topics().word_counts()[topic], "{words}");
        }
    }
    info!(
        n_topics = model.n_topics(),
        n_tables = model.n_tables(),
        "done"
    );

    Ok(())
}
