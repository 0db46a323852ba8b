//! Training loop driving a [`FranchiseGibbs`] sampler over an [`Hdp`].
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::TrainingConfig;
use crate::error::{HdpError, Result};
use crate::mcmc::samplers::franchise::gibbs::FranchiseGibbs;
use crate::mcmc::Sampler;
use crate::models::franchise::FranchiseModel;
use crate::models::hdp::Hdp;

/// Lifecycle of a [`Trainer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainingState {
    /// Words have not been seated yet.
    Uninitialized,
    Seeded,
    /// A sweep is in progress.
    Sweeping,
    /// The last sweep finished and was reported.
    Reporting,
    /// The iteration budget is exhausted.
    Done,
}

/// Progress record emitted after every sweep.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    pub elapsed_seconds: f64,
    pub iteration: usize,
    pub n_topics: usize,
    pub n_tables: usize,
}

/// Receiver of training progress.
pub trait ProgressSink {
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn record(&mut self, report: &IterationReport) -> io::Result<()>;

    fn complete(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ProgressSink for Vec<IterationReport> {
    fn record(&mut self, report: &IterationReport) -> io::Result<()> {
        self.push(*report);
        Ok(())
    }
}

/// Tab separated progress log: `time iter #topics #tables`, whole seconds.
#[derive(Debug)]
pub struct TsvProgress<W: Write> {
    writer: W,
}

impl<W: Write> TsvProgress<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ProgressSink for TsvProgress<W> {
    fn begin(&mut self) -> io::Result<()> {
        writeln!(self.writer, "time\titer\t#topics\t#tables")
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn record(&mut self, report: &IterationReport) -> io::Result<()> {
        writeln!(
            self.writer,
            "{}\t{}\t{}\t{}",
            report.elapsed_seconds as u64, report.iteration, report.n_topics, report.n_tables
        )?;
        self.writer.flush()
    }

    fn complete(&mut self) -> io::Result<()> {
        writeln!(self.writer, "training complete")?;
        self.writer.flush()
    }
}

/// Shared flag asking a running [`Trainer`] to stop after the current sweep.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a call to [`Trainer::run`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrainingOutcome {
    /// Sweeps completed so far.
    pub iterations: usize,
    pub cancelled: bool,
}

/// Owns one model for the length of a training run.
///
/// If a sweep fails the model is dropped and every later call returns
/// [`HdpError::NotSeeded`].
#[derive(Debug)]
pub struct Trainer<R = Xoshiro256PlusPlus> {
    model: Option<Hdp>,
    sampler: FranchiseGibbs,
    config: TrainingConfig,
    rng: R,
    state: TrainingState,
    iteration: usize,
    cancel: CancelHandle,
    started: Option<Instant>,
}

impl Trainer<Xoshiro256PlusPlus> {
    /// Trainer whose generator is seeded from `config.seed`, or from the thread
    /// generator when no seed is given.
    pub fn from_config(model: Hdp, config: TrainingConfig) -> Result<Self> {
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        Self::new(model, config, Xoshiro256PlusPlus::seed_from_u64(seed))
    }
}

impl<R: Rng> Trainer<R> {
    pub fn new(model: Hdp, config: TrainingConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let state = if model.is_seeded() {
            TrainingState::Seeded
        } else {
            TrainingState::Uninitialized
        };
        Ok(Self {
            model: Some(model),
            sampler: FranchiseGibbs::new(),
            config,
            rng,
            state,
            iteration: 0,
            cancel: CancelHandle::default(),
            started: None,
        })
    }

    /// Perform the initial seating with `initial_topics` topics.
    pub fn seed(&mut self) -> Result<()> {
        if self.state != TrainingState::Uninitialized {
            return Err(HdpError::AlreadySeeded);
        }
        let model = self.model.as_mut().ok_or(HdpError::NotSeeded)?;
        model.seed(self.config.initial_topics, &mut self.rng)?;
        self.state = TrainingState::Seeded;
        Ok(())
    }

    #[must_use]
    pub const fn state(&self) -> TrainingState {
        self.state
    }

    /// Sweeps completed so far.
    #[must_use]
    pub const fn iteration(&self) -> usize {
        self.iteration
    }

    #[must_use]
    pub const fn config(&self) -> &TrainingConfig {
        &self.config
    }

    #[must_use]
    pub const fn model(&self) -> Option<&Hdp> {
        self.model.as_ref()
    }

    pub fn into_model(self) -> Option<Hdp> {
        self.model
    }

    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn elapsed_seconds(&self) -> f64 {
        self.started.map_or(0.0, |t| t.elapsed().as_secs_f64())
    }

    /// Run a single iteration: optional shuffle, sweep, defragmentation and report.
    ///
    /// Returns `None` once the iteration budget is exhausted.
    pub fn iterate<S: ProgressSink>(&mut self, sink: &mut S) -> Result<Option<IterationReport>> {
        match self.state {
            TrainingState::Uninitialized => return Err(HdpError::NotSeeded),
            TrainingState::Done => return Ok(None),
            _ if self.iteration >= self.config.max_iterations => {
                self.state = TrainingState::Done;
                return Ok(None);
            }
            _ => {}
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }

        let mut model = self.model.take().ok_or(HdpError::NotSeeded)?;
        let lag = self.config.shuffle_lag;
        if lag > 0 && self.iteration > 0 && self.iteration % lag == 0 {
            model.shuffle(&mut self.rng);
        }

        self.state = TrainingState::Sweeping;
        let model = self.sampler.step(model, &mut self.rng)?;
        if self.config.check_invariants {
            model.check_invariants()?;
        }

        self.state = TrainingState::Reporting;
        let report = IterationReport {
            elapsed_seconds: self.elapsed_seconds(),
            iteration: self.iteration,
            n_topics: model.n_topics(),
            n_tables: model.n_tables(),
        };
        self.model = Some(model);
        sink.record(&report)?;
        info!(
            iteration = report.iteration,
            n_topics = report.n_topics,
            n_tables = report.n_tables,
            elapsed = report.elapsed_seconds,
            "sweep complete"
        );

        self.iteration += 1;
        if self.iteration >= self.config.max_iterations {
            self.state = TrainingState::Done;
        }
        Ok(Some(report))
    }

    /// Iterate until the budget is exhausted or the cancel handle is triggered.
    pub fn run<S: ProgressSink>(&mut self, sink: &mut S) -> Result<TrainingOutcome> {
        if self.state == TrainingState::Uninitialized {
            return Err(HdpError::NotSeeded);
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        if self.iteration == 0 {
            sink.begin()?;
        }

        while self.state != TrainingState::Done {
            if self.cancel.is_cancelled() {
                info!(iteration = self.iteration, "training cancelled");
                return Ok(TrainingOutcome {
                    iterations: self.iteration,
                    cancelled: true,
                });
            }
            if self.iterate(sink)?.is_none() {
                break;
            }
        }

        sink.complete()?;
        info!(iterations = self.iteration, "training complete");
        Ok(TrainingOutcome {
            iterations: self.iteration,
            cancelled: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;

    use super::*;
    use crate::config::Hyperparameters;
    use crate::data::corpus::Corpus;

    fn model() -> Hdp {
        let corpus = Corpus::new([vec![0, 1, 2], vec![0, 1, 3, 3, 3], vec![0, 0, 4, 4]], 5)
            .expect("valid corpus");
        Hdp::new(corpus, Hyperparameters::default()).expect("valid model")
    }

    fn config(max_iterations: usize, shuffle_lag: usize) -> TrainingConfig {
        TrainingConfig {
            max_iterations,
            shuffle_lag,
            check_invariants: true,
            ..TrainingConfig::default()
        }
    }

    fn trainer(max_iterations: usize, shuffle_lag: usize) -> Trainer<SmallRng> {
        let mut trainer = Trainer::new(
            model(),
            config(max_iterations, shuffle_lag),
            SmallRng::seed_from_u64(0x1234),
        )
        .expect("valid config");
        trainer.seed().expect("fresh model");
        trainer
    }

    #[test]
    fn runs_to_done() {
        let mut trainer = trainer(10, 0);
        assert_eq!(trainer.state(), TrainingState::Seeded);

        let mut reports: Vec<IterationReport> = Vec::new();
        let outcome = trainer.run(&mut reports).expect("consistent");

        assert_eq!(
            outcome,
            TrainingOutcome {
                iterations: 10,
                cancelled: false
            }
        );
        assert_eq!(trainer.state(), TrainingState::Done);
        assert_eq!(reports.len(), 10);
        assert!(reports.iter().enumerate().all(|(i, r)| r.iteration == i));
        assert!(reports.windows(2).all(|w| w[0].elapsed_seconds <= w[1].elapsed_seconds));

        let model = trainer.model().expect("model survives");
        let last = reports.last().expect("ten reports");
        assert_eq!(last.n_topics, model.n_topics());
        assert_eq!(last.n_tables, model.n_tables());
        model.check_invariants().expect("consistent");

        assert_eq!(trainer.iterate(&mut reports).expect("done"), None);
    }

    #[test]
    fn shuffling_preserves_statistics() {
        let mut trainer = trainer(12, 3);
        trainer.run(&mut Vec::new()).expect("consistent");
        let model = trainer.into_model().expect("model survives");
        assert_eq!(model.topics().word_counts().iter().sum::<usize>(), 12);
        model.check_invariants().expect("consistent");

        let mut shuffled = model.clone();
        shuffled.shuffle(&mut SmallRng::seed_from_u64(5));
        assert_eq!(shuffled.topics(), model.topics());
        shuffled.check_invariants().expect("consistent");
    }

    #[test]
    fn unseeded_trainer_refuses_to_run() {
        let mut trainer = Trainer::new(model(), config(3, 0), SmallRng::seed_from_u64(1))
            .expect("valid config");
        assert_eq!(trainer.state(), TrainingState::Uninitialized);
        assert!(matches!(
            trainer.run(&mut Vec::new()),
            Err(HdpError::NotSeeded)
        ));
        trainer.seed().expect("fresh model");
        assert!(matches!(trainer.seed(), Err(HdpError::AlreadySeeded)));
    }

    #[test]
    fn rejects_invalid_config() {
        let config = TrainingConfig {
            initial_topics: 0,
            ..TrainingConfig::default()
        };
        assert!(matches!(
            Trainer::new(model(), config, SmallRng::seed_from_u64(1)),
            Err(HdpError::InvalidConfig(_))
        ));
    }

    #[test]
    fn cancellation_stops_between_sweeps() {
        let mut trainer = trainer(50, 0);
        let mut reports: Vec<IterationReport> = Vec::new();
        trainer.iterate(&mut reports).expect("consistent");
        trainer.iterate(&mut reports).expect("consistent");

        trainer.cancel_handle().cancel();
        let outcome = trainer.run(&mut reports).expect("consistent");
        assert_eq!(
            outcome,
            TrainingOutcome {
                iterations: 2,
                cancelled: true
            }
        );
        assert_eq!(reports.len(), 2);
        assert_eq!(trainer.state(), TrainingState::Reporting);
        trainer
            .model()
            .expect("model survives")
            .check_invariants()
            .expect("consistent");
    }

    #[test]
    fn zero_iterations_is_done() {
        let mut trainer = trainer(0, 0);
        let mut out = TsvProgress::new(Vec::new());
        let outcome = trainer.run(&mut out).expect("nothing to do");
        assert_eq!(outcome.iterations, 0);
        assert_eq!(trainer.state(), TrainingState::Done);
        assert_eq!(
            String::from_utf8(out.into_inner()).expect("ascii"),
            "time\titer\t#topics\t#tables\ntraining complete\n"
        );
    }

    struct SlowStart(Vec<IterationReport>);

    impl ProgressSink for SlowStart {
        fn begin(&mut self) -> io::Result<()> {
            std::thread::sleep(std::time::Duration::from_millis(1100));
            Ok(())
        }

        fn record(&mut self, report: &IterationReport) -> io::Result<()> {
            self.0.push(*report);
            Ok(())
        }
    }

    #[test]
    fn clock_starts_before_the_header() {
        let mut trainer = trainer(1, 0);
        let mut sink = SlowStart(Vec::new());
        trainer.run(&mut sink).expect("consistent");

        assert_eq!(sink.0.len(), 1);
        assert!(sink.0[0].elapsed_seconds >= 1.0);
    }

    #[test]
    fn tsv_progress_format() {
        let mut trainer = trainer(3, 0);
        let mut out = TsvProgress::new(Vec::new());
        trainer.run(&mut out).expect("consistent");

        let text = String::from_utf8(out.into_inner()).expect("ascii");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "time\titer\t#topics\t#tables");
        assert_eq!(lines[4], "training complete");
        for (i, line) in lines[1..4].iter().enumerate() {
            let fields: Vec<&str> = line.split('\t').collect();
            assert_eq!(fields.len(), 4);
            assert_eq!(fields[0], "0");
            assert_eq!(fields[1], i.to_string());
            assert!(fields[2].parse::<usize>().is_ok_and(|k| k >= 1));
            assert!(fields[3].parse::<usize>().is_ok_and(|t| t >= 3));
        }
    }

    #[test]
    fn seeded_trainers_agree() {
        let config = TrainingConfig {
            seed: Some(42),
            max_iterations: 5,
            ..TrainingConfig::default()
        };
        let run = || {
            let mut trainer = Trainer::from_config(model(), config.clone()).expect("valid");
            trainer.seed().expect("fresh model");
            trainer.run(&mut Vec::new()).expect("consistent");
            trainer.into_model().expect("model survives")
        };
        assert_eq!(run(), run());
    }
}
