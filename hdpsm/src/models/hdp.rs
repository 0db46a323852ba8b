use rand::Rng;
use serde::{Deserialize, Serialize};
use special::Gamma as _;
use tracing::debug;

use super::franchise::FranchiseModel;
use super::topics::TopicStats;
use super::Model;
use crate::config::Hyperparameters;
use crate::data::corpus::{Corpus, Document};
use crate::data::export::HdpSummary;
use crate::error::{HdpError, Result};

/// Final seating of a single word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordAssignment {
    pub document: usize,
    pub term: usize,
    pub topic: usize,
    pub table: usize,
}

/// Hierarchical Dirichlet Process topic model in its Chinese Restaurant Franchise
/// representation, with the topic-term distributions collapsed.
#[derive(Clone, Debug, PartialEq)]
pub struct Hdp {
    corpus: Corpus,
    hyperparameters: Hyperparameters,
    topics: TopicStats,
    seeded: bool,
}

impl Hdp {
    pub fn new(corpus: Corpus, hyperparameters: Hyperparameters) -> Result<Self> {
        hyperparameters.validate()?;
        let topics = TopicStats::new(corpus.vocabulary_size(), 0);
        Ok(Self {
            corpus,
            hyperparameters,
            topics,
            seeded: false,
        })
    }

    /// Initial seating.
    ///
    /// The first `initial_topics` documents each get their own topic, every other
    /// document a uniformly chosen one of those topics. All words of a document
    /// sit at a single table.
    pub fn seed<R: Rng>(&mut self, initial_topics: usize, rng: &mut R) -> Result<()> {
        if self.seeded {
            return Err(HdpError::AlreadySeeded);
        }
        if initial_topics == 0 {
            return Err(HdpError::InvalidConfig(
                "initial_topics must be at least 1".to_string(),
            ));
        }

        self.topics = TopicStats::new(self.corpus.vocabulary_size(), initial_topics);

        for d in 0..self.corpus.n_documents() {
            let topic = if d < initial_topics {
                d
            } else {
                rng.random_range(0..initial_topics)
            };
            let n_words = self.corpus.documents()[d].len();
            for w in 0..n_words {
                self.seat(d, w, 0, topic)?;
            }
        }
        self.seeded = true;

        debug!(
            n_documents = self.corpus.n_documents(),
            n_words = self.corpus.n_words(),
            n_topics = self.topics.n_topics(),
            n_tables = self.topics.n_tables(),
            "seeded franchise"
        );
        Ok(())
    }

    #[must_use]
    pub const fn is_seeded(&self) -> bool {
        self.seeded
    }

    #[must_use]
    pub const fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    #[must_use]
    pub const fn topics(&self) -> &TopicStats {
        &self.topics
    }

    /// Word counts of every topic and term, `K x V`.
    #[must_use]
    pub fn topic_term_counts(&self) -> &[Vec<usize>] {
        self.topics.term_counts()
    }

    /// Topic and table of every seated word, in the current document and word order.
    #[must_use]
    pub fn assignments(&self) -> Vec<WordAssignment> {
        self.corpus
            .documents()
            .iter()
            .flat_map(|doc| {
                doc.words().iter().filter_map(move |word| {
                    let table = word.table()?;
                    Some(WordAssignment {
                        document: doc.id(),
                        term: word.term(),
                        topic: doc.table_topics()[table],
                        table,
                    })
                })
            })
            .collect()
    }

    /// Snapshot of the topic statistics for serialization.
    #[must_use]
    pub fn summary(&self) -> HdpSummary {
        HdpSummary::from(self)
    }

    /// Verify every bookkeeping invariant against a recount from the words.
    pub fn check_invariants(&self) -> Result<()> {
        self.topics.check()?;

        let n_topics = self.topics.n_topics();
        let vocabulary_size = self.corpus.vocabulary_size();
        let mut word_counts = vec![0_usize; n_topics];
        let mut table_counts = vec![0_usize; n_topics];
        let mut term_counts = vec![vec![0_usize; vocabulary_size]; n_topics];

        for doc in self.corpus.documents() {
            let mut seated = vec![0_usize; doc.n_table_slots()];
            for (w, word) in doc.words().iter().enumerate() {
                match word.table() {
                    Some(t) if t < seated.len() => seated[t] += 1,
                    Some(t) => {
                        return Err(HdpError::Invariant(format!(
                            "document {}, word {w}: table {t} has no slot",
                            doc.id()
                        )))
                    }
                    None if self.seeded => {
                        return Err(HdpError::NotSeated {
                            document: doc.id(),
                            word: w,
                        })
                    }
                    None => {}
                }
            }

            for (t, (&count, &recount)) in doc.table_word_counts().iter().zip(&seated).enumerate() {
                if count != recount {
                    return Err(HdpError::Invariant(format!(
                        "document {}: table {t} counts {count} words but {recount} are seated",
                        doc.id()
                    )));
                }
                if count == 0 {
                    continue;
                }
                let topic = doc.table_topics()[t];
                if topic >= n_topics {
                    return Err(HdpError::Invariant(format!(
                        "document {}: table {t} serves topic {topic} of {n_topics}",
                        doc.id()
                    )));
                }
                table_counts[topic] += 1;
                word_counts[topic] += count;
            }

            for word in doc.words() {
                if let Some(t) = word.table() {
                    term_counts[doc.table_topics()[t]][word.term()] += 1;
                }
            }
        }

        if word_counts != self.topics.word_counts() {
            return Err(HdpError::Invariant(format!(
                "topic word counts {:?} disagree with the seating {word_counts:?}",
                self.topics.word_counts()
            )));
        }
        if table_counts != self.topics.table_counts() {
            return Err(HdpError::Invariant(format!(
                "topic table counts {:?} disagree with the seating {table_counts:?}",
                self.topics.table_counts()
            )));
        }
        if let Some(k) = (0..n_topics).find(|&k| term_counts[k] != self.topics.term_counts()[k]) {
            return Err(HdpError::Invariant(format!(
                "term counts of topic {k} disagree with the seating"
            )));
        }

        let total: usize = word_counts.iter().sum();
        if self.seeded && total != self.corpus.n_words() {
            return Err(HdpError::Invariant(format!(
                "{total} words are seated but the corpus has {}",
                self.corpus.n_words()
            )));
        }
        Ok(())
    }
}

impl Model for Hdp {
    /// Log marginal likelihood of the words given their topics, with each
    /// topic's term distribution integrated out under a symmetric Dirichlet.
    #[allow(clippy::cast_precision_loss)]
    fn ln_score(&self) -> f64 {
        let beta = self.hyperparameters.beta;
        let v_beta = self.corpus.vocabulary_size() as f64 * beta;
        let ln_gamma_beta = beta.ln_gamma().0;
        let ln_gamma_v_beta = v_beta.ln_gamma().0;

        self.topics
            .term_counts()
            .iter()
            .zip(self.topics.word_counts())
            .filter(|(_, &n)| n > 0)
            .map(|(row, &n)| {
                let terms: f64 = row
                    .iter()
                    .filter(|&&c| c > 0)
                    .map(|&c| (c as f64 + beta).ln_gamma().0 - ln_gamma_beta)
                    .sum();
                ln_gamma_v_beta - (n as f64 + v_beta).ln_gamma().0 + terms
            })
            .sum()
    }
}

impl FranchiseModel for Hdp {
    fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    fn vocabulary_size(&self) -> usize {
        self.corpus.vocabulary_size()
    }

    fn n_documents(&self) -> usize {
        self.corpus.n_documents()
    }

    fn document(&self, index: usize) -> Option<&Document> {
        self.corpus.document(index)
    }

    fn n_topics(&self) -> usize {
        self.topics.n_topics()
    }

    fn n_tables(&self) -> usize {
        self.topics.n_tables()
    }

    fn topic_table_counts(&self) -> &[usize] {
        self.topics.table_counts()
    }

    #[allow(clippy::cast_precision_loss)]
    fn term_likelihoods(&self, term: usize, out: &mut Vec<f64>) -> f64 {
        let Hyperparameters { gamma, beta, .. } = self.hyperparameters;
        self.topics.term_likelihoods(term, beta, out);
        let base = gamma / self.corpus.vocabulary_size() as f64;
        base + out
            .iter()
            .zip(self.topics.table_counts())
            .map(|(f, &m)| m as f64 * f)
            .sum::<f64>()
    }

    fn seat(&mut self, document: usize, word: usize, table: usize, topic: usize) -> Result<()> {
        let n_topics = self.topics.n_topics();
        if topic > n_topics {
            return Err(HdpError::TopicOutOfRange {
                document,
                topic,
                n_topics,
            });
        }

        let doc = self.corpus.document_mut(document)?;
        let born = doc.seat(word, table, topic)?;
        let term = doc.words()[word].term();
        self.topics.observe(topic, term, born);
        Ok(())
    }

    fn unseat(&mut self, document: usize, word: usize) -> Result<()> {
        let vacated = self.corpus.document_mut(document)?.unseat(word)?;
        self.topics
            .forget(vacated.topic, vacated.term, vacated.table_died)
            .map_err(|e| match e {
                HdpError::Invariant(msg) => HdpError::Invariant(format!(
                    "document {document}, word {word}, table {}: {msg}",
                    vacated.table
                )),
                other => other,
            })
    }

    fn defragment(&mut self) -> Result<()> {
        let n_topics = self.topics.n_topics();
        let remap = self.topics.compact();
        self.corpus.defragment(&remap)?;
        debug!(
            removed_topics = n_topics - self.topics.n_topics(),
            n_topics = self.topics.n_topics(),
            n_tables = self.topics.n_tables(),
            "defragmented"
        );
        Ok(())
    }

    fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.corpus.shuffle(rng);
        debug!("shuffled documents and words");
    }
}
