use rand::Rng;

use crate::config::Hyperparameters;
use crate::data::corpus::Document;
use crate::error::{HdpError, Result};
use crate::mcmc::Sampler;
use crate::models::franchise::FranchiseModel;
use crate::utils::CumulativeWeights;

/// Collapsed Gibbs sampling of the table and topic assignments of a
/// Chinese Restaurant Franchise.
///
/// Every word is removed from its table and reseated: first a table is chosen
/// among the live tables of its document or a new one, and if a new table is
/// opened, a topic is chosen for it among the existing topics or a new one.
/// The sweep ends with a defragmentation of the model.
#[derive(Default, Clone, Debug)]
pub struct FranchiseGibbs {
    likelihoods: Vec<f64>,
    table_weights: CumulativeWeights,
    topic_weights: CumulativeWeights,
}

impl FranchiseGibbs {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            likelihoods: Vec::new(),
            table_weights: CumulativeWeights::new(),
            topic_weights: CumulativeWeights::new(),
        }
    }

    /// Weights of the last table draw; the final entry is the new table.
    #[must_use]
    pub const fn table_weights(&self) -> &CumulativeWeights {
        &self.table_weights
    }

    /// Weights of the last topic draw; the final entry is the new topic.
    #[must_use]
    pub const fn topic_weights(&self) -> &CumulativeWeights {
        &self.topic_weights
    }

    fn check_term<M: FranchiseModel>(model: &M, document: usize, term: usize) -> Result<()> {
        let vocabulary_size = model.vocabulary_size();
        if term >= vocabulary_size {
            return Err(HdpError::TermOutOfRange {
                document,
                position: 0,
                term,
                vocabulary_size,
            });
        }
        Ok(())
    }

    /// Draw a table for an unseated word of `term` in `document`.
    ///
    /// A return value equal to the document's number of table slots means a new table.
    #[allow(clippy::cast_precision_loss)]
    pub fn sample_table<M, R>(
        &mut self,
        model: &M,
        document: usize,
        term: usize,
        rng: &mut R,
    ) -> Result<usize>
    where
        M: FranchiseModel,
        R: Rng,
    {
        let doc = model
            .document(document)
            .ok_or(HdpError::DocumentOutOfRange {
                document,
                n_documents: model.n_documents(),
            })?;
        Self::check_term(model, document, term)?;
        let Hyperparameters { alpha, gamma, .. } = *model.hyperparameters();

        let f_new = model.term_likelihoods(term, &mut self.likelihoods);

        self.table_weights.clear();
        for (table, (&count, &topic)) in doc
            .table_word_counts()
            .iter()
            .zip(doc.table_topics())
            .enumerate()
        {
            let weight = if count > 0 {
                let f = self.likelihoods.get(topic).ok_or_else(|| {
                    HdpError::Invariant(format!(
                        "document {document}: table {table} serves topic {topic} of {}",
                        self.likelihoods.len()
                    ))
                })?;
                count as f64 * f
            } else {
                0.0
            };
            self.table_weights.push(weight);
        }
        self.table_weights
            .push(alpha * f_new / (model.n_tables() as f64 + gamma));

        self.table_weights.draw(rng)
    }

    /// Draw a topic for a new table opened by a word of `term`.
    ///
    /// A return value equal to the number of topics means a new topic.
    #[allow(clippy::cast_precision_loss)]
    pub fn sample_topic<M, R>(&mut self, model: &M, term: usize, rng: &mut R) -> Result<usize>
    where
        M: FranchiseModel,
        R: Rng,
    {
        if term >= model.vocabulary_size() {
            return Err(HdpError::Invariant(format!(
                "term {term} is outside the vocabulary of size {}",
                model.vocabulary_size()
            )));
        }
        let gamma = model.hyperparameters().gamma;
        model.term_likelihoods(term, &mut self.likelihoods);

        self.topic_weights.clear();
        self.likelihoods
            .iter()
            .zip(model.topic_table_counts())
            .for_each(|(f, &m)| self.topic_weights.push(m as f64 * f));
        self.topic_weights
            .push(gamma / model.vocabulary_size() as f64);

        self.topic_weights.draw(rng)
    }

    /// Unseat a single word and seat it again according to the conditional posterior.
    pub fn resample_word<M, R>(
        &mut self,
        model: &mut M,
        document: usize,
        word: usize,
        rng: &mut R,
    ) -> Result<()>
    where
        M: FranchiseModel,
        R: Rng,
    {
        model.unseat(document, word)?;

        let (term, n_slots) = {
            let doc = model
                .document(document)
                .ok_or(HdpError::DocumentOutOfRange {
                    document,
                    n_documents: model.n_documents(),
                })?;
            (doc.words()[word].term(), doc.n_table_slots())
        };

        let table = self.sample_table(&*model, document, term, rng)?;
        let topic = if table == n_slots {
            self.sample_topic(&*model, term, rng)?
        } else {
            model
                .document(document)
                .and_then(|doc| doc.table_topic(table))
                .ok_or_else(|| {
                    HdpError::Invariant(format!(
                        "document {document}, word {word}: drew dead table {table}"
                    ))
                })?
        };

        model.seat(document, word, table, topic)
    }
}

impl<M> Sampler<M> for FranchiseGibbs
where
    M: FranchiseModel,
{
    fn step<R: Rng>(&mut self, mut model: M, rng: &mut R) -> Result<M> {
        for document in 0..model.n_documents() {
            let n_words = model.document(document).map_or(0, Document::len);
            for word in 0..n_words {
                self.resample_word(&mut model, document, word, rng)?;
            }
        }
        model.defragment()?;
        Ok(model)
    }
}
