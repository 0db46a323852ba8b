//! Reader for corpora in LDA-C format.
//!
//! Each line holds one document:
//!
//! ```text
//! [M] [term_1]:[count] [term_2]:[count] ... [term_M]:[count]
//! ```
//!
//! where `M` is the number of distinct terms in the document and each count is
//! the number of occurrences of that term.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use super::corpus::Corpus;
use crate::error::{HdpError, Result};

/// Documents read from an LDA-C file, expanded to term sequences.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LdacCorpus {
    pub documents: Vec<Vec<usize>>,
    /// One past the largest term index seen.
    pub vocabulary_size: usize,
}

impl LdacCorpus {
    #[must_use]
    pub fn n_words(&self) -> usize {
        self.documents.iter().map(Vec::len).sum()
    }

    /// Build the sampler's corpus state, optionally with a larger vocabulary
    /// (e.g. from a vocabulary file).
    pub fn into_corpus(self, vocabulary_size: Option<usize>) -> Result<Corpus> {
        let vocabulary_size = vocabulary_size.unwrap_or(self.vocabulary_size);
        Corpus::new(self.documents, vocabulary_size)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LdacReader {
    max_documents: Option<usize>,
    skip_malformed: bool,
}

impl LdacReader {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_documents: None,
            skip_malformed: false,
        }
    }

    /// Stop after reading `max_documents` documents.
    #[must_use]
    pub const fn with_max_documents(mut self, max_documents: usize) -> Self {
        self.max_documents = Some(max_documents);
        self
    }

    /// Log and skip malformed lines instead of failing.
    #[must_use]
    pub const fn skip_malformed(mut self, skip: bool) -> Self {
        self.skip_malformed = skip;
        self
    }

    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> Result<LdacCorpus> {
        let file = File::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "reading LDA-C corpus");
        self.read(BufReader::new(file))
    }

    pub fn read<R: BufRead>(&self, reader: R) -> Result<LdacCorpus> {
        let mut corpus = LdacCorpus::default();

        for (index, line) in reader.lines().enumerate() {
            if self
                .max_documents
                .is_some_and(|max| corpus.documents.len() >= max)
            {
                break;
            }

            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match parse_line(&line) {
                Ok(doc) => {
                    if let Some(&max_term) = doc.iter().max() {
                        corpus.vocabulary_size = corpus.vocabulary_size.max(max_term + 1);
                    }
                    corpus.documents.push(doc);
                }
                Err(reason) if self.skip_malformed => {
                    warn!(line = index + 1, %reason, "skipping malformed corpus line");
                }
                Err(reason) => {
                    return Err(HdpError::MalformedCorpus {
                        line: index + 1,
                        reason,
                    })
                }
            }
        }

        Ok(corpus)
    }
}

fn parse_line(line: &str) -> std::result::Result<Vec<usize>, String> {
    let mut fields = line.split_whitespace();
    let length: usize = fields
        .next()
        .ok_or_else(|| "empty line".to_string())?
        .parse()
        .map_err(|e| format!("invalid term count: {e}"))?;

    let pairs: Vec<&str> = fields.collect();
    if pairs.len() != length {
        return Err(format!(
            "declared {length} term:count pairs but found {}",
            pairs.len()
        ));
    }

    let mut doc = Vec::new();
    for pair in pairs {
        let (term, count) = pair
            .split_once(':')
            .ok_or_else(|| format!("expected term:count, found {pair:?}"))?;
        let term: usize = term
            .parse()
            .map_err(|e| format!("invalid term {term:?}: {e}"))?;
        if count.starts_with('-') {
            return Err(format!("negative count {count} for term {term}"));
        }
        let count: usize = count
            .parse()
            .map_err(|e| format!("invalid count {count:?}: {e}"))?;
        doc.extend(std::iter::repeat_n(term, count));
    }
    Ok(doc)
}
