use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{HdpError, Result};
use crate::utils::NoPrettyPrint;

/// A single token of a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Word {
    term: usize,
    table: Option<usize>,
}

impl Word {
    #[must_use]
    pub const fn new(term: usize) -> Self {
        Self { term, table: None }
    }

    /// Index of this word in the vocabulary.
    #[must_use]
    pub const fn term(&self) -> usize {
        self.term
    }

    /// Table this word is seated at, if any.
    #[must_use]
    pub const fn table(&self) -> Option<usize> {
        self.table
    }
}

/// Result of removing a word from its table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Vacated {
    pub term: usize,
    pub table: usize,
    pub topic: usize,
    /// The table has no words left.
    pub table_died: bool,
}

/// A restaurant of the franchise: the words of one document and the tables they sit at.
///
/// Table slots are dense after defragmentation. Between defragmentations a slot
/// may hold zero words; such a table is dead and its topic is meaningless.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    id: usize,
    words: Vec<Word>,
    table_word_counts: Vec<usize>,
    table_topics: Vec<usize>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let seats: Vec<_> = self
            .words
            .iter()
            .map(|w| {
                w.table.map_or_else(
                    || format!("{}@-", w.term),
                    |t| format!("{}@{t}", w.term),
                )
            })
            .collect();

        f.debug_struct("Document")
            .field("id", &self.id)
            .field("words", &NoPrettyPrint::new(seats))
            .field("table_word_counts", &NoPrettyPrint::new(&self.table_word_counts))
            .field("table_topics", &NoPrettyPrint::new(&self.table_topics))
            .finish()
    }
}

impl Document {
    /// Create a document with no seated words.
    pub fn new<I: IntoIterator<Item = usize>>(id: usize, terms: I) -> Self {
        Self {
            id,
            words: terms.into_iter().map(Word::new).collect(),
            table_word_counts: Vec::new(),
            table_topics: Vec::new(),
        }
    }

    /// Position of the document in the input corpus; unaffected by shuffling.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of table slots, live or dead. This is also the index a new table gets.
    #[must_use]
    pub fn n_table_slots(&self) -> usize {
        self.table_word_counts.len()
    }

    /// Number of tables with at least one word.
    #[must_use]
    pub fn n_live_tables(&self) -> usize {
        self.table_word_counts.iter().filter(|&&n| n > 0).count()
    }

    #[must_use]
    pub fn table_word_counts(&self) -> &[usize] {
        &self.table_word_counts
    }

    /// Topic of every table slot. Entries of dead slots are stale.
    #[must_use]
    pub fn table_topics(&self) -> &[usize] {
        &self.table_topics
    }

    /// Topic served at `table`, if the table is alive.
    #[must_use]
    pub fn table_topic(&self, table: usize) -> Option<usize> {
        (self.table_word_counts.get(table).copied().unwrap_or(0) > 0)
            .then(|| self.table_topics[table])
    }

    fn check_word(&self, word: usize) -> Result<()> {
        if word >= self.words.len() {
            return Err(HdpError::WordOutOfRange {
                document: self.id,
                word,
                length: self.words.len(),
            });
        }
        Ok(())
    }

    /// Seat `word` at `table` serving `topic`. Returns `true` if the table was born.
    ///
    /// The caller is responsible for the validity of `topic` itself.
    pub(crate) fn seat(&mut self, word: usize, table: usize, topic: usize) -> Result<bool> {
        self.check_word(word)?;
        if let Some(current) = self.words[word].table {
            return Err(HdpError::AlreadySeated {
                document: self.id,
                word,
                table: current,
            });
        }

        let n_slots = self.n_table_slots();
        if table > n_slots {
            return Err(HdpError::TableOutOfRange {
                document: self.id,
                table,
                n_tables: n_slots,
            });
        }

        if table == n_slots {
            self.table_word_counts.push(0);
            self.table_topics.push(topic);
        }

        let born = self.table_word_counts[table] == 0;
        if born {
            self.table_topics[table] = topic;
        } else if self.table_topics[table] != topic {
            return Err(HdpError::TopicMismatch {
                document: self.id,
                table,
                bound: self.table_topics[table],
                topic,
            });
        }

        self.table_word_counts[table] += 1;
        self.words[word].table = Some(table);
        Ok(born)
    }

    /// Remove `word` from its table.
    pub(crate) fn unseat(&mut self, word: usize) -> Result<Vacated> {
        self.check_word(word)?;
        let Some(table) = self.words[word].table else {
            return Err(HdpError::NotSeated {
                document: self.id,
                word,
            });
        };

        let count = self.table_word_counts.get(table).copied().unwrap_or(0);
        if count == 0 {
            return Err(HdpError::Invariant(format!(
                "document {}, word {word}: seated at table {table} which has no words",
                self.id
            )));
        }

        self.table_word_counts[table] = count - 1;
        self.words[word].table = None;

        Ok(Vacated {
            term: self.words[word].term,
            table,
            topic: self.table_topics[table],
            table_died: count == 1,
        })
    }

    /// Drop dead tables, renumber the live ones in their original order and
    /// rewrite their topics through `topic_remap`.
    ///
    /// The document is left untouched if an error is returned.
    pub fn defragment(&mut self, topic_remap: &[Option<usize>]) -> Result<()> {
        let mut table_remap: Vec<Option<usize>> = vec![None; self.n_table_slots()];
        let mut word_counts = Vec::with_capacity(self.n_table_slots());
        let mut topics = Vec::with_capacity(self.n_table_slots());

        for (old, (&count, &topic)) in self
            .table_word_counts
            .iter()
            .zip(self.table_topics.iter())
            .enumerate()
        {
            if count == 0 {
                continue;
            }
            let new_topic = topic_remap.get(topic).copied().flatten().ok_or_else(|| {
                HdpError::Invariant(format!(
                    "document {}: live table {old} serves removed topic {topic}",
                    self.id
                ))
            })?;
            table_remap[old] = Some(word_counts.len());
            word_counts.push(count);
            topics.push(new_topic);
        }

        if let Some((word, table)) = self.words.iter().enumerate().find_map(|(i, w)| {
            w.table
                .filter(|&t| table_remap.get(t).copied().flatten().is_none())
                .map(|t| (i, t))
        }) {
            return Err(HdpError::Invariant(format!(
                "document {}, word {word}: seated at dead table {table}",
                self.id
            )));
        }

        for word in &mut self.words {
            word.table = word.table.and_then(|t| table_remap[t]);
        }
        self.table_word_counts = word_counts;
        self.table_topics = topics;
        Ok(())
    }

    pub(crate) fn shuffle_words<R: Rng>(&mut self, rng: &mut R) {
        self.words.shuffle(rng);
    }
}

/// The documents of a corpus and their seating state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Corpus {
    documents: Vec<Document>,
    vocabulary_size: usize,
    n_words: usize,
}

impl Corpus {
    /// Build a corpus from lists of term indices.
    ///
    /// Every term must be below `vocabulary_size`; otherwise the corpus is rejected.
    pub fn new<I, D>(documents: I, vocabulary_size: usize) -> Result<Self>
    where
        I: IntoIterator<Item = D>,
        D: AsRef<[usize]>,
    {
        if vocabulary_size == 0 {
            return Err(HdpError::EmptyVocabulary);
        }

        let documents = documents
            .into_iter()
            .enumerate()
            .map(|(id, terms)| {
                let terms = terms.as_ref();
                if let Some((position, &term)) = terms
                    .iter()
                    .enumerate()
                    .find(|&(_, &term)| term >= vocabulary_size)
                {
                    return Err(HdpError::TermOutOfRange {
                        document: id,
                        position,
                        term,
                        vocabulary_size,
                    });
                }
                Ok(Document::new(id, terms.iter().copied()))
            })
            .collect::<Result<Vec<_>>>()?;

        let n_words = documents.iter().map(Document::len).sum();

        Ok(Self {
            documents,
            vocabulary_size,
            n_words,
        })
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[must_use]
    pub fn document(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub(crate) fn document_mut(&mut self, index: usize) -> Result<&mut Document> {
        let n_documents = self.documents.len();
        self.documents
            .get_mut(index)
            .ok_or(HdpError::DocumentOutOfRange {
                document: index,
                n_documents,
            })
    }

    #[must_use]
    pub fn n_documents(&self) -> usize {
        self.documents.len()
    }

    /// Total number of word occurrences.
    #[must_use]
    pub const fn n_words(&self) -> usize {
        self.n_words
    }

    #[must_use]
    pub const fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    /// Defragment every document with the same topic remapping.
    pub fn defragment(&mut self, topic_remap: &[Option<usize>]) -> Result<()> {
        self.documents
            .iter_mut()
            .try_for_each(|doc| doc.defragment(topic_remap))
    }

    /// Permute the document order and the word order inside each document.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.documents.shuffle(rng);
        self.documents
            .iter_mut()
            .for_each(|doc| doc.shuffle_words(rng));
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    fn corpus() -> Corpus {
        Corpus::new([vec![0, 1, 2], vec![0, 1, 3, 3, 3], vec![0, 0, 4, 4]], 5)
            .expect("terms within the vocabulary")
    }

    #[test]
    fn construct_counts_words() {
        let corpus = corpus();
        assert_eq!(corpus.n_documents(), 3);
        assert_eq!(corpus.n_words(), 12);
        assert_eq!(corpus.vocabulary_size(), 5);
        assert!(corpus
            .documents()
            .iter()
            .flat_map(Document::words)
            .all(|w| w.table().is_none()));
        assert_eq!(corpus.document(1).map(Document::id), Some(1));
    }

    #[test]
    fn construct_rejects_out_of_range_terms() {
        let err = Corpus::new([vec![0, 1], vec![2, 5, 1]], 5).expect_err("term 5 is too large");
        assert!(matches!(
            err,
            HdpError::TermOutOfRange {
                document: 1,
                position: 1,
                term: 5,
                vocabulary_size: 5
            }
        ));

        assert!(matches!(
            Corpus::new(Vec::<Vec<usize>>::new(), 0),
            Err(HdpError::EmptyVocabulary)
        ));
    }

    #[test]
    fn seat_and_unseat() {
        let mut doc = Document::new(0, [3, 1, 3]);

        assert!(doc.seat(0, 0, 2).expect("new table"));
        assert!(!doc.seat(2, 0, 2).expect("existing table"));
        assert!(doc.seat(1, 1, 0).expect("second table"));
        assert_eq!(doc.table_word_counts(), &[2, 1]);
        assert_eq!(doc.table_topic(0), Some(2));
        assert_eq!(doc.table_topic(1), Some(0));

        let vacated = doc.unseat(1).expect("seated");
        assert_eq!(
            vacated,
            Vacated {
                term: 1,
                table: 1,
                topic: 0,
                table_died: true
            }
        );
        assert_eq!(doc.table_topic(1), None);
        assert_eq!(doc.n_table_slots(), 2);
        assert_eq!(doc.n_live_tables(), 1);
    }

    #[test]
    fn seat_rejects_inconsistent_requests() {
        let mut doc = Document::new(4, [0, 1, 2]);
        doc.seat(0, 0, 0).expect("new table");

        assert!(matches!(
            doc.seat(0, 0, 0),
            Err(HdpError::AlreadySeated {
                document: 4,
                word: 0,
                table: 0
            })
        ));
        assert!(matches!(
            doc.seat(1, 3, 0),
            Err(HdpError::TableOutOfRange {
                table: 3,
                n_tables: 1,
                ..
            })
        ));
        assert!(matches!(
            doc.seat(1, 0, 7),
            Err(HdpError::TopicMismatch {
                bound: 0,
                topic: 7,
                ..
            })
        ));
        assert!(matches!(
            doc.seat(9, 0, 0),
            Err(HdpError::WordOutOfRange { word: 9, .. })
        ));
        assert!(matches!(
            doc.unseat(2),
            Err(HdpError::NotSeated {
                document: 4,
                word: 2
            })
        ));
    }

    #[test]
    fn dead_slot_can_be_revived() {
        let mut doc = Document::new(0, [0, 1]);
        doc.seat(0, 0, 0).expect("new table");
        doc.unseat(0).expect("seated");

        assert!(doc.seat(1, 0, 5).expect("revived table"));
        assert_eq!(doc.table_topic(0), Some(5));
        assert_eq!(doc.n_table_slots(), 1);
    }

    #[test]
    fn defragment_compacts_tables() {
        let mut doc = Document::new(0, [0, 1, 2, 3, 4]);
        doc.seat(0, 0, 0).expect("t0");
        doc.seat(1, 1, 1).expect("t1");
        doc.seat(2, 2, 2).expect("t2");
        doc.seat(3, 2, 2).expect("t2");
        doc.seat(4, 3, 1).expect("t3");

        doc.unseat(1).expect("seated");
        doc.unseat(0).expect("seated");

        // topic 0 removed, 1 -> 0, 2 -> 1
        doc.defragment(&[None, Some(0), Some(1)]).expect("consistent");

        assert_eq!(doc.table_word_counts(), &[2, 1]);
        assert_eq!(doc.table_topics(), &[1, 0]);
        let tables: Vec<_> = doc.words().iter().map(Word::table).collect();
        assert_eq!(tables, vec![None, None, Some(0), Some(0), Some(1)]);
    }

    #[test]
    fn defragment_rejects_removed_topic_without_mutating() {
        let mut doc = Document::new(0, [0, 1]);
        doc.seat(0, 0, 0).expect("t0");
        doc.seat(1, 1, 1).expect("t1");
        let before = doc.clone();

        let err = doc
            .defragment(&[Some(0), None])
            .expect_err("topic 1 is still served");
        assert!(matches!(err, HdpError::Invariant(_)));
        assert_eq!(doc, before);
    }

    #[test]
    fn shuffle_keeps_membership() {
        let mut corpus = corpus();
        for d in 0..corpus.n_documents() {
            let doc = corpus.document_mut(d).expect("exists");
            for w in 0..doc.len() {
                doc.seat(w, w % 2, d).expect("valid seating");
            }
        }
        let before = corpus.clone();

        let mut rng = SmallRng::seed_from_u64(0x1234);
        corpus.shuffle(&mut rng);

        assert_eq!(corpus.n_words(), before.n_words());
        for doc in corpus.documents() {
            let original = before.document(doc.id()).expect("same ids");
            assert_eq!(doc.table_word_counts(), original.table_word_counts());
            assert_eq!(doc.table_topics(), original.table_topics());

            let mut seats: Vec<_> = doc.words().iter().map(|w| (w.term(), w.table())).collect();
            let mut original_seats: Vec<_> = original
                .words()
                .iter()
                .map(|w| (w.term(), w.table()))
                .collect();
            seats.sort_unstable();
            original_seats.sort_unstable();
            assert_eq!(seats, original_seats);
        }
    }
}
