use thiserror::Error;

#[derive(Error, Debug)]
pub enum HdpError {
    #[error("vocabulary size must be positive")]
    EmptyVocabulary,

    #[error(
        "document {document}, word {position}: term {term} is outside the vocabulary of size {vocabulary_size}"
    )]
    TermOutOfRange {
        document: usize,
        position: usize,
        term: usize,
        vocabulary_size: usize,
    },

    #[error("malformed corpus line {line}: {reason}")]
    MalformedCorpus { line: usize, reason: String },

    #[error("invalid hyperparameter {name} = {value}: must be finite and strictly positive")]
    InvalidHyperparameter { name: &'static str, value: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("document {document} does not exist ({n_documents} documents)")]
    DocumentOutOfRange { document: usize, n_documents: usize },

    #[error("document {document}: word {word} does not exist (document length {length})")]
    WordOutOfRange {
        document: usize,
        word: usize,
        length: usize,
    },

    #[error("document {document}, word {word}: already seated at table {table}")]
    AlreadySeated {
        document: usize,
        word: usize,
        table: usize,
    },

    #[error("document {document}, word {word}: not seated at any table")]
    NotSeated { document: usize, word: usize },

    #[error("document {document}: table {table} is past the next free table slot {n_tables}")]
    TableOutOfRange {
        document: usize,
        table: usize,
        n_tables: usize,
    },

    #[error("document {document}: topic {topic} is past the next free topic index {n_topics}")]
    TopicOutOfRange {
        document: usize,
        topic: usize,
        n_topics: usize,
    },

    #[error("document {document}: table {table} serves topic {bound}, not topic {topic}")]
    TopicMismatch {
        document: usize,
        table: usize,
        bound: usize,
        topic: usize,
    },

    #[error("bookkeeping invariant violated: {0}")]
    Invariant(String),

    #[error("sampling weights are degenerate (total = {total})")]
    DegenerateWeights { total: f64 },

    #[error("model has already been seeded")]
    AlreadySeeded,

    #[error("model must be seeded before sampling")]
    NotSeeded,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HdpError>;
