pub mod corpus;
pub mod export;
pub mod ldac;
pub mod vocabulary;
