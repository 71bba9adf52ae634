pub mod chunking;
pub mod rag;
pub mod safety;
pub mod ingest;
