//! RAG pipeline: chunking, ingestion and retrieval-augmented chat.

pub mod chat;
pub mod chunker;
pub mod pipeline;

pub use chat::{ChatErrorKind, ChatReply, ChatService};
pub use chunker::{chunk_text, ChunkerConfig};
pub use pipeline::DocumentIngestor;
