//! # Chessmate Vector & SQL Collaborators
//!
//! The capability traits the hybrid executor is polymorphic over
//! (spec.md §9): SQL candidate retrieval and PGN lookup (both "out of
//! scope" wire protocols per spec.md §1, but the Rust trait seam is very
//! much in scope), plus the vector-store search client and embedding
//! provider abstractions with their deterministic hash-based fallback.

mod embeddings;
mod error;
mod fallback;
mod payload;
mod repository;
mod snapshot;
mod vectorstore;

pub use embeddings::{
    DeterministicFallbackProvider, EmbeddingProvider, HttpEmbeddingProvider, InMemoryEmbeddingProvider,
    OwnedProviderOrFallback, ProviderOrFallback, QueryVectorOutcome, QueryVectorStrategy,
};
pub use error::{Result, VectorError};
pub use fallback::hash_fallback_vector;
pub use payload::{build_payload_filter, PayloadFilter};
pub use repository::{
    GameRepository, InMemoryGameRepository, InMemoryPgnFetcher, PgGameRepository, PgPgnFetcher, PgnFetcher,
};
pub use snapshot::{SnapshotCatalogue, SnapshotRecord};
pub use vectorstore::{HttpVectorSearchClient, InMemoryVectorSearchClient, VectorSearchClient};
