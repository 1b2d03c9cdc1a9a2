//! # Fallback query strategies
//!
//! Operations whose preferred query form may be rejected by the server's
//! parser. Each one runs an ordered [`FallbackChain`] of simpler forms.

mod chain;
mod records;
mod triplets;
mod vector;

pub use chain::FallbackChain;
pub use records::RecordFetcher;
pub use triplets::{Triplet, TripletFetcher, TripletFilter};
pub use vector::{
    Embedding, VectorOps, VectorSearch, VectorSearchSpec, DEFAULT_INDEX_TYPE,
    DEFAULT_SIMILARITY_FUNCTION,
};
