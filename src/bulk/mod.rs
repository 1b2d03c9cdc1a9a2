//! # Bulk mutations
//!
//! Chunked insert, upsert and delete with skipped/in-flight accounting.

mod executor;
mod statements;

pub use executor::{BulkExecutor, DEFAULT_BATCH_SIZE};
pub use statements::{
    delete_by_rids, delete_statement, insert_statement, truncate_statement, upsert_statement,
};
