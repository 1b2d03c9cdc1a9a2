//! Vector similarity search and vector indexes

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ArcadeError, ArcadeResult};
use crate::query::literal::{is_identifier, quote};
use crate::query::{into_rows, Dispatcher};
use crate::transaction::Session;

use super::chain::FallbackChain;

/// Similarity function used when none is given
pub const DEFAULT_SIMILARITY_FUNCTION: &str = "cosine_similarity";

/// Default index algorithm
pub const DEFAULT_INDEX_TYPE: &str = "HNSW";

const DEFAULT_TOP_K: i64 = 10;

/// A non-empty vector of finite numbers
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f64>);

impl Embedding {
    pub fn new(values: Vec<f64>) -> ArcadeResult<Self> {
        if values.is_empty() {
            return Err(ArcadeError::validation(
                "Query embedding must be a non-empty list of numbers",
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ArcadeError::validation(
                "Query embedding must contain only finite numbers",
            ));
        }
        Ok(Self(values))
    }

    /// Build from loosely typed JSON values
    pub fn from_values(values: &[Value]) -> ArcadeResult<Self> {
        if values.is_empty() {
            return Err(ArcadeError::validation(
                "Query embedding must be a non-empty list of numbers",
            ));
        }
        let numbers = values
            .iter()
            .map(Value::as_f64)
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| {
                ArcadeError::validation("Query embedding must contain only numeric values")
            })?;
        Self::new(numbers)
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Array literal, e.g. `[0.1,0.2]`
    pub fn to_literal(&self) -> String {
        Value::from(self.0.clone()).to_string()
    }
}

/// A validated top-k similarity query
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSearch {
    type_name: String,
    field: String,
    embedding: Embedding,
    top_k: usize,
    filter: Option<String>,
}

impl VectorSearch {
    pub fn new(
        type_name: impl Into<String>,
        field: impl Into<String>,
        embedding: Embedding,
        top_k: i64,
    ) -> ArcadeResult<Self> {
        if top_k <= 0 {
            return Err(ArcadeError::validation("top_k must be a positive integer"));
        }
        Ok(Self {
            type_name: type_name.into(),
            field: field.into(),
            embedding,
            top_k: top_k as usize,
            filter: None,
        })
    }

    /// Restrict candidates with a WHERE condition
    pub fn filter(mut self, where_clause: impl Into<String>) -> Self {
        let where_clause = where_clause.into();
        self.filter = Some(where_clause).filter(|w| !w.trim().is_empty());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn to_sql(&self) -> String {
        let mut query = format!(
            "SELECT *, {}({}, {}) as similarity_score FROM {}",
            DEFAULT_SIMILARITY_FUNCTION,
            self.field,
            self.embedding.to_literal(),
            self.type_name
        );
        if let Some(filter) = &self.filter {
            query.push_str(&format!(" WHERE {}", filter));
        }
        query.push_str(&format!(" ORDER BY similarity_score DESC LIMIT {}", self.top_k));
        query
    }
}

/// One entry of a batch search request
#[derive(Debug, Clone, Deserialize)]
pub struct VectorSearchSpec {
    pub type_name: String,
    pub embedding_field: String,
    pub query_embedding: Vec<Value>,
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    #[serde(default)]
    pub where_clause: Option<String>,
}

fn default_top_k() -> i64 {
    DEFAULT_TOP_K
}

impl VectorSearchSpec {
    pub fn build(&self) -> ArcadeResult<VectorSearch> {
        let embedding = Embedding::from_values(&self.query_embedding)?;
        let search = VectorSearch::new(&self.type_name, &self.embedding_field, embedding, self.top_k)?;
        Ok(match &self.where_clause {
            Some(filter) => search.filter(filter.as_str()),
            None => search,
        })
    }
}

/// Vector operations for one database
#[derive(Debug, Clone, Copy)]
pub struct VectorOps<'a> {
    dispatcher: Dispatcher<'a>,
}

impl<'a> VectorOps<'a> {
    pub fn new(dispatcher: Dispatcher<'a>) -> Self {
        Self { dispatcher }
    }

    /// Records ordered by descending similarity, at most `top_k`
    pub fn search(&self, search: &VectorSearch, session: Option<&Session>) -> ArcadeResult<Vec<Value>> {
        self.dispatcher
            .sql(&search.to_sql(), session)
            .map(into_rows)
            .map_err(|err| {
                if err.is_access_failure() {
                    return err;
                }
                ArcadeError::vector(
                    format!("Vector search failed for type {}", search.type_name),
                    Some(search.embedding.dimensions()),
                )
                .with_type_name(search.type_name.as_str())
                .with_cause(err)
            })
    }

    /// Create a vector index, degrading the syntax until the server accepts
    /// one. Returns the index name.
    pub fn create_index(
        &self,
        type_name: &str,
        property: &str,
        dimensions: i64,
        index_type: &str,
        session: Option<&Session>,
    ) -> ArcadeResult<String> {
        if dimensions <= 0 {
            return Err(ArcadeError::validation(
                "Dimensions must be a positive integer",
            ));
        }
        if property.trim().is_empty() {
            return Err(ArcadeError::validation(
                "Property name must be a non-empty string",
            ));
        }

        let name = format!("{}_{}_vector_idx", type_name, property);
        let base = format!("CREATE INDEX {} ON {} ({})", name, type_name, property);
        let statements = [
            format!("{} VECTOR {} DIMENSIONS {}", base, index_type, dimensions),
            format!("{} VECTOR({})", base, dimensions),
            base.clone(),
        ];

        let index = name.as_str();
        let mut chain = FallbackChain::on_any_error("vector-index");
        for (statement, label) in statements.iter().zip(["vector", "dimensions-only", "plain"]) {
            chain = chain.then(label, move || {
                self.dispatcher.sql_command(statement, session)?;
                tracing::info!(index, statement = statement.as_str(), "created vector index");
                Ok(())
            });
        }

        chain.run().map_err(|err| {
            ArcadeError::vector(
                format!("Failed to create vector index on {}.{}", type_name, property),
                Some(dimensions as usize),
            )
            .with_type_name(type_name)
            .with_cause(err)
        })?;
        Ok(name)
    }

    /// Similarity between `embedding` and one record's vector; 0.0 when the
    /// record is not found
    pub fn similarity(
        &self,
        type_name: &str,
        field: &str,
        record_id: &str,
        embedding: &Embedding,
        function: Option<&str>,
        session: Option<&Session>,
    ) -> ArcadeResult<f64> {
        let function = function.unwrap_or(DEFAULT_SIMILARITY_FUNCTION);
        if !is_identifier(function) {
            return Err(ArcadeError::validation(format!(
                "Invalid similarity function name: {}",
                function
            )));
        }

        let query = format!(
            "SELECT {}({}, {}) as similarity FROM {} WHERE @rid = {}",
            function,
            field,
            embedding.to_literal(),
            type_name,
            quote(record_id)
        );
        let rows = self
            .dispatcher
            .sql(&query, session)
            .map(into_rows)
            .map_err(|err| {
                if err.is_access_failure() {
                    return err;
                }
                ArcadeError::vector(
                    format!("Failed to calculate vector similarity for record {}", record_id),
                    Some(embedding.dimensions()),
                )
                .with_cause(err)
            })?;

        Ok(rows
            .first()
            .and_then(|row| row.get("similarity"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0))
    }

    /// Run several searches; a failed search yields an empty list.
    ///
    /// Every entry is parsed and validated before the first search is sent,
    /// so a malformed batch sends nothing. Connection and authentication
    /// failures abort the batch.
    pub fn batch_search(
        &self,
        searches: &[Value],
        session: Option<&Session>,
    ) -> ArcadeResult<Vec<Vec<Value>>> {
        if searches.is_empty() {
            return Err(ArcadeError::validation(
                "Searches must be a non-empty list of search configurations",
            ));
        }

        let prepared = searches
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                VectorSearchSpec::deserialize(raw)
                    .map_err(|e| e.to_string())
                    .and_then(|spec| spec.build().map_err(|e| e.message().to_string()))
                    .map_err(|reason| {
                        ArcadeError::validation(format!(
                            "Search configuration {} is invalid: {}",
                            index, reason
                        ))
                    })
            })
            .collect::<ArcadeResult<Vec<_>>>()?;

        let mut failed = 0;
        let mut results = Vec::with_capacity(prepared.len());
        for (index, search) in prepared.iter().enumerate() {
            match self.search(search, session) {
                Ok(rows) => results.push(rows),
                Err(err) if err.is_access_failure() => return Err(err),
                Err(err) => {
                    tracing::error!(search = index, error = %err, "vector search failed");
                    failed += 1;
                    results.push(Vec::new());
                }
            }
        }

        if failed == prepared.len() {
            return Err(ArcadeError::vector("All vector searches in batch failed", None));
        }
        Ok(results)
    }
}
