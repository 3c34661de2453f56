//! Rich diagnostic error types for the noema engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so callers know what went wrong and how
//! to fix it. [`NoemaError`] wraps them all for the engine facade.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the noema engine.
#[derive(Debug, Error, Diagnostic)]
pub enum NoemaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fusion(#[from] FusionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum QueryError {
    #[error("query is empty")]
    #[diagnostic(
        code(noema::query::empty),
        help("Provide a query containing at least one non-whitespace character.")
    )]
    Empty,

    #[error("query is {length} characters long, the limit is {limit}")]
    #[diagnostic(
        code(noema::query::too_long),
        help(
            "Shorten the query or raise `max_query_len` in the engine configuration. \
             Very long queries are rejected before any graph work is done."
        )
    )]
    TooLong { length: usize, limit: usize },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("node not found: {id}")]
    #[diagnostic(
        code(noema::graph::node_not_found),
        help(
            "Both endpoints of an edge must exist before the edge is added. \
             Insert the node with `add_node` first."
        )
    )]
    NodeNotFound { id: String },

    #[error("domain not found: {id}")]
    #[diagnostic(
        code(noema::graph::domain_not_found),
        help("The domain id is not registered. List known domains with `noema domains`.")
    )]
    DomainNotFound { id: String },

    #[error("invalid node id: {reason}")]
    #[diagnostic(
        code(noema::graph::invalid_id),
        help("Node ids must be non-empty and contain no surrounding whitespace.")
    )]
    InvalidId { reason: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(noema::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(noema::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             This may indicate corruption; try running with a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(noema::store::serde),
        help(
            "Failed to serialize or deserialize the store snapshot. \
             The stored format may come from an incompatible version."
        )
    )]
    Serialization { message: String },

    #[error("flush worker is not running")]
    #[diagnostic(
        code(noema::store::flusher_stopped),
        help("The background flush thread has shut down. Call `Engine::persist` to save synchronously.")
    )]
    FlusherStopped,
}

// ---------------------------------------------------------------------------
// Fusion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FusionError {
    #[error("scorer {scorer} failed: {message}")]
    #[diagnostic(
        code(noema::fusion::scorer_failed),
        help(
            "A single scorer failure does not fail the query: the scorer is excluded \
             and the remaining confidences are renormalised."
        )
    )]
    ScorerFailed { scorer: String, message: String },

    #[error("all {count} scorers failed")]
    #[diagnostic(
        code(noema::fusion::all_failed),
        help("No scorer produced a confidence. Check the warnings logged for each scorer.")
    )]
    AllFailed { count: usize },

    #[error("scorer {scorer} has non-positive weight {weight}")]
    #[diagnostic(
        code(noema::fusion::invalid_weight),
        help("Scorer importance weights must be strictly positive.")
    )]
    InvalidWeight { scorer: String, weight: f64 },
}

// ---------------------------------------------------------------------------
// Seed errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SeedError {
    #[error("seed pack not found: \"{id}\"")]
    #[diagnostic(
        code(noema::seed::not_found),
        help("Use the bundled `core` pack, or point `seed_pack` at a directory containing a seed.toml.")
    )]
    NotFound { id: String },

    #[error("failed to parse seed pack \"{id}\": {message}")]
    #[diagnostic(
        code(noema::seed::parse),
        help("Check the seed.toml syntax against the bundled `data/seeds/core/seed.toml`.")
    )]
    Parse { id: String, message: String },

    #[error("failed to read seed file: {path}")]
    #[diagnostic(code(noema::seed::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to apply seed \"{id}\": {message}")]
    #[diagnostic(
        code(noema::seed::apply),
        help("Every edge, relation and association must reference a node declared in the pack.")
    )]
    Apply { id: String, message: String },
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(noema::engine::invalid_config),
        help("Check the EngineConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("data directory error: {path}")]
    #[diagnostic(
        code(noema::engine::data_dir),
        help(
            "Could not create or access the data directory. \
             Check that the path is writable."
        )
    )]
    DataDir { path: String },

    #[error("failed to read configuration file {path}: {message}")]
    #[diagnostic(
        code(noema::engine::config_file),
        help("The configuration file must be valid TOML matching the EngineConfig fields.")
    )]
    ConfigFile { path: String, message: String },
}

/// Result type alias for the top-level engine API.
pub type NoemaResult<T> = std::result::Result<T, NoemaError>;

/// Result type for query validation.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Result type for fusion scorers.
pub type FusionResult<T> = std::result::Result<T, FusionError>;

/// Result type for seed-pack operations.
pub type SeedResult<T> = std::result::Result<T, SeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsystem_errors_convert_into_top_level() {
        let err: NoemaError = QueryError::Empty.into();
        assert!(matches!(err, NoemaError::Query(QueryError::Empty)));

        let err: NoemaError = GraphError::NodeNotFound { id: "x".into() }.into();
        assert!(matches!(err, NoemaError::Graph(GraphError::NodeNotFound { .. })));
    }

    #[test]
    fn diagnostics_carry_codes() {
        let err = QueryError::TooLong {
            length: 1200,
            limit: 1000,
        };
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("noema::query::too_long"));
        assert_eq!(err.to_string(), "query is 1200 characters long, the limit is 1000");
    }

    #[test]
    fn transparent_diagnostic_keeps_inner_code() {
        let err: NoemaError = StoreError::FlusherStopped.into();
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("noema::store::flusher_stopped"));
    }
}
