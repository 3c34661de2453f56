// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # noema
//!
//! A weighted knowledge-graph engine that answers a query by activating
//! concept nodes, fusing several independent confidence scorers, and
//! learning from every interaction.
//!
//! ## Architecture
//!
//! - **Concept graph** (`graph`): Copy-on-write weighted graph of domains,
//!   foundations, skills and strategies
//! - **Activation** (`activation`): Direct pattern matches plus one hop of
//!   propagation over outgoing edges
//! - **Fusion** (`fusion`): Four parallel scorers combined by weighted mean
//! - **Search** (`search`): Bounded recursive search over concepts and
//!   association edges
//! - **Routing** (`router`): Top-k domain selection before activation
//! - **Learning** (`learning`): Concept extraction, association
//!   reinforcement, learned domains, and the bounded interaction log
//! - **Storage** (`store`): In-memory store with redb snapshots written by a
//!   background flusher
//!
//! ## Library usage
//!
//! ```no_run
//! use noema::engine::{Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let outcome = engine.process("How do neural networks learn?").unwrap();
//! println!("{} ({:.2})", outcome.decision, outcome.final_confidence);
//! ```

pub mod activation;
pub mod cache;
pub mod concept;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod graph;
pub mod learning;
pub mod outcome;
pub mod render;
pub mod router;
pub mod search;
pub mod seeds;
pub mod store;
pub mod text;
