//! # tablecheck engine
//!
//! Execution and classification engine for tablecheck rules. This crate
//! takes the rules defined with `tablecheck_core`, runs their compiled
//! queries through a caller-supplied [`QueryExecutor`], and classifies the
//! outcomes into the typed result taxonomy:
//!
//! - Row-count rules pass when the single returned count satisfies the bound
//! - Column rules pass when the falsifying query returns nothing (membership
//!   rules verify the returned values against the allowed set)
//! - Cross-source rules pass when both sides' aggregates agree
//!
//! Connection handling, pooling, and transactions live behind the
//! [`QueryExecutor`] seam; the engine only compiles, decodes, measures, and
//! classifies.

pub mod db_result;
mod engine;
mod error;
mod executor;

pub use engine::*;
pub use error::*;
pub use executor::*;
