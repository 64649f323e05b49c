//! # tablecheck core
//!
//! Core data model and rule algebra for tablecheck: declarative data-quality
//! assertions against relational stores.
//!
//! A catalog of datasources, tables, and fields owns a set of rules. Each
//! rule compiles to a falsifying query, a query that returns exactly the
//! rows violating the assertion, and the execution engine (the
//! `tablecheck_engine` crate) classifies what comes back into a typed
//! pass/fail result that explains itself without re-querying.
//!
//! ## Key concepts
//!
//! - **Rule**: one declarative assertion about a table's shape or a
//!   column's content, as a closed tagged union per family
//! - **Predicate compiler**: turns a rule into dialect-aware SQL text
//! - **Value codec**: type-directed conversion between literals, raw result
//!   cells, and a rule's declared value domain
//! - **Validation**: pure structural checks combined through an
//!   error-accumulating monoid
//! - **Result taxonomy**: the closed set of Passed/Failed outcome shapes
//!
//! ## Example
//!
//! ```rust
//! use tablecheck_core::builder::{DatasourceBuilder, TableBuilder, TestSuiteBuilder, text_field};
//! use tablecheck_core::dialect::SqlDialect;
//!
//! let suite = TestSuiteBuilder::new()
//!     .datasource(
//!         DatasourceBuilder::new("dw", SqlDialect::Sqlite).table(
//!             TableBuilder::new("customer")
//!                 .rows_should_be_between(1, 100)
//!                 .field(text_field("name").should_start_with("M")),
//!         ),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert!(suite.validate_rules().is_valid());
//! for rule in suite.rules() {
//!     println!("{}", rule.description());
//! }
//! ```

pub mod builder;
pub mod catalog;
pub mod codec;
pub mod dialect;
pub mod error;
pub mod result;
pub mod rule;
pub mod sql;
pub mod validate;
pub mod value;

pub use builder::*;
pub use catalog::*;
pub use codec::*;
pub use dialect::*;
pub use error::*;
pub use result::*;
pub use rule::*;
pub use validate::*;
pub use value::*;
