//! Backend-neutral graph commands and their translation to query scripts.
//!
//! A [`Bag`] describes one create, retrieve, update or delete operation
//! without committing to a database dialect. A [`Builder`] assembles Bags,
//! [`Bag::validate`] checks their invariants, and a [`Processor`] turns
//! them into a [`Command`]: the literal script plus its [`Language`].
//!
//! ## Dialects
//!
//! - [`OrientDbProcessor`]: OrientDB SQL, including `begin` .. `commit`
//!   batches for multi-record creates and chained Bags
//! - [`CypherProcessor`]: single-statement Cypher
//!
//! Requests a dialect cannot express fail with
//! [`RenderError::NotSupported`], so callers can branch on
//! [`QueryError::is_not_supported`] instead of guessing.
//!
//! ## Example
//!
//! ```
//! use weft_query::{Builder, Comparator, CypherProcessor, Processor};
//!
//! let bag = Builder::new()
//!     .select_all()
//!     .from("person")
//!     .where_("age", Comparator::Ge, 18)
//!     .build()
//!     .unwrap();
//!
//! let command = CypherProcessor::new().process(&bag).unwrap();
//! assert_eq!(command.script(), "MATCH (n:person) WHERE n.age >= 18 RETURN n");
//! ```

pub mod bag;
pub mod builder;
pub mod command;
pub mod error;
pub mod render;
pub mod validate;

pub use bag::{
    Bag, Comparator, Conjunction, Constraint, ConstraintValue, EdgeRecord, ElementType,
    EndpointRef, FieldRef, Operation, Order, Properties, Record, ResponseShape, VertexRecord,
};
pub use builder::{BaseBuilder, Builder};
pub use command::{Command, Language};
pub use error::{BatchError, BuildError, QueryError, QueryResult, RenderError, ValidationError};
pub use render::{Batch, CypherProcessor, OrientDbProcessor, Processor, StatementKind};
pub use validate::{BagRule, CoreRule, Validator};
