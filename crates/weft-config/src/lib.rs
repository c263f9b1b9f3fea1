//! # Weft Configuration
//!
//! Dialect settings for the Weft processors: default class names, fields
//! that must never be quoted, variable names used in generated Cypher.
//!
//! Every section is optional in the TOML source; missing keys fall back
//! to the defaults that match a stock OrientDB or Neo4j installation.
//!
//! ```rust
//! use weft_config::WeftConfig;
//!
//! let config = WeftConfig::from_toml_str(
//!     r#"
//!     [orientdb]
//!     vertex_class = "Node"
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.orientdb.vertex_class, "Node");
//! assert_eq!(config.orientdb.edge_class, "E");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod dialect;
mod loader;

pub use dialect::{CypherConfig, OrientDbConfig};
pub use loader::{ConfigError, ConfigResult, WeftConfig};
