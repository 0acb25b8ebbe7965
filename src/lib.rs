//! Schemapath aligns a streaming XML document against a schema that has been
//! precompiled into a content-model state machine, committing the single
//! traversal — the *path* — consistent with both.
//!
//! This crate re-exports the workspace members:
//!
//! - [model] — the immutable state machine, its builder and text notation
//! - [sax] — document events, the namespace registry and validation seams
//! - [matcher] — the backtracking path finder itself
//! - [config] — config files mapping document stems to grammar files
//!
//! ```
//! use schemapath::matcher::PathFinder;
//! use schemapath::model::parse_grammar;
//! use schemapath::sax::EventScript;
//!
//! let machine = parse_grammar("element root { choice * { element A, element B } }")?;
//! let mut finder = PathFinder::new(&machine);
//! EventScript::parse(
//!     "
//!     start root
//!     start B
//!     end B
//!     end root
//!     ",
//! )?
//! .drive(&mut finder)?;
//! assert!(finder.render_path().contains("child element B"));
//! # Ok::<(), anyhow::Error>(())
//! ```
#![warn(missing_docs)]

pub use schemapath_config as config;
pub use schemapath_matcher as matcher;
pub use schemapath_model as model;
pub use schemapath_sax as sax;
