//! # yaml-engine
//!
//! A YAML 1.2 load pipeline: text goes through a reader, a scanner, a
//! parser and a composer, and comes out as a graph of nodes with tags,
//! anchors, comments and source marks.
//!
//! ## Module Organization
//!
//! - [`reader`] - Code point stream with lookahead, marks and decoding
//! - [`scanner`] - Tokens, including simple-key and indentation tracking
//! - [`parser`] - Events, driven by an explicit production stack
//! - [`resolver`] - Schemas and implicit tag resolution
//! - [`composer`] - Node graphs, anchors, aliases and merge keys
//!
//! ## Quick Start
//!
//! ```
//! use yaml_engine::{compose, LoadSettings, Tag};
//!
//! let text = "defaults: &d {retries: 3}\nservice:\n  <<: *d\n  name: api\n";
//! let doc = compose(text, &LoadSettings::default()).unwrap().unwrap();
//!
//! let retries = doc.lookup(&["service", "retries"]).unwrap();
//! assert_eq!(doc.scalar(retries), Some("3"));
//! assert_eq!(doc[retries].tag, Tag::INT);
//! ```
//!
//! ## Features
//!
//! - `serde` - Enable serialization/deserialization of marks and style enums

// =============================================================================
// Data model
// =============================================================================

pub mod anchor;
pub mod comments;
pub mod common;
pub mod error;
pub mod events;
pub mod mark;
pub mod nodes;
pub mod tag;
pub mod tokens;

// =============================================================================
// Pipeline stages
// =============================================================================

/// Code point reader.
pub mod reader;

/// Tokenizer.
pub mod scanner;

/// Event parser.
pub mod parser;

/// Schemas and scalar resolution.
pub mod resolver;

/// Node graph composer.
pub mod composer;

/// Load settings.
pub mod settings;

mod load;

// =============================================================================
// Public re-exports
// =============================================================================

pub use anchor::Anchor;
pub use comments::CommentLine;
pub use common::{CommentType, FlowStyle, ScalarStyle, SpecVersion};
pub use composer::Composer;
pub use error::{MarkedError, Result, YamlError};
pub use events::{Event, EventId, EventKind, ImplicitTuple};
pub use load::{compose, compose_all, compose_bytes, parse};
pub use mark::Mark;
pub use nodes::{Document, Node, NodeData, NodeId, NodeTuple};
pub use parser::Parser;
pub use reader::{Encoding, ReaderError, StreamReader};
pub use resolver::{CoreSchema, FailsafeSchema, JsonSchema, ScalarResolver, ScalarValue, Schema};
pub use scanner::Scanner;
pub use settings::{LineBreaks, LoadSettings};
pub use tag::Tag;
pub use tokens::{Directive, Token, TokenId, TokenKind};
