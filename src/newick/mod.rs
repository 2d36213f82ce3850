//! Newick format parser and writer for rooted trees.
//!
//! This module provides [`NewickParser`] to parse Newick strings into
//! [`Tree`]s and [`to_newick`] to write them back.
//!
//! # Quick API
//! * [`parse_file`] - parses all trees in a file
//! * [`parse_str`] - parses a single string
//!
//! # Format
//! * `tree ::= vertex ';'`
//! * `vertex ::= leaf | internal_vertex`
//! * `internal_vertex ::= '(' vertex (',' vertex)* ')' [label] [branch_length]`
//! * `leaf ::= label [branch_length]`
//! * `branch_length ::= ':' number`
//!
//! Furthermore:
//! * Vertices may have any number of children, including one
//! * Internal labels become vertex names; unnamed internal vertices get
//!   generated names (`n<k>`) that do not clash with parsed names
//! * Whitespace and `[...]` comments can occur between elements

mod defs;
mod parser;
pub mod writer;

pub use self::parser::NewickParser;
pub use self::writer::{NewickStyle, to_newick, write_newick};

use crate::model::Tree;
use crate::parser::ByteParser;
use crate::parser::ParsingError;
use std::path::Path;

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a file containing a semicolon-separated list of Newick strings.
///
/// # Example
/// ```no_run
/// use dlcrecon::newick::parse_file;
///
/// let trees = parse_file("gene_trees.nwk")?;
/// println!("Parsed {} trees", trees.len());
/// # Ok::<(), dlcrecon::parser::ParsingError>(())
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Tree>, ParsingError> {
    let byte_parser = ByteParser::from_file(path)?;
    NewickParser::new().parse_all(byte_parser)
}

/// Parses a single Newick string.
///
/// # Example
/// ```
/// use dlcrecon::newick::parse_str;
///
/// let tree = parse_str("((human,chimp)hc,gorilla);")?;
/// assert_eq!(tree.num_leaves(), 3);
/// assert!(tree.find("hc").is_some());
/// # Ok::<(), dlcrecon::parser::ParsingError>(())
/// ```
pub fn parse_str<S: AsRef<str>>(newick: S) -> Result<Tree, ParsingError> {
    let mut byte_parser = ByteParser::from_str(newick.as_ref());
    NewickParser::new().parse_str(&mut byte_parser)
}
