//! Newick parser building [Tree]s.

use crate::model::tree::DEFAULT_INTERNAL_PREFIX;
use crate::model::{BranchLength, Tree, VertexIndex};
use crate::newick::defs::{DEFAULT_NUM_VERTICES_GUESS, NEWICK_LABEL_DELIMITERS};
use crate::parser::{ByteParser, ParsingError};
use std::collections::HashSet;

// =#========================================================================#=
// NEWICK PARSER
// =#========================================================================#=
/// Parser for Newick strings.
///
/// Parses rooted trees with any number of children per vertex, optional
/// internal names and optional branch lengths.
///
/// # Example
/// ```
/// use dlcrecon::newick::NewickParser;
/// use dlcrecon::parser::ByteParser;
///
/// let mut byte_parser = ByteParser::from_str("(A:1,B:2,(C,D)x)root; (A,B);");
/// let trees = NewickParser::new().with_internal_prefix("v").parse_all(byte_parser)?;
/// assert_eq!(trees.len(), 2);
/// assert_eq!(trees[0].root().children().len(), 3);
/// # Ok::<(), dlcrecon::parser::ParsingError>(())
/// ```
#[derive(Debug, Clone)]
pub struct NewickParser {
    /// Capacity guess for the vertex arena; updated after each parsed tree
    num_vertices: usize,
    /// Prefix of generated names of unnamed internal vertices
    internal_prefix: String,
}

/// Vertex as read from the string, before names are finalized.
struct ParsedVertex {
    name: Option<String>,
    children: Vec<ParsedVertex>,
    branch_length: Option<BranchLength>,
}

impl Default for NewickParser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// New, Configuration (pub)
// ============================================================================
impl NewickParser {
    /// Creates a new parser with default settings.
    pub fn new() -> Self {
        Self {
            num_vertices: DEFAULT_NUM_VERTICES_GUESS,
            internal_prefix: DEFAULT_INTERNAL_PREFIX.to_string(),
        }
    }

    /// Sets the expected number of vertices per tree.
    pub fn with_num_vertices(mut self, num_vertices: usize) -> Self {
        self.num_vertices = num_vertices;
        self
    }

    /// Sets the prefix of generated names for unnamed internal vertices.
    pub fn with_internal_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.internal_prefix = prefix.into();
        self
    }
}

// ============================================================================
// API Parsing (pub)
// ============================================================================
impl NewickParser {
    /// Parses all Newick trees until EOF.
    ///
    /// # Returns
    /// * `Ok(Vec<Tree>)` - All parsed trees
    /// * `Err(ParsingError)` - If any tree fails to parse
    pub fn parse_all(&mut self, mut byte_parser: ByteParser) -> Result<Vec<Tree>, ParsingError> {
        let mut trees = Vec::new();
        loop {
            byte_parser.skip_comment_and_whitespace()?;
            if byte_parser.is_eof() {
                break;
            }
            trees.push(self.parse_str(&mut byte_parser)?);
        }
        Ok(trees)
    }

    /// Parses a single Newick tree from the given [ByteParser].
    ///
    /// # Errors
    /// If the string is not valid Newick, a leaf label is empty or used
    /// twice, or a branch length is negative.
    pub fn parse_str(&mut self, parser: &mut ByteParser) -> Result<Tree, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        let root = self.parse_vertex(parser)?;

        // Consume the terminating semicolon
        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b';') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ';' at end of tree but found {:?}", next_char),
            ));
        }

        let tree = self.build_tree(root, parser)?;
        self.num_vertices = tree.num_vertices();
        Ok(tree)
    }
}

// ============================================================================
// Parsing
// ============================================================================
impl NewickParser {
    /// Parses a vertex (either internal vertex or leaf):
    /// - Skips leading comments and whitespace
    /// - `(children)[label][:branch_length]` or `label[:branch_length]`
    fn parse_vertex(&mut self, parser: &mut ByteParser) -> Result<ParsedVertex, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if parser.peek_is(b'(') {
            let children = self.parse_children(parser)?;
            let label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
            let branch_length = self.parse_branch_length(parser)?;
            Ok(ParsedVertex {
                name: (!label.is_empty()).then_some(label),
                children,
                branch_length,
            })
        } else {
            let label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
            if label.is_empty() {
                let next_char = parser.peek().map(char::from);
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    format!("Expected leaf label but found {:?}", next_char),
                ));
            }
            let branch_length = self.parse_branch_length(parser)?;
            Ok(ParsedVertex {
                name: Some(label),
                children: Vec::new(),
                branch_length,
            })
        }
    }

    /// Parses `(vertex, vertex, ...)`; expects parser at opening `(`.
    fn parse_children(&mut self, parser: &mut ByteParser) -> Result<Vec<ParsedVertex>, ParsingError> {
        parser.consume_if(b'(');
        let mut children = vec![self.parse_vertex(parser)?];
        loop {
            parser.skip_comment_and_whitespace()?;
            if parser.consume_if(b',') {
                children.push(self.parse_vertex(parser)?);
            } else if parser.consume_if(b')') {
                return Ok(children);
            } else if parser.is_eof() {
                return Err(ParsingError::unexpected_eof(parser));
            } else {
                let next_char = parser.peek().map(char::from);
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    format!("Expected ',' or ')' after child but found {:?}", next_char),
                ));
            }
        }
    }

    /// Parses optional branch length `[:number]`:
    /// - Skips comments/whitespace before and after `:`
    /// - Supports scientific notation (e.g., `1.5e-10`)
    fn parse_branch_length(&mut self, parser: &mut ByteParser) -> Result<Option<BranchLength>, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b':') {
            return Ok(None);
        }
        parser.skip_comment_and_whitespace()?;
        let value = parser.parse_number()?;
        BranchLength::try_new(value)
            .map(Some)
            .ok_or_else(|| ParsingError::negative_branch_length(parser, value))
    }

    /// Turns the parsed vertices into a [Tree]:
    /// - leaf labels must be unique
    /// - repeated internal labels (e.g. support values) are dropped
    /// - unnamed internal vertices get generated names not used elsewhere
    fn build_tree(&self, root: ParsedVertex, parser: &ByteParser) -> Result<Tree, ParsingError> {
        // Collect explicit names first, so generated ones never clash
        let mut used: HashSet<String> = HashSet::new();
        let mut leaf_labels: HashSet<String> = HashSet::new();
        let mut stack = vec![&root];
        while let Some(vertex) = stack.pop() {
            if let Some(name) = &vertex.name {
                if vertex.children.is_empty() && !leaf_labels.insert(name.clone()) {
                    return Err(ParsingError::duplicate_label(parser, name.clone()));
                }
                used.insert(name.clone());
            }
            stack.extend(vertex.children.iter());
        }

        let mut tree = Tree::with_capacity(self.num_vertices);
        let mut counter = 0;
        let root_index = self.add_vertex(&mut tree, root, &leaf_labels, &used, &mut counter);
        tree.set_root(root_index);
        Ok(tree)
    }

    fn add_vertex(
        &self,
        tree: &mut Tree,
        vertex: ParsedVertex,
        leaf_labels: &HashSet<String>,
        used: &HashSet<String>,
        counter: &mut usize,
    ) -> VertexIndex {
        if vertex.children.is_empty() {
            // Leaf labels are unique and always present
            let name = vertex.name.unwrap_or_default();
            return tree.add_leaf(name, vertex.branch_length);
        }

        let children: Vec<VertexIndex> = vertex
            .children
            .into_iter()
            .map(|child| self.add_vertex(tree, child, leaf_labels, used, counter))
            .collect();
        let name = match vertex.name {
            Some(name) if tree.find(&name).is_none() && !leaf_labels.contains(&name) => name,
            _ => loop {
                let candidate = format!("{}{}", self.internal_prefix, *counter);
                *counter += 1;
                if !used.contains(&candidate) && tree.find(&candidate).is_none() {
                    break candidate;
                }
            },
        };
        tree.add_internal(children, Some(&name), vertex.branch_length)
    }
}
