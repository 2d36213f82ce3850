//! Newick format writing.

use crate::model::{BranchLength, Tree, VertexIndex};
use crate::parser::utils::escape_label;
use std::io::{self, Write};

/// Extra buffer in Newick string length/capacity estimate
const BUFFER_CHARS: usize = 10;

/// Style for serializing a tree to Newick format,
/// controlling which vertex names appear in the output string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewickStyle {
    /// Only leaf names
    Leaves,
    /// Leaf and internal vertex names (lossless for reconciliation files)
    Internal,
}

/// Writes the given trees in Newick format, one tree per line.
///
/// # Errors
/// Returns an I/O error if writing fails.
pub fn write_newick<W: Write>(
    writer: &mut W,
    trees: &[Tree],
    style: NewickStyle,
    branch_lengths: bool,
) -> io::Result<()> {
    for tree in trees {
        writer.write_all(to_newick(tree, style, branch_lengths).as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Returns the Newick representation of this tree with closing semicolon.
///
/// Children are written in their stored order. Names are escaped if needed.
///
/// # Example
/// ```
/// use dlcrecon::model::{BranchLength, Tree};
/// use dlcrecon::newick::{to_newick, NewickStyle};
///
/// let mut tree = Tree::new();
/// let a = tree.add_leaf("A", Some(BranchLength::new(1.0)));
/// let b = tree.add_leaf("B", Some(BranchLength::new(2.0)));
/// tree.add_root(vec![a, b], Some("R"));
///
/// assert_eq!(to_newick(&tree, NewickStyle::Leaves, true), "(A:1,B:2);");
/// assert_eq!(to_newick(&tree, NewickStyle::Internal, false), "(A,B)R;");
/// ```
pub fn to_newick(tree: &Tree, style: NewickStyle, branch_lengths: bool) -> String {
    // Helper for adding branch lengths
    fn build_newick_branch_length(newick: &mut String, branch_length: Option<BranchLength>) {
        if let Some(branch_length) = branch_length {
            newick.push(':');
            newick.push_str(&branch_length.to_string());
        }
    }

    // Recursive helper for building the Newick string
    fn build_newick(
        tree: &Tree,
        newick: &mut String,
        index: VertexIndex,
        style: NewickStyle,
        branch_lengths: bool,
    ) {
        let vertex = &tree[index];

        if vertex.is_leaf() {
            newick.push_str(&escape_label(vertex.name()));
        } else {
            newick.push('(');
            for (i, &child) in vertex.children().iter().enumerate() {
                if i > 0 {
                    newick.push(',');
                }
                build_newick(tree, newick, child, style, branch_lengths);
            }
            newick.push(')');
            if style == NewickStyle::Internal {
                newick.push_str(&escape_label(vertex.name()));
            }
        }

        if branch_lengths && !vertex.is_root() {
            build_newick_branch_length(newick, vertex.branch_length());
        }
    }

    if !tree.is_root_set() {
        return String::new();
    }

    let mut newick = String::with_capacity(estimate_newick_len(tree, style, branch_lengths));
    build_newick(tree, &mut newick, tree.root_index(), style, branch_lengths);
    newick.push(';');

    newick
}

/// Estimates the length of a Newick string for a given tree.
fn estimate_newick_len(tree: &Tree, style: NewickStyle, branch_lengths: bool) -> usize {
    // Each vertex: "(", ",", ")" ~= 2 chars
    const STRUCTURE_CHARS: usize = 2;
    // Branch lengths: ~20 chars each (e.g., ":0.009529961339106089")
    const BRANCH_LENGTH_CHARS: usize = 20;

    let label_capacity: usize = tree
        .vertices()
        .iter()
        .filter(|v| v.is_leaf() || style == NewickStyle::Internal)
        .map(|v| v.name().len())
        .sum();
    let branch_capacity = if branch_lengths {
        tree.num_vertices() * BRANCH_LENGTH_CHARS
    } else {
        0
    };

    tree.num_vertices() * STRUCTURE_CHARS + label_capacity + branch_capacity + BUFFER_CHARS
}
