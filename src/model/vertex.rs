//! Vertex module for rooted tree representation.

use crate::model::tree::VertexIndex;
use std::ops::Deref;

// =#========================================================================#=
// VERTEX
// =#========================================================================#=
/// Represents a vertex (node) in a rooted tree.
///
/// Species trees, gene (coalescent) trees and locus trees all use the same
/// vertex type. A vertex may have any number of children: zero for a leaf,
/// one for the implied speciation and duplication vertices the reconciliation
/// engines insert, two or more for regular (possibly multifurcating) vertices.
///
/// # Invariants
/// - `index` is the index in the arena and never changes
/// - `parent` is `None` only for the root (or before the vertex is attached)
/// - `name` is unique within its tree (enforced by [Tree](crate::model::Tree))
/// - `branch_length` is non-negative if present
#[derive(PartialEq, Debug, Clone)]
pub struct Vertex {
    /// Index of this vertex in the tree arena
    index: VertexIndex,
    /// Index of the parent vertex
    parent: Option<VertexIndex>,
    /// Indices of the child vertices, in insertion order
    children: Vec<VertexIndex>,
    /// Name (leaf label, or generated/parsed internal name)
    name: String,
    /// Distance to parent vertex (optional, non-negative if present)
    branch_length: Option<BranchLength>,
}

impl Vertex {
    /// Creates a new vertex without parent.
    ///
    /// # Arguments
    /// * `index` - The unique index of this vertex in the tree (arena)
    /// * `name` - Name of the vertex
    /// * `children` - Child indices (empty for a leaf)
    /// * `branch_length` - Distance to parent vertex
    pub(crate) fn new(
        index: VertexIndex,
        name: String,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
    ) -> Self {
        Self {
            index,
            parent: None,
            children,
            name,
            branch_length,
        }
    }

    /// Returns the index of this vertex.
    pub fn index(&self) -> VertexIndex {
        self.index
    }

    /// Returns the name of this vertex.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Returns the branch length, if any.
    pub fn branch_length(&self) -> Option<BranchLength> {
        self.branch_length
    }

    /// Returns `true` if this vertex has a [BranchLength].
    pub fn has_branch_length(&self) -> bool {
        self.branch_length.is_some()
    }

    /// Returns `true` if this vertex is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns `true` if this vertex has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns `true` if this vertex has exactly one child.
    pub fn is_unary(&self) -> bool {
        self.children.len() == 1
    }

    /// Returns the children of this vertex (empty for leaves).
    pub fn children(&self) -> &[VertexIndex] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<VertexIndex> {
        &mut self.children
    }

    /// Returns the index of the parent, or `None` for the root.
    pub fn parent(&self) -> Option<VertexIndex> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<VertexIndex>) {
        self.parent = parent;
    }
}

// =#========================================================================#=
// BRANCH LENGTH
// =#========================================================================#=
/// Branch length in a tree, enforced non-negative.
///
/// Branch lengths are carried through parsing and writing but are irrelevant
/// to topology-level reconciliation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchLength(f64);

impl BranchLength {
    /// Creates a new branch length.
    ///
    /// # Panics
    /// Panics if `length` is negative or not finite.
    pub fn new(length: f64) -> Self {
        assert!(length >= 0.0, "Branch length must be non-negative, got {}", length);
        assert!(length.is_finite(), "Branch length must be finite, got {}", length);
        BranchLength(length)
    }

    /// Creates a branch length if `length` is non-negative and finite.
    pub fn try_new(length: f64) -> Option<Self> {
        (length >= 0.0 && length.is_finite()).then_some(BranchLength(length))
    }
}

impl Deref for BranchLength {
    type Target = f64;
    fn deref(&self) -> &f64 {
        &self.0
    }
}
