//! Tree module for rooted tree representation.
//!
//! This module provides the core data structure shared by species trees,
//! gene (coalescent) trees and locus trees:
//! - [Tree]: rooted tree using the arena pattern.
//! - [VertexIndex] is used to index vertices.

use crate::model::vertex::{BranchLength, Vertex};
use std::collections::HashMap;

/// Index of a vertex in a tree (arena).
pub type VertexIndex = usize;

/// Prefix of generated names for unnamed internal vertices.
pub(crate) const DEFAULT_INTERNAL_PREFIX: &str = "n";

// =#========================================================================#=
// TREE
// =#========================================================================#=
/// A rooted tree represented using the arena pattern on [Vertex].
///
/// Vertices are stored in a contiguous vector and referenced by [VertexIndex].
/// Indices are stable: vertices are never removed from an arena. Operations
/// that drop vertices (see [Tree::contract_unary]) build a new tree and
/// return the mapping from old to new indices.
///
/// # Structure
/// - All vertices are stored in the arena, index of root is maintained
/// - Every vertex carries a name, unique within the tree; unnamed internal
///   vertices get a generated name
/// - Vertices may have any number of children (unary and multifurcating
///   vertices are allowed)
///
/// # Construction
/// Bottom-up with [Tree::add_leaf], [Tree::add_internal] and [Tree::add_root],
/// or top-down with [Tree::add_root_vertex] and [Tree::add_child].
///
/// # Example
/// ```
/// use dlcrecon::model::Tree;
///
/// // Create a tree: ((A,B)AB,C);
/// let mut tree = Tree::new();
/// let a = tree.add_leaf("A", None);
/// let b = tree.add_leaf("B", None);
/// let c = tree.add_leaf("C", None);
/// let ab = tree.add_internal(vec![a, b], Some("AB"), None);
/// tree.add_root(vec![ab, c], None);
///
/// assert!(tree.is_valid());
/// assert_eq!(tree.num_leaves(), 3);
/// assert_eq!(tree.find("AB"), Some(ab));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Tree {
    /// Vertices of this tree (arena pattern)
    vertices: Vec<Vertex>,

    /// Index of the root of this tree
    root_index: Option<VertexIndex>,

    /// Lookup from vertex name to index
    names: HashMap<String, VertexIndex>,
}

// ============================================================================
// New, Construction (pub)
// ============================================================================
impl Tree {
    /// Creates a new empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty tree with capacity for `num_vertices` vertices.
    pub fn with_capacity(num_vertices: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(num_vertices),
            root_index: None,
            names: HashMap::with_capacity(num_vertices),
        }
    }

    /// Adds a leaf with the given name and returns its index.
    ///
    /// # Panics
    /// Panics if the name is already used in this tree.
    pub fn add_leaf(&mut self, name: impl Into<String>, branch_length: Option<BranchLength>) -> VertexIndex {
        self.push_vertex(name.into(), Vec::new(), branch_length)
    }

    /// Adds an internal vertex above the given children and returns its index.
    ///
    /// If `name` is `None`, a unique name is generated.
    ///
    /// # Panics
    /// Panics if the name is already used, or if a child already has a parent.
    pub fn add_internal(
        &mut self,
        children: Vec<VertexIndex>,
        name: Option<&str>,
        branch_length: Option<BranchLength>,
    ) -> VertexIndex {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.unique_name(DEFAULT_INTERNAL_PREFIX),
        };
        let index = self.vertices.len();
        for &child in &children {
            assert!(
                self.vertices[child].parent().is_none(),
                "Vertex {child} already has a parent"
            );
            self.vertices[child].set_parent(Some(index));
        }
        self.push_vertex(name, children, branch_length)
    }

    /// Adds the root vertex above the given children and returns its index.
    pub fn add_root(&mut self, children: Vec<VertexIndex>, name: Option<&str>) -> VertexIndex {
        let index = self.add_internal(children, name, None);
        self.root_index = Some(index);
        index
    }

    /// Sets the root to an existing parentless vertex (e.g. a single leaf).
    ///
    /// # Panics
    /// Panics if the vertex has a parent.
    pub fn set_root(&mut self, index: VertexIndex) {
        assert!(self.vertices[index].is_root(), "Root must not have a parent");
        self.root_index = Some(index);
    }

    /// Adds the root vertex for top-down construction and returns its index.
    pub fn add_root_vertex(&mut self, name: Option<&str>) -> VertexIndex {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.unique_name(DEFAULT_INTERNAL_PREFIX),
        };
        let index = self.push_vertex(name, Vec::new(), None);
        self.root_index = Some(index);
        index
    }

    /// Adds a new child below `parent` (top-down construction) and returns its index.
    ///
    /// If `name` is `None`, a unique name is generated.
    pub fn add_child(
        &mut self,
        parent: VertexIndex,
        name: Option<&str>,
        branch_length: Option<BranchLength>,
    ) -> VertexIndex {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.unique_name(DEFAULT_INTERNAL_PREFIX),
        };
        let index = self.push_vertex(name, Vec::new(), branch_length);
        self.vertices[index].set_parent(Some(parent));
        self.vertices[parent].children_mut().push(index);
        index
    }

    /// Inserts a new unary vertex on the edge above `child` and returns its index.
    ///
    /// The new vertex takes the place of `child` among the children of its
    /// former parent (or becomes the new root).
    pub fn insert_above(&mut self, child: VertexIndex, name: Option<&str>) -> VertexIndex {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.unique_name(DEFAULT_INTERNAL_PREFIX),
        };
        let parent = self.vertices[child].parent();
        let index = self.push_vertex(name, vec![child], None);
        self.vertices[child].set_parent(Some(index));
        self.vertices[index].set_parent(parent);
        match parent {
            Some(parent) => {
                for slot in self.vertices[parent].children_mut().iter_mut() {
                    if *slot == child {
                        *slot = index;
                    }
                }
            }
            None => self.root_index = Some(index),
        }
        index
    }

    /// Renames a vertex.
    ///
    /// # Panics
    /// Panics if the name is already used by another vertex.
    pub fn rename(&mut self, index: VertexIndex, name: impl Into<String>) {
        let name = name.into();
        if let Some(&other) = self.names.get(&name) {
            assert_eq!(other, index, "Name {name} already used in tree");
            return;
        }
        let old = self.vertices[index].name().to_string();
        self.names.remove(&old);
        self.names.insert(name.clone(), index);
        self.vertices[index].set_name(name);
    }

    /// Returns a name with the given prefix that is not used in this tree yet.
    pub fn unique_name(&self, prefix: &str) -> String {
        let mut k = self.vertices.len();
        loop {
            let candidate = format!("{prefix}{k}");
            if !self.names.contains_key(&candidate) {
                return candidate;
            }
            k += 1;
        }
    }

    fn push_vertex(
        &mut self,
        name: String,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
    ) -> VertexIndex {
        let index = self.vertices.len();
        assert!(
            !self.names.contains_key(&name),
            "Name {name} already used in tree"
        );
        self.names.insert(name.clone(), index);
        self.vertices.push(Vertex::new(index, name, children, branch_length));
        index
    }

    /// Checks if the tree is valid: root set, every vertex reachable from the
    /// root exactly once, parent and child links consistent.
    pub fn is_valid(&self) -> bool {
        let Some(root) = self.root_index else {
            return false;
        };
        if self.vertices[root].parent().is_some() {
            return false;
        }

        let mut seen = vec![false; self.vertices.len()];
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            if seen[index] {
                return false;
            }
            seen[index] = true;
            for &child in self.vertices[index].children() {
                if self.vertices[child].parent() != Some(index) {
                    return false;
                }
                stack.push(child);
            }
        }

        seen.into_iter().all(|s| s)
    }
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl Tree {
    /// Returns whether the root has been set.
    pub fn is_root_set(&self) -> bool {
        self.root_index.is_some()
    }

    /// Returns the index of the root.
    ///
    /// # Panics
    /// Panics if the root is not set.
    pub fn root_index(&self) -> VertexIndex {
        self.root_index.expect("Root not set")
    }

    /// Returns the root vertex.
    pub fn root(&self) -> &Vertex {
        &self.vertices[self.root_index()]
    }

    /// Returns the vertex with the given index.
    pub fn vertex(&self, index: VertexIndex) -> &Vertex {
        &self.vertices[index]
    }

    /// Returns all vertices in arena order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Returns the number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of leaves.
    pub fn num_leaves(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_leaf()).count()
    }

    /// Returns the parent index of a vertex (`None` for the root).
    pub fn parent(&self, index: VertexIndex) -> Option<VertexIndex> {
        self.vertices[index].parent()
    }

    /// Returns the children of a vertex.
    pub fn children(&self, index: VertexIndex) -> &[VertexIndex] {
        self.vertices[index].children()
    }

    /// Returns the name of a vertex.
    pub fn name(&self, index: VertexIndex) -> &str {
        self.vertices[index].name()
    }

    /// Returns the index of the vertex with the given name.
    pub fn find(&self, name: &str) -> Option<VertexIndex> {
        self.names.get(name).copied()
    }

    /// Returns the indices of all leaves in pre-order.
    pub fn leaves(&self) -> Vec<VertexIndex> {
        self.pre_order_iter()
            .filter(|v| v.is_leaf())
            .map(|v| v.index())
            .collect()
    }

    /// Returns the sorted names of the leaves below (or at) a vertex.
    pub fn leaf_names_below(&self, index: VertexIndex) -> Vec<String> {
        let mut names = Vec::new();
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            let vertex = &self.vertices[current];
            if vertex.is_leaf() {
                names.push(vertex.name().to_string());
            } else {
                stack.extend(vertex.children().iter().copied());
            }
        }
        names.sort();
        names
    }

    /// Returns the depth (number of edges from the root) of every vertex.
    ///
    /// Vertices not reachable from the root get depth 0.
    pub fn depths(&self) -> Vec<usize> {
        let mut depths = vec![0; self.vertices.len()];
        for vertex in self.pre_order_iter() {
            if let Some(parent) = vertex.parent() {
                depths[vertex.index()] = depths[parent] + 1;
            }
        }
        depths
    }

    /// Returns `true` if `ancestor` is an ancestor of or equal to `descendant`.
    pub fn is_ancestor(&self, ancestor: VertexIndex, descendant: VertexIndex) -> bool {
        let mut current = Some(descendant);
        while let Some(index) = current {
            if index == ancestor {
                return true;
            }
            current = self.vertices[index].parent();
        }
        false
    }

    /// Returns the lowest common ancestor of two vertices, given precomputed [Tree::depths].
    pub fn lca(&self, depths: &[usize], a: VertexIndex, b: VertexIndex) -> VertexIndex {
        let (mut a, mut b) = (a, b);
        while depths[a] > depths[b] {
            a = self.vertices[a].parent().unwrap_or(a);
        }
        while depths[b] > depths[a] {
            b = self.vertices[b].parent().unwrap_or(b);
        }
        while a != b {
            match (self.vertices[a].parent(), self.vertices[b].parent()) {
                (Some(pa), Some(pb)) => {
                    a = pa;
                    b = pb;
                }
                _ => break,
            }
        }
        a
    }

    /// Returns the child of `ancestor` on the path down to `descendant`.
    ///
    /// Returns `None` if `descendant` is not strictly below `ancestor`.
    pub fn child_towards(&self, ancestor: VertexIndex, descendant: VertexIndex) -> Option<VertexIndex> {
        let mut current = descendant;
        while let Some(parent) = self.vertices[current].parent() {
            if parent == ancestor {
                return Some(current);
            }
            current = parent;
        }
        None
    }

    /// Builds a copy of this tree without the unary vertices selected by `remove`.
    ///
    /// The child of a removed vertex is attached to the nearest kept ancestor;
    /// a removed unary root passes the root role on to its child. Non-unary
    /// vertices are always kept.
    ///
    /// # Returns
    /// The new tree and, for every old index, its new index (`None` if removed).
    pub fn contract_unary<F>(&self, mut remove: F) -> (Tree, Vec<Option<VertexIndex>>)
    where
        F: FnMut(&Vertex) -> bool,
    {
        let mut tree = Tree::with_capacity(self.vertices.len());
        let mut mapping = vec![None; self.vertices.len()];
        if !self.is_root_set() {
            return (tree, mapping);
        }

        // (old index, new parent index)
        let mut stack: Vec<(VertexIndex, Option<VertexIndex>)> = vec![(self.root_index(), None)];
        while let Some((old, new_parent)) = stack.pop() {
            let vertex = &self.vertices[old];
            let next_parent = if vertex.is_unary() && remove(vertex) {
                new_parent
            } else {
                let new = match new_parent {
                    None => tree.add_root_vertex(Some(vertex.name())),
                    Some(parent) => tree.add_child(parent, Some(vertex.name()), vertex.branch_length()),
                };
                mapping[old] = Some(new);
                Some(new)
            };
            for &child in vertex.children().iter().rev() {
                stack.push((child, next_parent));
            }
        }

        (tree, mapping)
    }
}

// ============================================================================
// Traversal (pub)
// ============================================================================
impl Tree {
    /// Returns an iterator over the tree in post-order (children before parents).
    ///
    /// Children are visited in their stored order.
    pub fn post_order_iter(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self)
    }

    /// Returns an iterator over the tree in pre-order (parents before children).
    ///
    /// # Example
    /// ```
    /// use dlcrecon::model::Tree;
    ///
    /// let mut tree = Tree::new();
    /// let a = tree.add_leaf("A", None);
    /// let b = tree.add_leaf("B", None);
    /// let root = tree.add_root(vec![a, b], None);
    ///
    /// let indices: Vec<_> = tree.pre_order_iter().map(|v| v.index()).collect();
    /// assert_eq!(indices, vec![root, a, b]);
    /// ```
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }

    /// Returns the vertex indices in pre-order.
    pub fn pre_order(&self) -> Vec<VertexIndex> {
        self.pre_order_iter().map(|v| v.index()).collect()
    }

    /// Returns the vertex indices in post-order.
    pub fn post_order(&self) -> Vec<VertexIndex> {
        self.post_order_iter().map(|v| v.index()).collect()
    }
}

impl std::ops::Index<VertexIndex> for Tree {
    type Output = Vertex;

    fn index(&self, index: VertexIndex) -> &Self::Output {
        &self.vertices[index]
    }
}

// =#========================================================================#=
// ITERATORS
// =#========================================================================#=
/// Iterator for post-order traversal of a tree.
///
/// Post-order visits children before their parent.
pub struct PostOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<(VertexIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a Tree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root_index {
            stack.push((root, false));
        }
        PostOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let vertex = &self.tree[index];

            if children_visited || vertex.is_leaf() {
                return Some(vertex);
            }
            self.stack.push((index, true));
            // Push children reversed, so first child is processed first
            for &child in vertex.children().iter().rev() {
                self.stack.push((child, false));
            }
        }
        None
    }
}

/// Iterator for pre-order traversal of a tree.
///
/// Pre-order visits a parent before its children.
pub struct PreOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<VertexIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a Tree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root_index {
            stack.push(root);
        }
        PreOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let vertex = &self.tree[index];
        for &child in vertex.children().iter().rev() {
            self.stack.push(child);
        }
        Some(vertex)
    }
}
