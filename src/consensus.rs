//! Majority-rule consensus of trees over a shared leaf set.
//!
//! Every internal vertex below the root induces a cluster (the set of leaves
//! below it). Clusters found in more than half of the trees are pairwise
//! compatible and form the consensus tree, which may be multifurcating.

use crate::error::{ReconError, Result};
use crate::model::{Tree, VertexIndex};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Leaf set as a bitset over the sorted leaf names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Cluster(Vec<u64>);

impl Cluster {
    fn empty(num_leaves: usize) -> Self {
        Cluster(vec![0; num_leaves.div_ceil(64)])
    }

    fn insert(&mut self, leaf: usize) {
        self.0[leaf / 64] |= 1 << (leaf % 64);
    }

    fn contains(&self, leaf: usize) -> bool {
        self.0[leaf / 64] & (1 << (leaf % 64)) != 0
    }

    fn union_with(&mut self, other: &Cluster) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= b;
        }
    }

    fn is_subset_of(&self, other: &Cluster) -> bool {
        self.0.iter().zip(&other.0).all(|(a, b)| a & !b == 0)
    }

    fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Builds the majority-rule consensus of trees sharing one leaf set.
///
/// Leaves keep their names; internal vertices get generated names.
///
/// # Errors
/// - [ReconError::UnsupportedConfiguration] for an empty list of trees
/// - [ReconError::InputInconsistency] if the leaf sets differ
///
/// # Example
/// ```
/// use dlcrecon::consensus::majority_consensus;
/// use dlcrecon::newick::parse_str;
///
/// let trees = vec![
///     parse_str("((a,b),(c,d));")?,
///     parse_str("((a,b),c,d);")?,
///     parse_str("((a,c),(b,d));")?,
/// ];
/// let consensus = majority_consensus(&trees)?;
/// assert_eq!(consensus.num_leaves(), 4);
/// // only the cluster {a,b} is in a majority of the trees
/// assert_eq!(consensus.num_vertices(), 6);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn majority_consensus(trees: &[Tree]) -> Result<Tree> {
    let Some(first) = trees.first() else {
        return Err(ReconError::UnsupportedConfiguration(
            "consensus of no trees".to_string(),
        ));
    };

    let mut names: Vec<String> = first.leaves().iter().map(|&l| first.name(l).to_string()).collect();
    names.sort();
    let leaf_ids: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
    let num_leaves = names.len();

    let mut counts: HashMap<Cluster, usize> = HashMap::new();
    let mut first_seen: Vec<Cluster> = Vec::new();
    for tree in trees {
        let clusters = tree_clusters(tree, &leaf_ids, num_leaves)?;
        let mut seen = HashSet::new();
        for cluster in clusters {
            let size = cluster.len();
            if size < 2 || size == num_leaves || !seen.insert(cluster.clone()) {
                continue;
            }
            let count = counts.entry(cluster.clone()).or_insert(0);
            if *count == 0 {
                first_seen.push(cluster);
            }
            *count += 1;
        }
    }

    // Majority clusters, smallest first
    let mut majority: Vec<Cluster> = first_seen
        .into_iter()
        .filter(|c| 2 * counts[c] > trees.len())
        .collect();
    majority.sort_by_key(|c| c.len());
    debug!(
        "consensus of {} trees keeps {} of {} clusters",
        trees.len(),
        majority.len(),
        counts.len()
    );

    // Parent of a cluster or leaf: the smallest majority cluster containing it
    let parent_of_cluster = |i: usize| {
        (i + 1..majority.len()).find(|&j| majority[i].is_subset_of(&majority[j]))
    };
    let parent_of_leaf = |leaf: usize| (0..majority.len()).find(|&j| majority[j].contains(leaf));

    let mut tree = Tree::with_capacity(2 * num_leaves);
    // children per majority cluster, the root collects at index `majority.len()`
    let mut children: Vec<Vec<VertexIndex>> = vec![Vec::new(); majority.len() + 1];
    for (leaf, name) in names.iter().enumerate() {
        let index = tree.add_leaf(name.as_str(), None);
        children[parent_of_leaf(leaf).unwrap_or(majority.len())].push(index);
    }
    for i in 0..majority.len() {
        let kids = std::mem::take(&mut children[i]);
        let index = tree.add_internal(kids, None, None);
        children[parent_of_cluster(i).unwrap_or(majority.len())].push(index);
    }
    let root_children = std::mem::take(&mut children[majority.len()]);
    if num_leaves == 1 {
        tree.set_root(root_children[0]);
    } else {
        tree.add_root(root_children, None);
    }
    Ok(tree)
}

/// Clusters of all vertices of a tree, checking the leaf set.
fn tree_clusters(tree: &Tree, leaf_ids: &HashMap<&str, usize>, num_leaves: usize) -> Result<Vec<Cluster>> {
    if tree.num_leaves() != num_leaves {
        return Err(ReconError::input(format!(
            "consensus trees differ in size: {} and {} leaves",
            num_leaves,
            tree.num_leaves()
        )));
    }
    let mut clusters = vec![Cluster::empty(num_leaves); tree.num_vertices()];
    for vertex in tree.post_order_iter() {
        let v = vertex.index();
        if vertex.is_leaf() {
            let id = leaf_ids.get(vertex.name()).ok_or_else(|| {
                ReconError::input(format!("leaf {} is missing from the other consensus trees", vertex.name()))
            })?;
            clusters[v].insert(*id);
        } else {
            let mut cluster = Cluster::empty(num_leaves);
            for &c in vertex.children() {
                cluster.union_with(&clusters[c]);
            }
            clusters[v] = cluster;
        }
    }
    Ok(clusters)
}
