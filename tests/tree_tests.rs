use dlcrecon::model::{BranchLength, Tree};
use dlcrecon::newick::parse_str;

/// ((A,B)AB,C)R built bottom-up
fn small_tree() -> Tree {
    let mut tree = Tree::new();
    let a = tree.add_leaf("A", Some(BranchLength::new(1.0)));
    let b = tree.add_leaf("B", Some(BranchLength::new(1.0)));
    let c = tree.add_leaf("C", Some(BranchLength::new(0.5)));
    let ab = tree.add_internal(vec![a, b], Some("AB"), Some(BranchLength::new(1.5)));
    tree.add_root(vec![ab, c], Some("R"));
    tree
}

#[test]
fn test_building_tree() {
    let tree = small_tree();

    // Counts
    assert_eq!(tree.num_leaves(), 3);
    assert_eq!(tree.num_vertices(), 5);
    assert!(tree.is_valid());

    // Root
    let root = tree.root();
    assert!(root.is_root());
    assert_eq!(root.name(), "R");
    assert_eq!(tree.root_index(), 4);

    // Leaf
    let b = tree.find("B").unwrap();
    assert!(tree[b].is_leaf());
    assert_eq!(tree.parent(b), tree.find("AB"));

    // Internal
    let ab = &tree[tree.find("AB").unwrap()];
    assert!(!ab.is_leaf());
    assert_eq!(ab.branch_length().unwrap(), BranchLength::new(1.5));
}

#[test]
fn test_top_down_construction() {
    let mut tree = Tree::new();
    let root = tree.add_root_vertex(Some("r"));
    let x = tree.add_child(root, None, None);
    tree.add_child(x, Some("a"), None);
    tree.add_child(x, Some("b"), None);
    tree.add_child(root, Some("c"), None);

    assert!(tree.is_valid());
    assert_eq!(tree.num_leaves(), 3);
    assert_eq!(tree.leaf_names_below(x), vec!["a", "b"]);
    assert!(tree.name(x).starts_with('n'));
}

#[test]
#[should_panic]
fn test_get_root_panics_on_empty_tree() {
    let tree = Tree::new();
    tree.root();
}

#[test]
#[should_panic]
fn test_get_vertex_out_of_bounds() {
    let tree = small_tree();
    let _ = &tree[55];
}

#[test]
#[should_panic]
fn test_duplicate_name_panics() {
    let mut tree = Tree::new();
    tree.add_leaf("A", None);
    tree.add_leaf("A", None);
}

#[test]
fn test_tree_without_root_is_invalid() {
    let mut tree = Tree::new();
    let a = tree.add_leaf("A", None);
    let b = tree.add_leaf("B", None);
    tree.add_internal(vec![a, b], None, None);
    assert!(!tree.is_valid());
}

// ============= Traversal Tests =============
#[test]
fn test_traversal_orders() {
    let tree = parse_str("((a,b)x,(c,d)y)r;").unwrap();
    let names = |order: Vec<usize>| order.into_iter().map(|v| tree.name(v).to_string()).collect::<Vec<_>>();

    assert_eq!(names(tree.pre_order()), vec!["r", "x", "a", "b", "y", "c", "d"]);
    assert_eq!(names(tree.post_order()), vec!["a", "b", "x", "c", "d", "y", "r"]);
    assert_eq!(names(tree.leaves()), vec!["a", "b", "c", "d"]);
}

// ============= Ancestry Tests =============
#[test]
fn test_lca_and_ancestry() {
    let tree = parse_str("(((a,b)x,c)y,d)r;").unwrap();
    let depths = tree.depths();
    let v = |name: &str| tree.find(name).unwrap();

    assert_eq!(depths[v("r")], 0);
    assert_eq!(depths[v("a")], 3);
    assert_eq!(tree.lca(&depths, v("a"), v("b")), v("x"));
    assert_eq!(tree.lca(&depths, v("a"), v("c")), v("y"));
    assert_eq!(tree.lca(&depths, v("b"), v("d")), v("r"));
    assert_eq!(tree.lca(&depths, v("x"), v("a")), v("x"));

    assert!(tree.is_ancestor(v("y"), v("b")));
    assert!(tree.is_ancestor(v("b"), v("b")));
    assert!(!tree.is_ancestor(v("x"), v("c")));

    assert_eq!(tree.child_towards(v("r"), v("b")), Some(v("y")));
    assert_eq!(tree.child_towards(v("x"), v("a")), Some(v("a")));
    assert_eq!(tree.child_towards(v("x"), v("x")), None);
    assert_eq!(tree.child_towards(v("x"), v("d")), None);
}

// ============= Modification Tests =============
#[test]
fn test_insert_above() {
    let mut tree = parse_str("((a,b)x,c)r;").unwrap();
    let x = tree.find("x").unwrap();
    let r = tree.root_index();

    let u = tree.insert_above(x, Some("u"));
    assert!(tree.is_valid());
    assert!(tree[u].is_unary());
    assert_eq!(tree.parent(x), Some(u));
    assert_eq!(tree.children(r)[0], u);

    // Inserting above the root makes a new root
    let top = tree.insert_above(r, None);
    assert_eq!(tree.root_index(), top);
    assert!(tree.is_valid());
}

#[test]
fn test_contract_unary() {
    let mut tree = parse_str("((a,b)x,c)r;").unwrap();
    let x = tree.find("x").unwrap();
    let u = tree.insert_above(x, Some("u"));
    let top = tree.insert_above(tree.root_index(), Some("top"));

    let (contracted, mapping) = tree.contract_unary(|_| true);
    assert!(contracted.is_valid());
    assert_eq!(contracted.num_vertices(), 5);
    assert_eq!(mapping[u], None);
    assert_eq!(mapping[top], None);
    assert_eq!(contracted.root().name(), "r");
    let new_x = mapping[x].unwrap();
    assert_eq!(contracted.name(new_x), "x");
    assert_eq!(contracted.parent(new_x), Some(contracted.root_index()));

    // Selective removal keeps the others
    let (partial, mapping) = tree.contract_unary(|v| v.name() == "u");
    assert_eq!(partial.num_vertices(), 6);
    assert_eq!(partial.root().name(), "top");
    assert!(mapping[top].is_some());
}

#[test]
fn test_rename_and_unique_name() {
    let mut tree = parse_str("((a,b)n3,c);").unwrap();
    let name = tree.unique_name("n");
    assert!(tree.find(&name).is_none());

    let x = tree.find("n3").unwrap();
    tree.rename(x, "ab");
    assert_eq!(tree.find("ab"), Some(x));
    assert_eq!(tree.find("n3"), None);
}
