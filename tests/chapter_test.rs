//! Tests for ChapterService: correct and incorrect chapter variants

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;

use deductree::application::services::ChapterService;
use deductree::domain::{FactType, LogicTree, NodeData};

const BRANCHES: [&str; 3] = [
    "Applicable law is clear for Acme's arrangement.",
    "Economic activity is insufficient for Acme's operations.",
    "Procedural requirements are compliant for Acme's application.",
];

/// Root with the three element branches, each carrying one filled fact.
fn expanded_tree() -> LogicTree {
    let mut tree = LogicTree::new(false, true);
    let root = tree.add_root(NodeData::new("The office should accept with conditions.").pinned());
    for (i, text) in BRANCHES.iter().enumerate() {
        let branch = tree.add_child(root, NodeData::new(*text).pinned()).unwrap();
        let mut fact = NodeData::slot(FactType::Explicit);
        fact.value = format!("fact {i}");
        tree.add_child(branch, fact).unwrap();
    }
    tree
}

fn branch_values(tree: &LogicTree) -> Vec<String> {
    tree.children_of(tree.roots()[0])
        .iter()
        .map(|&c| tree.value_of(c).to_string())
        .collect()
}

#[test]
fn given_three_element_branches_when_filtering_then_correct_tree_keeps_all() {
    // Arrange
    let tree = expanded_tree();

    // Act
    let chapters = ChapterService::new().create_chapter_trees(&tree, &mut StdRng::seed_from_u64(1));

    // Assert
    assert_eq!(branch_values(&chapters.correct_tree), BRANCHES.to_vec());
    assert_eq!(chapters.correct_tree.export(), tree.export());
}

#[test]
fn given_many_trials_when_filtering_then_incorrect_tree_has_one_or_two_original_branches() {
    // Arrange
    let tree = expanded_tree();
    let original: HashSet<String> = branch_values(&tree).into_iter().collect();
    let service = ChapterService::new();
    let mut rng = StdRng::seed_from_u64(42);
    let mut sizes = HashSet::new();

    // Act
    for _ in 0..200 {
        let chapters = service.create_chapter_trees(&tree, &mut rng);
        let kept = branch_values(&chapters.incorrect_tree);

        // Assert
        assert!((1..=2).contains(&kept.len()));
        let unique: HashSet<_> = kept.iter().cloned().collect();
        assert_eq!(unique.len(), kept.len(), "branch selected twice");
        assert!(unique.is_subset(&original));
        sizes.insert(kept.len());
    }
    assert_eq!(sizes, HashSet::from([1, 2]));
}

#[test]
fn given_incorrect_tree_when_inspecting_kept_branch_then_subtree_copied_whole() {
    // Arrange
    let tree = expanded_tree();

    // Act
    let chapters = ChapterService::new().create_chapter_trees(&tree, &mut StdRng::seed_from_u64(3));

    // Assert
    let incorrect = &chapters.incorrect_tree;
    for &branch in incorrect.children_of(incorrect.roots()[0]) {
        let children = incorrect.children_of(branch);
        assert_eq!(children.len(), 1);
        assert!(incorrect.value_of(children[0]).starts_with("fact "));
    }
}

#[test]
fn given_unclassified_branch_when_filtering_then_correct_tree_drops_it() {
    // Arrange
    let mut tree = expanded_tree();
    let root = tree.roots()[0];
    tree.add_child(root, NodeData::new("The weather was mild that year."))
        .unwrap();

    // Act
    let chapters = ChapterService::new().create_chapter_trees(&tree, &mut StdRng::seed_from_u64(5));

    // Assert
    assert_eq!(branch_values(&chapters.correct_tree), BRANCHES.to_vec());
}

#[test]
fn given_chapter_trees_when_mutating_copies_then_input_unchanged() {
    // Arrange
    let tree = expanded_tree();
    let before = tree.export();

    // Act
    let mut chapters =
        ChapterService::new().create_chapter_trees(&tree, &mut StdRng::seed_from_u64(8));
    for copy in [&mut chapters.correct_tree, &mut chapters.incorrect_tree] {
        let root = copy.roots()[0];
        let first = copy.children_of(root)[0];
        let fact = copy.children_of(first)[0];
        copy.get_node_mut(fact).unwrap().data.value = "rewritten".into();
    }

    // Assert
    assert_eq!(tree.export(), before);
    assert!(chapters.correct_tree.iter().any(|(_, n)| n.data.value == "rewritten"));
}

#[test]
fn given_second_root_when_filtering_then_only_first_root_rearranged() {
    // Arrange
    let mut tree = expanded_tree();
    let other = tree.add_root(NodeData::new("Second conclusion."));
    for text in ["unrelated a", "unrelated b", "unrelated c"] {
        tree.add_child(other, NodeData::new(text)).unwrap();
    }

    // Act
    let chapters = ChapterService::new().create_chapter_trees(&tree, &mut StdRng::seed_from_u64(13));

    // Assert
    for copy in [&chapters.correct_tree, &chapters.incorrect_tree] {
        assert_eq!(copy.roots().len(), 2);
        assert_eq!(copy.children_of(copy.roots()[1]).len(), 3);
    }
}
