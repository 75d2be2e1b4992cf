//! Tests for StructureBuilder and the literal root tree

use rand::rngs::StdRng;
use rand::SeedableRng;
use rstest::rstest;

use deductree::domain::{
    make_root_tree, BranchingPolicy, CaseInfo, EconState, FactType, FinalDecision, LawState,
    LegalElement, LogicTree, NodeData, ProcState, StructureBuilder,
};

fn case() -> CaseInfo {
    CaseInfo {
        taxpayer: "Acme GmbH".to_string(),
        tax_authority: "The Federal Tax Office".to_string(),
        business_sector: "software".to_string(),
        transaction_type: "licensing".to_string(),
        law_state: LawState::Clear,
        econ_state: EconState::Sufficient,
        proc_state: ProcState::Deficient,
        final_decision: FinalDecision::AcceptWithConditions,
        applicable_law: String::new(),
        economic_activity: String::new(),
        procedural_requirement: String::new(),
        description: String::new(),
    }
}

fn count_at_depth(tree: &LogicTree, depth: usize) -> usize {
    tree.iter().filter(|(idx, _)| tree.depth_of(*idx) == depth).count()
}

#[test]
fn given_case_when_making_root_tree_then_has_pinned_root_and_three_elements() {
    // Act
    let tree = make_root_tree(&case());

    // Assert
    assert_eq!(tree.roots().len(), 1);
    let root = tree.roots()[0];
    assert_eq!(
        tree.value_of(root),
        "The Federal Tax Office should accept with conditions the arrangement by Acme GmbH."
    );
    let elements: Vec<_> = tree
        .children_of(root)
        .iter()
        .map(|&c| LegalElement::classify(tree.value_of(c)))
        .collect();
    assert_eq!(
        elements,
        vec![
            Some(LegalElement::Law),
            Some(LegalElement::Econ),
            Some(LegalElement::Proc)
        ]
    );
    assert!(tree.iter().all(|(_, node)| node.data.frozen && !node.data.prunable));
}

#[test]
fn given_default_builder_when_building_then_skeleton_has_1_3_9_27_nodes() {
    // Arrange
    let roots = make_root_tree(&case());

    // Act
    let tree = StructureBuilder::default()
        .build(&roots, &mut StdRng::seed_from_u64(1))
        .unwrap();

    // Assert
    assert_eq!(count_at_depth(&tree, 0), 1);
    assert_eq!(count_at_depth(&tree, 1), 3);
    assert_eq!(count_at_depth(&tree, 2), 9);
    assert_eq!(count_at_depth(&tree, 3), 27);
    assert_eq!(tree.len(), 40);
    assert!(tree.populate);
    assert_eq!(roots.len(), 4, "input tree must stay untouched");
}

#[test]
fn given_skeleton_when_inspecting_slots_then_pattern_is_two_explicit_one_commonsense() {
    // Arrange
    let roots = make_root_tree(&case());

    // Act
    let tree = StructureBuilder::default()
        .build(&roots, &mut StdRng::seed_from_u64(2))
        .unwrap();

    // Assert
    let expandable: Vec<_> = tree
        .iter()
        .map(|(idx, _)| idx)
        .filter(|&idx| (1..3).contains(&tree.depth_of(idx)))
        .collect();
    assert_eq!(expandable.len(), 12);
    for idx in expandable {
        let types: Vec<_> = tree
            .children_of(idx)
            .iter()
            .map(|&c| tree.get_node(c).unwrap().data.fact_type)
            .collect();
        assert_eq!(
            types,
            vec![FactType::Explicit, FactType::Explicit, FactType::Commonsense]
        );
        assert!(tree
            .children_of(idx)
            .iter()
            .all(|&c| tree.value_of(c).is_empty()));
    }
}

#[rstest]
#[case(1, 4)]
#[case(2, 13)]
#[case(3, 40)]
#[case(4, 121)]
fn given_depth_when_building_then_node_count_matches_full_ternary_shape(
    #[case] depth: usize,
    #[case] expected: usize,
) {
    // Arrange
    let builder = StructureBuilder::new(depth, BranchingPolicy::new(), false);

    // Act
    let tree = builder
        .build(&make_root_tree(&case()), &mut StdRng::seed_from_u64(3))
        .unwrap();

    // Assert
    assert_eq!(tree.len(), expected);
    assert_eq!(tree.height(), depth + 1);
}

#[test]
fn given_zero_probability_at_depth_two_when_building_then_no_level3_slots() {
    // Arrange
    let builder = StructureBuilder::new(3, BranchingPolicy::new().with(2, 0.0), true);

    // Act
    let tree = builder
        .build(&make_root_tree(&case()), &mut StdRng::seed_from_u64(4))
        .unwrap();

    // Assert
    assert_eq!(count_at_depth(&tree, 2), 9);
    assert_eq!(count_at_depth(&tree, 3), 0);
}

#[test]
fn given_pruning_when_building_then_prunable_nodes_may_stay_leaves_but_pinned_never() {
    // Arrange
    let mut roots = LogicTree::default();
    let root = roots.add_root(NodeData::new("conclusion").pinned());
    roots.add_child(root, NodeData::new("prunable claim")).unwrap();
    roots
        .add_child(root, NodeData::new("pinned claim").pinned())
        .unwrap();
    let builder = StructureBuilder::new(2, BranchingPolicy::new().with(1, 0.5), true);

    // Act
    let mut pruned_prunable = 0;
    for seed in 0..50 {
        let tree = builder
            .build(&roots, &mut StdRng::seed_from_u64(seed))
            .unwrap();
        let root = tree.roots()[0];
        let children = tree.children_of(root);
        assert_eq!(tree.children_of(children[1]).len(), 3, "pinned node pruned");
        if tree.children_of(children[0]).is_empty() {
            pruned_prunable += 1;
        }
    }

    // Assert
    assert!(pruned_prunable > 0);
    assert!(pruned_prunable < 50);
}

#[test]
fn given_same_seed_when_building_twice_then_skeletons_are_identical() {
    // Arrange
    let builder = StructureBuilder::new(3, BranchingPolicy::new().with(2, 0.5), true);
    let mut roots = LogicTree::default();
    let root = roots.add_root(NodeData::new("conclusion"));
    roots.add_child(root, NodeData::new("claim")).unwrap();

    // Act
    let first = builder.build(&roots, &mut StdRng::seed_from_u64(9)).unwrap();
    let second = builder.build(&roots, &mut StdRng::seed_from_u64(9)).unwrap();

    // Assert
    assert_eq!(first.export(), second.export());
}
