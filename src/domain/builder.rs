//! Skeleton construction for deduction trees.

use std::collections::BTreeMap;

use generational_arena::Index;
use rand::Rng;
use tracing::{debug, trace};

use crate::domain::arena::{LogicTree, NodeData, TreeResult};
use crate::domain::entities::{CaseInfo, FactType};

/// Slot pattern created under every expandable node.
pub const CHILD_PATTERN: [FactType; 3] = [
    FactType::Explicit,
    FactType::Explicit,
    FactType::Commonsense,
];

/// Per-depth probability that a node receives its child slots.
///
/// Depths without an entry default to 1.0. An entry of 0.0 stops the
/// skeleton at that depth.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BranchingPolicy {
    by_depth: BTreeMap<usize, f64>,
}

impl BranchingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, depth: usize, probability: f64) -> Self {
        self.by_depth.insert(depth, probability.clamp(0.0, 1.0));
        self
    }

    pub fn probability(&self, depth: usize) -> f64 {
        self.by_depth.get(&depth).copied().unwrap_or(1.0)
    }

    /// True if some depth at or above `depth` is configured to never branch.
    pub fn stopped_at(&self, depth: usize) -> bool {
        self.by_depth.range(..=depth).any(|(_, p)| *p <= 0.0)
    }
}

impl FromIterator<(usize, f64)> for BranchingPolicy {
    fn from_iter<T: IntoIterator<Item = (usize, f64)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |policy, (d, p)| policy.with(d, p))
    }
}

/// Builds fixed-shape skeletons below the literal root levels.
#[derive(Debug, Clone)]
pub struct StructureBuilder {
    /// Nodes at this depth are structural leaves
    pub depth: usize,
    pub branching: BranchingPolicy,
    /// Enables probabilistic pruning for branching entries below 1.0
    pub prune: bool,
}

impl Default for StructureBuilder {
    fn default() -> Self {
        Self {
            depth: 3,
            branching: BranchingPolicy::new().with(2, 1.0),
            prune: false,
        }
    }
}

impl StructureBuilder {
    pub fn new(depth: usize, branching: BranchingPolicy, prune: bool) -> Self {
        Self {
            depth,
            branching,
            prune,
        }
    }

    /// Copy the literal nodes of `roots` into a new tree and hang empty,
    /// pre-tagged child slots under every node shallower than `self.depth`.
    pub fn build<R: Rng + ?Sized>(&self, roots: &LogicTree, rng: &mut R) -> TreeResult<LogicTree> {
        debug!(
            "build: depth={}, prune={}, roots={}",
            self.depth,
            self.prune,
            roots.roots().len()
        );
        let mut tree = roots.filtered_copy(|_, children| children.to_vec());
        tree.prune = self.prune;
        tree.populate = true;

        for root in tree.roots().to_vec() {
            self.populate(&mut tree, root, 0, rng)?;
        }
        debug!("build: skeleton has {} nodes", tree.len());
        Ok(tree)
    }

    fn populate<R: Rng + ?Sized>(
        &self,
        tree: &mut LogicTree,
        idx: Index,
        depth: usize,
        rng: &mut R,
    ) -> TreeResult<()> {
        if depth >= self.depth {
            return Ok(());
        }
        if tree.children_of(idx).is_empty() && self.should_branch(tree, idx, depth, rng) {
            for fact_type in CHILD_PATTERN {
                tree.add_child(idx, NodeData::slot(fact_type))?;
            }
        }
        for child in tree.children_of(idx).to_vec() {
            self.populate(tree, child, depth + 1, rng)?;
        }
        Ok(())
    }

    fn should_branch<R: Rng + ?Sized>(
        &self,
        tree: &LogicTree,
        idx: Index,
        depth: usize,
        rng: &mut R,
    ) -> bool {
        if self.branching.stopped_at(depth) {
            return false;
        }
        let probability = self.branching.probability(depth);
        if probability >= 1.0 || !self.prune {
            return true;
        }
        let prunable = tree.get_node(idx).map(|n| n.data.prunable).unwrap_or(true);
        if !prunable {
            return true;
        }
        let keep = rng.gen::<f64>() < probability;
        if !keep {
            trace!("pruned node at depth {depth}");
        }
        keep
    }
}

/// Root conclusion plus the three literal legal-element claims.
///
/// All four nodes are frozen and exempt from pruning.
pub fn make_root_tree(case: &CaseInfo) -> LogicTree {
    let taxpayer = &case.taxpayer;
    let mut tree = LogicTree::new(false, false);
    let root = tree.add_root(
        NodeData::new(format!(
            "{} should {} the arrangement by {}.",
            case.tax_authority, case.final_decision, taxpayer
        ))
        .pinned(),
    );
    let claims = [
        format!(
            "Applicable law is {} for {}'s arrangement.",
            case.law_state.label(),
            taxpayer
        ),
        format!(
            "Economic activity is {} for {}'s operations.",
            case.econ_state.label(),
            taxpayer
        ),
        format!(
            "Procedural requirements are {} for {}'s application.",
            case.proc_state.label(),
            taxpayer
        ),
    ];
    for claim in claims {
        // root was inserted just above
        let _ = tree.add_child(root, NodeData::new(claim).pinned());
    }
    tree
}
