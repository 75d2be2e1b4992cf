//! Correct / incorrect chapter variants of an expanded tree

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::domain::{LegalElement, LogicTree};

/// Two independent deep copies derived from one expanded tree.
#[derive(Debug, Clone)]
pub struct ChapterTrees {
    /// First root keeps only branches naming a legal element
    pub correct_tree: LogicTree,
    /// First root keeps a random 1 or 2 of its original branches
    pub incorrect_tree: LogicTree,
}

/// Stateless filter; only the first root's children are rearranged.
#[derive(Debug, Default)]
pub struct ChapterService;

impl ChapterService {
    pub fn new() -> Self {
        Self
    }

    pub fn create_chapter_trees<R: Rng + ?Sized>(&self, tree: &LogicTree, rng: &mut R) -> ChapterTrees {
        let incorrect_tree = tree.filtered_copy(|pos, children| {
            if pos != 0 {
                return children.to_vec();
            }
            let size = rng.gen_range(1..=2).min(children.len());
            children.choose_multiple(&mut *rng, size).copied().collect()
        });

        let correct_tree = tree.filtered_copy(|pos, children| {
            if pos != 0 {
                return children.to_vec();
            }
            children
                .iter()
                .copied()
                .filter(|&c| LegalElement::classify(tree.value_of(c)).is_some())
                .collect()
        });

        debug!(
            "create_chapter_trees: correct={} nodes, incorrect={} nodes",
            correct_tree.len(),
            incorrect_tree.len()
        );
        ChapterTrees {
            correct_tree,
            incorrect_tree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeData;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn given_foreign_branch_when_filtering_then_correct_tree_drops_it() {
        let mut tree = LogicTree::default();
        let root = tree.add_root(NodeData::new("root"));
        tree.add_child(root, NodeData::new("Applicable law is clear.")).unwrap();
        tree.add_child(root, NodeData::new("The weather was pleasant.")).unwrap();

        let chapters = ChapterService::new().create_chapter_trees(&tree, &mut StdRng::seed_from_u64(5));

        let correct = &chapters.correct_tree;
        assert_eq!(correct.children_of(correct.roots()[0]).len(), 1);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn given_childless_root_when_filtering_then_incorrect_tree_is_empty_below_root() {
        let mut tree = LogicTree::default();
        tree.add_root(NodeData::new("root"));

        let chapters = ChapterService::new().create_chapter_trees(&tree, &mut StdRng::seed_from_u64(5));

        assert_eq!(chapters.incorrect_tree.len(), 1);
    }
}
