use std::fmt;

use generational_arena::{Arena, Index};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::entities::{FactType, LegalElement, Operator};
use crate::domain::error::DomainError;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// Data payload for tree nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    /// Statement text, empty while the slot awaits expansion
    pub value: String,
    pub fact_type: FactType,
    pub operator: Operator,
    /// Value must never be overwritten by expansion
    pub frozen: bool,
    /// Exempt from random pruning when false
    pub prunable: bool,
}

impl NodeData {
    /// A deduced statement with literal text.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            fact_type: FactType::Deduced,
            operator: Operator::default(),
            frozen: false,
            prunable: true,
        }
    }

    /// An empty slot pre-tagged with its fact type.
    pub fn slot(fact_type: FactType) -> Self {
        Self {
            fact_type,
            ..Self::new("")
        }
    }

    /// Frozen and exempt from pruning.
    pub fn pinned(mut self) -> Self {
        self.frozen = true;
        self.prunable = false;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.value, self.fact_type)
    }
}

/// Tree node in the arena-based deduction structure.
#[derive(Debug, Clone)]
pub struct LogicNode {
    pub data: NodeData,
    /// Non-owning back-reference used for ancestry queries, None for roots
    pub parent: Option<Index>,
    /// Owned children, insertion order significant
    pub children: Vec<Index>,
}

/// Arena-based forest holding one deduction tree.
///
/// Nodes reference each other by generational index, so parent links never
/// form ownership cycles. Cloning the tree clones the arena, yielding a copy
/// that shares nothing with the original.
#[derive(Debug, Clone)]
pub struct LogicTree {
    arena: Arena<LogicNode>,
    roots: Vec<Index>,
    /// Random pruning allowed while building the skeleton
    pub prune: bool,
    /// Skeleton children have been generated
    pub populate: bool,
}

impl Default for LogicTree {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl LogicTree {
    pub fn new(prune: bool, populate: bool) -> Self {
        Self {
            arena: Arena::new(),
            roots: Vec::new(),
            prune,
            populate,
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn add_root(&mut self, data: NodeData) -> Index {
        let idx = self.arena.insert(LogicNode {
            data,
            parent: None,
            children: Vec::new(),
        });
        self.roots.push(idx);
        idx
    }

    #[instrument(level = "trace", skip(self))]
    pub fn add_child(&mut self, parent: Index, data: NodeData) -> TreeResult<Index> {
        if !self.arena.contains(parent) {
            return Err(DomainError::UnknownNode(format!("{parent:?}")));
        }
        let idx = self.arena.insert(LogicNode {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.push(idx);
        }
        Ok(idx)
    }

    pub fn get_node(&self, idx: Index) -> Option<&LogicNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut LogicNode> {
        self.arena.get_mut(idx)
    }

    fn node(&self, idx: Index) -> TreeResult<&LogicNode> {
        self.arena
            .get(idx)
            .ok_or_else(|| DomainError::UnknownNode(format!("{idx:?}")))
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn children_of(&self, idx: Index) -> &[Index] {
        self.arena
            .get(idx)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn value_of(&self, idx: Index) -> &str {
        self.arena
            .get(idx)
            .map(|n| n.data.value.as_str())
            .unwrap_or("")
    }

    /// Number of nodes in the forest.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Number of ancestors; roots are depth 0.
    #[instrument(level = "trace", skip(self))]
    pub fn depth_of(&self, idx: Index) -> usize {
        let mut depth = 0;
        let mut current = self.arena.get(idx).and_then(|n| n.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.arena.get(parent).and_then(|n| n.parent);
        }
        depth
    }

    /// The ancestor at depth 1 on the path to `idx` (the node itself for
    /// depths 0 and 1).
    #[instrument(level = "trace", skip(self))]
    pub fn level1_ancestor(&self, idx: Index) -> Index {
        let mut current = idx;
        loop {
            let parent = self.arena.get(current).and_then(|n| n.parent);
            let grandparent = parent.and_then(|p| self.arena.get(p)).and_then(|n| n.parent);
            match (parent, grandparent) {
                (Some(p), Some(_)) => current = p,
                _ => return current,
            }
        }
    }

    /// Legal element governing the branch that contains `idx`.
    pub fn element_of(&self, idx: Index) -> Option<LegalElement> {
        LegalElement::classify(self.value_of(self.level1_ancestor(idx)))
    }

    /// Children exist but at least one of them still has no value.
    pub fn needs_fill(&self, idx: Index) -> bool {
        let children = self.children_of(idx);
        !children.is_empty()
            && children
                .iter()
                .any(|c| self.arena.get(*c).map(|n| n.data.is_empty()).unwrap_or(true))
    }

    /// Assign proposal texts to the child slots of `idx` by fact type.
    ///
    /// Explicit texts go to the empty EXPLICIT slots in order, commonsense
    /// texts to the empty COMMONSENSE slots. Frozen children and children that
    /// already carry a value are left alone, so each slot is written at most
    /// once. Either every empty slot is filled or the tree is left untouched.
    #[instrument(level = "debug", skip(self, explicit, commonsense))]
    pub fn fill_children(
        &mut self,
        idx: Index,
        explicit: &[String],
        commonsense: &[String],
    ) -> TreeResult<()> {
        let slots: Vec<(Index, FactType)> = self
            .node(idx)?
            .children
            .iter()
            .filter_map(|c| self.arena.get(*c).map(|n| (*c, n)))
            .filter(|(_, n)| !n.data.frozen && n.data.is_empty())
            .map(|(c, n)| (c, n.data.fact_type))
            .collect();

        let expected_explicit = slots
            .iter()
            .filter(|(_, t)| *t == FactType::Explicit)
            .count();
        let expected_commonsense = slots
            .iter()
            .filter(|(_, t)| *t == FactType::Commonsense)
            .count();
        let untyped = slots.len() - expected_explicit - expected_commonsense;

        if untyped > 0 || explicit.len() < expected_explicit || commonsense.len() < expected_commonsense
        {
            return Err(DomainError::SlotMismatch {
                expected_explicit,
                expected_commonsense,
                got_explicit: explicit.len(),
                got_commonsense: commonsense.len(),
            });
        }

        let mut explicit = explicit.iter();
        let mut commonsense = commonsense.iter();
        for (child, fact_type) in slots {
            let text = match fact_type {
                FactType::Explicit => explicit.next(),
                _ => commonsense.next(),
            };
            if let (Some(node), Some(text)) = (self.arena.get_mut(child), text) {
                node.data.value = text.clone();
            }
        }
        Ok(())
    }

    /// Drop every descendant of `idx`, leaving it with an empty child list.
    #[instrument(level = "debug", skip(self))]
    pub fn discard_children(&mut self, idx: Index) {
        let children = match self.arena.get_mut(idx) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        let mut stack = children;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.arena.remove(current) {
                stack.extend(node.children);
            }
        }
    }

    /// Number of levels in the deepest branch (0 for an empty forest).
    #[instrument(level = "debug", skip(self))]
    pub fn height(&self) -> usize {
        self.roots
            .iter()
            .map(|&r| self.calculate_height(r))
            .max()
            .unwrap_or(0)
    }

    fn calculate_height(&self, idx: Index) -> usize {
        1 + self
            .children_of(idx)
            .iter()
            .map(|&c| self.calculate_height(c))
            .max()
            .unwrap_or(0)
    }

    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self)
    }

    /// Values of leaf nodes in pre-order; commonsense leaves only when asked.
    pub fn facts(&self, include_commonsense: bool) -> Vec<String> {
        self.iter()
            .filter(|(_, n)| n.children.is_empty() && !n.data.is_empty())
            .filter(|(_, n)| match n.data.fact_type {
                FactType::Explicit => true,
                FactType::Commonsense => include_commonsense,
                FactType::Deduced => false,
            })
            .map(|(_, n)| n.data.value.clone())
            .collect()
    }

    /// Text outline of all valued nodes, one per line, prefixed by `"> "` per depth.
    ///
    /// Nodes without a value are skipped together with their subtree.
    pub fn render_outline(&self) -> String {
        let mut lines = Vec::new();
        for &root in &self.roots {
            self.render_node(root, 0, &mut lines);
        }
        lines.join("\n")
    }

    fn render_node(&self, idx: Index, depth: usize, lines: &mut Vec<String>) {
        let Some(node) = self.arena.get(idx) else {
            return;
        };
        if node.data.is_empty() {
            return;
        }
        lines.push(format!("{}{}", "> ".repeat(depth), node.data.value));
        for &child in &node.children {
            self.render_node(child, depth + 1, lines);
        }
    }

    /// Deep copy in which each root's children are replaced by `select(root_pos, children)`.
    ///
    /// `select` may reorder or drop children; indices it returns that are not
    /// children of that root are ignored.
    pub fn filtered_copy<F>(&self, mut select: F) -> LogicTree
    where
        F: FnMut(usize, &[Index]) -> Vec<Index>,
    {
        let mut copy = LogicTree::new(self.prune, self.populate);
        for (pos, &root) in self.roots.iter().enumerate() {
            let Some(node) = self.arena.get(root) else {
                continue;
            };
            let new_root = copy.add_root(node.data.clone());
            let kept = select(pos, &node.children);
            for child in kept.into_iter().filter(|c| node.children.contains(c)) {
                self.copy_subtree(child, &mut copy, new_root);
            }
        }
        copy
    }

    fn copy_subtree(&self, src: Index, dst: &mut LogicTree, parent: Index) {
        let Some(node) = self.arena.get(src) else {
            return;
        };
        if let Ok(new_idx) = dst.add_child(parent, node.data.clone()) {
            for &child in &node.children {
                self.copy_subtree(child, dst, new_idx);
            }
        }
    }

    /// Nested export form: `{nodes: [...], prune, populate}`.
    pub fn export(&self) -> TreeExport {
        TreeExport {
            nodes: self.roots.iter().filter_map(|&r| self.export_node(r)).collect(),
            prune: self.prune,
            populate: self.populate,
        }
    }

    fn export_node(&self, idx: Index) -> Option<NodeExport> {
        let node = self.arena.get(idx)?;
        Some(NodeExport {
            value: node.data.value.clone(),
            fact_type: node.data.fact_type,
            operator: node.data.operator,
            frozen: node.data.frozen,
            prunable: node.data.prunable,
            children: node
                .children
                .iter()
                .filter_map(|&c| self.export_node(c))
                .collect(),
        })
    }

    /// Rebuild a tree from its export form, restoring parent links.
    pub fn import(export: &TreeExport) -> LogicTree {
        let mut tree = LogicTree::new(export.prune, export.populate);
        for node in &export.nodes {
            let root = tree.add_root(node.data());
            tree.import_children(root, &node.children);
        }
        tree
    }

    fn import_children(&mut self, parent: Index, children: &[NodeExport]) {
        for child in children {
            if let Ok(idx) = self.add_child(parent, child.data()) {
                self.import_children(idx, &child.children);
            }
        }
    }

    /// One display tree per root.
    pub fn to_termtree(&self) -> Vec<termtree::Tree<String>> {
        self.roots
            .iter()
            .map(|&r| self.termtree_node(r))
            .collect()
    }

    fn termtree_node(&self, idx: Index) -> termtree::Tree<String> {
        let label = self
            .arena
            .get(idx)
            .map(|n| {
                if n.data.is_empty() {
                    format!("<empty> | {}", n.data.fact_type)
                } else {
                    n.data.to_string()
                }
            })
            .unwrap_or_default();
        let leaves: Vec<_> = self
            .children_of(idx)
            .iter()
            .map(|&c| self.termtree_node(c))
            .collect();
        termtree::Tree::new(label).with_leaves(leaves)
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_true(b: &bool) -> bool {
    *b
}

fn default_true() -> bool {
    true
}

/// Serialized node: `{value, fact_type, operator, children}`.
///
/// `frozen` and `prunable` are only written when they differ from the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeExport {
    pub value: String,
    #[serde(default)]
    pub fact_type: FactType,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub children: Vec<NodeExport>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub frozen: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub prunable: bool,
}

impl NodeExport {
    fn data(&self) -> NodeData {
        NodeData {
            value: self.value.clone(),
            fact_type: self.fact_type,
            operator: self.operator,
            frozen: self.frozen,
            prunable: self.prunable,
        }
    }
}

/// Serialized tree with its ordered root list under `nodes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeExport {
    pub nodes: Vec<NodeExport>,
    #[serde(default)]
    pub prune: bool,
    #[serde(default)]
    pub populate: bool,
}

/// Pre-order traversal over the whole forest.
pub struct TreeIterator<'a> {
    tree: &'a LogicTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a LogicTree) -> Self {
        let stack = tree.roots.iter().rev().copied().collect();
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a LogicNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}
