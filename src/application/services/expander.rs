//! Depth-first expansion of a skeleton tree
//!
//! Fills each node's empty child slots from the content producer, validating
//! every proposal and retrying with structured feedback. A node that never
//! passes validation loses its child slots; the rest of the tree carries on.

use std::sync::Arc;

use generational_arena::Index;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::application::guidelines::GuidelineTable;
use crate::application::request::{ExpansionRequest, RejectionKind, RetryFeedback};
use crate::application::validators::{NodeContext, SemanticValidator, ValidatorSet, Verdict};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{ChildProposal, ExpansionLevel, LogicTree};
use crate::infrastructure::{ContentProducer, ProducerError};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Nodes at this depth are never expanded.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Node whose child slots were discarded after every attempt was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KilledBranch {
    pub node: String,
    pub depth: usize,
    pub attempts: usize,
    pub rejections: Vec<RetryFeedback>,
}

/// A validated proposal that still could not be written into the slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillErrorEvent {
    pub node: String,
    pub depth: usize,
    pub message: String,
}

/// Data-quality record of one expansion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionReport {
    /// Producer calls issued
    pub requests: usize,
    /// Nodes whose slots were filled
    pub filled: usize,
    pub killed: Vec<KilledBranch>,
    pub fill_errors: Vec<FillErrorEvent>,
    /// Nodes left unfilled because no guideline applies
    pub skipped: Vec<String>,
}

impl ExpansionReport {
    pub fn is_clean(&self) -> bool {
        self.killed.is_empty() && self.fill_errors.is_empty() && self.skipped.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeOutcome {
    Filled,
    Killed,
    FillError,
}

/// Expands skeleton trees in place.
pub struct ExpansionService {
    producer: Arc<dyn ContentProducer>,
    guidelines: Arc<GuidelineTable>,
    semantic: Option<SemanticValidator>,
    max_retries: usize,
    max_depth: usize,
}

impl ExpansionService {
    pub fn new(producer: Arc<dyn ContentProducer>, guidelines: Arc<GuidelineTable>) -> Self {
        Self {
            producer,
            guidelines,
            semantic: None,
            max_retries: DEFAULT_MAX_RETRIES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_semantic(mut self, semantic: Option<SemanticValidator>) -> Self {
        self.semantic = semantic;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Expand every level-1 branch, in root order then child order.
    ///
    /// Returns `Err` only when the producer or judge is unreachable beyond
    /// its transport retry budget.
    pub fn expand(&self, tree: &mut LogicTree, case_description: &str) -> ApplicationResult<ExpansionReport> {
        debug!(
            "expand: nodes={}, max_retries={}, max_depth={}",
            tree.len(),
            self.max_retries,
            self.max_depth
        );
        let mut report = ExpansionReport::default();
        for root in tree.roots().to_vec() {
            for branch in tree.children_of(root).to_vec() {
                self.expand_node(tree, branch, case_description, &mut report)?;
            }
        }
        debug!(
            "expand: requests={}, filled={}, killed={}, fill_errors={}",
            report.requests,
            report.filled,
            report.killed.len(),
            report.fill_errors.len()
        );
        Ok(report)
    }

    fn expand_node(
        &self,
        tree: &mut LogicTree,
        idx: Index,
        case_description: &str,
        report: &mut ExpansionReport,
    ) -> ApplicationResult<()> {
        let depth = tree.depth_of(idx);
        if depth >= self.max_depth || tree.children_of(idx).is_empty() {
            return Ok(());
        }

        if tree.needs_fill(idx) {
            let element = tree.element_of(idx);
            let guideline = element.zip(ExpansionLevel::for_depth(depth)).and_then(|(e, l)| {
                self.guidelines.get(e, l).map(|g| (e, l, g.clone()))
            });
            let Some((element, level, guideline)) = guideline else {
                warn!("no guideline for node at depth {depth}, skipping: {}", tree.value_of(idx));
                report.skipped.push(tree.value_of(idx).to_string());
                return Ok(());
            };

            let node_text = tree.value_of(idx).to_string();
            let ctx = NodeContext {
                node_text: &node_text,
                depth,
                element: Some(element),
                case_description,
            };
            let validators = ValidatorSet::for_node(&ctx, self.semantic.as_ref());
            let mut request = ExpansionRequest {
                node_text: node_text.clone(),
                element,
                level,
                guideline,
                case_description: case_description.to_string(),
                tree_rendering: String::new(),
                feedback: Vec::new(),
            };

            match self.fill_node(tree, idx, &ctx, &validators, &mut request, report)? {
                NodeOutcome::Filled => {}
                NodeOutcome::Killed | NodeOutcome::FillError => return Ok(()),
            }
        }

        for child in tree.children_of(idx).to_vec() {
            self.expand_node(tree, child, case_description, report)?;
        }
        Ok(())
    }

    fn fill_node(
        &self,
        tree: &mut LogicTree,
        idx: Index,
        ctx: &NodeContext,
        validators: &ValidatorSet,
        request: &mut ExpansionRequest,
        report: &mut ExpansionReport,
    ) -> ApplicationResult<NodeOutcome> {
        let attempts = self.max_retries + 1;
        for attempt in 1..=attempts {
            request.tree_rendering = tree.render_outline();
            report.requests += 1;

            let verdict = self
                .producer
                .propose_children(request)
                .map(|raw| ChildProposal::parse(&raw))
                .and_then(|proposal| {
                    validators
                        .validate(ctx, &proposal)
                        .map(|verdict| (proposal, verdict))
                });

            let rejection = match verdict {
                Ok((proposal, Verdict::Accept)) => {
                    return Ok(self.commit(tree, idx, ctx, &proposal, report));
                }
                Ok((_, Verdict::Reject(rejection))) => RetryFeedback {
                    attempt,
                    kind: rejection.kind,
                    offending: rejection.offending,
                    instruction: rejection.instruction,
                },
                Err(e) => transport_feedback(attempt, e)?,
            };
            debug!(
                "attempt {attempt}/{attempts} rejected ({}) at depth {}: {}",
                rejection.kind, ctx.depth, ctx.node_text
            );
            request.feedback.push(rejection);
        }

        warn!(
            "retries exhausted after {attempts} attempts, discarding children of: {}",
            ctx.node_text
        );
        tree.discard_children(idx);
        report.killed.push(KilledBranch {
            node: ctx.node_text.to_string(),
            depth: ctx.depth,
            attempts,
            rejections: std::mem::take(&mut request.feedback),
        });
        Ok(NodeOutcome::Killed)
    }

    fn commit(
        &self,
        tree: &mut LogicTree,
        idx: Index,
        ctx: &NodeContext,
        proposal: &ChildProposal,
        report: &mut ExpansionReport,
    ) -> NodeOutcome {
        match tree.fill_children(idx, &proposal.explicit, &proposal.commonsense) {
            Ok(()) => {
                info!("filled depth {} node: {}", ctx.depth, ctx.node_text);
                report.filled += 1;
                NodeOutcome::Filled
            }
            Err(e) => {
                error!("error filling child values of '{}': {e}", ctx.node_text);
                tree.discard_children(idx);
                report.fill_errors.push(FillErrorEvent {
                    node: ctx.node_text.to_string(),
                    depth: ctx.depth,
                    message: e.to_string(),
                });
                NodeOutcome::FillError
            }
        }
    }
}

/// A failed call costs one attempt; an exhausted transport aborts the build.
fn transport_feedback(attempt: usize, e: ProducerError) -> ApplicationResult<RetryFeedback> {
    if e.is_fatal() {
        error!("aborting expansion: {e}");
        return Err(ApplicationError::Transport(e));
    }
    warn!("attempt {attempt} failed at transport level: {e}");
    Ok(RetryFeedback {
        attempt,
        kind: RejectionKind::Transport,
        offending: None,
        instruction: "The previous answer could not be obtained. Reply again with exactly the 3 requested lines.".to_string(),
    })
}
