//! Expansion requests and structured retry feedback sent to producers.

use std::fmt;

use serde::Serialize;

use crate::application::guidelines::Guideline;
use crate::domain::{ExpansionLevel, LegalElement};

/// Which rule rejected a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionKind {
    /// Wrong shape: not 2 explicit + 1 commonsense, or empty text
    Structural,
    /// A disallowed term appeared
    ForbiddenText { word: String, rule: String },
    /// The judge flagged cross-element leakage
    Semantic,
    /// The producer call itself failed for this attempt
    Transport,
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionKind::Structural => write!(f, "structure"),
            RejectionKind::ForbiddenText { word, rule } => write!(f, "{rule}: '{word}'"),
            RejectionKind::Semantic => write!(f, "semantic"),
            RejectionKind::Transport => write!(f, "transport"),
        }
    }
}

/// A rejected attempt, carried into every later request for the same node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryFeedback {
    /// 1-based attempt number that was rejected
    pub attempt: usize,
    pub kind: RejectionKind,
    /// Candidate text that triggered the rejection, if any
    pub offending: Option<String>,
    /// Corrective instruction for the producer
    pub instruction: String,
}

/// Everything a producer needs to propose the children of one node.
#[derive(Debug, Clone)]
pub struct ExpansionRequest {
    pub node_text: String,
    pub element: LegalElement,
    pub level: ExpansionLevel,
    pub guideline: Guideline,
    pub case_description: String,
    /// Outline of the tree as filled so far
    pub tree_rendering: String,
    pub feedback: Vec<RetryFeedback>,
}

impl ExpansionRequest {
    /// Render as one text prompt for producers that take plain text.
    pub fn to_prompt(&self) -> String {
        let example = &self.guideline.example;
        let node = if self.node_text.trim().is_empty() {
            "EMPTY NODE"
        } else {
            self.node_text.as_str()
        };
        let mut prompt = format!(
            "**Level and Element-specific Guidelines:**\n{}\n\n\
             **Example Description (for reference):**\n{}\n\n\
             **Example Tree (for reference):**\n{}\n\n\
             **Example Node Completion (content reference):**\n{}\n\n\
             ---\n\n\
             **YOUR TURN:**\n\n\
             **Current Case Description:**\n{}\n\n\
             **Current Tree State:**\n{}\n\n\
             **Node to Expand:**\n{}\n\n\
             **Your Task:**\n\
             Generate exactly 3 child lines for the node \"{}\":\n\
             - 2 lines ending with \"| Fact From Story\"\n\
             - 1 line ending with \"| Commonsense Knowledge\"\n\n\
             Output ONLY the 3 child lines in the following format (one per line):\n\
             > <fact text> | Fact From Story\n\
             > <fact text> | Fact From Story\n\
             > <fact text> | Commonsense Knowledge\n\n\
             Do NOT include any other text, explanations, or markdown. Just the 3 lines.",
            self.guideline.guideline.trim(),
            example.description.join("\n"),
            example.example_tree.join("\n"),
            example.example_node_completion.join("\n"),
            self.case_description,
            self.tree_rendering,
            node,
            node,
        );
        for feedback in &self.feedback {
            prompt.push_str(&format!(
                "\n\n[Attempt {} rejected: {}]\n{}",
                feedback.attempt, feedback.kind, feedback.instruction
            ));
        }
        prompt
    }
}
