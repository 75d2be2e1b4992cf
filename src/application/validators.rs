//! Checks applied to a proposed child set before it is written into the tree.
//!
//! Validators run in a fixed order and the first rejection wins:
//! structure, depth-tier wording, element purity, then the optional
//! semantic judge.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::application::request::RejectionKind;
use crate::domain::{ChildProposal, LegalElement};
use crate::infrastructure::{ProducerError, SemanticJudge};

/// Conclusion words and strong qualifiers blocked when expanding level-1 claims.
pub const STRONG_FORBIDDEN: &[&str] = &[
    "sufficient",
    "insufficient",
    "compliant",
    "non-compliant",
    "deficient",
    "adequate",
    "inadequate",
    "appropriate",
    "inappropriate",
    "satisfactory",
    "unsatisfactory",
    "independently",
    "entirely",
    "completely",
    "fully",
    "clearly",
    "obviously",
    "evidently",
    "effectively",
    "actively",
    "substantially",
    "significantly",
    "materially",
    "extensively",
    "comprehensively",
    "robust",
    "substantial",
    "significant",
    "properly",
    "improperly",
    "prove",
    "confirm",
    "validate",
    "verify",
];

/// Only the most direct judgement words, for level-2 into level-3.
pub const WEAK_FORBIDDEN: &[&str] = &[
    "sufficient",
    "insufficient",
    "compliant",
    "non-compliant",
    "deficient",
    "adequate",
    "inadequate",
    "appropriate",
    "inappropriate",
    "satisfactory",
    "unsatisfactory",
    "obviously",
    "clearly",
    "evidently",
    "successfully",
    "comprehensive",
    "positive",
    "negative",
];

const CONCLUSIVE_REASON: &str = "these words make the conclusion too obvious and reduce reasoning difficulty. Use neutral, factual language instead.";

/// Node facts a validator may look at.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    pub node_text: &'a str,
    pub depth: usize,
    pub element: Option<LegalElement>,
    pub case_description: &'a str,
}

/// Why a proposal was turned down and what the producer should change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub offending: Option<String>,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Rejection),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

pub trait Validator: Send + Sync {
    fn name(&self) -> &str;

    /// `Err` only for judge transport failures; content problems are `Verdict::Reject`.
    fn check(&self, ctx: &NodeContext, proposal: &ChildProposal) -> Result<Verdict, ProducerError>;
}

/// Exactly 2 explicit facts and 1 commonsense rule, none blank.
#[derive(Debug, Default)]
pub struct StructureValidator;

impl Validator for StructureValidator {
    fn name(&self) -> &str {
        "structure"
    }

    fn check(&self, _ctx: &NodeContext, proposal: &ChildProposal) -> Result<Verdict, ProducerError> {
        let blank = proposal.texts().any(|t| t.trim().is_empty());
        if proposal.explicit.len() == 2 && proposal.commonsense.len() == 1 && !blank {
            return Ok(Verdict::Accept);
        }
        Ok(Verdict::Reject(Rejection {
            kind: RejectionKind::Structural,
            offending: None,
            instruction: format!(
                "Return exactly 3 lines: 2 lines ending with \"| Fact From Story\" and 1 line ending with \"| Commonsense Knowledge\", each with non-empty text. Your answer had {} explicit and {} commonsense lines{}.",
                proposal.explicit.len(),
                proposal.commonsense.len(),
                if blank { " and at least one empty line" } else { "" }
            ),
        }))
    }
}

/// Case-insensitive substring ban on a word list.
#[derive(Debug, Clone)]
pub struct ForbiddenTextValidator {
    rule: String,
    words: Vec<String>,
    reason: String,
}

impl ForbiddenTextValidator {
    pub fn new<I, S>(rule: impl Into<String>, words: I, reason: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rule: rule.into(),
            words: words.into_iter().map(|w| w.into().to_lowercase()).collect(),
            reason: reason.into(),
        }
    }

    /// Conclusive-wording list for a node at `depth`: strong at depth ≤ 1.
    pub fn conclusive(depth: usize) -> Self {
        let words = if depth <= 1 {
            STRONG_FORBIDDEN
        } else {
            WEAK_FORBIDDEN
        };
        Self::new("conclusive wording", words.iter().copied(), CONCLUSIVE_REASON)
    }

    /// Vocabulary of the two other elements, for a branch of `element`.
    pub fn purity(element: LegalElement) -> Self {
        let words = element
            .others()
            .into_iter()
            .flat_map(|other| other.vocabulary().iter().copied());
        Self::new(
            "element purity",
            words,
            format!(
                "Element purity: the '{element}' branch must only contain facts about {element}, not other legal elements."
            ),
        )
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// First listed word contained in `text`, in list order.
    pub fn find_violation(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        self.words
            .iter()
            .find(|w| lower.contains(w.as_str()))
            .map(String::as_str)
    }
}

impl Validator for ForbiddenTextValidator {
    fn name(&self) -> &str {
        &self.rule
    }

    fn check(&self, _ctx: &NodeContext, proposal: &ChildProposal) -> Result<Verdict, ProducerError> {
        for text in proposal.texts() {
            if let Some(word) = self.find_violation(text) {
                trace!("{}: '{}' in {:?}", self.rule, word, text);
                return Ok(Verdict::Reject(Rejection {
                    kind: RejectionKind::ForbiddenText {
                        word: word.to_string(),
                        rule: self.rule.clone(),
                    },
                    offending: Some(text.to_string()),
                    instruction: format!("Do not use the word '{}': {}", word, self.reason),
                }));
            }
        }
        Ok(Verdict::Accept)
    }
}

/// Question put to the judge: does `candidate` help prove another element?
pub fn judge_prompt(element: LegalElement, case_description: &str, candidate: &str) -> String {
    let [a, b] = element.others();
    format!(
        "We are analyzing {} in a German tax case. Does this deduction in any way prove or help to prove {} or {} given the case description below?\n\n{}\n\nDeduction:\n{}\n\nAnswer with Yes or No first, then one sentence of explanation.",
        element.title().to_lowercase(),
        judge_scope(a),
        judge_scope(b),
        case_description,
        candidate
    )
}

fn judge_scope(element: LegalElement) -> &'static str {
    match element {
        LegalElement::Law => "applicable law (treaties, statutes)",
        LegalElement::Econ => "economic activity (revenue, business operations)",
        LegalElement::Proc => "procedural requirements (filing, documentation)",
    }
}

fn semantic_reason(element: LegalElement) -> String {
    let [a, b] = element.others();
    format!(
        "We are proving {} only. We do not want to prove {} or {} because that could make the reasoning complicated.",
        element.title().to_lowercase(),
        a.title().to_lowercase(),
        b.title().to_lowercase()
    )
}

/// External leakage check with an optional cheaper judge consulted first.
#[derive(Clone)]
pub struct SemanticValidator {
    primary: Arc<dyn SemanticJudge>,
    early_escape: Option<Arc<dyn SemanticJudge>>,
}

impl SemanticValidator {
    pub fn new(primary: Arc<dyn SemanticJudge>, early_escape: Option<Arc<dyn SemanticJudge>>) -> Self {
        Self {
            primary,
            early_escape,
        }
    }

    /// The deduction as shown to the judge: facts, then the node they support.
    fn candidate(ctx: &NodeContext, proposal: &ChildProposal) -> String {
        let mut lines: Vec<String> = proposal.texts().map(|t| format!("- {t}")).collect();
        lines.push(format!("Therefore: {}", ctx.node_text));
        lines.join("\n")
    }
}

impl Validator for SemanticValidator {
    fn name(&self) -> &str {
        "semantic"
    }

    fn check(&self, ctx: &NodeContext, proposal: &ChildProposal) -> Result<Verdict, ProducerError> {
        let Some(element) = ctx.element else {
            return Ok(Verdict::Accept);
        };
        let candidate = Self::candidate(ctx, proposal);

        // The early-escape judge only short-circuits acceptance; its failures fall through.
        if let Some(early) = &self.early_escape {
            match early.judge(element, ctx.case_description, &candidate) {
                Ok(judgement) if judgement.accepted => {
                    trace!("semantic: early escape accepted");
                    return Ok(Verdict::Accept);
                }
                Ok(_) => trace!("semantic: early escape declined, asking primary judge"),
                Err(e) => warn!("semantic: early escape judge failed, asking primary judge: {}", e),
            }
        }

        let judgement = self.primary.judge(element, ctx.case_description, &candidate)?;
        if judgement.accepted {
            return Ok(Verdict::Accept);
        }
        Ok(Verdict::Reject(Rejection {
            kind: RejectionKind::Semantic,
            offending: Some(candidate),
            instruction: format!("{} Judge: {}", semantic_reason(element), judgement.rationale),
        }))
    }
}

/// Ordered validator chain for one node.
#[derive(Default)]
pub struct ValidatorSet {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Standard chain for a node at `ctx.depth` in the branch of `ctx.element`.
    pub fn for_node(ctx: &NodeContext, semantic: Option<&SemanticValidator>) -> Self {
        let mut set = Self::new()
            .with(StructureValidator)
            .with(ForbiddenTextValidator::conclusive(ctx.depth));
        if let Some(element) = ctx.element {
            set = set.with(ForbiddenTextValidator::purity(element));
            if let Some(semantic) = semantic {
                set = set.with(semantic.clone());
            }
        }
        set
    }

    pub fn names(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Run the chain; the first rejection short-circuits.
    pub fn validate(&self, ctx: &NodeContext, proposal: &ChildProposal) -> Result<Verdict, ProducerError> {
        for validator in &self.validators {
            let verdict = validator.check(ctx, proposal)?;
            if !verdict.is_accept() {
                debug!("validate: rejected by {}", validator.name());
                return Ok(verdict);
            }
        }
        Ok(Verdict::Accept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ctx(depth: usize, element: Option<LegalElement>) -> NodeContext<'static> {
        NodeContext {
            node_text: "Applicable law is clear for X's arrangement.",
            depth,
            element,
            case_description: "Taxpayer: X",
        }
    }

    fn proposal(lines: &str) -> ChildProposal {
        ChildProposal::parse(lines)
    }

    #[rstest]
    #[case("a | Fact From Story\nb | Fact From Story\nc | Commonsense Knowledge", true)]
    #[case("a | Fact From Story\nc | Commonsense Knowledge", false)]
    #[case("a | Fact From Story\nb | Fact From Story\nc | Fact From Story", false)]
    #[case("a | Fact From Story\n  | Fact From Story\nc | Commonsense Knowledge", false)]
    fn given_proposal_when_checking_structure_then_requires_two_plus_one(
        #[case] raw: &str,
        #[case] accepted: bool,
    ) {
        let verdict = StructureValidator.check(&ctx(1, None), &proposal(raw)).unwrap();
        assert_eq!(verdict.is_accept(), accepted);
    }

    #[rstest]
    #[case(1, "The approach was robust.", false)]
    #[case(2, "The approach was robust.", true)]
    #[case(2, "The result was Clearly stated.", false)]
    fn given_depth_when_checking_conclusive_words_then_uses_tier(
        #[case] depth: usize,
        #[case] text: &str,
        #[case] accepted: bool,
    ) {
        let raw = format!("{text} | Fact From Story\nb | Fact From Story\nc | Commonsense Knowledge");
        let verdict = ForbiddenTextValidator::conclusive(depth)
            .check(&ctx(depth, None), &proposal(&raw))
            .unwrap();
        assert_eq!(verdict.is_accept(), accepted);
    }

    #[test]
    fn given_forbidden_word_when_rejecting_then_instruction_names_word() {
        let raw = "Funding is sufficient. | Fact From Story\nb | Fact From Story\nc | Commonsense Knowledge";
        let verdict = ForbiddenTextValidator::conclusive(1)
            .check(&ctx(1, None), &proposal(raw))
            .unwrap();
        let Verdict::Reject(rejection) = verdict else {
            panic!("expected rejection");
        };
        assert!(rejection.instruction.contains("'sufficient'"));
        assert_eq!(rejection.offending.as_deref(), Some("Funding is sufficient."));
    }

    #[test]
    fn given_law_branch_when_building_purity_then_blocks_econ_and_proc_vocabulary() {
        let validator = ForbiddenTextValidator::purity(LegalElement::Law);
        assert_eq!(validator.words().len(), 12);
        assert_eq!(validator.find_violation("Annual Revenue grew"), Some("revenue"));
        assert_eq!(validator.find_violation("The treaty applies"), None);
    }

    #[test]
    fn given_element_when_building_judge_prompt_then_names_other_elements() {
        let prompt = judge_prompt(LegalElement::Econ, "Taxpayer: X", "- fact");
        assert!(prompt.starts_with("We are analyzing economic activity"));
        assert!(prompt.contains("applicable law (treaties, statutes)"));
        assert!(prompt.contains("procedural requirements (filing, documentation)"));
    }

    #[test]
    fn given_unclassified_node_when_building_set_then_skips_purity() {
        assert_eq!(
            ValidatorSet::for_node(&ctx(1, None), None).names(),
            vec!["structure", "conclusive wording"]
        );
        assert_eq!(
            ValidatorSet::for_node(&ctx(2, Some(LegalElement::Proc)), None).names(),
            vec!["structure", "conclusive wording", "element purity"]
        );
    }
}
