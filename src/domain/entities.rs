//! Domain entities: core data structures

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Provenance of a node's statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactType {
    /// Statement presented as drawn from the case narrative
    Explicit,
    /// General legal principle tying sibling facts to their parent
    Commonsense,
    /// Conclusion derived from its children (or not yet classified)
    #[default]
    Deduced,
}

impl fmt::Display for FactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FactType::Explicit => "Fact From Story",
            FactType::Commonsense => "Commonsense Knowledge",
            FactType::Deduced => "Deduced Fact",
        };
        write!(f, "{label}")
    }
}

/// Grouping hint for how children combine into their parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    #[default]
    And,
    Or,
    Choose,
}

/// The three independent legal elements of a tax-authority decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegalElement {
    Law,
    Econ,
    Proc,
}

impl LegalElement {
    pub const ALL: [LegalElement; 3] = [LegalElement::Law, LegalElement::Econ, LegalElement::Proc];

    /// Canonical phrase identifying a level-1 branch of this element.
    pub fn phrase(&self) -> &'static str {
        match self {
            LegalElement::Law => "applicable law",
            LegalElement::Econ => "economic",
            LegalElement::Proc => "procedural",
        }
    }

    /// Heading used when talking about the element in prompts.
    pub fn title(&self) -> &'static str {
        match self {
            LegalElement::Law => "Applicable law",
            LegalElement::Econ => "Economic activity",
            LegalElement::Proc => "Procedural requirements",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            LegalElement::Law => "law",
            LegalElement::Econ => "econ",
            LegalElement::Proc => "proc",
        }
    }

    /// Classify a level-1 statement by the phrase it contains.
    ///
    /// Checked in the order law, economic, procedural; case-insensitive.
    pub fn classify(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|element| lower.contains(element.phrase()))
    }

    /// Vocabulary that belongs to this element and must not leak into the others.
    pub fn vocabulary(&self) -> &'static [&'static str] {
        match self {
            LegalElement::Law => &[
                "applicable law",
                "treaty",
                "statute",
                "article",
                "provision",
                "legal framework",
            ],
            LegalElement::Econ => &[
                "economic",
                "revenue",
                "profit",
                "income",
                "investment",
                "business development",
            ],
            LegalElement::Proc => &[
                "procedural",
                "documentation",
                "filing",
                "submission",
                "deadline",
                "form",
            ],
        }
    }

    /// The two elements a branch of `self` must stay clear of.
    pub fn others(&self) -> [LegalElement; 2] {
        match self {
            LegalElement::Law => [LegalElement::Econ, LegalElement::Proc],
            LegalElement::Econ => [LegalElement::Law, LegalElement::Proc],
            LegalElement::Proc => [LegalElement::Law, LegalElement::Econ],
        }
    }
}

impl fmt::Display for LegalElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Expansion step, named after the levels it connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExpansionLevel {
    /// Level-1 claim into level-2 facts
    #[serde(rename = "l1_l2")]
    L1L2,
    /// Level-2 facts into level-3 facts
    #[serde(rename = "l2_l3")]
    L2L3,
}

impl ExpansionLevel {
    /// Level for expanding a node at `depth`; only depths 1 and 2 are expandable.
    pub fn for_depth(depth: usize) -> Option<Self> {
        match depth {
            1 => Some(ExpansionLevel::L1L2),
            2 => Some(ExpansionLevel::L2L3),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            ExpansionLevel::L1L2 => "l1_l2",
            ExpansionLevel::L2L3 => "l2_l3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LawState {
    Clear,
    Unclear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EconState {
    Sufficient,
    Insufficient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcState {
    Compliant,
    Deficient,
}

impl LawState {
    pub fn label(&self) -> &'static str {
        match self {
            LawState::Clear => "clear",
            LawState::Unclear => "unclear",
        }
    }
}

impl EconState {
    pub fn label(&self) -> &'static str {
        match self {
            EconState::Sufficient => "sufficient",
            EconState::Insufficient => "insufficient",
        }
    }
}

impl ProcState {
    pub fn label(&self) -> &'static str {
        match self {
            ProcState::Compliant => "compliant",
            ProcState::Deficient => "deficient",
        }
    }
}

/// State of all three legal elements for one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementStates {
    pub law: LawState,
    pub econ: EconState,
    pub proc: ProcState,
}

impl ElementStates {
    pub fn new(law: LawState, econ: EconState, proc: ProcState) -> Self {
        Self { law, econ, proc }
    }

    /// Number of elements in their favourable state.
    pub fn satisfied(&self) -> usize {
        [
            self.law == LawState::Clear,
            self.econ == EconState::Sufficient,
            self.proc == ProcState::Compliant,
        ]
        .iter()
        .filter(|ok| **ok)
        .count()
    }

    /// Two elements satisfied, one deficient.
    pub fn accept_with_conditions_patterns() -> Vec<ElementStates> {
        use EconState::*;
        use LawState::*;
        use ProcState::*;
        vec![
            Self::new(Clear, Sufficient, Deficient),
            Self::new(Clear, Insufficient, Compliant),
            Self::new(Unclear, Sufficient, Compliant),
        ]
    }

    /// Patterns strictly worse than any accept-with-conditions pattern.
    pub fn reject_patterns() -> Vec<ElementStates> {
        use EconState::*;
        use LawState::*;
        use ProcState::*;
        vec![
            Self::new(Unclear, Insufficient, Compliant),
            Self::new(Unclear, Insufficient, Deficient),
            Self::new(Unclear, Sufficient, Deficient),
            Self::new(Clear, Insufficient, Deficient),
        ]
    }

    /// Sample one accept-with-conditions and one reject pattern for a paired case.
    pub fn sample_contrasting<R: Rng + ?Sized>(rng: &mut R) -> (ElementStates, ElementStates) {
        let accept = Self::accept_with_conditions_patterns();
        let reject = Self::reject_patterns();
        // both pattern lists are non-empty constants
        let first = accept.choose(rng).copied().unwrap_or(accept[0]);
        let second = reject.choose(rng).copied().unwrap_or(reject[0]);
        (first, second)
    }
}

impl fmt::Display for ElementStates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "law {}, econ {}, proc {}",
            self.law.label(),
            self.econ.label(),
            self.proc.label()
        )
    }
}

/// Final decision of the tax authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalDecision {
    Accept,
    AcceptWithConditions,
    FullyReject,
}

impl FinalDecision {
    pub fn label(&self) -> &'static str {
        match self {
            FinalDecision::Accept => "accept",
            FinalDecision::AcceptWithConditions => "accept with conditions",
            FinalDecision::FullyReject => "fully reject",
        }
    }
}

impl FinalDecision {
    /// Decision implied by how many elements hold.
    pub fn for_states(states: &ElementStates) -> Self {
        match states.satisfied() {
            3 => FinalDecision::Accept,
            2 => FinalDecision::AcceptWithConditions,
            _ => FinalDecision::FullyReject,
        }
    }
}

impl fmt::Display for FinalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Case metadata supplied by the scenario collaborator.
///
/// Consumed read-only: it seeds the root skeleton text and provides the
/// narrative description handed to producers and judges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseInfo {
    pub taxpayer: String,
    pub tax_authority: String,
    #[serde(default)]
    pub business_sector: String,
    #[serde(default)]
    pub transaction_type: String,
    pub law_state: LawState,
    pub econ_state: EconState,
    pub proc_state: ProcState,
    pub final_decision: FinalDecision,
    #[serde(default)]
    pub applicable_law: String,
    #[serde(default)]
    pub economic_activity: String,
    #[serde(default)]
    pub procedural_requirement: String,
    /// Free-text case narrative; derived from the fields above when empty
    #[serde(default)]
    pub description: String,
}

impl CaseInfo {
    pub fn states(&self) -> ElementStates {
        ElementStates::new(self.law_state, self.econ_state, self.proc_state)
    }

    /// Copy with other element states and the decision they imply.
    ///
    /// A stored narrative describes the old states, so it is dropped and the
    /// field summary takes its place.
    pub fn with_states(&self, states: ElementStates) -> CaseInfo {
        CaseInfo {
            law_state: states.law,
            econ_state: states.econ,
            proc_state: states.proc,
            final_decision: FinalDecision::for_states(&states),
            description: String::new(),
            ..self.clone()
        }
    }

    /// Accept-with-conditions and fully-reject variants of this case.
    pub fn contrasting_pair<R: Rng + ?Sized>(&self, rng: &mut R) -> [CaseInfo; 2] {
        let (accept, reject) = ElementStates::sample_contrasting(rng);
        [self.with_states(accept), self.with_states(reject)]
    }

    /// The narrative description, falling back to a field summary.
    pub fn description(&self) -> String {
        if !self.description.trim().is_empty() {
            return self.description.clone();
        }
        format!(
            "Taxpayer: {}\nBusiness sector: {}\nTransaction type: {}\nApplicable law: {}\nEconomic activity: {}\nProcedural requirement: {}\nTax authority: {}",
            self.taxpayer,
            self.business_sector,
            self.transaction_type,
            self.applicable_law,
            self.economic_activity,
            self.procedural_requirement,
            self.tax_authority,
        )
    }
}
